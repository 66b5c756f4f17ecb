use ejb3_subsystem::clients::Ejb3Client;
use ejb3_subsystem::config::{DowngradePolicy, ManagementConfig};
use ejb3_subsystem::framework::{FormatError, ManagementError, SchemaVersion, StructuralError};
use ejb3_subsystem::lifecycle::ManagementHost;
use ejb3_subsystem::model::{StrictMaxPool, TimeoutUnit};
use ejb3_subsystem::subsystem::{
    subsystem_address, Ejb3Extension, NAMESPACE_1_0, NAMESPACE_1_1, TIMEOUT_UNIT,
};

const V1_0: SchemaVersion = SchemaVersion::new(1, 0);
const V1_1: SchemaVersion = SchemaVersion::new(1, 1);

const BASE_DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<subsystem xmlns="urn:jboss:domain:ejb3:1.0">
    <pools>
        <bean-instance-pools>
            <strict-max-pool name="slsb-strict-max-pool" max-pool-size="20" instance-acquisition-timeout="5"/>
            <strict-max-pool name="mdb-strict-max-pool" max-pool-size="10"/>
        </bean-instance-pools>
    </pools>
</subsystem>"#;

fn start_host(policy: DowngradePolicy) -> ManagementHost {
    let mut config = ManagementConfig::default();
    config.codec.downgrade_policy = policy;
    ManagementHost::start(&config, vec![Box::new(Ejb3Extension)]).expect("Failed to start host")
}

async fn populate(host: &ManagementHost, unit: TimeoutUnit, with_defaults: bool) {
    let client = Ejb3Client::new(host.client());
    client.add_subsystem().await.unwrap();
    client
        .add_strict_max_pool(&StrictMaxPool::new("slsb", 20).with_timeout(10, unit))
        .await
        .unwrap();
    if with_defaults {
        client.set_default_slsb_pool("slsb").await.unwrap();
    }
}

/// A base document reads the same through either codec.
#[tokio::test]
async fn test_base_document_parses_identically_in_both_versions() {
    let host = start_host(DowngradePolicy::Reject);
    let by_1_0 = host.parse(V1_0, BASE_DOCUMENT).unwrap();
    let by_1_1 = host.parse(V1_1, BASE_DOCUMENT).unwrap();
    assert_eq!(by_1_0, by_1_1);
    assert_eq!(by_1_0.len(), 3);

    let (version, auto) = host.parse_document(BASE_DOCUMENT).unwrap();
    assert_eq!(version, V1_0);
    assert_eq!(auto, by_1_0);

    host.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_namespace_selection_errors() {
    let host = start_host(DowngradePolicy::Reject);

    let newer = BASE_DOCUMENT.replace(NAMESPACE_1_0, NAMESPACE_1_1);
    let err = host.parse(V1_0, &newer).unwrap_err();
    assert!(matches!(err, ManagementError::Format(FormatError::UnsupportedNamespace { .. })));

    let unknown = BASE_DOCUMENT.replace(NAMESPACE_1_0, "urn:jboss:domain:ejb3:2.0");
    let err = host.parse_document(&unknown).unwrap_err();
    assert_eq!(
        err,
        ManagementError::Format(FormatError::UnknownNamespace("urn:jboss:domain:ejb3:2.0".into()))
    );

    let err = host.parse(SchemaVersion::new(3, 0), BASE_DOCUMENT).unwrap_err();
    assert!(matches!(err, ManagementError::Format(FormatError::UnknownVersion(_))));

    host.shutdown().await.unwrap();
}

/// Write with the default writer, load into a fresh host, compare models.
#[tokio::test]
async fn test_write_then_load_round_trip() {
    let source = start_host(DowngradePolicy::Reject);
    populate(&source, TimeoutUnit::Hours, true).await;
    let document = source.write_default().unwrap();
    assert!(document.contains(NAMESPACE_1_1));

    let target = start_host(DowngradePolicy::Reject);
    let load = target.load_document(&document).await;
    assert!(load.is_committed(), "load failed: {:?}", load.error);
    assert_eq!(load.version, Some(V1_1));
    assert_eq!(target.client().snapshot(), source.client().snapshot());

    source.shutdown().await.unwrap();
    target.shutdown().await.unwrap();
}

/// Values equal to the default are dropped silently by an older writer.
#[tokio::test]
async fn test_older_writer_omits_default_values() {
    let host = start_host(DowngradePolicy::Reject);
    populate(&host, TimeoutUnit::Minutes, false).await;

    let document = host.write(V1_0).unwrap();
    assert!(document.contains(NAMESPACE_1_0));
    assert!(!document.contains("instance-acquisition-timeout-unit"));

    let target = start_host(DowngradePolicy::Reject);
    assert!(target.load_document(&document).await.is_committed());
    assert_eq!(target.client().snapshot(), host.client().snapshot());

    host.shutdown().await.unwrap();
    target.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reject_policy() {
    let host = start_host(DowngradePolicy::Reject);
    populate(&host, TimeoutUnit::Seconds, false).await;

    let err = host.write(V1_0).unwrap_err();
    assert_eq!(
        err,
        ManagementError::Format(FormatError::UnsupportedForVersion {
            attribute: TIMEOUT_UNIT.into(),
            version: "1.0".into(),
        })
    );
    assert!(host.write(V1_1).is_ok());

    host.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_omit_policy() {
    let host = start_host(DowngradePolicy::Omit);
    populate(&host, TimeoutUnit::Seconds, true).await;

    let document = host.write(V1_0).unwrap();
    assert!(!document.contains("SECONDS"));
    assert!(!document.contains("session-bean"));
    assert!(document.contains("max-pool-size=\"20\""));

    host.shutdown().await.unwrap();
}

/// Nothing to persist until the subsystem resource exists.
#[tokio::test]
async fn test_write_without_subsystem() {
    let host = start_host(DowngradePolicy::Reject);
    let expected = ManagementError::Structural(StructuralError::NotFound(subsystem_address().to_string()));

    assert_eq!(host.write(V1_1).unwrap_err(), expected);
    assert_eq!(host.write(V1_0).unwrap_err(), expected);
    assert_eq!(host.write_default().unwrap_err(), expected);

    host.shutdown().await.unwrap();
}
