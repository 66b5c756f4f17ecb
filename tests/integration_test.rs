use ejb3_subsystem::clients::{Ejb3Client, ManagementOperations};
use ejb3_subsystem::config::ManagementConfig;
use ejb3_subsystem::framework::handler::{
    DESCRIBE, INCLUDE_DEFAULTS, NAME, READ_ATTRIBUTE, READ_OPERATION_DESCRIPTION, READ_OPERATION_NAMES,
    READ_RESOURCE, READ_RESOURCE_DESCRIPTION,
};
use ejb3_subsystem::framework::{
    Caller, ExecutionMode, ManagementError, ModelValue, Operation, OperationError,
    OperationResult, Parameters, ReferenceError, StructuralError, ValidationError,
};
use ejb3_subsystem::lifecycle::{DocumentState, ManagementHost};
use ejb3_subsystem::model::StrictMaxPool;
use ejb3_subsystem::subsystem::{
    pool_address, subsystem_address, Ejb3Extension, DEFAULT_SLSB_INSTANCE_POOL, MAX_POOL_SIZE,
    POOL_NAME, SET_DEFAULT_MDB_INSTANCE_POOL, SET_DEFAULT_SLSB_INSTANCE_POOL,
    STRICT_MAX_BEAN_INSTANCE_POOL, TIMEOUT, TIMEOUT_UNIT,
};
use std::collections::BTreeMap;

fn start_host() -> ManagementHost {
    ManagementHost::start(&ManagementConfig::default(), vec![Box::new(Ejb3Extension)])
        .expect("Failed to start host")
}

fn params(pairs: &[(&str, ModelValue)]) -> Parameters {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Pool lifecycle: add, default read, missing attribute, duplicate, double remove.
#[tokio::test]
async fn test_strict_max_pool_scenario() {
    let host = start_host();
    host.invoke(subsystem_address(), "add", Parameters::new())
        .await
        .expect("Failed to add subsystem");

    host.invoke(pool_address("a"), "add", params(&[(MAX_POOL_SIZE, ModelValue::Int(20))]))
        .await
        .expect("Failed to add pool a");

    let timeout = host
        .invoke(pool_address("a"), READ_ATTRIBUTE, params(&[("name", TIMEOUT.into())]))
        .await
        .unwrap();
    assert_eq!(timeout, OperationResult::Value(ModelValue::Int(5)));

    let err = host
        .invoke(pool_address("b"), "add", Parameters::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ManagementError::Validation(ValidationError::MissingRequiredAttribute { .. })
    ));

    let err = host
        .invoke(pool_address("a"), "add", params(&[(MAX_POOL_SIZE, ModelValue::Int(20))]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ManagementError::Structural(StructuralError::DuplicateResource(_))
    ));

    host.invoke(pool_address("a"), "remove", Parameters::new())
        .await
        .expect("Failed to remove pool a");
    let err = host
        .invoke(pool_address("a"), "remove", Parameters::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ManagementError::Structural(StructuralError::NotFound(_))));

    host.shutdown().await.unwrap();
}

/// A failing step leaves the model exactly as it was.
#[tokio::test]
async fn test_failed_operation_list_is_atomic() {
    let host = start_host();
    let client = Ejb3Client::new(host.client());
    client.add_subsystem().await.unwrap();
    client.add_strict_max_pool(&StrictMaxPool::new("slsb", 10)).await.unwrap();
    let before = host.client().snapshot();

    let operations = vec![
        Operation::new("remove", pool_address("slsb")),
        Operation::new("add", pool_address("other")).with_param(MAX_POOL_SIZE, 4i64),
        Operation::new(SET_DEFAULT_SLSB_INSTANCE_POOL, subsystem_address())
            .with_param(POOL_NAME, "other"),
        Operation::new("add", pool_address("broken")).with_param(MAX_POOL_SIZE, 0i64),
    ];
    let err = host
        .client()
        .execute(operations, Caller::Operator, ExecutionMode::Commit)
        .await
        .unwrap_err();
    assert!(matches!(err, ManagementError::Validation(ValidationError::InvalidValue { .. })));
    assert_eq!(host.client().snapshot(), before);

    drop(client);
    host.shutdown().await.unwrap();
}

/// Set-default operations only accept existing pools.
#[tokio::test]
async fn test_default_pool_must_exist() {
    let host = start_host();
    let client = Ejb3Client::new(host.client());
    client.add_subsystem().await.unwrap();
    client.add_strict_max_pool(&StrictMaxPool::new("slsb", 10)).await.unwrap();

    for operation in [SET_DEFAULT_SLSB_INSTANCE_POOL, SET_DEFAULT_MDB_INSTANCE_POOL] {
        let err = host
            .invoke(subsystem_address(), operation, params(&[(POOL_NAME, "missing".into())]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ManagementError::Reference(ReferenceError::DanglingReference { .. })
        ));
    }
    assert_eq!(client.default_slsb_pool().await.unwrap(), None);

    client.set_default_slsb_pool("slsb").await.unwrap();
    assert_eq!(client.default_slsb_pool().await.unwrap(), Some("slsb".to_string()));

    // References are only checked when set.
    client.remove_strict_max_pool("slsb").await.unwrap();
    assert_eq!(client.default_slsb_pool().await.unwrap(), Some("slsb".to_string()));

    drop(client);
    host.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_describe_is_internal_only() {
    let host = start_host();
    host.invoke(subsystem_address(), "add", Parameters::new()).await.unwrap();

    let err = host
        .invoke(subsystem_address(), DESCRIBE, Parameters::new())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ManagementError::Operation(OperationError::InternalOperation(DESCRIBE.to_string()))
    );

    let operations = host.client().describe(&subsystem_address()).unwrap();
    assert_eq!(operations, vec![Operation::new("add", subsystem_address())]);

    host.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_remove_with_children_rejected() {
    let host = start_host();
    let client = Ejb3Client::new(host.client());
    client.add_subsystem().await.unwrap();
    client.add_strict_max_pool(&StrictMaxPool::new("slsb", 10)).await.unwrap();

    let err = client.remove(subsystem_address()).await.unwrap_err();
    assert!(matches!(err, ManagementError::Structural(StructuralError::HasChildren(_))));

    client.remove_strict_max_pool("slsb").await.unwrap();
    client.remove(subsystem_address()).await.unwrap();
    assert!(host.client().snapshot().is_empty());

    drop(client);
    host.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_operation_names_and_unknown_operation() {
    let host = start_host();
    host.invoke(subsystem_address(), "add", Parameters::new()).await.unwrap();

    let reply = host
        .invoke(subsystem_address(), READ_OPERATION_NAMES, Parameters::new())
        .await
        .unwrap();
    let OperationResult::Names(names) = reply else {
        panic!("expected operation names");
    };
    assert!(names.contains(&SET_DEFAULT_SLSB_INSTANCE_POOL.to_string()));
    assert!(names.contains(&"read-resource".to_string()));

    let err = host
        .invoke(subsystem_address(), "reload", Parameters::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ManagementError::Operation(OperationError::NoSuchOperation { .. })));

    host.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_load_document_states() {
    let host = start_host();
    let rejected = r#"<subsystem xmlns="urn:jboss:domain:ejb3:1.1">
        <mdb><bean-instance-pool-ref pool-name="missing"/></mdb>
        <pools><bean-instance-pools>
            <strict-max-pool name="slsb" max-pool-size="20"/>
        </bean-instance-pools></pools>
    </subsystem>"#;

    let load = host.load_document(rejected).await;
    assert_eq!(
        load.history,
        vec![
            DocumentState::Unparsed,
            DocumentState::Parsing,
            DocumentState::OperationsStaged,
            DocumentState::RolledBack,
        ]
    );
    assert!(matches!(load.error, Some(ManagementError::Reference(_))));
    assert!(host.client().snapshot().is_empty());

    let load = host.load_document("<subsystem xmlns=\"urn:jboss:domain:ejb3:1.1\"><bogus/></subsystem>").await;
    assert_eq!(load.state(), DocumentState::RolledBack);
    assert_eq!(load.history.len(), 3);

    let accepted = rejected.replace("missing", "slsb");
    let load = host.load_document(&accepted).await;
    assert!(load.is_committed(), "load failed: {:?}", load.error);
    assert_eq!(load.operations.len(), 3);

    host.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_dry_run_document_leaves_model_empty() {
    let host = start_host();
    let document = r#"<subsystem xmlns="urn:jboss:domain:ejb3:1.0">
        <pools><bean-instance-pools>
            <strict-max-pool name="a" max-pool-size="3" instance-acquisition-timeout="1"/>
        </bean-instance-pools></pools>
    </subsystem>"#;

    let results = host.validate_document(document).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(host.client().snapshot().is_empty());

    host.shutdown().await.unwrap();
}

/// Concurrent writers are serialized; readers see whole transactions only.
#[tokio::test]
async fn test_concurrent_pool_adds() {
    let host = start_host();
    let client = Ejb3Client::new(host.client());
    client.add_subsystem().await.unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            client
                .add_strict_max_pool(&StrictMaxPool::new(format!("pool-{}", i), i + 1))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for i in 0..16 {
        let pool = client.strict_max_pool(&format!("pool-{}", i)).await.unwrap();
        assert_eq!(pool.max_pool_size, i + 1);
    }

    drop(client);
    host.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_read_resource_description_of_pool() {
    let host = start_host();
    let client = Ejb3Client::new(host.client());
    client.add_subsystem().await.unwrap();
    client.add_strict_max_pool(&StrictMaxPool::new("x", 4)).await.unwrap();

    let reply = host
        .invoke(pool_address("x"), READ_RESOURCE_DESCRIPTION, Parameters::new())
        .await
        .unwrap();
    let OperationResult::ResourceDescription(description) = reply else {
        panic!("expected a resource description");
    };
    assert_eq!(description.resource_type, STRICT_MAX_BEAN_INSTANCE_POOL);
    let attributes: Vec<&str> = description.attributes.iter().map(|a| a.name()).collect();
    assert_eq!(attributes, vec![MAX_POOL_SIZE, TIMEOUT, TIMEOUT_UNIT]);
    assert!(description.children.is_empty());
    for name in ["add", "remove", READ_RESOURCE, READ_ATTRIBUTE] {
        assert!(description.operations.contains(&name.to_string()), "missing {}", name);
    }

    let reply = host
        .invoke(subsystem_address(), READ_RESOURCE_DESCRIPTION, Parameters::new())
        .await
        .unwrap();
    let OperationResult::ResourceDescription(description) = reply else {
        panic!("expected a resource description");
    };
    assert_eq!(description.children, vec![format!("{}=*", STRICT_MAX_BEAN_INSTANCE_POOL)]);
    assert!(!description.operations.contains(&DESCRIBE.to_string()));

    drop(client);
    host.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_read_operation_description() {
    let host = start_host();
    host.invoke(subsystem_address(), "add", Parameters::new()).await.unwrap();

    let reply = host
        .invoke(
            subsystem_address(),
            READ_OPERATION_DESCRIPTION,
            params(&[(NAME, SET_DEFAULT_SLSB_INSTANCE_POOL.into())]),
        )
        .await
        .unwrap();
    let OperationResult::OperationDescription(descriptor) = reply else {
        panic!("expected an operation description");
    };
    assert_eq!(descriptor.name, SET_DEFAULT_SLSB_INSTANCE_POOL);
    let pool_name = descriptor
        .parameters
        .iter()
        .find(|p| p.name() == POOL_NAME)
        .expect("pool-name parameter");
    assert!(pool_name.is_required());

    let err = host
        .invoke(
            subsystem_address(),
            READ_OPERATION_DESCRIPTION,
            params(&[(NAME, "reload".into())]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ManagementError::Operation(OperationError::NoSuchOperation { .. })));

    host.shutdown().await.unwrap();
}

/// Without defaults, read-resource returns only the values stored on the node.
#[tokio::test]
async fn test_read_resource_without_defaults() {
    let host = start_host();
    let client = Ejb3Client::new(host.client());
    client.add_subsystem().await.unwrap();
    client.add_strict_max_pool(&StrictMaxPool::new("x", 4)).await.unwrap();

    let explicit_only = params(&[(INCLUDE_DEFAULTS, ModelValue::Bool(false))]);
    let reply = host
        .invoke(subsystem_address(), READ_RESOURCE, explicit_only.clone())
        .await
        .unwrap();
    assert_eq!(reply, OperationResult::Attributes(BTreeMap::new()));

    client.set_default_slsb_pool("x").await.unwrap();
    let reply = host
        .invoke(subsystem_address(), READ_RESOURCE, explicit_only.clone())
        .await
        .unwrap();
    assert_eq!(
        reply,
        OperationResult::Attributes(BTreeMap::from([(
            DEFAULT_SLSB_INSTANCE_POOL.to_string(),
            ModelValue::from("x"),
        )]))
    );

    // Add stores the defaults of omitted attributes, so both views agree on a pool.
    let stored = host
        .invoke(pool_address("x"), READ_RESOURCE, explicit_only)
        .await
        .unwrap();
    let resolved = host
        .invoke(pool_address("x"), READ_RESOURCE, Parameters::new())
        .await
        .unwrap();
    assert_eq!(stored, resolved);

    drop(client);
    host.shutdown().await.unwrap();
}

/// Whole-model descriptions taken while writers run each rebuild a valid model.
#[tokio::test]
async fn test_describe_all_reads_one_model_state() {
    let host = start_host();
    assert!(host.describe().unwrap().is_empty());

    let client = Ejb3Client::new(host.client());
    client.add_subsystem().await.unwrap();

    let writer = {
        let client = client.clone();
        tokio::spawn(async move {
            for i in 0..8 {
                client
                    .add_strict_max_pool(&StrictMaxPool::new(format!("pool-{}", i), i + 1))
                    .await
                    .unwrap();
            }
        })
    };
    let target = start_host();
    for _ in 0..8 {
        let description = host.client().describe_all().unwrap();
        assert_eq!(description[0], Operation::new("add", subsystem_address()));
        target
            .client()
            .execute(description, Caller::Internal, ExecutionMode::DryRun)
            .await
            .unwrap();
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();
    assert!(target.client().snapshot().is_empty());

    let description = host.describe().unwrap();
    assert_eq!(description, host.client().describe(&subsystem_address()).unwrap());
    assert_eq!(description.len(), 9);

    drop(client);
    host.shutdown().await.unwrap();
    target.shutdown().await.unwrap();
}
