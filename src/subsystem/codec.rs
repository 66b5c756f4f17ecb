//! Versioned `ejb3` document codec.
//!
//! One codec type serves every schema version. What differs between versions is
//! captured in a [`VersionCapabilities`] table: the namespace and which optional
//! elements and attributes the version can express. A codec reads any document
//! whose namespace is at most its own version, recognizing elements according to
//! the document's version, and writes in its own version.

use super::{parser, writer, NAMESPACE_1_0, NAMESPACE_1_1};
use crate::config::DowngradePolicy;
use crate::framework::{
    DocumentCodec, FormatError, ManagementResult, Operation, SchemaVersion, XmlElement,
};

/// What one schema version can express.
#[derive(Debug, PartialEq, Eq)]
pub struct VersionCapabilities {
    pub version: SchemaVersion,
    pub namespace: &'static str,
    /// `<session-bean>` and `<mdb>` default pool references.
    pub default_pools: bool,
    /// `instance-acquisition-timeout-unit` on pools.
    pub timeout_unit: bool,
}

pub const EJB3_1_0: VersionCapabilities = VersionCapabilities {
    version: SchemaVersion::new(1, 0),
    namespace: NAMESPACE_1_0,
    default_pools: false,
    timeout_unit: false,
};

pub const EJB3_1_1: VersionCapabilities = VersionCapabilities {
    version: SchemaVersion::new(1, 1),
    namespace: NAMESPACE_1_1,
    default_pools: true,
    timeout_unit: true,
};

/// Supported versions, oldest first.
pub const VERSIONS: [&VersionCapabilities; 2] = [&EJB3_1_0, &EJB3_1_1];

/// Capabilities of the version declared by `namespace`.
pub fn capabilities_for(namespace: &str) -> Result<&'static VersionCapabilities, FormatError> {
    VERSIONS
        .into_iter()
        .find(|caps| caps.namespace == namespace)
        .ok_or_else(|| FormatError::UnknownNamespace(namespace.to_string()))
}

// Element and attribute names.
pub(crate) const SUBSYSTEM_ELEMENT: &str = "subsystem";
pub(crate) const SESSION_BEAN: &str = "session-bean";
pub(crate) const STATELESS: &str = "stateless";
pub(crate) const MDB: &str = "mdb";
pub(crate) const BEAN_INSTANCE_POOL_REF: &str = "bean-instance-pool-ref";
pub(crate) const POOLS: &str = "pools";
pub(crate) const BEAN_INSTANCE_POOLS: &str = "bean-instance-pools";
pub(crate) const STRICT_MAX_POOL: &str = "strict-max-pool";
pub(crate) const XMLNS: &str = "xmlns";
pub(crate) const NAME: &str = "name";
pub(crate) const POOL_NAME_ATTR: &str = "pool-name";
pub(crate) const MAX_POOL_SIZE_ATTR: &str = "max-pool-size";
pub(crate) const TIMEOUT_ATTR: &str = "instance-acquisition-timeout";
pub(crate) const TIMEOUT_UNIT_ATTR: &str = "instance-acquisition-timeout-unit";

/// The `ejb3` codec for one schema version.
#[derive(Debug)]
pub struct Ejb3SubsystemCodec {
    capabilities: &'static VersionCapabilities,
    policy: DowngradePolicy,
}

impl Ejb3SubsystemCodec {
    pub fn new(capabilities: &'static VersionCapabilities, policy: DowngradePolicy) -> Self {
        Self {
            capabilities,
            policy,
        }
    }
}

impl DocumentCodec for Ejb3SubsystemCodec {
    fn version(&self) -> SchemaVersion {
        self.capabilities.version
    }

    fn namespace(&self) -> &str {
        self.capabilities.namespace
    }

    fn parse(&self, root: &XmlElement) -> ManagementResult<Vec<Operation>> {
        let namespace = root.namespace().unwrap_or_default();
        let document = capabilities_for(namespace)?;
        if document.version > self.capabilities.version {
            return Err(FormatError::UnsupportedNamespace {
                namespace: namespace.to_string(),
                version: self.capabilities.version.to_string(),
            }
            .into());
        }
        parser::parse_subsystem(document, root)
    }

    fn write(&self, description: &[Operation]) -> ManagementResult<XmlElement> {
        writer::write_subsystem(self.capabilities, self.policy, description)
    }
}
