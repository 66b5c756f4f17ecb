//! The `ejb3` subsystem: resource types, operations and document codecs for
//! bean instance pool configuration.
//!
//! ```text
//! /subsystem=ejb3                                   default-slsb-instance-pool, default-mdb-instance-pool
//!   /strict-max-bean-instance-pool=<name>           max-pool-size, timeout, timeout-unit
//! ```

pub mod codec;
pub mod extension;
pub mod parser;
pub mod pool;
pub mod root;
pub mod writer;

pub use codec::{Ejb3SubsystemCodec, VersionCapabilities, EJB3_1_0, EJB3_1_1, VERSIONS};
pub use extension::Ejb3Extension;

use crate::framework::{PathAddress, PathElement};

pub const SUBSYSTEM: &str = "subsystem";
pub const SUBSYSTEM_NAME: &str = "ejb3";
pub const STRICT_MAX_BEAN_INSTANCE_POOL: &str = "strict-max-bean-instance-pool";

pub const NAMESPACE_1_0: &str = "urn:jboss:domain:ejb3:1.0";
pub const NAMESPACE_1_1: &str = "urn:jboss:domain:ejb3:1.1";

// Attributes
pub const MAX_POOL_SIZE: &str = "max-pool-size";
pub const TIMEOUT: &str = "timeout";
pub const TIMEOUT_UNIT: &str = "timeout-unit";
pub const DEFAULT_SLSB_INSTANCE_POOL: &str = "default-slsb-instance-pool";
pub const DEFAULT_MDB_INSTANCE_POOL: &str = "default-mdb-instance-pool";

// Operations
pub const SET_DEFAULT_SLSB_INSTANCE_POOL: &str = "set-default-slsb-instance-pool";
pub const SET_DEFAULT_MDB_INSTANCE_POOL: &str = "set-default-mdb-instance-pool";
pub const POOL_NAME: &str = "pool-name";

/// `/subsystem=ejb3`
pub fn subsystem_address() -> PathAddress {
    PathAddress::from_elements(vec![PathElement::new(SUBSYSTEM, SUBSYSTEM_NAME)])
}

/// `/subsystem=ejb3/strict-max-bean-instance-pool=<name>`
pub fn pool_address(name: &str) -> PathAddress {
    subsystem_address().append(PathElement::new(STRICT_MAX_BEAN_INSTANCE_POOL, name))
}
