//! Host wiring and observability.

pub mod host;
pub mod tracing;

pub use host::{DocumentLoad, DocumentState, ManagementHost};
pub use self::tracing::setup_tracing;
