//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter whose
//! verbosity is controlled by `RUST_LOG`. The module path is hidden
//! (`with_target(false)`); log lines carry structured fields instead.
//!
//! ## What Gets Traced
//!
//! - **Registration**: resource types, operations and codecs (`debug`)
//! - **Controller**: start, each transaction's outcome, shutdown (`info` / `warn`)
//! - **Transactions**: every step with its `address` and `operation` (`debug`),
//!   commit and rollback
//! - **Codecs**: parsed and written documents with their `version`, values
//!   dropped by the `omit` downgrade policy (`warn`)
//! - **Clients**: one span per typed client call
//!
//! ## Usage Examples
//!
//! ```bash
//! # Transaction outcomes only
//! RUST_LOG=info cargo run -- --document standalone.xml
//!
//! # Every step and registration
//! RUST_LOG=debug cargo run -- --document standalone.xml
//!
//! # Only the codec layer
//! RUST_LOG=ejb3_subsystem::framework::codec=debug cargo run
//! ```
//!
//! **With `RUST_LOG=info`**:
//!
//! ```text
//! INFO Extensions initialized extensions=1 versions=[SchemaVersion { major: 1, minor: 0 }, SchemaVersion { major: 1, minor: 1 }] policy=Reject
//! INFO Controller started
//! INFO Parsed document version=1.1 operations=4
//! INFO Operations committed operations=4
//! INFO Transaction complete operations=4 mode=Commit
//! INFO Document committed version=1.1 operations=4
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // Structured fields carry the context
        .compact() // Client spans shown inline
        .init();
}
