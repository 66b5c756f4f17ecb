#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # ejb3 Subsystem Management Core
//!
//! > **A versioned, transactional configuration tree for bean instance pools.**
//!
//! This crate is the management core of the `ejb3` configuration subsystem. It
//! exposes a typed resource tree to an operator-facing control plane, runs every
//! change as a transaction, and translates the tree to and from versioned XML
//! documents.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Registration, not reflection
//! A subsystem describes itself once, at start-up: resource types with their
//! attribute schemas, operations with their descriptors, and one document codec
//! per schema version. Everything at runtime is a lookup in that registry.
//!
//! ### Handlers stage, transactions apply
//! An operation handler never mutates the model. It reads a view of the model and
//! stages [`Mutation`](framework::Mutation)s; the
//! [`Transaction`](framework::Transaction) applies them with an undo log and
//! rolls the whole operation list back on the first failure.
//!
//! ## 🚀 Core Concepts
//!
//! ### Addresses and patterns
//! Resources live at addresses such as
//! `/subsystem=ejb3/strict-max-bean-instance-pool=slsb`. Types and operations are
//! registered at patterns whose segments are exact or wildcard
//! (`strict-max-bean-instance-pool=*`); the most specific pattern wins.
//!
//! ### Mocking: Testing without Pain
//! Clients can be tested without a running controller. See the
//! [`framework::mock`] module.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Type-Safe Error Handling
//! Failures are grouped into five `thiserror` enums (structural, validation,
//! reference, operation, format) wrapped by
//! [`ManagementError`](framework::ManagementError). Every failure is returned at
//! the operation boundary with the model unchanged.
//!
//! ### 2. Concurrency Model
//! The [`ModelController`](framework::ModelController) runs in its own Tokio task
//! and executes queued transactions one at a time under the model's write lock.
//! Reads take the read lock from the client side and never observe a half-applied
//! transaction.
//!
//! ### 3. Observability
//! `tracing` is used everywhere with structured fields. See the
//! [`lifecycle::tracing`] module for details.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Engine ([`framework`])
//! The generic management core: model, schema, registry, handlers, transactions,
//! controller and codecs.
//! - **Key items**: [`OperationRegistry`](framework::OperationRegistry),
//!   [`OperationStepHandler`](framework::OperationStepHandler),
//!   [`CodecRegistry`](framework::CodecRegistry).
//!
//! ### 2. The Subsystem ([`subsystem`])
//! The `ejb3` resource types, the set-default-pool and describe handlers, the
//! 1.0/1.1 codec and the [`Ejb3Extension`](subsystem::Ejb3Extension) that
//! registers them.
//!
//! ### 3. The Orchestrator ([`lifecycle`])
//! - **Role**: Runs extension registration, spawns the controller, loads and
//!   writes documents.
//! - **Key items**: [`ManagementHost`](lifecycle::ManagementHost),
//!   [`shutdown`](lifecycle::ManagementHost::shutdown).
//!
//! ### 4. The Interface ([`clients`], [`model`])
//! Typed wrappers over the generic client, and the DTOs they exchange.
//! - **Key items**: [`Ejb3Client`](clients::Ejb3Client),
//!   [`StrictMaxPool`](model::StrictMaxPool).
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Build a demo model and print it as a 1.1 document
//! RUST_LOG=info cargo run
//!
//! # Load a document and write it back in schema 1.0
//! cargo run -- --document ejb3.xml --write-version 1.0
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod clients;
pub mod config;
pub mod framework;
pub mod lifecycle;
pub mod model;
pub mod subsystem;
