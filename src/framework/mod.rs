//! Generic management core.
//!
//! This module provides the building blocks a subsystem registers into: the
//! resource model, attribute schemas, the operation registry, the handler
//! protocol, transactions, the controller task and versioned document codecs.
//!
//! # Main Components
//!
//! - [`ResourceModel`] - tree of typed configuration nodes
//! - [`OperationRegistry`] - (address pattern, operation name) to handler and descriptor
//! - [`OperationStepHandler`] - the handler protocol, run inside a [`Transaction`]
//! - [`ModelController`] / [`ManagementClient`] - the single writer and its handle
//! - [`CodecRegistry`] - parser/writer pairs, one per [`SchemaVersion`]
//! - [`Extension`] - composition root of a subsystem
//!
//! # Testing
//!
//! See the [`mock`] module for testing clients without a running controller.

pub mod codec;
pub mod controller;
pub mod error;
pub mod extension;
pub mod handler;
pub mod mock;
pub mod model;
pub mod registry;
pub mod schema;
pub mod transaction;

pub use codec::{CodecRegistry, DocumentCodec, SchemaVersion, XmlElement};
pub use controller::{ControllerRequest, ManagementClient, ModelController};
pub use error::{
    FormatError, ManagementError, ManagementResult, OperationError, ReferenceError,
    StructuralError, ValidationError,
};
pub use extension::{Extension, ExtensionContext};
pub use handler::{OperationContext, OperationStepHandler};
pub use model::{address, ModelValue, Parameters, PathAddress, PathElement, ResourceModel, ResourceNode};
pub use registry::{AddressPattern, OperationDescriptor, OperationRegistry, SegmentPattern, Visibility};
pub use schema::{AttributeDefinition, AttributeSchema, AttributeType, ResourceDefinition, Validator};
pub use transaction::{Caller, ExecutionMode, Mutation, Operation, OperationResult, Transaction};
