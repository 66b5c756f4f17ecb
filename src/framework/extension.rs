//! # Extensions
//!
//! An [`Extension`] is the composition root of one subsystem. At start-up the
//! host hands it an [`ExtensionContext`]; the extension registers its resource
//! types, operations and document codecs, then keeps no runtime state.

use super::codec::{CodecRegistry, DocumentCodec, SchemaVersion};
use super::error::{FormatError, ManagementResult};
use super::handler::OperationStepHandler;
use super::registry::{AddressPattern, OperationDescriptor, OperationRegistry};
use super::schema::ResourceDefinition;
use crate::config::CodecConfig;
use std::sync::Arc;

/// Registration-time view of the host.
#[derive(Debug)]
pub struct ExtensionContext {
    registry: OperationRegistry,
    codecs: CodecRegistry,
    codec_config: CodecConfig,
}

impl ExtensionContext {
    pub fn new(codec_config: CodecConfig) -> Self {
        Self {
            registry: OperationRegistry::new(),
            codecs: CodecRegistry::new(),
            codec_config,
        }
    }

    /// Registers a resource type; its parent type must already be registered.
    pub fn register_resource_type(
        &mut self,
        pattern: AddressPattern,
        definition: ResourceDefinition,
    ) -> ManagementResult<Arc<ResourceDefinition>> {
        self.registry.register_resource_type(pattern, definition)
    }

    /// Registers a shared handler for an operation on a resource type.
    pub fn register_operation(
        &mut self,
        pattern: &AddressPattern,
        handler: &'static dyn OperationStepHandler,
        descriptor: OperationDescriptor,
    ) -> ManagementResult<()> {
        self.registry.register_operation(pattern, handler, descriptor)
    }

    pub fn register_document_codec(&mut self, version: SchemaVersion, codec: Arc<dyn DocumentCodec>) {
        self.codecs.register(version, codec);
    }

    pub fn set_default_writer(&mut self, version: SchemaVersion) -> Result<(), FormatError> {
        self.codecs.set_default_writer(version)
    }

    /// Codec settings (downgrade policy) from the host configuration.
    pub fn codec_config(&self) -> &CodecConfig {
        &self.codec_config
    }

    pub fn registry_mut(&mut self) -> &mut OperationRegistry {
        &mut self.registry
    }

    pub fn into_parts(self) -> (OperationRegistry, CodecRegistry) {
        (self.registry, self.codecs)
    }
}

/// A subsystem plugged into the management host.
pub trait Extension: Send + Sync {
    /// Registers resource types and operations.
    fn initialize(&self, context: &mut ExtensionContext) -> ManagementResult<()>;

    /// Registers the document codecs, one per supported schema version.
    fn initialize_parsers(&self, context: &mut ExtensionContext) -> ManagementResult<()>;
}
