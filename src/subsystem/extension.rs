//! Composition root of the `ejb3` subsystem.

use super::codec::{Ejb3SubsystemCodec, EJB3_1_1, VERSIONS};
use super::{pool, root};
use crate::framework::handler::{self, ADD_HANDLER, REMOVE_HANDLER};
use crate::framework::{Extension, ExtensionContext, ManagementResult};
use std::sync::Arc;
use tracing::info;

/// Registers the `ejb3` resource types, operations and codecs.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ejb3Extension;

impl Extension for Ejb3Extension {
    fn initialize(&self, context: &mut ExtensionContext) -> ManagementResult<()> {
        let subsystem = root::pattern();
        let definition = context.register_resource_type(subsystem.clone(), root::definition())?;
        context.register_operation(&subsystem, &ADD_HANDLER, handler::add_descriptor(&definition))?;
        context.register_operation(&subsystem, &REMOVE_HANDLER, handler::remove_descriptor())?;
        context.register_operation(&subsystem, &root::DESCRIBE_HANDLER, root::describe_descriptor())?;
        for (set_default, descriptor) in root::set_default_operations() {
            context.register_operation(&subsystem, set_default, descriptor)?;
        }

        let pools = pool::pattern();
        let definition = context.register_resource_type(pools.clone(), pool::definition())?;
        context.register_operation(&pools, &ADD_HANDLER, handler::add_descriptor(&definition))?;
        context.register_operation(&pools, &REMOVE_HANDLER, handler::remove_descriptor())?;

        info!(subsystem = %subsystem, "Registered ejb3 resource types");
        Ok(())
    }

    fn initialize_parsers(&self, context: &mut ExtensionContext) -> ManagementResult<()> {
        let policy = context.codec_config().downgrade_policy;
        for caps in VERSIONS {
            context.register_document_codec(caps.version, Arc::new(Ejb3SubsystemCodec::new(caps, policy)));
        }
        context.set_default_writer(EJB3_1_1.version)?;
        Ok(())
    }
}
