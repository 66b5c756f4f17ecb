//! The `/subsystem=ejb3` root resource and its operations.

use super::{
    DEFAULT_MDB_INSTANCE_POOL, DEFAULT_SLSB_INSTANCE_POOL, POOL_NAME,
    SET_DEFAULT_MDB_INSTANCE_POOL, SET_DEFAULT_SLSB_INSTANCE_POOL, STRICT_MAX_BEAN_INSTANCE_POOL,
    SUBSYSTEM, SUBSYSTEM_NAME,
};
use crate::framework::handler::{describe_subtree, DESCRIBE};
use crate::framework::registry::ReplyShape;
use crate::framework::{
    AddressPattern, AttributeDefinition, AttributeSchema, AttributeType, ManagementError,
    ModelValue, Mutation, Operation, OperationContext, OperationDescriptor, OperationStepHandler,
    PathElement, ReferenceError, ResourceDefinition, SegmentPattern, Validator,
};
use tracing::debug;

fn default_pool_attribute(name: &str) -> AttributeDefinition {
    AttributeDefinition::new(name, AttributeType::String)
        .with_validator(Validator::NonEmpty)
        .excluded_from_add()
}

pub fn definition() -> ResourceDefinition {
    ResourceDefinition::new(
        SUBSYSTEM,
        AttributeSchema::new(vec![
            default_pool_attribute(DEFAULT_SLSB_INSTANCE_POOL),
            default_pool_attribute(DEFAULT_MDB_INSTANCE_POOL),
        ]),
    )
}

/// `/subsystem=ejb3`
pub fn pattern() -> AddressPattern {
    AddressPattern::new(vec![SegmentPattern::exact(SUBSYSTEM, SUBSYSTEM_NAME)])
}

// =============================================================================
// SET DEFAULT POOL
// =============================================================================

/// Points one of the root's default-pool attributes at an existing pool.
///
/// The named pool must exist as a child of the addressed subsystem at the time
/// the step runs; otherwise the step fails with `DanglingReference`.
pub struct SetDefaultPoolHandler {
    attribute: &'static str,
}

pub static SET_DEFAULT_SLSB_POOL: SetDefaultPoolHandler = SetDefaultPoolHandler {
    attribute: DEFAULT_SLSB_INSTANCE_POOL,
};

pub static SET_DEFAULT_MDB_POOL: SetDefaultPoolHandler = SetDefaultPoolHandler {
    attribute: DEFAULT_MDB_INSTANCE_POOL,
};

impl OperationStepHandler for SetDefaultPoolHandler {
    fn execute(
        &self,
        context: &mut OperationContext<'_>,
        operation: &Operation,
    ) -> Result<(), ManagementError> {
        let pool_name = operation
            .param(POOL_NAME)
            .and_then(ModelValue::as_str)
            .unwrap_or_default();
        let pool = operation
            .address
            .append(PathElement::new(STRICT_MAX_BEAN_INSTANCE_POOL, pool_name));
        if !context.model().contains(&pool) {
            return Err(ReferenceError::DanglingReference {
                attribute: self.attribute.to_string(),
                target: pool.to_string(),
            }
            .into());
        }
        debug!(attribute = self.attribute, pool = pool_name, "Setting default pool");
        context.stage(Mutation::WriteAttribute {
            address: operation.address.clone(),
            name: self.attribute.to_string(),
            value: ModelValue::String(pool_name.to_string()),
        });
        Ok(())
    }
}

pub fn set_default_descriptor(name: &str, attribute: &str) -> OperationDescriptor {
    OperationDescriptor::new(name, format!("Sets {} to an existing strict-max pool", attribute))
        .with_parameters(vec![AttributeDefinition::new(POOL_NAME, AttributeType::String)
            .required()
            .with_validator(Validator::NonEmpty)])
}

/// Handler and descriptor pairs for the two set-default operations.
pub fn set_default_operations() -> [(&'static SetDefaultPoolHandler, OperationDescriptor); 2] {
    [
        (
            &SET_DEFAULT_SLSB_POOL,
            set_default_descriptor(SET_DEFAULT_SLSB_INSTANCE_POOL, DEFAULT_SLSB_INSTANCE_POOL),
        ),
        (
            &SET_DEFAULT_MDB_POOL,
            set_default_descriptor(SET_DEFAULT_MDB_INSTANCE_POOL, DEFAULT_MDB_INSTANCE_POOL),
        ),
    ]
}

// =============================================================================
// DESCRIBE
// =============================================================================

/// Exports the subsystem as the operations that rebuild it.
///
/// The generic subtree walk emits only `add`s; the default-pool attributes are
/// not add parameters, so their set operations are appended after every pool
/// exists.
pub struct DescribeHandler;

pub static DESCRIBE_HANDLER: DescribeHandler = DescribeHandler;

impl OperationStepHandler for DescribeHandler {
    fn execute(
        &self,
        context: &mut OperationContext<'_>,
        operation: &Operation,
    ) -> Result<(), ManagementError> {
        let model = context.model();
        let mut operations = describe_subtree(model, &operation.address)?;
        let node = model.get(&operation.address)?;
        for (attribute, name) in [
            (DEFAULT_SLSB_INSTANCE_POOL, SET_DEFAULT_SLSB_INSTANCE_POOL),
            (DEFAULT_MDB_INSTANCE_POOL, SET_DEFAULT_MDB_INSTANCE_POOL),
        ] {
            if let Some(pool) = node.attributes().get(attribute) {
                operations.push(
                    Operation::new(name, operation.address.clone()).with_param(POOL_NAME, pool.clone()),
                );
            }
        }
        context.set_result(operations);
        Ok(())
    }
}

pub fn describe_descriptor() -> OperationDescriptor {
    OperationDescriptor::new(DESCRIBE, "Lists the operations that rebuild the subsystem")
        .with_reply(ReplyShape::OperationList)
        .private()
        .read_only()
}
