//! # Operation Handlers
//!
//! The [`OperationStepHandler`] protocol and the built-in handler families.
//!
//! A handler is a function of (model view, operation) to (staged mutations,
//! result). It reads the model through the [`OperationContext`], stages changes
//! with [`OperationContext::stage`] and records its reply with
//! [`OperationContext::set_result`]. It never mutates the model itself; the
//! [`Transaction`](super::transaction::Transaction) applies the staged changes at
//! the step's commit point.
//!
//! Handlers hold no per-call state, so each is a single `static` instance that
//! the registry references for every invocation.

use super::error::{ManagementError, ManagementResult, OperationError};
use super::model::{ModelValue, PathAddress, ResourceModel, ResourceNode};
use super::registry::{OperationDescriptor, OperationRegistry, ReplyShape};
use super::schema::{AttributeDefinition, AttributeType, ResourceDefinition};
use super::transaction::{Mutation, Operation, OperationResult};
use serde::Serialize;
use std::sync::Arc;

pub const ADD: &str = "add";
pub const REMOVE: &str = "remove";
pub const DESCRIBE: &str = "describe";
pub const READ_ATTRIBUTE: &str = "read-attribute";
pub const READ_RESOURCE: &str = "read-resource";
pub const READ_OPERATION_NAMES: &str = "read-operation-names";
pub const READ_OPERATION_DESCRIPTION: &str = "read-operation-description";
pub const READ_RESOURCE_DESCRIPTION: &str = "read-resource-description";

pub const NAME: &str = "name";
pub const INCLUDE_DEFAULTS: &str = "include-defaults";

/// Executes one named operation against the model.
pub trait OperationStepHandler: Send + Sync {
    fn execute(
        &self,
        context: &mut OperationContext<'_>,
        operation: &Operation,
    ) -> Result<(), ManagementError>;
}

/// Per-step view handed to a handler: read access plus a staging area.
pub struct OperationContext<'a> {
    model: &'a ResourceModel,
    registry: &'a OperationRegistry,
    mutations: Vec<Mutation>,
    result: OperationResult,
}

impl<'a> OperationContext<'a> {
    pub fn new(model: &'a ResourceModel, registry: &'a OperationRegistry) -> Self {
        Self {
            model,
            registry,
            mutations: Vec::new(),
            result: OperationResult::Undefined,
        }
    }

    /// The model as left by the previous steps of this transaction.
    pub fn model(&self) -> &'a ResourceModel {
        self.model
    }

    pub fn registry(&self) -> &'a OperationRegistry {
        self.registry
    }

    /// The resource type registered for `address`.
    pub fn resource_definition(
        &self,
        address: &PathAddress,
        operation: &str,
    ) -> Result<Arc<ResourceDefinition>, OperationError> {
        self.registry
            .resource_definition(address)
            .ok_or_else(|| OperationError::NoSuchOperation {
                address: address.to_string(),
                operation: operation.to_string(),
            })
    }

    pub fn stage(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    pub fn set_result(&mut self, result: impl Into<OperationResult>) {
        self.result = result.into();
    }

    pub fn into_parts(self) -> (Vec<Mutation>, OperationResult) {
        (self.mutations, self.result)
    }
}

// =============================================================================
// ADD / REMOVE
// =============================================================================

/// Creates the addressed resource from the operation's parameters.
///
/// Parameters were already checked against the descriptor at dispatch; unset
/// optional attributes are filled with their schema defaults.
pub struct AddHandler;

pub static ADD_HANDLER: AddHandler = AddHandler;

impl OperationStepHandler for AddHandler {
    fn execute(
        &self,
        context: &mut OperationContext<'_>,
        operation: &Operation,
    ) -> Result<(), ManagementError> {
        let definition = context.resource_definition(&operation.address, &operation.name)?;
        let mut attributes = operation.parameters.clone();
        for attribute in definition.schema().iter().filter(|a| a.is_add_parameter()) {
            if let Some(default) = attribute.default_value() {
                attributes
                    .entry(attribute.name().to_string())
                    .or_insert_with(|| default.clone());
            }
        }
        context.stage(Mutation::AddResource {
            address: operation.address.clone(),
            definition,
            attributes,
        });
        Ok(())
    }
}

/// Deletes the addressed resource. Resources with children are rejected.
pub struct RemoveHandler;

pub static REMOVE_HANDLER: RemoveHandler = RemoveHandler;

impl OperationStepHandler for RemoveHandler {
    fn execute(
        &self,
        context: &mut OperationContext<'_>,
        operation: &Operation,
    ) -> Result<(), ManagementError> {
        context.stage(Mutation::RemoveResource {
            address: operation.address.clone(),
        });
        Ok(())
    }
}

/// Descriptor for `add` on a resource type: its add-parameters.
pub fn add_descriptor(definition: &ResourceDefinition) -> OperationDescriptor {
    OperationDescriptor::new(ADD, format!("Adds a {}", definition.type_name()))
        .with_parameters(definition.schema().add_parameters())
}

pub fn remove_descriptor() -> OperationDescriptor {
    OperationDescriptor::new(REMOVE, "Removes the resource; children must be removed first")
}

// =============================================================================
// DESCRIBE
// =============================================================================

/// Ordered `add` operations that rebuild the subtree at `address` from empty.
///
/// Parents come before children; attributes excluded from `add` are left out
/// and must be re-applied by the caller's own operations.
pub fn describe_subtree(
    model: &ResourceModel,
    address: &PathAddress,
) -> ManagementResult<Vec<Operation>> {
    let node = model.get(address)?;
    let mut operations = Vec::new();
    describe_node(address, node, &mut operations);
    Ok(operations)
}

fn describe_node(address: &PathAddress, node: &ResourceNode, operations: &mut Vec<Operation>) {
    let mut add = Operation::new(ADD, address.clone());
    for (name, value) in node.attributes() {
        let add_parameter = node
            .definition()
            .attribute(name)
            .map(|a| a.is_add_parameter())
            .unwrap_or(false);
        if add_parameter {
            add.parameters.insert(name.clone(), value.clone());
        }
    }
    operations.push(add);
    for (element, child) in node.children() {
        describe_node(&address.append(element.clone()), child, operations);
    }
}

// =============================================================================
// GLOBAL READ OPERATIONS
// =============================================================================

/// Machine-readable description of a resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDescription {
    pub resource_type: String,
    pub attributes: Vec<AttributeDefinition>,
    pub children: Vec<String>,
    pub operations: Vec<String>,
}

fn name_param(operation: &Operation) -> &str {
    // Presence and type were checked at dispatch.
    operation
        .param(NAME)
        .and_then(ModelValue::as_str)
        .unwrap_or_default()
}

pub struct ReadAttributeHandler;
pub static READ_ATTRIBUTE_HANDLER: ReadAttributeHandler = ReadAttributeHandler;

impl OperationStepHandler for ReadAttributeHandler {
    fn execute(
        &self,
        context: &mut OperationContext<'_>,
        operation: &Operation,
    ) -> Result<(), ManagementError> {
        let name = name_param(operation);
        match context.model().read_attribute(&operation.address, name)? {
            Some(value) => context.set_result(value),
            None => context.set_result(OperationResult::Undefined),
        }
        Ok(())
    }
}

pub struct ReadResourceHandler;
pub static READ_RESOURCE_HANDLER: ReadResourceHandler = ReadResourceHandler;

impl OperationStepHandler for ReadResourceHandler {
    fn execute(
        &self,
        context: &mut OperationContext<'_>,
        operation: &Operation,
    ) -> Result<(), ManagementError> {
        let include_defaults = operation
            .param(INCLUDE_DEFAULTS)
            .and_then(ModelValue::as_bool)
            .unwrap_or(true);
        let attributes = if include_defaults {
            context.model().resolved_attributes(&operation.address)?
        } else {
            context.model().get(&operation.address)?.attributes().clone()
        };
        context.set_result(attributes);
        Ok(())
    }
}

pub struct ReadOperationNamesHandler;
pub static READ_OPERATION_NAMES_HANDLER: ReadOperationNamesHandler = ReadOperationNamesHandler;

impl OperationStepHandler for ReadOperationNamesHandler {
    fn execute(
        &self,
        context: &mut OperationContext<'_>,
        operation: &Operation,
    ) -> Result<(), ManagementError> {
        let names = context.registry().operation_names(&operation.address);
        context.set_result(OperationResult::Names(names));
        Ok(())
    }
}

pub struct ReadOperationDescriptionHandler;
pub static READ_OPERATION_DESCRIPTION_HANDLER: ReadOperationDescriptionHandler =
    ReadOperationDescriptionHandler;

impl OperationStepHandler for ReadOperationDescriptionHandler {
    fn execute(
        &self,
        context: &mut OperationContext<'_>,
        operation: &Operation,
    ) -> Result<(), ManagementError> {
        let name = name_param(operation);
        let descriptor = context
            .registry()
            .resolve(&operation.address, name)?
            .descriptor
            .clone();
        context.set_result(OperationResult::OperationDescription(descriptor));
        Ok(())
    }
}

pub struct ReadResourceDescriptionHandler;
pub static READ_RESOURCE_DESCRIPTION_HANDLER: ReadResourceDescriptionHandler =
    ReadResourceDescriptionHandler;

impl OperationStepHandler for ReadResourceDescriptionHandler {
    fn execute(
        &self,
        context: &mut OperationContext<'_>,
        operation: &Operation,
    ) -> Result<(), ManagementError> {
        let registry = context.registry();
        let definition = context.resource_definition(&operation.address, &operation.name)?;
        let description = ResourceDescription {
            resource_type: definition.type_name().to_string(),
            attributes: definition.schema().iter().cloned().collect(),
            children: registry
                .child_types(&operation.address)
                .iter()
                .map(ToString::to_string)
                .collect(),
            operations: registry.operation_names(&operation.address),
        };
        context.set_result(OperationResult::ResourceDescription(description));
        Ok(())
    }
}

/// Registers the read operations available on every resource type.
pub fn register_global_operations(registry: &mut OperationRegistry) -> ManagementResult<()> {
    let name = || AttributeDefinition::new(NAME, AttributeType::String).required();

    registry.register_global_operation(
        &READ_ATTRIBUTE_HANDLER,
        OperationDescriptor::new(READ_ATTRIBUTE, "Reads an attribute, falling back to its default")
            .with_parameters(vec![name()])
            .with_reply(ReplyShape::Value)
            .read_only(),
    )?;
    registry.register_global_operation(
        &READ_RESOURCE_HANDLER,
        OperationDescriptor::new(READ_RESOURCE, "Reads all attributes of the resource")
            .with_parameters(vec![AttributeDefinition::new(
                INCLUDE_DEFAULTS,
                AttributeType::Boolean,
            )
            .with_default(ModelValue::Bool(true))])
            .with_reply(ReplyShape::Attributes)
            .read_only(),
    )?;
    registry.register_global_operation(
        &READ_OPERATION_NAMES_HANDLER,
        OperationDescriptor::new(READ_OPERATION_NAMES, "Lists the operations of the resource")
            .with_reply(ReplyShape::Names)
            .read_only(),
    )?;
    registry.register_global_operation(
        &READ_OPERATION_DESCRIPTION_HANDLER,
        OperationDescriptor::new(READ_OPERATION_DESCRIPTION, "Describes one operation")
            .with_parameters(vec![name()])
            .with_reply(ReplyShape::Description)
            .read_only(),
    )?;
    registry.register_global_operation(
        &READ_RESOURCE_DESCRIPTION_HANDLER,
        OperationDescriptor::new(READ_RESOURCE_DESCRIPTION, "Describes the resource type")
            .with_reply(ReplyShape::Description)
            .read_only(),
    )?;
    Ok(())
}
