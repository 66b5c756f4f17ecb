//! # Transactions
//!
//! Executes a list of [`Operation`]s against the model as one unit.
//!
//! Each step resolves its handler, validates the parameters against the
//! descriptor, and runs the handler against a read-only view of the model. The
//! handler returns a list of staged [`Mutation`]s; the step's commit point
//! (`complete_step`) applies them, recording an undo entry per change, and
//! re-validates every node the step touched. If any step or the final
//! validation fails, the undo log is replayed in reverse and the model is left
//! exactly as it was before the transaction began.
//!
//! ```text
//! begin ──► step ──► step ──► ... ──► commit
//!             │        │
//!             └────────┴──► rollback (undo log, newest first)
//! ```

use super::error::{ManagementResult, OperationError, ValidationError};
use super::handler::{OperationContext, ResourceDescription};
use super::model::{ModelValue, Parameters, PathAddress, ResourceModel, ResourceNode};
use super::registry::{OperationDescriptor, OperationEntry, OperationRegistry, Visibility};
use super::schema::ResourceDefinition;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A named operation addressed to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    pub address: PathAddress,
    #[serde(default)]
    pub parameters: Parameters,
}

impl Operation {
    pub fn new(name: impl Into<String>, address: PathAddress) -> Self {
        Self {
            name: name.into(),
            address,
            parameters: Parameters::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ModelValue>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&ModelValue> {
        self.parameters.get(name)
    }
}

/// Reply payload of an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OperationResult {
    Undefined,
    Value(ModelValue),
    Attributes(BTreeMap<String, ModelValue>),
    Operations(Vec<Operation>),
    Names(Vec<String>),
    OperationDescription(OperationDescriptor),
    ResourceDescription(ResourceDescription),
}

impl From<ModelValue> for OperationResult {
    fn from(value: ModelValue) -> Self {
        OperationResult::Value(value)
    }
}

impl From<Vec<Operation>> for OperationResult {
    fn from(operations: Vec<Operation>) -> Self {
        OperationResult::Operations(operations)
    }
}

impl From<BTreeMap<String, ModelValue>> for OperationResult {
    fn from(attributes: BTreeMap<String, ModelValue>) -> Self {
        OperationResult::Attributes(attributes)
    }
}

/// Who is invoking an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    /// The operator-facing control plane. Private operations are rejected.
    Operator,
    /// The management core itself (model export, document boot).
    Internal,
}

/// Whether a transaction is kept or always rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Commit,
    /// Validate only: run every step, then roll back.
    DryRun,
}

/// A change staged by a handler.
#[derive(Debug, Clone)]
pub enum Mutation {
    AddResource {
        address: PathAddress,
        definition: Arc<ResourceDefinition>,
        attributes: BTreeMap<String, ModelValue>,
    },
    RemoveResource {
        address: PathAddress,
    },
    WriteAttribute {
        address: PathAddress,
        name: String,
        value: ModelValue,
    },
}

#[derive(Debug)]
enum Undo {
    Remove(PathAddress),
    Restore(PathAddress, ResourceNode),
    Write(PathAddress, String, Option<ModelValue>),
}

/// Resolves the entry for `operation` and checks visibility and parameters.
pub fn dispatch<'r>(
    registry: &'r OperationRegistry,
    operation: &Operation,
    caller: Caller,
) -> ManagementResult<&'r OperationEntry> {
    let entry = registry.resolve(&operation.address, &operation.name)?;
    if entry.descriptor.visibility == Visibility::Private && caller == Caller::Operator {
        return Err(OperationError::InternalOperation(operation.name.clone()).into());
    }
    validate_parameters(&entry.descriptor, operation)?;
    Ok(entry)
}

fn validate_parameters(
    descriptor: &OperationDescriptor,
    operation: &Operation,
) -> Result<(), ValidationError> {
    for (name, value) in &operation.parameters {
        let definition = descriptor
            .parameters
            .iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| ValidationError::UnknownAttribute {
                resource_type: format!("{} parameters", descriptor.name),
                attribute: name.clone(),
            })?;
        definition.validate(value)?;
    }
    for definition in &descriptor.parameters {
        if definition.is_required()
            && definition.default_value().is_none()
            && !operation.parameters.contains_key(definition.name())
        {
            return Err(ValidationError::MissingRequiredAttribute {
                address: operation.address.to_string(),
                attribute: definition.name().to_string(),
            });
        }
    }
    Ok(())
}

/// Staged execution of several operations over a write-locked model.
pub struct Transaction<'a> {
    model: &'a mut ResourceModel,
    registry: &'a OperationRegistry,
    caller: Caller,
    undo: Vec<Undo>,
    touched: Vec<PathAddress>,
}

impl<'a> Transaction<'a> {
    pub fn begin(
        model: &'a mut ResourceModel,
        registry: &'a OperationRegistry,
        caller: Caller,
    ) -> Self {
        Self {
            model,
            registry,
            caller,
            undo: Vec::new(),
            touched: Vec::new(),
        }
    }

    /// Runs one operation and applies its mutations.
    pub fn step(&mut self, operation: &Operation) -> ManagementResult<OperationResult> {
        let registry = self.registry;
        let entry = dispatch(registry, operation, self.caller)?;
        debug!(address = %operation.address, operation = %operation.name, "Executing step");

        let mut context = OperationContext::new(&*self.model, registry);
        entry.handler.execute(&mut context, operation)?;
        let (mutations, result) = context.into_parts();

        self.complete_step(mutations)?;
        Ok(result)
    }

    /// Commit point of a step: apply staged mutations, then validate what they touched.
    fn complete_step(&mut self, mutations: Vec<Mutation>) -> ManagementResult<()> {
        let first_touched = self.touched.len();
        for mutation in mutations {
            self.apply(mutation)?;
        }
        for address in &self.touched[first_touched..] {
            if self.model.contains(address) {
                self.model.validate(address)?;
            }
        }
        Ok(())
    }

    fn apply(&mut self, mutation: Mutation) -> ManagementResult<()> {
        match mutation {
            Mutation::AddResource {
                address,
                definition,
                attributes,
            } => {
                self.model.put(&address, definition)?;
                self.undo.push(Undo::Remove(address.clone()));
                for (name, value) in attributes {
                    self.model.set_attribute(&address, &name, value)?;
                }
                self.touched.push(address);
            }
            Mutation::RemoveResource { address } => {
                let node = self.model.remove(&address)?;
                self.undo.push(Undo::Restore(address, node));
            }
            Mutation::WriteAttribute {
                address,
                name,
                value,
            } => {
                let previous = self.model.set_attribute(&address, &name, value)?;
                self.undo.push(Undo::Write(address.clone(), name, previous));
                self.touched.push(address);
            }
        }
        Ok(())
    }

    /// Final validation; on failure the transaction is rolled back.
    pub fn commit(self) -> ManagementResult<()> {
        let validation = self
            .touched
            .iter()
            .filter(|address| self.model.contains(address))
            .try_for_each(|address| self.model.validate(address));
        match validation {
            Ok(()) => {
                debug!(changes = self.undo.len(), "Transaction committed");
                Ok(())
            }
            Err(e) => {
                self.rollback();
                Err(e)
            }
        }
    }

    /// Replays the undo log, newest change first.
    pub fn rollback(self) {
        let changes = self.undo.len();
        for undo in self.undo.into_iter().rev() {
            let outcome: ManagementResult<()> = match undo {
                Undo::Remove(address) => self.model.remove(&address).map(|_| ()).map_err(Into::into),
                Undo::Restore(address, node) => {
                    self.model.restore(&address, node).map_err(Into::into)
                }
                Undo::Write(address, name, previous) => match previous {
                    Some(value) => self.model.set_attribute(&address, &name, value).map(|_| ()),
                    None => self.model.undefine_attribute(&address, &name).map(|_| ()),
                },
            };
            if let Err(e) = outcome {
                error!(error = %e, "Undo step failed");
            }
        }
        debug!(changes, "Transaction rolled back");
    }
}

/// Runs `operations` as one transaction.
///
/// Either every operation is applied, or the model is unchanged and the first
/// error is returned.
pub fn execute_operations(
    model: &mut ResourceModel,
    registry: &OperationRegistry,
    operations: &[Operation],
    caller: Caller,
    mode: ExecutionMode,
) -> ManagementResult<Vec<OperationResult>> {
    let mut transaction = Transaction::begin(model, registry, caller);
    let mut results = Vec::with_capacity(operations.len());
    for operation in operations {
        match transaction.step(operation) {
            Ok(result) => results.push(result),
            Err(e) => {
                warn!(address = %operation.address, operation = %operation.name, error = %e, "Step failed, rolling back");
                transaction.rollback();
                return Err(e);
            }
        }
    }
    match mode {
        ExecutionMode::Commit => {
            transaction.commit()?;
            info!(operations = operations.len(), "Operations committed");
        }
        ExecutionMode::DryRun => {
            let validation = transaction
                .touched
                .iter()
                .filter(|address| transaction.model.contains(address))
                .try_for_each(|address| transaction.model.validate(address));
            transaction.rollback();
            validation?;
            info!(operations = operations.len(), "Dry run succeeded");
        }
    }
    Ok(results)
}

/// Runs a read-only operation against a shared view of the model.
pub fn evaluate(
    model: &ResourceModel,
    registry: &OperationRegistry,
    operation: &Operation,
    caller: Caller,
) -> ManagementResult<OperationResult> {
    let entry = dispatch(registry, operation, caller)?;
    let mut context = OperationContext::new(model, registry);
    entry.handler.execute(&mut context, operation)?;
    let (mutations, result) = context.into_parts();
    if !mutations.is_empty() {
        warn!(operation = %operation.name, "Read-only evaluation discarded staged mutations");
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::handler::{register_global_operations, ADD_HANDLER, REMOVE_HANDLER};
    use crate::framework::handler;
    use crate::framework::model::address;
    use crate::framework::registry::{AddressPattern, SegmentPattern};
    use crate::framework::schema::{AttributeDefinition, AttributeSchema, AttributeType};
    use crate::framework::error::{ManagementError, StructuralError};

    fn registry() -> OperationRegistry {
        let mut registry = OperationRegistry::new();
        let root = AddressPattern::new(vec![SegmentPattern::exact("subsystem", "x")]);
        let root_def = registry
            .register_resource_type(root.clone(), ResourceDefinition::new("subsystem", AttributeSchema::default()))
            .unwrap();
        registry
            .register_operation(&root, &ADD_HANDLER, handler::add_descriptor(&root_def))
            .unwrap();
        registry
            .register_operation(&root, &REMOVE_HANDLER, handler::remove_descriptor())
            .unwrap();
        let pool = root.append(SegmentPattern::wildcard("pool"));
        let pool_def = registry
            .register_resource_type(
                pool.clone(),
                ResourceDefinition::new(
                    "pool",
                    AttributeSchema::new(vec![AttributeDefinition::new("size", AttributeType::Integer)
                        .required()
                        .with_min(1)]),
                ),
            )
            .unwrap();
        registry
            .register_operation(&pool, &ADD_HANDLER, handler::add_descriptor(&pool_def))
            .unwrap();
        registry
            .register_operation(&pool, &REMOVE_HANDLER, handler::remove_descriptor())
            .unwrap();
        register_global_operations(&mut registry).unwrap();
        registry
    }

    fn add_root() -> Operation {
        Operation::new("add", address(&[("subsystem", "x")]))
    }

    fn add_pool(name: &str, size: i64) -> Operation {
        Operation::new("add", address(&[("subsystem", "x"), ("pool", name)])).with_param("size", size)
    }

    #[test]
    fn test_failed_step_rolls_back_everything() {
        let registry = registry();
        let mut model = ResourceModel::new();
        let ops = vec![add_root(), add_pool("a", 2), add_pool("a", 3)];

        let err = execute_operations(&mut model, &registry, &ops, Caller::Operator, ExecutionMode::Commit)
            .unwrap_err();
        assert!(matches!(err, ManagementError::Structural(StructuralError::DuplicateResource(_))));
        assert_eq!(model, ResourceModel::new());
    }

    #[test]
    fn test_dry_run_leaves_model_untouched() {
        let registry = registry();
        let mut model = ResourceModel::new();
        let results = execute_operations(
            &mut model,
            &registry,
            &[add_root(), add_pool("a", 2)],
            Caller::Operator,
            ExecutionMode::DryRun,
        )
        .unwrap();
        assert_eq!(results.len(), 2);
        assert!(model.is_empty());
    }

    #[test]
    fn test_remove_restores_on_failure() {
        let registry = registry();
        let mut model = ResourceModel::new();
        execute_operations(&mut model, &registry, &[add_root(), add_pool("a", 2)], Caller::Operator, ExecutionMode::Commit)
            .unwrap();
        let before = model.clone();

        let remove_pool = Operation::new("remove", address(&[("subsystem", "x"), ("pool", "a")]));
        let bad = add_pool("b", 0);
        let err = execute_operations(&mut model, &registry, &[remove_pool, bad], Caller::Operator, ExecutionMode::Commit)
            .unwrap_err();
        assert!(matches!(err, ManagementError::Validation(ValidationError::InvalidValue { .. })));
        assert_eq!(model, before);
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let registry = registry();
        let mut model = ResourceModel::new();
        let op = add_root().with_param("colour", "blue");
        let err = execute_operations(&mut model, &registry, &[op], Caller::Operator, ExecutionMode::Commit)
            .unwrap_err();
        assert!(matches!(err, ManagementError::Validation(ValidationError::UnknownAttribute { .. })));
    }

    #[test]
    fn test_rollback_clears_first_attribute_write() {
        let registry = registry();
        let mut model = ResourceModel::new();
        let root = address(&[("subsystem", "x")]);
        let definition = Arc::new(ResourceDefinition::new(
            "subsystem",
            AttributeSchema::new(vec![AttributeDefinition::new("label", AttributeType::String)]),
        ));
        model.put(&root, definition).unwrap();
        let before = model.clone();

        let mut transaction = Transaction::begin(&mut model, &registry, Caller::Internal);
        transaction
            .apply(Mutation::WriteAttribute {
                address: root.clone(),
                name: "label".to_string(),
                value: ModelValue::from("first"),
            })
            .unwrap();
        transaction
            .apply(Mutation::WriteAttribute {
                address: root.clone(),
                name: "label".to_string(),
                value: ModelValue::from("second"),
            })
            .unwrap();
        transaction.rollback();

        assert_eq!(model, before);
        assert!(model.get(&root).unwrap().attributes().is_empty());
    }
}
