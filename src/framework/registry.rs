//! # Operation Registry
//!
//! Maps address patterns to resource types and `(pattern, operation-name)` pairs
//! to a shared handler plus its [`OperationDescriptor`].
//!
//! Patterns are explicit sum types: a segment either names one resource
//! (`subsystem=ejb3`) or any resource of a type (`strict-max-bean-instance-pool=*`).
//! Resolution walks the registrations and picks the most specific match, so an
//! exact registration wins over a wildcard one of the same depth.

use super::error::{ManagementError, OperationError, StructuralError};
use super::handler::OperationStepHandler;
use super::model::PathAddress;
use super::schema::{AttributeDefinition, ResourceDefinition};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// One segment of an address pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SegmentPattern {
    Exact { key: String, value: String },
    Wildcard { key: String },
}

impl SegmentPattern {
    pub fn exact(key: impl Into<String>, value: impl Into<String>) -> Self {
        SegmentPattern::Exact {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn wildcard(key: impl Into<String>) -> Self {
        SegmentPattern::Wildcard { key: key.into() }
    }

    pub fn key(&self) -> &str {
        match self {
            SegmentPattern::Exact { key, .. } | SegmentPattern::Wildcard { key } => key,
        }
    }
}

impl fmt::Display for SegmentPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentPattern::Exact { key, value } => write!(f, "{}={}", key, value),
            SegmentPattern::Wildcard { key } => write!(f, "{}=*", key),
        }
    }
}

/// A sequence of segment patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AddressPattern(Vec<SegmentPattern>);

impl AddressPattern {
    pub fn new(segments: Vec<SegmentPattern>) -> Self {
        Self(segments)
    }

    /// Returns a new pattern with `segment` appended.
    pub fn append(&self, segment: SegmentPattern) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    pub fn parent(&self) -> Option<AddressPattern> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    pub fn segments(&self) -> &[SegmentPattern] {
        &self.0
    }

    pub fn matches(&self, address: &PathAddress) -> bool {
        self.0.len() == address.len()
            && self
                .0
                .iter()
                .zip(address.elements())
                .all(|(segment, element)| match segment {
                    SegmentPattern::Exact { key, value } => {
                        *key == element.key && *value == element.value
                    }
                    SegmentPattern::Wildcard { key } => *key == element.key,
                })
    }

    fn exact_segments(&self) -> usize {
        self.0
            .iter()
            .filter(|s| matches!(s, SegmentPattern::Exact { .. }))
            .count()
    }

    /// True when `child` is exactly one segment below `self`.
    fn is_parent_of(&self, child: &AddressPattern) -> bool {
        child.0.len() == self.0.len() + 1 && child.0.starts_with(&self.0)
    }
}

impl fmt::Display for AddressPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

/// Whether an operation may be invoked by operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    Public,
    /// Reserved for internal callers (model export, snapshots).
    Private,
}

/// Shape of an operation's reply payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplyShape {
    Undefined,
    Value,
    Attributes,
    OperationList,
    Names,
    Description,
}

/// Machine-readable description of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationDescriptor {
    pub name: String,
    pub description: String,
    /// Resource pattern the operation is registered for; stamped at registration.
    pub applies_to: AddressPattern,
    pub parameters: Vec<AttributeDefinition>,
    pub reply: ReplyShape,
    pub visibility: Visibility,
    pub read_only: bool,
}

impl OperationDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            applies_to: AddressPattern::default(),
            parameters: Vec::new(),
            reply: ReplyShape::Undefined,
            visibility: Visibility::Public,
            read_only: false,
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<AttributeDefinition>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_reply(mut self, reply: ReplyShape) -> Self {
        self.reply = reply;
        self
    }

    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

/// A registered handler and its descriptor.
#[derive(Clone)]
pub struct OperationEntry {
    pub handler: &'static dyn OperationStepHandler,
    pub descriptor: OperationDescriptor,
}

impl fmt::Debug for OperationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationEntry")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct ResourceRegistration {
    pattern: AddressPattern,
    definition: Arc<ResourceDefinition>,
    operations: BTreeMap<String, OperationEntry>,
}

/// Resource types and operations known to the controller.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    resources: Vec<ResourceRegistration>,
    global_operations: BTreeMap<String, OperationEntry>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource type at `pattern`.
    ///
    /// The parent pattern must already be registered (top-level patterns have
    /// no parent).
    pub fn register_resource_type(
        &mut self,
        pattern: AddressPattern,
        definition: ResourceDefinition,
    ) -> Result<Arc<ResourceDefinition>, ManagementError> {
        if self.resources.iter().any(|r| r.pattern == pattern) {
            return Err(StructuralError::DuplicateResource(pattern.to_string()).into());
        }
        if let Some(parent) = pattern.parent() {
            if !parent.segments().is_empty() && !self.resources.iter().any(|r| r.pattern == parent)
            {
                return Err(StructuralError::UnknownParent(pattern.to_string()).into());
            }
        }
        debug!(%pattern, resource_type = definition.type_name(), "Registered resource type");
        let definition = Arc::new(definition);
        self.resources.push(ResourceRegistration {
            pattern,
            definition: definition.clone(),
            operations: BTreeMap::new(),
        });
        Ok(definition)
    }

    /// Registers `handler` for `name` on the resource type at `pattern`.
    pub fn register_operation(
        &mut self,
        pattern: &AddressPattern,
        handler: &'static dyn OperationStepHandler,
        mut descriptor: OperationDescriptor,
    ) -> Result<(), ManagementError> {
        let registration = self
            .resources
            .iter_mut()
            .find(|r| r.pattern == *pattern)
            .ok_or_else(|| StructuralError::NotFound(pattern.to_string()))?;
        if registration.operations.contains_key(&descriptor.name) {
            return Err(OperationError::DuplicateOperation {
                pattern: pattern.to_string(),
                operation: descriptor.name,
            }
            .into());
        }
        descriptor.applies_to = pattern.clone();
        debug!(%pattern, operation = %descriptor.name, visibility = ?descriptor.visibility, "Registered operation");
        registration
            .operations
            .insert(descriptor.name.clone(), OperationEntry { handler, descriptor });
        Ok(())
    }

    /// Registers an operation available on every resource type.
    pub fn register_global_operation(
        &mut self,
        handler: &'static dyn OperationStepHandler,
        descriptor: OperationDescriptor,
    ) -> Result<(), ManagementError> {
        if self.global_operations.contains_key(&descriptor.name) {
            return Err(OperationError::DuplicateOperation {
                pattern: "*".to_string(),
                operation: descriptor.name,
            }
            .into());
        }
        self.global_operations
            .insert(descriptor.name.clone(), OperationEntry { handler, descriptor });
        Ok(())
    }

    fn registration_for(&self, address: &PathAddress) -> Option<&ResourceRegistration> {
        self.resources
            .iter()
            .filter(|r| r.pattern.matches(address))
            .max_by_key(|r| r.pattern.exact_segments())
    }

    /// Resource type registered for `address`, if any.
    pub fn resource_definition(&self, address: &PathAddress) -> Option<Arc<ResourceDefinition>> {
        self.registration_for(address).map(|r| r.definition.clone())
    }

    /// Pattern registered for `address`, if any.
    pub fn pattern_for(&self, address: &PathAddress) -> Option<&AddressPattern> {
        self.registration_for(address).map(|r| &r.pattern)
    }

    /// Resolves the handler for `operation` at `address`.
    pub fn resolve(
        &self,
        address: &PathAddress,
        operation: &str,
    ) -> Result<&OperationEntry, OperationError> {
        let no_such = || OperationError::NoSuchOperation {
            address: address.to_string(),
            operation: operation.to_string(),
        };
        let registration = self.registration_for(address).ok_or_else(no_such)?;
        registration
            .operations
            .get(operation)
            .or_else(|| self.global_operations.get(operation))
            .ok_or_else(no_such)
    }

    /// Names of the public operations invocable at `address`, sorted.
    pub fn operation_names(&self, address: &PathAddress) -> Vec<String> {
        let Some(registration) = self.registration_for(address) else {
            return Vec::new();
        };
        let mut names: Vec<String> = registration
            .operations
            .values()
            .chain(self.global_operations.values())
            .filter(|entry| entry.descriptor.visibility == Visibility::Public)
            .map(|entry| entry.descriptor.name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Child segment patterns registered directly below the type at `address`.
    pub fn child_types(&self, address: &PathAddress) -> Vec<SegmentPattern> {
        let Some(parent) = self.pattern_for(address) else {
            return Vec::new();
        };
        self.resources
            .iter()
            .filter(|r| parent.is_parent_of(&r.pattern))
            .filter_map(|r| r.pattern.segments().last().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::handler::{OperationContext, OperationStepHandler};
    use crate::framework::model::{address, ModelValue};
    use crate::framework::schema::AttributeSchema;
    use crate::framework::transaction::Operation;

    struct Noop;

    impl OperationStepHandler for Noop {
        fn execute(
            &self,
            context: &mut OperationContext<'_>,
            _operation: &Operation,
        ) -> Result<(), ManagementError> {
            context.set_result(ModelValue::from("noop"));
            Ok(())
        }
    }

    static NOOP: Noop = Noop;

    fn registry() -> OperationRegistry {
        let mut registry = OperationRegistry::new();
        let root = AddressPattern::new(vec![SegmentPattern::exact("subsystem", "x")]);
        registry
            .register_resource_type(root.clone(), ResourceDefinition::new("subsystem", AttributeSchema::default()))
            .unwrap();
        registry
            .register_resource_type(
                root.append(SegmentPattern::wildcard("pool")),
                ResourceDefinition::new("pool", AttributeSchema::default()),
            )
            .unwrap();
        registry
            .register_operation(&root, &NOOP, OperationDescriptor::new("poke", "Pokes"))
            .unwrap();
        registry
    }

    #[test]
    fn test_wildcard_matching() {
        let registry = registry();
        let pool = address(&[("subsystem", "x"), ("pool", "anything")]);
        assert_eq!(registry.resource_definition(&pool).unwrap().type_name(), "pool");
        assert!(registry
            .resource_definition(&address(&[("subsystem", "y")]))
            .is_none());
        assert_eq!(registry.child_types(&address(&[("subsystem", "x")])), vec![SegmentPattern::wildcard("pool")]);
    }

    #[test]
    fn test_resolve_unknown_operation() {
        let registry = registry();
        let root = address(&[("subsystem", "x")]);
        let entry = registry.resolve(&root, "poke").unwrap();
        assert_eq!(entry.descriptor.applies_to.to_string(), "/subsystem=x");
        assert!(matches!(
            registry.resolve(&root, "shake"),
            Err(OperationError::NoSuchOperation { .. })
        ));
        assert!(matches!(
            registry.resolve(&address(&[("subsystem", "x"), ("pool", "a")]), "poke"),
            Err(OperationError::NoSuchOperation { .. })
        ));
    }

    #[test]
    fn test_registration_requires_parent() {
        let mut registry = OperationRegistry::new();
        let orphan = AddressPattern::new(vec![
            SegmentPattern::exact("subsystem", "x"),
            SegmentPattern::wildcard("pool"),
        ]);
        assert!(matches!(
            registry.register_resource_type(orphan, ResourceDefinition::new("pool", AttributeSchema::default())),
            Err(ManagementError::Structural(StructuralError::UnknownParent(_)))
        ));
    }
}
