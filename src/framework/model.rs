//! # Resource Model
//!
//! The in-memory configuration tree. A [`ResourceModel`] stores [`ResourceNode`]s
//! addressed by a [`PathAddress`] (an ordered list of `type=name` segments such as
//! `/subsystem=ejb3/strict-max-bean-instance-pool=slsb`).
//!
//! The model has no behaviour beyond storage and structural queries. Every node
//! carries the [`ResourceDefinition`] it was created with, so attribute writes are
//! checked against that type's [`AttributeSchema`](super::schema::AttributeSchema)
//! and reads fall back to schema defaults.

use super::error::{ManagementError, ManagementResult, StructuralError, ValidationError};
use super::schema::ResourceDefinition;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A typed attribute or parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelValue {
    Bool(bool),
    Int(i64),
    String(String),
}

impl ModelValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ModelValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ModelValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ModelValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ModelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelValue::Bool(b) => write!(f, "{}", b),
            ModelValue::Int(i) => write!(f, "{}", i),
            ModelValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ModelValue {
    fn from(s: &str) -> Self {
        ModelValue::String(s.to_string())
    }
}

impl From<String> for ModelValue {
    fn from(s: String) -> Self {
        ModelValue::String(s)
    }
}

impl From<i64> for ModelValue {
    fn from(i: i64) -> Self {
        ModelValue::Int(i)
    }
}

impl From<bool> for ModelValue {
    fn from(b: bool) -> Self {
        ModelValue::Bool(b)
    }
}

/// Named parameters of an operation, keyed by attribute name.
pub type Parameters = BTreeMap<String, ModelValue>;

/// One `type=name` segment of an address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PathElement {
    pub key: String,
    pub value: String,
}

impl PathElement {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Ordered path of segments identifying a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PathAddress(Vec<PathElement>);

impl PathAddress {
    /// The empty address (the model root, which holds no attributes).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_elements(elements: Vec<PathElement>) -> Self {
        Self(elements)
    }

    /// Returns a new address with `element` appended.
    pub fn append(&self, element: PathElement) -> Self {
        let mut elements = self.0.clone();
        elements.push(element);
        Self(elements)
    }

    /// Returns the parent address, or `None` for the root.
    pub fn parent(&self) -> Option<PathAddress> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.0.last()
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PathAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for element in &self.0 {
            write!(f, "/{}", element)?;
        }
        Ok(())
    }
}

/// Builds a [`PathAddress`] from `(key, value)` pairs.
///
/// ```
/// use ejb3_subsystem::framework::model::address;
/// let addr = address(&[("subsystem", "ejb3")]);
/// assert_eq!(addr.to_string(), "/subsystem=ejb3");
/// ```
pub fn address(pairs: &[(&str, &str)]) -> PathAddress {
    PathAddress(
        pairs
            .iter()
            .map(|(k, v)| PathElement::new(*k, *v))
            .collect(),
    )
}

/// A named, typed configuration entity.
#[derive(Debug, Clone)]
pub struct ResourceNode {
    definition: Arc<ResourceDefinition>,
    attributes: BTreeMap<String, ModelValue>,
    children: BTreeMap<PathElement, ResourceNode>,
}

impl ResourceNode {
    fn new(definition: Arc<ResourceDefinition>) -> Self {
        Self {
            definition,
            attributes: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }

    pub fn definition(&self) -> &Arc<ResourceDefinition> {
        &self.definition
    }

    /// Explicitly set attributes, without defaults.
    pub fn attributes(&self) -> &BTreeMap<String, ModelValue> {
        &self.attributes
    }

    pub fn children(&self) -> impl Iterator<Item = (&PathElement, &ResourceNode)> {
        self.children.iter()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

// Structural comparison: type name, explicit attributes and children.
impl PartialEq for ResourceNode {
    fn eq(&self, other: &Self) -> bool {
        self.definition.type_name() == other.definition.type_name()
            && self.attributes == other.attributes
            && self.children == other.children
    }
}

impl Eq for ResourceNode {}

/// The configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceModel {
    roots: BTreeMap<PathElement, ResourceNode>,
}

impl ResourceModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Top-level resources, in name order.
    pub fn roots(&self) -> impl Iterator<Item = (&PathElement, &ResourceNode)> {
        self.roots.iter()
    }

    /// Fetches the node at `address`.
    pub fn get(&self, address: &PathAddress) -> Result<&ResourceNode, StructuralError> {
        let not_found = || StructuralError::NotFound(address.to_string());
        let (first, rest) = address.elements().split_first().ok_or_else(not_found)?;
        let mut node = self.roots.get(first).ok_or_else(not_found)?;
        for element in rest {
            node = node.children.get(element).ok_or_else(not_found)?;
        }
        Ok(node)
    }

    fn get_mut(&mut self, address: &PathAddress) -> Result<&mut ResourceNode, StructuralError> {
        let not_found = || StructuralError::NotFound(address.to_string());
        let (first, rest) = address.elements().split_first().ok_or_else(not_found)?;
        let mut node = self.roots.get_mut(first).ok_or_else(not_found)?;
        for element in rest {
            node = node.children.get_mut(element).ok_or_else(not_found)?;
        }
        Ok(node)
    }

    pub fn contains(&self, address: &PathAddress) -> bool {
        self.get(address).is_ok()
    }

    /// Resolves the child map that holds `address`'s last segment.
    fn siblings_mut(
        &mut self,
        address: &PathAddress,
    ) -> Result<&mut BTreeMap<PathElement, ResourceNode>, StructuralError> {
        match address.parent() {
            Some(parent) if !parent.is_empty() => self
                .get_mut(&parent)
                .map(|node| &mut node.children)
                .map_err(|_| StructuralError::UnknownParent(address.to_string())),
            Some(_) => Ok(&mut self.roots),
            None => Err(StructuralError::UnknownParent(address.to_string())),
        }
    }

    /// Creates an empty node of `definition`'s type at `address`.
    pub fn put(
        &mut self,
        address: &PathAddress,
        definition: Arc<ResourceDefinition>,
    ) -> Result<(), StructuralError> {
        let Some(last) = address.last().cloned() else {
            return Err(StructuralError::UnknownParent(address.to_string()));
        };
        let siblings = self.siblings_mut(address)?;
        if siblings.contains_key(&last) {
            return Err(StructuralError::DuplicateResource(address.to_string()));
        }
        siblings.insert(last, ResourceNode::new(definition));
        Ok(())
    }

    /// Re-inserts a previously removed node with its whole subtree.
    pub(crate) fn restore(
        &mut self,
        address: &PathAddress,
        node: ResourceNode,
    ) -> Result<(), StructuralError> {
        let Some(last) = address.last().cloned() else {
            return Err(StructuralError::UnknownParent(address.to_string()));
        };
        let siblings = self.siblings_mut(address)?;
        if siblings.contains_key(&last) {
            return Err(StructuralError::DuplicateResource(address.to_string()));
        }
        siblings.insert(last, node);
        Ok(())
    }

    /// Deletes the node at `address`, returning it.
    ///
    /// Nodes with children are rejected; callers remove leaves first.
    pub fn remove(&mut self, address: &PathAddress) -> Result<ResourceNode, StructuralError> {
        let node = self.get(address)?;
        if node.has_children() {
            return Err(StructuralError::HasChildren(address.to_string()));
        }
        let Some(last) = address.last() else {
            return Err(StructuralError::NotFound(address.to_string()));
        };
        let siblings = self
            .siblings_mut(address)
            .map_err(|_| StructuralError::NotFound(address.to_string()))?;
        siblings
            .remove(last)
            .ok_or_else(|| StructuralError::NotFound(address.to_string()))
    }

    /// Writes an attribute, returning the previous explicit value.
    pub fn set_attribute(
        &mut self,
        address: &PathAddress,
        name: &str,
        value: ModelValue,
    ) -> ManagementResult<Option<ModelValue>> {
        let node = self.get_mut(address)?;
        let definition = node.definition.attribute(name).ok_or_else(|| {
            ValidationError::UnknownAttribute {
                resource_type: node.definition.type_name().to_string(),
                attribute: name.to_string(),
            }
        })?;
        definition.validate(&value)?;
        Ok(node.attributes.insert(name.to_string(), value))
    }

    /// Clears an explicit attribute value, returning it. Used to undo a first write.
    pub(crate) fn undefine_attribute(
        &mut self,
        address: &PathAddress,
        name: &str,
    ) -> ManagementResult<Option<ModelValue>> {
        let node = self.get_mut(address)?;
        if node.definition.attribute(name).is_none() {
            return Err(ValidationError::UnknownAttribute {
                resource_type: node.definition.type_name().to_string(),
                attribute: name.to_string(),
            }
            .into());
        }
        Ok(node.attributes.remove(name))
    }

    /// Reads an attribute, falling back to the schema default.
    ///
    /// Returns `Ok(None)` for an optional attribute with neither a value nor a
    /// default, and `MissingRequiredAttribute` for a required one.
    pub fn read_attribute(
        &self,
        address: &PathAddress,
        name: &str,
    ) -> ManagementResult<Option<ModelValue>> {
        let node = self.get(address)?;
        let definition = node.definition.attribute(name).ok_or_else(|| {
            ValidationError::UnknownAttribute {
                resource_type: node.definition.type_name().to_string(),
                attribute: name.to_string(),
            }
        })?;
        if let Some(value) = node.attributes.get(name) {
            return Ok(Some(value.clone()));
        }
        if let Some(default) = definition.default_value() {
            return Ok(Some(default.clone()));
        }
        if definition.is_required() {
            return Err(ValidationError::MissingRequiredAttribute {
                address: address.to_string(),
                attribute: name.to_string(),
            }
            .into());
        }
        Ok(None)
    }

    /// All attributes of a node with defaults applied; undefined ones are skipped.
    pub fn resolved_attributes(
        &self,
        address: &PathAddress,
    ) -> ManagementResult<BTreeMap<String, ModelValue>> {
        let node = self.get(address)?;
        let mut resolved = BTreeMap::new();
        for definition in node.definition.schema().iter() {
            if let Some(value) = self.read_attribute(address, definition.name())? {
                resolved.insert(definition.name().to_string(), value);
            }
        }
        Ok(resolved)
    }

    /// Checks that every required attribute of the node holds a value.
    pub fn validate(&self, address: &PathAddress) -> Result<(), ManagementError> {
        let node = self.get(address)?;
        for definition in node.definition.schema().iter() {
            if definition.is_required()
                && definition.default_value().is_none()
                && !node.attributes.contains_key(definition.name())
            {
                return Err(ValidationError::MissingRequiredAttribute {
                    address: address.to_string(),
                    attribute: definition.name().to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}
