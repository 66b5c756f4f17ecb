//! # Attribute Schema
//!
//! Per-resource-type declarations of the attributes a node may hold. Each
//! [`AttributeDefinition`] names a semantic type, whether the attribute is
//! required, an optional default and a [`Validator`]. Definitions are built once
//! at registration time and are immutable afterwards (they live behind the
//! `Arc<ResourceDefinition>` every node shares).

use super::error::ValidationError;
use super::model::ModelValue;
use serde::Serialize;

/// Semantic type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributeType {
    String,
    Integer,
    Boolean,
    /// A string restricted to the listed values.
    Enumerated(Vec<String>),
}

impl AttributeType {
    pub fn enumerated(values: &[&str]) -> Self {
        AttributeType::Enumerated(values.iter().map(|v| v.to_string()).collect())
    }
}

/// Value constraint applied after the type check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Validator {
    None,
    IntRange { min: Option<i64>, max: Option<i64> },
    NonEmpty,
}

/// Declaration of a single attribute (or operation parameter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeDefinition {
    name: String,
    #[serde(rename = "type")]
    attribute_type: AttributeType,
    required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<ModelValue>,
    validator: Validator,
    /// Whether `add` accepts this attribute as a parameter.
    #[serde(skip)]
    add_parameter: bool,
}

impl AttributeDefinition {
    pub fn new(name: impl Into<String>, attribute_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
            required: false,
            default: None,
            validator: Validator::None,
            add_parameter: true,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: ModelValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_min(self, min: i64) -> Self {
        self.with_validator(Validator::IntRange {
            min: Some(min),
            max: None,
        })
    }

    /// Attribute is only written by a dedicated operation, never by `add`.
    pub fn excluded_from_add(mut self) -> Self {
        self.add_parameter = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute_type(&self) -> &AttributeType {
        &self.attribute_type
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&ModelValue> {
        self.default.as_ref()
    }

    pub fn is_add_parameter(&self) -> bool {
        self.add_parameter
    }

    fn invalid(&self, reason: impl Into<String>) -> ValidationError {
        ValidationError::InvalidValue {
            attribute: self.name.clone(),
            reason: reason.into(),
        }
    }

    /// Checks type and validator.
    pub fn validate(&self, value: &ModelValue) -> Result<(), ValidationError> {
        match (&self.attribute_type, value) {
            (AttributeType::String, ModelValue::String(_)) => {}
            (AttributeType::Integer, ModelValue::Int(_)) => {}
            (AttributeType::Boolean, ModelValue::Bool(_)) => {}
            (AttributeType::Enumerated(allowed), ModelValue::String(s)) => {
                if !allowed.iter().any(|a| a == s) {
                    return Err(self.invalid(format!(
                        "'{}' is not one of {}",
                        s,
                        allowed.join(", ")
                    )));
                }
            }
            (expected, actual) => {
                return Err(self.invalid(format!("expected {:?}, got '{}'", expected, actual)));
            }
        }

        match (&self.validator, value) {
            (Validator::IntRange { min, max }, ModelValue::Int(i)) => {
                if let Some(min) = min {
                    if i < min {
                        return Err(self.invalid(format!("{} is below the minimum {}", i, min)));
                    }
                }
                if let Some(max) = max {
                    if i > max {
                        return Err(self.invalid(format!("{} is above the maximum {}", i, max)));
                    }
                }
            }
            (Validator::NonEmpty, ModelValue::String(s)) if s.is_empty() => {
                return Err(self.invalid("must not be empty"));
            }
            _ => {}
        }
        Ok(())
    }

    /// Converts document text into a typed value (no range validation).
    pub fn parse_text(&self, text: &str) -> Result<ModelValue, ValidationError> {
        match &self.attribute_type {
            AttributeType::String | AttributeType::Enumerated(_) => {
                Ok(ModelValue::String(text.to_string()))
            }
            AttributeType::Integer => text
                .trim()
                .parse::<i64>()
                .map(ModelValue::Int)
                .map_err(|_| self.invalid(format!("'{}' is not an integer", text))),
            AttributeType::Boolean => text
                .trim()
                .parse::<bool>()
                .map(ModelValue::Bool)
                .map_err(|_| self.invalid(format!("'{}' is not a boolean", text))),
        }
    }
}

/// Ordered attribute declarations of one resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttributeSchema {
    attributes: Vec<AttributeDefinition>,
}

impl AttributeSchema {
    pub fn new(attributes: Vec<AttributeDefinition>) -> Self {
        Self { attributes }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.attributes.iter()
    }

    /// The subset accepted by `add`.
    pub fn add_parameters(&self) -> Vec<AttributeDefinition> {
        self.attributes
            .iter()
            .filter(|a| a.add_parameter)
            .cloned()
            .collect()
    }
}

/// A registered resource type: its name and attribute schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDefinition {
    type_name: String,
    attributes: AttributeSchema,
}

impl ResourceDefinition {
    pub fn new(type_name: impl Into<String>, attributes: AttributeSchema) -> Self {
        Self {
            type_name: type_name.into(),
            attributes,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn schema(&self) -> &AttributeSchema {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.get(name)
    }
}
