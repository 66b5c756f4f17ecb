//! `strict-max-bean-instance-pool` resource type.

use super::{root, MAX_POOL_SIZE, STRICT_MAX_BEAN_INSTANCE_POOL, TIMEOUT, TIMEOUT_UNIT};
use crate::framework::{
    AddressPattern, AttributeDefinition, AttributeSchema, AttributeType, ModelValue,
    ResourceDefinition, SegmentPattern,
};
use crate::model::TimeoutUnit;

/// Maximum number of bean instances; required, at least 1.
pub fn max_pool_size() -> AttributeDefinition {
    AttributeDefinition::new(MAX_POOL_SIZE, AttributeType::Integer)
        .required()
        .with_min(1)
}

/// Instance acquisition timeout; defaults to 5.
pub fn timeout() -> AttributeDefinition {
    AttributeDefinition::new(TIMEOUT, AttributeType::Integer)
        .with_default(ModelValue::Int(5))
        .with_min(0)
}

pub fn timeout_unit() -> AttributeDefinition {
    let units = TimeoutUnit::ALL.iter().map(|u| u.as_str().to_string()).collect();
    AttributeDefinition::new(TIMEOUT_UNIT, AttributeType::Enumerated(units))
        .with_default(ModelValue::String(TimeoutUnit::default().as_str().to_string()))
}

pub fn definition() -> ResourceDefinition {
    ResourceDefinition::new(
        STRICT_MAX_BEAN_INSTANCE_POOL,
        AttributeSchema::new(vec![max_pool_size(), timeout(), timeout_unit()]),
    )
}

/// `/subsystem=ejb3/strict-max-bean-instance-pool=*`
pub fn pattern() -> AddressPattern {
    root::pattern().append(SegmentPattern::wildcard(STRICT_MAX_BEAN_INSTANCE_POOL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::ValidationError;

    #[test]
    fn test_pool_attribute_constraints() {
        assert!(max_pool_size().validate(&ModelValue::Int(1)).is_ok());
        assert!(matches!(
            max_pool_size().validate(&ModelValue::Int(0)),
            Err(ValidationError::InvalidValue { .. })
        ));
        assert!(timeout().validate(&ModelValue::Int(0)).is_ok());
        assert!(timeout().validate(&ModelValue::Int(-1)).is_err());
        assert!(timeout_unit().validate(&ModelValue::String("DAYS".into())).is_ok());
        assert!(timeout_unit().validate(&ModelValue::String("WEEKS".into())).is_err());
    }

    #[test]
    fn test_every_pool_attribute_is_an_add_parameter() {
        assert_eq!(definition().schema().add_parameters().len(), 3);
    }
}
