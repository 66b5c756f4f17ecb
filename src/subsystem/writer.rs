//! Operations (the `describe` output) to document.

use super::codec::{
    VersionCapabilities, BEAN_INSTANCE_POOLS, BEAN_INSTANCE_POOL_REF, MAX_POOL_SIZE_ATTR, MDB,
    NAME, POOLS, POOL_NAME_ATTR, SESSION_BEAN, STATELESS, STRICT_MAX_POOL, SUBSYSTEM_ELEMENT,
    TIMEOUT_ATTR, TIMEOUT_UNIT_ATTR, XMLNS,
};
use super::{
    pool, MAX_POOL_SIZE, POOL_NAME, SET_DEFAULT_MDB_INSTANCE_POOL, SET_DEFAULT_SLSB_INSTANCE_POOL,
    STRICT_MAX_BEAN_INSTANCE_POOL, SUBSYSTEM, TIMEOUT, TIMEOUT_UNIT,
};
use crate::config::DowngradePolicy;
use crate::framework::handler::ADD;
use crate::framework::{
    FormatError, ManagementResult, ModelValue, Operation, StructuralError, XmlElement,
};
use tracing::warn;

struct Writer<'a> {
    caps: &'a VersionCapabilities,
    policy: DowngradePolicy,
}

impl Writer<'_> {
    /// Decides what to do with a value this version cannot express.
    ///
    /// A value equal to `default` is dropped silently; anything else follows the
    /// downgrade policy.
    fn downgrade(
        &self,
        attribute: &str,
        value: &ModelValue,
        default: Option<&ModelValue>,
    ) -> Result<(), FormatError> {
        if default == Some(value) {
            return Ok(());
        }
        match self.policy {
            DowngradePolicy::Reject => Err(FormatError::UnsupportedForVersion {
                attribute: attribute.to_string(),
                version: self.caps.version.to_string(),
            }),
            DowngradePolicy::Omit => {
                warn!(attribute, %value, version = %self.caps.version, "Dropping value the schema cannot express");
                Ok(())
            }
        }
    }

    fn pool_element(&self, operation: &Operation) -> Result<XmlElement, FormatError> {
        let name = operation
            .address
            .last()
            .map(|element| element.value.as_str())
            .unwrap_or_default();
        let mut element = XmlElement::new(STRICT_MAX_POOL).with_attribute(NAME, name);
        for (attribute, value) in &operation.parameters {
            match attribute.as_str() {
                MAX_POOL_SIZE => {
                    element = element.with_attribute(MAX_POOL_SIZE_ATTR, value.to_string());
                }
                TIMEOUT => {
                    element = element.with_attribute(TIMEOUT_ATTR, value.to_string());
                }
                TIMEOUT_UNIT if self.caps.timeout_unit => {
                    element = element.with_attribute(TIMEOUT_UNIT_ATTR, value.to_string());
                }
                TIMEOUT_UNIT => {
                    self.downgrade(TIMEOUT_UNIT, value, pool::timeout_unit().default_value())?;
                }
                other => {
                    return Err(FormatError::UnsupportedForVersion {
                        attribute: other.to_string(),
                        version: self.caps.version.to_string(),
                    })
                }
            }
        }
        Ok(element)
    }

    /// `<bean-instance-pool-ref>` for a set-default operation, if expressible.
    fn pool_ref(&self, operation: &Operation, attribute: &str) -> Result<Option<XmlElement>, FormatError> {
        let pool_name = operation
            .param(POOL_NAME)
            .cloned()
            .unwrap_or(ModelValue::String(String::new()));
        if !self.caps.default_pools {
            self.downgrade(attribute, &pool_name, None)?;
            return Ok(None);
        }
        Ok(Some(
            XmlElement::new(BEAN_INSTANCE_POOL_REF).with_attribute(POOL_NAME_ATTR, pool_name.to_string()),
        ))
    }
}

fn unexpected(operation: &Operation) -> FormatError {
    FormatError::Malformed(format!(
        "cannot render '{}' at {}",
        operation.name, operation.address
    ))
}

pub(crate) fn write_subsystem(
    caps: &VersionCapabilities,
    policy: DowngradePolicy,
    description: &[Operation],
) -> ManagementResult<XmlElement> {
    let writer = Writer { caps, policy };
    let mut subsystem = None;
    let mut pools = Vec::new();
    let mut slsb = None;
    let mut mdb = None;

    for operation in description {
        let resource_type = operation.address.last().map(|element| element.key.as_str());
        match (operation.name.as_str(), resource_type) {
            (ADD, Some(SUBSYSTEM)) => {
                subsystem = Some(XmlElement::new(SUBSYSTEM_ELEMENT).with_attribute(XMLNS, caps.namespace));
            }
            (ADD, Some(STRICT_MAX_BEAN_INSTANCE_POOL)) => pools.push(writer.pool_element(operation)?),
            (SET_DEFAULT_SLSB_INSTANCE_POOL, Some(SUBSYSTEM)) => {
                slsb = writer.pool_ref(operation, super::DEFAULT_SLSB_INSTANCE_POOL)?;
            }
            (SET_DEFAULT_MDB_INSTANCE_POOL, Some(SUBSYSTEM)) => {
                mdb = writer.pool_ref(operation, super::DEFAULT_MDB_INSTANCE_POOL)?;
            }
            _ => return Err(unexpected(operation).into()),
        }
    }

    let mut root = subsystem
        .ok_or_else(|| StructuralError::NotFound(super::subsystem_address().to_string()))?;
    if let Some(slsb) = slsb {
        root = root.with_child(
            XmlElement::new(SESSION_BEAN).with_child(XmlElement::new(STATELESS).with_child(slsb)),
        );
    }
    if let Some(mdb) = mdb {
        root = root.with_child(XmlElement::new(MDB).with_child(mdb));
    }
    if !pools.is_empty() {
        let mut bean_instance_pools = XmlElement::new(BEAN_INSTANCE_POOLS);
        bean_instance_pools.children = pools;
        root = root.with_child(XmlElement::new(POOLS).with_child(bean_instance_pools));
    }
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::ManagementError;
    use crate::subsystem::codec::{EJB3_1_0, EJB3_1_1};
    use crate::subsystem::{pool_address, subsystem_address};

    fn description(unit: &str) -> Vec<Operation> {
        vec![
            Operation::new(ADD, subsystem_address()),
            Operation::new(ADD, pool_address("a"))
                .with_param(MAX_POOL_SIZE, 20i64)
                .with_param(TIMEOUT, 5i64)
                .with_param(TIMEOUT_UNIT, unit),
        ]
    }

    #[test]
    fn test_write_newest_version() {
        let mut ops = description("HOURS");
        ops.push(Operation::new(SET_DEFAULT_SLSB_INSTANCE_POOL, subsystem_address()).with_param(POOL_NAME, "a"));
        let root = write_subsystem(&EJB3_1_1, DowngradePolicy::Reject, &ops).unwrap();

        assert_eq!(root.namespace(), Some(EJB3_1_1.namespace));
        assert_eq!(root.children[0].name, SESSION_BEAN);
        let pool = &root.children[1].children[0].children[0];
        assert_eq!(pool.attribute(NAME), Some("a"));
        assert_eq!(pool.attribute(TIMEOUT_UNIT_ATTR), Some("HOURS"));
    }

    #[test]
    fn test_default_value_omitted_in_older_version() {
        let root = write_subsystem(&EJB3_1_0, DowngradePolicy::Reject, &description("MINUTES")).unwrap();
        let pool = &root.children[0].children[0].children[0];
        assert_eq!(pool.attribute(TIMEOUT_UNIT_ATTR), None);
        assert_eq!(pool.attribute(MAX_POOL_SIZE_ATTR), Some("20"));
    }

    #[test]
    fn test_downgrade_policy() {
        let err = write_subsystem(&EJB3_1_0, DowngradePolicy::Reject, &description("HOURS")).unwrap_err();
        assert_eq!(
            err,
            ManagementError::Format(FormatError::UnsupportedForVersion {
                attribute: TIMEOUT_UNIT.into(),
                version: "1.0".into(),
            })
        );

        let mut ops = description("HOURS");
        ops.push(Operation::new(SET_DEFAULT_MDB_INSTANCE_POOL, subsystem_address()).with_param(POOL_NAME, "a"));
        let root = write_subsystem(&EJB3_1_0, DowngradePolicy::Omit, &ops).unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name, POOLS);
    }

    #[test]
    fn test_missing_subsystem_is_not_found() {
        let err = write_subsystem(&EJB3_1_1, DowngradePolicy::Reject, &[]).unwrap_err();
        assert_eq!(
            err,
            ManagementError::Structural(StructuralError::NotFound(subsystem_address().to_string()))
        );
    }
}
