//! Document to operations.
//!
//! Output order: subsystem `add`, pool `add`s in document order, then the
//! SLSB and MDB set-default operations. Anything the document's version does
//! not define is rejected; nothing is returned for a rejected document.

use super::codec::{
    VersionCapabilities, BEAN_INSTANCE_POOLS, BEAN_INSTANCE_POOL_REF, MAX_POOL_SIZE_ATTR, MDB,
    NAME, POOLS, POOL_NAME_ATTR, SESSION_BEAN, STATELESS, STRICT_MAX_POOL, SUBSYSTEM_ELEMENT,
    TIMEOUT_ATTR, TIMEOUT_UNIT_ATTR, XMLNS,
};
use super::{
    pool, pool_address, subsystem_address, POOL_NAME, SET_DEFAULT_MDB_INSTANCE_POOL,
    SET_DEFAULT_SLSB_INSTANCE_POOL,
};
use crate::framework::handler::ADD;
use crate::framework::{
    AttributeDefinition, FormatError, ManagementResult, Operation, XmlElement,
};
use std::collections::BTreeSet;

fn unrecognized(caps: &VersionCapabilities, element: impl Into<String>) -> FormatError {
    FormatError::UnrecognizedElement {
        element: element.into(),
        version: caps.version.to_string(),
    }
}

/// Rejects attributes outside `allowed`.
fn check_attributes(
    caps: &VersionCapabilities,
    element: &XmlElement,
    allowed: &[&str],
) -> Result<(), FormatError> {
    match element
        .attributes
        .iter()
        .find(|(key, _)| !allowed.contains(&key.as_str()))
    {
        Some((key, _)) => Err(unrecognized(caps, format!("{}@{}", element.name, key))),
        None => Ok(()),
    }
}

fn required_attribute<'e>(element: &'e XmlElement, name: &str) -> Result<&'e str, FormatError> {
    element.attribute(name).ok_or_else(|| {
        FormatError::Malformed(format!("<{}> requires attribute '{}'", element.name, name))
    })
}

/// Singleton elements may appear at most once under their parent.
fn once(seen: &mut BTreeSet<String>, element: &XmlElement) -> Result<(), FormatError> {
    if seen.insert(element.name.clone()) {
        Ok(())
    } else {
        Err(FormatError::DuplicateElement(element.name.clone()))
    }
}

pub(crate) fn parse_subsystem(
    caps: &VersionCapabilities,
    root: &XmlElement,
) -> ManagementResult<Vec<Operation>> {
    if root.name != SUBSYSTEM_ELEMENT {
        return Err(unrecognized(caps, root.name.as_str()).into());
    }
    check_attributes(caps, root, &[XMLNS])?;

    let mut operations = vec![Operation::new(ADD, subsystem_address())];
    let mut default_slsb = None;
    let mut default_mdb = None;
    let mut seen = BTreeSet::new();

    for child in &root.children {
        match child.name.as_str() {
            SESSION_BEAN if caps.default_pools => {
                once(&mut seen, child)?;
                default_slsb = parse_session_bean(caps, child)?;
            }
            MDB if caps.default_pools => {
                once(&mut seen, child)?;
                default_mdb = parse_pool_ref_parent(caps, child, SET_DEFAULT_MDB_INSTANCE_POOL)?;
            }
            POOLS => {
                once(&mut seen, child)?;
                parse_pools(caps, child, &mut operations)?;
            }
            other => return Err(unrecognized(caps, other).into()),
        }
    }

    operations.extend(default_slsb);
    operations.extend(default_mdb);
    Ok(operations)
}

fn parse_session_bean(
    caps: &VersionCapabilities,
    element: &XmlElement,
) -> Result<Option<Operation>, FormatError> {
    check_attributes(caps, element, &[])?;
    let mut seen = BTreeSet::new();
    let mut operation = None;
    for child in &element.children {
        match child.name.as_str() {
            STATELESS => {
                once(&mut seen, child)?;
                operation = parse_pool_ref_parent(caps, child, SET_DEFAULT_SLSB_INSTANCE_POOL)?;
            }
            other => return Err(unrecognized(caps, other)),
        }
    }
    Ok(operation)
}

/// `<stateless>` or `<mdb>`: an optional `<bean-instance-pool-ref pool-name=".."/>`.
fn parse_pool_ref_parent(
    caps: &VersionCapabilities,
    element: &XmlElement,
    operation_name: &str,
) -> Result<Option<Operation>, FormatError> {
    check_attributes(caps, element, &[])?;
    let mut seen = BTreeSet::new();
    let mut operation = None;
    for child in &element.children {
        match child.name.as_str() {
            BEAN_INSTANCE_POOL_REF => {
                once(&mut seen, child)?;
                check_attributes(caps, child, &[POOL_NAME_ATTR])?;
                if !child.children.is_empty() {
                    return Err(unrecognized(caps, child.children[0].name.as_str()));
                }
                let pool_name = required_attribute(child, POOL_NAME_ATTR)?;
                operation = Some(
                    Operation::new(operation_name, subsystem_address())
                        .with_param(POOL_NAME, pool_name),
                );
            }
            other => return Err(unrecognized(caps, other)),
        }
    }
    Ok(operation)
}

fn parse_pools(
    caps: &VersionCapabilities,
    element: &XmlElement,
    operations: &mut Vec<Operation>,
) -> ManagementResult<()> {
    check_attributes(caps, element, &[])?;
    let mut seen = BTreeSet::new();
    for child in &element.children {
        match child.name.as_str() {
            BEAN_INSTANCE_POOLS => {
                once(&mut seen, child)?;
                parse_bean_instance_pools(caps, child, operations)?;
            }
            other => return Err(unrecognized(caps, other).into()),
        }
    }
    Ok(())
}

fn parse_bean_instance_pools(
    caps: &VersionCapabilities,
    element: &XmlElement,
    operations: &mut Vec<Operation>,
) -> ManagementResult<()> {
    check_attributes(caps, element, &[])?;
    let mut names = BTreeSet::new();
    for child in &element.children {
        match child.name.as_str() {
            STRICT_MAX_POOL => {
                let operation = parse_strict_max_pool(caps, child)?;
                let name = required_attribute(child, NAME)?;
                if !names.insert(name.to_string()) {
                    return Err(FormatError::DuplicateElement(format!(
                        "{} name={}",
                        STRICT_MAX_POOL, name
                    ))
                    .into());
                }
                operations.push(operation);
            }
            other => return Err(unrecognized(caps, other).into()),
        }
    }
    Ok(())
}

fn parse_strict_max_pool(
    caps: &VersionCapabilities,
    element: &XmlElement,
) -> ManagementResult<Operation> {
    let mut allowed = vec![NAME, MAX_POOL_SIZE_ATTR, TIMEOUT_ATTR];
    if caps.timeout_unit {
        allowed.push(TIMEOUT_UNIT_ATTR);
    }
    check_attributes(caps, element, &allowed)?;
    if let Some(child) = element.children.first() {
        return Err(unrecognized(caps, child.name.as_str()).into());
    }

    let name = required_attribute(element, NAME)?;
    let mut operation = Operation::new(ADD, pool_address(name));
    let fields: [(&str, AttributeDefinition); 3] = [
        (MAX_POOL_SIZE_ATTR, pool::max_pool_size()),
        (TIMEOUT_ATTR, pool::timeout()),
        (TIMEOUT_UNIT_ATTR, pool::timeout_unit()),
    ];
    for (xml_name, definition) in fields {
        if let Some(text) = element.attribute(xml_name) {
            let value = definition.parse_text(text)?;
            operation
                .parameters
                .insert(definition.name().to_string(), value);
        }
    }
    Ok(operation)
}
