use crate::framework::handler::{ADD, INCLUDE_DEFAULTS, NAME, READ_ATTRIBUTE, READ_RESOURCE, REMOVE};
use crate::framework::{
    ManagementClient, ManagementResult, ModelValue, OperationResult, Parameters, PathAddress,
};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Trait for subsystem clients to inherit the generic resource operations.
///
/// Implementors only provide [`inner`](ManagementOperations::inner); `add`,
/// `remove` and the reads come with default implementations.
#[async_trait]
pub trait ManagementOperations: Send + Sync {
    /// Access the inner generic ManagementClient.
    fn inner(&self) -> &ManagementClient;

    /// Creates the resource at `address`.
    #[tracing::instrument(skip_all, fields(address = %address))]
    async fn add(&self, address: PathAddress, parameters: Parameters) -> ManagementResult<()> {
        tracing::debug!(?parameters, "Sending request");
        self.inner().invoke(address, ADD, parameters).await.map(|_| ())
    }

    /// Removes the resource at `address`.
    #[tracing::instrument(skip_all, fields(address = %address))]
    async fn remove(&self, address: PathAddress) -> ManagementResult<()> {
        tracing::debug!("Sending request");
        self.inner()
            .invoke(address, REMOVE, Parameters::new())
            .await
            .map(|_| ())
    }

    /// Reads all attributes of the resource, defaults applied.
    #[tracing::instrument(skip_all, fields(address = %address))]
    async fn read_resource(
        &self,
        address: PathAddress,
    ) -> ManagementResult<BTreeMap<String, ModelValue>> {
        tracing::debug!("Sending request");
        let parameters = Parameters::from([(INCLUDE_DEFAULTS.to_string(), ModelValue::Bool(true))]);
        match self.inner().invoke(address, READ_RESOURCE, parameters).await? {
            OperationResult::Attributes(attributes) => Ok(attributes),
            _ => Ok(BTreeMap::new()),
        }
    }

    /// Reads one attribute; `None` if it is unset and has no default.
    #[tracing::instrument(skip_all, fields(address = %address, name))]
    async fn read_attribute(
        &self,
        address: PathAddress,
        name: &str,
    ) -> ManagementResult<Option<ModelValue>> {
        tracing::debug!("Sending request");
        let parameters = Parameters::from([(NAME.to_string(), ModelValue::from(name))]);
        match self.inner().invoke(address, READ_ATTRIBUTE, parameters).await? {
            OperationResult::Value(value) => Ok(Some(value)),
            _ => Ok(None),
        }
    }
}
