use crate::clients::management_operations::ManagementOperations;
use crate::framework::{ManagementClient, ManagementResult, ModelValue, Parameters, ValidationError};
use crate::model::StrictMaxPool;
use crate::subsystem::{
    pool_address, subsystem_address, DEFAULT_MDB_INSTANCE_POOL, DEFAULT_SLSB_INSTANCE_POOL,
    POOL_NAME, SET_DEFAULT_MDB_INSTANCE_POOL, SET_DEFAULT_SLSB_INSTANCE_POOL,
    STRICT_MAX_BEAN_INSTANCE_POOL,
};
use async_trait::async_trait;
use tracing::{debug, info, instrument};

/// Client for the `ejb3` subsystem resources.
#[derive(Clone)]
pub struct Ejb3Client {
    inner: ManagementClient,
}

#[async_trait]
impl ManagementOperations for Ejb3Client {
    fn inner(&self) -> &ManagementClient {
        &self.inner
    }
}

impl Ejb3Client {
    pub fn new(inner: ManagementClient) -> Self {
        Self { inner }
    }

    #[instrument(skip(self))]
    pub async fn add_subsystem(&self) -> ManagementResult<()> {
        self.add(subsystem_address(), Parameters::new()).await
    }

    #[instrument(skip(self, pool), fields(pool = %pool.name))]
    pub async fn add_strict_max_pool(&self, pool: &StrictMaxPool) -> ManagementResult<()> {
        debug!(?pool, "add_strict_max_pool called");
        self.add(pool_address(&pool.name), pool.to_parameters()).await?;
        info!("Pool added");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn remove_strict_max_pool(&self, name: &str) -> ManagementResult<()> {
        self.remove(pool_address(name)).await
    }

    /// Reads a pool with defaults applied.
    #[instrument(skip(self))]
    pub async fn strict_max_pool(&self, name: &str) -> ManagementResult<StrictMaxPool> {
        let attributes = self.read_resource(pool_address(name)).await?;
        StrictMaxPool::from_attributes(name, &attributes).map_err(|reason| {
            ValidationError::InvalidValue {
                attribute: STRICT_MAX_BEAN_INSTANCE_POOL.to_string(),
                reason,
            }
            .into()
        })
    }

    #[instrument(skip(self))]
    pub async fn set_default_slsb_pool(&self, pool_name: &str) -> ManagementResult<()> {
        self.set_default(SET_DEFAULT_SLSB_INSTANCE_POOL, pool_name).await
    }

    #[instrument(skip(self))]
    pub async fn set_default_mdb_pool(&self, pool_name: &str) -> ManagementResult<()> {
        self.set_default(SET_DEFAULT_MDB_INSTANCE_POOL, pool_name).await
    }

    pub async fn default_slsb_pool(&self) -> ManagementResult<Option<String>> {
        self.default_pool(DEFAULT_SLSB_INSTANCE_POOL).await
    }

    pub async fn default_mdb_pool(&self) -> ManagementResult<Option<String>> {
        self.default_pool(DEFAULT_MDB_INSTANCE_POOL).await
    }

    async fn set_default(&self, operation: &str, pool_name: &str) -> ManagementResult<()> {
        let parameters = Parameters::from([(POOL_NAME.to_string(), ModelValue::from(pool_name))]);
        self.inner
            .invoke(subsystem_address(), operation, parameters)
            .await
            .map(|_| ())
    }

    async fn default_pool(&self, attribute: &str) -> ManagementResult<Option<String>> {
        let value = self.read_attribute(subsystem_address(), attribute).await?;
        Ok(value.and_then(|v| v.as_str().map(str::to_string)))
    }
}
