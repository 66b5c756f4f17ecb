//! # Model Controller
//!
//! The single writer of the management model.
//!
//! ## Key Types
//!
//! - [`ModelController`]: task that owns the write side and runs transactions one at a time.
//! - [`ManagementClient`]: cloneable handle used by the control plane.
//! - [`ControllerRequest`]: message sent from the client to the controller.
//!
//! Mutating operation lists are queued on the controller's channel and each runs
//! to commit or rollback under the model's write lock. Reads take the read lock
//! directly from the client, so they proceed concurrently with each other and
//! only ever see the model before or after a whole transaction.

use super::error::{ManagementError, ManagementResult, OperationError};
use super::handler::DESCRIBE;
use super::model::{ModelValue, PathAddress, Parameters, ResourceModel};
use super::registry::OperationRegistry;
use super::transaction::{self, Caller, ExecutionMode, Operation, OperationResult};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

// =============================================================================
// 1. MESSAGES
// =============================================================================

/// Reply channel of a controller request.
pub type Response<T> = oneshot::Sender<ManagementResult<T>>;

#[derive(Debug)]
pub enum ControllerRequest {
    /// Run `operations` as one transaction.
    Execute {
        operations: Vec<Operation>,
        caller: Caller,
        mode: ExecutionMode,
        respond_to: Response<Vec<OperationResult>>,
    },
}

// =============================================================================
// 2. THE CONTROLLER TASK
// =============================================================================

/// Owns the receiving end of the request queue.
///
/// Requests are handled in arrival order, so at most one transaction is in
/// flight. The write lock is held for the whole stage, validate and commit
/// sequence of a request and released before the next one is received.
pub struct ModelController {
    receiver: mpsc::Receiver<ControllerRequest>,
    model: Arc<RwLock<ResourceModel>>,
    registry: Arc<OperationRegistry>,
}

impl ModelController {
    pub fn new(buffer_size: usize, registry: Arc<OperationRegistry>) -> (Self, ManagementClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let model = Arc::new(RwLock::new(ResourceModel::new()));
        let controller = Self {
            receiver,
            model: model.clone(),
            registry: registry.clone(),
        };
        let client = ManagementClient::new(sender, model, registry);
        (controller, client)
    }

    /// Processes requests until every client has been dropped.
    pub async fn run(mut self) {
        info!("Controller started");
        let mut transactions = 0usize;

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ControllerRequest::Execute {
                    operations,
                    caller,
                    mode,
                    respond_to,
                } => {
                    debug!(operations = operations.len(), ?caller, ?mode, "Execute");
                    let result = {
                        let mut model = self.model.write();
                        transaction::execute_operations(
                            &mut model,
                            &self.registry,
                            &operations,
                            caller,
                            mode,
                        )
                    };
                    match &result {
                        Ok(_) => {
                            transactions += 1;
                            info!(operations = operations.len(), ?mode, "Transaction complete");
                        }
                        Err(e) => warn!(error = %e, "Transaction rolled back"),
                    }
                    let _ = respond_to.send(result);
                }
            }
        }

        info!(transactions, "Shutdown");
    }
}

// =============================================================================
// 3. THE CLIENT
// =============================================================================

/// Control-plane handle to the model.
#[derive(Clone)]
pub struct ManagementClient {
    sender: mpsc::Sender<ControllerRequest>,
    model: Arc<RwLock<ResourceModel>>,
    registry: Arc<OperationRegistry>,
}

impl ManagementClient {
    pub fn new(
        sender: mpsc::Sender<ControllerRequest>,
        model: Arc<RwLock<ResourceModel>>,
        registry: Arc<OperationRegistry>,
    ) -> Self {
        Self {
            sender,
            model,
            registry,
        }
    }

    /// Runs `operations` as one transaction on the controller.
    pub async fn execute(
        &self,
        operations: Vec<Operation>,
        caller: Caller,
        mode: ExecutionMode,
    ) -> ManagementResult<Vec<OperationResult>> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(ControllerRequest::Execute {
                operations,
                caller,
                mode,
                respond_to,
            })
            .await
            .map_err(|_| ManagementError::ControllerClosed)?;
        response.await.map_err(|_| ManagementError::ControllerDropped)?
    }

    /// Operator entry point: `invoke(address, operation, parameters)`.
    ///
    /// Read-only operations are evaluated here under the read lock; everything
    /// else is queued on the controller.
    pub async fn invoke(
        &self,
        address: PathAddress,
        name: &str,
        parameters: Parameters,
    ) -> ManagementResult<OperationResult> {
        let mut operation = Operation::new(name, address);
        operation.parameters = parameters;

        let read_only = self
            .registry
            .resolve(&operation.address, name)
            .map(|entry| entry.descriptor.read_only)
            .unwrap_or(false);
        if read_only {
            let model = self.model.read();
            return transaction::evaluate(&model, &self.registry, &operation, Caller::Operator);
        }

        let mut results = self
            .execute(vec![operation], Caller::Operator, ExecutionMode::Commit)
            .await?;
        Ok(results.pop().unwrap_or(OperationResult::Undefined))
    }

    /// Reads an attribute, falling back to its schema default.
    pub fn read_attribute(
        &self,
        address: &PathAddress,
        name: &str,
    ) -> ManagementResult<Option<ModelValue>> {
        self.model.read().read_attribute(address, name)
    }

    /// Structural copy of the current model.
    pub fn snapshot(&self) -> ResourceModel {
        self.model.read().clone()
    }

    /// Operations that rebuild the subtree at `address` from an empty model.
    pub fn describe(&self, address: &PathAddress) -> ManagementResult<Vec<Operation>> {
        let model = self.model.read();
        self.describe_in(&model, address)
    }

    /// Operations that rebuild the whole model, every top-level resource in
    /// name order, taken from a single read of the model.
    pub fn describe_all(&self) -> ManagementResult<Vec<Operation>> {
        let model = self.model.read();
        let mut operations = Vec::new();
        for (element, _) in model.roots() {
            let root = PathAddress::from_elements(vec![element.clone()]);
            operations.extend(self.describe_in(&model, &root)?);
        }
        Ok(operations)
    }

    fn describe_in(&self, model: &ResourceModel, address: &PathAddress) -> ManagementResult<Vec<Operation>> {
        let operation = Operation::new(DESCRIBE, address.clone());
        match transaction::evaluate(model, &self.registry, &operation, Caller::Internal)? {
            OperationResult::Operations(operations) => Ok(operations),
            _ => Err(OperationError::NoSuchOperation {
                address: address.to_string(),
                operation: DESCRIBE.to_string(),
            }
            .into()),
        }
    }
}
