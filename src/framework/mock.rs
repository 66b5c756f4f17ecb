//! # Mock Controller
//!
//! Utilities for testing clients in isolation.
//!
//! Use [`create_mock_client`] to get a client and the raw request receiver, or
//! [`MockController`] for a fluent expectation API that also records every
//! operation list the client sent.

use super::controller::{ControllerRequest, ManagementClient};
use super::error::ManagementResult;
use super::model::ResourceModel;
use super::registry::OperationRegistry;
use super::transaction::{Caller, ExecutionMode, Operation, OperationResult};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

struct Expectation {
    response: ManagementResult<Vec<OperationResult>>,
}

#[derive(Default)]
struct MockState {
    expectations: VecDeque<Expectation>,
    received: Vec<Vec<Operation>>,
    unexpected: usize,
}

/// A controller stand-in that answers `Execute` requests from a queue of expectations.
///
/// # Example
/// ```ignore
/// let mock = MockController::new();
/// mock.expect_execute().return_ok(vec![OperationResult::Undefined]);
///
/// let client = Ejb3Client::new(mock.client());
/// client.add_subsystem().await?;
/// mock.verify();
/// ```
pub struct MockController {
    client: ManagementClient,
    state: Arc<Mutex<MockState>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockController {
    /// A mock whose client has an empty registry, so every `invoke` is queued.
    pub fn new() -> Self {
        let registry = Arc::new(OperationRegistry::new());
        let (sender, mut receiver) = mpsc::channel::<ControllerRequest>(100);
        let state = Arc::new(Mutex::new(MockState::default()));
        let task_state = state.clone();

        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                match request {
                    ControllerRequest::Execute {
                        operations,
                        respond_to,
                        ..
                    } => {
                        let expectation = {
                            let mut state = task_state.lock();
                            state.received.push(operations);
                            let next = state.expectations.pop_front();
                            if next.is_none() {
                                state.unexpected += 1;
                            }
                            next
                        };
                        // An unexpected request drops the reply channel.
                        if let Some(expectation) = expectation {
                            let _ = respond_to.send(expectation.response);
                        }
                    }
                }
            }
        });

        let model = Arc::new(RwLock::new(ResourceModel::new()));
        Self {
            client: ManagementClient::new(sender, model, registry),
            state,
            _handle: handle,
        }
    }

    pub fn client(&self) -> ManagementClient {
        self.client.clone()
    }

    /// Expects one `Execute` request.
    pub fn expect_execute(&self) -> ExecuteExpectationBuilder {
        ExecuteExpectationBuilder {
            state: self.state.clone(),
        }
    }

    /// Operation lists received so far, in arrival order.
    pub fn received(&self) -> Vec<Vec<Operation>> {
        self.state.lock().received.clone()
    }

    /// Panics if an expectation is left over or a request arrived unexpectedly.
    pub fn verify(&self) {
        let state = self.state.lock();
        if !state.expectations.is_empty() {
            panic!("Not all expectations were met. {} remaining", state.expectations.len());
        }
        if state.unexpected > 0 {
            panic!("{} unexpected request(s)", state.unexpected);
        }
    }
}

impl Default for MockController {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `Execute` expectations.
pub struct ExecuteExpectationBuilder {
    state: Arc<Mutex<MockState>>,
}

impl ExecuteExpectationBuilder {
    pub fn return_ok(self, results: Vec<OperationResult>) {
        self.state.lock().expectations.push_back(Expectation {
            response: Ok(results),
        });
    }

    pub fn return_err(self, error: impl Into<super::error::ManagementError>) {
        self.state.lock().expectations.push_back(Expectation {
            response: Err(error.into()),
        });
    }
}

// =============================================================================
// RAW CHANNEL HELPERS
// =============================================================================

/// Creates a client and the receiver its requests arrive on.
pub fn create_mock_client(buffer_size: usize) -> (ManagementClient, mpsc::Receiver<ControllerRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    let model = Arc::new(RwLock::new(ResourceModel::new()));
    let client = ManagementClient::new(sender, model, Arc::new(OperationRegistry::new()));
    (client, receiver)
}

/// The next `Execute` request, if that is what arrives.
#[allow(clippy::type_complexity)]
pub async fn expect_execute(
    receiver: &mut mpsc::Receiver<ControllerRequest>,
) -> Option<(
    Vec<Operation>,
    Caller,
    ExecutionMode,
    oneshot::Sender<ManagementResult<Vec<OperationResult>>>,
)> {
    match receiver.recv().await {
        Some(ControllerRequest::Execute {
            operations,
            caller,
            mode,
            respond_to,
        }) => Some((operations, caller, mode, respond_to)),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::error::{ManagementError, StructuralError};
    use crate::framework::model::{address, Parameters};

    #[tokio::test]
    async fn test_mock_client() {
        let (client, mut receiver) = create_mock_client(10);

        let task = tokio::spawn(async move {
            client
                .invoke(address(&[("subsystem", "ejb3")]), "add", Parameters::new())
                .await
        });

        let (operations, caller, mode, responder) =
            expect_execute(&mut receiver).await.expect("Expected Execute request");
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].name, "add");
        assert_eq!(caller, Caller::Operator);
        assert_eq!(mode, ExecutionMode::Commit);
        responder.send(Ok(vec![OperationResult::Undefined])).unwrap();

        assert_eq!(task.await.unwrap(), Ok(OperationResult::Undefined));
    }

    #[tokio::test]
    async fn test_mock_controller_with_expectations() {
        let mock = MockController::new();
        mock.expect_execute().return_ok(vec![OperationResult::Undefined]);
        mock.expect_execute()
            .return_err(StructuralError::DuplicateResource("/subsystem=ejb3".into()));

        let client = mock.client();
        let root = address(&[("subsystem", "ejb3")]);
        client.invoke(root.clone(), "add", Parameters::new()).await.unwrap();
        let err = client.invoke(root, "add", Parameters::new()).await.unwrap_err();
        assert!(matches!(err, ManagementError::Structural(StructuralError::DuplicateResource(_))));

        assert_eq!(mock.received().len(), 2);
        mock.verify();
    }
}
