//! # Management Host
//!
//! Start-up and document handling around the model controller.
//!
//! [`ManagementHost::start`] runs every extension's registration into one
//! operation registry and codec registry, then spawns the controller task.
//! After that the host is the entry point for operator `invoke` calls and for
//! whole documents.
//!
//! A document goes through [`ManagementHost::load_document`] as one unit: it is
//! parsed into operations (`Parsing`), the operations are staged as a single
//! transaction (`OperationsStaged`), and the load ends `Committed` or
//! `RolledBack`. A parse failure rolls back before anything is staged. The
//! history of states is kept in the returned [`DocumentLoad`].
//!
//! [`ManagementHost::shutdown`] closes the controller queue and waits for the
//! task to finish.

use crate::config::ManagementConfig;
use crate::framework::handler::register_global_operations;
use crate::framework::{
    Caller, CodecRegistry, ExecutionMode, Extension, ExtensionContext, FormatError,
    ManagementClient, ManagementError, ManagementResult, ModelController, Operation,
    OperationResult, Parameters, PathAddress, SchemaVersion,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Progress of a document through [`ManagementHost::load_document`].
///
/// ```text
/// Unparsed ──► Parsing ──► OperationsStaged ──► Committed
///                 │                 │
///                 └─────────────────┴──► RolledBack
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    Unparsed,
    Parsing,
    OperationsStaged,
    /// Every operation was applied.
    Committed,
    /// Parsing or an operation failed; the model is as it was before parsing.
    RolledBack,
}

/// Outcome of loading one document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentLoad {
    /// States passed through, ending with the terminal one.
    pub history: Vec<DocumentState>,
    pub version: Option<SchemaVersion>,
    pub operations: Vec<Operation>,
    pub error: Option<ManagementError>,
}

impl DocumentLoad {
    fn new() -> Self {
        Self {
            history: vec![DocumentState::Unparsed],
            version: None,
            operations: Vec::new(),
            error: None,
        }
    }

    fn advance(&mut self, state: DocumentState) {
        debug!(?state, "Document state");
        self.history.push(state);
    }

    fn fail(mut self, e: ManagementError) -> Self {
        warn!(error = %e, "Document rejected");
        self.advance(DocumentState::RolledBack);
        self.error = Some(e);
        self
    }

    pub fn state(&self) -> DocumentState {
        self.history
            .last()
            .copied()
            .unwrap_or(DocumentState::Unparsed)
    }

    pub fn is_committed(&self) -> bool {
        self.state() == DocumentState::Committed
    }
}

/// The management host: wires extensions into a registry, runs the controller
/// and exposes the operation and document interfaces.
///
/// # Example
///
/// ```ignore
/// let host = ManagementHost::start(&ManagementConfig::default(), vec![Box::new(Ejb3Extension)])?;
///
/// let load = host.load_document(&xml).await;
/// assert!(load.is_committed());
/// let persisted = host.write_default()?;
///
/// host.shutdown().await?;
/// ```
pub struct ManagementHost {
    client: ManagementClient,
    codecs: Arc<CodecRegistry>,
    handle: tokio::task::JoinHandle<()>,
}

impl ManagementHost {
    /// Runs every extension's registration, then spawns the controller.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        config: &ManagementConfig,
        extensions: Vec<Box<dyn Extension>>,
    ) -> ManagementResult<Self> {
        let mut context = ExtensionContext::new(config.codec.clone());
        register_global_operations(context.registry_mut())?;
        for extension in &extensions {
            extension.initialize(&mut context)?;
            extension.initialize_parsers(&mut context)?;
        }
        let (registry, codecs) = context.into_parts();
        info!(
            extensions = extensions.len(),
            versions = ?codecs.versions(),
            policy = ?config.codec.downgrade_policy,
            "Extensions initialized"
        );

        let (controller, client) =
            ModelController::new(config.controller.queue_capacity, Arc::new(registry));
        let handle = tokio::spawn(controller.run());

        Ok(Self {
            client,
            codecs: Arc::new(codecs),
            handle,
        })
    }

    pub fn client(&self) -> ManagementClient {
        self.client.clone()
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    /// `invoke(address, operation, parameters)` on behalf of an operator.
    pub async fn invoke(
        &self,
        address: PathAddress,
        name: &str,
        parameters: Parameters,
    ) -> ManagementResult<OperationResult> {
        self.client.invoke(address, name, parameters).await
    }

    /// Translates a document of `version` into operations without touching the model.
    pub fn parse(&self, version: SchemaVersion, document: &str) -> ManagementResult<Vec<Operation>> {
        self.codecs.parse(version, document)
    }

    /// Like [`parse`](Self::parse), picking the codec from the root namespace.
    pub fn parse_document(&self, document: &str) -> ManagementResult<(SchemaVersion, Vec<Operation>)> {
        self.codecs.parse_document(document)
    }

    /// Parses `document` and applies it as one transaction.
    pub async fn load_document(&self, document: &str) -> DocumentLoad {
        let mut load = DocumentLoad::new();
        load.advance(DocumentState::Parsing);
        let (version, operations) = match self.codecs.parse_document(document) {
            Ok(parsed) => parsed,
            Err(e) => return load.fail(e),
        };
        load.version = Some(version);
        load.operations = operations.clone();
        load.advance(DocumentState::OperationsStaged);

        match self
            .client
            .execute(operations, Caller::Internal, ExecutionMode::Commit)
            .await
        {
            Ok(_) => {
                load.advance(DocumentState::Committed);
                info!(%version, operations = load.operations.len(), "Document committed");
                load
            }
            Err(e) => load.fail(e),
        }
    }

    /// Parses `document` and runs it as a dry run; the model is never changed.
    pub async fn validate_document(&self, document: &str) -> ManagementResult<Vec<OperationResult>> {
        let (_, operations) = self.codecs.parse_document(document)?;
        self.client
            .execute(operations, Caller::Internal, ExecutionMode::DryRun)
            .await
    }

    /// The current model as operations, in rebuild order.
    pub fn describe(&self) -> ManagementResult<Vec<Operation>> {
        self.client.describe_all()
    }

    /// Renders the current model as a document of `version`.
    pub fn write(&self, version: SchemaVersion) -> ManagementResult<String> {
        let description = self.describe()?;
        self.codecs.write(version, &description)
    }

    /// Renders the current model with the designated default writer.
    pub fn write_default(&self) -> ManagementResult<String> {
        let version = self
            .codecs
            .default_writer()
            .ok_or_else(|| FormatError::UnknownVersion("default".into()))?;
        self.write(version)
    }

    /// Closes the controller's queue and waits for it to drain.
    ///
    /// Clients obtained from [`client`](Self::client) keep the queue open and
    /// must be dropped first.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down management host...");
        drop(self.client);
        if let Err(e) = self.handle.await {
            error!("Controller task failed: {:?}", e);
            return Err(format!("Controller task failed: {:?}", e));
        }
        info!("Management host shutdown complete.");
        Ok(())
    }
}
