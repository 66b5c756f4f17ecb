//! Configuration: TOML file plus `EJB3__*` environment overlay.
//!
//! ```toml
//! [controller]
//! queue_capacity = 32
//!
//! [codec]
//! downgrade_policy = "omit"   # or "reject" (default)
//! ```
//!
//! `EJB3__CODEC__DOWNGRADE_POLICY=omit` overrides the file.

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

/// What an older writer does with a value its schema cannot express.
///
/// Values equal to the version's default are always omitted silently; this
/// policy only applies to non-default values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DowngradePolicy {
    /// Fail the write with `UnsupportedForVersion`.
    #[default]
    Reject,
    /// Drop the value and log a warning.
    Omit,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Capacity of the controller's request queue.
    pub queue_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self { queue_capacity: 32 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub downgrade_policy: DowngradePolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ManagementConfig {
    pub controller: ControllerConfig,
    pub codec: CodecConfig,
}

impl ManagementConfig {
    fn builder() -> config::ConfigBuilder<config::builder::DefaultState> {
        Config::builder()
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder
            .add_source(
                Environment::with_prefix("EJB3")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Self>()?
            .validated()
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.controller.queue_capacity == 0 {
            return Err(ConfigError::Message(
                "controller.queue_capacity must be at least 1".into(),
            ));
        }
        Ok(self)
    }

    /// Loads from an optional TOML file, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Self::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        Self::finish(builder)
    }

    /// Loads from TOML text, then the environment.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Self::finish(Self::builder().add_source(File::from_str(text, FileFormat::Toml)))
    }
}
