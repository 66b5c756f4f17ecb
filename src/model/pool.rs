use crate::framework::{ModelValue, Parameters};
use crate::subsystem::{MAX_POOL_SIZE, TIMEOUT, TIMEOUT_UNIT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Unit of a pool's instance acquisition timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeoutUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    #[default]
    Minutes,
    Hours,
    Days,
}

impl TimeoutUnit {
    pub const ALL: [TimeoutUnit; 7] = [
        TimeoutUnit::Nanoseconds,
        TimeoutUnit::Microseconds,
        TimeoutUnit::Milliseconds,
        TimeoutUnit::Seconds,
        TimeoutUnit::Minutes,
        TimeoutUnit::Hours,
        TimeoutUnit::Days,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeoutUnit::Nanoseconds => "NANOSECONDS",
            TimeoutUnit::Microseconds => "MICROSECONDS",
            TimeoutUnit::Milliseconds => "MILLISECONDS",
            TimeoutUnit::Seconds => "SECONDS",
            TimeoutUnit::Minutes => "MINUTES",
            TimeoutUnit::Hours => "HOURS",
            TimeoutUnit::Days => "DAYS",
        }
    }
}

impl fmt::Display for TimeoutUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeoutUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeoutUnit::ALL
            .into_iter()
            .find(|unit| unit.as_str() == s)
            .ok_or_else(|| format!("unknown timeout unit '{}'", s))
    }
}

/// A strict-max bean instance pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StrictMaxPool {
    pub name: String,
    pub max_pool_size: i64,
    pub timeout: i64,
    pub timeout_unit: TimeoutUnit,
}

impl StrictMaxPool {
    /// A pool with the default timeout (5 minutes).
    pub fn new(name: impl Into<String>, max_pool_size: i64) -> Self {
        Self {
            name: name.into(),
            max_pool_size,
            timeout: 5,
            timeout_unit: TimeoutUnit::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: i64, unit: TimeoutUnit) -> Self {
        self.timeout = timeout;
        self.timeout_unit = unit;
        self
    }

    /// `add` parameters for this pool.
    pub fn to_parameters(&self) -> Parameters {
        Parameters::from([
            (MAX_POOL_SIZE.to_string(), ModelValue::Int(self.max_pool_size)),
            (TIMEOUT.to_string(), ModelValue::Int(self.timeout)),
            (
                TIMEOUT_UNIT.to_string(),
                ModelValue::String(self.timeout_unit.as_str().to_string()),
            ),
        ])
    }

    /// Builds the pool from resolved attributes (`read-resource` output).
    pub fn from_attributes(
        name: impl Into<String>,
        attributes: &BTreeMap<String, ModelValue>,
    ) -> Result<Self, String> {
        let int = |key: &str| {
            attributes
                .get(key)
                .and_then(ModelValue::as_int)
                .ok_or_else(|| format!("missing integer attribute '{}'", key))
        };
        let timeout_unit = match attributes.get(TIMEOUT_UNIT).and_then(ModelValue::as_str) {
            Some(unit) => unit.parse()?,
            None => TimeoutUnit::default(),
        };
        Ok(Self {
            name: name.into(),
            max_pool_size: int(MAX_POOL_SIZE)?,
            timeout: int(TIMEOUT)?,
            timeout_unit,
        })
    }
}
