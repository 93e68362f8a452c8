use crate::{DEFAULT_GRACEFUL_RAMP_DOWN, DEFAULT_MAX_DURATION, DEFAULT_STAGES};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

serde_with::serde_conv!(
    /// Serializes a `Duration` as a human readable string such as `"10s"` or `"1m 30s"`.
    pub HumanDuration,
    Duration,
    |duration: &Duration| humantime::format_duration(*duration).to_string(),
    |value: String| humantime::parse_duration(&value)
);

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid stage `{0}`; expected `<duration>:<target>` such as `10s:100`")]
    InvalidStage(String),

    #[error("Scenario `{0}` has no stages")]
    NoStages(String),

    #[error("Scenario `{0}` needs at least one VU")]
    NoVus(String),

    #[error("Scenario `{0}` needs at least one iteration")]
    NoIterations(String),

    #[error("No scenarios configured")]
    NoScenarios,
}

/// A single ramp stage: move linearly to `target` VUs over `duration`.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    #[serde_as(as = "HumanDuration")]
    pub duration: Duration,
    pub target: usize,
}

impl Stage {
    pub const fn new(duration: Duration, target: usize) -> Self {
        Self { duration, target }
    }
}

impl FromStr for Stage {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidStage(s.to_string());
        let (duration, target) = s.split_once(':').ok_or_else(invalid)?;
        let duration = humantime::parse_duration(duration.trim()).map_err(|_| invalid())?;
        let target = target.trim().parse().map_err(|_| invalid())?;
        Ok(Stage { duration, target })
    }
}

/// How VUs are scheduled for a scenario.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "executor", rename_all = "kebab-case")]
pub enum ExecutorConfig {
    RampingVus {
        #[serde(default)]
        start_vus: usize,
        stages: Vec<Stage>,
        #[serde_as(as = "HumanDuration")]
        #[serde(default = "default_graceful_ramp_down")]
        graceful_ramp_down: Duration,
    },
    SharedIterations {
        vus: usize,
        iterations: u64,
        #[serde_as(as = "HumanDuration")]
        #[serde(default = "default_max_duration")]
        max_duration: Duration,
    },
}

impl ExecutorConfig {
    pub fn ramping(stages: &[Stage]) -> Self {
        ExecutorConfig::RampingVus {
            start_vus: 0,
            stages: stages.to_vec(),
            graceful_ramp_down: DEFAULT_GRACEFUL_RAMP_DOWN,
        }
    }

    pub fn shared_iterations(vus: usize, iterations: u64) -> Self {
        ExecutorConfig::SharedIterations {
            vus,
            iterations,
            max_duration: DEFAULT_MAX_DURATION,
        }
    }

    /// Largest number of VUs this executor will run at once.
    pub fn max_vus(&self) -> usize {
        match self {
            ExecutorConfig::RampingVus {
                start_vus, stages, ..
            } => stages
                .iter()
                .map(|s| s.target)
                .fold(*start_vus, usize::max),
            ExecutorConfig::SharedIterations {
                vus, iterations, ..
            } => (*vus).min(usize::try_from(*iterations).unwrap_or(usize::MAX)),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::ramping(&DEFAULT_STAGES)
    }
}

fn default_graceful_ramp_down() -> Duration {
    DEFAULT_GRACEFUL_RAMP_DOWN
}

fn default_max_duration() -> Duration {
    DEFAULT_MAX_DURATION
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub executor: ExecutorConfig,
    pub max_rps: Option<NonZeroU32>,
}

impl ScenarioConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            executor: ExecutorConfig::default(),
            max_rps: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.executor {
            ExecutorConfig::RampingVus { stages, .. } if stages.is_empty() => {
                Err(ConfigError::NoStages(self.name.clone()))
            }
            ExecutorConfig::SharedIterations { vus: 0, .. } => {
                Err(ConfigError::NoVus(self.name.clone()))
            }
            ExecutorConfig::SharedIterations { iterations: 0, .. } => {
                Err(ConfigError::NoIterations(self.name.clone()))
            }
            _ => Ok(()),
        }
    }
}
