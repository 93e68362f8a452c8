//! What a run does: which scenarios, against which service, with which settings.
//!
//! A plan starts from [`RunPlan::default`], may be loaded from a JSON file, and is finally
//! adjusted by command line flags (see [`crate::cli`]).
use crate::booking::{Credentials, Exec, PoolScope};
use booker_core::{ConfigError, ExecutorConfig, HumanDuration, ScenarioConfig, DEFAULT_REQUEST_TIMEOUT};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://restful-booker.herokuapp.com";
pub const DEFAULT_SCENARIO: &str = "default";

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Failed to read plan {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid plan: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid base URL `{url}`: {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunPlan {
    pub base_url: String,
    pub credentials: Credentials,
    pub pool_scope: PoolScope,
    /// Delete bookings still pending once every scenario is done.
    pub cleanup: bool,
    #[serde_as(as = "HumanDuration")]
    pub timeout: Duration,
    pub summary_dir: PathBuf,
    pub scenarios: BTreeMap<String, PlannedScenario>,
}

/// One named scenario: the operation its VUs run and how they are scheduled.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlannedScenario {
    #[serde(default)]
    pub exec: Exec,
    #[serde(flatten)]
    pub executor: ExecutorConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rps: Option<NonZeroU32>,
}

impl PlannedScenario {
    pub fn new(exec: Exec, executor: ExecutorConfig) -> Self {
        Self {
            exec,
            executor,
            max_rps: None,
        }
    }

    pub fn config(&self, name: &str) -> ScenarioConfig {
        ScenarioConfig {
            name: name.to_string(),
            executor: self.executor.clone(),
            max_rps: self.max_rps,
        }
    }
}

impl Default for RunPlan {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials: Credentials::default(),
            pool_scope: PoolScope::default(),
            cleanup: false,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            summary_dir: PathBuf::from("."),
            scenarios: BTreeMap::from([(DEFAULT_SCENARIO.to_string(), PlannedScenario::default())]),
        }
    }
}

impl RunPlan {
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let contents = std::fs::read_to_string(path).map_err(|source| PlanError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn base_url(&self) -> Result<Url, PlanError> {
        Url::parse(&self.base_url).map_err(|source| PlanError::BaseUrl {
            url: self.base_url.clone(),
            source,
        })
    }

    /// Executor config of every scenario, alongside the operation it runs.
    pub fn scenario_configs(&self) -> Vec<(ScenarioConfig, Exec)> {
        self.scenarios
            .iter()
            .map(|(name, scenario)| (scenario.config(name), scenario.exec))
            .collect()
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if self.scenarios.is_empty() {
            return Err(ConfigError::NoScenarios.into());
        }
        for (config, _) in self.scenario_configs() {
            config.validate()?;
        }
        self.base_url()?;
        Ok(())
    }
}
