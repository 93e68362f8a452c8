use crate::booking::{Exec, PoolScope};
use crate::plan::{PlanError, PlannedScenario, RunPlan, DEFAULT_SCENARIO};
use crate::report::{ReportConfig, TextOptions};
use booker_core::{ExecutorConfig, Stage};
use clap::Parser;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Load test for the restful-booker API.
///
/// Flags override the plan loaded with `--config`, which overrides the defaults: the
/// `fetch-all` operation ramping to 100 VUs over 10s, holding for 30s and ramping down over 30s.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// JSON plan with one or more named scenarios.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(short, long)]
    pub base_url: Option<Url>,

    /// Ramp stage as `<duration>:<target>`, e.g. `10s:100`. Repeat for several stages.
    #[arg(short, long = "stage", value_name = "STAGE")]
    pub stages: Vec<Stage>,

    /// Operation the default scenario runs on every iteration.
    #[arg(short, long, value_enum)]
    pub exec: Option<Exec>,

    /// Run the default scenario with this many VUs sharing a fixed number of iterations.
    #[arg(long, conflicts_with = "stages")]
    pub vus: Option<usize>,

    /// Iterations shared by the `--vus` VUs.
    #[arg(long, conflicts_with = "stages")]
    pub iterations: Option<u64>,

    /// Cap the request rate of every scenario.
    #[arg(long)]
    pub max_rps: Option<NonZeroU32>,

    #[arg(long, value_enum)]
    pub pool_scope: Option<PoolScope>,

    /// Delete bookings still pending at the end of the run.
    #[arg(long)]
    pub cleanup: bool,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub password: Option<String>,

    /// Directory `summary.html` and `summary.json` are written to.
    #[arg(long)]
    pub summary_dir: Option<PathBuf>,

    /// Per request timeout, e.g. `30s`.
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    #[arg(long)]
    pub no_color: bool,
}

impl Cli {
    /// Layer the flags over the plan file (if any) and the defaults.
    pub fn into_plan(self) -> Result<RunPlan, PlanError> {
        let mut plan = match &self.config {
            Some(path) => RunPlan::load(path)?,
            None => RunPlan::default(),
        };

        if let Some(url) = self.base_url {
            plan.base_url = url.to_string();
        }

        let executor = if !self.stages.is_empty() {
            Some(ExecutorConfig::ramping(&self.stages))
        } else if self.vus.is_some() || self.iterations.is_some() {
            Some(ExecutorConfig::shared_iterations(
                self.vus.unwrap_or(1),
                self.iterations.unwrap_or(1),
            ))
        } else {
            None
        };

        // A scheduling flag describes a single scenario, replacing whatever the plan held.
        if let Some(executor) = executor {
            let exec = self.exec.unwrap_or_default();
            plan.scenarios.clear();
            plan.scenarios.insert(
                DEFAULT_SCENARIO.to_string(),
                PlannedScenario::new(exec, executor),
            );
        } else if let Some(exec) = self.exec {
            plan.scenarios
                .entry(DEFAULT_SCENARIO.to_string())
                .or_default()
                .exec = exec;
        }

        if let Some(max_rps) = self.max_rps {
            for scenario in plan.scenarios.values_mut() {
                scenario.max_rps = Some(max_rps);
            }
        }
        if let Some(scope) = self.pool_scope {
            plan.pool_scope = scope;
        }
        plan.cleanup |= self.cleanup;
        if let Some(username) = self.username {
            plan.credentials.username = username;
        }
        if let Some(password) = self.password {
            plan.credentials.password = password;
        }
        if let Some(dir) = self.summary_dir {
            plan.summary_dir = dir;
        }
        if let Some(timeout) = self.timeout {
            plan.timeout = timeout;
        }

        plan.validate()?;
        Ok(plan)
    }

    /// The plan plus where and how its reports are written.
    pub fn into_run(self) -> Result<(RunPlan, ReportConfig), PlanError> {
        let colors = !self.no_color;
        let plan = self.into_plan()?;
        let report = ReportConfig {
            dir: plan.summary_dir.clone(),
            stdout: true,
            text: TextOptions {
                colors,
                ..Default::default()
            },
        };
        Ok((plan, report))
    }
}
