use std::path::PathBuf;

use anyhow::{Context, Result};
use formstate_cli::replay::{Mismatch, ReplayReport, check, replay};
use formstate_cli::scenario::Scenario;
use serde_json::json;
use tokio::runtime::Runtime;
use tracing::{error, info_span};

use crate::cli::{CheckArgs, ReplayArgs};
use crate::summary::print_report;

/// Result of checking one scenario file.
pub struct CheckOutcome {
    pub path: PathBuf,
    pub scenario: Option<String>,
    pub steps: usize,
    pub mismatches: Vec<Mismatch>,
    /// Load or replay failure.
    pub error: Option<String>,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        self.error.is_none() && self.mismatches.is_empty()
    }
}

fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("start async runtime")
}

fn expectations(scenario: &Scenario, report: &ReplayReport) -> Vec<Mismatch> {
    scenario
        .expect
        .as_ref()
        .map(|expect| check(report, expect))
        .unwrap_or_default()
}

/// Replay one scenario. Returns whether its expectations held.
pub fn run_replay(args: &ReplayArgs) -> Result<bool> {
    let scenario = Scenario::load(&args.scenario)?;
    let span = info_span!("replay", scenario = %scenario.name);
    let _guard = span.enter();

    let report = runtime()?.block_on(replay(&scenario))?;
    let mismatches = expectations(&scenario, &report);
    if args.json {
        let output = json!({ "report": report, "mismatches": mismatches });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_report(&report, &mismatches);
    }
    Ok(mismatches.is_empty())
}

/// Replay every scenario; a failing one does not stop the rest.
pub fn run_check(args: &CheckArgs) -> Result<Vec<CheckOutcome>> {
    let runtime = runtime()?;
    let outcomes = args
        .scenarios
        .iter()
        .map(|path| {
            let result = Scenario::load(path).and_then(|scenario| {
                let span = info_span!("check", scenario = %scenario.name);
                let _guard = span.enter();
                let report = runtime.block_on(replay(&scenario))?;
                Ok((expectations(&scenario, &report), scenario))
            });
            match result {
                Ok((mismatches, scenario)) => CheckOutcome {
                    path: path.clone(),
                    steps: scenario.steps.len(),
                    scenario: Some(scenario.name),
                    mismatches,
                    error: None,
                },
                Err(err) => {
                    error!(path = %path.display(), "scenario failed: {err:#}");
                    CheckOutcome {
                        path: path.clone(),
                        scenario: None,
                        steps: 0,
                        mismatches: Vec::new(),
                        error: Some(format!("{err:#}")),
                    }
                }
            }
        })
        .collect();
    Ok(outcomes)
}
