//! CLI command implementations
//!
//! Every command is offline: it reads config documents from files, runs the
//! same planning code the orchestrator uses, and prints what would be
//! submitted. Nothing is sent to a cluster.

use std::path::Path;

use serde_json::{json, Value};

use crate::replset::{
    plan_add, plan_remove, AdminCommand, Document, MembershipChange, OrchestratorSettings,
    PsaTransitionPlanner, ReplicaSetConfig, RetryPolicy, STILL_WORKING_NOTICE,
};

use super::args::Command;
use super::errors::CliResult;
use super::io::{read_config, write_error, write_response};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    match run_command(cli.command) {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Run a command and return its JSON result
pub fn run_command(cmd: Command) -> CliResult<Value> {
    match cmd {
        Command::PlanPsa {
            current,
            proposed,
            index,
        } => plan_psa(&current, &proposed, index),
        Command::PlanAdd {
            current,
            host,
            arbiter,
        } => plan_add_member(&current, &host, arbiter),
        Command::PlanRemove { current, host } => plan_remove_member(&current, &host),
        Command::Schedule { settings } => schedule(settings.as_deref()),
    }
}

/// Validate a PA -> PSA transition and show both phases.
///
/// Versions shown are those the submitter would assign against `current`
/// if nothing else changes the config in between.
pub fn plan_psa(current_path: &Path, proposed_path: &Path, index: usize) -> CliResult<Value> {
    let current = read_config(current_path)?;
    let proposed = read_config(proposed_path)?;

    let plan = PsaTransitionPlanner::plan(&proposed, index, &current)?;

    let phase_one = next_on(&current, &plan.phase_one);
    let phase_two = match &plan.phase_two {
        Some(target) => Value::Object(next_on(&phase_one, target).to_document()?),
        None => Value::Null,
    };

    Ok(json!({
        "index": plan.index,
        "memberId": plan.member_id,
        "reconfigs": plan.reconfig_count(),
        "phaseOne": phase_one.to_document()?,
        "phaseTwo": phase_two,
        "warnings": plan.warnings,
    }))
}

fn next_on(snapshot: &ReplicaSetConfig, target: &ReplicaSetConfig) -> ReplicaSetConfig {
    let mut config = snapshot.overlay(target);
    config.version = snapshot.next_version();
    config
}

/// Show the command `add` would submit.
pub fn plan_add_member(current_path: &Path, host: &str, arbiter: bool) -> CliResult<Value> {
    let current = read_config(current_path)?;
    let change = plan_add(&current, host.into(), arbiter)?;
    change_response(change)
}

/// Show the command `remove` would submit.
pub fn plan_remove_member(current_path: &Path, host: &str) -> CliResult<Value> {
    let current = read_config(current_path)?;
    let change = plan_remove(&current, host)?;
    change_response(change)
}

fn change_response(change: MembershipChange) -> CliResult<Value> {
    let member = serde_json::to_value(&change.member)?;
    let command = AdminCommand::Reconfig {
        config: change.config,
        options: Document::new(),
    }
    .to_document()?;

    Ok(json!({
        "member": member,
        "command": command,
        "warnings": change.warnings,
    }))
}

/// Print the sleeps and notices of a permanently failing reconfig.
pub fn schedule(settings_path: Option<&Path>) -> CliResult<Value> {
    let policy = match settings_path {
        Some(path) => OrchestratorSettings::load(path)?.retry,
        None => RetryPolicy::default(),
    };

    let steps = policy.schedule();
    let total_ms: f64 = steps.iter().map(|s| s.sleep_ms).sum();
    let steps: Vec<Value> = steps
        .iter()
        .map(|step| {
            json!({
                "beforeAttempt": step.before_attempt,
                "sleepMs": step.sleep_ms.round(),
                "notice": step.notify.then_some(STILL_WORKING_NOTICE),
            })
        })
        .collect();

    Ok(json!({
        "policy": policy,
        "steps": steps,
        "totalSleepMs": total_ms.round(),
    }))
}
