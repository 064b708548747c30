//! PA -> PSA Transition
//!
//! Adds a voting, data-bearing member to a Primary-Arbiter set in two
//! reconfigs so that every intermediate state is safe:
//!
//! 1. the new member gets `{ votes: 1, priority: 0 }`. A zero-priority
//!    voter cannot win an election, so adding its vote cannot by itself
//!    cause a failover.
//! 2. only if the requested priority is not 0, a second reconfig restores
//!    it.
//!
//! A failure in step 2 leaves the cluster in the step-1 state. There is no
//! rollback; the operator gets the exact command to finish by hand.

use std::sync::Arc;

use serde_json::Value;

use super::client::ProgressNotifier;
use super::errors::{ReplSetError, ReplSetResult};
use super::repository::ConfigRepository;
use super::retry::BackoffRetryExecutor;
use super::types::{Document, MemberConfig, ReplicaSetConfig};
use super::validator::ReconfigInvariantValidator;
use crate::observability::{log_event_with_fields, Event, ReconfigMetrics};

/// The reconfigs a PSA transition will submit.
#[derive(Debug, Clone, PartialEq)]
pub struct PsaPlan {
    /// Index of the new member in the proposed config.
    pub index: usize,
    pub member_id: i64,
    /// Priority the caller asked for. `None` is the server default.
    pub requested_priority: Option<f64>,
    /// Target member at `{ votes: 1, priority: 0 }`.
    pub phase_one: ReplicaSetConfig,
    /// Target member at its requested priority; absent when that is 0.
    pub phase_two: Option<ReplicaSetConfig>,
    /// Non-fatal findings for the operator.
    pub warnings: Vec<String>,
}

impl PsaPlan {
    /// Number of reconfigs the plan submits.
    pub fn reconfig_count(&self) -> usize {
        if self.phase_two.is_some() {
            2
        } else {
            1
        }
    }
}

fn priority_display(priority: Option<f64>) -> String {
    priority.map_or_else(|| "undefined".to_string(), |p| p.to_string())
}

fn with_member_at(
    config: &ReplicaSetConfig,
    index: usize,
    edit: impl FnOnce(&mut MemberConfig),
) -> ReplicaSetConfig {
    let mut out = config.clone();
    if let Some(member) = out.members.get_mut(index) {
        edit(member);
    }
    out
}

/// Render the manual follow-up for a failed second reconfig.
pub fn attempted_command(config: &ReplicaSetConfig, options: &Document) -> ReplSetResult<String> {
    let config = serde_json::to_string_pretty(&Value::Object(config.to_document()?))?;
    let options = serde_json::to_string(options)?;
    Ok(format!("rs.reconfig({}, {})", config, options))
}

/// Plans and runs PA -> PSA transitions.
#[derive(Clone)]
pub struct PsaTransitionPlanner {
    repository: ConfigRepository,
    executor: BackoffRetryExecutor,
    notifier: Arc<dyn ProgressNotifier>,
    metrics: Arc<ReconfigMetrics>,
}

impl PsaTransitionPlanner {
    pub fn new(
        repository: ConfigRepository,
        executor: BackoffRetryExecutor,
        notifier: Arc<dyn ProgressNotifier>,
        metrics: Arc<ReconfigMetrics>,
    ) -> Self {
        Self {
            repository,
            executor,
            notifier,
            metrics,
        }
    }

    /// Checks that need only the proposed config.
    pub fn check_proposed(proposed: &ReplicaSetConfig, index: usize) -> ReplSetResult<&MemberConfig> {
        let member = ReconfigInvariantValidator::require_member(proposed, index)?;
        ReconfigInvariantValidator::require_voting(member, index)?;
        Ok(member)
    }

    /// Build the plan from the proposed and current configs. Pure.
    pub fn plan(
        proposed: &ReplicaSetConfig,
        index: usize,
        current: &ReplicaSetConfig,
    ) -> ReplSetResult<PsaPlan> {
        let target = Self::check_proposed(proposed, index)?;
        ReconfigInvariantValidator::require_not_voting(current, target, index)?;

        let mut warnings = Vec::new();
        if ReconfigInvariantValidator::host_collision(current, target).is_some() {
            warnings.push(format!(
                "Warning: Node at index {} has {{ host: \"{}\" }}, which is also present in the old config, but with a different _id field.",
                index, target.host
            ));
        }

        let requested_priority = target.priority;
        let phase_one = with_member_at(proposed, index, |m| {
            m.votes = Some(1);
            m.priority = Some(0.0);
        });
        ReconfigInvariantValidator::require_single_vote_change(current, &phase_one)?;

        let phase_two = if requested_priority == Some(0.0) {
            None
        } else {
            Some(with_member_at(proposed, index, |m| {
                m.votes = Some(1);
                m.priority = requested_priority;
            }))
        };

        Ok(PsaPlan {
            index,
            member_id: target.id,
            requested_priority,
            phase_one,
            phase_two,
            warnings,
        })
    }

    /// Validate, then submit phase 1 and, if needed, phase 2.
    ///
    /// Returns the reply of the last reconfig submitted.
    pub async fn execute(
        &self,
        index: usize,
        proposed: &ReplicaSetConfig,
        options: &Document,
    ) -> ReplSetResult<Document> {
        Self::check_proposed(proposed, index)?;

        let current = self.repository.get_current_config().await?;
        let plan = Self::plan(proposed, index, &current)?;

        for warning in &plan.warnings {
            log_event_with_fields(Event::HostCollision, &[("message", warning)]);
            self.notifier.print(warning);
        }

        self.metrics.increment_psa_transitions();
        let index_field = index.to_string();
        let member_field = plan.member_id.to_string();

        log_event_with_fields(
            Event::PsaPhaseOne,
            &[("index", &index_field), ("member", &member_field)],
        );
        self.notifier.print(&format!(
            "Running first reconfig to give member at index {} {{ votes: 1, priority: 0 }}",
            index
        ));
        let phase_one = plan.phase_one;
        let first = self
            .executor
            .reconfig(|current| current.overlay(&phase_one), options)
            .await?;

        let Some(phase_two) = plan.phase_two else {
            self.notifier.print("No second reconfig necessary because .priority = 0");
            log_event_with_fields(Event::PsaComplete, &[("index", &index_field), ("reconfigs", "1")]);
            return Ok(first);
        };

        let priority = priority_display(plan.requested_priority);
        log_event_with_fields(
            Event::PsaPhaseTwo,
            &[("index", &index_field), ("priority", &priority)],
        );
        self.notifier.print(&format!(
            "Running second reconfig to give member at index {} {{ priority: {} }}",
            index, priority
        ));

        match self
            .executor
            .reconfig(|current| current.overlay(&phase_two), options)
            .await
        {
            Ok(second) => {
                log_event_with_fields(Event::PsaComplete, &[("index", &index_field), ("reconfigs", "2")]);
                Ok(second)
            }
            Err(err) => {
                self.metrics.increment_psa_partial_transitions();
                let attempted = attempted_command(&phase_two, options)?;
                self.notifier.print("Second reconfig did not succeed, giving up");
                self.notifier.print(&format!("Attempted command: {}", attempted));
                log_event_with_fields(
                    Event::PsaPartial,
                    &[("error", &err.to_string()), ("attempted_command", &attempted)],
                );
                Err(ReplSetError::PartialTransition {
                    attempted_command: attempted,
                    source: Box::new(err),
                })
            }
        }
    }
}
