//! Backoff Retry Executor
//!
//! Submits a reconfig against a moving target version:
//! - every attempt re-reads the current config and derives its version
//!   from that read, never from an earlier attempt
//! - the caller supplies a pure builder `current -> target`
//! - transient failures sleep, grow the interval by the policy multiplier
//!   (uncapped) and try again, up to `max_attempts`
//! - once the grown interval exceeds the notice threshold, the operator is
//!   told the reconfig is still being worked on
//! - after the last attempt the final error is returned unchanged

use std::sync::Arc;

use super::client::{ClusterAdminClient, ProgressNotifier};
use super::command::AdminCommand;
use super::errors::{ReplSetError, ReplSetResult};
use super::policy::{millis_to_duration, RetryPolicy};
use super::repository::ConfigRepository;
use super::types::{Document, ReplicaSetConfig};
use super::validator::ReconfigInvariantValidator;
use crate::observability::{log_event_with_fields, Event, ReconfigMetrics};

/// Message printed when a retry starts after a long backoff.
pub const STILL_WORKING_NOTICE: &str = "Reconfig did not succeed yet, starting new attempt...";

/// Retrying reconfig submitter.
#[derive(Clone)]
pub struct BackoffRetryExecutor {
    client: Arc<dyn ClusterAdminClient>,
    repository: ConfigRepository,
    notifier: Arc<dyn ProgressNotifier>,
    policy: RetryPolicy,
    metrics: Arc<ReconfigMetrics>,
}

impl BackoffRetryExecutor {
    pub fn new(
        client: Arc<dyn ClusterAdminClient>,
        repository: ConfigRepository,
        notifier: Arc<dyn ProgressNotifier>,
        policy: RetryPolicy,
        metrics: Arc<ReconfigMetrics>,
    ) -> Self {
        Self {
            client,
            repository,
            notifier,
            policy,
            metrics,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Submit the configuration produced by `build` until it is accepted,
    /// a non-retryable error occurs, or the attempt budget is spent.
    pub async fn reconfig<F>(&self, build: F, options: &Document) -> ReplSetResult<Document>
    where
        F: Fn(&ReplicaSetConfig) -> ReplicaSetConfig,
    {
        let mut backoff = self.policy.backoff();
        let mut last_error = None;

        for attempt in 1..=self.policy.max_attempts {
            if attempt > 1 {
                let (sleep_ms, notify) = backoff.advance();
                self.notifier.sleep(millis_to_duration(sleep_ms)).await;
                if notify {
                    self.notifier.print(STILL_WORKING_NOTICE);
                }
            }

            match self.attempt(&build, options, attempt).await {
                Ok(reply) => {
                    self.metrics.increment_reconfig_successes();
                    return Ok(reply);
                }
                Err(err) if !err.is_retryable() => {
                    self.metrics.increment_reconfig_failures();
                    let attempt = attempt.to_string();
                    log_event_with_fields(
                        Event::ReconfigAborted,
                        &[("attempt", &attempt), ("error", &err.to_string())],
                    );
                    return Err(err);
                }
                Err(err) => {
                    if attempt < self.policy.max_attempts {
                        self.metrics.increment_reconfig_retries();
                        let attempt = attempt.to_string();
                        let next_sleep = format!("{:.0}", backoff.current_ms());
                        log_event_with_fields(
                            Event::ReconfigRetry,
                            &[
                                ("attempt", &attempt),
                                ("error", &err.to_string()),
                                ("next_sleep_ms", &next_sleep),
                            ],
                        );
                    }
                    last_error = Some(err);
                }
            }
        }

        self.metrics.increment_reconfig_failures();
        let attempts = self.policy.max_attempts.to_string();
        let err = last_error.unwrap_or_else(|| {
            ReplSetError::Settings("retry policy allows no reconfig attempts".into())
        });
        log_event_with_fields(
            Event::ReconfigExhausted,
            &[("attempts", &attempts), ("error", &err.to_string())],
        );
        Err(err)
    }

    /// One read-build-submit round.
    async fn attempt<F>(&self, build: &F, options: &Document, attempt: u32) -> ReplSetResult<Document>
    where
        F: Fn(&ReplicaSetConfig) -> ReplicaSetConfig,
    {
        self.metrics.increment_reconfig_attempts();

        let current = self.repository.get_current_config().await?;
        let mut target = build(&current);
        target.version = current.next_version();
        if target.protocol_version.is_none() {
            target.protocol_version = current.protocol_version;
        }
        ReconfigInvariantValidator::check_config(&target)?;

        let attempt = attempt.to_string();
        let version = target.version.to_string();
        log_event_with_fields(
            Event::ReconfigAttempt,
            &[("attempt", &attempt), ("set", &target.id), ("version", &version)],
        );

        let command = AdminCommand::Reconfig {
            config: target,
            options: options.clone(),
        }
        .to_document()?;
        let reply = self.client.run_admin_command(command).await?;

        log_event_with_fields(Event::ReconfigSucceeded, &[("version", &version)]);
        Ok(reply)
    }
}
