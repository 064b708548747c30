//! Retry Policy and Orchestrator Settings
//!
//! Defaults reproduce the reconfig protocol exactly: 12 attempts, 1000 ms
//! first backoff, ×1.3 growth with no cap, operator notice once the next
//! interval exceeds 2500 ms.
//!
//! Settings are optional; a JSON file may override any field:
//!
//! ```json
//! { "retry": { "max_attempts": 5 }, "log_level": "warn" }
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::{ReplSetError, ReplSetResult};
use crate::observability::{Logger, Severity};

fn default_max_attempts() -> u32 {
    12
}
fn default_initial_backoff_ms() -> u64 {
    1000
}
fn default_backoff_multiplier() -> f64 {
    1.3
}
fn default_notice_threshold_ms() -> u64 {
    2500
}

/// Backoff parameters for reconfig submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total submissions, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Sleep before the second attempt.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Growth applied after every sleep. Uncapped.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Notify the operator once the grown interval exceeds this.
    #[serde(default = "default_notice_threshold_ms")]
    pub notice_threshold_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            notice_threshold_ms: default_notice_threshold_ms(),
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> ReplSetResult<()> {
        if self.max_attempts == 0 {
            return Err(ReplSetError::Settings("max_attempts must be >= 1".into()));
        }
        if self.initial_backoff_ms == 0 {
            return Err(ReplSetError::Settings("initial_backoff_ms must be > 0".into()));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ReplSetError::Settings(format!(
                "backoff_multiplier must be a finite number >= 1 (got {})",
                self.backoff_multiplier
            )));
        }
        Ok(())
    }

    /// Fresh backoff state for one reconfig call.
    pub fn backoff(&self) -> Backoff {
        Backoff {
            interval_ms: self.initial_backoff_ms as f64,
            multiplier: self.backoff_multiplier,
            notice_threshold_ms: self.notice_threshold_ms as f64,
        }
    }

    /// The sleeps a permanently failing reconfig would go through.
    pub fn schedule(&self) -> Vec<BackoffStep> {
        let mut backoff = self.backoff();
        (2..=self.max_attempts)
            .map(|attempt| {
                let (sleep_ms, notify) = backoff.advance();
                BackoffStep {
                    before_attempt: attempt,
                    sleep_ms,
                    notify,
                }
            })
            .collect()
    }
}

/// One sleep of the backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BackoffStep {
    /// 1-based attempt this sleep precedes.
    pub before_attempt: u32,
    pub sleep_ms: f64,
    /// Whether the "still working" notice is printed before this attempt.
    pub notify: bool,
}

/// Mutable backoff interval for a single reconfig call.
#[derive(Debug, Clone)]
pub struct Backoff {
    interval_ms: f64,
    multiplier: f64,
    notice_threshold_ms: f64,
}

impl Backoff {
    /// Return the sleep to perform now, then grow the interval.
    ///
    /// The flag is true when the grown interval exceeds the notice
    /// threshold.
    pub fn advance(&mut self) -> (f64, bool) {
        let sleep_ms = self.interval_ms;
        self.interval_ms *= self.multiplier;
        (sleep_ms, self.interval_ms > self.notice_threshold_ms)
    }

    pub fn current_ms(&self) -> f64 {
        self.interval_ms
    }
}

/// Convert a millisecond interval into a sleep duration.
pub fn millis_to_duration(ms: f64) -> Duration {
    Duration::try_from_secs_f64(ms / 1000.0).unwrap_or(Duration::MAX)
}

/// Settings for an orchestrator instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Minimum log severity (`trace`, `info`, `warn`, `error`).
    #[serde(default)]
    pub log_level: Option<String>,
}

impl OrchestratorSettings {
    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> ReplSetResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| ReplSetError::Settings(format!("failed to read {:?}: {}", path, e)))?;

        let settings: OrchestratorSettings = serde_json::from_str(&content)
            .map_err(|e| ReplSetError::Settings(format!("invalid settings JSON: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> ReplSetResult<()> {
        self.retry.validate()?;
        self.severity()?;
        Ok(())
    }

    /// Parsed log level, if one is configured.
    pub fn severity(&self) -> ReplSetResult<Option<Severity>> {
        self.log_level
            .as_deref()
            .map(|level| level.parse::<Severity>().map_err(ReplSetError::Settings))
            .transpose()
    }

    /// Apply the configured log level, falling back to the environment.
    pub fn apply_log_level(&self) -> ReplSetResult<()> {
        match self.severity()? {
            Some(severity) => Logger::set_min_severity(severity),
            None => Logger::init_from_env(),
        }
        Ok(())
    }
}
