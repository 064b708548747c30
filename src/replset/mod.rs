//! Replica Set Reconfiguration
//!
//! Safe administration of a replica set's membership:
//! - every reconfig reads the current config and submits version + 1
//! - transient failures back off and retry against a fresh read
//! - a Primary-Arbiter set gains its voting secondary in two steps
//! - add and remove are single-shot
//!
//! All network access goes through the injected `ClusterAdminClient`;
//! all operator output and sleeping go through `ProgressNotifier`.

mod client;
mod command;
mod errors;
mod membership;
mod orchestrator;
mod policy;
mod psa;
mod repository;
mod retry;
mod types;
mod validator;

pub use client::{BoxFuture, ClusterAdminClient, CommandResult, ConsoleNotifier, ProgressNotifier};
pub use command::{AdminCommand, DEFAULT_STEPDOWN_SECS};
pub use errors::{AdminCommandError, ReplSetError, ReplSetResult};
pub use membership::{plan_add, plan_remove, MembershipChange};
pub use orchestrator::{redact_credentials, ReplicaSetOrchestrator, API_CLASS};
pub use policy::{millis_to_duration, Backoff, BackoffStep, OrchestratorSettings, RetryPolicy};
pub use psa::{attempted_command, PsaPlan, PsaTransitionPlanner};
pub use repository::ConfigRepository;
pub use retry::{BackoffRetryExecutor, STILL_WORKING_NOTICE};
pub use types::{Document, MemberConfig, MemberDraft, MemberSpec, ReplicaSetConfig};
pub use validator::ReconfigInvariantValidator;
