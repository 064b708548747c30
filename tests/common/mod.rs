//! Scripted in-memory replica set for scenario tests
//!
//! `MockCluster` plays the server side of the admin protocol:
//! - `replSetGetConfig` answers from the stored config, or fails the way
//!   old servers and strict-API connections do
//! - `replSetReconfig` only commits `version == current + 1`
//! - failures and racing writers can be scripted per test
//!
//! `RecordingNotifier` records operator messages and sleeps without
//! actually sleeping.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::{json, Value};

use replset::replset::{
    AdminCommandError, BoxFuture, ClusterAdminClient, CommandResult, Document, MemberConfig,
    ProgressNotifier, ReplicaSetConfig, ReplicaSetOrchestrator, RetryPolicy,
};
use replset::observability::MemoryApiCallSink;

/// How `replSetGetConfig` behaves.
#[derive(Debug, Clone)]
pub enum GetConfigMode {
    Normal,
    CommandNotFound,
    ApiStrict,
    /// Reply without a `config` field.
    MissingConfig,
    Failing(AdminCommandError),
}

#[derive(Debug)]
struct ClusterState {
    config: ReplicaSetConfig,
    get_config_mode: GetConfigMode,
    system_replset: Option<Document>,
    system_replset_error: Option<AdminCommandError>,
    /// Next N reconfigs fail with a retryable error.
    transient_failures: usize,
    /// Every reconfig fails with this error.
    permanent_failure: Option<AdminCommandError>,
    /// Reconfigs that succeed before `permanent_failure` applies.
    successes_before_failure: Option<usize>,
    /// Every reconfig fails with an error naming its attempt number.
    numbered_failures: bool,
    reconfig_calls: usize,
    /// Next N config reads are followed by a concurrent reconfig.
    racing_reads: usize,
    commands: Vec<Document>,
    committed: Vec<ReplicaSetConfig>,
    config_reads: usize,
}

/// In-memory replica set.
pub struct MockCluster {
    state: Mutex<ClusterState>,
    uri: String,
}

impl MockCluster {
    pub fn new(config: ReplicaSetConfig) -> Self {
        Self {
            state: Mutex::new(ClusterState {
                config,
                get_config_mode: GetConfigMode::Normal,
                system_replset: None,
                system_replset_error: None,
                transient_failures: 0,
                permanent_failure: None,
                successes_before_failure: None,
                numbered_failures: false,
                reconfig_calls: 0,
                racing_reads: 0,
                commands: Vec::new(),
                committed: Vec::new(),
                config_reads: 0,
            }),
            uri: "mongodb://localhost:27017/?replicaSet=rs0".to_string(),
        }
    }

    fn state(&self) -> MutexGuard<'_, ClusterState> {
        self.state.lock().unwrap()
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    pub fn set_get_config_mode(&self, mode: GetConfigMode) {
        self.state().get_config_mode = mode;
    }

    pub fn set_system_replset(&self, doc: Option<Document>) {
        self.state().system_replset = doc;
    }

    pub fn fail_system_replset(&self, err: AdminCommandError) {
        self.state().system_replset_error = Some(err);
    }

    pub fn fail_next_reconfigs(&self, count: usize) {
        self.state().transient_failures = count;
    }

    pub fn fail_all_reconfigs(&self, err: AdminCommandError) {
        self.state().permanent_failure = Some(err);
    }

    /// Fail every reconfig with `NodeNotFound: attempt <n> rejected`.
    pub fn fail_all_reconfigs_numbered(&self) {
        self.state().numbered_failures = true;
    }

    /// Let `successes` reconfigs through, then fail every later one.
    pub fn fail_reconfigs_after(&self, successes: usize, err: AdminCommandError) {
        let mut state = self.state();
        state.successes_before_failure = Some(successes);
        state.permanent_failure = Some(err);
    }

    /// Another writer bumps the version right after each of the next
    /// `reads` config reads.
    pub fn race_next_reads(&self, reads: usize) {
        self.state().racing_reads = reads;
    }

    pub fn config(&self) -> ReplicaSetConfig {
        self.state().config.clone()
    }

    pub fn commands(&self) -> Vec<Document> {
        self.state().commands.clone()
    }

    pub fn command_names(&self) -> Vec<String> {
        self.state()
            .commands
            .iter()
            .filter_map(|doc| doc.keys().next().cloned())
            .collect()
    }

    /// Every `replSetReconfig` submitted, accepted or not.
    pub fn submitted_reconfigs(&self) -> Vec<ReplicaSetConfig> {
        self.state()
            .commands
            .iter()
            .filter_map(|doc| match doc.get("replSetReconfig") {
                Some(Value::Object(config)) => ReplicaSetConfig::from_document(config.clone()).ok(),
                _ => None,
            })
            .collect()
    }

    /// Configs the cluster accepted, in order.
    pub fn committed(&self) -> Vec<ReplicaSetConfig> {
        self.state().committed.clone()
    }

    pub fn config_reads(&self) -> usize {
        self.state().config_reads
    }

    fn get_config(&self) -> CommandResult<Document> {
        let mut state = self.state();
        state.config_reads += 1;

        let reply = match state.get_config_mode.clone() {
            GetConfigMode::Normal => {
                let config = state
                    .config
                    .to_document()
                    .map_err(|e| AdminCommandError::command_failed(e.to_string()))?;
                json!({ "config": config, "ok": 1 })
            }
            GetConfigMode::MissingConfig => json!({ "ok": 1 }),
            GetConfigMode::CommandNotFound => {
                return Err(AdminCommandError::CommandNotFound(
                    "no such command: 'replSetGetConfig'".into(),
                ))
            }
            GetConfigMode::ApiStrict => {
                return Err(AdminCommandError::ApiStrict(
                    "replSetGetConfig is not in API Version 1".into(),
                ))
            }
            GetConfigMode::Failing(err) => return Err(err),
        };

        if state.racing_reads > 0 {
            state.racing_reads -= 1;
            state.config.version += 1;
        }

        match reply {
            Value::Object(doc) => Ok(doc),
            _ => Err(AdminCommandError::command_failed("reply is not a document")),
        }
    }

    fn reconfig(&self, command: &Document) -> CommandResult<Document> {
        let mut state = self.state();
        state.reconfig_calls += 1;

        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            return Err(AdminCommandError::command_failed_with_code(
                "NodeNotFound",
                "Quorum check failed",
            ));
        }

        if state.numbered_failures {
            return Err(numbered_failure(state.reconfig_calls));
        }

        if let Some(err) = state.permanent_failure.clone() {
            match state.successes_before_failure {
                Some(0) | None => return Err(err),
                Some(n) => state.successes_before_failure = Some(n - 1),
            }
        }

        let proposed = match command.get("replSetReconfig") {
            Some(Value::Object(doc)) => ReplicaSetConfig::from_document(doc.clone())
                .map_err(|e| AdminCommandError::command_failed(e.to_string()))?,
            _ => return Err(AdminCommandError::command_failed("missing config")),
        };

        let expected = state.config.version + 1;
        if proposed.version != expected {
            return Err(AdminCommandError::command_failed_with_code(
                "NewReplicaSetConfigurationIncompatible",
                format!(
                    "New config version {} must be {} (current {})",
                    proposed.version, expected, state.config.version
                ),
            ));
        }

        state.config = proposed.clone();
        state.committed.push(proposed);
        Ok(ok_reply())
    }
}

/// Error the numbered failure mode returns for `attempt`.
pub fn numbered_failure(attempt: usize) -> AdminCommandError {
    AdminCommandError::command_failed_with_code(
        "NodeNotFound",
        format!("attempt {} rejected", attempt),
    )
}

fn ok_reply() -> Document {
    let mut doc = Document::new();
    doc.insert("ok".into(), json!(1));
    doc
}

impl ClusterAdminClient for MockCluster {
    fn run_admin_command(&self, command: Document) -> BoxFuture<'_, CommandResult<Document>> {
        Box::pin(async move {
            self.state().commands.push(command.clone());
            let name = command.keys().next().cloned().unwrap_or_default();
            match name.as_str() {
                "replSetGetConfig" => self.get_config(),
                "replSetReconfig" => self.reconfig(&command),
                "hello" | "isMaster" => {
                    let mut reply = ok_reply();
                    reply.insert("isWritablePrimary".into(), json!(true));
                    reply.insert("setName".into(), json!(self.config().id));
                    Ok(reply)
                }
                _ => Ok(ok_reply()),
            }
        })
    }

    fn read_system_replset(&self) -> BoxFuture<'_, CommandResult<Option<Document>>> {
        Box::pin(async move {
            let state = self.state();
            match &state.system_replset_error {
                Some(err) => Err(err.clone()),
                None => Ok(state.system_replset.clone()),
            }
        })
    }

    fn connection_uri(&self) -> String {
        self.uri.clone()
    }
}

/// Notifier that records instead of printing and sleeping.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn count(&self, message: &str) -> usize {
        self.messages().iter().filter(|m| m.as_str() == message).count()
    }
}

impl ProgressNotifier for RecordingNotifier {
    fn print(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        self.sleeps.lock().unwrap().push(duration);
        Box::pin(async {})
    }
}

/// Primary plus arbiter, version 5.
pub fn pa_config() -> ReplicaSetConfig {
    ReplicaSetConfig::new("rs0")
        .with_version(5)
        .with_protocol_version(1)
        .with_member(MemberConfig::new(0, "a:27017").with_votes(1).with_priority(1.0))
        .with_member(MemberConfig::arbiter(1, "arb:27017").with_votes(1).with_priority(0.0))
}

/// Three data-bearing voters, version 5.
pub fn psa_three_config() -> ReplicaSetConfig {
    ReplicaSetConfig::new("rs0")
        .with_version(5)
        .with_protocol_version(1)
        .with_member(MemberConfig::new(0, "a:27017").with_votes(1))
        .with_member(MemberConfig::new(1, "b:27017").with_votes(1))
        .with_member(MemberConfig::new(2, "c:27017").with_votes(1))
}

/// `pa_config` plus a new voting member at index 2.
pub fn proposed_psa(priority: Option<f64>) -> ReplicaSetConfig {
    let mut member = MemberConfig::new(2, "b:27017").with_votes(1);
    member.priority = priority;
    pa_config().with_member(member)
}

pub struct Harness {
    pub cluster: Arc<MockCluster>,
    pub notifier: Arc<RecordingNotifier>,
    pub api_calls: MemoryApiCallSink,
    pub orchestrator: ReplicaSetOrchestrator,
}

impl Harness {
    pub fn new(config: ReplicaSetConfig) -> Self {
        Self::with_cluster(MockCluster::new(config))
    }

    pub fn with_cluster(cluster: MockCluster) -> Self {
        let cluster = Arc::new(cluster);
        let notifier = Arc::new(RecordingNotifier::default());
        let api_calls = MemoryApiCallSink::new();
        let orchestrator = ReplicaSetOrchestrator::new(cluster.clone(), notifier.clone())
            .with_api_call_sink(Arc::new(api_calls.clone()));

        Self {
            cluster,
            notifier,
            api_calls,
            orchestrator,
        }
    }

    pub fn with_policy(self, policy: RetryPolicy) -> Self {
        let orchestrator = self.orchestrator.with_retry_policy(policy);
        Self {
            orchestrator,
            ..self
        }
    }
}
