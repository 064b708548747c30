//! Replica Set Orchestrator
//!
//! Public facade. Composes the config repository, the retrying reconfig
//! submitter and the PSA planner, and adds the one-shot membership and
//! pass-through admin operations.
//!
//! The orchestrator keeps no state about the cluster between calls. Each
//! mutation reads the current config itself.

use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::{json, Value};

use super::client::{ClusterAdminClient, ProgressNotifier};
use super::command::AdminCommand;
use super::errors::{ReplSetError, ReplSetResult};
use super::membership::{plan_add, plan_remove};
use super::policy::{OrchestratorSettings, RetryPolicy};
use super::psa::PsaTransitionPlanner;
use super::repository::ConfigRepository;
use super::retry::BackoffRetryExecutor;
use super::types::{Document, MemberSpec, ReplicaSetConfig};
use crate::observability::{
    log_event_with_fields, ApiCall, ApiCallSink, Event, LogApiCallSink, MetricsSnapshot,
    ReconfigMetrics,
};

/// Class name reported in API call records.
pub const API_CLASS: &str = "ReplicaSet";

static CREDENTIALS: OnceLock<Option<Regex>> = OnceLock::new();

/// Replace `user:password@` in a connection string with `<credentials>@`.
pub fn redact_credentials(uri: &str) -> String {
    let pattern = CREDENTIALS.get_or_init(|| Regex::new(r"(?P<scheme>[A-Za-z][A-Za-z0-9+.-]*://)[^@/]+@").ok());
    match pattern {
        Some(re) => re.replace(uri, "${scheme}<credentials>@").into_owned(),
        None => uri.to_string(),
    }
}

/// Replica set administration facade.
#[derive(Clone)]
pub struct ReplicaSetOrchestrator {
    client: Arc<dyn ClusterAdminClient>,
    notifier: Arc<dyn ProgressNotifier>,
    api_calls: Arc<dyn ApiCallSink>,
    metrics: Arc<ReconfigMetrics>,
    repository: ConfigRepository,
    executor: BackoffRetryExecutor,
    planner: PsaTransitionPlanner,
}

impl ReplicaSetOrchestrator {
    /// Create an orchestrator with the default retry policy.
    pub fn new(client: Arc<dyn ClusterAdminClient>, notifier: Arc<dyn ProgressNotifier>) -> Self {
        Self::assemble(
            client,
            notifier,
            Arc::new(LogApiCallSink),
            RetryPolicy::default(),
            Arc::new(ReconfigMetrics::new()),
        )
    }

    /// Create an orchestrator from loaded settings, applying their log level.
    pub fn from_settings(
        client: Arc<dyn ClusterAdminClient>,
        notifier: Arc<dyn ProgressNotifier>,
        settings: &OrchestratorSettings,
    ) -> ReplSetResult<Self> {
        settings.validate()?;
        settings.apply_log_level()?;
        Ok(Self::new(client, notifier).with_retry_policy(settings.retry.clone()))
    }

    /// Replace the retry policy. Counters recorded so far are kept.
    pub fn with_retry_policy(self, policy: RetryPolicy) -> Self {
        Self::assemble(self.client, self.notifier, self.api_calls, policy, self.metrics)
    }

    /// Replace the API call sink. Counters recorded so far are kept.
    pub fn with_api_call_sink(self, sink: Arc<dyn ApiCallSink>) -> Self {
        let policy = self.executor.policy().clone();
        Self::assemble(self.client, self.notifier, sink, policy, self.metrics)
    }

    fn assemble(
        client: Arc<dyn ClusterAdminClient>,
        notifier: Arc<dyn ProgressNotifier>,
        api_calls: Arc<dyn ApiCallSink>,
        policy: RetryPolicy,
        metrics: Arc<ReconfigMetrics>,
    ) -> Self {
        let repository = ConfigRepository::new(Arc::clone(&client), Arc::clone(&metrics));
        let executor = BackoffRetryExecutor::new(
            Arc::clone(&client),
            repository.clone(),
            Arc::clone(&notifier),
            policy,
            Arc::clone(&metrics),
        );
        let planner = PsaTransitionPlanner::new(
            repository.clone(),
            executor.clone(),
            Arc::clone(&notifier),
            Arc::clone(&metrics),
        );

        Self {
            client,
            notifier,
            api_calls,
            metrics,
            repository,
            executor,
            planner,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.executor.policy()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn emit(&self, method: &str, arguments: Value) {
        self.api_calls.emit(ApiCall::new(API_CLASS, method, arguments));
    }

    async fn run(&self, command: AdminCommand) -> ReplSetResult<Document> {
        log_event_with_fields(Event::AdminCommand, &[("command", command.name())]);
        let doc = command.to_document()?;
        Ok(self.client.run_admin_command(doc).await?)
    }

    // =========================================================================
    // CONFIGURATION
    // =========================================================================

    /// Submit an initial configuration with `replSetInitiate`. Not retried.
    pub async fn initiate(&self, config: Option<ReplicaSetConfig>) -> ReplSetResult<Document> {
        let shown = match &config {
            Some(config) => Value::Object(config.to_document()?),
            None => json!({}),
        };
        self.emit("initiate", json!({ "config": shown }));
        self.run(AdminCommand::Initiate(config)).await
    }

    /// Current configuration.
    pub async fn config(&self) -> ReplSetResult<ReplicaSetConfig> {
        self.emit("config", json!({}));
        self.repository.get_current_config().await
    }

    /// Alias of `config`.
    pub async fn conf(&self) -> ReplSetResult<ReplicaSetConfig> {
        self.emit("conf", json!({}));
        self.repository.get_current_config().await
    }

    /// Submit `config` with backoff, re-reading the current config on every
    /// attempt and overlaying `config` onto it.
    pub async fn reconfig(
        &self,
        config: &ReplicaSetConfig,
        options: &Document,
    ) -> ReplSetResult<Document> {
        self.emit(
            "reconfig",
            json!({ "config": config.to_document()?, "options": options }),
        );
        self.executor
            .reconfig(|current| current.overlay(config), options)
            .await
    }

    /// Safely turn a Primary-Arbiter set into Primary-Secondary-Arbiter by
    /// giving the member at `index` of `config` its vote in two steps.
    pub async fn reconfig_for_psa_set(
        &self,
        index: usize,
        config: &ReplicaSetConfig,
        options: &Document,
    ) -> ReplSetResult<Document> {
        self.emit(
            "reconfigForPSASet",
            json!({ "newMemberIndex": index, "config": config.to_document()?, "options": options }),
        );
        self.planner.execute(index, config, options).await
    }

    // =========================================================================
    // MEMBERSHIP
    // =========================================================================

    /// Append a member and submit once, without retry.
    pub async fn add(&self, member: impl Into<MemberSpec>, arbiter: bool) -> ReplSetResult<Document> {
        let spec = member.into();
        let shown = match &spec {
            MemberSpec::Host(host) => json!(host),
            MemberSpec::Member(draft) => serde_json::to_value(draft)?,
        };
        self.emit("add", json!({ "hostport": shown, "arb": arbiter }));

        let current = self.repository.get_current_config().await?;
        let change = plan_add(&current, spec, arbiter)?;
        for warning in &change.warnings {
            log_event_with_fields(Event::HostCollision, &[("message", warning)]);
            self.notifier.print(warning);
        }

        let id = change.member.id.to_string();
        let version = change.config.version.to_string();
        let reply = self
            .run(AdminCommand::Reconfig {
                config: change.config,
                options: Document::new(),
            })
            .await?;
        log_event_with_fields(
            Event::MemberAdded,
            &[("host", &change.member.host), ("id", &id), ("version", &version)],
        );
        Ok(reply)
    }

    /// Add an arbiter on `host`.
    pub async fn add_arb(&self, host: &str) -> ReplSetResult<Document> {
        self.emit("addArb", json!({ "hostname": host }));
        self.add(host, true).await
    }

    /// Remove the first member whose host is `host` and submit once.
    pub async fn remove(&self, host: &str) -> ReplSetResult<Document> {
        self.emit("remove", json!({ "hostname": host }));

        let current = self.repository.get_current_config().await?;
        let change = plan_remove(&current, host)?;

        let id = change.member.id.to_string();
        let version = change.config.version.to_string();
        let reply = self
            .run(AdminCommand::Reconfig {
                config: change.config,
                options: Document::new(),
            })
            .await?;
        log_event_with_fields(
            Event::MemberRemoved,
            &[("host", host), ("id", &id), ("version", &version)],
        );
        Ok(reply)
    }

    // =========================================================================
    // PASS-THROUGH
    // =========================================================================

    pub async fn status(&self) -> ReplSetResult<Document> {
        self.emit("status", json!({}));
        self.run(AdminCommand::GetStatus).await
    }

    pub async fn hello(&self) -> ReplSetResult<Document> {
        self.emit("hello", json!({}));
        self.run(AdminCommand::Hello).await
    }

    pub async fn is_master(&self) -> ReplSetResult<Document> {
        self.emit("isMaster", json!({}));
        self.run(AdminCommand::IsMaster).await
    }

    /// Make this node ineligible to become primary for `secs` seconds.
    pub async fn freeze(&self, secs: u64) -> ReplSetResult<Document> {
        self.emit("freeze", json!({ "secs": secs }));
        self.run(AdminCommand::Freeze { secs }).await
    }

    /// Step the primary down. `stepdown_secs` defaults to 60.
    pub async fn step_down(
        &self,
        stepdown_secs: Option<u64>,
        catch_up_secs: Option<u64>,
    ) -> ReplSetResult<Document> {
        self.emit(
            "stepDown",
            json!({ "stepdownSecs": stepdown_secs, "catchUpSecs": catch_up_secs }),
        );
        self.run(AdminCommand::StepDown {
            stepdown_secs,
            catch_up_secs,
        })
        .await
    }

    /// Override the sync source of this node.
    pub async fn sync_from(&self, host: &str) -> ReplSetResult<Document> {
        self.emit("syncFrom", json!({ "host": host }));
        self.run(AdminCommand::SyncFrom {
            host: host.to_string(),
        })
        .await
    }

    pub async fn print_slave_replication_info(&self) -> ReplSetResult<Document> {
        self.emit("printSlaveReplicationInfo", json!({}));
        Err(ReplSetError::Deprecated(
            "printSlaveReplicationInfo has been deprecated. Use printSecondaryReplicationInfo instead"
                .into(),
        ))
    }
}

impl fmt::Display for ReplicaSetOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} class connected to {} via db admin",
            API_CLASS,
            redact_credentials(&self.client.connection_uri())
        )
    }
}
