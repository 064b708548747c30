//! Config Repository
//!
//! Reads the cluster's current configuration:
//! 1. `replSetGetConfig`
//! 2. if the server reports the command as unknown or blocked by the
//!    strict API, the raw document in `local.system.replset`
//!
//! Reads have no side effects and may run concurrently.

use std::sync::Arc;

use serde_json::Value;

use super::client::ClusterAdminClient;
use super::command::AdminCommand;
use super::errors::{AdminCommandError, ReplSetError, ReplSetResult};
use super::types::ReplicaSetConfig;
use crate::observability::{log_event_with_fields, Event, ReconfigMetrics};

/// Source of current configuration snapshots.
#[derive(Clone)]
pub struct ConfigRepository {
    client: Arc<dyn ClusterAdminClient>,
    metrics: Arc<ReconfigMetrics>,
}

impl ConfigRepository {
    pub fn new(client: Arc<dyn ClusterAdminClient>, metrics: Arc<ReconfigMetrics>) -> Self {
        Self { client, metrics }
    }

    /// Fetch a fresh snapshot of the current configuration.
    pub async fn get_current_config(&self) -> ReplSetResult<ReplicaSetConfig> {
        self.metrics.increment_config_reads();

        let command = AdminCommand::GetConfig.to_document()?;
        let mut reply = match self.client.run_admin_command(command).await {
            Ok(reply) => reply,
            Err(err) if err.signals_config_fallback() => return self.read_fallback(&err).await,
            Err(err) => return Err(err.into()),
        };

        let config = match reply.remove("config") {
            Some(Value::Object(doc)) => ReplicaSetConfig::from_document(doc)?,
            Some(other) => {
                return Err(ReplSetError::InvalidDocument(format!(
                    "'config' returned by replSetGetConfig is not a document: {}",
                    other
                )))
            }
            None => {
                let err = ReplSetError::config_unavailable(
                    "document returned from replSetGetConfig does not contain 'config'",
                );
                log_event_with_fields(Event::ConfigUnavailable, &[("reason", &err.to_string())]);
                return Err(err);
            }
        };

        let version = config.version.to_string();
        log_event_with_fields(Event::ConfigRead, &[("set", &config.id), ("version", &version)]);
        Ok(config)
    }

    async fn read_fallback(&self, cause: &AdminCommandError) -> ReplSetResult<ReplicaSetConfig> {
        self.metrics.increment_config_fallback_reads();
        log_event_with_fields(
            Event::ConfigFallbackRead,
            &[("cause", cause.code_name()), ("source", "local.system.replset")],
        );

        let doc = match self.client.read_system_replset().await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                let err = ReplSetError::config_unavailable("no documents in local.system.replset");
                log_event_with_fields(Event::ConfigUnavailable, &[("reason", &err.to_string())]);
                return Err(err);
            }
            Err(read_err) => {
                let err = ReplSetError::config_unavailable(format!(
                    "replSetGetConfig unavailable ({}) and reading local.system.replset failed: {}",
                    cause, read_err
                ));
                log_event_with_fields(Event::ConfigUnavailable, &[("reason", &err.to_string())]);
                return Err(err);
            }
        };

        ReplicaSetConfig::from_document(doc)
    }
}
