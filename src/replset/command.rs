//! Administrative Commands
//!
//! Every command the orchestrator sends is built here, so the wire shape of
//! each one is visible in a single place. The command name is always the
//! first key of the document.

use serde_json::{json, Value};

use super::errors::ReplSetResult;
use super::types::{Document, ReplicaSetConfig};

/// Seconds a primary stays ineligible after `replSetStepDown` when the
/// caller does not say.
pub const DEFAULT_STEPDOWN_SECS: u64 = 60;

/// Administrative commands issued against the `admin` database.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminCommand {
    /// `None` lets the server build a default single-member config.
    Initiate(Option<ReplicaSetConfig>),
    GetConfig,
    Reconfig {
        config: ReplicaSetConfig,
        options: Document,
    },
    GetStatus,
    Hello,
    IsMaster,
    Freeze {
        secs: u64,
    },
    StepDown {
        stepdown_secs: Option<u64>,
        catch_up_secs: Option<u64>,
    },
    SyncFrom {
        host: String,
    },
}

impl AdminCommand {
    /// Command name, as it appears as the first key.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initiate(_) => "replSetInitiate",
            Self::GetConfig => "replSetGetConfig",
            Self::Reconfig { .. } => "replSetReconfig",
            Self::GetStatus => "replSetGetStatus",
            Self::Hello => "hello",
            Self::IsMaster => "isMaster",
            Self::Freeze { .. } => "replSetFreeze",
            Self::StepDown { .. } => "replSetStepDown",
            Self::SyncFrom { .. } => "replSetSyncFrom",
        }
    }

    /// Build the wire document.
    pub fn to_document(&self) -> ReplSetResult<Document> {
        let mut doc = Document::new();
        match self {
            Self::Initiate(config) => {
                let body = match config {
                    Some(config) => config.to_document()?,
                    None => Document::new(),
                };
                doc.insert(self.name().into(), Value::Object(body));
            }
            Self::GetConfig | Self::GetStatus | Self::Hello | Self::IsMaster => {
                doc.insert(self.name().into(), json!(1));
            }
            Self::Reconfig { config, options } => {
                doc.insert(self.name().into(), Value::Object(config.to_document()?));
                for (key, value) in options {
                    doc.insert(key.clone(), value.clone());
                }
            }
            Self::Freeze { secs } => {
                doc.insert(self.name().into(), json!(secs));
            }
            Self::StepDown {
                stepdown_secs,
                catch_up_secs,
            } => {
                doc.insert(
                    self.name().into(),
                    json!(stepdown_secs.unwrap_or(DEFAULT_STEPDOWN_SECS)),
                );
                if let Some(secs) = catch_up_secs {
                    doc.insert("secondaryCatchUpPeriodSecs".into(), json!(secs));
                }
            }
            Self::SyncFrom { host } => {
                doc.insert(self.name().into(), json!(host));
            }
        }
        Ok(doc)
    }
}
