//! Replica Set Configuration Types
//!
//! Wire shape exchanged with the cluster:
//! `{ _id, version, protocolVersion, members: [{ _id, host, priority?, votes?, arbiterOnly? }] }`
//!
//! Fields the orchestrator does not interpret (`settings`, `term`, `hidden`,
//! `tags`, ...) are kept in `extra` and round-trip untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{ReplSetError, ReplSetResult};

/// Ordered JSON document, as sent to and received from the cluster.
///
/// Key order matters: the command name must be the first key.
pub type Document = serde_json::Map<String, Value>;

fn version_is_unset(version: &i64) -> bool {
    *version == 0
}

/// A single member entry of a replica set configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberConfig {
    /// Member id, unique within a configuration.
    #[serde(rename = "_id")]
    pub id: i64,

    /// Network endpoint (`host:port`).
    pub host: String,

    /// Election preference. `None` means the server default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,

    /// 0 or 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub votes: Option<u8>,

    #[serde(rename = "arbiterOnly", default, skip_serializing_if = "Option::is_none")]
    pub arbiter_only: Option<bool>,

    /// Uninterpreted member fields.
    #[serde(flatten)]
    pub extra: Document,
}

impl MemberConfig {
    /// Create a data-bearing member with server defaults.
    pub fn new(id: i64, host: impl Into<String>) -> Self {
        Self {
            id,
            host: host.into(),
            priority: None,
            votes: None,
            arbiter_only: None,
            extra: Document::new(),
        }
    }

    /// Create an arbiter member.
    pub fn arbiter(id: i64, host: impl Into<String>) -> Self {
        Self {
            arbiter_only: Some(true),
            ..Self::new(id, host)
        }
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_votes(mut self, votes: u8) -> Self {
        self.votes = Some(votes);
        self
    }

    pub fn is_arbiter(&self) -> bool {
        self.arbiter_only == Some(true)
    }

    /// Raw `votes` value, missing counts as 0.
    pub fn votes_or_zero(&self) -> u8 {
        self.votes.unwrap_or(0)
    }

    /// Vote weight the server applies to this member.
    ///
    /// Arbiters always vote; a missing `votes` is the server default of 1.
    pub fn effective_votes(&self) -> u8 {
        if self.is_arbiter() {
            1
        } else {
            self.votes.unwrap_or(1)
        }
    }
}

/// A member supplied by a caller of `add`, whose id may be omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDraft {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    pub host: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub votes: Option<u8>,

    #[serde(rename = "arbiterOnly", default, skip_serializing_if = "Option::is_none")]
    pub arbiter_only: Option<bool>,

    #[serde(flatten)]
    pub extra: Document,
}

impl MemberDraft {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            id: None,
            host: host.into(),
            priority: None,
            votes: None,
            arbiter_only: None,
            extra: Document::new(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Resolve into a member, using `fallback_id` when no id was given.
    pub fn into_member(self, fallback_id: i64) -> MemberConfig {
        MemberConfig {
            id: self.id.unwrap_or(fallback_id),
            host: self.host,
            priority: self.priority,
            votes: self.votes,
            arbiter_only: self.arbiter_only,
            extra: self.extra,
        }
    }
}

impl From<MemberConfig> for MemberDraft {
    fn from(member: MemberConfig) -> Self {
        Self {
            id: Some(member.id),
            host: member.host,
            priority: member.priority,
            votes: member.votes,
            arbiter_only: member.arbiter_only,
            extra: member.extra,
        }
    }
}

/// Argument of `add`: either a bare `host:port` or a member object.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberSpec {
    Host(String),
    Member(MemberDraft),
}

impl From<&str> for MemberSpec {
    fn from(host: &str) -> Self {
        Self::Host(host.to_string())
    }
}

impl From<String> for MemberSpec {
    fn from(host: String) -> Self {
        Self::Host(host)
    }
}

impl From<MemberDraft> for MemberSpec {
    fn from(draft: MemberDraft) -> Self {
        Self::Member(draft)
    }
}

impl From<MemberConfig> for MemberSpec {
    fn from(member: MemberConfig) -> Self {
        Self::Member(member.into())
    }
}

/// A replica set configuration snapshot.
///
/// The cluster owns the authoritative copy. A value of this type is fetched,
/// turned into a target, submitted and dropped; it is never reused across
/// attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicaSetConfig {
    /// Replica set name.
    #[serde(rename = "_id")]
    pub id: String,

    /// 0 means no version has been assigned yet.
    #[serde(default, skip_serializing_if = "version_is_unset")]
    pub version: i64,

    #[serde(rename = "protocolVersion", default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<i64>,

    #[serde(default)]
    pub members: Vec<MemberConfig>,

    /// Uninterpreted top-level fields.
    #[serde(flatten)]
    pub extra: Document,
}

impl ReplicaSetConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: 0,
            protocol_version: None,
            members: Vec::new(),
            extra: Document::new(),
        }
    }

    pub fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    pub fn with_protocol_version(mut self, protocol_version: i64) -> Self {
        self.protocol_version = Some(protocol_version);
        self
    }

    pub fn with_member(mut self, member: MemberConfig) -> Self {
        self.members.push(member);
        self
    }

    /// Version a reconfig built on top of this snapshot must carry.
    pub fn next_version(&self) -> i64 {
        if self.version > 0 {
            self.version + 1
        } else {
            1
        }
    }

    pub fn member_by_id(&self, id: i64) -> Option<&MemberConfig> {
        self.members.iter().find(|m| m.id == id)
    }

    pub fn member_by_host(&self, host: &str) -> Option<&MemberConfig> {
        self.members.iter().find(|m| m.host == host)
    }

    /// Id for a member added without one: `max(ids) + 1`, or 0 for an empty set.
    pub fn next_member_id(&self) -> i64 {
        self.members.iter().map(|m| m.id).max().map_or(0, |max| max + 1)
    }

    /// Overlay a caller-supplied target onto this snapshot.
    ///
    /// The target's name, members and protocol version win. Top-level
    /// fields the target omits (`settings`, `term`, ...) are kept from the
    /// snapshot. The version is left for the submitter to assign.
    pub fn overlay(&self, target: &ReplicaSetConfig) -> ReplicaSetConfig {
        let mut extra = self.extra.clone();
        for (key, value) in &target.extra {
            extra.insert(key.clone(), value.clone());
        }

        ReplicaSetConfig {
            id: if target.id.is_empty() {
                self.id.clone()
            } else {
                target.id.clone()
            },
            version: self.version,
            protocol_version: target.protocol_version,
            members: target.members.clone(),
            extra,
        }
    }

    /// Encode as a wire document.
    pub fn to_document(&self) -> ReplSetResult<Document> {
        match serde_json::to_value(self)? {
            Value::Object(doc) => Ok(doc),
            other => Err(ReplSetError::InvalidDocument(format!(
                "config encoded as non-object: {}",
                other
            ))),
        }
    }

    /// Decode from a wire document.
    pub fn from_document(doc: Document) -> ReplSetResult<Self> {
        Ok(serde_json::from_value(Value::Object(doc))?)
    }
}
