//! Reconfig Invariant Validation
//!
//! Pure checks run before anything is submitted. Every rejection is an
//! `InvalidArgument` and is never retried. Host collisions are reported
//! to the caller as a warning and never block submission.

use std::collections::{BTreeMap, HashSet};

use super::errors::{ReplSetError, ReplSetResult};
use super::types::{MemberConfig, ReplicaSetConfig};

fn votes_display(votes: Option<u8>) -> String {
    votes.map_or_else(|| "undefined".to_string(), |v| v.to_string())
}

/// Reconfig invariant validator
///
/// Stateless. Same inputs, same verdict.
pub struct ReconfigInvariantValidator;

impl ReconfigInvariantValidator {
    /// Structural invariants every submitted configuration must satisfy:
    /// unique member ids, `votes` in {0, 1}, arbiters never non-voting.
    pub fn check_config(config: &ReplicaSetConfig) -> ReplSetResult<()> {
        let mut seen = HashSet::with_capacity(config.members.len());
        for member in &config.members {
            if !seen.insert(member.id) {
                return Err(ReplSetError::invalid_argument(format!(
                    "duplicate member _id {} in config for replica set '{}'",
                    member.id, config.id
                )));
            }
            if let Some(votes) = member.votes {
                if votes > 1 {
                    return Err(ReplSetError::invalid_argument(format!(
                        "member {} ({}) has {{ votes: {} }}, votes must be 0 or 1",
                        member.id, member.host, votes
                    )));
                }
            }
            if member.is_arbiter() && member.votes == Some(0) {
                return Err(ReplSetError::invalid_argument(format!(
                    "arbiter {} ({}) must have {{ votes: 1 }}",
                    member.id, member.host
                )));
            }
        }
        Ok(())
    }

    /// The member at `index` of the proposed configuration.
    pub fn require_member(config: &ReplicaSetConfig, index: usize) -> ReplSetResult<&MemberConfig> {
        config.members.get(index).ok_or_else(|| {
            ReplSetError::invalid_argument(format!(
                "Node at index {} does not exist in the new config",
                index
            ))
        })
    }

    /// The member must have exactly `votes: 1` in the proposed configuration.
    pub fn require_voting(member: &MemberConfig, index: usize) -> ReplSetResult<()> {
        if member.votes != Some(1) {
            return Err(ReplSetError::invalid_argument(format!(
                "Node at index {} must have {{ votes: 1 }} in the new config (actual: {{ votes: {} }})",
                index,
                votes_display(member.votes)
            )));
        }
        Ok(())
    }

    /// If the member (matched by id) exists in the current configuration, it
    /// must not vote there.
    pub fn require_not_voting(
        current: &ReplicaSetConfig,
        member: &MemberConfig,
        index: usize,
    ) -> ReplSetResult<()> {
        if let Some(existing) = current.member_by_id(member.id) {
            if existing.votes_or_zero() != 0 {
                return Err(ReplSetError::invalid_argument(format!(
                    "Node at index {} must have {{ votes: 0 }} in the old config (actual: {{ votes: {} }})",
                    index,
                    votes_display(existing.votes)
                )));
            }
        }
        Ok(())
    }

    /// Existing member sharing `member`'s host under a different id.
    ///
    /// Only reported when `member`'s id is absent from the current config.
    pub fn host_collision<'a>(
        current: &'a ReplicaSetConfig,
        member: &MemberConfig,
    ) -> Option<&'a MemberConfig> {
        if current.member_by_id(member.id).is_some() {
            return None;
        }
        current
            .members
            .iter()
            .find(|m| m.host == member.host && m.id != member.id)
    }

    /// Ids whose vote differs between two configurations.
    ///
    /// A member present on one side only counts with 0 votes on the other.
    /// A missing `votes` field counts as the server default of 1.
    pub fn vote_changes(current: &ReplicaSetConfig, proposed: &ReplicaSetConfig) -> Vec<i64> {
        let mut votes: BTreeMap<i64, (u8, u8)> = BTreeMap::new();
        for m in &current.members {
            votes.entry(m.id).or_default().0 = m.effective_votes();
        }
        for m in &proposed.members {
            votes.entry(m.id).or_default().1 = m.effective_votes();
        }
        votes
            .into_iter()
            .filter(|(_, (before, after))| before != after)
            .map(|(id, _)| id)
            .collect()
    }

    /// At most one member may change its vote in a single step.
    pub fn require_single_vote_change(
        current: &ReplicaSetConfig,
        proposed: &ReplicaSetConfig,
    ) -> ReplSetResult<()> {
        let changed = Self::vote_changes(current, proposed);
        if changed.len() > 1 {
            return Err(ReplSetError::invalid_argument(format!(
                "a single reconfig may change the votes of at most one member, \
                 but members {:?} change",
                changed
            )));
        }
        Ok(())
    }
}
