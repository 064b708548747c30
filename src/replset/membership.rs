//! Single-Step Membership Changes
//!
//! `add` and `remove` build their target from one config read and submit it
//! once, using the version observed at call time. The target is computed
//! here without any I/O so it can be inspected offline.

use super::errors::{ReplSetError, ReplSetResult};
use super::types::{MemberConfig, MemberSpec, ReplicaSetConfig};
use super::validator::ReconfigInvariantValidator;

/// Target configuration for a membership change.
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipChange {
    /// Config to submit, version already bumped.
    pub config: ReplicaSetConfig,
    /// Member added or removed.
    pub member: MemberConfig,
    /// Non-fatal findings for the operator.
    pub warnings: Vec<String>,
}

/// Append a member to a copy of `current`.
///
/// A bare host gets id `max(ids) + 1`; `arbiter` may only be combined with
/// a bare host.
pub fn plan_add(
    current: &ReplicaSetConfig,
    spec: MemberSpec,
    arbiter: bool,
) -> ReplSetResult<MembershipChange> {
    let next_id = current.next_member_id();
    let member = match spec {
        MemberSpec::Host(host) => {
            let member = MemberConfig::new(next_id, host);
            if arbiter {
                MemberConfig {
                    arbiter_only: Some(true),
                    ..member
                }
            } else {
                member
            }
        }
        MemberSpec::Member(draft) if arbiter => {
            let shown = serde_json::to_string(&draft)?;
            return Err(ReplSetError::invalid_argument(format!(
                "Expected first parameter to be a host-and-port string of arbiter, but got {}",
                shown
            )));
        }
        MemberSpec::Member(draft) => draft.into_member(next_id),
    };

    let mut warnings = Vec::new();
    if let Some(existing) = ReconfigInvariantValidator::host_collision(current, &member) {
        warnings.push(format!(
            "Warning: host \"{}\" is already a member of this replica set with _id {}",
            member.host, existing.id
        ));
    }

    let mut config = current.clone();
    config.version = current.next_version();
    config.members.push(member.clone());
    ReconfigInvariantValidator::check_config(&config)?;

    Ok(MembershipChange {
        config,
        member,
        warnings,
    })
}

/// Drop the first member whose host equals `host` from a copy of `current`.
pub fn plan_remove(current: &ReplicaSetConfig, host: &str) -> ReplSetResult<MembershipChange> {
    let position = match current.members.iter().position(|m| m.host == host) {
        Some(position) => position,
        None => {
            let members = serde_json::to_string(&current.members)?;
            return Err(ReplSetError::invalid_argument(format!(
                "Couldn't find {} in {}. Is {} a member of this replset?",
                host, members, host
            )));
        }
    };

    let removed = current.members[position].clone();
    let members = current
        .members
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != position)
        .map(|(_, m)| m.clone())
        .collect();

    let config = ReplicaSetConfig {
        version: current.next_version(),
        members,
        ..current.clone()
    };
    ReconfigInvariantValidator::check_config(&config)?;

    Ok(MembershipChange {
        config,
        member: removed,
        warnings: Vec::new(),
    })
}
