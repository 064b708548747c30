//! Observable orchestrator events
//!
//! Events are explicit and typed; the logger only ever sees their names.

use std::fmt;

use super::logger::Severity;

/// Observable events of the replica set orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Config reads
    /// `replSetGetConfig` returned a config
    ConfigRead,
    /// Config read from `local.system.replset`
    ConfigFallbackRead,
    /// No config could be obtained
    ConfigUnavailable,

    // Reconfig protocol
    /// A reconfig submission is about to be sent
    ReconfigAttempt,
    /// A submission failed and will be retried
    ReconfigRetry,
    /// A submission was accepted
    ReconfigSucceeded,
    /// A non-retryable error ended the loop
    ReconfigAborted,
    /// All attempts failed
    ReconfigExhausted,

    // PA -> PSA
    /// Phase 1 (votes: 1, priority: 0) started
    PsaPhaseOne,
    /// Phase 2 (requested priority) started
    PsaPhaseTwo,
    /// Transition finished
    PsaComplete,
    /// Phase 2 failed after phase 1 committed
    PsaPartial,

    // Membership
    MemberAdded,
    MemberRemoved,
    /// New member host already present under another id
    HostCollision,

    /// Pass-through admin command
    AdminCommand,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigRead => "REPLSET_CONFIG_READ",
            Event::ConfigFallbackRead => "REPLSET_CONFIG_FALLBACK_READ",
            Event::ConfigUnavailable => "REPLSET_CONFIG_UNAVAILABLE",
            Event::ReconfigAttempt => "REPLSET_RECONFIG_ATTEMPT",
            Event::ReconfigRetry => "REPLSET_RECONFIG_RETRY",
            Event::ReconfigSucceeded => "REPLSET_RECONFIG_SUCCEEDED",
            Event::ReconfigAborted => "REPLSET_RECONFIG_ABORTED",
            Event::ReconfigExhausted => "REPLSET_RECONFIG_EXHAUSTED",
            Event::PsaPhaseOne => "REPLSET_PSA_PHASE_ONE",
            Event::PsaPhaseTwo => "REPLSET_PSA_PHASE_TWO",
            Event::PsaComplete => "REPLSET_PSA_COMPLETE",
            Event::PsaPartial => "REPLSET_PSA_PARTIAL",
            Event::MemberAdded => "REPLSET_MEMBER_ADDED",
            Event::MemberRemoved => "REPLSET_MEMBER_REMOVED",
            Event::HostCollision => "REPLSET_HOST_COLLISION",
            Event::AdminCommand => "REPLSET_ADMIN_COMMAND",
        }
    }

    /// Severity the event is logged at.
    pub fn severity(&self) -> Severity {
        match self {
            Event::ReconfigAttempt | Event::ConfigRead | Event::AdminCommand => Severity::Trace,
            Event::ReconfigRetry | Event::HostCollision | Event::ConfigFallbackRead => {
                Severity::Warn
            }
            Event::ConfigUnavailable
            | Event::ReconfigAborted
            | Event::ReconfigExhausted
            | Event::PsaPartial => Severity::Error,
            _ => Severity::Info,
        }
    }

    /// Whether the event marks an operation failure.
    pub fn is_failure(&self) -> bool {
        self.severity() == Severity::Error
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
