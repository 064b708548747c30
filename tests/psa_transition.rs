//! PA -> PSA Transition Tests
//!
//! The new member is first given { votes: 1, priority: 0 }, then its
//! requested priority. Validation failures submit nothing; a failed second
//! step leaves the first step in place and reports the manual command.

mod common;

use common::{pa_config, proposed_psa, Harness};
use replset::replset::{
    AdminCommandError, Document, MemberConfig, ReplSetError, ReplicaSetConfig, RetryPolicy,
};

fn quick_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        initial_backoff_ms: 1,
        ..RetryPolicy::default()
    }
}

// =============================================================================
// Phase Count
// =============================================================================

/// Non-zero priority: two reconfigs, priority 0 first.
#[tokio::test]
async fn test_two_reconfigs_for_nonzero_priority() {
    let h = Harness::new(pa_config());

    h.orchestrator
        .reconfig_for_psa_set(2, &proposed_psa(Some(2.0)), &Document::new())
        .await
        .unwrap();

    let submitted = h.cluster.submitted_reconfigs();
    assert_eq!(submitted.len(), 2);

    assert_eq!(submitted[0].version, 6);
    assert_eq!(submitted[0].members[2].votes, Some(1));
    assert_eq!(submitted[0].members[2].priority, Some(0.0));

    assert_eq!(submitted[1].version, 7);
    assert_eq!(submitted[1].members[2].votes, Some(1));
    assert_eq!(submitted[1].members[2].priority, Some(2.0));

    assert_eq!(
        h.notifier.messages(),
        vec![
            "Running first reconfig to give member at index 2 { votes: 1, priority: 0 }",
            "Running second reconfig to give member at index 2 { priority: 2 }",
        ]
    );
    assert_eq!(h.orchestrator.metrics().psa_transitions, 1);
}

/// Priority 0: the first reconfig is the whole job.
#[tokio::test]
async fn test_single_reconfig_for_zero_priority() {
    let h = Harness::new(pa_config());

    h.orchestrator
        .reconfig_for_psa_set(2, &proposed_psa(Some(0.0)), &Document::new())
        .await
        .unwrap();

    assert_eq!(h.cluster.submitted_reconfigs().len(), 1);
    assert_eq!(h.cluster.config().members[2].priority, Some(0.0));
    assert_eq!(
        h.notifier.count("No second reconfig necessary because .priority = 0"),
        1
    );
}

/// No priority given: the second reconfig restores the server default.
#[tokio::test]
async fn test_missing_priority_runs_second_reconfig() {
    let h = Harness::new(pa_config());

    h.orchestrator
        .reconfig_for_psa_set(2, &proposed_psa(None), &Document::new())
        .await
        .unwrap();

    let submitted = h.cluster.submitted_reconfigs();
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[1].members[2].priority, None);
    assert_eq!(
        h.notifier
            .count("Running second reconfig to give member at index 2 { priority: undefined }"),
        1
    );
}

/// Existing members may omit `votes`; the server default of 1 applies.
#[tokio::test]
async fn test_existing_members_without_votes_field() {
    let h = Harness::new(pa_config());
    let proposed = ReplicaSetConfig::new("rs0")
        .with_member(MemberConfig::new(0, "a:27017").with_priority(1.0))
        .with_member(MemberConfig::arbiter(1, "arb:27017"))
        .with_member(MemberConfig::new(2, "b:27017").with_votes(1).with_priority(1.0));

    h.orchestrator
        .reconfig_for_psa_set(2, &proposed, &Document::new())
        .await
        .unwrap();

    let submitted = h.cluster.submitted_reconfigs();
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[0].members[0].votes, None);
    assert_eq!(submitted[0].members[2].priority, Some(0.0));
    assert_eq!(submitted[1].members[2].priority, Some(1.0));
}

/// Both phases re-read the version.
#[tokio::test]
async fn test_phases_follow_concurrent_changes() {
    let h = Harness::new(pa_config());
    // initial read, then the read of phase 1's first attempt
    h.cluster.race_next_reads(2);

    h.orchestrator
        .reconfig_for_psa_set(2, &proposed_psa(Some(1.0)), &Document::new())
        .await
        .unwrap();

    let committed = h.cluster.committed();
    assert_eq!(committed.len(), 2);
    assert_eq!(committed[1].version, committed[0].version + 1);
    assert_eq!(committed[1].members[2].priority, Some(1.0));
}

// =============================================================================
// Validation Before Submission
// =============================================================================

/// Index past the end of the proposed members.
#[tokio::test]
async fn test_index_out_of_range() {
    let h = Harness::new(pa_config());

    let err = h
        .orchestrator
        .reconfig_for_psa_set(5, &proposed_psa(Some(1.0)), &Document::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ReplSetError::InvalidArgument(_)));
    assert!(err.to_string().contains("Node at index 5 does not exist"));
    assert!(h.cluster.commands().is_empty());
}

/// The proposed member must be a voter.
#[tokio::test]
async fn test_proposed_member_must_vote() {
    let h = Harness::new(pa_config());
    let proposed = pa_config().with_member(MemberConfig::new(2, "b:27017").with_votes(0));

    let err = h
        .orchestrator
        .reconfig_for_psa_set(2, &proposed, &Document::new())
        .await
        .unwrap_err();

    assert!(err
        .to_string()
        .contains("must have { votes: 1 } in the new config (actual: { votes: 0 })"));
    assert!(h.cluster.submitted_reconfigs().is_empty());
}

/// A member that already votes cannot be transitioned.
#[tokio::test]
async fn test_member_already_voting() {
    let current = pa_config().with_member(MemberConfig::new(2, "b:27017").with_votes(1));
    let h = Harness::new(current);

    let err = h
        .orchestrator
        .reconfig_for_psa_set(2, &proposed_psa(Some(1.0)), &Document::new())
        .await
        .unwrap_err();

    assert!(err
        .to_string()
        .contains("must have { votes: 0 } in the old config (actual: { votes: 1 })"));
    assert!(h.cluster.submitted_reconfigs().is_empty());
    assert_eq!(h.orchestrator.metrics().psa_transitions, 0);
}

/// An existing non-voting member can be promoted.
#[tokio::test]
async fn test_existing_non_voter_promoted() {
    let current = pa_config().with_member(
        MemberConfig::new(2, "b:27017")
            .with_votes(0)
            .with_priority(0.0),
    );
    let h = Harness::new(current);

    h.orchestrator
        .reconfig_for_psa_set(2, &proposed_psa(Some(1.0)), &Document::new())
        .await
        .unwrap();

    let member = &h.cluster.config().members[2];
    assert_eq!(member.votes, Some(1));
    assert_eq!(member.priority, Some(1.0));
}

/// Reusing an existing host under a new id warns but proceeds.
#[tokio::test]
async fn test_host_reuse_warns() {
    let current = pa_config().with_member(MemberConfig::new(7, "b:27017").with_votes(0));
    let h = Harness::new(current);
    let proposed = pa_config().with_member(MemberConfig::new(2, "b:27017").with_votes(1));

    h.orchestrator
        .reconfig_for_psa_set(2, &proposed, &Document::new())
        .await
        .unwrap();

    let messages = h.notifier.messages();
    assert!(messages[0].starts_with("Warning: Node at index 2 has { host: \"b:27017\" }"));
}

// =============================================================================
// Failures
// =============================================================================

/// Phase 1 failure: no second reconfig, plain error.
#[tokio::test]
async fn test_phase_one_failure() {
    let h = Harness::new(pa_config()).with_policy(quick_policy());
    h.cluster
        .fail_all_reconfigs(AdminCommandError::command_failed("not primary"));

    let err = h
        .orchestrator
        .reconfig_for_psa_set(2, &proposed_psa(Some(1.0)), &Document::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ReplSetError::Command(_)));
    assert_eq!(h.cluster.config().members.len(), 2);
    assert!(!h
        .notifier
        .messages()
        .iter()
        .any(|m| m.starts_with("Running second reconfig")));
}

/// Phase 2 failure: phase 1 stays committed, the manual command is reported.
#[tokio::test]
async fn test_phase_two_failure_is_partial() {
    let h = Harness::new(pa_config()).with_policy(quick_policy());
    h.cluster
        .fail_reconfigs_after(1, AdminCommandError::command_failed("not primary"));

    let err = h
        .orchestrator
        .reconfig_for_psa_set(2, &proposed_psa(Some(3.0)), &Document::new())
        .await
        .unwrap_err();

    match &err {
        ReplSetError::PartialTransition {
            attempted_command,
            source,
        } => {
            assert!(attempted_command.starts_with("rs.reconfig({"));
            assert!(attempted_command.contains("\"b:27017\""));
            assert!(matches!(**source, ReplSetError::Command(_)));
        }
        other => panic!("expected partial transition, got {:?}", other),
    }

    let live = h.cluster.config();
    assert_eq!(live.members[2].votes, Some(1));
    assert_eq!(live.members[2].priority, Some(0.0));

    let messages = h.notifier.messages();
    assert!(messages.contains(&"Second reconfig did not succeed, giving up".to_string()));
    assert!(messages
        .iter()
        .any(|m| m.starts_with("Attempted command: rs.reconfig(")));
    assert_eq!(h.orchestrator.metrics().psa_partial_transitions, 1);
}
