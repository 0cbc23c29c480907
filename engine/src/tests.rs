use tally_store::{MemoryStore, PollStore};
use tally_types::{
    Candidate, ExternalId, ParticipantId, ParticipantState, Poll, PollId, PollKind, Roster,
};

use super::{
    ActivityCheck, Engine, ExportError, ExportRecord, SeedEntry, SeedError, VoteError,
    export_records, seed_poll,
};

fn pid(handle: &str) -> ParticipantId {
    ParticipantId::new(handle)
}

fn roster() -> Roster {
    Roster::new(
        [
            (pid("alice"), ExternalId::new("ext-alice")),
            (pid("bob"), ExternalId::new("ext-bob")),
            (pid("carol"), ExternalId::new("ext-carol")),
        ],
        [pid("alice")],
    )
    .unwrap()
}

/// Five candidates; "Own Book" belongs to bob, the rest to carol.
fn poll() -> Poll {
    let mut poll = Poll::new(PollKind::Standard, "sink");
    for (text, author) in [
        ("Dune", "carol"),
        ("Solaris", "carol"),
        ("Hyperion", "carol"),
        ("Neuromancer", "carol"),
        ("Own Book", "bob"),
    ] {
        poll.add_candidate(
            Candidate::new(text, pid(author), ExternalId::new(format!("page-{text}"))).unwrap(),
        )
        .unwrap();
    }
    poll
}

fn engine() -> Engine {
    Engine::new(roster())
}

// ========================================================================
// Budget and choice limits
// ========================================================================

#[test]
fn quota_exceeded_leaves_state_unchanged() {
    let engine = engine();
    let mut poll = poll();
    let bob = pid("bob");

    engine.cast_vote(&mut poll, &bob, "Dune", 4).unwrap();
    engine.cast_vote(&mut poll, &bob, "Solaris", 5).unwrap();
    let before = poll.clone();

    let err = engine.cast_vote(&mut poll, &bob, "Hyperion", 2).unwrap_err();
    assert_eq!(
        err,
        VoteError::QuotaExceeded {
            requested: 2,
            available: 1
        }
    );
    assert_eq!(poll, before);
}

#[test]
fn fourth_distinct_candidate_is_rejected_with_budget_left() {
    let engine = engine();
    let mut poll = poll();
    let bob = pid("bob");

    engine.cast_vote(&mut poll, &bob, "Dune", 1).unwrap();
    engine.cast_vote(&mut poll, &bob, "Solaris", 1).unwrap();
    engine.cast_vote(&mut poll, &bob, "Hyperion", 1).unwrap();

    assert_eq!(
        engine.cast_vote(&mut poll, &bob, "Neuromancer", 1),
        Err(VoteError::TooManyChoices)
    );
    assert!(!engine.can_vote(&poll, &bob));
    assert_eq!(
        engine.check_vote(&poll, &bob),
        Err(VoteError::TooManyChoices)
    );
}

#[test]
fn updating_an_existing_choice_ignores_choice_limit() {
    let engine = engine();
    let mut poll = poll();
    let bob = pid("bob");

    engine.cast_vote(&mut poll, &bob, "Dune", 1).unwrap();
    engine.cast_vote(&mut poll, &bob, "Solaris", 1).unwrap();
    engine.cast_vote(&mut poll, &bob, "Hyperion", 1).unwrap();
    engine.cast_vote(&mut poll, &bob, "Dune", 8).unwrap();

    let state = poll.participant(&bob);
    assert_eq!(state.points_used(), 10);
    assert_eq!(state.choices(), ParticipantState::MAX_VOTES);
}

#[test]
fn recast_returns_previous_points_to_budget() {
    let engine = engine();
    let mut poll = poll();
    let bob = pid("bob");

    engine.cast_vote(&mut poll, &bob, "Dune", 10).unwrap();
    assert_eq!(
        engine.check_vote(&poll, &bob),
        Err(VoteError::BudgetExhausted)
    );
    // Lowering an allocation is allowed even with the budget spent.
    engine.cast_vote(&mut poll, &bob, "Dune", 3).unwrap();
    assert_eq!(engine.summary(&poll, &bob).used, 3);
}

#[test]
fn latest_cast_wins_in_view() {
    let engine = engine();
    let mut poll = poll();
    let bob = pid("bob");

    engine.cast_vote(&mut poll, &bob, "Dune", 6).unwrap();
    engine.cast_vote(&mut poll, &bob, "Dune", 2).unwrap();

    let views = engine.view(&poll, &bob, true);
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].short_code, "Dune");
    assert_eq!(views[0].points, 2);
}

#[test]
fn cast_vote_validates_arguments() {
    let engine = engine();
    let mut poll = poll();
    let bob = pid("bob");

    assert_eq!(
        engine.cast_vote(&mut poll, &bob, "Dune", 0),
        Err(VoteError::ZeroPoints)
    );
    assert_eq!(
        engine.cast_vote(&mut poll, &bob, "Missing", 1),
        Err(VoteError::UnknownCandidate("Missing".to_string()))
    );
    assert_eq!(
        engine.cast_vote(&mut poll, &bob, "Own_Book", 1),
        Err(VoteError::SelfVote)
    );
    assert_eq!(poll.participants().count(), 0);
}

#[test]
fn disabled_participant_has_no_budget() {
    let engine = engine();
    let mut poll = poll();
    let bob = pid("bob");
    poll.participant_mut(&bob).set_disabled(true);

    assert_eq!(
        engine.cast_vote(&mut poll, &bob, "Dune", 1),
        Err(VoteError::QuotaExceeded {
            requested: 1,
            available: 0
        })
    );
    assert!(!engine.can_vote(&poll, &bob));
}

// ========================================================================
// Unvote
// ========================================================================

#[test]
fn remove_absent_vote_fails_without_change() {
    let engine = engine();
    let mut poll = poll();
    let bob = pid("bob");
    engine.cast_vote(&mut poll, &bob, "Dune", 3).unwrap();
    let before = poll.clone();

    assert_eq!(
        engine.remove_vote(&mut poll, &bob, "Solaris"),
        Err(VoteError::UnknownVote("Solaris".to_string()))
    );
    assert_eq!(poll, before);

    engine.remove_vote(&mut poll, &bob, "Dune").unwrap();
    assert!(engine.view(&poll, &bob, true).is_empty());
    assert_eq!(engine.check_unvote(&poll, &bob), Err(VoteError::NoVotes));
}

// ========================================================================
// Close / reopen
// ========================================================================

#[test]
fn close_blocks_mutation_without_touching_votes() {
    let engine = engine();
    let mut poll = poll();
    let bob = pid("bob");
    engine.cast_vote(&mut poll, &bob, "Dune", 3).unwrap();

    engine.close(&mut poll, &pid("alice")).unwrap();

    for who in ["alice", "bob", "carol"] {
        assert!(!engine.can_vote(&poll, &pid(who)));
        assert!(!engine.can_unvote(&poll, &pid(who)));
    }
    assert_eq!(poll.participant(&bob).points_used(), 3);
    assert_eq!(
        engine.cast_vote(&mut poll, &bob, "Solaris", 1),
        Err(VoteError::PollClosed)
    );
    assert_eq!(
        engine.remove_vote(&mut poll, &bob, "Dune"),
        Err(VoteError::PollClosed)
    );
}

#[test]
fn only_admins_toggle_voting() {
    let engine = engine();
    let mut poll = poll();
    let alice = pid("alice");

    assert_eq!(
        engine.close(&mut poll, &pid("bob")),
        Err(VoteError::NotAuthorized)
    );
    assert_eq!(
        engine.check_resume(&poll, &alice),
        Err(VoteError::PollNotClosed)
    );
    assert!(engine.can_stop(&poll, &alice));

    engine.close(&mut poll, &alice).unwrap();
    assert_eq!(
        engine.close(&mut poll, &alice),
        Err(VoteError::PollAlreadyClosed)
    );
    assert!(engine.can_resume(&poll, &alice));
    assert!(!engine.can_resume(&poll, &pid("bob")));

    engine.reopen(&mut poll, &alice).unwrap();
    assert!(!poll.is_closed());
}

// ========================================================================
// Activity check
// ========================================================================

#[test]
fn activity_check_is_off_by_default() {
    let engine = engine();
    assert_eq!(engine.activity_check(), ActivityCheck::Disabled);
    assert!(!engine.needs_activity_check(&poll(), &pid("bob")));
}

#[test]
fn declining_activity_reduces_budget_once() {
    let engine = engine().with_activity_check(ActivityCheck::Enabled);
    let mut poll = poll();
    let bob = pid("bob");

    assert!(engine.needs_activity_check(&poll, &bob));
    engine
        .set_activity_confirmation(&mut poll, &bob, false)
        .unwrap();
    assert!(!engine.needs_activity_check(&poll, &bob));
    assert_eq!(engine.summary(&poll, &bob).budget, 7);
    assert_eq!(
        engine.set_activity_confirmation(&mut poll, &bob, true),
        Err(VoteError::ActivityAlreadyChecked)
    );
    assert_eq!(
        engine.cast_vote(&mut poll, &bob, "Dune", 8),
        Err(VoteError::QuotaExceeded {
            requested: 8,
            available: 7
        })
    );
}

#[test]
fn declining_activity_refused_while_overspent() {
    let mut poll = poll();
    let bob = pid("bob");
    // Cast before the policy was turned on.
    engine().cast_vote(&mut poll, &bob, "Dune", 9).unwrap();

    let engine = engine().with_activity_check(ActivityCheck::Enabled);
    assert!(engine.needs_activity_check(&poll, &bob));
    let before = poll.clone();
    assert_eq!(
        engine.set_activity_confirmation(&mut poll, &bob, false),
        Err(VoteError::QuotaExceeded {
            requested: 9,
            available: 7
        })
    );
    assert_eq!(poll, before);

    engine
        .set_activity_confirmation(&mut poll, &bob, true)
        .unwrap();
    let summary = engine.summary(&poll, &bob);
    assert_eq!((summary.used, summary.budget), (9, 10));
}

#[test]
fn declining_activity_allowed_within_reduced_budget() {
    let mut poll = poll();
    let bob = pid("bob");
    engine().cast_vote(&mut poll, &bob, "Dune", 7).unwrap();

    let engine = engine().with_activity_check(ActivityCheck::Enabled);
    engine
        .set_activity_confirmation(&mut poll, &bob, false)
        .unwrap();
    let summary = engine.summary(&poll, &bob);
    assert_eq!((summary.used, summary.budget), (7, 7));
    assert!(!engine.can_vote(&poll, &bob));
}

#[test]
fn review_polls_skip_activity_check() {
    let engine = engine().with_activity_check(ActivityCheck::Enabled);
    let mut poll = poll();
    poll.set_kind(PollKind::Review);
    assert!(!engine.needs_activity_check(&poll, &pid("bob")));
}

// ========================================================================
// Queries
// ========================================================================

#[test]
fn own_candidates_never_in_view() {
    let engine = engine();
    let poll = poll();

    let bob_view = engine.view(&poll, &pid("bob"), false);
    assert_eq!(bob_view.len(), 4);
    assert!(bob_view.iter().all(|v| v.short_code != "Own_Book"));

    let carol_view = engine.view(&poll, &pid("carol"), false);
    assert_eq!(carol_view.len(), 1);
    assert_eq!(carol_view[0].index, 5);
}

#[test]
fn progress_counts_roster_members() {
    let engine = engine();
    let mut poll = poll();
    let bob = pid("bob");
    engine.cast_vote(&mut poll, &bob, "Dune", 10).unwrap();
    poll.participant_mut(&pid("carol")).set_disabled(true);

    let progress = engine.progress(&poll);
    assert_eq!(progress.total, 2);
    assert_eq!(progress.pending, vec![pid("alice")]);
    assert_eq!(progress.to_string(), "Voted: 1/2");
    assert_eq!(engine.pending_mentions(&poll), vec!["@alice".to_string()]);
}

#[test]
fn closing_does_not_change_progress() {
    let engine = engine();
    let mut poll = poll();
    engine.cast_vote(&mut poll, &pid("bob"), "Dune", 10).unwrap();
    let open = engine.progress(&poll);
    assert_eq!(open.to_string(), "Voted: 1/3");

    engine.close(&mut poll, &pid("alice")).unwrap();
    assert_eq!(engine.progress(&poll), open);
    assert_eq!(engine.pending_mentions(&poll), vec!["@alice", "@carol"]);
    assert!(!engine.can_vote(&poll, &pid("carol")));
}

#[test]
fn result_sums_and_sorts_descending() {
    let engine = engine();
    let mut poll = poll();
    engine.cast_vote(&mut poll, &pid("bob"), "Solaris", 4).unwrap();
    engine.cast_vote(&mut poll, &pid("alice"), "Solaris", 3).unwrap();
    engine.cast_vote(&mut poll, &pid("alice"), "Hyperion", 7).unwrap();
    engine.cast_vote(&mut poll, &pid("alice"), "Own_Book", 0).unwrap_err();

    let result = engine.result(&poll, false);
    let codes: Vec<(&str, u32)> = result
        .iter()
        .map(|v| (v.short_code.as_str(), v.points))
        .collect();
    assert_eq!(codes, vec![("Solaris", 7), ("Hyperion", 7)]);

    let all = engine.result(&poll, true);
    assert_eq!(all.len(), poll.candidates().len());
    assert!(all.iter().skip(2).all(|v| v.points == 0));
}

#[test]
fn summary_display() {
    let engine = engine();
    let mut poll = poll();
    engine.cast_vote(&mut poll, &pid("bob"), "Dune", 4).unwrap();
    assert_eq!(
        engine.summary(&poll, &pid("bob")).to_string(),
        "4/10 points, 1/3 choices"
    );
}

// ========================================================================
// Seeding
// ========================================================================

fn entry(text: &str, proposer: &str) -> SeedEntry {
    SeedEntry {
        text: text.to_string(),
        proposer: ExternalId::new(proposer),
        id: ExternalId::new(format!("page-{text}")),
    }
}

#[test]
fn seed_creates_and_persists_poll() {
    let mut store = MemoryStore::new();
    let id = PollId::new("round-7").unwrap();

    let poll = seed_poll(
        &mut store,
        &id,
        &roster(),
        PollKind::Review,
        "db-1",
        &[entry("Dune", "ext-bob"), entry("Solaris", "ext-carol")],
    )
    .unwrap();

    assert_eq!(poll.candidates()[0].author(), &pid("bob"));
    assert_eq!(store.open(&id).unwrap(), poll);
    assert_eq!(poll.result_sink(), "db-1");
    assert_eq!(poll.kind(), PollKind::Review);
}

#[test]
fn seed_with_unmapped_proposer_leaves_nothing() {
    let mut store = MemoryStore::new();
    let id = PollId::new("round-8").unwrap();

    let err = seed_poll(
        &mut store,
        &id,
        &roster(),
        PollKind::Standard,
        "",
        &[entry("Dune", "ext-bob"), entry("Solaris", "ext-stranger")],
    )
    .unwrap_err();

    assert!(matches!(err, SeedError::UnknownProposer { .. }));
    assert!(!store.exists(&id));
}

#[test]
fn seed_refuses_existing_poll() {
    let mut store = MemoryStore::new();
    let id = PollId::new("round-9").unwrap();
    store.create_empty(&id).unwrap();

    let err = seed_poll(&mut store, &id, &roster(), PollKind::Standard, "", &[]).unwrap_err();
    assert!(matches!(err, SeedError::Store(_)));
    assert!(store.exists(&id));
}

#[test]
fn seed_entries_parse_from_json() {
    let raw = r#"[{"text": "Dune", "proposer": "ext-bob", "id": "page-1"}]"#;
    let entries: Vec<SeedEntry> = serde_json::from_str(raw).unwrap();
    assert_eq!(entries[0].proposer, ExternalId::new("ext-bob"));
}

// ========================================================================
// Export
// ========================================================================

#[test]
fn export_requires_closed_poll() {
    assert_eq!(
        export_records(&poll(), &roster()),
        Err(ExportError::PollNotClosed)
    );
}

#[test]
fn export_lists_non_zero_votes_sorted() {
    let engine = engine();
    let mut poll = poll();
    engine.cast_vote(&mut poll, &pid("carol"), "Own_Book", 2).unwrap();
    engine.cast_vote(&mut poll, &pid("bob"), "Solaris", 4).unwrap();
    engine.cast_vote(&mut poll, &pid("bob"), "Dune", 1).unwrap();
    engine.close(&mut poll, &pid("alice")).unwrap();

    let records = export_records(&poll, engine.roster()).unwrap();
    assert_eq!(
        records,
        vec![
            ExportRecord {
                participant: ExternalId::new("ext-bob"),
                candidate: ExternalId::new("page-Dune"),
                points: 1,
            },
            ExportRecord {
                participant: ExternalId::new("ext-bob"),
                candidate: ExternalId::new("page-Solaris"),
                points: 4,
            },
            ExportRecord {
                participant: ExternalId::new("ext-carol"),
                candidate: ExternalId::new("page-Own Book"),
                points: 2,
            },
        ]
    );
}

#[test]
fn export_rejects_voter_missing_from_roster() {
    let engine = engine();
    let mut poll = poll();
    engine.cast_vote(&mut poll, &pid("dave"), "Dune", 1).unwrap();
    engine.close(&mut poll, &pid("alice")).unwrap();

    assert_eq!(
        export_records(&poll, engine.roster()),
        Err(ExportError::UnknownParticipant(pid("dave")))
    );
}
