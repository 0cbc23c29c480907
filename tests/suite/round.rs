//! A full voting round against the file-backed store: seed, vote, close,
//! reload and export.

use tally_core::Dispatcher;
use tally_engine::{Engine, ExportError, ExportRecord, SeedError, export_records, seed_poll};
use tally_store::{FileStore, PollStore, StoreError};
use tally_types::{ExternalId, PollKind};
use tempfile::tempdir;

use crate::common::{entry, nominations, pid, poll_id, roster};

fn run(d: &mut Dispatcher<FileStore>, who: &str, commands: &[&str]) {
    for raw in commands {
        let outcome = d.handle(&pid(who), raw);
        assert!(outcome.is_applied(), "{who}: {raw} -> {outcome:?}");
    }
}

#[test]
fn round_survives_restart_and_exports() {
    let dir = tempdir().unwrap();
    let mut store = FileStore::new(dir.path());
    seed_poll(
        &mut store,
        &poll_id(),
        &roster(),
        PollKind::Standard,
        "results-db",
        &nominations(),
    )
    .unwrap();
    assert!(store.path_for(&poll_id()).exists());

    let mut d = Dispatcher::open(store, poll_id(), Engine::new(roster())).unwrap();
    run(&mut d, "bob", &["vote", "vote_select Piknik_na_obochine", "vote_points 6"]);
    run(&mut d, "bob", &["vote", "vote_select Solaris", "vote_points 4"]);
    run(&mut d, "carol", &["vote", "vote_select Master_i_Margarita", "vote_points 5"]);
    run(&mut d, "carol", &["vote", "vote_select The_Left_Hand", "vote_points 5"]);
    run(&mut d, "dave", &["vote", "vote_select Master_i_Margarita", "vote_points 3"]);
    drop(d);

    // A new process sees every vote; dialog state starts fresh.
    let mut d = Dispatcher::open(FileStore::new(dir.path()), poll_id(), Engine::new(roster()))
        .unwrap();
    assert_eq!(
        d.engine().progress(d.poll()).to_string(),
        "Voted: 2/4",
        "bob and carol spent their budgets"
    );
    assert_eq!(d.engine().pending_mentions(d.poll()), vec!["@alice", "@dave"]);

    let result = d.engine().result(d.poll(), false);
    let totals: Vec<(&str, u32)> = result
        .iter()
        .map(|v| (v.short_code.as_str(), v.points))
        .collect();
    assert_eq!(
        totals,
        vec![
            ("Master_i_Margarita", 8),
            ("Piknik_na_obochine", 6),
            ("The_Left_Hand", 5),
            ("Solaris", 4),
        ]
    );

    assert_eq!(
        export_records(d.poll(), d.engine().roster()),
        Err(ExportError::PollNotClosed)
    );
    run(&mut d, "alice", &["stop"]);

    let closed = FileStore::new(dir.path()).open(&poll_id()).unwrap();
    assert!(closed.is_closed());
    assert_eq!(closed.result_sink(), "results-db");

    let records = export_records(&closed, &roster()).unwrap();
    assert_eq!(records.len(), 5);
    assert_eq!(
        records[0],
        ExportRecord {
            participant: ExternalId::new("Bob Jones"),
            candidate: ExternalId::new("page-2"),
            points: 6,
        }
    );
    assert!(records.iter().all(|r| r.points > 0));
}

#[test]
fn seeding_with_unmapped_proposer_persists_nothing() {
    let dir = tempdir().unwrap();
    let mut store = FileStore::new(dir.path());
    let mut entries = nominations();
    entries.push(entry("Roadside Picnic", "Eve Stranger", "page-9"));

    let err = seed_poll(
        &mut store,
        &poll_id(),
        &roster(),
        PollKind::Standard,
        "",
        &entries,
    )
    .unwrap_err();

    assert!(matches!(err, SeedError::UnknownProposer { .. }));
    assert!(!store.exists(&poll_id()));
    assert!(matches!(
        store.open(&poll_id()),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn seeding_rejects_colliding_short_codes() {
    let dir = tempdir().unwrap();
    let mut store = FileStore::new(dir.path());
    let entries = vec![
        entry("Солярис", "Bob Jones", "page-1"),
        entry("Solyaris", "Carol White", "page-2"),
    ];

    let err = seed_poll(
        &mut store,
        &poll_id(),
        &roster(),
        PollKind::Standard,
        "",
        &entries,
    )
    .unwrap_err();

    assert!(matches!(err, SeedError::Poll(_)));
    assert!(!store.exists(&poll_id()));
}

#[test]
fn reopened_poll_accepts_votes_again() {
    let dir = tempdir().unwrap();
    let mut store = FileStore::new(dir.path());
    seed_poll(
        &mut store,
        &poll_id(),
        &roster(),
        PollKind::Review,
        "",
        &nominations(),
    )
    .unwrap();

    let mut d = Dispatcher::open(store, poll_id(), Engine::new(roster())).unwrap();
    run(&mut d, "alice", &["stop"]);
    assert!(d.handle(&pid("bob"), "vote").error().is_some());

    run(&mut d, "alice", &["resume"]);
    run(&mut d, "bob", &["vote", "vote_select Solaris", "vote_points 1"]);
    assert_eq!(d.screen(&pid("bob")).payloads(), vec!["update", "vote", "unvote", "menu"]);
}
