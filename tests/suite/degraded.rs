//! Persistence failures must not stop the dispatcher.

use tally_core::{DEGRADED_WARNING, Dispatcher};
use tally_engine::Engine;
use tally_store::PollStore;
use tally_types::{Candidate, ExternalId, Poll, PollKind};

use crate::common::{FlakyStore, pid, poll_id, roster};

fn dispatcher() -> Dispatcher<FlakyStore> {
    let mut poll = Poll::new(PollKind::Standard, "");
    for (text, author) in [("Dune", "carol"), ("Solaris", "dave")] {
        poll.add_candidate(Candidate::new(text, pid(author), ExternalId::new(text)).unwrap())
            .unwrap();
    }
    let store = FlakyStore::seeded(&poll_id(), &poll);
    Dispatcher::open(store, poll_id(), Engine::new(roster())).unwrap()
}

#[test]
fn failed_save_keeps_change_and_warns() {
    let mut d = dispatcher();
    let bob = pid("bob");
    d.store_mut().fail_saves = true;

    for raw in ["vote", "vote_select Dune", "vote_points 4"] {
        assert!(d.handle(&bob, raw).is_applied());
    }

    assert!(d.is_degraded());
    assert_eq!(d.poll().participant(&bob).points_used(), 4);
    assert_eq!(
        d.store().open(&poll_id()).unwrap().participant(&bob).points_used(),
        0
    );
    assert!(d.screen(&bob).text.starts_with(DEGRADED_WARNING));
    assert!(d.screen(&pid("carol")).text.starts_with(DEGRADED_WARNING));
}

#[test]
fn next_command_retries_and_recovers() {
    let mut d = dispatcher();
    let bob = pid("bob");
    d.store_mut().fail_saves = true;
    for raw in ["vote", "vote_select Dune", "vote_points 4"] {
        d.handle(&bob, raw);
    }
    assert_eq!(d.store().failed_saves, 1);

    // Still failing: a read-only command retries and stays degraded.
    d.handle(&bob, "update");
    assert_eq!(d.store().failed_saves, 2);
    assert!(d.is_degraded());

    d.store_mut().fail_saves = false;
    assert!(d.handle(&pid("carol"), "update").is_applied());
    assert!(!d.is_degraded());
    assert_eq!(
        d.store().open(&poll_id()).unwrap().participant(&bob).points_used(),
        4
    );
    assert!(!d.screen(&bob).text.contains(DEGRADED_WARNING));
}

#[test]
fn rejected_commands_do_not_touch_the_store() {
    let mut d = dispatcher();
    d.store_mut().fail_saves = true;

    assert!(!d.handle(&pid("bob"), "vote_points 3").is_applied());
    assert!(!d.handle(&pid("mallory"), "vote").is_applied());
    assert_eq!(d.store().failed_saves, 0);
    assert!(!d.is_degraded());
}
