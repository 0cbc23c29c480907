//! Wiring from a config file to a running dispatcher.

use std::fs;

use tally_config::{ConfigError, TallyConfig};
use tally_core::{Dispatcher, SessionState};
use tally_engine::{ActivityCheck, Engine, seed_poll};
use tally_store::{FileStore, PollStore};
use tally_types::PollKind;
use tempfile::tempdir;

use crate::common::{nominations, pid};

const CONFIG: &str = r#"
[poll]
id = "2026-10"
data_dir = "data"
kind = "standard"
result_sink = "${TALLY_SUITE_SINK}"
activity_check = "enabled"

[roster]
admins = ["alice"]

[roster.participants]
alice = "Alice Smith"
bob = "Bob Jones"
carol = "Carol White"
dave = "Dave Brown"
"#;

#[test]
fn config_drives_store_location_and_activity_policy() {
    unsafe {
        std::env::set_var("TALLY_SUITE_SINK", "notion-results");
    }
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, CONFIG).unwrap();

    let settings = TallyConfig::load(Some(path.as_path())).unwrap();
    assert_eq!(settings.result_sink, "notion-results");
    assert_eq!(settings.activity_check, ActivityCheck::Enabled);
    assert_eq!(settings.data_dir, dir.path().join("data"));

    let mut store = FileStore::new(&settings.data_dir);
    seed_poll(
        &mut store,
        &settings.poll_id,
        &settings.roster,
        settings.kind,
        &settings.result_sink,
        &nominations(),
    )
    .unwrap();
    assert!(dir.path().join("data").join("2026-10.json").exists());

    let engine = Engine::new(settings.roster.clone()).with_activity_check(settings.activity_check);
    let mut d = Dispatcher::open(store, settings.poll_id.clone(), engine).unwrap();
    let bob = pid("bob");

    d.handle(&bob, "vote");
    assert_eq!(d.session_state(&bob), SessionState::ActivityCheck);
    assert!(d.handle(&bob, "activity false").is_applied());
    assert!(d.handle(&bob, "vote_select Solaris").is_applied());
    assert!(d.handle(&bob, "vote_points 8").error().is_some());
    assert!(d.handle(&bob, "vote_points 7").is_applied());

    let saved = FileStore::new(&settings.data_dir)
        .open(&settings.poll_id)
        .unwrap();
    assert_eq!(saved.kind(), PollKind::Standard);
    assert!(saved.participant(&bob).activity_checked());
    assert_eq!(saved.participant(&bob).max_points(), 7);
    assert_eq!(saved.result_sink(), "notion-results");

    unsafe {
        std::env::remove_var("TALLY_SUITE_SINK");
    }
}

#[test]
fn admin_outside_roster_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "[poll]\nid = \"r1\"\n[roster]\nadmins = [\"root\"]\n[roster.participants]\nbob = \"B\"\n",
    )
    .unwrap();

    let err = TallyConfig::load(Some(path.as_path())).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }));
    assert!(err.to_string().contains("root"));
}
