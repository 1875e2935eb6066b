mod common;

use std::fs;

use common::{digest, execute, id, irreversible, patch, table_names, Harness};
use hop_core::{database::Database, error::HopError, release::BumpLevel, vcs::VersionControl};
use hop_events::HopEvent;
use hop_operations::{restore, upgrade, Direction};

const USERS: &str = "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL);";
const DROP_USERS: &str = "DROP TABLE users;";
const POSTS: &str = "CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER REFERENCES users (id));";
const DROP_POSTS: &str = "DROP TABLE posts;";
const COMMENTS: &str = "CREATE TABLE comments (id INTEGER PRIMARY KEY, body TEXT);";
const DROP_COMMENTS: &str = "DROP TABLE comments;";

/// Development history with releases 1.0.0, 1.1.0 and 1.2.0 committed.
fn three_releases(h: &Harness) {
    h.ship(BumpLevel::Major, &[patch("users", USERS, DROP_USERS)]);
    h.ship(BumpLevel::Minor, &[patch("posts", POSTS, DROP_POSTS)]);
    h.ship(BumpLevel::Minor, &[patch("comments", COMMENTS, DROP_COMMENTS)]);
}

fn released(steps: &[hop_operations::ReleaseStep]) -> Vec<String> {
    steps.iter().map(|s| s.release.to_string()).collect()
}

#[test]
fn test_upgrade_applies_pending_releases_in_order() {
    let h = Harness::new(true, false);
    h.ship(BumpLevel::Major, &[patch("users", USERS, DROP_USERS)]);

    let (db, prod) = h.production("prod");
    let report = upgrade::upgrade(&prod).unwrap();
    assert_eq!(report.from, None);
    assert_eq!(released(&report.steps), ["0.0.0", "1.0.0"]);
    assert_eq!(db.last_applied_release().unwrap(), Some(id("1.0.0")));

    h.ship(BumpLevel::Minor, &[patch("posts", POSTS, DROP_POSTS)]);
    h.ship(BumpLevel::Minor, &[patch("comments", COMMENTS, DROP_COMMENTS)]);
    h.events.clear();

    let report = upgrade::upgrade(&prod).unwrap();
    assert_eq!(report.from, Some(id("1.0.0")));
    assert_eq!(released(&report.steps), ["1.1.0", "1.2.0"]);
    assert!(report.steps.iter().all(|s| s.direction == Direction::Forward));
    assert_eq!(db.last_applied_release().unwrap(), Some(id("1.2.0")));
    assert_eq!(digest(&db), digest(&h.database));

    let bindings: Vec<_> = h
        .events
        .events()
        .into_iter()
        .filter_map(|e| {
            match e {
                HopEvent::BindingUpdated { release } => release,
                _ => None,
            }
        })
        .collect();
    assert_eq!(bindings, ["1.1.0", "1.2.0"]);

    let report = upgrade::upgrade(&prod).unwrap();
    assert!(report.is_up_to_date());
}

#[test]
fn test_upgrade_halts_on_failure() {
    let h = Harness::new(true, false);
    three_releases(&h);

    let (db, prod) = h.production("prod");
    // created outside of hop, so 1.2.0 cannot create it again
    execute(&db, "CREATE TABLE comments (id INTEGER);");

    let err = upgrade::upgrade(&prod).unwrap_err();
    assert!(matches!(
        err,
        HopError::PatchApplicationFailed { ref release, ordinal: 1, .. } if release == "1.2.0"
    ));
    assert_eq!(db.last_applied_release().unwrap(), Some(id("1.1.0")));
    assert_eq!(db.failed_releases().unwrap(), vec![id("1.2.0")]);

    let err = upgrade::upgrade(&prod).unwrap_err();
    assert!(matches!(err, HopError::UnresolvedFailure { ref release } if release == "1.2.0"));
}

#[test]
fn test_upgrade_verifies_whole_chain_first() {
    let h = Harness::new(true, false);
    three_releases(&h);
    fs::remove_file(h.root().join("Patches/1/1/0/001-posts.sql")).unwrap();

    let (db, prod) = h.production("prod");
    let err = upgrade::upgrade(&prod).unwrap_err();
    assert!(matches!(err, HopError::NonContiguousHistory { ref release, .. } if release == "1.1.0"));
    assert_eq!(db.last_applied_release().unwrap(), None);
    assert!(table_names(&db).is_empty());
}

#[test]
fn test_upgrade_refuses_inconsistent_binding() {
    let h = Harness::new(true, false);
    three_releases(&h);

    let (db, prod) = h.production("prod");
    db.set_release_status(&id("3.0.0"), hop_core::database::ReleaseStatus::Applied)
        .unwrap();

    let err = upgrade::upgrade(&prod).unwrap_err();
    assert!(matches!(err, HopError::InconsistentBinding { .. }));
}

#[test]
fn test_upgrade_requires_main_branch() {
    let h = Harness::new(true, false);
    let (_db, prod) = h.production("prod");
    h.vcs.create_branch("feature").unwrap();

    let err = upgrade::upgrade(&prod).unwrap_err();
    assert!(matches!(err, HopError::WrongBranch { ref actual, .. } if actual == "feature"));
}

#[test]
fn test_restore_round_trip() {
    let h = Harness::new(true, false);
    three_releases(&h);
    let (db, prod) = h.production("prod");
    upgrade::upgrade(&prod).unwrap();
    let before = digest(&db);

    let report = restore::restore(&prod, &id("1.0.0"), false).unwrap();
    assert_eq!(report.from, Some(id("1.2.0")));
    assert_eq!(released(&report.steps), ["1.2.0", "1.1.0"]);
    assert!(report.steps.iter().all(|s| s.direction == Direction::Backward));
    assert_eq!(db.last_applied_release().unwrap(), Some(id("1.0.0")));
    assert_eq!(table_names(&db), vec!["users"]);

    let report = restore::restore(&prod, &id("1.2.0"), false).unwrap();
    assert_eq!(released(&report.steps), ["1.1.0", "1.2.0"]);
    assert_eq!(db.last_applied_release().unwrap(), Some(id("1.2.0")));
    assert_eq!(digest(&db), before);
}

#[test]
fn test_restore_to_current_release_is_a_no_op() {
    let h = Harness::new(true, false);
    three_releases(&h);
    let (_db, prod) = h.production("prod");
    upgrade::upgrade(&prod).unwrap();

    let report = restore::restore(&prod, &id("1.2.0"), false).unwrap();
    assert!(report.steps.is_empty());
    assert!(report.package.is_none());
}

#[test]
fn test_restore_unknown_release() {
    let h = Harness::new(true, false);
    three_releases(&h);
    let (_db, prod) = h.production("prod");

    let err = restore::restore(&prod, &id("9.9.9"), false).unwrap_err();
    assert!(matches!(err, HopError::UnknownRelease(ref r) if r == "9.9.9"));
}

#[test]
fn test_restore_checks_inverses_across_chain() {
    let h = Harness::new(true, false);
    h.ship(BumpLevel::Major, &[patch("users", USERS, DROP_USERS)]);
    h.ship(BumpLevel::Minor, &[irreversible("posts", POSTS)]);
    h.ship(BumpLevel::Minor, &[patch("comments", COMMENTS, DROP_COMMENTS)]);

    let (db, prod) = h.production("prod");
    upgrade::upgrade(&prod).unwrap();

    let err = restore::restore(&prod, &id("1.0.0"), false).unwrap_err();
    assert!(matches!(err, HopError::IrreversiblePatch { ref release, .. } if release == "1.1.0"));
    assert_eq!(db.last_applied_release().unwrap(), Some(id("1.2.0")));
    assert_eq!(table_names(&db).len(), 3);
}

#[test]
fn test_restore_outside_production_needs_force() {
    let h = Harness::new(true, false);
    three_releases(&h);

    let err = restore::restore(&h.ctx, &id("1.0.0"), false).unwrap_err();
    assert!(matches!(err, HopError::OperationNotAllowed { .. }));

    let report = restore::restore(&h.ctx, &id("1.1.0"), true).unwrap();
    assert_eq!(released(&report.steps), ["1.2.0"]);
    assert_eq!(h.database.last_applied_release().unwrap(), Some(id("1.1.0")));
    assert_eq!(h.vcs.current_branch().unwrap(), common::MAIN);
}
