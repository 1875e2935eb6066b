//! End-to-end runs against the system `git`.

use std::{fs, sync::Arc};

use hop_config::ProjectConfig;
use hop_core::{
    environment::{Environment, Mode, Operation},
    error::HopError,
    release::{BumpLevel, ReleaseId},
    vcs::{SystemGit, VersionControl},
};
use hop_events::CollectorSink;
use hop_operations::{apply, init, prepare, release, stage, status, undo, HopContext};

#[test]
fn test_new_package_scaffolds_repository() {
    let parent = tempfile::tempdir().unwrap();
    let events = Arc::new(CollectorSink::default());

    let report = init::new_package(parent.path(), "blog", true, events.clone()).unwrap();
    let root = parent.path().join("blog");
    assert_eq!(report.root, root);
    assert_eq!(report.release, ReleaseId::initial());
    assert_eq!(report.tag, "v0.0.0");
    assert!(report.warnings.is_empty());

    assert!(ProjectConfig::is_initialized(&root));
    assert!(root.join(".hop/local.toml").is_file());
    assert!(root.join(".hop/blog.sqlite3").is_file());
    assert!(root.join("Patches/0/0/0/release.toml").is_file());
    assert!(root.join("blog/schema.sql").is_file());
    let gitignore = fs::read_to_string(root.join(".gitignore")).unwrap();
    assert!(gitignore.contains(".hop/local.toml"));

    let git = SystemGit::open(&root).unwrap();
    assert_eq!(git.current_branch().unwrap(), "hop_main");
    assert_eq!(git.tags().unwrap(), vec!["v0.0.0"]);
    assert!(!events.is_empty());
}

#[test]
fn test_new_package_refuses_existing_repository() {
    let parent = tempfile::tempdir().unwrap();
    init::new_package(parent.path(), "blog", true, Arc::new(CollectorSink::default())).unwrap();

    let err = init::new_package(parent.path(), "blog", true, Arc::new(CollectorSink::default())).unwrap_err();
    assert!(matches!(err, HopError::Config(_)));

    let nested = parent.path().join("blog").join("sub");
    fs::create_dir_all(&nested).unwrap();
    let err = init::new_package(&nested, "other", true, Arc::new(CollectorSink::default())).unwrap_err();
    assert!(matches!(err, HopError::OperationNotAllowed { .. }));
}

#[test]
fn test_new_package_rejects_invalid_name() {
    let parent = tempfile::tempdir().unwrap();
    let err = init::new_package(parent.path(), "my blog", true, Arc::new(CollectorSink::default())).unwrap_err();
    assert!(matches!(err, HopError::Config(_)));
    assert!(!parent.path().join("my blog").exists());
}

#[test]
fn test_full_cycle_with_git() {
    let parent = tempfile::tempdir().unwrap();
    init::new_package(parent.path(), "blog", true, Arc::new(CollectorSink::default())).unwrap();
    let root = parent.path().join("blog");

    let ctx = HopContext::open(&root, Arc::new(CollectorSink::default())).unwrap();
    let report = status::status(&ctx).unwrap();
    assert_eq!(report.state.mode, Mode::Development);
    assert_eq!(report.state.environment, Environment::Development);
    assert_eq!(report.state.last_committed_release, Some(ReleaseId::initial()));
    assert!(report.current.is_none());
    assert!(report.allowed.contains(&Operation::Prepare));

    prepare::prepare(&ctx, BumpLevel::Minor, Some("users")).unwrap();
    let script = parent.path().join("users.sql");
    fs::write(&script, "CREATE TABLE users (id INTEGER PRIMARY KEY);").unwrap();
    let inverse = parent.path().join("users.down.sql");
    fs::write(&inverse, "DROP TABLE users;").unwrap();
    stage::stage(&ctx, &script, Some(&inverse)).unwrap();

    apply::apply(&ctx).unwrap();
    let sql = fs::read_to_string(root.join("blog/schema.sql")).unwrap();
    assert!(sql.contains("CREATE TABLE users"));

    let report = release::release(&ctx, false).unwrap();
    assert_eq!(report.tag, "v0.1.0");

    let git = SystemGit::open(&root).unwrap();
    assert_eq!(git.current_branch().unwrap(), "hop_main");
    assert!(git.history_contains("v0.1.0").unwrap());
    assert!(root.join("Patches/0/1/0/001-users.sql").is_file());
}

#[test]
fn test_undo_discards_git_branch() {
    let parent = tempfile::tempdir().unwrap();
    init::new_package(parent.path(), "blog", true, Arc::new(CollectorSink::default())).unwrap();
    let root = parent.path().join("blog");
    let ctx = HopContext::open(&root, Arc::new(CollectorSink::default())).unwrap();

    prepare::prepare(&ctx, BumpLevel::Patch, None).unwrap();
    let script = parent.path().join("tags.sql");
    fs::write(&script, "CREATE TABLE tags (name TEXT PRIMARY KEY);").unwrap();
    let inverse = parent.path().join("tags.down.sql");
    fs::write(&inverse, "DROP TABLE tags;").unwrap();
    stage::stage(&ctx, &script, Some(&inverse)).unwrap();
    apply::apply(&ctx).unwrap();

    let report = undo::undo(&ctx, false).unwrap();
    assert_eq!(report.branch_discarded.as_deref(), Some("hop_0.0.1"));

    let git = SystemGit::open(&root).unwrap();
    assert_eq!(git.current_branch().unwrap(), "hop_main");
    assert!(!git.branch_exists("hop_0.0.1").unwrap());
    assert!(!root.join("Patches/0/0/1").exists());
}
