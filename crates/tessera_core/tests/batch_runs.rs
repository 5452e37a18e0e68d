use std::fs;
use std::path::Path;
use tessera_core::{BatchContext, BatchError, EngineConfig, Orchestrator, RunMode};

fn write_note(root: &Path, relative: &str, tags: &[&str], body: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut content = String::from("---\ntags:\n");
    for tag in tags {
        content.push_str(&format!("  - {tag}\n"));
    }
    content.push_str("---\n");
    content.push_str(body);
    fs::write(path, content).unwrap();
}

/// Six-file corpus exercising phase-1 removal, format standardization,
/// normalizer rewrites and untouched tags.
fn seed_fixture_corpus(root: &Path) {
    write_note(root, "a.md", &["protocol", "ritual", "chaos"], "alpha\n");
    write_note(root, "b.md", &["archetype", "narrative", "memoir"], "beta\n");
    write_note(root, "c.md", &["recovery", "survival", "work"], "gamma\n");
    write_note(
        root,
        "formats/d.md",
        &["thread-dump", "_import", "colors/0A0A23"],
        "delta\n",
    );
    write_note(
        root,
        "formats/e.md",
        &["'#flatline'", "flatline-codex/flatline", "B9F5D8"],
        "epsilon\n",
    );
    write_note(
        root,
        "keep/f.md",
        &["sponsor", "mayo-clinic", "nyx"],
        "zeta\n",
    );
}

fn orchestrator(vault: &Path, state: &Path) -> Orchestrator {
    Orchestrator::new(BatchContext {
        vault_root: vault.to_path_buf(),
        state_dir: state.to_path_buf(),
        config: EngineConfig::builtin_default(),
    })
}

#[test]
fn dry_run_reports_changes_without_writing() {
    let vault = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    seed_fixture_corpus(vault.path());
    let before: Vec<String> = ["a.md", "b.md", "c.md", "formats/d.md", "formats/e.md"]
        .iter()
        .map(|p| fs::read_to_string(vault.path().join(p)).unwrap())
        .collect();

    let result = orchestrator(vault.path(), state.path())
        .consolidate(RunMode::DryRun)
        .unwrap();

    assert_eq!(result.files_scanned, 6);
    assert_eq!(result.files_changed, 5);
    assert!(result.failures.is_empty());
    assert!(result.snapshot.is_none());

    // Regression shape: 18 unique raw tags collapse to 8, nine of them
    // removed as coordinate-redundant.
    assert_eq!(result.unique_tags_before, 18);
    assert_eq!(result.unique_tags_after, 8);

    let after: Vec<String> = ["a.md", "b.md", "c.md", "formats/d.md", "formats/e.md"]
        .iter()
        .map(|p| fs::read_to_string(vault.path().join(p)).unwrap())
        .collect();
    assert_eq!(before, after, "dry run must not modify the corpus");
    assert!(!state.path().join("coordinates.db").exists());
}

#[test]
fn execute_applies_exactly_the_dry_run_change_set() {
    let vault = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    seed_fixture_corpus(vault.path());
    let orchestrator = orchestrator(vault.path(), state.path());

    let dry = orchestrator.consolidate(RunMode::DryRun).unwrap();
    let executed = orchestrator.consolidate(RunMode::Execute).unwrap();

    assert_eq!(dry.changes, executed.changes);
    assert_eq!(dry.total_tag_changes, executed.total_tag_changes);
    assert!(executed.snapshot.is_some());
    assert!(executed.failures.is_empty());

    // Written files carry the consolidated tag sets as block lists.
    let rewritten = fs::read_to_string(vault.path().join("formats/e.md")).unwrap();
    assert!(rewritten.contains("tags:\n  - color-b9f5d8\n  - flatline\n"));
    assert!(rewritten.ends_with("epsilon\n"));

    let emptied = fs::read_to_string(vault.path().join("a.md")).unwrap();
    assert!(emptied.contains("tags: []\n"));

    // A second execute run finds nothing left to change.
    let rerun = orchestrator.consolidate(RunMode::Execute).unwrap();
    assert_eq!(rerun.files_changed, 0);
    assert!(rerun.changes.is_empty());
}

#[test]
fn execute_creates_snapshot_and_change_log() {
    let vault = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    seed_fixture_corpus(vault.path());

    let result = orchestrator(vault.path(), state.path())
        .consolidate(RunMode::Execute)
        .unwrap();

    let snapshot = result.snapshot.expect("execute run must snapshot first");
    assert_eq!(snapshot.manifest.file_count, 6);
    // Snapshot preserves pre-run content.
    let saved = fs::read_to_string(snapshot.directory.join("a.md")).unwrap();
    assert!(saved.contains("protocol"));
    assert!(snapshot.directory.join("manifest.json").exists());

    let changelog_dir = state.path().join("changelogs");
    let entries: Vec<_> = fs::read_dir(&changelog_dir).unwrap().collect();
    assert_eq!(entries.len(), 1);
    let log_raw = fs::read_to_string(entries[0].as_ref().unwrap().path()).unwrap();
    assert_eq!(log_raw.lines().count(), result.files_changed);
    assert!(log_raw.contains("cr-structure-protocol"));

    assert!(state.path().join("coordinates.db").exists());
}

#[test]
fn snapshot_failure_aborts_before_any_mutation() {
    let vault = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    seed_fixture_corpus(vault.path());
    // A plain file where the backups directory must go forces the snapshot
    // to fail while the state dir itself is fine.
    fs::write(state.path().join("backups"), "not a directory").unwrap();

    let err = orchestrator(vault.path(), state.path())
        .consolidate(RunMode::Execute)
        .unwrap_err();
    assert!(matches!(err, BatchError::Snapshot(_)));

    let untouched = fs::read_to_string(vault.path().join("a.md")).unwrap();
    assert!(untouched.contains("protocol"));
}

#[test]
fn malformed_frontmatter_skips_file_but_batch_continues() {
    let vault = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    seed_fixture_corpus(vault.path());
    fs::write(
        vault.path().join("broken.md"),
        "---\ntags:\n  - dangling\nno closing delimiter\n",
    )
    .unwrap();

    let result = orchestrator(vault.path(), state.path())
        .consolidate(RunMode::DryRun)
        .unwrap();

    assert_eq!(result.files_scanned, 7);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].kind, tessera_core::FailureKind::Parse);
    assert!(result.failures[0].path.contains("broken.md"));
    assert_eq!(result.files_changed, 5);
}

#[test]
fn audit_reports_counts_variants_and_singletons() {
    let vault = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    write_note(vault.path(), "one.md", &["Work", "codex"], "one\n");
    write_note(vault.path(), "two.md", &["work", "codex"], "two\n");

    let audit = orchestrator(vault.path(), state.path()).audit().unwrap();

    assert_eq!(audit.files_scanned, 2);
    assert_eq!(audit.total_tags, 3);
    assert_eq!(audit.total_instances, 4);
    assert_eq!(audit.singleton_count, 2);
    assert_eq!(
        audit.case_variants.get("work"),
        Some(&vec!["Work".to_string(), "work".to_string()])
    );
    assert_eq!(audit.top_tags[0], ("codex".to_string(), 2));
}
