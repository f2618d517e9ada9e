//! 저장소에 포함된 migrations/ 검증

mod common;

use std::path::{Path, PathBuf};

use clinic_core::migration::{
    discover_migrations, resolve_migration_list, ExecutionMode, FsSource, MigrationAnalyzer,
    MigrationSequencer, MigrationValidator, SequencerOptions, SqlSource,
};
use common::FakeDb;

fn migrations_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations")
}

#[test]
fn test_manifest_matches_directory() {
    let dir = migrations_dir();
    let listed = resolve_migration_list(&dir, Some(&dir.join("manifest.toml"))).unwrap();
    let discovered = discover_migrations(&dir).unwrap();

    assert_eq!(listed, discovered);
    assert_eq!(listed.first().map(String::as_str), Some("001_core_organizations.sql"));
}

#[test]
fn test_shipped_migrations_pass_static_checks() {
    let dir = migrations_dir();
    let source = FsSource::new(&dir);
    let analyzer = MigrationAnalyzer::new();

    let files: Vec<_> = discover_migrations(&dir)
        .unwrap()
        .into_iter()
        .map(|id| {
            let content = source.read(&id).unwrap();
            analyzer.parse_content(&id, content)
        })
        .collect();

    let report = MigrationValidator::new(&files).validate();

    assert_eq!(report.files_analyzed, 6);
    assert_eq!(report.error_count(), 0, "{}", report);
    assert_eq!(report.warning_count(), 0, "{}", report);
    assert!(report.issues.is_empty(), "{}", report);
}

#[tokio::test]
async fn test_shipped_migrations_apply_twice() {
    let dir = migrations_dir();
    let ids = discover_migrations(&dir).unwrap();

    for mode in [ExecutionMode::Whole, ExecutionMode::Split] {
        let sequencer = MigrationSequencer::new(
            FsSource::new(&dir),
            SequencerOptions {
                mode,
                use_ledger: false,
                ..SequencerOptions::default()
            },
        );
        let mut db = FakeDb::new();

        let first = sequencer.run(&ids, &mut db, "direct").await;
        let second = sequencer.run(&ids, &mut db, "direct").await;

        assert_eq!(first.failed(), 0, "{}", first);
        assert_eq!(second.failed(), 0, "{}", second);
        assert_eq!(first.tables_after, second.tables_after);

        let tables = second.tables_after.unwrap_or_default();
        for expected in [
            "organizations",
            "profiles",
            "patients",
            "doctors",
            "consultations",
            "treatment_plans",
            "diet_plans",
            "daily_logs",
            "adherence_logs",
            "invoices",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing {}", expected);
        }
    }
}

#[test]
fn test_shipped_migrations_follow_current_schema() {
    let dir = migrations_dir();
    let source = FsSource::new(&dir);

    for id in discover_migrations(&dir).unwrap() {
        let content = source.read(&id).unwrap();
        assert!(
            !content.contains("'public'"),
            "{} hard-codes the public schema",
            id
        );
    }

    let rls = source.read("006_row_level_security.sql").unwrap();
    assert_eq!(rls.matches("schemaname = current_schema()").count(), 3);
}
