//! 문장 분할기 속성 테스트

use clinic_core::migration::{truncate_message, MigrationAnalyzer};
use proptest::prelude::*;

fn statement() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z_]{1,12}".prop_map(|t| format!("CREATE TABLE IF NOT EXISTS {} (id uuid)", t)),
        "[a-z ;]{0,20}".prop_map(|s| format!("INSERT INTO notes VALUES ('{}')", s)),
        "[a-z ;]{0,20}".prop_map(|s| {
            format!(
                "CREATE OR REPLACE FUNCTION f() RETURNS text AS $body$ SELECT '{}'; $body$ LANGUAGE sql",
                s
            )
        }),
        "[a-z ;]{0,20}".prop_map(|s| format!("DO $$ BEGIN RAISE NOTICE '{}'; END $$", s)),
    ]
}

proptest! {
    #[test]
    fn split_preserves_statement_count(stmts in prop::collection::vec(statement(), 0..8)) {
        let sql = stmts
            .iter()
            .map(|s| format!("-- step;\n{};\n", s))
            .collect::<String>();

        let split = MigrationAnalyzer::new().split_statements(&sql);
        prop_assert_eq!(split.len(), stmts.len());
        for (raw, original) in split.iter().zip(&stmts) {
            prop_assert_eq!(&raw.sql, original);
        }
    }

    #[test]
    fn truncation_respects_limit(message in ".{0,400}", max in 1usize..200) {
        let truncated = truncate_message(&message, max);
        prop_assert!(truncated.chars().count() <= max);
        prop_assert!(!truncated.contains('\n'));
    }
}
