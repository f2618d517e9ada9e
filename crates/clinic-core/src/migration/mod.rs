//! 스키마 마이그레이션 순차 실행 및 검증.
//!
//! 마이그레이션 목록을 정해진 순서대로 하나씩 실행하며, 이미 존재하는
//! 객체 에러는 멱등 no-op으로 허용합니다. 실행 전에 데이터베이스 없이
//! 목록을 정적으로 검사할 수도 있습니다.
//!
//! # 사용 예시
//!
//! ```ignore
//! use clinic_core::migration::{
//!     resolve_migration_list, FsSource, MigrationSequencer, SequencerOptions,
//! };
//!
//! let ids = resolve_migration_list(dir, None)?;
//! let sequencer = MigrationSequencer::new(FsSource::new(dir), SequencerOptions::default());
//! let report = sequencer.run(&ids, &mut executor, "direct").await;
//! println!("{}", report);
//! ```

pub mod analyzer;
pub mod ledger;
pub mod models;
pub mod sequencer;
pub mod source;
pub mod validator;

pub use analyzer::{extract_order, MigrationAnalyzer, RawStatement};
pub use ledger::{
    checksum, migration_states, LedgerEntry, LedgerOutcome, MigrationState, LEDGER_TABLE,
};
pub use models::*;
pub use sequencer::{MigrationExecutor, MigrationSequencer, SequencerOptions};
pub use source::{discover_migrations, resolve_migration_list, FsSource, Manifest, SqlSource};
pub use validator::MigrationValidator;
