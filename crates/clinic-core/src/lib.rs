//! 클리닉 스키마 마이그레이션 코어.
//!
//! 이 crate는 다음을 제공합니다:
//! - SQL 마이그레이션 파일 분석 및 문장 분할
//! - 정적 검증 (DROP TABLE, IF NOT EXISTS 누락, 중복 정의)
//! - 순차 실행기 (이미 존재 오류 허용, fail-open)
//! - 적용 원장(ledger) 모델과 체크섬
//! - 후보 연결 협상
//!
//! 데이터베이스 드라이버는 `clinic-data`가 [`MigrationExecutor`]와
//! [`Connector`]를 구현하여 주입합니다.

pub mod connection;
pub mod error;
pub mod migration;

pub use connection::{
    mask_database_url, negotiate, ConnectionAttempt, ConnectionCandidate, Connector,
    NegotiatedConnection,
};
pub use error::{ErrorClass, ExecError, MigrationError, Result};
pub use migration::{
    FsSource, MigrationAnalyzer, MigrationExecutor, MigrationSequencer, MigrationValidator,
    SequencerOptions, SqlSource,
};
