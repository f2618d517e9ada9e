//! 마이그레이션 순차 실행기.
//!
//! 목록 순서대로 파일을 하나씩 실행합니다. 이미 존재하는 객체 에러는
//! 성공(멱등 no-op)으로 보고, 그 외 에러는 기록만 하고 다음 파일로
//! 진행합니다. 전체를 감싸는 트랜잭션은 없습니다.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::analyzer::MigrationAnalyzer;
use super::ledger::{LedgerEntry, LedgerOutcome};
use super::models::*;
use super::source::SqlSource;
use crate::error::ExecError;

/// 열린 데이터베이스 세션에 대한 실행 인터페이스.
///
/// 드라이버 crate가 구현합니다. 모든 메서드는 한 번의 왕복이 끝날 때까지
/// 대기하며, 에러는 SQLSTATE 기준으로 분류된 [`ExecError`]로 반환합니다.
#[async_trait]
pub trait MigrationExecutor: Send {
    /// SQL 텍스트 실행 (여러 문장 가능, simple query protocol)
    async fn execute(&mut self, sql: &str) -> Result<(), ExecError>;

    /// 스키마의 일반 테이블 목록 (원장 테이블 제외, 이름순)
    async fn list_tables(&mut self, schema: &str) -> Result<Vec<String>, ExecError>;

    /// 원장 테이블 준비 (없으면 생성)
    async fn ensure_ledger(&mut self) -> Result<(), ExecError>;

    /// 원장 항목 전체 조회
    async fn load_ledger(&mut self) -> Result<Vec<LedgerEntry>, ExecError>;

    /// 원장에 항목 기록 (같은 ID가 있으면 갱신)
    async fn record(&mut self, entry: &LedgerEntry) -> Result<(), ExecError>;
}

/// 실행 옵션
#[derive(Debug, Clone)]
pub struct SequencerOptions {
    /// 실행 방식
    pub mode: ExecutionMode,
    /// 테이블 목록을 조회할 스키마
    pub schema: String,
    /// 원장 사용 여부
    pub use_ledger: bool,
}

impl Default for SequencerOptions {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Whole,
            schema: "public".to_string(),
            use_ledger: true,
        }
    }
}

/// 마이그레이션 순차 실행기
pub struct MigrationSequencer<S> {
    source: S,
    options: SequencerOptions,
    analyzer: MigrationAnalyzer,
}

impl<S: SqlSource> MigrationSequencer<S> {
    /// 새 실행기 생성
    pub fn new(source: S, options: SequencerOptions) -> Self {
        Self {
            source,
            options,
            analyzer: MigrationAnalyzer::new(),
        }
    }

    /// 목록 전체를 한 번 실행하고 보고서 반환.
    ///
    /// 개별 파일의 실패로 중단되지 않으며 항상 끝까지 진행합니다.
    pub async fn run<E>(&self, ids: &[String], executor: &mut E, connection: &str) -> RunReport
    where
        E: MigrationExecutor + ?Sized,
    {
        let started = Instant::now();
        info!(
            files = ids.len(),
            mode = %self.options.mode,
            connection = %connection,
            "마이그레이션 실행 시작"
        );

        let mut report = RunReport {
            connection: connection.to_string(),
            mode: self.options.mode,
            ..Default::default()
        };

        report.tables_before = self.list_tables(executor).await;

        let mut ledger = self.prepare_ledger(executor).await;
        report.ledger_enabled = ledger.is_some();

        for id in ids {
            let file_started = Instant::now();
            let outcome = self.apply_file(id, executor, ledger.as_mut()).await;

            match &outcome {
                FileOutcome::Applied { statements } => {
                    info!(file = %id, statements, "적용 완료")
                }
                FileOutcome::AlreadyExists { tolerated, detail } => {
                    info!(file = %id, tolerated, detail = %detail, "이미 존재 - 허용")
                }
                FileOutcome::SkippedApplied { drifted } => {
                    info!(file = %id, drifted, "적용 기록 있음 - 건너뜀")
                }
                FileOutcome::Failed { class, message, .. } => {
                    warn!(file = %id, class = %class, error = %message, "실행 실패 - 계속 진행")
                }
                FileOutcome::ReadFailed { message } => {
                    warn!(file = %id, error = %message, "파일 읽기 실패 - 건너뜀")
                }
            }

            report.files.push(FileReport {
                id: id.clone(),
                outcome,
                elapsed: file_started.elapsed(),
            });
        }

        report.tables_after = self.list_tables(executor).await;
        report.elapsed = started.elapsed();

        let missing = report.missing_tables();
        if !missing.is_empty() {
            warn!(tables = ?missing, "실행 전보다 테이블이 줄었습니다");
        }

        info!(
            succeeded = report.succeeded(),
            skipped = report.skipped(),
            failed = report.failed(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "마이그레이션 실행 완료"
        );

        report
    }

    /// 파일 하나 실행
    async fn apply_file<E>(
        &self,
        id: &str,
        executor: &mut E,
        ledger: Option<&mut HashMap<String, LedgerEntry>>,
    ) -> FileOutcome
    where
        E: MigrationExecutor + ?Sized,
    {
        let content = match self.source.read(id) {
            Ok(content) => content,
            Err(e) => {
                return FileOutcome::ReadFailed {
                    message: truncate_message(
                        &format!("{}: {}", self.source.locate(id).display(), e),
                        MAX_ERROR_CHARS,
                    ),
                };
            }
        };

        if let Some(entry) = ledger.as_ref().and_then(|l| l.get(id)) {
            let drifted = !entry.matches(&content);
            if drifted {
                warn!(
                    file = %id,
                    recorded = %entry.checksum,
                    "적용 이후 파일 내용이 변경됨 (재실행하지 않음)"
                );
            }
            return FileOutcome::SkippedApplied { drifted };
        }

        let outcome = match self.options.mode {
            ExecutionMode::Whole => self.execute_whole(id, &content, executor).await,
            ExecutionMode::Split => self.execute_split(id, &content, executor).await,
        };

        let ledger_outcome = match outcome {
            FileOutcome::Applied { .. } => Some(LedgerOutcome::Applied),
            FileOutcome::AlreadyExists { .. } => Some(LedgerOutcome::AlreadyExists),
            _ => None,
        };

        if let (Some(ledger), Some(ledger_outcome)) = (ledger, ledger_outcome) {
            let entry = LedgerEntry::new(id, &content, ledger_outcome);
            match executor.record(&entry).await {
                Ok(()) => {
                    ledger.insert(id.to_string(), entry);
                }
                Err(e) => warn!(file = %id, error = %e, "원장 기록 실패"),
            }
        }

        outcome
    }

    /// 파일 전체를 한 번에 실행.
    ///
    /// 여러 문장을 한 번에 보내면 서버가 암시적 트랜잭션으로 처리하므로
    /// 이미 존재 에러가 나면 파일 전체가 롤백됩니다. 이 경우 문장 단위로
    /// 다시 실행하여 나머지 문장을 반영합니다.
    async fn execute_whole<E>(&self, id: &str, content: &str, executor: &mut E) -> FileOutcome
    where
        E: MigrationExecutor + ?Sized,
    {
        let statements = self.analyzer.split_statements(content).len();
        if statements == 0 {
            return FileOutcome::Applied { statements: 0 };
        }

        match executor.execute(content).await {
            Ok(()) => FileOutcome::Applied { statements },
            Err(e) if e.is_tolerated() && statements == 1 => FileOutcome::AlreadyExists {
                tolerated: 1,
                detail: truncate_message(&e.message, MAX_ERROR_CHARS),
            },
            Err(e) if e.is_tolerated() => {
                info!(file = %id, error = %e, "파일 롤백됨 - 문장 단위로 재실행");
                self.execute_split(id, content, executor).await
            }
            Err(e) => failed(e),
        }
    }

    /// 문장 단위로 분할하여 실행.
    ///
    /// 이미 존재 에러는 해당 문장만 건너뛰고 계속하며, 그 외 에러가 나면
    /// 파일의 나머지 문장은 실행하지 않습니다.
    async fn execute_split<E>(&self, id: &str, content: &str, executor: &mut E) -> FileOutcome
    where
        E: MigrationExecutor + ?Sized,
    {
        let mut applied = 0;
        let mut tolerated = 0;
        let mut detail = String::new();

        for stmt in self.analyzer.split_statements(content) {
            match executor.execute(&stmt.sql).await {
                Ok(()) => applied += 1,
                Err(e) if e.is_tolerated() => {
                    debug!(file = %id, line = stmt.start_line, error = %e, "문장 이미 존재 - 허용");
                    tolerated += 1;
                    detail = truncate_message(&e.message, MAX_ERROR_CHARS);
                }
                Err(e) => {
                    warn!(file = %id, line = stmt.start_line, "문장 실패");
                    return failed(e);
                }
            }
        }

        if tolerated > 0 {
            FileOutcome::AlreadyExists { tolerated, detail }
        } else {
            FileOutcome::Applied {
                statements: applied,
            }
        }
    }

    async fn list_tables<E>(&self, executor: &mut E) -> Option<Vec<String>>
    where
        E: MigrationExecutor + ?Sized,
    {
        match executor.list_tables(&self.options.schema).await {
            Ok(mut tables) => {
                tables.sort();
                Some(tables)
            }
            Err(e) => {
                warn!(schema = %self.options.schema, error = %e, "테이블 목록 조회 실패");
                None
            }
        }
    }

    /// 원장 준비. 실패하면 원장 없이 진행.
    async fn prepare_ledger<E>(&self, executor: &mut E) -> Option<HashMap<String, LedgerEntry>>
    where
        E: MigrationExecutor + ?Sized,
    {
        if !self.options.use_ledger {
            return None;
        }

        if let Err(e) = executor.ensure_ledger().await {
            warn!(error = %e, "원장 테이블 준비 실패 - 원장 없이 진행");
            return None;
        }

        match executor.load_ledger().await {
            Ok(entries) => {
                debug!(entries = entries.len(), "원장 로드");
                Some(entries.into_iter().map(|e| (e.id.clone(), e)).collect())
            }
            Err(e) => {
                warn!(error = %e, "원장 조회 실패 - 원장 없이 진행");
                None
            }
        }
    }
}

fn failed(e: ExecError) -> FileOutcome {
    FileOutcome::Failed {
        class: e.class,
        code: e.code,
        message: truncate_message(&e.message, MAX_ERROR_CHARS),
    }
}
