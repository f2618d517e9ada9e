//! 열린 세션에서 마이그레이션 SQL 실행, 카탈로그 조회, 원장 기록.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinic_core::migration::{LedgerEntry, LedgerOutcome, MigrationExecutor, LEDGER_TABLE};
use clinic_core::ExecError;
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use tracing::{debug, instrument, warn};

use crate::error::exec_error_from_sqlx;

/// 원장 레코드
#[derive(Debug, Clone, FromRow)]
struct LedgerRecord {
    id: String,
    checksum: String,
    outcome: String,
    applied_at: DateTime<Utc>,
}

impl LedgerRecord {
    fn into_entry(self) -> Option<LedgerEntry> {
        let outcome = LedgerOutcome::parse(&self.outcome)?;
        Some(LedgerEntry {
            id: self.id,
            checksum: self.checksum,
            outcome,
            applied_at: self.applied_at,
        })
    }
}

/// PostgreSQL 실행기.
///
/// 연결 하나짜리 풀을 감싸므로 모든 호출이 같은 서버 세션을 사용합니다.
#[derive(Debug, Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    /// 풀로부터 생성
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 연결 확인 (`SELECT 1`)
    pub async fn ping(&self) -> Result<(), ExecError> {
        sqlx::raw_sql("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(exec_error_from_sqlx)?;
        Ok(())
    }

    /// 서버 버전 문자열
    pub async fn server_version(&self) -> Result<String, ExecError> {
        sqlx::query_scalar("SELECT version()")
            .fetch_one(&self.pool)
            .await
            .map_err(exec_error_from_sqlx)
    }

    /// 연결 종료
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl MigrationExecutor for PgExecutor {
    async fn execute(&mut self, sql: &str) -> Result<(), ExecError> {
        // simple query protocol: 여러 문장을 한 번에 보낼 수 있음
        sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .map_err(exec_error_from_sqlx)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_tables(&mut self, schema: &str) -> Result<Vec<String>, ExecError> {
        let tables: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = $1
              AND table_type = 'BASE TABLE'
              AND table_name <> $2
            ORDER BY table_name
            "#,
        )
        .bind(schema)
        .bind(LEDGER_TABLE)
        .fetch_all(&self.pool)
        .await
        .map_err(exec_error_from_sqlx)?;

        debug!(schema = schema, count = tables.len(), "테이블 목록 조회");
        Ok(tables)
    }

    async fn ensure_ledger(&mut self) -> Result<(), ExecError> {
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {LEDGER_TABLE} (
                id          TEXT PRIMARY KEY,
                checksum    TEXT NOT NULL,
                outcome     TEXT NOT NULL,
                applied_at  TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#
        );
        sqlx::raw_sql(&ddl)
            .execute(&self.pool)
            .await
            .map_err(exec_error_from_sqlx)?;
        Ok(())
    }

    async fn load_ledger(&mut self) -> Result<Vec<LedgerEntry>, ExecError> {
        let sql = format!(
            "SELECT id, checksum, outcome, applied_at FROM {LEDGER_TABLE} ORDER BY applied_at, id"
        );
        let records: Vec<LedgerRecord> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(exec_error_from_sqlx)?;

        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            let id = record.id.clone();
            match record.into_entry() {
                Some(entry) => entries.push(entry),
                None => warn!(id = %id, "알 수 없는 원장 결과 값 - 무시"),
            }
        }
        Ok(entries)
    }

    async fn record(&mut self, entry: &LedgerEntry) -> Result<(), ExecError> {
        let sql = format!(
            r#"
            INSERT INTO {LEDGER_TABLE} (id, checksum, outcome, applied_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                checksum = EXCLUDED.checksum,
                outcome = EXCLUDED.outcome,
                applied_at = EXCLUDED.applied_at
            "#
        );
        sqlx::query(&sql)
            .bind(&entry.id)
            .bind(&entry.checksum)
            .bind(entry.outcome.as_str())
            .bind(entry.applied_at)
            .execute(&self.pool)
            .await
            .map_err(exec_error_from_sqlx)?;
        Ok(())
    }
}
