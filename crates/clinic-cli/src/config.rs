//! 환경변수 기반 설정 모듈.

use std::path::PathBuf;
use std::time::Duration;

use clinic_core::migration::{ExecutionMode, SequencerOptions};
use clinic_core::ConnectionCandidate;
use thiserror::Error;

/// 설정 에러
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 알 수 없는 실행 방식
    #[error("알 수 없는 실행 방식: {0} (whole 또는 split)")]
    InvalidMode(String),

    /// 잘못된 숫자 값
    #[error("{key} 값이 올바르지 않습니다: {value}")]
    InvalidNumber { key: String, value: String },
}

/// CLI 전체 설정
#[derive(Debug)]
pub struct ClinicConfig {
    /// 연결 후보 (우선순위 순)
    pub candidates: Vec<ConnectionCandidate>,
    /// 마이그레이션 디렉토리
    pub migrations_dir: PathBuf,
    /// 매니페스트 파일 (없으면 디렉토리 탐색)
    pub manifest: Option<PathBuf>,
    /// 실행 방식
    pub mode: ExecutionMode,
    /// 테이블 목록 스키마
    pub schema: String,
    /// 원장 사용 여부
    pub ledger_enabled: bool,
    /// 후보별 연결 타임아웃 (초)
    pub connect_timeout_secs: u64,
}

/// 명령행 옵션으로 덮어쓸 값
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub dir: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub mode: Option<String>,
    pub schema: Option<String>,
    pub no_ledger: bool,
    pub db_urls: Vec<String>,
}

impl ClinicConfig {
    /// 환경변수에서 설정 로드 (`.env`는 main에서 미리 읽음)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 조회 함수로 설정 로드
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut candidates = Vec::new();
        if let Some(url) = var("DATABASE_URL") {
            candidates.push(ConnectionCandidate::new("direct", url));
        }
        if let Some(url) = var("DATABASE_POOLER_URL") {
            candidates.push(ConnectionCandidate::new("pooler", url));
        }

        let mode = match var("MIGRATION_MODE") {
            Some(value) => parse_mode(&value)?,
            None => ExecutionMode::Whole,
        };

        let connect_timeout_secs = match var("DB_CONNECT_TIMEOUT_SECS") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber {
                    key: "DB_CONNECT_TIMEOUT_SECS".to_string(),
                    value,
                })?,
            None => 10,
        };

        Ok(Self {
            candidates,
            migrations_dir: var("MIGRATIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("migrations")),
            manifest: var("MIGRATION_MANIFEST").map(PathBuf::from),
            mode,
            schema: var("MIGRATION_SCHEMA").unwrap_or_else(|| "public".to_string()),
            ledger_enabled: var_bool(var("MIGRATION_LEDGER_ENABLED"), true),
            connect_timeout_secs,
        })
    }

    /// 명령행 옵션 적용. `--db-url`이 하나라도 있으면 환경변수 후보를 대체.
    pub fn apply_overrides(&mut self, overrides: CliOverrides) -> Result<(), ConfigError> {
        if let Some(dir) = overrides.dir {
            self.migrations_dir = dir;
        }
        if overrides.manifest.is_some() {
            self.manifest = overrides.manifest;
        }
        if let Some(mode) = overrides.mode {
            self.mode = parse_mode(&mode)?;
        }
        if let Some(schema) = overrides.schema {
            self.schema = schema;
        }
        if overrides.no_ledger {
            self.ledger_enabled = false;
        }
        if !overrides.db_urls.is_empty() {
            self.candidates = overrides
                .db_urls
                .into_iter()
                .enumerate()
                .map(|(i, url)| ConnectionCandidate::new(format!("db-url#{}", i + 1), url))
                .collect();
        }
        Ok(())
    }

    /// 연결 타임아웃을 Duration으로 반환
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// 실행기 옵션
    pub fn sequencer_options(&self) -> SequencerOptions {
        SequencerOptions {
            mode: self.mode,
            schema: self.schema.clone(),
            use_ledger: self.ledger_enabled,
        }
    }
}

fn parse_mode(value: &str) -> Result<ExecutionMode, ConfigError> {
    ExecutionMode::parse(value.trim()).ok_or_else(|| ConfigError::InvalidMode(value.to_string()))
}

/// bool 값 파싱 (`true`/`1`만 참)
fn var_bool(value: Option<String>, default: bool) -> bool {
    value
        .map(|v| {
            let v = v.trim().to_lowercase();
            v == "true" || v == "1"
        })
        .unwrap_or(default)
}
