//! 마이그레이션 적용 원장(ledger).
//!
//! 어떤 마이그레이션 ID가 어떤 내용(체크섬)으로 적용되었는지 기록하여
//! 재실행이 "이미 존재" 에러에 우연히 의존하지 않고 실제로 멱등이 되도록 합니다.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// 원장 테이블 이름
pub const LEDGER_TABLE: &str = "clinic_schema_migrations";

/// 원장에 기록되는 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOutcome {
    /// 정상 적용
    Applied,
    /// 이미 존재 에러 허용
    AlreadyExists,
}

impl LedgerOutcome {
    /// 저장용 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::AlreadyExists => "already_exists",
        }
    }

    /// 저장된 문자열에서 파싱
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "applied" => Some(Self::Applied),
            "already_exists" => Some(Self::AlreadyExists),
            _ => None,
        }
    }
}

/// 원장 항목
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// 마이그레이션 ID
    pub id: String,
    /// 파일 내용의 SHA-256 (hex)
    pub checksum: String,
    /// 결과
    pub outcome: LedgerOutcome,
    /// 적용 시각
    pub applied_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// 현재 시각으로 새 항목 생성
    pub fn new(id: &str, content: &str, outcome: LedgerOutcome) -> Self {
        Self {
            id: id.to_string(),
            checksum: checksum(content),
            outcome,
            applied_at: Utc::now(),
        }
    }

    /// 현재 내용과 기록된 체크섬이 일치하는지
    pub fn matches(&self, content: &str) -> bool {
        self.checksum == checksum(content)
    }
}

/// 파일 내용의 SHA-256 체크섬 (hex)
pub fn checksum(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// 마이그레이션 상태 (status 명령)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationState {
    /// 적용됨
    Applied { at: DateTime<Utc> },
    /// 적용됐지만 이후 파일 내용이 바뀜
    Drifted { at: DateTime<Utc> },
    /// 미적용
    Pending,
    /// 파일을 읽을 수 없음
    Unreadable { message: String },
}

impl std::fmt::Display for MigrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Applied { at } => write!(f, "applied   {}", at.format("%Y-%m-%d %H:%M:%S")),
            Self::Drifted { at } => write!(f, "drifted   {}", at.format("%Y-%m-%d %H:%M:%S")),
            Self::Pending => write!(f, "pending"),
            Self::Unreadable { message } => write!(f, "unreadable ({})", message),
        }
    }
}

/// 목록 순서대로 각 마이그레이션의 상태 계산.
///
/// `contents`는 ID별 파일 내용(읽기 실패 시 에러 메시지).
pub fn migration_states(
    contents: &[(String, Result<String, String>)],
    entries: &[LedgerEntry],
) -> Vec<(String, MigrationState)> {
    let by_id: HashMap<&str, &LedgerEntry> = entries.iter().map(|e| (e.id.as_str(), e)).collect();

    contents
        .iter()
        .map(|(id, content)| {
            let state = match (content, by_id.get(id.as_str())) {
                (Err(message), _) => MigrationState::Unreadable {
                    message: message.clone(),
                },
                (Ok(text), Some(entry)) if entry.matches(text) => MigrationState::Applied {
                    at: entry.applied_at,
                },
                (Ok(_), Some(entry)) => MigrationState::Drifted {
                    at: entry.applied_at,
                },
                (Ok(_), None) => MigrationState::Pending,
            };
            (id.clone(), state)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_stable_hex() {
        let a = checksum("CREATE TABLE patients (id uuid);");
        assert_eq!(a.len(), 64);
        assert_eq!(a, checksum("CREATE TABLE patients (id uuid);"));
        assert_ne!(a, checksum("CREATE TABLE patients (id bigint);"));
        assert_eq!(
            checksum(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_outcome_round_trip_names() {
        assert_eq!(LedgerOutcome::parse("applied"), Some(LedgerOutcome::Applied));
        assert_eq!(
            LedgerOutcome::parse(LedgerOutcome::AlreadyExists.as_str()),
            Some(LedgerOutcome::AlreadyExists)
        );
        assert_eq!(LedgerOutcome::parse("rolled_back"), None);
    }

    #[test]
    fn test_migration_states() {
        let entries = vec![
            LedgerEntry::new("001.sql", "create a", LedgerOutcome::Applied),
            LedgerEntry::new("002.sql", "create b", LedgerOutcome::AlreadyExists),
        ];
        let contents = vec![
            ("001.sql".to_string(), Ok("create a".to_string())),
            ("002.sql".to_string(), Ok("create b v2".to_string())),
            ("003.sql".to_string(), Ok("create c".to_string())),
            ("004.sql".to_string(), Err("not found".to_string())),
        ];

        let states = migration_states(&contents, &entries);
        assert!(matches!(states[0].1, MigrationState::Applied { .. }));
        assert!(matches!(states[1].1, MigrationState::Drifted { .. }));
        assert_eq!(states[2].1, MigrationState::Pending);
        assert!(matches!(states[3].1, MigrationState::Unreadable { .. }));
    }
}
