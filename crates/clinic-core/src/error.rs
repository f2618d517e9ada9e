//! 에러 타입 정의.
//!
//! 데이터베이스 실행 오류는 메시지 문자열이 아니라 SQLSTATE 코드로
//! 분류합니다. 순차 실행기는 [`ErrorClass::DuplicateObject`]만 허용합니다.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::connection::ConnectionAttempt;

/// "이미 존재" 계열 SQLSTATE 코드.
pub const DUPLICATE_OBJECT_CODES: &[&str] = &[
    "42P07", // duplicate_table
    "42710", // duplicate_object
    "42P06", // duplicate_schema
    "42723", // duplicate_function
    "42P04", // duplicate_database
    "42701", // duplicate_column
    "42P05", // duplicate_prepared_statement
    "42712", // duplicate_alias
];

// =============================================================================
// 실행 에러 분류
// =============================================================================

/// 실행 에러 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// 이미 존재하는 객체 (허용 대상)
    DuplicateObject,
    /// 문법 오류 또는 접근 규칙 위반 (SQLSTATE class 42)
    Syntax,
    /// 연결 오류 (SQLSTATE class 08, I/O, TLS, 풀 타임아웃)
    Connection,
    /// 제약 조건 위반 (SQLSTATE class 23)
    Constraint,
    /// 기타
    Other,
}

impl ErrorClass {
    /// SQLSTATE 코드에서 분류.
    pub fn from_sqlstate(code: Option<&str>) -> Self {
        let Some(code) = code else {
            return Self::Other;
        };

        if DUPLICATE_OBJECT_CODES.contains(&code) {
            Self::DuplicateObject
        } else if code.starts_with("08") {
            Self::Connection
        } else if code.starts_with("23") {
            Self::Constraint
        } else if code.starts_with("42") {
            Self::Syntax
        } else {
            Self::Other
        }
    }

    /// 허용 가능한 (멱등) 에러인지 확인
    pub fn is_tolerated(&self) -> bool {
        matches!(self, Self::DuplicateObject)
    }

    /// 보고서/로그용 짧은 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuplicateObject => "duplicate_object",
            Self::Syntax => "syntax",
            Self::Connection => "connection",
            Self::Constraint => "constraint",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 데이터베이스 실행 에러.
///
/// 드라이버 에러를 분류된 형태로 보관합니다. 드라이버 crate가 생성합니다.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{class}] {message}")]
pub struct ExecError {
    /// 에러 분류
    pub class: ErrorClass,
    /// SQLSTATE 코드 (드라이버가 제공한 경우)
    pub code: Option<String>,
    /// 원본 메시지
    pub message: String,
}

impl ExecError {
    /// 새 에러 생성
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            code: None,
            message: message.into(),
        }
    }

    /// SQLSTATE 코드로부터 분류하여 생성
    pub fn from_sqlstate(code: &str, message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::from_sqlstate(Some(code)),
            code: Some(code.to_string()),
            message: message.into(),
        }
    }

    /// 연결 에러 생성
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Connection, message)
    }

    /// 허용 가능한 에러인지 확인
    pub fn is_tolerated(&self) -> bool {
        self.class.is_tolerated()
    }
}

// =============================================================================
// 마이그레이션 에러
// =============================================================================

/// 실행 전 단계(설정, 목록 구성, 연결 협상)에서 발생하는 에러.
///
/// 개별 파일의 실패는 에러가 아니라 실행 보고서에 기록됩니다.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// 모든 후보 연결 실패
    #[error("사용 가능한 데이터베이스 연결이 없습니다 ({} 개 후보 시도)", .attempts.len())]
    NoWorkingConnection { attempts: Vec<ConnectionAttempt> },

    /// 연결 후보가 하나도 설정되지 않음
    #[error("연결 후보가 없습니다: DATABASE_URL 또는 --db-url 을 설정하세요")]
    NoCandidates,

    /// 마이그레이션 디렉토리 없음
    #[error("디렉토리가 존재하지 않습니다: {0:?}")]
    DirectoryNotFound(PathBuf),

    /// 파일 시스템 에러
    #[error("파일 읽기 실패 {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 매니페스트 파싱 실패
    #[error("매니페스트 파싱 실패 {path:?}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// 실행할 마이그레이션이 없음
    #[error("마이그레이션 파일을 찾을 수 없습니다: {0:?}")]
    EmptyMigrationList(PathBuf),

    /// 데이터베이스 에러 (status/tables 등 실행 외 조회)
    #[error("데이터베이스 에러: {0}")]
    Database(#[from] ExecError),
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, MigrationError>;
