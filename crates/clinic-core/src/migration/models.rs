//! 마이그레이션 분석 및 실행을 위한 데이터 모델.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::ErrorClass;

/// 보고서에 남기는 에러 메시지 최대 길이 (문자 수)
pub const MAX_ERROR_CHARS: usize = 160;

/// SQL 문장 유형
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatementType {
    /// CREATE TABLE
    CreateTable,
    /// CREATE VIEW
    CreateView,
    /// CREATE MATERIALIZED VIEW
    CreateMaterializedView,
    /// CREATE INDEX
    CreateIndex,
    /// CREATE FUNCTION
    CreateFunction,
    /// CREATE TRIGGER
    CreateTrigger,
    /// CREATE TYPE (ENUM 등)
    CreateType,
    /// CREATE EXTENSION
    CreateExtension,
    /// CREATE SCHEMA
    CreateSchema,
    /// CREATE POLICY (RLS)
    CreatePolicy,
    /// DROP TABLE
    DropTable,
    /// DROP VIEW
    DropView,
    /// DROP INDEX
    DropIndex,
    /// DROP FUNCTION
    DropFunction,
    /// DROP TRIGGER
    DropTrigger,
    /// DROP TYPE
    DropType,
    /// DROP POLICY
    DropPolicy,
    /// ALTER TABLE
    AlterTable,
    /// INSERT INTO
    Insert,
    /// 기타 문장 (첫 단어)
    Other(String),
}

impl StatementType {
    /// CREATE 문장인지 확인
    pub fn is_create(&self) -> bool {
        matches!(
            self,
            StatementType::CreateTable
                | StatementType::CreateView
                | StatementType::CreateMaterializedView
                | StatementType::CreateIndex
                | StatementType::CreateFunction
                | StatementType::CreateTrigger
                | StatementType::CreateType
                | StatementType::CreateExtension
                | StatementType::CreateSchema
                | StatementType::CreatePolicy
        )
    }
}

/// 파싱된 SQL 문장
#[derive(Debug, Clone)]
pub struct SqlStatement {
    /// 문장 유형
    pub statement_type: StatementType,
    /// 대상 객체 이름 (테이블명, 인덱스명 등, 스키마 접두사 제외, 소문자)
    pub object_name: String,
    /// 주석을 제외한 SQL (종료 세미콜론 제외)
    pub raw_sql: String,
    /// 파일 내 시작 라인 번호 (1-based)
    pub line_number: usize,
    /// 파일 내 종료 라인 번호 (1-based)
    pub end_line_number: usize,
    /// IF NOT EXISTS 사용 여부
    pub if_not_exists: bool,
    /// IF EXISTS 사용 여부
    pub if_exists: bool,
    /// OR REPLACE 사용 여부
    pub or_replace: bool,
    /// CASCADE 사용 여부 (DROP ... CASCADE 등 DDL CASCADE)
    pub cascade: bool,
    /// FK ON DELETE/UPDATE CASCADE 사용 여부
    pub fk_cascade: bool,
}

impl SqlStatement {
    /// 새 SQL 문장 생성
    pub fn new(
        statement_type: StatementType,
        object_name: String,
        raw_sql: String,
        line_number: usize,
    ) -> Self {
        Self {
            statement_type,
            object_name,
            raw_sql,
            line_number,
            end_line_number: line_number,
            if_not_exists: false,
            if_exists: false,
            or_replace: false,
            cascade: false,
            fk_cascade: false,
        }
    }
}

/// 마이그레이션 파일 정보
#[derive(Debug, Clone)]
pub struct MigrationFile {
    /// 마이그레이션 ID (목록에 기재된 파일명)
    pub name: String,
    /// 파일 내용
    pub content: String,
    /// 파싱된 SQL 문장들
    pub statements: Vec<SqlStatement>,
}

impl MigrationFile {
    /// 새 마이그레이션 파일 생성
    pub fn new(name: String, content: String) -> Self {
        Self {
            name,
            content,
            statements: Vec::new(),
        }
    }
}

/// 실행 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// 파일 전체를 한 번에 전송
    #[default]
    Whole,
    /// 문장 단위로 분할하여 순서대로 전송
    Split,
}

impl ExecutionMode {
    /// 문자열에서 파싱
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "whole" | "file" => Some(Self::Whole),
            "split" | "statement" => Some(Self::Split),
            _ => None,
        }
    }

    /// 표시 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whole => "whole",
            Self::Split => "split",
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// 정적 검증
// =============================================================================

/// 검증 결과 심각도
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// 정보 (권장사항)
    Info,
    /// 경고 (수정 권장)
    Warning,
    /// 에러 (수정 필수)
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// 검증 결과 항목
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// 심각도
    pub severity: Severity,
    /// 문제 코드
    pub code: String,
    /// 문제 설명
    pub message: String,
    /// 관련 파일
    pub file: Option<String>,
    /// 관련 라인 번호
    pub line: Option<usize>,
    /// 관련 객체명
    pub object: Option<String>,
    /// 권장 해결 방법
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// 새 이슈 생성
    pub fn new(severity: Severity, code: &str, message: &str) -> Self {
        Self {
            severity,
            code: code.to_string(),
            message: message.to_string(),
            file: None,
            line: None,
            object: None,
            suggestion: None,
        }
    }

    /// 파일 정보 추가
    pub fn with_file(mut self, file: &str) -> Self {
        self.file = Some(file.to_string());
        self
    }

    /// 라인 정보 추가
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// 객체 정보 추가
    pub fn with_object(mut self, object: &str) -> Self {
        self.object = Some(object.to_string());
        self
    }

    /// 해결 방법 추가
    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = Some(suggestion.to_string());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)?;

        if let Some(ref file) = self.file {
            write!(f, "\n  파일: {}", file)?;
            if let Some(line) = self.line {
                write!(f, ":{}", line)?;
            }
        }

        if let Some(ref obj) = self.object {
            write!(f, "\n  객체: {}", obj)?;
        }

        if let Some(ref suggestion) = self.suggestion {
            write!(f, "\n  해결: {}", suggestion)?;
        }

        Ok(())
    }
}

/// 검증 보고서
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// 발견된 이슈들
    pub issues: Vec<ValidationIssue>,
    /// 분석된 파일 수
    pub files_analyzed: usize,
    /// 총 SQL 문장 수
    pub total_statements: usize,
}

impl ValidationReport {
    /// 새 보고서 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 이슈 추가
    pub fn add_issue(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// 에러 수
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    /// 경고 수
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// 검증 통과 여부
    pub fn is_valid(&self) -> bool {
        self.error_count() == 0
    }

    /// 코드별 이슈 목록
    pub fn issues_with_code(&self, code: &str) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.code == code).collect()
    }

    /// 심각도별 정렬된 이슈 목록
    pub fn sorted_issues(&self) -> Vec<&ValidationIssue> {
        let mut sorted: Vec<_> = self.issues.iter().collect();
        sorted.sort_by(|a, b| b.severity.cmp(&a.severity));
        sorted
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", HEAVY_RULE)?;
        writeln!(f, "                    마이그레이션 검증 보고서")?;
        writeln!(f, "{}", HEAVY_RULE)?;
        writeln!(f)?;
        writeln!(f, "📊 요약")?;
        writeln!(f, "  분석 파일: {} 개", self.files_analyzed)?;
        writeln!(f, "  SQL 문장: {} 개", self.total_statements)?;
        writeln!(f)?;
        writeln!(
            f,
            "  🔴 에러: {} 개  🟡 경고: {} 개  🔵 정보: {} 개",
            self.error_count(),
            self.warning_count(),
            self.issues.len() - self.error_count() - self.warning_count()
        )?;
        writeln!(f)?;

        if self.issues.is_empty() {
            writeln!(f, "✅ 문제가 발견되지 않았습니다.")?;
        } else {
            writeln!(f, "{}", LIGHT_RULE)?;
            writeln!(f, "🔍 발견된 이슈")?;
            writeln!(f, "{}", LIGHT_RULE)?;
            for (i, issue) in self.sorted_issues().iter().enumerate() {
                writeln!(f)?;
                writeln!(f, "{}. {}", i + 1, issue)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "{}", HEAVY_RULE)?;

        Ok(())
    }
}

const HEAVY_RULE: &str = "═══════════════════════════════════════════════════════════════";
const LIGHT_RULE: &str = "───────────────────────────────────────────────────────────────";

// =============================================================================
// 실행 결과
// =============================================================================

/// 파일별 실행 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// 적용 성공
    Applied {
        /// 실행한 문장 수
        statements: usize,
    },
    /// 이미 존재하는 객체 에러를 허용 (멱등 no-op)
    AlreadyExists {
        /// 허용된 에러 수
        tolerated: usize,
        /// 마지막으로 허용된 에러 메시지 (잘림)
        detail: String,
    },
    /// 원장에 이미 적용 기록이 있어 건너뜀
    SkippedApplied {
        /// 기록된 체크섬과 현재 내용이 다른지 여부
        drifted: bool,
    },
    /// 실패 (계속 진행)
    Failed {
        /// 에러 분류
        class: ErrorClass,
        /// SQLSTATE 코드
        code: Option<String>,
        /// 에러 메시지 (잘림)
        message: String,
    },
    /// 파일 읽기 실패
    ReadFailed {
        /// 에러 메시지 (잘림)
        message: String,
    },
}

impl FileOutcome {
    /// 성공으로 집계되는지 (적용 또는 허용)
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Applied { .. } | Self::AlreadyExists { .. })
    }

    /// 실패로 집계되는지 (실행 실패 또는 읽기 실패)
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::ReadFailed { .. })
    }
}

impl std::fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Applied { statements } => write!(f, "✅ 적용됨 ({} 문장)", statements),
            Self::AlreadyExists { tolerated, detail } => {
                write!(f, "♻️  이미 존재 - 허용 ({} 건): {}", tolerated, detail)
            }
            Self::SkippedApplied { drifted: false } => write!(f, "⏭️  적용 기록 있음 - 건너뜀"),
            Self::SkippedApplied { drifted: true } => {
                write!(f, "⚠️  적용 기록 있음 - 건너뜀 (체크섬 불일치)")
            }
            Self::Failed {
                class,
                code,
                message,
            } => match code {
                Some(code) => write!(f, "❌ 실패 [{} {}]: {}", class, code, message),
                None => write!(f, "❌ 실패 [{}]: {}", class, message),
            },
            Self::ReadFailed { message } => write!(f, "📄 읽기 실패: {}", message),
        }
    }
}

/// 파일 하나의 실행 기록
#[derive(Debug, Clone)]
pub struct FileReport {
    /// 마이그레이션 ID
    pub id: String,
    /// 결과
    pub outcome: FileOutcome,
    /// 소요 시간
    pub elapsed: Duration,
}

/// 전체 실행 보고서
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// 사용한 연결 후보 이름
    pub connection: String,
    /// 실행 방식
    pub mode: ExecutionMode,
    /// 원장 사용 여부 (원장 준비 실패 시 false)
    pub ledger_enabled: bool,
    /// 파일별 결과 (목록 순서)
    pub files: Vec<FileReport>,
    /// 실행 전 테이블 목록 (조회 실패 시 None)
    pub tables_before: Option<Vec<String>>,
    /// 실행 후 테이블 목록 (조회 실패 시 None)
    pub tables_after: Option<Vec<String>>,
    /// 총 소요 시간
    pub elapsed: Duration,
}

impl RunReport {
    /// 성공 수 (적용 + 허용)
    pub fn succeeded(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_success()).count()
    }

    /// 원장으로 건너뛴 수
    pub fn skipped(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::SkippedApplied { .. }))
            .count()
    }

    /// 실패 수 (실행 실패 + 읽기 실패)
    pub fn failed(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_failure()).count()
    }

    /// ID로 결과 조회
    pub fn outcome_of(&self, id: &str) -> Option<&FileOutcome> {
        self.files.iter().find(|f| f.id == id).map(|f| &f.outcome)
    }

    /// 실행 전에는 있었지만 실행 후 사라진 테이블.
    ///
    /// 두 목록 중 하나라도 조회하지 못했으면 빈 목록.
    pub fn missing_tables(&self) -> Vec<String> {
        match (&self.tables_before, &self.tables_after) {
            (Some(before), Some(after)) => {
                let after: BTreeSet<&String> = after.iter().collect();
                before
                    .iter()
                    .filter(|t| !after.contains(t))
                    .cloned()
                    .collect()
            }
            _ => Vec::new(),
        }
    }

    /// 이번 실행에서 새로 생긴 테이블
    pub fn new_tables(&self) -> Vec<String> {
        match (&self.tables_before, &self.tables_after) {
            (Some(before), Some(after)) => {
                let before: BTreeSet<&String> = before.iter().collect();
                after
                    .iter()
                    .filter(|t| !before.contains(t))
                    .cloned()
                    .collect()
            }
            _ => Vec::new(),
        }
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", HEAVY_RULE)?;
        writeln!(f, "                    마이그레이션 실행 보고서")?;
        writeln!(f, "{}", HEAVY_RULE)?;
        writeln!(f)?;
        writeln!(f, "🔌 연결: {}", self.connection)?;
        writeln!(
            f,
            "⚙️  모드: {}  원장: {}",
            self.mode,
            if self.ledger_enabled { "사용" } else { "미사용" }
        )?;
        writeln!(f)?;

        for (i, file) in self.files.iter().enumerate() {
            writeln!(
                f,
                "  {:02}. {} ({} ms)\n      {}",
                i + 1,
                file.id,
                file.elapsed.as_millis(),
                file.outcome
            )?;
        }

        writeln!(f)?;
        writeln!(f, "{}", LIGHT_RULE)?;
        writeln!(
            f,
            "📊 요약: 성공 {} / 건너뜀 {} / 실패 {} (총 {} 개, {:.2}s)",
            self.succeeded(),
            self.skipped(),
            self.failed(),
            self.files.len(),
            self.elapsed.as_secs_f64()
        )?;

        match &self.tables_after {
            Some(tables) => {
                writeln!(f, "📋 테이블 ({} 개)", tables.len())?;
                for table in tables {
                    writeln!(f, "   - {}", table)?;
                }
            }
            None => writeln!(f, "📋 테이블 목록을 조회하지 못했습니다")?,
        }

        let new_tables = self.new_tables();
        if !new_tables.is_empty() {
            writeln!(f, "🆕 새 테이블: {}", new_tables.join(", "))?;
        }

        let missing = self.missing_tables();
        if !missing.is_empty() {
            writeln!(f, "⚠️  실행 후 사라진 테이블: {}", missing.join(", "))?;
        }

        writeln!(f, "{}", HEAVY_RULE)?;

        Ok(())
    }
}

/// 메시지를 최대 문자 수로 자름 (문자 경계 안전, 첫 줄만 사용)
pub fn truncate_message(message: &str, max_chars: usize) -> String {
    let first_line = message.lines().next().unwrap_or("").trim();
    if first_line.chars().count() <= max_chars {
        return first_line.to_string();
    }

    let mut truncated: String = first_line.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}
