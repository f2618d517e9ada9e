//! SQL 마이그레이션 파일 분석기.
//!
//! 문자 단위 상태 기계로 SQL을 문장 단위로 분할합니다. 작은따옴표 문자열,
//! 큰따옴표 식별자, `$tag$` 달러 인용 블록(함수 본문, DO 블록) 내부의
//! 세미콜론은 문장 종료로 보지 않으며, `--` / `/* */` 주석은 제거합니다.

use super::models::*;

/// 분할 상태
#[derive(Debug, Clone, PartialEq, Eq)]
enum ScanState {
    Normal,
    SingleQuote,
    DoubleQuote,
    LineComment,
    BlockComment(usize),
    Dollar(String),
}

/// 분할된 원시 문장 (시작 라인, 종료 라인, SQL)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStatement {
    pub start_line: usize,
    pub end_line: usize,
    pub sql: String,
}

/// 마이그레이션 파일 분석기
#[derive(Debug, Default, Clone, Copy)]
pub struct MigrationAnalyzer;

impl MigrationAnalyzer {
    /// 새 분석기 생성
    pub fn new() -> Self {
        Self
    }

    /// 파일 내용을 분석하여 MigrationFile 생성
    pub fn parse_content(&self, name: &str, content: String) -> MigrationFile {
        let mut file = MigrationFile::new(name.to_string(), content);
        file.statements = self.parse_statements(&file.content);
        file
    }

    /// SQL 내용을 문장 단위로 분할
    pub fn split_statements(&self, content: &str) -> Vec<RawStatement> {
        let chars: Vec<char> = content.chars().collect();
        let mut statements = Vec::new();

        let mut state = ScanState::Normal;
        let mut current = PendingStatement::default();
        let mut line = 1;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();
            let mut advance = 1;
            let mut transition = None;

            match &state {
                ScanState::Normal => match c {
                    '-' if next == Some('-') => {
                        transition = Some(ScanState::LineComment);
                        advance = 2;
                    }
                    '/' if next == Some('*') => {
                        transition = Some(ScanState::BlockComment(1));
                        current.push(line, ' ');
                        advance = 2;
                    }
                    '\'' => {
                        current.push(line, c);
                        transition = Some(ScanState::SingleQuote);
                    }
                    '"' => {
                        current.push(line, c);
                        transition = Some(ScanState::DoubleQuote);
                    }
                    '$' => match dollar_tag(&chars, i) {
                        Some(tag) => {
                            advance = tag.chars().count();
                            for t in tag.chars() {
                                current.push(line, t);
                            }
                            transition = Some(ScanState::Dollar(tag));
                        }
                        None => current.push(line, c),
                    },
                    ';' => {
                        current.finish(&mut statements, line);
                    }
                    _ => current.push(line, c),
                },
                ScanState::SingleQuote => {
                    current.push(line, c);
                    if c == '\'' {
                        transition = Some(ScanState::Normal);
                    }
                }
                ScanState::DoubleQuote => {
                    current.push(line, c);
                    if c == '"' {
                        transition = Some(ScanState::Normal);
                    }
                }
                ScanState::LineComment => {
                    if c == '\n' {
                        current.push(line, '\n');
                        transition = Some(ScanState::Normal);
                    }
                }
                ScanState::BlockComment(depth) => {
                    let depth = *depth;
                    if c == '/' && next == Some('*') {
                        transition = Some(ScanState::BlockComment(depth + 1));
                        advance = 2;
                    } else if c == '*' && next == Some('/') {
                        transition = Some(if depth <= 1 {
                            ScanState::Normal
                        } else {
                            ScanState::BlockComment(depth - 1)
                        });
                        advance = 2;
                    } else if c == '\n' {
                        current.push(line, '\n');
                    }
                }
                ScanState::Dollar(tag) => {
                    if c == '$' && starts_with_at(&chars, i, tag) {
                        advance = tag.chars().count();
                        for t in tag.chars() {
                            current.push(line, t);
                        }
                        transition = Some(ScanState::Normal);
                    } else {
                        current.push(line, c);
                    }
                }
            }

            if let Some(next_state) = transition {
                state = next_state;
            }
            if c == '\n' {
                line += 1;
            }
            i += advance;
        }

        // 종료 세미콜론이 없는 마지막 문장
        current.finish(&mut statements, line);

        statements
    }

    /// SQL 내용에서 문장 파싱
    pub fn parse_statements(&self, content: &str) -> Vec<SqlStatement> {
        self.split_statements(content)
            .into_iter()
            .map(|raw| self.parse_single_statement(raw))
            .collect()
    }

    /// 단일 SQL 문장 파싱
    fn parse_single_statement(&self, raw: RawStatement) -> SqlStatement {
        let tokens = header_tokens(&raw.sql, 16);
        let header = parse_header(&tokens);

        let normalized = raw
            .sql
            .to_uppercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        let mut stmt = SqlStatement::new(
            header.statement_type,
            header.object_name,
            raw.sql,
            raw.start_line,
        );
        stmt.end_line_number = raw.end_line;
        stmt.if_not_exists = header.if_not_exists;
        stmt.if_exists = header.if_exists;
        stmt.or_replace = header.or_replace;

        // CASCADE 구분: DDL CASCADE (DROP ... CASCADE) vs FK CASCADE (ON DELETE/UPDATE CASCADE)
        if normalized.contains("CASCADE") {
            stmt.fk_cascade = normalized.contains("ON DELETE CASCADE")
                || normalized.contains("ON UPDATE CASCADE");
            // FK CASCADE 패턴 제거 후에도 CASCADE가 남으면 DDL CASCADE
            stmt.cascade = normalized
                .replace("ON DELETE CASCADE", "")
                .replace("ON UPDATE CASCADE", "")
                .contains("CASCADE");
        }

        stmt
    }
}

/// 파일명에서 순서 번호 추출 (예: 001_core_schema.sql → 1, 숫자가 없으면 0)
pub fn extract_order(filename: &str) -> u32 {
    let digits: String = filename.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// 분할 중인 문장
#[derive(Debug, Default)]
struct PendingStatement {
    sql: String,
    start_line: usize,
    started: bool,
}

impl PendingStatement {
    fn push(&mut self, line: usize, c: char) {
        if !self.started && !c.is_whitespace() {
            self.started = true;
            self.start_line = line;
        }
        self.sql.push(c);
    }

    fn finish(&mut self, statements: &mut Vec<RawStatement>, end_line: usize) {
        if self.started {
            statements.push(RawStatement {
                start_line: self.start_line,
                end_line,
                sql: self.sql.trim().to_string(),
            });
        }
        *self = Self::default();
    }
}

/// `$` 위치에서 달러 인용 태그(`$$`, `$body$`)를 읽음. `$1` 같은 파라미터는 None.
fn dollar_tag(chars: &[char], start: usize) -> Option<String> {
    let mut tag = String::from("$");
    for (offset, &c) in chars[start + 1..].iter().enumerate() {
        if c == '$' {
            tag.push('$');
            return Some(tag);
        }
        let valid = if offset == 0 {
            c.is_alphabetic() || c == '_'
        } else {
            c.is_alphanumeric() || c == '_'
        };
        if !valid {
            return None;
        }
        tag.push(c);
    }
    None
}

fn starts_with_at(chars: &[char], start: usize, pattern: &str) -> bool {
    let mut idx = start;
    for p in pattern.chars() {
        if chars.get(idx) != Some(&p) {
            return false;
        }
        idx += 1;
    }
    true
}

/// 문장 앞부분을 토큰으로 분리 (큰따옴표 식별자는 하나의 토큰)
fn header_tokens(sql: &str, limit: usize) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;

    for c in sql.chars() {
        if in_quote {
            current.push(c);
            if c == '"' {
                in_quote = false;
            }
            continue;
        }

        match c {
            '"' => {
                current.push(c);
                in_quote = true;
            }
            c if c.is_whitespace() || matches!(c, '(' | ')' | ',' | ';') => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                    if tokens.len() >= limit {
                        return tokens;
                    }
                }
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

struct Header {
    statement_type: StatementType,
    object_name: String,
    if_not_exists: bool,
    if_exists: bool,
    or_replace: bool,
}

/// 문장 유형, 대상 객체, 옵션 플래그 검출
fn parse_header(tokens: &[String]) -> Header {
    let upper: Vec<String> = tokens.iter().map(|t| t.to_uppercase()).collect();
    let mut header = Header {
        statement_type: StatementType::Other(
            upper.first().cloned().unwrap_or_else(|| "UNKNOWN".to_string()),
        ),
        object_name: String::new(),
        if_not_exists: false,
        if_exists: false,
        or_replace: false,
    };

    let mut pos = 1;
    let kind = match upper.first().map(String::as_str) {
        Some("CREATE") => {
            if word_at(&upper, pos) == "OR" && word_at(&upper, pos + 1) == "REPLACE" {
                header.or_replace = true;
                pos += 2;
            }
            while matches!(
                word_at(&upper, pos),
                "UNIQUE" | "UNLOGGED" | "TEMP" | "TEMPORARY" | "CONSTRAINT"
            ) {
                pos += 1;
            }
            let (statement_type, consumed) = match (word_at(&upper, pos), word_at(&upper, pos + 1))
            {
                ("TABLE", _) => (StatementType::CreateTable, 1),
                ("VIEW", _) => (StatementType::CreateView, 1),
                ("MATERIALIZED", "VIEW") => (StatementType::CreateMaterializedView, 2),
                ("INDEX", _) => (StatementType::CreateIndex, 1),
                ("FUNCTION", _) | ("PROCEDURE", _) => (StatementType::CreateFunction, 1),
                ("TRIGGER", _) => (StatementType::CreateTrigger, 1),
                ("TYPE", _) => (StatementType::CreateType, 1),
                ("EXTENSION", _) => (StatementType::CreateExtension, 1),
                ("SCHEMA", _) => (StatementType::CreateSchema, 1),
                ("POLICY", _) => (StatementType::CreatePolicy, 1),
                _ => return header,
            };
            pos += consumed;
            if word_at(&upper, pos) == "CONCURRENTLY" {
                pos += 1;
            }
            if word_at(&upper, pos) == "IF"
                && word_at(&upper, pos + 1) == "NOT"
                && word_at(&upper, pos + 2) == "EXISTS"
            {
                header.if_not_exists = true;
                pos += 3;
            }
            statement_type
        }
        Some("DROP") => {
            let (statement_type, consumed) = match (word_at(&upper, pos), word_at(&upper, pos + 1))
            {
                ("TABLE", _) => (StatementType::DropTable, 1),
                ("VIEW", _) => (StatementType::DropView, 1),
                ("MATERIALIZED", "VIEW") => (StatementType::DropView, 2),
                ("INDEX", _) => (StatementType::DropIndex, 1),
                ("FUNCTION", _) | ("PROCEDURE", _) => (StatementType::DropFunction, 1),
                ("TRIGGER", _) => (StatementType::DropTrigger, 1),
                ("TYPE", _) => (StatementType::DropType, 1),
                ("POLICY", _) => (StatementType::DropPolicy, 1),
                _ => return header,
            };
            pos += consumed;
            if word_at(&upper, pos) == "CONCURRENTLY" {
                pos += 1;
            }
            if word_at(&upper, pos) == "IF" && word_at(&upper, pos + 1) == "EXISTS" {
                header.if_exists = true;
                pos += 2;
            }
            statement_type
        }
        Some("ALTER") if word_at(&upper, pos) == "TABLE" => {
            pos += 1;
            if word_at(&upper, pos) == "IF" && word_at(&upper, pos + 1) == "EXISTS" {
                header.if_exists = true;
                pos += 2;
            }
            if word_at(&upper, pos) == "ONLY" {
                pos += 1;
            }
            StatementType::AlterTable
        }
        Some("INSERT") if word_at(&upper, pos) == "INTO" => {
            pos += 1;
            StatementType::Insert
        }
        _ => return header,
    };

    header.statement_type = kind;
    header.object_name = match tokens.get(pos) {
        // 이름 없는 인덱스 (CREATE INDEX ON t ...)
        Some(token) if token.eq_ignore_ascii_case("ON") => String::new(),
        Some(token) => normalize_identifier(token),
        None => String::new(),
    };

    header
}

fn word_at(upper: &[String], pos: usize) -> &str {
    upper.get(pos).map(String::as_str).unwrap_or("")
}

/// 스키마 접두사 제거, 따옴표 없는 식별자는 소문자로 정규화
fn normalize_identifier(token: &str) -> String {
    let last = split_qualified(token).pop().unwrap_or_default();
    if last.starts_with('"') && last.ends_with('"') && last.len() >= 2 {
        last[1..last.len() - 1].to_string()
    } else {
        last.to_lowercase()
    }
}

/// `schema."Name"` 같은 한정 이름을 점 기준으로 분리 (따옴표 내부 점 무시)
fn split_qualified(token: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;

    for c in token.chars() {
        match c {
            '"' => {
                in_quote = !in_quote;
                current.push(c);
            }
            '.' if !in_quote => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}
