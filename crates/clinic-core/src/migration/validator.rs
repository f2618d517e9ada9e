//! 마이그레이션 검증기.
//!
//! 데이터베이스에 접속하지 않고 마이그레이션 목록을 정적으로 검사합니다.
//! 테이블 집합은 실행 후 줄어들면 안 되므로 `DROP TABLE`은 에러로 봅니다.

use std::collections::BTreeMap;

use super::models::*;

/// 마이그레이션 검증기
pub struct MigrationValidator<'a> {
    files: &'a [MigrationFile],
    unreadable: &'a [(String, String)],
}

impl<'a> MigrationValidator<'a> {
    /// 새 검증기 생성
    pub fn new(files: &'a [MigrationFile]) -> Self {
        Self {
            files,
            unreadable: &[],
        }
    }

    /// 읽지 못한 파일 목록 (ID, 에러 메시지) 추가
    pub fn with_unreadable(mut self, unreadable: &'a [(String, String)]) -> Self {
        self.unreadable = unreadable;
        self
    }

    /// 전체 검증 수행
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.files_analyzed = self.files.len();
        report.total_statements = self.files.iter().map(|f| f.statements.len()).sum();

        self.check_unreadable(&mut report);
        self.check_drop_table(&mut report);
        self.check_duplicate_definitions(&mut report);
        self.check_cascade_usage(&mut report);
        self.check_idempotency(&mut report);

        report
    }

    /// 읽기 실패 검사
    fn check_unreadable(&self, report: &mut ValidationReport) {
        for (id, message) in self.unreadable {
            report.add_issue(
                ValidationIssue::new(
                    Severity::Error,
                    "READ001",
                    &format!("파일을 읽을 수 없음: {}", message),
                )
                .with_file(id)
                .with_suggestion("매니페스트의 파일명과 디렉토리를 확인하세요."),
            );
        }
    }

    /// DROP TABLE 검사 (실행 후 테이블 목록은 실행 전의 상위 집합이어야 함)
    fn check_drop_table(&self, report: &mut ValidationReport) {
        for file in self.files {
            for stmt in &file.statements {
                if stmt.statement_type == StatementType::DropTable {
                    report.add_issue(
                        ValidationIssue::new(
                            Severity::Error,
                            "DROP001",
                            "DROP TABLE - 마이그레이션은 테이블을 삭제하지 않아야 함",
                        )
                        .with_file(&file.name)
                        .with_line(stmt.line_number)
                        .with_object(&stmt.object_name)
                        .with_suggestion("별도의 수동 작업으로 분리하세요."),
                    );
                }
            }
        }
    }

    /// 여러 파일에서 같은 객체를 생성하는지 검사
    fn check_duplicate_definitions(&self, report: &mut ValidationReport) {
        let mut definitions: BTreeMap<(String, String), Vec<(String, usize)>> = BTreeMap::new();

        for file in self.files {
            for stmt in &file.statements {
                // OR REPLACE 는 재정의가 의도된 것
                if !stmt.statement_type.is_create()
                    || stmt.or_replace
                    || stmt.object_name.is_empty()
                {
                    continue;
                }
                let kind = format!("{:?}", stmt.statement_type);
                definitions
                    .entry((kind, stmt.object_name.to_lowercase()))
                    .or_default()
                    .push((file.name.clone(), stmt.line_number));
            }
        }

        for ((_, object), locations) in definitions {
            let mut files: Vec<&str> = locations.iter().map(|(f, _)| f.as_str()).collect();
            files.dedup();
            if files.len() < 2 {
                continue;
            }

            let locations_str: Vec<String> = locations
                .iter()
                .map(|(f, l)| format!("{}:{}", f, l))
                .collect();

            report.add_issue(
                ValidationIssue::new(
                    Severity::Warning,
                    "DUP001",
                    &format!("'{}' 객체가 {} 개 파일에서 생성됨", object, files.len()),
                )
                .with_object(&object)
                .with_suggestion(&format!(
                    "뒤쪽 파일은 이미 존재 에러로 허용됩니다. 위치: {}",
                    locations_str.join(", ")
                )),
            );
        }
    }

    /// DDL CASCADE 사용 검사 (FK ON DELETE CASCADE는 의도된 설계이므로 제외)
    fn check_cascade_usage(&self, report: &mut ValidationReport) {
        for file in self.files {
            for stmt in &file.statements {
                if stmt.cascade {
                    report.add_issue(
                        ValidationIssue::new(
                            Severity::Warning,
                            "CASC001",
                            "CASCADE 사용 - 의존 객체가 자동 삭제될 수 있음",
                        )
                        .with_file(&file.name)
                        .with_line(stmt.line_number)
                        .with_object(&stmt.object_name)
                        .with_suggestion("명시적 삭제 순서 권장. CASCADE 제거 후 수동 정리."),
                    );
                }
            }
        }
    }

    /// 멱등성 검사 (IF NOT EXISTS 누락)
    fn check_idempotency(&self, report: &mut ValidationReport) {
        for file in self.files {
            for stmt in &file.statements {
                if matches!(
                    stmt.statement_type,
                    StatementType::CreateTable | StatementType::CreateIndex | StatementType::CreateType
                ) && !stmt.if_not_exists
                {
                    report.add_issue(
                        ValidationIssue::new(
                            Severity::Info,
                            "IDEM001",
                            "IF NOT EXISTS 누락 - 재실행 시 이미 존재 에러에 의존",
                        )
                        .with_file(&file.name)
                        .with_line(stmt.line_number)
                        .with_object(&stmt.object_name)
                        .with_suggestion("CREATE ... IF NOT EXISTS 사용 권장."),
                    );
                }
            }
        }
    }
}
