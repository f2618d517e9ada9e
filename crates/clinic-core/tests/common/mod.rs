//! 통합 테스트용 인메모리 데이터베이스.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::io;

use async_trait::async_trait;
use clinic_core::migration::{LedgerEntry, MigrationAnalyzer, MigrationExecutor, SqlSource, StatementType};
use clinic_core::ExecError;

/// 테이블과 기타 객체만 추적하는 가짜 데이터베이스.
///
/// `execute` 한 번은 하나의 암시적 트랜잭션처럼 동작합니다: 중간에 실패하면
/// 그 호출에서 바뀐 내용은 모두 버려집니다.
#[derive(Debug, Default)]
pub struct FakeDb {
    pub tables: BTreeSet<String>,
    pub objects: BTreeSet<(String, String)>,
    pub ledger: Vec<LedgerEntry>,
    pub executed: Vec<String>,
    pub ledger_broken: bool,
    pub catalog_broken: bool,
}

impl FakeDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables(tables: &[&str]) -> Self {
        Self {
            tables: tables.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    fn apply(&mut self, sql: &str) -> Result<(), ExecError> {
        for stmt in MigrationAnalyzer::new().parse_statements(sql) {
            if stmt.raw_sql.contains("SYNTAX_ERROR") {
                return Err(ExecError::from_sqlstate(
                    "42601",
                    "syntax error at or near \"SYNTAX_ERROR\"",
                ));
            }
            if stmt.raw_sql.contains("CHECK_VIOLATION") {
                return Err(ExecError::from_sqlstate(
                    "23514",
                    format!(
                        "new row violates check constraint {}\nDETAIL: long detail",
                        "x".repeat(300)
                    ),
                ));
            }

            let name = stmt.object_name.clone();
            match &stmt.statement_type {
                StatementType::CreateTable => {
                    if !self.tables.insert(name.clone()) && !stmt.if_not_exists {
                        return Err(ExecError::from_sqlstate(
                            "42P07",
                            format!("relation \"{}\" already exists", name),
                        ));
                    }
                }
                StatementType::DropTable => {
                    if !self.tables.remove(&name) && !stmt.if_exists {
                        return Err(ExecError::from_sqlstate(
                            "42P01",
                            format!("table \"{}\" does not exist", name),
                        ));
                    }
                }
                kind if kind.is_create() => {
                    let key = (format!("{:?}", kind), name.clone());
                    if !self.objects.insert(key) && !stmt.if_not_exists && !stmt.or_replace {
                        return Err(ExecError::from_sqlstate(
                            "42710",
                            format!("object \"{}\" already exists", name),
                        ));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MigrationExecutor for FakeDb {
    async fn execute(&mut self, sql: &str) -> Result<(), ExecError> {
        self.executed.push(sql.to_string());

        let tables = self.tables.clone();
        let objects = self.objects.clone();
        let result = self.apply(sql);
        if result.is_err() {
            self.tables = tables;
            self.objects = objects;
        }
        result
    }

    async fn list_tables(&mut self, _schema: &str) -> Result<Vec<String>, ExecError> {
        if self.catalog_broken {
            return Err(ExecError::from_sqlstate(
                "42501",
                "permission denied for schema information_schema",
            ));
        }
        Ok(self.tables.iter().cloned().collect())
    }

    async fn ensure_ledger(&mut self) -> Result<(), ExecError> {
        if self.ledger_broken {
            return Err(ExecError::from_sqlstate(
                "42501",
                "permission denied for schema public",
            ));
        }
        Ok(())
    }

    async fn load_ledger(&mut self) -> Result<Vec<LedgerEntry>, ExecError> {
        Ok(self.ledger.clone())
    }

    async fn record(&mut self, entry: &LedgerEntry) -> Result<(), ExecError> {
        self.ledger.retain(|e| e.id != entry.id);
        self.ledger.push(entry.clone());
        Ok(())
    }
}

/// 메모리 기반 SQL 원본
#[derive(Debug, Default, Clone)]
pub struct MapSource {
    pub files: HashMap<String, String>,
}

impl MapSource {
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(id, sql)| (id.to_string(), sql.to_string()))
                .collect(),
        }
    }

    pub fn ids(&self, order: &[&str]) -> Vec<String> {
        order.iter().map(|id| id.to_string()).collect()
    }
}

impl SqlSource for MapSource {
    fn read(&self, id: &str) -> io::Result<String> {
        self.files
            .get(id)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "No such file or directory"))
    }
}
