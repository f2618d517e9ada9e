//! 마이그레이션 목록과 SQL 원본.
//!
//! 목록은 매니페스트(TOML `files = [...]`)가 있으면 그 순서를 따르고,
//! 없으면 디렉토리의 `*.sql` 파일을 파일명 앞의 번호 순으로 정렬합니다.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::analyzer::extract_order;
use crate::error::{MigrationError, Result};

/// SQL 원본 읽기.
pub trait SqlSource: Send + Sync {
    /// ID에 해당하는 SQL 텍스트 읽기
    fn read(&self, id: &str) -> std::io::Result<String>;

    /// ID의 위치 (보고용)
    fn locate(&self, id: &str) -> PathBuf {
        PathBuf::from(id)
    }
}

/// 디렉토리 기반 원본
#[derive(Debug, Clone)]
pub struct FsSource {
    dir: PathBuf,
}

impl FsSource {
    /// 새 원본 생성
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SqlSource for FsSource {
    fn read(&self, id: &str) -> std::io::Result<String> {
        fs::read_to_string(self.dir.join(id))
    }

    fn locate(&self, id: &str) -> PathBuf {
        self.dir.join(id)
    }
}

/// 매니페스트 파일 형식
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// 실행 순서대로 나열된 파일명
    pub files: Vec<String>,
}

impl Manifest {
    /// 매니페스트 로드
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| MigrationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    fn parse(text: &str, path: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|source| MigrationError::Manifest {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// 디렉토리의 `*.sql` 파일을 순서 번호, 파일명 순으로 나열
pub fn discover_migrations(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Err(MigrationError::DirectoryNotFound(dir.to_path_buf()));
    }

    let entries = fs::read_dir(dir).map_err(|source| MigrationError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut names: Vec<String> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|e| e == "sql"))
        .filter_map(|path| {
            path.file_name()
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .collect();

    names.sort_by(|a, b| {
        extract_order(a)
            .cmp(&extract_order(b))
            .then_with(|| a.cmp(b))
    });

    Ok(names)
}

/// 실행할 마이그레이션 목록 결정.
///
/// 매니페스트에 나열된 파일은 존재하지 않더라도 목록에 남습니다
/// (실행 시 해당 파일만 읽기 실패로 기록).
pub fn resolve_migration_list(dir: &Path, manifest: Option<&Path>) -> Result<Vec<String>> {
    let ids = match manifest {
        Some(path) => Manifest::load(path)?.files,
        None => discover_migrations(dir)?,
    };

    if ids.is_empty() {
        return Err(MigrationError::EmptyMigrationList(dir.to_path_buf()));
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_orders_by_numeric_prefix() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["10_invoices.sql", "2_patients.sql", "001_core.sql", "notes.txt"] {
            fs::write(dir.path().join(name), "SELECT 1;").unwrap();
        }

        let names = discover_migrations(dir.path()).unwrap();
        assert_eq!(names, vec!["001_core.sql", "2_patients.sql", "10_invoices.sql"]);
    }

    #[test]
    fn test_manifest_keeps_missing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("manifest.toml");
        fs::write(
            &manifest,
            "files = [\"001_core.sql\", \"002_missing.sql\"]\n",
        )
        .unwrap();

        let ids = resolve_migration_list(dir.path(), Some(&manifest)).unwrap();
        assert_eq!(ids, vec!["001_core.sql", "002_missing.sql"]);

        let source = FsSource::new(dir.path());
        assert!(source.read("002_missing.sql").is_err());
    }

    #[test]
    fn test_bad_manifest_and_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("manifest.toml");
        fs::write(&manifest, "files = 3").unwrap();

        assert!(matches!(
            resolve_migration_list(dir.path(), Some(&manifest)),
            Err(MigrationError::Manifest { .. })
        ));
        assert!(matches!(
            resolve_migration_list(&dir.path().join("nope"), None),
            Err(MigrationError::DirectoryNotFound(_))
        ));
        assert!(matches!(
            resolve_migration_list(dir.path(), None),
            Err(MigrationError::EmptyMigrationList(_))
        ));
    }
}
