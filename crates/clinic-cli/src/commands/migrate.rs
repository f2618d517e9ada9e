//! 마이그레이션 관리 CLI 명령어.
//!
//! # 사용법
//!
//! ```bash
//! # 데이터베이스 없이 정적 검증
//! clinic migrate verify --verbose
//!
//! # 순서대로 실행 (직접 연결 실패 시 풀러로 재시도)
//! clinic migrate run --db-url "postgres://..." --db-url "postgres://...:6543/..."
//!
//! # 문장 단위 실행, 원장 없이
//! clinic migrate run --mode split --no-ledger
//!
//! # 원장 기준 적용 상태 / 현재 테이블 목록
//! clinic migrate status
//! clinic migrate tables --schema public
//! ```

use clinic_core::migration::{
    migration_states, resolve_migration_list, FsSource, MigrationAnalyzer, MigrationExecutor,
    MigrationSequencer, MigrationState, MigrationValidator, SqlSource,
};
use clinic_core::{negotiate, MigrationError, NegotiatedConnection};
use clinic_data::{PgConnector, PgExecutor};
use tracing::warn;

use crate::config::ClinicConfig;

const HEAVY_RULE: &str = "═══════════════════════════════════════════════════════════════";

/// 마이그레이션 검증 실행 (데이터베이스 불필요)
pub fn run_verify(config: &ClinicConfig, verbose: bool) -> Result<bool, MigrationError> {
    println!("\n🔍 마이그레이션 검증 시작...\n");

    let ids = resolve_migration_list(&config.migrations_dir, config.manifest.as_deref())?;
    let source = FsSource::new(&config.migrations_dir);
    let analyzer = MigrationAnalyzer::new();

    let mut files = Vec::with_capacity(ids.len());
    let mut unreadable = Vec::new();
    for id in &ids {
        match source.read(id) {
            Ok(content) => files.push(analyzer.parse_content(id, content)),
            Err(e) => unreadable.push((id.clone(), e.to_string())),
        }
    }

    println!("📁 {} 개 마이그레이션 파일", ids.len());

    if verbose {
        for (i, file) in files.iter().enumerate() {
            println!(
                "   {:02}. {} ({} 문장)",
                i + 1,
                file.name,
                file.statements.len()
            );
        }
        println!();
    }

    let report = MigrationValidator::new(&files)
        .with_unreadable(&unreadable)
        .validate();

    println!("{}", report);

    Ok(report.is_valid())
}

/// 마이그레이션 실행.
///
/// 개별 파일 실패는 보고서에만 기록되며 에러로 반환하지 않습니다.
pub async fn run_apply(config: &ClinicConfig, verbose: bool) -> Result<(), MigrationError> {
    println!("\n🚀 마이그레이션 실행 시작...\n");

    let ids = resolve_migration_list(&config.migrations_dir, config.manifest.as_deref())?;
    match &config.manifest {
        Some(path) => println!("📁 {} 개 마이그레이션 (매니페스트: {})", ids.len(), path.display()),
        None => println!(
            "📁 {} 개 마이그레이션 ({})",
            ids.len(),
            config.migrations_dir.display()
        ),
    }
    if verbose {
        for (i, id) in ids.iter().enumerate() {
            println!("   {:02}. {}", i + 1, id);
        }
    }

    let negotiated = connect(config).await?;
    let label = negotiated.label;
    let mut executor = negotiated.session;

    match executor.server_version().await {
        Ok(version) => println!("🗄️  {}\n", version),
        Err(e) => warn!(error = %e, "서버 버전 조회 실패"),
    }

    let sequencer = MigrationSequencer::new(
        FsSource::new(&config.migrations_dir),
        config.sequencer_options(),
    );
    let report = sequencer.run(&ids, &mut executor, &label).await;
    executor.close().await;

    println!("{}", report);

    if verbose {
        println!("⏱️  파일별 소요 시간");
        for file in &report.files {
            println!("   {:<40} {:>6} ms", file.id, file.elapsed.as_millis());
        }
        println!();
    }

    Ok(())
}

/// 원장 기준 마이그레이션 상태 출력
pub async fn run_status(config: &ClinicConfig) -> Result<(), MigrationError> {
    let ids = resolve_migration_list(&config.migrations_dir, config.manifest.as_deref())?;
    let source = FsSource::new(&config.migrations_dir);
    let contents: Vec<(String, Result<String, String>)> = ids
        .iter()
        .map(|id| (id.clone(), source.read(id).map_err(|e| e.to_string())))
        .collect();

    let negotiated = connect(config).await?;
    let mut executor = negotiated.session;
    let loaded = executor.load_ledger().await;
    executor.close().await;

    let entries = match loaded {
        Ok(entries) => entries,
        Err(e) => {
            // 원장 테이블이 아직 없으면 전부 미적용
            warn!(error = %e, "원장 조회 실패");
            println!("ℹ️  원장을 읽을 수 없습니다. 모든 마이그레이션을 미적용으로 표시합니다.\n");
            Vec::new()
        }
    };

    let states = migration_states(&contents, &entries);

    println!("{}", HEAVY_RULE);
    println!("                    마이그레이션 상태");
    println!("{}", HEAVY_RULE);
    for (id, state) in &states {
        let icon = match state {
            MigrationState::Applied { .. } => "✅",
            MigrationState::Drifted { .. } => "⚠️ ",
            MigrationState::Pending => "⏳",
            MigrationState::Unreadable { .. } => "📄",
        };
        println!("{} {:<40} {}", icon, id, state);
    }

    let pending = states
        .iter()
        .filter(|(_, s)| matches!(s, MigrationState::Pending))
        .count();
    let drifted = states
        .iter()
        .filter(|(_, s)| matches!(s, MigrationState::Drifted { .. }))
        .count();
    println!();
    println!(
        "📊 전체 {} / 미적용 {} / 변경됨 {}",
        states.len(),
        pending,
        drifted
    );
    println!("{}", HEAVY_RULE);

    Ok(())
}

/// 현재 테이블 목록 출력
pub async fn run_tables(config: &ClinicConfig) -> Result<(), MigrationError> {
    let negotiated = connect(config).await?;
    let mut executor = negotiated.session;
    let listed = executor.list_tables(&config.schema).await;
    executor.close().await;

    let tables = listed?;
    println!("\n📋 {} 스키마 테이블 ({} 개)", config.schema, tables.len());
    for table in &tables {
        println!("   - {}", table);
    }

    Ok(())
}

/// 후보 연결 협상 후 결과 출력
async fn connect(config: &ClinicConfig) -> Result<NegotiatedConnection<PgExecutor>, MigrationError> {
    println!("🔌 데이터베이스 연결 중... ({} 개 후보)", config.candidates.len());

    let connector = PgConnector::new(config.connect_timeout());
    match negotiate(&connector, &config.candidates).await {
        Ok(negotiated) => {
            for attempt in &negotiated.failed_attempts {
                println!(
                    "   ⚠️  {} ({}) 실패: {}",
                    attempt.label, attempt.masked_url, attempt.error
                );
            }
            println!(
                "   ✅ {} ({}) 연결됨\n",
                negotiated.label, negotiated.masked_url
            );
            Ok(negotiated)
        }
        Err(e) => {
            if let MigrationError::NoWorkingConnection { attempts } = &e {
                for attempt in attempts {
                    println!(
                        "   ❌ {} ({}) 실패: {}",
                        attempt.label, attempt.masked_url, attempt.error
                    );
                }
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliOverrides;
    use std::fs;

    fn config_for(dir: &std::path::Path) -> ClinicConfig {
        let mut config = ClinicConfig::from_lookup(|_| None).unwrap();
        config
            .apply_overrides(CliOverrides {
                dir: Some(dir.to_path_buf()),
                ..CliOverrides::default()
            })
            .unwrap();
        config
    }

    #[test]
    fn test_verify_reports_drop_table() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("001_core.sql"),
            "CREATE TABLE IF NOT EXISTS patients (id uuid);",
        )
        .unwrap();
        assert!(run_verify(&config_for(dir.path()), true).unwrap());

        fs::write(dir.path().join("002_cleanup.sql"), "DROP TABLE patients;").unwrap();
        assert!(!run_verify(&config_for(dir.path()), false).unwrap());
    }

    #[test]
    fn test_verify_without_migrations_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            run_verify(&config_for(dir.path()), false),
            Err(MigrationError::EmptyMigrationList(_))
        ));
    }

    #[tokio::test]
    async fn test_run_without_candidates_fails_before_executing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("001_core.sql"), "SELECT 1;").unwrap();

        assert!(matches!(
            run_apply(&config_for(dir.path()), false).await,
            Err(MigrationError::NoCandidates)
        ));
    }
}
