//! 클리닉 스키마 마이그레이션 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 정적 검증
//! clinic migrate verify
//!
//! # 마이그레이션 실행 (DATABASE_URL → DATABASE_POOLER_URL 순서로 연결 시도)
//! clinic migrate run
//!
//! # 매니페스트 순서로 문장 단위 실행
//! clinic migrate run --manifest migrations/manifest.toml --mode split
//!
//! # 적용 상태 / 테이블 목록
//! clinic migrate status
//! clinic migrate tables
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;

use config::{ClinicConfig, CliOverrides};

#[derive(Parser)]
#[command(name = "clinic")]
#[command(about = "Clinic schema migration tool - 클리닉 스키마 마이그레이션", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 마이그레이션 관리 (실행, 검증, 상태, 테이블 목록)
    Migrate {
        /// 서브커맨드
        #[arg(value_enum, value_name = "SUBCOMMAND")]
        action: MigrateAction,

        /// 마이그레이션 디렉토리 (기본: MIGRATIONS_DIR 또는 migrations)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// 실행 순서 매니페스트 (TOML `files = [...]`)
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// 실행 방식 (whole: 파일 단위, split: 문장 단위)
        #[arg(long)]
        mode: Option<String>,

        /// 테이블 목록을 조회할 스키마
        #[arg(long)]
        schema: Option<String>,

        /// 적용 원장 사용 안 함
        #[arg(long)]
        no_ledger: bool,

        /// 데이터베이스 URL (여러 번 지정 시 순서대로 시도, 환경변수 후보 대체)
        #[arg(long = "db-url", value_name = "URL")]
        db_url: Vec<String>,

        /// 상세 출력
        #[arg(short, long)]
        verbose: bool,
    },
}

/// migrate 서브커맨드
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MigrateAction {
    /// 목록 순서대로 실행
    #[value(alias = "apply")]
    Run,
    /// 데이터베이스 없이 정적 검증
    Verify,
    /// 원장 기준 적용 상태
    Status,
    /// 현재 테이블 목록
    Tables,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "clinic_cli={},clinic_core={},clinic_data={}",
            default_level, default_level, default_level
        )
        .into()
    });

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate {
            action,
            dir,
            manifest,
            mode,
            schema,
            no_ledger,
            db_url,
            verbose,
        } => {
            dotenvy::dotenv().ok();
            init_tracing(verbose);

            let mut config = ClinicConfig::from_env()?;
            config.apply_overrides(CliOverrides {
                dir,
                manifest,
                mode,
                schema,
                no_ledger,
                db_urls: db_url,
            })?;

            match action {
                MigrateAction::Verify => {
                    let is_valid = commands::migrate::run_verify(&config, verbose)?;
                    if !is_valid {
                        return Err("마이그레이션 검증 실패".into());
                    }
                }
                MigrateAction::Run => {
                    if let Err(e) = commands::migrate::run_apply(&config, verbose).await {
                        error!("마이그레이션 실행 실패: {}", e);
                        return Err(e.into());
                    }
                }
                MigrateAction::Status => {
                    commands::migrate::run_status(&config).await?;
                }
                MigrateAction::Tables => {
                    commands::migrate::run_tables(&config).await?;
                }
            }
        }
    }

    Ok(())
}
