//! 클리닉 마이그레이션용 PostgreSQL 드라이버.
//!
//! `clinic-core`의 [`Connector`](clinic_core::Connector)와
//! [`MigrationExecutor`](clinic_core::MigrationExecutor)를 sqlx로 구현합니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use clinic_core::{negotiate, ConnectionCandidate};
//! use clinic_data::PgConnector;
//!
//! let connector = PgConnector::new(Duration::from_secs(10));
//! let negotiated = negotiate(&connector, &candidates).await?;
//! let mut executor = negotiated.session;
//! ```

pub mod connector;
pub mod error;
pub mod executor;

pub use connector::PgConnector;
pub use error::exec_error_from_sqlx;
pub use executor::PgExecutor;
