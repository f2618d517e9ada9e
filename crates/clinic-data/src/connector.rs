//! 후보 URL로 PostgreSQL 세션 열기.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use clinic_core::{ConnectionCandidate, Connector, ExecError};
use secrecy::ExposeSecret;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing::debug;

use crate::error::exec_error_from_sqlx;
use crate::executor::PgExecutor;

/// sqlx 기반 연결 드라이버.
///
/// 세션마다 연결 하나만 가진 풀을 만들어 모든 문장이 같은 서버 세션에서
/// 실행되도록 합니다. 트랜잭션 풀러 뒤에서도 동작하도록 prepared statement
/// 캐시는 끕니다.
#[derive(Debug, Clone)]
pub struct PgConnector {
    connect_timeout: Duration,
}

impl PgConnector {
    /// 새 드라이버 생성
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for PgConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Session = PgExecutor;

    async fn connect(&self, candidate: &ConnectionCandidate) -> Result<PgExecutor, ExecError> {
        let options = PgConnectOptions::from_str(candidate.url.expose_secret())
            .map_err(exec_error_from_sqlx)?
            .statement_cache_capacity(0);

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .min_connections(0)
            .acquire_timeout(self.connect_timeout)
            .connect_with(options)
            .await
            .map_err(exec_error_from_sqlx)?;

        debug!(candidate = %candidate.label, "연결 풀 생성");
        Ok(PgExecutor::new(pool))
    }

    async fn probe(&self, session: &mut PgExecutor) -> Result<(), ExecError> {
        session.ping().await
    }

    async fn discard(&self, session: PgExecutor) {
        session.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_connection_error() {
        let connector = PgConnector::new(Duration::from_millis(200));
        let candidate = ConnectionCandidate::new("direct", "not a url");

        let err = connector.connect(&candidate).await.unwrap_err();
        assert_eq!(err.class, clinic_core::ErrorClass::Connection);
    }

    #[tokio::test]
    async fn test_unreachable_host_fails_within_timeout() {
        let connector = PgConnector::new(Duration::from_millis(500));
        // 예약된 문서용 주소 (TEST-NET-1)
        let candidate =
            ConnectionCandidate::new("direct", "postgres://u:p@192.0.2.1:5432/clinic");

        let started = std::time::Instant::now();
        let err = connector.connect(&candidate).await.unwrap_err();
        assert_eq!(err.class, clinic_core::ErrorClass::Connection);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
