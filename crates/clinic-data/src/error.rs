//! sqlx 에러를 SQLSTATE 기반 분류로 변환.

use clinic_core::{ErrorClass, ExecError};

/// sqlx 에러를 [`ExecError`]로 변환.
///
/// 서버가 보낸 에러는 SQLSTATE 코드로 분류하고, 연결 계층 에러
/// (I/O, TLS, 풀 타임아웃 등)는 연결 에러로 분류합니다.
pub fn exec_error_from_sqlx(err: sqlx::Error) -> ExecError {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_string();
            match db_err.code() {
                Some(code) => ExecError::from_sqlstate(&code, message),
                None => ExecError::new(ErrorClass::Other, message),
            }
        }
        sqlx::Error::Io(e) => ExecError::connection(e.to_string()),
        sqlx::Error::Tls(e) => ExecError::connection(format!("TLS: {}", e)),
        sqlx::Error::Protocol(msg) => ExecError::connection(msg),
        sqlx::Error::Configuration(e) => ExecError::connection(format!("설정 오류: {}", e)),
        sqlx::Error::PoolTimedOut => ExecError::connection("연결 타임아웃"),
        sqlx::Error::PoolClosed => ExecError::connection("연결 풀이 닫혔습니다"),
        sqlx::Error::WorkerCrashed => ExecError::connection("연결 워커 비정상 종료"),
        other => ExecError::new(ErrorClass::Other, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_are_connection_class() {
        let io = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert_eq!(exec_error_from_sqlx(io).class, ErrorClass::Connection);
        assert_eq!(
            exec_error_from_sqlx(sqlx::Error::PoolTimedOut).class,
            ErrorClass::Connection
        );
    }

    #[test]
    fn test_other_errors_are_other_class() {
        let err = exec_error_from_sqlx(sqlx::Error::RowNotFound);
        assert_eq!(err.class, ErrorClass::Other);
        assert_eq!(err.code, None);
    }
}
