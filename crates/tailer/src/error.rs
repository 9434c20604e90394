//! 테일러 에러 타입
//!
//! [`TailerError`]는 테일링/커서 서브시스템 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<TailerError> for TraceshipError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use traceship_core::error::{TailError, TraceshipError};

/// 테일링/커서 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum TailerError {
    /// 커서 스냅샷 지속 실패
    #[error("cursor persist error: {path}: {reason}")]
    CursorPersist {
        /// 스냅샷 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 라인 파싱 실패
    #[error("parse error: stream '{stream}': {reason}")]
    Parse {
        /// 소유 스트림
        stream: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TailerError> for TraceshipError {
    fn from(err: TailerError) -> Self {
        match err {
            TailerError::CursorPersist { .. } => {
                TraceshipError::Tail(TailError::Cursor(err.to_string()))
            }
            TailerError::Parse { stream, reason } => {
                TraceshipError::Tail(TailError::Parse { stream, reason })
            }
            TailerError::Config { field, reason } => {
                TraceshipError::Config(traceship_core::error::ConfigError::InvalidValue {
                    field,
                    reason,
                })
            }
            TailerError::Io(e) => TraceshipError::Io(e),
        }
    }
}
