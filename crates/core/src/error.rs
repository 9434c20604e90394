//! 에러 타입 — 도메인별 에러 정의

/// Traceship 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum TraceshipError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 테일링/커서 처리 에러
    #[error("tail error: {0}")]
    Tail(#[from] TailError),

    /// 퍼블리시 에러
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 테일링/커서 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum TailError {
    /// 커서 스냅샷 처리 실패
    #[error("cursor error: {0}")]
    Cursor(String),

    /// 스트림 읽기 실패
    #[error("stream '{stream}' read failed: {reason}")]
    Read { stream: String, reason: String },

    /// 라인 파싱 실패
    #[error("stream '{stream}' parse failed: {reason}")]
    Parse { stream: String, reason: String },
}

/// 퍼블리시 에러
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// 백엔드 초기화 실패
    #[error("publisher init failed: {backend}: {reason}")]
    Init { backend: String, reason: String },

    /// 레코드 전송 실패
    #[error("publish to topic '{topic}' failed: {reason}")]
    Send { topic: String, reason: String },

    /// HTTP 응답 에러 (2xx 이외)
    #[error("http publish failed: status {status}: {body}")]
    Http { status: u16, body: String },

    /// 지원하지 않는 백엔드
    #[error("unsupported publisher backend: {0}")]
    UnsupportedBackend(String),
}
