//! 테일러 설정
//!
//! [`TailerConfig`]는 core의 [`TraceshipConfig`](traceship_core::config::TraceshipConfig)에서
//! 테일링에 필요한 값만 투영한 런타임 설정입니다.
//!
//! # 사용 예시
//! ```ignore
//! use traceship_core::config::TraceshipConfig;
//! use traceship_tailer::config::TailerConfig;
//!
//! let core_config = TraceshipConfig::default();
//! let config = TailerConfig::from_core(&core_config);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::TailerError;

/// 테일러 런타임 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailerConfig {
    /// 로그 파일 디렉토리
    pub folder: String,
    /// 파일 접두어
    pub file_prefix: String,
    /// 테일링할 스트림 타입 목록
    pub stream_types: Vec<String>,
    /// 커서 스냅샷 파일 경로
    pub cursor_path: String,
    /// 파일 생성 대기 폴링 주기 (밀리초)
    pub file_poll_interval_ms: u64,
    /// 새 바이트 대기 폴링 주기 (밀리초)
    pub read_poll_interval_ms: u64,
    /// 레코드를 발행할 토픽
    pub topic: String,
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            folder: ".".to_owned(),
            file_prefix: "gpufl".to_owned(),
            stream_types: vec![
                "kernel".to_owned(),
                "scope".to_owned(),
                "system".to_owned(),
            ],
            cursor_path: "cursor.json".to_owned(),
            file_poll_interval_ms: 2000,
            read_poll_interval_ms: 100,
            topic: "gpu-trace-events".to_owned(),
        }
    }
}

impl TailerConfig {
    /// core 설정에서 테일러 설정을 투영합니다.
    pub fn from_core(core: &traceship_core::config::TraceshipConfig) -> Self {
        Self {
            folder: core.source.folder.clone(),
            file_prefix: core.source.file_prefix.clone(),
            stream_types: core.source.stream_types.clone(),
            cursor_path: core.tailing.cursor_path.clone(),
            file_poll_interval_ms: core.tailing.file_poll_interval_ms,
            read_poll_interval_ms: core.tailing.read_poll_interval_ms,
            topic: core.publisher.topic.clone(),
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), TailerError> {
        const MAX_POLL_INTERVAL_MS: u64 = 60_000; // 1 minute

        if self.file_prefix.is_empty() {
            return Err(TailerError::Config {
                field: "file_prefix".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.stream_types.is_empty() {
            return Err(TailerError::Config {
                field: "stream_types".to_owned(),
                reason: "at least one stream type must be configured".to_owned(),
            });
        }

        if self.stream_types.iter().any(|t| t.is_empty()) {
            return Err(TailerError::Config {
                field: "stream_types".to_owned(),
                reason: "stream type must not be empty".to_owned(),
            });
        }

        if self.cursor_path.is_empty() {
            return Err(TailerError::Config {
                field: "cursor_path".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.file_poll_interval_ms == 0 || self.file_poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(TailerError::Config {
                field: "file_poll_interval_ms".to_owned(),
                reason: format!("must be 1-{MAX_POLL_INTERVAL_MS}"),
            });
        }

        if self.read_poll_interval_ms == 0 || self.read_poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(TailerError::Config {
                field: "read_poll_interval_ms".to_owned(),
                reason: format!("must be 1-{MAX_POLL_INTERVAL_MS}"),
            });
        }

        if self.topic.is_empty() {
            return Err(TailerError::Config {
                field: "topic".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        Ok(())
    }
}

/// 테일러 설정 빌더
#[derive(Default)]
pub struct TailerConfigBuilder {
    config: TailerConfig,
}

impl TailerConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 로그 파일 디렉토리를 설정합니다.
    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.config.folder = folder.into();
        self
    }

    /// 파일 접두어를 설정합니다.
    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    /// 스트림 타입 목록을 설정합니다.
    pub fn stream_types(mut self, types: Vec<String>) -> Self {
        self.config.stream_types = types;
        self
    }

    /// 커서 스냅샷 경로를 설정합니다.
    pub fn cursor_path(mut self, path: impl Into<String>) -> Self {
        self.config.cursor_path = path.into();
        self
    }

    /// 파일 생성 대기 폴링 주기를 설정합니다.
    pub fn file_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.file_poll_interval_ms = ms;
        self
    }

    /// 새 바이트 대기 폴링 주기를 설정합니다.
    pub fn read_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.read_poll_interval_ms = ms;
        self
    }

    /// 발행 토픽을 설정합니다.
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.config.topic = topic.into();
        self
    }

    /// 설정을 검증하고 `TailerConfig`를 생성합니다.
    pub fn build(self) -> Result<TailerConfig, TailerError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
