//! 설정 관리 — traceship.toml 파싱 및 런타임 설정
//!
//! [`TraceshipConfig`]는 에이전트 전체의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`TRACESHIP_SOURCE_FOLDER=/var/log/gpufl` 형식)
//! 3. 설정 파일 (`traceship.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), traceship_core::error::TraceshipError> {
//! use traceship_core::config::TraceshipConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = TraceshipConfig::load("traceship.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = TraceshipConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, TraceshipError};

/// Traceship 통합 설정
///
/// `traceship.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceshipConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 로그 소스 설정
    #[serde(default)]
    pub source: SourceConfig,
    /// 테일링/커서 설정
    #[serde(default)]
    pub tailing: TailingConfig,
    /// 퍼블리셔 설정
    #[serde(default)]
    pub publisher: PublisherConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl TraceshipConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, TraceshipError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, TraceshipError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TraceshipError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                TraceshipError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, TraceshipError> {
        toml::from_str(toml_str).map_err(|e| {
            TraceshipError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `TRACESHIP_{SECTION}_{FIELD}`
    /// 예: `TRACESHIP_SOURCE_FOLDER=/var/log/gpufl`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "TRACESHIP_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "TRACESHIP_GENERAL_LOG_FORMAT");

        // Source
        override_string(&mut self.source.folder, "TRACESHIP_SOURCE_FOLDER");
        override_string(&mut self.source.file_prefix, "TRACESHIP_SOURCE_FILE_PREFIX");
        override_csv(
            &mut self.source.stream_types,
            "TRACESHIP_SOURCE_STREAM_TYPES",
        );

        // Tailing
        override_string(&mut self.tailing.cursor_path, "TRACESHIP_TAILING_CURSOR_PATH");
        override_u64(
            &mut self.tailing.file_poll_interval_ms,
            "TRACESHIP_TAILING_FILE_POLL_INTERVAL_MS",
        );
        override_u64(
            &mut self.tailing.read_poll_interval_ms,
            "TRACESHIP_TAILING_READ_POLL_INTERVAL_MS",
        );

        // Publisher
        override_string(&mut self.publisher.backend, "TRACESHIP_PUBLISHER_BACKEND");
        override_string(&mut self.publisher.topic, "TRACESHIP_PUBLISHER_TOPIC");
        override_string(
            &mut self.publisher.kafka.bootstrap_servers,
            "TRACESHIP_PUBLISHER_KAFKA_BOOTSTRAP_SERVERS",
        );
        override_string(
            &mut self.publisher.kafka.compression,
            "TRACESHIP_PUBLISHER_KAFKA_COMPRESSION",
        );
        override_u64(
            &mut self.publisher.kafka.linger_ms,
            "TRACESHIP_PUBLISHER_KAFKA_LINGER_MS",
        );
        override_string(
            &mut self.publisher.http.endpoint_url,
            "TRACESHIP_PUBLISHER_HTTP_ENDPOINT_URL",
        );
        override_opt_string(
            &mut self.publisher.http.auth_token,
            "TRACESHIP_PUBLISHER_HTTP_AUTH_TOKEN",
        );
        override_u64(
            &mut self.publisher.http.timeout_secs,
            "TRACESHIP_PUBLISHER_HTTP_TIMEOUT_SECS",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "TRACESHIP_METRICS_ENABLED");
        override_u16(&mut self.metrics.port, "TRACESHIP_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), TraceshipError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // source 검증
        if self.source.file_prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "source.file_prefix".to_owned(),
                reason: "file prefix must not be empty".to_owned(),
            }
            .into());
        }

        if self.source.stream_types.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "source.stream_types".to_owned(),
                reason: "at least one stream type must be configured".to_owned(),
            }
            .into());
        }

        if self.source.stream_types.iter().any(|t| t.is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "source.stream_types".to_owned(),
                reason: "stream type must not be empty".to_owned(),
            }
            .into());
        }

        // tailing 검증
        const MAX_POLL_INTERVAL_MS: u64 = 60_000; // 1 minute

        if self.tailing.cursor_path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "tailing.cursor_path".to_owned(),
                reason: "cursor path must not be empty".to_owned(),
            }
            .into());
        }

        if self.tailing.file_poll_interval_ms == 0
            || self.tailing.file_poll_interval_ms > MAX_POLL_INTERVAL_MS
        {
            return Err(ConfigError::InvalidValue {
                field: "tailing.file_poll_interval_ms".to_owned(),
                reason: format!("must be 1-{MAX_POLL_INTERVAL_MS}"),
            }
            .into());
        }

        if self.tailing.read_poll_interval_ms == 0
            || self.tailing.read_poll_interval_ms > MAX_POLL_INTERVAL_MS
        {
            return Err(ConfigError::InvalidValue {
                field: "tailing.read_poll_interval_ms".to_owned(),
                reason: format!("must be 1-{MAX_POLL_INTERVAL_MS}"),
            }
            .into());
        }

        // publisher 검증
        let valid_backends = ["kafka", "http", "stdout"];
        if !valid_backends.contains(&self.publisher.backend.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "publisher.backend".to_owned(),
                reason: format!("must be one of: {}", valid_backends.join(", ")),
            }
            .into());
        }

        if self.publisher.topic.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "publisher.topic".to_owned(),
                reason: "topic must not be empty".to_owned(),
            }
            .into());
        }

        if self.publisher.backend == "kafka" && self.publisher.kafka.bootstrap_servers.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "publisher.kafka.bootstrap_servers".to_owned(),
                reason: "bootstrap servers must not be empty when backend is kafka".to_owned(),
            }
            .into());
        }

        if self.publisher.backend == "http" {
            let url = &self.publisher.http.endpoint_url;
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidValue {
                    field: "publisher.http.endpoint_url".to_owned(),
                    reason: "must be an http(s) URL when backend is http".to_owned(),
                }
                .into());
            }
        }

        Ok(())
    }
}

// Default는 derive 매크로로 자동 생성 (각 필드가 Default를 구현하므로)

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 로그 소스 설정
///
/// 외부 생산자가 기록하는 파일의 위치와 네이밍을 기술합니다.
/// 파일 네이밍: `<prefix>.<type>.<index>.log` (인덱스는 0부터, 로테이션 시 +1)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// 로그 파일 디렉토리
    pub folder: String,
    /// 파일 접두어
    pub file_prefix: String,
    /// 테일링할 스트림 타입 목록
    pub stream_types: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            folder: ".".to_owned(),
            file_prefix: "gpufl".to_owned(),
            stream_types: vec![
                "kernel".to_owned(),
                "scope".to_owned(),
                "system".to_owned(),
            ],
        }
    }
}

/// 테일링/커서 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TailingConfig {
    /// 커서 스냅샷 파일 경로
    pub cursor_path: String,
    /// 파일 생성 대기 폴링 주기 (밀리초)
    pub file_poll_interval_ms: u64,
    /// 새 바이트 대기 폴링 주기 (밀리초)
    pub read_poll_interval_ms: u64,
}

impl Default for TailingConfig {
    fn default() -> Self {
        Self {
            cursor_path: "cursor.json".to_owned(),
            file_poll_interval_ms: 2000,
            read_poll_interval_ms: 100,
        }
    }
}

/// 퍼블리셔 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// 백엔드 선택 (kafka, http, stdout)
    pub backend: String,
    /// 발행 토픽
    pub topic: String,
    /// Kafka 백엔드 설정
    pub kafka: KafkaConfig,
    /// HTTP 백엔드 설정
    pub http: HttpConfig,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            backend: "stdout".to_owned(),
            topic: "gpu-trace-events".to_owned(),
            kafka: KafkaConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

/// Kafka 백엔드 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaConfig {
    /// 부트스트랩 서버 (콤마 구분)
    pub bootstrap_servers: String,
    /// 압축 코덱
    pub compression: String,
    /// 배칭 지연 (밀리초)
    pub linger_ms: u64,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: "localhost:9092".to_owned(),
            compression: "snappy".to_owned(),
            linger_ms: 100,
        }
    }
}

/// HTTP 백엔드 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// 수신 엔드포인트 URL
    pub endpoint_url: String,
    /// Bearer 인증 토큰 (선택)
    pub auth_token: Option<String>,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            endpoint_url: String::new(),
            auth_token: None,
            timeout_secs: 10,
        }
    }
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus 엔드포인트 활성화 여부
    pub enabled: bool,
    /// 리스닝 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9095,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_opt_string(target: &mut Option<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = Some(val);
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split(',').map(|s| s.trim().to_owned()).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = TraceshipConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.source.file_prefix, "gpufl");
        assert_eq!(config.source.stream_types.len(), 3);
        assert_eq!(config.tailing.cursor_path, "cursor.json");
        assert_eq!(config.tailing.file_poll_interval_ms, 2000);
        assert_eq!(config.tailing.read_poll_interval_ms, 100);
        assert_eq!(config.publisher.backend, "stdout");
        assert_eq!(config.publisher.topic, "gpu-trace-events");
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn default_config_passes_validation() {
        let config = TraceshipConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = TraceshipConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.source.file_prefix, "gpufl");
    }

    #[test]
    fn parse_partial_toml_merges_with_defaults() {
        let toml = r#"
[general]
log_level = "debug"

[source]
folder = "/var/log/gpufl"
"#;
        let config = TraceshipConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        // log_format은 기본값 유지
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.source.folder, "/var/log/gpufl");
        assert_eq!(config.source.file_prefix, "gpufl");
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[general]
log_level = "warn"
log_format = "pretty"

[source]
folder = "/data/gpu-logs"
file_prefix = "trace"
stream_types = ["kernel", "scope"]

[tailing]
cursor_path = "/var/lib/traceship/cursor.json"
file_poll_interval_ms = 5000
read_poll_interval_ms = 250

[publisher]
backend = "kafka"
topic = "trace-events"

[publisher.kafka]
bootstrap_servers = "broker-1:9092,broker-2:9092"
compression = "lz4"
linger_ms = 50

[publisher.http]
endpoint_url = "https://ingest.example.com/logs"
auth_token = "secret"
timeout_secs = 30

[metrics]
enabled = true
port = 9100
"#;
        let config = TraceshipConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.source.stream_types, vec!["kernel", "scope"]);
        assert_eq!(config.tailing.file_poll_interval_ms, 5000);
        assert_eq!(config.publisher.backend, "kafka");
        assert_eq!(
            config.publisher.kafka.bootstrap_servers,
            "broker-1:9092,broker-2:9092"
        );
        assert_eq!(config.publisher.http.auth_token.as_deref(), Some("secret"));
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.port, 9100);
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let result = TraceshipConfig::parse("invalid = [[[toml");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            TraceshipError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = TraceshipConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = TraceshipConfig::default();
        config.general.log_format = "xml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    fn validate_rejects_empty_file_prefix() {
        let mut config = TraceshipConfig::default();
        config.source.file_prefix = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("file_prefix"));
    }

    #[test]
    fn validate_rejects_empty_stream_types() {
        let mut config = TraceshipConfig::default();
        config.source.stream_types.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("stream_types"));
    }

    #[test]
    fn validate_rejects_zero_poll_interval() {
        let mut config = TraceshipConfig::default();
        config.tailing.read_poll_interval_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("read_poll_interval_ms"));
    }

    #[test]
    fn validate_rejects_unknown_backend() {
        let mut config = TraceshipConfig::default();
        config.publisher.backend = "carrier-pigeon".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("backend"));
    }

    #[test]
    fn validate_rejects_empty_bootstrap_servers_for_kafka() {
        let mut config = TraceshipConfig::default();
        config.publisher.backend = "kafka".to_owned();
        config.publisher.kafka.bootstrap_servers = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bootstrap_servers"));
    }

    #[test]
    fn validate_rejects_non_http_endpoint_for_http_backend() {
        let mut config = TraceshipConfig::default();
        config.publisher.backend = "http".to_owned();
        config.publisher.http.endpoint_url = "ftp://example.com".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("endpoint_url"));
    }

    #[test]
    fn validate_accepts_https_endpoint_for_http_backend() {
        let mut config = TraceshipConfig::default();
        config.publisher.backend = "http".to_owned();
        config.publisher.http.endpoint_url = "https://ingest.example.com".to_owned();
        config.validate().unwrap();
    }

    #[test]
    #[serial_test::serial]
    fn env_override_string() {
        let mut config = TraceshipConfig::default();
        // SAFETY: serial 테스트이므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TRACESHIP_SOURCE_FOLDER", "/env/folder") };
        config.apply_env_overrides();
        assert_eq!(config.source.folder, "/env/folder");
        unsafe { std::env::remove_var("TRACESHIP_SOURCE_FOLDER") };
    }

    #[test]
    #[serial_test::serial]
    fn env_override_csv_stream_types() {
        let mut config = TraceshipConfig::default();
        // SAFETY: serial 테스트이므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TRACESHIP_SOURCE_STREAM_TYPES", "kernel, scope") };
        config.apply_env_overrides();
        assert_eq!(config.source.stream_types, vec!["kernel", "scope"]);
        unsafe { std::env::remove_var("TRACESHIP_SOURCE_STREAM_TYPES") };
    }

    #[test]
    #[serial_test::serial]
    fn env_override_invalid_u64_keeps_original() {
        let mut config = TraceshipConfig::default();
        // SAFETY: serial 테스트이므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TRACESHIP_TAILING_FILE_POLL_INTERVAL_MS", "soon") };
        config.apply_env_overrides();
        assert_eq!(config.tailing.file_poll_interval_ms, 2000); // 원래 값 유지
        unsafe { std::env::remove_var("TRACESHIP_TAILING_FILE_POLL_INTERVAL_MS") };
    }

    #[test]
    #[serial_test::serial]
    fn env_override_missing_var_keeps_original() {
        let mut config = TraceshipConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.source.file_prefix, "gpufl");
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = TraceshipConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = TraceshipConfig::parse(&toml_str).unwrap();
        assert_eq!(config.general.log_level, parsed.general.log_level);
        assert_eq!(config.source.file_prefix, parsed.source.file_prefix);
        assert_eq!(config.publisher.topic, parsed.publisher.topic);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let result = TraceshipConfig::from_file("/nonexistent/path/traceship.toml").await;
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            TraceshipError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traceship.toml");
        std::fs::write(&path, "[general]\nlog_level = \"debug\"\n").unwrap();
        let config = TraceshipConfig::from_file(&path).await.unwrap();
        assert_eq!(config.general.log_level, "debug");
    }
}
