//! Traceship 퍼블리셔 백엔드
//!
//! core의 [`Publisher`](traceship_core::publish::Publisher) 계약을
//! 구현하는 전송 백엔드와, 설정에서 백엔드를 선택하는 팩토리를
//! 제공합니다.
//!
//! # 백엔드
//!
//! - [`KafkaPublisher`]: rdkafka `FutureProducer` 기반 메시지 버스 싱크
//! - [`HttpPublisher`]: 단일 엔드포인트 POST 싱크
//! - [`StdoutPublisher`]: 로컬 디버깅용 표준출력 싱크

pub mod http;
pub mod kafka;
pub mod stdout;

pub use http::HttpPublisher;
pub use kafka::KafkaPublisher;
pub use stdout::StdoutPublisher;

use std::sync::Arc;

use traceship_core::config::PublisherConfig;
use traceship_core::error::PublishError;
use traceship_core::publish::DynPublisher;

/// 설정된 백엔드에 맞는 퍼블리셔를 생성합니다.
pub fn create_publisher(config: &PublisherConfig) -> Result<Arc<dyn DynPublisher>, PublishError> {
    match config.backend.as_str() {
        "kafka" => Ok(Arc::new(KafkaPublisher::new(&config.kafka)?)),
        "http" => Ok(Arc::new(HttpPublisher::new(&config.http)?)),
        "stdout" => Ok(Arc::new(StdoutPublisher::new())),
        other => Err(PublishError::UnsupportedBackend(other.to_owned())),
    }
}
