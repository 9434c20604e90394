//! Kafka 퍼블리셔 — rdkafka `FutureProducer` 기반
//!
//! 레코드를 JSON 문자열로 직렬화하여 (topic, key, payload)로 전송합니다.
//! acks=1 + linger 배칭이 기본이며, shutdown 시 전송 큐를 flush합니다.

use std::time::Duration;

use rdkafka::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;

use traceship_core::config::KafkaConfig;
use traceship_core::error::PublishError;
use traceship_core::publish::Publisher;
use traceship_core::record::NormalizedRecord;

/// 전송 큐 대기 한도
const SEND_QUEUE_TIMEOUT: Duration = Duration::from_secs(5);
/// shutdown flush 한도
const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Kafka 퍼블리셔
pub struct KafkaPublisher {
    /// rdkafka 비동기 프로듀서
    producer: FutureProducer,
}

impl KafkaPublisher {
    /// 새 Kafka 퍼블리셔를 생성합니다.
    ///
    /// 브로커 연결은 지연 수립되므로 생성 자체는 네트워크 없이 성공합니다.
    pub fn new(config: &KafkaConfig) -> Result<Self, PublishError> {
        tracing::debug!(
            bootstrap_servers = %config.bootstrap_servers,
            compression = %config.compression,
            "creating kafka producer"
        );
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("compression.type", &config.compression)
            .set("linger.ms", config.linger_ms.to_string())
            .set("acks", "1")
            .create()
            .map_err(|e| PublishError::Init {
                backend: "kafka".to_owned(),
                reason: e.to_string(),
            })?;
        Ok(Self { producer })
    }
}

impl Publisher for KafkaPublisher {
    fn name(&self) -> &str {
        "kafka"
    }

    async fn publish(
        &self,
        topic: &str,
        key: &str,
        record: &NormalizedRecord,
    ) -> Result<(), PublishError> {
        let payload = record.to_json().map_err(|e| PublishError::Send {
            topic: topic.to_owned(),
            reason: e.to_string(),
        })?;

        let kafka_record = FutureRecord::to(topic).key(key).payload(&payload);
        self.producer
            .send(kafka_record, Timeout::After(SEND_QUEUE_TIMEOUT))
            .await
            .map(|_delivery| ())
            .map_err(|(e, _message)| PublishError::Send {
                topic: topic.to_owned(),
                reason: e.to_string(),
            })
    }

    async fn shutdown(&self) -> Result<(), PublishError> {
        // 전송 중인 레코드를 비운다
        self.producer
            .flush(Timeout::After(FLUSH_TIMEOUT))
            .map_err(|e| PublishError::Send {
                topic: String::new(),
                reason: format!("flush failed: {e}"),
            })
    }
}
