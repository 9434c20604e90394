//! HTTP 퍼블리셔 — 단일 엔드포인트로 레코드를 POST
//!
//! 레코드를 JSON 본문으로 전송하며, 백엔드 라우팅을 돕는 커스텀 헤더
//! `X-Topic` / `X-Key`를 붙입니다. 2xx 이외의 응답은 에러로 보고됩니다.

use std::time::Duration;

use traceship_core::config::HttpConfig;
use traceship_core::error::PublishError;
use traceship_core::publish::Publisher;
use traceship_core::record::NormalizedRecord;

/// 연결 수립 한도
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP 퍼블리셔
pub struct HttpPublisher {
    /// 재사용되는 HTTP 클라이언트 (커넥션 풀 내장)
    client: reqwest::Client,
    /// 수신 엔드포인트 URL
    endpoint_url: String,
    /// Bearer 인증 토큰 (선택)
    auth_token: Option<String>,
}

impl HttpPublisher {
    /// 새 HTTP 퍼블리셔를 생성합니다.
    pub fn new(config: &HttpConfig) -> Result<Self, PublishError> {
        tracing::debug!(endpoint = %config.endpoint_url, "creating http publisher");
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PublishError::Init {
                backend: "http".to_owned(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            endpoint_url: config.endpoint_url.clone(),
            auth_token: config.auth_token.clone(),
        })
    }
}

impl Publisher for HttpPublisher {
    fn name(&self) -> &str {
        "http"
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

        let mut request = self
            .client
            .post(&self.endpoint_url)
            .header("Content-Type", "application/json")
            .header("X-Topic", topic)
            .header("X-Key", key)
            .body(payload);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| PublishError::Send {
            topic: topic.to_owned(),
            reason: e.to_string(),
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Http { status, body });
        }

        Ok(())
    }

    async fn shutdown(&self) -> Result<(), PublishError> {
        // reqwest 클라이언트는 별도 정리가 필요 없다
        Ok(())
    }
}
