//! 표준출력 퍼블리셔 — 로컬 디버깅용 싱크
//!
//! 레코드를 한 줄의 JSON으로 표준출력에 기록합니다. 네트워크 백엔드
//! 없이 에이전트 전체 흐름을 확인할 때 사용합니다.

use tokio::io::AsyncWriteExt;

use traceship_core::error::PublishError;
use traceship_core::publish::Publisher;
use traceship_core::record::NormalizedRecord;

/// 표준출력 퍼블리셔
#[derive(Debug, Default)]
pub struct StdoutPublisher;

impl StdoutPublisher {
    /// 새 표준출력 퍼블리셔를 생성합니다.
    pub fn new() -> Self {
        Self
    }
}

impl Publisher for StdoutPublisher {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn publish(
        &self,
        topic: &str,
        _key: &str,
        record: &NormalizedRecord,
    ) -> Result<(), PublishError> {
        let mut line = record.to_json().map_err(|e| PublishError::Send {
            topic: topic.to_owned(),
            reason: e.to_string(),
        })?;
        line.push('\n');

        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(line.as_bytes())
            .await
            .map_err(|e| PublishError::Send {
                topic: topic.to_owned(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), PublishError> {
        let mut stdout = tokio::io::stdout();
        stdout.flush().await.map_err(|e| PublishError::Send {
            topic: String::new(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
