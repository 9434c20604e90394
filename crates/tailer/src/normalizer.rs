//! 레코드 정규화 — 원시 라인 하나를 구조화 레코드로 변환
//!
//! 라인은 JSON으로 엄격 파싱됩니다. 실패한 라인은 드롭되고 에러로
//! 보고될 뿐, 원문 그대로 전달되거나 재시도되지 않습니다. 성공한
//! 페이로드는 소유 스트림 식별자와 발행 시점의 벽시계 시각으로
//! 감싸집니다 — 라인에 포함된 타임스탬프는 사용하지 않습니다.

use traceship_core::record::NormalizedRecord;

use crate::error::TailerError;

/// 한 스트림의 레코드 정규화기
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    /// 소유 스트림 타입 (레코드의 `src` 태그)
    stream_type: String,
}

impl RecordNormalizer {
    /// 새 정규화기를 생성합니다.
    pub fn new(stream_type: impl Into<String>) -> Self {
        Self {
            stream_type: stream_type.into(),
        }
    }

    /// 원시 라인 하나를 파싱하여 정규화 레코드를 생성합니다.
    pub fn parse(&self, raw: &[u8]) -> Result<NormalizedRecord, TailerError> {
        let payload: serde_json::Value =
            serde_json::from_slice(raw).map_err(|e| TailerError::Parse {
                stream: self.stream_type.clone(),
                reason: e.to_string(),
            })?;
        Ok(NormalizedRecord::new(self.stream_type.clone(), payload))
    }
}
