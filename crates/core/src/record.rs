//! 정규화 레코드 — 파싱된 로그 라인 하나의 최종 형태
//!
//! [`NormalizedRecord`]는 테일러가 한 라인을 성공적으로 파싱했을 때 생성되고,
//! 퍼블리셔가 즉시 소비하며, 어디에도 보관되지 않습니다.
//!
//! # Wire 포맷
//! 다운스트림 소비자와의 호환을 위해 직렬화 필드명은 `src` / `timestamp` / `data`입니다.
//! `timestamp`는 레코드 생성(발행) 시점의 벽시계 시각이며, 로그 라인에 포함된
//! 타임스탬프는 사용하지 않습니다.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// 정규화된 로그 레코드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// 소유 스트림 식별자 (예: "kernel")
    #[serde(rename = "src")]
    pub source_stream: String,
    /// 발행 시점의 벽시계 시각 (epoch millis)
    #[serde(rename = "timestamp")]
    pub emitted_at_millis: i64,
    /// 파싱된 라인 본문
    #[serde(rename = "data")]
    pub payload: serde_json::Value,
}

impl NormalizedRecord {
    /// 현재 시각을 발행 시각으로 하는 새 레코드를 생성합니다.
    pub fn new(source_stream: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            source_stream: source_stream.into(),
            emitted_at_millis: now_millis(),
            payload,
        }
    }

    /// JSON 문자열로 직렬화합니다.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for NormalizedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NormalizedRecord[{}] emitted_at={}",
            self.source_stream, self.emitted_at_millis,
        )
    }
}

/// 현재 벽시계 시각을 epoch millis로 반환합니다.
fn now_millis() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => i64::try_from(duration.as_millis()).unwrap_or(i64::MAX),
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_stamps_emission_time() {
        let record = NormalizedRecord::new("kernel", serde_json::json!({"a": 1}));
        assert_eq!(record.source_stream, "kernel");
        assert!(record.emitted_at_millis > 0);
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let record = NormalizedRecord::new("scope", serde_json::json!({"x": true}));
        let json = record.to_json().unwrap();
        assert!(json.contains("\"src\":\"scope\""));
        assert!(json.contains("\"timestamp\":"));
        assert!(json.contains("\"data\":{\"x\":true}"));
        // 내부 필드명은 노출되지 않음
        assert!(!json.contains("source_stream"));
        assert!(!json.contains("emitted_at_millis"));
    }

    #[test]
    fn deserializes_from_wire_format() {
        let json = r#"{"src":"system","timestamp":1705320000000,"data":{"gpu":0}}"#;
        let record: NormalizedRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.source_stream, "system");
        assert_eq!(record.emitted_at_millis, 1_705_320_000_000);
        assert_eq!(record.payload, serde_json::json!({"gpu": 0}));
    }

    #[test]
    fn display_names_the_stream() {
        let record = NormalizedRecord::new("kernel", serde_json::Value::Null);
        assert!(record.to_string().contains("kernel"));
    }
}
