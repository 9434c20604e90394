//! 메트릭 상수 — Prometheus 메트릭 이름의 중앙 정의
//!
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `traceship_`
//! - 모듈명: `tailer_`, `publisher_`, `agent_`
//! - 접미어: `_total` (counter), `_seconds` (gauge/duration), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 스트림 레이블 키 (예: "gpufl.kernel")
pub const LABEL_STREAM: &str = "stream";

/// 퍼블리셔 백엔드 레이블 키 (kafka, http, stdout)
pub const LABEL_BACKEND: &str = "backend";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Tailer 메트릭 ─────────────────────────────────────────────────

/// Tailer: 발행된 정규화 레코드 수 (counter, label: stream)
pub const TAILER_RECORDS_EMITTED_TOTAL: &str = "traceship_tailer_records_emitted_total";

/// Tailer: 파싱 실패로 드롭된 라인 수 (counter, label: stream)
pub const TAILER_LINES_DROPPED_TOTAL: &str = "traceship_tailer_lines_dropped_total";

/// Tailer: 소비한 바이트 수 (counter, label: stream)
pub const TAILER_BYTES_READ_TOTAL: &str = "traceship_tailer_bytes_read_total";

/// Tailer: 파일 로테이션 횟수 (counter, label: stream)
pub const TAILER_ROTATIONS_TOTAL: &str = "traceship_tailer_rotations_total";

/// Tailer: 커서 스냅샷 지속 실패 횟수 (counter)
pub const TAILER_CURSOR_PERSIST_FAILURES_TOTAL: &str =
    "traceship_tailer_cursor_persist_failures_total";

// ─── Publisher 메트릭 ──────────────────────────────────────────────

/// Publisher: 발행 시도 수 (counter, label: backend/result)
pub const PUBLISHER_RECORDS_TOTAL: &str = "traceship_publisher_records_total";

// ─── Agent 메트릭 ──────────────────────────────────────────────────

/// Agent: 빌드 정보 (gauge, label: version, 항상 1)
pub const AGENT_BUILD_INFO: &str = "traceship_agent_build_info";

/// Agent: 활성 스트림 수 (gauge)
pub const AGENT_STREAMS_ACTIVE: &str = "traceship_agent_streams_active";

/// Agent: 가동 시간 (gauge, 초)
pub const AGENT_UPTIME_SECONDS: &str = "traceship_agent_uptime_seconds";

/// 모든 메트릭의 설명을 전역 레코더에 등록합니다.
///
/// 레코더 설치 직후 프로세스당 한 번 호출합니다.
pub fn describe_metrics() {
    metrics::describe_counter!(
        TAILER_RECORDS_EMITTED_TOTAL,
        "Normalized records emitted per stream"
    );
    metrics::describe_counter!(
        TAILER_LINES_DROPPED_TOTAL,
        "Lines dropped due to parse failure per stream"
    );
    metrics::describe_counter!(TAILER_BYTES_READ_TOTAL, "Bytes consumed per stream");
    metrics::describe_counter!(TAILER_ROTATIONS_TOTAL, "File rotations per stream");
    metrics::describe_counter!(
        TAILER_CURSOR_PERSIST_FAILURES_TOTAL,
        "Cursor snapshot persist failures"
    );
    metrics::describe_counter!(
        PUBLISHER_RECORDS_TOTAL,
        "Publish attempts by backend and result"
    );
    metrics::describe_gauge!(AGENT_BUILD_INFO, "Build information (always 1)");
    metrics::describe_gauge!(AGENT_STREAMS_ACTIVE, "Tail readers currently running");
    metrics::describe_gauge!(AGENT_UPTIME_SECONDS, "Agent uptime in seconds");
}
