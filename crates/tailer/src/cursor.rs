//! 커서 스토어 — 스트림별 (fileIndex, offset) 체크포인트의 단일 진실 공급원
//!
//! 모든 스트림의 커서를 하나의 JSON 스냅샷으로 관리하며, 변경이 있을 때마다
//! temp 파일 기록 후 rename으로 원자 교체합니다. 하나의 크리티컬 섹션이
//! read-modify-persist 전체를 감싸므로 부분 지속은 발생하지 않습니다.
//! 오프셋 변경마다 전체 맵을 재직렬화하는 쓰기 증폭은 스냅샷 단위 내구성의
//! 대가로 수용합니다.
//!
//! # 재시작 계약
//! 마지막으로 성공한 스냅샷이 권위를 가집니다. 아직 지속되지 않은 갱신은
//! 재시작 시 사라지며, 그만큼의 라인이 재발행됩니다 (at-least-once).

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::TailerError;

/// 한 스트림의 커서 위치
///
/// 고정된 fileIndex 안에서 offset은 단조 증가하며, fileIndex 역시
/// 스트림별로 단조 증가합니다. 직렬화 필드명은 기존 커서 파일과의
/// 호환을 위해 `fileIndex` / `offset`입니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPosition {
    /// 로테이션 파일 인덱스
    #[serde(rename = "fileIndex", default)]
    pub file_index: u32,
    /// 파일 내 바이트 오프셋
    #[serde(default)]
    pub offset: u64,
}

/// 전체 스트림의 커서 스냅샷 (지속 형식)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CursorState {
    /// 스트림 키 → 커서 위치
    #[serde(default)]
    pub streams: HashMap<String, CursorPosition>,
}

/// 커서 스냅샷 로드 결과
///
/// 손상/부재는 치명 에러가 아니라 복구 가능한 결과로 보고되므로
/// 테스트에서 결정적으로 검증할 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorLoadReport {
    /// 스냅샷 파일 없음 — 빈 상태로 시작
    FreshStart,
    /// 스냅샷 정상 복원
    Restored {
        /// 복원된 스트림 수
        streams: usize,
    },
    /// 손상되었거나 읽을 수 없는 스냅샷 — 빈 상태로 재설정
    CorruptReset {
        /// 재설정 사유
        reason: String,
    },
}

/// 커서 스토어
///
/// 모든 테일 리더가 공유하는 재개 위치의 단일 진실 공급원입니다.
/// 외부에는 `get`/`update`만 노출하며, 내부 맵에 대한 직접 접근은
/// 제공하지 않습니다.
pub struct CursorStore {
    /// 스냅샷 파일 경로
    path: PathBuf,
    /// 커서 상태 — 크리티컬 섹션 전체를 이 뮤텍스가 보호합니다
    inner: Mutex<CursorState>,
}

impl CursorStore {
    /// 스냅샷 파일을 로드합니다.
    ///
    /// 파일이 없거나 역직렬화할 수 없으면 빈 상태로 시작하며, 절대
    /// 실패하지 않습니다. 어떤 경로로 시작했는지는 [`CursorLoadReport`]로
    /// 보고됩니다.
    pub async fn load(path: impl Into<PathBuf>) -> (Self, CursorLoadReport) {
        let path = path.into();
        let (state, report) = match tokio::fs::read(&path).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                (CursorState::default(), CursorLoadReport::FreshStart)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "cursor snapshot unreadable, starting fresh"
                );
                (
                    CursorState::default(),
                    CursorLoadReport::CorruptReset {
                        reason: e.to_string(),
                    },
                )
            }
            Ok(bytes) => match serde_json::from_slice::<CursorState>(&bytes) {
                Ok(state) => {
                    let streams = state.streams.len();
                    (state, CursorLoadReport::Restored { streams })
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "corrupt cursor snapshot, starting fresh"
                    );
                    (
                        CursorState::default(),
                        CursorLoadReport::CorruptReset {
                            reason: e.to_string(),
                        },
                    )
                }
            },
        };

        (
            Self {
                path,
                inner: Mutex::new(state),
            },
            report,
        )
    }

    /// 저장된 위치를 반환합니다. 미등록 스트림은 `{0, 0}`.
    pub async fn get(&self, stream_key: &str) -> CursorPosition {
        self.inner
            .lock()
            .await
            .streams
            .get(stream_key)
            .copied()
            .unwrap_or_default()
    }

    /// 위치가 마지막으로 알려진 값과 다를 때만 교체하고 전체 스냅샷을
    /// 지속합니다.
    ///
    /// 지속 실패는 비치명적입니다: 메모리 상태는 이미 갱신되어 권위를
    /// 유지하며, 다음 update에서 자연스럽게 재시도됩니다. 호출자는
    /// 반환된 에러를 보고만 하면 됩니다.
    pub async fn update(
        &self,
        stream_key: &str,
        file_index: u32,
        offset: u64,
    ) -> Result<(), TailerError> {
        let new_pos = CursorPosition { file_index, offset };
        let mut state = self.inner.lock().await;
        if state.streams.get(stream_key) == Some(&new_pos) {
            return Ok(());
        }
        state.streams.insert(stream_key.to_owned(), new_pos);
        self.persist(&state).await
    }

    /// 전체 스냅샷을 temp 파일에 기록한 뒤 rename으로 원자 교체합니다.
    ///
    /// rename이 대상 파일시스템에서 원자적이라는 가정에 의존합니다.
    async fn persist(&self, state: &CursorState) -> Result<(), TailerError> {
        let json = serde_json::to_vec_pretty(state).map_err(|e| TailerError::CursorPersist {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut tmp_os = self.path.clone().into_os_string();
        tmp_os.push(".tmp");
        let tmp_path = PathBuf::from(tmp_os);

        tokio::fs::write(&tmp_path, &json)
            .await
            .map_err(|e| TailerError::CursorPersist {
                path: tmp_path.display().to_string(),
                reason: e.to_string(),
            })?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| TailerError::CursorPersist {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;

        Ok(())
    }
}
