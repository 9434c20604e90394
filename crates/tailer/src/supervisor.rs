//! 테일러 슈퍼바이저 — 스트림별 리더 태스크의 소유와 수렴
//!
//! 설정된 스트림 타입마다 [`TailReader`] 태스크를 하나씩 스폰하고,
//! 전원이 `Stopped`에 도달할 때까지 블록합니다. 스트림 간 순서 보장은
//! 없으며, 한 스트림 안에서는 (파일 인덱스, 오프셋) 오름차순이
//! 엄격하게 유지됩니다.
//!
//! 리더 하나의 치명적 실패는 보고만 되고 격리됩니다 — 형제 리더는
//! 영향을 받지 않습니다. 프로세스를 재시작할지 종료할지는 둘러싼
//! 런타임의 정책입니다.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use traceship_core::metrics as m;
use traceship_core::publish::DynPublisher;

use crate::config::TailerConfig;
use crate::cursor::CursorStore;
use crate::error::TailerError;
use crate::reader::TailReader;
use crate::rotation::FileSequence;

/// 슈퍼바이저 실행 결과 요약
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorReport {
    /// 실행된 스트림 수
    pub streams: usize,
    /// 치명적으로 실패한 리더 수
    pub failed: usize,
}

/// 테일러 슈퍼바이저
///
/// 공유 [`CursorStore`]와 퍼블리셔에 대해 스트림별 리더를 동시에,
/// 서로 독립적으로 실행합니다.
pub struct TailerSupervisor {
    /// 테일러 설정
    config: TailerConfig,
    /// 공유 커서 스토어
    cursor: Arc<CursorStore>,
    /// 발행 대상
    publisher: Arc<dyn DynPublisher>,
    /// 종료 신호 (리더들은 child token을 받는다)
    cancel: CancellationToken,
}

impl TailerSupervisor {
    /// 종료 신호 토큰을 반환합니다.
    ///
    /// 이 토큰을 cancel하면 모든 리더가 다음 안전 지점(커밋 후,
    /// 라인 중간 아님)에서 멈춥니다.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 모든 리더를 스폰하고 전원이 `Stopped`에 도달할 때까지 블록합니다.
    pub async fn run(self) -> SupervisorReport {
        let mut handles = Vec::with_capacity(self.config.stream_types.len());
        for stream_type in &self.config.stream_types {
            let sequence =
                FileSequence::new(&self.config.folder, &self.config.file_prefix, stream_type);
            let stream_key = sequence.stream_key();
            let reader = TailReader::new(
                sequence,
                &self.config,
                Arc::clone(&self.cursor),
                Arc::clone(&self.publisher),
                self.cancel.child_token(),
            );
            handles.push((stream_key, tokio::spawn(reader.run())));
        }

        let streams = handles.len();
        #[allow(clippy::cast_precision_loss)]
        metrics::gauge!(m::AGENT_STREAMS_ACTIVE).set(streams as f64);
        tracing::info!(streams, "tailer supervisor running");

        let mut failed = 0;
        for (stream_key, handle) in handles {
            match handle.await {
                Ok(Ok(())) => {
                    tracing::debug!(stream = %stream_key, "reader stopped");
                }
                Ok(Err(e)) => {
                    failed += 1;
                    tracing::error!(
                        stream = %stream_key,
                        error = %e,
                        "reader failed, sibling streams unaffected"
                    );
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!(stream = %stream_key, error = %e, "reader task panicked");
                }
            }
        }

        metrics::gauge!(m::AGENT_STREAMS_ACTIVE).set(0.0);
        tracing::info!(streams, failed, "tailer supervisor converged");
        SupervisorReport { streams, failed }
    }
}

/// 테일러 슈퍼바이저 빌더
pub struct TailerSupervisorBuilder {
    config: TailerConfig,
    cursor: Option<Arc<CursorStore>>,
    publisher: Option<Arc<dyn DynPublisher>>,
    cancel: Option<CancellationToken>,
}

impl TailerSupervisorBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: TailerConfig::default(),
            cursor: None,
            publisher: None,
            cancel: None,
        }
    }

    /// 테일러 설정을 지정합니다.
    pub fn config(mut self, config: TailerConfig) -> Self {
        self.config = config;
        self
    }

    /// 공유 커서 스토어를 지정합니다.
    pub fn cursor_store(mut self, cursor: Arc<CursorStore>) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// 퍼블리셔를 지정합니다.
    pub fn publisher(mut self, publisher: Arc<dyn DynPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// 외부 종료 토큰을 지정합니다 (미지정 시 새 토큰 생성).
    pub fn cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// 슈퍼바이저를 빌드합니다.
    pub fn build(self) -> Result<TailerSupervisor, TailerError> {
        self.config.validate()?;

        let cursor = self.cursor.ok_or_else(|| TailerError::Config {
            field: "cursor_store".to_owned(),
            reason: "cursor store is required".to_owned(),
        })?;
        let publisher = self.publisher.ok_or_else(|| TailerError::Config {
            field: "publisher".to_owned(),
            reason: "publisher is required".to_owned(),
        })?;

        Ok(TailerSupervisor {
            config: self.config,
            cursor,
            publisher,
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

impl Default for TailerSupervisorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
