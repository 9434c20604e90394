//! 테일 리더 — 스트림 하나의 읽기 상태 머신
//!
//! 상태 전이:
//! ```text
//! WaitingForFile ──파일 생성──▶ Reading ──다음 인덱스 감지──▶ Rotating ─┐
//!       ▲  │ (더 새 파일이 먼저 생기면 인덱스 전진)            │        │
//!       │  └────────────────────────────────────────────────────│────────┘
//!       └──────────────── (Rotating 후 파일 미생성 시) ◀────────┘
//! 모든 상태 ──취소──▶ Stopped (터미널)
//! ```
//!
//! 서스펜션 포인트는 파일 생성 대기 폴과 새 바이트 대기 폴 두 곳뿐입니다.
//! 취소는 emit+commit 사이클이 끝난 지점에서만 관찰되므로 라인 중간에서
//! 멈추는 일은 없습니다.

use std::io::SeekFrom;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;

use traceship_core::metrics as m;
use traceship_core::publish::DynPublisher;

use crate::config::TailerConfig;
use crate::cursor::CursorStore;
use crate::error::TailerError;
use crate::normalizer::RecordNormalizer;
use crate::rotation::FileSequence;

/// 리더 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// 현재 인덱스 파일이 생길 때까지 대기
    WaitingForFile,
    /// 파일에서 완결 라인을 읽어 발행
    Reading,
    /// 다음 인덱스로 전환
    Rotating,
    /// 종료됨 (터미널)
    Stopped,
}

/// 스트림 하나를 담당하는 테일 리더
///
/// 커서 스토어에서 재개 위치를 읽어 시작하고, 완결 라인 배치를 발행할
/// 때마다 커서를 커밋합니다. 읽기 I/O 실패는 이 스트림의 태스크에만
/// 치명적이며 형제 스트림에 영향을 주지 않습니다.
pub struct TailReader {
    /// 파일 시퀀스 해석기
    sequence: FileSequence,
    /// 스트림 키 (커서 스토어의 키)
    stream_key: String,
    /// 발행 토픽
    topic: String,
    /// 레코드 정규화기
    normalizer: RecordNormalizer,
    /// 공유 커서 스토어
    cursor: Arc<CursorStore>,
    /// 발행 대상
    publisher: Arc<dyn DynPublisher>,
    /// 파일 생성 대기 폴링 주기
    file_poll_interval: Duration,
    /// 새 바이트 대기 폴링 주기
    read_poll_interval: Duration,
    /// 종료 신호
    cancel: CancellationToken,
}

impl TailReader {
    /// 새 테일 리더를 생성합니다.
    pub fn new(
        sequence: FileSequence,
        config: &TailerConfig,
        cursor: Arc<CursorStore>,
        publisher: Arc<dyn DynPublisher>,
        cancel: CancellationToken,
    ) -> Self {
        let stream_key = sequence.stream_key();
        let normalizer = RecordNormalizer::new(sequence.stream_type());
        Self {
            sequence,
            stream_key,
            topic: config.topic.clone(),
            normalizer,
            cursor,
            publisher,
            file_poll_interval: Duration::from_millis(config.file_poll_interval_ms),
            read_poll_interval: Duration::from_millis(config.read_poll_interval_ms),
            cancel,
        }
    }

    /// 리더를 실행합니다. `Stopped`에 도달할 때까지 반환하지 않습니다.
    pub async fn run(self) -> Result<(), TailerError> {
        let pos = self.cursor.get(&self.stream_key).await;
        let mut index = pos.file_index;
        let mut offset = pos.offset;
        let mut state = if self.sequence.exists(index).await {
            ReaderState::Reading
        } else {
            ReaderState::WaitingForFile
        };

        tracing::info!(
            stream = %self.stream_key,
            file_index = index,
            offset,
            "tail reader starting"
        );

        loop {
            if self.cancel.is_cancelled() {
                state = ReaderState::Stopped;
            }
            match state {
                ReaderState::WaitingForFile => {
                    if self.sequence.exists(index).await {
                        state = ReaderState::Reading;
                        continue;
                    }
                    tracing::debug!(
                        stream = %self.stream_key,
                        path = %self.sequence.path_for(index).display(),
                        "waiting for file"
                    );
                    if self.pause(self.file_poll_interval).await {
                        state = ReaderState::Stopped;
                        continue;
                    }
                    // 현재 인덱스를 건너뛰고 더 새 파일이 먼저 생긴 경우:
                    // 이 인덱스는 버려진 것으로 보고 전진한다
                    if self.sequence.has_next(index).await {
                        tracing::info!(
                            stream = %self.stream_key,
                            abandoned_index = index,
                            "newer file appeared first, advancing index"
                        );
                        index += 1;
                        offset = 0;
                    }
                }
                ReaderState::Reading => {
                    state = self.read_current(index, &mut offset).await?;
                }
                ReaderState::Rotating => {
                    metrics::counter!(
                        m::TAILER_ROTATIONS_TOTAL,
                        m::LABEL_STREAM => self.stream_key.clone()
                    )
                    .increment(1);
                    index += 1;
                    offset = 0;
                    tracing::info!(
                        stream = %self.stream_key,
                        file_index = index,
                        "rotating to next file"
                    );
                    state = ReaderState::Reading;
                }
                ReaderState::Stopped => {
                    tracing::info!(stream = %self.stream_key, "tail reader stopped");
                    return Ok(());
                }
            }
        }
    }

    /// 현재 인덱스 파일을 따라 읽습니다.
    ///
    /// 반환값은 다음 상태입니다: 파일이 소진되고 다음 인덱스가 생기면
    /// `Rotating`, 취소되면 `Stopped`. 파일이 아직 없으면
    /// `WaitingForFile`로 되돌립니다.
    async fn read_current(&self, index: u32, offset: &mut u64) -> Result<ReaderState, TailerError> {
        let path = self.sequence.path_for(index);
        let mut file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ReaderState::WaitingForFile);
            }
            Err(e) => return Err(e.into()),
        };

        // 절단 복구는 파일 오픈 시점에만 적용한다
        let len = file.metadata().await?.len();
        if *offset > len {
            tracing::warn!(
                stream = %self.stream_key,
                offset = *offset,
                file_len = len,
                "persisted offset beyond file length, resetting to 0"
            );
            *offset = 0;
        }
        file.seek(SeekFrom::Start(*offset)).await?;
        tracing::debug!(
            stream = %self.stream_key,
            path = %path.display(),
            offset = *offset,
            "reading file"
        );

        loop {
            if self.cancel.is_cancelled() {
                return Ok(ReaderState::Stopped);
            }
            let len = tokio::fs::metadata(&path).await?.len();
            if len > *offset {
                let consumed = self.drain_lines(&mut file, *offset, len).await?;
                *offset += consumed;
                // 종결자 없는 꼬리 바이트는 핸들에서 읽혔어도 소비하지 않는다
                file.seek(SeekFrom::Start(*offset)).await?;
                if consumed > 0 {
                    if let Err(e) = self.cursor.update(&self.stream_key, index, *offset).await {
                        metrics::counter!(m::TAILER_CURSOR_PERSIST_FAILURES_TOTAL).increment(1);
                        tracing::warn!(
                            stream = %self.stream_key,
                            error = %e,
                            "cursor persist failed, keeping in-memory position"
                        );
                    }
                } else if self.pause(self.read_poll_interval).await {
                    return Ok(ReaderState::Stopped);
                }
            } else if self.sequence.has_next(index).await {
                return Ok(ReaderState::Rotating);
            } else if self.pause(self.read_poll_interval).await {
                return Ok(ReaderState::Stopped);
            }
        }
    }

    /// `offset`부터 `len`까지의 바이트에서 완결 라인만 발행합니다.
    ///
    /// 마지막 `\n` 이후의 꼬리 라인은 소비하지 않으므로 오프셋은 완결
    /// 라인 뒤로만 전진하며, 라인이 읽기 경계에서 쪼개지는 일은 없습니다.
    /// 공백 라인은 발행 없이 오프셋만 전진시킵니다. 반환값은 소비한
    /// 바이트 수입니다.
    async fn drain_lines(
        &self,
        file: &mut File,
        offset: u64,
        len: u64,
    ) -> Result<u64, TailerError> {
        let available = usize::try_from(len - offset).unwrap_or(usize::MAX);
        let mut buf = BytesMut::with_capacity(available);
        while buf.len() < available {
            let n = file.read_buf(&mut buf).await?;
            if n == 0 {
                // 파일이 계약을 깨고 줄어든 경우: 있는 만큼만 처리한다
                break;
            }
        }
        if buf.len() > available {
            buf.truncate(available);
        }
        let chunk: Bytes = buf.freeze();

        let Some(last_newline) = chunk.iter().rposition(|&b| b == b'\n') else {
            return Ok(0);
        };
        let complete = &chunk[..=last_newline];

        let mut consumed = 0u64;
        for line in complete.split_inclusive(|&b| b == b'\n') {
            let mut content = &line[..line.len() - 1];
            if content.last() == Some(&b'\r') {
                content = &content[..content.len() - 1];
            }
            if !is_blank(content) {
                self.emit(content).await;
            }
            consumed += line.len() as u64;
        }

        metrics::counter!(
            m::TAILER_BYTES_READ_TOTAL,
            m::LABEL_STREAM => self.stream_key.clone()
        )
        .increment(consumed);
        Ok(consumed)
    }

    /// 라인 하나를 정규화하여 발행합니다.
    ///
    /// 파싱 실패는 라인 드롭 + 보고로 끝나고, 발행 실패는 보고만 하며
    /// 이미 커밋됐거나 곧 커밋될 커서를 되돌리지 않습니다 (at-least-once).
    async fn emit(&self, content: &[u8]) {
        match self.normalizer.parse(content) {
            Ok(record) => {
                metrics::counter!(
                    m::TAILER_RECORDS_EMITTED_TOTAL,
                    m::LABEL_STREAM => self.stream_key.clone()
                )
                .increment(1);
                let result = self
                    .publisher
                    .publish(&self.topic, self.sequence.stream_type(), &record)
                    .await;
                match result {
                    Ok(()) => {
                        metrics::counter!(
                            m::PUBLISHER_RECORDS_TOTAL,
                            m::LABEL_BACKEND => self.publisher.name().to_owned(),
                            m::LABEL_RESULT => "success"
                        )
                        .increment(1);
                    }
                    Err(e) => {
                        metrics::counter!(
                            m::PUBLISHER_RECORDS_TOTAL,
                            m::LABEL_BACKEND => self.publisher.name().to_owned(),
                            m::LABEL_RESULT => "failure"
                        )
                        .increment(1);
                        tracing::warn!(
                            stream = %self.stream_key,
                            topic = %self.topic,
                            error = %e,
                            "publish failed"
                        );
                    }
                }
            }
            Err(e) => {
                metrics::counter!(
                    m::TAILER_LINES_DROPPED_TOTAL,
                    m::LABEL_STREAM => self.stream_key.clone()
                )
                .increment(1);
                tracing::warn!(stream = %self.stream_key, error = %e, "dropping unparsable line");
            }
        }
    }

    /// 취소 가능한 슬립. 취소되었으면 `true`를 반환합니다.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => true,
            _ = sleep(duration) => false,
        }
    }
}

/// 공백 라인 판정 (빈 라인 포함)
fn is_blank(content: &[u8]) -> bool {
    content.iter().all(|b| b.is_ascii_whitespace())
}
