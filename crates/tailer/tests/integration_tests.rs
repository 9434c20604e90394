//! 통합 테스트 -- 테일링/커서 서브시스템의 전체 흐름 검증
//!
//! tempdir 위에 실제 로그 파일을 만들어 읽기, 로테이션, 재시작 재개,
//! 손상 복구 시나리오를 종단 간으로 검증합니다.

use std::io::Write;
use std::sync::{Arc, Mutex};

use tokio::time::{Duration, sleep, timeout};
use tokio_util::sync::CancellationToken;

use traceship_core::error::PublishError;
use traceship_core::publish::{DynPublisher, Publisher};
use traceship_core::record::NormalizedRecord;
use traceship_tailer::{
    CursorLoadReport, CursorPosition, CursorStore, FileSequence, TailReader, TailerConfig,
    TailerConfigBuilder, TailerSupervisorBuilder,
};

/// 발행된 레코드를 기록하는 테스트 퍼블리셔
struct CapturePublisher {
    published: Mutex<Vec<(String, String, NormalizedRecord)>>,
}

impl CapturePublisher {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            published: Mutex::new(Vec::new()),
        })
    }

    fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    fn payloads(&self) -> Vec<serde_json::Value> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, r)| r.payload.clone())
            .collect()
    }
}

impl Publisher for CapturePublisher {
    fn name(&self) -> &str {
        "capture"
    }

    async fn publish(
        &self,
        topic: &str,
        key: &str,
        record: &NormalizedRecord,
    ) -> Result<(), PublishError> {
        self.published
            .lock()
            .unwrap()
            .push((topic.to_owned(), key.to_owned(), record.clone()));
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), PublishError> {
        Ok(())
    }
}

fn fast_config(folder: &std::path::Path, types: &[&str]) -> TailerConfig {
    TailerConfigBuilder::new()
        .folder(folder.to_str().unwrap())
        .stream_types(types.iter().map(|t| (*t).to_owned()).collect())
        .file_poll_interval_ms(5)
        .read_poll_interval_ms(5)
        .build()
        .unwrap()
}

fn spawn_kernel_reader(
    dir: &std::path::Path,
    cursor: &Arc<CursorStore>,
    publisher: &Arc<CapturePublisher>,
    cancel: &CancellationToken,
) -> tokio::task::JoinHandle<Result<(), traceship_tailer::TailerError>> {
    let config = fast_config(dir, &["kernel"]);
    let reader = TailReader::new(
        FileSequence::new(dir, "gpufl", "kernel"),
        &config,
        Arc::clone(cursor),
        Arc::clone(publisher) as Arc<dyn DynPublisher>,
        cancel.clone(),
    );
    tokio::spawn(reader.run())
}

async fn wait_for_count(publisher: &Arc<CapturePublisher>, want: usize) {
    timeout(Duration::from_secs(5), async {
        while publisher.count() < want {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("records not emitted in time");
}

async fn wait_for_position(cursor: &CursorStore, stream_key: &str, want: CursorPosition) {
    timeout(Duration::from_secs(5), async {
        while cursor.get(stream_key).await != want {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("cursor position not committed in time");
}

/// 스펙 시나리오: 라인 / 공백 라인 / 라인 → 레코드 2건, 오프셋은
/// 마지막 라인 종결자 바로 뒤
#[tokio::test]
async fn tail_from_origin_skips_blank_line_and_commits_final_offset() {
    let dir = tempfile::tempdir().unwrap();
    let data = "{\"a\":1}\n\n{\"a\":2}\n";
    std::fs::write(dir.path().join("gpufl.kernel.0.log"), data).unwrap();

    let (cursor, report) = CursorStore::load(dir.path().join("cursor.json")).await;
    assert_eq!(report, CursorLoadReport::FreshStart);
    let cursor = Arc::new(cursor);
    let publisher = CapturePublisher::new();
    let cancel = CancellationToken::new();

    let handle = spawn_kernel_reader(dir.path(), &cursor, &publisher, &cancel);
    wait_for_count(&publisher, 2).await;
    wait_for_position(&cursor, "gpufl.kernel", CursorPosition {
        file_index: 0,
        offset: data.len() as u64,
    })
    .await;

    cancel.cancel();
    handle.await.unwrap().unwrap();

    assert_eq!(publisher.payloads(), vec![
        serde_json::json!({"a": 1}),
        serde_json::json!({"a": 2})
    ]);
}

/// 스펙 시나리오: 라인 중간에 떨어지는 오프셋 14에서 재개하면 그대로
/// seek하여 물리 라인의 나머지를 하나의 라인으로 읽는다 (경계 보정 없음)
#[tokio::test]
async fn resume_mid_line_reads_remainder_as_its_own_line() {
    let dir = tempfile::tempdir().unwrap();
    let data = "{\"a\":1}\n{\"b\":2}\n"; // 바이트 14는 두 번째 라인 중간
    std::fs::write(dir.path().join("gpufl.kernel.0.log"), data).unwrap();

    let (seed, _) = CursorStore::load(dir.path().join("cursor.json")).await;
    seed.update("gpufl.kernel", 0, 14).await.unwrap();
    drop(seed);

    let (cursor, report) = CursorStore::load(dir.path().join("cursor.json")).await;
    assert_eq!(report, CursorLoadReport::Restored { streams: 1 });
    let cursor = Arc::new(cursor);
    let publisher = CapturePublisher::new();
    let cancel = CancellationToken::new();

    let handle = spawn_kernel_reader(dir.path(), &cursor, &publisher, &cancel);
    // 나머지 "}\n"은 파싱 불가한 라인으로 드롭되지만 오프셋은 전진한다
    wait_for_position(&cursor, "gpufl.kernel", CursorPosition {
        file_index: 0,
        offset: 16,
    })
    .await;

    cancel.cancel();
    handle.await.unwrap().unwrap();
    assert_eq!(publisher.count(), 0);
}

/// 재시작 재개: 지속된 커서 이전의 라인은 재발행하지 않고, 이후에
/// 추가된 라인은 건너뛰지 않는다
#[tokio::test]
async fn crash_resume_emits_only_lines_after_persisted_cursor() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("gpufl.kernel.0.log");
    std::fs::write(&log_path, "{\"seq\":1}\n{\"seq\":2}\n").unwrap();

    // 1차 실행: 2건 발행 후 커밋 지점에서 중단 (시뮬레이션된 크래시)
    {
        let (cursor, _) = CursorStore::load(dir.path().join("cursor.json")).await;
        let cursor = Arc::new(cursor);
        let publisher = CapturePublisher::new();
        let cancel = CancellationToken::new();
        let handle = spawn_kernel_reader(dir.path(), &cursor, &publisher, &cancel);
        wait_for_count(&publisher, 2).await;
        wait_for_position(&cursor, "gpufl.kernel", CursorPosition {
            file_index: 0,
            offset: 20,
        })
        .await;
        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    // 크래시 이후 새 라인이 추가된다
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(&log_path)
        .unwrap();
    file.write_all(b"{\"seq\":3}\n").unwrap();
    drop(file);

    // 2차 실행: 지속된 스냅샷에서 재개 — seq 3만 발행된다
    let (cursor, report) = CursorStore::load(dir.path().join("cursor.json")).await;
    assert_eq!(report, CursorLoadReport::Restored { streams: 1 });
    let cursor = Arc::new(cursor);
    let publisher = CapturePublisher::new();
    let cancel = CancellationToken::new();
    let handle = spawn_kernel_reader(dir.path(), &cursor, &publisher, &cancel);
    wait_for_count(&publisher, 1).await;

    cancel.cancel();
    handle.await.unwrap().unwrap();
    assert_eq!(publisher.payloads(), vec![serde_json::json!({"seq": 3})]);
}

/// 인덱스 i가 소진되고 i+1이 존재하면 i+1의 오프셋 0으로 전진하며,
/// 이후 i에 대한 (계약 위반) 쓰기와는 무관하다
#[tokio::test]
async fn drained_file_rotates_to_next_index_ignoring_late_writes() {
    let dir = tempfile::tempdir().unwrap();
    let file0 = dir.path().join("gpufl.kernel.0.log");
    std::fs::write(&file0, "{\"gen\":0}\n").unwrap();

    let (cursor, _) = CursorStore::load(dir.path().join("cursor.json")).await;
    let cursor = Arc::new(cursor);
    let publisher = CapturePublisher::new();
    let cancel = CancellationToken::new();
    let handle = spawn_kernel_reader(dir.path(), &cursor, &publisher, &cancel);

    wait_for_count(&publisher, 1).await;

    // 로테이션: 다음 인덱스 파일이 생긴다
    std::fs::write(dir.path().join("gpufl.kernel.1.log"), "{\"gen\":1}\n").unwrap();
    wait_for_count(&publisher, 2).await;
    wait_for_position(&cursor, "gpufl.kernel", CursorPosition {
        file_index: 1,
        offset: 10,
    })
    .await;

    // 계약을 위반한 늦은 쓰기 — 리더는 이미 인덱스 1로 전진했으므로 무시된다
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(&file0)
        .unwrap();
    file.write_all(b"{\"gen\":\"late\"}\n").unwrap();
    drop(file);

    sleep(Duration::from_millis(50)).await;
    assert_eq!(publisher.count(), 2);
    assert_eq!(cursor.get("gpufl.kernel").await.file_index, 1);

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

/// 손상된 커서 파일은 빈 상태로 복구되고 프로세스는 계속된다
#[tokio::test]
async fn corrupt_cursor_snapshot_restarts_from_origin() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("cursor.json"), "%%% not json %%%").unwrap();
    std::fs::write(dir.path().join("gpufl.kernel.0.log"), "{\"a\":1}\n").unwrap();

    let (cursor, report) = CursorStore::load(dir.path().join("cursor.json")).await;
    assert!(matches!(report, CursorLoadReport::CorruptReset { .. }));

    let cursor = Arc::new(cursor);
    let publisher = CapturePublisher::new();
    let cancel = CancellationToken::new();
    let handle = spawn_kernel_reader(dir.path(), &cursor, &publisher, &cancel);

    // 빈 상태에서 처음부터 다시 읽는다
    wait_for_count(&publisher, 1).await;

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

/// 슈퍼바이저: 여러 스트림이 하나의 커서 스토어를 공유하며 독립적으로
/// 진행하고, 종료 시 전원이 수렴한다
#[tokio::test]
async fn supervisor_runs_streams_concurrently_over_shared_store() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("gpufl.kernel.0.log"), "{\"k\":1}\n{\"k\":2}\n").unwrap();
    std::fs::write(dir.path().join("gpufl.scope.0.log"), "{\"s\":1}\n").unwrap();
    // system 스트림 파일은 아직 없다 — WaitingForFile에서 대기

    let (cursor, _) = CursorStore::load(dir.path().join("cursor.json")).await;
    let cursor = Arc::new(cursor);
    let publisher = CapturePublisher::new();

    let supervisor = TailerSupervisorBuilder::new()
        .config(fast_config(dir.path(), &["kernel", "scope", "system"]))
        .cursor_store(Arc::clone(&cursor))
        .publisher(Arc::clone(&publisher) as Arc<dyn DynPublisher>)
        .build()
        .unwrap();
    let cancel = supervisor.cancellation_token();
    let handle = tokio::spawn(supervisor.run());

    wait_for_count(&publisher, 3).await;
    wait_for_position(&cursor, "gpufl.kernel", CursorPosition {
        file_index: 0,
        offset: 16,
    })
    .await;
    wait_for_position(&cursor, "gpufl.scope", CursorPosition {
        file_index: 0,
        offset: 8,
    })
    .await;
    // 대기 중인 스트림은 커서를 만들지 않는다
    assert_eq!(
        cursor.get("gpufl.system").await,
        CursorPosition::default()
    );

    cancel.cancel();
    let report = timeout(Duration::from_secs(5), handle)
        .await
        .expect("supervisor should converge")
        .unwrap();
    assert_eq!(report.streams, 3);
    assert_eq!(report.failed, 0);

    // 지속된 스냅샷에는 진행한 두 스트림만 들어 있다
    let (reloaded, report) = CursorStore::load(dir.path().join("cursor.json")).await;
    assert_eq!(report, CursorLoadReport::Restored { streams: 2 });
    assert_eq!(reloaded.get("gpufl.kernel").await.offset, 16);
}
