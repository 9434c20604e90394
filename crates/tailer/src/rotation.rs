//! 파일 시퀀스 해석 — (prefix, type, index)에서 경로로의 순수 매핑
//!
//! 외부 생산자는 `<prefix>.<type>.<index>.log` 형식으로 기록하며
//! (예: `gpufl.kernel.0.log`), 로테이션 시 다음 인덱스 파일을 새로
//! 만듭니다. 다음 인덱스 파일의 존재가 로테이션 감지 신호입니다.

use std::path::PathBuf;

/// 한 스트림의 로테이션 파일 시퀀스
#[derive(Debug, Clone)]
pub struct FileSequence {
    /// 로그 파일 디렉토리
    folder: PathBuf,
    /// 파일 접두어
    prefix: String,
    /// 스트림 타입
    stream_type: String,
}

impl FileSequence {
    /// 새 파일 시퀀스를 생성합니다.
    pub fn new(
        folder: impl Into<PathBuf>,
        prefix: impl Into<String>,
        stream_type: impl Into<String>,
    ) -> Self {
        Self {
            folder: folder.into(),
            prefix: prefix.into(),
            stream_type: stream_type.into(),
        }
    }

    /// 해당 인덱스의 파일 경로를 반환합니다 (상태 없음, 결정적).
    pub fn path_for(&self, index: u32) -> PathBuf {
        self.folder
            .join(format!("{}.{}.{}.log", self.prefix, self.stream_type, index))
    }

    /// 스트림 키 (`<prefix>.<type>`)를 반환합니다.
    pub fn stream_key(&self) -> String {
        format!("{}.{}", self.prefix, self.stream_type)
    }

    /// 스트림 타입을 반환합니다.
    pub fn stream_type(&self) -> &str {
        &self.stream_type
    }

    /// 해당 인덱스 파일의 존재 여부를 확인합니다.
    pub async fn exists(&self, index: u32) -> bool {
        tokio::fs::try_exists(self.path_for(index))
            .await
            .unwrap_or(false)
    }

    /// 다음 인덱스 파일이 생성되었는지 확인합니다 — 로테이션 신호.
    pub async fn has_next(&self, index: u32) -> bool {
        self.exists(index + 1).await
    }
}
