//! 저장소 에러 타입.

use std::path::PathBuf;

use thiserror::Error;

/// 저장소 읽기/쓰기 에러.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 파일 입출력 실패
    #[error("파일 입출력 실패 ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 저장된 파일을 해석할 수 없음
    #[error("손상된 파일 ({path}): {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// 직렬화 실패
    #[error("직렬화 실패: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// 저장소 작업 Result 타입.
pub type StoreResult<T> = Result<T, StoreError>;
