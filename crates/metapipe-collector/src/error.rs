//! 수집기 오류 타입.

use std::path::PathBuf;
use thiserror::Error;

/// 수집기 오류.
///
/// 티커별 실패는 여기로 올라오지 않고 실행 루프에서 격리됩니다. 이 타입은
/// 해석 단계(설정, 유니버스, 실패 로그) 조건만 표현합니다.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// 데이터 계층 오류
    #[error("Data error: {0}")]
    Data(#[from] metapipe_data::DataError),

    /// 설정 오류
    #[error("Configuration error: {0}")]
    Config(String),

    /// 실패 로그 재실행이 요청됐지만 로그 파일이 없음
    #[error("Failure log not found: {}", .0.display())]
    FailureLogMissing(PathBuf),

    /// 티커 유니버스 해석 실패
    #[error("Universe resolution failed: {0}")]
    Universe(String),
}

/// 수집기 Result 타입.
pub type Result<T> = std::result::Result<T, CollectorError>;
