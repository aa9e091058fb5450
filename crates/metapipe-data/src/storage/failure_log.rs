//! 실패 티커 로그.
//!
//! 실행 중 실패한 티커를 `"<ticker> - <error>"` 한 줄씩 덧붙이는 텍스트
//! 파일입니다. 쓰기 시에는 중복을 제거하지 않고, 재실행용으로 읽을 때
//! 순서를 유지하며 중복을 제거합니다.

use crate::error::{DataError, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// 실패한 티커를 로그 파일에 덧붙입니다.
pub fn append_failure(path: &Path, ticker: &str, error: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    // 오류 메시지의 개행은 한 줄 형식을 깨므로 평탄화
    let flat = error.replace('\n', " ");
    writeln!(file, "{ticker} - {flat}")?;
    Ok(())
}

/// 실패 로그에서 티커 목록을 읽어 재실행 시드로 돌려줍니다.
///
/// 파일이 없으면 `NotFound`를 반환합니다 (부분 작업 없이 즉시 중단해야
/// 하는 조건). 같은 티커가 여러 실행에 걸쳐 여러 번 기록됐어도 한 번만
/// 반환합니다.
pub fn replay_failures(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(DataError::NotFound(format!(
            "failure log: {}",
            path.display()
        )));
    }

    let contents = std::fs::read_to_string(path)?;
    let mut tickers = Vec::new();
    for line in contents.lines() {
        let Some((ticker, _)) = line.split_once(" - ") else {
            continue;
        };
        let ticker = ticker.trim();
        if !ticker.is_empty() && !tickers.iter().any(|t| t == ticker) {
            tickers.push(ticker.to_string());
        }
    }
    Ok(tickers)
}
