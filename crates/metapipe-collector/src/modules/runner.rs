//! 파이프라인 실행 루프 (오케스트레이터).
//!
//! 티커 집합을 해석하고, 티커마다 작업을 실행하며, 실패를 티커 경계에서
//! 격리합니다. 한 티커의 실패는 로그와 실패 로그 파일에 기록된 뒤 다음
//! 티커로 넘어갑니다. 이미 커밋된 부분 쓰기는 되돌리지 않습니다.

use crate::error::CollectorError;
use crate::stats::RunSummary;
use crate::Result;
use async_trait::async_trait;
use clap::ValueEnum;
use metapipe_data::storage::failure_log::{append_failure, replay_failures};
use metapipe_data::{watermark, DataError, TickerUniverse};
use sqlx::sqlite::SqlitePool;
use std::path::Path;
use std::time::Instant;

/// 로드 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LoadType {
    /// 전체 이력 수집 (시작일부터 현재까지)
    Init,
    /// 마지막 성공 실행 이후의 증분만 수집
    Delta,
}

impl LoadType {
    /// 문자열로 변환.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Delta => "delta",
        }
    }
}

/// 워터마크 유무에 따른 티커별 로드 유형 결정.
///
/// delta가 요청됐지만 이전 실행 기록이 없으면 해당 티커만 init으로
/// 내려갑니다. 전역 전환이 아닙니다.
pub fn effective_load(requested: LoadType, has_watermark: bool, ticker: &str) -> LoadType {
    if requested == LoadType::Delta && !has_watermark {
        tracing::info!(ticker, "이전 실행 기록 없음, 이 티커는 init으로 실행");
        LoadType::Init
    } else {
        requested
    }
}

/// 티커 하나를 처리하는 파이프라인 작업.
#[async_trait]
pub trait TickerJob: Send + Sync {
    /// 작업 이름 (로그용).
    fn name(&self) -> &'static str;

    /// 티커 하나 처리. 저장한 레코드 수를 반환합니다.
    async fn process(&self, pool: &SqlitePool, ticker: &str, load: LoadType)
        -> anyhow::Result<usize>;
}

/// 티커 집합을 해석해 작업을 실행합니다.
///
/// 티커 출처 우선순위: 명시 목록 > 실패 로그 재실행 > 유니버스 조회.
/// 실패 로그 재실행이 요청됐는데 파일이 없으면 아무 작업도 하지 않고
/// [`CollectorError::FailureLogMissing`]으로 중단합니다.
pub async fn run_job(
    pool: &SqlitePool,
    job: &dyn TickerJob,
    load: LoadType,
    tickers: Option<Vec<String>>,
    use_failure_log: bool,
    universe: &dyn TickerUniverse,
    failure_log: &Path,
) -> Result<RunSummary> {
    let start = Instant::now();

    let tickers = resolve_tickers(tickers, use_failure_log, universe, failure_log).await?;
    tracing::info!(
        job = job.name(),
        load = load.as_str(),
        tickers = tickers.len(),
        "파이프라인 시작"
    );

    watermark::ensure_table(pool).await?;

    let mut summary = RunSummary::new();
    for raw in &tickers {
        let ticker = raw.trim();
        if ticker.is_empty() {
            continue;
        }
        summary.total += 1;

        tracing::info!(
            ticker,
            progress = format!("{}/{}", summary.total, tickers.len()),
            "티커 처리 시작"
        );

        match job.process(pool, ticker, load).await {
            Ok(records) => {
                summary.processed += 1;
                summary.records += records;
                tracing::info!(ticker, records, "티커 처리 완료");
            }
            Err(e) => {
                summary.failed += 1;
                // 전체 원인 체인을 로그에 남기고 다음 티커로 진행
                tracing::error!(ticker, error = format!("{e:?}"), "티커 처리 실패");
                if let Err(log_err) = append_failure(failure_log, ticker, &format!("{e:#}")) {
                    tracing::error!(ticker, error = %log_err, "실패 로그 기록 실패");
                }
            }
        }
    }

    summary.elapsed = start.elapsed();
    Ok(summary)
}

/// 티커 출처 해석.
async fn resolve_tickers(
    tickers: Option<Vec<String>>,
    use_failure_log: bool,
    universe: &dyn TickerUniverse,
    failure_log: &Path,
) -> Result<Vec<String>> {
    if let Some(tickers) = tickers {
        tracing::info!(count = tickers.len(), "명시된 티커 목록 사용");
        return Ok(tickers);
    }

    if use_failure_log {
        return match replay_failures(failure_log) {
            Ok(tickers) => {
                tracing::info!(count = tickers.len(), "실패 로그에서 티커 재실행");
                Ok(tickers)
            }
            Err(DataError::NotFound(_)) => {
                Err(CollectorError::FailureLogMissing(failure_log.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        };
    }

    let tickers = universe
        .list_tickers()
        .await
        .map_err(|e| CollectorError::Universe(e.to_string()))?;
    tracing::info!(count = tickers.len(), "유니버스에서 티커 조회");
    Ok(tickers)
}
