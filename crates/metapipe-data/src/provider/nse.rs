//! NSE 티커 유니버스.
//!
//! NSE가 공개하는 상장 종목 CSV를 받아 심볼 컬럼에 `.NS` 접미사를 붙여
//! 돌려줍니다. 원본의 브라우저 자동화 스크레이핑 대신 단순 HTTP 다운로드를
//! 사용합니다.

use crate::error::{DataError, Result};
use crate::provider::TickerUniverse;
use async_trait::async_trait;
use reqwest::header::USER_AGENT;

const EQUITY_LIST_URL: &str = "https://archives.nseindia.com/content/equities/EQUITY_L.csv";
const BROWSER_UA: &str = "Mozilla/5.0";

/// NSE 상장 종목 목록 제공자.
pub struct NseUniverse {
    client: reqwest::Client,
    url: String,
}

impl NseUniverse {
    /// 기본 NSE 엔드포인트로 생성.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            url: EQUITY_LIST_URL.to_string(),
        }
    }

    /// 엔드포인트 지정 생성 (테스트용).
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

impl Default for NseUniverse {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TickerUniverse for NseUniverse {
    async fn list_tickers(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(&self.url)
            .header(USER_AGENT, BROWSER_UA)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DataError::FetchError(format!(
                "NSE equity list: status {}",
                response.status()
            )));
        }

        let csv = response.text().await?;
        let tickers = parse_symbol_column(&csv)?;
        tracing::info!(count = tickers.len(), "NSE 티커 목록 수신");
        Ok(tickers)
    }
}

/// CSV 본문에서 SYMBOL 컬럼을 뽑아 `.NS` 심볼로 변환.
fn parse_symbol_column(csv: &str) -> Result<Vec<String>> {
    let mut lines = csv.lines();
    let header = lines
        .next()
        .ok_or_else(|| DataError::ParseError("empty equity list".into()))?;

    let symbol_idx = header
        .split(',')
        .position(|col| col.trim().eq_ignore_ascii_case("SYMBOL"))
        .ok_or_else(|| DataError::ParseError("SYMBOL column not found".into()))?;

    let mut tickers = Vec::new();
    for line in lines {
        let Some(symbol) = line.split(',').nth(symbol_idx) else {
            continue;
        };
        let symbol = symbol.trim();
        if !symbol.is_empty() {
            tickers.push(format!("{symbol}.NS"));
        }
    }
    Ok(tickers)
}
