//! Yahoo Finance 메타데이터 소스.
//!
//! `quoteSummary`/`chart` JSON 응답을 고정 구조체로 받지 않고 스칼라
//! 필드만 평탄화해 [`Record`]로 바꿉니다. 어떤 필드가 오는지는 종목마다
//! 다르므로 스키마는 upsert 엔진이 배치에서 추론/확장합니다.

use crate::error::{DataError, Result};
use crate::provider::{FinancialStatements, MetadataSource};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metapipe_core::{FieldValue, Record};
use reqwest::header::USER_AGENT;
use serde_json::Value;

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
const BROWSER_UA: &str = "Mozilla/5.0";

/// Yahoo Finance 기반 [`MetadataSource`] 구현.
pub struct YahooMetadataSource {
    client: reqwest::Client,
    base_url: String,
}

impl YahooMetadataSource {
    /// 기본 엔드포인트로 생성.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// 엔드포인트 지정 생성 (테스트용).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// quoteSummary 모듈 조회. `result[0]`을 반환합니다.
    async fn quote_summary(&self, ticker: &str, modules: &str) -> Result<Value> {
        let url = format!("{}/v10/finance/quoteSummary/{ticker}", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, BROWSER_UA)
            .query(&[("modules", modules)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DataError::FetchError(format!(
                "quoteSummary {ticker}: status {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        body.pointer("/quoteSummary/result/0")
            .cloned()
            .ok_or_else(|| DataError::FetchError(format!("quoteSummary {ticker}: empty result")))
    }
}

impl Default for YahooMetadataSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataSource for YahooMetadataSource {
    async fn company_info(&self, ticker: &str) -> Result<Record> {
        let summary = self
            .quote_summary(ticker, "assetProfile,summaryDetail,price")
            .await?;

        let mut record = Record::new();
        for module in ["assetProfile", "summaryDetail", "price"] {
            if let Some(Value::Object(map)) = summary.get(module) {
                flatten_into(&mut record, map);
            }
        }
        // 중첩 배열 필드는 스칼라 스키마에 들어갈 수 없음
        record.remove("companyOfficers");

        if record.is_empty() {
            return Err(DataError::FetchError(format!(
                "company info {ticker}: no scalar fields"
            )));
        }
        Ok(record)
    }

    async fn financial_statements(&self, ticker: &str) -> Result<FinancialStatements> {
        let summary = self
            .quote_summary(
                ticker,
                "balanceSheetHistory,incomeStatementHistory,cashflowStatementHistory",
            )
            .await?;

        Ok(FinancialStatements {
            balance_sheet: statement_records(
                &summary,
                "/balanceSheetHistory/balanceSheetStatements",
            ),
            income_statement: statement_records(
                &summary,
                "/incomeStatementHistory/incomeStatementHistory",
            ),
            cash_flow: statement_records(&summary, "/cashflowStatementHistory/cashflowStatements"),
        })
    }

    async fn historical_prices(&self, ticker: &str) -> Result<Vec<Record>> {
        let url = format!("{}/v8/finance/chart/{ticker}", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, BROWSER_UA)
            .query(&[("range", "max"), ("interval", "1d")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DataError::FetchError(format!(
                "chart {ticker}: status {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        let result = body
            .pointer("/chart/result/0")
            .ok_or_else(|| DataError::FetchError(format!("chart {ticker}: empty result")))?;

        Ok(chart_records(result))
    }

    async fn analyst_recommendations(&self, ticker: &str) -> Result<Vec<Record>> {
        let summary = self.quote_summary(ticker, "recommendationTrend").await?;
        Ok(statement_records(&summary, "/recommendationTrend/trend"))
    }
}

/// JSON 객체의 스칼라 필드를 레코드에 평탄화.
///
/// Yahoo의 `{raw, fmt}` 래퍼는 `raw` 값을 취하고, 배열/중첩 객체는
/// 건너뜁니다.
fn flatten_into(record: &mut Record, map: &serde_json::Map<String, Value>) {
    for (name, value) in map {
        if let Some(scalar) = scalar_value(value) {
            record.set(name.as_str(), scalar);
        }
    }
}

/// JSON 값을 스칼라 [`FieldValue`]로 변환 (불가능하면 None).
fn scalar_value(value: &Value) -> Option<FieldValue> {
    match value {
        Value::Null => Some(FieldValue::Null),
        Value::Bool(b) => Some(FieldValue::Integer(*b as i64)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(FieldValue::Integer(i))
            } else {
                n.as_f64().map(FieldValue::Real)
            }
        }
        Value::String(s) => Some(FieldValue::Text(s.clone())),
        Value::Object(map) => map.get("raw").and_then(scalar_value),
        Value::Array(_) => None,
    }
}

/// 기간별 재무 항목 배열을 레코드 목록으로 변환.
///
/// `endDate.raw` epoch를 RFC 3339 `period` 필드로 승격합니다.
fn statement_records(summary: &Value, pointer: &str) -> Vec<Record> {
    let Some(Value::Array(items)) = summary.pointer(pointer) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let Value::Object(map) = item else {
                return None;
            };
            let mut record = Record::new();
            flatten_into(&mut record, map);

            if let Some(epoch) = item.pointer("/endDate/raw").and_then(Value::as_i64) {
                if let Some(period) = DateTime::<Utc>::from_timestamp(epoch, 0) {
                    record.set("period", period.to_rfc3339());
                    record.remove("endDate");
                }
            }

            (!record.is_empty()).then_some(record)
        })
        .collect()
}

/// chart 응답의 평행 배열을 일별 레코드로 변환.
fn chart_records(result: &Value) -> Vec<Record> {
    let timestamps: Vec<i64> = result
        .pointer("/timestamp")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default();

    let series = |name: &str| -> Vec<Option<f64>> {
        result
            .pointer(&format!("/indicators/quote/0/{name}"))
            .and_then(Value::as_array)
            .map(|a| a.iter().map(Value::as_f64).collect())
            .unwrap_or_default()
    };

    let open = series("open");
    let high = series("high");
    let low = series("low");
    let close = series("close");
    let volume = series("volume");

    timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, epoch)| {
            let period = DateTime::<Utc>::from_timestamp(*epoch, 0)?;
            let mut record = Record::new();
            record.set("period", period.to_rfc3339());
            record.set("open", FieldValue::from(open.get(i).copied().flatten()));
            record.set("high", FieldValue::from(high.get(i).copied().flatten()));
            record.set("low", FieldValue::from(low.get(i).copied().flatten()));
            record.set("close", FieldValue::from(close.get(i).copied().flatten()));
            record.set("volume", FieldValue::from(volume.get(i).copied().flatten()));
            Some(record)
        })
        .collect()
}
