//! 회사 메타데이터 수집 작업.
//!
//! 티커마다 기본 정보, 재무제표 3종, 시세 이력, 애널리스트 추천을 받아
//! 엔티티별 테이블에 upsert합니다. delta 로드에서는 시세 이력을 마지막
//! 실행 시각 이후 구간만 저장합니다.

use crate::modules::runner::{effective_load, LoadType, TickerJob};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metapipe_core::{ticker_id, FieldValue, Record};
use metapipe_data::{upsert, watermark, MetadataSource};
use sqlx::sqlite::SqlitePool;

/// 메타데이터 파이프라인 작업.
pub struct MetadataJob<S> {
    source: S,
}

impl<S: MetadataSource> MetadataJob<S> {
    /// 메타데이터 소스로 작업 생성.
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<S: MetadataSource> TickerJob for MetadataJob<S> {
    fn name(&self) -> &'static str {
        "company_metadata"
    }

    async fn process(
        &self,
        pool: &SqlitePool,
        ticker: &str,
        load: LoadType,
    ) -> anyhow::Result<usize> {
        let tid = ticker_id(ticker);
        let mark = watermark::load(pool, ticker).await?;
        let load = effective_load(load, mark.is_some(), ticker);

        let mut written = 0;

        let mut info = self.source.company_info(ticker).await?;
        tag(&mut info, ticker, tid);
        upsert(pool, "company_info", &[info], &["ticker_id"]).await?;
        written += 1;

        let statements = self.source.financial_statements(ticker).await?;
        for (table, mut records) in [
            ("balance_sheet", statements.balance_sheet),
            ("income_statement", statements.income_statement),
            ("cash_flow", statements.cash_flow),
        ] {
            tag_all(&mut records, ticker, tid);
            written += records.len();
            upsert(pool, table, &records, &["ticker_id", "period"]).await?;
        }

        let mut prices = self.source.historical_prices(ticker).await?;
        if load == LoadType::Delta {
            // delta 전환 조건상 워터마크는 반드시 존재
            if let Some(mark) = &mark {
                let before = prices.len();
                retain_after(&mut prices, mark.last_run);
                tracing::debug!(
                    ticker,
                    kept = prices.len(),
                    dropped = before - prices.len(),
                    "delta 시세 필터링"
                );
            }
        }
        tag_all(&mut prices, ticker, tid);
        written += prices.len();
        upsert(pool, "historical_data", &prices, &["ticker_id", "period"]).await?;

        let mut recommendations = self.source.analyst_recommendations(ticker).await?;
        tag_all(&mut recommendations, ticker, tid);
        written += recommendations.len();
        upsert(
            pool,
            "analyst_recommendations",
            &recommendations,
            &["ticker_id", "period"],
        )
        .await?;

        watermark::record_run(pool, ticker, tid, Utc::now()).await?;
        Ok(written)
    }
}

/// 레코드에 티커 식별자 부여.
fn tag(record: &mut Record, ticker: &str, tid: i64) {
    record.set("ticker", ticker);
    record.set("ticker_id", tid);
}

/// 배치 전체에 티커 식별자 부여.
fn tag_all(records: &mut [Record], ticker: &str, tid: i64) {
    for record in records {
        tag(record, ticker, tid);
    }
}

/// `period`가 기준 시각 이후인 레코드만 남깁니다.
///
/// 기준보다 새 것임을 증명할 수 없는 레코드(period 없음/파싱 불가)는
/// 버립니다.
fn retain_after(records: &mut Vec<Record>, cutoff: DateTime<Utc>) {
    records.retain(|record| {
        let Some(FieldValue::Text(period)) = record.get("period") else {
            return false;
        };
        match DateTime::parse_from_rfc3339(period) {
            Ok(period) => period.with_timezone(&Utc) > cutoff,
            Err(_) => false,
        }
    });
}
