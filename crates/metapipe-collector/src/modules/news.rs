//! 회사 뉴스 수집 작업.
//!
//! 윈도우 스티칭 루프를 로드 유형에 맞게 돌려 기사를 모으고, 한 티커당
//! 한 배치로 upsert한 뒤 발행일 커버리지 워터마크를 확장합니다.

use crate::modules::runner::{effective_load, LoadType, TickerJob};
use crate::modules::stitch::{stitch_range, Advance};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metapipe_core::Record;
use metapipe_data::{upsert, watermark, Article, ArticleFeed};
use sqlx::sqlite::SqlitePool;

/// 뉴스 파이프라인 작업.
pub struct NewsJob<F> {
    feed: F,
    /// 전역 수집 시작일 (init과 후방 단계의 하한)
    start_date: DateTime<Utc>,
    /// 윈도우 스티칭 한 번당 요청 한도
    max_requests: usize,
}

impl<F: ArticleFeed> NewsJob<F> {
    /// 기사 피드와 수집 범위 설정으로 작업 생성.
    pub fn new(feed: F, start_date: DateTime<Utc>, max_requests: usize) -> Self {
        Self {
            feed,
            start_date,
            max_requests,
        }
    }
}

#[async_trait]
impl<F: ArticleFeed> TickerJob for NewsJob<F> {
    fn name(&self) -> &'static str {
        "company_news"
    }

    async fn process(
        &self,
        pool: &SqlitePool,
        ticker: &str,
        load: LoadType,
    ) -> anyhow::Result<usize> {
        let tid = metapipe_core::ticker_id(ticker);
        let mark = watermark::load(pool, ticker).await?;
        let coverage = mark
            .as_ref()
            .and_then(|w| w.oldest_published.zip(w.latest_published));
        let load = effective_load(load, coverage.is_some(), ticker);

        let now = Utc::now();
        let mut articles = match (load, coverage) {
            (LoadType::Delta, Some((oldest, latest))) => {
                // 전방: 마지막 최신 이후 구간, 후방: 시작일과 가장 오래된 기사 사이 구간
                let mut pooled = stitch_range(
                    &self.feed,
                    ticker,
                    latest,
                    now,
                    Advance::Newest,
                    self.max_requests,
                )
                .await;
                pooled.extend(
                    stitch_range(
                        &self.feed,
                        ticker,
                        self.start_date,
                        oldest,
                        Advance::Newest,
                        self.max_requests,
                    )
                    .await,
                );
                pooled
            }
            _ => {
                stitch_range(
                    &self.feed,
                    ticker,
                    self.start_date,
                    now,
                    Advance::Oldest,
                    self.max_requests,
                )
                .await
            }
        };

        if articles.is_empty() {
            tracing::info!(ticker, "저장할 기사 없음");
            return Ok(0);
        }

        articles.sort_by_key(|a| a.published);
        let records: Vec<Record> = articles.iter().map(|a| a.to_record(ticker)).collect();
        upsert(pool, "news_articles", &records, &["article_id"]).await?;

        let oldest = pooled_bound(&articles, true);
        let latest = pooled_bound(&articles, false);
        watermark::widen_coverage(pool, ticker, tid, now, oldest, latest).await?;

        tracing::info!(
            ticker,
            articles = records.len(),
            oldest = %oldest,
            latest = %latest,
            "기사 저장 및 워터마크 갱신"
        );
        Ok(records.len())
    }
}

/// 정렬된 풀의 경계 시각.
fn pooled_bound(articles: &[Article], oldest: bool) -> DateTime<Utc> {
    // 호출 전에 비어 있지 않음을 확인하고 정렬함
    if oldest {
        articles[0].published
    } else {
        articles[articles.len() - 1].published
    }
}
