//! 외부 협력자 인터페이스.
//!
//! 코어 파이프라인은 아래 trait만 의존합니다. 실제 구현(NSE 목록, Yahoo
//! Finance, GNews)은 얇은 글루 코드이고, 테스트에서는 스텁으로 대체합니다.

pub mod gnews;
pub mod nse;
pub mod yahoo;

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metapipe_core::{article_id, ticker_id, Record};

/// 티커 유니버스 제공자.
///
/// 실패는 유니버스 해석 단계 전체의 실패로 취급됩니다 (티커별 아님).
#[async_trait]
pub trait TickerUniverse: Send + Sync {
    /// 전체 티커 목록 조회.
    async fn list_tickers(&self) -> Result<Vec<String>>;
}

/// 재무제표 묶음 (티커당 기간별 레코드).
#[derive(Debug, Clone, Default)]
pub struct FinancialStatements {
    pub balance_sheet: Vec<Record>,
    pub income_statement: Vec<Record>,
    pub cash_flow: Vec<Record>,
}

/// 회사 메타데이터 소스.
///
/// 어떤 메서드든 일시적 오류나 데이터 없음으로 실패할 수 있고, 코어는
/// 티커 경계에서 실패를 격리합니다.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// 회사 기본 정보 (티커당 한 레코드).
    async fn company_info(&self, ticker: &str) -> Result<Record>;

    /// 재무제표 (대차대조표, 손익계산서, 현금흐름표).
    async fn financial_statements(&self, ticker: &str) -> Result<FinancialStatements>;

    /// 일별 시세 이력.
    async fn historical_prices(&self, ticker: &str) -> Result<Vec<Record>>;

    /// 애널리스트 추천 동향.
    async fn analyst_recommendations(&self, ticker: &str) -> Result<Vec<Record>>;
}

/// 뉴스 기사 하나.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    /// 제목
    pub title: String,
    /// 요약
    pub description: String,
    /// 본문 (피드가 주는 범위까지)
    pub content: String,
    /// 원문 URL
    pub url: String,
    /// 매체명
    pub source: String,
    /// 발행 시각 (UTC)
    pub published: DateTime<Utc>,
}

impl Article {
    /// 저장용 레코드로 변환.
    ///
    /// 기사 ID는 `소스+제목+발행시각`의 내용 해시라 같은 기사를 다시
    /// 수집해도 같은 키로 upsert됩니다.
    pub fn to_record(&self, ticker: &str) -> Record {
        let mut record = Record::new();
        record.set("article_id", article_id(&self.source, &self.title, &self.published));
        record.set("ticker", ticker);
        record.set("ticker_id", ticker_id(ticker));
        record.set("published_date", self.published.to_rfc3339());
        record.set("title", self.title.as_str());
        record.set("description", self.description.as_str());
        record.set("content", self.content.as_str());
        record.set("url", self.url.as_str());
        record.set("source_name", self.source.as_str());
        record
    }
}

/// 날짜 범위로 기사를 검색하는 피드.
///
/// 제공자 쪽 페이지 크기/요청 한도에 묶여 있으므로, 전체 범위 커버는
/// 호출자(윈도우 스티칭 루프)가 책임집니다.
#[async_trait]
pub trait ArticleFeed: Send + Sync {
    /// `from`부터 `to`까지의 기사 한 페이지 검색.
    async fn search(
        &self,
        subject: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Article>>;
}
