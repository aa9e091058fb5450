//! 파이프라인 통합 테스트.
//!
//! 스텁 협력자와 인메모리 SQLite로 실행 루프의 실패 격리, 로드 전환,
//! 실패 로그 재실행, 뉴스 워터마크 확장을 검증합니다.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use metapipe_collector::modules::{MetadataJob, NewsJob};
use metapipe_collector::{run_job, CollectorError, LoadType};
use metapipe_core::Record;
use metapipe_data::storage::failure_log::{append_failure, replay_failures};
use metapipe_data::{
    memory_db, watermark, Article, ArticleFeed, DataError, FinancialStatements, MetadataSource,
    Result as DataResult, TickerUniverse,
};
use sqlx::Row;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

/// 고정 목록 또는 오류를 돌려주는 유니버스 스텁.
struct StubUniverse {
    tickers: Option<Vec<String>>,
}

#[async_trait]
impl TickerUniverse for StubUniverse {
    async fn list_tickers(&self) -> DataResult<Vec<String>> {
        match &self.tickers {
            Some(tickers) => Ok(tickers.clone()),
            None => Err(DataError::FetchError("universe unavailable".into())),
        }
    }
}

fn unreachable_universe() -> StubUniverse {
    StubUniverse { tickers: None }
}

/// 지정한 티커에서만 실패하는 메타데이터 소스 스텁.
struct StubSource {
    failing: HashSet<String>,
}

impl StubSource {
    fn new(failing: &[&str]) -> Self {
        Self {
            failing: failing.iter().map(|t| t.to_string()).collect(),
        }
    }
}

fn price_record(period: &str, close: f64) -> Record {
    let mut r = Record::new();
    r.set("period", period);
    r.set("close", close);
    r
}

#[async_trait]
impl MetadataSource for StubSource {
    async fn company_info(&self, ticker: &str) -> DataResult<Record> {
        if self.failing.contains(ticker) {
            return Err(DataError::FetchError(format!("no data for {ticker}")));
        }
        let mut r = Record::new();
        r.set("longName", format!("{ticker} Ltd"));
        r.set("sector", "IT");
        Ok(r)
    }

    async fn financial_statements(&self, _ticker: &str) -> DataResult<FinancialStatements> {
        let mut sheet = Record::new();
        sheet.set("period", "2023-12-31T00:00:00+00:00");
        sheet.set("totalAssets", 1_000i64);
        Ok(FinancialStatements {
            balance_sheet: vec![sheet],
            income_statement: Vec::new(),
            cash_flow: Vec::new(),
        })
    }

    async fn historical_prices(&self, _ticker: &str) -> DataResult<Vec<Record>> {
        Ok(vec![
            price_record("2021-01-04T00:00:00+00:00", 10.0),
            price_record("2021-01-05T00:00:00+00:00", 11.0),
        ])
    }

    async fn analyst_recommendations(&self, _ticker: &str) -> DataResult<Vec<Record>> {
        Ok(vec![{
            let mut r = Record::new();
            r.set("period", "0m");
            r.set("strongBuy", 3i64);
            r
        }])
    }
}

/// 준비된 페이지를 순서대로 내주는 기사 피드 스텁.
struct ScriptedFeed {
    pages: Mutex<Vec<Vec<Article>>>,
}

impl ScriptedFeed {
    fn new(pages: Vec<Vec<Article>>) -> Self {
        Self {
            pages: Mutex::new(pages),
        }
    }
}

#[async_trait]
impl ArticleFeed for ScriptedFeed {
    async fn search(
        &self,
        _subject: &str,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> DataResult<Vec<Article>> {
        let mut pages = self.pages.lock().unwrap();
        if pages.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(pages.remove(0))
        }
    }
}

fn article(title: &str, day: u32) -> Article {
    Article {
        title: title.into(),
        description: String::new(),
        content: String::new(),
        url: format!("https://example.com/{title}"),
        source: "stub".into(),
        published: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
    }
}

fn temp_failure_log(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "metapipe-pipeline-test-{}-{}.log",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);
    path
}

async fn count(pool: &sqlx::SqlitePool, table: &str) -> i64 {
    sqlx::query(&format!("SELECT COUNT(*) AS n FROM \"{table}\""))
        .fetch_one(pool)
        .await
        .unwrap()
        .try_get("n")
        .unwrap()
}

#[tokio::test]
async fn test_per_ticker_failure_isolation() {
    let pool = memory_db().await.unwrap();
    let failure_log = temp_failure_log("isolation");
    let job = MetadataJob::new(StubSource::new(&["TCS.NS"]));

    let summary = run_job(
        &pool,
        &job,
        LoadType::Init,
        Some(vec!["INFY.NS".into(), "TCS.NS".into(), "ZEEL.NS".into()]),
        false,
        &unreachable_universe(),
        &failure_log,
    )
    .await
    .unwrap();

    // 가운데 티커만 실패, 실행은 끝까지 진행
    assert_eq!(summary.total, 3);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 1);

    assert_eq!(count(&pool, "company_info").await, 2);
    assert_eq!(count(&pool, "historical_data").await, 4);

    // 실패 로그에는 해당 티커가 정확히 한 번
    assert_eq!(replay_failures(&failure_log).unwrap(), vec!["TCS.NS"]);
    assert!(watermark::load(&pool, "TCS.NS").await.unwrap().is_none());
    assert!(watermark::load(&pool, "INFY.NS").await.unwrap().is_some());

    let _ = std::fs::remove_file(&failure_log);
}

#[tokio::test]
async fn test_delta_without_watermark_runs_as_init() {
    let pool = memory_db().await.unwrap();
    let failure_log = temp_failure_log("fallback");
    let job = MetadataJob::new(StubSource::new(&[]));

    // 워터마크가 없는 티커의 delta 요청은 init으로 실행됨
    let summary = run_job(
        &pool,
        &job,
        LoadType::Delta,
        Some(vec!["INFY.NS".into()]),
        false,
        &unreachable_universe(),
        &failure_log,
    )
    .await
    .unwrap();

    assert_eq!(summary.processed, 1);
    // init으로 실행됐으므로 과거 시세가 전부 저장됨
    assert_eq!(count(&pool, "historical_data").await, 2);

    // 실행 후 워터마크 행이 생성됨
    let mark = watermark::load(&pool, "INFY.NS").await.unwrap().unwrap();
    assert!(mark.last_run <= Utc::now());

    // 같은 입력으로 다시 delta를 돌려도 중복 행이 생기지 않음
    run_job(
        &pool,
        &job,
        LoadType::Delta,
        Some(vec!["INFY.NS".into()]),
        false,
        &unreachable_universe(),
        &failure_log,
    )
    .await
    .unwrap();
    assert_eq!(count(&pool, "historical_data").await, 2);
    assert_eq!(count(&pool, "company_info").await, 1);

    let _ = std::fs::remove_file(&failure_log);
}

#[tokio::test]
async fn test_failure_log_replay_dedups() {
    let pool = memory_db().await.unwrap();
    let failure_log = temp_failure_log("replay");

    // 두 번의 실행에 걸쳐 같은 티커가 중복 기록된 상황
    append_failure(&failure_log, "INFY.NS", "timeout").unwrap();
    append_failure(&failure_log, "TCS.NS", "HTTP 500").unwrap();
    append_failure(&failure_log, "INFY.NS", "HTTP 502").unwrap();

    let job = MetadataJob::new(StubSource::new(&[]));
    let summary = run_job(
        &pool,
        &job,
        LoadType::Init,
        None,
        true,
        &unreachable_universe(),
        &failure_log,
    )
    .await
    .unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.processed, 2);

    let _ = std::fs::remove_file(&failure_log);
}

#[tokio::test]
async fn test_missing_failure_log_aborts_before_work() {
    let pool = memory_db().await.unwrap();
    let failure_log = temp_failure_log("missing");
    let job = MetadataJob::new(StubSource::new(&[]));

    let err = run_job(
        &pool,
        &job,
        LoadType::Init,
        None,
        true,
        &unreachable_universe(),
        &failure_log,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CollectorError::FailureLogMissing(_)));

    // 해석 단계에서 중단됐으므로 아무 테이블도 만들어지지 않음
    let tables: i64 = sqlx::query("SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table'")
        .fetch_one(&pool)
        .await
        .unwrap()
        .try_get("n")
        .unwrap();
    assert_eq!(tables, 0);
}

#[tokio::test]
async fn test_news_init_then_delta_widens_coverage() {
    let pool = memory_db().await.unwrap();
    let failure_log = temp_failure_log("news");
    let start_date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    // init: 두 페이지 수신 후 빈 페이지
    let feed = ScriptedFeed::new(vec![
        vec![article("b", 20), article("c", 25)],
        vec![article("a", 10)],
    ]);
    let job = NewsJob::new(feed, start_date, 10);

    run_job(
        &pool,
        &job,
        LoadType::Init,
        Some(vec!["INFY.NS".into()]),
        false,
        &unreachable_universe(),
        &failure_log,
    )
    .await
    .unwrap();

    assert_eq!(count(&pool, "news_articles").await, 3);
    let mark = watermark::load(&pool, "INFY.NS").await.unwrap().unwrap();
    assert_eq!(
        mark.oldest_published,
        Some(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap())
    );
    assert_eq!(
        mark.latest_published,
        Some(Utc.with_ymd_and_hms(2024, 3, 25, 12, 0, 0).unwrap())
    );

    // delta: 전방 단계에서 더 새로운 기사 하나
    let feed = ScriptedFeed::new(vec![vec![article("d", 28)]]);
    let job = NewsJob::new(feed, start_date, 10);

    run_job(
        &pool,
        &job,
        LoadType::Delta,
        Some(vec!["INFY.NS".into()]),
        false,
        &unreachable_universe(),
        &failure_log,
    )
    .await
    .unwrap();

    assert_eq!(count(&pool, "news_articles").await, 4);
    let mark = watermark::load(&pool, "INFY.NS").await.unwrap().unwrap();
    // 커버리지는 넓어지기만 함
    assert_eq!(
        mark.oldest_published,
        Some(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap())
    );
    assert_eq!(
        mark.latest_published,
        Some(Utc.with_ymd_and_hms(2024, 3, 28, 12, 0, 0).unwrap())
    );

    // 같은 기사를 다시 수집해도 article_id 충돌로 중복이 생기지 않음
    let feed = ScriptedFeed::new(vec![vec![article("d", 28)]]);
    let job = NewsJob::new(feed, start_date, 10);
    run_job(
        &pool,
        &job,
        LoadType::Delta,
        Some(vec!["INFY.NS".into()]),
        false,
        &unreachable_universe(),
        &failure_log,
    )
    .await
    .unwrap();
    assert_eq!(count(&pool, "news_articles").await, 4);

    let _ = std::fs::remove_file(&failure_log);
}

#[tokio::test]
async fn test_explicit_tickers_take_priority_over_universe() {
    let pool = memory_db().await.unwrap();
    let failure_log = temp_failure_log("priority");
    let job = MetadataJob::new(StubSource::new(&[]));

    // 유니버스가 죽어 있어도 명시 목록이 있으면 실행됨
    let summary = run_job(
        &pool,
        &job,
        LoadType::Init,
        Some(vec!["INFY.NS".into()]),
        false,
        &unreachable_universe(),
        &failure_log,
    )
    .await
    .unwrap();
    assert_eq!(summary.processed, 1);

    // 목록도 실패 로그도 없으면 유니버스 실패가 해석 단계 오류로 전파됨
    let err = run_job(
        &pool,
        &job,
        LoadType::Init,
        None,
        false,
        &unreachable_universe(),
        &failure_log,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CollectorError::Universe(_)));

    let _ = std::fs::remove_file(&failure_log);
}
