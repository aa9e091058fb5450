//! 티커별 워터마크 저장소 (`pipeline_log` 테이블).
//!
//! 티커마다 마지막 성공 실행 시각과, 뉴스 파이프라인의 경우 이미 수집한
//! 기사의 발행일 커버리지 구간(oldest/latest)을 기록합니다. 행은 첫 성공
//! 시 생성되고 이후 갱신만 되며, 코어는 절대 삭제하지 않습니다.

use crate::error::{DataError, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

/// 티커 하나의 진행 상태.
#[derive(Debug, Clone, PartialEq)]
pub struct Watermark {
    /// 티커 심볼
    pub ticker: String,
    /// 안정적 티커 ID
    pub ticker_id: i64,
    /// 마지막 성공 실행 시각
    pub last_run: DateTime<Utc>,
    /// 수집된 기사 중 가장 오래된 발행 시각
    pub oldest_published: Option<DateTime<Utc>>,
    /// 수집된 기사 중 가장 최신 발행 시각
    pub latest_published: Option<DateTime<Utc>>,
}

/// `pipeline_log` 테이블 생성 (멱등).
pub async fn ensure_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipeline_log (
            ticker TEXT NOT NULL PRIMARY KEY,
            ticker_id INTEGER NOT NULL,
            last_run TEXT NOT NULL,
            oldest_published_date TEXT,
            latest_published_date TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// 티커의 워터마크 조회.
pub async fn load(pool: &SqlitePool, ticker: &str) -> Result<Option<Watermark>> {
    let row = sqlx::query(
        r#"
        SELECT ticker, ticker_id, last_run, oldest_published_date, latest_published_date
        FROM pipeline_log
        WHERE ticker = ?
        "#,
    )
    .bind(ticker)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(Some(Watermark {
        ticker: row.try_get("ticker")?,
        ticker_id: row.try_get("ticker_id")?,
        last_run: parse_timestamp(&row.try_get::<String, _>("last_run")?)?,
        oldest_published: row
            .try_get::<Option<String>, _>("oldest_published_date")?
            .map(|s| parse_timestamp(&s))
            .transpose()?,
        latest_published: row
            .try_get::<Option<String>, _>("latest_published_date")?
            .map(|s| parse_timestamp(&s))
            .transpose()?,
    }))
}

/// 실행 시각 기록.
///
/// 행이 없으면 생성하고, 있으면 `last_run`만 갱신합니다. 기존 커버리지
/// 구간은 건드리지 않습니다.
pub async fn record_run(
    pool: &SqlitePool,
    ticker: &str,
    ticker_id: i64,
    at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO pipeline_log (ticker, ticker_id, last_run)
        VALUES (?, ?, ?)
        ON CONFLICT(ticker) DO UPDATE SET last_run = excluded.last_run
        "#,
    )
    .bind(ticker)
    .bind(ticker_id)
    .bind(at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

/// 커버리지 구간 확장.
///
/// 저장된 구간과 새 구간의 전체 min/max를 취해 구간이 넓어지기만 하도록
/// 보장합니다. `last_run`도 함께 갱신합니다.
pub async fn widen_coverage(
    pool: &SqlitePool,
    ticker: &str,
    ticker_id: i64,
    at: DateTime<Utc>,
    oldest: DateTime<Utc>,
    latest: DateTime<Utc>,
) -> Result<()> {
    let existing = load(pool, ticker).await?;

    let merged_oldest = match existing.as_ref().and_then(|w| w.oldest_published) {
        Some(prior) => prior.min(oldest),
        None => oldest,
    };
    let merged_latest = match existing.as_ref().and_then(|w| w.latest_published) {
        Some(prior) => prior.max(latest),
        None => latest,
    };

    sqlx::query(
        r#"
        INSERT INTO pipeline_log
            (ticker, ticker_id, last_run, oldest_published_date, latest_published_date)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(ticker) DO UPDATE SET
            last_run = excluded.last_run,
            oldest_published_date = excluded.oldest_published_date,
            latest_published_date = excluded.latest_published_date
        "#,
    )
    .bind(ticker)
    .bind(ticker_id)
    .bind(at.to_rfc3339())
    .bind(merged_oldest.to_rfc3339())
    .bind(merged_latest.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

/// RFC 3339 텍스트를 UTC 시각으로 파싱.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DataError::ParseError(format!("timestamp '{raw}': {e}")))
}
