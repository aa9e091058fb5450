//! 환경변수 기반 설정 모듈.

use crate::error::CollectorError;
use crate::Result;
use chrono::{DateTime, NaiveDate, Utc};
use std::path::PathBuf;

/// 파이프라인 전체 설정.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 원시 데이터 폴더 (DB 파일 위치)
    pub data_dir: PathBuf,
    /// 로그 폴더 (실패 로그 위치)
    pub logs_dir: PathBuf,
    /// 회사 메타데이터 DB 파일명
    pub metadata_db: String,
    /// 뉴스 기사 DB 파일명
    pub news_db: String,
    /// 전역 수집 시작일 (init 로드의 하한)
    pub start_date: DateTime<Utc>,
    /// 뉴스 피드 설정
    pub news: NewsFeedConfig,
}

/// 뉴스 피드 설정.
#[derive(Debug, Clone)]
pub struct NewsFeedConfig {
    /// GNews API 키
    pub api_key: String,
    /// 윈도우 스티칭 한 번당 최대 요청 수
    pub max_requests: usize,
    /// 요청당 최대 기사 수 (제공자 페이지 한도)
    pub max_articles_per_request: usize,
}

impl PipelineConfig {
    /// 환경변수에서 설정 로드.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let start_date_raw =
            std::env::var("START_DATE").unwrap_or_else(|_| "2020-01-01".to_string());
        let start_date = NaiveDate::parse_from_str(&start_date_raw, "%Y-%m-%d")
            .map_err(|e| {
                CollectorError::Config(format!("START_DATE '{start_date_raw}' 파싱 실패: {e}"))
            })?
            .and_time(chrono::NaiveTime::MIN)
            .and_utc();

        Ok(Self {
            data_dir: PathBuf::from(
                std::env::var("DATA_DIR").unwrap_or_else(|_| "./data/raw".to_string()),
            ),
            logs_dir: PathBuf::from(
                std::env::var("LOGS_DIR").unwrap_or_else(|_| "./data/logs".to_string()),
            ),
            metadata_db: std::env::var("METADATA_DB")
                .unwrap_or_else(|_| "company_metadata.db".to_string()),
            news_db: std::env::var("NEWS_DB").unwrap_or_else(|_| "news_articles.db".to_string()),
            start_date,
            news: NewsFeedConfig {
                api_key: std::env::var("GNEWS_API_KEY").unwrap_or_default(),
                max_requests: env_var_parse("MAX_NUM_REQUESTS", 10),
                max_articles_per_request: env_var_parse("MAX_ARTICLES_PER_REQUEST", 100),
            },
        })
    }

    /// 회사 메타데이터 DB 경로.
    pub fn metadata_db_path(&self) -> PathBuf {
        self.data_dir.join(&self.metadata_db)
    }

    /// 뉴스 기사 DB 경로.
    pub fn news_db_path(&self) -> PathBuf {
        self.data_dir.join(&self.news_db)
    }

    /// 실패 티커 로그 경로.
    pub fn failure_log_path(&self) -> PathBuf {
        self.logs_dir.join("failed_tickers.log")
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용).
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl NewsFeedConfig {
    /// 테스트용 설정 생성.
    #[cfg(test)]
    pub(crate) fn for_tests(max_requests: usize) -> Self {
        Self {
            api_key: String::new(),
            max_requests,
            max_articles_per_request: 100,
        }
    }
}
