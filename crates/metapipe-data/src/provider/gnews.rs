//! GNews 기사 피드.
//!
//! 제공자 쪽 한도(페이지당 기사 수, 일일 요청 수)가 있어 한 호출은 한
//! 페이지만 돌려줍니다. 전체 범위 커버는 윈도우 스티칭 루프가 담당합니다.

use crate::error::{DataError, Result};
use crate::provider::{Article, ArticleFeed};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://gnews.io";

/// GNews `/search` 클라이언트.
pub struct GnewsFeed {
    client: reqwest::Client,
    api_key: String,
    max_articles: usize,
    base_url: String,
}

impl GnewsFeed {
    /// API 키와 페이지당 최대 기사 수로 생성.
    pub fn new(api_key: impl Into<String>, max_articles: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            max_articles,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// 엔드포인트 지정 생성 (테스트용).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: Vec<FeedArticle>,
}

#[derive(Debug, Deserialize)]
struct FeedArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    url: String,
    #[serde(rename = "publishedAt")]
    published_at: String,
    source: FeedSource,
}

#[derive(Debug, Deserialize)]
struct FeedSource {
    #[serde(default)]
    name: String,
}

#[async_trait]
impl ArticleFeed for GnewsFeed {
    async fn search(
        &self,
        subject: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Article>> {
        let url = format!("{}/api/v4/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", subject),
                ("from", &from.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("to", &to.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("max", &self.max_articles.to_string()),
                ("lang", "en"),
                ("sortby", "publishedAt"),
                ("token", &self.api_key),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DataError::FetchError(format!(
                "GNews search '{subject}': status {}",
                response.status()
            )));
        }

        let body: SearchResponse = response.json().await?;
        let mut articles = Vec::with_capacity(body.articles.len());
        for raw in body.articles {
            match DateTime::parse_from_rfc3339(&raw.published_at) {
                Ok(published) => articles.push(Article {
                    title: raw.title,
                    description: raw.description,
                    content: raw.content,
                    url: raw.url,
                    source: raw.source.name,
                    published: published.with_timezone(&Utc),
                }),
                Err(e) => {
                    // 발행 시각이 없으면 윈도우 경계 계산에 쓸 수 없음
                    tracing::warn!(
                        url = %raw.url,
                        published_at = %raw.published_at,
                        error = %e,
                        "기사 발행 시각 파싱 실패, 건너뜀"
                    );
                }
            }
        }
        Ok(articles)
    }
}
