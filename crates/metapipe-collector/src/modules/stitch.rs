//! 윈도우 스티칭 페치 루프.
//!
//! 기사 피드는 한 호출에 한 페이지만 주므로, 직전 페이지의 극단
//! 타임스탬프를 다음 호출의 경계로 삼아 전체 구간을 이어 붙입니다.
//! 빈 페이지가 오거나 요청 한도에 닿으면 해당 단계가 끝납니다.
//!
//! # 단계
//!
//! - **init**: `시작일 → 현재`, 페이지의 가장 오래된 시각으로 전진
//!   (현재에서 과거 방향으로 내려감)
//! - **delta 전방**: `마지막 최신 → 현재`, 페이지의 최신 시각으로 전진
//! - **delta 후방**: `시작일 → 가장 오래된 기사`, 페이지의 최신 시각으로 전진

use chrono::{DateTime, Utc};
use metapipe_data::{Article, ArticleFeed};

/// 다음 호출의 `from` 경계를 정하는 기준.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// 페이지에서 가장 오래된 발행 시각 (init 로드)
    Oldest,
    /// 페이지에서 가장 최신 발행 시각 (delta 로드)
    Newest,
}

/// 한 방향의 스티칭 단계를 끝까지 돌립니다.
///
/// 빈 페이지는 정상 종료 신호이고, 피드 오류도 단계 종료로 취급합니다
/// (경고 로그 후 지금까지 모은 기사를 반환). 한 단계는 최대
/// `max_requests`번만 호출하며, 모은 기사는 페이지 수신 순서와 무관하게
/// 발행 시각 오름차순으로 정렬해 반환합니다.
pub async fn stitch_range(
    feed: &dyn ArticleFeed,
    subject: &str,
    mut from: DateTime<Utc>,
    to: DateTime<Utc>,
    advance: Advance,
    max_requests: usize,
) -> Vec<Article> {
    let mut pooled: Vec<Article> = Vec::new();

    for request in 0..max_requests {
        let page = match feed.search(subject, from, to).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(
                    subject,
                    request,
                    error = %e,
                    "피드 오류, 현재 단계 종료"
                );
                break;
            }
        };

        if page.is_empty() {
            tracing::debug!(subject, request, "빈 페이지, 단계 종료");
            break;
        }

        let boundary = match advance {
            Advance::Oldest => page.iter().map(|a| a.published).min(),
            Advance::Newest => page.iter().map(|a| a.published).max(),
        };

        tracing::debug!(
            subject,
            request,
            articles = page.len(),
            from = %from,
            to = %to,
            "페이지 수신"
        );
        pooled.extend(page);

        match boundary {
            Some(next_from) => from = next_from,
            None => break,
        }
    }

    pooled.sort_by_key(|a| a.published);
    pooled
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use metapipe_data::{DataError, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// 준비된 페이지를 순서대로 내주는 스텁 피드.
    struct ScriptedFeed {
        pages: Mutex<Vec<Result<Vec<Article>>>>,
        calls: AtomicUsize,
    }

    impl ScriptedFeed {
        fn new(pages: Vec<Result<Vec<Article>>>) -> Self {
            Self {
                pages: Mutex::new(pages),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ArticleFeed for ScriptedFeed {
        async fn search(
            &self,
            _subject: &str,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
        ) -> Result<Vec<Article>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut pages = self.pages.lock().unwrap();
            if pages.is_empty() {
                Ok(Vec::new())
            } else {
                pages.remove(0)
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

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_terminates_after_empty_page() {
        // N 페이지 뒤 빈 페이지 → 정확히 N+1번 호출
        let feed = ScriptedFeed::new(vec![
            Ok(vec![article("c", 20), article("b", 15)]),
            Ok(vec![article("a", 10)]),
        ]);
        let (from, to) = window();

        let pooled = stitch_range(&feed, "INFY.NS", from, to, Advance::Oldest, 10).await;

        assert_eq!(feed.call_count(), 3);
        assert_eq!(pooled.len(), 3);
    }

    #[tokio::test]
    async fn test_respects_request_ceiling() {
        let feed = ScriptedFeed::new(vec![
            Ok(vec![article("a", 10)]),
            Ok(vec![article("b", 11)]),
            Ok(vec![article("c", 12)]),
            Ok(vec![article("d", 13)]),
        ]);
        let (from, to) = window();

        let pooled = stitch_range(&feed, "INFY.NS", from, to, Advance::Newest, 2).await;

        assert_eq!(feed.call_count(), 2);
        assert_eq!(pooled.len(), 2);
    }

    #[tokio::test]
    async fn test_feed_error_ends_phase_not_run() {
        let feed = ScriptedFeed::new(vec![
            Ok(vec![article("a", 10)]),
            Err(DataError::FetchError("status 500".into())),
            Ok(vec![article("never", 12)]),
        ]);
        let (from, to) = window();

        let pooled = stitch_range(&feed, "INFY.NS", from, to, Advance::Newest, 10).await;

        // 오류 페이지에서 멈추고, 그때까지 모은 기사는 유지
        assert_eq!(feed.call_count(), 2);
        assert_eq!(pooled.len(), 1);
        assert_eq!(pooled[0].title, "a");
    }

    #[tokio::test]
    async fn test_pooled_articles_sorted_ascending() {
        // init 방향은 최신 페이지부터 내려오므로 수신 순서는 역순
        let feed = ScriptedFeed::new(vec![
            Ok(vec![article("c", 20), article("b", 15)]),
            Ok(vec![article("a", 10)]),
        ]);
        let (from, to) = window();

        let pooled = stitch_range(&feed, "INFY.NS", from, to, Advance::Oldest, 10).await;

        let titles: Vec<&str> = pooled.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_advance_boundary_moves_from() {
        // init 방향: 다음 from은 직전 페이지의 가장 오래된 시각
        let feed = ScriptedFeed::new(vec![Ok(vec![article("c", 20), article("b", 15)])]);
        let (from, to) = window();

        let pooled = stitch_range(&feed, "INFY.NS", from, to, Advance::Oldest, 10).await;
        assert_eq!(pooled.len(), 2);
        // 두 번째 호출(빈 페이지)까지 총 2회
        assert_eq!(feed.call_count(), 2);
    }
}
