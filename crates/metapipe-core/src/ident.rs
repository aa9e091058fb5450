//! 프로세스 간 안정적인 식별자 생성.
//!
//! 티커 문자열을 내부 키로 그대로 쓰는 대신 결정적인 64비트 ID로 변환해
//! 저장합니다. 언어 기본 해시는 프로세스/버전 간 안정성이 보장되지 않으므로
//! SHA-256 기반의 고정 스킴(v1)을 사용합니다. 같은 입력은 영원히 같은 ID를
//! 냅니다.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// ID 스킴 버전. 해시 방식이 바뀌면 반드시 올려야 합니다.
pub const ID_SCHEME_VERSION: u32 = 1;

/// article_id 입력 결합용 구분자 (필드 경계 모호성 방지).
const FIELD_SEPARATOR: char = '\u{1f}';

/// UTF-8 입력에 대한 안정적인 비음수 64비트 ID.
///
/// SHA-256 다이제스트의 앞 8바이트를 big-endian 정수로 읽고 부호 비트를
/// 제거합니다. SQLite INTEGER 컬럼에 그대로 저장할 수 있습니다.
pub fn stable_id(input: &str) -> i64 {
    let digest = Sha256::digest(input.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(head) & i64::MAX as u64) as i64
}

/// 티커 심볼의 안정적인 ID.
pub fn ticker_id(ticker: &str) -> i64 {
    stable_id(ticker.trim())
}

/// 뉴스 기사의 결정적 식별자.
///
/// 소스에는 기사 고유 키가 없으므로 `소스명 + 제목 + 발행 시각`의 내용
/// 해시를 기사 ID로 정의합니다(스킴 v1).
pub fn article_id(source: &str, title: &str, published: &DateTime<Utc>) -> i64 {
    let input = format!(
        "{source}{sep}{title}{sep}{published}",
        sep = FIELD_SEPARATOR,
        published = published.to_rfc3339()
    );
    stable_id(&input)
}
