//! 저장소 및 데이터 제공자.
//!
//! 이 crate는 다음을 제공합니다:
//! - SQLite 연결 관리 (단일 커넥션, 쓰기 직렬화)
//! - 동적 스키마 upsert 엔진 (테이블 생성/확장, 충돌 시 교체)
//! - 티커별 워터마크 저장소 (`pipeline_log`)
//! - 재실행 가능한 실패 로그
//! - 외부 협력자 인터페이스 (티커 유니버스, 메타데이터 소스, 기사 피드)

pub mod error;
pub mod provider;
pub mod storage;

pub use error::{DataError, Result};

// 저장소 재내보내기
pub use storage::db::{connect_db, memory_db};
pub use storage::failure_log::{append_failure, replay_failures};
pub use storage::upsert::upsert;
pub use storage::watermark::{self, Watermark};

// 협력자 인터페이스 재내보내기
pub use provider::{Article, ArticleFeed, FinancialStatements, MetadataSource, TickerUniverse};
pub use provider::gnews::GnewsFeed;
pub use provider::nse::NseUniverse;
pub use provider::yahoo::YahooMetadataSource;
