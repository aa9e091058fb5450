//! 회사 메타데이터/뉴스 증분 수집 파이프라인.
//!
//! 이 crate는 API 서버와 독립적으로 실행되는 수집 바이너리를 제공합니다:
//! - 회사 메타데이터 수집 (기본 정보, 재무제표, 시세, 애널리스트 추천)
//! - 회사 뉴스 수집 (윈도우 스티칭 기반 기사 피드)
//! - init/delta 로드, 티커별 실패 격리, 실패 로그 재실행

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::PipelineConfig;
pub use error::{CollectorError, Result};
pub use modules::runner::{run_job, LoadType, TickerJob};
pub use stats::RunSummary;
