//! 파이프라인 공통 타입.
//!
//! 이 crate는 다음을 제공합니다:
//! - 동적 스키마 레코드 모델 (`Record`, `FieldValue`)
//! - 배치 기반 스토리지 클래스 추론
//! - 프로세스 간 안정적인 식별자 생성 (`ticker_id`, `article_id`)

pub mod ident;
pub mod record;

pub use ident::{article_id, stable_id, ticker_id};
pub use record::{infer_schema, infer_storage_class, FieldValue, Record, StorageClass};
