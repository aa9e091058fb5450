//! 파이프라인 모듈.

pub mod metadata;
pub mod news;
pub mod runner;
pub mod stitch;

pub use metadata::MetadataJob;
pub use news::NewsJob;
pub use runner::{effective_load, run_job, LoadType, TickerJob};
pub use stitch::{stitch_range, Advance};
