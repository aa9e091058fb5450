//! SQLite 저장소 모듈.

pub mod db;
pub mod failure_log;
pub mod upsert;
pub mod watermark;
