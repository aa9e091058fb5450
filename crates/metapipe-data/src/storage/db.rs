//! SQLite 연결 관리.
//!
//! 실행당 풀 하나, 커넥션 하나만 사용합니다. upsert 엔진과 워터마크
//! 저장소가 같은 커넥션을 공유하므로 쓰기가 자연스럽게 직렬화됩니다.

use crate::error::{DataError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;

/// SQLite 데이터베이스에 연결합니다.
///
/// 상위 폴더와 DB 파일이 없으면 생성합니다.
pub async fn connect_db(db_path: &Path) -> Result<SqlitePool> {
    if let Some(dir) = db_path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)?;
            tracing::info!(folder = %dir.display(), "폴더 생성");
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| DataError::ConnectionError(format!("{}: {e}", db_path.display())))?;

    tracing::info!(path = %db_path.display(), "데이터베이스 연결 성공");
    Ok(pool)
}

/// 인메모리 데이터베이스 연결 (테스트용).
///
/// 커넥션이 닫히면 데이터가 사라지므로 풀 크기는 1로 고정합니다.
pub async fn memory_db() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .map_err(|e| DataError::ConnectionError(e.to_string()))?;
    Ok(pool)
}
