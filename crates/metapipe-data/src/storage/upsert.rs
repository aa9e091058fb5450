//! 동적 스키마 upsert 엔진.
//!
//! 배치 레코드를 받아 대상 테이블을 만들거나 넓힌 뒤, 키 충돌 시 비키
//! 컬럼을 전부 교체하는 insert를 수행합니다. 같은 배치를 다시 넣어도
//! 결과가 달라지지 않습니다(멱등).
//!
//! # 스키마 규칙
//!
//! - 테이블이 없으면 배치 스키마로 생성. 키 컬럼은 NOT NULL, 단일 키는
//!   PRIMARY KEY, 복합 키는 UNIQUE 제약
//! - 테이블이 있으면 새 필드만큼 nullable 컬럼을 추가. 기존 컬럼은 절대
//!   삭제하거나 타입을 바꾸지 않음
//! - REAL 클래스 컬럼의 정수 값은 바인딩 전에 f64로 정규화해 배치 간
//!   스토리지 클래스 드리프트를 막음

use crate::error::{DataError, Result};
use metapipe_core::{infer_schema, FieldValue, Record, StorageClass};
use sqlx::sqlite::SqlitePool;
use sqlx::{Row, SqliteConnection};

/// 레코드 배치를 테이블에 upsert합니다.
///
/// 테이블 생성/확장과 행 쓰기가 한 트랜잭션으로 커밋됩니다. 스키마 오류는
/// 문제 컬럼을 진단 로그로 남긴 뒤 호출자에게 그대로 전파합니다.
pub async fn upsert(pool: &SqlitePool, table: &str, records: &[Record], key: &[&str]) -> Result<()> {
    if records.is_empty() {
        tracing::debug!(table, "빈 배치, 저장 생략");
        return Ok(());
    }

    let schema = infer_schema(records);
    for k in key {
        if !schema.iter().any(|(name, _)| name == k) {
            return Err(DataError::InvalidData(format!(
                "key column '{k}' missing from batch for table '{table}'"
            )));
        }
    }

    let mut tx = pool.begin().await?;

    if !table_exists(&mut tx, table).await? {
        create_table(&mut tx, table, &schema, key, records).await?;
    } else {
        add_missing_columns(&mut tx, table, &schema, records).await?;
    }

    let insert_sql = build_insert_sql(table, &schema, key);
    for record in records {
        let mut query = sqlx::query(&insert_sql);
        for (name, class) in &schema {
            let value = record.get(name).unwrap_or(&FieldValue::Null);
            query = match value {
                // REAL 컬럼의 정수는 실수로 정규화
                FieldValue::Integer(v) if *class == StorageClass::Real => query.bind(*v as f64),
                FieldValue::Integer(v) => query.bind(*v),
                FieldValue::Real(v) => query.bind(*v),
                FieldValue::Text(v) => query.bind(v.as_str()),
                FieldValue::Null => query.bind(None::<String>),
            };
        }
        if let Err(e) = query.execute(&mut *tx).await {
            diagnose_write_error(&e.to_string(), table, &schema, records);
            return Err(e.into());
        }
    }

    tx.commit().await?;
    tracing::info!(table, rows = records.len(), "배치 저장 완료");
    Ok(())
}

/// 테이블 존재 여부 확인.
async fn table_exists(conn: &mut SqliteConnection, table: &str) -> Result<bool> {
    let row = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
        .bind(table)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

/// 배치 스키마로 테이블 생성.
async fn create_table(
    conn: &mut SqliteConnection,
    table: &str,
    schema: &[(String, StorageClass)],
    key: &[&str],
    records: &[Record],
) -> Result<()> {
    let mut columns: Vec<String> = schema
        .iter()
        .map(|(name, class)| {
            if key.contains(&name.as_str()) {
                format!("{} {} NOT NULL", quote_ident(name), class.sql_type())
            } else {
                format!("{} {}", quote_ident(name), class.sql_type())
            }
        })
        .collect();

    match key {
        [] => {}
        [single] => columns.push(format!("PRIMARY KEY ({})", quote_ident(single))),
        multi => {
            let cols: Vec<String> = multi.iter().map(|c| quote_ident(c)).collect();
            columns.push(format!("UNIQUE ({})", cols.join(", ")));
        }
    }

    let create_sql = format!("CREATE TABLE {} ({})", quote_ident(table), columns.join(", "));
    if let Err(e) = sqlx::query(&create_sql).execute(&mut *conn).await {
        diagnose_write_error(&e.to_string(), table, schema, records);
        return Err(DataError::SchemaError {
            table: table.to_string(),
            message: e.to_string(),
        });
    }

    tracing::info!(table, columns = schema.len(), "테이블 생성");
    Ok(())
}

/// 기존 테이블에 없는 필드를 nullable 컬럼으로 추가.
async fn add_missing_columns(
    conn: &mut SqliteConnection,
    table: &str,
    schema: &[(String, StorageClass)],
    records: &[Record],
) -> Result<()> {
    let existing = existing_columns(conn, table).await?;

    for (name, class) in schema {
        if existing.iter().any(|c| c == name) {
            continue;
        }
        let alter_sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            quote_ident(table),
            quote_ident(name),
            class.sql_type()
        );
        if let Err(e) = sqlx::query(&alter_sql).execute(&mut *conn).await {
            diagnose_write_error(&e.to_string(), table, schema, records);
            return Err(DataError::SchemaError {
                table: table.to_string(),
                message: e.to_string(),
            });
        }
        tracing::info!(table, column = %name, "컬럼 추가");
    }

    Ok(())
}

/// 테이블의 현재 컬럼 목록 조회.
async fn existing_columns(conn: &mut SqliteConnection, table: &str) -> Result<Vec<String>> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", quote_ident(table)))
        .fetch_all(&mut *conn)
        .await?;

    rows.iter()
        .map(|row| row.try_get::<String, _>("name").map_err(DataError::from))
        .collect()
}

/// 충돌 시 비키 컬럼을 전부 교체하는 insert SQL 생성.
fn build_insert_sql(table: &str, schema: &[(String, StorageClass)], key: &[&str]) -> String {
    let columns: Vec<String> = schema.iter().map(|(name, _)| quote_ident(name)).collect();
    let placeholders: Vec<&str> = schema.iter().map(|_| "?").collect();

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        columns.join(", "),
        placeholders.join(", ")
    );

    if !key.is_empty() {
        let key_cols: Vec<String> = key.iter().map(|c| quote_ident(c)).collect();
        let updates: Vec<String> = schema
            .iter()
            .filter(|(name, _)| !key.contains(&name.as_str()))
            .map(|(name, _)| {
                let quoted = quote_ident(name);
                format!("{quoted} = excluded.{quoted}")
            })
            .collect();

        if updates.is_empty() {
            sql.push_str(&format!(" ON CONFLICT({}) DO NOTHING", key_cols.join(", ")));
        } else {
            sql.push_str(&format!(
                " ON CONFLICT({}) DO UPDATE SET {}",
                key_cols.join(", "),
                updates.join(", ")
            ));
        }
    }

    sql
}

/// 식별자 인용 (내부 따옴표는 이스케이프).
fn quote_ident(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\"\""))
}

/// 쓰기 실패 진단.
///
/// 드라이버 메시지의 파라미터 위치로 문제 컬럼을 찾아 샘플/고유 값을
/// 로그로 남깁니다. 위치를 못 찾으면 메시지만 남깁니다.
fn diagnose_write_error(
    message: &str,
    table: &str,
    schema: &[(String, StorageClass)],
    records: &[Record],
) {
    tracing::error!(table, error = message, "SQLite 저장 실패");

    match parameter_index(message) {
        Some(idx) if idx < schema.len() => {
            let (column, class) = &schema[idx];
            let samples: Vec<String> = records
                .iter()
                .take(5)
                .map(|r| format!("{:?}", r.get(column).unwrap_or(&FieldValue::Null)))
                .collect();
            let mut unique: Vec<String> = Vec::new();
            for record in records {
                let rendered = format!("{:?}", record.get(column).unwrap_or(&FieldValue::Null));
                if !unique.contains(&rendered) {
                    unique.push(rendered);
                }
            }
            tracing::error!(
                table,
                column = %column,
                storage_class = ?class,
                samples = ?samples,
                unique_values = ?unique,
                "문제 컬럼 진단"
            );
        }
        Some(idx) => {
            tracing::error!(table, index = idx, "파라미터 인덱스가 배치 컬럼 범위를 벗어남");
        }
        None => {
            tracing::error!(table, "오류 메시지에서 파라미터 인덱스를 추출하지 못함");
        }
    }
}

/// 드라이버 메시지에서 1-기반 파라미터 번호를 찾아 0-기반 인덱스로 변환.
fn parameter_index(message: &str) -> Option<usize> {
    let pos = message.find("parameter ")?;
    let rest = &message[pos + "parameter ".len()..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    let number: usize = digits.parse().ok()?;
    number.checked_sub(1)
}
