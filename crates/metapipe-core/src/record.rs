//! 동적 스키마 레코드 모델.
//!
//! 외부 소스에서 들어오는 엔티티 데이터는 고정된 구조체가 아니라
//! "필드명 → 스칼라 값"의 순서 있는 매핑으로 취급합니다. 테이블 스키마는
//! 첫 배치에서 추론되고, 이후 배치에서 새 필드가 보이면 넓어지기만 합니다
//! (절대 좁아지지 않음).

use serde::{Deserialize, Serialize};

/// 레코드 필드의 스칼라 값.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// 정수 값
    Integer(i64),
    /// 실수 값
    Real(f64),
    /// 문자열 값
    Text(String),
    /// 결측치
    Null,
}

impl FieldValue {
    /// 결측치 여부 확인.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// 숫자 값을 f64로 변환 (숫자가 아니면 None).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Real(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// 순서 있는 필드 매핑 하나가 엔티티 레코드 하나입니다.
///
/// 필드 순서는 삽입 순서를 유지합니다. 같은 이름으로 다시 `set`하면
/// 기존 위치의 값을 교체합니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    /// 빈 레코드 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 필드 설정 (이미 있으면 값 교체, 없으면 끝에 추가).
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name, value)),
        }
    }

    /// 필드 값 조회.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// 필드 제거. 제거된 값을 반환합니다.
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        let idx = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(idx).1)
    }

    /// 필드명 순회 (삽입 순서).
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// (필드명, 값) 순회.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// 필드 수.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// 필드가 없는지 확인.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.set(name, value);
        }
        record
    }
}

/// SQLite 스토리지 클래스.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    /// 정수 컬럼
    Integer,
    /// 실수 컬럼
    Real,
    /// 문자열 컬럼 (혼합/전부 결측 포함)
    Text,
}

impl StorageClass {
    /// DDL에 쓰이는 SQL 타입명.
    pub fn sql_type(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }

    /// 숫자 클래스 여부.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Real)
    }
}

/// 한 컬럼의 값들로부터 스토리지 클래스를 추론합니다.
///
/// - 결측치는 판정에서 제외
/// - 전부 정수 → INTEGER
/// - 전부 숫자이고 실수가 하나라도 있음 → REAL
/// - 그 외 (문자 포함 혼합, 전부 결측) → TEXT
pub fn infer_storage_class<'a>(values: impl IntoIterator<Item = &'a FieldValue>) -> StorageClass {
    let mut seen_integer = false;
    let mut seen_real = false;

    for value in values {
        match value {
            FieldValue::Integer(_) => seen_integer = true,
            FieldValue::Real(_) => seen_real = true,
            FieldValue::Text(_) => return StorageClass::Text,
            FieldValue::Null => {}
        }
    }

    if seen_real {
        StorageClass::Real
    } else if seen_integer {
        StorageClass::Integer
    } else {
        StorageClass::Text
    }
}

/// 배치 전체에서 암시적 스키마를 추론합니다.
///
/// 컬럼 순서는 배치에서 처음 등장한 순서를 따르고, 각 컬럼의 스토리지
/// 클래스는 배치 내 모든 값을 보고 결정합니다.
pub fn infer_schema(records: &[Record]) -> Vec<(String, StorageClass)> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for name in record.field_names() {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
    }

    columns
        .into_iter()
        .map(|name| {
            let class = infer_storage_class(
                records
                    .iter()
                    .filter_map(|r| r.get(&name))
                    .collect::<Vec<_>>()
                    .into_iter(),
            );
            (name, class)
        })
        .collect()
}
