//! 반복 레코드 응답 디코딩.
//!
//! 한 번의 콜백 응답에서 스키마에 선언한 필드를 행 단위로 추출합니다.
//! 행 수는 응답의 반복 레코드 수와 요청 개수 중 작은 값이며, 응답 순서
//! (최신 데이터 우선)를 그대로 유지합니다. 연속조회 플래그는 노출만 하고
//! 재요청은 호출자 책임입니다.

use std::collections::BTreeMap;

use kmarket_core::units;
use rust_decimal::Decimal;

use crate::error::AssemblyError;
use crate::session::ResponseContext;

/// 필드 타입.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 부호 있는 정수
    Integer,
    /// 소수
    Decimal,
    /// 문자열
    Text,
    /// 부호가 등락 방향인 정수 (절대값 사용)
    SignedMagnitude,
}

/// 레코드 스키마 (필드명, 타입 순서 목록).
#[derive(Debug, Clone, Default)]
pub struct ResponseSchema {
    fields: Vec<(&'static str, FieldKind)>,
}

impl ResponseSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &'static str, kind: FieldKind) -> Self {
        self.fields.push((name, kind));
        self
    }

    pub fn fields(&self) -> &[(&'static str, FieldKind)] {
        &self.fields
    }
}

/// 디코딩된 필드 값.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Integer(i64),
    Decimal(Decimal),
    Text(String),
    Magnitude(u64),
}

/// 디코딩된 레코드 한 행.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    values: BTreeMap<&'static str, FieldValue>,
}

impl Record {
    fn get(&self, name: &str) -> Result<&FieldValue, AssemblyError> {
        self.values
            .get(name)
            .ok_or_else(|| AssemblyError::MissingField(name.to_string()))
    }

    fn mismatch(name: &str, expected: &'static str) -> AssemblyError {
        AssemblyError::KindMismatch {
            field: name.to_string(),
            expected,
        }
    }

    pub fn integer(&self, name: &str) -> Result<i64, AssemblyError> {
        match self.get(name)? {
            FieldValue::Integer(v) => Ok(*v),
            _ => Err(Self::mismatch(name, "integer")),
        }
    }

    pub fn decimal(&self, name: &str) -> Result<Decimal, AssemblyError> {
        match self.get(name)? {
            FieldValue::Decimal(v) => Ok(*v),
            _ => Err(Self::mismatch(name, "decimal")),
        }
    }

    pub fn text(&self, name: &str) -> Result<&str, AssemblyError> {
        match self.get(name)? {
            FieldValue::Text(v) => Ok(v),
            _ => Err(Self::mismatch(name, "text")),
        }
    }

    pub fn magnitude(&self, name: &str) -> Result<u64, AssemblyError> {
        match self.get(name)? {
            FieldValue::Magnitude(v) => Ok(*v),
            _ => Err(Self::mismatch(name, "signed magnitude")),
        }
    }
}

/// 한 페이지 분량의 레코드.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub records: Vec<T>,
    /// 다음 페이지 존재 여부
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn decode(name: &str, kind: FieldKind, raw: &str) -> Result<FieldValue, kmarket_core::CoreError> {
    Ok(match kind {
        FieldKind::Integer => FieldValue::Integer(units::parse_integer(name, raw)?),
        FieldKind::Decimal => FieldValue::Decimal(units::parse_decimal(name, raw)?),
        FieldKind::Text => FieldValue::Text(raw.trim().to_string()),
        FieldKind::SignedMagnitude => {
            FieldValue::Magnitude(units::parse_signed_magnitude(name, raw)?)
        }
    })
}

/// 응답에서 최대 `limit`개 행을 디코딩.
///
/// 한 필드라도 변환에 실패하면 전체가 실패합니다. 일부 필드만 채워진
/// 레코드는 만들지 않습니다.
pub fn assemble(
    ctx: &ResponseContext<'_>,
    schema: &ResponseSchema,
    limit: usize,
) -> Result<Page<Record>, AssemblyError> {
    let rows = ctx.record_count().min(limit);
    let mut records = Vec::with_capacity(rows);

    for row in 0..rows {
        let mut record = Record::default();
        for &(name, kind) in schema.fields() {
            let raw = ctx.field(row, name);
            let value =
                decode(name, kind, &raw).map_err(|source| AssemblyError::Parse { row, source })?;
            record.values.insert(name, value);
        }
        records.push(record);
    }

    Ok(Page {
        records,
        has_more: ctx.has_more(),
    })
}

/// 단일 레코드 응답 디코딩.
///
/// 단일 출력 조회는 반복 레코드 수와 무관하게 0행을 읽습니다.
/// 스키마의 모든 필드가 비어 있으면 빈 응답으로 보고 `None`을 반환합니다.
pub fn assemble_single(
    ctx: &ResponseContext<'_>,
    schema: &ResponseSchema,
) -> Result<Option<Record>, AssemblyError> {
    let raw: Vec<(&'static str, FieldKind, String)> = schema
        .fields()
        .iter()
        .map(|&(name, kind)| (name, kind, ctx.field(0, name)))
        .collect();

    if raw.iter().all(|(_, _, value)| value.is_empty()) {
        return Ok(None);
    }

    let mut record = Record::default();
    for (name, kind, value) in raw {
        let decoded =
            decode(name, kind, &value).map_err(|source| AssemblyError::Parse { row: 0, source })?;
        record.values.insert(name, decoded);
    }
    Ok(Some(record))
}
