// Field constructors, one per built-in kind

use super::{Field, FieldKind, FieldParams};
use crate::error::Result;

/// Text field; `min`/`max` bound the string length.
pub fn text(params: FieldParams) -> Result<Field> {
    Field::with_params(FieldKind::Text, params)
}

/// Variable-length string column of at most `length` characters.
pub fn varchar(length: u32) -> Result<Field> {
    Field::with_params(FieldKind::Varchar, FieldParams::new().length(length))
}

/// Fixed-length string column.
pub fn char(length: u32) -> Result<Field> {
    Field::with_params(FieldKind::Char, FieldParams::new().length(length))
}

/// Integer field; `min`/`max` bound the value.
pub fn integer(params: FieldParams) -> Result<Field> {
    Field::with_params(FieldKind::Integer, params)
}

pub fn numeric(params: FieldParams) -> Result<Field> {
    Field::with_params(FieldKind::Numeric, params)
}

/// General number field; `min`/`max` bound the value. Stored as `numeric`.
pub fn number(params: FieldParams) -> Result<Field> {
    numeric(params)
}

pub fn decimal(params: FieldParams) -> Result<Field> {
    Field::with_params(FieldKind::Decimal, params)
}

/// Auto-incrementing integer, used for system identities.
pub fn serial() -> Field {
    Field::new(FieldKind::Serial)
}

pub fn boolean() -> Field {
    Field::new(FieldKind::Boolean)
}

pub fn json() -> Field {
    Field::new(FieldKind::Json)
}

pub fn uuid() -> Field {
    Field::new(FieldKind::Uuid)
}

pub fn timestamp() -> Field {
    Field::new(FieldKind::Timestamp)
}
