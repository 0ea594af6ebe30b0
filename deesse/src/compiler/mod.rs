//! Compiles collections into a relational table representation.
//!
//! The representation is plain data and fully determined by its input, so
//! compiling the same collections twice renders byte-identical artifacts.

use crate::collection::Collection;
use crate::error::Result;
use crate::field::{Field, FieldKind};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Storage type of a compiled column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Serial,
    Boolean,
    Text,
    Varchar,
    Char,
    Numeric,
    Decimal,
    Jsonb,
    Uuid,
    Timestamp,
}

impl ColumnType {
    /// PostgreSQL type name, including the length for varchar/char.
    pub fn sql(&self, length: Option<u32>) -> String {
        let base = match self {
            ColumnType::Integer => "integer",
            ColumnType::Serial => "serial",
            ColumnType::Boolean => "boolean",
            ColumnType::Text => "text",
            ColumnType::Varchar => "varchar",
            ColumnType::Char => "char",
            ColumnType::Numeric => "numeric",
            ColumnType::Decimal => "decimal",
            ColumnType::Jsonb => "jsonb",
            ColumnType::Uuid => "uuid",
            ColumnType::Timestamp => "timestamptz",
        };
        match (self, length) {
            (ColumnType::Varchar | ColumnType::Char, Some(len)) => format!("{base}({len})"),
            _ => base.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    pub primary_key: bool,
    pub unique: bool,
    pub not_null: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// The column type for a field kind, or None for kinds without a mapping.
pub fn column_type(kind: &FieldKind) -> Option<ColumnType> {
    let ty = match kind {
        FieldKind::Integer => ColumnType::Integer,
        FieldKind::Serial => ColumnType::Serial,
        FieldKind::Boolean => ColumnType::Boolean,
        FieldKind::Text => ColumnType::Text,
        FieldKind::Varchar => ColumnType::Varchar,
        FieldKind::Char => ColumnType::Char,
        FieldKind::Numeric => ColumnType::Numeric,
        FieldKind::Decimal => ColumnType::Decimal,
        FieldKind::Json => ColumnType::Jsonb,
        FieldKind::Uuid => ColumnType::Uuid,
        FieldKind::Timestamp => ColumnType::Timestamp,
        FieldKind::Custom(_) => return None,
    };
    Some(ty)
}

fn compile_column(table: &str, name: &str, field: &Field) -> Column {
    let column_type = column_type(field.kind()).unwrap_or_else(|| {
        log::warn!(
            "{table}.{name}: no column type for kind '{}', falling back to text",
            field.kind()
        );
        ColumnType::Text
    });
    Column {
        name: name.to_string(),
        column_type,
        length: field.params().length,
        primary_key: field.is_primary(),
        unique: field.is_unique(),
        not_null: !field.can_be_null() || field.is_primary(),
    }
}

/// One table per collection, one column per field, in declaration order.
pub fn compile(collections: &[Collection]) -> Vec<Table> {
    collections
        .iter()
        .map(|col| Table {
            name: col.slug().to_string(),
            columns: col
                .fields()
                .iter()
                .map(|(name, field)| compile_column(col.slug(), name, field))
                .collect(),
        })
        .collect()
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Render the tables as PostgreSQL `CREATE TABLE` statements.
pub fn render_sql(tables: &[Table]) -> String {
    let mut sql = String::new();
    for (i, table) in tables.iter().enumerate() {
        if i > 0 {
            sql.push('\n');
        }
        let _ = writeln!(sql, "CREATE TABLE {} (", quote_ident(&table.name));
        let last = table.columns.len().saturating_sub(1);
        for (j, col) in table.columns.iter().enumerate() {
            let mut line = format!(
                "  {} {}",
                quote_ident(&col.name),
                col.column_type.sql(col.length)
            );
            if col.primary_key {
                line.push_str(" PRIMARY KEY");
            } else {
                if col.not_null {
                    line.push_str(" NOT NULL");
                }
                if col.unique {
                    line.push_str(" UNIQUE");
                }
            }
            if j < last {
                line.push(',');
            }
            let _ = writeln!(sql, "{line}");
        }
        sql.push_str(");\n");
    }
    sql
}

/// Render the tables as a pretty-printed JSON manifest.
pub fn render_json(tables: &[Table]) -> Result<String> {
    let mut json = serde_json::to_string_pretty(tables)?;
    json.push('\n');
    Ok(json)
}
