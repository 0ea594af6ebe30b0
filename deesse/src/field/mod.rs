pub mod constraints;
pub mod kinds;

pub use constraints::{optional, primary, required, unique};
pub use kinds::*;

use crate::error::{DeesseError, Result};
use crate::permissions::PermissionSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Field kind enumeration. Unknown kinds read from a declaration are kept as
/// `Custom` and compile to a text column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Integer,
    Serial,
    Boolean,
    Text,
    Varchar,
    Char,
    #[serde(alias = "number")]
    Numeric,
    Decimal,
    Json,
    Uuid,
    Timestamp,
    #[serde(untagged)]
    Custom(String),
}

impl FieldKind {
    pub fn as_str(&self) -> &str {
        match self {
            FieldKind::Integer => "integer",
            FieldKind::Serial => "serial",
            FieldKind::Boolean => "boolean",
            FieldKind::Text => "text",
            FieldKind::Varchar => "varchar",
            FieldKind::Char => "char",
            FieldKind::Numeric => "numeric",
            FieldKind::Decimal => "decimal",
            FieldKind::Json => "json",
            FieldKind::Uuid => "uuid",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Custom(name) => name,
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldKind::Integer | FieldKind::Serial | FieldKind::Numeric | FieldKind::Decimal
        )
    }

    fn is_textual(&self) -> bool {
        matches!(self, FieldKind::Text | FieldKind::Varchar | FieldKind::Char)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific parameters. `min`/`max` bound text length or numeric value;
/// `length` sizes varchar/char columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
}

impl FieldParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.length.is_none()
    }

    /// Check these parameters against what `kind` accepts.
    pub fn validate(&self, kind: &FieldKind) -> Result<()> {
        if let FieldKind::Custom(_) = kind {
            return Ok(());
        }

        if !kind.is_textual() && !kind.is_numeric() && !self.is_empty() {
            return Err(DeesseError::Validation(format!(
                "Field kind '{kind}' takes no parameters"
            )));
        }

        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(DeesseError::Validation(format!(
                    "Field kind '{kind}': min ({min}) is greater than max ({max})"
                )));
            }
        }

        if kind.is_textual() {
            for bound in [self.min, self.max].into_iter().flatten() {
                if bound < 0.0 || bound.fract() != 0.0 {
                    return Err(DeesseError::Validation(format!(
                        "Field kind '{kind}': length bound {bound} must be a non-negative integer"
                    )));
                }
            }
        }

        match (kind, self.length) {
            (FieldKind::Varchar | FieldKind::Char, Some(0)) => Err(DeesseError::Validation(
                format!("Field kind '{kind}': length must be greater than zero"),
            )),
            (FieldKind::Varchar | FieldKind::Char, _) | (_, None) => Ok(()),
            (_, Some(_)) => Err(DeesseError::Validation(format!(
                "Field kind '{kind}' does not take a length"
            ))),
        }
    }
}

/// Column-level constraint flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    pub is_primary: bool,
    pub is_unique: bool,
    pub can_be_null: bool,
}

impl Default for Constraints {
    fn default() -> Self {
        Constraints {
            is_primary: false,
            is_unique: false,
            can_be_null: true,
        }
    }
}

/// One typed, constrained attribute of a collection.
///
/// Fields are values: the constraint operations in [`constraints`] return a
/// new `Field` and leave the receiver untouched, so one field can be shared
/// between collections.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    kind: FieldKind,
    params: FieldParams,
    constraints: Constraints,
    permissions: PermissionSet,
}

impl Field {
    /// Build a field of `kind` with no parameters.
    pub fn new(kind: FieldKind) -> Self {
        Field {
            kind,
            params: FieldParams::default(),
            constraints: Constraints::default(),
            permissions: PermissionSet::default(),
        }
    }

    /// Build a field of `kind`, validating `params` first.
    pub fn with_params(kind: FieldKind, params: FieldParams) -> Result<Self> {
        params.validate(&kind)?;
        Ok(Field {
            params,
            ..Field::new(kind)
        })
    }

    /// Attach per-action permission predicates. Actions the set leaves
    /// unspecified stay permissive.
    pub fn permissions(self, permissions: PermissionSet) -> Self {
        Field {
            permissions,
            ..self
        }
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn params(&self) -> &FieldParams {
        &self.params
    }

    pub fn constraints(&self) -> Constraints {
        self.constraints
    }

    pub fn permission_set(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn is_primary(&self) -> bool {
        self.constraints.is_primary
    }

    pub fn is_unique(&self) -> bool {
        self.constraints.is_unique
    }

    pub fn can_be_null(&self) -> bool {
        self.constraints.can_be_null
    }

    pub(crate) fn with_constraints(&self, constraints: Constraints) -> Self {
        Field {
            constraints,
            ..self.clone()
        }
    }
}
