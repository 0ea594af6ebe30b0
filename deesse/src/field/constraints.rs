// Constraint builder: each operation flips exactly one flag on a copy

use super::{Constraints, Field};

/// Mark a field as unique.
pub fn unique(field: &Field) -> Field {
    field.with_constraints(Constraints {
        is_unique: true,
        ..field.constraints()
    })
}

/// Mark a field as non-nullable.
pub fn required(field: &Field) -> Field {
    field.with_constraints(Constraints {
        can_be_null: false,
        ..field.constraints()
    })
}

/// Mark a field as nullable.
pub fn optional(field: &Field) -> Field {
    field.with_constraints(Constraints {
        can_be_null: true,
        ..field.constraints()
    })
}

/// Mark a field as the primary key.
pub fn primary(field: &Field) -> Field {
    field.with_constraints(Constraints {
        is_primary: true,
        ..field.constraints()
    })
}

impl Field {
    pub fn unique(&self) -> Field {
        unique(self)
    }

    pub fn required(&self) -> Field {
        required(self)
    }

    pub fn optional(&self) -> Field {
        optional(self)
    }

    pub fn primary(&self) -> Field {
        primary(self)
    }
}
