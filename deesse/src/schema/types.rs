use crate::collection::{self, AdminMeta, Collection, CollectionConfig};
use crate::error::{DeesseError, Result};
use crate::field::{Field, FieldKind, FieldParams};
use serde::{Deserialize, Serialize};

/// Top-level declaration file: a list of collections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDefinition {
    #[serde(default)]
    pub collections: Vec<CollectionDefinition>,
}

/// Declaration of a single collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionDefinition {
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub admin: Option<AdminMeta>,
    /// Field name -> definition. Kept as a YAML mapping so declaration order
    /// survives parsing.
    #[serde(default)]
    pub fields: serde_yaml::Mapping,
}

/// Declaration of a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub length: Option<u32>,
}

impl FieldDefinition {
    pub fn params(&self) -> FieldParams {
        FieldParams {
            min: self.min,
            max: self.max,
            length: self.length,
        }
    }

    /// Build the field, applying constraint flags through the builder.
    pub fn to_field(&self) -> Result<Field> {
        let mut field = Field::with_params(self.kind.clone(), self.params())?;
        if self.required {
            field = field.required();
        }
        if self.unique {
            field = field.unique();
        }
        if self.primary {
            field = field.primary();
        }
        Ok(field)
    }
}

impl CollectionDefinition {
    /// Field definitions in declaration order.
    pub fn field_definitions(&self) -> Result<Vec<(String, FieldDefinition)>> {
        let mut out = Vec::with_capacity(self.fields.len());
        for (key, value) in &self.fields {
            let name = key.as_str().ok_or_else(|| {
                DeesseError::Validation(format!(
                    "Collection '{}': field names must be strings",
                    self.slug
                ))
            })?;
            let def: FieldDefinition = serde_yaml::from_value(value.clone()).map_err(|e| {
                DeesseError::Validation(format!(
                    "Collection '{}', field '{name}': {e}",
                    self.slug
                ))
            })?;
            out.push((name.to_string(), def));
        }
        Ok(out)
    }

    pub fn to_collection(&self) -> Result<Collection> {
        let mut config = CollectionConfig::new(&self.slug);
        config.name = self.name.clone();
        config.admin = self.admin.clone();
        for (name, def) in self.field_definitions()? {
            let field = def.to_field().map_err(|e| match e {
                DeesseError::Validation(msg) => DeesseError::Validation(format!(
                    "Collection '{}', field '{name}': {msg}",
                    self.slug
                )),
                other => other,
            })?;
            config = config.field(name, field);
        }
        collection::collection(config)
    }
}

impl SchemaDefinition {
    pub fn to_collections(&self) -> Result<Vec<Collection>> {
        self.collections
            .iter()
            .map(CollectionDefinition::to_collection)
            .collect()
    }
}
