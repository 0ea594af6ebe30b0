use crate::error::{DeesseError, Result};
use crate::field::{self, Field};
use crate::hooks::CollectionHooks;
use crate::permissions::PermissionSet;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Reserved field holding the provider-assigned identity.
pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Field names injected by [`collection`]. Values for these are assigned by
/// the system, never by the caller.
pub const SYSTEM_FIELDS: [&str; 3] = [ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD];

pub fn is_system_field(name: &str) -> bool {
    SYSTEM_FIELDS.contains(&name)
}

/// Optional admin-panel metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// Ordered mapping from field name to [`Field`].
///
/// Inserting an existing name replaces the field in place, keeping its
/// position; new names are appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(Vec<(String, Field)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, field: Field) {
        let name = name.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = field,
            None => self.0.push((name, field)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.0.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge `other` on top of these fields; same-named fields are replaced
    /// wholesale.
    pub fn extend(&mut self, other: Fields) {
        for (name, field) in other.0 {
            self.insert(name, field);
        }
    }
}

impl<N: Into<String>> FromIterator<(N, Field)> for Fields {
    fn from_iter<I: IntoIterator<Item = (N, Field)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (name, field) in iter {
            fields.insert(name, field);
        }
        fields
    }
}

/// User-facing declaration of a collection, before system fields are added.
#[derive(Debug, Clone, Default)]
pub struct CollectionConfig {
    pub slug: String,
    pub name: Option<String>,
    pub admin: Option<AdminMeta>,
    pub fields: Fields,
    pub hooks: CollectionHooks,
    pub permissions: PermissionSet,
}

impl CollectionConfig {
    pub fn new(slug: impl Into<String>) -> Self {
        CollectionConfig {
            slug: slug.into(),
            ..Default::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn admin(mut self, admin: AdminMeta) -> Self {
        self.admin = Some(admin);
        self
    }

    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.insert(name, field);
        self
    }

    pub fn hooks(mut self, hooks: CollectionHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = permissions;
        self
    }
}

/// A named, typed record schema plus its hooks and permissions.
#[derive(Debug, Clone)]
pub struct Collection {
    slug: String,
    name: Option<String>,
    admin: Option<AdminMeta>,
    fields: Fields,
    hooks: CollectionHooks,
    permissions: PermissionSet,
}

impl Collection {
    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn admin(&self) -> Option<&AdminMeta> {
        self.admin.as_ref()
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn hooks(&self) -> &CollectionHooks {
        &self.hooks
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex")
    })
}

/// The reserved fields every collection carries, in injection order.
pub fn system_fields() -> Fields {
    [
        (ID_FIELD, field::primary(&field::serial())),
        (CREATED_AT_FIELD, field::timestamp()),
        (UPDATED_AT_FIELD, field::timestamp()),
    ]
    .into_iter()
    .collect()
}

/// Build a collection from its declaration, injecting `id`, `createdAt` and
/// `updatedAt`. User fields with those names are overwritten.
pub fn collection(config: CollectionConfig) -> Result<Collection> {
    if config.slug.is_empty() {
        return Err(DeesseError::Validation(
            "Collection slug must not be empty".into(),
        ));
    }
    if !identifier_pattern().is_match(&config.slug) {
        return Err(DeesseError::Validation(format!(
            "Collection slug '{}' must start with a letter or underscore and contain only letters, digits and underscores",
            config.slug
        )));
    }

    if let Some(name) = config
        .fields
        .names()
        .find(|name| !identifier_pattern().is_match(name))
    {
        return Err(DeesseError::Validation(format!(
            "Field '{name}' in collection '{}' must start with a letter or underscore and contain only letters, digits and underscores",
            config.slug
        )));
    }

    let mut fields = config.fields;
    for name in SYSTEM_FIELDS {
        if fields.contains(name) {
            log::debug!(
                "Collection '{}' declares reserved field '{name}', replacing it",
                config.slug
            );
        }
    }
    fields.extend(system_fields());

    Ok(Collection {
        slug: config.slug,
        name: config.name,
        admin: config.admin,
        fields,
        hooks: config.hooks,
        permissions: config.permissions,
    })
}
