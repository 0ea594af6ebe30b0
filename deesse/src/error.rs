use crate::permissions::Action;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeesseError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("An id is required for {action}")]
    MissingId { action: Action },

    #[error("Permission denied: {action} on {}", target(.collection, .field))]
    PermissionDenied {
        action: Action,
        collection: String,
        field: Option<String>,
    },

    #[error("Record not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Regeneration error: {0}")]
    Regeneration(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

fn target(collection: &str, field: &Option<String>) -> String {
    match field {
        Some(field) => format!("{collection}.{field}"),
        None => collection.to_string(),
    }
}

/// Copyable classification of a [`DeesseError`], handed to `afterError` hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    MissingId,
    PermissionDenied,
    NotFound,
    Provider,
    Regeneration,
    Config,
    Io,
    Serialization,
}

impl DeesseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeesseError::Validation(_) => ErrorKind::Validation,
            DeesseError::MissingId { .. } => ErrorKind::MissingId,
            DeesseError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            DeesseError::NotFound { .. } => ErrorKind::NotFound,
            DeesseError::Provider(_) | DeesseError::Sqlite(_) => ErrorKind::Provider,
            DeesseError::Regeneration(_) => ErrorKind::Regeneration,
            DeesseError::Config(_) => ErrorKind::Config,
            DeesseError::Io(_) => ErrorKind::Io,
            DeesseError::Yaml(_) | DeesseError::Json(_) => ErrorKind::Serialization,
        }
    }

    pub fn not_found(collection: &str, id: &str) -> Self {
        DeesseError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DeesseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_message() {
        let err = DeesseError::PermissionDenied {
            action: Action::Create,
            collection: "posts".into(),
            field: Some("title".into()),
        };
        assert_eq!(err.to_string(), "Permission denied: create on posts.title");
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_kind_groups_backend_failures() {
        let err = DeesseError::Provider("constraint violated".into());
        assert_eq!(err.kind(), ErrorKind::Provider);

        let err = DeesseError::not_found("posts", "abc");
        assert_eq!(err.to_string(), "Record not found: posts/abc");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
