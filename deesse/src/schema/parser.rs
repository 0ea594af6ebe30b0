use super::types::SchemaDefinition;
use crate::collection::Collection;
use crate::config::ensure_unique_slugs;
use crate::error::{DeesseError, Result};
use std::path::{Path, PathBuf};

/// Parse a declaration file, or every `*.yaml`/`*.yml` file in a directory
/// (in sorted path order), into one SchemaDefinition.
pub fn parse_schema(path: &Path) -> Result<SchemaDefinition> {
    let mut schema = SchemaDefinition::default();
    for file in declaration_files(path)? {
        let content = std::fs::read_to_string(&file)?;
        let parsed = parse_schema_str(&content).map_err(|e| {
            DeesseError::Validation(format!("{}: {e}", file.display()))
        })?;
        schema.collections.extend(parsed.collections);
    }
    Ok(schema)
}

/// Parse a declaration YAML string into a SchemaDefinition
pub fn parse_schema_str(content: &str) -> Result<SchemaDefinition> {
    let schema: SchemaDefinition = serde_yaml::from_str(content)?;
    Ok(schema)
}

/// Parse declarations and build validated collections from them.
pub fn load_collections(path: &Path) -> Result<Vec<Collection>> {
    let collections = parse_schema(path)?.to_collections()?;
    ensure_unique_slugs(&collections)?;
    Ok(collections)
}

/// The files a declaration path expands to.
pub fn declaration_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        return Err(DeesseError::Config(format!(
            "Declaration path does not exist: {}",
            path.display()
        )));
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for ext in ["yaml", "yml"] {
        let pattern = format!("{}/*.{}", path.display(), ext);
        let matches = glob::glob(&pattern)
            .map_err(|e| DeesseError::Config(format!("Glob error: {e}")))?;
        files.extend(matches.filter_map(|r| r.ok()));
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldKind;
    use tempfile::TempDir;

    const POSTS: &str = r#"
collections:
  - slug: posts
    name: Posts
    admin: { title: Posts, group: Content }
    fields:
      title: { type: text, required: true, unique: true, min: 1, max: 100 }
      content: { type: text }
      views: { type: integer, min: 0 }
      location: { type: geometry }
"#;

    #[test]
    fn test_parse_keeps_field_order() {
        let schema = parse_schema_str(POSTS).unwrap();
        let defs = schema.collections[0].field_definitions().unwrap();
        let names: Vec<_> = defs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["title", "content", "views", "location"]);
        assert_eq!(defs[3].1.kind, FieldKind::Custom("geometry".into()));
    }

    #[test]
    fn test_to_collections_applies_constraints() {
        let collections = parse_schema_str(POSTS).unwrap().to_collections().unwrap();
        let posts = &collections[0];
        let title = posts.field("title").unwrap();
        assert!(title.is_unique());
        assert!(!title.can_be_null());
        assert_eq!(title.params().max, Some(100.0));
        assert!(posts.field("id").unwrap().is_primary());
        assert_eq!(posts.admin().and_then(|a| a.group.as_deref()), Some("Content"));
    }

    #[test]
    fn test_invalid_params_name_the_field() {
        let yaml = r#"
collections:
  - slug: posts
    fields:
      title: { type: text, min: 10, max: 1 }
"#;
        let err = parse_schema_str(yaml).unwrap().to_collections().unwrap_err();
        assert!(err.to_string().contains("field 'title'"), "{err}");
    }

    #[test]
    fn test_directory_merges_files_in_sorted_order() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("b_users.yaml"),
            "collections:\n  - slug: users\n    fields:\n      email: { type: text }\n",
        )
        .unwrap();
        std::fs::write(
            tmp.path().join("a_posts.yml"),
            "collections:\n  - slug: posts\n",
        )
        .unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let collections = load_collections(tmp.path()).unwrap();
        let slugs: Vec<_> = collections.iter().map(|c| c.slug()).collect();
        assert_eq!(slugs, vec!["posts", "users"]);
    }

    #[test]
    fn test_duplicate_slugs_across_files_are_rejected() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.yaml"), "collections:\n  - slug: posts\n").unwrap();
        std::fs::write(tmp.path().join("b.yaml"), "collections:\n  - slug: posts\n").unwrap();

        let err = load_collections(tmp.path()).unwrap_err();
        assert!(matches!(err, DeesseError::Config(_)));
    }

    #[test]
    fn test_missing_path() {
        let tmp = TempDir::new().unwrap();
        assert!(load_collections(&tmp.path().join("nope.yaml")).is_err());
    }
}
