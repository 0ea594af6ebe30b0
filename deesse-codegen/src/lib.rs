//! deesse code generation - generates typed Rust records from collection
//! declarations.
//!
//! [`generate_types`] turns a collection list into one Rust source file with
//! a record struct and a partial struct per collection, plus a `DbExt` trait
//! giving `db.posts()` style accessors. [`TypesGenerator`] plugs the same
//! output into a [`deesse::Regenerator`] as `types.rs`.

mod generator;
mod store_gen;
mod struct_gen;
pub mod type_utils;

use deesse::artifact::{Artifact, TYPES_RS};
use deesse::collection::Collection;
use deesse::watcher::Generator;
use std::path::Path;

/// Generate the types module source for `collections`.
///
/// Fails with [`deesse::DeesseError::Regeneration`] when a slug or field name
/// has no usable Rust identifier, or when two names generate the same item.
pub fn generate_types(collections: &[Collection]) -> deesse::Result<String> {
    let tokens = generator::generate_all(collections)?;
    generator::format_token_stream(&tokens)
}

/// Generate Rust types from a declaration file or directory.
///
/// Reads the declarations at `declarations`, generates typed Rust code, and
/// writes it to `output_path`. This is intended to be called from a
/// `build.rs` build script.
///
/// # Example
///
/// ```no_run
/// // In build.rs:
/// deesse_codegen::generate_from_declarations("collections", "src/generated.rs").unwrap();
/// ```
pub fn generate_from_declarations(
    declarations: &str,
    output_path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let collections = deesse::schema::load_collections(Path::new(declarations))?;
    std::fs::write(output_path, generate_types(&collections)?)?;
    Ok(())
}

/// Generate Rust types from a declaration YAML string. Useful for testing.
pub fn generate_from_declarations_str(
    declarations_yaml: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    let collections = deesse::schema::parse_schema_str(declarations_yaml)?.to_collections()?;
    deesse::config::ensure_unique_slugs(&collections)?;
    Ok(generate_types(&collections)?)
}

/// Emits `types.rs` on every regeneration.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypesGenerator;

impl Generator for TypesGenerator {
    fn name(&self) -> &str {
        "types"
    }

    fn generate(&self, collections: &[Collection]) -> deesse::Result<Vec<Artifact>> {
        Ok(vec![Artifact::new(TYPES_RS, generate_types(collections)?)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use deesse::artifact::SCHEMA_SQL;
    use deesse::{DeesseError, Regenerator};
    use serde_json::json;
    use tempfile::TempDir;

    /// Checked-in output of [`FIXTURE_DECLARATIONS`], compiled as part of
    /// the tests.
    #[allow(dead_code)]
    mod fixture {
        include!("../tests/fixtures/posts_types.rs");
    }

    const FIXTURE_DECLARATIONS: &str = r#"
collections:
  - slug: posts
    fields:
      title: { type: text, required: true }
      views: { type: integer }
      publishedAt: { type: timestamp }
"#;

    const DECLARATIONS: &str = r#"
collections:
  - slug: posts
    name: Posts
    fields:
      title: { type: text, required: true, unique: true }
      content: { type: text }
      views: { type: integer, min: 0 }
      type: { type: varchar, length: 16 }
      location: { type: geometry }
  - slug: categories
    fields:
      label: { type: text, required: true }
      meta: { type: json }
"#;

    #[test]
    fn test_generate_from_declarations_str() {
        let code = generate_from_declarations_str(DECLARATIONS).unwrap();

        assert!(code.starts_with("// @generated"));
        assert!(code.contains("pub struct Post {"));
        assert!(code.contains("pub struct PostPartial {"));
        assert!(code.contains("pub struct Category {"));
        assert!(code.contains("pub r#type: Option<String>"));
        assert!(code.contains("pub location: Option<serde_json::Value>"));
        assert!(code.contains("pub trait DbExt"));
        assert!(code.contains("fn categories(&self)"));
    }

    #[test]
    fn test_generated_code_parses() {
        let code = generate_from_declarations_str(DECLARATIONS).unwrap();
        let file = syn::parse_file(&code).unwrap();
        // use + 2 structs per collection + trait + impl
        assert_eq!(file.items.len(), 7);
    }

    #[test]
    fn test_output_is_deterministic() {
        let first = generate_from_declarations_str(DECLARATIONS).unwrap();
        let second = generate_from_declarations_str(DECLARATIONS).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_slugs_are_rejected() {
        let yaml = "collections:\n  - slug: posts\n  - slug: posts\n";
        assert!(generate_from_declarations_str(yaml).is_err());
    }

    #[test]
    fn test_types_generator_in_regenerator() {
        let tmp = TempDir::new().unwrap();
        let decl = tmp.path().join("collections.yaml");
        std::fs::write(&decl, DECLARATIONS).unwrap();
        let out = tmp.path().join("generated");

        let changed = Regenerator::new(&decl, &out)
            .with_generator(TypesGenerator)
            .regenerate()
            .unwrap();

        assert_eq!(changed.len(), 3);
        let types = std::fs::read_to_string(out.join(TYPES_RS)).unwrap();
        assert!(types.contains("pub struct Post {"));
    }

    #[test]
    fn test_unusable_names_are_errors() {
        for yaml in [
            "collections:\n  - slug: s\n",
            "collections:\n  - slug: _\n",
            "collections:\n  - slug: posts\n    fields:\n      2fa: { type: boolean }\n",
        ] {
            assert!(generate_from_declarations_str(yaml).is_err(), "{yaml}");
        }
    }

    #[test]
    fn test_types_generator_failure_keeps_previous_artifacts() {
        let tmp = TempDir::new().unwrap();
        let decl = tmp.path().join("collections.yaml");
        let out = tmp.path().join("generated");
        let regen = Regenerator::new(&decl, &out).with_generator(TypesGenerator);

        std::fs::write(&decl, FIXTURE_DECLARATIONS).unwrap();
        regen.regenerate().unwrap();
        let before = std::fs::read_to_string(out.join(SCHEMA_SQL)).unwrap();

        std::fs::write(&decl, "collections:\n  - slug: s\n").unwrap();
        let err = regen.regenerate().unwrap_err();
        assert!(matches!(err, DeesseError::Regeneration(_)));
        assert!(err.to_string().contains("types generator failed"));
        assert_eq!(std::fs::read_to_string(out.join(SCHEMA_SQL)).unwrap(), before);
    }

    fn normalize(code: &str) -> String {
        prettyplease::unparse(&syn::parse_file(code).unwrap())
    }

    #[test]
    fn test_fixture_matches_generator_output() {
        let code = generate_from_declarations_str(FIXTURE_DECLARATIONS).unwrap();
        let fixture = include_str!("../tests/fixtures/posts_types.rs");
        assert_eq!(normalize(&code), normalize(fixture));
    }

    #[test]
    fn test_generated_types_round_trip_records() {
        let record = json!({
            "title": "Hello",
            "publishedAt": "2024-05-01T12:00:00Z",
            "id": "01HXAMPLE0000000000000000",
            "createdAt": "2024-05-01T12:00:00Z",
            "updatedAt": "2024-05-02T08:30:00Z",
        });

        let post: fixture::Post = serde_json::from_value(record).unwrap();
        assert_eq!(post.title, "Hello");
        assert_eq!(post.views, None);
        assert_eq!(
            post.created_at,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(post.published_at, Some(post.created_at));

        let value = serde_json::to_value(&post).unwrap();
        assert!(value.get("views").is_none());
        assert!(value.get("updatedAt").is_some());
        let again: fixture::Post = serde_json::from_value(value).unwrap();
        assert_eq!(again, post);

        let partial = fixture::PostPartial {
            views: Some(3),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&partial).unwrap(), json!({ "views": 3 }));
        let partial: fixture::PostPartial =
            serde_json::from_value(json!({ "title": "Renamed" })).unwrap();
        assert_eq!(partial.title.as_deref(), Some("Renamed"));
        assert_eq!(partial.published_at, None);
    }
}
