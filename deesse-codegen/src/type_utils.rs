use deesse::collection::{is_system_field, ID_FIELD};
use deesse::field::{Field, FieldKind};
use deesse::DeesseError;
use heck::{ToPascalCase, ToSnakeCase};
use proc_macro2::TokenStream;
use quote::quote;

/// Convert a collection slug to its singular PascalCase struct name.
/// e.g. "users" -> "User", "blog_posts" -> "BlogPost"
pub fn collection_struct_name(slug: &str) -> String {
    singularize(slug).to_pascal_case()
}

/// Generate a partial struct name.
/// e.g. "User" -> "UserPartial"
pub fn partial_struct_name(struct_name: &str) -> String {
    format!("{}Partial", struct_name)
}

/// Map a field to its Rust type as a TokenStream.
///
/// Nullable user fields are wrapped in `Option`; system fields are always
/// present on a stored record.
pub fn field_to_rust_type(field_name: &str, field: &Field) -> TokenStream {
    let base_type = field_base_type(field_name, field);
    if field.can_be_null() && !is_system_field(field_name) {
        quote! { Option<#base_type> }
    } else {
        base_type
    }
}

/// Get the base Rust type (without Option wrapping) for a field.
pub fn field_base_type(field_name: &str, field: &Field) -> TokenStream {
    // Providers assign string ids whatever the declared kind
    if field_name == ID_FIELD {
        return quote! { String };
    }

    match field.kind() {
        FieldKind::Integer | FieldKind::Serial => quote! { i64 },
        FieldKind::Boolean => quote! { bool },
        FieldKind::Text | FieldKind::Varchar | FieldKind::Char | FieldKind::Uuid => {
            quote! { String }
        }
        FieldKind::Numeric | FieldKind::Decimal => quote! { f64 },
        FieldKind::Timestamp => quote! { chrono::DateTime<chrono::Utc> },
        // Fallback to serde_json::Value for json and unknown kinds
        FieldKind::Json | FieldKind::Custom(_) => quote! { serde_json::Value },
    }
}

/// Naive singularization of English words.
pub fn singularize(word: &str) -> String {
    let w = word.to_lowercase();
    if w.ends_with("ies") {
        format!("{}y", &w[..w.len() - 3])
    } else if w.ends_with("ses") || w.ends_with("xes") || w.ends_with("zes") {
        w[..w.len() - 2].to_string()
    } else if w.ends_with("ves") {
        format!("{}f", &w[..w.len() - 3])
    } else if w.ends_with('s') && !w.ends_with("ss") {
        w[..w.len() - 1].to_string()
    } else {
        w
    }
}

/// Parse `name` as a Rust identifier, falling back to raw identifier syntax
/// for keywords. Names that are neither (empty, `_`, `self`, leading digits)
/// are an error.
pub fn rust_ident(name: &str) -> deesse::Result<proc_macro2::Ident> {
    syn::parse_str::<proc_macro2::Ident>(name)
        .or_else(|_| syn::parse_str::<proc_macro2::Ident>(&format!("r#{name}")))
        .map_err(|_| {
            DeesseError::Regeneration(format!("'{name}' is not a valid Rust identifier"))
        })
}

/// A snake_case identifier for a field or slug.
pub fn safe_ident(name: &str) -> deesse::Result<proc_macro2::Ident> {
    rust_ident(&name.to_snake_case())
}

/// The record struct identifier for a collection slug.
pub fn struct_ident(slug: &str) -> deesse::Result<proc_macro2::Ident> {
    rust_ident(&collection_struct_name(slug)).map_err(|e| {
        DeesseError::Regeneration(format!("Collection '{slug}' has no usable struct name: {e}"))
    })
}

/// Whether a generated identifier needs `#[serde(rename)]` to match `name`.
pub fn needs_rename(ident: &proc_macro2::Ident, name: &str) -> bool {
    let ident = ident.to_string();
    ident.strip_prefix("r#").unwrap_or(&ident) != name
}

#[cfg(test)]
mod tests {
    use super::*;
    use deesse::field::{integer, text, timestamp, FieldParams};

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("users"), "user");
        assert_eq!(singularize("posts"), "post");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("addresses"), "address");
    }

    #[test]
    fn test_collection_struct_name() {
        assert_eq!(collection_struct_name("posts"), "Post");
        assert_eq!(collection_struct_name("blog_posts"), "BlogPost");
        assert_eq!(partial_struct_name("Post"), "PostPartial");
    }

    #[test]
    fn test_safe_ident() {
        assert_eq!(safe_ident("type").unwrap().to_string(), "r#type");
        assert_eq!(safe_ident("createdAt").unwrap().to_string(), "created_at");
        assert_eq!(safe_ident("title").unwrap().to_string(), "title");

        assert!(needs_rename(&safe_ident("createdAt").unwrap(), "createdAt"));
        assert!(!needs_rename(&safe_ident("type").unwrap(), "type"));
        assert!(!needs_rename(&safe_ident("title").unwrap(), "title"));
    }

    #[test]
    fn test_invalid_identifiers_are_errors() {
        for name in ["", "_", "2fa", "self", "crate"] {
            assert!(
                matches!(safe_ident(name), Err(DeesseError::Regeneration(_))),
                "{name:?}"
            );
        }
        // "s" singularizes to an empty name, "_s" to "_"
        assert!(struct_ident("s").is_err());
        assert!(struct_ident("_s").is_err());
        assert!(struct_ident("_").is_err());
        assert_eq!(struct_ident("_drafts").unwrap().to_string(), "Draft");
    }

    #[test]
    fn test_field_types() {
        let title = text(FieldParams::new()).unwrap();
        assert_eq!(
            field_to_rust_type("title", &title).to_string(),
            "Option < String >"
        );
        assert_eq!(
            field_to_rust_type("title", &title.required()).to_string(),
            "String"
        );
        assert_eq!(
            field_to_rust_type("views", &integer(FieldParams::new()).unwrap().required())
                .to_string(),
            "i64"
        );
        assert_eq!(
            field_to_rust_type("createdAt", &timestamp()).to_string(),
            "chrono :: DateTime < chrono :: Utc >"
        );
        assert_eq!(
            field_to_rust_type("id", &deesse::field::serial()).to_string(),
            "String"
        );
    }
}
