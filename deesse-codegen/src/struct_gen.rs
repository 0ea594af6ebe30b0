use deesse::collection::{is_system_field, Collection};
use deesse::field::Field;
use deesse::DeesseError;
use proc_macro2::TokenStream;
use quote::quote;
use std::collections::HashMap;

use crate::type_utils::{
    field_base_type, field_to_rust_type, needs_rename, partial_struct_name, rust_ident,
    safe_ident, struct_ident,
};

/// Generate record structs and partial structs for all collections.
pub fn generate_structs(collections: &[Collection]) -> deesse::Result<TokenStream> {
    let mut tokens = TokenStream::new();
    for collection in collections {
        check_field_idents(collection)?;
        tokens.extend(generate_collection_struct(collection)?);
        tokens.extend(generate_partial_struct(collection)?);
    }
    Ok(tokens)
}

/// Field names that snake-case to the same identifier would produce a
/// struct with duplicate fields.
fn check_field_idents(collection: &Collection) -> deesse::Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for name in collection.fields().names() {
        let ident = safe_ident(name).map_err(|e| {
            DeesseError::Regeneration(format!("Collection '{}': {e}", collection.slug()))
        })?;
        if let Some(previous) = seen.insert(ident.to_string(), name) {
            return Err(DeesseError::Regeneration(format!(
                "Collection '{}': fields '{previous}' and '{name}' both generate `{ident}`",
                collection.slug()
            )));
        }
    }
    Ok(())
}

/// Generate a record struct for a collection, fields in declaration order.
fn generate_collection_struct(collection: &Collection) -> deesse::Result<TokenStream> {
    let struct_ident = struct_ident(collection.slug())?;
    let doc_comment = format!(" A record in the `{}` collection.", collection.slug());

    let field_tokens = collection
        .fields()
        .iter()
        .map(|(field_name, field)| generate_field_with_attrs(field_name, field))
        .collect::<deesse::Result<Vec<_>>>()?;

    Ok(quote! {
        #[doc = #doc_comment]
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct #struct_ident {
            #(#field_tokens)*
        }
    })
}

/// Generate a partial struct for creates and updates. System fields are
/// assigned by the provider and left out.
fn generate_partial_struct(collection: &Collection) -> deesse::Result<TokenStream> {
    let base_name = struct_ident(collection.slug())?.to_string();
    let partial_ident = rust_ident(&partial_struct_name(&base_name))?;

    let field_tokens = collection
        .fields()
        .iter()
        .filter(|(name, _)| !is_system_field(name))
        .map(|(field_name, field)| -> deesse::Result<TokenStream> {
            let ident = safe_ident(field_name)?;
            let base_ty = field_base_type(field_name, field);
            let serde_attr = if needs_rename(&ident, field_name) {
                quote! {
                    #[serde(rename = #field_name, default, skip_serializing_if = "Option::is_none")]
                }
            } else {
                quote! { #[serde(default, skip_serializing_if = "Option::is_none")] }
            };
            Ok(quote! {
                #serde_attr
                pub #ident: Option<#base_ty>,
            })
        })
        .collect::<deesse::Result<Vec<_>>>()?;

    Ok(quote! {
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct #partial_ident {
            #(#field_tokens)*
        }
    })
}

/// Generate a struct field with appropriate serde attributes.
fn generate_field_with_attrs(field_name: &str, field: &Field) -> deesse::Result<TokenStream> {
    let ident = safe_ident(field_name)?;
    let ty = field_to_rust_type(field_name, field);

    let rename_attr = if needs_rename(&ident, field_name) {
        Some(quote! { #[serde(rename = #field_name)] })
    } else {
        None
    };
    // Optional fields may be absent from stored records
    let optional_attr = if field.can_be_null() && !is_system_field(field_name) {
        Some(quote! { #[serde(default, skip_serializing_if = "Option::is_none")] })
    } else {
        None
    };

    Ok(quote! {
        #rename_attr
        #optional_attr
        pub #ident: #ty,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use deesse::collection::{collection, CollectionConfig};
    use deesse::field::{text, FieldParams};

    fn posts() -> Collection {
        collection(
            CollectionConfig::new("posts")
                .field("title", text(FieldParams::new()).unwrap().required())
                .field("content", text(FieldParams::new()).unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn test_generate_collection_struct() {
        let code = generate_collection_struct(&posts()).unwrap().to_string();

        assert!(code.contains("pub struct Post"));
        assert!(code.contains("pub title : String"));
        assert!(code.contains("pub content : Option < String >"));
        assert!(code.contains("pub id : String"));
        assert!(code.contains("# [serde (rename = \"createdAt\")] pub created_at"));
    }

    #[test]
    fn test_generate_partial_struct() {
        let code = generate_partial_struct(&posts()).unwrap().to_string();

        assert!(code.contains("pub struct PostPartial"));
        assert!(code.contains("pub title : Option < String >"));
        assert!(!code.contains("created_at"));
        assert!(!code.contains("pub id"));
    }

    #[test]
    fn test_unusable_slug_is_an_error() {
        for slug in ["s", "_"] {
            let col = collection(CollectionConfig::new(slug)).unwrap();
            let err = generate_structs(&[col]).unwrap_err();
            assert!(matches!(err, DeesseError::Regeneration(_)), "{slug:?}");
        }
    }

    #[test]
    fn test_colliding_field_names_are_an_error() {
        let col = collection(
            CollectionConfig::new("posts")
                .field("authorName", text(FieldParams::new()).unwrap())
                .field("author_name", text(FieldParams::new()).unwrap()),
        )
        .unwrap();
        let err = generate_structs(&[col]).unwrap_err();
        assert!(err.to_string().contains("both generate `author_name`"));
    }
}
