use deesse::collection::Collection;
use deesse::DeesseError;
use proc_macro2::TokenStream;
use quote::quote;
use std::collections::HashMap;

use crate::store_gen::generate_db_ext;
use crate::struct_gen::generate_structs;
use crate::type_utils::{partial_struct_name, struct_ident};

const HEADER: &str = "// @generated by deesse-codegen. Do not edit by hand.\n\n";

/// Generate the complete types module for a collection list.
pub fn generate_all(collections: &[Collection]) -> deesse::Result<TokenStream> {
    check_type_names(collections)?;
    let structs = generate_structs(collections)?;
    let db_ext = generate_db_ext(collections)?;

    Ok(quote! {
        use serde::{Deserialize, Serialize};

        #structs

        #db_ext
    })
}

/// Every record and partial struct must get a distinct name, e.g. `posts`
/// and `post` would both produce `Post`.
fn check_type_names(collections: &[Collection]) -> deesse::Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for collection in collections {
        let slug = collection.slug();
        let record = struct_ident(slug)?.to_string();
        let partial = partial_struct_name(&record);
        for name in [record, partial] {
            if let Some(previous) = seen.insert(name.clone(), slug) {
                return Err(DeesseError::Regeneration(format!(
                    "Collections '{previous}' and '{slug}' both generate the type `{name}`"
                )));
            }
        }
    }
    Ok(())
}

/// Pretty-print generated tokens.
pub fn format_token_stream(tokens: &TokenStream) -> deesse::Result<String> {
    let file = syn::parse2::<syn::File>(tokens.clone()).map_err(|e| {
        DeesseError::Regeneration(format!("Generated code does not parse: {e}"))
    })?;
    Ok(format!("{HEADER}{}", prettyplease::unparse(&file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use deesse::collection::{collection, CollectionConfig};

    #[test]
    fn test_colliding_type_names_are_rejected() {
        let collections = vec![
            collection(CollectionConfig::new("posts")).unwrap(),
            collection(CollectionConfig::new("post")).unwrap(),
        ];
        let err = generate_all(&collections).unwrap_err();
        assert!(err.to_string().contains("both generate the type `Post`"));
    }

    #[test]
    fn test_partial_name_collision_is_rejected() {
        let collections = vec![
            collection(CollectionConfig::new("posts")).unwrap(),
            collection(CollectionConfig::new("post_partials")).unwrap(),
        ];
        assert!(generate_all(&collections).is_err());
    }

    #[test]
    fn test_format_rejects_unparseable_tokens() {
        let tokens = quote! { pub struct };
        assert!(matches!(
            format_token_stream(&tokens),
            Err(DeesseError::Regeneration(_))
        ));
    }
}
