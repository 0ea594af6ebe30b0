use deesse::collection::Collection;
use deesse::DeesseError;
use proc_macro2::TokenStream;
use quote::quote;
use std::collections::HashMap;

use crate::type_utils::safe_ident;

/// Method name taken by the trait itself.
const DB_METHOD: &str = "db";

/// Generate the DbExt trait with one accessor per collection.
///
/// Slugs that snake-case to the same method, or to `db`, are an error.
pub fn generate_db_ext(collections: &[Collection]) -> deesse::Result<TokenStream> {
    let mut trait_methods = Vec::new();
    let mut impl_methods = Vec::new();
    let mut seen: HashMap<String, &str> = HashMap::new();

    for collection in collections {
        let slug = collection.slug();
        let method_ident = safe_ident(slug)?;
        let method_name = method_ident.to_string();
        if method_name == DB_METHOD {
            return Err(DeesseError::Regeneration(format!(
                "Collection '{slug}' generates the reserved accessor `{DB_METHOD}`"
            )));
        }
        if let Some(previous) = seen.insert(method_name, slug) {
            return Err(DeesseError::Regeneration(format!(
                "Collections '{previous}' and '{slug}' both generate the accessor `{method_ident}`"
            )));
        }
        let doc = format!(" Handle to the `{slug}` collection.");

        trait_methods.push(quote! {
            #[doc = #doc]
            fn #method_ident(&self) -> deesse::Result<deesse::CollectionApi<'_>>;
        });

        impl_methods.push(quote! {
            fn #method_ident(&self) -> deesse::Result<deesse::CollectionApi<'_>> {
                self.db().collection(#slug)
            }
        });
    }

    Ok(quote! {
        /// Extension trait providing typed collection accessors.
        pub trait DbExt {
            fn db(&self) -> &deesse::Db;

            #(#trait_methods)*
        }

        impl DbExt for deesse::Db {
            fn db(&self) -> &deesse::Db {
                self
            }

            #(#impl_methods)*
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use deesse::collection::{collection, CollectionConfig};

    #[test]
    fn test_generate_db_ext_basic() {
        let collections = vec![
            collection(CollectionConfig::new("posts")).unwrap(),
            collection(CollectionConfig::new("blogAuthors")).unwrap(),
        ];

        let code = generate_db_ext(&collections).unwrap().to_string();

        assert!(code.contains("DbExt"));
        assert!(code.contains("fn posts"));
        assert!(code.contains("fn blog_authors"));
        assert!(code.contains("collection (\"blogAuthors\")"));
    }

    #[test]
    fn test_colliding_accessors_are_rejected() {
        let collections = vec![
            collection(CollectionConfig::new("blogPosts")).unwrap(),
            collection(CollectionConfig::new("blog_posts")).unwrap(),
        ];
        let err = generate_db_ext(&collections).unwrap_err();
        assert!(err.to_string().contains("both generate the accessor `blog_posts`"));

        let reserved = vec![collection(CollectionConfig::new("db")).unwrap()];
        assert!(matches!(
            generate_db_ext(&reserved),
            Err(DeesseError::Regeneration(_))
        ));
    }
}
