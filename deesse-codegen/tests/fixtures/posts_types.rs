// @generated by deesse-codegen. Do not edit by hand.

use serde::{Deserialize, Serialize};
/// A record in the `posts` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<i64>,
    #[serde(rename = "publishedAt")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,
    pub id: String,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostPartial {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<i64>,
    #[serde(rename = "publishedAt", default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,
}
/// Extension trait providing typed collection accessors.
pub trait DbExt {
    fn db(&self) -> &deesse::Db;
    /// Handle to the `posts` collection.
    fn posts(&self) -> deesse::Result<deesse::CollectionApi<'_>>;
}
impl DbExt for deesse::Db {
    fn db(&self) -> &deesse::Db {
        self
    }
    fn posts(&self) -> deesse::Result<deesse::CollectionApi<'_>> {
        self.db().collection("posts")
    }
}
