pub mod error;
pub mod permissions;
pub mod field;
pub mod hooks;
pub mod collection;
pub mod schema;
pub mod validation;
pub mod provider;
pub mod orchestrator;
pub mod config;
pub mod compiler;
pub mod artifact;
pub mod watcher;

pub use collection::{collection, Collection, CollectionConfig};
pub use config::{CollectionApi, Config, Db};
pub use error::{DeesseError, ErrorKind, Result};
pub use field::{Field, FieldKind, FieldParams};
pub use hooks::CollectionHooks;
pub use permissions::{Action, Context, PermissionSet};
pub use provider::{MemoryProvider, Provider, Record, SqliteProvider};
pub use watcher::{Generator, Regenerator};
