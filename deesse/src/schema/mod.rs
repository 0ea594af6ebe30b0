pub mod parser;
pub mod types;

pub use parser::{declaration_files, load_collections, parse_schema, parse_schema_str};
pub use types::*;
