//! Named JSON Schema validation for message payloads.
//!
//! Schemas are compiled once, keyed by their declared identifier, and
//! validate payloads exhaustively. A schema that fails to compile is
//! quarantined so it never takes the rest of the set down with it.

pub mod config;
pub mod entry;
pub mod error;
pub mod loader;
pub mod registry;
mod strip;

pub use config::{CompileStrategy, SchemaConfig};
pub use entry::{SchemaEntry, ValidationError, ValidationResult};
pub use error::{Result, SchemaError};
pub use loader::load_schema_dir;
pub use registry::SchemaValidator;
