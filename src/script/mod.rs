pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, ScriptError};
pub use schema::{
    input_hash, EditDefinition, EditScript, GuardError, Metadata, ValidationError,
    ValidationIssue,
};
