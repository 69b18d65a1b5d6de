//! Span Patcher: record positional byte edits and apply them later
//!
//! Edits (deletions, insertions, rewrites) are recorded against an input that
//! has not been provided yet. Every offset refers to the original, unmodified
//! input, so callers never adjust positions as earlier edits shift content.
//!
//! # Architecture
//!
//! All operations compile down to a single record, [`Patch`]: an offset, the
//! number of original bytes it consumes, and the bytes written in their place.
//! [`Patcher::apply`] sorts the records by offset (stable, so same-offset
//! inserts keep call order), rejects negative or out-of-range spans and
//! overlapping edits, then stitches the output together in one pass.
//!
//! Validation is deferred to apply time, so one patcher can be applied to
//! several inputs of different lengths.
//!
//! # Example
//!
//! ```
//! use span_patcher::{PatchError, Patcher};
//!
//! let mut patcher = Patcher::new();
//! patcher.delete(1, 3);
//! patcher.delete(2, 1);
//!
//! match patcher.apply_str("abcde") {
//!     Err(PatchError::Conflict { first, second }) => {
//!         assert_eq!(first.to_string(), "(1,3,)");
//!         assert_eq!(second.to_string(), "(2,1,)");
//!     }
//!     other => panic!("expected conflict: {other:?}"),
//! }
//! ```

pub mod output;
pub mod patcher;
pub mod script;

// Re-exports
pub use output::{write_atomic, OutputError};
pub use patcher::{Patch, PatchError, Patcher};
pub use script::{
    load_from_path, load_from_str, EditDefinition, EditScript, GuardError, Metadata, ScriptError,
};
