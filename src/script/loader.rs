use crate::script::schema::{EditScript, ValidationError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("cannot read edit script {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("edit script{} is not valid TOML: {source}", origin(.path))]
    Toml {
        path: Option<PathBuf>,
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("edit script{} rejected: {source}", origin(.path))]
    Validation {
        path: Option<PathBuf>,
        #[source]
        source: ValidationError,
    },
}

fn origin(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|path| format!(" {}", path.display()))
        .unwrap_or_default()
}

/// Parse and validate a script; `path` only labels errors.
fn parse(input: &str, path: Option<&Path>) -> Result<EditScript, ScriptError> {
    let script: EditScript = toml_edit::de::from_str(input).map_err(|source| ScriptError::Toml {
        path: path.map(Path::to_path_buf),
        source,
    })?;
    script
        .validate()
        .map_err(|source| ScriptError::Validation {
            path: path.map(Path::to_path_buf),
            source,
        })?;
    tracing::debug!(
        name = %script.meta.name,
        edits = script.edits.len(),
        "loaded edit script"
    );
    Ok(script)
}

pub fn load_from_str(input: &str) -> Result<EditScript, ScriptError> {
    parse(input, None)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<EditScript, ScriptError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&contents, Some(path))
}
