use crate::patcher::Patcher;
use serde::Deserialize;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EditScript {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub edits: Vec<EditDefinition>,
}

impl EditScript {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.edits.is_empty() {
            issues.push(ValidationIssue::EmptyEditList);
        }

        if let Some(hash) = &self.meta.input_hash {
            if parse_hash(hash).is_none() {
                issues.push(ValidationIssue::InvalidHash { value: hash.clone() });
            }
        }

        for (index, edit) in self.edits.iter().enumerate() {
            if edit.is_noop() {
                issues.push(ValidationIssue::NoOp {
                    index,
                    op: edit.op_name(),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Record every edit into `patcher` in file order.
    ///
    /// Replacement text is borrowed from the script, so the script must
    /// outlive the patcher's use of it.
    pub fn record<'a>(&'a self, patcher: &mut Patcher<'a>) {
        for edit in &self.edits {
            match edit {
                EditDefinition::Delete { offset, length } => patcher.delete(*offset, *length),
                EditDefinition::Insert { offset, text } => patcher.insert_str(*offset, text),
                EditDefinition::Rewrite {
                    offset,
                    length,
                    text,
                } => patcher.rewrite_str(*offset, *length, text),
            }
        }
    }

    /// Build a fresh patcher holding this script's edits.
    pub fn to_patcher(&self) -> Patcher<'_> {
        let mut patcher = Patcher::new();
        self.record(&mut patcher);
        patcher
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Exact byte length the input must have
    #[serde(default)]
    pub input_len: Option<usize>,
    /// xxh3-64 of the input, hex with optional `0x` or `0X` prefix
    #[serde(default)]
    pub input_hash: Option<String>,
}

impl Metadata {
    /// Check the optional input guards before the script is applied.
    pub fn verify_input(&self, input: &[u8]) -> Result<(), GuardError> {
        if let Some(expected) = self.input_len {
            if input.len() != expected {
                return Err(GuardError::LengthMismatch {
                    expected,
                    found: input.len(),
                });
            }
        }

        if let Some(value) = &self.input_hash {
            let expected = parse_hash(value).ok_or_else(|| GuardError::InvalidHash {
                value: value.clone(),
            })?;
            let found = xxh3_64(input);
            if found != expected {
                return Err(GuardError::HashMismatch { expected, found });
            }
        }

        Ok(())
    }
}

/// Hex digits with at most one `0x`/`0X` prefix. `from_str_radix` alone
/// would also take a leading `+`.
fn parse_hash(value: &str) -> Option<u64> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Hex rendering accepted by `input_hash`.
pub fn input_hash(input: &[u8]) -> String {
    format!("0x{:016x}", xxh3_64(input))
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditDefinition {
    Delete {
        offset: i64,
        length: i64,
    },
    Insert {
        offset: i64,
        text: String,
    },
    Rewrite {
        offset: i64,
        length: i64,
        #[serde(default)]
        text: String,
    },
}

impl EditDefinition {
    pub fn is_noop(&self) -> bool {
        match self {
            EditDefinition::Delete { length, .. } => *length == 0,
            EditDefinition::Insert { text, .. } => text.is_empty(),
            EditDefinition::Rewrite { length, text, .. } => *length == 0 && text.is_empty(),
        }
    }

    pub fn op_name(&self) -> &'static str {
        match self {
            EditDefinition::Delete { .. } => "delete",
            EditDefinition::Insert { .. } => "insert",
            EditDefinition::Rewrite { .. } => "rewrite",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("input length mismatch: expected {expected} bytes, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("input hash mismatch: expected 0x{expected:016x}, found 0x{found:016x}")]
    HashMismatch { expected: u64, found: u64 },

    #[error("invalid input hash '{value}'")]
    InvalidHash { value: String },
}

/// Every problem found in a script, reported together.
#[derive(Error, Debug, Clone)]
#[error("{}", join_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    #[error("edit script contains no edits")]
    EmptyEditList,

    #[error("edit #{index} ({op}) changes nothing")]
    NoOp { index: usize, op: &'static str },

    #[error("meta.input_hash '{value}' is not a hex xxh3 hash")]
    InvalidHash { value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(edits: Vec<EditDefinition>) -> EditScript {
        EditScript {
            meta: Metadata::default(),
            edits,
        }
    }

    #[test]
    fn test_validate_empty_script() {
        let err = script(Vec::new()).validate().unwrap_err();
        assert_eq!(err.issues, vec![ValidationIssue::EmptyEditList]);
    }

    #[test]
    fn test_validate_reports_every_noop() {
        let err = script(vec![
            EditDefinition::Delete {
                offset: 0,
                length: 0,
            },
            EditDefinition::Insert {
                offset: 1,
                text: "x".to_string(),
            },
            EditDefinition::Rewrite {
                offset: 2,
                length: 0,
                text: String::new(),
            },
        ])
        .validate()
        .unwrap_err();

        assert_eq!(
            err.issues,
            vec![
                ValidationIssue::NoOp {
                    index: 0,
                    op: "delete"
                },
                ValidationIssue::NoOp {
                    index: 2,
                    op: "rewrite"
                },
            ]
        );
    }

    #[test]
    fn test_validate_leaves_offsets_alone() {
        let result = script(vec![EditDefinition::Delete {
            offset: -4,
            length: -1,
        }])
        .validate();
        assert!(result.is_ok());
    }

    #[test]
    fn test_record_preserves_file_order() {
        let script = script(vec![
            EditDefinition::Insert {
                offset: 1,
                text: "b".to_string(),
            },
            EditDefinition::Insert {
                offset: 1,
                text: "c".to_string(),
            },
        ]);
        let patcher = script.to_patcher();
        assert_eq!(patcher.apply_str("ad").unwrap(), "abcd");
    }

    #[test]
    fn test_verify_input_length() {
        let meta = Metadata {
            input_len: Some(3),
            ..Metadata::default()
        };
        assert!(meta.verify_input(b"abc").is_ok());
        assert_eq!(
            meta.verify_input(b"ab"),
            Err(GuardError::LengthMismatch {
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn test_verify_input_hash() {
        let meta = Metadata {
            input_hash: Some(input_hash(b"hello")),
            ..Metadata::default()
        };
        assert!(meta.verify_input(b"hello").is_ok());
        assert!(matches!(
            meta.verify_input(b"world"),
            Err(GuardError::HashMismatch { .. })
        ));
    }

    #[test]
    fn test_parse_hash_prefixes() {
        assert_eq!(parse_hash("0x1f"), Some(0x1f));
        assert_eq!(parse_hash("0X1f"), Some(0x1f));
        assert_eq!(parse_hash("1F"), Some(0x1f));
    }

    #[test]
    fn test_parse_hash_rejects_malformed() {
        assert_eq!(parse_hash("0x0x1f"), None);
        assert_eq!(parse_hash("+1f"), None);
        assert_eq!(parse_hash("0x+1f"), None);
        assert_eq!(parse_hash("0x"), None);
        assert_eq!(parse_hash(""), None);
        assert_eq!(parse_hash("0x1_f"), None);
    }

    #[test]
    fn test_validate_flags_doubled_prefix() {
        let mut script = script(vec![EditDefinition::Delete {
            offset: 0,
            length: 1,
        }]);
        script.meta.input_hash = Some("0x0x1f".to_string());
        let err = script.validate().unwrap_err();
        assert_eq!(
            err.issues,
            vec![ValidationIssue::InvalidHash {
                value: "0x0x1f".to_string()
            }]
        );
    }

    #[test]
    fn test_validation_error_joins_issues() {
        let err = ValidationError {
            issues: vec![
                ValidationIssue::EmptyEditList,
                ValidationIssue::InvalidHash {
                    value: "+1f".to_string(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "edit script contains no edits; meta.input_hash '+1f' is not a hex xxh3 hash"
        );
    }

    #[test]
    fn test_hash_without_prefix() {
        let hash = format!("{:x}", xxh3_64(b"hello"));
        let meta = Metadata {
            input_hash: Some(hash),
            ..Metadata::default()
        };
        assert!(meta.verify_input(b"hello").is_ok());
    }
}
