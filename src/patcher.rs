use std::borrow::Cow;
use std::fmt;
use thiserror::Error;
use tracing::{debug, trace};

/// A single recorded edit: replace `length` bytes of the original input at
/// `offset` with `data`.
///
/// Offsets and lengths are signed and stored exactly as the caller supplied
/// them. They are only checked against an input when the owning [`Patcher`]
/// is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch<'a> {
    /// Byte position in the original input
    offset: i64,
    /// Number of original bytes consumed (not `data.len()`)
    length: i64,
    /// Bytes written in place of the consumed span
    data: Cow<'a, [u8]>,
}

impl<'a> Patch<'a> {
    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn length(&self) -> i64 {
        self.length
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// End of the consumed span, or `None` if `offset + length` overflows.
    fn end(&self) -> Option<i64> {
        self.offset.checked_add(self.length)
    }

    /// Detach the record from any borrowed replacement bytes.
    pub fn into_owned(self) -> Patch<'static> {
        Patch {
            offset: self.offset,
            length: self.length,
            data: Cow::Owned(self.data.into_owned()),
        }
    }
}

impl fmt::Display for Patch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{},{})",
            self.offset,
            self.length,
            String::from_utf8_lossy(&self.data)
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("negative offset: {patch}")]
    NegativeOffset { patch: Patch<'static> },

    #[error("negative length: {patch}")]
    NegativeLength { patch: Patch<'static> },

    #[error("out of range: {patch} exceeds input of length {input_len}")]
    OutOfRange {
        patch: Patch<'static>,
        input_len: usize,
    },

    #[error("conflict: {first} vs {second}")]
    Conflict {
        first: Patch<'static>,
        second: Patch<'static>,
    },

    #[error("patched output is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Records edits against a not-yet-provided input and applies them later.
///
/// All offsets are relative to the original, unmodified input, so recording
/// order never shifts positions. Multiple inserts at the same offset are
/// emitted in the order they were recorded.
///
/// Edits are ordered by offset alone, so recording order also matters when an
/// insert shares its offset with a delete or rewrite: an insert recorded
/// first lands in front of the consumed span, while one recorded after it
/// falls inside that span and is reported as a conflict.
///
/// Replacement bytes passed as a slice are borrowed for `'a` rather than
/// copied; pass a `Vec<u8>` to hand the patcher its own copy.
///
/// # Example
///
/// ```
/// use span_patcher::Patcher;
///
/// let input = "The brown fox jumps twice over the lazy horse";
/// let mut patcher = Patcher::new();
/// patcher.insert_str(3, " quick");
/// patcher.delete(20, 6);
/// patcher.rewrite_str(40, 5, "dog");
///
/// let output = patcher.apply_str(input).unwrap();
/// assert_eq!(output, "The quick brown fox jumps over the lazy dog");
/// ```
#[derive(Debug, Default)]
pub struct Patcher<'a> {
    patches: Vec<Patch<'a>>,
}

impl<'a> Patcher<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no edits are recorded.
    ///
    /// Zero-length operations never create an edit, so a patcher that only
    /// saw no-ops is still empty.
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    /// Recorded edits in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Patch<'a>> + '_ {
        self.patches.iter()
    }

    /// Remove all recorded edits.
    pub fn reset(&mut self) {
        self.patches.clear();
    }

    /// Remove `length` bytes at `offset`.
    pub fn delete(&mut self, offset: i64, length: i64) {
        if length != 0 {
            self.patches.push(Patch {
                offset,
                length,
                data: Cow::Borrowed(&[]),
            });
        }
    }

    /// Insert `data` at `offset`.
    ///
    /// Inserts at the same offset are concatenated in call order. An insert
    /// that shares its offset with a delete or rewrite must be recorded
    /// before it; recorded after, the pair conflicts.
    pub fn insert(&mut self, offset: i64, data: impl Into<Cow<'a, [u8]>>) {
        let data = data.into();
        if !data.is_empty() {
            self.patches.push(Patch {
                offset,
                length: 0,
                data,
            });
        }
    }

    pub fn insert_str(&mut self, offset: i64, text: &'a str) {
        self.insert(offset, text.as_bytes());
    }

    /// Replace `length` bytes at `offset` with `data`.
    pub fn rewrite(&mut self, offset: i64, length: i64, data: impl Into<Cow<'a, [u8]>>) {
        let data = data.into();
        if length != 0 || !data.is_empty() {
            self.patches.push(Patch {
                offset,
                length,
                data,
            });
        }
    }

    pub fn rewrite_str(&mut self, offset: i64, length: i64, text: &'a str) {
        self.rewrite(offset, length, text.as_bytes());
    }

    /// Validate the recorded edits against an input of `input_len` bytes
    /// without producing any output.
    pub fn check(&self, input_len: usize) -> Result<(), PatchError> {
        debug!(edits = self.patches.len(), input_len, "checking patches");
        validate(&self.sorted(), input_len)
    }

    /// Apply the recorded edits to `input`, returning the patched copy.
    ///
    /// The edits stay recorded and can be applied to other inputs. An error
    /// names the offending edits as `(<offset>,<length>,<data>)`, e.g.
    /// `(10,5,)` for `delete(10, 5)` and `(5,0,foo)` for `insert_str(5, "foo")`.
    pub fn apply(&self, input: &[u8]) -> Result<Vec<u8>, PatchError> {
        debug!(
            edits = self.patches.len(),
            input_len = input.len(),
            "applying patches"
        );

        let sorted = self.sorted();
        validate(&sorted, input.len())?;

        // Every offset and end was bounded by input.len() during validation.
        let capacity = sorted.iter().fold(input.len(), |acc, patch| {
            acc + patch.data.len() - patch.length as usize
        });
        let mut output = Vec::with_capacity(capacity);
        let mut cursor = 0usize;
        for patch in sorted {
            let start = patch.offset as usize;
            trace!(%patch, cursor, "materializing patch");
            output.extend_from_slice(&input[cursor..start]);
            output.extend_from_slice(&patch.data);
            cursor = start + patch.length as usize;
        }
        output.extend_from_slice(&input[cursor..]);

        Ok(output)
    }

    /// Text flavour of [`Patcher::apply`]. Offsets remain byte offsets.
    pub fn apply_str(&self, input: &str) -> Result<String, PatchError> {
        let output = self.apply(input.as_bytes())?;
        Ok(String::from_utf8(output)?)
    }

    /// Recorded edits ordered by offset. The sort is stable so edits sharing
    /// an offset keep their recording order.
    fn sorted(&self) -> Vec<&Patch<'a>> {
        let mut sorted: Vec<&Patch<'a>> = self.patches.iter().collect();
        sorted.sort_by_key(|patch| patch.offset);
        sorted
    }
}

/// Check sorted edits in order, stopping at the first failure.
fn validate(sorted: &[&Patch<'_>], input_len: usize) -> Result<(), PatchError> {
    let limit = i64::try_from(input_len).unwrap_or(i64::MAX);

    let result = sorted.iter().enumerate().try_for_each(|(i, patch)| {
        if patch.offset < 0 {
            return Err(PatchError::NegativeOffset {
                patch: (*patch).clone().into_owned(),
            });
        }
        if patch.length < 0 {
            return Err(PatchError::NegativeLength {
                patch: (*patch).clone().into_owned(),
            });
        }
        let end = match patch.end() {
            Some(end) if end <= limit => end,
            _ => {
                return Err(PatchError::OutOfRange {
                    patch: (*patch).clone().into_owned(),
                    input_len,
                })
            }
        };
        if let Some(next) = sorted.get(i + 1) {
            if end > next.offset {
                return Err(PatchError::Conflict {
                    first: (*patch).clone().into_owned(),
                    second: (*next).clone().into_owned(),
                });
            }
        }
        Ok(())
    });

    if let Err(err) = &result {
        debug!(%err, "patch validation failed");
    }
    result
}
