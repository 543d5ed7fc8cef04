// ============================================================================
// ERROR.RS - Library Error Types
// ============================================================================
//
// Two error kinds live here:
// - LoadError: produced by the IT loader. Fail-fast: a malformed file
//   yields an error and no partial module.
// - ArgumentError: produced at API boundaries (mixer construction,
//   out-of-range voice/channel indices).
//
// Neither type derives from a macro crate (no thiserror) - both are
// plain structs/enums with a hand-written Display, the same shape as
// the teacher's own ParseError.
//
// The real-time render path (Mixer::render, render_voice) has no
// error channel at all: it cannot fail, by construction.
// ============================================================================

use std::fmt;

/// Where in the packed pattern stream a format error was detected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorLocation {
    /// Index of the pattern being decoded, if the error happened inside one.
    pub pattern: Option<usize>,

    /// Byte offset within the pattern's packed stream (or the file, for
    /// header-level errors).
    pub offset: usize,
}

impl ErrorLocation {
    pub fn header() -> Self {
        Self { pattern: None, offset: 0 }
    }

    pub fn in_pattern(pattern: usize, offset: usize) -> Self {
        Self { pattern: Some(pattern), offset }
    }
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pattern {
            Some(p) => write!(f, "pattern {} at byte {}", p, self.offset),
            None => write!(f, "byte {}", self.offset),
        }
    }
}

/// Errors produced while loading an IT module.
#[derive(Debug)]
pub enum LoadError {
    /// The underlying reader failed (short read, missing file, ...).
    Io(std::io::Error),

    /// The file's first four bytes aren't `"IMPM"` - this isn't an IT
    /// module at all, a distinct failure from a truncated or otherwise
    /// malformed one (spec.md 4.3: "the impm tag MUST equal IMPM;
    /// otherwise signal 'not an IT file'").
    BadMagic,

    /// The container is structurally invalid: a `packed_data_length`
    /// that would read past the declared bound, an offset table entry
    /// pointing outside the file, a truncated header field, and so on.
    Format { location: ErrorLocation, message: String },
}

impl LoadError {
    pub fn format(location: ErrorLocation, message: impl Into<String>) -> Self {
        LoadError::Format { location, message: message.into() }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "IO error loading module: {}", e),
            LoadError::BadMagic => write!(f, "not an IT file: missing \"IMPM\" magic"),
            LoadError::Format { location, message } => {
                write!(f, "format error at {}: {}", location, message)
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            LoadError::BadMagic | LoadError::Format { .. } => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e)
    }
}

/// Errors produced at API boundaries outside the loader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgumentError {
    pub message: String,
}

impl ArgumentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ArgumentError {}
