//! Error types for the liquid2jinja library.
//!
//! The conversion core ([`crate::convert::convert`], [`crate::convert::render`],
//! [`crate::pipeline::preprocess::preprocess`]) is total: it never fails, and
//! unrecognised Liquid is passed through as literal text. Errors only exist
//! around it, where files are read and written or a caller opts into strict
//! checking:
//!
//! * [`Liquid2JinjaError`] — **Fatal**: the requested operation cannot
//!   proceed (unreadable input, unwritable output, rejected configuration,
//!   strict-mode violation).
//!
//! * [`FileError`] — **Non-fatal**: one file in a batch failed while the
//!   others converted fine. Stored inside [`crate::output::FileResult`] so a
//!   batch run reports partial success instead of aborting on the first bad
//!   file.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the liquid2jinja library.
///
/// Per-file failures inside a batch use [`FileError`] and are stored in
/// [`crate::output::FileResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Liquid2JinjaError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input template was not found at the given path.
    #[error("Template not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Reading the template failed for another I/O reason.
    #[error("Failed to read template '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was read but is not valid UTF-8 text.
    #[error("Template '{path}' is not valid UTF-8")]
    NotUtf8 { path: PathBuf },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the converted template.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Substitution JSON was rejected. Only raised in strict mode; the
    /// default policy silently ignores malformed substitutions.
    #[error("Invalid substitutions JSON: {reason}")]
    InvalidSubstitutions { reason: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Strict mode ───────────────────────────────────────────────────────
    /// Strict mode is on and the converted template still contains
    /// constructs the pipeline could not translate.
    #[error("Strict mode: {count} unconverted construct(s) remain.\nFirst: {first}")]
    StrictModeViolation { count: usize, first: String },

    // ── Batch errors ──────────────────────────────────────────────────────
    /// Every file in a batch failed.
    #[error("All {total} templates failed.\nFirst error: {first_error}")]
    AllFilesFailed { total: usize, first_error: String },
}

impl Liquid2JinjaError {
    /// Map an I/O error raised while reading `path` onto the matching variant.
    pub(crate) fn from_read(path: PathBuf, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Liquid2JinjaError::FileNotFound { path },
            std::io::ErrorKind::PermissionDenied => Liquid2JinjaError::PermissionDenied { path },
            std::io::ErrorKind::InvalidData => Liquid2JinjaError::NotUtf8 { path },
            _ => Liquid2JinjaError::ReadFailed { path, source },
        }
    }
}

/// A non-fatal error for a single file in a batch.
///
/// Stored alongside [`crate::output::FileResult`] when a file fails.
/// The batch continues unless ALL files fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum FileError {
    /// The template could not be read.
    #[error("{path}: read failed: {detail}")]
    ReadFailed { path: PathBuf, detail: String },

    /// The converted template could not be written.
    #[error("{path}: write failed: {detail}")]
    WriteFailed { path: PathBuf, detail: String },

    /// Strict mode rejected the converted output.
    #[error("{path}: {count} unconverted construct(s), first: {first}")]
    Unconverted {
        path: PathBuf,
        count: usize,
        first: String,
    },
}
