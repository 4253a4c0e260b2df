//! Result types returned by the conversion entry points.

use crate::error::FileError;
use crate::pipeline::diagnostics::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Output of [`crate::convert::convert_with_config`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The converted Jinja template.
    pub template: String,
    /// Non-fatal findings; empty when diagnostics are disabled.
    pub diagnostics: Vec<Diagnostic>,
    /// Per-run numbers.
    pub stats: ConversionStats,
}

/// Numbers describing one conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub input_bytes: usize,
    pub output_bytes: usize,
    /// Occurrences replaced by the preprocessor.
    pub substitutions_applied: usize,
    /// One entry per pass, in execution order.
    pub passes: Vec<PassStats>,
    /// Sum of `hits` over all passes.
    pub total_hits: usize,
    pub duration_us: u64,
}

/// How many spans one pass rewrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassStats {
    pub name: String,
    pub hits: usize,
}

/// Outcome for one file in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResult {
    pub input: PathBuf,
    /// Where the converted template was written; `None` on failure.
    pub output: Option<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
    /// Set when this file failed; the batch still continues.
    pub error: Option<FileError>,
}

/// Output of [`crate::convert::convert_files`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    pub files: Vec<FileResult>,
    pub converted: usize,
    pub failed: usize,
}

/// Liquid constructs found in a source template, see [`crate::convert::inspect`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateInventory {
    /// Statement tag keyword → occurrences.
    pub tags: BTreeMap<String, usize>,
    /// Filter name → occurrences.
    pub filters: BTreeMap<String, usize>,
    /// `${name}` interpolation markers.
    pub interpolation_markers: usize,
    /// `{{ … }}` output expressions.
    pub expressions: usize,
    pub lines: usize,
}
