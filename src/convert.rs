//! Conversion entry points.
//!
//! Three layers, each built on the one below:
//!
//! 1. [`convert`] / [`render`] — the total core: string in, string out, never
//!    fails. This is what a web form or editor plugin calls.
//! 2. [`convert_with_config`] — the same conversion plus substitutions from
//!    the config, per-pass stats, diagnostics and optional strict mode.
//! 3. [`convert_to_file`] / [`convert_files`] — read templates from disk and
//!    write the converted output atomically.

use crate::config::ConversionConfig;
use crate::error::{FileError, Liquid2JinjaError};
use crate::output::{BatchOutput, ConversionOutput, ConversionStats, FileResult, TemplateInventory};
use crate::pipeline::diagnostics::{self, Diagnostic};
use crate::pipeline::preprocess::{parse_substitutions, preprocess, Substitutions};
use crate::pipeline::Pipeline;
use once_cell::sync::Lazy;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

static STANDARD: Lazy<Pipeline> = Lazy::new(Pipeline::standard);

/// Convert a Liquid template to Jinja.
///
/// Total: unrecognised constructs pass through unchanged, and the empty
/// string converts to the empty string.
///
/// # Example
/// ```rust
/// assert_eq!(
///     liquid2jinja::convert("{% capture greeting %}Hello{% endcapture %}"),
///     "{% set greeting %}Hello{% endset %}"
/// );
/// ```
pub fn convert(template: &str) -> String {
    STANDARD.run(template)
}

/// Apply the substitutions in `substitutions_json`, then convert.
///
/// Malformed JSON is ignored; see [`preprocess`].
pub fn render(template: &str, substitutions_json: &str) -> String {
    convert(&preprocess(template, substitutions_json))
}

/// Convert with the options in `config`.
///
/// # Errors
/// Only in strict mode:
/// - `InvalidSubstitutions` when the substitution JSON is rejected
/// - `StrictModeViolation` when the output still holds Liquid constructs
pub fn convert_with_config(
    template: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Liquid2JinjaError> {
    let subs = load_substitutions(config)?;
    let output = run(template, config, subs.as_ref());
    enforce_strict(&output, config)
        .map_err(|(count, first)| Liquid2JinjaError::StrictModeViolation { count, first })?;
    Ok(output)
}

/// Read `input_path`, convert it and write the result to `output_path`.
///
/// Uses atomic write (temp file in the target directory + rename) so a
/// failed run never leaves a half-written template behind.
pub fn convert_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Liquid2JinjaError> {
    let (input_path, output_path) = (input_path.as_ref(), output_path.as_ref());
    info!(
        "Converting {} → {}",
        input_path.display(),
        output_path.display()
    );
    let template = read_template(input_path)?;
    let output = convert_with_config(&template, config)?;
    write_atomic(output_path, &output.template)?;
    Ok(output)
}

/// Convert a batch of templates into `out_dir`.
///
/// Each file is written as `<name>.<ext>` where a trailing `.liquid` is
/// replaced by the configured extension (`welcome.liquid` → `welcome.j2`,
/// `email.html` → `email.html.j2`). A file that cannot be read, written, or
/// (in strict mode) fully converted is recorded as a [`FileError`] and the
/// batch moves on.
///
/// # Errors
/// - `InvalidConfig` for an empty batch
/// - `OutputWriteFailed` when `out_dir` cannot be created
/// - `InvalidSubstitutions` in strict mode
/// - `AllFilesFailed` when no file converted
pub fn convert_files<P: AsRef<Path>>(
    inputs: &[P],
    out_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<BatchOutput, Liquid2JinjaError> {
    let out_dir = out_dir.as_ref();
    if inputs.is_empty() {
        return Err(Liquid2JinjaError::InvalidConfig(
            "no input templates given".into(),
        ));
    }
    let subs = load_substitutions(config)?;
    std::fs::create_dir_all(out_dir).map_err(|e| Liquid2JinjaError::OutputWriteFailed {
        path: out_dir.to_path_buf(),
        source: e,
    })?;

    let total = inputs.len();
    info!("Converting {} templates into {}", total, out_dir.display());
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut files = Vec::with_capacity(total);
    for (i, input) in inputs.iter().enumerate() {
        let input = input.as_ref();
        let index = i + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_file_start(index, total, input);
        }

        let target = output_path_for(input, out_dir, &config.output_extension);
        let result = convert_one(input, &target, config, subs.as_ref());

        let file = match result {
            Ok((diagnostics, len)) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_complete(index, total, input, len);
                }
                FileResult {
                    input: input.to_path_buf(),
                    output: Some(target),
                    diagnostics,
                    error: None,
                }
            }
            Err(e) => {
                warn!("{}", e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_error(index, total, input, &e.to_string());
                }
                FileResult {
                    input: input.to_path_buf(),
                    output: None,
                    diagnostics: Vec::new(),
                    error: Some(e),
                }
            }
        };
        files.push(file);
    }

    let converted = files.iter().filter(|f| f.error.is_none()).count();
    let failed = total - converted;
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, converted);
    }

    if converted == 0 {
        let first_error = files
            .iter()
            .find_map(|f| f.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(Liquid2JinjaError::AllFilesFailed { total, first_error });
    }

    info!("Batch complete: {}/{} templates converted", converted, total);
    Ok(BatchOutput {
        files,
        converted,
        failed,
    })
}

/// Write converted text to `path` atomically, creating parent directories.
///
/// The same write [`convert_to_file`] uses, for callers that converted from
/// memory (e.g. stdin).
pub fn write_template(path: impl AsRef<Path>, contents: &str) -> Result<(), Liquid2JinjaError> {
    write_atomic(path.as_ref(), contents)
}

/// List the Liquid constructs in a template without converting it.
pub fn inspect(template: &str) -> TemplateInventory {
    let mut inventory = TemplateInventory {
        interpolation_markers: diagnostics::interpolation_markers(template).len(),
        expressions: diagnostics::expression_count(template),
        lines: template.lines().count(),
        ..TemplateInventory::default()
    };
    for (keyword, _) in diagnostics::tag_keywords(template) {
        *inventory.tags.entry(keyword.to_string()).or_default() += 1;
    }
    for (filter, _) in diagnostics::filter_names(template) {
        *inventory.filters.entry(filter.to_string()).or_default() += 1;
    }
    inventory
}

/// Read a template from disk as UTF-8 text.
pub fn read_template(path: &Path) -> Result<String, Liquid2JinjaError> {
    std::fs::read_to_string(path).map_err(|e| Liquid2JinjaError::from_read(path.to_path_buf(), e))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Parse the configured substitutions once.
///
/// `Ok(None)` when none are configured, `Ok(Some(Err(reason)))` when they are
/// malformed and the config is lenient.
fn load_substitutions(
    config: &ConversionConfig,
) -> Result<Option<Result<Substitutions, String>>, Liquid2JinjaError> {
    let Some(ref json) = config.substitutions else {
        return Ok(None);
    };
    match parse_substitutions(json) {
        Err(reason) if config.strict => Err(Liquid2JinjaError::InvalidSubstitutions { reason }),
        parsed => Ok(Some(parsed)),
    }
}

/// The total part of a configured conversion.
fn run(
    template: &str,
    config: &ConversionConfig,
    subs: Option<&Result<Substitutions, String>>,
) -> ConversionOutput {
    let start = Instant::now();
    let mut diagnostics = Vec::new();

    let (preprocessed, substitutions_applied) = match subs {
        Some(Ok(subs)) => subs.apply(template),
        Some(Err(reason)) => {
            warn!("Ignoring substitutions: {}", reason);
            if config.diagnostics {
                diagnostics.push(Diagnostic::InvalidSubstitutions {
                    reason: reason.clone(),
                });
            }
            (template.to_string(), 0)
        }
        None => (template.to_string(), 0),
    };

    let (converted, passes) = STANDARD.run_with_stats(&preprocessed);
    if config.diagnostics {
        diagnostics.extend(diagnostics::scan(&converted));
    }

    let stats = ConversionStats {
        input_bytes: template.len(),
        output_bytes: converted.len(),
        substitutions_applied,
        total_hits: passes.iter().map(|p| p.hits).sum(),
        passes,
        duration_us: start.elapsed().as_micros() as u64,
    };
    debug!(
        "Converted {} → {} bytes, {} rewrites, {} diagnostics",
        stats.input_bytes,
        stats.output_bytes,
        stats.total_hits,
        diagnostics.len()
    );

    ConversionOutput {
        template: converted,
        diagnostics,
        stats,
    }
}

/// In strict mode, any diagnostic fails the conversion.
fn enforce_strict(
    output: &ConversionOutput,
    config: &ConversionConfig,
) -> Result<(), (usize, String)> {
    match output.diagnostics.first() {
        Some(first) if config.strict => Err((output.diagnostics.len(), first.to_string())),
        _ => Ok(()),
    }
}

/// Convert one batch member; the error is non-fatal for the batch.
fn convert_one(
    input: &Path,
    target: &Path,
    config: &ConversionConfig,
    subs: Option<&Result<Substitutions, String>>,
) -> Result<(Vec<Diagnostic>, usize), FileError> {
    let template = read_template(input).map_err(|e| FileError::ReadFailed {
        path: input.to_path_buf(),
        detail: e.to_string(),
    })?;
    let output = run(&template, config, subs);
    enforce_strict(&output, config).map_err(|(count, first)| FileError::Unconverted {
        path: input.to_path_buf(),
        count,
        first,
    })?;
    write_atomic(target, &output.template).map_err(|e| FileError::WriteFailed {
        path: target.to_path_buf(),
        detail: e.to_string(),
    })?;
    Ok((output.diagnostics, output.template.len()))
}

/// Where a batch member is written.
fn output_path_for(input: &Path, out_dir: &Path, extension: &str) -> PathBuf {
    let file_name = match input.extension().and_then(|e| e.to_str()) {
        Some("liquid") => input.file_stem(),
        _ => input.file_name(),
    }
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| "template".to_string());
    out_dir.join(format!("{file_name}.{extension}"))
}

/// Write `contents` to `path` via a temp file in the same directory.
fn write_atomic(path: &Path, contents: &str) -> Result<(), Liquid2JinjaError> {
    let write_err = |source| Liquid2JinjaError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(contents.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
