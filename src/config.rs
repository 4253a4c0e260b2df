//! Configuration for Liquid-to-Jinja conversion.
//!
//! The plain entry points ([`crate::convert::convert`],
//! [`crate::convert::render`]) take no configuration at all. Everything that
//! is optional (substitutions, diagnostics, strict mode, batch output naming,
//! progress events) lives in [`ConversionConfig`], built via its
//! [`ConversionConfigBuilder`].

use crate::error::Liquid2JinjaError;
use crate::pipeline::preprocess::parse_substitutions;
use crate::progress::ProgressCallback;
use std::fmt;

/// Configuration for a conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use liquid2jinja::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .substitutions(r#"{"${first_name}": "first_name"}"#)
///     .strict(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Raw JSON object of literal find/replace pairs applied before
    /// conversion. Default: None.
    ///
    /// Malformed JSON is ignored (and reported as a diagnostic) unless
    /// `strict` is set, in which case [`ConversionConfigBuilder::build`]
    /// rejects it.
    pub substitutions: Option<String>,

    /// Scan the converted template for constructs left in Liquid form.
    /// Default: true.
    pub diagnostics: bool,

    /// Treat any diagnostic as an error. Default: false.
    ///
    /// Forces `diagnostics` on.
    pub strict: bool,

    /// Extension given to files written by a batch conversion. Default: "j2".
    pub output_extension: String,

    /// Optional per-file progress callback for batch conversion.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            substitutions: None,
            diagnostics: true,
            strict: false,
            output_extension: "j2".to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("substitutions", &self.substitutions)
            .field("diagnostics", &self.diagnostics)
            .field("strict", &self.strict)
            .field("output_extension", &self.output_extension)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn substitutions(mut self, json: impl Into<String>) -> Self {
        self.config.substitutions = Some(json.into());
        self
    }

    pub fn diagnostics(mut self, v: bool) -> Self {
        self.config.diagnostics = v;
        self
    }

    pub fn strict(mut self, v: bool) -> Self {
        self.config.strict = v;
        if v {
            self.config.diagnostics = true;
        }
        self
    }

    pub fn output_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.output_extension = ext.into().trim_start_matches('.').to_string();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Liquid2JinjaError> {
        let c = &self.config;
        if c.output_extension.is_empty() {
            return Err(Liquid2JinjaError::InvalidConfig(
                "output extension must not be empty".into(),
            ));
        }
        if c.output_extension.contains(['/', '\\']) {
            return Err(Liquid2JinjaError::InvalidConfig(format!(
                "output extension must not contain a path separator, got '{}'",
                c.output_extension
            )));
        }
        if c.strict {
            if let Some(ref json) = c.substitutions {
                parse_substitutions(json)
                    .map_err(|reason| Liquid2JinjaError::InvalidSubstitutions { reason })?;
            }
        }
        Ok(self.config)
    }
}
