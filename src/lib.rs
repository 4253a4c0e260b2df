//! # liquid2jinja
//!
//! Convert Liquid templates (as used by Braze and Shopify) to Jinja2.
//!
//! ## Why not a parser?
//!
//! The two dialects are close enough that most real templates differ only in
//! a handful of constructs: `assign` vs `set`, `case` vs `if/elif`, filter
//! syntax for slicing and splitting, and where `{{ }}` is allowed. This crate
//! rewrites those constructs with an ordered list of pattern passes instead of
//! building a syntax tree. It makes no promise beyond "common patterns convert
//! correctly"; anything it does not recognise is left as literal text.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Liquid
//!  │
//!  ├─ 1. Preprocess  literal find/replace from a JSON map (optional)
//!  ├─ 2. Rewrite     ordered passes (see `liquid2jinja --list-passes`)
//!  ├─ 3. Diagnose    report Liquid constructs that survived (optional)
//!  └─ 4. Output      Jinja template + per-pass stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! let jinja = liquid2jinja::convert(
//!     "{% case x %}{% when '1' %}one{% else %}other{% endcase %}",
//! );
//! assert_eq!(jinja, "{% if x == 1 %}one{% else %}other{% endif %}");
//!
//! let jinja = liquid2jinja::render("Hi {{fname}}", r#"{"fname": "first_name"}"#);
//! assert_eq!(jinja, "Hi {{ first_name }}");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `liquid2jinja` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::{
    convert, convert_files, convert_to_file, convert_with_config, inspect, read_template, render,
    write_template,
};
pub use error::{FileError, Liquid2JinjaError};
pub use output::{
    BatchOutput, ConversionOutput, ConversionStats, FileResult, PassStats, TemplateInventory,
};
pub use pipeline::diagnostics::Diagnostic;
pub use pipeline::preprocess::preprocess;
pub use pipeline::{Pass, Pipeline};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
