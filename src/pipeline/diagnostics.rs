//! Warnings side-channel: what the pipeline left unconverted.
//!
//! The converter is best-effort and silent; anything it does not
//! recognise is passed through. This module scans a converted template for
//! Liquid-only constructs that survived so a caller can surface them (or, in
//! strict mode, refuse the output). It never rewrites anything.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tags that exist in Liquid but not in Jinja.
pub const LIQUID_ONLY_TAGS: &[&str] = &[
    "assign",
    "capture",
    "endcapture",
    "case",
    "when",
    "endcase",
    "unless",
    "endunless",
    "elsif",
    "increment",
    "decrement",
    "tablerow",
    "endtablerow",
    "comment",
    "endcomment",
];

/// Filters that exist in Liquid but have no Jinja builtin of the same name.
pub const LIQUID_ONLY_FILTERS: &[&str] = &[
    "append",
    "prepend",
    "times",
    "plus",
    "minus",
    "divided_by",
    "modulo",
    "remove",
    "strip_html",
    "url_encode",
    "truncatewords",
    "date",
    "size",
];

/// A non-fatal finding about a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Substitution JSON was supplied but ignored.
    InvalidSubstitutions { reason: String },
    /// A Liquid-only tag is still present.
    UnconvertedTag { keyword: String, line: usize },
    /// A Liquid-only filter is still present.
    UnconvertedFilter { filter: String, line: usize },
    /// A `${name}` interpolation marker is still present.
    InterpolationMarker { marker: String, line: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::InvalidSubstitutions { reason } => {
                write!(f, "substitutions ignored: {reason}")
            }
            Diagnostic::UnconvertedTag { keyword, line } => {
                write!(f, "line {line}: unconverted tag '{keyword}'")
            }
            Diagnostic::UnconvertedFilter { filter, line } => {
                write!(f, "line {line}: unconverted filter '{filter}'")
            }
            Diagnostic::InterpolationMarker { marker, line } => {
                write!(f, "line {line}: interpolation marker '{marker}'")
            }
        }
    }
}

static RE_TAG_KEYWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{%-?\s*(\w+)").unwrap());

/// Any `{{ … }}` or `{% … %}` span; filters are only looked for inside one.
static RE_MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{\{.*?\}\}|\{%.*?%\}").unwrap());

static RE_FILTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\|\s*(\w+)").unwrap());

static RE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{\w+\}").unwrap());

/// Every statement tag keyword with its byte offset.
pub fn tag_keywords(text: &str) -> Vec<(&str, usize)> {
    RE_TAG_KEYWORD
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| (m.as_str(), m.start())))
        .collect()
}

/// Every filter name applied inside a tag or expression, with its byte offset.
pub fn filter_names(text: &str) -> Vec<(&str, usize)> {
    let mut found = Vec::new();
    for span in RE_MARKUP.find_iter(text) {
        for caps in RE_FILTER.captures_iter(span.as_str()) {
            if let Some(m) = caps.get(1) {
                found.push((m.as_str(), span.start() + m.start()));
            }
        }
    }
    found
}

/// Every `${name}` marker with its byte offset.
pub fn interpolation_markers(text: &str) -> Vec<(&str, usize)> {
    RE_MARKER
        .find_iter(text)
        .map(|m| (m.as_str(), m.start()))
        .collect()
}

/// Number of `{{ … }}` output expressions.
pub fn expression_count(text: &str) -> usize {
    RE_MARKUP
        .find_iter(text)
        .filter(|m| m.as_str().starts_with("{{"))
        .count()
}

/// Scan converted output for constructs left in Liquid form, ordered by line.
pub fn scan(converted: &str) -> Vec<Diagnostic> {
    let mut found: Vec<(usize, Diagnostic)> = Vec::new();

    for (keyword, offset) in tag_keywords(converted) {
        if LIQUID_ONLY_TAGS.contains(&keyword) {
            let line = line_of(converted, offset);
            found.push((
                offset,
                Diagnostic::UnconvertedTag {
                    keyword: keyword.to_string(),
                    line,
                },
            ));
        }
    }
    for (filter, offset) in filter_names(converted) {
        if LIQUID_ONLY_FILTERS.contains(&filter) {
            let line = line_of(converted, offset);
            found.push((
                offset,
                Diagnostic::UnconvertedFilter {
                    filter: filter.to_string(),
                    line,
                },
            ));
        }
    }
    for (marker, offset) in interpolation_markers(converted) {
        let line = line_of(converted, offset);
        found.push((
            offset,
            Diagnostic::InterpolationMarker {
                marker: marker.to_string(),
                line,
            },
        ));
    }

    found.sort_by_key(|(offset, _)| *offset);
    found.into_iter().map(|(_, d)| d).collect()
}

/// 1-indexed line number of a byte offset.
fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_output_has_no_diagnostics() {
        assert!(scan("{% set x = 1 %}{{ x | upper }}{% if x %}y{% endif %}").is_empty());
    }

    #[test]
    fn leftover_tags_are_reported_with_lines() {
        let d = scan("ok\n{% unless x %}y{% endunless %}");
        assert_eq!(
            d,
            vec![
                Diagnostic::UnconvertedTag {
                    keyword: "unless".into(),
                    line: 2
                },
                Diagnostic::UnconvertedTag {
                    keyword: "endunless".into(),
                    line: 2
                },
            ]
        );
    }

    #[test]
    fn filters_outside_markup_are_ignored() {
        assert!(scan("plain text | append: here").is_empty());
        let d = scan("{{ a | append: b }}");
        assert_eq!(
            d,
            vec![Diagnostic::UnconvertedFilter {
                filter: "append".into(),
                line: 1
            }]
        );
    }

    #[test]
    fn markers_are_reported() {
        let d = scan("Hi ${first_name}");
        assert_eq!(d.len(), 1);
        assert!(d[0].to_string().contains("${first_name}"));
    }

    #[test]
    fn diagnostic_json_shape() {
        let d = Diagnostic::UnconvertedTag {
            keyword: "when".into(),
            line: 4,
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "unconverted_tag");
        assert_eq!(json["line"], 4);
    }
}
