//! Static pattern passes: one regex, one replacement template.
//!
//! These are the rules that need no look at surrounding context. Each is a
//! pure function (`&str → Rewritten`) over the whole template and is run by
//! [`crate::pipeline::Pipeline`] in a fixed position. The ordering constraints
//! that matter here:
//!
//! - indexed `truncate`/`split` before the plain forms, because the plain
//!   pattern would otherwise eat `name[2] | truncate: 5` as `name` + garbage;
//! - `times`, `truncate`, `split` before the general `assign` rule so the
//!   specific arithmetic/slice rewrites are not pre-empted;
//! - the two fallbacks (`truncate_fallback`, `assign_fallback`) late, after
//!   the precise forms had their chance.
//!
//! In every pattern `.` stops at a newline unless it opts in with `(?s)`.

use super::{substitute, Rewritten};
use once_cell::sync::Lazy;
use regex::Regex;

// ── Pass 1: Comments ─────────────────────────────────────────────────────────

static RE_COMMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\{%-?\s*comment\s*-?%\}(.*?)\{%-?\s*endcomment\s*-?%\}").unwrap()
});

pub fn convert_comments(input: &str) -> Rewritten {
    substitute(&RE_COMMENT, input, "{# ${1} #}")
}

// ── Pass 4: `times` filter in an assignment ──────────────────────────────────

static RE_TIMES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{%\s*assign\s+(\w+)\s*=\s*(\d+)\s*\|\s*times:\s*(\d+)\s*%\}").unwrap()
});

pub fn convert_times(input: &str) -> Rewritten {
    substitute(&RE_TIMES, input, "{% set ${1} = ${2} * ${3} %}")
}

// ── Passes 5–6: `truncate` filter → slice ────────────────────────────────────

static RE_TRUNCATE_INDEXED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*(\w+)\[(\d+)\]\s*\|\s*truncate:\s*(\d+)\s*\}\}").unwrap()
});

static RE_TRUNCATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*(\w+)\s*\|\s*truncate:\s*(\d+)\s*\}\}").unwrap());

pub fn convert_truncate_indexed(input: &str) -> Rewritten {
    substitute(&RE_TRUNCATE_INDEXED, input, "{{ ${1}[${2}][:${3}] }}")
}

pub fn convert_truncate(input: &str) -> Rewritten {
    substitute(&RE_TRUNCATE, input, "{{ ${1}[:${2}] }}")
}

// ── Passes 7–8: `split` filter → method call ─────────────────────────────────

static RE_SPLIT_INDEXED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\{\{\s*(\w+)\[(\d+)\]\s*\|\s*split\s*:\s*"([^"]+)"\s*\}\}"#).unwrap()
});

static RE_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\{\{\s*(\w+)\s*\|\s*split\s*:\s*"([^"]+)"\s*\}\}"#).unwrap());

pub fn convert_split_indexed(input: &str) -> Rewritten {
    substitute(&RE_SPLIT_INDEXED, input, r#"{{ ${1}[${2}].split("${3}") }}"#)
}

pub fn convert_split(input: &str) -> Rewritten {
    substitute(&RE_SPLIT, input, r#"{{ ${1}.split("${2}") }}"#)
}

// ── Pass 9: Braze dynamic attributes → attribute tables ──────────────────────
//
// Three literal shapes, deliberately not generalised: only these object names
// have a known target table.

static RE_CUSTOM_ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*custom_attribute\.\$\{(\w+)\}\s*\}\}").unwrap());

static RE_CAMPAIGN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*campaign\.\$\{name\}\s*\}\}").unwrap());

static RE_CONTENT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*content_blocks\.\$\{(\w+)\}\s*\}\}").unwrap());

pub fn convert_custom_attributes(input: &str) -> Rewritten {
    substitute(&RE_CUSTOM_ATTRIBUTE, input, "{{ UserAttribute['${1}'] }}")
}

pub fn convert_campaign_name(input: &str) -> Rewritten {
    substitute(&RE_CAMPAIGN_NAME, input, "{{ CampaignAttribute['c_n'] }}")
}

pub fn convert_content_blocks(input: &str) -> Rewritten {
    substitute(&RE_CONTENT_BLOCK, input, "{{ ContentBlock['${1}'] }}")
}

// ── Pass 10: General assignment ──────────────────────────────────────────────

static RE_ASSIGN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{%\s*assign\s+(\w+)\s*=\s*(.*?)\s*%\}").unwrap());

pub fn convert_assignments(input: &str) -> Rewritten {
    substitute(&RE_ASSIGN, input, "{% set ${1} = ${2} %}")
}

// ── Pass 13: Expression whitespace ───────────────────────────────────────────

static RE_BARE_EXPRESSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").unwrap());

pub fn normalize_expressions(input: &str) -> Rewritten {
    substitute(&RE_BARE_EXPRESSION, input, "{{ ${1} }}")
}

// ── Pass 14: Truncate fallback ───────────────────────────────────────────────

static RE_TRUNCATE_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\|\s*truncate:\s*(\d+)\s*%\}").unwrap());

pub fn truncate_fallback(input: &str) -> Rewritten {
    substitute(&RE_TRUNCATE_TAIL, input, "[:${1}] %}")
}

// ── Pass 15: Assign fallback ─────────────────────────────────────────────────

static RE_ASSIGN_ANY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{%\s*assign\s+(.*?)\s*%\}").unwrap());

pub fn assign_fallback(input: &str) -> Rewritten {
    substitute(&RE_ASSIGN_ANY, input, "{% set ${1} %}")
}

// ── Pass 17: Liquid-isms with no Jinja counterpart ───────────────────────────

static RE_EMPTY_APPEND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\|\s*append:\s*"""#).unwrap());

static RE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{%-?\s*break\s*-?%\}").unwrap());

pub fn remove_empty_append(input: &str) -> Rewritten {
    substitute(&RE_EMPTY_APPEND, input, "")
}

pub fn remove_break(input: &str) -> Rewritten {
    substitute(&RE_BREAK, input, "")
}

// ── Tests ────────────────────────────────────────────────────────────────────
