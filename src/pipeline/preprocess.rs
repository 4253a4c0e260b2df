//! Literal find/replace applied before conversion.
//!
//! Callers often need to rename things the converter knows nothing about
//! (a Braze-specific object, a legacy variable name). The substitution map is
//! a JSON object of literal key → literal value. Keys are applied in document
//! order, cumulatively: a value inserted by an earlier key can be matched by a
//! later one. Keys are never interpreted as patterns.
//!
//! Malformed input is not an error. If the JSON does not parse, is not an
//! object, or holds a non-string value, the template passes through unchanged.
//! [`parse_substitutions`] exposes the reason for callers that want to report
//! it (the diagnostics side-channel does).

use serde_json::{Map, Value};
use tracing::warn;

/// Ordered literal substitutions parsed from a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitutions {
    pairs: Vec<(String, String)>,
}

impl Substitutions {
    /// Number of key/value pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs in application order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Apply every pair in order; returns the text and how many occurrences
    /// were replaced in total.
    pub fn apply(&self, template: &str) -> (String, usize) {
        let mut text = template.to_string();
        let mut replaced = 0usize;
        for (key, value) in &self.pairs {
            // An empty key would interleave the value between every character.
            if key.is_empty() {
                continue;
            }
            let n = text.matches(key.as_str()).count();
            if n > 0 {
                text = text.replace(key.as_str(), value);
                replaced += n;
            }
        }
        (text, replaced)
    }
}

/// Parse a substitution map, reporting why it was rejected.
pub fn parse_substitutions(json: &str) -> Result<Substitutions, String> {
    let map: Map<String, Value> =
        serde_json::from_str(json).map_err(|e| format!("not a JSON object: {e}"))?;
    let pairs = map
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(s) => Ok((key, s)),
            other => Err(format!(
                "value for key {key:?} must be a string, got {}",
                json_kind(&other)
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Substitutions { pairs })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Apply the substitutions in `substitutions_json` to `template`.
///
/// Never fails: on malformed JSON the template is returned unchanged.
pub fn preprocess(template: &str, substitutions_json: &str) -> String {
    match parse_substitutions(substitutions_json) {
        Ok(subs) => subs.apply(template).0,
        Err(reason) => {
            warn!("Ignoring substitutions: {}", reason);
            template.to_string()
        }
    }
}
