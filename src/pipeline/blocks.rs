//! Context-sensitive passes: pattern match with a callback.
//!
//! A plain regex substitution cannot express these rewrites. Each one locates
//! a span (a single tag, or a whole block up to its closing tag), hands the
//! span to a helper, and splices the synthesised text back in:
//!
//! | Pass | Span | Helper |
//! |------|------|--------|
//! | condition | `{% if … %}` / `{% elsif … %}` | [`rewrite_condition`] |
//! | loop | `{% for x in … %}` | [`rewrite_loop`] |
//! | case | `{% case v %}…{% endcase %}` | [`rewrite_case`] |
//! | capture | `{% capture n %}…{% endcapture %}` | [`rewrite_capture`] |
//! | strip_inner_expression | one `{% … %}` tag | [`strip_single_expression`] |
//! | strip_all_inner_expressions | one `{% … %}` tag | [`strip_expressions`] |
//!
//! The helpers are public so a block can be converted in isolation, without
//! running the rest of the chain.

use super::{rewrite_with, Rewritten};
use once_cell::sync::Lazy;
use regex::Regex;

/// `{{${name}}}`: an interpolation marker nested inside another construct.
static RE_INTERPOLATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*\$\{(\w+)\}\s*\}\}").unwrap());

// ── Pass 2: Conditions ───────────────────────────────────────────────────────

static RE_CONDITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{%\s*(if|elsif)\s+(.*?)\s*%\}").unwrap());

/// Strip interpolation markers out of `if`/`elsif` conditions.
///
/// Jinja does not allow `{{ }}` inside a boolean condition, so
/// `{% if {{${plan}}} == 'gold' %}` becomes `{% if plan == 'gold' %}`.
pub fn convert_conditions(input: &str) -> Rewritten {
    let mut markers = 0usize;
    let out = rewrite_with(&RE_CONDITION, input, |caps| {
        let (condition, n) = rewrite_condition(&caps[2]);
        markers += n;
        format!("{{% {} {} %}}", &caps[1], condition)
    });
    Rewritten {
        text: out.text,
        hits: markers,
    }
}

/// Replace each `{{${name}}}` marker in a condition with the bare `name`.
///
/// Returns the rewritten condition and the number of markers replaced.
pub fn rewrite_condition(condition: &str) -> (String, usize) {
    let n = RE_INTERPOLATION.find_iter(condition).count();
    let text = RE_INTERPOLATION.replace_all(condition, "${1}").into_owned();
    (text, n)
}

// ── Pass 3: Loops ────────────────────────────────────────────────────────────

static RE_LOOP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{%\s*for\s+(\w+)\s+in\s+(.*?)\s*%\}").unwrap());

/// Turn interpolation markers in a `for` iterable into output expressions.
///
/// Unlike conditions, the iterable clause may hold an expression, so the
/// marker becomes `{{ name }}`; the inner-expression passes later decide what
/// survives inside the tag.
pub fn convert_loops(input: &str) -> Rewritten {
    let mut markers = 0usize;
    let out = rewrite_with(&RE_LOOP, input, |caps| {
        let (iterable, n) = rewrite_loop(&caps[2]);
        markers += n;
        format!("{{% for {} in {} %}}", &caps[1], iterable)
    });
    Rewritten {
        text: out.text,
        hits: markers,
    }
}

/// Replace each `{{${name}}}` marker in a loop iterable with `{{ name }}`.
pub fn rewrite_loop(iterable: &str) -> (String, usize) {
    let n = RE_INTERPOLATION.find_iter(iterable).count();
    let text = RE_INTERPOLATION
        .replace_all(iterable, "{{ ${1} }}")
        .into_owned();
    (text, n)
}

// ── Pass 11: case / when / else ──────────────────────────────────────────────

static RE_CASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\{%\s*case\s+(.*?)\s*%\}(.*?)\{%\s*endcase\s*%\}").unwrap()
});

static RE_WHEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{%\s*when\s+(.*?)\s*%\}").unwrap());

/// Any statement tag: keyword in group 1.
static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{%-?\s*(\w+).*?%\}").unwrap());

/// Separator between alternative `when` values: `when 'a' or 'b'`.
static RE_WHEN_OR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s+or\s+").unwrap());

pub fn convert_case_blocks(input: &str) -> Rewritten {
    rewrite_with(&RE_CASE, input, |caps| rewrite_case(caps[1].trim(), &caps[2]))
}

/// Rewrite the inside of one `case` block into an `if`/`elif`/`else` chain.
///
/// `variable` is the case subject, `contents` everything between the `case`
/// tag and `endcase`. Each `when` condition is stripped of its surrounding
/// quotes and compared with `==`, so `when '1'` becomes `variable == 1`; a
/// string-valued condition therefore loses its quoting. Text before the first
/// `when` is dropped, as Liquid never renders it. A block without any `when`
/// degenerates to its `else` branch (if any) followed by `{% endif %}`.
pub fn rewrite_case(variable: &str, contents: &str) -> String {
    let contents = contents.trim();
    let whens: Vec<_> = RE_WHEN.captures_iter(contents).collect();

    let tail_start = whens
        .last()
        .and_then(|c| c.get(0))
        .map(|m| m.end())
        .unwrap_or(0);
    let else_tag = find_else(&contents[tail_start..]).map(|(s, e)| (s + tail_start, e + tail_start));
    let bodies_end = else_tag.map(|(s, _)| s).unwrap_or(contents.len());

    let mut out = String::with_capacity(contents.len() + 32);
    for (i, caps) in whens.iter().enumerate() {
        let Some(tag) = caps.get(0) else { continue };
        let body_end = whens
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(bodies_end);
        let keyword = if i == 0 { "if" } else { "elif" };
        out.push_str(&format!(
            "{{% {} {} %}}{}",
            keyword,
            when_comparison(variable, &caps[1]),
            &contents[tag.end()..body_end]
        ));
    }

    if let Some((_, else_end)) = else_tag {
        out.push_str("{% else %}");
        out.push_str(&contents[else_end..]);
    }
    out.push_str("{% endif %}");
    out
}

/// Locate the `{% else %}` that belongs to the enclosing `case`, skipping any
/// `else` nested inside an inner `if`/`unless`/`case`/`for` block.
fn find_else(text: &str) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    for caps in RE_TAG.captures_iter(text) {
        let tag = caps.get(0)?;
        match &caps[1] {
            "if" | "unless" | "case" | "for" => depth += 1,
            "endif" | "endunless" | "endcase" | "endfor" => depth = depth.saturating_sub(1),
            "else" if depth == 0 => return Some((tag.start(), tag.end())),
            _ => {}
        }
    }
    None
}

/// Build `variable == value` (joined with `or` for multi-value `when`s).
fn when_comparison(variable: &str, condition: &str) -> String {
    let values: Vec<&str> = split_when_values(condition)
        .into_iter()
        .map(strip_quotes)
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        return format!("{} == {}", variable, strip_quotes(condition));
    }
    values
        .iter()
        .map(|v| format!("{} == {}", variable, v))
        .collect::<Vec<_>>()
        .join(" or ")
}

fn strip_quotes(value: &str) -> &str {
    value.trim().trim_matches(|c| c == '\'' || c == '"')
}

/// Split `'a', 'b' or 'c'` into its alternatives, ignoring separators that
/// sit inside quotes.
fn split_when_values(condition: &str) -> Vec<&str> {
    let mut values = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0usize;
    for (i, c) in condition.char_indices() {
        if i < start {
            continue;
        }
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c == ',' => {
                values.push(&condition[start..i]);
                start = i + 1;
            }
            None if c.is_whitespace() => {
                if let Some(m) = RE_WHEN_OR.find(&condition[i..]) {
                    values.push(&condition[start..i]);
                    start = i + m.end();
                }
            }
            None => {}
        }
    }
    values.push(&condition[start.min(condition.len())..]);
    values
}

// ── Pass 12: capture ─────────────────────────────────────────────────────────

static RE_CAPTURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\{%\s*capture\s+(\w+)\s*%\}(.*?)\{%\s*endcapture\s*%\}").unwrap()
});

pub fn convert_capture_blocks(input: &str) -> Rewritten {
    rewrite_with(&RE_CAPTURE, input, |caps| rewrite_capture(&caps[1], &caps[2]))
}

/// `capture name` … `endcapture` → a block `set`, body untouched.
pub fn rewrite_capture(name: &str, body: &str) -> String {
    format!("{{% set {} %}}{}{{% endset %}}", name.trim(), body)
}

// ── Pass 16: expression delimiters inside statement tags ─────────────────────

static RE_TAG_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{%.*?%\}").unwrap());

static RE_TAG_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{%.*?%\}").unwrap());

static RE_EXPRESSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{\{(.*?)\}\}").unwrap());

/// First, conservative pass: a single-line tag holding exactly one
/// `{{ expr }}` keeps just `expr`.
pub fn strip_inner_expression(input: &str) -> Rewritten {
    let mut stripped = 0usize;
    let text = RE_TAG_LINE
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let tag = &caps[0];
            match strip_single_expression(tag) {
                Some(clean) => {
                    stripped += 1;
                    clean
                }
                None => tag.to_string(),
            }
        })
        .into_owned();
    Rewritten {
        text,
        hits: stripped,
    }
}

/// Strip the delimiters of the only `{{ … }}` span in `tag`, or `None` when
/// the tag holds zero or several spans.
pub fn strip_single_expression(tag: &str) -> Option<String> {
    let mut spans = RE_EXPRESSION.captures_iter(tag);
    let only = spans.next()?;
    if spans.next().is_some() {
        return None;
    }
    let whole = only.get(0)?;
    Some(format!(
        "{}{}{}",
        &tag[..whole.start()],
        only[1].trim(),
        &tag[whole.end()..]
    ))
}

/// Exhaustive safety net: no `{{ … }}` survives inside any `{% … %}` tag,
/// multi-line tags included.
pub fn strip_all_inner_expressions(input: &str) -> Rewritten {
    let mut stripped = 0usize;
    let text = RE_TAG_SPAN
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let (clean, n) = strip_expressions(&caps[0]);
            stripped += n;
            clean
        })
        .into_owned();
    Rewritten {
        text,
        hits: stripped,
    }
}

/// Strip the delimiters of every `{{ … }}` span in `tag`.
pub fn strip_expressions(tag: &str) -> (String, usize) {
    let n = RE_EXPRESSION.find_iter(tag).count();
    let text = RE_EXPRESSION
        .replace_all(tag, |caps: &regex::Captures<'_>| caps[1].trim().to_string())
        .into_owned();
    (text, n)
}

// ── Tests ────────────────────────────────────────────────────────────────────
