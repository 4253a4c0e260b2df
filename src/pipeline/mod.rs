//! The Liquid → Jinja rewrite pipeline.
//!
//! The converter never builds a syntax tree. It runs a fixed, ordered list of
//! whole-text rewrite passes; pass N's complete output is pass N+1's complete
//! input. Several passes only work because an earlier one already fired (the
//! indexed `truncate` rule must see `list[2] | truncate: 5` before the plain
//! rule can swallow it), so the ordering is recorded as data on each
//! [`Pass`] and checked by [`Pipeline::validate`].
//!
//! ## Data Flow
//!
//! ```text
//! template ──▶ preprocess ──▶ rules/blocks (17 steps) ──▶ diagnostics
//!             (JSON find/     (regex + block rewrites)    (optional scan)
//!              replace)
//! ```
//!
//! 1. [`preprocess`]  — literal find/replace from a caller-supplied JSON map
//! 2. [`rules`]       — the static pattern passes (comments, filters,
//!    attribute lookups, assignments, cleanups)
//! 3. [`blocks`]      — passes that need a callback over the matched span:
//!    conditions, loops, `case`, `capture`, inner-expression stripping
//! 4. [`diagnostics`] — report what was left unconverted; never rewrites

pub mod blocks;
pub mod diagnostics;
pub mod preprocess;
pub mod rules;

use crate::output::PassStats;
use regex::{Captures, Regex};
use tracing::debug;

/// Result of one pass over the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    /// The rewritten template.
    pub text: String,
    /// How many spans the pass rewrote.
    pub hits: usize,
}

/// A single named rewrite step.
#[derive(Debug, Clone, Copy)]
pub struct Pass {
    /// Stable identifier, used in stats, logs and `must_follow` lists.
    pub name: &'static str,
    /// One-line summary shown by `liquid2jinja --list-passes`.
    pub description: &'static str,
    /// Passes that must already have run when this one runs.
    pub must_follow: &'static [&'static str],
    /// The rewrite itself. Pure: same input, same output.
    pub rewrite: fn(&str) -> Rewritten,
}

/// An ordered list of passes.
#[derive(Debug, Clone)]
pub struct Pipeline {
    passes: Vec<Pass>,
}

impl Pipeline {
    /// The conversion pipeline in its canonical order.
    pub fn standard() -> Self {
        Self {
            passes: vec![
                // 1
                Pass {
                    name: "comment",
                    description: "{% comment %}…{% endcomment %} → {# … #}",
                    must_follow: &[],
                    rewrite: rules::convert_comments,
                },
                // 2
                Pass {
                    name: "condition",
                    description: "strip {{${name}}} markers inside if/elsif conditions",
                    must_follow: &[],
                    rewrite: blocks::convert_conditions,
                },
                // 3
                Pass {
                    name: "loop",
                    description: "{{${name}}} markers in a for iterable → {{ name }}",
                    must_follow: &[],
                    rewrite: blocks::convert_loops,
                },
                // 4
                Pass {
                    name: "times",
                    description: "assign x = A | times: B → set x = A * B",
                    must_follow: &[],
                    rewrite: rules::convert_times,
                },
                // 5
                Pass {
                    name: "truncate_indexed",
                    description: "{{ name[i] | truncate: n }} → {{ name[i][:n] }}",
                    must_follow: &[],
                    rewrite: rules::convert_truncate_indexed,
                },
                // 6
                Pass {
                    name: "truncate",
                    description: "{{ name | truncate: n }} → {{ name[:n] }}",
                    must_follow: &["truncate_indexed"],
                    rewrite: rules::convert_truncate,
                },
                // 7
                Pass {
                    name: "split_indexed",
                    description: "{{ name[i] | split: \"s\" }} → {{ name[i].split(\"s\") }}",
                    must_follow: &[],
                    rewrite: rules::convert_split_indexed,
                },
                // 8
                Pass {
                    name: "split",
                    description: "{{ name | split: \"s\" }} → {{ name.split(\"s\") }}",
                    must_follow: &["split_indexed"],
                    rewrite: rules::convert_split,
                },
                // 9
                Pass {
                    name: "custom_attribute",
                    description: "{{custom_attribute.${x}}} → {{ UserAttribute['x'] }}",
                    must_follow: &[],
                    rewrite: rules::convert_custom_attributes,
                },
                Pass {
                    name: "campaign_name",
                    description: "{{campaign.${name}}} → {{ CampaignAttribute['c_n'] }}",
                    must_follow: &[],
                    rewrite: rules::convert_campaign_name,
                },
                Pass {
                    name: "content_block",
                    description: "{{content_blocks.${x}}} → {{ ContentBlock['x'] }}",
                    must_follow: &[],
                    rewrite: rules::convert_content_blocks,
                },
                // 10
                Pass {
                    name: "assign",
                    description: "{% assign x = expr %} → {% set x = expr %}",
                    must_follow: &[
                        "times",
                        "truncate_indexed",
                        "truncate",
                        "split_indexed",
                        "split",
                    ],
                    rewrite: rules::convert_assignments,
                },
                // 11
                Pass {
                    name: "case",
                    description: "case/when/else/endcase → if/elif/else/endif",
                    must_follow: &["condition"],
                    rewrite: blocks::convert_case_blocks,
                },
                // 12
                Pass {
                    name: "capture",
                    description: "{% capture x %}…{% endcapture %} → {% set x %}…{% endset %}",
                    must_follow: &[],
                    rewrite: blocks::convert_capture_blocks,
                },
                // 13
                Pass {
                    name: "normalize_expressions",
                    description: "{{name}} → {{ name }}",
                    must_follow: &["case", "capture"],
                    rewrite: rules::normalize_expressions,
                },
                // 14
                Pass {
                    name: "truncate_fallback",
                    description: "remaining `| truncate: n %}` → `[:n] %}`",
                    must_follow: &["truncate"],
                    rewrite: rules::truncate_fallback,
                },
                // 15
                Pass {
                    name: "assign_fallback",
                    description: "remaining {% assign … %} → {% set … %}",
                    must_follow: &["assign"],
                    rewrite: rules::assign_fallback,
                },
                // 16a
                Pass {
                    name: "strip_inner_expression",
                    description: "a tag holding exactly one {{ expr }} keeps just expr",
                    must_follow: &["loop", "assign_fallback"],
                    rewrite: blocks::strip_inner_expression,
                },
                // 16b
                Pass {
                    name: "strip_all_inner_expressions",
                    description: "no {{ … }} survives inside any {% … %} tag",
                    must_follow: &["strip_inner_expression"],
                    rewrite: blocks::strip_all_inner_expressions,
                },
                // 17
                Pass {
                    name: "remove_empty_append",
                    description: "delete `| append: \"\"`",
                    must_follow: &[],
                    rewrite: rules::remove_empty_append,
                },
                Pass {
                    name: "remove_break",
                    description: "delete {% break %}",
                    must_follow: &[],
                    rewrite: rules::remove_break,
                },
            ],
        }
    }

    /// The passes in execution order.
    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    /// Check every `must_follow` precondition against the actual order.
    ///
    /// Returns one `(pass, missing_predecessor)` pair per violation; an empty
    /// vector means the order is sound. A predecessor that is absent from the
    /// pipeline altogether counts as a violation.
    pub fn validate(&self) -> Vec<(&'static str, &'static str)> {
        let mut violations = Vec::new();
        for (i, pass) in self.passes.iter().enumerate() {
            for &required in pass.must_follow {
                let before = self.passes[..i].iter().any(|p| p.name == required);
                if !before {
                    violations.push((pass.name, required));
                }
            }
        }
        violations
    }

    /// Run every pass in order.
    pub fn run(&self, input: &str) -> String {
        self.passes
            .iter()
            .fold(input.to_string(), |text, pass| (pass.rewrite)(&text).text)
    }

    /// Run every pass in order, recording how many spans each rewrote.
    pub fn run_with_stats(&self, input: &str) -> (String, Vec<PassStats>) {
        let mut text = input.to_string();
        let mut stats = Vec::with_capacity(self.passes.len());
        for pass in &self.passes {
            let out = (pass.rewrite)(&text);
            if out.hits > 0 {
                debug!("pass '{}' rewrote {} span(s)", pass.name, out.hits);
            }
            stats.push(PassStats {
                name: pass.name.to_string(),
                hits: out.hits,
            });
            text = out.text;
        }
        (text, stats)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

/// Replace every match of `re` using a `$1`-style template, counting matches.
pub(crate) fn substitute(re: &Regex, input: &str, template: &str) -> Rewritten {
    rewrite_with(re, input, |caps| {
        let mut out = String::new();
        caps.expand(template, &mut out);
        out
    })
}

/// Replace every match of `re` with the string computed by `f`, counting matches.
pub(crate) fn rewrite_with<F>(re: &Regex, input: &str, mut f: F) -> Rewritten
where
    F: FnMut(&Captures<'_>) -> String,
{
    let mut hits = 0usize;
    let text = re
        .replace_all(input, |caps: &Captures<'_>| {
            hits += 1;
            f(caps)
        })
        .into_owned();
    Rewritten { text, hits }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_order_is_valid() {
        assert_eq!(Pipeline::standard().validate(), vec![]);
    }

    #[test]
    fn swapped_truncate_passes_are_flagged() {
        let mut pipeline = Pipeline::standard();
        let a = pipeline
            .passes
            .iter()
            .position(|p| p.name == "truncate_indexed")
            .unwrap();
        let b = pipeline.passes.iter().position(|p| p.name == "truncate").unwrap();
        pipeline.passes.swap(a, b);
        assert!(pipeline
            .validate()
            .contains(&("truncate", "truncate_indexed")));
    }

    #[test]
    fn pass_names_are_unique() {
        let pipeline = Pipeline::standard();
        let mut names: Vec<_> = pipeline.passes().iter().map(|p| p.name).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(Pipeline::standard().run(""), "");
    }

    #[test]
    fn stats_cover_every_pass() {
        let pipeline = Pipeline::standard();
        let (out, stats) = pipeline.run_with_stats("{% assign x = y %}{{z}}");
        assert_eq!(out, "{% set x = y %}{{ z }}");
        assert_eq!(stats.len(), pipeline.passes().len());
        let assign = stats.iter().find(|s| s.name == "assign").unwrap();
        assert_eq!(assign.hits, 1);
        let norm = stats
            .iter()
            .find(|s| s.name == "normalize_expressions")
            .unwrap();
        assert_eq!(norm.hits, 1);
    }

    #[test]
    fn substitute_counts_matches() {
        let re = Regex::new(r"a(\d)").unwrap();
        let out = substitute(&re, "a1 a2 b3", "<${1}>");
        assert_eq!(out.text, "<1> <2> b3");
        assert_eq!(out.hits, 2);
    }
}
