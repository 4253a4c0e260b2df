//! End-to-end tests for liquid2jinja.
//!
//! These drive the public API only: whole templates through the full pass
//! chain, plus the file and batch entry points against a temp directory.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use liquid2jinja::{
    convert, convert_files, convert_to_file, convert_with_config, inspect, preprocess, render,
    ConversionConfig, ConversionProgressCallback, Diagnostic, FileError, Liquid2JinjaError,
    Pipeline,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{%.*?%\}").unwrap());

/// Assert no `{% … %}` tag in `jinja` still holds a `{{` delimiter.
fn assert_no_expressions_in_tags(jinja: &str, context: &str) {
    for tag in RE_TAG.find_iter(jinja) {
        assert!(
            !tag.as_str().contains("{{"),
            "[{context}] tag still holds an expression: {}",
            tag.as_str()
        );
    }
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// A Braze-style email as found in the wild.
const WEEKLY_DIGEST: &str = concat!(
    "{% comment %}Weekly digest{% endcomment %}\n",
    "Hi {{${first_name}}},\n",
    "{% if {{${language}}} == 'fr' %}Bonjour{% endif %}\n",
    "{% case plan %}\n",
    "{% when 'gold' %}Thanks for going gold.\n",
    "{% when 'silver', 'bronze' %}Upgrade today.\n",
    "{% else %}Start a trial.\n",
    "{% endcase %}\n",
    "{% for item in {{${recent_items}}} %}- {{ item | truncate: 20 }}{% break %}{% endfor %}\n",
    "{{content_blocks.${footer}}}",
);

const WEEKLY_DIGEST_JINJA: &str = concat!(
    "{# Weekly digest #}\n",
    "Hi {{ first_name }},\n",
    "{% if language == 'fr' %}Bonjour{% endif %}\n",
    "{% if plan == gold %}Thanks for going gold.\n",
    "{% elif plan == silver or plan == bronze %}Upgrade today.\n",
    "{% else %}Start a trial.{% endif %}\n",
    "{% for item in recent_items %}- {{ item[:20] }}{% endfor %}\n",
    "{{ ContentBlock['footer'] }}",
);

const DIGEST_SUBSTITUTIONS: &str = r#"{"${first_name}": "first_name"}"#;

// ── Single constructs through the full chain ─────────────────────────────────

#[test]
fn case_block_becomes_if_chain() {
    assert_eq!(
        convert("{% case x %}{% when '1' %}one{% else %}other{% endcase %}"),
        "{% if x == 1 %}one{% else %}other{% endif %}"
    );
}

#[test]
fn case_block_with_several_whens() {
    let liquid = "{% case tier %}\n{% when 'a' %}A\n{% when 'b' %}B\n{% endcase %}";
    assert_eq!(
        convert(liquid),
        "{% if tier == a %}A\n{% elif tier == b %}B{% endif %}"
    );
}

#[test]
fn truncate_becomes_slice() {
    assert_eq!(convert("{{ name | truncate: 5 }}"), "{{ name[:5] }}");
    assert_eq!(convert("{{ items[2] | truncate: 10 }}"), "{{ items[2][:10] }}");
}

#[test]
fn split_becomes_method_call() {
    assert_eq!(convert(r#"{{ tags | split: "," }}"#), r#"{{ tags.split(",") }}"#);
    assert_eq!(
        convert(r#"{{ rows[0] | split: ";" }}"#),
        r#"{{ rows[0].split(";") }}"#
    );
}

#[test]
fn capture_becomes_block_set() {
    assert_eq!(
        convert("{% capture greeting %}Hello {{name}}{% endcapture %}"),
        "{% set greeting %}Hello {{ name }}{% endset %}"
    );
}

#[test]
fn comment_becomes_jinja_comment() {
    assert_eq!(
        convert("{% comment %}note{% endcomment %}"),
        "{# note #}"
    );
}

#[test]
fn break_is_removed() {
    assert_eq!(
        convert("{% for i in items %}{{ i }}{% break %}{% endfor %}"),
        "{% for i in items %}{{ i }}{% endfor %}"
    );
}

#[test]
fn loop_variables_ending_in_in_survive() {
    assert_eq!(
        convert("{% for domain in domains %}{{ domain }}{% endfor %}"),
        "{% for domain in domains %}{{ domain }}{% endfor %}"
    );
    assert_eq!(
        convert("{% for plugin in {{${plugins}}} %}{{plugin}}{% endfor %}"),
        "{% for plugin in plugins %}{{ plugin }}{% endfor %}"
    );
}

#[test]
fn empty_blocks_do_not_swallow_their_neighbours() {
    assert_eq!(
        convert("{% capture a %}{% endcapture %}{% capture b %}B{% endcapture %}"),
        "{% set a %}{% endset %}{% set b %}B{% endset %}"
    );
    assert_eq!(
        convert("{% comment %}{% endcomment %}keep{% comment %}x{% endcomment %}"),
        "{#  #}keep{# x #}"
    );
}

#[test]
fn empty_append_is_removed() {
    assert_eq!(convert(r#"{{ name | append: "" }}"#), "{{ name  }}");
    assert_eq!(
        convert(r#"{% set s = a | append: "" | upcase %}"#),
        "{% set s = a  | upcase %}"
    );
}

#[test]
fn assign_becomes_set() {
    assert_eq!(
        convert("{% assign total = price | plus: 1 %}"),
        "{% set total = price | plus: 1 %}"
    );
    assert_eq!(
        convert("{% assign n = 3 | times: 4 %}"),
        "{% set n = 3 * 4 %}"
    );
}

#[test]
fn every_assign_is_rewritten() {
    let liquid = "{% assign a = 1 %}\n{% assign b = x | truncate: 3 %}\n{% assign c[0] = 2 %}";
    let out = convert(liquid);
    assert!(!out.contains("assign"), "got {out}");
    assert!(out.contains("{% set a = 1 %}"));
    assert!(out.contains("{% set b = x [:3] %}"));
}

#[test]
fn condition_and_loop_markers_are_unwrapped() {
    assert_eq!(
        convert("{% if {{${plan}}} == 'gold' %}VIP{% elsif {{${plan}}} == 'silver' %}S{% endif %}"),
        "{% if plan == 'gold' %}VIP{% elsif plan == 'silver' %}S{% endif %}"
    );
    assert_eq!(
        convert("{% for item in {{${items}}} %}{{item}}{% endfor %}"),
        "{% for item in items %}{{ item }}{% endfor %}"
    );
}

#[test]
fn braze_attributes_map_to_tables() {
    assert_eq!(
        convert("{{custom_attribute.${loyalty_tier}}}"),
        "{{ UserAttribute['loyalty_tier'] }}"
    );
    assert_eq!(
        convert("{{campaign.${name}}}"),
        "{{ CampaignAttribute['c_n'] }}"
    );
    assert_eq!(
        convert("{{content_blocks.${footer}}}"),
        "{{ ContentBlock['footer'] }}"
    );
}

#[test]
fn unknown_constructs_pass_through() {
    let liquid = "{% tablerow p in products %}{{ p.title }}{% endtablerow %}";
    assert_eq!(convert(liquid), liquid);
}

#[test]
fn empty_input_is_empty_output() {
    assert_eq!(convert(""), "");
    assert_eq!(render("", DIGEST_SUBSTITUTIONS), "");
}

// ── Whole templates ──────────────────────────────────────────────────────────

#[test]
fn weekly_digest_converts() {
    assert_eq!(
        render(WEEKLY_DIGEST, DIGEST_SUBSTITUTIONS),
        WEEKLY_DIGEST_JINJA
    );
}

#[test]
fn weekly_digest_is_clean_and_stable() {
    let config = ConversionConfig::builder()
        .substitutions(DIGEST_SUBSTITUTIONS)
        .strict(true)
        .build()
        .unwrap();
    let out = convert_with_config(WEEKLY_DIGEST, &config).unwrap();
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    assert_eq!(out.stats.substitutions_applied, 1);
    assert_eq!(out.stats.passes.len(), Pipeline::standard().passes().len());
    assert!(out.stats.total_hits > 0);

    let again = convert(&out.template);
    assert_eq!(again, out.template);
    assert_no_expressions_in_tags(&again, "reapplied");
}

#[test]
fn reapplying_never_reintroduces_expressions_in_tags() {
    let templates = [
        WEEKLY_DIGEST,
        "{% for x in {{${a}}} %}{% if {{${b}}} %}{{x}}{% endif %}{% endfor %}",
        "{% assign y = {{ a }} | append: {{ b }} %}",
        "{% set z = {{\n  value\n}} %}",
    ];
    for liquid in templates {
        let once = convert(liquid);
        assert_no_expressions_in_tags(&once, liquid);
        let twice = convert(&once);
        assert_no_expressions_in_tags(&twice, liquid);
    }
}

// ── Preprocessing ────────────────────────────────────────────────────────────

#[test]
fn substitutions_are_literal_and_cumulative() {
    assert_eq!(preprocess("A wins", r#"{"A": "B"}"#), "B wins");
    assert_eq!(preprocess("a.b a+b", r#"{"a.b": "x", "x": "y"}"#), "y a+b");
}

#[test]
fn bad_substitutions_leave_template_untouched() {
    for json in ["{not json", "[1, 2]", r#"{"a": 1}"#, "null"] {
        assert_eq!(preprocess("a {{b}}", json), "a {{b}}", "json: {json}");
    }
}

#[test]
fn lenient_config_reports_ignored_substitutions() {
    let config = ConversionConfig::builder()
        .substitutions("{not json")
        .build()
        .unwrap();
    let out = convert_with_config("{{name}}", &config).unwrap();
    assert_eq!(out.template, "{{ name }}");
    assert!(matches!(
        out.diagnostics.first(),
        Some(Diagnostic::InvalidSubstitutions { .. })
    ));
}

// ── Diagnostics & inspection ─────────────────────────────────────────────────

#[test]
fn leftovers_are_reported_by_line() {
    let out = convert_with_config(
        "line one\n{% unless vip %}{{ price | divided_by: 2 }}{% endunless %}",
        &ConversionConfig::default(),
    )
    .unwrap();
    let kinds: Vec<String> = out.diagnostics.iter().map(|d| d.to_string()).collect();
    assert_eq!(out.diagnostics.len(), 3, "{kinds:?}");
    assert!(kinds[0].contains("line 2") && kinds[0].contains("unless"));
    assert!(kinds[1].contains("divided_by"));
    assert!(kinds[2].contains("endunless"));
}

#[test]
fn strict_mode_fails_on_leftovers() {
    let config = ConversionConfig::builder().strict(true).build().unwrap();
    let err = convert_with_config("{% increment counter %}", &config).unwrap_err();
    assert!(matches!(err, Liquid2JinjaError::StrictModeViolation { count: 1, .. }));
}

#[test]
fn inspect_lists_liquid_constructs() {
    let inv = inspect(WEEKLY_DIGEST);
    assert_eq!(inv.tags.get("when"), Some(&2));
    assert_eq!(inv.tags.get("case"), Some(&1));
    assert_eq!(inv.filters.get("truncate"), Some(&1));
    assert_eq!(inv.interpolation_markers, 4);
    assert_eq!(inv.lines, 10);
}

// ── Files ────────────────────────────────────────────────────────────────────

#[test]
fn convert_to_file_writes_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "digest.liquid", WEEKLY_DIGEST);
    let output = dir.path().join("nested/digest.j2");

    let config = ConversionConfig::builder()
        .substitutions(DIGEST_SUBSTITUTIONS)
        .build()
        .unwrap();
    let out = convert_to_file(&input, &output, &config).unwrap();

    assert_eq!(out.template, WEEKLY_DIGEST_JINJA);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), WEEKLY_DIGEST_JINJA);
}

#[test]
fn convert_to_file_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let err = convert_to_file(
        dir.path().join("nope.liquid"),
        dir.path().join("nope.j2"),
        &ConversionConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Liquid2JinjaError::FileNotFound { .. }), "{err}");
    assert!(!dir.path().join("nope.j2").exists());
}

#[derive(Default)]
struct Counter {
    started: AtomicUsize,
    completed: AtomicUsize,
    errors: AtomicUsize,
    batch_success: AtomicUsize,
}

impl ConversionProgressCallback for Counter {
    fn on_file_start(&self, _index: usize, _total: usize, _path: &Path) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }
    fn on_file_complete(&self, _index: usize, _total: usize, _path: &Path, _len: usize) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
    fn on_file_error(&self, _index: usize, _total: usize, _path: &Path, _error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
    fn on_batch_complete(&self, _total: usize, success_count: usize) {
        self.batch_success.store(success_count, Ordering::SeqCst);
    }
}

#[test]
fn batch_converts_what_it_can() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    std::fs::create_dir_all(&src).unwrap();
    let inputs = vec![
        write(&src, "welcome.liquid", "Hi {{name}}"),
        src.join("missing.liquid"),
        write(&src, "email.html", "{% assign x = 1 %}"),
    ];
    let out_dir = dir.path().join("out");

    let counter = Arc::new(Counter::default());
    let config = ConversionConfig::builder()
        .progress_callback(counter.clone() as Arc<dyn ConversionProgressCallback>)
        .build()
        .unwrap();
    let batch = convert_files(&inputs, &out_dir, &config).unwrap();

    assert_eq!(batch.converted, 2);
    assert_eq!(batch.failed, 1);
    assert!(matches!(batch.files[1].error, Some(FileError::ReadFailed { .. })));
    assert_eq!(
        std::fs::read_to_string(out_dir.join("welcome.j2")).unwrap(),
        "Hi {{ name }}"
    );
    assert_eq!(
        std::fs::read_to_string(out_dir.join("email.html.j2")).unwrap(),
        "{% set x = 1 %}"
    );

    assert_eq!(counter.started.load(Ordering::SeqCst), 3);
    assert_eq!(counter.completed.load(Ordering::SeqCst), 2);
    assert_eq!(counter.errors.load(Ordering::SeqCst), 1);
    assert_eq!(counter.batch_success.load(Ordering::SeqCst), 2);
}

#[test]
fn strict_batch_rejects_leftovers_per_file() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = vec![
        write(dir.path(), "ok.liquid", "{{ a }}"),
        write(dir.path(), "bad.liquid", "{% unless a %}b{% endunless %}"),
    ];
    let out_dir = dir.path().join("out");
    let config = ConversionConfig::builder().strict(true).build().unwrap();

    let batch = convert_files(&inputs, &out_dir, &config).unwrap();
    assert_eq!(batch.converted, 1);
    assert!(matches!(
        batch.files[1].error,
        Some(FileError::Unconverted { count: 2, .. })
    ));
    assert!(!out_dir.join("bad.j2").exists());
}

#[test]
fn batch_where_everything_fails() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = vec![dir.path().join("a.liquid"), dir.path().join("b.liquid")];
    let err = convert_files(&inputs, dir.path().join("out"), &ConversionConfig::default())
        .unwrap_err();
    assert!(matches!(err, Liquid2JinjaError::AllFilesFailed { total: 2, .. }));
}

#[test]
fn empty_batch_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let none: [&Path; 0] = [];
    let err = convert_files(&none, dir.path(), &ConversionConfig::default()).unwrap_err();
    assert!(matches!(err, Liquid2JinjaError::InvalidConfig(_)));
}
