//! CLI binary for liquid2jinja.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use liquid2jinja::{
    convert_files, convert_to_file, convert_with_config, inspect, read_template,
    write_template, ConversionConfig, ConversionOutput, ConversionProgressCallback, Pipeline,
    ProgressCallback, TemplateInventory,
};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback for batch runs: one bar plus a log line per file.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} templates  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
    }

    fn on_file_start(&self, _index: usize, _total: usize, path: &Path) {
        self.bar.set_message(path.display().to_string());
    }

    fn on_file_complete(&self, _index: usize, _total: usize, path: &Path, output_len: usize) {
        self.bar.println(format!(
            "  {} {}  {}",
            green("✓"),
            path.display(),
            dim(&format!("{output_len} bytes"))
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, _index: usize, _total: usize, path: &Path, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.bar
            .println(format!("  {} {}  {}", red("✗"), path.display(), red(error)));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} templates converted",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} templates converted  ({} failed)",
                if success_count == 0 { red("✘") } else { yellow("⚠") },
                bold(&success_count.to_string()),
                total_files,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert one template (stdout)
  liquid2jinja welcome.liquid

  # Convert to a file
  liquid2jinja welcome.liquid -o welcome.j2

  # Pipe through stdin
  cat welcome.liquid | liquid2jinja -

  # Rename Braze objects before converting
  liquid2jinja -s '{"${first_name}": "first_name"}' welcome.liquid

  # Convert a whole directory of templates
  liquid2jinja --out-dir jinja/ templates/*.liquid

  # Fail if anything Liquid-only survives the conversion
  liquid2jinja --strict welcome.liquid

  # List the Liquid constructs a template uses
  liquid2jinja --inspect-only welcome.liquid

ENVIRONMENT VARIABLES:
  LIQUID2JINJA_SUBSTITUTIONS  Substitution JSON (same as --substitutions)
  LIQUID2JINJA_STRICT         Enable strict mode
  RUST_LOG                    Override the log filter (e.g. liquid2jinja=debug)
"#;

/// Convert Liquid templates to Jinja2.
#[derive(Parser, Debug)]
#[command(
    name = "liquid2jinja",
    version,
    about = "Convert Liquid templates to Jinja2",
    long_about = "Convert Liquid templates (Braze, Shopify) to Jinja2 with an ordered list of \
rewrite passes. Constructs the converter does not recognise are left unchanged and reported \
as diagnostics.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Liquid template files. Omit or use `-` to read stdin.
    inputs: Vec<PathBuf>,

    /// Write the converted template to this file instead of stdout.
    #[arg(short, long, env = "LIQUID2JINJA_OUTPUT", conflicts_with = "out_dir")]
    output: Option<PathBuf>,

    /// Convert every input into this directory (batch mode).
    #[arg(long, env = "LIQUID2JINJA_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Extension for files written in batch mode.
    #[arg(long, env = "LIQUID2JINJA_EXTENSION", default_value = "j2")]
    extension: String,

    /// JSON object of literal find/replace pairs applied before conversion.
    #[arg(short, long, env = "LIQUID2JINJA_SUBSTITUTIONS")]
    substitutions: Option<String>,

    /// Read the substitution JSON from a file.
    #[arg(long, env = "LIQUID2JINJA_SUBSTITUTIONS_FILE", conflicts_with = "substitutions")]
    substitutions_file: Option<PathBuf>,

    /// Exit with an error if any Liquid-only construct survives.
    #[arg(long, env = "LIQUID2JINJA_STRICT")]
    strict: bool,

    /// Do not scan the output for unconverted constructs.
    #[arg(long, conflicts_with = "strict")]
    no_diagnostics: bool,

    /// Output structured JSON (template, diagnostics, stats) instead of the template.
    #[arg(long)]
    json: bool,

    /// Print per-pass rewrite counts to stderr.
    #[arg(long)]
    stats: bool,

    /// Print the Liquid constructs a template uses, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Print the rewrite passes in execution order and exit.
    #[arg(long)]
    list_passes: bool,

    /// Disable the batch progress bar.
    #[arg(long, env = "LIQUID2JINJA_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "LIQUID2JINJA_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "LIQUID2JINJA_QUIET")]
    quiet: bool,
}

impl Cli {
    fn is_batch(&self) -> bool {
        self.out_dir.is_some() || self.inputs.len() > 1
    }

    /// The single input, `None` for stdin.
    fn single_input(&self) -> Option<&Path> {
        self.inputs
            .first()
            .map(PathBuf::as_path)
            .filter(|p| p.as_os_str() != "-")
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = cli.is_batch() && !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── List passes ──────────────────────────────────────────────────────
    if cli.list_passes {
        for (i, pass) in Pipeline::standard().passes().iter().enumerate() {
            println!("{:>2}. {:<28} {}", i + 1, pass.name, pass.description);
            if !pass.must_follow.is_empty() {
                println!("    {:<28} {}", "", dim(&format!("after: {}", pass.must_follow.join(", "))));
            }
        }
        return Ok(());
    }

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let template = read_input(cli.single_input())?;
        let inventory = inspect(&template);
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&inventory).context("Failed to serialize inventory")?
            );
        } else {
            print_inventory(&inventory);
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Batch mode ───────────────────────────────────────────────────────
    if cli.is_batch() {
        let out_dir = cli
            .out_dir
            .as_deref()
            .context("--out-dir is required when converting several templates")?;
        let batch = convert_files(&cli.inputs, out_dir, &config).context("Conversion failed")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&batch).context("Failed to serialise output")?
            );
        } else if !cli.quiet {
            for file in &batch.files {
                for d in &file.diagnostics {
                    eprintln!("{} {}: {}", yellow("warning:"), file.input.display(), d);
                }
            }
            if !show_progress {
                eprintln!(
                    "Converted {}/{} templates",
                    batch.converted,
                    batch.converted + batch.failed
                );
            }
        }
        if batch.failed > 0 {
            anyhow::bail!("{} template(s) failed", batch.failed);
        }
        return Ok(());
    }

    // ── Single template ──────────────────────────────────────────────────
    let output = match (cli.single_input(), cli.output.as_deref()) {
        (Some(input), Some(output_path)) => convert_to_file(input, output_path, &config)
            .with_context(|| format!("Failed to convert {}", input.display()))?,
        (input, output_path) => {
            let template = read_input(input)?;
            let output = convert_with_config(&template, &config).context("Conversion failed")?;
            if let Some(path) = output_path {
                write_template(path, &output.template)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            } else if !cli.json {
                write_stdout(&output.template)?;
            }
            output
        }
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    }
    if !cli.quiet {
        report(&output, cli.stats);
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let substitutions = match (&cli.substitutions, &cli.substitutions_file) {
        (Some(json), _) => Some(json.clone()),
        (None, Some(path)) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read substitutions from {:?}", path))?,
        ),
        (None, None) => None,
    };

    let mut builder = ConversionConfig::builder()
        .diagnostics(!cli.no_diagnostics)
        .strict(cli.strict)
        .output_extension(cli.extension.as_str());
    if let Some(json) = substitutions {
        builder = builder.substitutions(json);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Read a template from a file, or stdin when `path` is `None`.
fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) => read_template(p).with_context(|| format!("Failed to read {}", p.display())),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read template from stdin")?;
            Ok(buf)
        }
    }
}

fn write_stdout(text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') && !text.is_empty() {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

/// Diagnostics and optional pass stats, on stderr.
fn report(output: &ConversionOutput, show_stats: bool) {
    for d in &output.diagnostics {
        eprintln!("{} {}", yellow("warning:"), d);
    }
    if show_stats {
        eprintln!(
            "{}",
            bold(&format!(
                "{} → {} bytes, {} rewrites, {}µs",
                output.stats.input_bytes,
                output.stats.output_bytes,
                output.stats.total_hits,
                output.stats.duration_us
            ))
        );
        if output.stats.substitutions_applied > 0 {
            eprintln!("  substitutions           {:>4}", output.stats.substitutions_applied);
        }
        for pass in output.stats.passes.iter().filter(|p| p.hits > 0) {
            eprintln!("  {:<24}{:>4}", pass.name, pass.hits);
        }
    }
}

fn print_inventory(inventory: &TemplateInventory) {
    println!("Lines:        {}", inventory.lines);
    println!("Expressions:  {}", inventory.expressions);
    println!("Markers:      {}", inventory.interpolation_markers);
    if !inventory.tags.is_empty() {
        println!("Tags:");
        for (name, count) in &inventory.tags {
            println!("  {:<20}{:>4}", name, count);
        }
    }
    if !inventory.filters.is_empty() {
        println!("Filters:");
        for (name, count) in &inventory.filters {
            println!("  {:<20}{:>4}", name, count);
        }
    }
}
