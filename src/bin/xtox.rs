//! CLI binary for xtox.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use xtox::{
    convert_batch, convert_file, engine_version, markdown_file_to_latex, markdown_to_pdf,
    CompileProgressCallback, ConversionConfig, ConversionResult, InputKind, ProgressCallback,
};

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

/// Spinner that follows the two compiler passes.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Transpiling…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl CompileProgressCallback for CliProgressCallback {
    fn on_pass_start(&self, pass: u8, total: u8) {
        self.bar.set_prefix("Compiling");
        self.bar.set_message(format!("pass {pass}/{total}"));
    }

    fn on_pass_complete(&self, pass: u8, total: u8, exit_code: Option<i32>) {
        let mark = match exit_code {
            Some(0) => green("✓"),
            _ => yellow("!"),
        };
        let code = exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string());
        self.bar.println(format!(
            "  {mark} Pass {pass}/{total}  {}",
            dim(&format!("exit {code}"))
        ));
    }

    fn on_compile_complete(&self, _success: bool) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Markdown to PDF next to the input
  xtox notes.md

  # Into a build directory, repairing the LaTeX envelope if needed
  xtox notes.md -o build --auto-fix

  # LaTeX only, no compile
  xtox notes.md --format latex -o build

  # Compile an existing LaTeX file with xelatex
  xtox paper.tex --engine xelatex --timeout 120

  # Several files at once, one sub-directory each
  xtox a.md b.md c.tex -o out

  # Machine-readable result
  xtox notes.md --json > result.json

  # Is the engine installed?
  xtox --check-engine

ENVIRONMENT VARIABLES:
  XTOX_OUTPUT_DIR   Default for -o
  XTOX_ENGINE       LaTeX engine (default: pdflatex)
  XTOX_TIMEOUT      Per-pass timeout in seconds (default: 30)
  XTOX_TITLE        Document title in the generated preamble
  XTOX_AUTHOR       Document author in the generated preamble
  XTOX_CONCURRENCY  Documents compiled at once in batch mode
  RUST_LOG          Log filter, e.g. RUST_LOG=xtox=debug

EXIT STATUS:
  0 when every PDF was produced, 1 otherwise.
"#;

/// Convert Markdown to LaTeX and LaTeX to PDF.
#[derive(Parser, Debug)]
#[command(
    name = "xtox",
    version,
    about = "Convert Markdown to LaTeX and compile LaTeX to PDF",
    long_about = "Convert Markdown documents to LaTeX with a built-in transpiler and compile \
LaTeX to PDF with an external engine (pdflatex by default). Missing \\documentclass, \
\\begin{document} and \\end{document} can be repaired automatically.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Markdown (.md, .markdown) or LaTeX (.tex) files.
    #[arg(required_unless_present = "check_engine")]
    inputs: Vec<PathBuf>,

    /// Output directory (default: next to each input; `.` in batch mode).
    #[arg(short, long, env = "XTOX_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// What to produce.
    #[arg(long, value_enum, default_value = "pdf")]
    format: FormatArg,

    /// Insert a missing \documentclass / \begin{document} / \end{document}.
    #[arg(long, env = "XTOX_AUTO_FIX")]
    auto_fix: bool,

    /// Do not keep `<file>.bak` when repairing.
    #[arg(long)]
    no_backup: bool,

    /// Emit only the LaTeX body, without preamble and \end{document}.
    #[arg(long)]
    no_preamble: bool,

    /// Do not copy referenced images into `<output>/images`.
    #[arg(long)]
    no_images: bool,

    /// Title for the generated preamble.
    #[arg(long, env = "XTOX_TITLE")]
    title: Option<String>,

    /// Author for the generated preamble.
    #[arg(long, env = "XTOX_AUTHOR")]
    author: Option<String>,

    /// LaTeX engine binary name or path.
    #[arg(long, env = "XTOX_ENGINE", default_value = "pdflatex")]
    engine: String,

    /// Per-pass compiler timeout in seconds.
    #[arg(long, env = "XTOX_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Documents compiled at once in batch mode.
    #[arg(short, long, env = "XTOX_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Print results as JSON on stdout.
    #[arg(long, env = "XTOX_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "XTOX_NO_PROGRESS")]
    no_progress: bool,

    /// Print the engine version and exit.
    #[arg(long)]
    check_engine: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "XTOX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "XTOX_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    Pdf,
    Latex,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO logs unless --verbose asks for everything.
    let show_progress =
        !cli.quiet && !cli.no_progress && !cli.json && cli.format == FormatArg::Pdf;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.check_engine {
        let version = engine_version(&cli.engine)
            .await
            .with_context(|| format!("Engine check failed for '{}'", cli.engine))?;
        println!("{version}");
        return Ok(());
    }

    // Batch jobs run concurrently; one spinner cannot follow them.
    let spinner = (show_progress && cli.inputs.len() == 1).then(CliProgressCallback::new);
    let progress = spinner
        .clone()
        .map(|s| s as Arc<dyn CompileProgressCallback>);
    let config = build_config(&cli, progress)?;

    let outcome = match (cli.format, cli.inputs.as_slice()) {
        (FormatArg::Latex, inputs) => run_latex(&cli, inputs, &config).await,
        (FormatArg::Pdf, [input]) => run_single(&cli, input, &config).await,
        (FormatArg::Pdf, inputs) => run_batch(&cli, inputs, &config).await,
    };

    if let Some(spinner) = spinner {
        spinner.bar.finish_and_clear();
    }

    if !outcome? {
        bail!("PDF generation failed");
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .include_preamble(!cli.no_preamble)
        .engine(cli.engine.clone())
        .compile_timeout_secs(cli.timeout)
        .auto_fix(cli.auto_fix)
        .backup(!cli.no_backup)
        .copy_images(!cli.no_images)
        .concurrency(cli.concurrency);

    if let Some(ref title) = cli.title {
        builder = builder.title(title.clone());
    }
    if let Some(ref author) = cli.author {
        builder = builder.author(author.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `--format latex`: transpile only.
async fn run_latex(cli: &Cli, inputs: &[PathBuf], config: &ConversionConfig) -> Result<bool> {
    let mut written = Vec::new();
    for input in inputs {
        if InputKind::from_path(input) != Some(InputKind::Markdown) {
            bail!(
                "--format latex needs Markdown input, got '{}'",
                input.display()
            );
        }
        let (latex_path, images) =
            markdown_file_to_latex(input, cli.output_dir.as_deref(), config)
                .await
                .with_context(|| format!("Failed to transpile {}", input.display()))?;
        if !cli.quiet && !cli.json {
            eprintln!("{} {}", green("✔"), bold(&latex_path.display().to_string()));
        }
        written.push(serde_json::json!({
            "input": input,
            "latex_path": latex_path,
            "images": images,
        }));
    }
    if cli.json {
        let json = serde_json::to_string_pretty(&written).context("Failed to serialise output")?;
        println!("{json}");
    }
    Ok(true)
}

/// One input compiled to PDF.
async fn run_single(cli: &Cli, input: &Path, config: &ConversionConfig) -> Result<bool> {
    let out_dir = cli.output_dir.as_deref();

    let result = if InputKind::from_path(input) == Some(InputKind::Markdown) {
        let output = markdown_to_pdf(input, out_dir, config)
            .await
            .context("Conversion failed")?;
        if cli.json {
            let json =
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
            println!("{json}");
        }
        output.result
    } else {
        let result = convert_file(input, out_dir, config)
            .await
            .context("Conversion failed")?;
        if cli.json {
            let json =
                serde_json::to_string_pretty(&result).context("Failed to serialise output")?;
            println!("{json}");
        }
        result
    };

    if !cli.quiet && !cli.json {
        print_result(input, &result);
    }
    Ok(result.success)
}

/// Several inputs, each in its own output sub-directory.
async fn run_batch(cli: &Cli, inputs: &[PathBuf], config: &ConversionConfig) -> Result<bool> {
    let out_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let items = convert_batch(inputs, &out_dir, config).await;

    if cli.json {
        let json = serde_json::to_string_pretty(&items).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        for item in &items {
            match &item.outcome {
                Ok(result) => print_result(&item.input, result),
                Err(e) => eprintln!("{} {}  {}", red("✘"), item.input.display(), red(e)),
            }
        }
        let ok = items.iter().filter(|it| it.succeeded()).count();
        eprintln!(
            "{} {}/{} documents compiled",
            if ok == items.len() { green("✔") } else { red("✘") },
            bold(&ok.to_string()),
            items.len()
        );
    }

    Ok(items.iter().all(|it| it.succeeded()))
}

fn print_result(input: &Path, result: &ConversionResult) {
    if result.success {
        let pdf = result
            .output_artifact_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        eprintln!("{} {}  →  {}", green("✔"), input.display(), bold(&pdf));
    } else {
        eprintln!("{} {}  no PDF produced", red("✘"), input.display());
    }
    if result.auto_fix_applied {
        eprintln!("   {}", dim("LaTeX structure was repaired before compiling"));
    }
    for e in &result.errors {
        eprintln!("   {} {}", red("error:"), e);
    }
    for w in &result.warnings {
        eprintln!("   {} {}", yellow("warning:"), w);
    }
}
