//! # xtox
//!
//! Convert Markdown to LaTeX, and LaTeX to PDF through an external engine.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Markdown
//!  │
//!  ├─ 1. Images     copy referenced images to <out>/images, rewrite paths
//!  ├─ 2. Transpile  line-by-line state machine → LaTeX body (+ preamble)
//!  ├─ 3. Structure  check / repair \documentclass, \begin{document}, \end{document}
//!  ├─ 4. Compile    run pdflatex twice with a timeout, parse diagnostics
//!  └─ 5. Result     success iff <stem>.pdf exists, errors + warnings
//! ```
//!
//! Stages 2 and 3 are pure and never fail: malformed Markdown degrades to
//! literal text. Only the environment (missing files, missing engine,
//! timeouts) produces an [`XtoxError`]. A document that does not compile is
//! a [`ConversionResult`] with `success == false`.
//!
//! ## Quick Start
//!
//! ```rust
//! use xtox::{markdown_to_latex, TranspileOptions};
//!
//! let options = TranspileOptions { include_preamble: false, ..Default::default() };
//! let latex = markdown_to_latex("# Intro\n\nHello **world**.", &options);
//! assert!(latex.contains("\\section{Intro}"));
//! assert!(latex.contains("Hello \\textbf{world}."));
//! ```
//!
//! Compiling needs a LaTeX engine on `PATH`:
//!
//! ```rust,no_run
//! use std::path::Path;
//! use xtox::{latex_to_pdf, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder().auto_fix(true).build()?;
//!     let result = latex_to_pdf(Path::new("paper.tex"), &config).await?;
//!     println!("success: {}, {} warning(s)", result.success, result.warnings.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `xtox` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! xtox = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod preamble;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, DEFAULT_TITLE};
pub use convert::{
    compile_latex_source, convert_batch, convert_file, latex_to_pdf_sync, markdown_file_to_latex,
    markdown_to_latex_file, markdown_to_pdf, markdown_to_pdf_sync, InputKind,
};
pub use error::XtoxError;
pub use output::{
    BatchItem, CompiledDocument, ConversionResult, MarkdownToPdfOutput, RepairOutcome,
    StructureReport,
};
pub use pipeline::compile::{engine_version, latex_to_pdf, parse_diagnostics};
pub use pipeline::images::{copy_images_to_output_dir, update_image_paths};
pub use pipeline::inline::format_inline;
pub use pipeline::structure::{check_structure, repair_file, repair_structure};
pub use pipeline::table::format_table;
pub use pipeline::transpile::{markdown_to_latex, TranspileOptions};
pub use progress::{CompileProgressCallback, NoopProgressCallback, ProgressCallback};
