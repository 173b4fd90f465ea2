//! Result types returned by the conversion entry points.
//!
//! All of them derive `Serialize` so the CLI can print them with `--json`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Presence of the three directives every compilable LaTeX file needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StructureReport {
    pub has_documentclass: bool,
    pub has_begin_document: bool,
    pub has_end_document: bool,
}

impl StructureReport {
    /// `true` when nothing is missing.
    pub fn is_complete(&self) -> bool {
        self.has_documentclass && self.has_begin_document && self.has_end_document
    }

    /// Human-readable names of the missing pieces, in document order.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.has_documentclass {
            missing.push("Missing \\documentclass declaration");
        }
        if !self.has_begin_document {
            missing.push("Missing \\begin{document}");
        }
        if !self.has_end_document {
            missing.push("Missing \\end{document}");
        }
        missing
    }
}

/// Outcome of a file repair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairOutcome {
    /// Structure found before the repair.
    pub before: StructureReport,
    /// `true` when the content was changed.
    pub changed: bool,
    /// Where the untouched original was kept, if a backup was made.
    pub backup_path: Option<PathBuf>,
}

/// Outcome of compiling one `.tex` file.
///
/// Compiler problems are reported here rather than as an `Err`: a failed
/// compile is a normal result with `success == false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Coalesced `!` error messages, missing structure, or a synthesized
    /// generic failure.
    pub errors: Vec<String>,
    /// Lines mentioning `Warning` in the compiler output.
    pub warnings: Vec<String>,
    /// `true` iff the expected PDF exists after both passes.
    pub success: bool,
    /// Path of the produced PDF when `success`.
    pub output_artifact_path: Option<PathBuf>,
    /// `true` when the structure repair ran before compiling.
    pub auto_fix_applied: bool,
}

/// Result of the full Markdown → PDF workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkdownToPdfOutput {
    pub latex_path: PathBuf,
    pub pdf_path: PathBuf,
    /// Relative paths (`images/<name>`) of the relocated images.
    pub images: Vec<String>,
    pub result: ConversionResult,
}

/// Result of compiling an in-memory LaTeX source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledDocument {
    pub result: ConversionResult,
    /// PDF content when the compile succeeded.
    #[serde(skip)]
    pub pdf_bytes: Option<Vec<u8>>,
    /// The repaired source, only when auto-fix changed it.
    pub fixed_content: Option<String>,
}

/// One entry of a batch conversion.
#[derive(Debug, Serialize)]
pub struct BatchItem {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// Compile result, or the fatal error rendered as text.
    pub outcome: Result<ConversionResult, String>,
}

impl BatchItem {
    /// `true` when the document compiled to a PDF.
    pub fn succeeded(&self) -> bool {
        matches!(&self.outcome, Ok(r) if r.success)
    }
}
