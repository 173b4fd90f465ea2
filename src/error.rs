//! Error types for the xtox library.
//!
//! Two failure modes are kept apart:
//!
//! * [`XtoxError`] — **Fatal**: the environment prevents the conversion from
//!   running at all (input file missing, compiler binary not installed,
//!   compiler pass timed out, output directory not writable). Returned as
//!   `Err(XtoxError)` from the `convert*` / `*_to_pdf` entry points.
//!
//! * Document problems — malformed Markdown, a LaTeX file without its
//!   `\documentclass`, a compiler that exits non-zero — are *data*. They are
//!   reported through [`crate::output::ConversionResult`] with
//!   `success == false` and populated `errors` / `warnings`.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the xtox library.
#[derive(Debug, Error)]
pub enum XtoxError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Input extension is neither Markdown nor LaTeX.
    #[error("Unsupported input '{path}': expected a .md, .markdown or .tex file")]
    UnsupportedInput { path: PathBuf },

    // ── Compiler errors ───────────────────────────────────────────────────
    /// The LaTeX engine binary could not be started.
    #[error("LaTeX engine '{engine}' was not found.\nInstall TeX Live / MiKTeX or pass --engine <PATH>.")]
    CompilerNotFound { engine: String },

    /// A compiler pass exceeded the configured timeout.
    #[error("LaTeX compilation timed out after {secs}s (pass {pass}/2) for '{path}'")]
    CompileTimeout {
        path: PathBuf,
        pass: u8,
        secs: u64,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other file-system failure while reading or moving a file.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl XtoxError {
    /// Map a read failure on `path` to the most specific variant.
    pub(crate) fn from_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => XtoxError::FileNotFound { path },
            std::io::ErrorKind::PermissionDenied => XtoxError::PermissionDenied { path },
            _ => XtoxError::Io { path, source },
        }
    }

    /// `true` for [`XtoxError::CompileTimeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, XtoxError::CompileTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display_is_distinct() {
        let e = XtoxError::CompileTimeout {
            path: PathBuf::from("doc.tex"),
            pass: 2,
            secs: 30,
        };
        let msg = e.to_string();
        assert!(msg.contains("compilation timed out"), "got: {msg}");
        assert!(msg.contains("pass 2/2"), "got: {msg}");
        assert!(e.is_timeout());
    }

    #[test]
    fn compiler_not_found_display() {
        let e = XtoxError::CompilerNotFound {
            engine: "xelatex".into(),
        };
        assert!(e.to_string().contains("xelatex"));
        assert!(!e.is_timeout());
    }

    #[test]
    fn from_read_maps_kinds() {
        let nf = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(
            XtoxError::from_read("a.md", nf),
            XtoxError::FileNotFound { .. }
        ));

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no");
        assert!(matches!(
            XtoxError::from_read("a.md", denied),
            XtoxError::PermissionDenied { .. }
        ));

        let other = std::io::Error::other("disk on fire");
        assert!(matches!(
            XtoxError::from_read("a.md", other),
            XtoxError::Io { .. }
        ));
    }
}
