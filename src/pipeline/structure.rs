//! Structure check and repair for the LaTeX envelope.
//!
//! A compilable file needs `\documentclass{...}`, `\begin{document}` and
//! `\end{document}`. [`check_structure`] reports which are present;
//! [`repair_structure`] inserts the missing ones:
//!
//! - no `\documentclass` → prepend `\documentclass{article}`
//! - no `\begin{document}` → insert on the line after the right-most
//!   `\documentclass` or `\usepackage`, else at the very start
//! - no `\end{document}` → append
//!
//! Each step sees the result of the previous one. Repairing a complete
//! document returns it unchanged.

use crate::error::XtoxError;
use crate::output::{RepairOutcome, StructureReport};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

static RE_DOCUMENTCLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\documentclass(\[.*?\])?\{.*?\}").unwrap());

const BEGIN_DOCUMENT: &str = "\\begin{document}";
const END_DOCUMENT: &str = "\\end{document}";

/// Report which envelope directives `content` contains.
pub fn check_structure(content: &str) -> StructureReport {
    StructureReport {
        has_documentclass: RE_DOCUMENTCLASS.is_match(content),
        has_begin_document: content.contains(BEGIN_DOCUMENT),
        has_end_document: content.contains(END_DOCUMENT),
    }
}

/// Insert whatever part of the envelope is missing.
pub fn repair_structure(content: &str) -> String {
    let report = check_structure(content);
    let mut content = content.to_string();

    if !report.has_documentclass {
        content = format!("\\documentclass{{article}}\n\n{}", content);
    }

    if !report.has_begin_document {
        content = insert_begin_document(&content);
    }

    if !report.has_end_document {
        content.push_str("\n\\end{document}\n");
    }

    content
}

/// Put `\begin{document}` after the line holding the last preamble directive.
fn insert_begin_document(content: &str) -> String {
    let last_directive = [
        content.rfind("\\documentclass"),
        content.rfind("\\usepackage"),
    ]
    .into_iter()
    .flatten()
    .max();

    let Some(start) = last_directive else {
        return format!("{}\n{}", BEGIN_DOCUMENT, content);
    };

    match content[start..].find('\n') {
        Some(offset) => {
            let split = start + offset;
            format!(
                "{}\n\n{}\n{}",
                &content[..split],
                BEGIN_DOCUMENT,
                &content[split + 1..]
            )
        }
        None => format!("{}\n\n{}\n", content, BEGIN_DOCUMENT),
    }
}

/// Read `path` and report its structure.
pub fn check_file(path: &Path) -> Result<StructureReport, XtoxError> {
    let content = std::fs::read_to_string(path).map_err(|e| XtoxError::from_read(path, e))?;
    Ok(check_structure(&content))
}

/// Repair the file at `path` in place.
///
/// With `backup`, the original is first renamed to `<path>.bak` and the
/// content is read back from there, so the check never sees the file being
/// written. The repaired text is always written to `path`.
pub fn repair_file(path: &Path, backup: bool) -> Result<RepairOutcome, XtoxError> {
    let (source_path, backup_path) = if backup {
        let bak = backup_path_for(path);
        std::fs::rename(path, &bak).map_err(|e| XtoxError::from_read(path, e))?;
        debug!("Backed up {} to {}", path.display(), bak.display());
        (bak.clone(), Some(bak))
    } else {
        (path.to_path_buf(), None)
    };

    let original =
        std::fs::read_to_string(&source_path).map_err(|e| XtoxError::from_read(&source_path, e))?;
    let before = check_structure(&original);
    let repaired = repair_structure(&original);
    let changed = repaired != original;

    std::fs::write(path, &repaired).map_err(|e| XtoxError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    if changed {
        info!(
            "Fixed LaTeX structure in {} ({})",
            path.display(),
            before.missing().join(", ")
        );
    }

    Ok(RepairOutcome {
        before,
        changed,
        backup_path,
    })
}

/// `<path>.bak`, keeping the original extension: `doc.tex` → `doc.tex.bak`.
pub fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}
