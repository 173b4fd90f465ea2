//! Conversion entry points composing the pipeline stages.
//!
//! The stages themselves live in [`crate::pipeline`]; this module adds the
//! file handling around them: reading inputs, choosing output locations,
//! atomic writes, temp directories and batch scheduling.

use crate::config::ConversionConfig;
use crate::error::XtoxError;
use crate::output::{BatchItem, CompiledDocument, ConversionResult, MarkdownToPdfOutput};
use crate::pipeline::compile::latex_to_pdf;
use crate::pipeline::images::{copy_images_to_output_dir, update_image_paths};
use crate::pipeline::structure::repair_structure;
use crate::pipeline::transpile::{markdown_to_latex, TranspileOptions};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Input kinds accepted by [`convert_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Markdown,
    Latex,
}

impl InputKind {
    /// Classify a path by extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "md" | "markdown" => Some(InputKind::Markdown),
            "tex" => Some(InputKind::Latex),
            _ => None,
        }
    }
}

/// Transpile `markdown` and write the LaTeX to `path`.
///
/// Parent directories are created. The write goes through a temporary file
/// and a rename so readers never see a partial document.
pub async fn markdown_to_latex_file(
    markdown: &str,
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<String, XtoxError> {
    let latex = markdown_to_latex(markdown, &TranspileOptions::from(config));
    write_atomic(path.as_ref(), &latex).await?;
    Ok(latex)
}

/// Transpile a Markdown file to `<output_dir>/<stem>.tex`.
///
/// Referenced images are relocated first when `config.copy_images` is set.
/// Without an output directory the `.tex` lands next to the Markdown.
/// Returns the `.tex` path and the relocated image paths.
pub async fn markdown_file_to_latex(
    md_path: &Path,
    output_dir: Option<&Path>,
    config: &ConversionConfig,
) -> Result<(PathBuf, Vec<String>), XtoxError> {
    if !md_path.is_file() {
        return Err(XtoxError::FileNotFound {
            path: md_path.to_path_buf(),
        });
    }
    info!("Starting conversion: {}", md_path.display());

    let source_dir = parent_dir(md_path);
    let out_dir = output_dir.map_or_else(|| source_dir.clone(), Path::to_path_buf);
    create_dir(&out_dir).await?;

    let mut markdown = tokio::fs::read_to_string(md_path)
        .await
        .map_err(|e| XtoxError::from_read(md_path, e))?;

    let mut images = Vec::new();
    if config.copy_images {
        let mapping = copy_images_to_output_dir(&markdown, &source_dir, &out_dir)?;
        if !mapping.is_empty() {
            info!("Relocated {} image(s) to {}", mapping.len(), out_dir.display());
            markdown = update_image_paths(&markdown, &mapping);
        }
        images = mapping.into_iter().map(|(_, new)| new).collect();
    }

    let stem = md_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let latex_path = out_dir.join(format!("{stem}.tex"));

    markdown_to_latex_file(&markdown, &latex_path, config).await?;
    info!("Wrote LaTeX: {}", latex_path.display());

    Ok((latex_path, images))
}

/// Full workflow: Markdown file → LaTeX file → PDF.
///
/// ```rust,no_run
/// use std::path::Path;
/// use xtox::{markdown_to_pdf, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConversionConfig::builder().auto_fix(true).build()?;
/// let out = markdown_to_pdf(Path::new("notes.md"), Some(Path::new("build")), &config).await?;
/// if !out.result.success {
///     for e in &out.result.errors {
///         eprintln!("{e}");
///     }
/// }
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// Missing input, unwritable output, missing engine or a timed-out pass.
/// A document that does not compile is `Ok` with `result.success == false`.
pub async fn markdown_to_pdf(
    md_path: &Path,
    output_dir: Option<&Path>,
    config: &ConversionConfig,
) -> Result<MarkdownToPdfOutput, XtoxError> {
    // ── Step 1: Transpile ────────────────────────────────────────────────
    let (latex_path, images) = markdown_file_to_latex(md_path, output_dir, config).await?;

    // ── Step 2: Compile (repairs the envelope first when auto_fix) ──────
    let result = latex_to_pdf(&latex_path, config).await?;

    let pdf_path = latex_path.with_extension("pdf");
    if result.success {
        info!("Conversion complete: {}", pdf_path.display());
    } else {
        warn!(
            "Conversion of {} finished without a PDF ({} error(s))",
            md_path.display(),
            result.errors.len()
        );
    }

    Ok(MarkdownToPdfOutput {
        latex_path,
        pdf_path,
        images,
        result,
    })
}

/// Convert one file to PDF, dispatching on its extension.
///
/// `.md` / `.markdown` run [`markdown_to_pdf`]. `.tex` is copied into
/// `output_dir` when that differs from its own directory, then compiled.
pub async fn convert_file(
    path: &Path,
    output_dir: Option<&Path>,
    config: &ConversionConfig,
) -> Result<ConversionResult, XtoxError> {
    match InputKind::from_path(path) {
        Some(InputKind::Markdown) => Ok(markdown_to_pdf(path, output_dir, config).await?.result),
        Some(InputKind::Latex) => {
            if !path.is_file() {
                return Err(XtoxError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
            let tex_path = match output_dir {
                Some(dir) => stage_tex(path, dir).await?,
                None => path.to_path_buf(),
            };
            latex_to_pdf(&tex_path, config).await
        }
        None => Err(XtoxError::UnsupportedInput {
            path: path.to_path_buf(),
        }),
    }
}

/// Copy `tex` into `dir` unless it already lives there.
async fn stage_tex(tex: &Path, dir: &Path) -> Result<PathBuf, XtoxError> {
    create_dir(dir).await?;
    let file_name = tex
        .file_name()
        .ok_or_else(|| XtoxError::UnsupportedInput {
            path: tex.to_path_buf(),
        })?;
    let dest = dir.join(file_name);

    let same_dir = match (
        tokio::fs::canonicalize(parent_dir(tex)).await,
        tokio::fs::canonicalize(dir).await,
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    if same_dir {
        return Ok(tex.to_path_buf());
    }

    tokio::fs::copy(tex, &dest)
        .await
        .map_err(|e| XtoxError::OutputWriteFailed {
            path: dest.clone(),
            source: e,
        })?;
    debug!("Copied {} -> {}", tex.display(), dest.display());
    Ok(dest)
}

/// Convert many files, at most `config.concurrency` at a time.
///
/// Each input gets its own directory `<output_dir>/<stem>` (`<stem>-2`,
/// `<stem>-3`, … on collisions) so auxiliary files never clash. Results come
/// back in input order; one failing input does not stop the others.
pub async fn convert_batch(
    paths: &[PathBuf],
    output_dir: &Path,
    config: &ConversionConfig,
) -> Vec<BatchItem> {
    let jobs: Vec<(usize, PathBuf, PathBuf)> = assign_job_dirs(paths, output_dir)
        .into_iter()
        .enumerate()
        .map(|(i, (input, dir))| (i, input, dir))
        .collect();
    info!(
        "Starting batch of {} file(s), concurrency {}",
        jobs.len(),
        config.concurrency
    );

    let mut items: Vec<(usize, BatchItem)> = stream::iter(jobs.into_iter().map(|(i, input, dir)| {
        let config = config.clone();
        async move {
            let outcome = convert_file(&input, Some(&dir), &config)
                .await
                .map_err(|e| e.to_string());
            if let Err(ref e) = outcome {
                warn!("{}: {}", input.display(), e);
            }
            (
                i,
                BatchItem {
                    input,
                    output_dir: dir,
                    outcome,
                },
            )
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await;

    items.sort_by_key(|(i, _)| *i);
    let items: Vec<BatchItem> = items.into_iter().map(|(_, item)| item).collect();

    let ok = items.iter().filter(|it| it.succeeded()).count();
    info!("Batch complete: {}/{} succeeded", ok, items.len());
    items
}

/// Pair each input with a unique sub-directory of `output_dir`.
fn assign_job_dirs(paths: &[PathBuf], output_dir: &Path) -> Vec<(PathBuf, PathBuf)> {
    let mut taken: HashSet<String> = HashSet::new();
    paths
        .iter()
        .map(|p| {
            let stem = p
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string());
            let mut name = stem.clone();
            let mut n = 2;
            while !taken.insert(name.clone()) {
                name = format!("{stem}-{n}");
                n += 1;
            }
            (p.clone(), output_dir.join(name))
        })
        .collect()
}

/// Compile LaTeX held in memory.
///
/// The source is written to a fresh temporary directory that is removed
/// on return, so concurrent calls never share files. With `auto_fix` the
/// envelope is repaired before writing and a leading byte-order mark is
/// dropped; the result is returned in `fixed_content` when it differs.
pub async fn compile_latex_source(
    source: &str,
    file_stem: &str,
    config: &ConversionConfig,
) -> Result<CompiledDocument, XtoxError> {
    let tmp = tempfile::TempDir::new()
        .map_err(|e| XtoxError::Internal(format!("tempdir: {e}")))?;
    let tex_path = tmp.path().join(format!("{}.tex", sanitize_stem(file_stem)));

    let mut fixed_content = None;
    let content = if config.auto_fix {
        let unmarked = source.strip_prefix('\u{feff}').unwrap_or(source);
        if unmarked.len() != source.len() {
            debug!("Stripped byte-order mark from in-memory source");
        }
        let repaired = repair_structure(unmarked);
        if repaired != source {
            info!("Applied structure repair to in-memory source");
            fixed_content = Some(repaired.clone());
        }
        repaired
    } else {
        source.to_string()
    };

    tokio::fs::write(&tex_path, &content)
        .await
        .map_err(|e| XtoxError::OutputWriteFailed {
            path: tex_path.clone(),
            source: e,
        })?;

    let mut result = latex_to_pdf(&tex_path, config).await?;
    result.auto_fix_applied |= fixed_content.is_some();

    let pdf_bytes = match result.output_artifact_path.take() {
        Some(pdf) if result.success => Some(
            tokio::fs::read(&pdf)
                .await
                .map_err(|e| XtoxError::from_read(&pdf, e))?,
        ),
        _ => None,
    };

    // `tmp` is dropped (and the directory deleted) here
    Ok(CompiledDocument {
        result,
        pdf_bytes,
        fixed_content,
    })
}

/// Keep `[A-Za-z0-9_-]`; an empty result becomes `"document"`.
pub fn sanitize_stem(stem: &str) -> String {
    let clean: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if clean.is_empty() {
        "document".to_string()
    } else {
        clean
    }
}

/// Synchronous wrapper around [`latex_to_pdf`].
///
/// Creates a temporary tokio runtime internally.
pub fn latex_to_pdf_sync(
    tex_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionResult, XtoxError> {
    runtime()?.block_on(latex_to_pdf(tex_path.as_ref(), config))
}

/// Synchronous wrapper around [`markdown_to_pdf`].
pub fn markdown_to_pdf_sync(
    md_path: impl AsRef<Path>,
    output_dir: Option<&Path>,
    config: &ConversionConfig,
) -> Result<MarkdownToPdfOutput, XtoxError> {
    runtime()?.block_on(markdown_to_pdf(md_path.as_ref(), output_dir, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn runtime() -> Result<tokio::runtime::Runtime, XtoxError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| XtoxError::Internal(format!("Failed to create tokio runtime: {}", e)))
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

async fn create_dir(dir: &Path) -> Result<(), XtoxError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| XtoxError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })
}

/// Write to `<path>.tmp`, then rename over `path`.
async fn write_atomic(path: &Path, content: &str) -> Result<(), XtoxError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir(parent).await?;
    }

    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, content)
        .await
        .map_err(|e| XtoxError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| XtoxError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_kind_by_extension() {
        assert_eq!(InputKind::from_path(Path::new("a.md")), Some(InputKind::Markdown));
        assert_eq!(
            InputKind::from_path(Path::new("a.MARKDOWN")),
            Some(InputKind::Markdown)
        );
        assert_eq!(InputKind::from_path(Path::new("dir/a.tex")), Some(InputKind::Latex));
        assert_eq!(InputKind::from_path(Path::new("a.docx")), None);
        assert_eq!(InputKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn job_dirs_are_unique() {
        let paths = vec![
            PathBuf::from("a/report.md"),
            PathBuf::from("b/report.md"),
            PathBuf::from("notes.tex"),
            PathBuf::from("c/report.tex"),
        ];
        let dirs: Vec<PathBuf> = assign_job_dirs(&paths, Path::new("out"))
            .into_iter()
            .map(|(_, d)| d)
            .collect();
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("out/report"),
                PathBuf::from("out/report-2"),
                PathBuf::from("out/notes"),
                PathBuf::from("out/report-3"),
            ]
        );
    }

    #[test]
    fn stem_sanitising() {
        assert_eq!(sanitize_stem("my report (v2)"), "myreportv2");
        assert_eq!(sanitize_stem("ok_name-1"), "ok_name-1");
        assert_eq!(sanitize_stem("../.."), "document");
        assert_eq!(sanitize_stem(""), "document");
    }

    #[tokio::test]
    async fn latex_file_is_written_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.tex");
        let config = ConversionConfig::default();

        let latex = markdown_to_latex_file("# Intro", &path, &config).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), latex);
        assert!(latex.contains("\\section{Intro}"));
        assert!(!dir.path().join("nested/out.tex.tmp").exists());
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected() {
        let config = ConversionConfig::default();
        let err = convert_file(Path::new("slides.pptx"), None, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, XtoxError::UnsupportedInput { .. }));
    }

    #[tokio::test]
    async fn missing_markdown_is_fatal() {
        let config = ConversionConfig::default();
        let err = markdown_to_pdf(Path::new("/no/such/notes.md"), None, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, XtoxError::FileNotFound { .. }));
    }
}
