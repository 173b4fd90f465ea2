//! PDF driver: run the external LaTeX engine and interpret what it says.
//!
//! ## Protocol
//!
//! 1. The `.tex` file must exist, else [`XtoxError::FileNotFound`].
//! 2. Its envelope is checked. When incomplete and `auto_fix` is off, the
//!    compile stops with the missing pieces as errors; with `auto_fix` the
//!    file is repaired first.
//! 3. The engine runs exactly twice (`-interaction=nonstopmode <file>`,
//!    from the file's directory). The second pass resolves the labels and
//!    cross-references written by the first.
//! 4. A pass exiting non-zero has its stdout scanned for `!` error lines and
//!    `Warning` lines. If nothing structured turns up, one generic error with
//!    the exit code and stderr is recorded instead.
//! 5. Success means the PDF exists after both passes, whatever the exit
//!    codes were. pdflatex often exits 1 on recoverable errors and still
//!    writes a usable PDF.
//!
//! A pass that exceeds the timeout is killed and surfaces as
//! [`XtoxError::CompileTimeout`]; a missing engine binary as
//! [`XtoxError::CompilerNotFound`]. Nothing is retried.

use crate::config::ConversionConfig;
use crate::error::XtoxError;
use crate::output::ConversionResult;
use crate::pipeline::structure::{check_file, repair_file};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// Number of engine invocations per compile.
pub const PASSES: u8 = 2;

/// Compile `tex_path` to `<stem>.pdf` next to it.
///
/// # Errors
/// Only environment failures are errors: missing input, missing engine,
/// timeout, unwritable file during repair. A document that fails to compile
/// is `Ok` with `success == false`.
pub async fn latex_to_pdf(
    tex_path: &Path,
    config: &ConversionConfig,
) -> Result<ConversionResult, XtoxError> {
    if !tex_path.is_file() {
        return Err(XtoxError::FileNotFound {
            path: tex_path.to_path_buf(),
        });
    }

    let mut result = ConversionResult::default();

    let report = check_file(tex_path)?;
    if !report.is_complete() {
        let missing = report.missing();
        warn!(
            "LaTeX file {} has structural issues: {}",
            tex_path.display(),
            missing.join(", ")
        );
        if !config.auto_fix {
            result.errors = missing.into_iter().map(str::to_string).collect();
            notify_complete(config, false);
            return Ok(result);
        }
        repair_file(tex_path, config.backup)?;
        result.auto_fix_applied = true;
    }

    let work_dir = tex_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = tex_path
        .file_name()
        .ok_or_else(|| XtoxError::Internal(format!("no file name in {}", tex_path.display())))?;

    for pass in 1..=PASSES {
        info!("Running {} (pass {}/{})...", config.engine, pass, PASSES);
        if let Some(ref cb) = config.progress_callback {
            cb.on_pass_start(pass, PASSES);
        }

        let output = run_pass(config, &work_dir, Path::new(file_name), tex_path, pass).await?;
        let exit_code = output.status.code();

        if let Some(ref cb) = config.progress_callback {
            cb.on_pass_complete(pass, PASSES, exit_code);
        }

        if output.status.success() {
            debug!("Pass {} finished cleanly", pass);
            continue;
        }

        warn!(
            "{} pass {}/{} exited with {:?}",
            config.engine, pass, PASSES, exit_code
        );

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (mut errors, mut warnings) = parse_diagnostics(&stdout);
        if errors.is_empty() {
            if let Some(log) = read_log(tex_path).await {
                let (log_errors, log_warnings) = parse_diagnostics(&log);
                errors = log_errors;
                warnings.extend(log_warnings);
            }
        }
        if errors.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            errors.push(generic_failure(exit_code, stderr.trim()));
        }

        push_unique(&mut result.errors, errors);
        push_unique(&mut result.warnings, warnings);
    }

    let pdf_path = tex_path.with_extension("pdf");
    result.success = tokio::fs::try_exists(&pdf_path).await.unwrap_or(false);
    if result.success {
        info!("PDF generated successfully: {}", pdf_path.display());
        result.output_artifact_path = Some(pdf_path);
    } else {
        warn!("PDF generation failed: {} not found", pdf_path.display());
    }

    notify_complete(config, result.success);
    Ok(result)
}

/// Run one engine pass under the configured timeout.
async fn run_pass(
    config: &ConversionConfig,
    work_dir: &Path,
    file_name: &Path,
    tex_path: &Path,
    pass: u8,
) -> Result<Output, XtoxError> {
    let mut cmd = Command::new(&config.engine);
    cmd.arg("-interaction=nonstopmode")
        .arg(file_name)
        .current_dir(work_dir)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let secs = config.compile_timeout_secs;
    match timeout(Duration::from_secs(secs), cmd.output()).await {
        Err(_) => Err(XtoxError::CompileTimeout {
            path: tex_path.to_path_buf(),
            pass,
            secs,
        }),
        Ok(Err(e)) => Err(spawn_error(&config.engine, e)),
        Ok(Ok(output)) => Ok(output),
    }
}

fn spawn_error(engine: &str, e: std::io::Error) -> XtoxError {
    if e.kind() == std::io::ErrorKind::NotFound {
        XtoxError::CompilerNotFound {
            engine: engine.to_string(),
        }
    } else {
        XtoxError::Io {
            path: PathBuf::from(engine),
            source: e,
        }
    }
}

fn notify_complete(config: &ConversionConfig, success: bool) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_compile_complete(success);
    }
}

/// The `.log` the engine leaves next to the source, if readable.
async fn read_log(tex_path: &Path) -> Option<String> {
    let bytes = tokio::fs::read(tex_path.with_extension("log")).await.ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

fn generic_failure(exit_code: Option<i32>, stderr: &str) -> String {
    let code = exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string());
    if stderr.is_empty() {
        format!("LaTeX compilation failed with return code {}", code)
    } else {
        format!("LaTeX compilation failed with return code {}: {}", code, stderr)
    }
}

fn push_unique(target: &mut Vec<String>, items: Vec<String>) {
    for item in items {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

/// Extract errors and warnings from engine output.
///
/// A line starting with `!` opens an error. Up to two following lines are
/// appended: non-empty context lines, and the `l.<N>` locator, which ends
/// the error. Lines containing `Warning` that do not start with `(` are
/// warnings.
pub fn parse_diagnostics(output: &str) -> (Vec<String>, Vec<String>) {
    let lines: Vec<&str> = output.lines().collect();
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if line.starts_with('!') {
            let mut message = line.trim_end().to_string();
            for next in lines.iter().skip(i + 1).take(2) {
                let trimmed = next.trim();
                if next.starts_with("l.") {
                    message.push(' ');
                    message.push_str(trimmed);
                    break;
                }
                if !trimmed.is_empty() {
                    message.push(' ');
                    message.push_str(trimmed);
                }
            }
            errors.push(message);
        } else if line.contains("Warning") && !line.starts_with('(') {
            warnings.push(line.trim().to_string());
        }
    }

    (errors, warnings)
}

/// Ask the engine for its version; the first line of `--version` output.
pub async fn engine_version(engine: &str) -> Result<String, XtoxError> {
    let mut cmd = Command::new(engine);
    cmd.arg("--version").stdin(Stdio::null()).kill_on_drop(true);

    let output = match timeout(Duration::from_secs(10), cmd.output()).await {
        Err(_) => {
            return Err(XtoxError::Internal(format!(
                "'{engine} --version' did not answer within 10s"
            )))
        }
        Ok(result) => result.map_err(|e| spawn_error(engine, e))?,
    };

    if !output.status.success() {
        return Err(XtoxError::CompilerNotFound {
            engine: engine.to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
}
