//! Configuration types for Markdown → LaTeX → PDF conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Every knob lives in one struct so a
//! config can be shared across batch jobs and logged as a whole.

use crate::error::XtoxError;
use crate::progress::ProgressCallback;
use std::fmt;

/// Title written into the preamble when none is configured.
pub const DEFAULT_TITLE: &str = "Converted from Markdown";

/// Configuration for a conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use xtox::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .engine("xelatex")
///     .compile_timeout_secs(60)
///     .auto_fix(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.engine, "xelatex");
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Emit the fixed preamble and the `\end{document}` trailer. Default: true.
    ///
    /// With `false` the transpiler produces a bare body suitable for
    /// `\input{}` into a hand-written document.
    pub include_preamble: bool,

    /// Document title placed in `\title{}`. Default: "Converted from Markdown".
    pub title: String,

    /// Document author placed in `\author{}`. Default: empty.
    pub author: String,

    /// LaTeX engine binary name or path. Default: "pdflatex".
    pub engine: String,

    /// Timeout for each compiler pass, in seconds. Default: 30.
    ///
    /// Applied per pass, so a full compile may take up to twice this.
    pub compile_timeout_secs: u64,

    /// Insert a missing `\documentclass`, `\begin{document}` or
    /// `\end{document}` before compiling. Default: false.
    pub auto_fix: bool,

    /// Keep the unrepaired file as `<name>.bak` when repairing. Default: true.
    pub backup: bool,

    /// Copy referenced images under `<output>/images/` before transpiling.
    /// Default: true.
    pub copy_images: bool,

    /// Number of documents converted at once by
    /// [`crate::convert::convert_batch`]. Default: 4.
    pub concurrency: usize,

    /// Optional observer for compiler pass events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            include_preamble: true,
            title: DEFAULT_TITLE.to_string(),
            author: String::new(),
            engine: "pdflatex".to_string(),
            compile_timeout_secs: 30,
            auto_fix: false,
            backup: true,
            copy_images: true,
            concurrency: 4,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("include_preamble", &self.include_preamble)
            .field("title", &self.title)
            .field("author", &self.author)
            .field("engine", &self.engine)
            .field("compile_timeout_secs", &self.compile_timeout_secs)
            .field("auto_fix", &self.auto_fix)
            .field("backup", &self.backup)
            .field("copy_images", &self.copy_images)
            .field("concurrency", &self.concurrency)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn CompileProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn include_preamble(mut self, v: bool) -> Self {
        self.config.include_preamble = v;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.config.author = author.into();
        self
    }

    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.config.engine = engine.into();
        self
    }

    pub fn compile_timeout_secs(mut self, secs: u64) -> Self {
        self.config.compile_timeout_secs = secs.max(1);
        self
    }

    pub fn auto_fix(mut self, v: bool) -> Self {
        self.config.auto_fix = v;
        self
    }

    pub fn backup(mut self, v: bool) -> Self {
        self.config.backup = v;
        self
    }

    pub fn copy_images(mut self, v: bool) -> Self {
        self.config.copy_images = v;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, XtoxError> {
        let c = &self.config;
        if c.engine.trim().is_empty() {
            return Err(XtoxError::InvalidConfig(
                "LaTeX engine name must not be empty".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(XtoxError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ConversionConfig::default();
        assert!(c.include_preamble);
        assert_eq!(c.title, DEFAULT_TITLE);
        assert_eq!(c.engine, "pdflatex");
        assert_eq!(c.compile_timeout_secs, 30);
        assert!(!c.auto_fix);
        assert!(c.backup);
    }

    #[test]
    fn builder_clamps() {
        let c = ConversionConfig::builder()
            .compile_timeout_secs(0)
            .concurrency(0)
            .build()
            .unwrap();
        assert_eq!(c.compile_timeout_secs, 1);
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn empty_engine_rejected() {
        let err = ConversionConfig::builder().engine("  ").build().unwrap_err();
        assert!(matches!(err, XtoxError::InvalidConfig(_)));
    }

    #[test]
    fn debug_hides_callback() {
        let dbg = format!("{:?}", ConversionConfig::default());
        assert!(dbg.contains("pdflatex"));
        assert!(dbg.contains("progress_callback: None"));
    }
}
