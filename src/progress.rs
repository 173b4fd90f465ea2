//! Progress-callback trait for compiler pass events.
//!
//! Inject an [`Arc<dyn CompileProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to be told
//! when each of the two compiler passes starts and finishes. The CLI uses it
//! to drive a spinner; a service could forward the events to a job record.
//!
//! # Example
//!
//! ```rust
//! use xtox::{CompileProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PassCounter {
//!     passes: AtomicUsize,
//! }
//!
//! impl CompileProgressCallback for PassCounter {
//!     fn on_pass_complete(&self, pass: u8, total: u8, exit_code: Option<i32>) {
//!         self.passes.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("pass {pass}/{total} exited with {exit_code:?}");
//!     }
//! }
//!
//! let counter = Arc::new(PassCounter { passes: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn CompileProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the PDF driver around each compiler invocation.
///
/// Implementations must be `Send + Sync`: batch conversion compiles several
/// documents at once and shares one config between them. All methods have
/// no-op defaults.
pub trait CompileProgressCallback: Send + Sync {
    /// Called just before a compiler pass is spawned.
    ///
    /// # Arguments
    /// * `pass`  — 1-indexed pass number
    /// * `total` — number of passes (always 2)
    fn on_pass_start(&self, pass: u8, total: u8) {
        let _ = (pass, total);
    }

    /// Called when a compiler pass exits (not called on timeout).
    ///
    /// # Arguments
    /// * `pass`      — 1-indexed pass number
    /// * `total`     — number of passes
    /// * `exit_code` — process exit code, `None` if killed by a signal
    fn on_pass_complete(&self, pass: u8, total: u8, exit_code: Option<i32>) {
        let _ = (pass, total, exit_code);
    }

    /// Called once after both passes, with the final verdict.
    fn on_compile_complete(&self, success: bool) {
        let _ = success;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl CompileProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn CompileProgressCallback>;
