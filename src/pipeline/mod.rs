//! Pipeline stages for Markdown-to-PDF conversion.
//!
//! Each submodule implements one transformation step and is testable on
//! its own.
//!
//! ## Data Flow
//!
//! ```text
//! images ──▶ transpile ──▶ structure ──▶ compile
//! (relocate)  (md → tex)    (envelope)    (engine ×2)
//!                │
//!                ├─ inline  (spans + escaping)
//!                └─ table   (buffered rows → tabular)
//! ```
//!
//! 1. [`images`]    — copy referenced images next to the output and rewrite
//!    their paths
//! 2. [`transpile`] — the line-by-line block state machine; pure, never fails
//! 3. [`structure`] — check and repair `\documentclass`, `\begin{document}`
//!    and `\end{document}`
//! 4. [`compile`]   — run the LaTeX engine twice under a timeout and parse its
//!    diagnostics; the only stage that spawns processes

pub mod compile;
pub mod images;
pub mod inline;
pub mod structure;
pub mod table;
pub mod transpile;
