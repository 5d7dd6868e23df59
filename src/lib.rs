//! # pdf2notebook
//!
//! Convert PDF documents into packaged notebook archives (`.rmdoc`, `.rmn`
//! or plain `.zip`) for e-ink note-taking devices.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF files
//!  │
//!  ├─ 1. Split      one single-page PDF per page, numbered across all inputs
//!  ├─ 2. Render     drawj2d → .rm drawing, or pdfium → .png raster
//!  ├─ 3. Thumbnail  pdfium → small .png preview (non-fatal)
//!  ├─ 4. Metadata   .local / .metadata / .content sidecars
//!  ├─ 5. Archive    zip or tar, written atomically
//!  └─ 6. Size       advisory check against the 100 MiB transfer limit
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2notebook::{convert, ArchiveFormat, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .archive_format(ArchiveFormat::Rmdoc)
//!         .output_path("notes.rmdoc")
//!         .build()?;
//!     let output = convert(&["chapter1.pdf", "chapter2.pdf"], &config).await?;
//!     eprintln!("{} pages → {}", output.stats.rendered_pages, output.archive_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2notebook` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## External tools
//!
//! The default [`PageFormat::Drawing`] output needs the `drawj2d` program on
//! `PATH` (or configured via [`ConversionConfigBuilder::drawing_tool`]).
//! Thumbnails and [`PageFormat::Raster`] output need the pdfium shared
//! library; set `PDFIUM_LIB_PATH` to point at it if it is not installed
//! system-wide.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod bundle;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use bundle::{BundleLayout, NotebookBundle};
pub use config::{
    ArchiveFormat, ConversionConfig, ConversionConfigBuilder, PageFailurePolicy, PageFormat,
};
pub use convert::{convert, convert_sync, inspect};
pub use error::{NotebookError, PageError};
pub use output::{ConversionOutput, ConversionStats, PageRecord};
pub use pipeline::size::{SizeReport, SizeVerdict};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
