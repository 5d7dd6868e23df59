//! Error types for the pdf2notebook library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`NotebookError`] — **Fatal**: the conversion cannot produce an
//!   archive (missing input, render failure under the abort policy, archive
//!   I/O error). Returned as `Err(NotebookError)` from [`crate::convert()`].
//!
//! * [`PageError`] — **Non-fatal**: a thumbnail could not be produced, or a
//!   page render failed while the skip policy is active. Recorded in
//!   [`crate::output::PageRecord`] and the run continues.
//!
//! Size-limit findings are neither: they are advisory
//! [`crate::pipeline::size::SizeVerdict`] values attached to the output.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2notebook library.
#[derive(Debug, Error)]
pub enum NotebookError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// An input path does not reference an existing regular file.
    #[error("{path}: No such file or directory.")]
    InputNotFound { path: PathBuf },

    /// The file exists but does not start with the `%PDF` magic bytes.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The PDF header/xref/page tree could not be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// No input files were given.
    #[error("No input PDF files given")]
    NoInput,

    /// All inputs together contain zero pages.
    #[error("Input PDFs contain no pages; nothing to convert")]
    NoPages,

    // ── Config errors ─────────────────────────────────────────────────────
    /// Scale factor is zero, negative or not finite.
    #[error("Invalid scale {scale}: must be a finite number greater than 0")]
    InvalidScale { scale: f32 },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Rendering errors ──────────────────────────────────────────────────
    /// The drawing tool or pdfium failed to render a page.
    #[error("Rendering failed for page {page}: {detail}")]
    RenderFailure { page: usize, detail: String },

    /// Every page failed under the skip policy; there is nothing to archive.
    #[error("All {total} pages failed to render.\nFirst error: {first_error}")]
    AllPagesFailed { total: usize, first_error: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Raster pages and thumbnails need the pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place libpdfium next to the working directory.\n\
  • Install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create a directory or write a file inside the bundle tree.
    #[error("Failed to write '{path}': {source}")]
    BundleWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write the output archive. Any partial file has been removed.
    #[error("Failed to write archive '{path}': {source}")]
    ArchiveWriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NotebookError {
    /// Process exit code the CLI uses for this error.
    ///
    /// Usage-class problems (missing input, bad scale) exit with 1, every
    /// other fatal failure with 2.
    pub fn exit_code(&self) -> u8 {
        match self {
            NotebookError::InputNotFound { .. }
            | NotebookError::NoInput
            | NotebookError::InvalidScale { .. }
            | NotebookError::InvalidConfig(_) => 1,
            _ => 2,
        }
    }
}

/// A non-fatal error for a single page.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page render failed and the page was left out of the bundle.
    #[error("Page {page}: rendering failed, page skipped: {detail}")]
    Render { page: usize, detail: String },

    /// Thumbnail rasterisation failed; the page itself is fine.
    #[error("Page {page}: thumbnail failed: {detail}")]
    Thumbnail { page: usize, detail: String },
}
