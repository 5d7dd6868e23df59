//! Pipeline stages for PDF-to-notebook conversion.
//!
//! Each submodule implements exactly one step; [`crate::convert`] runs them
//! in order, one page at a time.
//!
//! ## Data Flow
//!
//! ```text
//! split ──▶ render ──▶ thumbnail ──▶ metadata ──▶ archive ──▶ size
//! (lopdf)  (drawj2d/   (pdfium)      (JSON)      (zip/tar)   (advisory)
//!           pdfium)
//! ```
//!
//! 1. [`split`]     — one single-page PDF per input page, globally numbered
//! 2. [`render`]    — page file via the external drawing tool or pdfium
//! 3. [`thumbnail`] — small PNG preview; failures are non-fatal
//! 4. [`metadata`]  — `.local`, `.metadata` and `.content` sidecars
//! 5. [`archive`]   — pack the bundle tree, atomically
//! 6. [`size`]      — compare the archive against the transfer limit

pub mod archive;
pub mod metadata;
pub mod render;
pub mod size;
pub mod split;
pub mod thumbnail;
