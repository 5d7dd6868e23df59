//! Thumbnail generation: a small PNG preview of each page.
//!
//! Thumbnails are a convenience for the device's file browser, never a
//! requirement, so every failure here is a [`PageError`] that the caller logs
//! and moves past.

use crate::error::{NotebookError, PageError};
use crate::pipeline::render::bind_pdfium;
use crate::pipeline::split::PageUnit;
use image::ImageFormat;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::debug;

/// Width of every thumbnail in pixels; height follows the page aspect ratio.
pub const THUMBNAIL_WIDTH: i32 = 280;

/// Check once per run whether thumbnails can be produced at all.
pub fn thumbnails_available() -> Result<(), NotebookError> {
    bind_pdfium().map(|_| ())
}

/// Rasterise the first page of `page` to a PNG at `dest`.
pub async fn render_thumbnail(page: &PageUnit, dest: &Path) -> Result<(), PageError> {
    let src = page.path.clone();
    let out = dest.to_path_buf();
    let index = page.index;

    tokio::task::spawn_blocking(move || thumbnail_blocking(&src, &out, index))
        .await
        .map_err(|e| PageError::Thumbnail {
            page: index,
            detail: format!("thumbnail task panicked: {e}"),
        })?
}

/// Blocking implementation of thumbnail rendering.
fn thumbnail_blocking(src: &Path, dest: &Path, index: usize) -> Result<(), PageError> {
    let failure = |detail: String| PageError::Thumbnail {
        page: index,
        detail,
    };

    let pdfium = bind_pdfium().map_err(|e| failure(e.to_string()))?;
    let document = pdfium
        .load_pdf_from_file(src, None)
        .map_err(|e| failure(format!("pdfium cannot open '{}': {e:?}", src.display())))?;

    let pages = document.pages();
    if pages.len() == 0 {
        return Err(failure(format!("'{}' has zero pages", src.display())));
    }
    let first = pages.get(0).map_err(|e| failure(format!("{e:?}")))?;

    let render_config = PdfRenderConfig::new().set_target_width(THUMBNAIL_WIDTH);
    let image = first
        .render_with_config(&render_config)
        .map_err(|e| failure(format!("{e:?}")))?
        .as_image();

    image
        .save_with_format(dest, ImageFormat::Png)
        .map_err(|e| failure(format!("cannot save '{}': {e}", dest.display())))?;
    debug!("Thumbnail created: {}", dest.display());
    Ok(())
}
