//! Page rendering: one split page in, one page file in the bundle out.
//!
//! Two back-ends exist and a run uses exactly one of them
//! (see [`PageFormat`]):
//!
//! * **Drawing** — the external `drawj2d` tool converts the page to the
//!   device's vector format. The tool reads a one-line script on stdin
//!   (`image {page_3.pdf} 0 0 0 <scale>`) and is spawned with an argument
//!   vector, never through a shell. It runs inside the directory of the
//!   split page so the script only ever names `page_{n}.pdf`; the scratch
//!   path itself never enters the script. A timeout guards against a hung
//!   tool.
//!
//! * **Raster** — pdfium rasterises the page to PNG in-process. pdfium is
//!   not async-safe, so the work runs inside `spawn_blocking`.

use crate::config::{ConversionConfig, PageFormat};
use crate::error::NotebookError;
use crate::pipeline::split::PageUnit;
use image::ImageFormat;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Environment variable naming an explicit pdfium library file.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to pdfium: `PDFIUM_LIB_PATH`, then the working directory, then the
/// system library search path.
pub fn bind_pdfium() -> Result<Pdfium, NotebookError> {
    let from_env = std::env::var(PDFIUM_LIB_PATH_ENV)
        .ok()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from);

    let bindings = match from_env {
        Some(path) => Pdfium::bind_to_library(&path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| NotebookError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

/// Render `page` to `dest` using the back-end selected in `config`.
///
/// Returns the size in bytes of the written page file.
pub async fn render_page(
    page: &PageUnit,
    dest: &Path,
    config: &ConversionConfig,
) -> Result<u64, NotebookError> {
    match config.page_format {
        PageFormat::Drawing => {
            let timeout = Duration::from_secs(config.tool_timeout_secs);
            run_drawing_tool(&config.drawing_tool, page, dest, config.scale, timeout).await?;
        }
        PageFormat::Raster => {
            let src = page.path.clone();
            let out = dest.to_path_buf();
            let scale = config.scale;
            let index = page.index;
            tokio::task::spawn_blocking(move || rasterise_page_blocking(&src, &out, scale, index))
                .await
                .map_err(|e| NotebookError::Internal(format!("Render task panicked: {e}")))??;
        }
    }

    let bytes = std::fs::metadata(dest)
        .map_err(|e| NotebookError::RenderFailure {
            page: page.index,
            detail: format!("no output written to '{}': {e}", dest.display()),
        })?
        .len();
    debug!("Rendered page {} → {} ({} bytes)", page.index, dest.display(), bytes);
    Ok(bytes)
}

/// The script line fed to the drawing tool for one page.
///
/// `file_name` is relative to the tool's working directory and must not
/// contain braces.
pub fn drawing_script(file_name: &str, scale: f32) -> String {
    format!("image {{{file_name}}} 0 0 0 {scale}\n")
}

/// Spawn the drawing tool for one page and wait for it, bounded by `timeout`.
async fn run_drawing_tool(
    program: &Path,
    page: &PageUnit,
    dest: &Path,
    scale: f32,
    timeout: Duration,
) -> Result<(), NotebookError> {
    let failure = |detail: String| NotebookError::RenderFailure {
        page: page.index,
        detail,
    };

    let (work_dir, file_name) = match (page.path.parent(), page.path.file_name()) {
        (Some(dir), Some(name)) => (dir, name.to_string_lossy()),
        _ => return Err(failure(format!("'{}' is not a file path", page.path.display()))),
    };
    let dest = std::path::absolute(dest)
        .map_err(|e| failure(format!("cannot resolve '{}': {e}", dest.display())))?;
    // A relative program path with a directory part would otherwise be
    // looked up from the page directory.
    let program = if program.components().count() > 1 {
        std::path::absolute(program)
            .map_err(|e| failure(format!("cannot resolve '{}': {e}", program.display())))?
    } else {
        program.to_path_buf()
    };

    let mut child = Command::new(&program)
        .arg("-Trm")
        .arg("-o")
        .arg(&dest)
        .current_dir(if work_dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            work_dir
        })
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| failure(format!("cannot start '{}': {e}", program.display())))?;

    let script = drawing_script(&file_name, scale);
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(script.as_bytes())
            .await
            .map_err(|e| failure(format!("cannot write script to '{}': {e}", program.display())))?;
        // Dropping stdin closes the pipe so the tool sees end-of-input.
    }

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|e| failure(format!("waiting for '{}': {e}", program.display())))?,
        Err(_) => {
            return Err(failure(format!(
                "'{}' did not finish within {}s and was killed",
                program.display(),
                timeout.as_secs_f32()
            )))
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(failure(format!(
            "'{}' exited with {}:\n{}",
            program.display(),
            output.status,
            stderr.trim_end()
        )));
    }

    debug!(
        "drawj2d output for page {}:\n{}",
        page.index,
        String::from_utf8_lossy(&output.stdout).trim_end()
    );
    Ok(())
}

/// Blocking pdfium rasterisation of the first page of `src` at `scale`.
fn rasterise_page_blocking(
    src: &Path,
    dest: &Path,
    scale: f32,
    index: usize,
) -> Result<(), NotebookError> {
    let failure = |detail: String| NotebookError::RenderFailure {
        page: index,
        detail,
    };

    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_file(src, None)
        .map_err(|e| failure(format!("pdfium cannot open '{}': {e:?}", src.display())))?;
    let page = document
        .pages()
        .get(0)
        .map_err(|e| failure(format!("no page in '{}': {e:?}", src.display())))?;

    let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| failure(format!("{e:?}")))?;

    let image = bitmap.as_image();
    debug!(
        "Rasterised page {} → {}x{} px",
        index,
        image.width(),
        image.height()
    );
    image
        .save_with_format(dest, ImageFormat::Png)
        .map_err(|e| failure(format!("cannot save '{}': {e}", dest.display())))
}
