//! Conversion entry points: run the whole pipeline for a list of PDFs.
//!
//! The pipeline is strictly sequential. Each run owns a fresh scratch
//! directory (`pdf2notebook-XXXX`) holding the split pages and the bundle
//! tree; it is a [`TempDir`], so it disappears on every exit path including
//! early returns and panics. Only the finished archive outlives the run.

use crate::bundle::{BundlePage, NotebookBundle};
use crate::config::{validate_scale, ArchiveFormat, ConversionConfig, PageFailurePolicy, PageFormat};
use crate::error::{NotebookError, PageError};
use crate::output::{ConversionOutput, ConversionStats, PageRecord};
use crate::pipeline::{archive, metadata, render, size, split, thumbnail};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Convert one or more PDF files into a single notebook archive.
///
/// Pages are taken in input order, then page order. Returns the archive
/// location, per-page records and an advisory size report.
///
/// # Errors
/// Returns `Err(NotebookError)` for fatal errors only:
/// - an input is missing, unreadable or not a PDF (nothing is written)
/// - a page fails to render under [`PageFailurePolicy::Abort`]
/// - the archive cannot be written (no partial archive is left behind)
///
/// Thumbnail failures and size warnings never fail the run.
pub async fn convert<P: AsRef<Path>>(
    inputs: &[P],
    config: &ConversionConfig,
) -> Result<ConversionOutput, NotebookError> {
    let total_start = Instant::now();
    validate_scale(config.scale)?;

    // ── Step 1: Validate inputs before touching the disk ─────────────────
    let sources: Vec<PathBuf> = inputs.iter().map(|p| p.as_ref().to_path_buf()).collect();
    let first = sources.first().ok_or(NotebookError::NoInput)?;
    for source in &sources {
        split::validate_source(source)?;
    }

    let now = Local::now();
    let display_name = config
        .display_name
        .clone()
        .unwrap_or_else(|| default_display_name(first, &now));
    let archive_path = config
        .output_path
        .clone()
        .unwrap_or_else(|| default_output_path(&display_name, config.archive_format, &now));
    info!(
        "Converting {} file(s) into '{}' → {}",
        sources.len(),
        display_name,
        archive_path.display()
    );

    // Raster pages cannot be produced at all without pdfium: fail before splitting.
    if config.page_format == PageFormat::Raster {
        render::bind_pdfium()?;
    }

    // ── Step 2: Per-run scratch directory ────────────────────────────────
    let scratch = create_scratch_dir(config.scratch_root.as_deref())?;
    debug!("Scratch directory: {}", scratch.path().display());

    // ── Step 3: Split pages ──────────────────────────────────────────────
    let split_start = Instant::now();
    let pages_dir = scratch.path().join("pages");
    let units = tokio::task::spawn_blocking(move || split::split_pages(&sources, &pages_dir))
        .await
        .map_err(|e| NotebookError::Internal(format!("Split task panicked: {e}")))??;
    let split_duration_ms = split_start.elapsed().as_millis() as u64;
    let total_pages = units.len();

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(total_pages);
    }

    // ── Step 4: Prepare the bundle tree ──────────────────────────────────
    let mut bundle = NotebookBundle::new(scratch.path().join("bundle"), display_name.clone());
    let with_thumbnails = config.thumbnails && thumbnails_enabled();
    bundle.layout.create_dirs(with_thumbnails)?;

    // ── Step 5: Render every page, in order ──────────────────────────────
    let render_start = Instant::now();
    let mut records = Vec::with_capacity(total_pages);
    let mut first_failure: Option<String> = None;

    for unit in &units {
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(unit.index, total_pages);
        }

        let page_id = Uuid::new_v4();
        let dest = bundle.layout.page_path(page_id, config.page_format);

        let page_bytes = match render::render_page(unit, &dest, config).await {
            Ok(bytes) => bytes,
            Err(e) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_error(unit.index, total_pages, &e.to_string());
                }
                if config.failure_policy == PageFailurePolicy::Abort {
                    return Err(e);
                }

                warn!("Skipping page {}: {}", unit.index, e);
                let _ = std::fs::remove_file(&dest);
                first_failure.get_or_insert_with(|| e.to_string());
                records.push(PageRecord {
                    page_num: unit.index,
                    source: unit.source.clone(),
                    source_page: unit.source_page,
                    page_id: None,
                    tag: None,
                    page_bytes: 0,
                    thumbnail: false,
                    error: Some(PageError::Render {
                        page: unit.index,
                        detail: e.to_string(),
                    }),
                });
                continue;
            }
        };

        let mut page_error = None;
        let has_thumbnail = if with_thumbnails {
            match thumbnail::render_thumbnail(unit, &bundle.layout.thumbnail_path(page_id)).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("{}", e);
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_page_error(unit.index, total_pages, &e.to_string());
                    }
                    let _ = std::fs::remove_file(bundle.layout.thumbnail_path(page_id));
                    page_error = Some(e);
                    false
                }
            }
        } else {
            false
        };

        if let Some(ref cb) = config.progress_callback {
            cb.on_page_complete(unit.index, total_pages, page_bytes);
        }

        records.push(PageRecord {
            page_num: unit.index,
            source: unit.source.clone(),
            source_page: unit.source_page,
            page_id: Some(page_id),
            tag: Some(metadata::ordering_tag(bundle.pages.len())),
            page_bytes,
            thumbnail: has_thumbnail,
            error: page_error,
        });
        bundle.pages.push(BundlePage {
            page_num: unit.index,
            page_id,
            bytes: page_bytes,
            has_thumbnail,
        });
    }
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    if bundle.pages.is_empty() {
        return Err(NotebookError::AllPagesFailed {
            total: total_pages,
            first_error: first_failure.unwrap_or_else(|| "unknown error".into()),
        });
    }

    // ── Step 6: Sidecar metadata ─────────────────────────────────────────
    metadata::synthesize(
        &bundle.layout,
        &bundle.page_ids(),
        &bundle.display_name,
        bundle.pages_size(),
    )?;

    // ── Step 7: Archive ──────────────────────────────────────────────────
    let root = bundle.layout.root().to_path_buf();
    let dest = archive_path.clone();
    let format = config.archive_format;
    let archive_bytes =
        tokio::task::spawn_blocking(move || archive::write_archive(&root, &dest, format))
            .await
            .map_err(|e| NotebookError::Internal(format!("Archive task panicked: {e}")))??;

    if let Some(ref cb) = config.progress_callback {
        cb.on_archive_written(&archive_path, archive_bytes);
    }

    // ── Step 8: Advisory size check ──────────────────────────────────────
    let size_report =
        size::check_size(&archive_path).map_err(|source| NotebookError::ArchiveWriteFailure {
            path: archive_path.clone(),
            source,
        })?;

    let stats = ConversionStats {
        total_pages,
        rendered_pages: bundle.pages.len(),
        skipped_pages: total_pages - bundle.pages.len(),
        thumbnails: bundle.pages.iter().filter(|p| p.has_thumbnail).count(),
        pages_bytes: bundle.pages_size(),
        archive_bytes,
        split_duration_ms,
        render_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {}/{} pages, {}ms total",
        stats.rendered_pages, total_pages, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(total_pages, stats.rendered_pages);
    }

    Ok(ConversionOutput {
        archive_path,
        bundle_id: bundle.id(),
        display_name,
        archive_format: config.archive_format,
        page_format: config.page_format,
        pages: records,
        size: size_report,
        stats,
    })
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync<P: AsRef<Path>>(
    inputs: &[P],
    config: &ConversionConfig,
) -> Result<ConversionOutput, NotebookError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| NotebookError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(convert(inputs, config))
}

/// Total page count across `inputs`, without writing anything.
pub fn inspect<P: AsRef<Path>>(inputs: &[P]) -> Result<usize, NotebookError> {
    if inputs.is_empty() {
        return Err(NotebookError::NoInput);
    }
    inputs
        .iter()
        .map(|p| split::page_count(p.as_ref()))
        .sum()
}

/// Display name derived from the first input: its file stem with all
/// whitespace removed, or `Notebook <timestamp>` when that leaves nothing.
pub fn default_display_name(first_input: &Path, now: &DateTime<Local>) -> String {
    let stem: String = first_input
        .file_stem()
        .map(|s| s.to_string_lossy().chars().filter(|c| !c.is_whitespace()).collect())
        .unwrap_or_default();
    if stem.is_empty() {
        format!("Notebook {}", now.format("%Y-%m-%d %H:%M:%S"))
    } else {
        stem
    }
}

/// `<name>_<YYYYmmdd-HHMMSS>.<ext>` in the current directory, with any
/// character unsafe in file names replaced by `_`.
pub fn default_output_path(display_name: &str, format: ArchiveFormat, now: &DateTime<Local>) -> PathBuf {
    let safe: String = display_name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    PathBuf::from(format!(
        "{}_{}.{}",
        safe,
        now.format("%Y%m%d-%H%M%S"),
        format.extension()
    ))
}

fn create_scratch_dir(root: Option<&Path>) -> Result<TempDir, NotebookError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("pdf2notebook-");
    let result = match root {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| NotebookError::BundleWriteFailed {
                path: dir.to_path_buf(),
                source,
            })?;
            builder.tempdir_in(dir)
        }
        None => builder.tempdir(),
    };
    result.map_err(|source| NotebookError::BundleWriteFailed {
        path: root.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir),
        source,
    })
}

/// Thumbnails need pdfium; without it they are switched off for the run.
fn thumbnails_enabled() -> bool {
    match thumbnail::thumbnails_available() {
        Ok(()) => true,
        Err(e) => {
            warn!("Thumbnails disabled: {}", e);
            false
        }
    }
}
