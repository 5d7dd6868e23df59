//! Result types returned by [`crate::convert()`].

use crate::config::{ArchiveFormat, PageFormat};
use crate::error::PageError;
use crate::pipeline::size::SizeReport;
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

/// Everything a caller needs to know about a finished conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    /// Where the archive was written.
    pub archive_path: PathBuf,
    pub bundle_id: Uuid,
    pub display_name: String,
    pub archive_format: ArchiveFormat,
    pub page_format: PageFormat,
    /// One record per split page, in content-index order.
    pub pages: Vec<PageRecord>,
    pub size: SizeReport,
    pub stats: ConversionStats,
}

/// Outcome for one split page.
#[derive(Debug, Clone, Serialize)]
pub struct PageRecord {
    /// Global 1-based page number.
    pub page_num: usize,
    pub source: PathBuf,
    /// 1-based page number inside `source`.
    pub source_page: u32,
    /// Identifier in the bundle; None when the page was skipped.
    pub page_id: Option<Uuid>,
    /// Ordering tag in the content index; None when skipped.
    pub tag: Option<String>,
    pub page_bytes: u64,
    pub thumbnail: bool,
    pub error: Option<PageError>,
}

/// Counters and timings for a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionStats {
    pub total_pages: usize,
    pub rendered_pages: usize,
    pub skipped_pages: usize,
    pub thumbnails: usize,
    /// Cumulative size of the rendered page files.
    pub pages_bytes: u64,
    pub archive_bytes: u64,
    pub split_duration_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}
