//! Sidecar metadata: the three JSON files the device reads to understand a
//! bundle.
//!
//! * `<id>.local`    — content-format marker (schema version only)
//! * `<id>.metadata` — visible name and timestamps
//! * `<id>.content`  — ordered page list with ordering tags
//!
//! ## Ordering tags
//!
//! The device sorts pages by a short string tag rather than by list
//! position. Tags are two lowercase letters: the first starts at `b` and
//! advances every 26 pages, the second cycles `a..z`, giving
//! `ba, bb, …, bz, ca, …, zz` for the first 650 pages. Past `zz` the tag is
//! prefixed with another `zz` per block of 650, which keeps every tag unique
//! and strictly increasing in byte order (`zz < zzba < zzbb …`).

use crate::bundle::BundleLayout;
use crate::error::NotebookError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// Schema version written to the marker file and the content index.
pub const CONTENT_FORMAT_VERSION: u32 = 2;

/// Pages addressable by a two-letter tag (`ba..zz`).
pub const TAGS_PER_BLOCK: usize = 25 * 26;

/// Ordering tag for the page at 0-based position `index`.
pub fn ordering_tag(index: usize) -> String {
    let block = index / TAGS_PER_BLOCK;
    let within = index % TAGS_PER_BLOCK;
    let first = (b'b' + (within / 26) as u8) as char;
    let second = (b'a' + (within % 26) as u8) as char;

    let mut tag = "zz".repeat(block);
    tag.push(first);
    tag.push(second);
    tag
}

// ── File schemas ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalMarker {
    pub content_format_version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// Milliseconds since the Unix epoch, as a decimal string.
    pub created_time: String,
    pub last_modified: String,
    pub last_opened: String,
    pub last_opened_page: u32,
    pub parent: String,
    pub pinned: bool,
    #[serde(rename = "type")]
    pub kind: String,
    pub visible_name: String,
}

/// A value stamped with the device's logical clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamped<T> {
    pub timestamp: String,
    pub value: T,
}

impl<T> Stamped<T> {
    fn new(timestamp: &str, value: T) -> Self {
        Self {
            timestamp: timestamp.to_string(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPage {
    pub id: String,
    pub idx: Stamped<String>,
    pub template: Stamped<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorEntry {
    pub first: String,
    pub second: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPages {
    pub last_opened: Stamped<String>,
    pub original: Stamped<i64>,
    pub pages: Vec<ContentPage>,
    pub uuids: Vec<AuthorEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentIndex {
    pub c_pages: ContentPages,
    pub cover_page_number: i32,
    pub document_metadata: serde_json::Map<String, serde_json::Value>,
    pub extra_metadata: serde_json::Map<String, serde_json::Value>,
    pub file_type: String,
    pub font_name: String,
    pub format_version: u32,
    pub line_height: i32,
    pub margins: u32,
    pub orientation: String,
    pub page_count: usize,
    pub page_tags: Vec<String>,
    /// Cumulative size of the rendered page files, as a decimal string.
    pub size_in_bytes: String,
    pub tags: Vec<String>,
    pub text_alignment: String,
    pub text_scale: u32,
    pub zoom_mode: String,
}

impl ContentIndex {
    /// Build the index for `page_ids` in their given order.
    pub fn new(page_ids: &[Uuid], size_in_bytes: u64) -> Self {
        let pages = page_ids
            .iter()
            .enumerate()
            .map(|(i, id)| ContentPage {
                id: id.to_string(),
                idx: Stamped::new("1:2", ordering_tag(i)),
                template: Stamped::new("1:1", "Blank".to_string()),
            })
            .collect();

        let last_opened = page_ids.first().map(Uuid::to_string).unwrap_or_default();

        Self {
            c_pages: ContentPages {
                last_opened: Stamped::new("1:1", last_opened),
                original: Stamped::new("0:0", -1),
                pages,
                uuids: vec![AuthorEntry {
                    first: Uuid::new_v4().to_string(),
                    second: 1,
                }],
            },
            cover_page_number: 0,
            document_metadata: serde_json::Map::new(),
            extra_metadata: serde_json::Map::new(),
            file_type: "notebook".into(),
            font_name: String::new(),
            format_version: CONTENT_FORMAT_VERSION,
            line_height: -1,
            margins: 125,
            orientation: "portrait".into(),
            page_count: page_ids.len(),
            page_tags: Vec::new(),
            size_in_bytes: size_in_bytes.to_string(),
            tags: Vec::new(),
            text_alignment: "justify".into(),
            text_scale: 1,
            zoom_mode: "bestFit".into(),
        }
    }
}

impl DocumentMetadata {
    pub fn new(visible_name: &str, now_millis: i64) -> Self {
        let now = now_millis.to_string();
        Self {
            created_time: now.clone(),
            last_modified: now,
            last_opened: "0".into(),
            last_opened_page: 0,
            parent: String::new(),
            pinned: false,
            kind: "DocumentType".into(),
            visible_name: visible_name.to_string(),
        }
    }
}

// ── Writers ──────────────────────────────────────────────────────────────

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), NotebookError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| NotebookError::Internal(format!("cannot serialise {}: {e}", path.display())))?;
    std::fs::write(path, json).map_err(|source| NotebookError::BundleWriteFailed {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Write the marker, metadata and content files for a bundle.
///
/// `pages_size` is the cumulative size of the rendered page files. The
/// creation timestamp is taken now.
pub fn synthesize(
    layout: &BundleLayout,
    page_ids: &[Uuid],
    display_name: &str,
    pages_size: u64,
) -> Result<(), NotebookError> {
    let now_millis = chrono::Utc::now().timestamp_millis();

    write_json(
        &layout.local_path(),
        &LocalMarker {
            content_format_version: CONTENT_FORMAT_VERSION,
        },
    )?;
    write_json(
        &layout.metadata_path(),
        &DocumentMetadata::new(display_name, now_millis),
    )?;
    write_json(&layout.content_path(), &ContentIndex::new(page_ids, pages_size))?;

    info!(
        "Metadata written for '{}' ({} pages, {} bytes)",
        display_name,
        page_ids.len(),
        pages_size
    );
    Ok(())
}
