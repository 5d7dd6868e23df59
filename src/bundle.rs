//! The notebook bundle: the directory tree that becomes the archive.
//!
//! ```text
//! <root>/
//!  ├─ <bundleId>.local
//!  ├─ <bundleId>.metadata
//!  ├─ <bundleId>.content
//!  ├─ <bundleId>/<pageId>.<rm|png>
//!  └─ <bundleId>.thumbnails/<pageId>.png
//! ```

use crate::config::PageFormat;
use crate::error::NotebookError;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Path arithmetic for one bundle. Holds no state besides its root and id.
#[derive(Debug, Clone)]
pub struct BundleLayout {
    root: PathBuf,
    bundle_id: Uuid,
}

impl BundleLayout {
    pub fn new(root: impl Into<PathBuf>, bundle_id: Uuid) -> Self {
        Self {
            root: root.into(),
            bundle_id,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bundle_id(&self) -> Uuid {
        self.bundle_id
    }

    fn sidecar(&self, ext: &str) -> PathBuf {
        self.root.join(format!("{}.{ext}", self.bundle_id))
    }

    /// `<bundleId>.local` — content-format marker.
    pub fn local_path(&self) -> PathBuf {
        self.sidecar("local")
    }

    /// `<bundleId>.metadata` — display name and timestamps.
    pub fn metadata_path(&self) -> PathBuf {
        self.sidecar("metadata")
    }

    /// `<bundleId>.content` — ordered page index.
    pub fn content_path(&self) -> PathBuf {
        self.sidecar("content")
    }

    /// `<bundleId>/` — one rendered file per page.
    pub fn page_dir(&self) -> PathBuf {
        self.root.join(self.bundle_id.to_string())
    }

    /// `<bundleId>.thumbnails/` — one PNG per page.
    pub fn thumbnail_dir(&self) -> PathBuf {
        self.sidecar("thumbnails")
    }

    pub fn page_path(&self, page_id: Uuid, format: PageFormat) -> PathBuf {
        self.page_dir()
            .join(format!("{page_id}.{}", format.extension()))
    }

    pub fn thumbnail_path(&self, page_id: Uuid) -> PathBuf {
        self.thumbnail_dir().join(format!("{page_id}.png"))
    }

    /// Create the root, page and thumbnail directories.
    pub fn create_dirs(&self, with_thumbnails: bool) -> Result<(), NotebookError> {
        let mut dirs = vec![self.page_dir()];
        if with_thumbnails {
            dirs.push(self.thumbnail_dir());
        }
        for dir in dirs {
            std::fs::create_dir_all(&dir)
                .map_err(|source| NotebookError::BundleWriteFailed { path: dir, source })?;
        }
        Ok(())
    }
}

/// A page that made it into the bundle.
#[derive(Debug, Clone)]
pub struct BundlePage {
    /// Global 1-based page number from the splitter.
    pub page_num: usize,
    pub page_id: Uuid,
    /// Size of the rendered page file.
    pub bytes: u64,
    pub has_thumbnail: bool,
}

/// The in-progress notebook: identity, name and pages in split order.
#[derive(Debug, Clone)]
pub struct NotebookBundle {
    pub layout: BundleLayout,
    pub display_name: String,
    pub pages: Vec<BundlePage>,
}

impl NotebookBundle {
    /// Start an empty bundle with a fresh identifier rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, display_name: impl Into<String>) -> Self {
        Self {
            layout: BundleLayout::new(root, Uuid::new_v4()),
            display_name: display_name.into(),
            pages: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.layout.bundle_id()
    }

    pub fn page_ids(&self) -> Vec<Uuid> {
        self.pages.iter().map(|p| p.page_id).collect()
    }

    /// Cumulative size of all rendered page files.
    pub fn pages_size(&self) -> u64 {
        self.pages.iter().map(|p| p.bytes).sum()
    }
}
