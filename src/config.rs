//! Configuration types for PDF-to-notebook conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The CLI maps its flags onto the
//! builder one-to-one, so library callers and the binary share the same
//! defaults and the same validation.

use crate::error::NotebookError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default page scale factor handed to the renderer.
pub const DEFAULT_SCALE: f32 = 0.75;

/// Default program name of the external drawing tool.
pub const DEFAULT_DRAWING_TOOL: &str = "drawj2d";

/// Configuration for a PDF-to-notebook conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2notebook::{ArchiveFormat, ConversionConfig};
///
/// let config = ConversionConfig::builder()
///     .scale(0.5)
///     .archive_format(ArchiveFormat::Rmdoc)
///     .display_name("Lecture notes")
///     .build()
///     .unwrap();
/// assert_eq!(config.scale, 0.5);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Linear scale applied to every rendered page. Default: 0.75.
    ///
    /// Values above 1.0 enlarge, values below shrink. Must be finite and
    /// strictly positive; [`ConversionConfigBuilder::build`] rejects anything
    /// else with [`NotebookError::InvalidScale`].
    pub scale: f32,

    /// Which file family each page is rendered to. Default: [`PageFormat::Drawing`].
    pub page_format: PageFormat,

    /// Container format of the produced archive. Default: [`ArchiveFormat::Zip`].
    pub archive_format: ArchiveFormat,

    /// Generate a PNG thumbnail per page. Default: true.
    pub thumbnails: bool,

    /// What to do when a single page fails to render. Default: abort.
    pub failure_policy: PageFailurePolicy,

    /// Program used for [`PageFormat::Drawing`]. Default: `drawj2d` on `PATH`.
    pub drawing_tool: PathBuf,

    /// Per-page timeout for the drawing tool in seconds. Default: 120.
    ///
    /// The child process is killed when the timeout elapses.
    pub tool_timeout_secs: u64,

    /// Name shown on the device. If None, derived from the first input file.
    pub display_name: Option<String>,

    /// Archive destination. If None, `<name>_<timestamp>.<ext>` in the
    /// current directory.
    pub output_path: Option<PathBuf>,

    /// Directory under which the per-run scratch directory is created.
    /// If None, the system temp directory is used.
    pub scratch_root: Option<PathBuf>,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            page_format: PageFormat::default(),
            archive_format: ArchiveFormat::default(),
            thumbnails: true,
            failure_policy: PageFailurePolicy::default(),
            drawing_tool: PathBuf::from(DEFAULT_DRAWING_TOOL),
            tool_timeout_secs: 120,
            display_name: None,
            output_path: None,
            scratch_root: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("scale", &self.scale)
            .field("page_format", &self.page_format)
            .field("archive_format", &self.archive_format)
            .field("thumbnails", &self.thumbnails)
            .field("failure_policy", &self.failure_policy)
            .field("drawing_tool", &self.drawing_tool)
            .field("tool_timeout_secs", &self.tool_timeout_secs)
            .field("display_name", &self.display_name)
            .field("output_path", &self.output_path)
            .field("scratch_root", &self.scratch_root)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Check that a scale factor is usable by the renderers.
pub fn validate_scale(scale: f32) -> Result<f32, NotebookError> {
    if scale.is_finite() && scale > 0.0 {
        Ok(scale)
    } else {
        Err(NotebookError::InvalidScale { scale })
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn scale(mut self, scale: f32) -> Self {
        self.config.scale = scale;
        self
    }

    pub fn page_format(mut self, format: PageFormat) -> Self {
        self.config.page_format = format;
        self
    }

    pub fn archive_format(mut self, format: ArchiveFormat) -> Self {
        self.config.archive_format = format;
        self
    }

    pub fn thumbnails(mut self, v: bool) -> Self {
        self.config.thumbnails = v;
        self
    }

    pub fn failure_policy(mut self, policy: PageFailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn drawing_tool(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.drawing_tool = program.into();
        self
    }

    pub fn tool_timeout_secs(mut self, secs: u64) -> Self {
        self.config.tool_timeout_secs = secs;
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.config.display_name = Some(name.into());
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = Some(path.into());
        self
    }

    pub fn scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_root = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, NotebookError> {
        let c = &self.config;
        validate_scale(c.scale)?;
        if c.tool_timeout_secs == 0 {
            return Err(NotebookError::InvalidConfig(
                "Tool timeout must be ≥ 1 second".into(),
            ));
        }
        if c.drawing_tool.as_os_str().is_empty() {
            return Err(NotebookError::InvalidConfig(
                "Drawing tool program must not be empty".into(),
            ));
        }
        if let Some(ref name) = c.display_name {
            if name.trim().is_empty() {
                return Err(NotebookError::InvalidConfig(
                    "Display name must not be blank".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// File family produced for every page of one bundle.
///
/// A bundle never mixes both: the choice is made once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageFormat {
    /// Proprietary single-page drawing (`.rm`) written by the external
    /// drawing tool. (default)
    #[default]
    Drawing,
    /// PNG raster rendered in-process with pdfium.
    Raster,
}

impl PageFormat {
    /// File extension of a rendered page, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            PageFormat::Drawing => "rm",
            PageFormat::Raster => "png",
        }
    }
}

/// Container written by the archiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArchiveFormat {
    /// Plain zip with a `.zip` extension. (default)
    #[default]
    Zip,
    /// Zip container with the device's `.rmdoc` extension.
    Rmdoc,
    /// Tar container with the `.rmn` extension.
    Rmn,
}

impl ArchiveFormat {
    /// File extension of the archive, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Rmdoc => "rmdoc",
            ArchiveFormat::Rmn => "rmn",
        }
    }

    /// True when entries are stored in a tar stream rather than a zip.
    pub fn is_tar(self) -> bool {
        matches!(self, ArchiveFormat::Rmn)
    }

    /// Infer the format from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "zip" => Some(ArchiveFormat::Zip),
            "rmdoc" => Some(ArchiveFormat::Rmdoc),
            "rmn" => Some(ArchiveFormat::Rmn),
            _ => None,
        }
    }
}

/// Reaction to a page whose rendering fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageFailurePolicy {
    /// Stop the whole run with [`NotebookError::RenderFailure`]. (default)
    #[default]
    Abort,
    /// Log the failure, leave the page out of the bundle and continue.
    Skip,
}
