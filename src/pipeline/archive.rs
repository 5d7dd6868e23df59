//! Archiving: pack the bundle tree into a single `.zip` / `.rmdoc` / `.rmn`.
//!
//! Entries are named by their path relative to the bundle root with `/`
//! separators, and written in sorted order so two runs over the same tree
//! produce archives with identical entry order.
//!
//! The archive is first written to a sibling `*.tmp` file and renamed into
//! place only after it is complete. On any error the temp file is removed,
//! so a failed run never leaves a truncated archive at the destination.

use crate::config::ArchiveFormat;
use crate::error::NotebookError;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Every regular file under `root` as `(absolute path, entry name)`, sorted.
pub fn collect_entries(root: &Path) -> io::Result<Vec<(PathBuf, String)>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(io::Error::other)?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        entries.push((entry.path().to_path_buf(), name));
    }
    Ok(entries)
}

/// Write every regular file under `bundle_root` into `archive_path`.
///
/// Returns the size of the finished archive in bytes.
pub fn write_archive(
    bundle_root: &Path,
    archive_path: &Path,
    format: ArchiveFormat,
) -> Result<u64, NotebookError> {
    let failure = |source: io::Error| NotebookError::ArchiveWriteFailure {
        path: archive_path.to_path_buf(),
        source,
    };

    if let Some(parent) = archive_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(failure)?;
    }

    let tmp_path = temp_path_for(archive_path);
    let result = write_entries(bundle_root, &tmp_path, format)
        .and_then(|()| std::fs::rename(&tmp_path, archive_path));

    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(failure(e));
    }

    let bytes = std::fs::metadata(archive_path).map_err(failure)?.len();
    info!(
        "Archive written: {} ({} bytes, {:?})",
        archive_path.display(),
        bytes,
        format
    );
    Ok(bytes)
}

/// `out/My.rmdoc` → `out/My.rmdoc.tmp`
fn temp_path_for(archive_path: &Path) -> PathBuf {
    let mut name = archive_path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_entries(bundle_root: &Path, dest: &Path, format: ArchiveFormat) -> io::Result<()> {
    let entries = collect_entries(bundle_root)?;
    let file = BufWriter::new(File::create(dest)?);

    if format.is_tar() {
        let mut builder = tar::Builder::new(file);
        for (path, name) in &entries {
            debug!("tar += {name}");
            builder.append_path_with_name(path, name)?;
        }
        builder.into_inner()?.flush()?;
    } else {
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (path, name) in &entries {
            debug!("zip += {name}");
            zip.start_file(name.as_str(), options).map_err(io::Error::other)?;
            let mut src = File::open(path)?;
            io::copy(&mut src, &mut zip)?;
        }
        zip.finish().map_err(io::Error::other)?.flush()?;
    }
    Ok(())
}
