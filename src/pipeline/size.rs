//! Size check: warn when the archive is too large for the device's web
//! upload interface.
//!
//! The interface rejects files above 100 MiB. The check is advisory: it
//! logs and reports, it never deletes or blocks the archive.

use serde::Serialize;
use std::path::Path;
use tracing::{error, info, warn};

const MIB: u64 = 1024 * 1024;

/// Hard ceiling of the transfer interface.
pub const MAX_TRANSFER_BYTES: u64 = 100 * MIB;

/// Sizes at or above this are reported as close to the ceiling.
pub const WARN_TRANSFER_BYTES: u64 = MAX_TRANSFER_BYTES - 10 * MIB;

/// Classification of an archive size against the transfer limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SizeVerdict {
    /// Comfortably below the limit.
    Ok,
    /// Within 10 MiB of the limit; transfer might fail.
    Warn,
    /// Above the limit; transfer will fail.
    Error,
}

/// Size of an archive and its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeReport {
    pub bytes: u64,
    pub verdict: SizeVerdict,
}

/// Classify `bytes` against [`WARN_TRANSFER_BYTES`] and [`MAX_TRANSFER_BYTES`].
pub fn classify_size(bytes: u64) -> SizeVerdict {
    if bytes > MAX_TRANSFER_BYTES {
        SizeVerdict::Error
    } else if bytes >= WARN_TRANSFER_BYTES {
        SizeVerdict::Warn
    } else {
        SizeVerdict::Ok
    }
}

/// Stat `path`, classify its size and log the outcome.
pub fn check_size(path: &Path) -> std::io::Result<SizeReport> {
    let bytes = std::fs::metadata(path)?.len();
    let report = SizeReport {
        bytes,
        verdict: classify_size(bytes),
    };
    log_report(&report);
    Ok(report)
}

fn log_report(report: &SizeReport) {
    let mib = report.bytes as f64 / MIB as f64;
    match report.verdict {
        SizeVerdict::Error => error!(
            "The file size is {mib:.2} MB, which is greater than the allowed 100 MB. \
             File transfer via the web interface will not work"
        ),
        SizeVerdict::Warn => warn!(
            "The file size is {mib:.2} MB, which is close to the limit of 100 MB. \
             File transfer via the web interface might not work"
        ),
        SizeVerdict::Ok => info!("The file size is {mib:.2} MB, which is within the limit."),
    }
}
