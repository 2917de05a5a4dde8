//! Output file naming.
//!
//! Every artifact of one run shares the run's start-time stamp, so a
//! directory of collected data stays diffable across repeated runs.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Default directory for collected data.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Compact timestamp shared by all artifacts of one run.
pub fn run_stamp(started_at: DateTime<Utc>) -> String {
    started_at.format("%Y%m%d%H%M%S").to_string()
}

/// Path of the consolidated dataset.
pub fn consolidated_path(data_dir: &Path, stamp: &str) -> PathBuf {
    data_dir.join(format!("acs_payments_{stamp}.csv"))
}

/// Path of one region's dataset partition.
pub fn region_path(data_dir: &Path, region_code: &str, stamp: &str) -> PathBuf {
    data_dir.join(format!("acs_{region_code}_{stamp}.csv"))
}

/// Path of the failure manifest.
pub fn manifest_path(data_dir: &Path, stamp: &str) -> PathBuf {
    data_dir.join(format!("acs_failures_{stamp}.csv"))
}
