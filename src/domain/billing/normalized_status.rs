//! Processor status normalization.
//!
//! Every processor-specific status string is mapped into four values before
//! any business rule looks at it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Internal status taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizedStatus {
    Approved,
    Pending,
    Rejected,
    Unknown,
}

impl NormalizedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizedStatus::Approved => "approved",
            NormalizedStatus::Pending => "pending",
            NormalizedStatus::Rejected => "rejected",
            NormalizedStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for NormalizedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a raw processor status to the internal taxonomy.
///
/// Case-insensitive substring match in priority order: approved, then
/// pending / in_process, then rejected / cancel / refused.
pub fn normalize(raw_status: &str) -> NormalizedStatus {
    let status = raw_status.to_lowercase();

    if status.contains("approved") {
        NormalizedStatus::Approved
    } else if status.contains("pending") || status.contains("in_process") {
        NormalizedStatus::Pending
    } else if status.contains("rejected") || status.contains("cancel") || status.contains("refused") {
        NormalizedStatus::Rejected
    } else {
        NormalizedStatus::Unknown
    }
}
