//! Progress handler trait and download progress values

use serde::Serialize;
use std::fmt;

/// Phase of a model download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    /// Transfer is about to begin
    Starting,
    /// A staging file from an earlier attempt is being continued
    Resuming,
    /// Bytes are flowing
    Downloading,
    /// File is in place under its final name
    Success,
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DownloadStatus::Starting => "starting",
            DownloadStatus::Resuming => "resuming",
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Success => "success",
        };
        f.write_str(label)
    }
}

/// One progress report. `total` is 0 when the source sent no length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DownloadProgress {
    pub status: DownloadStatus,
    pub completed: u64,
    pub total: u64,
}

impl DownloadProgress {
    pub fn new(status: DownloadStatus, completed: u64, total: u64) -> Self {
        Self {
            status,
            completed,
            total,
        }
    }

    /// Completed share in `0.0..=1.0`, or `None` when the total is unknown
    pub fn fraction(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some((self.completed as f64 / self.total as f64).min(1.0))
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == DownloadStatus::Success
    }
}

/// Receives download progress reports
pub trait ProgressHandler: Send + Sync {
    /// Called on the downloading thread for every report
    fn on_progress(&self, progress: &DownloadProgress);
}

impl<F> ProgressHandler for F
where
    F: Fn(&DownloadProgress) + Send + Sync,
{
    fn on_progress(&self, progress: &DownloadProgress) {
        self(progress)
    }
}

/// No-op handler that ignores all reports
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _progress: &DownloadProgress) {}
}
