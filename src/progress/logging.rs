//! Logging-based progress handler

use super::{DownloadProgress, DownloadStatus, ProgressHandler};
use tracing::{debug, info};

/// Handler that logs download progress using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, progress: &DownloadProgress) {
        match progress.status {
            DownloadStatus::Starting => {
                info!("Starting download");
            }
            DownloadStatus::Resuming => {
                info!(bytes = progress.completed, "Resuming partial download");
            }
            DownloadStatus::Downloading => match progress.fraction() {
                Some(fraction) => debug!(
                    bytes = progress.completed,
                    total = progress.total,
                    percent = %format_args!("{:.1}", fraction * 100.0),
                    "Downloading"
                ),
                None => debug!(bytes = progress.completed, "Downloading"),
            },
            DownloadStatus::Success => {
                info!(bytes = progress.total, "Download complete");
            }
        }
    }
}
