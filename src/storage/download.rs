//! Model downloads with `.part` staging and resume

use super::ModelStore;
use crate::error::{GatewayError, Result};
use crate::progress::{DownloadProgress, DownloadStatus, ProgressHandler};
use reqwest::blocking::{Client, Response};
use reqwest::header::RANGE;
use reqwest::StatusCode;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Size of each read from the response body
pub const CHUNK_SIZE: usize = 256 * 1024;

/// Minimum spacing between intermediate progress reports
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Streams catalog models into storage
pub struct ModelDownloader {
    client: Client,
    store: ModelStore,
}

/// Where the body is being written and how much is already there
struct Staging {
    file: File,
    completed: u64,
    total: u64,
}

impl ModelDownloader {
    /// Downloader using `client`, which should not carry a read timeout
    pub fn new(client: Client, store: ModelStore) -> Self {
        Self { client, store }
    }

    /// Downloads a catalog model into storage and returns its final path.
    ///
    /// The body goes to `<filename>.part` and is renamed on success. A
    /// staging file left by an earlier attempt is resumed with a range
    /// request. Any failure after the transfer starts removes the staging
    /// file. No retries are attempted.
    pub fn download(&self, name: &str, progress: &dyn ProgressHandler) -> Result<PathBuf> {
        let entry = self
            .store
            .catalog()
            .find_by_name(name)
            .ok_or_else(|| GatewayError::not_found(format!("model '{}' in catalog", name)))?;
        let url = entry
            .url
            .as_deref()
            .ok_or_else(|| GatewayError::not_found(format!("download URL for '{}'", name)))?;

        let final_path = self.store.path_in_dir(&entry.filename)?;
        let part_path = self.store.part_path(&entry.filename);

        if let Ok(metadata) = fs::metadata(&final_path) {
            if metadata.is_file() {
                info!(model = %entry.name, "Model already installed");
                let size = metadata.len();
                progress.on_progress(&DownloadProgress::new(DownloadStatus::Success, size, size));
                return Ok(final_path);
            }
        }

        self.store.ensure_dir()?;
        progress.on_progress(&DownloadProgress::new(DownloadStatus::Starting, 0, 0));

        let resume_from = fs::metadata(&part_path).map(|m| m.len()).unwrap_or(0);
        let mut request = self.client.get(url);
        if resume_from > 0 {
            debug!(model = %entry.name, bytes = resume_from, "Found staging file, requesting range");
            request = request.header(RANGE, format!("bytes={}-", resume_from));
        }

        info!(model = %entry.name, url = %url, "Downloading model");
        let response = request
            .send()
            .map_err(|e| GatewayError::from_transport(url, e))?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::PARTIAL_CONTENT {
            if status == StatusCode::RANGE_NOT_SATISFIABLE {
                // stale staging file the server no longer agrees with
                remove_staging(&part_path);
            }
            let body = response.text().unwrap_or_default();
            warn!(model = %entry.name, status = status.as_u16(), "Download source refused request");
            return Err(GatewayError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let mut staging = open_staging(&part_path, &response, resume_from)?;
        if staging.completed > 0 {
            progress.on_progress(&DownloadProgress::new(
                DownloadStatus::Resuming,
                staging.completed,
                staging.total,
            ));
        }

        if let Err(e) = stream_body(response, &mut staging, url, progress) {
            remove_staging(&part_path);
            return Err(e);
        }
        drop(staging.file);

        fs::rename(&part_path, &final_path).map_err(|e| {
            remove_staging(&part_path);
            GatewayError::io_at("finalize", &final_path, e)
        })?;

        let total = if staging.total > 0 {
            staging.total
        } else {
            staging.completed
        };
        info!(model = %entry.name, bytes = total, path = %final_path.display(), "Model downloaded");
        progress.on_progress(&DownloadProgress::new(DownloadStatus::Success, total, total));

        Ok(final_path)
    }
}

/// Opens the staging file: appends after a 206, truncates after a 200
fn open_staging(part_path: &Path, response: &Response, resume_from: u64) -> Result<Staging> {
    let remaining = response.content_length().unwrap_or(0);

    if response.status() == StatusCode::PARTIAL_CONTENT && resume_from > 0 {
        let file = OpenOptions::new()
            .append(true)
            .open(part_path)
            .map_err(|e| GatewayError::io_at("open", part_path, e))?;
        let total = if remaining > 0 {
            resume_from + remaining
        } else {
            0
        };
        return Ok(Staging {
            file,
            completed: resume_from,
            total,
        });
    }

    if resume_from > 0 {
        debug!("Source ignored range request, restarting download");
    }
    let file = File::create(part_path).map_err(|e| GatewayError::io_at("create", part_path, e))?;
    Ok(Staging {
        file,
        completed: 0,
        total: remaining,
    })
}

/// Copies the body into the staging file in fixed-size chunks
fn stream_body(
    mut response: Response,
    staging: &mut Staging,
    url: &str,
    progress: &dyn ProgressHandler,
) -> Result<()> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut last_report = Instant::now();

    loop {
        let n = response.read(&mut buf).map_err(|e| GatewayError::Unreachable {
            target: url.to_string(),
            message: format!("download interrupted: {}", e),
        })?;
        if n == 0 {
            break;
        }

        staging
            .file
            .write_all(&buf[..n])
            .map_err(|e| GatewayError::io("Failed to write staging file", e))?;
        staging.completed += n as u64;

        if last_report.elapsed() >= PROGRESS_INTERVAL {
            progress.on_progress(&DownloadProgress::new(
                DownloadStatus::Downloading,
                staging.completed,
                staging.total,
            ));
            last_report = Instant::now();
        }
    }

    staging
        .file
        .flush()
        .map_err(|e| GatewayError::io("Failed to flush staging file", e))?;

    if staging.total > 0 && staging.completed < staging.total {
        return Err(GatewayError::Unreachable {
            target: url.to_string(),
            message: format!(
                "transfer ended after {} of {} bytes",
                staging.completed, staging.total
            ),
        });
    }

    Ok(())
}

fn remove_staging(part_path: &Path) {
    if let Err(e) = fs::remove_file(part_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %part_path.display(), error = %e, "Failed to remove staging file");
        }
    }
}
