//! Progress reporting for model downloads

mod handler;
mod logging;

pub use handler::{DownloadProgress, DownloadStatus, NoOpHandler, ProgressHandler};
pub use logging::LoggingHandler;
