//! llmgate - local gateway for on-device LLM inference
//!
//! This library manages the lifecycle of a local inference engine
//! (llama-server and compatibles): it picks a model that fits the host,
//! downloads GGUF weight files, supervises the engine process and streams
//! chat completions through a protocol-neutral interface.
//!
//! # Core Concepts
//!
//! - **Catalog**: static registry of downloadable models, bucketed by
//!   hardware [`Tier`]
//! - **Storage**: one directory of model files; downloads stage through a
//!   `.part` file and are renamed when complete
//! - **Engine**: the child process serving one model over HTTP, restarted on
//!   every model switch and considered usable only after its health probe
//!   passes
//! - **Protocol**: how a conversation is encoded for the engine and how its
//!   streamed reply is decoded into [`Chunk`]s
//!
//! # Example Usage
//!
//! ```no_run
//! use llmgate::{ChatMessage, GatewayClient, GatewayConfig, NoOpHandler};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = GatewayClient::new(GatewayConfig::default())?;
//!
//! if !gateway.is_running() {
//!     gateway.pull("qwen2.5-0.5b", &NoOpHandler)?;
//!     gateway.switch_model("qwen2.5-0.5b")?;
//! }
//!
//! let reply = gateway
//!     .generate("qwen2.5-0.5b", "Say hello")?
//!     .collect_text()?;
//! println!("{}", reply);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`catalog`]: model registry, tiers and recommendations
//! - [`storage`]: installed models and downloads
//! - [`engine`]: engine address, health probe and process supervisor
//! - [`protocol`]: wire protocols and the streaming reader
//! - [`gateway`]: the composed client

pub mod catalog;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod progress;
pub mod protocol;
pub mod storage;
pub mod util;

pub use catalog::{
    derive_display_name, recommend, CatalogEntry, GpuType, HardwareProfile, ModelCatalog,
    Recommendation, Tier,
};
pub use config::{ConfigError, EngineSettings, GatewayConfig};
pub use engine::{EngineEndpoint, EngineState};
pub use error::{GatewayError, Result};
pub use gateway::{EngineModelInfo, GatewayClient, GatewayStatus};
pub use progress::{DownloadProgress, DownloadStatus, LoggingHandler, NoOpHandler, ProgressHandler};
pub use protocol::{ChatMessage, ChatStream, Chunk, GenerationOptions, MessageRole, ProtocolKind};
pub use storage::InstalledModel;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
