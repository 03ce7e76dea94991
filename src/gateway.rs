//! Gateway client: the entry point front ends call
//!
//! # Example
//!
//! ```no_run
//! use llmgate::{ChatMessage, GatewayClient, GatewayConfig, LoggingHandler};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = GatewayClient::new(GatewayConfig::load(None)?)?;
//!
//! gateway.pull("qwen2.5-0.5b", &LoggingHandler)?;
//! gateway.switch_model("qwen2.5-0.5b")?;
//!
//! let history = vec![ChatMessage::user("Name three primary colors")];
//! gateway
//!     .chat("qwen2.5-0.5b", &history)?
//!     .for_each_chunk(|text, _done| print!("{}", text))?;
//! # Ok(())
//! # }
//! ```

use crate::catalog::{
    derive_display_name, recommend, CatalogView, HardwareProfile, ModelCatalog, Recommendation,
    Tier,
};
use crate::config::GatewayConfig;
use crate::engine::{EngineEndpoint, EngineState, EngineSupervisor, HEALTH_TIMEOUT};
use crate::error::{GatewayError, Result};
use crate::progress::ProgressHandler;
use crate::protocol::{ChatMessage, ChatStream, GenerationOptions, WireProtocol};
use crate::storage::{InstalledModel, ModelDownloader, ModelStore};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MODELS_PATH: &str = "/v1/models";

/// Metadata the engine reports about the model it has loaded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineModelInfo {
    pub id: String,
    pub display_name: String,
    pub n_params: u64,
    pub n_vocab: u64,
    pub n_ctx_train: u64,
    pub size_bytes: u64,
}

impl EngineModelInfo {
    fn unknown() -> Self {
        Self {
            id: "unknown".to_string(),
            display_name: "Unknown".to_string(),
            n_params: 0,
            n_vocab: 0,
            n_ctx_train: 0,
            size_bytes: 0,
        }
    }
}

#[derive(Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelsEntry>,
}

#[derive(Deserialize)]
struct ModelsEntry {
    id: String,
    #[serde(default)]
    meta: ModelsMeta,
}

#[derive(Deserialize, Default)]
struct ModelsMeta {
    #[serde(default)]
    n_params: u64,
    #[serde(default)]
    n_vocab: u64,
    #[serde(default)]
    n_ctx_train: u64,
    #[serde(default)]
    size: u64,
}

/// Snapshot for status displays
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatus {
    pub running: bool,
    pub host: String,
    pub active_model: Option<String>,
    pub engine_state: EngineState,
    pub tier: Tier,
    pub recommended: Option<String>,
    pub engine: String,
    pub protocol: String,
    pub models_dir: PathBuf,
    pub installed_count: usize,
}

/// Model lifecycle and chat against one local engine
pub struct GatewayClient {
    config: GatewayConfig,
    store: ModelStore,
    downloader: ModelDownloader,
    supervisor: EngineSupervisor,
    protocol: Arc<dyn WireProtocol>,
    /// No read timeout: streams and downloads may run for minutes
    http: Client,
    /// Short timeout for metadata queries
    status_http: Client,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let catalog =
            Arc::new(ModelCatalog::builtin().with_extra(config.catalog.iter().cloned()));
        let store = ModelStore::new(&config.models_dir, catalog);
        let endpoint = config.endpoint();

        let http = Client::builder()
            .timeout(None)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::from_transport(endpoint.base_url(), e))?;
        let status_http = Client::builder()
            .timeout(HEALTH_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::from_transport(endpoint.base_url(), e))?;

        let supervisor = EngineSupervisor::new(
            &config.engine_bin,
            endpoint,
            config.engine.clone(),
            store.clone(),
        )?;
        let downloader = ModelDownloader::new(http.clone(), store.clone());

        debug!(
            host = %config.host,
            models_dir = %config.models_dir.display(),
            protocol = %config.protocol,
            "Gateway initialized"
        );

        Ok(Self {
            protocol: config.protocol.adapter(),
            config,
            store,
            downloader,
            supervisor,
            http,
            status_http,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ModelCatalog {
        self.store.catalog()
    }

    pub fn endpoint(&self) -> &EngineEndpoint {
        self.supervisor.endpoint()
    }

    /// Short health probe; any failure reads as not running
    pub fn is_running(&self) -> bool {
        self.supervisor.probe().is_healthy()
    }

    /// Installed models, rescanned on every call. Only a model the engine is
    /// serving (state `Ready`) is flagged active.
    pub fn list_models(&self) -> Result<Vec<InstalledModel>> {
        self.store.list(self.supervisor.serving_filename().as_deref())
    }

    /// Catalog listing with an installed flag per entry
    pub fn catalog_view(&self) -> Result<Vec<CatalogView>> {
        let installed = self.store.installed_filenames()?;
        Ok(self
            .catalog()
            .with_install_state(installed.iter().map(String::as_str)))
    }

    /// Downloads a catalog model into storage
    pub fn pull(&self, name: &str, progress: &dyn ProgressHandler) -> Result<PathBuf> {
        self.downloader.download(name, progress)
    }

    /// Removes a model file from storage
    pub fn delete(&self, name: &str) -> Result<PathBuf> {
        self.store.delete(name)
    }

    /// Restarts the engine on `name` and waits until it is healthy
    pub fn switch_model(&self, name: &str) -> Result<()> {
        info!(model = %name, "Switching model");
        self.supervisor.switch_model(name)
    }

    pub fn active_model(&self) -> Option<String> {
        self.supervisor.active_model()
    }

    pub fn engine_state(&self) -> EngineState {
        self.supervisor.state()
    }

    /// Stops the engine process this gateway started
    pub fn stop_engine(&self) {
        self.supervisor.stop();
    }

    /// Streams a reply to `messages` using the configured generation options
    pub fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<ChatStream> {
        self.chat_with_options(model, messages, &self.config.generation)
    }

    pub fn chat_with_options(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<ChatStream> {
        ChatStream::open(
            &self.http,
            self.supervisor.endpoint(),
            Arc::clone(&self.protocol),
            model,
            messages,
            options,
        )
    }

    /// Callback form of [`chat`](Self::chat): `on_chunk(text, is_final)`
    /// fires once per chunk in arrival order
    pub fn chat_each(
        &self,
        model: &str,
        messages: &[ChatMessage],
        on_chunk: impl FnMut(&str, bool),
    ) -> Result<()> {
        self.chat(model, messages)?.for_each_chunk(on_chunk)
    }

    /// Single-prompt convenience over [`chat`](Self::chat)
    pub fn generate(&self, model: &str, prompt: &str) -> Result<ChatStream> {
        self.chat(model, &[ChatMessage::user(prompt)])
    }

    /// Model reported by the running engine; `None` when unreachable
    pub fn loaded_model(&self) -> Option<EngineModelInfo> {
        let url = self.endpoint().url(MODELS_PATH);
        let response = match self.status_http.get(&url).send() {
            Ok(response) => response,
            Err(e) => {
                debug!(url = %url, error = %e, "Engine model query failed");
                return None;
            }
        };

        let entry = response
            .json::<ModelsResponse>()
            .ok()
            .and_then(|r| r.data.into_iter().next());

        Some(match entry {
            Some(entry) => EngineModelInfo {
                display_name: derive_display_name(&entry.id),
                id: entry.id,
                n_params: entry.meta.n_params,
                n_vocab: entry.meta.n_vocab,
                n_ctx_train: entry.meta.n_ctx_train,
                size_bytes: entry.meta.size,
            },
            None => EngineModelInfo::unknown(),
        })
    }

    /// Hardware profile from configuration, or a CPU-only default
    pub fn hardware(&self) -> HardwareProfile {
        self.config.hardware.clone().unwrap_or_default()
    }

    pub fn recommend(&self, profile: &HardwareProfile) -> Option<Recommendation> {
        recommend(self.catalog(), profile)
    }

    pub fn status(&self, profile: &HardwareProfile) -> Result<GatewayStatus> {
        Ok(GatewayStatus {
            running: self.is_running(),
            host: self.config.host.clone(),
            active_model: self.active_model(),
            engine_state: self.engine_state(),
            tier: profile.tier(),
            recommended: self.recommend(profile).map(|r| r.entry.name),
            engine: self
                .config
                .engine_bin
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.config.engine_bin.display().to_string()),
            protocol: self.protocol.name().to_string(),
            models_dir: self.config.models_dir.clone(),
            installed_count: self.list_models()?.len(),
        })
    }
}
