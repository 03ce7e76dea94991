//! Engine wire protocols and streaming chat
//!
//! Each protocol turns a role-tagged conversation into the engine's native
//! request body and parses one streamed response line into a [`Chunk`].
//! Line framing (SSE prefixes, blank keepalives, `[DONE]`) is shared and
//! lives in [`ChatStream`].

mod completion;
mod ollama;
mod openai_compatible;
mod stream;
mod types;

pub use completion::{flatten_transcript, CompletionProtocol, STOP_SEQUENCES};
pub use ollama::OllamaProtocol;
pub use openai_compatible::OpenAiCompatibleProtocol;
pub use stream::{normalize_line, ChatStream};
pub use types::{ChatMessage, Chunk, GenerationOptions, MessageRole};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A backend's chat request and streaming response format
pub trait WireProtocol: Send + Sync {
    /// Short identifier used in configuration and logs
    fn name(&self) -> &'static str;

    /// Path of the streaming chat endpoint, relative to the engine base URL
    fn chat_path(&self) -> &'static str;

    /// JSON body for a streaming request
    fn build_request(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Value;

    /// Parses one normalized response line; `None` means skip it
    fn parse_line(&self, line: &str) -> Option<Chunk>;
}

/// Selectable wire protocol
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolKind {
    /// llama-server `/completion` with a flattened transcript
    #[default]
    #[serde(rename = "completion")]
    Completion,
    #[serde(rename = "ollama")]
    Ollama,
    #[serde(rename = "openai")]
    OpenAi,
}

impl ProtocolKind {
    pub fn adapter(&self) -> Arc<dyn WireProtocol> {
        match self {
            ProtocolKind::Completion => Arc::new(CompletionProtocol),
            ProtocolKind::Ollama => Arc::new(OllamaProtocol),
            ProtocolKind::OpenAi => Arc::new(OpenAiCompatibleProtocol),
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolKind::Completion => write!(f, "completion"),
            ProtocolKind::Ollama => write!(f, "ollama"),
            ProtocolKind::OpenAi => write!(f, "openai"),
        }
    }
}

impl FromStr for ProtocolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "completion" | "llama" | "llama-server" => Ok(ProtocolKind::Completion),
            "ollama" => Ok(ProtocolKind::Ollama),
            "openai" | "openai-compatible" => Ok(ProtocolKind::OpenAi),
            other => Err(format!(
                "Invalid protocol: {}. Valid options: completion, ollama, openai",
                other
            )),
        }
    }
}
