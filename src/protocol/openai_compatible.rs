//! OpenAI-compatible `/v1/chat/completions` protocol
//!
//! Served by llama-server, LM Studio and Ollama alike. Responses arrive as
//! Server-Sent Events; the `data:` prefix and the `[DONE]` sentinel are
//! handled by the stream reader before lines reach this parser.

use super::types::{ChatMessage, Chunk, GenerationOptions};
use super::WireProtocol;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Default, Clone, Copy)]
pub struct OpenAiCompatibleProtocol;

#[derive(Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

impl WireProtocol for OpenAiCompatibleProtocol {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn chat_path(&self) -> &'static str {
        "/v1/chat/completions"
    }

    fn build_request(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Value {
        json!({
            "model": model,
            "messages": messages,
            "stream": true,
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
        })
    }

    fn parse_line(&self, line: &str) -> Option<Chunk> {
        let event: StreamEvent = serde_json::from_str(line).ok()?;
        let Some(choice) = event.choices.into_iter().next() else {
            return Some(Chunk::new("", false));
        };
        Some(Chunk::new(
            choice.delta.content.unwrap_or_default(),
            choice.finish_reason.is_some(),
        ))
    }
}
