//! Ollama native `/api/chat` protocol

use super::types::{ChatMessage, Chunk, GenerationOptions};
use super::WireProtocol;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Default, Clone, Copy)]
pub struct OllamaProtocol;

#[derive(Deserialize)]
struct OllamaLine {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

impl WireProtocol for OllamaProtocol {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn chat_path(&self) -> &'static str {
        "/api/chat"
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
            "options": {
                "temperature": options.temperature,
                "num_predict": options.max_tokens,
            },
        })
    }

    fn parse_line(&self, line: &str) -> Option<Chunk> {
        let parsed: OllamaLine = serde_json::from_str(line).ok()?;
        let text = parsed.message.map(|m| m.content).unwrap_or_default();
        Some(Chunk::new(text, parsed.done))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_passes_messages_through() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("Hi")];
        let body = OllamaProtocol.build_request("qwen2.5:7b", &messages, &GenerationOptions::default());

        assert_eq!(body["model"], "qwen2.5:7b");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Hi");
        assert_eq!(body["options"]["num_predict"], 1024);
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(
            OllamaProtocol.parse_line(r#"{"model":"m","message":{"role":"assistant","content":"Hi"},"done":false}"#),
            Some(Chunk::new("Hi", false))
        );
        assert_eq!(
            OllamaProtocol.parse_line(r#"{"model":"m","done":true,"total_duration":5}"#),
            Some(Chunk::new("", true))
        );
        assert_eq!(OllamaProtocol.parse_line("{oops"), None);
    }
}
