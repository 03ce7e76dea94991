//! llama-server `/completion` protocol
//!
//! The endpoint takes a single prompt string, so the conversation is
//! flattened into a `User:` / `Assistant:` transcript that ends with an
//! open assistant turn. Generation is cut at the next user prefix.

use super::types::{ChatMessage, Chunk, GenerationOptions, MessageRole};
use super::WireProtocol;
use serde::Deserialize;
use serde_json::{json, Value};

/// Stop sequences matching the user-turn prefix.
///
/// Assistant output that contains one of these literally is truncated.
pub const STOP_SEQUENCES: [&str; 3] = ["User:", "User :", "\nUser"];

#[derive(Debug, Default, Clone, Copy)]
pub struct CompletionProtocol;

#[derive(Deserialize)]
struct CompletionLine {
    #[serde(default)]
    content: String,
    #[serde(default)]
    stop: bool,
}

/// Renders the history as a role-prefixed transcript
pub fn flatten_transcript(messages: &[ChatMessage]) -> String {
    let mut prompt = String::new();
    for message in messages {
        match message.role {
            MessageRole::System => {}
            MessageRole::User => prompt.push_str("User: "),
            MessageRole::Assistant => prompt.push_str("Assistant: "),
        }
        prompt.push_str(&message.content);
        prompt.push_str("\n\n");
    }
    prompt.push_str("Assistant:");
    prompt
}

impl WireProtocol for CompletionProtocol {
    fn name(&self) -> &'static str {
        "completion"
    }

    fn chat_path(&self) -> &'static str {
        "/completion"
    }

    fn build_request(
        &self,
        _model: &str,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Value {
        json!({
            "prompt": flatten_transcript(messages),
            "n_predict": options.max_tokens,
            "stream": true,
            "stop": STOP_SEQUENCES,
            "temperature": options.temperature,
        })
    }

    fn parse_line(&self, line: &str) -> Option<Chunk> {
        let parsed: CompletionLine = serde_json::from_str(line).ok()?;
        Some(Chunk::new(parsed.content, parsed.stop))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_transcript() {
        let messages = vec![
            ChatMessage::system("Be brief."),
            ChatMessage::user("Hi"),
            ChatMessage::assistant("Hello!"),
            ChatMessage::user("Name a color"),
        ];
        assert_eq!(
            flatten_transcript(&messages),
            "Be brief.\n\nUser: Hi\n\nAssistant: Hello!\n\nUser: Name a color\n\nAssistant:"
        );
        assert_eq!(flatten_transcript(&[]), "Assistant:");
    }

    #[test]
    fn test_request_shape() {
        let body = CompletionProtocol.build_request(
            "ignored",
            &[ChatMessage::user("Hi")],
            &GenerationOptions {
                temperature: 0.5,
                max_tokens: 64,
            },
        );
        assert_eq!(body["prompt"], "User: Hi\n\nAssistant:");
        assert_eq!(body["n_predict"], 64);
        assert_eq!(body["stream"], true);
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["stop"], json!(["User:", "User :", "\nUser"]));
        assert!(body.get("model").is_none());
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(
            CompletionProtocol.parse_line(r#"{"content":"Hel","stop":false}"#),
            Some(Chunk::new("Hel", false))
        );
        assert_eq!(
            CompletionProtocol.parse_line(r#"{"content":"","stop":true,"timings":{}}"#),
            Some(Chunk::new("", true))
        );
        assert_eq!(CompletionProtocol.parse_line("keepalive"), None);
    }
}
