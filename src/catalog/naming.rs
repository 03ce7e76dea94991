//! Human-readable names for GGUF model ids reported by the engine

use super::models::strip_model_extension;
use regex::{Captures, Regex};
use std::sync::OnceLock;

static RWKV_REGEX: OnceLock<Regex> = OnceLock::new();
static QWEN_REGEX: OnceLock<Regex> = OnceLock::new();
static SMOLLM_REGEX: OnceLock<Regex> = OnceLock::new();
static PHI_REGEX: OnceLock<Regex> = OnceLock::new();

/// Derives a display name such as `Qwen 2.5 1.5B` from an engine model id.
///
/// Unrecognised families come back as the id without its `.gguf` suffix.
pub fn derive_display_name(model_id: &str) -> String {
    let id = strip_model_extension(model_id);

    // rwkv7-{size}-world-{quant}
    let rwkv = RWKV_REGEX.get_or_init(|| {
        Regex::new(r"(?i)rwkv7[- ](\d+\.?\d*[bm])").expect("Invalid RWKV name regex")
    });
    if let Some(caps) = rwkv.captures(id) {
        return format!("RWKV-7 {}", group(&caps, 1).to_uppercase());
    }

    // qwen{version}-{size}-instruct-{quant}
    let qwen = QWEN_REGEX.get_or_init(|| {
        Regex::new(r"(?i)qwen(\d+\.?\d*)[- ](\d+\.?\d*[bm])").expect("Invalid Qwen name regex")
    });
    if let Some(caps) = qwen.captures(id) {
        return format!("Qwen {} {}", group(&caps, 1), group(&caps, 2).to_uppercase());
    }

    let smollm = SMOLLM_REGEX.get_or_init(|| {
        Regex::new(r"(?i)(smollm\d*)[- ](\d+[bm])").expect("Invalid SmolLM name regex")
    });
    if let Some(caps) = smollm.captures(id) {
        return format!("{} {}", group(&caps, 1), group(&caps, 2).to_uppercase());
    }

    let phi = PHI_REGEX.get_or_init(|| {
        Regex::new(r"(?i)(phi[- ]?\d+)[- ](mini|small|medium)").expect("Invalid Phi name regex")
    });
    if let Some(caps) = phi.captures(id) {
        return format!("{} {}", group(&caps, 1), capitalize(group(&caps, 2)));
    }

    id.to_string()
}

fn group<'h>(caps: &Captures<'h>, index: usize) -> &'h str {
    caps.get(index).map(|m| m.as_str()).unwrap_or_default()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
