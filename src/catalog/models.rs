//! Static registry of downloadable GGUF models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// File extension shared by every model weight file in storage
pub const MODEL_EXTENSION: &str = ".gguf";

/// Hardware capability bucket, ordered from weakest to strongest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// No usable accelerator, or less than 4 GB of it
    Cpu,
    /// 4-8 GB
    Basic,
    /// 8-16 GB
    Mid,
    /// 16-24 GB
    High,
    /// 24-64 GB
    Ultra,
    /// 64 GB and up (large unified-memory machines)
    Apex,
}

impl Tier {
    /// Every tier, weakest first
    pub const ALL: [Tier; 6] = [
        Tier::Cpu,
        Tier::Basic,
        Tier::Mid,
        Tier::High,
        Tier::Ultra,
        Tier::Apex,
    ];

    /// Buckets an accelerator memory figure (whole gigabytes)
    pub fn for_memory_gb(gb: u64) -> Tier {
        match gb {
            0..=3 => Tier::Cpu,
            4..=7 => Tier::Basic,
            8..=15 => Tier::Mid,
            16..=23 => Tier::High,
            24..=63 => Tier::Ultra,
            _ => Tier::Apex,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Cpu => "cpu",
            Tier::Basic => "basic",
            Tier::Mid => "mid",
            Tier::High => "high",
            Tier::Ultra => "ultra",
            Tier::Apex => "apex",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu" | "none" => Ok(Tier::Cpu),
            "basic" => Ok(Tier::Basic),
            "mid" => Ok(Tier::Mid),
            "high" => Ok(Tier::High),
            "ultra" => Ok(Tier::Ultra),
            "apex" => Ok(Tier::Apex),
            other => Err(format!(
                "Invalid tier: {}. Valid options: cpu, basic, mid, high, ultra, apex",
                other
            )),
        }
    }
}

/// One downloadable model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Canonical name used by callers (`qwen2.5-7b`)
    pub name: String,
    /// Human-readable name
    pub display_name: String,
    /// File name inside the models directory
    pub filename: String,
    /// Approximate download size
    pub size_gb: f64,
    /// Minimum system memory needed to run the model
    pub min_ram_mb: u32,
    pub tier: Tier,
    /// Model family (`qwen2`, `llama`, `rwkv`, ...)
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub description: String,
    /// Direct download URL; `None` for models that must be installed by hand
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl CatalogEntry {
    /// Approximate size in bytes
    pub fn size_bytes(&self) -> u64 {
        (self.size_gb * 1024.0 * 1024.0 * 1024.0) as u64
    }

    /// File name without the model extension
    pub fn stem(&self) -> &str {
        strip_model_extension(&self.filename)
    }
}

/// Removes a trailing `.gguf`, if present
pub fn strip_model_extension(name: &str) -> &str {
    name.strip_suffix(MODEL_EXTENSION).unwrap_or(name)
}

/// A lookup strategy: does `entry` answer to `name`?
type MatchStrategy = fn(&CatalogEntry, &str) -> bool;

/// Lookup strategies in priority order: exact canonical name, then
/// filename stem (callers sometimes pass a bare or full file name)
const LOOKUP_STRATEGIES: [MatchStrategy; 2] = [matches_name, matches_stem];

fn matches_name(entry: &CatalogEntry, name: &str) -> bool {
    entry.name == name
}

fn matches_stem(entry: &CatalogEntry, name: &str) -> bool {
    entry.stem() == strip_model_extension(name)
}

/// Catalog entry paired with whether its file is present in storage
#[derive(Debug, Clone, Serialize)]
pub struct CatalogView {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    pub installed: bool,
}

/// Immutable registry of known models
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    entries: Vec<CatalogEntry>,
}

impl ModelCatalog {
    /// Catalog with the given entries, in declaration order
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// The built-in registry
    pub fn builtin() -> Self {
        Self::new(builtin_entries())
    }

    /// Appends `extra` entries whose names are not already registered
    pub fn with_extra(mut self, extra: impl IntoIterator<Item = CatalogEntry>) -> Self {
        for entry in extra {
            if self.entries.iter().any(|e| e.name == entry.name) {
                tracing::warn!(model = %entry.name, "Ignoring duplicate catalog entry");
                continue;
            }
            self.entries.push(entry);
        }
        self
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry whose tier is at or below `tier`
    pub fn entries_for_tier(&self, tier: Tier) -> Vec<&CatalogEntry> {
        self.entries.iter().filter(|e| e.tier <= tier).collect()
    }

    /// Finds an entry by canonical name, falling back to the filename stem
    pub fn find_by_name(&self, name: &str) -> Option<&CatalogEntry> {
        LOOKUP_STRATEGIES
            .iter()
            .find_map(|matches| self.entries.iter().find(|e| matches(e, name)))
    }

    /// Storage file name for `name`: the catalog filename when known,
    /// otherwise the name itself with the model extension
    pub fn filename_for(&self, name: &str) -> String {
        match self.find_by_name(name) {
            Some(entry) => entry.filename.clone(),
            None => format!("{}{}", strip_model_extension(name), MODEL_EXTENSION),
        }
    }

    /// Catalog listing annotated with install state
    pub fn with_install_state<'a>(
        &self,
        installed_filenames: impl IntoIterator<Item = &'a str>,
    ) -> Vec<CatalogView> {
        let installed: Vec<&str> = installed_filenames.into_iter().collect();
        self.entries
            .iter()
            .map(|entry| CatalogView {
                installed: installed.contains(&entry.filename.as_str()),
                entry: entry.clone(),
            })
            .collect()
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[allow(clippy::too_many_arguments)]
fn entry(
    name: &str,
    display_name: &str,
    filename: &str,
    size_gb: f64,
    min_ram_mb: u32,
    tier: Tier,
    architecture: &str,
    description: &str,
    url: Option<&str>,
) -> CatalogEntry {
    CatalogEntry {
        name: name.to_string(),
        display_name: display_name.to_string(),
        filename: filename.to_string(),
        size_gb,
        min_ram_mb,
        tier,
        architecture: architecture.to_string(),
        description: description.to_string(),
        url: url.map(str::to_string),
    }
}

fn builtin_entries() -> Vec<CatalogEntry> {
    vec![
        // CPU
        entry(
            "qwen2.5-0.5b",
            "Qwen 2.5 0.5B",
            "qwen2.5-0.5b-instruct-q4_k_m.gguf",
            0.4,
            2048,
            Tier::Cpu,
            "qwen2",
            "Tiny model for basic Q&A, runs on anything",
            Some("https://huggingface.co/Qwen/Qwen2.5-0.5B-Instruct-GGUF/resolve/main/qwen2.5-0.5b-instruct-q4_k_m.gguf"),
        ),
        entry(
            "smollm2-360m",
            "SmolLM2 360M",
            "SmolLM2-360M-Instruct-f16.gguf",
            0.7,
            1024,
            Tier::Cpu,
            "llama",
            "Very small instruction model for phones and single-board computers",
            Some("https://huggingface.co/HuggingFaceTB/SmolLM2-360M-Instruct-GGUF/resolve/main/smollm2-360m-instruct-f16.gguf"),
        ),
        entry(
            "rwkv7-0.4B",
            "RWKV-7 0.4B",
            "rwkv7-0.4B-world-q8_0.gguf",
            0.45,
            1024,
            Tier::Cpu,
            "rwkv",
            "Recurrent model with constant memory per token",
            Some("https://huggingface.co/Mungert/rwkv7-0.4B-world-GGUF/resolve/main/rwkv7-0.4B-world-q8_0.gguf"),
        ),
        entry(
            "rwkv7-2.9B",
            "RWKV-7 2.9B",
            "rwkv7-2.9B-world-q4_k_m.gguf",
            1.8,
            3072,
            Tier::Cpu,
            "rwkv",
            "Recurrent model, strong multilingual chat on CPU",
            Some("https://huggingface.co/Mungert/rwkv7-2.9B-world-GGUF/resolve/main/rwkv7-2.9B-world-q4_k_m.gguf"),
        ),
        entry(
            "phi3-mini",
            "Phi-3 Mini",
            "Phi-3-mini-4k-instruct-q4.gguf",
            2.3,
            4096,
            Tier::Cpu,
            "phi3",
            "Microsoft's compact model, good reasoning",
            Some("https://huggingface.co/microsoft/Phi-3-mini-4k-instruct-gguf/resolve/main/Phi-3-mini-4k-instruct-q4.gguf"),
        ),
        // Basic (4-8 GB)
        entry(
            "qwen2.5-3b",
            "Qwen 2.5 3B",
            "Qwen2.5-3B-Instruct-Q4_K_M.gguf",
            2.0,
            4096,
            Tier::Basic,
            "qwen2",
            "Solid for chat and simple coding",
            Some("https://huggingface.co/bartowski/Qwen2.5-3B-Instruct-GGUF/resolve/main/Qwen2.5-3B-Instruct-Q4_K_M.gguf"),
        ),
        entry(
            "llama3.2-3b",
            "Llama 3.2 3B",
            "Llama-3.2-3B-Instruct-Q4_K_M.gguf",
            2.0,
            4096,
            Tier::Basic,
            "llama",
            "Meta's compact model, versatile",
            Some("https://huggingface.co/bartowski/Llama-3.2-3B-Instruct-GGUF/resolve/main/Llama-3.2-3B-Instruct-Q4_K_M.gguf"),
        ),
        // Mid (8-16 GB)
        entry(
            "qwen2.5-7b",
            "Qwen 2.5 7B",
            "Qwen2.5-7B-Instruct-Q4_K_M.gguf",
            4.7,
            8192,
            Tier::Mid,
            "qwen2",
            "Great all-around model for most tasks",
            Some("https://huggingface.co/bartowski/Qwen2.5-7B-Instruct-GGUF/resolve/main/Qwen2.5-7B-Instruct-Q4_K_M.gguf"),
        ),
        entry(
            "llama3.1-8b",
            "Llama 3.1 8B",
            "Meta-Llama-3.1-8B-Instruct-Q4_K_M.gguf",
            4.9,
            8192,
            Tier::Mid,
            "llama",
            "Meta's balanced model, strong coding",
            Some("https://huggingface.co/bartowski/Meta-Llama-3.1-8B-Instruct-GGUF/resolve/main/Meta-Llama-3.1-8B-Instruct-Q4_K_M.gguf"),
        ),
        entry(
            "deepseek-r1-7b",
            "DeepSeek R1 7B",
            "DeepSeek-R1-Distill-Qwen-7B-Q4_K_M.gguf",
            4.7,
            8192,
            Tier::Mid,
            "qwen2",
            "Deep reasoning and chain-of-thought",
            Some("https://huggingface.co/bartowski/DeepSeek-R1-Distill-Qwen-7B-GGUF/resolve/main/DeepSeek-R1-Distill-Qwen-7B-Q4_K_M.gguf"),
        ),
        // High (16-24 GB)
        entry(
            "qwen2.5-14b",
            "Qwen 2.5 14B",
            "Qwen2.5-14B-Instruct-Q4_K_M.gguf",
            9.0,
            16384,
            Tier::High,
            "qwen2",
            "Strong for coding, analysis, and writing",
            Some("https://huggingface.co/bartowski/Qwen2.5-14B-Instruct-GGUF/resolve/main/Qwen2.5-14B-Instruct-Q4_K_M.gguf"),
        ),
        entry(
            "deepseek-r1-14b",
            "DeepSeek R1 14B",
            "DeepSeek-R1-Distill-Qwen-14B-Q4_K_M.gguf",
            9.0,
            16384,
            Tier::High,
            "qwen2",
            "Excellent reasoning capabilities",
            Some("https://huggingface.co/bartowski/DeepSeek-R1-Distill-Qwen-14B-GGUF/resolve/main/DeepSeek-R1-Distill-Qwen-14B-Q4_K_M.gguf"),
        ),
        // Ultra (24 GB+)
        entry(
            "qwen2.5-32b",
            "Qwen 2.5 32B",
            "Qwen2.5-32B-Instruct-Q4_K_M.gguf",
            20.0,
            24576,
            Tier::Ultra,
            "qwen2",
            "Near-frontier performance locally",
            Some("https://huggingface.co/bartowski/Qwen2.5-32B-Instruct-GGUF/resolve/main/Qwen2.5-32B-Instruct-Q4_K_M.gguf"),
        ),
        entry(
            "deepseek-r1-32b",
            "DeepSeek R1 32B",
            "DeepSeek-R1-Distill-Qwen-32B-Q4_K_M.gguf",
            20.0,
            24576,
            Tier::Ultra,
            "qwen2",
            "Top-tier local reasoning",
            Some("https://huggingface.co/bartowski/DeepSeek-R1-Distill-Qwen-32B-GGUF/resolve/main/DeepSeek-R1-Distill-Qwen-32B-Q4_K_M.gguf"),
        ),
        // Apex (64 GB+ unified). Published as split files, so no single URL.
        entry(
            "llama3.1-70b",
            "Llama 3.1 70B",
            "Meta-Llama-3.1-70B-Instruct-Q4_K_M.gguf",
            40.0,
            49152,
            Tier::Apex,
            "llama",
            "Massive model, needs 48GB+ VRAM",
            None,
        ),
    ]
}
