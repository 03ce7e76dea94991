use crate::catalog::Tier;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Local gateway for on-device LLM inference
#[derive(Parser, Debug)]
#[command(
    name = "llmgate",
    about = "Local gateway for on-device LLM inference",
    version,
    author,
    long_about = "llmgate picks a model that fits this machine, downloads GGUF weights, \
                  supervises the llama-server engine and streams chat completions from it."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 'c',
        long,
        global = true,
        value_name = "FILE",
        help = "Configuration file (defaults to the per-user config.yaml)"
    )]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Show engine and storage status",
        long_about = "Probes the engine health endpoint and reports the loaded model, \
                      hardware tier, recommendation and installed model count.\n\n\
                      Examples:\n  \
                      llmgate status\n  \
                      llmgate status --format json"
    )]
    Status(FormatArgs),

    #[command(
        about = "List downloadable models",
        long_about = "Lists the model catalog with install state.\n\n\
                      Examples:\n  \
                      llmgate catalog\n  \
                      llmgate catalog --tier mid"
    )]
    Catalog(CatalogArgs),

    #[command(about = "List installed models")]
    Models(FormatArgs),

    #[command(
        about = "Download a model",
        long_about = "Downloads a catalog model into the models directory. An interrupted \
                      download resumes from its .part file.\n\n\
                      Examples:\n  \
                      llmgate pull qwen2.5-0.5b"
    )]
    Pull(ModelArgs),

    #[command(about = "Delete an installed model")]
    Delete(ModelArgs),

    #[command(
        about = "Restart the engine on a model",
        long_about = "Stops the running engine, starts it on the given model and waits \
                      for its health endpoint.\n\n\
                      Examples:\n  \
                      llmgate switch qwen2.5-7b"
    )]
    Switch(ModelArgs),

    #[command(
        about = "Interactive chat with the engine",
        long_about = "Starts a chat session. Type /reset to clear the history and /exit \
                      (or Ctrl-D) to leave.\n\n\
                      Examples:\n  \
                      llmgate chat\n  \
                      llmgate chat --system \"Answer in one sentence\""
    )]
    Chat(ChatArgs),

    #[command(about = "Stream a reply to a single prompt")]
    Generate(GenerateArgs),

    #[command(about = "Recommend a model for this hardware")]
    Recommend(FormatArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct FormatArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct CatalogArgs {
    #[arg(
        short = 't',
        long,
        value_parser = parse_tier,
        help = "Only models at or below this tier (cpu, basic, mid, high, ultra, apex)"
    )]
    pub tier: Option<Tier>,

    #[command(flatten)]
    pub output: FormatArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct ModelArgs {
    #[arg(value_name = "MODEL", help = "Catalog name or file name of the model")]
    pub model: String,
}

#[derive(Parser, Debug, Clone)]
pub struct ChatArgs {
    #[arg(
        short = 'm',
        long,
        value_name = "MODEL",
        help = "Model name sent to the engine (defaults to the configured model)"
    )]
    pub model: Option<String>,

    #[arg(short = 's', long, value_name = "PROMPT", help = "System prompt")]
    pub system: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(value_name = "PROMPT")]
    pub prompt: String,

    #[arg(short = 'm', long, value_name = "MODEL")]
    pub model: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_tier(s: &str) -> Result<Tier, String> {
    s.parse()
}
