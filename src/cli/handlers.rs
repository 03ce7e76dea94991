//! Command handlers for the `llmgate` binary
//!
//! Each handler returns the process exit code. Errors are logged and printed
//! to stderr with their category so scripts can tell a missing model from an
//! unreachable engine.

use super::commands::{
    CatalogArgs, ChatArgs, CliArgs, Commands, FormatArgs, GenerateArgs, ModelArgs,
};
use super::output::OutputFormatter;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::gateway::GatewayClient;
use crate::progress::{DownloadProgress, DownloadStatus, ProgressHandler};
use crate::protocol::{ChatMessage, MessageRole};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use tracing::{debug, error, info};

const PULL_TEMPLATE: &str =
    "{msg:>11} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

/// Runs the parsed command and returns the exit code
pub fn run(args: &CliArgs) -> i32 {
    match dispatch(args) {
        Ok(()) => 0,
        Err(e) => {
            report_error(&e);
            1
        }
    }
}

fn dispatch(args: &CliArgs) -> Result<()> {
    let config = GatewayConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    debug!(?config, "Configuration loaded");

    let gateway = GatewayClient::new(config).context("Failed to initialize gateway")?;

    match &args.command {
        Commands::Status(format) => handle_status(&gateway, format),
        Commands::Catalog(catalog) => handle_catalog(&gateway, catalog),
        Commands::Models(format) => handle_models(&gateway, format),
        Commands::Pull(model) => handle_pull(&gateway, model, args.quiet),
        Commands::Delete(model) => handle_delete(&gateway, model),
        Commands::Switch(model) => handle_switch(&gateway, model),
        Commands::Chat(chat) => handle_chat(&gateway, chat),
        Commands::Generate(generate) => handle_generate(&gateway, generate),
        Commands::Recommend(format) => handle_recommend(&gateway, format),
    }
}

fn report_error(err: &anyhow::Error) {
    error!("{:#}", err);
    match err.downcast_ref::<GatewayError>() {
        Some(gateway_err) => eprintln!("Error [{}]: {:#}", gateway_err.category(), err),
        None => eprintln!("Error: {:#}", err),
    }
}

fn handle_status(gateway: &GatewayClient, args: &FormatArgs) -> Result<()> {
    let profile = gateway.hardware();
    let status = gateway.status(&profile)?;
    let loaded = if status.running {
        gateway.loaded_model()
    } else {
        None
    };

    let formatter = OutputFormatter::new(args.format.into());
    println!("{}", formatter.format_status(&status, loaded.as_ref())?);
    Ok(())
}

fn handle_catalog(gateway: &GatewayClient, args: &CatalogArgs) -> Result<()> {
    let mut views = gateway.catalog_view()?;
    if let Some(tier) = args.tier {
        views.retain(|v| v.entry.tier <= tier);
    }

    let formatter = OutputFormatter::new(args.output.format.into());
    println!("{}", formatter.format_catalog(&views)?);
    Ok(())
}

fn handle_models(gateway: &GatewayClient, args: &FormatArgs) -> Result<()> {
    let models = gateway.list_models()?;
    let formatter = OutputFormatter::new(args.format.into());
    println!("{}", formatter.format_models(&models)?);
    Ok(())
}

/// Renders download progress as a terminal progress bar
struct PullProgressBar {
    bar: ProgressBar,
}

impl PullProgressBar {
    fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        let style = ProgressStyle::with_template(PULL_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        Self { bar }
    }
}

impl ProgressHandler for PullProgressBar {
    fn on_progress(&self, progress: &DownloadProgress) {
        if progress.total > 0 {
            self.bar.set_length(progress.total);
        }
        self.bar.set_position(progress.completed);
        match progress.status {
            DownloadStatus::Success => self.bar.finish_with_message("done"),
            status => self.bar.set_message(status.to_string()),
        }
    }
}

fn handle_pull(gateway: &GatewayClient, args: &ModelArgs, quiet: bool) -> Result<()> {
    let progress = PullProgressBar::new(quiet);
    let path = match gateway.pull(&args.model, &progress) {
        Ok(path) => path,
        Err(e) => {
            progress.bar.abandon_with_message("failed");
            return Err(e.into());
        }
    };
    println!("Installed {} at {}", args.model, path.display());
    Ok(())
}

fn handle_delete(gateway: &GatewayClient, args: &ModelArgs) -> Result<()> {
    let path = gateway.delete(&args.model)?;
    println!("Deleted {}", path.display());
    Ok(())
}

fn handle_switch(gateway: &GatewayClient, args: &ModelArgs) -> Result<()> {
    info!(model = %args.model, "Switching engine model");
    gateway.switch_model(&args.model)?;
    println!(
        "Engine ready on {} at {}",
        args.model,
        gateway.endpoint().base_url()
    );
    Ok(())
}

/// Model name sent with chat requests
fn chat_model(gateway: &GatewayClient, requested: Option<&str>) -> String {
    requested
        .map(str::to_string)
        .or_else(|| gateway.active_model())
        .unwrap_or_else(|| gateway.config().default_model.clone())
}

/// Streams one reply to stdout and returns its full text
fn stream_reply(gateway: &GatewayClient, model: &str, history: &[ChatMessage]) -> Result<String> {
    let mut stdout = io::stdout();
    let mut reply = String::new();

    gateway.chat_each(model, history, |text, _is_final| {
        reply.push_str(text);
        let _ = write!(stdout, "{}", text);
        let _ = stdout.flush();
    })?;
    writeln!(stdout)?;
    Ok(reply)
}

fn handle_chat(gateway: &GatewayClient, args: &ChatArgs) -> Result<()> {
    let model = chat_model(gateway, args.model.as_deref());
    let mut history: Vec<ChatMessage> = args
        .system
        .iter()
        .map(|s| ChatMessage::system(s.as_str()))
        .collect();

    if !gateway.is_running() {
        eprintln!(
            "Engine at {} is not responding; run `llmgate switch <model>` first",
            gateway.endpoint()
        );
    }
    eprintln!("Chatting with {} (/reset clears history, /exit quits)", model);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line.context("Failed to read from stdin")?;
        let input = line.trim();

        match input {
            "" => continue,
            "/exit" | "/quit" => break,
            "/reset" => {
                history.retain(|m| m.role == MessageRole::System);
                eprintln!("History cleared");
                continue;
            }
            _ => {}
        }

        history.push(ChatMessage::user(input));
        match stream_reply(gateway, &model, &history) {
            Ok(reply) => history.push(ChatMessage::assistant(reply)),
            Err(e) => {
                // keep the history consistent for the next attempt
                history.pop();
                report_error(&e);
            }
        }
    }

    Ok(())
}

fn handle_generate(gateway: &GatewayClient, args: &GenerateArgs) -> Result<()> {
    let model = chat_model(gateway, args.model.as_deref());
    let mut stdout = io::stdout();
    gateway
        .generate(&model, &args.prompt)?
        .for_each_chunk(|text, _| {
            let _ = write!(stdout, "{}", text);
            let _ = stdout.flush();
        })?;
    writeln!(stdout)?;
    Ok(())
}

fn handle_recommend(gateway: &GatewayClient, args: &FormatArgs) -> Result<()> {
    let profile = gateway.hardware();
    if gateway.config().hardware.is_none() {
        debug!("No hardware profile configured, assuming CPU only");
    }
    let recommendation = gateway.recommend(&profile);

    let formatter = OutputFormatter::new(args.format.into());
    println!(
        "{}",
        formatter.format_recommendation(recommendation.as_ref(), &profile)?
    );
    Ok(())
}
