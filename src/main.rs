use llmgate::cli::handlers;
use llmgate::cli::CliArgs;
use llmgate::util::logging::{init_logging, parse_level, LoggingConfig};
use llmgate::VERSION;

use clap::Parser;
use std::env;
use tracing::{debug, Level};

fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("llmgate v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = handlers::run(&args);
    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str).unwrap_or_else(|| {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        })
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        env::var("LLMGATE_LOG_LEVEL")
            .ok()
            .and_then(|v| parse_level(&v))
            // chat output shares the terminal, so stay quiet unless asked
            .unwrap_or(Level::WARN)
    };

    let use_json = env::var("LLMGATE_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    init_logging(LoggingConfig {
        level,
        use_json,
        ..Default::default()
    });
}
