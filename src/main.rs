mod classification;
mod cli;
mod commands;
mod config;
mod engine;
mod paths;
mod prompt;
mod ui;
mod webhook;

use anyhow::{Context as _, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::{Config, LogConfig};
use std::fs::OpenOptions;
use std::io;

/// Global context for the application
pub struct Context {
    pub quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        ui::error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "monsync", &mut io::stdout());
        return Ok(());
    }

    let path = paths::config_path(cli.config.as_deref())?;
    let config = Config::load(&path)?;
    init_logging(&cli, &config.log)?;
    log::debug!("Loaded config from {}", path.display());

    let ctx = Context { quiet: cli.quiet };

    match cli.command {
        Command::Sync(args) => commands::sync::run(&ctx, &config, &args),
        Command::Device(args) => commands::device::run(&ctx, &config, &args),
        Command::Serve(args) => commands::serve::run(&ctx, config, &args),
        Command::Check => commands::check::run(&ctx, &config, &path),
        Command::Completions { .. } => Ok(()),
    }
}

/// Level from `-q`/`-v`, falling back to the configured level
fn log_level(verbose: u8, quiet: bool, configured: Option<&str>) -> log::LevelFilter {
    if quiet {
        return log::LevelFilter::Error;
    }
    match verbose {
        0 => configured
            .and_then(|level| level.parse().ok())
            .unwrap_or(log::LevelFilter::Warn),
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn init_logging(cli: &Cli, log_config: &LogConfig) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log_level(
        cli.verbose,
        cli.quiet,
        log_config.level.as_deref(),
    ));

    if let Some(file) = &log_config.file {
        let path = paths::expand_path(file);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Could not open log file: {}", path.display()))?;
        builder
            .target(env_logger::Target::Pipe(Box::new(file)))
            .format_timestamp_secs();
    } else {
        builder.format_timestamp(None);
    }

    builder.init();
    Ok(())
}
