mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod resource;
mod stack;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// `--config` as given on the command line
    pub config: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
    };

    match cli.command {
        Command::Synth(args) => commands::synth::run(&ctx, args),
        Command::List(args) => commands::inspect::list(&ctx, args.target.as_deref()),
        Command::Graph => commands::inspect::graph(&ctx),
        Command::Diff(args) => commands::diff::run(&ctx, args),
        Command::Validate => commands::synth::validate(&ctx),
        Command::Check(args) => commands::check::run(&ctx, args),
        Command::Config => commands::config::show(&ctx),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "mira-infra", &mut io::stdout());
            Ok(())
        }
    }
}
