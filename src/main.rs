mod cli;
mod commands;
mod config;
mod engine;
mod output;
mod plan;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::CommandContext;
use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.global.quiet {
        log::LevelFilter::Error
    } else if cli.global.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            ui::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    match cli.command {
        Command::Update(args) => {
            let ctx = CommandContext::new(
                cli.global.dir,
                &args.path,
                cli.global.vars.into_iter().collect(),
                cli.global.output,
                cli.global.ignore_dependencies,
            )?;
            commands::update::run(&ctx, &args)
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "stackctl", &mut io::stdout());
            Ok(0)
        }
    }
}
