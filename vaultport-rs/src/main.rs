//! Vaultport CLI entry point.

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use vaultport::cli::args::{Cli, Commands};
use vaultport::cli::output::Output;
use vaultport::cli::{compile, convert, frontmatter, resolve};
use vaultport::config::Config;
use vaultport::error::{ExitCode as VaultportExitCode, VaultportError};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(code) => ExitCode::from(code.code() as u8),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {}", e);
            }
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run(cli: &Cli) -> Result<VaultportExitCode, VaultportError> {
    let config = Config::load(cli.config.as_deref())?;
    let output = Output::new(cli.output_format(), cli.quiet);

    match &cli.command {
        Commands::Frontmatter(args) => frontmatter::run(&config, args, cli.now, &output)?,
        Commands::Compile(args) => compile::run(&config, args, cli.now, &output)?,
        Commands::Resolve(args) => resolve::run(&config, args, &output)?,
        Commands::Convert(args) => convert::run(&config, args, cli.now, &output)?,
    }

    Ok(VaultportExitCode::Success)
}
