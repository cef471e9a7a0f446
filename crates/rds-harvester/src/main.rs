// Copyright 2026 RDS Harvester Contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use rds_harvester::cli;

#[derive(Parser)]
#[command(
    name = "rds-harvester",
    about = "RDS harvester: bulk export of conformity declarations with applicant contacts",
    version,
    after_help = "Run 'rds-harvester <command> --help' for details on each command."
)]
struct Cli {
    /// Enable debug logging for this tool (applied on top of RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Log file (appended)
    #[arg(long, global = true, default_value = "rds_harvester.log")]
    log_file: PathBuf,

    /// Log to stderr only
    #[arg(long, global = true)]
    no_log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve declarations, enrich them with contacts and export
    Run(cli::run_cmd::RunArgs),
    /// Write detail-page links for a date range
    Links(cli::links_cmd::LinksArgs),
    /// Obtain (or check) a bearer token and print it
    Token(cli::token_cmd::TokenArgs),
    /// Check environment and diagnose issues
    Doctor {
        /// Chromium executable to check
        #[arg(long, env = "RDS_CHROMIUM_PATH")]
        chromium: Option<PathBuf>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = (!cli.no_log_file).then_some(cli.log_file.as_path());
    rds_harvester::logging::init(cli.verbose, log_file)?;

    let result = match cli.command {
        Commands::Run(args) => cli::run_cmd::run(args).await,
        Commands::Links(args) => cli::links_cmd::run(args).await,
        Commands::Token(args) => cli::token_cmd::run(args).await,
        Commands::Doctor { chromium } => cli::doctor::run(chromium).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "rds-harvester", &mut std::io::stdout());
            Ok(())
        }
    };

    // 0=success, 1=error
    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }

    result
}
