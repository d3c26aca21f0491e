use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use lease_probe::{config, logging, prelude::*, Cli, Commands};

/// Exit status for setup failures, distinct from "not ready" (1).
const EXIT_SETUP_ERROR: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command();
    if command == Commands::Env {
        print!("{}", config::help_text());
        return ExitCode::SUCCESS;
    }

    let log_file = Config::log_file(|name| std::env::var(name).ok());
    if let Err(e) = logging::init(&log_file, logging::level_for(cli.verbosity)) {
        eprintln!("Could not open log file {}: {}", log_file.display(), e);
    }

    match run(command).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_SETUP_ERROR)
        }
    }
}

async fn run(command: Commands) -> anyhow::Result<ExitCode> {
    let config = Config::load(|name| std::env::var(name).ok()).context("loading configuration")?;
    let driver = Driver::from_config(&config).context("configuring the lease protocol")?;

    let code = match command {
        Commands::Probe => driver.run_once().await.exit_code(),
        Commands::Release => match driver.release().await {
            ReleaseOutcome::Released => {
                println!("released lease held by {}", driver.identity());
                ExitCode::SUCCESS
            }
            ReleaseOutcome::NotHeld => {
                println!("{} does not hold the lease", driver.identity());
                ExitCode::SUCCESS
            }
            ReleaseOutcome::Failed { step, error } => {
                anyhow::bail!("lease not released: store {step} failed: {error}")
            }
        },
        Commands::Show => {
            let view = driver.inspect().await.context("reading lease")?;
            match view.raw {
                None => println!("no lease"),
                Some(raw) => println!(
                    "{raw} (holder: {}, expired: {}, ours: {})",
                    view.record
                        .as_ref()
                        .map_or("<malformed>", |r| r.claimant.as_str()),
                    view.expired,
                    view.held_by_self
                ),
            }
            ExitCode::SUCCESS
        }
        // printed before the log sink is touched
        Commands::Env => ExitCode::SUCCESS,
    };
    Ok(code)
}
