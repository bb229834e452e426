mod cli;
mod config;
mod render;
mod runtime;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use headway::{Engine, FileStore, Store, TokioScheduler, ZonedClock};
use render::Printer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Commands::ConfigPath = cli.command {
        let path = config::HeadwayConfig::write_default_if_missing()?;
        println!("{}", path.display());
        return Ok(());
    }

    let cfg = config::HeadwayConfig::load()?;
    init_tracing(&cfg.log_level);

    let clock = ZonedClock::from_name(&cfg.timezone)?;
    let state_dir = cfg.state_dir()?;
    let store = Store::new(FileStore::new(&state_dir));
    let (scheduler, mut ticks) = TokioScheduler::new();
    let mut engine = Engine::new(store, clock, scheduler).with_columns(cfg.columns.clone());
    tracing::debug!(state_dir = %state_dir.display(), timezone = %cfg.timezone, "starting");

    let restored = engine
        .load()
        .context("Failed to restore the previous session")?;
    let mut printer = Printer::new(std::io::stdout());

    let result = match cli.command {
        Commands::Session => {
            printer.apply(&restored)?;
            runtime::run_session(&mut engine, &mut ticks, &mut printer, &cfg).await
        }
        command => {
            printer.notices(&restored)?;
            runtime::dispatch(&mut engine, command, &cfg)
                .and_then(|effects| Ok(printer.apply(&effects)?))
        }
    };

    engine.dispose();
    result
}

fn init_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
