use anyhow::Result;
use headway::{Engine, Tick};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

use super::actions::dispatch;
use crate::cli::SessionLine;
use crate::config::HeadwayConfig;
use crate::render::Printer;

const PROMPT: &str = "headway> ";

/// Reads commands from stdin while forwarding ticks to the engine, until `quit` or EOF.
pub async fn run_session<W: Write>(
    engine: &mut Engine,
    ticks: &mut UnboundedReceiver<Tick>,
    printer: &mut Printer<W>,
    config: &HeadwayConfig,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let line = line.trim();
                match line {
                    "" => {}
                    "quit" | "exit" => break,
                    _ => handle_line(engine, printer, config, line)?,
                }
                prompt();
            }
            Some(Tick) = ticks.recv() => {
                debug!("tick");
                printer.apply(&engine.on_tick())?;
            }
        }
    }

    Ok(())
}

fn handle_line<W: Write>(
    engine: &mut Engine,
    printer: &mut Printer<W>,
    config: &HeadwayConfig,
    line: &str,
) -> Result<()> {
    let command = match SessionLine::parse_line(line) {
        Ok(command) => command,
        Err(err) => {
            // clap renders its own usage and help text
            let _ = err.print();
            return Ok(());
        }
    };

    match dispatch(engine, command, config) {
        Ok(effects) => printer.apply(&effects)?,
        Err(err) => {
            warn!(error = %err, "command failed");
            eprintln!("Error: {:#}", err);
        }
    }
    Ok(())
}

fn prompt() {
    print!("{}", PROMPT);
    let _ = std::io::stdout().flush();
}
