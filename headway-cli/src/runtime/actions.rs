use anyhow::{bail, Context, Result};
use headway::decode::decoder_for_path;
use headway::engine::{Effect, Engine, Field, FilterChange};
use headway::export;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

use crate::cli::Commands;
use crate::config::HeadwayConfig;

/// Runs one command against the engine and returns what has to be shown.
pub fn dispatch(
    engine: &mut Engine,
    command: Commands,
    config: &HeadwayConfig,
) -> Result<Vec<Effect>> {
    let effects = match command {
        Commands::Load { file } => load(engine, &file, config)?,
        Commands::Show => show(engine),
        Commands::Set { id, vehicle, time } => {
            if vehicle.is_none() && time.is_none() {
                bail!("Nothing to set. Pass --vehicle and/or --time.");
            }
            let mut effects = Vec::new();
            if let Some(vehicle) = vehicle {
                effects.extend(engine.on_field_edited(id, Field::Vehicle, &vehicle)?);
            }
            if let Some(time) = time {
                effects.extend(engine.on_field_edited(id, Field::ObservedTime, &time)?);
            }
            effects
        }
        Commands::Select { dimension, value } => engine.on_quick_search(dimension, &value)?,
        Commands::Deselect { dimension, value } => {
            engine.on_filter_changed(FilterChange::Deselect(dimension, value))?
        }
        Commands::ToggleAll { dimension } => {
            engine.on_filter_changed(FilterChange::ToggleAll(dimension))?
        }
        Commands::Range { from, to } => engine.on_filter_changed(FilterChange::TimeRange {
            start: from.map(clear_marker),
            end: to.map(clear_marker),
        })?,
        Commands::ResetFilters => engine.on_filter_changed(FilterChange::Reset)?,
        Commands::Theme => engine.on_theme_toggled()?,
        Commands::Clear { yes } => {
            if !yes {
                return Ok(vec![Effect::Notify(
                    "This removes the schedule and everything entered for it. Run `clear --yes` to confirm."
                        .to_string(),
                )]);
            }
            engine.reset()?
        }
        Commands::Export { file } => export_view(engine, &file)?,
        Commands::Session | Commands::ConfigPath => {
            bail!("This command is only available from the shell")
        }
    };
    Ok(effects)
}

fn load(engine: &mut Engine, file: &Path, config: &HeadwayConfig) -> Result<Vec<Effect>> {
    let decoder = decoder_for_path(file, config.delimiter()?)?;
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let effects = engine.load_file(decoder.as_ref(), &bytes)?;
    info!(file = %file.display(), records = engine.records().len(), "loaded schedule");
    Ok(effects)
}

/// `-` clears a bound since an empty word cannot be typed in a session.
fn clear_marker(bound: String) -> String {
    if bound.trim() == "-" {
        String::new()
    } else {
        bound
    }
}

fn show(engine: &Engine) -> Vec<Effect> {
    if engine.records().is_empty() {
        return vec![Effect::Cleared];
    }
    vec![Effect::Render(engine.view_rows())]
}

fn export_view(engine: &Engine, file: &Path) -> Result<Vec<Effect>> {
    if engine.records().is_empty() {
        bail!("No schedule loaded, nothing to export");
    }
    let rows = engine.view_rows();
    let out =
        File::create(file).with_context(|| format!("Failed to create {}", file.display()))?;
    export::write_csv(&rows, BufWriter::new(out))?;
    Ok(vec![Effect::Notify(format!(
        "Exported {} rows to {}",
        rows.len(),
        file.display()
    ))])
}
