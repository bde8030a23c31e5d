// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{crate_version, Parser, Subcommand};
use mutander::config::Settings;
use mutander::render::{self, RenderOptions};
use mutander::{state, Processor};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A MIDI-triggered mute switch and bus selector."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Renders audio offline, driving the triggers from a MIDI file.
    Render {
        /// The settings file. Defaults apply when omitted.
        #[arg[short, long]]
        settings: Option<PathBuf>,
        /// Saved trigger state to load before rendering.
        #[arg[long]]
        state: Option<PathBuf>,
        /// Samples per processing block.
        #[arg[short, long, default_value_t = 512]]
        block_size: usize,
        /// Where to write the rendered 32-bit float WAV file.
        #[arg[short, long]]
        output: PathBuf,
        /// The MIDI file that drives the triggers.
        midi: PathBuf,
        /// The input WAV files: one for the mute switch, one per bus for the
        /// bus selector.
        #[arg[required = true]]
        inputs: Vec<PathBuf>,
    },
    /// Lists the triggers held in a saved state file.
    Triggers {
        /// The settings file. Defaults apply when omitted.
        #[arg[short, long]]
        settings: Option<PathBuf>,
        /// The saved state file.
        state: PathBuf,
    },
    /// Prints the effective settings.
    Settings {
        /// The settings file. Defaults apply when omitted.
        path: Option<PathBuf>,
    },
}

fn load_settings(path: Option<&Path>) -> Result<Settings, Box<dyn Error>> {
    Ok(match path {
        Some(path) => Settings::deserialize(path)?,
        None => Settings::default(),
    })
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            settings,
            state,
            block_size,
            output,
            midi,
            inputs,
        } => {
            let settings = load_settings(settings.as_deref())?;
            let state = match state {
                Some(path) => Some(fs::read(path)?),
                None => None,
            };
            let summary = render::render(
                &settings,
                &midi,
                &inputs,
                &output,
                &RenderOptions { block_size, state },
            )?;

            println!(
                "Rendered {} samples ({} channels at {} Hz, {} MIDI events) to {}.",
                summary.samples,
                summary.channels,
                summary.sample_rate,
                summary.midi_events,
                output.display()
            );
        }
        Commands::Triggers {
            settings,
            state: state_path,
        } => {
            let settings = load_settings(settings.as_deref())?;
            let data = fs::read(&state_path)?;
            // Surface a bad file here; loading alone would just clear the table.
            state::parse(settings.variant(), settings.trigger_slots(), &data)?;

            let processor = Processor::new(&settings)?;
            let controls = processor.controls();
            controls.load_state(&data);

            println!("Triggers in {}:", state_path.display());
            for button in controls.buttons() {
                println!("- {}: {}", button.name, button.label.replace('\n', ", "));
            }
        }
        Commands::Settings { path } => {
            let settings = load_settings(path.as_deref())?;
            let variant = settings.variant();
            let policy = settings.learn_policy();

            let names: Vec<String> = (0..variant.actions())
                .filter_map(|action| variant.action_name(action))
                .collect();
            println!("Variant: {} ({})", variant.kind(), names.join(", "));
            println!("Trigger slots: {}", settings.trigger_slots());
            println!("Debounce: {:?}", settings.debounce()?);
            println!("Fade: {:?}", settings.fade()?);
            println!("Evict duplicates on learn: {}", policy.evict_duplicates);
            println!("Clear triggers on learn: {}", policy.clear_on_learn);

            let presets = settings.presets()?;
            if presets.is_empty() {
                println!("Presets: none");
            } else {
                println!("Presets:");
                for (action, keys) in presets {
                    let labels: Vec<String> = keys.iter().map(|key| key.to_string()).collect();
                    println!(
                        "- {}: {}",
                        variant.action_name(action).unwrap_or_default(),
                        labels.join(", ")
                    );
                }
            }
        }
    }

    Ok(())
}
