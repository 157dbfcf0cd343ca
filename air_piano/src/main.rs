//! air_piano — play chords in the air.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;

use air_engine::{EventSink, Recording};
use air_piano::app::App;
use air_piano::commands::{help_text, spawn_command_reader};
use air_piano::config::AppConfig;
use air_piano::midi_out::{list_ports, MidiSink};
use air_piano::source::{spawn_frame_source, JsonLinesSource, SimulatedHand};

/// Turns hand landmarks into chords and pitch bends on a MIDI synthesiser.
#[derive(Parser, Debug)]
#[command(name = "air_piano", version)]
#[command(about = "Gesture-driven chord player with performance recording")]
struct Args {
    /// Config file (default: <config dir>/air_piano/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON-lines landmark feed; `-` reads stdin
    #[arg(long, value_name = "PATH|-", conflicts_with = "simulate")]
    frames: Option<String>,

    /// Drive the piano from a built-in simulated hand
    #[arg(long)]
    simulate: bool,

    /// Number of passes through the simulation script (default: endless)
    #[arg(long, requires = "simulate")]
    passes: Option<usize>,

    /// Write the last recording to this MIDI file on exit
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,

    /// List MIDI output ports and exit
    #[arg(long)]
    list_ports: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let config = AppConfig::load(args.config.as_deref());

    if args.list_ports {
        let ports = list_ports(&config.midi.client_name).context("initialising MIDI")?;
        if ports.is_empty() {
            println!("No MIDI output ports.");
        }
        for (i, name) in ports.iter().enumerate() {
            println!("  {}: {}", i, name);
        }
        return Ok(());
    }

    let (frames, stdin_free) = match args.frames.as_deref() {
        Some("-") => {
            let reader = BufReader::new(io::stdin());
            (spawn_frame_source(JsonLinesSource::new(Box::new(reader), None)), false)
        }
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening landmark feed {}", path))?;
            let pace = Some(config.frame_interval());
            (spawn_frame_source(JsonLinesSource::new(Box::new(BufReader::new(file)), pace)), true)
        }
        None => {
            if !args.simulate {
                log::info!(target: "app", "no --frames given; using the simulated hand");
            }
            (spawn_frame_source(SimulatedHand::new(config.frame_interval(), args.passes)), true)
        }
    };

    let commands = if stdin_free {
        eprint!("{}", help_text());
        Some(spawn_command_reader(BufReader::new(io::stdin())))
    } else {
        None
    };

    let outputs: Vec<Box<dyn EventSink>> = vec![Box::new(MidiSink::open(&config.midi))];
    let app = App::new(config.engine_config(), outputs).context("invalid chord configuration")?;
    println!("  {}", app.status);

    let summary = app.run(frames, commands, config.frame_interval());
    log::info!(
        target: "app",
        "{} frames processed, {} rejected",
        summary.frames, summary.rejected
    );

    if let Some(path) = args.export {
        export(summary.recording, summary.program, &path, &config)?;
    }
    Ok(())
}

fn export(recording: Option<Recording>, program: u8, path: &Path, config: &AppConfig) -> anyhow::Result<()> {
    let Some(recording) = recording.filter(|r| !r.is_empty()) else {
        bail!("nothing was recorded; {} not written", path.display());
    };
    let track = recording.to_smf("air_piano", config.midi.channel, Some(program));
    track
        .write_file(path)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("  Wrote {} events to {}", recording.len(), path.display());
    Ok(())
}
