use crate::config::Settings;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Lookahead note scheduler for MIDI instruments", long_about = None)]
pub struct Args {
    /// List available MIDI output devices
    #[arg(long)]
    pub list_devices: bool,

    /// MIDI output device to play through (substring match)
    #[arg(long)]
    pub midi_output: Option<String>,

    /// Pick the MIDI output device interactively
    #[arg(long)]
    pub select_output: bool,

    /// Tempo in beats per minute
    #[arg(short, long)]
    pub tempo: Option<f64>,

    /// General MIDI instrument for a track; repeat for more tracks
    #[arg(short, long = "instrument")]
    pub instruments: Vec<String>,

    /// Stop after this many seconds instead of running until interrupted
    #[arg(short, long)]
    pub duration: Option<u64>,

    /// Settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log dispatches instead of sending MIDI
    #[arg(long)]
    pub dry_run: bool,

    /// Show info-level log output on the terminal
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Command-line values take precedence over file and environment settings.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(tempo) = self.tempo {
            settings.tempo = tempo;
        }
        if let Some(device) = &self.midi_output {
            settings.midi_output = Some(device.clone());
        }
        if !self.instruments.is_empty() {
            settings.instruments = self.instruments.clone();
        }
    }
}

pub fn validate_device(device_name: &str, devices: &[String]) -> Result<(), String> {
    if !devices.iter().any(|d| d.contains(device_name)) {
        let mut error_msg = format!(
            "Error: Device '{}' not found in available devices:\n",
            device_name
        );
        for device in devices {
            error_msg.push_str(&format!("  - {}\n", device));
        }
        return Err(error_msg);
    }
    Ok(())
}
