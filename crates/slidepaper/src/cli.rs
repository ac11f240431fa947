use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "slidepaper",
    author,
    version,
    about = "Wallpaper slideshow daemon",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Directory containing the slideshow images.
    #[arg(value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Load settings from a TOML configuration file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Viewport resolution (e.g. `1920x1080`).
    #[arg(long, value_name = "WIDTHxHEIGHT", default_value = "1920x1080")]
    pub size: String,

    /// Presented frame-rate cap.
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Time each slide stays on screen (e.g. `10s`).
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// Crossfade duration between slides (e.g. `1s`).
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub crossfade: Option<Duration>,

    /// Walk the source directory in a reshuffled order each cycle.
    #[arg(long)]
    pub shuffle: bool,

    /// Seed for the shuffle order, for reproducible runs.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Directory where presented frames are written as PNG files.
    #[arg(long, value_name = "DIR", default_value = "slidepaper-frames")]
    pub export_dir: PathBuf,

    /// Number of frames to present before exiting.
    #[arg(long, value_name = "COUNT", default_value_t = 120)]
    pub frames: u64,

    /// Speed of the simulated pan sweep in radians per second (0 = static).
    #[arg(long, value_name = "SPEED", default_value_t = 0.0)]
    pub pan_speed: f32,
}

pub fn parse() -> Cli {
    Cli::parse()
}
