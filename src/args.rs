// Commandline argument parsers using clap for the two binaries

use crate::config::{PipelineConfig, Selection, DEFAULT_ELEVATION, DEFAULT_TOLERANCE};
use crate::link::BAUD_RATE;
use clap::{Args, Parser, Subcommand};
use std::{
    path::PathBuf,
    time::{Duration, TryFromFloatSecsError},
};

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
/// Build, inspect, and export HRIR databases
pub struct HrirArgs {
    #[command(subcommand)]
    /// Which task to perform
    pub command: HrirCommand,
}

#[derive(Debug, Subcommand, Clone)]
/// Tasks of the `hrirdb` binary
pub enum HrirCommand {
    /// Convert a directory of WAV measurements into a database file
    #[command(about)]
    Build(BuildCommand),

    /// Print a summary of a database file
    #[command(about)]
    Inspect(InspectCommand),

    /// Write every measurement of a database file out as WAV files
    #[command(about)]
    ExportWav(ExportWavCommand),

    /// Generate a synthetic WAV measurement directory
    #[command(about)]
    Synth(SynthCommand),

    /// Print the default pipeline configuration as RON
    #[command(about)]
    Config,
}

#[derive(Debug, Args, Clone)]
/// Options of `hrirdb build`. Flags override values from `--config`.
pub struct BuildCommand {
    /// RON pipeline configuration to start from
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory of az<AAA>_el<EEE>.wav measurements
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Filename for the database to be written to
    #[arg(short = 'o', long = "out")]
    pub output: Option<PathBuf>,

    /// Elevation of the ring to keep, in degrees
    #[arg(short, long, allow_negative_numbers = true)]
    pub elevation: Option<f32>,

    /// Half width of the ring, in degrees
    #[arg(short, long)]
    pub tolerance: Option<f32>,

    /// Output sample rate, in Hz
    #[arg(short, long)]
    pub rate: Option<u32>,

    /// Keep the source sample rate
    #[arg(long, conflicts_with = "rate")]
    pub keep_rate: bool,

    /// Samples kept per channel
    #[arg(short = 'n', long)]
    pub trim: Option<u32>,

    /// Keep every measurement in source order instead of one ring
    #[arg(long, conflicts_with_all = ["elevation", "tolerance"])]
    pub all: bool,

    /// Skip peak normalization
    #[arg(long)]
    pub no_normalize: bool,

    /// Truncate without the half Hann taper
    #[arg(long)]
    pub no_taper: bool,

    /// Fail instead of writing an empty database
    #[arg(long)]
    pub require_nonempty: bool,

    /// Distance given to every measurement, in meters
    #[arg(long)]
    pub distance: Option<f32>,
}

impl BuildCommand {
    /// Apply the command line on top of `config`.
    pub fn apply(&self, config: PipelineConfig) -> PipelineConfig {
        let mut config = config;
        if let Some(source) = &self.source {
            config.source = source.clone();
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }

        if self.all {
            config.selection = Selection::All;
        } else if self.elevation.is_some() || self.tolerance.is_some() {
            let (target, tolerance) = match config.selection {
                Selection::Elevation { target, tolerance } => (target, tolerance),
                Selection::All => (DEFAULT_ELEVATION, DEFAULT_TOLERANCE),
            };
            config.selection = Selection::Elevation {
                target: self.elevation.unwrap_or(target),
                tolerance: self.tolerance.unwrap_or(tolerance),
            };
        }

        if self.keep_rate {
            config.target_sample_rate = None;
        } else if let Some(rate) = self.rate {
            config.target_sample_rate = Some(rate);
        }
        if let Some(trim) = self.trim {
            config.trim_length = trim;
        }
        if let Some(distance) = self.distance {
            config.default_distance = distance;
        }
        config.normalize &= !self.no_normalize;
        config.taper &= !self.no_taper;
        config.require_nonempty |= self.require_nonempty;
        config
    }
}

#[derive(Debug, Args, Clone)]
/// Options of `hrirdb inspect`
pub struct InspectCommand {
    /// Database file to read
    pub file: PathBuf,

    /// Also print every sample
    #[arg(long)]
    pub samples: bool,

    /// Print the measurement closest to this azimuth as well
    #[arg(long)]
    pub nearest: Option<f32>,
}

#[derive(Debug, Args, Clone)]
/// Options of `hrirdb export-wav`
pub struct ExportWavCommand {
    /// Database file to read
    pub file: PathBuf,

    /// Directory the WAV files are written to
    #[arg(short = 'o', long = "out")]
    pub out_dir: PathBuf,
}

#[derive(Debug, Args, Clone)]
/// Options of `hrirdb synth`
pub struct SynthCommand {
    /// Directory the WAV files are written to
    #[arg(short = 'o', long = "out")]
    pub out_dir: PathBuf,

    /// Sample rate, in Hz
    #[arg(short, long, default_value_t = 48000)]
    pub rate: u32,

    /// Samples per channel
    #[arg(short = 'n', long, default_value_t = 256)]
    pub length: usize,

    /// Azimuth spacing, in degrees
    #[arg(short, long, default_value_t = 5.0)]
    pub azimuth_step: f32,

    /// Elevation rings, in degrees
    #[arg(short, long, num_args = 1.., allow_negative_numbers = true, default_values_t = [-10.0, 0.0, 10.0])]
    pub elevations: Vec<f32>,

    /// Seed of the noise generator
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
/// Talk to the playback device over its serial line protocol
pub struct LinkArgs {
    /// Serial port to open. Without it, a port picker is shown.
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate
    #[arg(short, long, default_value_t = BAUD_RATE)]
    pub baud: u32,

    /// Keep printing device messages for this many seconds after sending
    #[arg(short, long, default_value_t = 2.0, allow_negative_numbers = true)]
    pub listen: f32,

    /// Commands to send in order, in wire form such as `SET_ANGLE:90`
    pub commands: Vec<String>,
}

impl LinkArgs {
    /// The `--listen` window. Negative, infinite, NaN, and overly large
    /// values are errors.
    pub fn listen_duration(&self) -> Result<Duration, TryFromFloatSecsError> {
        Duration::try_from_secs_f32(self.listen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(args: &[&str]) -> BuildCommand {
        let argv = std::iter::once("hrirdb").chain(std::iter::once("build")).chain(args.iter().copied());
        match HrirArgs::parse_from(argv).command {
            HrirCommand::Build(b) => b,
            other => panic!("parsed {:?}", other),
        }
    }

    #[test]
    fn no_flags_keep_config() {
        let config = PipelineConfig {
            trim_length: 64,
            ..Default::default()
        };
        assert_eq!(build(&[]).apply(config.clone()), config);
    }

    #[test]
    fn flags_override() {
        let config = build(&[
            "-s", "dump", "-o", "out.bin", "-e", "-10", "-n", "256", "--no-taper", "--keep-rate",
        ])
        .apply(PipelineConfig::default());

        assert_eq!(config.source, PathBuf::from("dump"));
        assert_eq!(config.output, PathBuf::from("out.bin"));
        assert_eq!(
            config.selection,
            Selection::Elevation {
                target: -10.0,
                tolerance: 1.0
            }
        );
        assert_eq!(config.trim_length, 256);
        assert_eq!(config.target_sample_rate, None);
        assert!(!config.taper);
        assert!(config.normalize);
    }

    #[test]
    fn all_measurements() {
        let config = build(&["--all", "--require-nonempty"]).apply(PipelineConfig::default());
        assert_eq!(config.selection, Selection::All);
        assert!(config.require_nonempty);
    }

    #[test]
    fn link_commands() {
        let args = LinkArgs::parse_from(["surround-link", "-p", "/dev/ttyACM0", "CONNECT", "VOLUME:30"]);
        assert_eq!(args.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(args.baud, 115200);
        assert_eq!(args.commands, vec!["CONNECT", "VOLUME:30"]);
    }

    #[test]
    fn listen_window() {
        let args = |listen: &str| LinkArgs::parse_from(["surround-link", "-l", listen]);
        assert_eq!(args("2").listen_duration(), Ok(Duration::from_secs(2)));
        assert_eq!(args("0").listen_duration(), Ok(Duration::ZERO));
        assert!(args("1e20").listen_duration().is_err());
        assert!(args("-1").listen_duration().is_err());
        assert!(args("inf").listen_duration().is_err());
        assert!(args("NaN").listen_duration().is_err());
    }

    #[test]
    fn synth_defaults() {
        match HrirArgs::parse_from(["hrirdb", "synth", "-o", "dir"]).command {
            HrirCommand::Synth(s) => {
                assert_eq!(s.rate, 48000);
                assert_eq!(s.elevations, vec![-10.0, 0.0, 10.0]);
            }
            other => panic!("parsed {:?}", other),
        }
    }
}
