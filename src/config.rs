//! Configuration of a conversion run.
//!
//! Everything that used to be a constant in a one-off script lives in
//! [PipelineConfig]. A config can be written by hand in [ron] and loaded
//! with [PipelineConfig::from_path]; fields left out take their defaults:
//!
//! ```text
//! (
//!     source: "hrtf_nh2",
//!     output: "hrtf_elev0.bin",
//!     selection: Elevation(target: 0.0, tolerance: 1.0),
//!     target_sample_rate: Some(44100),
//!     trim_length: 128,
//! )
//! ```

use crate::resampler::Ratio;
use serde::{Deserialize, Serialize};
use std::{
    borrow::Cow,
    fmt,
    fs, io,
    path::{Path, PathBuf},
};

/// Default elevation of the kept ring, in degrees.
pub const DEFAULT_ELEVATION: f32 = 0.0;
/// Default half width of the kept ring, in degrees.
pub const DEFAULT_TOLERANCE: f32 = 1.0;
/// Default output sample rate, in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
/// Default number of samples kept per channel.
pub const DEFAULT_TRIM_LENGTH: u32 = 128;
/// Default source distance for datasets whose files carry no distance.
pub const DEFAULT_DISTANCE: f32 = 1.2;

/// Which measurements of the dataset make it into the database.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub enum Selection {
    /// One elevation ring, sorted by azimuth.
    Elevation {
        /// Elevation of the ring, in degrees
        target: f32,
        /// Inclusive half width of the ring, in degrees
        tolerance: f32,
    },
    /// Every measurement, in source order.
    All,
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Elevation {
            target: DEFAULT_ELEVATION,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// The full description of one conversion run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the source measurements
    pub source: PathBuf,
    /// Where the database is written
    pub output: PathBuf,
    /// Which measurements to keep
    pub selection: Selection,
    /// Output rate in Hz, or `None` to keep the source rate
    pub target_sample_rate: Option<u32>,
    /// Samples kept per channel
    pub trim_length: u32,
    /// Peak-normalize each stereo pair
    pub normalize: bool,
    /// Taper the kept samples with a half Hann window
    pub taper: bool,
    /// Fail when the selection comes back empty
    pub require_nonempty: bool,
    /// Distance recorded for sources that do not state one, in meters
    pub default_distance: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("hrtf"),
            output: PathBuf::from("hrtf_elev0.bin"),
            selection: Selection::default(),
            target_sample_rate: Some(DEFAULT_SAMPLE_RATE),
            trim_length: DEFAULT_TRIM_LENGTH,
            normalize: true,
            taper: true,
            require_nonempty: false,
            default_distance: DEFAULT_DISTANCE,
        }
    }
}

/// Returned when a configuration cannot be loaded or cannot work with the
/// dataset it is applied to. All of these are raised before anything is
/// written.
#[derive(Debug)]
pub enum ConfigError {
    /// A resampling factor of zero.
    InvalidRatio {
        /// Interpolation factor
        up: u32,
        /// Decimation factor
        down: u32,
    },

    /// A source or target sample rate of zero.
    ZeroSampleRate,

    /// A trim length of zero.
    ZeroTrimLength,

    /// The trim length is longer than the resampled impulse responses.
    TrimExceedsSamples {
        /// Requested length
        trim: u32,
        /// Samples available after resampling
        available: usize,
    },

    /// A negative or non-finite elevation tolerance.
    BadTolerance(f32),

    /// No measurement fell inside the requested band, and at least one was
    /// required.
    EmptySelection {
        /// Elevation of the band
        target: f32,
        /// Half width of the band
        tolerance: f32,
    },

    /// Every measurement was asked for, at least one was required, and the
    /// dataset has none.
    EmptyDataset,

    /// Returned when the config file cannot be read.
    IoError(io::Error),

    /// Returned when deserialization of the config file fails.
    RonSpannedError(ron::de::SpannedError),

    /// Returned when serialization of a config fails.
    RonError(ron::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ConfigError as CE;
        let msg = match self {
            CE::InvalidRatio { up, down } => {
                Cow::from(format!("invalid resampling ratio {}/{}", up, down))
            }
            CE::ZeroSampleRate => Cow::from("sample rates must be non-zero"),
            CE::ZeroTrimLength => Cow::from("trim length must be non-zero"),
            CE::TrimExceedsSamples { trim, available } => Cow::from(format!(
                "trim length {} exceeds the {} samples available after resampling",
                trim, available
            )),
            CE::BadTolerance(t) => Cow::from(format!("invalid elevation tolerance {}", t)),
            CE::EmptySelection { target, tolerance } => Cow::from(format!(
                "no measurement within {} degrees of elevation {}",
                tolerance, target
            )),
            CE::EmptyDataset => Cow::from("the dataset holds no measurements"),
            CE::IoError(error) => Cow::from(format!("io error: {}", error)),
            CE::RonSpannedError(error) => Cow::from(format!("ron spanning error: {}", error)),
            CE::RonError(error) => Cow::from(format!("ron error: {}", error)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for ConfigError {}

/// The checked, dataset-specific parameters of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessingPlan {
    /// Rate conversion from the source rate to the output rate
    pub ratio: Ratio,
    /// Sample rate written to the database
    pub output_rate: u32,
    /// Samples kept per channel
    pub trim_length: u32,
}

impl PipelineConfig {
    /// Read a config from a [ron] file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(ConfigError::IoError)?;
        Self::from_ron(&text)
    }

    /// Parse a config from [ron] text.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        ron::de::from_str(text).map_err(ConfigError::RonSpannedError)
    }

    /// Render the config as pretty [ron] text.
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(ConfigError::RonError)
    }

    /// Check the parts of the config that do not depend on the dataset.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trim_length == 0 {
            return Err(ConfigError::ZeroTrimLength);
        }
        if self.target_sample_rate == Some(0) {
            return Err(ConfigError::ZeroSampleRate);
        }
        if let Selection::Elevation { tolerance, .. } = self.selection {
            if !tolerance.is_finite() || tolerance < 0.0 {
                return Err(ConfigError::BadTolerance(tolerance));
            }
        }
        Ok(())
    }

    /// Work out the rate conversion for a dataset at `source_rate` whose
    /// impulse responses are `source_len` samples long, and check that
    /// enough samples survive the conversion. `source_len` is `None` for an
    /// empty dataset, for which there is nothing to check.
    pub fn plan(
        &self,
        source_rate: u32,
        source_len: Option<usize>,
    ) -> Result<ProcessingPlan, ConfigError> {
        self.validate()?;

        let output_rate = self.target_sample_rate.unwrap_or(source_rate);
        let ratio = Ratio::from_rates(source_rate, output_rate)?;

        if let Some(len) = source_len {
            let available = ratio.output_len(len);
            if available < self.trim_length as usize {
                return Err(ConfigError::TrimExceedsSamples {
                    trim: self.trim_length,
                    available,
                });
            }
        }

        Ok(ProcessingPlan {
            ratio,
            output_rate,
            trim_length: self.trim_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert_eq!(
            config.selection,
            Selection::Elevation {
                target: 0.0,
                tolerance: 1.0
            }
        );
        assert_eq!(config.target_sample_rate, Some(44100));
        assert_eq!(config.trim_length, 128);
        assert!(config.normalize);
        assert!(config.taper);
        assert!(!config.require_nonempty);
    }

    #[test]
    fn partial_ron_takes_defaults() {
        let config = PipelineConfig::from_ron(
            r#"(source: "sofa_dump", trim_length: 64, selection: Elevation(target: 30.0, tolerance: 2.5))"#,
        )
        .unwrap();

        assert_eq!(config.source, PathBuf::from("sofa_dump"));
        assert_eq!(config.trim_length, 64);
        assert_eq!(
            config.selection,
            Selection::Elevation {
                target: 30.0,
                tolerance: 2.5
            }
        );
        assert_eq!(config.target_sample_rate, Some(44100));
        assert_eq!(config.output, PipelineConfig::default().output);
    }

    #[test]
    fn ron_round_trip() {
        let config = PipelineConfig {
            selection: Selection::All,
            target_sample_rate: None,
            ..Default::default()
        };
        let text = config.to_ron().unwrap();
        assert_eq!(PipelineConfig::from_ron(&text).unwrap(), config);
    }

    #[test]
    fn write_and_read_path() {
        let mut tempfile = tempfile::NamedTempFile::new().unwrap();
        let config = PipelineConfig {
            trim_length: 256,
            require_nonempty: true,
            ..Default::default()
        };
        io::Write::write_all(&mut tempfile, config.to_ron().unwrap().as_bytes()).unwrap();

        assert_eq!(PipelineConfig::from_path(tempfile.path()).unwrap(), config);
    }

    #[test]
    fn garbage_ron_is_an_error() {
        assert!(matches!(
            PipelineConfig::from_ron("(trim_length: \"lots\")"),
            Err(ConfigError::RonSpannedError(_))
        ));
    }

    #[test]
    fn plan_resamples_48k_to_44k() {
        let plan = PipelineConfig::default().plan(48000, Some(256)).unwrap();
        assert_eq!(plan.output_rate, 44100);
        assert_eq!((plan.ratio.up(), plan.ratio.down()), (147, 160));
        assert_eq!(plan.trim_length, 128);
    }

    #[test]
    fn plan_keeps_source_rate() {
        let config = PipelineConfig {
            target_sample_rate: None,
            ..Default::default()
        };
        let plan = config.plan(48000, Some(128)).unwrap();
        assert_eq!(plan.output_rate, 48000);
        assert!(plan.ratio.is_identity());
    }

    #[test]
    fn trim_longer_than_resampled_ir() {
        // 130 samples at 48 kHz become 120 at 44.1 kHz
        let res = PipelineConfig::default().plan(48000, Some(130));
        assert!(matches!(
            res,
            Err(ConfigError::TrimExceedsSamples {
                trim: 128,
                available: 120
            })
        ));
    }

    #[test]
    fn empty_dataset_skips_length_check() {
        assert!(PipelineConfig::default().plan(48000, None).is_ok());
    }

    #[test]
    fn rejects_nonsense() {
        let zero_trim = PipelineConfig {
            trim_length: 0,
            ..Default::default()
        };
        assert!(matches!(zero_trim.validate(), Err(ConfigError::ZeroTrimLength)));

        let zero_rate = PipelineConfig {
            target_sample_rate: Some(0),
            ..Default::default()
        };
        assert!(matches!(zero_rate.validate(), Err(ConfigError::ZeroSampleRate)));

        let negative = PipelineConfig {
            selection: Selection::Elevation {
                target: 0.0,
                tolerance: -1.0,
            },
            ..Default::default()
        };
        assert!(matches!(negative.validate(), Err(ConfigError::BadTolerance(_))));

        assert!(matches!(
            PipelineConfig::default().plan(0, Some(256)),
            Err(ConfigError::ZeroSampleRate)
        ));
    }
}
