//! The read-only view of a measurement dataset that the conversion pipeline
//! consumes, plus [MeasurementSet], the in-memory implementation every
//! adapter loads into.

use crate::measurement::Measurement;
use std::{borrow::Cow, fmt, io, path::PathBuf};

/// `DatasetSource`
///
/// A loaded collection of directional measurements sharing one sample rate
/// and one impulse response length. Any reader that can produce this is a
/// valid input to the pipeline.
pub trait DatasetSource {
    /// Sample rate of every impulse response, in Hz.
    fn sample_rate(&self) -> u32;

    /// All measurements, in source order.
    fn measurements(&self) -> &[Measurement];

    /// Samples per channel, or `None` for an empty dataset.
    fn ir_length(&self) -> Option<usize> {
        self.measurements().first().map(Measurement::len)
    }

    /// Number of measurements in the dataset.
    fn len(&self) -> usize {
        self.measurements().len()
    }

    /// Whether the dataset contains no measurements.
    fn is_empty(&self) -> bool {
        self.measurements().is_empty()
    }
}

/// Returned when a dataset cannot be loaded or does not hold together.
#[derive(Debug)]
pub enum DatasetError {
    /// A file or directory could not be read.
    IoError(PathBuf, io::Error),

    /// An audio file could not be decoded.
    HoundError(PathBuf, hound::Error),

    /// A file name does not encode a position.
    BadFileName(PathBuf),

    /// An impulse response file is not two-channel.
    NotStereo(PathBuf, u16),

    /// Files disagree on their sample rate.
    MixedSampleRates {
        /// Rate of the first file
        expected: u32,
        /// Rate of the offending file
        found: u32,
    },

    /// A measurement has a different length from the rest, or its channels
    /// differ from each other.
    UnequalLengths {
        /// Position of the offending measurement
        index: usize,
        /// Length every channel should have
        expected: usize,
    },

    /// The sample rate is zero.
    ZeroSampleRate,

    /// A directory holds no measurements, so there is no sample rate to
    /// report.
    NoMeasurements(PathBuf),
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use DatasetError as DE;
        let msg = match self {
            DE::IoError(path, error) => {
                Cow::from(format!("io error on {}: {}", path.display(), error))
            }
            DE::HoundError(path, error) => {
                Cow::from(format!("wav error on {}: {}", path.display(), error))
            }
            DE::BadFileName(path) => Cow::from(format!(
                "cannot read a position from file name {}",
                path.display()
            )),
            DE::NotStereo(path, channels) => Cow::from(format!(
                "{} has {} channels, expected 2",
                path.display(),
                channels
            )),
            DE::MixedSampleRates { expected, found } => Cow::from(format!(
                "mixed sample rates: {} Hz and {} Hz",
                expected, found
            )),
            DE::UnequalLengths { index, expected } => Cow::from(format!(
                "measurement {} does not have {} samples per channel",
                index, expected
            )),
            DE::ZeroSampleRate => Cow::from("sample rate is zero"),
            DE::NoMeasurements(path) => {
                Cow::from(format!("no measurements found in {}", path.display()))
            }
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for DatasetError {}

/// A dataset held entirely in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSet {
    sample_rate: u32,
    measurements: Vec<Measurement>,
}

impl MeasurementSet {
    /// Wrap a list of measurements, checking that the sample rate is
    /// non-zero and that every channel has the same length.
    pub fn new(sample_rate: u32, measurements: Vec<Measurement>) -> Result<Self, DatasetError> {
        if sample_rate == 0 {
            return Err(DatasetError::ZeroSampleRate);
        }

        if let Some(expected) = measurements.first().map(Measurement::len) {
            let bad = measurements
                .iter()
                .position(|m| m.left.len() != expected || m.right.len() != expected);
            if let Some(index) = bad {
                return Err(DatasetError::UnequalLengths { index, expected });
            }
        }

        Ok(Self {
            sample_rate,
            measurements,
        })
    }
}

impl DatasetSource for MeasurementSet {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }
}
