//! A wrapper for the hound library that stores a dataset as a directory of
//! stereo WAV files, one per measurement.
//!
//! Each file is named after its position, `az<AAA>_el<EEE>.wav`, with both
//! angles rounded to whole degrees and zero padded to three characters (so
//! `az045_el000.wav`, `az350_el-10.wav`). The left ear is channel 0 and the
//! right ear channel 1. File names carry no distance, so a fixed one is
//! assigned on load.

use crate::dataset::{DatasetError, DatasetSource, MeasurementSet};
use crate::hrir_format::HrirDatabase;
use crate::measurement::Measurement;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, warn};
use nom::{
    bytes::complete::tag,
    character::complete::i32,
    combinator::{all_consuming, map},
    sequence::{preceded, separated_pair, terminated},
    Finish, IResult,
};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

fn parse_position(s: &str) -> IResult<&str, (i32, i32)> {
    all_consuming(terminated(
        separated_pair(preceded(tag("az"), i32), tag("_"), preceded(tag("el"), i32)),
        tag(".wav"),
    ))(s)
}

/// Read `(azimuth, elevation)` back out of a file name.
pub fn position_from_file_name(name: &str) -> Option<(f32, f32)> {
    map(parse_position, |(az, el)| (az as f32, el as f32))(name)
        .finish()
        .ok()
        .map(|(_, pos)| pos)
}

/// The file name a measurement at this position is stored under. Angles are
/// rounded half to even, so 2.5 degrees is stored as `az002`.
pub fn file_name_for(azimuth: f32, elevation: f32) -> String {
    format!(
        "az{:03}_el{:03}.wav",
        azimuth.round_ties_even() as i32,
        elevation.round_ties_even() as i32
    )
}

/// A dataset loaded from a directory of `az<AAA>_el<EEE>.wav` files.
#[derive(Debug, Clone)]
pub struct WavDirectory {
    root: PathBuf,
    set: MeasurementSet,
}

impl WavDirectory {
    /// Load every `.wav` file in `root`, in file name order. All files must be
    /// stereo, share one sample rate, and have the same length. Every
    /// measurement is given `distance` meters.
    pub fn open(root: impl AsRef<Path>, distance: f32) -> Result<Self, DatasetError> {
        let root = root.as_ref().to_path_buf();
        let entries =
            fs::read_dir(&root).map_err(|e| DatasetError::IoError(root.clone(), e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| DatasetError::IoError(root.clone(), e))?
                .path();
            let is_wav = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("wav"))
                .unwrap_or(false);
            if is_wav {
                paths.push(path);
            } else {
                debug!("Skipping {}", path.display());
            }
        }
        paths.sort();

        let mut sample_rate = None;
        let mut measurements = Vec::with_capacity(paths.len());
        for path in &paths {
            let (rate, measurement) = read_measurement(path, distance)?;
            match sample_rate {
                None => sample_rate = Some(rate),
                Some(expected) if expected != rate => {
                    return Err(DatasetError::MixedSampleRates {
                        expected,
                        found: rate,
                    })
                }
                Some(_) => {}
            }
            measurements.push(measurement);
        }

        let sample_rate = sample_rate.ok_or_else(|| DatasetError::NoMeasurements(root.clone()))?;
        let set = MeasurementSet::new(sample_rate, measurements)?;

        Ok(Self { root, set })
    }

    /// The directory the dataset was read from.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DatasetSource for WavDirectory {
    fn sample_rate(&self) -> u32 {
        self.set.sample_rate()
    }

    fn measurements(&self) -> &[Measurement] {
        self.set.measurements()
    }
}

/// Read one stereo file into a measurement, returning its sample rate too.
fn read_measurement(path: &Path, distance: f32) -> Result<(u32, Measurement), DatasetError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| DatasetError::BadFileName(path.to_path_buf()))?;
    let (azimuth, elevation) = position_from_file_name(&name.to_ascii_lowercase())
        .ok_or_else(|| DatasetError::BadFileName(path.to_path_buf()))?;

    let hound_err = |e| DatasetError::HoundError(path.to_path_buf(), e);
    let mut reader = WavReader::open(path).map_err(hound_err)?;
    let spec = reader.spec();
    if spec.channels != 2 {
        return Err(DatasetError::NotStereo(path.to_path_buf(), spec.channels));
    }

    // collect wav file data into Vec of interleaved f32 samples
    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(hound_err)?,
        SampleFormat::Int => {
            let full_scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / full_scale))
                .collect::<Result<_, _>>()
                .map_err(hound_err)?
        }
    };

    let left: Vec<f32> = samples.iter().step_by(2).cloned().collect();
    let right: Vec<f32> = samples.iter().skip(1).step_by(2).cloned().collect();

    debug!(
        "{}: az={} el={} {} samples at {} Hz",
        path.display(),
        azimuth,
        elevation,
        left.len(),
        spec.sample_rate
    );

    Ok((
        spec.sample_rate,
        Measurement::new(azimuth, elevation, distance, left, right),
    ))
}

/// Write each measurement to `dir` as a 32-bit float stereo WAV file named
/// after its position, creating `dir` if needed. Returns the written paths.
///
/// Two measurements that round to the same position share a file name; the
/// later one wins and a warning is logged.
pub fn write_measurements(
    dir: impl AsRef<Path>,
    sample_rate: u32,
    measurements: &[Measurement],
) -> Result<Vec<PathBuf>, DatasetError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| DatasetError::IoError(dir.to_path_buf(), e))?;

    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut seen = HashSet::new();
    let mut written = Vec::with_capacity(measurements.len());
    for m in measurements {
        let path = dir.join(file_name_for(m.azimuth, m.elevation));
        if !seen.insert(path.clone()) {
            warn!("{} written more than once", path.display());
        }

        let hound_err = |e| DatasetError::HoundError(path.clone(), e);
        let mut writer = WavWriter::create(&path, spec).map_err(hound_err)?;

        // interleave the two streams and write the samples to the WAV file
        for (&left, &right) in std::iter::zip(&m.left, &m.right) {
            writer.write_sample(left).map_err(hound_err)?;
            writer.write_sample(right).map_err(hound_err)?;
        }
        writer.finalize().map_err(hound_err)?;

        written.push(path);
    }

    Ok(written)
}

/// Write every measurement of a database out as WAV files.
pub fn export_database(db: &HrirDatabase, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, DatasetError> {
    write_measurements(dir, db.sample_rate(), db.measurements())
}
