//! Generated datasets that stand in for measured ones.
//!
//! Each grid point gets a stereo pair of seeded, exponentially decaying noise
//! bursts, so tests and `hrirdb synth` can run without real measurements.

use crate::dataset::DatasetSource;
use crate::measurement::Measurement;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// A made-up dataset of decaying noise bursts on an azimuth / elevation
/// grid. Useful when no measured dataset is at hand.
///
/// Every impulse response starts after a short onset delay and decays
/// exponentially. The right ear is louder for sources on the right
/// (azimuth 90) and the left ear for sources on the left (azimuth 270), and
/// the far ear hears the burst a few samples later. The same seed always
/// gives the same dataset.
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    sample_rate: u32,
    measurements: Vec<Measurement>,
}

/// Settings for a [SyntheticDataset].
#[derive(Debug, Clone)]
pub struct SyntheticDatasetBuilder {
    sample_rate: u32,
    ir_length: usize,
    azimuth_step: f32,
    elevations: Vec<f32>,
    distance: f32,
    seed: u64,
}

impl Default for SyntheticDatasetBuilder {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            ir_length: 256,
            azimuth_step: 5.0,
            elevations: vec![-10.0, 0.0, 10.0],
            distance: 1.2,
            seed: 0,
        }
    }
}

impl SyntheticDatasetBuilder {
    /// Sample rate of the generated responses, in Hz.
    pub fn sample_rate(self, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..self
        }
    }

    /// Samples per channel.
    pub fn ir_length(self, ir_length: usize) -> Self {
        Self { ir_length, ..self }
    }

    /// Spacing of the azimuth grid, in degrees. Azimuths run from 0 up to but
    /// not including 360.
    pub fn azimuth_step(self, azimuth_step: f32) -> Self {
        Self {
            azimuth_step,
            ..self
        }
    }

    /// Elevation rings to generate, in degrees.
    pub fn elevations(self, elevations: &[f32]) -> Self {
        Self {
            elevations: elevations.to_vec(),
            ..self
        }
    }

    /// Distance recorded on every measurement, in meters.
    pub fn distance(self, distance: f32) -> Self {
        Self { distance, ..self }
    }

    /// Seed of the noise generator.
    pub fn seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    /// Generate the dataset, ring by ring and azimuth by azimuth.
    pub fn build(self) -> SyntheticDataset {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let step = if self.azimuth_step > 0.0 {
            self.azimuth_step
        } else {
            360.0
        };
        let n_azimuths = (360.0 / step).ceil() as usize;

        let measurements = self
            .elevations
            .iter()
            .flat_map(|&elevation| {
                (0..n_azimuths).map(move |i| (i as f32 * step, elevation))
            })
            .map(|(azimuth, elevation)| {
                let (left, right) = generate_pair(&mut rng, azimuth, self.ir_length);
                Measurement::new(azimuth, elevation, self.distance, left, right)
            })
            .collect();

        SyntheticDataset {
            sample_rate: self.sample_rate,
            measurements,
        }
    }
}

impl SyntheticDataset {
    /// Start from the default grid: 48 kHz, 256 samples, 5 degree azimuth
    /// steps on the -10, 0, and 10 degree rings.
    pub fn builder() -> SyntheticDatasetBuilder {
        SyntheticDatasetBuilder::default()
    }
}

impl DatasetSource for SyntheticDataset {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }
}

const ONSET: usize = 8;
const MAX_INTERAURAL_DELAY: f32 = 6.0;
const DECAY: f32 = 24.0;

fn generate_pair(rng: &mut StdRng, azimuth: f32, len: usize) -> (Vec<f32>, Vec<f32>) {
    let lateral = azimuth.to_radians().sin();
    let right_gain = 0.55 + 0.45 * lateral;
    let left_gain = 0.55 - 0.45 * lateral;
    let delay = (lateral.abs() * MAX_INTERAURAL_DELAY).round() as usize;
    let (left_onset, right_onset) = if lateral >= 0.0 {
        (ONSET + delay, ONSET)
    } else {
        (ONSET, ONSET + delay)
    };

    let mut burst = |gain: f32, onset: usize| -> Vec<f32> {
        (0..len)
            .map(|n| {
                if n < onset {
                    0.0
                } else {
                    let t = (n - onset) as f32;
                    gain * (-t / DECAY).exp() * rng.gen_range(-1.0f32..=1.0)
                }
            })
            .collect()
    };

    let left = burst(left_gain, left_onset);
    let right = burst(right_gain, right_onset);
    (left, right)
}
