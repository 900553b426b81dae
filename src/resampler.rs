//! Rational sample rate conversion for impulse responses.
//!
//! The conversion is the textbook upsample / low-pass / downsample chain,
//! computed in polyphase form: the input is never actually stuffed with
//! zeros, each output sample only visits the filter taps that line up with
//! real input samples.
//!
//! The low-pass is a Kaiser windowed sinc (beta 5) with ten zero crossings
//! on either side per unit of the larger rate factor, scaled by `up` so that
//! the gain through every polyphase branch is one. Output is aligned to the
//! centre of the filter, so sample 0 of the output sits on sample 0 of the
//! input and the conversion adds no delay.

use crate::component::{Component, StereoIr};
use crate::config::ConfigError;
use std::f64::consts::PI;

const KAISER_BETA: f64 = 5.0;
const HALF_LEN_FACTOR: usize = 10;

/// A reduced `up / down` rate conversion factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ratio {
    up: u32,
    down: u32,
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl Ratio {
    /// A conversion that multiplies the rate by `up / down`. Both must be
    /// non-zero. The ratio is stored in lowest terms.
    pub fn new(up: u32, down: u32) -> Result<Self, ConfigError> {
        if up == 0 || down == 0 {
            return Err(ConfigError::InvalidRatio { up, down });
        }
        let g = gcd(up, down);
        Ok(Self {
            up: up / g,
            down: down / g,
        })
    }

    /// The conversion that takes `source` Hz to `target` Hz.
    pub fn from_rates(source: u32, target: u32) -> Result<Self, ConfigError> {
        if source == 0 || target == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        Self::new(target, source)
    }

    /// Interpolation factor.
    pub fn up(&self) -> u32 {
        self.up
    }

    /// Decimation factor.
    pub fn down(&self) -> u32 {
        self.down
    }

    /// True for `1 / 1`.
    pub fn is_identity(&self) -> bool {
        self.up == self.down
    }

    /// Number of samples produced from `input_len` samples, rounded up.
    pub fn output_len(&self, input_len: usize) -> usize {
        let n = input_len as u64 * self.up as u64;
        let down = self.down as u64;
        (n / down + u64::from(n % down != 0)) as usize
    }
}

/// Zeroth order modified Bessel function of the first kind, by its power
/// series. Converges quickly for the arguments a Kaiser window needs.
fn bessel_i0(x: f64) -> f64 {
    let half = x / 2.0;
    let mut term = 1.0;
    let mut sum = 1.0;
    let mut k = 1.0;
    while term > sum * 1e-16 {
        term *= (half / k) * (half / k);
        sum += term;
        k += 1.0;
    }
    sum
}

fn kaiser(n: usize, len: usize, beta: f64) -> f64 {
    if len == 1 {
        return 1.0;
    }
    let r = 2.0 * n as f64 / (len - 1) as f64 - 1.0;
    bessel_i0(beta * (1.0 - r * r).max(0.0).sqrt()) / bessel_i0(beta)
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

/// Design the anti-aliasing low-pass for a ratio. The taps sum to `up`.
fn design_filter(ratio: Ratio) -> Vec<f64> {
    let max_rate = ratio.up.max(ratio.down) as usize;
    let half_len = HALF_LEN_FACTOR * max_rate;
    let len = 2 * half_len + 1;
    let cutoff = 1.0 / max_rate as f64;

    let mut taps: Vec<f64> = (0..len)
        .map(|n| {
            let m = n as f64 - half_len as f64;
            cutoff * sinc(cutoff * m) * kaiser(n, len, KAISER_BETA)
        })
        .collect();

    let dc: f64 = taps.iter().sum();
    let scale = ratio.up as f64 / dc;
    taps.iter_mut().for_each(|t| *t *= scale);
    taps
}

/// Converts impulse responses by a fixed [Ratio].
///
/// The filter is designed once, so one resampler can be reused for every
/// measurement of a dataset. It keeps no state between calls.
#[derive(Debug, Clone)]
pub struct PolyphaseResampler {
    ratio: Ratio,
    taps: Vec<f64>,
}

impl PolyphaseResampler {
    /// Design the filter for `ratio`.
    pub fn new(ratio: Ratio) -> Self {
        let taps = if ratio.is_identity() {
            Vec::new()
        } else {
            design_filter(ratio)
        };
        Self { ratio, taps }
    }

    /// The conversion this resampler performs.
    pub fn ratio(&self) -> Ratio {
        self.ratio
    }

    /// Resample one channel.
    pub fn process(&self, input: &[f32]) -> Vec<f32> {
        if self.ratio.is_identity() {
            return input.to_vec();
        }

        let up = self.ratio.up as i64;
        let down = self.ratio.down as i64;
        let half_len = (self.taps.len() / 2) as i64;
        let last = input.len() as i64 - 1;

        (0..self.ratio.output_len(input.len()) as i64)
            .map(|n| {
                // Position of this output sample on the upsampled grid, shifted
                // by the filter's group delay.
                let t = n * down + half_len;
                let first = (t - 2 * half_len + up - 1).div_euclid(up).max(0);
                let end = t.div_euclid(up).min(last);

                (first..=end)
                    .map(|i| input[i as usize] as f64 * self.taps[(t - i * up) as usize])
                    .sum::<f64>() as f32
            })
            .collect()
    }
}

impl Component for PolyphaseResampler {
    type InData = StereoIr;
    type OutData = StereoIr;

    fn convert(&mut self, input: StereoIr) -> StereoIr {
        let (left, right) = input;
        (self.process(&left), self.process(&right))
    }
}

impl ToString for PolyphaseResampler {
    fn to_string(&self) -> String {
        format!("PolyphaseResampler({}/{})", self.ratio.up, self.ratio.down)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_reduces() {
        let r = Ratio::from_rates(48000, 44100).unwrap();
        assert_eq!((r.up(), r.down()), (147, 160));
        assert!(Ratio::new(3, 3).unwrap().is_identity());
    }

    #[test]
    fn zero_ratio_is_rejected() {
        assert!(matches!(
            Ratio::new(0, 2),
            Err(ConfigError::InvalidRatio { up: 0, down: 2 })
        ));
        assert!(matches!(
            Ratio::new(2, 0),
            Err(ConfigError::InvalidRatio { .. })
        ));
        assert!(matches!(
            Ratio::from_rates(0, 44100),
            Err(ConfigError::ZeroSampleRate)
        ));
    }

    #[test]
    fn output_len_rounds_up() {
        let r = Ratio::from_rates(48000, 44100).unwrap();
        assert_eq!(r.output_len(256), 236);
        assert_eq!(r.output_len(160), 147);
        assert_eq!(r.output_len(0), 0);
        assert_eq!(Ratio::new(2, 1).unwrap().output_len(5), 10);
        assert_eq!(Ratio::new(1, 2).unwrap().output_len(5), 3);
    }

    #[test]
    fn filter_taps_sum_to_up() {
        let ratio = Ratio::new(3, 2).unwrap();
        let taps = design_filter(ratio);
        assert_eq!(taps.len(), 2 * 10 * 3 + 1);
        let sum: f64 = taps.iter().sum();
        assert!((sum - 3.0).abs() < 1e-9);
        // Symmetric, peak in the middle
        for i in 0..taps.len() / 2 {
            assert!((taps[i] - taps[taps.len() - 1 - i]).abs() < 1e-12);
        }
    }

    #[test]
    fn bessel_reference_values() {
        assert!((bessel_i0(0.0) - 1.0).abs() < 1e-12);
        assert!((bessel_i0(1.0) - 1.266_065_877_752_008_4).abs() < 1e-12);
        assert!((bessel_i0(5.0) - 27.239_871_823_604_45).abs() < 1e-9);
    }

    #[test]
    fn identity_is_a_copy() {
        let resampler = PolyphaseResampler::new(Ratio::new(1, 1).unwrap());
        let input = vec![0.5, -0.25, 1.0];
        assert_eq!(resampler.process(&input), input);
    }

    #[test]
    fn preserves_dc_level() {
        let resampler = PolyphaseResampler::new(Ratio::from_rates(48000, 44100).unwrap());
        let input = vec![0.5f32; 4000];
        let output = resampler.process(&input);
        assert_eq!(output.len(), Ratio::from_rates(48000, 44100).unwrap().output_len(4000));
        // Away from both edges the filter sees a constant
        for &s in &output[1000..2500] {
            assert!((s - 0.5).abs() < 1e-3, "sample {} drifted from 0.5", s);
        }
    }

    #[test]
    fn doubling_keeps_original_samples_of_a_slow_sine() {
        let resampler = PolyphaseResampler::new(Ratio::new(2, 1).unwrap());
        let input: Vec<f32> = (0..400)
            .map(|n| (2.0 * std::f32::consts::PI * n as f32 / 40.0).sin())
            .collect();
        let output = resampler.process(&input);
        assert_eq!(output.len(), 800);
        for n in 50..350 {
            assert!((output[2 * n] - input[n]).abs() < 1e-2);
            let expected = (2.0 * std::f32::consts::PI * (n as f32 + 0.5) / 40.0).sin();
            assert!((output[2 * n + 1] - expected).abs() < 1e-2);
        }
    }

    #[test]
    fn suppresses_content_above_new_nyquist() {
        // A tone at 0.45 of the source rate cannot survive a 2:1 decimation.
        let resampler = PolyphaseResampler::new(Ratio::new(1, 2).unwrap());
        let input: Vec<f32> = (0..2000)
            .map(|n| (2.0 * std::f32::consts::PI * 0.45 * n as f32).sin())
            .collect();
        let output = resampler.process(&input);
        let peak = output[100..900].iter().fold(0.0f32, |a, s| a.max(s.abs()));
        assert!(peak < 0.05, "aliased tone leaked with peak {}", peak);
    }

    #[test]
    fn impulse_keeps_its_position() {
        let resampler = PolyphaseResampler::new(Ratio::new(2, 1).unwrap());
        let mut input = vec![0.0f32; 64];
        input[20] = 1.0;
        let output = resampler.process(&input);
        let argmax = output
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) })
            .0;
        assert_eq!(argmax, 40);
    }

    #[test]
    fn stereo_component_is_per_channel() {
        let mut resampler = PolyphaseResampler::new(Ratio::new(1, 2).unwrap());
        let left = vec![1.0f32; 100];
        let right = vec![0.0f32; 100];
        let (l, r) = resampler.convert((left.clone(), right));
        assert_eq!(l, resampler.process(&left));
        assert!(r.iter().all(|&s| s == 0.0));
        assert_eq!(l.len(), 50);
    }

    #[test]
    fn empty_input() {
        let resampler = PolyphaseResampler::new(Ratio::new(147, 160).unwrap());
        assert!(resampler.process(&[]).is_empty());
    }
}
