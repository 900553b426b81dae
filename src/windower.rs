//! Tapering and truncating impulse responses to a fixed length.
//!
//! Cutting an impulse response dead at sample `L` leaves a step that clicks
//! when convolved. The kept samples are multiplied by the rising half of a
//! Hann window twice their length. The leading samples, which carry most
//! of the localization cues, pass through close to unchanged.

use crate::component::{Component, StereoIr};
use std::f64::consts::PI;

/// First `len` points of a symmetric Hann window of length `2 * len`.
pub fn half_hann(len: usize) -> Vec<f32> {
    let full = 2 * len;
    if full <= 1 {
        return vec![1.0; len];
    }
    let denom = (full - 1) as f64;
    (0..len)
        .map(|n| (0.5 - 0.5 * (2.0 * PI * n as f64 / denom).cos()) as f32)
        .collect()
}

/// Window and truncate to a fixed length.
#[derive(Debug, Clone)]
pub struct Windower {
    window: Vec<f32>,
}

impl Windower {
    /// A windower producing `len` samples with the half Hann taper.
    pub fn new(len: usize) -> Self {
        Self {
            window: half_hann(len),
        }
    }

    /// A windower that only truncates.
    pub fn rectangular(len: usize) -> Self {
        Self {
            window: vec![1.0; len],
        }
    }

    /// Output length.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Whether this windower produces empty output.
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Apply the taper to the first [Windower::len] samples of `input` and
    /// drop the rest.
    ///
    /// # Panics
    ///
    /// If `input` is shorter than the output length. The pipeline validates
    /// lengths before any measurement is processed.
    pub fn apply(&self, input: &[f32]) -> Vec<f32> {
        assert!(
            input.len() >= self.window.len(),
            "cannot window {} samples down to {}",
            input.len(),
            self.window.len()
        );
        input
            .iter()
            .zip(&self.window)
            .map(|(s, w)| s * w)
            .collect()
    }
}

impl Component for Windower {
    type InData = StereoIr;
    type OutData = StereoIr;

    fn convert(&mut self, input: StereoIr) -> StereoIr {
        let (left, right) = input;
        (self.apply(&left), self.apply(&right))
    }
}

impl ToString for Windower {
    fn to_string(&self) -> String {
        format!("Windower({})", self.window.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_hann_shape() {
        let w = half_hann(128);
        assert_eq!(w.len(), 128);
        assert_eq!(w[0], 0.0);
        // Rising the whole way, and close to one at the end
        assert!(w.windows(2).all(|p| p[0] < p[1]));
        assert!(w[127] > 0.999);
        assert!(w[127] <= 1.0);
    }

    #[test]
    fn half_hann_matches_full_window() {
        // hanning(8) = 0.5 - 0.5 cos(2 pi n / 7)
        let w = half_hann(4);
        let expected = [0.0, 0.188_255_1, 0.611_260_5, 0.950_484_4];
        for (a, b) in w.iter().zip(expected) {
            assert!((a - b).abs() < 1e-6, "{} vs {}", a, b);
        }
    }

    #[test]
    fn output_length_is_exact() {
        let windower = Windower::new(16);
        assert_eq!(windower.apply(&[0.5; 16]).len(), 16);
        assert_eq!(windower.apply(&[0.5; 400]).len(), 16);
    }

    #[test]
    fn repeatable() {
        let windower = Windower::new(128);
        let input: Vec<f32> = (0..300).map(|n| ((n * 7919) % 113) as f32 / 113.0 - 0.5).collect();
        let a = windower.apply(&input);
        let b = Windower::new(128).apply(&input);
        let a_bits: Vec<u32> = a.iter().map(|s| s.to_bits()).collect();
        let b_bits: Vec<u32> = b.iter().map(|s| s.to_bits()).collect();
        assert_eq!(a_bits, b_bits);
    }

    #[test]
    fn silence_stays_silent() {
        let windower = Windower::new(64);
        let out = windower.apply(&[0.0; 100]);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn rectangular_only_truncates() {
        let windower = Windower::rectangular(3);
        assert_eq!(windower.apply(&[0.1, 0.2, 0.3, 0.4]), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    #[should_panic]
    fn short_input_panics() {
        Windower::new(8).apply(&[0.0; 4]);
    }

    #[test]
    fn never_grows_magnitude() {
        let windower = Windower::new(32);
        let out = windower.apply(&[1.0; 32]);
        assert!(out.iter().all(|s| (0.0..=1.0).contains(s)));
    }
}
