//! Joint peak normalization of a stereo impulse response pair.
//!
//! Both channels are divided by the same peak. Scaling each ear on its own
//! would flatten the interaural level difference, which is one of the cues
//! that places a source left or right.

use crate::component::{Component, StereoIr};

/// Scale `left` and `right` together so that the largest absolute sample
/// across both is 1. A silent pair is left as it is. Returns the peak that
/// was found before scaling.
pub fn normalize_pair(left: &mut [f32], right: &mut [f32]) -> f32 {
    let peak = left
        .iter()
        .chain(right.iter())
        .fold(0.0_f32, |acc, s| acc.max(s.abs()));

    if peak > 0.0 {
        left.iter_mut()
            .chain(right.iter_mut())
            .for_each(|s| *s /= peak);
    }

    peak
}

/// The normalization step as a pipeline stage.
#[derive(Debug, Default, Clone, Copy)]
pub struct Normalizer;

impl Component for Normalizer {
    type InData = StereoIr;
    type OutData = StereoIr;

    fn convert(&mut self, input: StereoIr) -> StereoIr {
        let (mut left, mut right) = input;
        normalize_pair(&mut left, &mut right);
        (left, right)
    }
}

impl ToString for Normalizer {
    fn to_string(&self) -> String {
        "Normalizer".to_string()
    }
}
