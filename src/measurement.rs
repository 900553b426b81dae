//! The [Measurement] record shared by every stage, from the dataset adapters
//! through to the on-disk database.

/// One directional stereo impulse response pair.
///
/// Angles are in degrees and the distance is in meters. The two channels
/// always have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Horizontal angle of the source, in degrees
    pub azimuth: f32,
    /// Vertical angle of the source, in degrees
    pub elevation: f32,
    /// Distance from the listener to the source, in meters
    pub distance: f32,
    /// Left ear impulse response
    pub left: Vec<f32>,
    /// Right ear impulse response
    pub right: Vec<f32>,
}

impl Measurement {
    /// Bundle a position and a pair of impulse responses.
    pub fn new(azimuth: f32, elevation: f32, distance: f32, left: Vec<f32>, right: Vec<f32>) -> Self {
        Self {
            azimuth,
            elevation,
            distance,
            left,
            right,
        }
    }

    /// Length of the left channel. Callers that need the invariant checked
    /// should use [Measurement::has_uniform_channels].
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// Whether the measurement holds no samples at all.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }

    /// True when both channels are the same length.
    pub fn has_uniform_channels(&self) -> bool {
        self.left.len() == self.right.len()
    }

    /// Largest absolute sample across both channels, `0.0` for silence.
    pub fn peak(&self) -> f32 {
        self.left
            .iter()
            .chain(self.right.iter())
            .fold(0.0_f32, |acc, s| acc.max(s.abs()))
    }

    /// Replace the impulse responses while keeping the position.
    pub fn with_channels(&self, left: Vec<f32>, right: Vec<f32>) -> Self {
        Self {
            left,
            right,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_spans_both_channels() {
        let m = Measurement::new(0.0, 0.0, 1.0, vec![0.1, -0.4], vec![0.3, -0.9]);
        assert_eq!(m.peak(), 0.9);
    }

    #[test]
    fn peak_of_silence_is_zero() {
        let m = Measurement::new(0.0, 0.0, 1.0, vec![0.0; 8], vec![0.0; 8]);
        assert_eq!(m.peak(), 0.0);
    }

    #[test]
    fn with_channels_keeps_position() {
        let m = Measurement::new(30.0, -10.0, 1.2, vec![1.0], vec![1.0]);
        let swapped = m.with_channels(vec![0.5, 0.5], vec![0.25, 0.25]);
        assert_eq!(swapped.azimuth, 30.0);
        assert_eq!(swapped.elevation, -10.0);
        assert_eq!(swapped.distance, 1.2);
        assert_eq!(swapped.len(), 2);
        assert!(swapped.has_uniform_channels());
    }
}
