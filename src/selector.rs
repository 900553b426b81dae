//! Restricting a dataset to one elevation band.
//!
//! Keeping a single ring of measurements trades vertical accuracy for a
//! database small enough to sit in the playback device's memory.

use crate::measurement::Measurement;

/// Keep the measurements whose elevation is within `tolerance` degrees of
/// `target` (inclusive), ordered by ascending azimuth. Measurements with
/// equal azimuth stay in source order.
pub fn select_elevation(
    measurements: &[Measurement],
    target: f32,
    tolerance: f32,
) -> Vec<&Measurement> {
    let mut selected: Vec<&Measurement> = measurements
        .iter()
        .filter(|m| (m.elevation - target).abs() <= tolerance)
        .collect();

    // `sort_by` is stable, which is what keeps azimuth ties in source order
    selected.sort_by(|a, b| a.azimuth.total_cmp(&b.azimuth));
    selected
}

/// True when the azimuths never decrease.
pub fn is_azimuth_sorted<'a>(measurements: impl IntoIterator<Item = &'a Measurement>) -> bool {
    let azimuths: Vec<f32> = measurements.into_iter().map(|m| m.azimuth).collect();
    azimuths.windows(2).all(|w| w[0] <= w[1])
}
