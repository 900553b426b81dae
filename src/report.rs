//! A plain text summary of an [HrirDatabase], for checking a conversion by
//! eye.
//!
//! ```text
//! Sample rate:  44100 Hz
//! HRIR length:  128 samples
//! Measurements: 2
//! Azimuth sorted: yes
//!
//!    #   azimuth  elevation  distance  peak L  peak R
//!    1      0.00       0.00      1.20  0.6667  1.0000
//!    2     10.00      -0.50      1.20  1.0000  0.5000
//! ```

use crate::{hrir_format::HrirDatabase, selector::is_azimuth_sorted};
use std::io::{self, Write};

fn channel_peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0, |acc: f32, s| acc.max(s.abs()))
}

fn write_samples(out: &mut impl Write, label: &str, samples: &[f32]) -> io::Result<()> {
    write!(out, "      {}:", label)?;
    for s in samples {
        write!(out, " {:.6}", s)?;
    }
    writeln!(out)
}

/// Write the header and one row per measurement to `out`. With
/// `include_samples`, every row is followed by both impulse responses.
pub fn write_report(
    db: &HrirDatabase,
    out: &mut impl Write,
    include_samples: bool,
) -> io::Result<()> {
    writeln!(out, "Sample rate:  {} Hz", db.sample_rate())?;
    writeln!(out, "HRIR length:  {} samples", db.hrir_length())?;
    writeln!(out, "Measurements: {}", db.measurement_count())?;
    writeln!(
        out,
        "Azimuth sorted: {}",
        if is_azimuth_sorted(db.measurements()) {
            "yes"
        } else {
            "no"
        }
    )?;

    if db.measurements().is_empty() {
        return Ok(());
    }

    writeln!(out)?;
    writeln!(
        out,
        "{:>4}  {:>8}  {:>9}  {:>8}  {:>6}  {:>6}",
        "#", "azimuth", "elevation", "distance", "peak L", "peak R"
    )?;
    for (i, m) in db.measurements().iter().enumerate() {
        writeln!(
            out,
            "{:>4}  {:>8.2}  {:>9.2}  {:>8.2}  {:>6.4}  {:>6.4}",
            i + 1,
            m.azimuth,
            m.elevation,
            m.distance,
            channel_peak(&m.left),
            channel_peak(&m.right)
        )?;
        if include_samples {
            write_samples(out, "left", &m.left)?;
            write_samples(out, "right", &m.right)?;
        }
    }

    Ok(())
}
