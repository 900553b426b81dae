//! This module provides an API to read and write [HrirDatabase]s, the flat
//! binary file that the playback device loads at startup. The files have the
//! following structure, with every multi-byte value little-endian:
//!
//! - A header of sixteen bytes:
//!   - The magic tag `HRIR` (four ASCII bytes)
//!   - The sample rate of the impulse responses, `u32`, in Hz
//!   - The number of samples per channel per measurement, `u32`
//!   - The number of measurements, `u32`
//! - Then, once per measurement and with no framing in between:
//!   - azimuth, elevation, and distance as three `f32`s
//!   - the left impulse response, `hrir_length` `f32`s
//!   - the right impulse response, `hrir_length` `f32`s
//!
//! There is no padding anywhere, so the size of a file is fully determined by
//! its header:
//!
//! ```text
//! 16 + measurement_count * (12 + 8 * hrir_length)
//! ```

use crate::measurement::Measurement;
use std::{
    borrow::Cow,
    fmt,
    fs::File,
    io::{self, BufReader, BufWriter, Cursor, Read, Write},
    path::Path,
};

/// The four bytes every database starts with.
pub const MAGIC: &[u8; 4] = b"HRIR";

/// Size of the fixed header, in bytes.
pub const HEADER_LEN: usize = 16;

/// A decoded (or about to be encoded) HRIR database.
///
/// The fields are private so that a database can only be constructed through
/// [HrirDatabase::new], which enforces that every channel of every
/// measurement has exactly `hrir_length` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct HrirDatabase {
    sample_rate: u32,
    hrir_length: u32,
    measurements: Vec<Measurement>,
}

/// Things that can go wrong while building, reading, or writing an
/// [HrirDatabase].
#[derive(Debug)]
pub enum HrirFormatError {
    /// The first four bytes were not `HRIR`.
    BadMagic([u8; 4]),

    /// The stream ended inside the fixed header.
    TruncatedHeader,

    /// The payload after the header is not exactly as long as the header
    /// says it should be. Covers both truncated files and trailing garbage.
    LengthMismatch {
        /// Bytes implied by the header
        expected: u64,
        /// Bytes actually present
        found: u64,
    },

    /// A measurement's channels do not match the database's `hrir_length`.
    UnequalIrLengths {
        /// Position of the offending measurement
        index: usize,
        /// Required length
        expected: usize,
        /// Length of the left channel
        left: usize,
        /// Length of the right channel
        right: usize,
    },

    /// A count or length does not fit in the header's `u32` fields, or the
    /// payload size it implies overflows.
    HeaderOverflow,

    /// Returned when io fails when reading or writing files.
    IoError(io::Error),
}

impl fmt::Display for HrirFormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use HrirFormatError as HFE;
        let msg = match self {
            HFE::BadMagic(found) => Cow::from(format!(
                "bad magic {:?}, expected \"HRIR\"",
                String::from_utf8_lossy(found)
            )),
            HFE::TruncatedHeader => Cow::from("file ends inside the header"),
            HFE::LengthMismatch { expected, found } => Cow::from(format!(
                "header declares {} payload bytes but {} are present",
                expected, found
            )),
            HFE::UnequalIrLengths {
                index,
                expected,
                left,
                right,
            } => Cow::from(format!(
                "measurement {} has left/right lengths {}/{}, expected {}",
                index, left, right, expected
            )),
            HFE::HeaderOverflow => Cow::from("value does not fit in a u32 header field"),
            HFE::IoError(error) => Cow::from(format!("io error: {}", error)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for HrirFormatError {}

impl From<io::Error> for HrirFormatError {
    fn from(value: io::Error) -> Self {
        Self::IoError(value)
    }
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Bytes taken by one measurement record.
fn record_len(hrir_length: u32) -> Option<u64> {
    (hrir_length as u64).checked_mul(8)?.checked_add(12)
}

impl HrirDatabase {
    /// Build a database, checking that every measurement carries exactly
    /// `hrir_length` samples per channel.
    pub fn new(
        sample_rate: u32,
        hrir_length: u32,
        measurements: Vec<Measurement>,
    ) -> Result<Self, HrirFormatError> {
        let expected = hrir_length as usize;
        if let Some((index, m)) = measurements
            .iter()
            .enumerate()
            .find(|(_, m)| m.left.len() != expected || m.right.len() != expected)
        {
            return Err(HrirFormatError::UnequalIrLengths {
                index,
                expected,
                left: m.left.len(),
                right: m.right.len(),
            });
        }

        u32::try_from(measurements.len()).map_err(|_| HrirFormatError::HeaderOverflow)?;

        Ok(Self {
            sample_rate,
            hrir_length,
            measurements,
        })
    }

    /// Sample rate of every impulse response, in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples per channel per measurement.
    pub fn hrir_length(&self) -> u32 {
        self.hrir_length
    }

    /// Number of measurements, as written in the header.
    pub fn measurement_count(&self) -> u32 {
        // Bounded by the check in `new`.
        self.measurements.len() as u32
    }

    /// The measurements, in file order.
    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    /// Consume the database, keeping only the measurements.
    pub fn into_measurements(self) -> Vec<Measurement> {
        self.measurements
    }

    /// Size of the encoded file, in bytes.
    pub fn encoded_len(&self) -> Option<u64> {
        record_len(self.hrir_length)?
            .checked_mul(self.measurements.len() as u64)?
            .checked_add(HEADER_LEN as u64)
    }

    /// The measurement whose azimuth is closest to `azimuth`, measured around
    /// the circle so that 359 and 1 degrees are two degrees apart. The first
    /// one wins a tie. Returns `None` for an empty database.
    pub fn nearest(&self, azimuth: f32) -> Option<&Measurement> {
        let circular = |a: f32| {
            let d = (a - azimuth).rem_euclid(360.0);
            d.min(360.0 - d)
        };

        self.measurements.iter().fold(None, |best, m| match best {
            Some(b) if circular(b.azimuth) <= circular(m.azimuth) => Some(b),
            _ => Some(m),
        })
    }

    /// Write out an [HrirDatabase] to the path provided.
    pub fn to_path(&self, path: impl AsRef<Path>) -> Result<(), HrirFormatError> {
        let handle = File::create(path)?;
        let mut writer = BufWriter::new(handle);
        self.to_file(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write out an [HrirDatabase] to the [Write]able object provided.
    pub fn to_file(&self, file: &mut impl Write) -> Result<(), HrirFormatError> {
        let len = self
            .encoded_len()
            .and_then(|l| usize::try_from(l).ok())
            .ok_or(HrirFormatError::HeaderOverflow)?;

        let mut buf = Vec::with_capacity(len);
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&self.sample_rate.to_le_bytes());
        buf.extend_from_slice(&self.hrir_length.to_le_bytes());
        buf.extend_from_slice(&self.measurement_count().to_le_bytes());

        for m in &self.measurements {
            buf.extend_from_slice(&m.azimuth.to_le_bytes());
            buf.extend_from_slice(&m.elevation.to_le_bytes());
            buf.extend_from_slice(&m.distance.to_le_bytes());
            buf.extend(m.left.iter().flat_map(|s| s.to_le_bytes()));
            buf.extend(m.right.iter().flat_map(|s| s.to_le_bytes()));
        }

        file.write_all(&buf)?;
        Ok(())
    }

    /// Encode into a fresh byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>, HrirFormatError> {
        let mut buf = Cursor::new(Vec::new());
        self.to_file(&mut buf)?;
        Ok(buf.into_inner())
    }

    /// Read an [HrirDatabase] from the path provided.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, HrirFormatError> {
        let handle = File::open(path)?;
        Self::from_file(&mut BufReader::new(handle))
    }

    /// Decode a complete database held in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HrirFormatError> {
        Self::from_file(&mut Cursor::new(bytes))
    }

    /// Read an [HrirDatabase] from the [Read]able object provided.
    ///
    /// The magic is checked before anything else is read. The payload must
    /// be exactly as long as the header implies; nothing is returned for a
    /// short or overlong stream.
    pub fn from_file(file: &mut impl Read) -> Result<Self, HrirFormatError> {
        let mut magic = [0u8; 4];
        read_header_bytes(file, &mut magic)?;
        if &magic != MAGIC {
            return Err(HrirFormatError::BadMagic(magic));
        }

        let mut header = [0u8; HEADER_LEN - 4];
        read_header_bytes(file, &mut header)?;
        let sample_rate = le_u32(&header, 0);
        let hrir_length = le_u32(&header, 4);
        let count = le_u32(&header, 8);

        let expected = record_len(hrir_length)
            .and_then(|r| r.checked_mul(count as u64))
            .ok_or(HrirFormatError::HeaderOverflow)?;

        let mut body = Vec::new();
        file.read_to_end(&mut body)?;
        if body.len() as u64 != expected {
            return Err(HrirFormatError::LengthMismatch {
                expected,
                found: body.len() as u64,
            });
        }

        let floats: Vec<f32> = body
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        let len = hrir_length as usize;
        let measurements = floats
            .chunks_exact(3 + 2 * len)
            .take(count as usize)
            .map(|rec| {
                let (pos, irs) = rec.split_at(3);
                let (left, right) = irs.split_at(len);
                Measurement::new(pos[0], pos[1], pos[2], left.to_vec(), right.to_vec())
            })
            .collect();

        Self::new(sample_rate, hrir_length, measurements)
    }
}

fn read_header_bytes(file: &mut impl Read, buf: &mut [u8]) -> Result<(), HrirFormatError> {
    file.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => HrirFormatError::TruncatedHeader,
        _ => HrirFormatError::IoError(e),
    })
}

#[cfg(test)]
const A_FLOAT: f32 = 0.078_431;
