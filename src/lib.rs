//! Tools for turning a measured head-related impulse response dataset into
//! the compact binary database a small playback device loads at boot, and
//! for talking to that device.
//!
//! The conversion is a straight line through the modules:
//!
//! 1. a [dataset::DatasetSource] is loaded, usually a
//!    [wav_directory::WavDirectory];
//! 2. [selector::select_elevation] keeps one elevation ring, sorted by
//!    azimuth;
//! 3. each stereo pair goes through [resampler::PolyphaseResampler],
//!    [normalizer::Normalizer] and [windower::Windower];
//! 4. [hrir_format::HrirDatabase] lays the result out as little-endian bytes.
//!
//! [pipeline::run] does all of that from a [config::PipelineConfig].
//!
//! The device side lives in [protocol] (the line protocol) and [link] (the
//! serial transport and the accumulated [link::DeviceState]).

#![warn(missing_docs)]
pub mod args;
pub mod component;
pub mod config;
pub mod dataset;
pub mod gui;
pub mod hrir_format;
pub mod link;
pub mod measurement;
pub mod normalizer;
pub mod pipeline;
pub mod protocol;
pub mod report;
pub mod resampler;
pub mod selector;
pub mod synthetic;
pub mod wav_directory;
pub mod windower;
