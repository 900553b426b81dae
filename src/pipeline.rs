//! The offline conversion from a measurement dataset to an [HrirDatabase].
//!
//! [build_database] is a pure function of a loaded dataset and a
//! [PipelineConfig]. [run] wraps it with the file handling: load the source
//! directory, convert, and only then create the output file.
//!
//! Every measurement goes through the same [StageChain] on its own, in
//! selection order, so the written order is exactly the selection order.

use crate::{
    component::{StageChain, StereoStage},
    config::{ConfigError, PipelineConfig, ProcessingPlan, Selection},
    dataset::{DatasetError, DatasetSource},
    hrir_format::{HrirDatabase, HrirFormatError},
    measurement::Measurement,
    normalizer::Normalizer,
    resampler::PolyphaseResampler,
    selector::select_elevation,
    wav_directory::WavDirectory,
    windower::Windower,
};
use log::{debug, info, warn};
use std::{borrow::Cow, fmt};

/// Anything that can stop a conversion run.
#[derive(Debug)]
pub enum PipelineError {
    /// The configuration does not work for this dataset.
    Config(ConfigError),
    /// The dataset could not be loaded.
    Dataset(DatasetError),
    /// The database could not be built or written.
    Format(HrirFormatError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            PipelineError::Config(e) => Cow::from(format!("configuration error: {}", e)),
            PipelineError::Dataset(e) => Cow::from(format!("dataset error: {}", e)),
            PipelineError::Format(e) => Cow::from(format!("format error: {}", e)),
        };
        write!(f, "{}", msg)
    }
}

impl std::error::Error for PipelineError {}

impl From<ConfigError> for PipelineError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DatasetError> for PipelineError {
    fn from(value: DatasetError) -> Self {
        Self::Dataset(value)
    }
}

impl From<HrirFormatError> for PipelineError {
    fn from(value: HrirFormatError) -> Self {
        Self::Format(value)
    }
}

/// Pick the measurements the config asks for, in the order they will be
/// written.
fn select<D>(dataset: &D, selection: Selection) -> Vec<&Measurement>
where
    D: DatasetSource + ?Sized,
{
    match selection {
        Selection::Elevation { target, tolerance } => {
            select_elevation(dataset.measurements(), target, tolerance)
        }
        Selection::All => dataset.measurements().iter().collect(),
    }
}

/// The per-measurement stages for a plan.
fn stage_chain(plan: &ProcessingPlan, config: &PipelineConfig) -> StageChain {
    let trim = plan.trim_length as usize;
    let resampler: StereoStage = Box::new(PolyphaseResampler::new(plan.ratio));
    let windower: StereoStage = if config.taper {
        Box::new(Windower::new(trim))
    } else {
        Box::new(Windower::rectangular(trim))
    };

    let chain = StageChain::new().then(resampler);
    let chain = if config.normalize {
        chain.then(Box::new(Normalizer))
    } else {
        chain
    };
    chain.then(windower)
}

/// Every channel of every measurement must be as long as the first one.
/// [DatasetSource] does not promise this, so it is checked here rather than
/// left to trip the windower halfway through.
fn check_uniform_lengths<D>(dataset: &D) -> Result<(), DatasetError>
where
    D: DatasetSource + ?Sized,
{
    let Some(expected) = dataset.ir_length() else {
        return Ok(());
    };
    let bad = dataset
        .measurements()
        .iter()
        .position(|m| m.left.len() != expected || m.right.len() != expected);
    match bad {
        Some(index) => Err(DatasetError::UnequalLengths { index, expected }),
        None => Ok(()),
    }
}

/// Turn a loaded dataset into a database, following `config`.
///
/// Nothing is read or written here; all checks happen before the first
/// measurement is processed.
pub fn build_database<D>(dataset: &D, config: &PipelineConfig) -> Result<HrirDatabase, PipelineError>
where
    D: DatasetSource + ?Sized,
{
    check_uniform_lengths(dataset)?;
    let plan = config.plan(dataset.sample_rate(), dataset.ir_length())?;

    let selected = select(dataset, config.selection);
    if selected.is_empty() {
        match config.selection {
            Selection::Elevation { target, tolerance } => {
                if config.require_nonempty {
                    return Err(ConfigError::EmptySelection { target, tolerance }.into());
                }
                warn!(
                    "No measurement within {} degrees of elevation {}, writing an empty database",
                    tolerance, target
                );
            }
            Selection::All => {
                if config.require_nonempty {
                    return Err(ConfigError::EmptyDataset.into());
                }
                warn!("The dataset is empty, writing an empty database");
            }
        }
    }

    let mut chain = stage_chain(&plan, config);
    info!(
        "Processing {} of {} measurements: {} Hz -> {} Hz, {} samples, stages {:?}",
        selected.len(),
        dataset.len(),
        dataset.sample_rate(),
        plan.output_rate,
        plan.trim_length,
        chain.names()
    );

    let measurements: Vec<Measurement> = selected
        .into_iter()
        .map(|m| {
            let (left, right) = chain.process((m.left.clone(), m.right.clone()));
            debug!(
                "az={:.1} el={:.1} dist={:.2}: peak in {:.4}",
                m.azimuth,
                m.elevation,
                m.distance,
                m.peak()
            );
            m.with_channels(left, right)
        })
        .collect();

    Ok(HrirDatabase::new(
        plan.output_rate,
        plan.trim_length,
        measurements,
    )?)
}

/// Load the dataset named by `config.source`, convert it, and write the
/// database to `config.output`. Returns the database that was written.
pub fn run(config: &PipelineConfig) -> Result<HrirDatabase, PipelineError> {
    config.validate()?;

    let dataset = WavDirectory::open(&config.source, config.default_distance)?;
    info!(
        "Loaded {} measurements at {} Hz from {}",
        dataset.len(),
        dataset.sample_rate(),
        config.source.display()
    );

    let db = build_database(&dataset, config)?;
    db.to_path(&config.output)?;
    info!(
        "Wrote {} measurements to {}",
        db.measurement_count(),
        config.output.display()
    );

    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dataset::MeasurementSet, selector::is_azimuth_sorted, synthetic::SyntheticDataset};

    fn scenario_set() -> MeasurementSet {
        let ir = |scale: f32| -> Vec<f32> { (0..256).map(|n| scale * (-(n as f32) / 20.0).exp()).collect() };
        MeasurementSet::new(
            48000,
            vec![
                Measurement::new(10.0, -0.5, 1.2, ir(0.8), ir(0.4)),
                Measurement::new(350.0, 5.0, 1.2, ir(0.8), ir(0.4)),
                Measurement::new(0.0, 0.0, 1.2, ir(2.0), ir(3.0)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn elevation_scenario() {
        let db = build_database(&scenario_set(), &PipelineConfig::default()).unwrap();

        assert_eq!(db.sample_rate(), 44100);
        assert_eq!(db.hrir_length(), 128);
        assert_eq!(db.measurement_count(), 2);
        let positions: Vec<(f32, f32)> = db
            .measurements()
            .iter()
            .map(|m| (m.elevation, m.azimuth))
            .collect();
        assert_eq!(positions, vec![(0.0, 0.0), (-0.5, 10.0)]);
    }

    #[test]
    fn every_sample_is_bounded_and_sized() {
        let dataset = SyntheticDataset::builder()
            .sample_rate(48000)
            .ir_length(256)
            .azimuth_step(15.0)
            .elevations(&[-10.0, 0.0, 10.0])
            .seed(3)
            .build();
        let db = build_database(&dataset, &PipelineConfig::default()).unwrap();

        assert_eq!(db.measurement_count(), 24);
        assert!(is_azimuth_sorted(db.measurements()));
        for m in db.measurements() {
            assert_eq!(m.left.len(), 128);
            assert_eq!(m.right.len(), 128);
            assert!(m.peak() <= 1.0 + 1e-6);
            assert_eq!(m.elevation, 0.0);
        }
    }

    #[test]
    fn encodes_and_decodes() {
        let dataset = SyntheticDataset::builder().seed(11).build();
        let db = build_database(&dataset, &PipelineConfig::default()).unwrap();
        let read_back = HrirDatabase::from_bytes(&db.to_bytes().unwrap()).unwrap();
        assert_eq!(db, read_back);
    }

    #[test]
    fn silent_measurement_survives() {
        let dataset = MeasurementSet::new(
            44100,
            vec![Measurement::new(0.0, 0.0, 1.0, vec![0.0; 200], vec![0.0; 200])],
        )
        .unwrap();
        let db = build_database(&dataset, &PipelineConfig::default()).unwrap();
        let m = &db.measurements()[0];
        assert!(m.left.iter().chain(m.right.iter()).all(|&s| s == 0.0));
    }

    #[test]
    fn empty_selection_writes_empty_database() {
        let config = PipelineConfig {
            selection: Selection::Elevation {
                target: 80.0,
                tolerance: 1.0,
            },
            ..Default::default()
        };
        let db = build_database(&scenario_set(), &config).unwrap();
        assert_eq!(db.measurement_count(), 0);
        assert_eq!(db.to_bytes().unwrap().len(), 16);
    }

    #[test]
    fn empty_selection_can_be_required_away() {
        let config = PipelineConfig {
            selection: Selection::Elevation {
                target: 80.0,
                tolerance: 1.0,
            },
            require_nonempty: true,
            ..Default::default()
        };
        assert!(matches!(
            build_database(&scenario_set(), &config),
            Err(PipelineError::Config(ConfigError::EmptySelection { .. }))
        ));
    }

    /// A source that skips the length checks of [MeasurementSet].
    struct RaggedSource {
        measurements: Vec<Measurement>,
    }

    impl DatasetSource for RaggedSource {
        fn sample_rate(&self) -> u32 {
            48000
        }

        fn measurements(&self) -> &[Measurement] {
            &self.measurements
        }
    }

    #[test]
    fn ragged_source_is_an_error() {
        let ragged = RaggedSource {
            measurements: vec![
                Measurement::new(0.0, 0.0, 1.2, vec![0.5; 200], vec![0.5; 200]),
                Measurement::new(5.0, 0.0, 1.2, vec![0.5; 100], vec![0.5; 100]),
            ],
        };
        assert!(matches!(
            build_database(&ragged, &PipelineConfig::default()),
            Err(PipelineError::Dataset(DatasetError::UnequalLengths {
                index: 1,
                expected: 200
            }))
        ));

        let one_sided = RaggedSource {
            measurements: vec![Measurement::new(0.0, 0.0, 1.2, vec![0.5; 200], vec![0.5; 150])],
        };
        assert!(matches!(
            build_database(&one_sided, &PipelineConfig::default()),
            Err(PipelineError::Dataset(DatasetError::UnequalLengths { index: 0, .. }))
        ));
    }

    #[test]
    fn empty_dataset_can_be_required_away() {
        let empty = MeasurementSet::new(48000, vec![]).unwrap();
        let config = PipelineConfig {
            selection: Selection::All,
            require_nonempty: true,
            ..Default::default()
        };
        assert!(matches!(
            build_database(&empty, &config),
            Err(PipelineError::Config(ConfigError::EmptyDataset))
        ));

        let lenient = PipelineConfig {
            require_nonempty: false,
            ..config
        };
        assert_eq!(build_database(&empty, &lenient).unwrap().measurement_count(), 0);
    }

    #[test]
    fn trim_too_long_fails_before_processing() {
        let config = PipelineConfig {
            trim_length: 1024,
            ..Default::default()
        };
        assert!(matches!(
            build_database(&scenario_set(), &config),
            Err(PipelineError::Config(ConfigError::TrimExceedsSamples { .. }))
        ));
    }

    #[test]
    fn full_export_keeps_source_order() {
        let config = PipelineConfig {
            selection: Selection::All,
            target_sample_rate: None,
            normalize: false,
            taper: false,
            trim_length: 100,
            ..Default::default()
        };
        let source = scenario_set();
        let db = build_database(&source, &config).unwrap();

        assert_eq!(db.sample_rate(), 48000);
        let azimuths: Vec<f32> = db.measurements().iter().map(|m| m.azimuth).collect();
        assert_eq!(azimuths, vec![10.0, 350.0, 0.0]);
        // Plain truncation, untouched samples
        assert_eq!(db.measurements()[2].left[..], source.measurements()[2].left[..100]);
    }

    #[test]
    fn repeatable_output() {
        let dataset = SyntheticDataset::builder().seed(5).build();
        let a = build_database(&dataset, &PipelineConfig::default()).unwrap();
        let b = build_database(&dataset, &PipelineConfig::default()).unwrap();
        assert_eq!(a.to_bytes().unwrap(), b.to_bytes().unwrap());
    }

    #[test]
    fn run_reads_and_writes_files() {
        let source = tempfile::tempdir().unwrap();
        let dataset = SyntheticDataset::builder().azimuth_step(30.0).seed(9).build();
        crate::wav_directory::write_measurements(
            source.path(),
            dataset.sample_rate(),
            dataset.measurements(),
        )
        .unwrap();

        let out = tempfile::NamedTempFile::new().unwrap();
        let config = PipelineConfig {
            source: source.path().to_path_buf(),
            output: out.path().to_path_buf(),
            ..Default::default()
        };

        let written = run(&config).unwrap();
        assert_eq!(written.measurement_count(), 12);
        assert_eq!(HrirDatabase::from_path(out.path()).unwrap(), written);
    }

    #[test]
    fn run_with_missing_source() {
        let config = PipelineConfig {
            source: "/definitely/not/a/dataset".into(),
            ..Default::default()
        };
        assert!(matches!(run(&config), Err(PipelineError::Dataset(_))));
    }
}
