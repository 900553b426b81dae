//! Build, inspect, and export HRIR databases.
//!
//! ```text
//! hrirdb build -s hrtf_nh2 -o hrtf_elev0.bin
//! hrirdb build --config nh2.ron --all -o hrtf_full.bin
//! hrirdb inspect hrtf_elev0.bin --nearest 45
//! hrirdb export-wav hrtf_elev0.bin -o hrtf_elev0_wav
//! hrirdb synth -o synthetic_hrtf
//! ```
//!
//! Set `RUST_LOG=info` (or `debug`) to follow the conversion.

use clap::Parser;
use hrirdb::{
    args::{HrirArgs, HrirCommand},
    config::PipelineConfig,
    dataset::DatasetSource,
    hrir_format::HrirDatabase,
    pipeline,
    report::write_report,
    synthetic::SyntheticDataset,
    wav_directory::{export_database, write_measurements},
};

use log::{error, info};
use std::{error::Error, io, process};

fn main() {
    env_logger::init();
    let args = HrirArgs::parse();

    if let Err(e) = run(args.command) {
        error!("{}", e);
        eprintln!("hrirdb: {}", e);
        process::exit(1);
    }
}

fn run(command: HrirCommand) -> Result<(), Box<dyn Error>> {
    match command {
        HrirCommand::Build(build) => {
            let config = match &build.config {
                Some(path) => PipelineConfig::from_path(path)?,
                None => PipelineConfig::default(),
            };
            let config = build.apply(config);

            let db = pipeline::run(&config)?;
            println!(
                "Wrote {} measurements of {} samples at {} Hz to {}",
                db.measurement_count(),
                db.hrir_length(),
                db.sample_rate(),
                config.output.display()
            );
        }

        HrirCommand::Inspect(inspect) => {
            let db = HrirDatabase::from_path(&inspect.file)?;
            let mut out = io::stdout().lock();
            write_report(&db, &mut out, inspect.samples)?;

            if let Some(azimuth) = inspect.nearest {
                match db.nearest(azimuth) {
                    Some(m) => println!(
                        "\nNearest to azimuth {}: az={:.2} el={:.2} dist={:.2}",
                        azimuth, m.azimuth, m.elevation, m.distance
                    ),
                    None => println!("\nNo measurement to match azimuth {}", azimuth),
                }
            }
        }

        HrirCommand::ExportWav(export) => {
            let db = HrirDatabase::from_path(&export.file)?;
            let written = export_database(&db, &export.out_dir)?;
            info!("Exported {} files", written.len());
            println!(
                "Wrote {} WAV files to {}",
                written.len(),
                export.out_dir.display()
            );
        }

        HrirCommand::Synth(synth) => {
            let dataset = SyntheticDataset::builder()
                .sample_rate(synth.rate)
                .ir_length(synth.length)
                .azimuth_step(synth.azimuth_step)
                .elevations(&synth.elevations)
                .seed(synth.seed)
                .build();
            let written =
                write_measurements(&synth.out_dir, dataset.sample_rate(), dataset.measurements())?;
            println!(
                "Wrote {} synthetic measurements to {}",
                written.len(),
                synth.out_dir.display()
            );
        }

        HrirCommand::Config => {
            println!("{}", PipelineConfig::default().to_ron()?);
        }
    }

    Ok(())
}
