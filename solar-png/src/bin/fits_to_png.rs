//! Convert SDO AIA/HMI FITS files into TRAIN/TEST PNG datasets.
//!
//! Reads `<fits-root>/AIA/*.fits` and `<fits-root>/HMI/*.fits`, crops every
//! image to the same ±1000" field defined on the first HMI file, and writes
//! `<data-root>/{TRAIN,TEST}/<name>/*.png`.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use solar_png::config::{
    ClipRange, DatasetConfig, Modality, FULL_DISK_HALF_WIDTH_ARCSEC, OUTPUT_SIZE,
};
use solar_png::run_dataset;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModalityArg {
    Aia,
    Hmi,
    Both,
}

impl ModalityArg {
    fn modalities(self) -> Vec<Modality> {
        match self {
            ModalityArg::Aia => vec![Modality::Aia],
            ModalityArg::Hmi => vec![Modality::Hmi],
            ModalityArg::Both => vec![Modality::Aia, Modality::Hmi],
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Convert SDO FITS science files into PNG training datasets"
)]
struct Args {
    #[arg(
        long,
        default_value_t = 0,
        allow_negative_numbers = true,
        help = "lower bound cutoff pixel value for AIA"
    )]
    min: i64,

    #[arg(
        long,
        default_value_t = 150,
        allow_negative_numbers = true,
        help = "upper bound cutoff pixel value for AIA"
    )]
    max: i64,

    #[arg(long, help = "randomly assign upper bound pixel value for AIA")]
    random: bool,

    #[arg(long, default_value = "AIA", help = "name of folder for AIA to be saved in")]
    name: String,

    #[arg(long, value_enum, default_value_t = ModalityArg::Aia, help = "Instrument(s) to convert")]
    modality: ModalityArg,

    #[arg(long, default_value = "FITS_DATA", help = "Directory holding AIA/ and HMI/ FITS folders")]
    fits_root: PathBuf,

    #[arg(long, default_value = "DATA", help = "Directory receiving TRAIN/ and TEST/")]
    data_root: PathBuf,

    #[arg(long, default_value_t = OUTPUT_SIZE, help = "Output width and height in pixels")]
    size: u32,

    #[arg(
        long,
        default_value_t = FULL_DISK_HALF_WIDTH_ARCSEC,
        help = "Half-width of the crop box in arcsec"
    )]
    crop_arcsec: f64,

    #[arg(long, help = "Seed for --random upper bounds")]
    seed: Option<u64>,
}

impl Args {
    fn to_config(&self) -> Result<DatasetConfig> {
        let mut config = DatasetConfig::new(&self.fits_root, &self.data_root);
        config.aia_name = self.name.clone();
        config.aia_range = ClipRange::new(self.min as f64, self.max as f64)
            .context("Invalid --min/--max")?;
        config.random_max = self.random;
        config.seed = self.seed;
        config.modalities = self.modality.modalities();
        config.width = self.size;
        config.height = self.size;
        config.crop_half_width_arcsec = self.crop_arcsec;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = args.to_config()?;

    info!(
        "Converting {:?} from {} into {}",
        config.modalities,
        config.fits_root.display(),
        config.data_root.display()
    );

    let summary = run_dataset(&config)
        .with_context(|| format!("Dataset conversion from {} failed", config.fits_root.display()))?;

    info!(
        "Done: {} images ({} train, {} test)",
        summary.converted, summary.train, summary.test
    );
    Ok(())
}
