//! Directory-level driver: one crop region per run, one conversion per file.

use crate::config::{DatasetConfig, Modality, RANDOM_MAX_FLOOR, RANDOM_MAX_SPAN};
use crate::convert::{convert_file, ConversionRequest};
use crate::error::ConvertError;
use crate::sky::CropRegion;
use crate::split::DatasetSplit;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const FITS_EXTENSION: &str = "fits";

/// Counts of files written during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub converted: usize,
    pub train: usize,
    pub test: usize,
}

impl RunSummary {
    fn record(&mut self, split: DatasetSplit) {
        self.converted += 1;
        match split {
            DatasetSplit::Train => self.train += 1,
            DatasetSplit::Test => self.test += 1,
        }
    }

    fn merge(&mut self, other: RunSummary) {
        self.converted += other.converted;
        self.train += other.train;
        self.test += other.test;
    }
}

/// `.fits` files directly inside `dir`, sorted by name.
pub fn list_fits_files(dir: &Path) -> Result<Vec<PathBuf>, ConvertError> {
    let entries = fs::read_dir(dir).map_err(|e| ConvertError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ConvertError::io(dir, e))?.path();
        let is_fits = path
            .extension()
            .is_some_and(|ext| ext == FITS_EXTENSION);
        if is_fits && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Crop region defined against the first HMI file.
pub fn reference_crop_region(config: &DatasetConfig) -> Result<CropRegion, ConvertError> {
    let dir = config.reference_dir();
    let reference = list_fits_files(&dir)?
        .into_iter()
        .next()
        .ok_or_else(|| ConvertError::EmptySourceDir(dir.clone()))?;

    info!("Defining crop region from {}", reference.display());
    CropRegion::from_reference(&reference, config.crop_half_width_arcsec)
}

/// Upper clip bound for augmented AIA training data.
pub fn random_upper_bound<R: Rng>(rng: &mut R) -> f64 {
    rng.gen::<f64>() * RANDOM_MAX_SPAN + RANDOM_MAX_FLOOR
}

/// Convert every configured modality.
pub fn run_dataset(config: &DatasetConfig) -> Result<RunSummary, ConvertError> {
    let region = reference_crop_region(config)?;
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut summary = RunSummary::default();
    for &modality in &config.modalities {
        let done = run_modality(config, modality, &region, &mut rng)?;
        info!(
            "{}: {} files ({} train, {} test)",
            modality, done.converted, done.train, done.test
        );
        summary.merge(done);
    }
    Ok(summary)
}

fn run_modality(
    config: &DatasetConfig,
    modality: Modality,
    region: &CropRegion,
    rng: &mut StdRng,
) -> Result<RunSummary, ConvertError> {
    for split in [DatasetSplit::Test, DatasetSplit::Train] {
        let dir = config.split_dir(split, modality);
        fs::create_dir_all(&dir).map_err(|e| ConvertError::io(&dir, e))?;
    }

    let source_dir = config.source_dir(modality);
    let options = modality.options();
    let mut summary = RunSummary::default();

    for path in list_fits_files(&source_dir)? {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ConvertError::MalformedFilename(path.display().to_string()))?;
        let split = DatasetSplit::for_filename(filename)?;
        let name = filename
            .strip_suffix(&format!(".{FITS_EXTENSION}"))
            .unwrap_or(filename);

        let range = if modality == Modality::Aia && config.random_max {
            config.aia_range.with_max(random_upper_bound(rng))?
        } else {
            config.range_for(modality)
        };
        debug!("{} -> {:?} with range {}", filename, split, range);

        let destination = config.split_dir(split, modality).join(format!("{name}.png"));
        convert_file(&ConversionRequest {
            name,
            source: &path,
            destination: &destination,
            range,
            width: config.width,
            height: config.height,
            options,
            crop: Some(region),
        })?;
        summary.record(split);
    }

    Ok(summary)
}
