//! Run configuration: clip ranges, per-modality presets and dataset layout.

use crate::error::ConvertError;
use crate::split::DatasetSplit;
use std::fmt;
use std::path::{Path, PathBuf};

/// Edge length of the square output rasters.
pub const OUTPUT_SIZE: u32 = 1024;

/// Default AIA clip range (DN).
pub const AIA_DEFAULT_RANGE: (f64, f64) = (0.0, 150.0);

/// Magnetogram clip range (Gauss).
pub const HMI_RANGE: (f64, f64) = (-100.0, 100.0);

/// Randomized AIA upper bounds are drawn from `[FLOOR, FLOOR + SPAN)`.
pub const RANDOM_MAX_FLOOR: f64 = 200.0;
pub const RANDOM_MAX_SPAN: f64 = 1800.0;

/// Half-width of the crop box in arcsec; ±1000" covers the full disk.
pub const FULL_DISK_HALF_WIDTH_ARCSEC: f64 = 1000.0;

/// A validated `[min, max]` pixel value window with `max > min`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipRange {
    min: f64,
    max: f64,
}

impl ClipRange {
    pub fn new(min: f64, max: f64) -> Result<Self, ConvertError> {
        if !min.is_finite() || !max.is_finite() || max <= min {
            return Err(ConvertError::DegenerateRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Same lower bound, new upper bound.
    pub fn with_max(self, max: f64) -> Result<Self, ConvertError> {
        Self::new(self.min, max)
    }

    /// Range used after taking absolute values: `min` floored at zero.
    pub fn floored_at_zero(self) -> Result<Self, ConvertError> {
        Self::new(self.min.max(0.0), self.max)
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

impl fmt::Display for ClipRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Per-file pixel treatment switches.
///
/// Cropping is not a flag here: a conversion crops exactly when it is
/// handed a [`crate::sky::CropRegion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConversionOptions {
    /// Divide by the header median (`DATAMEDN`) after clipping.
    pub normalize: bool,
    /// The instrument images south-up and needs a 180° turn.
    pub rotate: bool,
    /// Take absolute values, discarding magnetic polarity.
    pub abs: bool,
}

/// SDO instrument whose files are being converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    /// Atmospheric Imaging Assembly, extreme ultraviolet.
    Aia,
    /// Helioseismic and Magnetic Imager, line-of-sight magnetogram.
    Hmi,
}

impl Modality {
    /// Directory name under the FITS root.
    pub fn source_dir_name(&self) -> &'static str {
        match self {
            Modality::Aia => "AIA",
            Modality::Hmi => "HMI",
        }
    }

    pub fn options(&self) -> ConversionOptions {
        match self {
            Modality::Aia => ConversionOptions {
                normalize: false,
                rotate: false,
                abs: false,
            },
            Modality::Hmi => ConversionOptions {
                normalize: false,
                rotate: true,
                abs: true,
            },
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source_dir_name())
    }
}

/// Everything a dataset run needs, passed explicitly to the driver.
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// Root holding `AIA/` and `HMI/` FITS directories.
    pub fits_root: PathBuf,
    /// Root receiving `TRAIN/` and `TEST/`.
    pub data_root: PathBuf,
    /// Output folder name for AIA images. HMI always writes to `HMI`.
    pub aia_name: String,
    pub aia_range: ClipRange,
    pub hmi_range: ClipRange,
    /// Draw a fresh AIA upper bound for every file.
    pub random_max: bool,
    pub seed: Option<u64>,
    /// Modalities to convert, in order.
    pub modalities: Vec<Modality>,
    pub width: u32,
    pub height: u32,
    pub crop_half_width_arcsec: f64,
}

impl DatasetConfig {
    /// Defaults matching the standard SDO dataset layout.
    pub fn new(fits_root: impl Into<PathBuf>, data_root: impl Into<PathBuf>) -> Self {
        Self {
            fits_root: fits_root.into(),
            data_root: data_root.into(),
            aia_name: Modality::Aia.source_dir_name().to_string(),
            aia_range: ClipRange {
                min: AIA_DEFAULT_RANGE.0,
                max: AIA_DEFAULT_RANGE.1,
            },
            hmi_range: ClipRange {
                min: HMI_RANGE.0,
                max: HMI_RANGE.1,
            },
            random_max: false,
            seed: None,
            modalities: vec![Modality::Aia],
            width: OUTPUT_SIZE,
            height: OUTPUT_SIZE,
            crop_half_width_arcsec: FULL_DISK_HALF_WIDTH_ARCSEC,
        }
    }

    pub fn source_dir(&self, modality: Modality) -> PathBuf {
        self.fits_root.join(modality.source_dir_name())
    }

    /// Directory the crop region reference file is taken from.
    pub fn reference_dir(&self) -> PathBuf {
        self.source_dir(Modality::Hmi)
    }

    pub fn output_name(&self, modality: Modality) -> &str {
        match modality {
            Modality::Aia => &self.aia_name,
            Modality::Hmi => Modality::Hmi.source_dir_name(),
        }
    }

    pub fn split_dir(&self, split: DatasetSplit, modality: Modality) -> PathBuf {
        split_dir(&self.data_root, split, self.output_name(modality))
    }

    pub fn range_for(&self, modality: Modality) -> ClipRange {
        match modality {
            Modality::Aia => self.aia_range,
            Modality::Hmi => self.hmi_range,
        }
    }
}

fn split_dir(data_root: &Path, split: DatasetSplit, name: &str) -> PathBuf {
    data_root.join(split.dir_name()).join(name)
}
