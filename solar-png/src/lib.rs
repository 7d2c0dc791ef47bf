//! SDO AIA/HMI FITS to PNG dataset preparation.
//!
//! Each science file goes through one linear pipeline: optional crop to a
//! fixed helioprojective field of view, clip, optional median
//! normalization, optional absolute value, 8-bit scaling, Lanczos resize
//! and orientation fix-up. The driver routes every output into a TRAIN or
//! TEST split based on the acquisition month encoded in the filename.

pub mod config;
pub mod convert;
pub mod driver;
pub mod error;
pub mod sky;
pub mod split;

pub use config::{ClipRange, ConversionOptions, DatasetConfig, Modality};
pub use convert::{convert_file, ConversionRequest};
pub use driver::{run_dataset, RunSummary};
pub use error::ConvertError;
pub use sky::{CropRegion, SkyFrame, SkyPoint, SolarMap, Wcs};
pub use split::DatasetSplit;
