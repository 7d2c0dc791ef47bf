//! Error type for the conversion pipeline.

use shared::fits::FitsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error(transparent)]
    Fits(#[from] FitsError),
    #[error("image write failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("filename '{0}' does not carry a date in its third dot-separated field")]
    MalformedFilename(String),
    #[error("clip range is degenerate: max ({max}) must exceed min ({min}), both finite")]
    DegenerateRange { min: f64, max: f64 },
    #[error("{0} has no DATAMEDN keyword for normalization")]
    MissingMedian(String),
    #[error("cannot normalize by a median of {0}")]
    UnusableMedian(f64),
    #[error("WCS of {path} is unusable: {reason}")]
    InvalidWcs { path: String, reason: String },
    #[error("crop region does not overlap the {rows}x{cols} image")]
    CropOutsideImage { rows: usize, cols: usize },
    #[error("no .fits files found in {0}")]
    EmptySourceDir(PathBuf),
}

impl ConvertError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Io {
            path: path.into(),
            source,
        }
    }
}
