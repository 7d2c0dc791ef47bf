//! FITS science file access for 2D image HDUs.
//!
//! SDO level-1 products store an empty primary HDU followed by a
//! tile-compressed image extension. cfitsio decompresses those
//! transparently, so callers only ever see a plain `Array2<f64>` plus
//! keyword lookups on the HDU that carried the image.
//!
//! Pixel rows are returned in FITS storage order: row 0 is the first row
//! on disk, which is the *bottom* of the image in display convention.

use fitsio::errors::Error as FitsioError;
use fitsio::hdu::{FitsHdu, HduInfo};
use fitsio::images::{ImageDescription, ImageType};
use fitsio::FitsFile;
use ndarray::Array2;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// cfitsio status returned when a keyword is absent from the header.
const KEY_NO_EXIST: i32 = 202;

/// Errors that can occur during FITS file operations
#[derive(Error, Debug)]
pub enum FitsError {
    #[error("FITS I/O error: {0}")]
    FitsIo(#[from] FitsioError),
    #[error("no 2D image HDU found in {0}")]
    HduNotFound(String),
    #[error("Invalid data type in HDU: {0}")]
    InvalidDataType(String),
    #[error("header keyword {key} has unparsable value '{value}'")]
    BadKeyword { key: String, value: String },
}

/// Value written into a header card by [`write_image_hdu`].
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderCard {
    Float(f64),
    Int(i64),
    Text(String),
}

/// An open FITS file positioned on its 2D image HDU.
pub struct FitsImageFile {
    fptr: FitsFile,
    hdu: FitsHdu,
    hdu_index: usize,
    shape: (usize, usize),
    path: PathBuf,
}

impl FitsImageFile {
    /// Open `path` and select the science image.
    ///
    /// HDU 1 is preferred (compressed SDO layout); files that only carry a
    /// primary array fall back to HDU 0.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FitsError> {
        let path = path.as_ref();
        let mut fptr = FitsFile::open(path)?;

        for hdu_index in [1usize, 0] {
            let Ok(hdu) = fptr.hdu(hdu_index) else {
                continue;
            };
            let dims = match &hdu.info {
                HduInfo::ImageInfo { shape, .. }
                    if shape.len() == 2 && shape[0] > 0 && shape[1] > 0 =>
                {
                    Some((shape[0], shape[1]))
                }
                _ => None,
            };
            if let Some(shape) = dims {
                debug!(
                    "Using HDU {} of {} with shape {:?}",
                    hdu_index,
                    path.display(),
                    shape
                );
                return Ok(Self {
                    fptr,
                    hdu,
                    hdu_index,
                    shape,
                    path: path.to_path_buf(),
                });
            }
        }

        Err(FitsError::HduNotFound(path.display().to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn hdu_index(&self) -> usize {
        self.hdu_index
    }

    /// Image shape as (rows, columns).
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Read the full image as `f64`, rows in FITS storage order.
    pub fn read_data(&mut self) -> Result<Array2<f64>, FitsError> {
        let flat: Vec<f64> = self.hdu.read_image(&mut self.fptr)?;
        Array2::from_shape_vec(self.shape, flat).map_err(|_| {
            FitsError::InvalidDataType(format!(
                "Cannot reshape image data of {} to {:?}",
                self.path.display(),
                self.shape
            ))
        })
    }

    /// Read a numeric keyword, `None` when it is absent.
    ///
    /// Values written as quoted strings are parsed rather than rejected.
    pub fn read_f64(&mut self, key: &str) -> Result<Option<f64>, FitsError> {
        match self.hdu.read_key::<f64>(&mut self.fptr, key) {
            Ok(value) => Ok(Some(value)),
            Err(e) if is_missing_key(&e) => Ok(None),
            Err(_) => {
                let raw = self.hdu.read_key::<String>(&mut self.fptr, key)?;
                let cleaned = raw.trim().trim_matches('\'').trim();
                cleaned
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| FitsError::BadKeyword {
                        key: key.to_string(),
                        value: raw.clone(),
                    })
            }
        }
    }

    /// Read a string keyword, `None` when it is absent.
    pub fn read_string(&mut self, key: &str) -> Result<Option<String>, FitsError> {
        match self.hdu.read_key::<String>(&mut self.fptr, key) {
            Ok(value) => Ok(Some(value.trim().to_string())),
            Err(e) if is_missing_key(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn is_missing_key(e: &FitsioError) -> bool {
    matches!(e, FitsioError::Fits(inner) if inner.status == KEY_NO_EXIST)
}

/// Write `data` as an image extension after an empty primary HDU.
///
/// Mirrors the SDO on-disk layout (minus compression), with `cards`
/// written to the extension header. Rows are written in array order, so
/// `data[[0, ..]]` becomes the bottom row of the stored image.
pub fn write_image_hdu<P: AsRef<Path>>(
    path: P,
    data: &Array2<f64>,
    cards: &[(&str, HeaderCard)],
) -> Result<(), FitsError> {
    let mut fptr = FitsFile::create(path.as_ref()).overwrite().open()?;

    let (rows, cols) = data.dim();
    let description = ImageDescription {
        data_type: ImageType::Double,
        dimensions: &[rows, cols],
    };
    let hdu = fptr.create_image("SCIENCE".to_string(), &description)?;

    for (key, card) in cards {
        match card {
            HeaderCard::Float(v) => hdu.write_key(&mut fptr, key, *v)?,
            HeaderCard::Int(v) => hdu.write_key(&mut fptr, key, *v)?,
            HeaderCard::Text(s) => hdu.write_key(&mut fptr, key, s.as_str())?,
        }
    }

    let flat: Vec<f64> = data.iter().copied().collect();
    hdu.write_image(&mut fptr, &flat)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    #[test]
    fn test_fits_error_display() {
        let error = FitsError::HduNotFound("foo.fits".to_string());
        assert!(error.to_string().contains("no 2D image HDU found in foo.fits"));

        let error = FitsError::BadKeyword {
            key: "DATAMEDN".to_string(),
            value: "abc".to_string(),
        };
        assert!(error.to_string().contains("DATAMEDN"));
    }

    #[test]
    fn test_image_hdu_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("square.fits");

        let mut data = Array2::<f64>::zeros((4, 4));
        data[[0, 0]] = 1.5;
        data[[3, 2]] = -7.25;

        write_image_hdu(
            &path,
            &data,
            &[
                ("DATAMEDN", HeaderCard::Float(42.5)),
                ("TELESCOP", HeaderCard::Text("SDO/AIA".to_string())),
            ],
        )
        .unwrap();

        let mut file = FitsImageFile::open(&path).unwrap();
        assert_eq!(file.hdu_index(), 1);
        assert_eq!(file.shape(), (4, 4));

        let read = file.read_data().unwrap();
        assert_relative_eq!(read[[0, 0]], 1.5);
        assert_relative_eq!(read[[3, 2]], -7.25);

        assert_relative_eq!(file.read_f64("DATAMEDN").unwrap().unwrap(), 42.5);
        assert_eq!(
            file.read_string("TELESCOP").unwrap().as_deref(),
            Some("SDO/AIA")
        );
    }

    #[test]
    fn test_missing_keyword_is_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bare.fits");
        write_image_hdu(&path, &Array2::zeros((2, 2)), &[]).unwrap();

        let mut file = FitsImageFile::open(&path).unwrap();
        assert_eq!(file.read_f64("DATAMEDN").unwrap(), None);
        assert_eq!(file.read_string("DATE-OBS").unwrap(), None);
    }

    #[test]
    fn test_quoted_numeric_keyword_is_parsed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quoted.fits");
        write_image_hdu(
            &path,
            &Array2::zeros((2, 2)),
            &[("DATAMEDN", HeaderCard::Text("12.5".to_string()))],
        )
        .unwrap();

        let mut file = FitsImageFile::open(&path).unwrap();
        assert_relative_eq!(file.read_f64("DATAMEDN").unwrap().unwrap(), 12.5);
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(FitsImageFile::open(dir.path().join("nope.fits")).is_err());
    }
}
