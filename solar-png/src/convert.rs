//! Single-file FITS to PNG conversion.
//!
//! The pipeline order matters and matches how the training data has always
//! been produced:
//!
//! 1. load (optionally rotate the map 180° and crop it on the sky)
//! 2. clip to the range
//! 3. optionally divide by the clipped header median
//! 4. optionally take |v| and raise `min` to 0
//! 5. scale `[min, max]` to `[0, 255]`
//! 6. Lanczos resize, vertical flip, and a 180° turn for instruments
//!    that need one and were not already rotated during cropping

use crate::config::{ClipRange, ConversionOptions};
use crate::error::ConvertError;
use crate::sky::{CropRegion, SolarMap};
use image::GrayImage;
use ndarray::Array2;
use shared::fits::FitsImageFile;
use shared::image_proc::{
    array2_to_gray_image, flip_vertical, resize_lanczos, rotate_180, save_u8_image, scale_to_u8,
};
use std::path::Path;
use tracing::{debug, info};

/// Header keyword holding the precomputed image median.
pub const MEDIAN_KEY: &str = "DATAMEDN";

/// Parameters for converting one science file.
#[derive(Debug, Clone)]
pub struct ConversionRequest<'a> {
    /// File identifier, the filename without `.fits`.
    pub name: &'a str,
    pub source: &'a Path,
    pub destination: &'a Path,
    pub range: ClipRange,
    pub width: u32,
    pub height: u32,
    pub options: ConversionOptions,
    /// Crop to this sky region; `None` keeps the full native array.
    pub crop: Option<&'a CropRegion>,
}

/// Convert one FITS file and write the PNG to `request.destination`.
pub fn convert_file(request: &ConversionRequest<'_>) -> Result<(), ConvertError> {
    info!("{}", request.name);

    let mut file = FitsImageFile::open(request.source)?;
    let pixels = load_pixels(&mut file, request.options.rotate, request.crop)?;

    let median = if request.options.normalize {
        let median = file
            .read_f64(MEDIAN_KEY)?
            .ok_or_else(|| ConvertError::MissingMedian(request.name.to_string()))?;
        Some(median)
    } else {
        None
    };

    let raster = scale_pixels(pixels, median, request.range, request.options.abs)?;
    let rotate_after = request.options.rotate && request.crop.is_none();
    let image = orient(&raster, request.width, request.height, rotate_after);

    save_u8_image(&image, request.destination)?;
    debug!("Wrote {}", request.destination.display());
    Ok(())
}

/// Native array, or the cropped (and optionally pre-rotated) map.
pub fn load_pixels(
    file: &mut FitsImageFile,
    rotate: bool,
    crop: Option<&CropRegion>,
) -> Result<Array2<f64>, ConvertError> {
    let Some(region) = crop else {
        return Ok(file.read_data()?);
    };

    let mut map = SolarMap::from_fits(file)?;
    if rotate {
        map = map.rotate_180();
    }
    region.apply(&map)
}

/// Clip, normalize, abs and quantize to 8 bits.
pub fn scale_pixels(
    pixels: Array2<f64>,
    median: Option<f64>,
    range: ClipRange,
    abs: bool,
) -> Result<Array2<u8>, ConvertError> {
    let mut pixels = pixels.mapv_into(|v| range.clamp(v));

    if let Some(median) = median {
        let median = range.clamp(median);
        if median == 0.0 || !median.is_finite() {
            return Err(ConvertError::UnusableMedian(median));
        }
        pixels.mapv_inplace(|v| v / median);
    }

    let range = if abs {
        pixels.mapv_inplace(f64::abs);
        range.floored_at_zero()?
    } else {
        range
    };

    debug!("Scaling {} (span {}) to 8 bits", range, range.span());
    Ok(scale_to_u8(&pixels, range.min(), range.max()))
}

/// Resize and fix orientation. FITS rows run bottom-up, hence the flip.
pub fn orient(raster: &Array2<u8>, width: u32, height: u32, rotate_after: bool) -> GrayImage {
    let image = array2_to_gray_image(raster);
    let image = resize_lanczos(&image, width, height);
    let image = flip_vertical(&image);
    if rotate_after {
        rotate_180(&image)
    } else {
        image
    }
}
