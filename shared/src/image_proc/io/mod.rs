//! Fixed-range 8-bit scaling and PNG output for dataset rasters.
//!
//! Science arrays carry arbitrary physical units (DN/s for EUV, Gauss for
//! magnetograms). Dataset images need a *fixed* mapping so the same
//! physical value always lands on the same gray level across files, which
//! is why scaling here takes explicit bounds instead of scanning the image.

use image::GrayImage;
use ndarray::Array2;
use std::path::Path;

/// Save an 8-bit grayscale raster. Format follows the file extension.
pub fn save_u8_image<P: AsRef<Path>>(image: &GrayImage, path: P) -> image::ImageResult<()> {
    image.save(path)
}

/// Map `[min, max]` linearly onto `[0, 255]`.
///
/// # Scaling Method
/// `output_pixel = round(255 × (input_pixel − min) / (max − min))`
///
/// Values outside the range saturate at 0 or 255. Non-finite inputs
/// (NaN off-disk pixels in magnetograms) become 0. Callers must ensure
/// `max > min`.
pub fn scale_to_u8(image: &Array2<f64>, min: f64, max: f64) -> Array2<u8> {
    let span = max - min;
    image.mapv(|v| {
        let t = (v - min) / span;
        if t.is_finite() {
            (t * 255.0).round().clamp(0.0, 255.0) as u8
        } else {
            0
        }
    })
}
