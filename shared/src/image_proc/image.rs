//! Conversions between ndarray arrays and `GrayImage`, plus the geometric
//! transforms applied to dataset rasters.
//!
//! # Coordinate System Conversions
//!
//! - **ndarray**: matrix indexing [row, col] = [y, x] with (height, width) dimensions
//! - **image crate**: graphics indexing (x, y) with (width, height) dimensions
//!
//! Array row 0 becomes image row 0 (the top of the raster). Science arrays
//! read from FITS store the bottom row first, so callers flip afterwards.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use ndarray::Array2;

/// Convert ndarray `Array2<u8>` to image crate GrayImage.
///
/// # Coordinate Mapping
/// - Array index [row, col] → Image pixel (col, row)
/// - Array dimensions (height, width) → Image dimensions (width, height)
pub fn array2_to_gray_image(arr: &Array2<u8>) -> GrayImage {
    let (height, width) = arr.dim();

    let mut img = GrayImage::new(width as u32, height as u32);
    for ((y, x), &value) in arr.indexed_iter() {
        img.put_pixel(x as u32, y as u32, Luma([value]));
    }

    img
}

/// Resample to exactly `width` × `height` with a Lanczos3 kernel.
///
/// Returns an unmodified copy when the raster already has the requested size.
pub fn resize_lanczos(img: &GrayImage, width: u32, height: u32) -> GrayImage {
    if img.dimensions() == (width, height) {
        return img.clone();
    }
    imageops::resize(img, width, height, FilterType::Lanczos3)
}

/// Mirror top-to-bottom.
pub fn flip_vertical(img: &GrayImage) -> GrayImage {
    imageops::flip_vertical(img)
}

/// Rotate by 180 degrees.
pub fn rotate_180(img: &GrayImage) -> GrayImage {
    imageops::rotate180(img)
}
