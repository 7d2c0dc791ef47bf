//! Grayscale image helpers for turning science arrays into dataset PNGs.
//!
//! # Module Organization
//!
//! - **image**: conversions between ndarray and image crate types, plus
//!   resampling and orientation transforms on `GrayImage`
//! - **io**: fixed-range scaling to 8 bits and PNG output

pub mod image;
pub mod io;

pub use self::image::{array2_to_gray_image, flip_vertical, resize_lanczos, rotate_180};
pub use self::io::{save_u8_image, scale_to_u8};
