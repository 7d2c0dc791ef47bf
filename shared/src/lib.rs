//! Shared components for the solar dataset tools.
//!
//! FITS access and grayscale image plumbing that does not depend on which
//! instrument produced the data.

pub mod fits;
pub mod image_proc;
