//! Helioprojective coordinates, the linear FITS WCS that maps them to
//! pixels, and the crop region shared by every file in a run.
//!
//! Coordinates are helioprojective longitude/latitude (Tx, Ty) in arcsec.
//! Over a ±1000" field the gnomonic projection departs from a linear
//! mapping by well under a pixel, so pixels and sky are related by the
//! `CRPIX`/`CRVAL`/`CDELT`/`PC` affine transform alone.
//!
//! Pixel positions in this module are 0-based array coordinates
//! `(col, row)`, with row 0 being the first row stored in the file.

use crate::error::ConvertError;
use ndarray::{s, Array2};
use shared::fits::FitsImageFile;
use std::ops::Range;
use std::path::Path;
use tracing::{debug, warn};

const ARCSEC_PER_DEG: f64 = 3600.0;
const ARCSEC_PER_ARCMIN: f64 = 60.0;
const ARCSEC_PER_RAD: f64 = 206_264.806_247_096_36;

/// A point on the sky in helioprojective arcsec.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyPoint {
    pub tx: f64,
    pub ty: f64,
}

impl SkyPoint {
    pub fn new(tx: f64, ty: f64) -> Self {
        Self { tx, ty }
    }
}

/// Identity of the observer a set of sky coordinates was defined against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkyFrame {
    /// `TELESCOP`, e.g. `SDO/HMI`.
    pub telescope: Option<String>,
    /// `DATE-OBS` of the defining observation.
    pub date_obs: Option<String>,
}

impl SkyFrame {
    pub fn from_fits(file: &mut FitsImageFile) -> Result<Self, ConvertError> {
        let telescope = match file.read_string("TELESCOP")? {
            Some(t) => Some(t),
            None => file.read_string("INSTRUME")?,
        };
        let date_obs = match file.read_string("DATE-OBS")? {
            Some(d) => Some(d),
            None => file.read_string("T_OBS")?,
        };
        Ok(Self {
            telescope,
            date_obs,
        })
    }

    /// Spacecraft part of the telescope name (`SDO` for `SDO/AIA`).
    pub fn spacecraft(&self) -> Option<&str> {
        self.telescope
            .as_deref()
            .and_then(|t| t.split('/').next())
            .map(str::trim)
    }
}

/// Linear world coordinate system of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Wcs {
    /// Reference pixel, 1-based as in the header.
    pub crpix: [f64; 2],
    /// Sky position of the reference pixel, arcsec.
    pub crval: [f64; 2],
    /// Pixel scale, arcsec per pixel.
    pub cdelt: [f64; 2],
    /// Rotation/skew matrix.
    pub pc: [[f64; 2]; 2],
}

impl Wcs {
    pub fn new(
        crpix: [f64; 2],
        crval: [f64; 2],
        cdelt: [f64; 2],
        pc: [[f64; 2]; 2],
    ) -> Result<Self, String> {
        let mut values = crpix.iter().chain(&crval).chain(&cdelt).chain(pc.iter().flatten());
        if values.any(|v| !v.is_finite()) {
            return Err("non-finite WCS keyword".to_string());
        }
        if cdelt[0] == 0.0 || cdelt[1] == 0.0 {
            return Err("zero pixel scale".to_string());
        }
        let det = pc[0][0] * pc[1][1] - pc[0][1] * pc[1][0];
        if det.abs() < 1e-12 {
            return Err("singular PC matrix".to_string());
        }
        Ok(Self {
            crpix,
            crval,
            cdelt,
            pc,
        })
    }

    /// Build the PC matrix from the legacy `CROTA2` angle in degrees.
    pub fn with_rotation(
        crpix: [f64; 2],
        crval: [f64; 2],
        cdelt: [f64; 2],
        crota_deg: f64,
    ) -> Result<Self, String> {
        let (sin, cos) = crota_deg.to_radians().sin_cos();
        let ratio = cdelt[1] / cdelt[0];
        let pc = [[cos, -sin * ratio], [sin / ratio, cos]];
        Self::new(crpix, crval, cdelt, pc)
    }

    pub fn from_fits(file: &mut FitsImageFile) -> Result<Self, ConvertError> {
        let path = file.path().display().to_string();
        let invalid = |reason: String| ConvertError::InvalidWcs {
            path: path.clone(),
            reason,
        };

        let mut raw = [0.0; 4];
        for (slot, key) in raw.iter_mut().zip(["CRPIX1", "CRPIX2", "CDELT1", "CDELT2"]) {
            *slot = file
                .read_f64(key)?
                .ok_or_else(|| invalid(format!("missing {key}")))?;
        }
        let crpix = [raw[0], raw[1]];
        let mut cdelt = [raw[2], raw[3]];
        let mut crval = [
            file.read_f64("CRVAL1")?.unwrap_or(0.0),
            file.read_f64("CRVAL2")?.unwrap_or(0.0),
        ];

        for (axis, key) in ["CUNIT1", "CUNIT2"].into_iter().enumerate() {
            let unit = file.read_string(key)?;
            let scale = arcsec_per_unit(unit.as_deref()).ok_or_else(|| {
                invalid(format!("unsupported {key} '{}'", unit.unwrap_or_default()))
            })?;
            crval[axis] *= scale;
            cdelt[axis] *= scale;
        }

        let pc_keys = [["PC1_1", "PC1_2"], ["PC2_1", "PC2_2"]];
        let mut pc = [[1.0, 0.0], [0.0, 1.0]];
        let mut has_pc = false;
        for (i, row) in pc_keys.iter().enumerate() {
            for (j, key) in row.iter().enumerate() {
                if let Some(v) = file.read_f64(key)? {
                    pc[i][j] = v;
                    has_pc = true;
                }
            }
        }

        let wcs = if has_pc {
            Self::new(crpix, crval, cdelt, pc)
        } else {
            let crota = file.read_f64("CROTA2")?.unwrap_or(0.0);
            Self::with_rotation(crpix, crval, cdelt, crota)
        };
        wcs.map_err(invalid)
    }

    pub fn pixel_to_world(&self, col: f64, row: f64) -> SkyPoint {
        let d = [col + 1.0 - self.crpix[0], row + 1.0 - self.crpix[1]];
        let q = [
            self.pc[0][0] * d[0] + self.pc[0][1] * d[1],
            self.pc[1][0] * d[0] + self.pc[1][1] * d[1],
        ];
        SkyPoint {
            tx: self.crval[0] + self.cdelt[0] * q[0],
            ty: self.crval[1] + self.cdelt[1] * q[1],
        }
    }

    /// Inverse of [`Wcs::pixel_to_world`], returning `(col, row)`.
    pub fn world_to_pixel(&self, point: SkyPoint) -> (f64, f64) {
        let q = [
            (point.tx - self.crval[0]) / self.cdelt[0],
            (point.ty - self.crval[1]) / self.cdelt[1],
        ];
        let [[a, b], [c, d]] = self.pc;
        let det = a * d - b * c;
        let d1 = (d * q[0] - b * q[1]) / det;
        let d2 = (a * q[1] - c * q[0]) / det;
        (self.crpix[0] + d1 - 1.0, self.crpix[1] + d2 - 1.0)
    }

    /// WCS of the same image after reversing both array axes.
    pub fn rotated_180(&self, rows: usize, cols: usize) -> Self {
        let neg = |v: f64| -v;
        Self {
            crpix: [
                cols as f64 + 1.0 - self.crpix[0],
                rows as f64 + 1.0 - self.crpix[1],
            ],
            crval: self.crval,
            cdelt: self.cdelt,
            pc: self.pc.map(|row| row.map(neg)),
        }
    }
}

fn arcsec_per_unit(unit: Option<&str>) -> Option<f64> {
    match unit.map(|u| u.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("arcsec") => Some(1.0),
        Some("arcmin") => Some(ARCSEC_PER_ARCMIN),
        Some("deg") => Some(ARCSEC_PER_DEG),
        Some("rad") => Some(ARCSEC_PER_RAD),
        _ => None,
    }
}

/// Pixel array bundled with the WCS that places it on the sky.
#[derive(Debug, Clone)]
pub struct SolarMap {
    pub data: Array2<f64>,
    pub wcs: Wcs,
    pub frame: SkyFrame,
}

impl SolarMap {
    pub fn from_fits(file: &mut FitsImageFile) -> Result<Self, ConvertError> {
        let wcs = Wcs::from_fits(file)?;
        let frame = SkyFrame::from_fits(file)?;
        let data = file.read_data()?;
        Ok(Self { data, wcs, frame })
    }

    /// Turn the image by 180° about its centre, keeping every pixel at the
    /// same sky position.
    pub fn rotate_180(self) -> Self {
        let (rows, cols) = self.data.dim();
        let data = self.data.slice(s![..;-1, ..;-1]).to_owned();
        let wcs = self.wcs.rotated_180(rows, cols);
        Self {
            data,
            wcs,
            frame: self.frame,
        }
    }

    /// Row and column ranges of the smallest pixel box containing all four
    /// corners of the sky rectangle, clipped to the image.
    pub fn pixel_bounds(
        &self,
        bottom_left: SkyPoint,
        top_right: SkyPoint,
    ) -> Result<(Range<usize>, Range<usize>), ConvertError> {
        let (rows, cols) = self.data.dim();
        let corners = [
            bottom_left,
            SkyPoint::new(top_right.tx, bottom_left.ty),
            SkyPoint::new(bottom_left.tx, top_right.ty),
            top_right,
        ];
        let pixels: Vec<(f64, f64)> = corners
            .iter()
            .map(|&c| self.wcs.world_to_pixel(c))
            .collect();

        let outside = || ConvertError::CropOutsideImage { rows, cols };
        let col_range = pixel_span(pixels.iter().map(|p| p.0), cols).ok_or_else(outside)?;
        let row_range = pixel_span(pixels.iter().map(|p| p.1), rows).ok_or_else(outside)?;
        Ok((row_range, col_range))
    }

    /// Cut out the part of the image covering the sky rectangle.
    pub fn submap(
        &self,
        bottom_left: SkyPoint,
        top_right: SkyPoint,
    ) -> Result<Array2<f64>, ConvertError> {
        let (rows, cols) = self.pixel_bounds(bottom_left, top_right)?;
        debug!("Submap rows {:?} cols {:?} of {:?}", rows, cols, self.data.dim());
        Ok(self.data.slice(s![rows, cols]).to_owned())
    }
}

/// Index range of the pixels containing the extreme coordinates.
///
/// Pixel `i` covers `[i - 0.5, i + 0.5)`.
fn pixel_span(coords: impl Iterator<Item = f64>, len: usize) -> Option<Range<usize>> {
    let (lo, hi) = coords.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    let start = (lo + 0.5).floor().max(0.0);
    let end = ((hi + 0.5).floor() + 1.0).min(len as f64);
    if end <= start {
        return None;
    }
    Some(start as usize..end as usize)
}

/// Fixed sky rectangle every file in a run is cropped to.
#[derive(Debug, Clone, PartialEq)]
pub struct CropRegion {
    pub bottom_left: SkyPoint,
    pub top_right: SkyPoint,
    pub frame: SkyFrame,
}

impl CropRegion {
    /// Square of `±half_width` arcsec around disk centre.
    pub fn centered(half_width_arcsec: f64, frame: SkyFrame) -> Self {
        Self {
            bottom_left: SkyPoint::new(-half_width_arcsec, -half_width_arcsec),
            top_right: SkyPoint::new(half_width_arcsec, half_width_arcsec),
            frame,
        }
    }

    /// Define the region in the observer frame of `reference`.
    pub fn from_reference(reference: &Path, half_width_arcsec: f64) -> Result<Self, ConvertError> {
        let mut file = FitsImageFile::open(reference)?;
        let frame = SkyFrame::from_fits(&mut file)?;
        debug!(
            "Crop frame from {}: telescope={:?} date={:?}",
            reference.display(),
            frame.telescope,
            frame.date_obs
        );
        Ok(Self::centered(half_width_arcsec, frame))
    }

    /// Crop `map` to this region.
    pub fn apply(&self, map: &SolarMap) -> Result<Array2<f64>, ConvertError> {
        if let (Some(ours), Some(theirs)) = (self.frame.spacecraft(), map.frame.spacecraft()) {
            if ours != theirs {
                warn!(
                    "Cropping {} data with a region defined for {}; coordinates are used as-is",
                    theirs, ours
                );
            }
        }
        map.submap(self.bottom_left, self.top_right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// 11x11 image, 100"/px, disk centre on the central pixel.
    fn centred_wcs(crota: f64) -> Wcs {
        Wcs::with_rotation([6.0, 6.0], [0.0, 0.0], [100.0, 100.0], crota).unwrap()
    }

    fn index_map(rows: usize, cols: usize, wcs: Wcs) -> SolarMap {
        SolarMap {
            data: Array2::from_shape_fn((rows, cols), |(r, c)| (r * cols + c) as f64),
            wcs,
            frame: SkyFrame::default(),
        }
    }

    #[test]
    fn test_reference_pixel_maps_to_crval() {
        let wcs = Wcs::with_rotation([6.0, 4.0], [12.0, -30.0], [0.6, 0.6], 0.0).unwrap();
        let p = wcs.pixel_to_world(5.0, 3.0);
        assert_relative_eq!(p.tx, 12.0);
        assert_relative_eq!(p.ty, -30.0);
    }

    #[test]
    fn test_world_pixel_inverse() {
        let wcs = Wcs::with_rotation([512.5, 500.0], [3.0, -2.0], [0.6, 0.61], 37.0).unwrap();
        let (col, row) = wcs.world_to_pixel(SkyPoint::new(250.0, -410.0));
        let back = wcs.pixel_to_world(col, row);
        assert_relative_eq!(back.tx, 250.0, epsilon = 1e-9);
        assert_relative_eq!(back.ty, -410.0, epsilon = 1e-9);
    }

    #[test]
    fn test_crota_180_flips_axes() {
        let wcs = centred_wcs(180.0);
        let p = wcs.pixel_to_world(6.0, 5.0);
        assert_relative_eq!(p.tx, -100.0, epsilon = 1e-9);
        assert_relative_eq!(p.ty, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rotate_180_preserves_sky_positions() {
        let wcs = Wcs::with_rotation([3.0, 2.0], [0.0, 0.0], [1.0, 1.0], 180.0).unwrap();
        let map = index_map(5, 7, wcs);
        let before_value = map.data[[1, 4]];
        let before_sky = map.wcs.pixel_to_world(4.0, 1.0);

        let rotated = map.rotate_180();
        assert_eq!(rotated.data.dim(), (5, 7));
        // Old (row 1, col 4) now lives at (row 3, col 2).
        assert_eq!(rotated.data[[3, 2]], before_value);

        let after_sky = rotated.wcs.pixel_to_world(2.0, 3.0);
        assert_relative_eq!(after_sky.tx, before_sky.tx, epsilon = 1e-9);
        assert_relative_eq!(after_sky.ty, before_sky.ty, epsilon = 1e-9);

        // A south-up image becomes north-up.
        assert_relative_eq!(rotated.wcs.pc[0][0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(rotated.wcs.pc[1][1], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_submap_bounds() {
        let map = index_map(11, 11, centred_wcs(0.0));
        // ±200" is ±2 px around the centre pixel (5, 5).
        let cut = map
            .submap(SkyPoint::new(-200.0, -200.0), SkyPoint::new(200.0, 200.0))
            .unwrap();
        assert_eq!(cut.dim(), (5, 5));
        assert_eq!(cut[[0, 0]], map.data[[3, 3]]);
        assert_eq!(cut[[4, 4]], map.data[[7, 7]]);
    }

    #[test]
    fn test_submap_clipped_to_image() {
        let map = index_map(11, 11, centred_wcs(0.0));
        let cut = map
            .submap(SkyPoint::new(-5000.0, -5000.0), SkyPoint::new(5000.0, 5000.0))
            .unwrap();
        assert_eq!(cut.dim(), (11, 11));
    }

    #[test]
    fn test_submap_outside_image() {
        let map = index_map(11, 11, centred_wcs(0.0));
        let result = map.submap(SkyPoint::new(5000.0, 5000.0), SkyPoint::new(6000.0, 6000.0));
        assert!(matches!(result, Err(ConvertError::CropOutsideImage { .. })));
    }

    #[test]
    fn test_crop_region_centered() {
        let region = CropRegion::centered(1000.0, SkyFrame::default());
        assert_eq!(region.bottom_left, SkyPoint::new(-1000.0, -1000.0));
        assert_eq!(region.top_right, SkyPoint::new(1000.0, 1000.0));
    }

    #[test]
    fn test_singular_wcs_rejected() {
        assert!(Wcs::new([1.0, 1.0], [0.0, 0.0], [1.0, 1.0], [[1.0, 1.0], [1.0, 1.0]]).is_err());
        assert!(Wcs::new([1.0, 1.0], [0.0, 0.0], [0.0, 1.0], [[1.0, 0.0], [0.0, 1.0]]).is_err());
    }

    #[test]
    fn test_units() {
        assert_eq!(arcsec_per_unit(None), Some(1.0));
        assert_eq!(arcsec_per_unit(Some("arcsec")), Some(1.0));
        assert_eq!(arcsec_per_unit(Some("deg")), Some(3600.0));
        assert_eq!(arcsec_per_unit(Some("furlong")), None);
    }

    #[test]
    fn test_spacecraft() {
        let frame = SkyFrame {
            telescope: Some("SDO/HMI".to_string()),
            date_obs: None,
        };
        assert_eq!(frame.spacecraft(), Some("SDO"));
    }
}
