//! Train/test routing by acquisition month.
//!
//! SDO filenames are dot-separated, e.g.
//! `aia.lev1.2021-09-15T000000Z.image_lev1.fits`; the third field holds
//! the observation date. September and October are held out for testing.

use crate::error::ConvertError;

/// Months (as two-digit strings) routed to the test split.
const TEST_MONTHS: [&str; 2] = ["09", "10"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetSplit {
    Train,
    Test,
}

impl DatasetSplit {
    pub fn dir_name(&self) -> &'static str {
        match self {
            DatasetSplit::Train => "TRAIN",
            DatasetSplit::Test => "TEST",
        }
    }

    pub fn for_month(month: &str) -> Self {
        if TEST_MONTHS.contains(&month) {
            DatasetSplit::Test
        } else {
            DatasetSplit::Train
        }
    }

    pub fn for_filename(filename: &str) -> Result<Self, ConvertError> {
        acquisition_month(filename).map(|month| Self::for_month(&month))
    }
}

/// Date field of the filename with dashes removed: `2021-09-15T000000Z`
/// becomes `20210915T000000Z`.
pub fn acquisition_date(filename: &str) -> Result<String, ConvertError> {
    filename
        .split('.')
        .nth(2)
        .map(|field| field.replace('-', ""))
        .ok_or_else(|| ConvertError::MalformedFilename(filename.to_string()))
}

/// Two-digit month, characters `[4, 6)` of [`acquisition_date`].
pub fn acquisition_month(filename: &str) -> Result<String, ConvertError> {
    let date = acquisition_date(filename)?;
    date.get(4..6)
        .map(str::to_string)
        .ok_or_else(|| ConvertError::MalformedFilename(filename.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_september_goes_to_test() {
        let name = "aia.lev1.2021-09-15T000000Z.image_lev1.fits";
        assert_eq!(acquisition_date(name).unwrap(), "20210915T000000Z");
        assert_eq!(acquisition_month(name).unwrap(), "09");
        assert_eq!(DatasetSplit::for_filename(name).unwrap(), DatasetSplit::Test);
    }

    #[test]
    fn test_october_goes_to_test() {
        let name = "hmi.m_45s.2020-10-01T120000Z.magnetogram.fits";
        assert_eq!(DatasetSplit::for_filename(name).unwrap(), DatasetSplit::Test);
    }

    #[test]
    fn test_other_months_go_to_train() {
        for month in ["01", "02", "03", "04", "05", "06", "07", "08", "11", "12"] {
            let name = format!("aia.lev1.2019-{month}-03T000000Z.image_lev1.fits");
            assert_eq!(
                DatasetSplit::for_filename(&name).unwrap(),
                DatasetSplit::Train,
                "month {month}"
            );
        }
    }

    #[test]
    fn test_malformed_filenames() {
        assert!(matches!(
            DatasetSplit::for_filename("aia_only.fits"),
            Err(ConvertError::MalformedFilename(_))
        ));
        assert!(matches!(
            DatasetSplit::for_filename("aia.lev1.2021.fits"),
            Err(ConvertError::MalformedFilename(_))
        ));
    }

    #[test]
    fn test_dir_names() {
        assert_eq!(DatasetSplit::Train.dir_name(), "TRAIN");
        assert_eq!(DatasetSplit::Test.dir_name(), "TEST");
    }
}
