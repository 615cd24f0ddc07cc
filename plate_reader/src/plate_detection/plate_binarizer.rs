use super::grey_image;
use super::PlateError;

use opencv::core::bitwise_not;
use opencv::core::mean;
use opencv::imgproc::adaptive_threshold;
use opencv::imgproc::ADAPTIVE_THRESH_GAUSSIAN_C;
use opencv::imgproc::THRESH_BINARY;
use opencv::prelude::Mat;
use opencv::prelude::MatTraitConst;

use tracing::debug;

#[derive(Clone, Debug)]
pub struct BinarizeParams {
    /// Neighbourhood size used to compute each local threshold, odd.
    pub block_size: i32,
    /// Subtracted from the weighted neighbourhood mean.
    pub offset: f64,
    /// Results brighter than this on average are inverted.
    pub invert_above_mean: f64,
}

impl Default for BinarizeParams {
    fn default() -> Self {
        Self {
            block_size: 11,
            offset: 2.0,
            invert_above_mean: 127.0,
        }
    }
}

/// Black and white version of a plate crop, ready for OCR.
///
/// Plates come with light or dark backgrounds; when most of the thresholded
/// image is white it is inverted so the background ends up dark.
pub fn binarize_plate(region: &Mat, params: &BinarizeParams) -> Result<Mat, PlateError> {
    if region.empty() {
        return Err(PlateError::EmptyFrame);
    }

    let grey = grey_image(region)?;
    let mut thresh = Mat::default();
    adaptive_threshold(
        &grey,
        &mut thresh,
        255.0,
        ADAPTIVE_THRESH_GAUSSIAN_C,
        THRESH_BINARY,
        params.block_size,
        params.offset,
    )?;

    let mean_intensity = mean(&thresh, &Mat::default())?[0];
    if mean_intensity > params.invert_above_mean {
        debug!("Inverting plate, mean intensity {:.1}", mean_intensity);
        let mut inverted = Mat::default();
        bitwise_not(&thresh, &mut inverted, &Mat::default())?;
        return Ok(inverted);
    }

    Ok(thresh)
}
