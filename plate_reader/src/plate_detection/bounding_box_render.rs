use opencv::core::Point;
use opencv::core::Scalar;
use opencv::core::Vector;
use opencv::imgproc::polylines;
use opencv::imgproc::put_text;
use opencv::imgproc::FONT_HERSHEY_SIMPLEX;
use opencv::imgproc::LINE_8;
use opencv::prelude::Mat;

use crate::plate_detection::PlateError;
use crate::plate_detection::PlateReading;

#[derive(Clone, Debug)]
pub struct OverlayStyle {
    pub color: Scalar,
    pub outline_px: i32,
    pub font_scale: f64,
    pub text_px: i32,
    /// Distance between the text baseline and the top of the plate.
    pub text_lift_px: i32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            color: Scalar::from((0.0, 255.0, 0.0)),
            outline_px: 3,
            font_scale: 0.9,
            text_px: 2,
            text_lift_px: 10,
        }
    }
}

/// Outlines the plate contour and writes the recognized text above it.
pub fn render_plate(
    frame: &mut Mat,
    reading: &PlateReading,
    style: &OverlayStyle,
) -> Result<(), PlateError> {
    let mut outlines = Vector::<Vector<Point>>::default();
    outlines.push(reading.candidate.contour.clone());
    polylines(frame, &outlines, true, style.color, style.outline_px, LINE_8, 0)?;

    let region = reading.candidate.region;
    put_text(
        frame,
        &reading.text,
        Point::new(region.x, region.y - style.text_lift_px),
        FONT_HERSHEY_SIMPLEX,
        style.font_scale,
        style.color,
        style.text_px,
        LINE_8,
        false,
    )?;

    Ok(())
}
