use super::grey_image;
use super::PlateCandidate;
use super::PlateError;

use opencv::core::Point;
use opencv::core::Rect;
use opencv::core::Vector;
use opencv::core::BORDER_DEFAULT;

use opencv::imgproc::approx_poly_dp;
use opencv::imgproc::arc_length;
use opencv::imgproc::bilateral_filter;
use opencv::imgproc::bounding_rect;
use opencv::imgproc::canny;
use opencv::imgproc::contour_area;
use opencv::imgproc::find_contours;
use opencv::imgproc::CHAIN_APPROX_SIMPLE;
use opencv::imgproc::RETR_TREE;

use opencv::prelude::Mat;
use opencv::prelude::MatTraitConst;

use tracing::debug;

/// Tuning of the edge based plate search.
#[derive(Clone, Debug)]
pub struct LocatorParams {
    pub bilateral_diameter: i32,
    pub bilateral_sigma_color: f64,
    pub bilateral_sigma_space: f64,
    pub canny_low: f64,
    pub canny_high: f64,
    pub canny_aperture: i32,
    /// Only the largest contours are approximated.
    pub max_candidates: usize,
    /// Polygon approximation tolerance, as a fraction of the contour perimeter.
    pub approx_epsilon_ratio: f64,
}

impl Default for LocatorParams {
    fn default() -> Self {
        Self {
            bilateral_diameter: 11,
            bilateral_sigma_color: 17.0,
            bilateral_sigma_space: 17.0,
            canny_low: 30.0,
            canny_high: 200.0,
            canny_aperture: 3,
            max_candidates: 10,
            approx_epsilon_ratio: 0.018,
        }
    }
}

/// Finds the largest four-sided contour of a frame and reports it as a plate candidate.
pub struct PlateLocator {
    params: LocatorParams,
}

impl PlateLocator {
    pub fn new(params: LocatorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LocatorParams {
        &self.params
    }

    pub fn locate(&self, frame: &Mat) -> Result<Option<PlateCandidate>, PlateError> {
        if frame.empty() {
            return Err(PlateError::EmptyFrame);
        }

        let grey = grey_image(frame)?;

        // Smooth surfaces but keep the plate borders sharp
        let mut filtered = Mat::default();
        bilateral_filter(
            &grey,
            &mut filtered,
            self.params.bilateral_diameter,
            self.params.bilateral_sigma_color,
            self.params.bilateral_sigma_space,
            BORDER_DEFAULT,
        )?;

        let mut edged = Mat::default();
        canny(
            &filtered,
            &mut edged,
            self.params.canny_low,
            self.params.canny_high,
            self.params.canny_aperture,
            false,
        )?;

        let mut contours = Vector::<Vector<Point>>::default();
        find_contours(
            &edged,
            &mut contours,
            RETR_TREE,
            CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )?;
        debug!("Found {} contours", contours.len());

        for contour in largest_contours(contours)?
            .into_iter()
            .take(self.params.max_candidates)
        {
            let perimeter = arc_length(&contour, true)?;
            let mut approx = Vector::<Point>::default();
            approx_poly_dp(
                &contour,
                &mut approx,
                self.params.approx_epsilon_ratio * perimeter,
                true,
            )?;

            if approx.len() == 4 {
                let region = clip_to_frame(bounding_rect(&approx)?, frame.cols(), frame.rows());
                debug!("Plate candidate {:?}", region);
                return Ok(Some(PlateCandidate {
                    contour: approx,
                    region,
                }));
            }
        }

        Ok(None)
    }
}

/// Contours ordered by absolute area, largest first. Ties keep their detection order.
fn largest_contours(contours: Vector<Vector<Point>>) -> Result<Vec<Vector<Point>>, PlateError> {
    let mut with_area = Vec::with_capacity(contours.len());
    for contour in contours {
        let area = contour_area(&contour, false)?;
        with_area.push((area, contour));
    }
    with_area.sort_by(|a, b| b.0.total_cmp(&a.0));
    Ok(with_area.into_iter().map(|(_, contour)| contour).collect())
}

fn clip_to_frame(rect: Rect, cols: i32, rows: i32) -> Rect {
    let x = rect.x.clamp(0, cols);
    let y = rect.y.clamp(0, rows);
    let right = (rect.x + rect.width).clamp(x, cols);
    let bottom = (rect.y + rect.height).clamp(y, rows);
    Rect::new(x, y, right - x, bottom - y)
}

#[cfg(test)]
mod tests {
    use super::*;

    use opencv::core::Scalar;
    use opencv::core::CV_8UC3;
    use opencv::imgproc::circle;
    use opencv::imgproc::rectangle;
    use opencv::imgproc::FILLED;
    use opencv::imgproc::LINE_8;

    fn white_frame() -> Mat {
        Mat::new_rows_cols_with_default(480, 640, CV_8UC3, Scalar::all(255.0)).unwrap()
    }

    fn frame_with_plate(plate: Rect) -> Mat {
        let mut frame = white_frame();
        rectangle(&mut frame, plate, Scalar::all(0.0), FILLED, LINE_8, 0).unwrap();
        frame
    }

    #[test]
    fn finds_a_dark_quadrilateral() {
        let plate = Rect::new(200, 180, 240, 80);
        let locator = PlateLocator::new(LocatorParams::default());

        let candidate = locator
            .locate(&frame_with_plate(plate))
            .unwrap()
            .expect("a plate candidate");

        assert_eq!(candidate.contour.len(), 4);
        let region = candidate.region;
        assert!((region.x - plate.x).abs() <= 3, "{:?}", region);
        assert!((region.y - plate.y).abs() <= 3, "{:?}", region);
        assert!((region.width - plate.width).abs() <= 4, "{:?}", region);
        assert!((region.height - plate.height).abs() <= 4, "{:?}", region);
    }

    #[test]
    fn blank_frame_has_no_candidate() {
        let locator = PlateLocator::new(LocatorParams::default());
        assert!(locator.locate(&white_frame()).unwrap().is_none());
    }

    #[test]
    fn round_shapes_are_not_plates() {
        let mut frame = white_frame();
        circle(
            &mut frame,
            Point::new(320, 240),
            120,
            Scalar::all(0.0),
            FILLED,
            LINE_8,
            0,
        )
        .unwrap();
        let locator = PlateLocator::new(LocatorParams::default());
        assert!(locator.locate(&frame).unwrap().is_none());
    }

    #[test]
    fn empty_frame_is_rejected() {
        let locator = PlateLocator::new(LocatorParams::default());
        assert!(matches!(
            locator.locate(&Mat::default()),
            Err(PlateError::EmptyFrame)
        ));
    }

    #[test]
    fn regions_are_clipped_to_the_frame() {
        assert_eq!(
            clip_to_frame(Rect::new(-5, 10, 30, 500), 640, 480),
            Rect::new(0, 10, 25, 470)
        );
        assert_eq!(
            clip_to_frame(Rect::new(10, 20, 30, 40), 640, 480),
            Rect::new(10, 20, 30, 40)
        );
    }
}
