use super::bounding_box_render::render_plate;
use super::bounding_box_render::OverlayStyle;
use super::plate_binarizer::binarize_plate;
use super::plate_binarizer::BinarizeParams;
use super::plate_locator::PlateLocator;
use super::tesseract_ocr::sanitize_plate_text;
use super::tesseract_ocr::TextRecognizer;
use super::PlateError;
use super::PlateReading;

use opencv::prelude::Mat;
use opencv::prelude::MatTraitConst;

use tracing::debug;
use tracing::warn;

/// Runs one frame through plate search, binarization, OCR and overlay.
pub struct PlateReader<R: TextRecognizer> {
    locator: PlateLocator,
    binarize: BinarizeParams,
    recognizer: R,
    style: OverlayStyle,
}

impl<R: TextRecognizer> PlateReader<R> {
    pub fn new(
        locator: PlateLocator,
        binarize: BinarizeParams,
        recognizer: R,
        style: OverlayStyle,
    ) -> Self {
        Self {
            locator,
            binarize,
            recognizer,
            style,
        }
    }

    /// Reads the first plate candidate of `frame` and draws it on the frame.
    ///
    /// Only the first four-sided contour is tried. When the recognizer fails the
    /// plate is still drawn, with no text.
    pub fn process(&mut self, frame: &mut Mat) -> Result<Option<PlateReading>, PlateError> {
        let candidate = match self.locator.locate(frame)? {
            Some(candidate) => candidate,
            None => return Ok(None),
        };

        let plate_region = frame.apply_1(candidate.region)?;
        let binary = binarize_plate(&plate_region, &self.binarize)?;

        let text = match self.recognizer.recognize(&binary) {
            Ok(raw) => sanitize_plate_text(&raw),
            Err(e) => {
                warn!("OCR failed on plate {:?}: {}", candidate.region, e);
                String::new()
            }
        };
        debug!("Plate {:?} reads {:?}", candidate.region, text);

        let reading = PlateReading::new(candidate, text);
        render_plate(frame, &reading, &self.style)?;
        Ok(Some(reading))
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }
}
