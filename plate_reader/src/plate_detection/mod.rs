pub mod bounding_box_render;
pub mod display;
pub mod plate_binarizer;
pub mod plate_locator;
pub mod plate_reader;
pub mod tesseract_ocr;
pub mod video_reader;

use opencv::core::Point;
use opencv::core::Rect;
use opencv::core::Vector;
use opencv::imgproc::cvt_color;
use opencv::imgproc::COLOR_BGR2GRAY;
use opencv::prelude::Mat;
use opencv::prelude::MatTraitConst;
use tesseract_plumbing::TessBaseApiInitError;
use tesseract_plumbing::TessBaseApiSetImageSafetyError;
use tesseract_plumbing::TessBaseApiSetVariableError;
use thiserror::Error;

/// Four-sided contour found in a frame, with its bounding box.
#[derive(Clone, Debug)]
pub struct PlateCandidate {
    pub contour: Vector<Point>,
    pub region: Rect,
}

/// A located plate and the text read from it.
#[derive(Clone, Debug)]
pub struct PlateReading {
    pub candidate: PlateCandidate,
    pub text: String,
}

impl PlateReading {
    fn new(candidate: PlateCandidate, text: String) -> Self {
        return Self { candidate, text };
    }
}

#[derive(Debug, Error)]
pub enum PlateError {
    #[error("failed to open video source {uri:?}")]
    CaptureOpen { uri: String },
    #[error("failed to initialize tesseract with language {lang:?}: {reason}")]
    OcrInit { lang: String, reason: String },
    #[error("tesseract refused to start with language {lang:?}")]
    OcrEngine {
        lang: String,
        #[source]
        source: TessBaseApiInitError,
    },
    #[error("tesseract rejected variable {name}")]
    OcrVariable {
        name: String,
        #[source]
        source: TessBaseApiSetVariableError,
    },
    #[error("tesseract rejected the plate image")]
    OcrImage(#[from] TessBaseApiSetImageSafetyError),
    #[error("text handed to tesseract contains a NUL byte")]
    NulByte(#[from] std::ffi::NulError),
    #[error("tesseract could not produce text: {0}")]
    OcrText(String),
    #[error("cannot process an empty frame")]
    EmptyFrame,
    #[error(transparent)]
    OpenCv(#[from] opencv::Error),
}

/// Single-channel copy of `image`, converting from BGR when needed.
pub(crate) fn grey_image(image: &Mat) -> Result<Mat, PlateError> {
    if image.channels() == 1 {
        return Ok(image.clone());
    }
    let mut grey = Mat::default();
    cvt_color(image, &mut grey, COLOR_BGR2GRAY, 0)?;
    Ok(grey)
}
