use super::PlateError;

use leptess::tesseract;
use leptess::tesseract::TessApi;

use opencv::prelude::Mat;
use opencv::prelude::MatTraitConst;
use opencv::prelude::MatTraitConstManual;

use std::ffi::CStr;
use std::ffi::CString;
use std::path::PathBuf;

use tesseract_plumbing::TessBaseApi;

use tracing::debug;
use tracing::info;

pub const PLATE_CHARACTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Tesseract page segmentation mode for a single line of text.
const SINGLE_LINE_SEGMENTATION: &str = "7";

/// Reads the text out of a binarized plate image.
pub trait TextRecognizer {
    fn recognize(&mut self, binary: &Mat) -> Result<String, PlateError>;
}

#[derive(Clone, Debug)]
pub struct OcrConfig {
    /// Directory holding the `*.traineddata` files. `None` lets tesseract look it up.
    pub data_path: Option<PathBuf>,
    pub lang: String,
    /// 1 is the LSTM only engine.
    pub engine_mode: u32,
    pub whitelist: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            lang: "eng".to_string(),
            engine_mode: 1,
            whitelist: PLATE_CHARACTERS.to_string(),
        }
    }
}

pub struct TesseractReader {
    ocr: TessApi,
}

impl TesseractReader {
    pub fn new(config: &OcrConfig) -> Result<Self, PlateError> {
        let data_path = config
            .data_path
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned());

        let mut api = tesseract::TessApi::new(data_path.as_deref(), &config.lang).map_err(|e| {
            PlateError::OcrInit {
                lang: config.lang.clone(),
                reason: format!("{:?}", e),
            }
        })?;

        // Start again with the requested engine, TessApi::new only knows the default one
        let data_path_cstr = data_path.map(CString::new).transpose()?;
        let lang = CString::new(config.lang.as_str())?;
        api.raw
            .init_4(data_path_cstr.as_deref(), Some(lang.as_ref()), config.engine_mode)
            .map_err(|source| PlateError::OcrEngine {
                lang: config.lang.clone(),
                source,
            })?;

        let mut reader = Self { ocr: api };
        reader.set_variable("tessedit_pageseg_mode", SINGLE_LINE_SEGMENTATION)?;
        reader.set_variable("tessedit_char_whitelist", &config.whitelist)?;

        info!(
            "Tesseract ready, language {} engine mode {}",
            config.lang, config.engine_mode
        );
        Ok(reader)
    }

    fn set_variable(&mut self, name: &str, value: &str) -> Result<(), PlateError> {
        let name_cstr = CString::new(name)?;
        let value_cstr = CString::new(value)?;
        self.ocr
            .raw
            .set_variable(&name_cstr, &value_cstr)
            .map_err(|source| PlateError::OcrVariable {
                name: name.to_string(),
                source,
            })
    }
}

impl TextRecognizer for TesseractReader {
    fn recognize(&mut self, binary: &Mat) -> Result<String, PlateError> {
        if binary.empty() {
            return Err(PlateError::EmptyFrame);
        }
        // Tesseract reads rows back to back
        let copy;
        let contiguous = if binary.is_continuous() {
            binary
        } else {
            copy = binary.clone();
            &copy
        };

        let cols = contiguous.cols();
        let rows = contiguous.rows();
        let bytes_per_pixel = contiguous.elem_size()? as i32;
        self.ocr.raw.set_image(
            contiguous.data_bytes()?,
            cols,
            rows,
            bytes_per_pixel,
            cols * bytes_per_pixel,
        )?;

        let text = utf8_text(&mut self.ocr.raw)?;
        debug!("OCR {:?}", text.trim());
        Ok(text)
    }
}

/// Text of the last recognized image. Tesseract hands back nothing when it
/// cannot recognize, which is reported as an error instead of a panic.
fn utf8_text(raw: &mut TessBaseApi) -> Result<String, PlateError> {
    let text = raw
        .get_utf8_text()
        .map_err(|e| PlateError::OcrText(e.to_string()))?;
    let text: &CStr = text.as_ref();
    let text = text
        .to_str()
        .map_err(|e| PlateError::OcrText(e.to_string()))?;
    Ok(text.to_string())
}

/// Keeps the ASCII letters and digits of an OCR result, dropping spaces,
/// punctuation and line breaks.
pub fn sanitize_plate_text(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}
