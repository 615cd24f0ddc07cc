//! Command line configuration of the realtime plate reader.
//!
//! `ReaderCliArgs` is what clap parses; `ReaderConfig` is the validated form
//! the binary works with.

use std::path::PathBuf;

use anyhow::bail;
use anyhow::Result;
use clap::Parser;
use opencv::core::Size;

use crate::plate_detection::display::ESC_KEY;
use crate::plate_detection::plate_locator::LocatorParams;
use crate::plate_detection::tesseract_ocr::OcrConfig;
use crate::plate_detection::tesseract_ocr::PLATE_CHARACTERS;
use crate::plate_detection::video_reader::CaptureSource;

/// Reads license plates from a live video feed.
#[derive(Debug, Parser)]
#[command(name = "plate_reader_realtime", version)]
pub struct ReaderCliArgs {
    /// Camera index, `/dev/videoN` path, or video file / stream URI.
    #[arg(long, value_name = "SRC", env = "PLATE_READER_SOURCE", default_value = "0")]
    pub source: String,
    /// Requested capture width.
    #[arg(
        long,
        value_name = "PX",
        env = "PLATE_READER_CAPTURE_WIDTH",
        requires = "capture_height"
    )]
    pub capture_width: Option<i32>,
    /// Requested capture height.
    #[arg(
        long,
        value_name = "PX",
        env = "PLATE_READER_CAPTURE_HEIGHT",
        requires = "capture_width"
    )]
    pub capture_height: Option<i32>,
    #[arg(
        long,
        value_name = "TITLE",
        env = "PLATE_READER_WINDOW_TITLE",
        default_value = "License plate recognition"
    )]
    pub window_title: String,
    #[arg(long, value_name = "PX", env = "PLATE_READER_WINDOW_WIDTH", default_value_t = 800)]
    pub window_width: i32,
    #[arg(long, value_name = "PX", env = "PLATE_READER_WINDOW_HEIGHT", default_value_t = 600)]
    pub window_height: i32,
    /// Directory with the tesseract `*.traineddata` files.
    #[arg(long, value_name = "DIR", env = "PLATE_READER_TESSDATA")]
    pub tessdata: Option<PathBuf>,
    /// Tesseract language.
    #[arg(long, value_name = "LANG", env = "PLATE_READER_LANG", default_value = "eng")]
    pub lang: String,
    /// Characters the OCR is allowed to produce.
    #[arg(
        long,
        value_name = "CHARS",
        env = "PLATE_READER_WHITELIST",
        default_value = PLATE_CHARACTERS
    )]
    pub whitelist: String,
    /// Number of largest contours inspected per frame.
    #[arg(long, value_name = "N", env = "PLATE_READER_MAX_CANDIDATES", default_value_t = 10)]
    pub max_candidates: usize,
    /// Key code that closes the reader.
    #[arg(long, value_name = "CODE", env = "PLATE_READER_EXIT_KEY", default_value_t = ESC_KEY)]
    pub exit_key: i32,
    /// Limit the processing rate.
    #[arg(long, value_name = "FPS", env = "PLATE_READER_MAX_FPS")]
    pub max_fps: Option<u32>,
    /// Log filter used when RUST_LOG is not set.
    #[arg(long, value_name = "LEVEL", env = "PLATE_READER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Clone, Debug)]
pub struct ReaderConfig {
    pub source: CaptureSource,
    pub capture_size: Option<Size>,
    pub window_title: String,
    pub window_size: Size,
    pub ocr: OcrConfig,
    pub locator: LocatorParams,
    pub exit_key: i32,
    pub max_fps: Option<u32>,
    pub log_level: String,
}

impl TryFrom<ReaderCliArgs> for ReaderConfig {
    type Error = anyhow::Error;

    fn try_from(args: ReaderCliArgs) -> Result<Self> {
        if args.source.trim().is_empty() {
            bail!("--source must not be empty");
        }
        let source = match args.source.parse::<CaptureSource>() {
            Ok(source) => source,
            Err(never) => match never {},
        };

        let capture_size = match (args.capture_width, args.capture_height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(Size::new(w, h)),
            (None, None) => None,
            (Some(_), Some(_)) => bail!("Capture width and height must be positive integers"),
            _ => bail!("--capture-width and --capture-height go together"),
        };

        if args.window_width <= 0 || args.window_height <= 0 {
            bail!("Window width and height must be positive integers");
        }
        if args.lang.is_empty() {
            bail!("--lang must not be empty");
        }
        if args.whitelist.is_empty() {
            bail!("--whitelist must contain at least one character");
        }
        if args.max_candidates == 0 {
            bail!("--max-candidates must be at least 1");
        }
        if args.max_fps == Some(0) {
            bail!("--max-fps must be at least 1");
        }
        if !(0..=255).contains(&args.exit_key) {
            bail!("--exit-key must be a key code between 0 and 255");
        }

        let ocr = OcrConfig {
            data_path: args.tessdata,
            lang: args.lang,
            whitelist: args.whitelist,
            ..OcrConfig::default()
        };
        let locator = LocatorParams {
            max_candidates: args.max_candidates,
            ..LocatorParams::default()
        };

        Ok(Self {
            source,
            capture_size,
            window_title: args.window_title,
            window_size: Size::new(args.window_width, args.window_height),
            ocr,
            locator,
            exit_key: args.exit_key,
            max_fps: args.max_fps,
            log_level: args.log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<ReaderConfig> {
        let cli = ReaderCliArgs::try_parse_from(
            std::iter::once("plate_reader_realtime").chain(args.iter().copied()),
        )?;
        ReaderConfig::try_from(cli)
    }

    #[test]
    fn defaults_read_the_first_camera() {
        let config = parse(&[]).unwrap();

        assert_eq!(config.source, CaptureSource::Device(0));
        assert_eq!(config.capture_size, None);
        assert_eq!(config.window_size, Size::new(800, 600));
        assert_eq!(config.exit_key, 27);
        assert_eq!(config.ocr.lang, "eng");
        assert_eq!(config.ocr.engine_mode, 1);
        assert_eq!(config.ocr.whitelist, PLATE_CHARACTERS);
        assert_eq!(config.locator.max_candidates, 10);
        assert_eq!(config.max_fps, None);
    }

    #[test]
    fn source_accepts_files() {
        let config = parse(&["--source", "data/cars.mp4"]).unwrap();
        assert_eq!(
            config.source,
            CaptureSource::Uri("data/cars.mp4".to_string())
        );
    }

    #[test]
    fn capture_size_needs_both_sides() {
        assert!(parse(&["--capture-width", "1280"]).is_err());
        let config = parse(&["--capture-width", "1280", "--capture-height", "720"]).unwrap();
        assert_eq!(config.capture_size, Some(Size::new(1280, 720)));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(parse(&["--window-width", "0"]).is_err());
        assert!(parse(&["--max-candidates", "0"]).is_err());
        assert!(parse(&["--max-fps", "0"]).is_err());
        assert!(parse(&["--exit-key", "300"]).is_err());
        assert!(parse(&["--whitelist", ""]).is_err());
        assert!(parse(&["--source", " "]).is_err());
    }

    #[test]
    fn capture_size_must_be_positive() {
        let zero: &[&str] = &["--capture-width", "0", "--capture-height", "720"];
        let negative: &[&str] = &["--capture-width=-1", "--capture-height", "720"];
        for args in [zero, negative] {
            let err = parse(args).unwrap_err();
            assert!(
                err.to_string().contains("must be positive"),
                "unexpected error: {err}"
            );
        }
    }

    #[test]
    fn flags_fall_back_to_environment() {
        // No other test looks at the log level.
        std::env::set_var("PLATE_READER_LOG_LEVEL", "debug");
        let from_env = parse(&[]).unwrap();
        let from_flag = parse(&["--log-level", "warn"]).unwrap();
        std::env::remove_var("PLATE_READER_LOG_LEVEL");

        assert_eq!(from_env.log_level, "debug");
        assert_eq!(from_flag.log_level, "warn");
    }

    #[test]
    fn tessdata_and_language_reach_the_ocr() {
        let config = parse(&["--tessdata", "models", "--lang", "licence"]).unwrap();
        assert_eq!(config.ocr.data_path, Some(PathBuf::from("models")));
        assert_eq!(config.ocr.lang, "licence");
    }
}
