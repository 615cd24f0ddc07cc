use std::io::Write;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use plate_reader::config::ReaderCliArgs;
use plate_reader::config::ReaderConfig;
use plate_reader::plate_detection::bounding_box_render::OverlayStyle;
use plate_reader::plate_detection::display::DisplayWindow;
use plate_reader::plate_detection::plate_binarizer::BinarizeParams;
use plate_reader::plate_detection::plate_locator::PlateLocator;
use plate_reader::plate_detection::plate_reader::PlateReader;
use plate_reader::plate_detection::tesseract_ocr::TesseractReader;
use plate_reader::plate_detection::video_reader::VideoReader;
use plate_reader::utils::FpsLimiter;

/// Milliseconds the window waits for a key on every frame.
const KEY_POLL_MS: i32 = 1;

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(config: ReaderConfig) -> Result<()> {
    let mut video_input = VideoReader::open(&config.source, config.capture_size)
        .with_context(|| format!("Cannot open {}", config.source))?;

    let ocr = TesseractReader::new(&config.ocr).context("Cannot initialize the OCR engine")?;

    let mut plate_reader = PlateReader::new(
        PlateLocator::new(config.locator.clone()),
        BinarizeParams::default(),
        ocr,
        OverlayStyle::default(),
    );

    let window = DisplayWindow::open(&config.window_title, config.window_size, config.exit_key)
        .context("Cannot open the display window")?;
    let mut fps_limiter = config.max_fps.map(FpsLimiter::new);

    info!("Reading plates, press key {} to stop", config.exit_key);
    while let Some(mut frame) = video_input.next_frame()? {
        if let Some(reading) = plate_reader.process(&mut frame)? {
            info!(
                "Frame {} plate {:?} at {:?}",
                video_input.frames(),
                reading.text,
                reading.candidate.region
            );
        }

        window.show(&frame)?;

        if window.poll_exit(KEY_POLL_MS)? {
            info!("Exit key pressed");
            break;
        }

        if let Some(limiter) = fps_limiter.as_mut() {
            limiter.wait();
        }
    }

    info!("Done after {} frames", video_input.frames());
    Ok(())
}

fn main() {
    let args = ReaderCliArgs::parse();
    init_tracing(&args.log_level);

    let config = match ReaderConfig::try_from(args) {
        Ok(config) => config,
        Err(err) => {
            report_fatal(&err, &mut std::io::stderr());
            std::process::exit(2);
        }
    };

    if let Err(err) = run(config) {
        report_fatal(&err, &mut std::io::stderr());
        std::process::exit(1);
    }
}

/// Fatal errors bypass the log filter so they show even with logging off.
fn report_fatal(err: &anyhow::Error, out: &mut impl Write) {
    let _ = writeln!(out, "Error: {err:#}");
}
