use super::PlateError;

use opencv::core::Size;
use opencv::prelude::Mat;
use opencv::prelude::MatTraitConst;
use opencv::prelude::VideoCaptureTrait;
use opencv::prelude::VideoCaptureTraitConst;
use opencv::videoio::VideoCapture;
use opencv::videoio::CAP_ANY;
use opencv::videoio::CAP_PROP_FRAME_HEIGHT;
use opencv::videoio::CAP_PROP_FRAME_WIDTH;

use std::fmt;
use std::str::FromStr;

use tracing::debug;
use tracing::info;
use tracing::warn;

/// Where frames come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureSource {
    /// Camera by index, `/dev/video2` is index 2.
    Device(i32),
    /// Video file or stream URL.
    Uri(String),
}

impl Default for CaptureSource {
    fn default() -> Self {
        CaptureSource::Device(0)
    }
}

impl FromStr for CaptureSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(index) = s.parse::<i32>() {
            return Ok(CaptureSource::Device(index));
        }
        if let Some(index) = s.strip_prefix("/dev/video") {
            if !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()) {
                if let Ok(index) = index.parse::<i32>() {
                    return Ok(CaptureSource::Device(index));
                }
            }
        }
        Ok(CaptureSource::Uri(s.to_string()))
    }
}

impl fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureSource::Device(index) => write!(f, "camera #{index}"),
            CaptureSource::Uri(uri) => write!(f, "{uri}"),
        }
    }
}

pub struct VideoReader {
    capture: VideoCapture,
    source: CaptureSource,
    frames: u64,
}

impl VideoReader {
    pub fn open(source: &CaptureSource, frame_size: Option<Size>) -> Result<Self, PlateError> {
        let mut capture = match source {
            CaptureSource::Device(index) => VideoCapture::new(*index, CAP_ANY)?,
            CaptureSource::Uri(uri) => VideoCapture::from_file(uri, CAP_ANY)?,
        };

        if !capture.is_opened()? {
            return Err(PlateError::CaptureOpen {
                uri: source.to_string(),
            });
        }

        if let Some(size) = frame_size {
            for (prop, value) in [
                (CAP_PROP_FRAME_WIDTH, size.width),
                (CAP_PROP_FRAME_HEIGHT, size.height),
            ] {
                if !capture.set(prop, value as f64)? {
                    debug!("Capture refused property {} = {}", prop, value);
                }
            }
        }

        info!("Reading frames from {}", source);
        Ok(Self {
            capture,
            source: source.clone(),
            frames: 0,
        })
    }

    /// Next frame, or `None` once the source stops delivering.
    pub fn next_frame(&mut self) -> Result<Option<Mat>, PlateError> {
        let mut image = Mat::default();
        let grabbed = self.capture.read(&mut image)?;

        if !grabbed || image.empty() {
            warn!("No frame from {} after {} frames", self.source, self.frames);
            return Ok(None);
        }

        self.frames += 1;
        debug!("Frame {}", self.frames);
        Ok(Some(image))
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Drop for VideoReader {
    fn drop(&mut self) {
        debug!("Releasing {}", self.source);
        if let Err(e) = self.capture.release() {
            warn!("Cannot release {}: {}", self.source, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use opencv::core::Scalar;
    use opencv::core::CV_8UC3;
    use opencv::prelude::VideoWriterTrait;
    use opencv::prelude::VideoWriterTraitConst;
    use opencv::videoio::VideoWriter;

    use std::path::PathBuf;

    fn write_clip(name: &str, frames: usize) -> PathBuf {
        let path = std::env::temp_dir().join(format!("{}_{}.avi", name, std::process::id()));
        let size = Size::new(320, 240);
        let mut writer = VideoWriter::new(
            path.to_str().unwrap(),
            VideoWriter::fourcc('M', 'J', 'P', 'G').unwrap(),
            10.0,
            size,
            true,
        )
        .unwrap();
        assert!(writer.is_opened().unwrap());
        for i in 0..frames {
            let frame = Mat::new_size_with_default(size, CV_8UC3, Scalar::all(20.0 * i as f64))
                .unwrap();
            writer.write(&frame).unwrap();
        }
        writer.release().unwrap();
        path
    }

    #[test]
    fn file_source_ends_after_its_last_frame() {
        let path = write_clip("plate_reader_clip", 5);
        let source = CaptureSource::Uri(path.to_string_lossy().into_owned());

        let mut reader = VideoReader::open(&source, None).unwrap();
        for _ in 0..5 {
            let frame = reader.next_frame().unwrap().expect("a frame");
            assert_eq!(frame.cols(), 320);
            assert_eq!(frame.rows(), 240);
        }
        assert!(reader.next_frame().unwrap().is_none());
        assert_eq!(reader.frames(), 5);

        drop(reader);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn numbers_are_device_indexes() {
        assert_eq!("0".parse::<CaptureSource>().unwrap(), CaptureSource::Device(0));
        assert_eq!("3".parse::<CaptureSource>().unwrap(), CaptureSource::Device(3));
    }

    #[test]
    fn dev_video_paths_are_device_indexes() {
        assert_eq!(
            "/dev/video2".parse::<CaptureSource>().unwrap(),
            CaptureSource::Device(2)
        );
        assert_eq!(
            "/dev/video".parse::<CaptureSource>().unwrap(),
            CaptureSource::Uri("/dev/video".to_string())
        );
    }

    #[test]
    fn anything_else_is_a_uri() {
        assert_eq!(
            "data/cars.mp4".parse::<CaptureSource>().unwrap(),
            CaptureSource::Uri("data/cars.mp4".to_string())
        );
        assert_eq!(
            "rtsp://camera.local/stream".parse::<CaptureSource>().unwrap(),
            CaptureSource::Uri("rtsp://camera.local/stream".to_string())
        );
    }

    #[test]
    fn default_source_is_first_camera() {
        assert_eq!(CaptureSource::default(), CaptureSource::Device(0));
        assert_eq!(CaptureSource::default().to_string(), "camera #0");
    }

    #[test]
    fn missing_file_fails_to_open() {
        let source = CaptureSource::Uri("does/not/exist.mp4".to_string());
        assert!(matches!(
            VideoReader::open(&source, None),
            Err(PlateError::CaptureOpen { .. })
        ));
    }
}
