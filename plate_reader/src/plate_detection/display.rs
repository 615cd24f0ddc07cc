use opencv::core::Size;
use opencv::highgui::destroy_window;
use opencv::highgui::imshow;
use opencv::highgui::named_window;
use opencv::highgui::resize_window;
use opencv::highgui::wait_key;
use opencv::highgui::WINDOW_NORMAL;
use opencv::prelude::Mat;

use tracing::debug;
use tracing::warn;

use crate::plate_detection::PlateError;

pub const ESC_KEY: i32 = 27;

/// Resizable on-screen window showing the annotated frames.
pub struct DisplayWindow {
    title: String,
    exit_key: i32,
}

impl DisplayWindow {
    pub fn open(title: &str, size: Size, exit_key: i32) -> Result<Self, PlateError> {
        named_window(title, WINDOW_NORMAL)?;
        resize_window(title, size.width, size.height)?;
        debug!("Window {:?} opened at {}x{}", title, size.width, size.height);
        Ok(Self {
            title: title.to_string(),
            exit_key,
        })
    }

    pub fn show(&self, frame: &Mat) -> Result<(), PlateError> {
        imshow(&self.title, frame)?;
        Ok(())
    }

    /// Pumps the window events for `delay_ms` and reports whether the exit key was hit.
    pub fn poll_exit(&self, delay_ms: i32) -> Result<bool, PlateError> {
        let key = wait_key(delay_ms)?;
        Ok(is_exit_key(key, self.exit_key))
    }
}

impl Drop for DisplayWindow {
    fn drop(&mut self) {
        debug!("Closing window {:?}", self.title);
        if let Err(e) = destroy_window(&self.title) {
            warn!("Cannot close window {:?}: {}", self.title, e);
        }
    }
}

/// Some backends report modifier state in the upper bits, only the low byte is the key.
fn is_exit_key(key: i32, exit_key: i32) -> bool {
    key >= 0 && (key & 0xFF) == exit_key
}
