//! Display sink: pushes frames to the panel driver.
//!
//! The driver contract is all-or-nothing: either the panel accepted the
//! whole frame, or the frame is discarded and the previous physical image
//! stays put. A bistable panel keeps its last image unpowered, so an
//! undelivered frame is a shrug, not an outage.

use std::path::PathBuf;

use inkboard_types::{Bitmap, Frame};
use thiserror::Error;
use tracing::{debug, warn};

/// Hardware write failure.
#[derive(Debug, Error)]
pub enum DisplayError {
    /// The panel rejected or failed the write.
    #[error("display I/O error: {0}")]
    Io(String),
}

/// A physical (or simulated) panel.
///
/// `draw` must be atomic from the caller's perspective: a failed draw must
/// leave the previously displayed image intact. `sleep` drops the panel
/// into its low-power state between refreshes.
pub trait DisplayDriver: Send {
    /// Push one full bitmap to the panel.
    fn draw(&mut self, bitmap: &Bitmap) -> Result<(), DisplayError>;

    /// Enter low-power state until the next draw.
    fn sleep(&mut self);
}

/// Driver that writes frames to a file instead of hardware.
///
/// Stands in for the panel during development and on machines without the
/// e-paper HAT attached.
#[derive(Debug)]
pub struct SimulatorDriver {
    path: PathBuf,
}

impl SimulatorDriver {
    /// Write frames to `path`, replacing the previous one each time.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DisplayDriver for SimulatorDriver {
    fn draw(&mut self, bitmap: &Bitmap) -> Result<(), DisplayError> {
        std::fs::write(&self.path, &bitmap.data).map_err(|e| DisplayError::Io(e.to_string()))
    }

    fn sleep(&mut self) {
        debug!(path = %self.path.display(), "simulated panel sleeping");
    }
}

/// Owns the driver and the delivered/not-delivered decision.
pub struct DisplaySink {
    driver: Box<dyn DisplayDriver>,
    last_delivered_ms: Option<u64>,
}

impl DisplaySink {
    /// Wrap a driver.
    pub fn new(driver: Box<dyn DisplayDriver>) -> Self {
        Self {
            driver,
            last_delivered_ms: None,
        }
    }

    /// Snapshot timestamp of the last frame the panel accepted.
    pub fn last_delivered_ms(&self) -> Option<u64> {
        self.last_delivered_ms
    }

    /// Push a frame to the panel and sleep it.
    ///
    /// Returns whether the frame was delivered. An undelivered frame is
    /// dropped; the previous physical image persists.
    pub fn present(&mut self, frame: &Frame) -> bool {
        match self.driver.draw(&frame.bitmap) {
            Ok(()) => {
                self.driver.sleep();
                self.last_delivered_ms = Some(frame.snapshot_ms);
                debug!(snapshot_ms = frame.snapshot_ms, "frame delivered");
                true
            }
            Err(err) => {
                warn!(error = %err, "frame not delivered; previous image persists");
                false
            }
        }
    }
}
