use crate::backend::GazeBackend;
use crate::config::MAX_QUEUE_CAPACITY;
use crate::transform::CoordinateTransform;
use crate::types::{GazePoint, RawGaze};
use crate::{Result, TrackerError};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Backend fed from a tracker runtime that delivers samples on its own thread.
///
/// Producers push [`RawGaze`] through a [`GazeFeed`]; the samples sit in a
/// bounded queue until the owning session calls `update()`, which drains them
/// through the coordinate transform on the caller's thread.
pub struct ChannelBackend {
    receiver: Receiver<RawGaze>,
    timeout: Duration,
    capacity: usize,
    transform: CoordinateTransform,
    disconnected: bool,
}

/// Producer handle for a [`ChannelBackend`]. Cheap to clone and `Send`.
#[derive(Clone)]
pub struct GazeFeed {
    sender: Sender<RawGaze>,
    dropped: Arc<AtomicU64>,
}

impl ChannelBackend {
    /// Create a backend with a queue of `capacity` samples, clamped to
    /// `1..=MAX_QUEUE_CAPACITY`. `update()` waits at most `timeout` for the
    /// first sample of each pump.
    pub fn new(capacity: usize, timeout: Duration) -> (ChannelBackend, GazeFeed) {
        let capacity = capacity.clamp(1, MAX_QUEUE_CAPACITY);
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        let backend = ChannelBackend {
            receiver,
            timeout,
            capacity,
            transform: CoordinateTransform::default(),
            disconnected: false,
        };
        let feed = GazeFeed {
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (backend, feed)
    }

    pub fn transform(&self) -> CoordinateTransform {
        self.transform
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl GazeBackend for ChannelBackend {
    fn add_or_update_display_area(&mut self, width: f32, height: f32) -> Result<()> {
        log::debug!("Display area set to {}x{}", width, height);
        self.transform.width = width;
        self.transform.height = height;
        Ok(())
    }

    fn set_origin_offset(&mut self, x: f32, y: f32) -> Result<()> {
        log::debug!("Origin offset set to ({}, {})", x, y);
        self.transform.offset_x = x;
        self.transform.offset_y = y;
        Ok(())
    }

    fn wait_and_update(&mut self, sink: &mut dyn FnMut(GazePoint)) -> Result<()> {
        let first = match self.receiver.recv_timeout(self.timeout) {
            Ok(raw) => raw,
            Err(RecvTimeoutError::Timeout) => return Ok(()),
            Err(RecvTimeoutError::Disconnected) => {
                if !self.disconnected {
                    log::debug!("All gaze feeds dropped, no more samples will arrive");
                    self.disconnected = true;
                }
                return Ok(());
            }
        };
        sink(self.transform.apply(first));

        // Bounded so a producer faster than us cannot pin this call.
        for raw in self.receiver.try_iter().take(self.capacity) {
            sink(self.transform.apply(raw));
        }
        Ok(())
    }
}

impl GazeFeed {
    /// Queue a sample for the next `update()`.
    ///
    /// Returns `Ok(false)` if the queue is full and the sample was dropped, and
    /// `Err(TrackerError::Closed)` once the backend has been released.
    pub fn push(&self, sample: RawGaze) -> Result<bool> {
        match self.sender.try_send(sample) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::trace!("Gaze queue full, dropping sample");
                Ok(false)
            }
            Err(TrySendError::Disconnected(_)) => Err(TrackerError::Closed),
        }
    }

    /// Number of samples dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
