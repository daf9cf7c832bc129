//! # tobii-recorder - licensed gaze recording sessions
//!
//! Wraps a gaze tracker runtime behind a small session API. Provides:
//! - Display-area and origin-offset configuration of the tracker
//! - A recording gate (start/pause/stop) checked against a license policy
//! - An in-memory sample buffer filled synchronously by `update()`
//! - Record marshaling and a C FFI for scripting-language bindings
//!
//! ## Quick Start
//! ```no_run
//! use tobii_recorder::{DisplayArea, RawGaze, SessionConfig, TrackerSession, Validity};
//!
//! let config = SessionConfig::from_env(DisplayArea::new(2560.0, 1440.0, 0.0).unwrap());
//! let (mut session, feed) = TrackerSession::open(&config, "int.lab2024").unwrap();
//!
//! // The tracker runtime pushes samples from its own thread.
//! std::thread::spawn(move || {
//!     let _ = feed.push(RawGaze { x: 0.5, y: 0.5, validity: Validity::Valid, timestamp_us: 0 });
//! });
//!
//! session.start().unwrap();
//! session.update().unwrap();
//! for point in session.data().unwrap() {
//!     println!("{} {} {}", point.x, point.y, point.validity);
//! }
//! session.stop();
//! ```

pub mod error;
pub mod types;
pub mod license;
pub mod config;
pub mod backend;
pub mod transform;
pub mod channel;
pub mod session;
pub mod record;
pub mod ffi;

pub use backend::GazeBackend;
pub use channel::{ChannelBackend, GazeFeed};
pub use config::SessionConfig;
pub use error::TrackerError;
pub use license::{Clock, FixedClock, LicensePolicy, SystemClock};
pub use record::{records_to_json, GazeRecord};
pub use session::TrackerSession;
pub use types::*;

/// Result type alias for tobii-recorder operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
