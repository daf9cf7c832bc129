use std::fmt;

/// Errors that can occur when driving a gaze recording session.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Cannot {0}: invalid or expired license")]
    License(&'static str),

    #[error("Tracker context released (session stopped)")]
    Closed,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Tracker runtime error: {0}")]
    Backend(String),

    #[error("Failed to serialize gaze records: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Thread-safe last-error storage for the C FFI layer.
pub(crate) struct LastError {
    message: std::sync::Mutex<String>,
}

impl LastError {
    pub const fn new() -> Self {
        Self {
            message: std::sync::Mutex::new(String::new()),
        }
    }

    pub fn set(&self, err: &TrackerError) {
        self.set_message(err);
    }

    pub fn set_message(&self, msg: impl fmt::Display) {
        if let Ok(mut slot) = self.message.lock() {
            *slot = fmt::format(format_args!("{}\0", msg));
        }
    }

    pub fn as_ptr(&self) -> *const std::ffi::c_char {
        match self.message.lock() {
            Ok(msg) if !msg.is_empty() => msg.as_ptr() as *const std::ffi::c_char,
            _ => std::ptr::null(),
        }
    }
}
