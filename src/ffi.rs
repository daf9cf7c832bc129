//! C FFI layer for tobii-recorder.
//!
//! Provides an opaque handle-based API for C/C++ consumers and scripting
//! language bindings. The generated C header is written to
//! `include/tobii_recorder.h` by cbindgen.

use crate::backend::GazeBackend;
use crate::channel::{ChannelBackend, GazeFeed};
use crate::config::SessionConfig;
use crate::error::LastError;
use crate::license::{Clock, LicensePolicy, SystemClock};
use crate::record::{records_to_json, GazeRecord};
use crate::session::TrackerSession;
use crate::types::{DisplayArea, GazePoint, RawGaze, Validity};
use crate::{Result, TrackerError};
use std::ffi::{c_char, c_int, CStr, CString};
use std::sync::{Mutex, MutexGuard};

static LAST_ERROR: LastError = LastError::new();

type BoxedSession = TrackerSession<Box<dyn GazeBackend + Send>>;

/// Opaque session handle for C consumers.
pub struct TrSession {
    session: Mutex<BoxedSession>,
    feed: GazeFeed,
}

/// Opaque producer handle for pushing raw gaze samples into a session.
pub struct TrFeed(GazeFeed);

impl TrSession {
    fn lock(&self) -> MutexGuard<'_, BoxedSession> {
        match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn status(result: Result<()>) -> c_int {
    match result {
        Ok(()) => 0,
        Err(e) => {
            LAST_ERROR.set(&e);
            -1
        }
    }
}

fn open_session(width: f32, height: f32, offset: f32, license: &str) -> Result<TrSession> {
    // License errors take precedence over a bad display area.
    let policy = LicensePolicy::from_env();
    if !policy.is_valid_at(license, SystemClock.now()) {
        return Err(TrackerError::License("open session"));
    }
    let display = DisplayArea::new(width, height, offset)?;
    let config = SessionConfig::from_env(display).with_policy(policy);
    session_from_config(&config, license)
}

fn session_from_config(config: &SessionConfig, license: &str) -> Result<TrSession> {
    let (backend, feed) = ChannelBackend::new(config.queue_capacity, config.update_timeout);
    let backend: Box<dyn GazeBackend + Send> = Box::new(backend);
    let session = TrackerSession::new(config, license, backend)?;
    Ok(TrSession {
        session: Mutex::new(session),
        feed,
    })
}

/// Open a recording session over a queue-fed backend.
/// Returns NULL on error (check tr_last_error()).
///
/// # Safety
/// `license` must be a valid null-terminated string, or null.
#[no_mangle]
pub unsafe extern "C" fn tr_session_new(
    width: f32,
    height: f32,
    offset: f32,
    license: *const c_char,
) -> *mut TrSession {
    if license.is_null() {
        LAST_ERROR.set(&TrackerError::License("open session"));
        return std::ptr::null_mut();
    }
    let license = CStr::from_ptr(license).to_string_lossy();

    match open_session(width, height, offset, &license) {
        Ok(session) => Box::into_raw(Box::new(session)),
        Err(e) => {
            LAST_ERROR.set(&e);
            std::ptr::null_mut()
        }
    }
}

/// Release a session and its backend.
///
/// # Safety
/// `session` must be a pointer returned by `tr_session_new`, or null.
#[no_mangle]
pub unsafe extern "C" fn tr_session_free(session: *mut TrSession) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Create a producer handle for the session. Feeds stay valid after the
/// session is freed; pushes then fail.
///
/// # Safety
/// `session` must be a valid session pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn tr_session_feed(session: *const TrSession) -> *mut TrFeed {
    if session.is_null() {
        return std::ptr::null_mut();
    }
    let session = &*session;
    Box::into_raw(Box::new(TrFeed(session.feed.clone())))
}

/// Push a raw gaze sample with coordinates normalized to the display area.
/// `validity`: 0 = Valid, anything else = Invalid.
/// Returns 0 if queued, 1 if dropped because the queue is full, -1 on error.
///
/// # Safety
/// `feed` must be a valid feed pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn tr_feed_push(
    feed: *const TrFeed,
    x: f32,
    y: f32,
    validity: c_int,
    timestamp_us: i64,
) -> c_int {
    if feed.is_null() {
        return -1;
    }
    let feed = &*feed;
    let sample = RawGaze {
        x,
        y,
        validity: if validity == 0 {
            Validity::Valid
        } else {
            Validity::Invalid
        },
        timestamp_us,
    };
    match feed.0.push(sample) {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            LAST_ERROR.set(&e);
            -1
        }
    }
}

/// Free a producer handle.
///
/// # Safety
/// `feed` must be a pointer returned by `tr_session_feed`, or null.
#[no_mangle]
pub unsafe extern "C" fn tr_feed_free(feed: *mut TrFeed) {
    if !feed.is_null() {
        drop(Box::from_raw(feed));
    }
}

/// Start recording. Returns 0 on success, -1 on error.
///
/// # Safety
/// `session` must be a valid session pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn tr_start(session: *mut TrSession) -> c_int {
    if session.is_null() {
        return -1;
    }
    status((*session).lock().start())
}

/// Pause recording. Never fails.
///
/// # Safety
/// `session` must be a valid session pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn tr_pause(session: *mut TrSession) {
    if !session.is_null() {
        (*session).lock().pause();
    }
}

/// Stop recording and release the backend. Buffered data stays readable.
///
/// # Safety
/// `session` must be a valid session pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn tr_stop(session: *mut TrSession) {
    if !session.is_null() {
        (*session).lock().stop();
    }
}

/// Pump the backend once. Returns 0 on success, -1 on error.
///
/// The session stays locked while the backend waits for samples (up to the
/// configured update timeout), so concurrent calls on the same session from
/// other threads block until the pump returns.
///
/// # Safety
/// `session` must be a valid session pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn tr_update(session: *mut TrSession) -> c_int {
    if session.is_null() {
        return -1;
    }
    status((*session).lock().update())
}

/// # Safety
/// `session` must be a valid session pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn tr_is_license_valid(session: *const TrSession) -> bool {
    if session.is_null() {
        return false;
    }
    (*session).lock().is_license_valid()
}

/// # Safety
/// `session` must be a valid session pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn tr_is_recording(session: *const TrSession) -> bool {
    if session.is_null() {
        return false;
    }
    (*session).lock().is_recording()
}

/// # Safety
/// `session` must be a valid session pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn tr_clear_data_buffer(session: *mut TrSession) {
    if !session.is_null() {
        (*session).lock().clear_data_buffer();
    }
}

/// Copy buffered samples into `out`.
///
/// Writes up to `max` samples and returns the number written. With a null
/// `out`, returns the number of buffered samples. Returns -1 on error.
///
/// # Safety
/// `out` must point to an array of at least `max` `GazePoint` elements, or be null.
#[no_mangle]
pub unsafe extern "C" fn tr_get_data(
    session: *const TrSession,
    out: *mut GazePoint,
    max: c_int,
) -> c_int {
    if session.is_null() {
        return -1;
    }
    let data = match (*session).lock().data() {
        Ok(data) => data,
        Err(e) => {
            LAST_ERROR.set(&e);
            return -1;
        }
    };
    if out.is_null() {
        return data.len().min(c_int::MAX as usize) as c_int;
    }

    let count = data.len().min(max.max(0) as usize);
    for (i, point) in data.iter().take(count).enumerate() {
        out.add(i).write(*point);
    }
    count as c_int
}

/// Buffered samples as a JSON array of `{x, y, validity, timestamp_us}`
/// objects. Returns NULL on error. Free with `tr_string_free`.
///
/// # Safety
/// `session` must be a valid session pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn tr_get_formatted_data_json(session: *const TrSession) -> *mut c_char {
    if session.is_null() {
        return std::ptr::null_mut();
    }
    let json = (*session)
        .lock()
        .formatted_data()
        .and_then(|records: Vec<GazeRecord>| records_to_json(&records));
    match json.map(CString::new) {
        Ok(Ok(s)) => s.into_raw(),
        Ok(Err(e)) => {
            LAST_ERROR.set_message(e);
            std::ptr::null_mut()
        }
        Err(e) => {
            LAST_ERROR.set(&e);
            std::ptr::null_mut()
        }
    }
}

/// Free a string returned by this library.
///
/// # Safety
/// `s` must be a pointer returned by `tr_get_formatted_data_json`, or null.
#[no_mangle]
pub unsafe extern "C" fn tr_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Get the last error message. Returns NULL if no error.
/// The returned pointer is valid until the next failing call.
#[no_mangle]
pub extern "C" fn tr_last_error() -> *const c_char {
    LAST_ERROR.as_ptr()
}
