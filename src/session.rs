use std::sync::Arc;

use crate::backend::GazeBackend;
use crate::channel::{ChannelBackend, GazeFeed};
use crate::config::SessionConfig;
use crate::license::{Clock, LicensePolicy, SystemClock};
use crate::record::GazeRecord;
use crate::types::{DisplayArea, GazePoint};
use crate::{Result, TrackerError};

/// A licensed gaze recording session over a tracker backend.
///
/// Samples are collected only while recording is enabled and the license
/// check passes at the moment each sample is delivered. Delivery happens
/// exclusively inside [`update`](Self::update).
///
/// `start`, `data`, `formatted_data` and `update` fail with
/// [`TrackerError::License`] once the license is invalid; `pause`, `stop` and
/// `clear_data_buffer` never check it.
pub struct TrackerSession<B: GazeBackend> {
    backend: Option<B>,
    display: DisplayArea,
    license: String,
    policy: LicensePolicy,
    clock: Arc<dyn Clock>,
    recording: bool,
    data: Vec<GazePoint>,
}

impl TrackerSession<ChannelBackend> {
    /// Open a session over a [`ChannelBackend`] sized from `config`, returning
    /// the feed the tracker runtime pushes samples into.
    pub fn open(
        config: &SessionConfig,
        license: impl Into<String>,
    ) -> Result<(TrackerSession<ChannelBackend>, GazeFeed)> {
        let (backend, feed) = ChannelBackend::new(config.queue_capacity, config.update_timeout);
        let session = TrackerSession::new(config, license, backend)?;
        Ok((session, feed))
    }
}

impl<B: GazeBackend> TrackerSession<B> {
    /// Validate `license` against the wall clock and configure `backend`.
    pub fn new(config: &SessionConfig, license: impl Into<String>, backend: B) -> Result<Self> {
        Self::with_clock(config, license, backend, Arc::new(SystemClock))
    }

    /// Like [`new`](Self::new) with an explicit time source for license checks.
    pub fn with_clock(
        config: &SessionConfig,
        license: impl Into<String>,
        mut backend: B,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let license = license.into();
        if !config.policy.is_valid_at(&license, clock.now()) {
            return Err(TrackerError::License("open session"));
        }

        let display = config.display;
        backend.add_or_update_display_area(display.width, display.height)?;
        backend.set_origin_offset(display.offset, display.offset)?;

        log::info!(
            "Opened tracker session: display={}x{} offset={} license expires {}",
            display.width,
            display.height,
            display.offset,
            config.policy.expires_at()
        );

        Ok(TrackerSession {
            backend: Some(backend),
            display,
            license,
            policy: config.policy.clone(),
            clock,
            recording: false,
            data: Vec::new(),
        })
    }

    /// Begin (or resume) collecting samples.
    pub fn start(&mut self) -> Result<()> {
        self.require_license("start")?;
        if !self.recording {
            log::debug!("Recording started");
        }
        self.recording = true;
        Ok(())
    }

    /// Stop collecting samples; the backend stays open.
    pub fn pause(&mut self) {
        if self.recording {
            log::debug!("Recording paused");
        }
        self.recording = false;
    }

    /// Stop collecting samples and release the backend. Terminal.
    ///
    /// Buffered samples stay readable through [`data`](Self::data).
    pub fn stop(&mut self) {
        self.recording = false;
        if self.backend.take().is_some() {
            log::info!("Tracker session stopped with {} buffered samples", self.data.len());
        }
    }

    /// Copy of the buffered samples, in delivery order.
    pub fn data(&self) -> Result<Vec<GazePoint>> {
        self.require_license("get data")?;
        Ok(self.data.clone())
    }

    /// Buffered samples as generic key/value records.
    pub fn formatted_data(&self) -> Result<Vec<GazeRecord>> {
        self.require_license("get data")?;
        Ok(self.data.iter().map(GazeRecord::from).collect())
    }

    pub fn clear_data_buffer(&mut self) {
        log::debug!("Clearing {} buffered samples", self.data.len());
        self.data.clear();
    }

    /// Pump the backend once, buffering every delivered sample that passes the
    /// recording and license gate.
    pub fn update(&mut self) -> Result<()> {
        self.require_license("update")?;
        let backend = self.backend.as_mut().ok_or(TrackerError::Closed)?;

        let recording = self.recording;
        let license = self.license.as_str();
        let policy = &self.policy;
        let clock = &self.clock;
        let data = &mut self.data;
        let mut dropped = 0usize;

        backend.wait_and_update(&mut |point| {
            if recording && policy.is_valid_at(license, clock.now()) {
                data.push(point);
            } else {
                dropped += 1;
            }
        })?;

        if dropped > 0 {
            log::trace!("Dropped {} samples (recording={})", dropped, recording);
        }
        Ok(())
    }

    /// Recomputed against the clock on every call.
    pub fn is_license_valid(&self) -> bool {
        self.policy.is_valid_at(&self.license, self.clock.now())
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// True once [`stop`](Self::stop) has released the backend.
    pub fn is_closed(&self) -> bool {
        self.backend.is_none()
    }

    pub fn display_area(&self) -> DisplayArea {
        self.display
    }

    pub fn license(&self) -> &str {
        &self.license
    }

    /// Number of buffered samples.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn require_license(&self, operation: &'static str) -> Result<()> {
        if self.is_license_valid() {
            Ok(())
        } else {
            log::warn!("Refusing to {}: invalid or expired license", operation);
            Err(TrackerError::License(operation))
        }
    }
}

impl<B: GazeBackend> Drop for TrackerSession<B> {
    fn drop(&mut self) {
        if self.backend.take().is_some() {
            log::debug!("Releasing tracker backend on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::FixedClock;
    use crate::types::Validity;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Backend that delivers whatever the test queued, one batch per pump.
    #[derive(Default)]
    struct Script {
        batches: VecDeque<Vec<GazePoint>>,
        calls: Vec<String>,
        pumps: usize,
        fail_update: bool,
        expire_after_first: Option<(Arc<FixedClock>, DateTime<Utc>)>,
    }

    #[derive(Clone, Default)]
    struct ScriptedBackend(Rc<RefCell<Script>>);

    impl ScriptedBackend {
        fn deliver(&self, points: Vec<GazePoint>) {
            self.0.borrow_mut().batches.push_back(points);
        }
    }

    impl GazeBackend for ScriptedBackend {
        fn add_or_update_display_area(&mut self, width: f32, height: f32) -> Result<()> {
            self.0
                .borrow_mut()
                .calls
                .push(format!("display {}x{}", width, height));
            Ok(())
        }

        fn set_origin_offset(&mut self, x: f32, y: f32) -> Result<()> {
            self.0.borrow_mut().calls.push(format!("offset {},{}", x, y));
            Ok(())
        }

        fn wait_and_update(&mut self, sink: &mut dyn FnMut(GazePoint)) -> Result<()> {
            let mut script = self.0.borrow_mut();
            script.pumps += 1;
            if script.fail_update {
                return Err(TrackerError::Backend("device unplugged".into()));
            }
            let batch = script.batches.pop_front().unwrap_or_default();
            for (i, point) in batch.into_iter().enumerate() {
                sink(point);
                if i == 0 {
                    if let Some((clock, later)) = &script.expire_after_first {
                        clock.set(*later);
                    }
                }
            }
            Ok(())
        }
    }

    const KEY: &str = "int.lab2024";

    fn before_expiry() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 19, 9, 0, 0).unwrap()
    }

    fn after_expiry() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap()
    }

    fn config() -> SessionConfig {
        SessionConfig::new(DisplayArea::new(2560.0, 1440.0, 0.0).unwrap())
    }

    fn point(ts: i64) -> GazePoint {
        GazePoint {
            x: 100.0 + ts as f32,
            y: 200.0,
            validity: Validity::Valid,
            timestamp_us: ts,
        }
    }

    fn open(
        license: &str,
    ) -> (
        TrackerSession<ScriptedBackend>,
        ScriptedBackend,
        Arc<FixedClock>,
    ) {
        let backend = ScriptedBackend::default();
        let clock = Arc::new(FixedClock::new(before_expiry()));
        let session =
            TrackerSession::with_clock(&config(), license, backend.clone(), clock.clone()).unwrap();
        (session, backend, clock)
    }

    #[test]
    fn test_valid_license_before_expiry() {
        let (session, backend, _) = open(KEY);
        assert!(session.is_license_valid());
        assert!(!session.is_recording());
        assert_eq!(
            backend.0.borrow().calls,
            vec!["display 2560x1440".to_string(), "offset 0,0".to_string()]
        );
    }

    #[test]
    fn test_wrong_license_fails_construction() {
        let clock = Arc::new(FixedClock::new(before_expiry()));
        let result =
            TrackerSession::with_clock(&config(), "wrong", ScriptedBackend::default(), clock);
        assert!(matches!(result, Err(TrackerError::License(_))));
    }

    #[test]
    fn test_expired_license_fails_construction() {
        let backend = ScriptedBackend::default();
        let clock = Arc::new(FixedClock::new(after_expiry()));
        let result = TrackerSession::with_clock(&config(), KEY, backend.clone(), clock);
        assert!(matches!(result, Err(TrackerError::License(_))));
        assert!(backend.0.borrow().calls.is_empty());
    }

    #[test]
    fn test_records_three_samples_in_order_then_clears() {
        let (mut session, backend, _) = open(KEY);
        session.start().unwrap();
        backend.deliver(vec![point(1), point(2), point(3)]);
        session.update().unwrap();

        let data = session.data().unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(
            data.iter().map(|p| p.timestamp_us).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        session.clear_data_buffer();
        assert!(session.data().unwrap().is_empty());
    }

    #[test]
    fn test_samples_dropped_while_not_recording() {
        let (mut session, backend, _) = open(KEY);
        backend.deliver(vec![point(1)]);
        session.update().unwrap();
        assert!(session.is_empty());

        session.start().unwrap();
        backend.deliver(vec![point(2)]);
        session.update().unwrap();
        session.pause();
        backend.deliver(vec![point(3)]);
        session.update().unwrap();

        let data = session.data().unwrap();
        assert_eq!(data, vec![point(2)]);
    }

    #[test]
    fn test_expired_license_blocks_start_data_update() {
        let (mut session, backend, clock) = open(KEY);
        session.start().unwrap();
        clock.set(after_expiry());

        assert!(!session.is_license_valid());
        assert!(matches!(session.start(), Err(TrackerError::License("start"))));
        assert!(matches!(session.data(), Err(TrackerError::License(_))));
        assert!(matches!(session.formatted_data(), Err(TrackerError::License(_))));
        assert!(matches!(session.update(), Err(TrackerError::License("update"))));
        assert_eq!(backend.0.borrow().pumps, 0);
    }

    #[test]
    fn test_pause_and_clear_ignore_license() {
        let (mut session, _, clock) = open(KEY);
        session.start().unwrap();
        clock.set(after_expiry());

        session.pause();
        assert!(!session.is_recording());
        session.clear_data_buffer();
        session.stop();
        assert!(session.is_closed());
    }

    #[test]
    fn test_license_rechecked_per_sample() {
        let (mut session, backend, clock) = open(KEY);
        session.start().unwrap();
        backend.0.borrow_mut().expire_after_first = Some((clock.clone(), after_expiry()));
        backend.deliver(vec![point(1), point(2), point(3)]);
        session.update().unwrap();

        clock.set(before_expiry());
        assert_eq!(session.data().unwrap(), vec![point(1)]);
    }

    #[test]
    fn test_stop_is_terminal() {
        let (mut session, backend, _) = open(KEY);
        session.start().unwrap();
        backend.deliver(vec![point(1)]);
        session.update().unwrap();

        session.stop();
        assert!(!session.is_recording());
        assert!(session.is_closed());
        assert!(matches!(session.update(), Err(TrackerError::Closed)));
        assert_eq!(backend.0.borrow().pumps, 1);

        // Buffer outlives the backend.
        assert_eq!(session.data().unwrap().len(), 1);
        session.stop();
    }

    #[test]
    fn test_backend_errors_propagate() {
        let (mut session, backend, _) = open(KEY);
        backend.0.borrow_mut().fail_update = true;
        assert!(matches!(session.update(), Err(TrackerError::Backend(_))));
    }

    #[test]
    fn test_formatted_data_matches_buffer() {
        let (mut session, backend, _) = open(KEY);
        session.start().unwrap();
        let mut invalid = point(9);
        invalid.validity = Validity::Invalid;
        backend.deliver(vec![point(8), invalid]);
        session.update().unwrap();

        let records = session.formatted_data().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].validity, "Valid");
        assert_eq!(records[1].validity, "Invalid");
        assert_eq!(records[1].timestamp_us, 9);
    }

    #[test]
    fn test_open_over_channel_backend() {
        let policy = LicensePolicy::new("k", Utc::now() + Duration::days(1));
        let display = DisplayArea::new(1000.0, 500.0, 10.0).unwrap();
        let config = SessionConfig::new(display)
            .with_policy(policy)
            .with_update_timeout(std::time::Duration::from_millis(50));
        let (mut session, feed) = TrackerSession::open(&config, "k").unwrap();

        session.start().unwrap();
        feed.push(crate::types::RawGaze {
            x: 0.5,
            y: 0.5,
            validity: Validity::Valid,
            timestamp_us: 1,
        })
        .unwrap();
        session.update().unwrap();

        let data = session.data().unwrap();
        assert_eq!(data.len(), 1);
        assert!((data[0].x - 490.0).abs() < 1e-3);
        assert!((data[0].y - 240.0).abs() < 1e-3);

        session.stop();
        assert!(matches!(
            feed.push(crate::types::RawGaze {
                x: 0.0,
                y: 0.0,
                validity: Validity::Valid,
                timestamp_us: 2,
            }),
            Err(TrackerError::Closed)
        ));
    }
}
