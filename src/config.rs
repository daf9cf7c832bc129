use std::time::Duration;

use crate::license::LicensePolicy;
use crate::types::DisplayArea;

/// Default time `update()` waits for the first sample of a pump.
pub const DEFAULT_UPDATE_TIMEOUT: Duration = Duration::from_millis(100);

/// Default number of raw samples queued between two `update()` calls.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Upper bound on the queue size. The queue allocates every slot up front.
pub const MAX_QUEUE_CAPACITY: usize = 1 << 20;

/// Everything a session needs besides the caller's license string.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub display: DisplayArea,
    pub policy: LicensePolicy,
    pub update_timeout: Duration,
    pub queue_capacity: usize,
}

impl SessionConfig {
    pub fn new(display: DisplayArea) -> Self {
        Self {
            display,
            policy: LicensePolicy::default(),
            update_timeout: DEFAULT_UPDATE_TIMEOUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Defaults with environment overrides:
    /// `TOBII_RECORDER_UPDATE_TIMEOUT_MS`, `TOBII_RECORDER_QUEUE_CAPACITY`
    /// and the license variables read by [`LicensePolicy::from_env`].
    pub fn from_env(display: DisplayArea) -> Self {
        let timeout_ms = read_env_u64(
            "TOBII_RECORDER_UPDATE_TIMEOUT_MS",
            DEFAULT_UPDATE_TIMEOUT.as_millis() as u64,
        );
        let capacity = match read_env_u64(
            "TOBII_RECORDER_QUEUE_CAPACITY",
            DEFAULT_QUEUE_CAPACITY as u64,
        ) {
            n @ 1..=MAX_QUEUE_CAPACITY_U64 => n as usize,
            n => {
                log::warn!(
                    "Ignoring TOBII_RECORDER_QUEUE_CAPACITY={} (allowed 1..={}), using {}",
                    n,
                    MAX_QUEUE_CAPACITY,
                    DEFAULT_QUEUE_CAPACITY
                );
                DEFAULT_QUEUE_CAPACITY
            }
        };

        log::debug!(
            "Session config: display={}x{} offset={} updateTimeout={}ms queueCapacity={}",
            display.width,
            display.height,
            display.offset,
            timeout_ms,
            capacity
        );

        Self {
            display,
            policy: LicensePolicy::from_env(),
            update_timeout: Duration::from_millis(timeout_ms),
            queue_capacity: capacity,
        }
    }

    pub fn with_policy(mut self, policy: LicensePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_update_timeout(mut self, timeout: Duration) -> Self {
        self.update_timeout = timeout;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.clamp(1, MAX_QUEUE_CAPACITY);
        self
    }
}

const MAX_QUEUE_CAPACITY_U64: u64 = MAX_QUEUE_CAPACITY as u64;

pub(crate) fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn read_env_u64(name: &str, default: u64) -> u64 {
    match read_env_string(name) {
        Some(v) => v.parse::<u64>().unwrap_or_else(|_| {
            log::warn!("Ignoring {}='{}', using {}", name, v, default);
            default
        }),
        None => default,
    }
}
