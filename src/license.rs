//! License gate for recording sessions.
//!
//! A license is a static key paired with an expiration instant. Validity is
//! recomputed against a [`Clock`] on every check, never cached.

use std::sync::Mutex;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};

use crate::config::read_env_string;
use crate::{Result, TrackerError};

pub const DEFAULT_LICENSE_KEY: &str = "int.lab2024";
pub const DEFAULT_EXPIRATION_DATE: &str = "2024/12/31";

const DATE_FORMAT: &str = "%Y/%m/%d";

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that reports a settable instant.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut slot) = self.now.lock() {
            *slot = now;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Expected license key and the instant at which it stops being accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicensePolicy {
    key: String,
    expires_at: DateTime<Utc>,
}

impl LicensePolicy {
    pub fn new(key: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            expires_at,
        }
    }

    /// Build a policy from a `YYYY/MM/DD` expiration date.
    ///
    /// The license expires at local midnight at the start of that day.
    pub fn parse(key: impl Into<String>, expiration_date: &str) -> Result<Self> {
        Ok(Self::new(key, parse_expiration_date(expiration_date)?))
    }

    /// Default policy, with `TOBII_RECORDER_LICENSE_KEY` and
    /// `TOBII_RECORDER_LICENSE_EXPIRES` overrides applied.
    pub fn from_env() -> Self {
        let mut policy = Self::default();
        if let Some(key) = read_env_string("TOBII_RECORDER_LICENSE_KEY") {
            policy.key = key;
        }
        if let Some(date) = read_env_string("TOBII_RECORDER_LICENSE_EXPIRES") {
            match parse_expiration_date(&date) {
                Ok(expires_at) => policy.expires_at = expires_at,
                Err(e) => log::warn!(
                    "Ignoring TOBII_RECORDER_LICENSE_EXPIRES='{}': {}",
                    date,
                    e
                ),
            }
        }
        policy
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True iff `license` matches the key and `now` is strictly before expiry.
    pub fn is_valid_at(&self, license: &str, now: DateTime<Utc>) -> bool {
        license == self.key && now < self.expires_at
    }
}

impl Default for LicensePolicy {
    fn default() -> Self {
        let expires_at = parse_expiration_date(DEFAULT_EXPIRATION_DATE)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        Self::new(DEFAULT_LICENSE_KEY, expires_at)
    }
}

fn parse_expiration_date(date: &str) -> Result<DateTime<Utc>> {
    let day = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).map_err(|e| {
        TrackerError::InvalidConfig(format!("failed to parse expiration date '{}': {}", date, e))
    })?;
    let midnight = day.and_hms_opt(0, 0, 0).ok_or_else(|| {
        TrackerError::InvalidConfig(format!("expiration date '{}' has no midnight", date))
    })?;
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| {
            TrackerError::InvalidConfig(format!(
                "expiration date '{}' is not a valid local time",
                date
            ))
        })
}
