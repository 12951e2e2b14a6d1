//! Byte-counter rate estimation.
//!
//! The cache holds the most recent sample per (device, counter) key for the
//! life of the process; it is the only state shared across polls. Size is
//! bounded by the cardinality of device x counter pairs actually polled, so
//! entries are never evicted.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// One timestamped reading of a monotonic byte counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSample {
    /// Unix epoch milliseconds when the reading was taken.
    pub timestamp_ms: i64,
    pub value: u64,
}

impl CounterSample {
    pub fn new(timestamp_ms: i64, value: u64) -> Self {
        Self {
            timestamp_ms,
            value,
        }
    }

    /// A sample taken now.
    pub fn now(value: u64) -> Self {
        Self::new(current_timestamp_millis(), value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RateKey {
    device: String,
    counter: String,
}

/// Last-sample store keyed by (device identity, counter identifier).
///
/// A single mutex guards the whole map; polls touch a handful of keys each,
/// so contention stays low even with many devices polled concurrently.
#[derive(Debug, Default)]
pub struct RateCache {
    inner: Mutex<HashMap<RateKey, CounterSample>>,
}

impl RateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new reading and return the instantaneous rate in bytes per
    /// second.
    ///
    /// The first observation of a key is a baseline, not a measurement, and
    /// always yields 0. A negative delta (counter wrap or reset) clamps to 0,
    /// never negative. A non-positive elapsed time yields 0 without replacing
    /// the stored sample, protecting against duplicate or out-of-order polls.
    pub fn observe(&self, device: &str, counter: &str, sample: CounterSample) -> f64 {
        let key = RateKey {
            device: device.to_string(),
            counter: counter.to_string(),
        };

        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        let Some(prior) = map.get(&key).copied() else {
            map.insert(key, sample);
            return 0.0;
        };

        let elapsed_ms = sample.timestamp_ms - prior.timestamp_ms;
        if elapsed_ms <= 0 {
            return 0.0;
        }

        let delta = sample.value.saturating_sub(prior.value);
        map.insert(key, sample);

        delta as f64 / (elapsed_ms as f64 / 1000.0)
    }

    /// Number of tracked (device, counter) keys.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Get the current timestamp in milliseconds since Unix epoch.
pub fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
