use chrono::{
    DateTime,
    Utc,
};
use serde::Serialize;
use std::collections::VecDeque;

/// Fixed-capacity buffer that evicts its oldest entry when full.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct History<T> {
    capacity: usize,
    entries: VecDeque<T>,
}

impl<T> History<T> {
    /// A capacity of zero is bumped to one so that the latest value is always kept.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends `value`, dropping the oldest entry first if the buffer is full.
    pub fn push(&mut self, value: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(value);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn oldest(&self) -> Option<&T> {
        self.entries.front()
    }
}

/// Values derived for one stream on one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatSample {
    pub sampled_at: DateTime<Utc>,
    pub bytes_ps_in: i64,
    pub bps_in_audio: Option<i64>,
    pub bps_in_video: Option<i64>,
    pub publishing_dropped: Option<i64>,
}

/// Derived, long-lived state of a stream, keyed by its name.
///
/// A stat that stopped appearing in fetches keeps its last values; read it as "last known state".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamStat {
    pub name: String,
    /// Baseline for the next `bytes_in` delta.
    pub last_bytes_in: Option<i64>,
    pub last_time_sampled: Option<DateTime<Utc>>,
    /// `None` until two snapshots with a byte counter were seen.
    pub bytes_ps_in: Option<i64>,
    pub bps_in_audio: Option<i64>,
    pub bps_in_video: Option<i64>,
    pub publishing_dropped: Option<i64>,
    /// Number of snapshots observed for this stream.
    pub samples: u64,
    /// Set by the `flag` stale policy once the stream went missing for too long.
    pub stale: bool,
    pub history: History<StatSample>,
}

impl StreamStat {
    pub fn new(name: impl Into<String>, history_capacity: usize) -> Self {
        Self {
            name: name.into(),
            last_bytes_in: None,
            last_time_sampled: None,
            bytes_ps_in: None,
            bps_in_audio: None,
            bps_in_video: None,
            publishing_dropped: None,
            samples: 0,
            stale: false,
            history: History::new(history_capacity),
        }
    }

    pub fn is_seeding(&self) -> bool {
        self.bytes_ps_in.is_none()
    }
}
