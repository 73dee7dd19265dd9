use crate::metrics::{
    StatSample,
    StreamSnapshot,
    StreamStat,
};
use chrono::{
    DateTime,
    Utc,
};
use rtmp_stat_monitor_config::{
    Config,
    StalePolicy,
};
use std::collections::{
    hash_map::Entry,
    BTreeMap,
    HashMap,
    HashSet,
};

/// Point-in-time copy of every tracked stream, ordered by name.
pub type Stats = BTreeMap<String, StreamStat>;

/// Owns the per-stream state and turns raw counters into rates.
///
/// This is the only writer of [`StreamStat`]s. Readers get copies through
/// [`RateTracker::current_stats`].
#[derive(Debug, Clone)]
pub struct RateTracker {
    history_capacity: usize,
    stale_policy: StalePolicy,
    stale_after_ticks: u32,
    streams: HashMap<String, StreamStat>,
    // Consecutive updates a tracked stream was missing from. Only kept for non-retain policies.
    absent_ticks: HashMap<String, u32>,
    // Names currently in an anomaly that was already reported at `warn`.
    duplicated: HashSet<String>,
    without_publisher: HashSet<String>,
}

impl RateTracker {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            history_capacity,
            stale_policy: StalePolicy::Retain,
            stale_after_ticks: 0,
            streams: HashMap::new(),
            absent_ticks: HashMap::new(),
            duplicated: HashSet::new(),
            without_publisher: HashSet::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.history_capacity).with_stale_policy(config.stale_policy, config.stale_after_ticks)
    }

    pub fn with_stale_policy(mut self, stale_policy: StalePolicy, stale_after_ticks: u32) -> Self {
        self.stale_policy = stale_policy;
        self.stale_after_ticks = stale_after_ticks.max(1);
        self
    }

    pub fn update(&mut self, snapshots: &[StreamSnapshot]) {
        self.update_at(snapshots, Utc::now());
    }

    /// Feed one fetch worth of snapshots, sampled at `now`.
    ///
    /// Names are unique per update: when several snapshots share a name (the same stream pushed
    /// to more than one application), only the first one is observed.
    pub fn update_at(&mut self, snapshots: &[StreamSnapshot], now: DateTime<Utc>) {
        let mut observed = HashSet::new();
        let mut duplicated = HashSet::new();
        for snapshot in snapshots {
            if observed.insert(snapshot.name.as_str()) {
                self.observe(snapshot, now);
                continue;
            }
            if duplicated.insert(snapshot.name.as_str()) {
                if self.duplicated.contains(&snapshot.name) {
                    debug!(stream = %snapshot.name, "Skipping duplicate stream name");
                } else {
                    warn!(stream = %snapshot.name, "Stream name reported more than once, only the first one is tracked");
                }
            }
        }
        self.duplicated = duplicated.into_iter().map(str::to_string).collect();
        self.age_absent(&observed);
    }

    pub fn current_stats(&self) -> Stats {
        self.streams
            .iter()
            .map(|(name, stat)| (name.clone(), stat.clone()))
            .collect()
    }

    /// Copy of a single stream's stat.
    pub fn stat(&self, name: &str) -> Option<StreamStat> {
        self.streams.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Returns the stat for `name` and whether it was created by this call.
    fn get_or_insert<'a>(
        streams: &'a mut HashMap<String, StreamStat>,
        history_capacity: usize,
        name: &str,
    ) -> (&'a mut StreamStat, bool) {
        match streams.entry(name.to_string()) {
            Entry::Occupied(entry) => (entry.into_mut(), false),
            Entry::Vacant(entry) => {
                info!(stream = %name, "Tracking new stream");
                (entry.insert(StreamStat::new(name, history_capacity)), true)
            }
        }
    }

    fn observe(&mut self, snapshot: &StreamSnapshot, now: DateTime<Utc>) {
        let (stat, created) = Self::get_or_insert(&mut self.streams, self.history_capacity, &snapshot.name);
        stat.samples += 1;
        if stat.stale {
            info!(stream = %stat.name, "Stream is back");
            stat.stale = false;
        }

        let bytes_in = snapshot.bytes_in();
        let baseline = stat.last_bytes_in.zip(stat.last_time_sampled);
        let (Some(bytes_in), Some((last_bytes_in, last_time_sampled)), false) = (bytes_in, baseline, created) else {
            debug!(stream = %stat.name, ?bytes_in, "Seeding stream");
            stat.last_bytes_in = bytes_in;
            stat.last_time_sampled = Some(now);
            return;
        };

        stat.bps_in_audio = snapshot.bw_audio();
        stat.bps_in_video = snapshot.bw_video();
        match snapshot.publisher() {
            Some(publisher) => {
                self.without_publisher.remove(&stat.name);
                if let Some(dropped) = publisher.dropped() {
                    stat.publishing_dropped = Some(dropped);
                }
            }
            None => {
                if self.without_publisher.insert(stat.name.clone()) {
                    warn!(
                        stream = %stat.name,
                        clients = snapshot.clients.len(),
                        dropped = ?stat.publishing_dropped,
                        "No publishing client reported, keeping the previous dropped count"
                    );
                } else {
                    debug!(stream = %stat.name, "Still no publishing client");
                }
            }
        }

        let elapsed_ms = (now - last_time_sampled).num_milliseconds();
        if elapsed_ms <= 0 {
            warn!(stream = %stat.name, elapsed_ms, "Clock did not advance since the last sample, skipping rate");
            return;
        }

        let delta = bytes_in.saturating_sub(last_bytes_in);
        let bytes_ps_in = per_second(delta, elapsed_ms);
        if delta < 0 {
            // Most likely the media server restarted and reset its counters.
            debug!(stream = %stat.name, delta, "Byte counter went backwards");
        }

        stat.bytes_ps_in = Some(bytes_ps_in);
        stat.history.push(StatSample {
            sampled_at: now,
            bytes_ps_in,
            bps_in_audio: stat.bps_in_audio,
            bps_in_video: stat.bps_in_video,
            publishing_dropped: stat.publishing_dropped,
        });
        stat.last_bytes_in = Some(bytes_in);
        stat.last_time_sampled = Some(now);

        trace!(stream = %stat.name, bytes_ps_in, elapsed_ms, "Updated stream rate");
    }

    fn age_absent(&mut self, seen: &HashSet<&str>) {
        self.absent_ticks.retain(|name, _| !seen.contains(name.as_str()));

        let policy = self.stale_policy;
        if policy == StalePolicy::Retain {
            return;
        }

        let threshold = self.stale_after_ticks;
        let mut evicted = Vec::new();
        for (name, stat) in self.streams.iter_mut() {
            if seen.contains(name.as_str()) {
                continue;
            }
            let absent = self.absent_ticks.entry(name.clone()).or_insert(0);
            *absent += 1;
            if *absent < threshold {
                continue;
            }
            match policy {
                StalePolicy::Flag if !stat.stale => {
                    info!(stream = %name, absent = *absent, "Flagging stream as stale");
                    stat.stale = true;
                }
                StalePolicy::Evict => evicted.push(name.clone()),
                _ => {}
            }
        }

        for name in evicted {
            info!(stream = %name, "Evicting stale stream");
            self.streams.remove(&name);
            self.absent_ticks.remove(&name);
            self.without_publisher.remove(&name);
        }
    }
}

/// `delta` bytes over `elapsed_ms` milliseconds, normalised to one second.
fn per_second(delta: i64, elapsed_ms: i64) -> i64 {
    let rate = i128::from(delta) * 1000 / i128::from(elapsed_ms);
    i64::try_from(rate).unwrap_or(if rate < 0 { i64::MIN } else { i64::MAX })
}
