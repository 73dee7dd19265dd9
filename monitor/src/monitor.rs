use crate::{
    error::FetchError,
    source::StatSource,
    tracker::{
        RateTracker,
        Stats,
    },
};
use chrono::{
    DateTime,
    Utc,
};
use serde::Serialize;
use std::{
    future::Future,
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::watch,
    time::MissedTickBehavior,
};

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// How the ticks of a [`Monitor`] went so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickCounters {
    pub ticks: u64,
    /// Ticks that fed at least one stream into the tracker.
    pub updated: u64,
    /// Ticks where the server was reachable but reported no streams.
    pub empty: u64,
    pub failed: u64,
}

/// Immutable view of the monitor after a tick, shared with readers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsSnapshot {
    pub taken_at: Option<DateTime<Utc>>,
    pub streams: Stats,
    pub counters: TickCounters,
}

/// Read handle for consumers running on their own schedule.
///
/// Reading never blocks a tick and never observes a half-applied update.
#[derive(Debug, Clone)]
pub struct StatsReader {
    receiver: watch::Receiver<Arc<StatsSnapshot>>,
}

impl StatsReader {
    pub fn current_stats(&self) -> Arc<StatsSnapshot> {
        self.receiver.borrow().clone()
    }

    /// Waits for the next published snapshot. Returns `false` once the monitor is gone.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }
}

/// Runs fetch → track → publish cycles against a [`StatSource`].
pub struct Monitor<S> {
    source: S,
    tracker: RateTracker,
    clock: Clock,
    counters: TickCounters,
    published: watch::Sender<Arc<StatsSnapshot>>,
}

impl<S: StatSource> Monitor<S> {
    pub fn new(source: S, tracker: RateTracker) -> Self {
        let (published, _) = watch::channel(Arc::new(StatsSnapshot::default()));
        Self {
            source,
            tracker,
            clock: Box::new(Utc::now),
            counters: TickCounters::default(),
            published,
        }
    }

    /// Replace the wall clock used to time samples.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Fetch once and feed the result to the tracker.
    ///
    /// Returns `Ok(false)` without touching any stream state when the server reports no
    /// streams. A failed fetch leaves the stream state untouched as well.
    #[instrument(level = "debug", skip(self), fields(tick = self.counters.ticks + 1))]
    pub async fn tick(&mut self) -> Result<bool, FetchError> {
        self.counters.ticks += 1;

        let snapshots = match self.source.fetch().await {
            Ok(snapshots) => snapshots,
            Err(err) => {
                self.counters.failed += 1;
                self.publish();
                return Err(err);
            }
        };

        if snapshots.is_empty() {
            debug!("No live streams reported");
            self.counters.empty += 1;
            self.publish();
            return Ok(false);
        }

        let now = (self.clock)();
        self.tracker.update_at(&snapshots, now);
        self.counters.updated += 1;
        self.publish();

        Ok(true)
    }

    pub fn current_stats(&self) -> Stats {
        self.tracker.current_stats()
    }

    pub fn counters(&self) -> TickCounters {
        self.counters
    }

    pub fn subscribe(&self) -> StatsReader {
        StatsReader {
            receiver: self.published.subscribe(),
        }
    }

    /// Tick every `interval` until `shutdown` resolves.
    ///
    /// A slow fetch delays the following ticks instead of overlapping with them. Failed ticks
    /// are logged and the loop carries on.
    pub async fn run(&mut self, interval: Duration, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(?interval, "Starting stat monitor");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => match self.tick().await {
                    Ok(true) => {}
                    Ok(false) => trace!("Tick produced no update"),
                    Err(err) => warn!(%err, "Tick failed"),
                },
            }
        }
        info!(counters = ?self.counters, "Stat monitor stopped");
    }

    fn publish(&self) {
        let snapshot = StatsSnapshot {
            taken_at: Some((self.clock)()),
            streams: self.tracker.current_stats(),
            counters: self.counters,
        };
        self.published.send_replace(Arc::new(snapshot));
    }
}
