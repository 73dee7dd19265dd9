//! # RTMP Stat Monitor Core
//!
//! Scrapes the XML stat page of an RTMP media server (nginx-rtmp's `/stat`) and derives
//! per-stream rates from the cumulative counters it reports.
//!
//! ## Architecture
//!
//! - **`source`**: [`StatSource`] trait and the HTTP implementation. Parses the stat page into
//!   [`StreamSnapshot`]s and keeps no state between calls.
//! - **`tracker`**: [`RateTracker`] owns one [`StreamStat`] per stream name, computes
//!   bytes/second from consecutive snapshots and keeps a bounded history.
//! - **`monitor`**: [`Monitor`] runs one fetch → track cycle per tick and publishes immutable
//!   snapshots for readers on other tasks.
//! - **`metrics`**: the record types shared by all of the above.
//!
//! ## Failure model
//!
//! A tick either updates the tracker or leaves it exactly as it was. Transport and parse
//! failures are returned as [`FetchError`]; a page without streams is `Ok(false)`.

#[macro_use]
extern crate tracing;

pub mod error;
pub mod metrics;
pub mod monitor;
pub mod source;
pub mod tracker;

pub use error::FetchError;
pub use metrics::*;
pub use monitor::{
    Monitor,
    StatsReader,
    StatsSnapshot,
    TickCounters,
};
pub use source::{
    HttpStatSource,
    StatSource,
};
pub use tracker::{
    RateTracker,
    Stats,
};
