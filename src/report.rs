//! Prints the monitor's latest snapshot as a terminal table on a fixed schedule.

use comfy_table::{
    presets,
    Attribute,
    Cell,
    Color,
    ContentArrangement,
    Table,
};
use rtmp_stat_monitor_core::{
    StatsReader,
    StatsSnapshot,
    StreamStat,
};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub struct Reporter {
    reader: StatsReader,
    interval: Duration,
}

impl Reporter {
    pub fn new(reader: StatsReader, interval: Duration) -> Self {
        Self { reader, interval }
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let snapshot = self.reader.current_stats();
                    println!("{}", render(&snapshot));
                }
            }
        }
    }
}

pub fn render(snapshot: &StatsSnapshot) -> String {
    let counters = snapshot.counters;
    let taken_at = snapshot
        .taken_at
        .map(|at| at.format("%H:%M:%S%.3f UTC").to_string())
        .unwrap_or_else(|| "-".to_string());

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            ["Stream", "In", "Audio", "Video", "Dropped", "History", "State"]
                .into_iter()
                .map(|title| Cell::new(title).add_attribute(Attribute::Bold).fg(Color::Cyan)),
        );

    if snapshot.streams.is_empty() {
        table.add_row(vec![Cell::new("No streams seen yet")]);
    }

    for stat in snapshot.streams.values() {
        let (state, color) = state_of(stat);
        table.add_row(vec![
            Cell::new(&stat.name).add_attribute(Attribute::Bold),
            Cell::new(format_byte_rate(stat.bytes_ps_in)).fg(if stat.bytes_ps_in.is_some_and(|rate| rate < 0) {
                Color::Red
            } else {
                Color::Reset
            }),
            Cell::new(format_bitrate(stat.bps_in_audio)),
            Cell::new(format_bitrate(stat.bps_in_video)),
            Cell::new(
                stat.publishing_dropped
                    .map(|dropped| dropped.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(format!("{}/{}", stat.history.len(), stat.history.capacity())),
            Cell::new(state).fg(color),
        ]);
    }

    format!(
        "Tick {} at {} (updated {}, empty {}, failed {})\n{}",
        counters.ticks, taken_at, counters.updated, counters.empty, counters.failed, table
    )
}

fn state_of(stat: &StreamStat) -> (&'static str, Color) {
    if stat.stale {
        ("stale", Color::Red)
    } else if stat.is_seeding() {
        ("seeding", Color::Yellow)
    } else {
        ("live", Color::Green)
    }
}

/// Bytes per second in binary units. Negative rates (counter resets) keep their sign.
fn format_byte_rate(bytes_per_second: Option<i64>) -> String {
    let Some(rate) = bytes_per_second else {
        return "-".to_string();
    };
    let sign = if rate < 0 { "-" } else { "" };
    let bytes = rate.unsigned_abs();
    if bytes >= 1024 * 1024 * 1024 {
        format!("{sign}{:.1}GB/s", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    } else if bytes >= 1024 * 1024 {
        format!("{sign}{:.1}MB/s", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{sign}{:.1}KB/s", bytes as f64 / 1024.0)
    } else {
        format!("{sign}{bytes}B/s")
    }
}

/// The server reports audio/video bandwidth in bits per second.
fn format_bitrate(bits_per_second: Option<i64>) -> String {
    match bits_per_second {
        None => "-".to_string(),
        Some(bps) if bps >= 1_000_000 => format!("{:.1}Mbps", bps as f64 / 1_000_000.0),
        Some(bps) if bps >= 1_000 => format!("{:.1}kbps", bps as f64 / 1_000.0),
        Some(bps) => format!("{bps}bps"),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use rtmp_stat_monitor_core::TickCounters;

    #[test]
    fn byte_rates_use_binary_units() {
        assert_eq!(format_byte_rate(None), "-");
        assert_eq!(format_byte_rate(Some(512)), "512B/s");
        assert_eq!(format_byte_rate(Some(128_000)), "125.0KB/s");
        assert_eq!(format_byte_rate(Some(3 * 1024 * 1024)), "3.0MB/s");
        assert_eq!(format_byte_rate(Some(-4096)), "-4.0KB/s");
    }

    #[test]
    fn bitrates_use_decimal_units() {
        assert_eq!(format_bitrate(None), "-");
        assert_eq!(format_bitrate(Some(800)), "800bps");
        assert_eq!(format_bitrate(Some(128_000)), "128.0kbps");
        assert_eq!(format_bitrate(Some(2_500_000)), "2.5Mbps");
    }

    #[test]
    fn empty_snapshot_says_so() {
        let output = render(&StatsSnapshot::default());
        assert!(output.starts_with("Tick 0 at -"));
        assert!(output.contains("No streams seen yet"));
    }

    #[test]
    fn rows_show_stream_state() {
        let mut seeding = StreamStat::new("alpha", 10);
        seeding.last_bytes_in = Some(0);

        let mut live = StreamStat::new("beta", 10);
        live.bytes_ps_in = Some(2048);
        live.bps_in_video = Some(1_500_000);
        live.publishing_dropped = Some(3);

        let mut stale = StreamStat::new("gamma", 10);
        stale.bytes_ps_in = Some(1);
        stale.stale = true;

        let snapshot = StatsSnapshot {
            taken_at: None,
            streams: [seeding, live, stale]
                .into_iter()
                .map(|stat| (stat.name.clone(), stat))
                .collect(),
            counters: TickCounters {
                ticks: 5,
                updated: 3,
                empty: 1,
                failed: 1,
            },
        };

        let output = render(&snapshot);
        assert!(output.starts_with("Tick 5 at - (updated 3, empty 1, failed 1)"));
        assert!(output.contains("seeding"));
        assert!(output.contains("2.0KB/s"));
        assert!(output.contains("1.5Mbps"));
        assert!(output.contains("stale"));
        assert!(output.contains("0/10"));
    }
}
