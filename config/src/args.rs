use crate::StalePolicy;
use clap::Parser;
use std::{
    path::PathBuf,
    time::Duration,
};

/// Watch the streams of an RTMP server's stat page.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version = version(), about, long_about = None)]
pub struct Args {
    /// URL of the media server's XML stat page, e.g. `http://localhost:8080/stat`.
    #[clap(long, env = "STAT_URL", value_name = "URL")]
    pub stat_url: Option<String>,

    /// How often the stat page is fetched, e.g. `100ms` or `1s`.
    #[clap(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub poll_interval: Option<Duration>,

    /// Give up on a single fetch after this long.
    #[clap(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub request_timeout: Option<Duration>,

    /// How often the stream table is printed.
    #[clap(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub report_interval: Option<Duration>,

    /// Number of derived samples kept per stream.
    #[clap(long, value_name = "N")]
    pub history_capacity: Option<usize>,

    /// What to do with streams that disappear: `retain`, `flag` or `evict`.
    #[clap(long, value_name = "POLICY")]
    pub stale_policy: Option<StalePolicy>,

    /// Ticks a stream may be missing before the stale policy applies.
    #[clap(long, value_name = "N")]
    pub stale_after_ticks: Option<u32>,

    /// Read settings from this file instead of the default `config.yaml`.
    #[clap(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enables debug logging for the monitor.
    #[clap(short, long, action)]
    pub verbose: bool,
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(stat_url) = &self.stat_url {
                cache.insert("stat_url".to_string(), stat_url.clone().into());
            }
            let durations = [
                ("poll_interval", self.poll_interval),
                ("request_timeout", self.request_timeout),
                ("report_interval", self.report_interval),
            ];
            for (key, duration) in durations.into_iter().filter_map(|(key, duration)| Some((key, duration?))) {
                cache.insert(key.to_string(), humantime::format_duration(duration).to_string().into());
            }
            if let Some(capacity) = self.history_capacity {
                cache.insert("history_capacity".to_string(), (capacity as u64).into());
            }
            if let Some(policy) = self.stale_policy {
                cache.insert("stale_policy".to_string(), policy.to_string().into());
            }
            if let Some(ticks) = self.stale_after_ticks {
                cache.insert("stale_after_ticks".to_string(), u64::from(ticks).into());
            }
            if self.verbose {
                cache.insert("verbose".to_string(), true.into());
            }
            Ok(cache)
        }
    }
}

pub fn version() -> String {
    let author = clap::crate_authors!();
    let config_dir_path = crate::get_config_dir().display().to_string();

    format!(
        "{}

Authors: {author}

Config directory: {config_dir_path}",
        clap::crate_version!()
    )
}
