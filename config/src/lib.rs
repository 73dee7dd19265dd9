mod app_config;
mod args;
pub mod duration;
mod stale_policy;

use app_config::AppConfig;
pub use app_config::get_config_dir;
pub use args::Args;
use eyre::{
    ensure,
    eyre,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
pub use stale_policy::StalePolicy;
use std::{
    path::Path,
    time::Duration,
};
use url::Url;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten, skip_serializing)]
    app_config: AppConfig,
    /// The media server's XML stat page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stat_url: Option<Url>,
    #[serde(with = "duration")]
    pub poll_interval: Duration,
    #[serde(with = "duration")]
    pub request_timeout: Duration,
    #[serde(with = "duration")]
    pub report_interval: Duration,
    /// Derived samples kept per stream.
    pub history_capacity: usize,
    #[serde(default)]
    pub stale_policy: StalePolicy,
    pub stale_after_ticks: u32,
    #[serde(default)]
    pub verbose: bool,
}

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

impl Default for Config {
    fn default() -> Self {
        serde_yml::from_str(DEFAULT_CONFIG).expect("Failed to parse default config")
    }
}

impl Config {
    /// Layers the built-in defaults, the config file and the command line, in that order.
    pub fn new(args: Args) -> Result<Self, config::ConfigError> {
        Self::load(args, &get_config_dir())
    }

    /// Like [`Config::new`] but looks for `config.yaml` in `config_dir`.
    ///
    /// A file passed with `--config` must exist, the one in `config_dir` is optional.
    pub fn load(args: Args, config_dir: &Path) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("config_dir", config_dir.to_string_lossy().to_string())?
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml));

        let source = match &args.config {
            Some(path) => config::File::from(path.clone()).required(true),
            None => config::File::from(config_dir.join("config.yaml")).required(false),
        };
        builder = builder.add_source(source.format(config::FileFormat::Yaml));

        builder = builder.add_source(args);

        builder.build()?.try_deserialize()
    }

    pub fn config_dir(&self) -> &Path {
        &self.app_config.config_dir
    }

    pub fn stat_url(&self) -> Result<&Url> {
        self.stat_url
            .as_ref()
            .ok_or_else(|| eyre!("No stat URL configured. Pass --stat-url, set STAT_URL or add stat_url to the config file"))
    }

    /// Rejects settings the monitor cannot run with.
    pub fn validate(&self) -> Result<()> {
        let url = self.stat_url()?;
        ensure!(
            matches!(url.scheme(), "http" | "https"),
            "The stat URL must use http or https, got '{}'",
            url.scheme()
        );
        ensure!(!self.poll_interval.is_zero(), "poll_interval must be greater than zero");
        ensure!(!self.request_timeout.is_zero(), "request_timeout must be greater than zero");
        ensure!(!self.report_interval.is_zero(), "report_interval must be greater than zero");
        ensure!(self.history_capacity > 0, "history_capacity must be at least 1");
        ensure!(
            self.stale_policy == StalePolicy::Retain || self.stale_after_ticks > 0,
            "stale_after_ticks must be at least 1 with the '{}' stale policy",
            self.stale_policy
        );
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use temp_dir::TempDir;

    fn args_with_url() -> Args {
        Args {
            stat_url: Some("http://media.local:8080/stat".to_string()),
            ..Args::default()
        }
    }

    #[test]
    fn embedded_defaults_parse() {
        let config = Config::default();
        assert_eq!(config.stat_url, None);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.request_timeout, Duration::from_secs(2));
        assert_eq!(config.report_interval, Duration::from_secs(1));
        assert_eq!(config.history_capacity, 100);
        assert_eq!(config.stale_policy, StalePolicy::Retain);
        assert_eq!(config.stale_after_ticks, 50);
        assert!(!config.verbose);
    }

    #[test]
    fn defaults_apply_without_a_config_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(args_with_url(), dir.path()).unwrap();

        assert_eq!(config.stat_url.as_ref().map(Url::as_str), Some("http://media.local:8080/stat"));
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.config_dir(), dir.path());
        config.validate().unwrap();
    }

    #[test]
    fn config_file_overrides_defaults_and_args_override_the_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.child("config.yaml"),
            "stat_url: http://from-file/stat\npoll_interval: 250ms\nhistory_capacity: 20\nstale_policy: flag\n",
        )
        .unwrap();

        let config = Config::load(Args::default(), dir.path()).unwrap();
        assert_eq!(config.stat_url.as_ref().map(Url::as_str), Some("http://from-file/stat"));
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.history_capacity, 20);
        assert_eq!(config.stale_policy, StalePolicy::Flag);
        assert_eq!(config.request_timeout, Duration::from_secs(2));

        let args = Args {
            poll_interval: Some(Duration::from_secs(1)),
            stale_policy: Some(StalePolicy::Evict),
            stale_after_ticks: Some(3),
            ..args_with_url()
        };
        let config = Config::load(args, dir.path()).unwrap();
        assert_eq!(config.stat_url.as_ref().map(Url::as_str), Some("http://media.local:8080/stat"));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.history_capacity, 20);
        assert_eq!(config.stale_policy, StalePolicy::Evict);
        assert_eq!(config.stale_after_ticks, 3);
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let dir = TempDir::new().unwrap();
        let args = Args {
            config: Some(dir.child("missing.yaml")),
            ..args_with_url()
        };
        assert!(Config::load(args, dir.path()).is_err());
    }

    #[test]
    fn invalid_duration_is_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.child("config.yaml"), "poll_interval: soon\n").unwrap();
        assert!(Config::load(args_with_url(), dir.path()).is_err());
    }

    #[test]
    fn validation_catches_unusable_settings() {
        let mut config = Config::default();
        assert!(config.validate().is_err(), "a stat URL is required");

        config.stat_url = Some(Url::parse("ftp://media.local/stat").unwrap());
        assert!(config.validate().is_err());

        config.stat_url = Some(Url::parse("https://media.local/stat").unwrap());
        config.validate().unwrap();

        config.history_capacity = 0;
        assert!(config.validate().is_err());
        config.history_capacity = 10;

        config.poll_interval = Duration::ZERO;
        assert!(config.validate().is_err());
        config.poll_interval = Duration::from_millis(100);

        config.stale_after_ticks = 0;
        config.validate().unwrap();
        config.stale_policy = StalePolicy::Evict;
        assert!(config.validate().is_err());
    }
}
