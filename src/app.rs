use crate::report::Reporter;
use color_eyre::Result;
use eyre::Context as _;
use rtmp_stat_monitor_config::{
    Args,
    Config,
};
use rtmp_stat_monitor_core::{
    HttpStatSource,
    Monitor,
    RateTracker,
};
use tokio_util::sync::CancellationToken;

pub struct App {
    config: Config,
}

impl App {
    pub fn new(args: Args) -> Result<Self> {
        let config = Config::new(args).context("Failed to load configuration")?;
        config.validate()?;
        Ok(Self { config })
    }

    pub fn verbose(&self) -> bool {
        self.config.verbose
    }

    /// Logs the effective configuration. Loading happens before logging is set up, so this is
    /// the first point where it can be reported.
    pub fn log_settings(&self) {
        debug!(config = ?self.config, "Loaded configuration");
        if let Ok(stat_url) = self.config.stat_url() {
            info!(
                %stat_url,
                poll_interval = ?self.config.poll_interval,
                history_capacity = self.config.history_capacity,
                stale_policy = %self.config.stale_policy,
                "Monitoring RTMP stat page"
            );
        }
        if self.config.request_timeout > self.config.poll_interval {
            debug!(
                request_timeout = ?self.config.request_timeout,
                poll_interval = ?self.config.poll_interval,
                "A slow fetch will delay the following ticks"
            );
        }
    }

    /// Polls the stat page and prints the stream table until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        self.log_settings();

        let stat_url = self.config.stat_url()?.clone();
        let source = HttpStatSource::new(stat_url.clone(), self.config.request_timeout)
            .context("Failed to create the HTTP client")?;
        let mut monitor = Monitor::new(source, RateTracker::from_config(&self.config));

        let cancel = CancellationToken::new();
        let reporter = Reporter::new(monitor.subscribe(), self.config.report_interval);
        let reporter = tokio::spawn(reporter.run(cancel.clone()));

        let shutdown = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl-C, shutting down"),
                Err(err) => error!(%err, "Failed to listen for Ctrl-C, shutting down"),
            }
            shutdown.cancel();
        });

        monitor.run(self.config.poll_interval, cancel.cancelled()).await;

        reporter.await.context("Reporter task failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{
        io,
        sync::{
            Arc,
            Mutex,
        },
    };
    use temp_dir::TempDir;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn settings_are_logged_after_loading_not_during() {
        let dir = TempDir::new().unwrap();
        let config_file = dir.child("config.yaml");
        std::fs::write(
            &config_file,
            "stat_url: http://media.local/stat\npoll_interval: 100ms\nrequest_timeout: 2s\nverbose: true\n",
        )
        .unwrap();
        let args = Args {
            config: Some(config_file),
            ..Args::default()
        };

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let app = App::new(args).unwrap();
            assert!(app.verbose());
            assert_eq!(logs.text(), "", "loading must not emit events before logging is set up");

            app.log_settings();
        });

        let text = logs.text();
        assert!(text.contains("Loaded configuration"), "{text}");
        assert!(text.contains("Monitoring RTMP stat page"), "{text}");
        assert!(text.contains("http://media.local/stat"), "{text}");
        assert!(text.contains("A slow fetch will delay the following ticks"), "{text}");
    }
}
