use eyre::{
    Context as _,
    Result,
};
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
};

const VERBOSE_DIRECTIVES: &str = "info,rtmp_stat_monitor=debug,rtmp_stat_monitor_core=debug,rtmp_stat_monitor_config=debug";

/// Logs go to stderr so they do not interleave with the stream table on stdout.
///
/// `RUST_LOG` takes precedence over `verbose`.
pub fn init_logging(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { VERBOSE_DIRECTIVES } else { "info" }));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_filter(filter))
        .with(tracing_error::ErrorLayer::default())
        .try_init()
        .context("Failed to initialize tracing subscriber")
}
