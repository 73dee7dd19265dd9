#[macro_use]
extern crate tracing;

mod app;
mod logging;
pub mod report;

pub use app::App;
pub use logging::init_logging;
pub use rtmp_stat_monitor_config::Args;

/// Installs the color-eyre panic and error report handlers.
pub fn init_errors() -> color_eyre::Result<()> {
    color_eyre::install()
}
