use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    env,
    path::PathBuf,
};

pub(crate) const APP_NAME: &str = "rtmp-stat-monitor";

#[derive(Clone, Debug, Deserialize, Default)]
pub(super) struct AppConfig {
    #[serde(default)]
    pub(super) config_dir: PathBuf,
}

lazy_static::lazy_static! {
    static ref CONFIG_FOLDER: Option<PathBuf> = env::var("RTMP_STAT_MONITOR_CONFIG")
        .ok()
        .map(PathBuf::from);
}

/// Directory holding the optional `config.yaml`.
///
/// `RTMP_STAT_MONITOR_CONFIG` overrides the platform default.
pub fn get_config_dir() -> PathBuf {
    if let Some(dir) = CONFIG_FOLDER.clone() {
        dir
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.config_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".config")
    }
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}
