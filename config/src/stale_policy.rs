use serde::{
    Deserialize,
    Serialize,
};
use strum::{
    Display,
    EnumIter,
    EnumString,
};

/// What happens to streams that stop showing up on the stat page.
#[derive(Debug, Default, Clone, Copy, Display, EnumIter, EnumString, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StalePolicy {
    /// Keep the last known stats forever.
    #[default]
    Retain,
    /// Keep the stats but mark them stale after `stale_after_ticks` ticks without the stream.
    Flag,
    /// Forget the stream after `stale_after_ticks` ticks without it.
    Evict,
}
