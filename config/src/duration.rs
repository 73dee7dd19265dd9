//! (De)serializes [`Duration`]s as humantime strings such as `"100ms"` or `"2s"`.

use serde::{
    de::Error as _,
    Deserialize,
    Deserializer,
    Serializer,
};
use std::time::Duration;

pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&humantime::format_duration(*duration))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(|err| D::Error::custom(format!("invalid duration '{raw}': {err}")))
}
