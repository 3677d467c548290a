use crate::clients::upower::{DISPLAY_DEVICE_PATH, SERVICE};
use serde::Deserialize;
use std::env;
use tracing::{debug, info, warn};
use universal_config::ConfigLoader;

pub const METHOD_CHANNEL: &str = "plugins.flutter.io/battery";
pub const EVENT_CHANNEL: &str = "plugins.flutter.io/charging";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Well-known bus name of the power service.
    ///
    /// **Default**: `org.freedesktop.UPower`
    pub service: String,

    /// Object path of the device to report on.
    ///
    /// **Default**: `/org/freedesktop/UPower/devices/DisplayDevice`
    pub device_path: String,

    /// Name of the channel serving `getBatteryLevel`.
    ///
    /// **Default**: `plugins.flutter.io/battery`
    pub method_channel: String,

    /// Name of the channel streaming the charging state.
    ///
    /// **Default**: `plugins.flutter.io/charging`
    pub event_channel: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: SERVICE.to_string(),
            device_path: DISPLAY_DEVICE_PATH.to_string(),
            method_channel: METHOD_CHANNEL.to_string(),
            event_channel: EVENT_CHANNEL.to_string(),
        }
    }
}

impl Config {
    /// Loads the config from the path in `BATTERY_BRIDGE_CONFIG`,
    /// or from the user config dir.
    ///
    /// Falls back to the defaults if no config can be loaded.
    pub fn load() -> Self {
        let config = env::var("BATTERY_BRIDGE_CONFIG")
            .map_or_else(
                |_| ConfigLoader::new("battery-bridge").find_and_load(),
                ConfigLoader::load,
            )
            .unwrap_or_else(|err| {
                warn!("Failed to load config: {}", err);
                info!("Falling back to the default config");

                Self::default()
            });

        debug!("Loaded config: {config:?}");
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();

        assert_eq!(config.service, "org.freedesktop.UPower");
        assert_eq!(
            config.device_path,
            "/org/freedesktop/UPower/devices/DisplayDevice"
        );
        assert_eq!(config.method_channel, "plugins.flutter.io/battery");
        assert_eq!(config.event_channel, "plugins.flutter.io/charging");
    }

    #[test]
    fn deserialize_partial_json() {
        let json = r#"{"device_path": "/org/freedesktop/UPower/devices/battery_BAT0"}"#;

        let config = serde_json::from_str::<Config>(json).unwrap();
        assert_eq!(
            config.device_path,
            "/org/freedesktop/UPower/devices/battery_BAT0"
        );
        assert_eq!(config.service, SERVICE);
        assert_eq!(config.event_channel, EVENT_CHANNEL);
    }

    #[test]
    fn deserialize_empty_json() {
        let config = serde_json::from_str::<Config>("{}").unwrap();
        assert_eq!(config, Config::default());
    }
}
