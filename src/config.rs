use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_APP_ID: &str = "com.osvr.SteamVR";
pub const DEFAULT_INTERFACE_PATH: &str = "/display";
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 5;

/// Runtime settings for the driver, normally read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    /// Application identifier the client context is opened with.
    pub app_id: String,
    /// Interface path the pose callback is registered on.
    pub interface_path: String,
    /// Explicit ClientKit library path. `None` uses the platform library name.
    pub library_path: Option<PathBuf>,
    /// Period of the background update pump. `None` disables the pump.
    pub update_interval: Option<Duration>,
    pub log_poses: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            app_id: DEFAULT_APP_ID.to_string(),
            interface_path: DEFAULT_INTERFACE_PATH.to_string(),
            library_path: None,
            update_interval: Some(Duration::from_millis(DEFAULT_UPDATE_INTERVAL_MS)),
            log_poses: true,
        }
    }
}

impl DriverConfig {
    /// Read the configuration from `OSVR_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let interval_ms = read_u64(&lookup, "OSVR_STEAMVR_UPDATE_INTERVAL_MS", DEFAULT_UPDATE_INTERVAL_MS);

        Self {
            app_id: read_string(&lookup, "OSVR_STEAMVR_APP_ID", DEFAULT_APP_ID),
            interface_path: read_string(&lookup, "OSVR_STEAMVR_INTERFACE", DEFAULT_INTERFACE_PATH),
            library_path: lookup("OSVR_CLIENTKIT_LIBRARY")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            update_interval: (interval_ms > 0).then(|| Duration::from_millis(interval_ms)),
            log_poses: read_bool(&lookup, "OSVR_STEAMVR_LOG_POSES", true),
        }
    }
}

fn read_bool(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: bool) -> bool {
    lookup(name)
        .and_then(|v| {
            let v = v.trim().to_ascii_lowercase();
            match v.as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                _ => None,
            }
        })
        .unwrap_or(default)
}

fn read_u64(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: u64) -> u64 {
    lookup(name)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

// Identifiers and paths are case-sensitive, so unlike the flags these are not lowercased.
fn read_string(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> DriverConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DriverConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(config_from(&[]), DriverConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("OSVR_STEAMVR_APP_ID", " org.example.Tracker "),
            ("OSVR_STEAMVR_INTERFACE", "/me/head"),
            ("OSVR_CLIENTKIT_LIBRARY", "/opt/osvr/lib/libosvrClientKit.so"),
            ("OSVR_STEAMVR_UPDATE_INTERVAL_MS", "20"),
            ("OSVR_STEAMVR_LOG_POSES", "Off"),
        ]);

        assert_eq!(config.app_id, "org.example.Tracker");
        assert_eq!(config.interface_path, "/me/head");
        assert_eq!(
            config.library_path,
            Some(PathBuf::from("/opt/osvr/lib/libosvrClientKit.so"))
        );
        assert_eq!(config.update_interval, Some(Duration::from_millis(20)));
        assert!(!config.log_poses);
    }

    #[test]
    fn test_zero_interval_disables_pump() {
        let config = config_from(&[("OSVR_STEAMVR_UPDATE_INTERVAL_MS", "0")]);
        assert_eq!(config.update_interval, None);
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let config = config_from(&[
            ("OSVR_STEAMVR_UPDATE_INTERVAL_MS", "fast"),
            ("OSVR_STEAMVR_LOG_POSES", "maybe"),
            ("OSVR_STEAMVR_APP_ID", "   "),
        ]);
        assert_eq!(
            config.update_interval,
            Some(Duration::from_millis(DEFAULT_UPDATE_INTERVAL_MS))
        );
        assert!(config.log_poses);
        assert_eq!(config.app_id, DEFAULT_APP_ID);
    }
}
