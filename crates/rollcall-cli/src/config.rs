use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Kiosk configuration.
///
/// Sources, lowest to highest precedence: built-in defaults, the TOML file
/// named by `ROLLCALL_CONFIG`, `ROLLCALL_*` environment variables, CLI flags.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL of the recognition server, `http://` or `https://`.
    pub server_url: String,
    /// V4L2 device path.
    pub camera_device: String,
    /// Preferred capture width; the driver may negotiate something else.
    pub capture_width: u32,
    /// Preferred capture height.
    pub capture_height: u32,
    /// JPEG quality (1–100) for submitted stills.
    pub jpeg_quality: u8,
    /// How long a notification stays visible, in milliseconds.
    pub notification_ms: u64,
    /// Per-request HTTP timeout in seconds.
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".to_string(),
            camera_device: "/dev/video0".to_string(),
            capture_width: 1280,
            capture_height: 720,
            jpeg_quality: rollcall_core::DEFAULT_JPEG_QUALITY,
            notification_ms: 4000,
            http_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var("ROLLCALL_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `ROLLCALL_*` overrides from `lookup`. Unparseable values are
    /// ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ROLLCALL_SERVER_URL") {
            self.server_url = url;
        }
        if let Some(device) = lookup("ROLLCALL_CAMERA_DEVICE") {
            self.camera_device = device;
        }
        override_parsed(&lookup, "ROLLCALL_CAPTURE_WIDTH", &mut self.capture_width);
        override_parsed(&lookup, "ROLLCALL_CAPTURE_HEIGHT", &mut self.capture_height);
        override_parsed(&lookup, "ROLLCALL_JPEG_QUALITY", &mut self.jpeg_quality);
        override_parsed(&lookup, "ROLLCALL_NOTIFICATION_MS", &mut self.notification_ms);
        override_parsed(&lookup, "ROLLCALL_HTTP_TIMEOUT_SECS", &mut self.http_timeout_secs);
    }

    pub fn notification_delay(&self) -> Duration {
        Duration::from_millis(self.notification_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn override_parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!(key, value = %raw, "ignoring unparseable override"),
    }
}
