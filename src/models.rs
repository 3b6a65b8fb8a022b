//! Configuration model

use std::convert::TryFrom;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use validator::Validate;

use crate::{
    color::{self, ParseColorError},
    generator::{GeneratorMode, GeneratorSettings, PulseSettings},
    grabber::Point,
    tween::{EasingKind, TweenError},
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("invalid color: {0}")]
    Color(#[from] ParseColorError),
    #[error("invalid pulse: {0}")]
    Tween(#[from] TweenError),
    #[error("invalid duration: {0}")]
    Duration(#[from] std::time::TryFromFloatSecsError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GrabberConfig {
    /// Screenshot file refreshed by an external tool
    Image { path: PathBuf },
    /// Fixed hex colors for the primary and secondary points
    Solid { primary: String, secondary: String },
}

impl Default for GrabberConfig {
    fn default() -> Self {
        Self::Image {
            path: std::env::temp_dir().join("gamelights-screen.png"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct Capture {
    #[validate(range(min = 1))]
    pub timeout_ms: u64,
    pub primary: Point,
    pub secondary: Point,
    pub source: GrabberConfig,
}

impl Capture {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for Capture {
    fn default() -> Self {
        Self {
            timeout_ms: 1000,
            primary: Point::new(134, 59),
            secondary: Point::new(1706, 75),
            source: GrabberConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct Generator {
    pub mode: GeneratorMode,
    pub pulse_color: String,
    pub easing: EasingKind,
    #[validate(range(exclusive_min = 0.0))]
    pub pulse_duration: f64,
    pub dimmed: bool,
}

impl Default for Generator {
    fn default() -> Self {
        Self {
            mode: GeneratorMode::Pulse,
            pulse_color: "#ff0000".to_owned(),
            easing: EasingKind::QuickCosine,
            pulse_duration: 2.0,
            dimmed: false,
        }
    }
}

impl TryFrom<&Generator> for GeneratorSettings {
    type Error = ConfigError;

    fn try_from(config: &Generator) -> Result<Self, Self::Error> {
        let duration = Duration::try_from_secs_f64(config.pulse_duration)?;
        if duration.is_zero() {
            return Err(TweenError::InvalidDuration.into());
        }

        Ok(Self {
            mode: config.mode,
            pulse: PulseSettings {
                color: color::from_device(color::parse_hex(&config.pulse_color)?),
                easing: config.easing,
                duration,
            },
            dimmed: config.dimmed,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct Dispatch {
    #[validate(range(min = 0.1, max = 240.0))]
    pub tick_rate: f64,
    pub suppress_unchanged: bool,
    #[validate(range(min = 1))]
    pub send_timeout_ms: u64,
}

impl Dispatch {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl Default for Dispatch {
    fn default() -> Self {
        Self {
            tick_rate: 30.0,
            suppress_unchanged: true,
            send_timeout_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct Output {
    pub udp_peers: Vec<String>,
    #[validate(length(min = 1))]
    pub mqtt_hostname: Option<String>,
    #[validate(range(min = 1))]
    pub discovery_timeout_ms: u64,
    /// Also log every sent color
    pub stdout: bool,
}

impl Output {
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    /// True if neither UDP peers nor an MQTT broker are configured
    pub fn is_empty(&self) -> bool {
        self.udp_peers.is_empty() && self.mqtt_hostname.is_none()
    }
}

impl Default for Output {
    fn default() -> Self {
        Self {
            udp_peers: Vec::new(),
            mqtt_hostname: None,
            discovery_timeout_ms: 2000,
            stdout: false,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub capture: Capture,
    #[validate(nested)]
    pub generator: Generator,
    #[validate(nested)]
    pub dispatch: Dispatch,
    #[validate(nested)]
    pub output: Output,
}

impl Config {
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        use tokio::io::AsyncReadExt;

        let mut file = tokio::fs::File::open(path).await?;
        let mut full = String::new();
        file.read_to_string(&mut full).await?;

        Self::from_toml(&full)
    }

    pub fn to_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn generator_settings(&self) -> Result<GeneratorSettings, ConfigError> {
        GeneratorSettings::try_from(&self.generator)
    }
}
