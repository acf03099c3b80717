//! Configuration management for the Lookout gateway
//!
//! Resolution order for every field: environment variable (`LOOKOUT_*`) >
//! TOML config file > built-in default.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::capture::ImageFormat;
use crate::{Error, Result};

/// Default substring for device group discovery
pub const DEFAULT_DEVICE_FILTER: &str = "Kinect";

/// Lookout gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Substring used to select a capture device group by display name
    pub device_filter: String,

    /// Frame capture and encoding configuration
    pub capture: CaptureConfig,

    /// Remote face analysis service configuration
    pub analysis: AnalysisConfig,

    /// Voice session timing configuration
    pub session: SessionConfig,
}

/// Frame capture and encoding configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Directory where captured frames are persisted before upload
    pub pictures_dir: PathBuf,

    /// Raster format for the captured frame
    pub format: ImageFormat,

    /// How long to wait for the first frame after the stream starts
    pub frame_timeout: Duration,
}

/// Remote face analysis service configuration
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Service base URL; `None` disables analysis (sessions report zero faces)
    pub endpoint: Option<String>,

    /// Subscription key, held as a secret and never logged
    pub key: Option<SecretString>,
}

impl std::fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("endpoint", &self.endpoint)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Voice session timing configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Interval between progress reports to the host.
    /// The host cancels the session if it sees no progress for 5 seconds,
    /// so the default leaves headroom below that window.
    pub heartbeat_period: Duration,

    /// Overall session budget (host background tasks run for at most 30s)
    pub budget: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_period: Duration::from_secs(4),
            budget: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Load configuration with env > TOML file > default resolution
    ///
    /// # Errors
    ///
    /// Returns error if an env override has an invalid value (e.g. an
    /// unknown image format).
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();

        let device_filter = std::env::var("LOOKOUT_DEVICE_FILTER")
            .ok()
            .or(fc.device.filter)
            .unwrap_or_else(|| DEFAULT_DEVICE_FILTER.to_string());

        let pictures_dir = std::env::var("LOOKOUT_PICTURES_DIR")
            .ok()
            .or(fc.capture.pictures_dir)
            .map_or_else(default_pictures_dir, PathBuf::from);

        let format = match std::env::var("LOOKOUT_IMAGE_FORMAT")
            .ok()
            .or(fc.capture.format)
        {
            Some(name) => name
                .parse::<ImageFormat>()
                .map_err(|e| Error::Config(format!("LOOKOUT_IMAGE_FORMAT: {e}")))?,
            None => ImageFormat::Png,
        };

        let frame_timeout = env_secs("LOOKOUT_FRAME_TIMEOUT_SECS")?
            .or(fc.capture.frame_timeout_secs)
            .map_or(Duration::from_secs(5), Duration::from_secs);

        let analysis = AnalysisConfig {
            endpoint: std::env::var("LOOKOUT_FACE_ENDPOINT")
                .ok()
                .or(fc.analysis.endpoint),
            key: std::env::var("LOOKOUT_FACE_KEY")
                .ok()
                .or(fc.analysis.key)
                .map(SecretString::from),
        };

        let defaults = SessionConfig::default();
        let session = SessionConfig {
            heartbeat_period: env_secs("LOOKOUT_HEARTBEAT_SECS")?
                .or(fc.session.heartbeat_secs)
                .map_or(defaults.heartbeat_period, Duration::from_secs),
            budget: env_secs("LOOKOUT_SESSION_BUDGET_SECS")?
                .or(fc.session.budget_secs)
                .map_or(defaults.budget, Duration::from_secs),
        };

        if analysis.endpoint.is_none() {
            tracing::warn!("no analysis endpoint configured, sessions will report zero faces");
        }

        Ok(Self {
            device_filter,
            capture: CaptureConfig {
                pictures_dir,
                format,
                frame_timeout,
            },
            analysis,
            session,
        })
    }
}

/// Parse an optional seconds-valued env var
fn env_secs(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{name} must be a whole number of seconds"))),
        Err(_) => Ok(None),
    }
}

/// Default pictures directory: the platform picture-storage location,
/// falling back to the current directory
fn default_pictures_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|d| d.picture_dir().map(std::path::Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}
