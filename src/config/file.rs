//! TOML configuration file loading
//!
//! Supports `~/.config/lookout/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct LookoutConfigFile {
    /// Capture device configuration
    #[serde(default)]
    pub device: DeviceFileConfig,

    /// Frame capture and encoding configuration
    #[serde(default)]
    pub capture: CaptureFileConfig,

    /// Remote face analysis service configuration
    #[serde(default)]
    pub analysis: AnalysisFileConfig,

    /// Voice session timing configuration
    #[serde(default)]
    pub session: SessionFileConfig,
}

/// Capture device configuration
#[derive(Debug, Default, Deserialize)]
pub struct DeviceFileConfig {
    /// Substring used to select a device group by display name (e.g. "Kinect")
    pub filter: Option<String>,
}

/// Frame capture and encoding configuration
#[derive(Debug, Default, Deserialize)]
pub struct CaptureFileConfig {
    /// Directory where captured frames are persisted
    pub pictures_dir: Option<String>,

    /// Raster format for the captured frame ("png", "jpeg", "bmp", "tiff", "gif")
    pub format: Option<String>,

    /// Seconds to wait for the first frame after the stream starts
    pub frame_timeout_secs: Option<u64>,
}

/// Remote face analysis service configuration
#[derive(Debug, Default, Deserialize)]
pub struct AnalysisFileConfig {
    /// Service base URL (e.g. `<https://example.cognitiveservices.azure.com/face/v1.0>`)
    pub endpoint: Option<String>,

    /// Subscription key. Prefer `LOOKOUT_FACE_KEY` over keeping this on disk.
    pub key: Option<String>,
}

/// Voice session timing configuration
#[derive(Debug, Default, Deserialize)]
pub struct SessionFileConfig {
    /// Seconds between progress reports to the host
    pub heartbeat_secs: Option<u64>,

    /// Overall session budget in seconds
    pub budget_secs: Option<u64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `LookoutConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> LookoutConfigFile {
    let Some(path) = config_file_path() else {
        return LookoutConfigFile::default();
    };

    if !path.exists() {
        return LookoutConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                LookoutConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            LookoutConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/lookout/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("lookout").join("config.toml"))
}
