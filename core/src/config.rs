//! Configuration: the `Config.toml` file, layered with `MIXCRAFT_`-prefixed
//! environment variables.

use std::num::NonZeroU32;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub static DEFAULT_CONFIG: &str = include_str!("../Mixcraft.toml");

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,
    #[serde(default)]
    pub acquisition: AcquisitionSettings,
    #[serde(default)]
    pub catalogue: CatalogueSettings,
}

impl Settings {
    /// Loads settings from `config`, then layers `MIXCRAFT_`-prefixed
    /// environment variables over it.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is missing or malformed.
    pub fn init(config: PathBuf, log_level: Option<log::LevelFilter>) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from(config))
            .add_source(Environment::with_prefix("MIXCRAFT").separator("__"))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;

        if let Some(log_level) = log_level {
            settings.orchestrator.log_level = log_level;
        }

        Ok(settings)
    }

    /// The default config file path, creating it from [`DEFAULT_CONFIG`] if
    /// it doesn't exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory can't be found or created.
    pub fn get_config_path() -> Result<PathBuf, std::io::Error> {
        match crate::get_config_dir() {
            Ok(config_dir) => {
                if !config_dir.exists() {
                    std::fs::create_dir_all(&config_dir)?;
                }
                let config_file = config_dir.join("Mixcraft.toml");
                if !config_file.exists() {
                    std::fs::write(&config_file, DEFAULT_CONFIG)?;
                }
                Ok(config_file)
            }
            Err(e) => {
                eprintln!("Error: {e}");
                Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Unable to find the config directory for mixcraft.",
                ))
            }
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Number of jobs that may run concurrently, one worker task per job.
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: NonZeroUsize,
    /// Upper bound on tracks pulled from a playlist per job.
    #[serde(default = "default_max_tracks")]
    pub max_tracks: u32,
    /// Skip re-running analysis for a track that already has one.
    #[serde(default = "default_true")]
    pub skip_analysis_if_exists: bool,
    /// Fan a job's own tracks out across a bounded sub-pool instead of
    /// processing them strictly sequentially. Off by default: sequential
    /// processing preserves playlist order and bounds memory use.
    #[serde(default)]
    pub fan_out_tracks: bool,
    #[serde(default = "default_log_level", deserialize_with = "de_log_level")]
    pub log_level: log::LevelFilter,
}

fn default_worker_pool_size() -> NonZeroUsize {
    NonZeroUsize::new(4).unwrap()
}

const fn default_max_tracks() -> u32 {
    50
}

const fn default_true() -> bool {
    true
}

const fn default_log_level() -> log::LevelFilter {
    log::LevelFilter::Info
}

fn de_log_level<'de, D>(deserializer: D) -> Result<log::LevelFilter, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(log::LevelFilter::from_str(&s).unwrap_or_else(|_| default_log_level()))
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            worker_pool_size: default_worker_pool_size(),
            max_tracks: default_max_tracks(),
            skip_analysis_if_exists: true,
            fan_out_tracks: false,
            log_level: default_log_level(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AcquisitionSettings {
    /// Shared token-bucket budget for the remote-download rate limiter.
    #[serde(default = "default_downloads_per_minute")]
    pub downloads_per_minute: NonZeroU32,
    /// Object-store key prefix new uploads are written under.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Endpoint queried for the single-best remote match before download.
    #[serde(default = "default_search_endpoint")]
    pub search_endpoint: String,
    #[serde(default)]
    pub loudness: LoudnessSettings,
    #[serde(default)]
    pub object_store: ObjectStoreSettings,
}

fn default_downloads_per_minute() -> NonZeroU32 {
    NonZeroU32::new(20).unwrap()
}

fn default_key_prefix() -> String {
    "audio".to_string()
}

fn default_search_endpoint() -> String {
    "https://search.example.com/tracks".to_string()
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            downloads_per_minute: default_downloads_per_minute(),
            key_prefix: default_key_prefix(),
            search_endpoint: default_search_endpoint(),
            loudness: LoudnessSettings::default(),
            object_store: ObjectStoreSettings::default(),
        }
    }
}

/// Target parameters for post-acquisition loudness normalisation (EBU R128).
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct LoudnessSettings {
    #[serde(default = "default_integrated_lufs")]
    pub integrated_lufs: f64,
    #[serde(default = "default_true_peak_dbtp")]
    pub true_peak_dbtp: f64,
    #[serde(default = "default_loudness_range_lu")]
    pub loudness_range_lu: f64,
    #[serde(default = "default_output_bitrate_kbps")]
    pub output_bitrate_kbps: u32,
    #[serde(default = "default_output_sample_rate_hz")]
    pub output_sample_rate_hz: u32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

const fn default_integrated_lufs() -> f64 {
    -16.0
}

const fn default_true_peak_dbtp() -> f64 {
    -1.5
}

const fn default_loudness_range_lu() -> f64 {
    11.0
}

const fn default_output_bitrate_kbps() -> u32 {
    320
}

const fn default_output_sample_rate_hz() -> u32 {
    44_100
}

const fn default_timeout_seconds() -> u64 {
    300
}

impl Default for LoudnessSettings {
    fn default() -> Self {
        Self {
            integrated_lufs: default_integrated_lufs(),
            true_peak_dbtp: default_true_peak_dbtp(),
            loudness_range_lu: default_loudness_range_lu(),
            output_bitrate_kbps: default_output_bitrate_kbps(),
            output_sample_rate_hz: default_output_sample_rate_hz(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct ObjectStoreSettings {
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub public_base_url: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct CatalogueSettings {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default)]
    pub authorize_endpoint: String,
    #[serde(default)]
    pub token_endpoint: String,
}
