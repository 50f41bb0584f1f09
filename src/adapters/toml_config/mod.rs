// TOML config adapter - Analysis configuration loaded from TOML files

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::adapters::decode_libav::DEFAULT_ANALYSIS_WIDTH;
use crate::domain::rules::DetectionSettings;
use crate::engine::difference::DEFAULT_PROGRESS_INTERVAL;
use crate::error::{VidGuardError, VidGuardResult};
use crate::hash::{HashAlgorithm, DEFAULT_CHUNK_SIZE};

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "VIDGUARD_CONFIG";

/// Config file picked up from the working directory when nothing else is given
pub const DEFAULT_CONFIG_FILE: &str = "vidguard.toml";

/// Content hashing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingSettings {
    pub algorithm: HashAlgorithm,
    /// Read chunk size in bytes
    pub chunk_size: usize,
}

impl Default for HashingSettings {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Frame decoding settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeSettings {
    /// Frames wider than this are downscaled before differencing
    pub analysis_width: u32,
}

impl Default for DecodeSettings {
    fn default() -> Self {
        Self {
            analysis_width: DEFAULT_ANALYSIS_WIDTH,
        }
    }
}

/// Pipeline orchestration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Whole-analysis time limit; `None` waits indefinitely
    pub timeout_secs: Option<u64>,
    /// Frames between progress events; 0 disables them
    pub progress_interval: u64,
    /// Files analyzed concurrently in directory mode; `None` uses the CPU count
    pub max_parallel_files: Option<usize>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            max_parallel_files: None,
        }
    }
}

/// Complete analysis configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub detection: DetectionSettings,
    pub hashing: HashingSettings,
    pub decode: DecodeSettings,
    pub pipeline: PipelineSettings,
}

impl AnalysisConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> VidGuardResult<Self> {
        toml::from_str(content).map_err(|e| VidGuardError::Config {
            message: format!("failed to parse TOML config: {}", e),
        })
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> VidGuardResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| VidGuardError::Config {
            message: format!("failed to read config file {}: {}", path.display(), e),
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Resolve and load the config file, falling back to defaults.
    ///
    /// An explicit path wins over `VIDGUARD_CONFIG`, which wins over
    /// `./vidguard.toml`. Explicit paths must exist; the working-directory file
    /// is optional.
    pub fn discover(explicit: Option<&Path>) -> VidGuardResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
            return Self::load(&PathBuf::from(path));
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            return Self::load(local);
        }
        debug!("No config file found; using defaults");
        Ok(Self::default())
    }

    /// Serialize configuration back to TOML
    pub fn to_toml_string(&self) -> VidGuardResult<String> {
        toml::to_string_pretty(self).map_err(|e| VidGuardError::Config {
            message: format!("failed to serialize config: {}", e),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> VidGuardResult<()> {
        self.detection.validate()?;
        if self.hashing.chunk_size == 0 {
            return Err(VidGuardError::Config {
                message: "hashing.chunk_size must be greater than zero".to_string(),
            });
        }
        if self.decode.analysis_width == 0 {
            return Err(VidGuardError::Config {
                message: "decode.analysis_width must be greater than zero".to_string(),
            });
        }
        if self.pipeline.timeout_secs == Some(0) {
            return Err(VidGuardError::Config {
                message: "pipeline.timeout_secs must be greater than zero".to_string(),
            });
        }
        if self.pipeline.max_parallel_files == Some(0) {
            return Err(VidGuardError::Config {
                message: "pipeline.max_parallel_files must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AnalysisConfig::from_toml_str("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.detection.sensitivity, 1.5);
        assert_eq!(config.hashing.chunk_size, 128 * 1024);
        assert_eq!(config.decode.analysis_width, 320);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            [detection]
            sensitivity = 3.0

            [hashing]
            algorithm = "blake3"

            [pipeline]
            timeout_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.detection.sensitivity, 3.0);
        assert!(config.detection.collapse_adjacent);
        assert_eq!(config.hashing.algorithm, HashAlgorithm::Blake3);
        assert_eq!(config.hashing.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.pipeline.timeout_secs, Some(60));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = AnalysisConfig::default();
        config.hashing.chunk_size = 0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.decode.analysis_width = 0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.detection.min_score = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = AnalysisConfig::from_toml_str("[detection\nsensitivity = ").unwrap_err();
        assert!(matches!(err, VidGuardError::Config { .. }));
    }

    #[test]
    fn test_load_round_trips_through_file() {
        let mut config = AnalysisConfig::default();
        config.detection.min_score = 0.05;
        config.pipeline.max_parallel_files = Some(2);

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(config.to_toml_string().unwrap().as_bytes())
            .unwrap();
        file.flush().unwrap();

        assert_eq!(AnalysisConfig::load(file.path()).unwrap(), config);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let err = AnalysisConfig::discover(Some(Path::new("/no/such/vidguard.toml"))).unwrap_err();
        assert!(matches!(err, VidGuardError::Config { .. }));
    }
}
