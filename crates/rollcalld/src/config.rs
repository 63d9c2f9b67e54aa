use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid bind address {0:?}")]
    Bind(String),
    #[error("images per registration must be at least 1")]
    ZeroImages,
    #[error("match tolerance must be a positive number, got {0}")]
    Tolerance(f32),
}

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address (default: 0.0.0.0:4003).
    pub bind: String,
    /// Roster folder: one subdirectory of face images per student.
    pub roster_dir: PathBuf,
    /// Attendance ledger CSV.
    pub ledger_path: PathBuf,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// Maximum Euclidean distance for a positive match.
    pub match_tolerance: f32,
    /// Number of `image{i}` slots every registration must carry.
    pub images_per_registration: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:4003".to_string(),
            roster_dir: PathBuf::from("Class 10th A"),
            ledger_path: PathBuf::from("Class 10th A.csv"),
            model_dir: PathBuf::from("models"),
            match_tolerance: rollcall_core::DEFAULT_MATCH_TOLERANCE,
            images_per_registration: 5,
        }
    }
}

impl Config {
    /// Load configuration from `ROLLCALL_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind: std::env::var("ROLLCALL_BIND").unwrap_or(defaults.bind),
            roster_dir: env_path("ROLLCALL_ROSTER_DIR", defaults.roster_dir),
            ledger_path: env_path("ROLLCALL_LEDGER_PATH", defaults.ledger_path),
            model_dir: env_path("ROLLCALL_MODEL_DIR", defaults.model_dir),
            match_tolerance: env_parse("ROLLCALL_MATCH_TOLERANCE", defaults.match_tolerance),
            images_per_registration: env_parse(
                "ROLLCALL_IMAGES_PER_REGISTRATION",
                defaults.images_per_registration,
            ),
        }
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.images_per_registration == 0 {
            return Err(ConfigError::ZeroImages);
        }
        if !self.match_tolerance.is_finite() || self.match_tolerance <= 0.0 {
            return Err(ConfigError::Tolerance(self.match_tolerance));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::Bind(self.bind.clone()))
    }
}

fn env_path(key: &str, default: PathBuf) -> PathBuf {
    std::env::var(key).map(PathBuf::from).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
