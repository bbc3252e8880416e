use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Postgres {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Matrix {
    pub max_retries: u32,
    pub reconcile_interval_secs: u64,
    pub reconcile_batch_size: i64,
    pub request_buffer: usize,
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix {
            max_retries: 5,
            reconcile_interval_secs: 60,
            reconcile_batch_size: 100,
            request_buffer: 512,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub postgres: Postgres,
    #[serde(default)]
    pub matrix: Matrix,
}

fn default_max_connections() -> u32 {
    5
}

impl Settings {
    /// Reads the TOML file at `path`, then `MATRIX__SECTION__KEY` overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("MATRIX").separator("__"))
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.matrix.validate()?;

        Ok(settings)
    }
}

impl Matrix {
    /// Tokio panics on a zero interval period or channel capacity.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.reconcile_interval_secs == 0 {
            return Err(ConfigError::Message(
                "matrix.reconcile_interval_secs must be at least 1".into(),
            ));
        }
        if self.request_buffer == 0 {
            return Err(ConfigError::Message(
                "matrix.request_buffer must be at least 1".into(),
            ));
        }
        if self.reconcile_batch_size < 1 {
            return Err(ConfigError::Message(
                "matrix.reconcile_batch_size must be at least 1".into(),
            ));
        }

        Ok(())
    }
}
