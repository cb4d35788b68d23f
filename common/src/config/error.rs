use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to deserialize config: {0}")]
    Deserialize(#[source] serde_yaml_ng::Error),
    #[error("config validation error: {0}")]
    Invalid(String),
}
