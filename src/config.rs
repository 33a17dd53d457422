use crate::connection::{Credentials, MqttParams};
use crate::models::NodeConfig;
use dotenvy::dotenv;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;


#[derive(Debug, Clone)]
pub struct Config {
    pub node_config_path: PathBuf,

    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_username: String,
    pub mqtt_password: String,
    pub mqtt_retain: bool,
    pub mqtt_publish_timeout_ms: u64,

    pub output_topic: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable {0} is missing or invalid.")]
    MissingOrInvalid(String),
    #[error("Parsing error: {0}")]
    ParsingError(String),
    #[error("Cannot read node definition: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed node definition: {0}")]
    Json(#[from] serde_json::Error),
}

impl Config {
    /// Validate timeout values and other critical configurations.
    fn validate_timeouts(&self) -> Result<(), ConfigError> {
        const MIN_TIMEOUT: u64 = 100;
        const MAX_TIMEOUT: u64 = 1_000_000;

        if !(MIN_TIMEOUT..=MAX_TIMEOUT).contains(&self.mqtt_publish_timeout_ms) {
            return Err(ConfigError::ParsingError(format!(
                "MQTT_PUBLISH_TIMEOUT_MS must be between {} and {} ms",
                MIN_TIMEOUT, MAX_TIMEOUT
            )));
        }

        Ok(())
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok(); // Load environment variables from .env file
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingOrInvalid(key.to_string()));

        let mqtt_root_topic = lookup("MQTT_ROOT_TOPIC").unwrap_or_else(|| "ha_auto".to_string());
        let output_topic = lookup("MQTT_OUTPUT_TOPIC").unwrap_or_else(|| "broker".to_string());

        let config = Self {
            node_config_path: PathBuf::from(required("NODE_CONFIG_PATH")?),

            // MQTT Configuration
            mqtt_host: required("MQTT_HOST")?,
            mqtt_port: required("MQTT_PORT")?
                .parse::<u16>()
                .map_err(|_| ConfigError::ParsingError("MQTT_PORT must be a valid number".to_string()))?,
            mqtt_username: lookup("MQTT_USERNAME").unwrap_or_default(), // Default to empty
            mqtt_password: lookup("MQTT_PASSWORD").unwrap_or_default(), // Default to empty
            mqtt_retain: lookup("MQTT_RETAIN")
                .unwrap_or_else(|| "true".to_string())
                .parse::<bool>()
                .map_err(|_| ConfigError::ParsingError("MQTT_RETAIN must be true or false".to_string()))?,
            mqtt_publish_timeout_ms: lookup("MQTT_PUBLISH_TIMEOUT_MS")
                .unwrap_or_else(|| "5000".to_string())
                .parse::<u64>()
                .map_err(|_| ConfigError::ParsingError("MQTT_PUBLISH_TIMEOUT_MS must be a valid number".to_string()))?,

            output_topic: prepend_root_topic(&mqtt_root_topic, &output_topic),
        };

        // Validate timeouts after constructing the configuration
        config.validate_timeouts()?;

        Ok(config)
    }

    /// Endpoint of the integration broker the envelope is published to.
    pub fn mqtt_params(&self) -> MqttParams {
        let credentials = if !self.mqtt_username.is_empty() && !self.mqtt_password.is_empty() {
            Some(Credentials {
                username: self.mqtt_username.clone(),
                password: self.mqtt_password.clone(),
            })
        } else {
            None
        };

        MqttParams {
            host: self.mqtt_host.clone(),
            port: self.mqtt_port,
            credentials,
        }
    }
}

fn prepend_root_topic(root: &str, topic: &str) -> String {
    if !root.is_empty() {
        format!("{}/{}", root.trim_end_matches('/'), topic.trim_start_matches('/'))
    } else {
        topic.to_string()
    }
}

/// Read a deployed node definition from a JSON file.
pub fn load_node_config(path: &Path) -> Result<NodeConfig, ConfigError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
