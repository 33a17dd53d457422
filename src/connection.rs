use crate::models::{BrokerConfig, BrokerKind};
use rumqttc::MqttOptions;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Typed connection parameters a downstream node derives from an emitted
/// broker payload. This is the only place the broker fields get checked.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionParams {
    Mqtt(MqttParams),
    Amqp(AmqpParams),
    Redis(RedisParams),
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MqttParams {
    pub host: String,
    pub port: u16,
    pub credentials: Option<Credentials>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AmqpParams {
    pub host: String,
    pub port: u16,
    pub vhost: String,
    pub exchange: String,
    pub credentials: Option<Credentials>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RedisParams {
    pub host: String,
    pub port: u16,
    pub db: u32,
    pub credentials: Option<Credentials>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConnectionError {
    #[error("Broker host is missing or not a string.")]
    MissingHost,
    #[error("Invalid broker port: {0}")]
    InvalidPort(String),
    #[error("Unknown broker type: {0}")]
    UnknownBrokerType(String),
    #[error("Invalid database selector: {0}")]
    InvalidDb(String),
}

impl MqttParams {
    /// Client options for connecting to this broker.
    pub fn mqtt_options(&self, client_id: &str) -> MqttOptions {
        let mut mqtt_options = MqttOptions::new(client_id, &self.host, self.port);
        mqtt_options.set_keep_alive(Duration::from_secs(10));
        mqtt_options.set_clean_session(true);

        if let Some(credentials) = &self.credentials {
            mqtt_options.set_credentials(&credentials.username, &credentials.password);
        }
        mqtt_options
    }
}

impl ConnectionParams {
    pub fn kind(&self) -> BrokerKind {
        match self {
            ConnectionParams::Mqtt(_) => BrokerKind::Mqtt,
            ConnectionParams::Amqp(_) => BrokerKind::Amqp,
            ConnectionParams::Redis(_) => BrokerKind::Redis,
        }
    }
}

impl TryFrom<&BrokerConfig> for ConnectionParams {
    type Error = ConnectionError;

    fn try_from(config: &BrokerConfig) -> Result<Self, Self::Error> {
        let kind = config.kind().ok_or_else(|| {
            ConnectionError::UnknownBrokerType(match config.broker_type.as_ref() {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => "<absent>".to_string(),
            })
        })?;

        let host = match config.host.as_ref() {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => return Err(ConnectionError::MissingHost),
        };
        let port = parse_port(config.port.as_ref())?.unwrap_or_else(|| kind.default_port());
        let credentials = credentials(config);

        Ok(match kind {
            BrokerKind::Mqtt => ConnectionParams::Mqtt(MqttParams {
                host,
                port,
                credentials,
            }),
            BrokerKind::Amqp => ConnectionParams::Amqp(AmqpParams {
                host,
                port,
                vhost: parse_vhost(config.db.as_ref())?,
                exchange: non_empty_str(config.exchange.as_ref())
                    .unwrap_or_default()
                    .to_string(),
                credentials,
            }),
            BrokerKind::Redis => ConnectionParams::Redis(RedisParams {
                host,
                port,
                db: parse_db(config.db.as_ref())?,
                credentials,
            }),
        })
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn parse_port(value: Option<&Value>) -> Result<Option<u16>, ConnectionError> {
    let port = match value {
        None => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().parse::<u16>().ok(),
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Some(_) => None,
    };

    match port {
        Some(p) if p > 0 => Ok(Some(p)),
        _ => Err(ConnectionError::InvalidPort(
            value.map(Value::to_string).unwrap_or_default(),
        )),
    }
}

// AMQP reuses `db` as the vhost; numbers are taken as their decimal text.
fn parse_vhost(value: Option<&Value>) -> Result<String, ConnectionError> {
    match value {
        None => Ok("/".to_string()),
        Some(Value::String(s)) if s.is_empty() => Ok("/".to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(ConnectionError::InvalidDb(other.to_string())),
    }
}

fn parse_db(value: Option<&Value>) -> Result<u32, ConnectionError> {
    let db = match value {
        None => return Ok(0),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(0),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(_) => None,
    };

    db.ok_or_else(|| ConnectionError::InvalidDb(value.map(Value::to_string).unwrap_or_default()))
}

fn credentials(config: &BrokerConfig) -> Option<Credentials> {
    let username = non_empty_str(config.username.as_ref())?;
    let password = non_empty_str(config.password.as_ref())?;
    Some(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn broker(value: Value) -> BrokerConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn mqtt_with_credentials() {
        let params = ConnectionParams::try_from(&broker(json!({
            "host": "localhost",
            "port": 1883,
            "b_type": "mqtt",
            "username": "u",
            "password": "p",
        })))
        .unwrap();

        assert_eq!(
            params,
            ConnectionParams::Mqtt(MqttParams {
                host: "localhost".to_string(),
                port: 1883,
                credentials: Some(Credentials {
                    username: "u".to_string(),
                    password: "p".to_string(),
                }),
            })
        );
    }

    #[test]
    fn amqp_defaults_vhost_and_exchange() {
        let params =
            ConnectionParams::try_from(&broker(json!({ "host": "rabbit", "b_type": "amqp" })))
                .unwrap();

        match params {
            ConnectionParams::Amqp(amqp) => {
                assert_eq!(amqp.port, 5672);
                assert_eq!(amqp.vhost, "/");
                assert_eq!(amqp.exchange, "");
                assert_eq!(amqp.credentials, None);
            }
            other => panic!("expected amqp, got {:?}", other),
        }
    }

    #[test]
    fn amqp_uses_db_as_vhost() {
        let params = ConnectionParams::try_from(&broker(json!({
            "host": "rabbit",
            "port": "5673",
            "b_type": "amqp",
            "db": "home",
            "exchange": "ha_auto",
        })))
        .unwrap();

        match params {
            ConnectionParams::Amqp(amqp) => {
                assert_eq!(amqp.port, 5673);
                assert_eq!(amqp.vhost, "home");
                assert_eq!(amqp.exchange, "ha_auto");
            }
            other => panic!("expected amqp, got {:?}", other),
        }
    }

    #[test]
    fn amqp_numeric_db_is_a_vhost() {
        let params = ConnectionParams::try_from(&broker(json!({
            "host": "rabbit",
            "b_type": "amqp",
            "db": 3,
        })))
        .unwrap();

        match params {
            ConnectionParams::Amqp(amqp) => assert_eq!(amqp.vhost, "3"),
            other => panic!("expected amqp, got {:?}", other),
        }

        assert!(matches!(
            ConnectionParams::try_from(&broker(json!({ "host": "rabbit", "b_type": "amqp", "db": true }))),
            Err(ConnectionError::InvalidDb(_))
        ));
    }

    #[test]
    fn redis_db_from_string_or_number() {
        let from_str = ConnectionParams::try_from(&broker(json!({
            "host": "cache",
            "b_type": "redis",
            "db": "2",
        })))
        .unwrap();
        let from_num = ConnectionParams::try_from(&broker(json!({
            "host": "cache",
            "b_type": "redis",
            "db": 2,
        })))
        .unwrap();

        assert_eq!(from_str, from_num);
        assert_eq!(from_str.kind(), BrokerKind::Redis);
        match from_str {
            ConnectionParams::Redis(redis) => {
                assert_eq!(redis.db, 2);
                assert_eq!(redis.port, 6379);
            }
            other => panic!("expected redis, got {:?}", other),
        }
    }

    #[test]
    fn rejects_bad_fields() {
        assert_eq!(
            ConnectionParams::try_from(&broker(json!({ "b_type": "mqtt" }))),
            Err(ConnectionError::MissingHost)
        );
        assert_eq!(
            ConnectionParams::try_from(&broker(json!({ "host": "h", "b_type": "kafka" }))),
            Err(ConnectionError::UnknownBrokerType("kafka".to_string()))
        );
        assert_eq!(
            ConnectionParams::try_from(&broker(json!({ "host": "h" }))),
            Err(ConnectionError::UnknownBrokerType("<absent>".to_string()))
        );
        assert_eq!(
            ConnectionParams::try_from(&broker(json!({ "host": "h", "b_type": 7 }))),
            Err(ConnectionError::UnknownBrokerType("7".to_string()))
        );
        assert!(matches!(
            ConnectionParams::try_from(&broker(json!({ "host": "h", "b_type": "mqtt", "port": 70000 }))),
            Err(ConnectionError::InvalidPort(_))
        ));
        assert!(matches!(
            ConnectionParams::try_from(&broker(json!({ "host": "h", "b_type": "mqtt", "port": "abc" }))),
            Err(ConnectionError::InvalidPort(_))
        ));
        assert!(matches!(
            ConnectionParams::try_from(&broker(json!({ "host": "h", "b_type": "mqtt", "port": 0 }))),
            Err(ConnectionError::InvalidPort(_))
        ));
        assert!(matches!(
            ConnectionParams::try_from(&broker(json!({ "host": "h", "b_type": "redis", "db": "x" }))),
            Err(ConnectionError::InvalidDb(_))
        ));
    }

    #[test]
    fn credentials_need_both_parts() {
        let params = ConnectionParams::try_from(&broker(json!({
            "host": "h",
            "b_type": "mqtt",
            "username": "u",
        })))
        .unwrap();
        match params {
            ConnectionParams::Mqtt(mqtt) => assert_eq!(mqtt.credentials, None),
            other => panic!("expected mqtt, got {:?}", other),
        }
    }

    #[test]
    fn mqtt_options_carry_endpoint() {
        let params = MqttParams {
            host: "broker.local".to_string(),
            port: 8883,
            credentials: Some(Credentials {
                username: "u".to_string(),
                password: "secret".to_string(),
            }),
        };

        let options = params.mqtt_options("client-1");
        assert_eq!(options.broker_address(), ("broker.local".to_string(), 8883));
        assert_eq!(options.client_id(), "client-1");
        assert_eq!(
            options.credentials(),
            Some(("u".to_string(), "secret".to_string()))
        );
        assert!(!format!("{:?}", params).contains("secret"));
    }
}
