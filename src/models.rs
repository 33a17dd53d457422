use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Node definition as handed over by the deployment mechanism.
///
/// Only the broker fields end up in the emitted payload; `id`, `type` and `z`
/// are the host's own bookkeeping.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct NodeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b_type: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<Value>,
}

/// Connection parameters of a broker endpoint, carried as-is.
///
/// Every field keeps whatever JSON shape it was deployed with. An absent
/// field is omitted on the wire, the same way an undefined property would be.
#[derive(Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct BrokerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<Value>,
    #[serde(default, rename = "b_type", skip_serializing_if = "Option::is_none")]
    pub broker_type: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<Value>,
}

impl BrokerConfig {
    /// Copy the broker fields out of a node definition, untouched.
    pub fn from_node(config: &NodeConfig) -> Self {
        Self {
            name: config.name.clone(),
            host: config.host.clone(),
            port: config.port.clone(),
            broker_type: config.b_type.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            db: config.db.clone(),
            exchange: config.exchange.clone(),
        }
    }

    /// Broker kind named by `b_type`, if it is a string we recognize.
    pub fn kind(&self) -> Option<BrokerKind> {
        self.broker_type
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }
}

// Password must never reach the logs.
impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("broker_type", &self.broker_type)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("db", &self.db)
            .field("exchange", &self.exchange)
            .finish()
    }
}

/// Message passed along a wire to downstream nodes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Envelope {
    pub payload: BrokerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerKind {
    Mqtt,
    Amqp,
    Redis,
}

impl BrokerKind {
    pub fn default_port(self) -> u16 {
        match self {
            BrokerKind::Mqtt => 1883,
            BrokerKind::Amqp => 5672,
            BrokerKind::Redis => 6379,
        }
    }
}

impl FromStr for BrokerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mqtt" => Ok(BrokerKind::Mqtt),
            "amqp" => Ok(BrokerKind::Amqp),
            "redis" => Ok(BrokerKind::Redis),
            other => Err(format!("unknown broker type '{}'", other)),
        }
    }
}
