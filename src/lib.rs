//! Broker configuration node.
//!
//! A broker node packages the connection parameters it was deployed with
//! into an [`Envelope`] and sends it once, at instantiation, to whatever is
//! wired to its output. Downstream consumers turn the payload into typed
//! [`ConnectionParams`].

pub mod config;
pub mod connection;
pub mod emitter;
pub mod models;
pub mod mqtt_output;
pub mod service_utils;

pub use connection::{ConnectionError, ConnectionParams};
pub use emitter::{ChannelOutput, ConfigEmitter, Output, OutputError};
pub use models::{BrokerConfig, BrokerKind, Envelope, NodeConfig};
