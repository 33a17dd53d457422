use crate::models::{BrokerConfig, Envelope, NodeConfig};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use uuid::Uuid;

/// Where a node's output is wired to.
pub trait Output {
    type Error;

    fn send(&mut self, envelope: Envelope) -> Result<(), Self::Error>;
}

impl<F, E> Output for F
where
    F: FnMut(Envelope) -> Result<(), E>,
{
    type Error = E;

    fn send(&mut self, envelope: Envelope) -> Result<(), E> {
        self(envelope)
    }
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Downstream receiver is gone.")]
    Disconnected,
    #[error("Failed to serialize envelope: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to publish envelope: {0}")]
    Publish(#[from] rumqttc::ClientError),
}

/// In-process wire to a downstream node.
#[derive(Debug, Clone)]
pub struct ChannelOutput {
    tx: UnboundedSender<Envelope>,
}

impl ChannelOutput {
    pub fn new(tx: UnboundedSender<Envelope>) -> Self {
        Self { tx }
    }
}

impl Output for ChannelOutput {
    type Error = OutputError;

    fn send(&mut self, envelope: Envelope) -> Result<(), OutputError> {
        self.tx.send(envelope).map_err(|_| OutputError::Disconnected)
    }
}

/// A deployed broker node.
///
/// The node's whole job happens in [`ConfigEmitter::instantiate`]: the broker
/// fields are packaged into an envelope and sent once. Nothing is validated,
/// so a half-filled node definition simply yields a half-filled payload.
#[derive(Debug, Clone)]
pub struct ConfigEmitter {
    id: String,
    name: Option<String>,
}

impl ConfigEmitter {
    /// Build the payload from `config` and send it through `output`.
    ///
    /// The send has been issued by the time this returns. An output failure
    /// is returned as-is.
    pub fn instantiate<O>(config: &NodeConfig, output: &mut O) -> Result<Self, O::Error>
    where
        O: Output + ?Sized,
    {
        let node = Self {
            id: match config.id.as_ref() {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => Uuid::new_v4().to_string(),
            },
            name: config.name.as_ref().and_then(Value::as_str).map(str::to_string),
        };

        let envelope = Envelope {
            payload: BrokerConfig::from_node(config),
        };

        debug!(
            "Broker node {} ({}) emitting {:?}",
            node.id,
            node.name.as_deref().unwrap_or("unnamed"),
            envelope.payload
        );
        output.send(envelope)?;

        Ok(node)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}
