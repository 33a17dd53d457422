use crate::config::ConfigError;
use crate::emitter::OutputError;
use rumqttc::{AsyncClient, Event, EventLoop, Outgoing, Packet};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Output error: {0}")]
    Output(#[from] OutputError),
    #[error("MQTT connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),
    #[error("Broker did not acknowledge the envelope within {0:?}")]
    Timeout(Duration),
}

/// Unique client id for one run of the service.
pub fn client_id() -> String {
    format!("broker_node_{}", Uuid::new_v4())
}

/// Drive the event loop until the queued envelope is acknowledged.
pub async fn await_delivery(eventloop: &mut EventLoop, limit: Duration) -> Result<(), ServiceError> {
    timeout(limit, poll_until_ack(eventloop))
        .await
        .map_err(|_| ServiceError::Timeout(limit))?
}

async fn poll_until_ack(eventloop: &mut EventLoop) -> Result<(), ServiceError> {
    loop {
        match eventloop.poll().await? {
            Event::Incoming(Packet::ConnAck(_)) => {
                info!("Connected to MQTT broker.");
            }
            Event::Incoming(Packet::PubAck(ack)) => {
                debug!("Broker acknowledged packet {}", ack.pkid);
                return Ok(());
            }
            Event::Outgoing(Outgoing::Publish(pkid)) => {
                debug!("Outgoing publish {}", pkid);
            }
            event => {
                debug!("Unhandled event: {:?}", event);
            }
        }
    }
}

/// Send DISCONNECT and let the event loop flush it.
pub async fn shutdown(client: &AsyncClient, eventloop: &mut EventLoop, limit: Duration) {
    if let Err(e) = client.disconnect().await {
        warn!("Failed to request disconnect: {}", e);
        return;
    }

    let flushed = timeout(limit, async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                Ok(_) => continue,
                Err(e) => {
                    debug!("Event loop closed: {:?}", e);
                    break;
                }
            }
        }
    })
    .await;

    if flushed.is_err() {
        warn!("Disconnect was not flushed within {:?}", limit);
    } else {
        info!("Disconnected from MQTT broker.");
    }
}
