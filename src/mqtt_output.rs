use crate::connection::MqttParams;
use crate::emitter::{Output, OutputError};
use crate::models::Envelope;
use rumqttc::{AsyncClient, EventLoop, QoS};
use tracing::{debug, info};

/// Node output that publishes each envelope as JSON on an MQTT topic.
///
/// Sending never blocks: the publish is queued on the client and goes out
/// once the caller drives the returned [`EventLoop`].
pub struct MqttOutput {
    client: AsyncClient,
    topic: String,
    qos: QoS,
    retain: bool,
}

impl MqttOutput {
    pub fn connect(
        params: &MqttParams,
        client_id: &str,
        topic: &str,
        retain: bool,
    ) -> (Self, EventLoop) {
        debug!("Configuring MQTT broker at {}:{}...", params.host, params.port);

        let (client, eventloop) = AsyncClient::new(params.mqtt_options(client_id), 10);
        let output = Self {
            client,
            topic: topic.to_string(),
            qos: QoS::AtLeastOnce,
            retain,
        };
        (output, eventloop)
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn client(&self) -> &AsyncClient {
        &self.client
    }
}

impl Output for MqttOutput {
    type Error = OutputError;

    fn send(&mut self, envelope: Envelope) -> Result<(), OutputError> {
        let body = encode(&envelope)?;
        self.client
            .try_publish(self.topic.clone(), self.qos, self.retain, body)?;
        info!("Envelope queued for '{}'", self.topic);
        Ok(())
    }
}

/// JSON body of a published envelope.
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, OutputError> {
    Ok(serde_json::to_vec(envelope)?)
}
