use broker_flux::config::{load_node_config, Config};
use broker_flux::emitter::ConfigEmitter;
use broker_flux::mqtt_output::MqttOutput;
use broker_flux::service_utils::{await_delivery, client_id, shutdown, ServiceError};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), ServiceError> {
    let config = Config::from_env()?;
    let node_config = load_node_config(&config.node_config_path)?;
    info!(
        "Loaded broker node definition from {}",
        config.node_config_path.display()
    );

    let (mut output, mut eventloop) = MqttOutput::connect(
        &config.mqtt_params(),
        &client_id(),
        &config.output_topic,
        config.mqtt_retain,
    );

    let node = ConfigEmitter::instantiate(&node_config, &mut output)?;
    info!("Broker node {} instantiated", node.id());

    let limit = Duration::from_millis(config.mqtt_publish_timeout_ms);
    await_delivery(&mut eventloop, limit).await?;
    info!("Envelope delivered to '{}'", output.topic());

    shutdown(output.client(), &mut eventloop, limit).await;
    Ok(())
}
