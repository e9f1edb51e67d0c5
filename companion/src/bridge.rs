use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Context;
use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, Incoming, MqttOptions, QoS};
use tracing::{info, warn};

use traveler_common::{
    BridgeNetworkConfig, DeviceBridge, KeyMap, OutboundMessage, TransportError,
    TOPIC_COMPANION_STATUS, TOPIC_WATCH_APPMESSAGE, TOPIC_WATCH_KEYS,
};

const REQUEST_QUEUE_CAPACITY: usize = 32;

/// Device-messaging bridge reached over MQTT. Field names are replaced by
/// protocol ids from the same [`KeyMap`] the configurator was given.
pub struct MqttBridge {
    client: AsyncClient,
    keys: KeyMap,
    connected: Arc<AtomicBool>,
}

impl MqttBridge {
    pub fn connect(network: &BridgeNetworkConfig, keys: KeyMap) -> (Self, EventLoop) {
        let mut options = MqttOptions::new(
            network.client_id.clone(),
            network.mqtt_host.clone(),
            network.mqtt_port,
        );
        options.set_keep_alive(Duration::from_secs(30));
        if !network.mqtt_user.is_empty() {
            options.set_credentials(network.mqtt_user.clone(), network.mqtt_pass.clone());
        }

        let (client, eventloop) = AsyncClient::new(options, REQUEST_QUEUE_CAPACITY);
        (Self::new(client, keys), eventloop)
    }

    pub fn new(client: AsyncClient, keys: KeyMap) -> Self {
        Self {
            client,
            keys,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Broker session state, flipped by the event loop task.
    pub fn connection_state(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.connected)
    }

    /// Queues the retained online status and key map registration. They go
    /// out as soon as the event loop reaches the broker.
    pub async fn announce(&self) -> anyhow::Result<()> {
        self.client
            .publish(TOPIC_COMPANION_STATUS, QoS::AtLeastOnce, true, "online")
            .await
            .context("failed to publish companion online status")?;

        let registration = serde_json::to_vec(&self.keys.registration())
            .context("failed to serialize key map registration")?;
        self.client
            .publish(TOPIC_WATCH_KEYS, QoS::AtLeastOnce, true, registration)
            .await
            .context("failed to publish key map registration")?;
        Ok(())
    }
}

#[async_trait]
impl DeviceBridge for MqttBridge {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::Relaxed) {
            return Err(TransportError::Unavailable(
                "not connected to mqtt broker".to_string(),
            ));
        }

        let payload = serde_json::to_vec(&message.to_app_message(&self.keys))?;
        // Never parks on a full request queue.
        self.client
            .try_publish(TOPIC_WATCH_APPMESSAGE, QoS::AtLeastOnce, false, payload)
            .map_err(|err| TransportError::Unavailable(err.to_string()))
    }
}

pub fn spawn_event_loop(mut eventloop: EventLoop, connected: Arc<AtomicBool>) {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        connected.store(true, Ordering::Relaxed);
                        info!("mqtt connected");
                    } else {
                        connected.store(false, Ordering::Relaxed);
                        warn!("mqtt connection refused: {:?}", ack.code);
                    }
                }
                Ok(Event::Incoming(Incoming::Disconnect)) => {
                    connected.store(false, Ordering::Relaxed);
                    warn!("mqtt broker closed the session");
                }
                Ok(_) => {}
                Err(err) => {
                    connected.store(false, Ordering::Relaxed);
                    warn!("mqtt poll error: {err}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });
}
