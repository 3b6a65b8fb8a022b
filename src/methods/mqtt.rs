//! Definition of the MQTT method

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{
    AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
};
use tokio::task::JoinHandle;

use super::{format_payload, Method, MethodError};
use crate::color::DeviceColor;

pub const DEFAULT_PORT: u16 = 1883;
pub const TOPIC: &str = "leds/main/command";

const KEEP_ALIVE: Duration = Duration::from_secs(100);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Publishes colors to the LED command topic of an MQTT broker
pub struct Mqtt {
    name: String,
    client: AsyncClient,
    event_loop: JoinHandle<()>,
}

impl Mqtt {
    /// Poll until the broker accepted the connection
    ///
    /// A refused connection is reported by `poll` itself.
    async fn wait_connack(event_loop: &mut EventLoop) -> Result<(), MethodError> {
        loop {
            if let Event::Incoming(Packet::ConnAck(_)) = event_loop.poll().await? {
                return Ok(());
            }
        }
    }

    /// Connect to the broker
    ///
    /// Returns once the broker acknowledged the connection. The event loop then keeps
    /// running in a background task, reconnecting as needed.
    ///
    /// # Parameters
    ///
    /// * `hostname`: host name of the broker, on port [DEFAULT_PORT]
    pub async fn connect(hostname: &str) -> Result<Self, MethodError> {
        Self::connect_to(hostname, DEFAULT_PORT).await
    }

    #[instrument]
    pub async fn connect_to(hostname: &str, port: u16) -> Result<Self, MethodError> {
        let mut options =
            MqttOptions::new(format!("gamelights-{}", std::process::id()), hostname, port);
        options.set_keep_alive(KEEP_ALIVE);

        let (client, mut event_loop) = AsyncClient::new(options, 10);

        tokio::time::timeout(CONNECT_TIMEOUT, Self::wait_connack(&mut event_loop))
            .await
            .map_err(|_| MethodError::Timeout(CONNECT_TIMEOUT))??;

        info!(broker = %hostname, "connected to mqtt broker");

        let name = format!("mqtt://{}", hostname);
        let event_loop = tokio::spawn({
            let name = name.clone();

            async move {
                loop {
                    match event_loop.poll().await {
                        Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                            debug!(broker = %name, "disconnected");
                            break;
                        }
                        Ok(event) => {
                            trace!(broker = %name, ?event, "mqtt event");
                        }
                        Err(error) => {
                            warn!(broker = %name, error = %error, "mqtt connection error");
                            tokio::time::sleep(RECONNECT_DELAY).await;
                        }
                    }
                }
            }
        });

        Ok(Self {
            name,
            client,
            event_loop,
        })
    }
}

#[async_trait]
impl Method for Mqtt {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, color: DeviceColor) -> Result<(), MethodError> {
        // Queued for the event loop, never waits on the broker
        self.client
            .try_publish(TOPIC, QoS::AtMostOnce, false, format_payload(color))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), MethodError> {
        let client = &self.client;
        let event_loop = &mut self.event_loop;

        // The event loop exits once the disconnect packet, queued after all publishes, is out
        tokio::time::timeout(CONNECT_TIMEOUT, async move {
            client.disconnect().await?;
            let _ = event_loop.await;
            Ok::<_, MethodError>(())
        })
        .await
        .map_err(|_| MethodError::Timeout(CONNECT_TIMEOUT))?
    }
}

impl Drop for Mqtt {
    fn drop(&mut self) {
        self.event_loop.abort();
    }
}
