//! Per-peer color senders

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::color::DeviceColor;

mod mqtt;
pub use mqtt::Mqtt;

mod stdout;
pub use stdout::Stdout;

mod udp;
pub use udp::Udp;

#[derive(Debug, Error)]
pub enum MethodError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot resolve address for {0}")]
    Unresolved(String),
    #[error("mqtt client error: {0}")]
    MqttClient(#[from] rumqttc::ClientError),
    #[error("mqtt connection error: {0}")]
    MqttConnection(#[from] rumqttc::ConnectionError),
    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

/// Wire format shared by all methods: `"r, g, b"`
pub fn format_payload(color: DeviceColor) -> String {
    format!("{}, {}, {}", color.red, color.green, color.blue)
}

/// Trait for methods delivering colors to a single peer
#[async_trait]
pub trait Method: Send {
    /// Peer name, for logging
    fn name(&self) -> &str;

    /// Deliver a color to the peer. Delivery is best-effort.
    async fn write(&mut self, color: DeviceColor) -> Result<(), MethodError>;

    /// Flush pending writes and release the connection
    async fn close(&mut self) -> Result<(), MethodError> {
        Ok(())
    }
}
