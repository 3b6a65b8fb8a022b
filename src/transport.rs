//! Fan-out of colors to every configured peer

use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;

use crate::{
    color::DeviceColor,
    methods::{Method, MethodError, Mqtt, Stdout, Udp},
    models,
};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no UDP peers and no MQTT broker configured")]
    NoPeers,
    #[error("cannot set up {peer}: {source}")]
    Method {
        peer: String,
        source: MethodError,
    },
}

/// Outcome of a single [Transport::send]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SendReport {
    pub delivered: usize,
    pub failed: usize,
}

pub struct Transport {
    methods: Vec<Box<dyn Method>>,
    send_timeout: Duration,
}

impl Transport {
    pub fn new(methods: Vec<Box<dyn Method>>, send_timeout: Duration) -> Self {
        Self {
            methods,
            send_timeout,
        }
    }

    /// Set up all methods for the given output configuration
    ///
    /// Any peer that cannot be resolved or connected is a fatal error.
    #[instrument(skip(config))]
    pub async fn from_config(
        config: &models::Output,
        send_timeout: Duration,
    ) -> Result<Self, TransportError> {
        if config.is_empty() && !config.stdout {
            return Err(TransportError::NoPeers);
        }

        let mut methods: Vec<Box<dyn Method>> = Vec::new();

        if !config.udp_peers.is_empty() {
            let socket = Udp::bind().await.map_err(|source| TransportError::Method {
                peer: "udp socket".to_owned(),
                source,
            })?;

            for peer in &config.udp_peers {
                let udp = Udp::new(peer, socket.clone())
                    .await
                    .map_err(|source| TransportError::Method {
                        peer: peer.clone(),
                        source,
                    })?;

                methods.push(Box::new(udp));
            }
        }

        if let Some(hostname) = &config.mqtt_hostname {
            let mqtt = Mqtt::connect(hostname)
                .await
                .map_err(|source| TransportError::Method {
                    peer: hostname.clone(),
                    source,
                })?;

            methods.push(Box::new(mqtt));
        }

        if config.stdout {
            methods.push(Box::new(Stdout::new()));
        }

        info!(
            peers = %methods.iter().map(|m| m.name()).collect::<Vec<_>>().join(", "),
            "transport ready"
        );

        Ok(Self::new(methods, send_timeout))
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Send a color to all peers at once
    ///
    /// Each peer gets at most the configured send timeout. Failures are logged and
    /// counted, they never abort delivery to the other peers.
    pub async fn send(&mut self, color: DeviceColor) -> SendReport {
        let timeout = self.send_timeout;

        let results = join_all(self.methods.iter_mut().map(|method| async move {
            let result = match tokio::time::timeout(timeout, method.write(color)).await {
                Ok(result) => result,
                Err(_) => Err(MethodError::Timeout(timeout)),
            };

            if let Err(error) = &result {
                warn!(peer = %method.name(), error = %error, "send failed");
            }

            result.is_ok()
        }))
        .await;

        let delivered = results.iter().filter(|ok| **ok).count();
        SendReport {
            delivered,
            failed: results.len() - delivered,
        }
    }

    /// Close all methods, waiting for queued messages to be sent
    pub async fn close(&mut self) {
        for method in &mut self.methods {
            if let Err(error) = method.close().await {
                warn!(peer = %method.name(), error = %error, "close failed");
            }
        }
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field(
                "methods",
                &self.methods.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .field("send_timeout", &self.send_timeout)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;

    /// Records every color it is asked to deliver
    #[derive(Clone, Default)]
    pub(crate) struct Recorder {
        pub(crate) colors: Arc<Mutex<Vec<DeviceColor>>>,
    }

    #[async_trait]
    impl Method for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn write(&mut self, color: DeviceColor) -> Result<(), MethodError> {
            self.colors.lock().unwrap().push(color);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Method for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn write(&mut self, _color: DeviceColor) -> Result<(), MethodError> {
            Err(std::io::Error::from(std::io::ErrorKind::ConnectionRefused).into())
        }
    }

    struct Stalled;

    #[async_trait]
    impl Method for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn write(&mut self, _color: DeviceColor) -> Result<(), MethodError> {
            futures::future::pending().await
        }
    }

    #[tokio::test]
    async fn failing_peer_does_not_block_others() {
        let a = Recorder::default();
        let b = Recorder::default();

        let mut transport = Transport::new(
            vec![Box::new(a.clone()), Box::new(Failing), Box::new(b.clone())],
            Duration::from_millis(100),
        );

        let report = transport.send(DeviceColor::new(1, 2, 3)).await;
        assert_eq!(
            report,
            SendReport {
                delivered: 2,
                failed: 1
            }
        );

        assert_eq!(*a.colors.lock().unwrap(), vec![DeviceColor::new(1, 2, 3)]);
        assert_eq!(*b.colors.lock().unwrap(), vec![DeviceColor::new(1, 2, 3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_peer_times_out() {
        let a = Recorder::default();

        let mut transport = Transport::new(
            vec![Box::new(Stalled), Box::new(a.clone())],
            Duration::from_millis(50),
        );

        let started = tokio::time::Instant::now();
        let report = transport.send(DeviceColor::new(9, 9, 9)).await;

        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert_eq!(a.colors.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn requires_a_peer() {
        let config = models::Output::default();

        assert!(matches!(
            Transport::from_config(&config, Duration::from_millis(100)).await,
            Err(TransportError::NoPeers)
        ));
    }

    #[tokio::test]
    async fn builds_udp_and_stdout_methods() {
        let config = models::Output {
            udp_peers: vec!["127.0.0.1".to_owned(), "127.0.0.2:4000".to_owned()],
            stdout: true,
            ..Default::default()
        };

        let transport = Transport::from_config(&config, Duration::from_millis(100))
            .await
            .expect("failed to build transport");
        assert_eq!(transport.len(), 3);
    }
}
