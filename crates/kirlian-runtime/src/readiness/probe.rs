//! Active readiness probes.

use std::time::Duration;

use async_trait::async_trait;
use kirlian_core::domain::SERVING_ADDRESS;
use kirlian_core::{ReadinessDetector, live_url};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::debug;

const DEFAULT_INTERVAL: Duration = Duration::from_millis(250);
const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);

/// Ready once a TCP connection to the port succeeds.
#[derive(Debug, Clone)]
pub struct TcpProbeDetector {
    interval: Duration,
    attempt_timeout: Duration,
}

impl Default for TcpProbeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl TcpProbeDetector {
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

#[async_trait]
impl ReadinessDetector for TcpProbeDetector {
    fn name(&self) -> &'static str {
        "tcp"
    }

    async fn wait_ready(&self, port: u16) -> u16 {
        if port == 0 {
            return std::future::pending().await;
        }
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match timeout(self.attempt_timeout, TcpStream::connect((SERVING_ADDRESS, port))).await {
                Ok(Ok(_)) => {
                    debug!(port, attempt, "TCP probe connected");
                    return port;
                }
                Ok(Err(e)) => debug!(port, attempt, error = %e, "TCP probe refused"),
                Err(_) => debug!(port, attempt, "TCP probe timed out"),
            }
            sleep(self.interval).await;
        }
    }
}

/// Ready once the port answers an HTTP `GET /` with any status.
#[derive(Debug, Clone)]
pub struct HttpProbeDetector {
    client: reqwest::Client,
    interval: Duration,
}

impl Default for HttpProbeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl HttpProbeDetector {
    pub fn new(interval: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_ATTEMPT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, interval }
    }
}

#[async_trait]
impl ReadinessDetector for HttpProbeDetector {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn wait_ready(&self, port: u16) -> u16 {
        if port == 0 {
            return std::future::pending().await;
        }
        let url = format!("{}/", live_url(port));
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.client.get(&url).send().await {
                Ok(response) => {
                    debug!(port, attempt, status = %response.status(), "HTTP probe answered");
                    return port;
                }
                Err(e) => debug!(port, attempt, error = %e, "HTTP probe failed"),
            }
            sleep(self.interval).await;
        }
    }
}
