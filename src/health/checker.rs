use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::{HealthProbeBody, HealthTable};
use crate::config::HealthConfig;

/// Probes every known instance IP's `/health` endpoint on a fixed interval
/// over mTLS, updating a shared [`HealthTable`].
///
/// Grounded on the response-time/backoff health tracker the teacher's
/// resolver used to keep per-upstream, generalized here to per-instance
/// mTLS probing: same "probe on an interval, keep a shared table, never let
/// a probe failure affect in-flight queries" shape.
/// How long [`HealthChecker::probe_now`] waits for a first-observation
/// probe to land before giving up and leaving the IP `Unchecked` for the
/// next periodic sweep (spec.md §4.7).
const SYNC_PROBE_DEADLINE: Duration = Duration::from_millis(750);

pub struct HealthChecker {
    client: reqwest::Client,
    table: Arc<HealthTable>,
    port: u16,
    check_interval: Duration,
}

impl HealthChecker {
    pub fn new(config: &HealthConfig, table: Arc<HealthTable>) -> Result<Self, reqwest::Error> {
        let identity = reqwest::Identity::from_pem(
            format!(
                "{}\n{}",
                std::fs::read_to_string(&config.cert).unwrap_or_default(),
                std::fs::read_to_string(&config.key).unwrap_or_default()
            )
            .as_bytes(),
        )?;
        let ca_cert = reqwest::Certificate::from_pem(
            std::fs::read(&config.ca).unwrap_or_default().as_slice(),
        )?;

        let client = reqwest::Client::builder()
            .identity(identity)
            .add_root_certificate(ca_cert)
            .timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            table,
            port: config.port,
            check_interval: config.check_interval,
        })
    }

    pub fn table(&self) -> Arc<HealthTable> {
        self.table.clone()
    }

    /// Probes a single IP immediately, synchronously, with a short deadline.
    /// Used for the first observation of a newly seen IP so it doesn't sit
    /// at `Unchecked` until the next sweep. If the deadline elapses before
    /// the probe completes, the in-flight probe is abandoned and the IP is
    /// left `Unchecked` until the next periodic sweep picks it up.
    pub async fn probe_now(&self, ip: IpAddr) {
        if tokio::time::timeout(SYNC_PROBE_DEADLINE, self.probe(ip)).await.is_err() {
            debug!("synchronous health probe for {ip} did not land within the deadline");
        }
    }

    /// Runs the periodic sweep until `shutdown` fires.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.check_interval);
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!("health checker shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    let ips = self.table.known_ips();
                    for ip in ips {
                        self.probe(ip).await;
                    }
                }
            }
        }
    }

    async fn probe(&self, ip: IpAddr) {
        let host = match ip {
            IpAddr::V4(v4) => v4.to_string(),
            IpAddr::V6(v6) => format!("[{v6}]"),
        };
        let url = format!("https://{host}:{}/health", self.port);

        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                match response.json::<HealthProbeBody>().await {
                    Ok(body) => self.table.record_success(ip, &body),
                    Err(e) => {
                        debug!("health probe for {ip} returned invalid JSON: {e}");
                        self.table.record_failure(ip);
                    }
                }
            }
            Ok(response) => {
                debug!("health probe for {ip} returned status {}", response.status());
                self.table.record_failure(ip);
            }
            Err(e) => {
                warn!("health probe for {ip} failed: {e}");
                self.table.record_failure(ip);
            }
        }
    }
}
