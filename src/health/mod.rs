mod checker;

pub use checker::HealthChecker;

use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Deserialize;

/// The health state of a single instance IP, per spec.md §4.7.
///
/// `Unchecked` is the state before the first probe has landed; callers that
/// need a binary healthy/unhealthy decision during the startup grace window
/// should treat `Unchecked` as healthy (see [`HealthStatus::treat_as_healthy`]).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum HealthStatus {
    #[default]
    Unchecked,
    Running,
    Failing,
    Unknown,
}

impl HealthStatus {
    pub fn treat_as_healthy(self) -> bool {
        matches!(self, HealthStatus::Unchecked | HealthStatus::Running)
    }
}

/// The JSON body returned by an instance's `/health` endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct HealthProbeBody {
    state: String,
}

impl HealthProbeBody {
    fn status(&self) -> HealthStatus {
        match self.state.as_str() {
            "running" => HealthStatus::Running,
            "failing" => HealthStatus::Failing,
            _ => HealthStatus::Unknown,
        }
    }
}

/// Tracked state for one probed IP: its current status, a consecutive
/// failure counter (used to downgrade `Unknown` to `Failing`), and when it
/// was last observed.
#[derive(Debug, Clone)]
struct Entry {
    status: HealthStatus,
    consecutive_failures: u32,
    observed_at: Instant,
}

/// Holds the most recently observed health status for every IP this server
/// has probed. Safe to share across the request-handling tasks and the
/// periodic sweep task.
pub struct HealthTable {
    entries: DashMap<IpAddr, Entry>,
    max_failures: u32,
    started_at: Instant,
    startup_grace: Duration,
}

impl HealthTable {
    pub fn new(max_failures: u32) -> Self {
        Self::with_startup_grace(max_failures, Duration::from_secs(30))
    }

    pub fn with_startup_grace(max_failures: u32, startup_grace: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_failures,
            started_at: Instant::now(),
            startup_grace,
        }
    }

    /// The status to use when answering a query right now. An IP never
    /// probed before reports `Unchecked`.
    pub fn status(&self, ip: IpAddr) -> HealthStatus {
        self.entries
            .get(&ip)
            .map(|e| e.status)
            .unwrap_or(HealthStatus::Unchecked)
    }

    /// The status a criteria filter should gate on: `Unchecked` is
    /// substituted with `Running` while the server is still within its
    /// startup grace window, so a cold-started health map doesn't answer
    /// every health-filtered query empty (spec.md §4.2 step 3, §9).
    pub fn effective_status(&self, ip: IpAddr) -> HealthStatus {
        let status = self.status(ip);
        if status == HealthStatus::Unchecked && self.started_at.elapsed() < self.startup_grace {
            HealthStatus::Running
        } else {
            status
        }
    }

    /// Ensures `ip` has a table entry, inserting it as `Unchecked` if this
    /// is the first time anything has referenced it. Returns `true` when a
    /// new entry was created, so the caller can trigger the synchronous
    /// first-observation probe (spec.md §4.7) and so the periodic sweep
    /// (which only ever walks `known_ips()`) has something to probe at all.
    pub fn observe(&self, ip: IpAddr) -> bool {
        match self.entries.entry(ip) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(Entry {
                    status: HealthStatus::Unchecked,
                    consecutive_failures: 0,
                    observed_at: Instant::now(),
                });
                true
            }
        }
    }

    pub fn record_success(&self, ip: IpAddr, body: &HealthProbeBody) {
        self.entries.insert(
            ip,
            Entry {
                status: body.status(),
                consecutive_failures: 0,
                observed_at: Instant::now(),
            },
        );
    }

    /// Records a failed probe (connection error, TLS error, bad JSON).
    /// The status only drops to `Failing` once `max_failures` consecutive
    /// probes have failed; before that it reports `Unknown`.
    pub fn record_failure(&self, ip: IpAddr) {
        let mut entry = self.entries.entry(ip).or_insert(Entry {
            status: HealthStatus::Unknown,
            consecutive_failures: 0,
            observed_at: Instant::now(),
        });
        entry.consecutive_failures += 1;
        entry.observed_at = Instant::now();
        entry.status = if entry.consecutive_failures >= self.max_failures {
            HealthStatus::Failing
        } else {
            HealthStatus::Unknown
        };
    }

    pub fn known_ips(&self) -> Vec<IpAddr> {
        self.entries.iter().map(|e| *e.key()).collect()
    }

    pub fn age(&self, ip: IpAddr) -> Option<Duration> {
        self.entries.get(&ip).map(|e| e.observed_at.elapsed())
    }
}
