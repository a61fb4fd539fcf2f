use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::RecursorSelection;
use crate::error::DnsError;

const FAIL_HISTORY_LENGTH: usize = 25;
const FAIL_HISTORY_THRESHOLD: i32 = 5;

/// Picks among a configured set of upstream recursors and retries on
/// network failures, per spec.md §4.4.
///
/// Grounded directly on `failover_recursor_pool.go`'s two strategies:
/// `Serial` always starts from the front of the list and does not track
/// history; `Smart` randomizes nothing itself (the teacher's caller shuffles
/// the initial list) but keeps a fixed-length fail/success window per
/// recursor and shifts its preferred starting index once the current
/// preferred recursor's failure count in that window crosses the threshold.
pub enum RecursorPool {
    Serial(SerialPool),
    Smart(SmartPool),
}

impl RecursorPool {
    pub fn new(recursors: Vec<SocketAddr>, selection: RecursorSelection, max_retries: u32) -> Self {
        match selection {
            RecursorSelection::Serial => RecursorPool::Serial(SerialPool { recursors, max_retries }),
            RecursorSelection::Smart => RecursorPool::Smart(SmartPool::new(recursors, max_retries)),
        }
    }

    /// Runs `work` against recursors in this pool's preference order until
    /// one succeeds, retrying network errors per-recursor up to
    /// `max_retries` times before moving on. A pool with no configured
    /// recursors at all fails immediately with `UnknownZone` (REFUSED per
    /// spec.md §7) rather than exhausting zero attempts into a SERVFAIL.
    pub async fn perform<F, Fut, T>(&self, work: F) -> Result<T, DnsError>
    where
        F: Fn(SocketAddr) -> Fut,
        Fut: Future<Output = Result<T, DnsError>>,
    {
        match self {
            RecursorPool::Serial(pool) => pool.perform(work).await,
            RecursorPool::Smart(pool) => pool.perform(work).await,
        }
    }
}

async fn perform_with_retry<F, Fut, T>(
    work: &F,
    recursor: SocketAddr,
    max_retries: u32,
) -> Result<T, DnsError>
where
    F: Fn(SocketAddr) -> Fut,
    Fut: Future<Output = Result<T, DnsError>>,
{
    let mut last_err = DnsError::NoRecursorResponse;
    for attempt in 0..=max_retries {
        match work(recursor).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => {
                debug!(
                    "network error from recursor {recursor}, retry {attempt}/{max_retries}: {e}"
                );
                last_err = e;
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err)
}

pub struct SerialPool {
    recursors: Vec<SocketAddr>,
    max_retries: u32,
}

impl SerialPool {
    /// Tries recursors in configured order. A recursor is only abandoned in
    /// favor of the next one after its retries are exhausted on network
    /// errors; any other error terminates the whole call immediately rather
    /// than falling through to the next upstream — this is the
    /// intentionally-preserved serial-mode behavior from spec.md §4.4/§9
    /// (flagged there as possibly a bug, not "fixed" here).
    async fn perform<F, Fut, T>(&self, work: F) -> Result<T, DnsError>
    where
        F: Fn(SocketAddr) -> Fut,
        Fut: Future<Output = Result<T, DnsError>>,
    {
        if self.recursors.is_empty() {
            return Err(DnsError::UnknownZone);
        }

        let mut last_err = DnsError::NoRecursorResponse;
        for &recursor in &self.recursors {
            match perform_with_retry(&work, recursor, self.max_retries).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    last_err = e;
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err)
    }
}

struct RecursorWithHistory {
    addr: SocketAddr,
    fail_window: Mutex<VecDeque<bool>>,
    fail_count: AtomicI32,
}

impl RecursorWithHistory {
    fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            fail_window: Mutex::new(VecDeque::from(vec![false; FAIL_HISTORY_LENGTH])),
            fail_count: AtomicI32::new(0),
        }
    }

    /// Slides `was_error` into the fixed-length window, maintaining the
    /// invariant that `fail_count == popcount(fail_window)`, and returns
    /// the new failure count.
    fn register_result(&self, was_error: bool) -> i32 {
        let mut window = self.fail_window.lock();
        let oldest = window.pop_front().unwrap_or(false);
        window.push_back(was_error);
        drop(window);

        let mut change = 0;
        if oldest {
            change -= 1;
        }
        if was_error {
            change += 1;
        }
        self.fail_count.fetch_add(change, Ordering::SeqCst) + change
    }
}

pub struct SmartPool {
    preferred_index: AtomicU64,
    recursors: Vec<RecursorWithHistory>,
    max_retries: u32,
}

impl SmartPool {
    fn new(recursors: Vec<SocketAddr>, max_retries: u32) -> Self {
        if let Some(first) = recursors.first() {
            info!("starting recursor preference: {first}");
        }
        Self {
            preferred_index: AtomicU64::new(0),
            recursors: recursors.into_iter().map(RecursorWithHistory::new).collect(),
            max_retries,
        }
    }

    async fn perform<F, Fut, T>(&self, work: F) -> Result<T, DnsError>
    where
        F: Fn(SocketAddr) -> Fut,
        Fut: Future<Output = Result<T, DnsError>>,
    {
        let offset = self.preferred_index.load(Ordering::SeqCst);
        let count = self.recursors.len() as u64;
        if count == 0 {
            return Err(DnsError::UnknownZone);
        }

        for i in 0..count {
            let index = ((i + offset) % count) as usize;
            let recursor = &self.recursors[index];

            match perform_with_retry(&work, recursor.addr, self.max_retries).await {
                Ok(value) => {
                    recursor.register_result(false);
                    return Ok(value);
                }
                Err(_) => {
                    let failures = recursor.register_result(true);
                    if i == 0 && failures >= FAIL_HISTORY_THRESHOLD {
                        self.shift_preference();
                    }
                }
            }
        }

        Err(DnsError::NoRecursorResponse)
    }

    fn shift_preference(&self) {
        let new_index = self.preferred_index.fetch_add(1, Ordering::SeqCst) + 1;
        let index = (new_index % self.recursors.len() as u64) as usize;
        info!("shifting recursor preference: {}", self.recursors[index].addr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[tokio::test]
    async fn an_empty_serial_pool_refuses_instead_of_servfailing() {
        let pool = RecursorPool::new(vec![], RecursorSelection::Serial, 0);
        let result = pool.perform(|_| async { Ok::<(), DnsError>(()) }).await;
        assert!(matches!(result, Err(DnsError::UnknownZone)));
    }

    #[tokio::test]
    async fn an_empty_smart_pool_refuses_instead_of_servfailing() {
        let pool = RecursorPool::new(vec![], RecursorSelection::Smart, 0);
        let result = pool.perform(|_| async { Ok::<(), DnsError>(()) }).await;
        assert!(matches!(result, Err(DnsError::UnknownZone)));
    }

    #[tokio::test]
    async fn serial_pool_falls_through_to_the_next_recursor_on_network_error() {
        let pool = RecursorPool::new(vec![addr(1), addr(2)], RecursorSelection::Serial, 0);
        let calls: Arc<Mutex<Vec<SocketAddr>>> = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = calls.clone();

        let result = pool
            .perform(move |recursor| {
                let calls = calls_clone.clone();
                async move {
                    calls.lock().push(recursor);
                    if recursor == addr(1) {
                        Err(DnsError::Timeout)
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(*calls.lock(), vec![addr(1), addr(2)]);
    }

    #[tokio::test]
    async fn serial_pool_aborts_on_the_first_non_network_error() {
        let pool = RecursorPool::new(vec![addr(1), addr(2)], RecursorSelection::Serial, 0);
        let calls: Arc<Mutex<Vec<SocketAddr>>> = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = calls.clone();

        let result = pool
            .perform(move |recursor| {
                let calls = calls_clone.clone();
                async move {
                    calls.lock().push(recursor);
                    Err::<(), _>(DnsError::NXDomain)
                }
            })
            .await;

        assert!(matches!(result, Err(DnsError::NXDomain)));
        assert_eq!(*calls.lock(), vec![addr(1)]);
    }

    #[tokio::test]
    async fn smart_pool_shifts_preference_after_threshold_failures() {
        let pool = match RecursorPool::new(vec![addr(1), addr(2)], RecursorSelection::Smart, 0) {
            RecursorPool::Smart(p) => p,
            _ => unreachable!(),
        };

        let attempts = AtomicUsize::new(0);
        for _ in 0..FAIL_HISTORY_THRESHOLD {
            let _ = pool
                .perform(|recursor| {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if recursor == addr(1) {
                            Err::<(), _>(DnsError::Timeout)
                        } else {
                            Ok(())
                        }
                    }
                })
                .await;
        }

        assert_eq!(pool.preferred_index.load(Ordering::SeqCst), 1);
    }
}
