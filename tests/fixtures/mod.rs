//! Mock collaborators and helpers for lifecycle integration tests.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use repstate::error::ApplyError;
use repstate::error::LogError;
use repstate::error::TransferError;
use repstate::Config;
use repstate::LogEntry;
use repstate::LogIndex;
use repstate::ParticipantId;
use repstate::ReplicatedLog;
use repstate::ReplicatedStateMachine;
use repstate::SnapshotTransport;
use repstate::StateGeneration;
use repstate::TransferAttempt;
use tokio::time::Instant;

/// Initialize test tracing once; configure with `RUST_LOG`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A config with millisecond retry backoffs, so retry tests finish fast.
pub fn fast_config() -> Arc<Config> {
    let config = Config::build(&[
        "repstate-ut",
        "--retry-backoff-min=1",
        "--retry-backoff-max=5",
    ])
    .unwrap();
    Arc::new(config)
}

pub fn fast_config_with_max_attempts(n: u64) -> Arc<Config> {
    let arg = format!("--snapshot-max-attempts={}", n);
    let config = Config::build(&[
        "repstate-ut",
        "--retry-backoff-min=1",
        "--retry-backoff-max=5",
        &arg,
    ])
    .unwrap();
    Arc::new(config)
}

/// Poll `cond` until it holds, or fail after 5 seconds.
pub async fn poll_until(what: &str, cond: impl Fn() -> bool) -> anyhow::Result<()> {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    anyhow::bail!("timeout waiting until {}", what)
}

/// An in-memory replicated log with injectable leadership-confirmation
/// failures.
#[derive(Debug, Default, Clone)]
pub struct MockLog {
    /// Entries written by prior leaders, returned by `read_existing`.
    pub existing: Vec<LogEntry>,

    /// Entries served to catching-up followers, by index.
    pub entries: BTreeMap<LogIndex, LogEntry>,

    /// Remaining `confirm_leadership` calls to fail.
    pub fail_confirms: Arc<AtomicU64>,

    pub confirm_calls: Arc<AtomicU64>,
}

impl MockLog {
    pub fn with_entries(range: std::ops::RangeInclusive<LogIndex>) -> Self {
        let entries = range
            .map(|i| (i, LogEntry::new(i, format!("entry-{}", i))))
            .collect();
        Self {
            entries,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ReplicatedLog for MockLog {
    async fn confirm_leadership(&mut self, _generation: StateGeneration) -> Result<(), LogError> {
        self.confirm_calls.fetch_add(1, Ordering::Relaxed);

        let remaining = self.fail_confirms.load(Ordering::Relaxed);
        if remaining > 0 {
            self.fail_confirms.store(remaining - 1, Ordering::Relaxed);
            return Err(LogError::with_message("injected confirmation failure"));
        }
        Ok(())
    }

    async fn read_existing(
        &mut self,
        _generation: StateGeneration,
    ) -> Result<Vec<LogEntry>, LogError> {
        Ok(self.existing.clone())
    }

    async fn register_follower(
        &mut self,
        _generation: StateGeneration,
        _leader: ParticipantId,
    ) -> Result<(), LogError> {
        Ok(())
    }

    async fn fetch_entries(
        &mut self,
        first: LogIndex,
        last: LogIndex,
    ) -> Result<Vec<LogEntry>, LogError> {
        Ok(self.entries.range(first..=last).map(|(_, e)| e.clone()).collect())
    }
}

/// A state machine that records what was ingested and applied.
#[derive(Debug, Default, Clone)]
pub struct MockStateMachine {
    pub ingested: Arc<Mutex<Vec<LogEntry>>>,
    pub applied: Arc<Mutex<Vec<LogEntry>>>,
    pub recoveries: Arc<AtomicU64>,
}

impl MockStateMachine {
    pub fn applied_indexes(&self) -> Vec<LogIndex> {
        self.applied.lock().unwrap().iter().map(|e| e.index).collect()
    }
}

#[async_trait]
impl ReplicatedStateMachine for MockStateMachine {
    async fn ingest(&mut self, entries: Vec<LogEntry>) -> Result<(), ApplyError> {
        self.ingested.lock().unwrap().extend(entries);
        Ok(())
    }

    async fn recover(&mut self) -> Result<(), ApplyError> {
        self.recoveries.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn apply(&mut self, entries: Vec<LogEntry>) -> Result<(), ApplyError> {
        self.applied.lock().unwrap().extend(entries);
        Ok(())
    }
}

/// A snapshot transport driven by a scripted queue of outcomes.
///
/// With the queue exhausted a transfer never resolves, standing in for a
/// stuck leader; the worker must stay responsive regardless.
#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    pub outcomes: Arc<Mutex<VecDeque<Result<LogIndex, String>>>>,
    pub calls: Arc<AtomicU64>,
}

impl MockTransport {
    pub fn with_outcomes(outcomes: impl IntoIterator<Item = Result<LogIndex, String>>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes.into_iter().collect())),
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn push_outcome(&self, outcome: Result<LogIndex, String>) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }
}

#[async_trait]
impl SnapshotTransport for MockTransport {
    async fn transfer(
        &mut self,
        attempt: TransferAttempt,
        _generation: StateGeneration,
    ) -> Result<LogIndex, TransferError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        let next = self.outcomes.lock().unwrap().pop_front();
        match next {
            Some(Ok(covers_up_to)) => Ok(covers_up_to),
            Some(Err(msg)) => Err(TransferError::with_message(attempt, msg)),
            None => {
                futures::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}
