//! Registry of live jobs.
//!
//! The only state shared between request handlers and job tasks. Every
//! access goes through the `jobs` lock, which is never held across an await.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{broadcast, Notify};

use super::job::{Job, SimulationConfig};
use super::manager::JobSummary;
use super::path::ObjectPath;
use super::signal::Signal;
use crate::telemetry;

/// `JobRemoved` status for a job that ran to its end.
pub const JOB_STATUS_SUCCESS: i32 = 0;

struct JobEntry {
    job: Arc<Job>,
    path: ObjectPath,
}

/// Millisecond wall-clock ids, bumped past the last issued id when the
/// clock has not moved (or moved backwards).
struct JobIdSource {
    last: AtomicU64,
}

impl JobIdSource {
    fn new() -> Self {
        Self { last: AtomicU64::new(0) }
    }

    fn next(&self) -> u64 {
        let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);
        now.max(previous.saturating_add(1))
    }
}

pub struct JobRegistry {
    jobs: RwLock<BTreeMap<u64, JobEntry>>,
    ids: JobIdSource,
    signals: broadcast::Sender<Signal>,
    /// Woken whenever the last live job is removed.
    drained: Notify,
    simulation: SimulationConfig,
}

impl JobRegistry {
    pub fn new(simulation: SimulationConfig) -> Self {
        let (signals, _) = broadcast::channel(simulation.signal_capacity.max(1));
        Self {
            jobs: RwLock::new(BTreeMap::new()),
            ids: JobIdSource::new(),
            signals,
            drained: Notify::new(),
            simulation,
        }
    }

    /// Allocate a job id that has never been handed out by this registry.
    pub fn next_id(&self) -> u64 {
        self.ids.next()
    }

    /// Create a job, register it and start its progress task.
    ///
    /// Registration happens before the task is spawned, so the task's
    /// final `remove` always finds its entry. Must be called from within a
    /// tokio runtime.
    pub fn start_job(self: &Arc<Self>, job_type: &str, offline: bool) -> Arc<Job> {
        let id = self.next_id();
        let job = Arc::new(Job::new(id, job_type, offline, self.signals.clone()));
        let live = {
            let mut jobs = self.jobs.write();
            jobs.insert(
                id,
                JobEntry {
                    job: Arc::clone(&job),
                    path: job.path().clone(),
                },
            );
            jobs.len()
        };
        telemetry::record_live_jobs(live);

        tokio::spawn(Arc::clone(&job).simulate(Arc::clone(self), self.simulation.clone()));
        job
    }

    pub fn get(&self, id: u64) -> Option<Arc<Job>> {
        self.jobs.read().get(&id).map(|entry| Arc::clone(&entry.job))
    }

    /// Consistent point-in-time copy of all live jobs, ordered by id.
    pub fn snapshot(&self) -> Vec<JobSummary> {
        self.jobs
            .read()
            .iter()
            .map(|(id, entry)| JobSummary {
                id: *id,
                job_type: entry.job.job_type().to_string(),
                progress: entry.job.progress(),
                path: entry.path.clone(),
            })
            .collect()
    }

    /// Deregister a job and announce it with `JobRemoved`.
    ///
    /// Removing an unknown id is a no-op. Returns whether an entry was
    /// removed; the signal is emitted only in that case, so it fires at most
    /// once per id.
    pub fn remove(&self, id: u64, status: i32) -> bool {
        let (removed, live) = {
            let mut jobs = self.jobs.write();
            let removed = jobs.remove(&id);
            (removed, jobs.len())
        };
        let Some(entry) = removed else {
            return false;
        };

        telemetry::record_live_jobs(live);
        telemetry::record_job_finished(entry.job.was_interrupted());
        tracing::info!(job_id = id, status, path = %entry.path, "Job removed");
        self.emit(Signal::JobRemoved {
            id,
            path: entry.path,
            status,
        });
        if live == 0 {
            self.drained.notify_waiters();
        }
        true
    }

    /// Cancel every live job. Their tasks deregister them shortly after.
    pub fn cancel_all(&self) -> usize {
        let jobs: Vec<Arc<Job>> = self
            .jobs
            .read()
            .values()
            .map(|entry| Arc::clone(&entry.job))
            .collect();
        for job in &jobs {
            job.cancel();
        }
        jobs.len()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    /// Wait until no jobs are live. Returns `false` if some were still
    /// registered when `timeout` ran out.
    pub async fn wait_until_empty(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.drained.notified();
            if self.is_empty() {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.is_empty();
            }
        }
    }

    pub fn emit(&self, signal: Signal) {
        let _ = self.signals.send(signal);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.signals.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_strictly_increase() {
        let source = JobIdSource::new();
        let mut last = 0;
        for _ in 0..1000 {
            let id = source.next();
            assert!(id > last, "id {} not greater than {}", id, last);
            last = id;
        }
    }

    #[test]
    fn test_ids_unique_across_threads() {
        let source = Arc::new(JobIdSource::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let source = Arc::clone(&source);
                std::thread::spawn(move || (0..250).map(|_| source.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {}", id);
            }
        }
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn test_ids_are_wall_clock_derived() {
        let source = JobIdSource::new();
        let now = chrono::Utc::now().timestamp_millis() as u64;
        assert!(source.next() >= now);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let registry = JobRegistry::new(SimulationConfig::default());
        let mut rx = registry.subscribe();
        assert!(!registry.remove(12345, JOB_STATUS_SUCCESS));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_empty_follows_cancellation() {
        let registry = Arc::new(JobRegistry::new(SimulationConfig::default()));
        assert!(registry.wait_until_empty(Duration::ZERO).await);

        registry.start_job("update", false);
        registry.start_job("update", true);
        assert!(!registry.wait_until_empty(Duration::from_millis(50)).await);

        assert_eq!(registry.cancel_all(), 2);
        assert!(registry.wait_until_empty(Duration::from_millis(1)).await);
        assert!(registry.is_empty());
    }
}
