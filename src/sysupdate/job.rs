//! A single simulated update job.
//!
//! Progress lives in an atomic so reads never block, but every transition
//! (tick or cancel) happens under a small mutex together with its
//! PropertiesChanged emission. That keeps the published progress sequence
//! for one job in the same order as the underlying state changes.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::path::ObjectPath;
use super::property::{Properties, PropertyName, Variant};
use super::registry::{JobRegistry, JOB_STATUS_SUCCESS};
use super::signal::Signal;
use super::JOB_INTERFACE;

/// Job type reported for jobs created by `Target::update`.
pub const JOB_TYPE_UPDATE: &str = "update";

const PROGRESS_COMPLETE: u32 = 100;

/// Timing of the progress simulation.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Sleep between two progress increments.
    pub interval: Duration,
    /// Percentage points added per increment.
    pub step: u32,
    /// Buffered signals per subscriber before it starts lagging.
    pub signal_capacity: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            step: 5,
            signal_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobProperty {
    Id,
    Type,
    Offline,
    Progress,
}

impl PropertyName for JobProperty {
    const ALL: &'static [Self] = &[Self::Id, Self::Type, Self::Offline, Self::Progress];

    fn as_str(self) -> &'static str {
        match self {
            Self::Id => "Id",
            Self::Type => "Type",
            Self::Offline => "Offline",
            Self::Progress => "Progress",
        }
    }
}

pub struct Job {
    id: u64,
    job_type: String,
    offline: bool,
    path: ObjectPath,
    progress: AtomicU32,
    cancelled: AtomicBool,
    /// Cancelled before reaching 100 on its own.
    interrupted: AtomicBool,
    transition: Mutex<()>,
    wake: CancellationToken,
    signals: broadcast::Sender<Signal>,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("type", &self.job_type)
            .field("offline", &self.offline)
            .field("progress", &self.progress())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl Job {
    pub(crate) fn new(
        id: u64,
        job_type: impl Into<String>,
        offline: bool,
        signals: broadcast::Sender<Signal>,
    ) -> Self {
        Self {
            id,
            job_type: job_type.into(),
            offline,
            path: ObjectPath::job(id),
            progress: AtomicU32::new(0),
            cancelled: AtomicBool::new(false),
            interrupted: AtomicBool::new(false),
            transition: Mutex::new(()),
            wake: CancellationToken::new(),
            signals,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    pub fn offline(&self) -> bool {
        self.offline
    }

    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    pub fn progress(&self) -> u32 {
        self.progress.load(Ordering::Acquire)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Whether the job was cancelled while still in progress. A job that
    /// completed and was cancelled afterwards reports `false`.
    pub fn was_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Acquire)
    }

    /// Request cancellation.
    ///
    /// Progress reads 100 as soon as this returns. The background task
    /// notices the flag and deregisters the job on its own.
    pub fn cancel(&self) {
        let _guard = self.transition.lock();
        let already = self.cancelled.swap(true, Ordering::AcqRel);
        self.wake.cancel();
        if already {
            return;
        }
        let previous = self.progress.swap(PROGRESS_COMPLETE, Ordering::AcqRel);
        tracing::info!(job_id = self.id, progress = previous, "Job cancelled");
        if previous < PROGRESS_COMPLETE {
            self.interrupted.store(true, Ordering::Release);
            self.emit_progress(PROGRESS_COMPLETE);
        }
    }

    /// Apply one increment. Returns the new progress, or `None` if the job
    /// was cancelled or already complete.
    fn advance(&self, step: u32) -> Option<u32> {
        let _guard = self.transition.lock();
        if self.is_cancelled() {
            return None;
        }
        let current = self.progress.load(Ordering::Acquire);
        if current >= PROGRESS_COMPLETE {
            return None;
        }
        let next = current.saturating_add(step).min(PROGRESS_COMPLETE);
        self.progress.store(next, Ordering::Release);
        self.emit_progress(next);
        Some(next)
    }

    fn emit_progress(&self, progress: u32) {
        // No subscribers is fine.
        let _ = self
            .signals
            .send(Signal::progress_changed(self.path.clone(), progress));
    }

    /// Progress loop. Runs until the job completes or is cancelled, then
    /// removes the job from the registry exactly once.
    pub(crate) async fn simulate(
        self: Arc<Self>,
        registry: Arc<JobRegistry>,
        config: SimulationConfig,
    ) {
        let step = config.step.max(1);
        while self.progress() < PROGRESS_COMPLETE && !self.is_cancelled() {
            tokio::select! {
                _ = tokio::time::sleep(config.interval) => {}
                _ = self.wake.cancelled() => {}
            }
            if let Some(progress) = self.advance(step) {
                tracing::debug!(job_id = self.id, progress, "Job progress");
            }
        }
        tracing::info!(job_id = self.id, cancelled = self.is_cancelled(), "Job finished");
        registry.remove(self.id, JOB_STATUS_SUCCESS);
    }
}

impl Properties for Job {
    type Property = JobProperty;

    const INTERFACE: &'static str = JOB_INTERFACE;

    fn read(&self, property: JobProperty) -> Variant {
        match property {
            JobProperty::Id => Variant::U64(self.id),
            JobProperty::Type => Variant::String(self.job_type.clone()),
            JobProperty::Offline => Variant::Bool(self.offline),
            JobProperty::Progress => Variant::U32(self.progress()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysupdate::property::PropertyError;

    fn detached_job(id: u64, offline: bool) -> (Job, broadcast::Receiver<Signal>) {
        let (tx, rx) = broadcast::channel(32);
        (Job::new(id, JOB_TYPE_UPDATE, offline, tx), rx)
    }

    #[test]
    fn test_new_job_starts_at_zero() {
        let (job, _rx) = detached_job(1, false);
        assert_eq!(job.progress(), 0);
        assert!(!job.is_cancelled());
        assert_eq!(job.job_type(), "update");
        assert_eq!(job.path().as_str(), "/org/freedesktop/sysupdate1/job/1");
    }

    #[test]
    fn test_advance_clamps_to_complete() {
        let (job, _rx) = detached_job(1, false);
        assert_eq!(job.advance(40), Some(40));
        assert_eq!(job.advance(40), Some(80));
        assert_eq!(job.advance(40), Some(100));
        assert_eq!(job.advance(40), None);
        assert_eq!(job.progress(), 100);
    }

    #[test]
    fn test_cancel_forces_complete_and_blocks_advance() {
        let (job, mut rx) = detached_job(1, true);
        job.advance(5);
        job.cancel();
        assert_eq!(job.progress(), 100);
        assert!(job.is_cancelled());
        assert_eq!(job.advance(5), None);

        assert_eq!(rx.try_recv().unwrap(), Signal::progress_changed(ObjectPath::job(1), 5));
        assert_eq!(rx.try_recv().unwrap(), Signal::progress_changed(ObjectPath::job(1), 100));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_cancel_after_completion_is_not_an_interruption() {
        let (job, _rx) = detached_job(1, false);
        assert_eq!(job.advance(100), Some(100));
        job.cancel();
        assert!(job.is_cancelled());
        assert!(!job.was_interrupted());

        let (job, _rx) = detached_job(2, false);
        job.advance(5);
        job.cancel();
        assert!(job.was_interrupted());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let (job, mut rx) = detached_job(1, false);
        job.cancel();
        job.cancel();
        assert_eq!(job.progress(), 100);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err(), "second cancel must not emit");
    }

    #[test]
    fn test_properties_read_only() {
        let (job, _rx) = detached_job(42, true);
        assert_eq!(job.get(JOB_INTERFACE, "Id"), Ok(Variant::U64(42)));
        assert_eq!(job.get(JOB_INTERFACE, "Offline"), Ok(Variant::Bool(true)));
        assert_eq!(job.get(JOB_INTERFACE, "Type"), Ok(Variant::String("update".into())));
        assert!(matches!(
            job.get(JOB_INTERFACE, "Version"),
            Err(PropertyError::Unknown { .. })
        ));
        assert!(matches!(
            job.get("org.freedesktop.sysupdate1.Target", "Id"),
            Err(PropertyError::Unknown { .. })
        ));
        assert_eq!(
            job.set(JOB_INTERFACE, "Progress", Variant::U32(10)),
            Err(PropertyError::ReadOnly("Progress".into()))
        );
        assert_eq!(job.get_all(JOB_INTERFACE).len(), 4);
        assert!(job.get_all("org.example.Other").is_empty());
    }
}
