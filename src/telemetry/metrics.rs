//! Metric recording through the `metrics` facade.
//!
//! Nothing is exported unless the embedding process installs a recorder;
//! without one every call below is a no-op.

use ::metrics::{counter, describe_counter, describe_gauge, gauge};

/// Register metric descriptions with the installed recorder.
pub fn init_metrics() {
    describe_counter!(
        "sysupdate_jobs_started_total",
        "Update jobs started, by target"
    );
    describe_counter!(
        "sysupdate_jobs_finished_total",
        "Update jobs removed from the registry, by outcome"
    );
    describe_gauge!("sysupdate_jobs_live", "Jobs currently registered");
    describe_counter!(
        "sysupdate_calls_total",
        "Method calls handled, by interface, member and result"
    );
}

pub fn record_job_started(target: &str) {
    counter!("sysupdate_jobs_started_total", "target" => target.to_string()).increment(1);
}

/// `cancelled` is true only for jobs stopped before reaching 100.
pub fn record_job_finished(cancelled: bool) {
    let outcome = if cancelled { "cancelled" } else { "completed" };
    counter!("sysupdate_jobs_finished_total", "outcome" => outcome).increment(1);
}

pub fn record_live_jobs(count: usize) {
    gauge!("sysupdate_jobs_live").set(count as f64);
}

pub fn record_call(interface: &str, member: &str, ok: bool) {
    counter!(
        "sysupdate_calls_total",
        "interface" => interface.to_string(),
        "member" => member.to_string(),
        "result" => if ok { "ok" } else { "error" }
    )
    .increment(1);
}
