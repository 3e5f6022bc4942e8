//! Relay worker: one gather → snapshot → send → commit cycle
//!
//! The worker reads the whole pending queue, assembles a fresh device
//! snapshot, submits a capped batch as one report, and deletes exactly the
//! batched ids once the remote confirms. Delivery is at-least-once: a crash
//! between confirmed submission and the delete commit re-sends that batch on
//! the next cycle, but no event is ever dropped before a confirmed
//! submission that included it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::report::Report;
use super::sink::ReportSink;
use crate::config::RelayConfig;
use crate::db::EventStore;
use crate::probes::{snapshot, Capability, LocationPriority, ProbeSet};
use crate::types::CycleOutcome;

/// Periodic report relay over a local event queue.
pub struct RelayWorker {
    store: Arc<EventStore>,
    probes: ProbeSet,
    sink: Box<dyn ReportSink>,
    device_name: String,
    batch_cap: usize,
    /// One cycle owns the read-send-delete sequence at a time; overlapping
    /// periodic and manual triggers queue up here instead of racing.
    cycle_lock: tokio::sync::Mutex<()>,
    periodic: StdMutex<Option<JoinHandle<()>>>,
}

impl RelayWorker {
    pub fn new(
        store: Arc<EventStore>,
        probes: ProbeSet,
        sink: Box<dyn ReportSink>,
        config: &RelayConfig,
    ) -> Self {
        Self {
            store,
            probes,
            sink,
            device_name: config.display_name().to_string(),
            batch_cap: config.batch_cap,
            cycle_lock: tokio::sync::Mutex::new(()),
            periodic: StdMutex::new(None),
        }
    }

    /// Run one cycle on demand.
    pub async fn trigger_now(&self) -> CycleOutcome {
        self.run_cycle().await
    }

    /// One full cycle. Never panics outward; every failure maps to a
    /// [`CycleOutcome`].
    async fn run_cycle(&self) -> CycleOutcome {
        let _cycle = self.cycle_lock.lock().await;

        // Gate before touching the queue at all.
        if !self.probes.permissions.has_capability(Capability::Location) {
            tracing::warn!("Location capability not granted; skipping cycle");
            return CycleOutcome::PermissionDenied;
        }

        let pending = match self.store.list_all() {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(error = %e, "Queue read failed");
                return CycleOutcome::Retry;
            }
        };

        // Probes are host-provided code; contain a broken implementation
        // instead of letting it unwind through the scheduler.
        let snapshot = match catch_unwind(AssertUnwindSafe(|| {
            snapshot::assemble(&self.probes, LocationPriority::Balanced)
        })) {
            Ok(snapshot) => snapshot,
            Err(_) => {
                tracing::error!("Snapshot assembly panicked; aborting cycle");
                return CycleOutcome::AssembleError;
            }
        };

        let report = Report::build(snapshot, &pending, self.batch_cap);
        let batch_ids = report.batch_ids();
        let text = report.render(&self.device_name);

        tracing::debug!(
            pending = pending.len(),
            batched = batch_ids.len(),
            "Submitting report"
        );

        if !self.sink.submit(&text).await {
            tracing::warn!("Submission failed; events stay queued for retry");
            return CycleOutcome::Retry;
        }

        // The remote accepted the report. There is no await between here and
        // the commit, so a cancelled task cannot leave delivered events
        // queued half-committed. Events inserted since the read above are
        // not in `batch_ids` and survive untouched.
        match self.store.delete_by_ids(&batch_ids) {
            Ok(deleted) => {
                tracing::info!(deleted, "Cycle complete");
                CycleOutcome::Success
            }
            Err(e) => {
                // Delivered but not committed: the next cycle may re-send
                // this batch (at-least-once).
                tracing::error!(error = %e, "Commit failed after accepted submission");
                CycleOutcome::Retry
            }
        }
    }

    /// Start periodic cycles on the given interval.
    ///
    /// Keep-existing semantics: if a periodic handle is already active this
    /// is a no-op returning `false`. The first cycle runs immediately.
    /// Must be called from within a Tokio runtime.
    pub fn schedule_periodic(self: &Arc<Self>, interval: Duration) -> bool {
        let mut periodic = self.periodic.lock().unwrap();

        if let Some(handle) = periodic.as_ref() {
            if !handle.is_finished() {
                tracing::debug!("Periodic relay already scheduled; keeping existing");
                return false;
            }
        }

        let worker = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let outcome = worker.run_cycle().await;
                tracing::debug!(%outcome, "Periodic cycle finished");
            }
        });

        *periodic = Some(handle);
        tracing::info!(interval_secs = interval.as_secs(), "Periodic relay scheduled");
        true
    }

    /// Stop periodic cycles. Returns `false` if none were scheduled.
    pub fn cancel_periodic(&self) -> bool {
        let mut periodic = self.periodic.lock().unwrap();
        match periodic.take() {
            Some(handle) => {
                handle.abort();
                tracing::info!("Periodic relay cancelled");
                true
            }
            None => false,
        }
    }

    /// Number of events currently queued.
    pub fn pending_count(&self) -> crate::error::Result<i64> {
        self.store.pending_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::fakes::{self, FakeGate, FakeLocation, PanickingPower};
    use crate::types::Payload;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Sink that records every submission and answers from a script.
    struct ScriptedSink {
        accept: AtomicBool,
        submissions: StdMutex<Vec<String>>,
    }

    impl ScriptedSink {
        fn accepting() -> Arc<Self> {
            Arc::new(Self {
                accept: AtomicBool::new(true),
                submissions: StdMutex::new(Vec::new()),
            })
        }

        fn rejecting() -> Arc<Self> {
            let sink = Self::accepting();
            sink.accept.store(false, Ordering::SeqCst);
            sink
        }

        fn submissions(&self) -> Vec<String> {
            self.submissions.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReportSink for Arc<ScriptedSink> {
        async fn submit(&self, report_text: &str) -> bool {
            self.submissions
                .lock()
                .unwrap()
                .push(report_text.to_string());
            self.accept.load(Ordering::SeqCst)
        }
    }

    /// Sink that appends a new event to the queue mid-submission, simulating
    /// a producer racing the cycle.
    struct InsertingSink {
        store: Arc<EventStore>,
    }

    #[async_trait]
    impl ReportSink for InsertingSink {
        async fn submit(&self, _report_text: &str) -> bool {
            self.store
                .insert("notifications", &titled("raced in mid-cycle"))
                .unwrap();
            true
        }
    }

    fn titled(title: &str) -> Payload {
        let mut payload = Payload::new();
        payload.insert("title".to_string(), title.to_string());
        payload
    }

    fn store_with(n: usize) -> Arc<EventStore> {
        let store = Arc::new(EventStore::open_in_memory().unwrap());
        store.migrate().unwrap();
        for i in 0..n {
            store
                .insert("notifications", &titled(&format!("event {}", i)))
                .unwrap();
        }
        store
    }

    fn config(cap: usize) -> RelayConfig {
        RelayConfig {
            device_name: Some("test-rig".to_string()),
            batch_cap: cap,
            ..Default::default()
        }
    }

    fn worker(
        store: Arc<EventStore>,
        probes: ProbeSet,
        sink: Box<dyn ReportSink>,
        cap: usize,
    ) -> Arc<RelayWorker> {
        Arc::new(RelayWorker::new(store, probes, sink, &config(cap)))
    }

    #[tokio::test]
    async fn test_success_drains_batch() {
        let store = store_with(5);
        let sink = ScriptedSink::accepting();
        let worker = worker(
            store.clone(),
            fakes::healthy_probes(),
            Box::new(sink.clone()),
            15,
        );

        assert_eq!(worker.trigger_now().await, CycleOutcome::Success);

        assert_eq!(store.pending_count().unwrap(), 0);
        let submissions = sink.submissions();
        assert_eq!(submissions.len(), 1);
        assert!(submissions[0].contains("test-rig"));
        assert!(submissions[0].contains("event 0"));
        assert!(submissions[0].contains("event 4"));
    }

    #[tokio::test]
    async fn test_failed_submission_leaves_queue_unchanged() {
        let store = store_with(5);
        let before: Vec<i64> = store.list_all().unwrap().iter().map(|e| e.id).collect();

        let worker = worker(
            store.clone(),
            fakes::healthy_probes(),
            Box::new(ScriptedSink::rejecting()),
            15,
        );

        assert_eq!(worker.trigger_now().await, CycleOutcome::Retry);

        let after: Vec<i64> = store.list_all().unwrap().iter().map(|e| e.id).collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_batch_cap_leaves_excess_queued() {
        let store = store_with(20);
        let all_ids: Vec<i64> = store.list_all().unwrap().iter().map(|e| e.id).collect();

        let worker = worker(
            store.clone(),
            fakes::healthy_probes(),
            Box::new(ScriptedSink::accepting()),
            15,
        );

        assert_eq!(worker.trigger_now().await, CycleOutcome::Success);

        // The oldest 15 were delivered and deleted; the newest 5 remain.
        let remaining: Vec<i64> = store.list_all().unwrap().iter().map(|e| e.id).collect();
        assert_eq!(remaining, all_ids[15..].to_vec());
    }

    #[tokio::test]
    async fn test_permission_denied_touches_nothing() {
        let store = store_with(3);
        let sink = ScriptedSink::accepting();

        let mut probes = fakes::healthy_probes();
        probes.permissions = Box::new(FakeGate { granted: false });

        let worker = worker(store.clone(), probes, Box::new(sink.clone()), 15);

        assert_eq!(worker.trigger_now().await, CycleOutcome::PermissionDenied);

        assert_eq!(store.pending_count().unwrap(), 3);
        assert!(sink.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_degraded_location_still_succeeds() {
        let store = store_with(2);
        let sink = ScriptedSink::accepting();

        let mut probes = fakes::healthy_probes();
        probes.location = Box::new(FakeLocation {
            fix: None,
            fail: true,
        });

        let worker = worker(store.clone(), probes, Box::new(sink.clone()), 15);

        assert_eq!(worker.trigger_now().await, CycleOutcome::Success);
        assert_eq!(store.pending_count().unwrap(), 0);

        let submissions = sink.submissions();
        assert!(submissions[0].contains("Latitude: unavailable"));
    }

    #[tokio::test]
    async fn test_mid_cycle_insert_survives_commit() {
        let store = store_with(4);
        let worker = worker(
            store.clone(),
            fakes::healthy_probes(),
            Box::new(InsertingSink {
                store: store.clone(),
            }),
            15,
        );

        assert_eq!(worker.trigger_now().await, CycleOutcome::Success);

        // Only the event inserted during submission is left.
        let remaining = store.list_all().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].title(), Some("raced in mid-cycle"));
    }

    #[tokio::test]
    async fn test_panicking_probe_is_contained() {
        let store = store_with(3);
        let sink = ScriptedSink::accepting();

        let mut probes = fakes::healthy_probes();
        probes.power = Box::new(PanickingPower);

        let worker = worker(store.clone(), probes, Box::new(sink.clone()), 15);

        assert_eq!(worker.trigger_now().await, CycleOutcome::AssembleError);
        assert_eq!(store.pending_count().unwrap(), 3);
        assert!(sink.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_empty_queue_still_reports() {
        let store = store_with(0);
        let sink = ScriptedSink::accepting();
        let worker = worker(
            store.clone(),
            fakes::healthy_probes(),
            Box::new(sink.clone()),
            15,
        );

        assert_eq!(worker.trigger_now().await, CycleOutcome::Success);

        let submissions = sink.submissions();
        assert_eq!(submissions.len(), 1);
        assert!(!submissions[0].contains("Recent events"));
    }

    #[tokio::test]
    async fn test_schedule_periodic_keeps_existing() {
        let store = store_with(1);
        let sink = ScriptedSink::accepting();
        let worker = worker(
            store.clone(),
            fakes::healthy_probes(),
            Box::new(sink.clone()),
            15,
        );

        assert!(worker.schedule_periodic(Duration::from_secs(3600)));
        // Duplicate request keeps the existing handle
        assert!(!worker.schedule_periodic(Duration::from_secs(3600)));

        assert!(worker.cancel_periodic());
        assert!(!worker.cancel_periodic());

        // After cancel, scheduling works again
        assert!(worker.schedule_periodic(Duration::from_secs(3600)));
        worker.cancel_periodic();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_periodic_runs_cycles() {
        let store = store_with(2);
        let sink = ScriptedSink::accepting();
        let worker = worker(
            store.clone(),
            fakes::healthy_probes(),
            Box::new(sink.clone()),
            15,
        );

        worker.schedule_periodic(Duration::from_millis(10));

        // First tick fires immediately; give it a moment to finish.
        tokio::time::sleep(Duration::from_millis(100)).await;
        worker.cancel_periodic();

        assert!(!sink.submissions().is_empty());
        assert_eq!(store.pending_count().unwrap(), 0);
    }
}
