//! Async driver: one polling task per pending mutation

use super::machine::{ReconcileEvent, ReconcileStatus, Reconciliation, ReconciliationState};
use super::pending::PendingMutation;
use crate::error::{Result, TabulaError};
use crate::submit::LogEntryId;
use crate::traits::{EntityRef, ReadModel};
use std::sync::Arc;
use std::time::Duration;
use tabula_client::RequestPolicy;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Default delay between index reads
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Default bound on waiting for the index
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    pub poll_interval: Duration,
    /// `None` polls until convergence, a read error or abandonment
    pub max_wait: Option<Duration>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: Some(DEFAULT_MAX_WAIT),
        }
    }
}

/// Spawns reconciliation tasks against a shared read model
#[derive(Clone)]
pub struct IndexReconciler {
    read_model: Arc<dyn ReadModel>,
    config: ReconcilerConfig,
}

enum Control {
    Abandon,
    Retarget(EntityRef),
}

/// Handle to a running reconciliation
///
/// Dropping the handle abandons the reconciliation.
#[derive(Debug)]
pub struct ReconcileHandle {
    status: watch::Receiver<ReconcileStatus>,
    control: mpsc::UnboundedSender<Control>,
    task: JoinHandle<()>,
}

impl ReconcileHandle {
    /// Latest published status
    pub fn status(&self) -> ReconcileStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every status change
    pub fn subscribe(&self) -> watch::Receiver<ReconcileStatus> {
        self.status.clone()
    }

    /// Stop polling; the reconciliation fails with `Abandoned`
    pub fn abandon(&self) {
        let _ = self.control.send(Control::Abandon);
    }

    /// Tell the reconciliation which entity the caller now looks at
    ///
    /// Anything other than its own target abandons it.
    pub fn retarget(&self, target: EntityRef) {
        let _ = self.control.send(Control::Retarget(target));
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for a terminal state
    ///
    /// Resolves to the converged status, or to the error the reconciliation
    /// failed with.
    pub async fn wait(mut self) -> Result<ReconcileStatus> {
        loop {
            let status = self.status.borrow_and_update().clone();
            if status.state.is_terminal() {
                return finish(status);
            }
            if self.status.changed().await.is_err() {
                // Task ended; its last status is final
                return finish(self.status.borrow().clone());
            }
        }
    }
}

fn finish(status: ReconcileStatus) -> Result<ReconcileStatus> {
    match (&status.state, &status.error) {
        (ReconciliationState::Converged, _) => Ok(status),
        (_, Some(err)) => Err(err.clone()),
        _ => Err(TabulaError::Abandoned),
    }
}

impl IndexReconciler {
    pub fn new(read_model: Arc<dyn ReadModel>, config: ReconcilerConfig) -> Self {
        Self { read_model, config }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Start reconciling `pending`, whose write confirmed as `log_entry_id`
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(&self, pending: PendingMutation, log_entry_id: LogEntryId) -> Result<ReconcileHandle> {
        let mut machine = Reconciliation::new(pending);
        machine.apply(ReconcileEvent::Submitted(log_entry_id))?;
        let target = machine.pending().target().ok_or_else(|| {
            TabulaError::InvalidTransition("pending mutation has no target".into())
        })?;

        let (status_tx, status_rx) = watch::channel(machine.status());
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run(
            machine,
            target,
            self.read_model.clone(),
            self.config.clone(),
            status_tx,
            control_rx,
        ));

        Ok(ReconcileHandle {
            status: status_rx,
            control: control_tx,
            task,
        })
    }

    /// Spawn and wait for the outcome
    pub async fn reconcile(&self, pending: PendingMutation, log_entry_id: LogEntryId) -> Result<ReconcileStatus> {
        self.spawn(pending, log_entry_id)?.wait().await
    }
}

async fn run(
    mut machine: Reconciliation,
    target: EntityRef,
    read_model: Arc<dyn ReadModel>,
    config: ReconcilerConfig,
    status: watch::Sender<ReconcileStatus>,
    mut control: mpsc::UnboundedReceiver<Control>,
) {
    let log_entry_id = machine
        .pending()
        .log_entry_id()
        .map(|id| id.to_string())
        .unwrap_or_default();
    info!(log_entry_id = %log_entry_id, target = %target, kind = ?machine.pending().kind(), "Reconciliation started");

    let deadline = config.max_wait.map(|wait| Instant::now() + wait);
    let timeout_secs = config.max_wait.map(|wait| wait.as_secs()).unwrap_or_default();

    let mut ticker = tokio::time::interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while !machine.state().is_terminal() {
        tokio::select! {
            biased;

            cmd = control.recv() => apply(&mut machine, control_event(cmd)),

            _ = sleep_until(deadline) => apply(&mut machine, ReconcileEvent::TimedOut(timeout_secs)),

            _ = ticker.tick() => {
                apply(&mut machine, ReconcileEvent::PollIssued);
                let _ = status.send(machine.status());
                debug!(log_entry_id = %log_entry_id, poll = machine.status().polls, "Polling index");

                // The read is awaited here, so the next tick cannot start
                // another one while it is outstanding
                let fetch = read_model.fetch(&target, RequestPolicy::NetworkOnly);
                tokio::select! {
                    biased;
                    cmd = control.recv() => apply(&mut machine, control_event(cmd)),
                    _ = sleep_until(deadline) => apply(&mut machine, ReconcileEvent::TimedOut(timeout_secs)),
                    result = fetch => apply(&mut machine, ReconcileEvent::PollResult(result)),
                }
            }
        }

        let _ = status.send(machine.status());
    }

    info!(
        log_entry_id = %log_entry_id,
        state = %machine.state(),
        polls = machine.status().polls,
        "Reconciliation finished"
    );
}

fn apply(machine: &mut Reconciliation, event: ReconcileEvent) {
    if let Err(err) = machine.apply(event) {
        // Only reachable through a driver bug; stop rather than spin
        error!(error = %err, "Rejected reconciliation event");
        let _ = machine.apply(ReconcileEvent::Abandon);
    }
}

/// A closed control channel means every handle is gone
fn control_event(cmd: Option<Control>) -> ReconcileEvent {
    match cmd {
        Some(Control::Retarget(target)) => ReconcileEvent::Retarget(target),
        Some(Control::Abandon) | None => ReconcileEvent::Abandon,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Read model that answers from a fixed script, for wiring tests together
#[cfg(test)]
pub(crate) mod scripted {
    use super::*;
    use crate::traits::IndexedEntity;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub struct ScriptedReadModel {
        answers: Mutex<VecDeque<Result<Option<IndexedEntity>>>>,
        delay: Duration,
        pub fetches: AtomicUsize,
        in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
    }

    impl ScriptedReadModel {
        pub fn new(answers: Vec<Result<Option<IndexedEntity>>>) -> Self {
            Self {
                answers: Mutex::new(answers.into()),
                delay: Duration::ZERO,
                fetches: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl ReadModel for ScriptedReadModel {
        async fn fetch(&self, _target: &EntityRef, policy: RequestPolicy) -> Result<Option<IndexedEntity>> {
            assert_eq!(policy, RequestPolicy::NetworkOnly);
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            let mut answers = self.answers.lock().unwrap();
            // The last answer repeats once the script runs out
            if answers.len() > 1 {
                answers.pop_front().unwrap()
            } else {
                answers.front().cloned().unwrap_or(Ok(None))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::scripted::ScriptedReadModel;
    use super::*;
    use crate::reconcile::Baseline;
    use crate::traits::{EntityKind, IndexedEntity};
    use std::sync::atomic::Ordering;
    use tabula_client::Article;

    fn article(id: &str, last_updated: &str) -> IndexedEntity {
        IndexedEntity::Article(Article {
            id: id.into(),
            title: "T".into(),
            article: "QmBody".into(),
            tags: None,
            authors: None,
            description: None,
            image: None,
            last_updated: Some(last_updated.into()),
            posted_on: None,
            poster: None,
            publication: None,
        })
    }

    fn id() -> LogEntryId {
        LogEntryId::parse("11155111-A-0xfeed-0").unwrap()
    }

    fn reconciler(read_model: Arc<ScriptedReadModel>, max_wait: Option<Duration>) -> IndexReconciler {
        IndexReconciler::new(
            read_model,
            ReconcilerConfig {
                poll_interval: Duration::from_secs(5),
                max_wait,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_converges_on_third_poll() {
        let read_model = Arc::new(ScriptedReadModel::new(vec![
            Ok(Some(article("A1", "1"))),
            Ok(Some(article("A1", "1"))),
            Ok(None),
        ]));
        let started = Instant::now();

        let status = reconciler(read_model.clone(), None)
            .reconcile(PendingMutation::delete(EntityRef::article("A1")), id())
            .await
            .unwrap();

        assert!(status.is_converged);
        assert_eq!(status.polls, 3);
        assert_eq!(read_model.fetches.load(Ordering::SeqCst), 3);
        // Polls at 0s, 5s and 10s
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_looks_up_log_entry_id() {
        let read_model = Arc::new(ScriptedReadModel::new(vec![
            Ok(None),
            Ok(Some(article("11155111-A-0xfeed-0", "1"))),
        ]));

        let status = reconciler(read_model, None)
            .reconcile(PendingMutation::create(EntityKind::Article), id())
            .await
            .unwrap();
        assert_eq!(status.polls, 2);
        assert_eq!(status.log_entry_id, Some(id()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_reads_never_overlap() {
        let read_model = Arc::new(
            ScriptedReadModel::new(vec![
                Ok(Some(article("A1", "T"))),
                Ok(Some(article("A1", "T"))),
                Ok(Some(article("A1", "T2"))),
            ])
            .with_delay(Duration::from_secs(12)),
        );

        let status = reconciler(read_model.clone(), None)
            .reconcile(
                PendingMutation::update(EntityRef::article("A1"), Baseline::LastUpdated(Some("T".into()))),
                id(),
            )
            .await
            .unwrap();

        assert!(status.is_converged);
        assert_eq!(read_model.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_error_stops_polling() {
        let read_model = Arc::new(ScriptedReadModel::new(vec![
            Ok(Some(article("A1", "1"))),
            Err(TabulaError::ReadModelError("bad gateway".into())),
        ]));

        let err = reconciler(read_model.clone(), None)
            .reconcile(PendingMutation::delete(EntityRef::article("A1")), id())
            .await
            .unwrap_err();
        assert_eq!(err, TabulaError::ReadModelError("bad gateway".into()));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(read_model.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_wait_bounds_indexing() {
        let read_model = Arc::new(ScriptedReadModel::new(vec![Ok(Some(article("A1", "1")))]));

        let err = reconciler(read_model, Some(Duration::from_secs(30)))
            .reconcile(PendingMutation::delete(EntityRef::article("A1")), id())
            .await
            .unwrap_err();
        assert_eq!(err, TabulaError::IndexingTimedOut(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandon_and_drop_stop_polling() {
        let read_model = Arc::new(ScriptedReadModel::new(vec![Ok(Some(article("A1", "1")))]));
        let reconciler = reconciler(read_model.clone(), None);

        let handle = reconciler
            .spawn(PendingMutation::delete(EntityRef::article("A1")), id())
            .unwrap();
        tokio::time::sleep(Duration::from_secs(7)).await;
        handle.abandon();
        assert_eq!(handle.wait().await.unwrap_err(), TabulaError::Abandoned);

        let fetched = read_model.fetches.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(read_model.fetches.load(Ordering::SeqCst), fetched);

        let dropped = reconciler
            .spawn(PendingMutation::delete(EntityRef::article("A1")), id())
            .unwrap();
        let mut status = dropped.subscribe();
        drop(dropped);
        while status.changed().await.is_ok() {}
        assert_eq!(status.borrow().error, Some(TabulaError::Abandoned));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retarget_to_other_entity_abandons() {
        let read_model = Arc::new(ScriptedReadModel::new(vec![Ok(Some(article("A1", "1")))]));
        let handle = reconciler(read_model, None)
            .spawn(PendingMutation::delete(EntityRef::article("A1")), id())
            .unwrap();

        handle.retarget(EntityRef::article("A1"));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(handle.status().loading);

        handle.retarget(EntityRef::article("A2"));
        assert_eq!(handle.wait().await.unwrap_err(), TabulaError::Abandoned);
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_mutations_reconcile_concurrently() {
        let slow = Arc::new(ScriptedReadModel::new(vec![
            Ok(Some(article("A1", "1"))),
            Ok(Some(article("A1", "1"))),
            Ok(None),
        ]));
        let fast = Arc::new(ScriptedReadModel::new(vec![Ok(None)]));

        let a = reconciler(slow, None)
            .spawn(PendingMutation::delete(EntityRef::article("A1")), id())
            .unwrap();
        let b = reconciler(fast, None)
            .spawn(PendingMutation::delete(EntityRef::article("A2")), id())
            .unwrap();

        let (a, b) = tokio::join!(a.wait(), b.wait());
        assert_eq!(a.unwrap().polls, 3);
        assert_eq!(b.unwrap().polls, 1);
    }
}
