use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard,
};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    backend::HosBackend,
    db::{Database, JournalStatus},
    detection::AutoStatusDetector,
    hos::{HosCalculator, HosDisplay, HosEvaluation, RestTier, RestWindowPolicy},
    models::{DutyCode, HosSnapshot, StatusChangeRequest, StatusOrigin, TelemetryEvent},
    settings::EngineSettings,
    telemetry::TelemetrySource,
    time_source::TimeSource,
    timer::{ClockMode, DutyClock, TickCallback},
};

use super::loops::{detector_loop, poll_loop, retry_loop};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Collaborators a session is built from.
pub struct SessionDeps {
    pub backend: Arc<dyn HosBackend>,
    pub telemetry: Arc<dyn TelemetrySource>,
    pub time: Arc<dyn TimeSource>,
    /// Optional local cache and journal.
    pub database: Option<Database>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SubmitOutcome {
    Submitted,
    /// Another submission was in flight; parked and retried on the next retry tick.
    Queued,
}

#[derive(Default)]
struct HosState {
    snapshot: Option<HosSnapshot>,
    /// Rest tier held for the off-duty period that began at the keyed event.
    latched_rest: Option<(Option<DateTime<Utc>>, RestTier)>,
}

impl HosState {
    fn current_code(&self) -> Option<DutyCode> {
        self.snapshot.as_ref().map(|snapshot| snapshot.last_event_code)
    }

    fn evaluate(
        &mut self,
        calculator: &HosCalculator,
        policy: RestWindowPolicy,
        now: DateTime<Utc>,
    ) -> Option<HosEvaluation> {
        let snapshot = self.snapshot.as_ref()?;
        let code = snapshot.last_event_code;

        let latched = match policy {
            RestWindowPolicy::Continuous => None,
            RestWindowPolicy::Latched if code.is_rest() => {
                let key = snapshot.last_event_timestamp;
                match self.latched_rest {
                    Some((latched_key, tier)) if latched_key == key => Some(tier),
                    _ => {
                        let tier = calculator.rest_tier(snapshot);
                        self.latched_rest = Some((key, tier));
                        Some(tier)
                    }
                }
            }
            RestWindowPolicy::Latched => {
                self.latched_rest = None;
                None
            }
        };

        Some(calculator.evaluate(snapshot, Some(code), now, latched))
    }
}

struct SessionInner {
    settings: EngineSettings,
    calculator: HosCalculator,
    time: Arc<dyn TimeSource>,
    backend: Arc<dyn HosBackend>,
    telemetry: Arc<dyn TelemetrySource>,
    database: Option<Database>,
    state: Mutex<HosState>,
    detector: Mutex<AutoStatusDetector>,
    clock: DutyClock,
    display_tx: watch::Sender<HosDisplay>,
    submit_gate: tokio::sync::Mutex<()>,
    pending: Mutex<Option<StatusChangeRequest>>,
    cancel_token: CancellationToken,
    tasks: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl SessionInner {
    fn publish_display(&self, clock_value: i64) {
        let display = {
            let mut state = lock(&self.state);
            let code = state.current_code();
            match state.evaluate(&self.calculator, self.settings.rest_window_policy, self.time.now()) {
                Some(evaluation) => HosDisplay::from_evaluation(code, &evaluation, clock_value),
                None => HosDisplay {
                    clock: crate::utils::format::format_hm(clock_value),
                    ..HosDisplay::default()
                },
            }
        };
        self.display_tx.send_replace(display);
    }
}

/// One driver session: the owned replacement for a global HOS singleton.
///
/// Snapshot, detector and clock state are mutated only through this type,
/// and every mutation of the shared snapshot happens under one lock so a
/// clock tick never sees half of an update.
#[derive(Clone)]
pub struct HosSession {
    inner: Arc<SessionInner>,
}

impl HosSession {
    pub fn new(deps: SessionDeps, settings: EngineSettings) -> Self {
        let clock = DutyClock::with_interval(deps.time.clone(), ClockMode::CountUp, settings.tick_interval());
        let (display_tx, _display_rx) = watch::channel(HosDisplay::default());

        Self {
            inner: Arc::new(SessionInner {
                calculator: HosCalculator::new(settings.limits),
                detector: Mutex::new(AutoStatusDetector::new(settings.speed_threshold)),
                settings,
                time: deps.time,
                backend: deps.backend,
                telemetry: deps.telemetry,
                database: deps.database,
                state: Mutex::new(HosState::default()),
                clock,
                display_tx,
                submit_gate: tokio::sync::Mutex::new(()),
                pending: Mutex::new(None),
                cancel_token: CancellationToken::new(),
                tasks: tokio::sync::Mutex::new(Vec::new()),
                started: AtomicBool::new(false),
            }),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.inner.settings
    }

    pub fn database(&self) -> Option<&Database> {
        self.inner.database.as_ref()
    }

    pub fn clock(&self) -> &DutyClock {
        &self.inner.clock
    }

    pub fn snapshot(&self) -> Option<HosSnapshot> {
        lock(&self.inner.state).snapshot.clone()
    }

    pub fn current_code(&self) -> Option<DutyCode> {
        lock(&self.inner.state).current_code()
    }

    pub fn pending_request(&self) -> Option<StatusChangeRequest> {
        lock(&self.inner.pending).clone()
    }

    pub fn display(&self) -> watch::Receiver<HosDisplay> {
        self.inner.display_tx.subscribe()
    }

    pub fn current_display(&self) -> HosDisplay {
        self.inner.display_tx.borrow().clone()
    }

    /// Evaluation at the current instant, `None` before the first snapshot.
    pub fn evaluate(&self) -> Option<HosEvaluation> {
        let now = self.inner.time.now();
        lock(&self.inner.state).evaluate(&self.inner.calculator, self.inner.settings.rest_window_policy, now)
    }

    pub async fn start(&self) -> Result<()> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            bail!("session already started");
        }
        if self.inner.cancel_token.is_cancelled() {
            bail!("session has been shut down");
        }

        self.inner.clock.start(self.tick_callback()).await;

        if let Some(db) = &self.inner.database {
            let interrupted = db
                .interrupt_pending_status_changes(self.inner.time.now())
                .await
                .context("failed to recover status change journal")?;
            if interrupted > 0 {
                log_warn!("{interrupted} status change(s) from a previous run never completed");
            }

            match db.load_snapshot().await {
                Ok(Some(cached)) => {
                    log_info!("Restoring snapshot cached at {}", cached.fetched_at);
                    self.install_snapshot(cached.snapshot, false).await;
                }
                Ok(None) => {}
                Err(err) => log_warn!("Ignoring unreadable snapshot cache: {err:?}"),
            }
        }

        let mut tasks = self.inner.tasks.lock().await;
        tasks.push(tokio::spawn(poll_loop(
            self.clone(),
            self.inner.settings.poll_interval(),
            self.inner.cancel_token.clone(),
        )));

        tasks.push(tokio::spawn(retry_loop(
            self.clone(),
            self.inner.settings.retry_interval(),
            self.inner.cancel_token.clone(),
        )));

        if self.inner.settings.auto_status_enabled {
            tasks.push(tokio::spawn(detector_loop(
                self.clone(),
                self.inner.telemetry.subscribe(),
                self.inner.cancel_token.clone(),
            )));
        }

        log_info!("HOS session started");
        Ok(())
    }

    /// Stops every loop and the clock. Nothing keeps running afterwards.
    pub async fn shutdown(&self) {
        self.inner.cancel_token.cancel();
        self.inner.clock.invalidate().await;
        lock(&self.inner.detector).reset();
        lock(&self.inner.pending).take();

        let handles: Vec<_> = self.inner.tasks.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    log_warn!("session task ended abnormally: {err}");
                }
            }
        }

        log_info!("HOS session shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel_token.is_cancelled()
    }

    /// Replaces the snapshot wholesale and re-drives the clock.
    pub async fn apply_snapshot(&self, snapshot: HosSnapshot) {
        self.install_snapshot(snapshot, true).await;
    }

    async fn install_snapshot(&self, snapshot: HosSnapshot, persist: bool) {
        let now = self.inner.time.now();
        let plan = {
            let mut state = lock(&self.inner.state);
            state.snapshot = Some(snapshot.clone());
            state
                .evaluate(&self.inner.calculator, self.inner.settings.rest_window_policy, now)
                .map(|evaluation| evaluation.plan)
        };

        log_info!(
            "Snapshot applied: code={} d={}s on={}s sb={}s off={}s",
            snapshot.last_event_code,
            snapshot.driving_seconds,
            snapshot.on_duty_seconds,
            snapshot.sleeper_seconds,
            snapshot.off_duty_seconds
        );

        if persist {
            if let Some(db) = &self.inner.database {
                if let Err(err) = db.save_snapshot(&snapshot, now).await {
                    log_warn!("Failed to cache snapshot: {err:?}");
                }
            }
        }

        if let Some(plan) = plan {
            self.drive_clock(plan.mode, plan.target_secs).await;
        }

        let clock_value = self.inner.clock.snapshot().await.value;
        self.inner.publish_display(clock_value);
    }

    /// Countdowns are retargeted in place; a count-up already running is left alone.
    async fn drive_clock(&self, mode: ClockMode, target_secs: i64) {
        let clock = self.inner.clock.snapshot().await;
        let same_mode = clock.state.is_active() && clock.state.mode == mode;

        match (mode, same_mode) {
            (ClockMode::Countdown, true) => self.inner.clock.update(target_secs).await,
            (ClockMode::CountUp, true) => {}
            (_, false) => {
                log_debug!("Duty clock -> {:?} ({}s)", mode, target_secs);
                self.inner.clock.change_mode(mode, target_secs).await;
            }
        }
    }

    pub async fn refresh(&self) -> Result<()> {
        let snapshot = self
            .inner
            .backend
            .fetch_snapshot()
            .await
            .context("snapshot fetch failed")?;
        self.apply_snapshot(snapshot).await;
        Ok(())
    }

    /// Runs one detector evaluation. Returns what was done with a proposal,
    /// or `None` when nothing was proposed or the proposal was redundant.
    pub async fn on_telemetry(&self, event: TelemetryEvent) -> Result<Option<SubmitOutcome>> {
        if !self.inner.settings.auto_status_enabled || !self.inner.telemetry.is_connected() {
            return Ok(None);
        }
        let Some(current) = self.current_code() else {
            return Ok(None);
        };

        let proposal = lock(&self.inner.detector).observe(event.speed_sample(), current);
        let Some(proposal) = proposal else {
            return Ok(None);
        };

        if proposal.code == current {
            log_debug!("Dropping redundant {:?} proposal for {}", proposal.origin, current);
            return Ok(None);
        }

        log_info!(
            "Detector proposes {} -> {} ({:?}) at {:.1}",
            current,
            proposal.code,
            proposal.origin,
            event.speed
        );
        let request =
            StatusChangeRequest::new(self.inner.time.now(), proposal.code, proposal.origin, Some(event));
        self.submit_request(request).await.map(Some)
    }

    /// Driver-initiated change. Overrides automatic detection until cleared.
    pub async fn request_status(&self, code: DutyCode) -> Result<SubmitOutcome> {
        lock(&self.inner.detector).set_manual_override(code);
        self.submit_status_change(code, StatusOrigin::Driver).await
    }

    pub fn clear_manual_override(&self) {
        lock(&self.inner.detector).clear_manual_override();
    }

    pub fn manual_override(&self) -> Option<DutyCode> {
        lock(&self.inner.detector).manual_override()
    }

    pub async fn submit_status_change(&self, code: DutyCode, origin: StatusOrigin) -> Result<SubmitOutcome> {
        let request = StatusChangeRequest::new(
            self.inner.time.now(),
            code,
            origin,
            self.inner.telemetry.latest(),
        );
        self.submit_request(request).await
    }

    /// Retries a parked submission, if any. A parked request whose code the
    /// server has since acknowledged is dropped instead of sent twice.
    pub async fn flush_pending(&self) -> Result<Option<SubmitOutcome>> {
        let parked = lock(&self.inner.pending).take();
        let Some(request) = parked else {
            return Ok(None);
        };

        if self.current_code() == Some(request.code) {
            log_debug!(
                "Dropping parked {} ({:?}); already the current status",
                request.code,
                request.origin
            );
            return Ok(None);
        }

        self.submit_request(request).await.map(Some)
    }

    async fn submit_request(&self, request: StatusChangeRequest) -> Result<SubmitOutcome> {
        let Ok(gate) = self.inner.submit_gate.try_lock() else {
            log_info!("Status change in flight; parking {} ({:?})", request.code, request.origin);
            *lock(&self.inner.pending) = Some(request);
            return Ok(SubmitOutcome::Queued);
        };

        let db = self.inner.database.as_ref();
        if let Some(db) = db {
            if let Err(err) = db.insert_status_change(&request, self.inner.time.now()).await {
                log_warn!("Failed to journal status change {}: {err:?}", request.id);
            }
        }

        let result = self.inner.backend.submit_status_change(&request).await;
        let (status, error) = match &result {
            Ok(()) => (JournalStatus::Submitted, None),
            Err(err) => (JournalStatus::Failed, Some(format!("{err:#}"))),
        };
        if let Some(db) = db {
            if let Err(err) = db
                .mark_status_change(&request.id, status, error, self.inner.time.now())
                .await
            {
                log_warn!("Failed to update journal for {}: {err:?}", request.id);
            }
        }
        drop(gate);

        match result {
            Ok(()) => {
                log_info!("Status change to {} ({:?}) accepted", request.code, request.origin);
                if let Err(err) = self.refresh().await {
                    log_warn!("Refresh after status change failed: {err:?}");
                }
                Ok(SubmitOutcome::Submitted)
            }
            Err(err) => {
                log_warn!("Status change to {} rejected: {err:#}", request.code);
                Err(err.context(format!("status change to {} was not accepted", request.code)))
            }
        }
    }

    fn tick_callback(&self) -> TickCallback {
        let weak = Arc::downgrade(&self.inner);
        Arc::new(move |value| {
            if let Some(inner) = weak.upgrade() {
                inner.publish_display(value);
            }
        })
    }
}
