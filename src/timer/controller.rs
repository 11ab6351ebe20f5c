use std::{sync::Arc, time::Duration};

use log::{debug, warn};
use serde::Serialize;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::time_source::TimeSource;

use super::{ClockMode, ClockStatus, TimerState};

/// Receives the remaining (countdown) or elapsed (count-up) seconds.
pub type TickCallback = Arc<dyn Fn(i64) + Send + Sync>;

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ClockSnapshot {
    pub state: TimerState,
    pub value: i64,
}

/// Restartable 1 Hz duty clock.
///
/// Ticks are computed from the reference instant in [`TimerState`] and the
/// injected [`TimeSource`], never accumulated, so retargets and restarts
/// cannot drift. At most one ticker task exists per clock.
#[derive(Clone)]
pub struct DutyClock {
    state: Arc<Mutex<TimerState>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    on_tick: Arc<Mutex<Option<TickCallback>>>,
    time: Arc<dyn TimeSource>,
    tick_interval: Duration,
}

impl DutyClock {
    pub fn new(time: Arc<dyn TimeSource>, mode: ClockMode) -> Self {
        Self::with_interval(time, mode, Duration::from_secs(1))
    }

    pub fn with_interval(time: Arc<dyn TimeSource>, mode: ClockMode, tick_interval: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(TimerState::new(mode))),
            ticker: Arc::new(Mutex::new(None)),
            on_tick: Arc::new(Mutex::new(None)),
            time,
            tick_interval,
        }
    }

    pub async fn snapshot(&self) -> ClockSnapshot {
        let guard = self.state.lock().await;
        ClockSnapshot {
            value: guard.value_at(self.time.now()),
            state: guard.clone(),
        }
    }

    pub async fn mode(&self) -> ClockMode {
        self.state.lock().await.mode
    }

    pub async fn status(&self) -> ClockStatus {
        self.state.lock().await.status
    }

    /// Starts ticking with the current mode and total. Fires immediately,
    /// then once per interval. A running cycle is replaced, not doubled.
    pub async fn start(&self, on_tick: TickCallback) {
        {
            let mut state = self.state.lock().await;
            if state.status == ClockStatus::Invalidated {
                warn!("ignoring start on an invalidated duty clock");
                return;
            }
            *self.on_tick.lock().await = Some(on_tick);
            let (mode, total) = (state.mode, state.total_seconds);
            state.begin(mode, total, self.time.now());
        }
        self.spawn_ticker().await;
    }

    /// Retargets the running clock. An idle clock is started with the target.
    pub async fn update(&self, target_seconds: i64) {
        let started = {
            let mut state = self.state.lock().await;
            let now = self.time.now();
            match state.status {
                ClockStatus::Invalidated => return,
                ClockStatus::Idle => {
                    let mode = state.mode;
                    state.begin(mode, target_seconds, now);
                    true
                }
                ClockStatus::Running | ClockStatus::Paused => {
                    state.retarget(target_seconds, now);
                    false
                }
            }
        };

        if started {
            self.spawn_ticker().await;
        }
    }

    /// Switches mode and restarts the cycle with `total_seconds`. When the
    /// clock already runs in `mode` only the target moves, so no tick fires
    /// out of sequence.
    pub async fn change_mode(&self, mode: ClockMode, total_seconds: i64) {
        {
            let mut state = self.state.lock().await;
            match state.status {
                ClockStatus::Invalidated => return,
                ClockStatus::Running | ClockStatus::Paused if state.mode == mode => {
                    state.retarget(total_seconds, self.time.now());
                    return;
                }
                _ => {}
            }
        }

        self.cancel_ticker().await;
        {
            let mut state = self.state.lock().await;
            if state.status == ClockStatus::Invalidated {
                return;
            }
            debug!("duty clock switching {:?} -> {:?} ({}s)", state.mode, mode, total_seconds);
            state.begin(mode, total_seconds, self.time.now());
        }
        self.spawn_ticker().await;
    }

    pub async fn pause(&self) {
        self.cancel_ticker().await;
        self.state.lock().await.pause(self.time.now());
    }

    pub async fn resume(&self) {
        let resumed = {
            let mut state = self.state.lock().await;
            if state.status != ClockStatus::Paused {
                false
            } else {
                state.resume(self.time.now());
                true
            }
        };

        if resumed {
            self.spawn_ticker().await;
        }
    }

    /// Stops ticking for good and drops the callback.
    pub async fn invalidate(&self) {
        self.cancel_ticker().await;
        self.state.lock().await.invalidate();
        self.on_tick.lock().await.take();
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let Some(callback) = self.on_tick.lock().await.clone() else {
            return;
        };
        let state = self.state.clone();
        let time_source = self.time.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;

                let value = {
                    let guard = state.lock().await;
                    if guard.status != ClockStatus::Running {
                        break;
                    }
                    guard.value_at(time_source.now())
                };

                callback(value);
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}
