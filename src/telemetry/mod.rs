//! Narrow view of the vehicle telematics link.
//!
//! The host app bridges its vendor SDK into [`ChannelTelemetry`]; the engine
//! only ever sees the [`TelemetrySource`] trait.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

use crate::models::TelemetryEvent;

pub trait TelemetrySource: Send + Sync {
    /// Whether a vehicle link is currently established.
    fn is_connected(&self) -> bool;

    /// Most recent event, if any arrived since the link came up.
    fn latest(&self) -> Option<TelemetryEvent>;

    /// Notified on every new event.
    fn subscribe(&self) -> watch::Receiver<Option<TelemetryEvent>>;
}

#[derive(Debug)]
pub struct ChannelTelemetry {
    connected: AtomicBool,
    tx: watch::Sender<Option<TelemetryEvent>>,
}

impl Default for ChannelTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelTelemetry {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            connected: AtomicBool::new(false),
            tx,
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
        if !connected {
            // a dropped link must not leave a stale reading behind
            self.tx.send_replace(None);
        }
    }

    pub fn publish(&self, event: TelemetryEvent) {
        self.tx.send_replace(Some(event));
    }
}

impl TelemetrySource for ChannelTelemetry {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn latest(&self) -> Option<TelemetryEvent> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<TelemetryEvent>> {
        self.tx.subscribe()
    }
}
