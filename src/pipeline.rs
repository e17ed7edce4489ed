//! Ingestion pipeline
//!
//! Pulls raw events from a source one at a time, in arrival order, runs them
//! through the reducer and emits a snapshot whenever the state changed.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::broadcast::Broadcaster;
use crate::midi::RawEvent;
use crate::state::{ControllerState, StateReducer};

/// Sequential source of raw controller events
///
/// `None` means end of stream.
#[async_trait(?Send)]
pub trait EventSource {
    async fn next_event(&mut self) -> Option<RawEvent>;
}

#[async_trait(?Send)]
impl EventSource for mpsc::UnboundedReceiver<RawEvent> {
    async fn next_event(&mut self) -> Option<RawEvent> {
        self.recv().await
    }
}

/// Why the pipeline stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The event source ended (device gone)
    StreamEnded,
    /// Shutdown was requested
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub reason: StopReason,
    pub events: u64,
    pub emissions: u64,
}

pub struct Pipeline {
    reducer: StateReducer,
    broadcaster: Arc<Broadcaster>,
    events: u64,
    emissions: u64,
}

impl Pipeline {
    pub fn new(broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            reducer: StateReducer::new(),
            broadcaster,
            events: 0,
            emissions: 0,
        }
    }

    pub fn state(&self) -> &ControllerState {
        self.reducer.state()
    }

    /// Process one event; returns `true` if a snapshot was emitted.
    pub fn handle_event(&mut self, event: &RawEvent) -> bool {
        self.events += 1;
        trace!("Event: {}", event);

        if !self.reducer.process(event) {
            return false;
        }

        // The whole batch for this event is applied before serializing
        self.broadcaster.emit(self.reducer.state());
        self.emissions += 1;
        true
    }

    /// Drive the pipeline until the source ends or `shutdown` resolves.
    pub async fn run<S, F>(&mut self, source: &mut S, shutdown: F) -> RunSummary
    where
        S: EventSource + ?Sized,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Pipeline running");

        let reason = loop {
            tokio::select! {
                event = source.next_event() => match event {
                    Some(event) => {
                        self.handle_event(&event);
                    }
                    None => {
                        info!("Event stream ended");
                        break StopReason::StreamEnded;
                    }
                },
                _ = &mut shutdown => {
                    debug!("Pipeline shutdown requested");
                    break StopReason::Shutdown;
                }
            }
        };

        info!(
            "Pipeline stopped: {} events, {} emissions",
            self.events, self.emissions
        );

        RunSummary {
            reason,
            events: self.events,
            emissions: self.emissions,
        }
    }
}
