// src/actuation/sink.rs
//! Event sink trait and in-process sinks

use crate::processing::gate::Event;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DispatchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("collaborator responded with status {0}")]
    Status(u16),

    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Actuation collaborator
///
/// Delivery is fire-and-forget: callers log failures and never retry.
#[async_trait]
pub trait EventSink: Send + Sync {
    fn name(&self) -> &str;

    async fn dispatch(&self, event: &Event) -> Result<(), DispatchError>;
}

#[async_trait]
impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn dispatch(&self, event: &Event) -> Result<(), DispatchError> {
        (**self).dispatch(event).await
    }
}

/// Keeps every dispatched event in memory
///
/// Clones share the same record, so a test can keep one handle and give
/// another to the runtime.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<Event>>>,
    attempts: Arc<Mutex<u64>>,
    failing: Arc<AtomicBool>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every dispatch fails with `Unavailable`
    pub fn failing() -> Self {
        let sink = Self::new();
        sink.set_failing(true);
        sink
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Events delivered successfully, in order
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Dispatch calls, successful or not
    pub fn attempts(&self) -> u64 {
        *self.attempts.lock()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn dispatch(&self, event: &Event) -> Result<(), DispatchError> {
        *self.attempts.lock() += 1;
        if self.failing.load(Ordering::SeqCst) {
            return Err(DispatchError::Unavailable("recording sink set to fail".to_string()));
        }
        self.events.lock().push(*event);
        Ok(())
    }
}

/// Logs events instead of delivering them
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn dispatch(&self, event: &Event) -> Result<(), DispatchError> {
        info!(direction = %event.direction, duration_ms = event.duration_ms, "dry-run event");
        Ok(())
    }
}
