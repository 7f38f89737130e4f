//! Collection runtime for the IPDR exporter link.
//!
//! Layering, bottom up: [`SessionRegistry`] tracks subscribed sessions,
//! their templates, and their record sinks; [`Liveness`] owns both
//! keepalive timers; [`Dispatcher`] is the protocol state machine; and
//! [`Collector`] wires all of it to a byte stream across four threads.
//!
//! Time enters through explicit `Instant` parameters so the state
//! machinery stays testable without sleeping.

mod collector;
mod config;
mod dispatch;
mod error;
mod liveness;
mod registry;
mod sink;

pub use collector::Collector;
pub use config::CollectorConfig;
pub use dispatch::{Dispatcher, LinkState};
pub use error::{EngineError, Result};
pub use liveness::Liveness;
pub use registry::SessionRegistry;
pub use sink::{CsvFileFactory, MemorySinkFactory, RecordSink, SinkFactory};

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, continuing past poisoning; a panicked worker already
/// surfaces its own error.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
