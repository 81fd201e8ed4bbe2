//! The host-side bridge over one module instance.

use std::path::Path;
use std::time::Instant;

use wasmtime::Store;

use crate::error::{BridgeError, Result};
use crate::exports::ModuleExports;
use crate::host::{BridgeHost, BridgeStats};
use crate::memory;
use crate::runtime::{module_name, BridgeRuntime};

/// Lifecycle of a bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeStatus {
    /// Instantiated, `initialize()` not yet run
    Instantiated,
    /// Accepting sends
    Ready,
    /// A fatal error occurred; every further operation fails
    Failed(String),
}

/// Timing and fuel for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallReport {
    /// Wall time of the turn in microseconds, deferred work included
    pub execution_time_us: u64,
    /// Fuel consumed (if fuel metering enabled)
    pub fuel_consumed: Option<u64>,
}

/// Message-passing bridge to a single module instance.
///
/// A bridge owns its store and instance outright, so exactly one module
/// instance backs it for its whole life. All calls into the module start
/// from here, on the caller's thread. Each host-initiated call is a *turn*:
/// the synchronous part runs first, then any processing the module asked for
/// through its schedule import runs from this top-level frame.
pub struct Bridge {
    store: Store<BridgeHost>,
    exports: ModuleExports,
    status: BridgeStatus,
    max_deferred_per_turn: usize,
}

impl Bridge {
    pub(crate) fn new(
        store: Store<BridgeHost>,
        exports: ModuleExports,
        max_deferred_per_turn: usize,
    ) -> Self {
        Self {
            store,
            exports,
            status: BridgeStatus::Instantiated,
            max_deferred_per_turn,
        }
    }

    /// Read, compile, instantiate and initialize the module at `path`.
    ///
    /// Resolves once the module's `initialize()` has run.
    pub async fn load(runtime: &BridgeRuntime, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let module = runtime.load_module_bytes(&module_name(path), &bytes)?;
        let mut bridge = runtime.instantiate(&module)?;
        bridge.initialize()?;
        Ok(bridge)
    }

    /// Run the module's `initialize()` and mark the bridge ready.
    ///
    /// Calling this on a ready bridge does nothing.
    pub fn initialize(&mut self) -> Result<()> {
        match &self.status {
            BridgeStatus::Instantiated => {}
            BridgeStatus::Ready => {
                tracing::warn!("bridge already initialized; ignoring");
                return Ok(());
            }
            BridgeStatus::Failed(cause) => {
                return Err(BridgeError::Failed {
                    cause: cause.clone(),
                })
            }
        }

        let outcome = self
            .exports
            .initialize
            .call(&mut self.store, ())
            .map_err(|e| BridgeError::from_trap("initialize", e));
        self.poison(outcome)?;
        self.status = BridgeStatus::Ready;
        tracing::info!("bridge ready");

        let outcome = self.checkpoint();
        self.poison(outcome).map(|_| ())
    }

    /// Hand `payload` to the module.
    ///
    /// Allocates a module buffer, copies the payload in and calls
    /// `consume_input`. Deferred processing the module requests during the
    /// call runs afterwards, before this returns.
    pub fn send(&mut self, payload: &[u8]) -> Result<CallReport> {
        self.ensure_ready()?;

        let start = Instant::now();
        let fuel_before = self.store.get_fuel().ok();

        let outcome = self.deliver_input(payload);
        self.poison(outcome)?;
        let outcome = self.checkpoint();
        self.poison(outcome)?;

        let fuel_after = self.store.get_fuel().ok();
        Ok(CallReport {
            execution_time_us: start.elapsed().as_micros() as u64,
            fuel_consumed: fuel_before.zip(fuel_after).map(|(b, a)| b - a),
        })
    }

    /// Register the consumer for module output, replacing any previous one.
    ///
    /// Messages produced before the first registration are flushed to
    /// `consumer` right away, oldest first. A later registration takes over
    /// for new messages only.
    pub fn on_data<F>(&mut self, consumer: F)
    where
        F: FnMut(Vec<u8>) + Send + 'static,
    {
        let host = self.store.data_mut();
        host.stats.consumers_registered += 1;
        let flushed = host.inbox.set_consumer(Box::new(consumer));
        tracing::debug!(flushed, "registered data consumer");
    }

    /// Run deferred invocations left over from an exhausted turn budget.
    ///
    /// Returns how many ran.
    pub fn run_pending(&mut self) -> Result<usize> {
        self.ensure_ready()?;
        let outcome = self.checkpoint();
        self.poison(outcome)
    }

    /// Current lifecycle state.
    pub fn status(&self) -> &BridgeStatus {
        &self.status
    }

    /// Whether `send` is accepted.
    pub fn is_ready(&self) -> bool {
        self.status == BridgeStatus::Ready
    }

    /// Whether a deferred invocation is waiting.
    pub fn is_wake_scheduled(&self) -> bool {
        self.store.data().wake.is_scheduled()
    }

    /// Number of queued deferred invocations.
    pub fn pending_wakes(&self) -> usize {
        self.store.data().wake.pending()
    }

    /// Messages waiting for a consumer.
    pub fn buffered_messages(&self) -> usize {
        self.store.data().inbox.backlog_len()
    }

    /// Traffic counters.
    pub fn stats(&self) -> BridgeStats {
        self.store.data().stats()
    }

    /// Current size of module memory in bytes.
    pub fn memory_size(&self) -> usize {
        self.exports.memory.data_size(&self.store)
    }

    /// Get remaining fuel (if fuel metering enabled).
    pub fn remaining_fuel(&self) -> Option<u64> {
        self.store.get_fuel().ok()
    }

    fn ensure_ready(&self) -> Result<()> {
        match &self.status {
            BridgeStatus::Ready => Ok(()),
            BridgeStatus::Instantiated => Err(BridgeError::NotReady),
            BridgeStatus::Failed(cause) => Err(BridgeError::Failed {
                cause: cause.clone(),
            }),
        }
    }

    /// Allocate, copy in, notify. The handle is consumed by the notify call.
    fn deliver_input(&mut self, payload: &[u8]) -> Result<()> {
        let handle = self
            .exports
            .allocator
            .allocate(&mut self.store, payload.len())?;

        memory::copy_in(&self.exports.memory, &mut self.store, &handle, payload)?;

        let offset = handle.into_offset();
        self.exports
            .consume_input
            .call(&mut self.store, offset)
            .map_err(|e| BridgeError::from_trap("consume_input", e))?;

        let stats = &mut self.store.data_mut().stats;
        stats.messages_sent += 1;
        stats.bytes_sent += payload.len() as u64;
        tracing::debug!(offset, len = payload.len(), "sent payload");
        Ok(())
    }

    /// Drain deferred invocations queued during the turn, oldest first.
    fn checkpoint(&mut self) -> Result<usize> {
        let mut ran = 0;
        while ran < self.max_deferred_per_turn {
            let Some(wake) = self.store.data_mut().wake.take_next() else {
                break;
            };
            ran += 1;

            let Some(process) = self.exports.process.as_ref() else {
                tracing::warn!(seq = wake.seq, "dropping deferred invocation: no process export");
                continue;
            };

            self.store.data_mut().stats.deferred_runs += 1;
            tracing::debug!(seq = wake.seq, "running deferred process");
            process
                .call(&mut self.store, ())
                .map_err(|e| BridgeError::from_trap("process", e))?;
        }

        if self.is_wake_scheduled() {
            tracing::warn!(
                budget = self.max_deferred_per_turn,
                "deferred budget exhausted; remaining work waits for run_pending"
            );
        }
        Ok(ran)
    }

    /// Any error inside a turn leaves the module in an unknown state, so it
    /// moves the bridge to the failed state for good.
    fn poison<T>(&mut self, outcome: Result<T>) -> Result<T> {
        if let Err(err) = &outcome {
            if !matches!(self.status, BridgeStatus::Failed(_)) {
                tracing::error!(error = %err, "bridge failed");
                self.status = BridgeStatus::Failed(err.to_string());
            }
        }
        outcome
    }
}
