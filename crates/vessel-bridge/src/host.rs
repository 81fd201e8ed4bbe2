//! Host functions imported by vessel modules.
//!
//! Three imports are registered under the configured import module
//! (`env` by default):
//!
//! ```wat
//! (import "env" "_EXPORT_output" (func $output (param i32 i32)))
//! (import "env" "_EXPORT_enqueue" (func $enqueue))
//! (import "env" "_EXPORT_panic" (func $panic (param i32 i32)))
//! ```
//!
//! `output(offset, len)` copies the bytes out of memory on the spot; the
//! pair means nothing once the module resumes. `enqueue()` raises a pending
//! work signal and never calls back into the module. `panic(offset, len)`
//! copies out the module's panic message and traps, which fails the bridge.

use serde::{Deserialize, Serialize};
use wasmtime::{Caller, Linker, Memory, StoreLimits, StoreLimitsBuilder};

use crate::config::{Bindings, RuntimeConfig};
use crate::error::{BridgeError, Result};
use crate::inbox::{Delivery, Inbox};
use crate::memory::{self, BufferHandle};
use crate::scheduler::WakeQueue;

/// Traffic counters for a bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeStats {
    /// Payloads handed to the module
    pub messages_sent: u64,
    /// Payload bytes handed to the module
    pub bytes_sent: u64,
    /// Messages copied out of the module
    pub messages_received: u64,
    /// Bytes copied out of the module
    pub bytes_received: u64,
    /// Messages that waited in the pre-subscription backlog
    pub messages_buffered: u64,
    /// Pending work signals raised by the module
    pub wake_signals: u64,
    /// Signals folded into an already scheduled invocation
    pub wake_coalesced: u64,
    /// Deferred invocations of the processing entry point
    pub deferred_runs: u64,
    /// Consumer registrations
    pub consumers_registered: u64,
}

/// Store data shared by all host functions of one bridge.
pub struct BridgeHost {
    memory_export: String,
    pub(crate) inbox: Inbox,
    pub(crate) wake: WakeQueue,
    pub(crate) stats: BridgeStats,
    limits: StoreLimits,
}

impl BridgeHost {
    /// Build host state for one module instance.
    pub fn new(bindings: &Bindings, runtime: &RuntimeConfig) -> Self {
        let limits = StoreLimitsBuilder::new()
            .memory_size(runtime.max_memory)
            .instances(1)
            .build();

        Self {
            memory_export: bindings.memory.clone(),
            inbox: Inbox::new(),
            wake: WakeQueue::new(),
            stats: BridgeStats::default(),
            limits,
        }
    }

    /// Resource limiter installed on the store.
    pub(crate) fn limits(&mut self) -> &mut StoreLimits {
        &mut self.limits
    }

    /// Counters, with wake totals folded in.
    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            wake_signals: self.wake.signals(),
            wake_coalesced: self.wake.coalesced(),
            ..self.stats.clone()
        }
    }
}

/// Register the bridge imports with the wasmtime linker.
pub fn register_host_functions(linker: &mut Linker<BridgeHost>, bindings: &Bindings) -> Result<()> {
    register_output(linker, bindings)?;
    register_request_schedule(linker, bindings)?;
    register_panic(linker, bindings)?;
    Ok(())
}

fn register_output(linker: &mut Linker<BridgeHost>, bindings: &Bindings) -> Result<()> {
    linker
        .func_wrap(
            &bindings.import_module,
            &bindings.output,
            |mut caller: Caller<'_, BridgeHost>, offset: u32, len: u32| -> wasmtime::Result<()> {
                let memory = get_memory(&mut caller)?;
                let message = memory::copy_out(&memory, &caller, BufferHandle::new(offset, len))?;

                let host = caller.data_mut();
                host.stats.messages_received += 1;
                host.stats.bytes_received += message.len() as u64;
                if host.inbox.deliver(message) == Delivery::Buffered {
                    host.stats.messages_buffered += 1;
                    tracing::debug!(offset, len, backlog = host.inbox.backlog_len(), "buffered message");
                } else {
                    tracing::debug!(offset, len, "delivered message");
                }
                Ok(())
            },
        )
        .map_err(|e| BridgeError::Link(format!("failed to register {}: {}", bindings.output, e)))?;
    Ok(())
}

fn register_request_schedule(linker: &mut Linker<BridgeHost>, bindings: &Bindings) -> Result<()> {
    linker
        .func_wrap(
            &bindings.import_module,
            &bindings.request_schedule,
            |mut caller: Caller<'_, BridgeHost>| {
                let wake = &mut caller.data_mut().wake;
                if wake.signal() {
                    tracing::debug!(pending = wake.pending(), "scheduled deferred process");
                } else {
                    tracing::debug!("coalesced pending work signal");
                }
            },
        )
        .map_err(|e| {
            BridgeError::Link(format!(
                "failed to register {}: {}",
                bindings.request_schedule, e
            ))
        })?;
    Ok(())
}

fn register_panic(linker: &mut Linker<BridgeHost>, bindings: &Bindings) -> Result<()> {
    linker
        .func_wrap(
            &bindings.import_module,
            &bindings.panic,
            |mut caller: Caller<'_, BridgeHost>, offset: u32, len: u32| -> wasmtime::Result<()> {
                let memory = get_memory(&mut caller)?;
                let raw = memory::copy_out(&memory, &caller, BufferHandle::new(offset, len))?;
                let message = String::from_utf8_lossy(&raw).into_owned();
                tracing::error!(%message, "module panicked");
                Err(BridgeError::ModulePanic { message }.into())
            },
        )
        .map_err(|e| BridgeError::Link(format!("failed to register {}: {}", bindings.panic, e)))?;
    Ok(())
}

/// Look up the module's memory through the caller, as it is right now.
fn get_memory(caller: &mut Caller<'_, BridgeHost>) -> Result<Memory> {
    let name = caller.data().memory_export.clone();
    caller
        .get_export(&name)
        .and_then(|e| e.into_memory())
        .ok_or_else(|| BridgeError::MissingExport {
            name,
            expected: "memory",
            cause: "no memory export visible to host call".to_string(),
        })
}
