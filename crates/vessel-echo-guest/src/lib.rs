//! Echo vessel for exercising the host bridge.
//!
//! Every input is queued and echoed back from the deferred `process` entry
//! point, one message per run. `initialize` announces the vessel with a
//! single "ready" message.
//!
//! Build with: cargo build --target wasm32-unknown-unknown --release

use std::cell::RefCell;
use std::collections::VecDeque;

// =============================================================================
// Host Imports
// =============================================================================

#[link(wasm_import_module = "env")]
extern "C" {
    /// Hand `len` bytes at `ptr` to the host. Copied before returning.
    fn _EXPORT_output(ptr: *const u8, len: usize);

    /// Ask the host to call `_EXPORT_handle` once the current call returns.
    fn _EXPORT_enqueue();

    /// Report a fatal error. The host traps and never calls back in.
    fn _EXPORT_panic(ptr: *const u8, len: usize);
}

#[derive(Default)]
struct Vessel {
    /// Buffer handed out by the last `_EXPORT_make_buffer`, awaiting input
    pending: Option<Vec<u8>>,
    /// Inputs not yet echoed
    outbox: VecDeque<Vec<u8>>,
}

thread_local! {
    static VESSEL: RefCell<Vessel> = RefCell::new(Vessel::default());
}

fn output(data: &[u8]) {
    unsafe { _EXPORT_output(data.as_ptr(), data.len()) }
}

fn enqueue() {
    unsafe { _EXPORT_enqueue() }
}

fn fail(message: &str) {
    unsafe { _EXPORT_panic(message.as_ptr(), message.len()) }
}

// =============================================================================
// Protocol Exports
// =============================================================================

#[no_mangle]
pub extern "C" fn initialize() {
    // Rust panics reach the host as a message instead of a bare trap.
    std::panic::set_hook(Box::new(|info| fail(&info.to_string())));
    output(b"ready");
}

/// Reserve `len` bytes for the next input. The buffer stays owned here
/// until `_EXPORT_input` takes it.
#[no_mangle]
pub extern "C" fn _EXPORT_make_buffer(len: usize) -> *mut u8 {
    VESSEL.with(|vessel| {
        let mut vessel = vessel.borrow_mut();
        let buffer = vessel.pending.insert(vec![0u8; len]);
        buffer.as_mut_ptr()
    })
}

#[no_mangle]
pub extern "C" fn _EXPORT_input(ptr: *const u8) {
    let accepted = VESSEL.with(|vessel| {
        let mut vessel = vessel.borrow_mut();
        match vessel.pending.take() {
            Some(buffer) if buffer.as_ptr() == ptr => {
                vessel.outbox.push_back(buffer);
                true
            }
            _ => false,
        }
    });
    if accepted {
        enqueue();
    } else {
        fail("input does not match the last buffer from _EXPORT_make_buffer");
    }
}

/// Echo the oldest queued input and re-request a run if more remain.
#[no_mangle]
pub extern "C" fn _EXPORT_handle() {
    let (message, more) = VESSEL.with(|vessel| {
        let mut vessel = vessel.borrow_mut();
        let message = vessel.outbox.pop_front();
        (message, !vessel.outbox.is_empty())
    });

    if let Some(message) = message {
        output(&message);
    }
    if more {
        enqueue();
    }
}
