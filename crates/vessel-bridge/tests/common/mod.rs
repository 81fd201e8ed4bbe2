//! Shared WAT fixtures for bridge integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use vessel_bridge::{Bridge, BridgeConfig, BridgeRuntime};

/// Echoes every input back through `output`.
///
/// `initialize` announces itself with "ready". The allocator places each
/// buffer in freshly grown pages, and `consume_input` grows memory again
/// before echoing, so every send crosses at least two memory growths.
pub const ECHO_VESSEL: &str = r#"
(module
  (import "env" "_EXPORT_output" (func $output (param i32 i32)))
  (import "env" "_EXPORT_enqueue" (func $enqueue))
  (memory (export "memory") 1)
  (data (i32.const 16) "ready")
  (global $pending_len (mut i32) (i32.const 0))

  (func (export "initialize")
    (call $output (i32.const 16) (i32.const 5)))

  (func (export "_EXPORT_make_buffer") (param $len i32) (result i32)
    (local $base i32)
    (global.set $pending_len (local.get $len))
    (local.set $base
      (memory.grow
        (i32.add (i32.shr_u (local.get $len) (i32.const 16)) (i32.const 1))))
    (if (i32.eq (local.get $base) (i32.const -1))
      (then unreachable))
    (i32.shl (local.get $base) (i32.const 16)))

  (func (export "_EXPORT_input") (param $ptr i32)
    (drop (memory.grow (i32.const 2)))
    (call $output (local.get $ptr) (global.get $pending_len)))
)
"#;

/// Raises pending work signals and counts deferred runs.
///
/// Payload is `[signals, extra_runs]`. `consume_input` emits `[0xAA]`, then
/// raises `signals` wake requests. Each `process` run emits its run number
/// as one byte and re-requests a wake until `extra_runs` runs have happened
/// since the input.
pub const WORKER_VESSEL: &str = r#"
(module
  (import "env" "_EXPORT_output" (func $output (param i32 i32)))
  (import "env" "_EXPORT_enqueue" (func $enqueue))
  (memory (export "memory") 1)
  (global $runs (mut i32) (i32.const 0))
  (global $target (mut i32) (i32.const 0))

  (func (export "initialize"))

  (func (export "_EXPORT_make_buffer") (param i32) (result i32)
    (i32.const 1024))

  (func (export "_EXPORT_input") (param $ptr i32)
    (local $n i32)
    (local.set $n (i32.load8_u (local.get $ptr)))
    (global.set $target
      (i32.add (global.get $runs) (i32.load8_u offset=1 (local.get $ptr))))
    (i32.store8 (i32.const 0) (i32.const 0xAA))
    (call $output (i32.const 0) (i32.const 1))
    (block $done
      (loop $again
        (br_if $done (i32.eqz (local.get $n)))
        (call $enqueue)
        (local.set $n (i32.sub (local.get $n) (i32.const 1)))
        (br $again))))

  (func (export "_EXPORT_handle")
    (global.set $runs (i32.add (global.get $runs) (i32.const 1)))
    (i32.store8 (i32.const 0) (global.get $runs))
    (call $output (i32.const 0) (i32.const 1))
    (if (i32.lt_u (global.get $runs) (global.get $target))
      (then (call $enqueue))))
)
"#;

/// Requests wakes but exports no processing entry point.
pub const NO_PROCESS_VESSEL: &str = r#"
(module
  (import "env" "_EXPORT_enqueue" (func $enqueue))
  (memory (export "memory") 1)
  (func (export "initialize"))
  (func (export "_EXPORT_make_buffer") (param i32) (result i32)
    (i32.const 0))
  (func (export "_EXPORT_input") (param i32)
    (call $enqueue)
    (call $enqueue))
)
"#;

/// Allocator hands back a region far outside its single page.
pub const BAD_ALLOC_VESSEL: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "initialize"))
  (func (export "_EXPORT_make_buffer") (param i32) (result i32)
    (i32.const 0x7fff0000))
  (func (export "_EXPORT_input") (param i32))
)
"#;

/// Reports an output region that runs past the end of memory.
pub const BAD_OUTPUT_VESSEL: &str = r#"
(module
  (import "env" "_EXPORT_output" (func $output (param i32 i32)))
  (memory (export "memory") 1)
  (func (export "initialize"))
  (func (export "_EXPORT_make_buffer") (param i32) (result i32)
    (i32.const 0))
  (func (export "_EXPORT_input") (param i32)
    (call $output (i32.const 60000) (i32.const 10000)))
)
"#;

/// Reports a panic with the message "boom: " followed by the input bytes.
pub const PANIC_VESSEL: &str = r#"
(module
  (import "env" "_EXPORT_output" (func $output (param i32 i32)))
  (import "env" "_EXPORT_panic" (func $panic (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "boom: ")
  (global $pending_len (mut i32) (i32.const 0))
  (func (export "initialize"))
  (func (export "_EXPORT_make_buffer") (param $len i32) (result i32)
    (global.set $pending_len (local.get $len))
    (i32.const 6))
  (func (export "_EXPORT_input") (param i32)
    (call $panic (i32.const 0) (i32.add (i32.const 6) (global.get $pending_len)))
    ;; never reached
    (call $output (i32.const 0) (i32.const 1)))
)
"#;

/// Missing the required `consume_input` export.
pub const INCOMPLETE_VESSEL: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "initialize"))
  (func (export "_EXPORT_make_buffer") (param i32) (result i32)
    (i32.const 0))
)
"#;

/// Messages collected by a test consumer.
pub type Received = Arc<Mutex<Vec<Vec<u8>>>>;

/// Compile a WAT fixture.
pub fn wasm(wat: &str) -> Vec<u8> {
    wat::parse_str(wat).expect("Failed to parse WAT")
}

/// Instantiate a fixture without initializing it.
pub fn instantiate_with(config: BridgeConfig, wat: &str) -> Bridge {
    let runtime = BridgeRuntime::new(config).expect("failed to create runtime");
    let module = runtime
        .load_module_bytes("fixture", &wasm(wat))
        .expect("failed to compile fixture");
    runtime.instantiate(&module).expect("failed to instantiate")
}

/// Instantiate and initialize a fixture with default config.
pub fn ready(wat: &str) -> Bridge {
    ready_with(BridgeConfig::default(), wat)
}

/// Instantiate and initialize a fixture.
pub fn ready_with(config: BridgeConfig, wat: &str) -> Bridge {
    let mut bridge = instantiate_with(config, wat);
    bridge.initialize().expect("initialize failed");
    bridge
}

/// Register a consumer that records every message.
pub fn collect(bridge: &mut Bridge) -> Received {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    bridge.on_data(move |data| sink.lock().unwrap().push(data));
    received
}

/// Snapshot of what a consumer has seen.
pub fn seen(received: &Received) -> Vec<Vec<u8>> {
    received.lock().unwrap().clone()
}
