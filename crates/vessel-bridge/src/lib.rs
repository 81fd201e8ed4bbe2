//! # Vessel Bridge
//!
//! Host-side message passing for sandboxed WebAssembly "vessels".
//!
//! A vessel is a module with its own linear memory and a small protocol
//! surface. The bridge moves raw byte payloads across that boundary without
//! either side re-entering the other's call stack:
//!
//! | Direction | Mechanism |
//! |-----------|-----------|
//! | host → module | `allocate(len)`, copy into the returned region, `consume_input(offset)` |
//! | module → host | `output(offset, len)` import, copied out before returning |
//! | module → host wake | `request_schedule()` import, coalesced, `process()` run after the turn |
//! | module → host panic | `panic(offset, len)` import, message copied out, bridge fails |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vessel_bridge::{Bridge, BridgeRuntime};
//!
//! let runtime = BridgeRuntime::with_defaults()?;
//! let mut bridge = Bridge::load(&runtime, "echo_vessel.wasm").await?;
//!
//! bridge.on_data(|data| println!("{:?}", data));
//! bridge.send(&[1, 2, 3])?;
//! ```
//!
//! ## Module protocol
//!
//! Export and import names are configurable through [`Bindings`]; the
//! defaults are:
//!
//! ```wat
//! (import "env" "_EXPORT_output"  (func (param i32 i32)))
//! (import "env" "_EXPORT_enqueue" (func))
//! (import "env" "_EXPORT_panic"   (func (param i32 i32)))
//! (export "memory" (memory 0))
//! (export "initialize"          (func))
//! (export "_EXPORT_make_buffer" (func (param i32) (result i32)))
//! (export "_EXPORT_input"       (func (param i32)))
//! (export "_EXPORT_handle"      (func))   ;; optional
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod allocator;
pub mod bridge;
pub mod config;
pub mod error;
pub mod exports;
pub mod host;
pub mod inbox;
pub mod memory;
pub mod runtime;
pub mod scheduler;

// Re-export main types
pub use bridge::{Bridge, BridgeStatus, CallReport};
pub use config::{Bindings, BridgeConfig, RuntimeConfig};
pub use error::{BridgeError, Result};
pub use host::BridgeStats;
pub use memory::BufferHandle;
pub use runtime::{BridgeRuntime, CompiledModule};
pub use scheduler::{WakeQueue, WakeState};
