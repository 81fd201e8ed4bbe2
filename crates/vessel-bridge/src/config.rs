//! Configuration for the bridge runtime.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine and store settings for the wasmtime runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Maximum linear memory in bytes a module may grow to (default = 256MB)
    pub max_memory: usize,

    /// Enable fuel-based execution limiting
    pub fuel_limit: Option<u64>,

    /// Cranelift optimization level (0-3)
    pub optimization_level: u8,

    /// Enable SIMD support
    pub enable_simd: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_memory: 256 * 1024 * 1024, // 256 MB
            fuel_limit: None,
            optimization_level: 2,
            enable_simd: true,
        }
    }
}

impl RuntimeConfig {
    /// Create a minimal config for tightly bounded modules
    pub fn minimal() -> Self {
        Self {
            max_memory: 64 * 1024 * 1024,    // 64 MB
            fuel_limit: Some(1_000_000_000), // 1B fuel units
            ..Default::default()
        }
    }

    /// Create config for development/debugging
    pub fn development() -> Self {
        Self {
            optimization_level: 0, // Faster compilation
            ..Default::default()
        }
    }

    /// Builder: set max memory
    pub fn max_memory(mut self, bytes: usize) -> Self {
        self.max_memory = bytes;
        self
    }

    /// Builder: set fuel limit
    pub fn fuel_limit(mut self, fuel: u64) -> Self {
        self.fuel_limit = Some(fuel);
        self
    }

    /// Builder: enable SIMD
    pub fn simd(mut self, enable: bool) -> Self {
        self.enable_simd = enable;
        self
    }

    /// Builder: set optimization level
    pub fn optimize(mut self, level: u8) -> Self {
        self.optimization_level = level.min(3);
        self
    }
}

/// Names of the exports and imports that make up the bridge protocol.
///
/// Defaults follow the vessel module convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bindings {
    /// Exported linear memory
    pub memory: String,
    /// `() -> ()`, run once before any send
    pub initialize: String,
    /// `(len: u32) -> u32`, returns the offset of a fresh buffer
    pub allocate: String,
    /// `(offset: u32) -> ()`, consumes the buffer last allocated
    pub consume_input: String,
    /// Optional `() -> ()`, run by the deferred wake queue
    pub process: String,
    /// Import module the host functions are registered under
    pub import_module: String,
    /// Host import `(offset: u32, len: u32) -> ()`
    pub output: String,
    /// Host import `() -> ()` raising a pending work signal
    pub request_schedule: String,
    /// Host import `(offset: u32, len: u32) -> ()` reporting a module panic
    pub panic: String,
}

impl Default for Bindings {
    fn default() -> Self {
        Self {
            memory: "memory".to_string(),
            initialize: "initialize".to_string(),
            allocate: "_EXPORT_make_buffer".to_string(),
            consume_input: "_EXPORT_input".to_string(),
            process: "_EXPORT_handle".to_string(),
            import_module: "env".to_string(),
            output: "_EXPORT_output".to_string(),
            request_schedule: "_EXPORT_enqueue".to_string(),
            panic: "_EXPORT_panic".to_string(),
        }
    }
}

/// Top-level bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Engine and store settings
    pub runtime: RuntimeConfig,

    /// Protocol export/import names
    pub bindings: Bindings,

    /// Deferred invocations run per checkpoint before yielding back to the caller
    pub max_deferred_per_turn: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default(),
            bindings: Bindings::default(),
            max_deferred_per_turn: 1024,
        }
    }
}

impl BridgeConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Builder: set runtime settings
    pub fn runtime(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    /// Builder: set protocol names
    pub fn bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// Builder: set the per-checkpoint budget (at least 1)
    pub fn max_deferred_per_turn(mut self, budget: usize) -> Self {
        self.max_deferred_per_turn = budget.max(1);
        self
    }
}
