//! Error types for the bridge crate.

use thiserror::Error;

/// Bridge error type
#[derive(Error, Debug)]
pub enum BridgeError {
    /// `send` or `run_pending` called before `initialize()` completed
    #[error("bridge not ready: module has not been initialized")]
    NotReady,

    /// The bridge hit a fatal error earlier and refuses further work
    #[error("bridge permanently failed: {cause}")]
    Failed {
        /// Description of the error that poisoned the bridge
        cause: String,
    },

    /// The module could not provide a buffer of the requested size
    #[error("module failed to allocate {requested} bytes: {cause}")]
    AllocationFailure {
        /// Requested buffer length in bytes
        requested: u64,
        /// What went wrong
        cause: String,
    },

    /// A buffer handle points outside the module's current memory
    #[error("region {offset}+{len} outside module memory of {memory_size} bytes")]
    OutOfBounds {
        /// Start of the region
        offset: u32,
        /// Length of the region
        len: u32,
        /// Memory size when the access was attempted
        memory_size: usize,
    },

    /// A required export is absent or has the wrong signature
    #[error("module export '{name}' missing or mistyped (expected {expected}): {cause}")]
    MissingExport {
        /// Export name looked up
        name: String,
        /// Expected signature, for diagnostics
        expected: &'static str,
        /// Underlying lookup error
        cause: String,
    },

    /// The module reported a panic through its panic import
    #[error("module panicked: {message}")]
    ModulePanic {
        /// Panic message copied out of module memory
        message: String,
    },

    /// A call into the module trapped
    #[error("module trapped in {call}: {cause}")]
    ModuleTrap {
        /// Export that was being called
        call: String,
        /// Trap description
        cause: String,
    },

    /// Module compilation failed
    #[error("module compilation failed: {0}")]
    Compile(String),

    /// Host function registration failed
    #[error("host function link failed: {0}")]
    Link(String),

    /// Module instantiation failed
    #[error("instantiation failed: {0}")]
    Instantiation(String),

    /// Runtime engine or store configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file parse error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    /// Whether this error left the bridge in its terminal failed state.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::Failed { .. }
                | BridgeError::AllocationFailure { .. }
                | BridgeError::OutOfBounds { .. }
                | BridgeError::ModuleTrap { .. }
                | BridgeError::ModulePanic { .. }
        )
    }

    /// Convert an error returned by a wasm call.
    ///
    /// Host imports report failures as traps carrying a `BridgeError`; fatal
    /// kinds are recovered as-is so callers see the original error.
    pub(crate) fn from_trap(call: &str, err: wasmtime::Error) -> Self {
        match err.downcast::<BridgeError>() {
            Ok(inner) if inner.is_fatal() => inner,
            Ok(inner) => BridgeError::ModuleTrap {
                call: call.to_string(),
                cause: inner.to_string(),
            },
            Err(err) => BridgeError::ModuleTrap {
                call: call.to_string(),
                cause: format!("{:#}", err),
            },
        }
    }
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
