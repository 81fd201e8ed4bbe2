//! Engine setup, module loading and instantiation using wasmtime.

use std::path::Path;

use wasmtime::*;

use crate::bridge::Bridge;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::exports::ModuleExports;
use crate::host::{register_host_functions, BridgeHost};

/// Compiles vessel modules and instantiates bridges over them.
pub struct BridgeRuntime {
    engine: Engine,
    config: BridgeConfig,
}

/// A compiled vessel module.
pub struct CompiledModule {
    module: Module,
    name: String,
}

impl BridgeRuntime {
    /// Create a new runtime with the given configuration.
    pub fn new(config: BridgeConfig) -> Result<Self> {
        let runtime = &config.runtime;
        let mut engine_config = Config::new();

        // Configure optimization
        engine_config.cranelift_opt_level(match runtime.optimization_level {
            0 => OptLevel::None,
            _ => OptLevel::Speed,
        });

        engine_config.wasm_simd(runtime.enable_simd);

        if runtime.fuel_limit.is_some() {
            engine_config.consume_fuel(true);
        }

        let engine = Engine::new(&engine_config)
            .map_err(|e| BridgeError::Config(format!("engine creation failed: {}", e)))?;

        Ok(Self { engine, config })
    }

    /// Create a runtime with default settings.
    pub fn with_defaults() -> Result<Self> {
        Self::new(BridgeConfig::default())
    }

    /// Load a module from a file.
    pub fn load_module(&self, path: impl AsRef<Path>) -> Result<CompiledModule> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        self.load_module_bytes(&module_name(path), &bytes)
    }

    /// Load a module from bytes (binary or WAT text).
    pub fn load_module_bytes(&self, name: &str, bytes: &[u8]) -> Result<CompiledModule> {
        let module = Module::new(&self.engine, bytes)
            .map_err(|e| BridgeError::Compile(format!("{}: {}", name, e)))?;

        tracing::info!(module = name, size = bytes.len(), "compiled module");
        Ok(CompiledModule {
            module,
            name: name.to_string(),
        })
    }

    /// Instantiate a module and wrap it in a bridge that still needs
    /// [`Bridge::initialize`].
    pub fn instantiate(&self, module: &CompiledModule) -> Result<Bridge> {
        let bindings = &self.config.bindings;
        let mut store = Store::new(&self.engine, BridgeHost::new(bindings, &self.config.runtime));

        store.limiter(|host| host.limits());

        if let Some(fuel) = self.config.runtime.fuel_limit {
            store
                .set_fuel(fuel)
                .map_err(|e| BridgeError::Config(format!("fuel setup failed: {}", e)))?;
        }

        let mut linker: Linker<BridgeHost> = Linker::new(&self.engine);
        register_host_functions(&mut linker, bindings)?;

        let instance = linker
            .instantiate(&mut store, &module.module)
            .map_err(|e| BridgeError::Instantiation(format!("{}: {:#}", module.name, e)))?;

        let exports = ModuleExports::resolve(&instance, &mut store, bindings)?;

        tracing::debug!(module = %module.name, "instantiated module");
        Ok(Bridge::new(
            store,
            exports,
            self.config.max_deferred_per_turn.max(1),
        ))
    }

    /// Get the configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

impl CompiledModule {
    /// Get the module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get exported function names.
    pub fn exports(&self) -> impl Iterator<Item = &str> {
        self.module.exports().filter_map(|e| {
            if matches!(e.ty(), ExternType::Func(_)) {
                Some(e.name())
            } else {
                None
            }
        })
    }

    /// Get imported function names as `module::name`.
    pub fn imports(&self) -> Vec<String> {
        self.module
            .imports()
            .filter(|i| matches!(i.ty(), ExternType::Func(_)))
            .map(|i| format!("{}::{}", i.module(), i.name()))
            .collect()
    }
}

/// Module name derived from a file path.
pub(crate) fn module_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}
