//! The module's export surface, resolved once at instantiation.

use wasmtime::{Instance, Memory, Store, TypedFunc, WasmParams, WasmResults};

use crate::allocator::AllocatorProxy;
use crate::config::Bindings;
use crate::error::{BridgeError, Result};
use crate::host::BridgeHost;

/// Capabilities the bridge needs from a module.
///
/// Built once from an instance and handed to the bridge; nothing looks up
/// exports by name after this point.
pub struct ModuleExports {
    /// Linear memory
    pub memory: Memory,
    /// One-time setup
    pub initialize: TypedFunc<(), ()>,
    /// Buffer allocation
    pub allocator: AllocatorProxy,
    /// Input notification
    pub consume_input: TypedFunc<u32, ()>,
    /// Deferred processing entry point, if exported
    pub process: Option<TypedFunc<(), ()>>,
}

impl ModuleExports {
    /// Resolve every export named in `bindings`.
    pub fn resolve(
        instance: &Instance,
        store: &mut Store<BridgeHost>,
        bindings: &Bindings,
    ) -> Result<Self> {
        let memory = instance
            .get_memory(&mut *store, &bindings.memory)
            .ok_or_else(|| BridgeError::MissingExport {
                name: bindings.memory.clone(),
                expected: "memory",
                cause: "no memory export found".to_string(),
            })?;

        let initialize = typed::<(), ()>(instance, store, &bindings.initialize, "() -> ()")?;
        let allocate = typed::<u32, u32>(instance, store, &bindings.allocate, "(i32) -> i32")?;
        let consume_input = typed::<u32, ()>(instance, store, &bindings.consume_input, "(i32) -> ()")?;

        let process = match instance.get_func(&mut *store, &bindings.process) {
            Some(func) => Some(func.typed::<(), ()>(&*store).map_err(|e| {
                BridgeError::MissingExport {
                    name: bindings.process.clone(),
                    expected: "() -> ()",
                    cause: e.to_string(),
                }
            })?),
            None => {
                tracing::warn!(
                    export = %bindings.process,
                    "module has no process export; pending work signals will be dropped"
                );
                None
            }
        };

        Ok(Self {
            memory,
            initialize,
            allocator: AllocatorProxy::new(allocate, memory),
            consume_input,
            process,
        })
    }
}

fn typed<P, R>(
    instance: &Instance,
    store: &mut Store<BridgeHost>,
    name: &str,
    expected: &'static str,
) -> Result<TypedFunc<P, R>>
where
    P: WasmParams,
    R: WasmResults,
{
    instance
        .get_typed_func::<P, R>(&mut *store, name)
        .map_err(|e| BridgeError::MissingExport {
            name: name.to_string(),
            expected,
            cause: e.to_string(),
        })
}
