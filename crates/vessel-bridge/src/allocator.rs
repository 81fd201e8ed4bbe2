//! Host-side proxy for the module's buffer allocator.

use crate::error::{BridgeError, Result};
use crate::memory::BufferHandle;
use wasmtime::{Memory, Store, TypedFunc};

/// Wraps the module export `allocate(len: u32) -> u32`.
///
/// The returned region is validated against the memory size observed right
/// after the call, because the allocator is free to grow memory.
pub struct AllocatorProxy {
    allocate: TypedFunc<u32, u32>,
    memory: Memory,
}

impl AllocatorProxy {
    /// Create a proxy over the allocate export and the memory it carves from.
    pub fn new(allocate: TypedFunc<u32, u32>, memory: Memory) -> Self {
        Self { allocate, memory }
    }

    /// Ask the module for `len` writable bytes.
    ///
    /// The contents of the region are unspecified. The handle is only good
    /// until the next call into the module.
    pub fn allocate<T: 'static>(&self, store: &mut Store<T>, len: usize) -> Result<BufferHandle> {
        let requested = u32::try_from(len).map_err(|_| BridgeError::AllocationFailure {
            requested: len as u64,
            cause: "length exceeds the 32-bit address space".to_string(),
        })?;

        let offset = self
            .allocate
            .call(&mut *store, requested)
            .map_err(|e| BridgeError::AllocationFailure {
                requested: requested as u64,
                cause: format!("{:#}", e),
            })?;

        let handle = BufferHandle::new(offset, requested);
        let memory_size = self.memory.data_size(&*store);
        if handle.end() > memory_size as u64 {
            return Err(BridgeError::AllocationFailure {
                requested: requested as u64,
                cause: format!(
                    "returned region {}..{} outside memory of {} bytes",
                    offset,
                    handle.end(),
                    memory_size
                ),
            });
        }

        tracing::trace!(
            offset = handle.offset(),
            len = handle.len(),
            memory_size,
            "module allocated buffer"
        );
        Ok(handle)
    }
}
