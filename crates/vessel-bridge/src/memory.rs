//! Copying bytes in and out of module linear memory.
//!
//! The host never owns module memory. Every access goes through
//! [`Memory::data`]/[`Memory::data_mut`] at the moment of the copy, so the view
//! always reflects the current size after any growth. Those slices borrow the
//! store, which makes holding one across a call into the module a compile
//! error rather than a stale read.

use crate::error::{BridgeError, Result};
use std::ops::Range;
use wasmtime::{AsContext, AsContextMut, Memory};

/// A region inside module memory, valid until the next call into the module.
///
/// Deliberately neither `Clone` nor `Copy`: a handle is used once and then
/// consumed, so an offset cannot outlive the call it was issued for.
#[derive(Debug, PartialEq, Eq)]
pub struct BufferHandle {
    offset: u32,
    len: u32,
}

impl BufferHandle {
    /// Create a handle for `len` bytes at `offset`.
    pub const fn new(offset: u32, len: u32) -> Self {
        Self { offset, len }
    }

    /// Offset of the region.
    pub const fn offset(&self) -> u32 {
        self.offset
    }

    /// Length of the region in bytes.
    pub const fn len(&self) -> u32 {
        self.len
    }

    /// Whether the region is zero-length.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the last byte, computed without overflow.
    pub const fn end(&self) -> u64 {
        self.offset as u64 + self.len as u64
    }

    /// Give up the handle, returning the offset to hand back to the module.
    pub fn into_offset(self) -> u32 {
        self.offset
    }

    fn range_within(&self, memory_size: usize) -> Result<Range<usize>> {
        if self.end() > memory_size as u64 {
            return Err(BridgeError::OutOfBounds {
                offset: self.offset,
                len: self.len,
                memory_size,
            });
        }
        let start = self.offset as usize;
        Ok(start..start + self.len as usize)
    }
}

/// Borrow the bytes a handle designates.
pub fn region<'a>(data: &'a [u8], handle: &BufferHandle) -> Result<&'a [u8]> {
    let range = handle.range_within(data.len())?;
    Ok(&data[range])
}

/// Mutably borrow the bytes a handle designates.
pub fn region_mut<'a>(data: &'a mut [u8], handle: &BufferHandle) -> Result<&'a mut [u8]> {
    let range = handle.range_within(data.len())?;
    Ok(&mut data[range])
}

/// Copy `payload` into module memory at `handle`, using a fresh view.
pub fn copy_in<T: 'static>(
    memory: &Memory,
    mut store: impl AsContextMut<Data = T>,
    handle: &BufferHandle,
    payload: &[u8],
) -> Result<()> {
    debug_assert_eq!(payload.len(), handle.len() as usize);
    let data = memory.data_mut(store.as_context_mut());
    region_mut(data, handle)?.copy_from_slice(payload);
    Ok(())
}

/// Copy the bytes at `handle` out of module memory into an owned buffer.
pub fn copy_out<T: 'static>(
    memory: &Memory,
    store: impl AsContext<Data = T>,
    handle: BufferHandle,
) -> Result<Vec<u8>> {
    let data = memory.data(store.as_context());
    Ok(region(data, &handle)?.to_vec())
}
