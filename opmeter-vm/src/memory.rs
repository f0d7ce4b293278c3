//! Word-addressed linear memory with quadratic expansion pricing

use crate::alu::as_u64;
use opmeter_core::{ExecutionError, Word};

/// Hard ceiling on memory size, independent of gas
pub const MEMORY_LIMIT: u64 = 32 * 1024 * 1024;

#[inline]
fn words(bytes: u64) -> u64 {
    bytes.div_ceil(32)
}

#[inline]
fn total_cost(words: u64) -> u64 {
    words
        .saturating_mul(3)
        .saturating_add(words.saturating_mul(words) / 512)
}

/// End offset of the region `[offset, offset + size)`.
///
/// `Ok(None)` for an empty region; out of gas if the end does not fit 64 bits.
pub fn region_end(offset: &Word, size: &Word) -> Result<Option<u64>, ExecutionError> {
    if size.is_zero() {
        return Ok(None);
    }
    let offset = as_u64(offset).ok_or(ExecutionError::OutOfGas)?;
    let size = as_u64(size).ok_or(ExecutionError::OutOfGas)?;
    offset
        .checked_add(size)
        .map(Some)
        .ok_or(ExecutionError::OutOfGas)
}

/// Gas for growing memory from `current_len` bytes to cover `end`
pub fn expansion_cost(current_len: usize, end: u64) -> u64 {
    let current = words(current_len as u64);
    let target = words(end);
    if target <= current {
        0
    } else {
        total_cost(target).saturating_sub(total_cost(current))
    }
}

/// Linear memory, always a whole number of 32-byte words
#[derive(Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Current contents
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Current size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been touched yet
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Grow to cover `end` bytes (rounded up to a word)
    pub fn ensure(&mut self, end: u64) -> Result<(), ExecutionError> {
        if end > MEMORY_LIMIT {
            return Err(ExecutionError::MemoryLimit {
                requested: end,
                limit: MEMORY_LIMIT,
            });
        }
        let target = (words(end) * 32) as usize;
        if target > self.data.len() {
            self.data.resize(target, 0);
        }
        Ok(())
    }

    /// Write `bytes` at `offset`; the caller must have called [`ensure`](Self::ensure)
    pub fn store(&mut self, offset: usize, bytes: &[u8]) {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Copy `len` bytes starting at `offset` out of memory
    pub fn read(&self, offset: usize, len: usize) -> &[u8] {
        &self.data[offset..offset + len]
    }
}
