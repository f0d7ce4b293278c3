//! Bounded operand stack

use opmeter_core::{ExecutionError, Word};

/// Maximum number of stack entries
pub const STACK_LIMIT: usize = 1024;

/// Operand stack, bottom first
#[derive(Debug, Default)]
pub struct Stack {
    data: Vec<Word>,
}

impl Stack {
    /// Empty stack with the full limit preallocated
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(STACK_LIMIT),
        }
    }

    /// Entries, bottom first
    pub fn as_slice(&self) -> &[Word] {
        &self.data
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the stack is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `n`-th entry from the top (0 = top)
    pub fn peek(&self, n: usize) -> Option<&Word> {
        self.data.len().checked_sub(n + 1).map(|i| &self.data[i])
    }

    /// Push one entry
    pub fn push(&mut self, value: Word) -> Result<(), ExecutionError> {
        if self.data.len() >= STACK_LIMIT {
            return Err(ExecutionError::StackOverflow {
                len: self.data.len(),
                limit: STACK_LIMIT,
            });
        }
        self.data.push(value);
        Ok(())
    }

    /// Pop `N` entries; element 0 of the result is the former top
    pub fn pop_n<const N: usize>(&mut self) -> Result<[Word; N], ExecutionError> {
        if self.data.len() < N {
            return Err(ExecutionError::StackUnderflow {
                len: self.data.len(),
                required: N,
            });
        }
        let mut out = [Word::ZERO; N];
        for slot in out.iter_mut() {
            // length checked above
            *slot = self.data.pop().unwrap_or_default();
        }
        Ok(out)
    }

    /// Duplicate the `n`-th entry (1 = top) onto the top
    pub fn dup(&mut self, n: usize) -> Result<(), ExecutionError> {
        let value = *self.peek(n - 1).ok_or(ExecutionError::StackUnderflow {
            len: self.data.len(),
            required: n,
        })?;
        self.push(value)
    }

    /// Exchange the top with the entry `n` below it
    pub fn swap(&mut self, n: usize) -> Result<(), ExecutionError> {
        let len = self.data.len();
        if len < n + 1 {
            return Err(ExecutionError::StackUnderflow {
                len,
                required: n + 1,
            });
        }
        self.data.swap(len - 1, len - 1 - n);
        Ok(())
    }
}
