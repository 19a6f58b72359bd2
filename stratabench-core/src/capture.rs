//! Bounded output capture
//!
//! Provers can be extremely chatty on hard problems. [`BoundedOutput`] keeps
//! only the most recent `capacity` bytes, which is where the SZS status line
//! lives, and counts what it dropped.

use std::collections::VecDeque;

/// Default capture limit per attempt (stdout and stderr combined)
pub const DEFAULT_OUTPUT_LIMIT: usize = 64 * 1024;

/// Tail-keeping byte buffer
#[derive(Debug, Clone)]
pub struct BoundedOutput {
    buf: VecDeque<u8>,
    capacity: usize,
    discarded: u64,
}

impl BoundedOutput {
    /// Create a buffer holding at most `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity.min(DEFAULT_OUTPUT_LIMIT)),
            capacity,
            discarded: 0,
        }
    }

    /// Append bytes, dropping the oldest ones once full
    pub fn extend(&mut self, bytes: &[u8]) {
        if self.capacity == 0 {
            self.discarded += bytes.len() as u64;
            return;
        }
        if bytes.len() >= self.capacity {
            self.discarded += (self.buf.len() + bytes.len() - self.capacity) as u64;
            self.buf.clear();
            self.buf.extend(&bytes[bytes.len() - self.capacity..]);
            return;
        }
        let overflow = (self.buf.len() + bytes.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.buf.drain(..overflow);
            self.discarded += overflow as u64;
        }
        self.buf.extend(bytes);
    }

    /// Bytes currently retained
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes dropped so far
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Retained text, prefixed with a marker when anything was dropped
    pub fn to_string_lossy(&self) -> String {
        let (a, b) = self.buf.as_slices();
        let mut bytes = Vec::with_capacity(a.len() + b.len());
        bytes.extend_from_slice(a);
        bytes.extend_from_slice(b);
        let text = String::from_utf8_lossy(&bytes);
        if self.discarded > 0 {
            format!("[... {} bytes discarded ...]\n{}", self.discarded, text)
        } else {
            text.into_owned()
        }
    }

    /// Merge another capture after this one (stdout then stderr)
    pub fn append(&mut self, other: &BoundedOutput) {
        self.discarded += other.discarded;
        let (a, b) = other.buf.as_slices();
        self.extend(a);
        self.extend(b);
    }
}
