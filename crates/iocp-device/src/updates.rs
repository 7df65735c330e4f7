//! Pending position/value updates.
//!
//! Updates arrive inside `Resp` commands and are applied later in the main
//! loop. The log is bounded: when it is full, new entries are rejected with a
//! recoverable error instead of growing without limit.

use std::fmt;
use std::vec::Drain;

use crate::error::{DeviceError, DeviceResult};

/// A single update: set `position` to `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateEntry {
    /// Target position.
    pub position: i64,
    /// New value.
    pub value: i64,
}

impl UpdateEntry {
    /// Parse a `<position>=<value>` argument.
    pub fn parse(arg: &str) -> Option<UpdateEntry> {
        let (position, value) = arg.split_once('=')?;
        Some(UpdateEntry {
            position: position.trim().parse().ok()?,
            value: value.trim().parse().ok()?,
        })
    }
}

impl fmt::Display for UpdateEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.position, self.value)
    }
}

/// Bounded, append-only log of pending updates.
#[derive(Debug)]
pub struct UpdateLog {
    entries: Vec<UpdateEntry>,
    capacity: usize,
}

impl UpdateLog {
    /// Create a log holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        UpdateLog {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, failing if the log is full.
    pub fn try_push(&mut self, entry: UpdateEntry) -> DeviceResult<()> {
        if self.entries.len() >= self.capacity {
            return Err(DeviceError::UpdateLogFull {
                capacity: self.capacity,
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Remove and return all pending entries, oldest first.
    pub fn drain(&mut self) -> Drain<'_, UpdateEntry> {
        self.entries.drain(..)
    }

    /// Pending entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &UpdateEntry> {
        self.entries.iter()
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no update is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of pending entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
