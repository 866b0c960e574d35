//! Bounded LIFO pool of reusable native handles.
//!
//! Release always resets the handle before it becomes available, so a
//! re-acquired handle never carries state from its previous owner.

use std::fmt;

/// Reuse counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Handles handed back out by [`HandlePool::acquire`].
    pub reused: u64,
    /// Handles accepted by [`HandlePool::release`].
    pub returned: u64,
    /// Handles discarded because the pool was full or disabled.
    pub dropped: u64,
}

/// LIFO free list bounded by `max`.
pub struct HandlePool<T> {
    free: Vec<T>,
    max: usize,
    enabled: bool,
    reset: fn(&mut T),
    stats: PoolStats,
}

impl<T> HandlePool<T> {
    /// Pool keeping at most `max` handles, resetting each with `reset`.
    pub fn new(max: usize, enabled: bool, reset: fn(&mut T)) -> Self {
        Self {
            free: Vec::new(),
            max,
            enabled,
            reset,
            stats: PoolStats::default(),
        }
    }

    /// Most recently released handle, if any.
    pub fn acquire(&mut self) -> Option<T> {
        let handle = self.free.pop()?;
        self.stats.reused += 1;
        Some(handle)
    }

    /// Reset and keep `handle`. Returns `false` when it was dropped instead.
    pub fn release(&mut self, mut handle: T) -> bool {
        if !self.enabled || self.free.len() >= self.max {
            self.stats.dropped += 1;
            return false;
        }
        (self.reset)(&mut handle);
        self.free.push(handle);
        self.stats.returned += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    pub const fn max(&self) -> usize {
        self.max
    }

    /// Change the bound, discarding the oldest handles beyond it.
    pub fn set_max(&mut self, max: usize) {
        self.max = max;
        if self.free.len() > max {
            let excess = self.free.len() - max;
            self.free.drain(..excess);
            self.stats.dropped += excess as u64;
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabling empties the pool.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.free.clear();
        }
    }

    pub const fn stats(&self) -> PoolStats {
        self.stats
    }

    pub fn clear(&mut self) {
        self.free.clear();
    }
}

impl<T> fmt::Debug for HandlePool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlePool")
            .field("free", &self.free.len())
            .field("max", &self.max)
            .field("enabled", &self.enabled)
            .field("stats", &self.stats)
            .finish()
    }
}
