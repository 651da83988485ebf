//! Per-class guard for synchronized methods.
//!
//! At most one root execution context holds a class guard at a time. The
//! holder may re-enter (nested synchronized calls from the same root
//! context); everybody else is queued and told to come back later. Being
//! refused is not an error: the caller reports "not complete" and retries
//! the acquisition when it is driven again.

use std::collections::VecDeque;

use botscript_core::ContextId;

/// Default number of contexts allowed to queue for one guard.
pub const DEFAULT_MAX_WAITERS: usize = 5;

/// A reentrant guard with a bounded FIFO of waiting contexts.
#[derive(Debug, Clone, Default)]
pub struct SyncGuard {
    holder: Option<ContextId>,
    /// Number of acquisitions the holder has not released yet.
    depth: u32,
    waiters: VecDeque<ContextId>,
}

impl SyncGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take the guard for `token`.
    ///
    /// Returns `true` when the guard is now held by `token` (first entry or
    /// re-entry). Otherwise `token` is queued, unless it already waits or the
    /// queue already holds `max_waiters` contexts, and `false` is returned.
    pub fn try_acquire(&mut self, token: ContextId, max_waiters: usize) -> bool {
        match self.holder {
            None => {
                self.waiters.retain(|w| *w != token);
                self.holder = Some(token);
                self.depth = 1;
                true
            }
            Some(holder) if holder == token => {
                self.depth += 1;
                true
            }
            Some(_) => {
                if !self.waiters.contains(&token) && self.waiters.len() < max_waiters {
                    self.waiters.push_back(token);
                }
                false
            }
        }
    }

    /// Release one acquisition made by `token`.
    ///
    /// When the last acquisition is released the guard is handed to the
    /// first waiter, which owns it from its next [`try_acquire`](Self::try_acquire).
    /// Returns `false` if `token` did not hold the guard.
    pub fn release(&mut self, token: ContextId) -> bool {
        if self.holder != Some(token) || self.depth == 0 {
            return false;
        }
        self.depth -= 1;
        if self.depth == 0 {
            self.holder = self.waiters.pop_front();
        }
        true
    }

    /// Drop every claim `token` has on the guard without releasing
    /// acquisitions: its place in the queue, and a hand-over it never took up.
    pub fn withdraw(&mut self, token: ContextId) {
        self.waiters.retain(|w| *w != token);
        if self.holder == Some(token) && self.depth == 0 {
            self.holder = self.waiters.pop_front();
        }
    }

    /// The context that holds (or has been handed) the guard.
    pub fn holder(&self) -> Option<ContextId> {
        self.holder
    }

    /// Whether some context has acquired the guard and not released it.
    pub fn is_locked(&self) -> bool {
        self.depth > 0
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn waiters(&self) -> impl Iterator<Item = ContextId> + '_ {
        self.waiters.iter().copied()
    }
}
