// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process-wide flag every agent consults before acting on an incoming
/// message. Closed at startup; `start()` opens it; `reset()` and
/// `clear()` close it again.
///
/// Cheap to clone — internally an `Arc`, the same handle pattern
/// `P2pHandle` uses to wrap its shared state.
#[derive(Clone, Debug)]
pub struct Gate {
    open: Arc<AtomicBool>,
}

impl Gate {
    pub fn new() -> Self {
        Self {
            open: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::Release);
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_at_startup() {
        let gate = Gate::new();
        assert!(!gate.is_open());
    }

    #[test]
    fn clone_shares_state() {
        let gate = Gate::new();
        let other = gate.clone();
        other.set_open(true);
        assert!(gate.is_open());
    }
}
