// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

/// Errors surfaced to callers of the [`crate::simulation::Simulation`] facade.
///
/// Transient internal faults (a full queue, a dead subscriber, a cancelled
/// task) never become a `GossipError` — they are logged via `tracing` and
/// swallowed at the task boundary instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GossipError {
    #[error("unknown agent id: {0}")]
    UnknownAgent(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("medium closed")]
    MediumClosed,
}
