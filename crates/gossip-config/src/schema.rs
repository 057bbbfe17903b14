// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

/// Serde default helper — returns `100`.
///
/// Used for capacity fields that should fall back to a sane working
/// default rather than to `0`, which would make the channel immediately
/// saturate.
fn default_capacity() -> usize {
    100
}

fn default_subscriber_deadline_ms() -> u64 {
    1000
}

fn default_broadcaster_interval_ms() -> u64 {
    50
}

/// Per-population node configuration.
///
/// Every agent created from the same `NodeConfig` draws its own `value`
/// independently; the struct itself is immutable once an agent is built
/// from it (agents hold a clone).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Upper bound of the initial value draw.
    pub max: f64,
    /// Lower bound of the initial value draw.
    pub min: f64,
    /// Delay between emission rounds, in milliseconds.
    pub delay_ms: u64,
    /// Multiplier applied to `hp` on a rejected exchange. Must be in `(0, 1)`.
    pub decay: f64,
    /// Cap on the number of records an activation may accumulate before
    /// the agent expires regardless of its `hp` draw.
    pub max_round: u32,
}

impl NodeConfig {
    /// Validate the fields a caller cannot be allowed to get away with:
    /// `decay` must leave `hp` able to decay towards expiry, and `min`
    /// must not exceed `max` (an inverted range would make
    /// `rand::Rng::gen_range` panic). `decay == 1.0` is admitted on
    /// purpose — it's the B3 boundary case (hp never decreases;
    /// termination is purely draw-driven), not an invalid config.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.decay > 0.0 && self.decay <= 1.0) {
            return Err(format!(
                "decay must be in (0, 1], got {}",
                self.decay
            ));
        }
        if self.min > self.max {
            return Err(format!(
                "min ({}) must not exceed max ({})",
                self.min, self.max
            ));
        }
        Ok(())
    }
}

/// Top-level simulator configuration: population defaults plus the sizing
/// knobs for the shared collaborators (the Medium and the Event Bus).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Default config applied by the CLI's `add` command when none of
    /// `--min/--max/--delay/--decay/--max-round` are given explicitly.
    #[serde(default = "default_node_config")]
    pub default_node: NodeConfig,

    /// Bounded capacity of the Medium (the shared message FIFO).
    #[serde(default = "default_capacity")]
    pub medium_capacity: usize,

    /// Bounded capacity of the Event Bus's intake queue.
    #[serde(default = "default_capacity")]
    pub event_bus_capacity: usize,

    /// How long the broadcaster waits on a single subscriber send before
    /// giving up and dropping that subscriber.
    #[serde(default = "default_subscriber_deadline_ms")]
    pub subscriber_write_deadline_ms: u64,

    /// Pacing interval between broadcaster drain cycles (~20 Hz default).
    #[serde(default = "default_broadcaster_interval_ms")]
    pub broadcaster_interval_ms: u64,
}

fn default_node_config() -> NodeConfig {
    NodeConfig {
        max: 100.0,
        min: 0.0,
        delay_ms: 50,
        decay: 0.9,
        max_round: 200,
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            default_node: default_node_config(),
            medium_capacity: default_capacity(),
            event_bus_capacity: default_capacity(),
            subscriber_write_deadline_ms: default_subscriber_deadline_ms(),
            broadcaster_interval_ms: default_broadcaster_interval_ms(),
        }
    }
}
