// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Pure read-side reductions over the registry and the experiment log.
//! Nothing here mutates; a reader sees a consistent view of any single
//! agent (its `value()` and `records()` calls each take that agent's own
//! lock independently) but not a globally atomic snapshot across the whole
//! population — agents may still be active while statistics are computed.

use std::collections::HashMap;

use serde::Serialize;

use crate::registry::Registry;

#[derive(Debug, Clone, Serialize)]
pub struct StatisticsSnapshot {
    pub min_value: f64,
    pub max_value: f64,
    pub mean_value: f64,
    pub mean_decay: f64,
    /// Sender → number of accepted-or-rejected exchanges attributed to
    /// that sender, tallied across every agent's *receiver-side* record
    /// list: sender-side effort is what "round" measures.
    pub min_round: Option<u32>,
    pub max_round: Option<u32>,
    pub mean_round: f64,
}

pub fn min_value(registry: &Registry) -> f64 {
    registry
        .all()
        .iter()
        .map(|a| a.value())
        .fold(f64::INFINITY, f64::min)
}

pub fn max_value(registry: &Registry) -> f64 {
    registry
        .all()
        .iter()
        .map(|a| a.value())
        .fold(f64::NEG_INFINITY, f64::max)
}

pub fn mean_value(registry: &Registry) -> f64 {
    let agents = registry.all();
    let total: f64 = agents.iter().map(|a| a.value()).sum();
    total / agents.len() as f64
}

/// Mean of `(value - correct)^2` across the population.
/// `mse(registry, mean_value(registry))` is, by construction, the
/// population variance.
pub fn mse(registry: &Registry, correct: f64) -> f64 {
    let agents = registry.all();
    let sum: f64 = agents.iter().map(|a| (a.value() - correct).powi(2)).sum();
    sum / agents.len() as f64
}

pub fn mean_decay(registry: &Registry) -> f64 {
    let agents = registry.all();
    let total: f64 = agents.iter().map(|a| a.config().decay).sum();
    total / agents.len() as f64
}

/// Builds the sender→count histogram by iterating every agent's
/// receiver-side record list and tallying `sender`.
fn sender_round_histogram(registry: &Registry) -> HashMap<String, u32> {
    let mut histogram = HashMap::new();
    for agent in registry.all() {
        for record in agent.records() {
            *histogram.entry(record.sender).or_insert(0) += 1;
        }
    }
    histogram
}

pub fn min_round(registry: &Registry) -> Option<u32> {
    sender_round_histogram(registry).values().copied().min()
}

pub fn max_round(registry: &Registry) -> Option<u32> {
    sender_round_histogram(registry).values().copied().max()
}

pub fn mean_round(registry: &Registry) -> f64 {
    let histogram = sender_round_histogram(registry);
    let total: u32 = histogram.values().sum();
    total as f64 / histogram.len() as f64
}

pub fn snapshot(registry: &Registry) -> StatisticsSnapshot {
    let histogram = sender_round_histogram(registry);
    let total: u32 = histogram.values().sum();
    StatisticsSnapshot {
        min_value: min_value(registry),
        max_value: max_value(registry),
        mean_value: mean_value(registry),
        mean_decay: mean_decay(registry),
        min_round: histogram.values().copied().min(),
        max_round: histogram.values().copied().max(),
        mean_round: total as f64 / histogram.len() as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::gate::Gate;
    use crate::medium::Medium;
    use gossip_config::NodeConfig;

    fn cfg(min: f64, max: f64, decay: f64) -> NodeConfig {
        NodeConfig { min, max, delay_ms: 10, decay, max_round: 100 }
    }

    #[tokio::test]
    async fn min_max_mean_across_population() {
        let registry = Registry::new();
        let medium = Medium::new(10);
        let (events, _h) = EventBus::spawn(10, 200, 1);
        let gate = Gate::new();
        registry.add(cfg(0.0, 0.0, 0.9), &medium, &events, &gate);
        registry.add(cfg(10.0, 10.0, 0.9), &medium, &events, &gate);
        registry.add(cfg(20.0, 20.0, 0.9), &medium, &events, &gate);

        assert_eq!(min_value(&registry), 0.0);
        assert_eq!(max_value(&registry), 20.0);
        assert_eq!(mean_value(&registry), 10.0);
    }

    #[tokio::test]
    async fn mse_against_mean_equals_population_variance() {
        let registry = Registry::new();
        let medium = Medium::new(10);
        let (events, _h) = EventBus::spawn(10, 200, 1);
        let gate = Gate::new();
        registry.add(cfg(0.0, 0.0, 0.9), &medium, &events, &gate);
        registry.add(cfg(10.0, 10.0, 0.9), &medium, &events, &gate);

        let mean = mean_value(&registry);
        let values: Vec<f64> = registry.all().iter().map(|a| a.value()).collect();
        let variance: f64 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        assert_eq!(mse(&registry, mean), variance);
    }

    #[tokio::test]
    async fn mean_decay_averages_per_agent_configs() {
        let registry = Registry::new();
        let medium = Medium::new(10);
        let (events, _h) = EventBus::spawn(10, 200, 1);
        let gate = Gate::new();
        registry.add(cfg(0.0, 1.0, 0.8), &medium, &events, &gate);
        registry.add(cfg(0.0, 1.0, 0.6), &medium, &events, &gate);

        assert!((mean_decay(&registry) - 0.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn empty_registry_has_no_round_histogram() {
        let registry = Registry::new();
        assert_eq!(min_round(&registry), None);
        assert_eq!(max_round(&registry), None);
    }
}
