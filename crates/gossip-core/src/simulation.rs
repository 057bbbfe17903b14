// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The `Simulation` facade: wires the Medium, the Event Bus, the
//! population registry, the gate and the experiment log into the single
//! surface a frontend (CLI today, HTTP/WS tomorrow) drives.

use std::sync::Arc;

use gossip_config::{NodeConfig, SimulatorConfig};
use tokio::sync::mpsc;

use crate::agent::{Agent, AgentSummary};
use crate::error::GossipError;
use crate::events::{Event, EventBus};
use crate::gate::Gate;
use crate::medium::Medium;
use crate::record::{ExperimentLog, ExperimentRecord};
use crate::registry::Registry;
use crate::statistics::{self, StatisticsSnapshot};

/// Random human-friendly-ish name for an experiment record, since nothing
/// about a run's outcome is derivable from a random id alone.
fn random_name() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub struct Simulation {
    registry: Registry,
    medium: Medium,
    events: EventBus,
    gate: Gate,
    log: ExperimentLog,
    default_node: NodeConfig,
    _broadcaster: tokio::task::JoinHandle<()>,
}

impl Simulation {
    pub fn new(config: SimulatorConfig) -> Self {
        let medium = Medium::new(config.medium_capacity);
        let (events, broadcaster) = EventBus::spawn(
            config.event_bus_capacity,
            config.subscriber_write_deadline_ms,
            config.broadcaster_interval_ms,
        );
        Self {
            registry: Registry::new(),
            medium,
            events,
            gate: Gate::new(),
            log: ExperimentLog::new(),
            default_node: config.default_node,
            _broadcaster: broadcaster,
        }
    }

    /// Adds `amount` agents. `config` overrides the simulator's default
    /// per-population settings when given.
    pub fn add_agents(&self, amount: usize, config: Option<NodeConfig>) -> Result<Vec<Arc<Agent>>, GossipError> {
        let config = config.unwrap_or(self.default_node);
        config
            .validate()
            .map_err(GossipError::InvalidConfig)?;
        Ok(self
            .registry
            .add_batch(config, amount, &self.medium, &self.events, &self.gate))
    }

    pub fn delete_agent(&self, id: &str) -> Result<(), GossipError> {
        if self.registry.delete(id) {
            Ok(())
        } else {
            Err(GossipError::UnknownAgent(id.to_string()))
        }
    }

    pub fn list_agents(&self) -> Vec<AgentSummary> {
        self.registry.list()
    }

    pub fn agent_count(&self) -> usize {
        self.registry.len()
    }

    /// Opens the gate and chain-activates the population. A no-op on an
    /// empty registry.
    pub async fn start(&self) {
        self.gate.set_open(true);
        self.registry.activate_all().await;
    }

    /// Closes the gate, drains both the Medium and the Event Bus so no
    /// stale traffic survives into the next run, then resets every agent
    /// back to `IDLE` with a freshly drawn value.
    pub fn reset(&self) {
        self.gate.set_open(false);
        self.medium.drain();
        self.events.drain();
        self.registry.reset_all();
    }

    /// Stops and removes every agent, closes the gate, and drains both
    /// shared collaborators. The experiment log is untouched.
    pub fn clear(&self) {
        self.gate.set_open(false);
        self.registry.clear();
        self.medium.drain();
        self.events.drain();
    }

    pub fn statistics(&self) -> StatisticsSnapshot {
        statistics::snapshot(&self.registry)
    }

    /// Computes the current statistics against `correct` and appends an
    /// [`ExperimentRecord`] to the in-memory log, returning the name it
    /// was stored under.
    pub fn save(&self, correct: f64) -> String {
        let snapshot = self.statistics();
        let name = random_name();
        self.log.add(ExperimentRecord {
            name: name.clone(),
            max_value: snapshot.max_value,
            min_value: snapshot.min_value,
            node_count: self.registry.len(),
            decay: snapshot.mean_decay,
            mse: statistics::mse(&self.registry, correct),
            mean_lost: correct - snapshot.mean_value,
            mean_round: snapshot.mean_round,
        });
        name
    }

    pub fn experiments(&self) -> Vec<ExperimentRecord> {
        self.log.all()
    }

    pub fn subscribe_events(&self) -> mpsc::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn export_csv(&self) -> String {
        self.log.to_csv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> SimulatorConfig {
        SimulatorConfig {
            default_node: NodeConfig { min: 0.0, max: 10.0, delay_ms: 5, decay: 0.9, max_round: 50 },
            medium_capacity: 100,
            event_bus_capacity: 100,
            subscriber_write_deadline_ms: 200,
            broadcaster_interval_ms: 1,
        }
    }

    #[tokio::test]
    async fn add_agents_rejects_invalid_config() {
        let sim = Simulation::new(config());
        let bad = NodeConfig { min: 10.0, max: 0.0, delay_ms: 1, decay: 0.9, max_round: 10 };
        assert!(sim.add_agents(3, Some(bad)).is_err());
    }

    #[tokio::test]
    async fn two_agents_converge_to_mean() {
        let sim = Simulation::new(config());
        let fixed_a = NodeConfig { min: 0.0, max: 0.0, delay_ms: 5, decay: 0.95, max_round: 200 };
        let fixed_b = NodeConfig { min: 10.0, max: 10.0, delay_ms: 5, decay: 0.95, max_round: 200 };
        sim.add_agents(1, Some(fixed_a)).unwrap();
        sim.add_agents(1, Some(fixed_b)).unwrap();
        sim.start().await;
        tokio::time::sleep(Duration::from_millis(500)).await;

        let stats = sim.statistics();
        assert!((stats.mean_value - 5.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn reset_drains_and_returns_agents_to_idle() {
        let sim = Simulation::new(config());
        sim.add_agents(3, None).unwrap();
        sim.start().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        sim.reset();
        for summary in sim.list_agents() {
            assert_eq!(summary.hp, 0.0);
        }
    }

    #[tokio::test]
    async fn clear_empties_registry_and_keeps_log() {
        let sim = Simulation::new(config());
        sim.add_agents(2, None).unwrap();
        sim.save(5.0);
        sim.clear();
        assert_eq!(sim.agent_count(), 0);
        assert_eq!(sim.experiments().len(), 1);
    }

    #[tokio::test]
    async fn save_appends_exportable_record() {
        let sim = Simulation::new(config());
        sim.add_agents(2, None).unwrap();
        sim.save(1.0);
        let csv = sim.export_csv();
        assert_eq!(csv.lines().count(), 2);
    }

    #[tokio::test]
    async fn subscribers_receive_events_once_started() {
        let sim = Simulation::new(config());
        let mut rx = sim.subscribe_events();
        sim.add_agents(1, None).unwrap();
        sim.start().await;
        let event = tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.from.is_empty(), false);
    }
}
