// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The population registry: a concurrent-safe `id → Agent` map. Built on
//! `dashmap::DashMap`, the concurrent-map primitive the broader corpus
//! reaches for (e.g. `stateright`'s BFS/DFS checkers) in place of a
//! `RwLock<HashMap<..>>` wrapper.

use std::sync::Arc;

use dashmap::DashMap;
use gossip_config::NodeConfig;

use crate::agent::{Agent, AgentSummary};
use crate::events::EventBus;
use crate::gate::Gate;
use crate::medium::Medium;

#[derive(Default)]
pub struct Registry {
    agents: DashMap<String, Arc<Agent>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct one new agent from `config` and add it.
    pub fn add(&self, config: NodeConfig, medium: &Medium, events: &EventBus, gate: &Gate) -> Arc<Agent> {
        let agent = Agent::spawn(config, medium.clone(), events.clone(), gate.clone());
        self.agents.insert(agent.id.clone(), Arc::clone(&agent));
        agent
    }

    /// Batch-construct `amount` agents sharing the same `config`.
    pub fn add_batch(
        &self,
        config: NodeConfig,
        amount: usize,
        medium: &Medium,
        events: &EventBus,
        gate: &Gate,
    ) -> Vec<Arc<Agent>> {
        (0..amount).map(|_| self.add(config, medium, events, gate)).collect()
    }

    pub fn delete(&self, id: &str) -> bool {
        if let Some((_, agent)) = self.agents.remove(id) {
            agent.stop();
            true
        } else {
            false
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<Agent>> {
        self.agents.get(id).map(|e| Arc::clone(e.value()))
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn list(&self) -> Vec<AgentSummary> {
        self.agents.iter().map(|e| e.value().summary()).collect()
    }

    pub fn all(&self) -> Vec<Arc<Agent>> {
        self.agents.iter().map(|e| Arc::clone(e.value())).collect()
    }

    /// Activates a single agent and relies on gossip to chain-activate the
    /// rest of the population as messages reach them.
    pub async fn activate_all(&self) {
        if let Some(first) = self.agents.iter().next() {
            first.value().activate().await;
        }
    }

    pub fn stop_all(&self) {
        for entry in self.agents.iter() {
            entry.value().stop();
        }
    }

    pub fn reset_all(&self) {
        for entry in self.agents.iter() {
            entry.value().reset();
        }
    }

    pub fn clear(&self) {
        self.stop_all();
        self.agents.clear();
    }
}
