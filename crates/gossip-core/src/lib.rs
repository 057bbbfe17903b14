// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
mod agent;
mod error;
mod events;
mod gate;
mod medium;
mod record;
mod registry;
mod simulation;
mod statistics;

pub use agent::{Agent, AgentState, AgentSummary};
pub use error::GossipError;
pub use events::{Event, EventBus, EventType};
pub use gate::Gate;
pub use medium::{Medium, Message, Response, ResponseCode};
pub use record::{ExperimentLog, ExperimentRecord, Record};
pub use registry::Registry;
pub use simulation::Simulation;
pub use statistics::StatisticsSnapshot;
