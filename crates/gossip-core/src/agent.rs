// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The gossip agent: state machine, receive task and emission task. An
//! `Agent` is always held behind `Arc<Agent>` once spawned — its public
//! operations take `self: &Arc<Self>` so they can hand a clone to the
//! tasks they launch, mirroring a handle/node split (`P2pHandle` holds
//! `Arc`s into the running `P2pNode`'s shared state).

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::events::{Event, EventBus};
use crate::gate::Gate;
use crate::medium::{Medium, Message, Response, ResponseCode};
use crate::record::Record;
use gossip_config::NodeConfig;

/// `IDLE → ACTIVE → EXPIRED → IDLE` (reset). No other transition is
/// reachable through the public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum AgentState {
    Idle = 0,
    Active = 1,
    Expired = 2,
}

impl AgentState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => AgentState::Idle,
            1 => AgentState::Active,
            _ => AgentState::Expired,
        }
    }
}

/// Snapshot returned by `list-agents`: `{id, state, hp, data}`. `state`
/// serialises as the same `0/1/2` integer the wire event payload uses.
#[derive(Debug, Clone, Serialize)]
pub struct AgentSummary {
    pub id: String,
    #[serde(serialize_with = "serialize_state")]
    pub state: AgentState,
    pub hp: f64,
    pub data: String,
}

fn serialize_state<S: serde::Serializer>(state: &AgentState, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u8(*state as u8)
}

/// `value` and `records` are merged/appended together under one lock
/// since the anti-repetition read and the merge write always need a
/// consistent view of both.
struct AgentInner {
    value: f64,
    records: Vec<Record>,
}

fn draw_value(config: &NodeConfig) -> f64 {
    if config.min == config.max {
        return config.min;
    }
    rand::thread_rng().gen_range(config.min..=config.max)
}

pub struct Agent {
    pub id: String,
    config: NodeConfig,
    state: AtomicU8,
    hp: AtomicU64,
    inner: Mutex<AgentInner>,
    cancel: Mutex<CancellationToken>,
    medium: Medium,
    events: EventBus,
    gate: Gate,
}

impl Agent {
    /// Construct a new agent in `IDLE` with an empty record sequence and
    /// immediately spawn its receive task.
    pub fn spawn(config: NodeConfig, medium: Medium, events: EventBus, gate: Gate) -> Arc<Self> {
        let cancel = CancellationToken::new();
        let agent = Arc::new(Self {
            id: uuid::Uuid::new_v4().to_string(),
            config,
            state: AtomicU8::new(AgentState::Idle as u8),
            hp: AtomicU64::new(0u64),
            inner: Mutex::new(AgentInner {
                value: draw_value(&config),
                records: Vec::new(),
            }),
            cancel: Mutex::new(cancel.clone()),
            medium,
            events,
            gate,
        });
        tokio::spawn(receive_loop(Arc::clone(&agent), cancel));
        agent
    }

    pub fn state(&self) -> AgentState {
        AgentState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: AgentState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn hp(&self) -> f64 {
        f64::from_bits(self.hp.load(Ordering::Acquire))
    }

    fn set_hp(&self, hp: f64) {
        self.hp.store(hp.to_bits(), Ordering::Release);
    }

    pub fn value(&self) -> f64 {
        self.inner.lock().unwrap().value
    }

    fn set_value(&self, value: f64) {
        self.inner.lock().unwrap().value = value;
    }

    pub fn records(&self) -> Vec<Record> {
        self.inner.lock().unwrap().records.clone()
    }

    fn records_len(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    pub fn config(&self) -> NodeConfig {
        self.config
    }

    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            id: self.id.clone(),
            state: self.state(),
            hp: self.hp(),
            data: format!("{:.2}", self.value()),
        }
    }

    fn current_cancel(&self) -> CancellationToken {
        self.cancel.lock().unwrap().clone()
    }

    /// Idempotent. A no-op unless `state == IDLE`: already-`ACTIVE` is the
    /// ordinary idempotent case, and `EXPIRED` must not be resurrected
    /// except through `reset()` (the transition graph has no
    /// `EXPIRED -> ACTIVE` edge). Otherwise arms `hp`, flips the state,
    /// emits `CHANGE_STATE`, and spawns the emission task.
    pub async fn activate(self: &Arc<Self>) {
        if self.state() != AgentState::Idle {
            return;
        }
        self.set_hp(1.0);
        self.set_state(AgentState::Active);
        self.events
            .publish(Event::change_state(self.id.clone(), AgentState::Active as u8))
            .await;

        let agent = Arc::clone(self);
        let cancel = self.current_cancel();
        tokio::spawn(async move { emission_loop(agent, cancel).await });
    }

    /// Cancels the cancellation handle, re-draws `value`, clears
    /// `records`, arms a fresh handle, and re-spawns the receive task.
    /// Does not itself emit an event — only `activate()` and the emission
    /// task's EXPIRED transition do.
    pub fn reset(self: &Arc<Self>) {
        self.cancel.lock().unwrap().cancel();
        {
            let mut inner = self.inner.lock().unwrap();
            inner.records.clear();
            inner.value = draw_value(&self.config);
        }
        self.set_state(AgentState::Idle);
        self.set_hp(0.0);

        let fresh = CancellationToken::new();
        *self.cancel.lock().unwrap() = fresh.clone();

        let agent = Arc::clone(self);
        tokio::spawn(receive_loop(agent, fresh));
    }

    /// Cancels the cancellation handle (stopping both the receive and
    /// emission tasks) and sets state to `IDLE`. Unlike `reset`, leaves
    /// `value`/`records` untouched and does not respawn anything — the
    /// agent stays inert until `reset()` re-arms it.
    pub fn stop(&self) {
        self.cancel.lock().unwrap().cancel();
        self.set_state(AgentState::Idle);
    }

    async fn handle_message(self: &Arc<Self>, message: Message) {
        if !self.gate.is_open() {
            // Drop silently: the message and its reply channel are both
            // discarded; the sender's await on the reply resolves to an
            // error, handled like any lost reply.
            return;
        }

        // Anti-repetition filter: never let the same sender land two
        // consecutive records.
        {
            let inner = self.inner.lock().unwrap();
            let k = inner.records.len();
            let last_is_sender = k >= 1 && inner.records[k - 1].sender == message.from;
            let second_last_is_sender = k >= 2 && inner.records[k - 2].sender == message.from;
            if last_is_sender || second_last_is_sender {
                drop(inner);
                let _ = self.medium.publish(message).await;
                return;
            }
        }

        if self.state() == AgentState::Expired {
            let _ = message.reply.send(Response::reject());
            return;
        }

        if self.state() == AgentState::Idle {
            self.activate().await;
        }

        // Self-message: no agent may average with itself.
        if message.from == self.id {
            let _ = self.medium.publish(message).await;
            return;
        }

        let merge_result = {
            let mut inner = self.inner.lock().unwrap();
            if message.data != inner.value {
                inner.value = (inner.value + message.data) / 2.0;
                let merged = inner.value;
                inner
                    .records
                    .push(Record::new(message.from.clone(), self.id.clone(), merged));
                Some(merged)
            } else {
                None
            }
        };

        let response = match merge_result {
            Some(merged) => {
                self.events.publish(Event::update_value(self.id.clone(), merged)).await;
                Response::updated(merged)
            }
            None => Response::reject(),
        };

        let _ = message.reply.send(response);
    }
}

async fn receive_loop(agent: Arc<Agent>, cancel: CancellationToken) {
    use futures::FutureExt;
    use std::panic::AssertUnwindSafe;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            received = agent.medium.recv() => {
                match received {
                    Ok(message) => {
                        // A single malformed message must not take the agent off
                        // the Medium: catch a panic at this task boundary, log
                        // it, and keep servicing the next message.
                        let agent_id = agent.id.clone();
                        if AssertUnwindSafe(agent.handle_message(message))
                            .catch_unwind()
                            .await
                            .is_err()
                        {
                            tracing::error!(agent = %agent_id, "receive task panicked handling a message, continuing");
                        }
                    }
                    Err(_) => return,
                }
            }
        }
    }
}

/// Bound on how long the emission task waits for a reply to the message it
/// just published. Without this, a population where the only receiver able
/// to dequeue a message is the message's own sender — guaranteed for a
/// single-agent population, since self-messages are requeued rather than
/// answered (§4.1 step 5) — would leave `reply_rx.await` unresolved
/// forever: the agent could never re-check `hp`/`records_len()` and so
/// could never reach `EXPIRED`. A timed-out reply is treated exactly like
/// the existing dropped-channel case below: a lost exchange that decays
/// `hp` like a rejection.
const REPLY_TIMEOUT: Duration = Duration::from_millis(50);

async fn emission_loop(agent: Arc<Agent>, cancel: CancellationToken) {
    loop {
        if cancel.is_cancelled() {
            return;
        }

        let draw: f64 = rand::thread_rng().gen_range(0.0..1.0);
        if draw > agent.hp() || agent.records_len() >= agent.config.max_round as usize {
            agent.set_state(AgentState::Expired);
            agent
                .events
                .publish(Event::change_state(agent.id.clone(), AgentState::Expired as u8))
                .await;
            return;
        }

        let value = agent.value();
        let (reply_tx, reply_rx) = oneshot::channel();
        let message = Message {
            data: value,
            from: agent.id.clone(),
            reply: reply_tx,
        };

        tokio::select! {
            _ = cancel.cancelled() => return,
            published = agent.medium.publish(message) => {
                if published.is_err() {
                    return;
                }
            }
        }

        match tokio::time::timeout(REPLY_TIMEOUT, reply_rx).await {
            Ok(Ok(response)) => match response.code {
                ResponseCode::Updated => {
                    agent.set_value(response.data);
                    agent
                        .events
                        .publish(Event::update_value(agent.id.clone(), response.data))
                        .await;
                }
                ResponseCode::Reject => {
                    agent.set_hp(agent.hp() * agent.config.decay);
                }
                ResponseCode::Skip => {}
            },
            // The reply channel was dropped — the message was drained by a
            // concurrent reset/clear before anyone merged it. Treat like a
            // rejection so `hp` keeps decaying instead of stalling forever.
            Ok(Err(_)) => {
                agent.set_hp(agent.hp() * agent.config.decay);
            }
            // No reply within the bound — the message may still be bouncing
            // around the Medium (e.g. requeued as a self-message with no
            // other receiver to answer it). Same treatment: decay and keep
            // re-checking termination conditions next round.
            Err(_) => {
                agent.set_hp(agent.hp() * agent.config.decay);
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(Duration::from_millis(agent.config.delay_ms)) => {}
        }
    }
}
