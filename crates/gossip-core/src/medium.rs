// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use tokio::sync::oneshot;

use crate::error::GossipError;

/// `{code, data}` delivered back to the sender of a [`Message`]. `data` is
/// meaningful only when `code == Updated`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResponseCode {
    Reject,
    Updated,
    /// Reserved for a future relay/forwarding response; never produced here.
    Skip,
}

#[derive(Debug, Clone, Copy)]
pub struct Response {
    pub code: ResponseCode,
    pub data: f64,
}

impl Response {
    pub fn reject() -> Self {
        Self { code: ResponseCode::Reject, data: 0.0 }
    }

    pub fn updated(data: f64) -> Self {
        Self { code: ResponseCode::Updated, data }
    }
}

/// A push from one agent to whichever peer dequeues it. Carries the
/// one-shot reply channel that preserves the sender's expectation of
/// exactly one response — requeuing (anti-repetition, self-message, gate
/// closed) must move the *same* `Message`, reply channel included, back
/// onto the Medium.
pub struct Message {
    pub data: f64,
    pub from: String,
    pub reply: oneshot::Sender<Response>,
}

/// The single shared bounded FIFO carrying every in-flight [`Message`] for
/// the whole population. There is no dispatcher: the first available
/// receiver wins. Backed by `async_channel`, which — unlike
/// `tokio::sync::mpsc` — supports many concurrent consumers racing for the
/// same item; that MPMC "any receiver wins" behaviour is what implements
/// random pair selection and must not be replaced with a per-agent inbox
/// plus a picker task.
#[derive(Clone)]
pub struct Medium {
    tx: async_channel::Sender<Message>,
    rx: async_channel::Receiver<Message>,
}

impl Medium {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = async_channel::bounded(capacity);
        Self { tx, rx }
    }

    /// Publish a message. Blocks (cooperatively) if the Medium is at
    /// capacity — backpressure, not a correctness signal.
    pub async fn publish(&self, message: Message) -> Result<(), GossipError> {
        self.tx.send(message).await.map_err(|_| GossipError::MediumClosed)
    }

    /// Dequeue the next message. Any number of agents may race this call
    /// concurrently; exactly one of them receives a given message.
    pub async fn recv(&self) -> Result<Message, GossipError> {
        self.rx.recv().await.map_err(|_| GossipError::MediumClosed)
    }

    /// Drain every currently-queued message without processing it (used by
    /// `reset`/`clear`). Messages drained this way never receive a
    /// response — their sender's corresponding `await` on the reply channel
    /// resolves to an error, which the emission loop treats like any other
    /// lost reply (see `Agent::emission_loop`).
    pub fn drain(&self) {
        while self.rx.try_recv().is_ok() {}
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
