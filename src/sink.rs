//! Reply delivery boundary.
//!
//! A [`ReplySink`] is the host-runtime side of a reply: every category
//! registration, result push, filter push, widget push, attribute push and
//! terminal call becomes one [`ReplyEvent`] handed to the sink. The sink
//! reports delivery failures as [`ScopeError::Delivery`]; it never sees a
//! half-serialized event, because replies serialize fully before sending.
//!
//! [`ChannelSink`] is the provided implementation: a channel into the
//! consumer's task, so N handlers can push concurrently to their own sinks
//! without any shared lock, and per-reply call order is preserved.

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{Result, ScopeError};

/// One boundary call issued by a reply toward the host runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyEvent {
    /// A new results category, usable by subsequent result pushes.
    /// An empty `renderer_template` means "use default rendering".
    RegisterCategory {
        id: String,
        title: String,
        icon: String,
        renderer_template: String,
    },
    /// One categorised search result.
    Result(Value),
    /// Filter definitions plus current selection state, pushed atomically.
    Filters {
        filters: Value,
        filter_state: Value,
    },
    /// One or more preview widgets.
    Widgets(Vec<Value>),
    /// A preview attribute augmenting the result under preview.
    Attr { key: String, value: Value },
    /// Terminal: no further events follow.
    Finished,
    /// Terminal: the request failed with a human-readable description.
    Error(String),
}

impl ReplyEvent {
    /// Whether this event terminates the reply stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReplyEvent::Finished | ReplyEvent::Error(_))
    }
}

/// Consumer side of a reply stream.
///
/// Implementations must preserve the order of `send` calls made by a single
/// handler. A failed send is a delivery error only; it must not affect
/// events already accepted.
pub trait ReplySink: Send + Sync {
    /// Deliver one event to the consumer.
    fn send(&self, event: ReplyEvent) -> Result<()>;
}

/// Channel-backed sink delivering events to an in-process consumer task.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ReplyEvent>,
}

impl ChannelSink {
    /// Create a sink plus the receiver the consumer drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ReplyEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ReplySink for ChannelSink {
    fn send(&self, event: ReplyEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|_| ScopeError::Delivery("reply consumer disconnected".into()))
    }
}
