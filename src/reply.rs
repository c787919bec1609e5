//! Streaming reply channels with exactly-once termination.
//!
//! A reply is the output channel for a single request. Handlers push zero
//! or more events while the reply is `Open`, then terminate it exactly once
//! with [`finished`](SearchReply::finished) or
//! [`error`](SearchReply::error). Terminating twice, or pushing after a
//! terminal call, is a protocol violation and panics: it indicates a
//! handler bug, and the dispatcher confines the panic to the offending
//! request.
//!
//! Delivery failures are different: a push that cannot reach the consumer
//! returns [`ScopeError::Delivery`] and leaves the reply `Open`; the caller
//! decides whether to retry, push more, or terminate.
//!
//! Reply handles are cheap clones backed by a [`SharedHandle`]; the
//! dispatcher keeps one alias for auto-finalization while the handler owns
//! another.

use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;

use crate::codec::JsonCodec;
use crate::error::Result;
use crate::filters::{serialize_filters, Filter, FilterState};
use crate::handle::SharedHandle;
use crate::query::{CategorisedResult, Category, CategoryData, PreviewWidget};
use crate::sink::{ReplyEvent, ReplySink};

/// Lifecycle of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyState {
    /// Accepting pushes and one terminal call.
    Open,
    /// Terminated successfully; rejects everything.
    Finished,
    /// Terminated with an error; rejects everything.
    Errored,
}

struct ReplyCore {
    state: Mutex<ReplyState>,
    sink: Box<dyn ReplySink>,
}

impl ReplyCore {
    fn new(sink: Box<dyn ReplySink>) -> Self {
        Self {
            state: Mutex::new(ReplyState::Open),
            sink,
        }
    }

    fn state(&self) -> ReplyState {
        // A handler panic between lock and unlock poisons the mutex; the
        // dispatcher still needs the state to auto-finalize.
        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Panic unless the reply is still open. Protocol violations fail fast.
    fn ensure_open(&self, op: &str) {
        let state = self.state();
        assert!(
            state == ReplyState::Open,
            "protocol violation: {} called on a {:?} reply",
            op,
            state
        );
    }

    /// Push-type send: valid only while open. A delivery failure is
    /// returned to the caller and does not change local state.
    fn push_event(&self, op: &str, event: ReplyEvent) -> Result<()> {
        self.ensure_open(op);
        self.sink.send(event)
    }

    /// Terminal send: transitions out of `Open` exactly once, then forwards
    /// the terminal event. The transition happens even if delivery fails;
    /// an abandoned consumer does not reopen the protocol.
    fn terminate(&self, op: &str, to: ReplyState, event: ReplyEvent) -> Result<()> {
        {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            assert!(
                *state == ReplyState::Open,
                "protocol violation: {} called on a {:?} reply",
                op,
                *state
            );
            *state = to;
        }
        self.sink.send(event)
    }

    /// Terminal transition for the dispatcher: no-op if the handler already
    /// terminated. Never panics.
    fn terminate_if_open(&self, to: ReplyState, event: ReplyEvent) -> Option<Result<()>> {
        {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if *state != ReplyState::Open {
                return None;
            }
            *state = to;
        }
        Some(self.sink.send(event))
    }

    fn register_category(
        &self,
        id: &str,
        title: &str,
        icon: &str,
        renderer_template: &str,
    ) -> Result<Category> {
        self.push_event(
            "register_category()",
            ReplyEvent::RegisterCategory {
                id: id.to_string(),
                title: title.to_string(),
                icon: icon.to_string(),
                renderer_template: renderer_template.to_string(),
            },
        )?;
        Ok(SharedHandle::new(CategoryData {
            id: id.to_string(),
            title: title.to_string(),
            icon: icon.to_string(),
            renderer_template: renderer_template.to_string(),
        }))
    }
}

macro_rules! reply_common {
    ($reply:ident) => {
        impl $reply {
            /// Wrap a sink in a fresh, open reply.
            ///
            /// The underlying core carries a release hook: if the last alias
            /// drops while the reply is still open, an error terminal is
            /// delivered so the consumer is not left waiting on an abandoned
            /// request.
            pub fn new(sink: Box<dyn ReplySink>) -> Self {
                Self {
                    core: SharedHandle::with_release(ReplyCore::new(sink), |core| {
                        if let Some(Err(err)) = core.terminate_if_open(
                            ReplyState::Errored,
                            ReplyEvent::Error("reply dropped before termination".to_string()),
                        ) {
                            tracing::debug!(error = %err, "drop-time terminal not delivered");
                        }
                    }),
                }
            }

            /// Current lifecycle state.
            pub fn state(&self) -> ReplyState {
                self.core.state()
            }

            /// Whether the reply still accepts pushes and a terminal call.
            pub fn is_open(&self) -> bool {
                self.core.state() == ReplyState::Open
            }

            /// Register a results category with the consumer.
            ///
            /// An empty `renderer_template` selects default rendering.
            ///
            /// # Panics
            ///
            /// Panics if the reply has already terminated.
            pub fn register_category(
                &self,
                id: &str,
                title: &str,
                icon: &str,
                renderer_template: &str,
            ) -> Result<Category> {
                self.core.register_category(id, title, icon, renderer_template)
            }

            /// Terminate successfully: no further events will follow.
            ///
            /// Called automatically by the dispatcher if the handler returns
            /// `Ok` without terminating.
            ///
            /// # Panics
            ///
            /// Panics if the reply has already terminated.
            pub fn finished(&self) -> Result<()> {
                self.core
                    .terminate("finished()", ReplyState::Finished, ReplyEvent::Finished)
            }

            /// Terminate with a human-readable failure description.
            ///
            /// Called automatically by the dispatcher if the handler returns
            /// `Err` without terminating.
            ///
            /// # Panics
            ///
            /// Panics if the reply has already terminated.
            pub fn error(&self, message: &str) -> Result<()> {
                self.core.terminate(
                    "error()",
                    ReplyState::Errored,
                    ReplyEvent::Error(message.to_string()),
                )
            }

            pub(crate) fn finish_if_open(&self) -> Option<Result<()>> {
                self.core
                    .terminate_if_open(ReplyState::Finished, ReplyEvent::Finished)
            }

            pub(crate) fn error_if_open(&self, message: &str) -> Option<Result<()>> {
                self.core
                    .terminate_if_open(ReplyState::Errored, ReplyEvent::Error(message.to_string()))
            }
        }

        impl Clone for $reply {
            fn clone(&self) -> Self {
                Self {
                    core: self.core.clone(),
                }
            }
        }
    };
}

/// Reply channel for a search request.
pub struct SearchReply {
    core: SharedHandle<ReplyCore>,
}

reply_common!(SearchReply);

impl SearchReply {
    /// Push one categorised result to the consumer.
    ///
    /// # Panics
    ///
    /// Panics if the reply has already terminated.
    pub fn push(&self, result: &CategorisedResult) -> Result<()> {
        let doc = result.serialize()?;
        self.core.push_event("push()", ReplyEvent::Result(doc))
    }

    /// Push filter definitions and their current selection state.
    ///
    /// Serialization happens fully up front; if any filter or the state
    /// fails to serialize, nothing is pushed.
    ///
    /// # Panics
    ///
    /// Panics if the reply has already terminated.
    pub fn push_filters(&self, filters: &[Filter], state: &FilterState) -> Result<()> {
        let filters = serialize_filters(filters)?;
        let filter_state = serde_json::to_value(state)?;
        self.core.push_event(
            "push_filters()",
            ReplyEvent::Filters {
                filters,
                filter_state,
            },
        )
    }
}

/// Reply channel for a preview request.
pub struct PreviewReply {
    core: SharedHandle<ReplyCore>,
}

reply_common!(PreviewReply);

impl PreviewReply {
    /// Push one or more preview widgets.
    ///
    /// All widgets are serialized before anything is sent; a serialization
    /// failure pushes nothing.
    ///
    /// # Panics
    ///
    /// Panics if the reply has already terminated.
    pub fn push_widgets(&self, widgets: &[PreviewWidget]) -> Result<()> {
        let docs = widgets
            .iter()
            .map(PreviewWidget::serialize)
            .collect::<Result<Vec<Value>>>()?;
        self.core
            .push_event("push_widgets()", ReplyEvent::Widgets(docs))
    }

    /// Push a preview attribute, augmenting the attributes available to
    /// widget mappings. Lets a widget go out early and be filled in later.
    ///
    /// # Panics
    ///
    /// Panics if the reply has already terminated.
    pub fn push_attr<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = JsonCodec::to_value(&value)?;
        self.core.push_event(
            "push_attr()",
            ReplyEvent::Attr {
                key: key.to_string(),
                value,
            },
        )
    }
}
