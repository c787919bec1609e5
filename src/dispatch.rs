//! Request dispatch: the runtime-facing entry points that construct a
//! request, run the handler on its own task, and guarantee exactly one
//! terminal reply state per request.
//!
//! The dispatcher's contracts:
//! - the handler observes a fully-constructed request (query/result view,
//!   metadata, open reply, registered cancellation token);
//! - a handler that returns without terminating is auto-finalized:
//!   `Ok` becomes `finished()`, `Err` becomes `error()` with the failure's
//!   description;
//! - a handler panic is confined to its own task and becomes `error()` on
//!   the reply; other in-flight requests and the process are unaffected;
//! - the cancellation token is released from the registry only after the
//!   handler task has fully completed and the reply is terminal.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::{JoinError, JoinHandle};

use crate::cancel::{CancelId, CancellationRegistry, CancellationToken};
use crate::error::{Result, ScopeError};
use crate::metadata::{ActionMetadata, SearchMetadata};
use crate::query::{CannedQuery, CategorisedResult};
use crate::reply::{PreviewReply, SearchReply};
use crate::scope::{Scope, ScopeBase};
use crate::sink::ReplySink;

/// Startup configuration for a scope runtime.
///
/// Validated before any request processing begins; violations are
/// [`ScopeError::Configuration`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Scope id, derived from the scope configuration file name.
    pub scope_id: String,
    /// Path to the scope's `.ini` configuration file.
    pub scope_config: PathBuf,
    /// Optional path to the host runtime configuration file.
    pub runtime_config: Option<PathBuf>,
}

impl RuntimeConfig {
    /// Build a configuration from the scope config path, deriving the
    /// scope id from the file stem.
    pub fn from_scope_config(
        scope_config: impl AsRef<Path>,
        runtime_config: Option<PathBuf>,
    ) -> Result<Self> {
        let scope_config = scope_config.as_ref();
        if scope_config.as_os_str().is_empty() {
            return Err(ScopeError::Configuration(
                "scope configuration file not set".into(),
            ));
        }
        if scope_config.extension().and_then(|e| e.to_str()) != Some("ini") {
            return Err(ScopeError::Configuration(format!(
                "scope configuration file {:?} does not end in '.ini'",
                scope_config
            )));
        }
        let scope_id = scope_config
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ScopeError::Configuration(format!(
                    "cannot derive scope id from {:?}",
                    scope_config
                ))
            })?
            .to_string();

        Ok(Self {
            scope_id,
            scope_config: scope_config.to_path_buf(),
            runtime_config,
        })
    }
}

/// Dispatches inbound search/preview calls from the host runtime to a
/// [`Scope`] implementation.
pub struct ScopeRuntime<S: Scope> {
    scope: Arc<S>,
    scope_id: String,
}

impl<S: Scope> ScopeRuntime<S> {
    /// Wrap a scope with a validated configuration.
    pub fn new(scope: S, config: &RuntimeConfig) -> Self {
        tracing::info!(scope = %config.scope_id, config = ?config.scope_config, "scope runtime ready");
        Self {
            scope: Arc::new(scope),
            scope_id: config.scope_id.clone(),
        }
    }

    /// Inbound search call. Runs the handler on its own task and returns a
    /// handle the caller may await for completion.
    pub fn on_search(
        &self,
        query: CannedQuery,
        metadata: SearchMetadata,
        sink: Box<dyn ReplySink>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let reply = SearchReply::new(sink);
        let handler_reply = reply.clone();
        let scope = self.scope.clone();
        let scope_id = self.scope_id.clone();

        tokio::spawn(async move {
            tracing::debug!(scope = %scope_id, query = %query.query_string(), "search started");
            let handler = tokio::spawn(scope.search(query, metadata, handler_reply, cancel.clone()));
            let failure = failure_of(handler.await);
            match failure {
                None => {
                    if let Some(Err(e)) = reply.finish_if_open() {
                        tracing::warn!(scope = %scope_id, error = %e, "finished() not delivered");
                    }
                }
                Some(msg) => {
                    tracing::warn!(scope = %scope_id, error = %msg, "search failed");
                    if let Some(Err(e)) = reply.error_if_open(&msg) {
                        tracing::warn!(scope = %scope_id, error = %e, "error() not delivered");
                    }
                }
            }
            CancellationRegistry::release(cancel.id());
        })
    }

    /// Inbound preview call; same lifecycle as [`on_search`](Self::on_search).
    pub fn on_preview(
        &self,
        result: CategorisedResult,
        metadata: ActionMetadata,
        sink: Box<dyn ReplySink>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let reply = PreviewReply::new(sink);
        let handler_reply = reply.clone();
        let scope = self.scope.clone();
        let scope_id = self.scope_id.clone();

        tokio::spawn(async move {
            tracing::debug!(scope = %scope_id, uri = %result.uri(), "preview started");
            let handler =
                tokio::spawn(scope.preview(result, metadata, handler_reply, cancel.clone()));
            let failure = failure_of(handler.await);
            match failure {
                None => {
                    if let Some(Err(e)) = reply.finish_if_open() {
                        tracing::warn!(scope = %scope_id, error = %e, "finished() not delivered");
                    }
                }
                Some(msg) => {
                    tracing::warn!(scope = %scope_id, error = %msg, "preview failed");
                    if let Some(Err(e)) = reply.error_if_open(&msg) {
                        tracing::warn!(scope = %scope_id, error = %e, "error() not delivered");
                    }
                }
            }
            CancellationRegistry::release(cancel.id());
        })
    }

    /// Lifecycle hook: inject or revoke the scope base collaborator.
    pub fn on_set_base(&self, base: Option<ScopeBase>) {
        self.scope.set_base(base);
    }

    /// Fire the cancellation token for an in-flight request. Firing an
    /// already-released identity is a benign no-op.
    pub fn fire_cancellation(&self, id: CancelId) {
        tracing::debug!(scope = %self.scope_id, ?id, "cancellation fired");
        CancellationRegistry::fire(id);
    }

    /// Release a cancellation identity. Idempotent; normally the dispatcher
    /// does this itself once the request completes.
    pub fn release_cancellation(&self, id: CancelId) {
        CancellationRegistry::release(id);
    }
}

/// Collapse a handler task outcome into `None` (success) or a failure
/// description the reply's `error()` should carry.
fn failure_of(outcome: std::result::Result<Result<()>, JoinError>) -> Option<String> {
    match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(join_err) => Some(panic_description(join_err)),
    }
}

fn panic_description(err: JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        if let Some(msg) = payload.downcast_ref::<&str>() {
            format!("handler panicked: {}", msg)
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            format!("handler panicked: {}", msg)
        } else {
            "handler panicked".to_string()
        }
    } else {
        "handler task was cancelled".to_string()
    }
}
