//! The [`Scope`] trait implemented by plugin authors, plus the
//! host-injected [`ScopeBase`] collaborator.

use std::future::Future;
use std::pin::Pin;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cancel::CancellationToken;
use crate::error::{Result, ScopeError};
use crate::metadata::{ActionMetadata, SearchMetadata};
use crate::query::{CannedQuery, CategorisedResult};
use crate::reply::{PreviewReply, SearchReply};

/// Boxed future for scope handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Interface a scope implementation must provide.
///
/// Each handler runs on its own task; the reply and cancellation token it
/// receives belong to that one request. A handler may terminate its reply
/// itself or simply return: the dispatcher turns `Ok` into `finished()` and
/// `Err` into `error()` if the reply is still open.
///
/// Long-running handlers should check `cancel.is_cancelled()` periodically,
/// or race their upstream work against `cancel.cancelled()`.
pub trait Scope: Send + Sync + 'static {
    /// Lifecycle hook: the host injects (or revokes) the scope's base
    /// collaborator before requests start flowing.
    fn set_base(&self, base: Option<ScopeBase>);

    /// Handle a search request, pushing results through `reply`.
    fn search(
        &self,
        query: CannedQuery,
        metadata: SearchMetadata,
        reply: SearchReply,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<()>>;

    /// Handle a preview request, pushing widgets and attributes through
    /// `reply`.
    fn preview(
        &self,
        result: CategorisedResult,
        metadata: ActionMetadata,
        reply: PreviewReply,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<()>>;
}

/// Directories and settings the host makes available to a scope.
#[derive(Debug, Clone, Default)]
pub struct ScopeBase {
    scope_directory: String,
    cache_directory: String,
    tmp_directory: String,
    settings: Value,
}

impl ScopeBase {
    pub fn new(
        scope_directory: &str,
        cache_directory: &str,
        tmp_directory: &str,
        settings: Value,
    ) -> Self {
        Self {
            scope_directory: scope_directory.to_string(),
            cache_directory: cache_directory.to_string(),
            tmp_directory: tmp_directory.to_string(),
            settings,
        }
    }

    /// Where the scope is installed.
    pub fn scope_directory(&self) -> &str {
        &self.scope_directory
    }

    /// Writable directory for cache files.
    pub fn cache_directory(&self) -> &str {
        &self.cache_directory
    }

    /// Writable directory for temporary files.
    pub fn tmp_directory(&self) -> &str {
        &self.tmp_directory
    }

    /// Decode the scope's settings into a typed value.
    ///
    /// Settings come from the host's configuration, so a blob that does not
    /// match the expected shape is a [`ScopeError::Configuration`].
    pub fn settings<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.settings.clone())
            .map_err(|err| ScopeError::Configuration(format!("malformed settings: {}", err)))
    }
}
