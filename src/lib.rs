//! # scopekit
//!
//! Async SDK for implementing "scopes": plugins that answer **search** and
//! **preview** requests from a host runtime by streaming results over a
//! reply channel, with cooperative mid-flight cancellation and a rich
//! filter/selection state model.
//!
//! ## Architecture
//!
//! - **Reply protocol** ([`SearchReply`], [`PreviewReply`]): zero or more
//!   pushes while open, then exactly one terminal call (`finished` or
//!   `error`). Misuse panics; the dispatcher confines it to one request.
//! - **Cancellation bridge** ([`CancellationRegistry`],
//!   [`CancellationToken`]): process-wide table of single-fire tokens so
//!   the host can cancel an in-flight request without racing its teardown.
//! - **Filter state** ([`Filter`], [`FilterState`]): id-keyed selection
//!   lists with kind-specific update rules, round-tripping through a
//!   serialized document.
//! - **Dispatch** ([`ScopeRuntime`]): one task per request,
//!   auto-finalization, panic isolation.
//!
//! ## Example
//!
//! ```ignore
//! use scopekit::{
//!     BoxFuture, CannedQuery, CategorisedResult, CancellationToken, Result,
//!     Scope, ScopeBase, SearchMetadata, SearchReply,
//! };
//!
//! struct MyScope;
//!
//! impl Scope for MyScope {
//!     fn set_base(&self, _base: Option<ScopeBase>) {}
//!
//!     fn search(
//!         &self,
//!         query: CannedQuery,
//!         _metadata: SearchMetadata,
//!         reply: SearchReply,
//!         cancel: CancellationToken,
//!     ) -> BoxFuture<'static, Result<()>> {
//!         Box::pin(async move {
//!             let category = reply.register_category("hits", "Hits", "", "")?;
//!             for hit in fetch(query.query_string()).await? {
//!                 if cancel.is_cancelled() {
//!                     return Ok(());
//!                 }
//!                 let mut result = CategorisedResult::new(&category);
//!                 result.set_uri(&hit.uri).set_title(&hit.title);
//!                 reply.push(&result)?;
//!             }
//!             Ok(()) // the dispatcher calls finished()
//!         })
//!     }
//!     # // preview elided
//! }
//! ```

pub mod cancel;
pub mod codec;
pub mod dispatch;
pub mod error;
pub mod filters;
pub mod handle;
pub mod metadata;
pub mod query;
pub mod reply;
pub mod scope;
pub mod sink;

pub use cancel::{CancelId, CancellationRegistry, CancellationToken};
pub use codec::JsonCodec;
pub use dispatch::{RuntimeConfig, ScopeRuntime};
pub use error::{Result, ScopeError};
pub use filters::{DisplayHints, Filter, FilterKind, FilterOption, FilterState};
pub use handle::SharedHandle;
pub use metadata::{ActionMetadata, ConnectivityStatus, Location, SearchMetadata};
pub use query::{CannedQuery, CategorisedResult, Category, CategoryData, PreviewWidget};
pub use reply::{PreviewReply, ReplyState, SearchReply};
pub use scope::{BoxFuture, Scope, ScopeBase};
pub use sink::{ChannelSink, ReplyEvent, ReplySink};
