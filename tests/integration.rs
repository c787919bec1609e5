//! Integration tests for scopekit.
//!
//! These tests exercise the full request lifecycle: dispatch, reply
//! streaming, filter state, cancellation and auto-finalization working
//! together.

use scopekit::{
    BoxFuture, CancellationRegistry, CancellationToken, CannedQuery, CategorisedResult,
    ChannelSink, Filter, FilterState, PreviewReply, PreviewWidget, ReplyEvent, Result,
    RuntimeConfig, Scope, ScopeBase, ScopeError, ScopeRuntime, SearchMetadata, SearchReply,
};

use scopekit::ActionMetadata;

/// A scope that pushes a filter set, then one result per fake hit, and
/// lets the dispatcher finalize.
struct MusicScope;

impl Scope for MusicScope {
    fn set_base(&self, _base: Option<ScopeBase>) {}

    fn search(
        &self,
        query: CannedQuery,
        metadata: SearchMetadata,
        reply: SearchReply,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<()>> {
        Box::pin(async move {
            let mut genre = Filter::radio_buttons("genre", "Genre");
            genre.add_option("jazz", "Jazz").add_option("rock", "Rock");
            reply.push_filters(std::slice::from_ref(&genre), query.filter_state())?;

            let category = reply.register_category("albums", "Albums", "", "")?;
            let limit = if metadata.cardinality() == 0 {
                3
            } else {
                metadata.cardinality().min(3)
            };
            for i in 0..limit {
                if cancel.is_cancelled() {
                    return Ok(());
                }
                let mut result = CategorisedResult::new(&category);
                result
                    .set_uri(&format!("album://{}/{}", query.query_string(), i))
                    .set_title(&format!("Album {}", i));
                result.set_attr("index", i)?;
                reply.push(&result)?;
            }
            Ok(())
        })
    }

    fn preview(
        &self,
        result: CategorisedResult,
        _metadata: ActionMetadata,
        reply: PreviewReply,
        _cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<()>> {
        Box::pin(async move {
            let mut header = PreviewWidget::new("hdr", "header");
            header.add_attribute_mapping("title", "title");
            let mut art = PreviewWidget::new("art", "image");
            art.add_attribute_mapping("source", "art");
            reply.push_widgets(&[header, art])?;
            reply.push_attr("uri", result.uri())?;
            reply.finished()?;
            Ok(())
        })
    }
}

/// A scope whose search blocks until cancelled, racing upstream work
/// against the token.
struct SlowScope;

impl Scope for SlowScope {
    fn set_base(&self, _base: Option<ScopeBase>) {}

    fn search(
        &self,
        _query: CannedQuery,
        _metadata: SearchMetadata,
        reply: SearchReply,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<()>> {
        Box::pin(async move {
            let category = reply.register_category("slow", "Slow", "", "")?;
            tokio::select! {
                _ = cancel.cancelled() => Ok(()),
                _ = tokio::time::sleep(std::time::Duration::from_secs(30)) => {
                    let mut result = CategorisedResult::new(&category);
                    result.set_title("never delivered");
                    reply.push(&result)?;
                    Ok(())
                }
            }
        })
    }

    fn preview(
        &self,
        _result: CategorisedResult,
        _metadata: ActionMetadata,
        _reply: PreviewReply,
        _cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

fn music_runtime() -> ScopeRuntime<MusicScope> {
    let config = RuntimeConfig::from_scope_config("/opt/scopes/music.ini", None).unwrap();
    ScopeRuntime::new(MusicScope, &config)
}

fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<ReplyEvent>) -> Vec<ReplyEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_full_search_flow() {
    let runtime = music_runtime();
    let (sink, mut rx) = ChannelSink::channel();

    let mut query = CannedQuery::new("music", "miles", "");
    let mut state = FilterState::new();
    state.set_selection("genre", vec!["jazz".into()]);
    query.set_filter_state(state);

    runtime
        .on_search(
            query,
            SearchMetadata::new(10, "en_US", "phone"),
            Box::new(sink),
            CancellationRegistry::create(),
        )
        .await
        .unwrap();

    let events = drain(&mut rx);

    // Filters first, with the query's selection state forwarded intact.
    match &events[0] {
        ReplyEvent::Filters {
            filters,
            filter_state,
        } => {
            assert_eq!(filters[0]["filter_type"], "radio_buttons");
            assert_eq!(filter_state["genre"][0], "jazz");
        }
        other => panic!("expected filters, got {:?}", other),
    }
    assert!(matches!(events[1], ReplyEvent::RegisterCategory { .. }));

    let results: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ReplyEvent::Result(doc) => Some(doc),
            _ => None,
        })
        .collect();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["cat_id"], "albums");
    assert_eq!(results[2]["index"], 2);

    // Terminal strictly follows all pushes, exactly once.
    assert_eq!(events.last(), Some(&ReplyEvent::Finished));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
}

#[tokio::test]
async fn test_full_preview_flow() {
    let runtime = music_runtime();
    let (search_sink, _search_rx) = ChannelSink::channel();
    let search_reply = SearchReply::new(Box::new(search_sink));
    let category = search_reply
        .register_category("albums", "Albums", "", "")
        .unwrap();
    let mut result = CategorisedResult::new(&category);
    result.set_uri("album://kind-of-blue").set_title("Kind of Blue");

    let (sink, mut rx) = ChannelSink::channel();
    runtime
        .on_preview(
            result,
            ActionMetadata::new("en_US", "phone"),
            Box::new(sink),
            CancellationRegistry::create(),
        )
        .await
        .unwrap();

    let events = drain(&mut rx);
    match &events[0] {
        ReplyEvent::Widgets(widgets) => {
            assert_eq!(widgets.len(), 2);
            assert_eq!(widgets[0]["components"]["title"], "title");
        }
        other => panic!("expected widgets, got {:?}", other),
    }
    assert_eq!(
        events[1],
        ReplyEvent::Attr {
            key: "uri".into(),
            value: serde_json::json!("album://kind-of-blue"),
        }
    );
    // The handler finished explicitly; the dispatcher must not finalize
    // again.
    assert_eq!(events[2], ReplyEvent::Finished);
    assert_eq!(events.len(), 3);
}

#[tokio::test]
async fn test_concurrent_requests_each_terminate_once() {
    let runtime = std::sync::Arc::new(music_runtime());
    let mut joins = Vec::new();

    for i in 0..32 {
        let runtime = runtime.clone();
        joins.push(tokio::spawn(async move {
            let (sink, mut rx) = ChannelSink::channel();
            runtime
                .on_search(
                    CannedQuery::new("music", &format!("query-{}", i), ""),
                    SearchMetadata::new(2, "en_US", "phone"),
                    Box::new(sink),
                    CancellationRegistry::create(),
                )
                .await
                .unwrap();
            drain(&mut rx)
        }));
    }

    for join in joins {
        let events = join.await.unwrap();
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert_eq!(events.last(), Some(&ReplyEvent::Finished));
    }
}

#[tokio::test]
async fn test_cancellation_aborts_slow_search_promptly() {
    let config = RuntimeConfig::from_scope_config("slow.ini", None).unwrap();
    let runtime = ScopeRuntime::new(SlowScope, &config);
    let (sink, mut rx) = ChannelSink::channel();
    let cancel = CancellationRegistry::create();
    let id = cancel.id();

    let join = runtime.on_search(
        CannedQuery::new("slow", "anything", ""),
        SearchMetadata::new(0, "en_US", "phone"),
        Box::new(sink),
        cancel,
    );

    tokio::task::yield_now().await;
    runtime.fire_cancellation(id);

    // Bounded wait: the handler races its sleep against the token and must
    // abandon promptly, long before the 30s upstream work.
    tokio::time::timeout(std::time::Duration::from_secs(5), join)
        .await
        .expect("cancelled search did not complete promptly")
        .unwrap();

    let events = drain(&mut rx);
    assert!(matches!(events[0], ReplyEvent::RegisterCategory { .. }));
    assert_eq!(events[1], ReplyEvent::Finished);
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn test_disconnected_consumer_yields_delivery_errors() {
    let (sink, rx) = ChannelSink::channel();
    let reply = SearchReply::new(Box::new(sink));
    let category = reply.register_category("cat", "Cat", "", "").unwrap();
    drop(rx);

    let mut result = CategorisedResult::new(&category);
    result.set_title("orphan");
    let err = reply.push(&result).unwrap_err();
    assert!(matches!(err, ScopeError::Delivery(_)));

    // The reply is still open; the caller chooses how to wind down.
    assert!(reply.is_open());
    assert!(reply.error("giving up").is_err());
}

#[tokio::test]
async fn test_filter_state_round_trips_through_reply() {
    let mut genre = Filter::radio_buttons("genre", "Genre");
    genre.add_option("jazz", "Jazz").add_option("rock", "Rock");
    let mut mood = Filter::option_selector("mood", "Mood", true);
    mood.add_option("calm", "Calm").add_option("dark", "Dark");

    let mut state = FilterState::new();
    genre.update_state(&mut state, "jazz", true);
    mood.update_state(&mut state, "dark", true);
    mood.update_state(&mut state, "calm", true);

    let (sink, mut rx) = ChannelSink::channel();
    let reply = SearchReply::new(Box::new(sink));
    reply
        .push_filters(&[genre.clone(), mood.clone()], &state)
        .unwrap();

    let ReplyEvent::Filters { filter_state, .. } = rx.try_recv().unwrap() else {
        panic!("expected filters event");
    };
    let restored: FilterState = serde_json::from_value(filter_state).unwrap();
    assert_eq!(restored, state);
    assert_eq!(genre.active_options(&restored), vec!["jazz"]);
    assert_eq!(mood.active_options(&restored), vec!["dark", "calm"]);
}
