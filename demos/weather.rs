//! Weather scope - a complete example scope.
//!
//! Demonstrates:
//! - Implementing the [`Scope`] trait for search and preview
//! - Registering categories and pushing categorised results
//! - Pushing a filter set with its selection state
//! - Racing upstream work against the cancellation token
//! - Driving the runtime the way a host would (`on_search`, `on_preview`,
//!   `fire_cancellation`) and draining the reply events
//!
//! Run with:
//!
//! ```sh
//! cargo run --example weather
//! ```

use std::time::Duration;

use scopekit::{
    ActionMetadata, BoxFuture, CancellationRegistry, CancellationToken, CannedQuery,
    CategorisedResult, ChannelSink, Filter, PreviewReply, PreviewWidget, Result, RuntimeConfig,
    Scope, ScopeBase, ScopeRuntime, SearchMetadata, SearchReply,
};

struct WeatherScope;

/// Pretend to call a weather service.
async fn fetch_forecast(city: &str) -> Vec<(String, f64)> {
    tokio::time::sleep(Duration::from_millis(50)).await;
    vec![
        (format!("{} today", city), 21.0),
        (format!("{} tomorrow", city), 18.5),
        (format!("{} day after", city), 17.0),
    ]
}

impl Scope for WeatherScope {
    fn set_base(&self, base: Option<ScopeBase>) {
        if let Some(base) = base {
            tracing::info!(dir = %base.scope_directory(), "scope base injected");
        }
    }

    fn search(
        &self,
        query: CannedQuery,
        _metadata: SearchMetadata,
        reply: SearchReply,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<()>> {
        Box::pin(async move {
            let mut units = Filter::radio_buttons("units", "Units");
            units
                .add_option("celsius", "Celsius")
                .add_option("fahrenheit", "Fahrenheit");
            reply.push_filters(std::slice::from_ref(&units), query.filter_state())?;

            let category = reply.register_category("forecast", "Forecast", "", "")?;

            // Race the upstream call against cancellation so a fired token
            // yields prompt abandonment.
            let forecast = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                forecast = fetch_forecast(query.query_string()) => forecast,
            };

            for (title, temperature) in forecast {
                if cancel.is_cancelled() {
                    return Ok(());
                }
                let mut result = CategorisedResult::new(&category);
                result
                    .set_uri(&format!("weather://{}", title.replace(' ', "-")))
                    .set_title(&title);
                result.set_attr("temperature", temperature)?;
                reply.push(&result)?;
            }
            Ok(()) // dispatcher calls finished()
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
            let mut temp = PreviewWidget::new("temp", "text");
            temp.add_attribute_mapping("text", "temperature");
            reply.push_widgets(&[header, temp])?;
            reply.push_attr("source", "demo weather service")?;
            Ok(())
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = RuntimeConfig::from_scope_config("weather.ini", None)?;
    let runtime = ScopeRuntime::new(WeatherScope, &config);
    runtime.on_set_base(Some(ScopeBase::new(
        "/opt/scopes/weather",
        "/var/cache/weather",
        "/tmp/weather",
        serde_json::json!({}),
    )));

    // Simulate the host issuing a search.
    let (sink, mut rx) = ChannelSink::channel();
    runtime
        .on_search(
            CannedQuery::new("weather", "London", ""),
            SearchMetadata::new(10, "en_GB", "desktop"),
            Box::new(sink),
            CancellationRegistry::create(),
        )
        .await
        .expect("search task failed");

    println!("search events:");
    while let Ok(event) = rx.try_recv() {
        println!("  {:?}", event);
    }

    // A second search, cancelled mid-flight.
    let (sink, mut rx) = ChannelSink::channel();
    let cancel = CancellationRegistry::create();
    let id = cancel.id();
    let join = runtime.on_search(
        CannedQuery::new("weather", "Paris", ""),
        SearchMetadata::new(10, "en_GB", "desktop"),
        Box::new(sink),
        cancel,
    );
    runtime.fire_cancellation(id);
    join.await.expect("search task failed");

    println!("cancelled search events:");
    while let Ok(event) = rx.try_recv() {
        println!("  {:?}", event);
    }

    Ok(())
}
