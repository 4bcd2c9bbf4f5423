use anyhow::Context;
use axum::Router;
use axum::routing::{get, post};
use axum_prometheus::PrometheusMetricLayer;
use tokio::net;

use crate::domain::AppState;
use crate::infrastructure::http::handlers::{
    artists::{
        create_artist, delete_artist, find_artist_by_id, list_artists, save_state, toggle_save,
        update_artist,
    },
    drafts::{create_draft, delete_draft, find_draft_by_id, list_user_drafts, publish_draft, update_draft},
    health_check,
    platforms::classify_platform,
};

mod api;
mod handlers;
mod querystring;

/// Configuration for the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpServerConfig<'a> {
    pub port: &'a str,
}

/// The application's HTTP server. The underlying HTTP package is opaque to module consumers.
pub struct HttpServer {
    router: axum::Router,
    listener: net::TcpListener,
}

impl HttpServer {
    /// Returns a new HTTP server bound to the port specified in `config`.
    pub async fn new(state: impl AppState, config: HttpServerConfig<'_>) -> anyhow::Result<Self> {
        let trace_layer = tower_http::trace::TraceLayer::new_for_http().make_span_with(
            |request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                tracing::info_span!("http_request", method = ?request.method(), uri)
            },
        );
        // see: https://github.com/metrics-rs/metrics
        // see: https://github.com/Ptrskay3/axum-prometheus
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

        let router = Router::new()
            .route("/health", get(health_check))
            .nest("/api", api_routes())
            .route("/metrics", get(|| async move { metric_handle.render() }))
            .layer(trace_layer)
            .layer(prometheus_layer)
            .with_state(state);

        let listener = net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
            .await
            .with_context(|| format!("failed to listen on {}", config.port))?;

        Ok(Self { router, listener })
    }

    /// Runs the HTTP server.
    pub async fn run(self) -> anyhow::Result<()> {
        let address = self
            .listener
            .local_addr()
            .context("failed to read listener address")?;
        tracing::info!("listening on {}", address);
        axum::serve(self.listener, self.router)
            .await
            .context("received error from running server")?;
        Ok(())
    }
}

fn api_routes<S: AppState>() -> Router<S> {
    Router::new()
        .route("/artists", get(list_artists::<S>).post(create_artist::<S>))
        .route(
            "/artists/{id}",
            get(find_artist_by_id::<S>)
                .put(update_artist::<S>)
                .delete(delete_artist::<S>),
        )
        .route(
            "/artists/{id}/save",
            get(save_state::<S>).post(toggle_save::<S>),
        )
        .route("/users/{user_id}/drafts", get(list_user_drafts::<S>))
        .route("/drafts", post(create_draft::<S>))
        .route(
            "/drafts/{id}",
            get(find_draft_by_id::<S>)
                .put(update_draft::<S>)
                .delete(delete_draft::<S>),
        )
        .route("/drafts/{id}/publish", post(publish_draft::<S>))
        .route("/platforms/classify", get(classify_platform))
}
