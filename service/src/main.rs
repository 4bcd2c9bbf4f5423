use std::sync::Arc;

use anyhow::Context;
use spins_common::database;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::domain::store::DocumentStore;
use crate::domain::sync::{ArtistSnapshot, ArtistSync};
use crate::infrastructure::AppStateImpl;
use crate::infrastructure::http::{HttpServer, HttpServerConfig};
use crate::infrastructure::images::ImgBbImageHost;
use crate::infrastructure::memory::InMemoryDocumentStore;
use crate::infrastructure::persistence::PostgresDocumentStore;
use crate::infrastructure::settings::{Settings, StoreKind};

mod domain;
mod infrastructure;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match settings.store {
        StoreKind::Memory => {
            tracing::info!("using the in-memory document store");
            run(&settings, InMemoryDocumentStore::new()).await
        }
        StoreKind::Postgres => {
            let database_settings = settings
                .database
                .as_ref()
                .context("postgres store selected but no database settings given")?;
            let database = database::connect(database_settings).await?;
            run(&settings, PostgresDocumentStore::new(database)).await
        }
    }
}

async fn run<S: DocumentStore>(settings: &Settings, store: S) -> anyhow::Result<()> {
    let images = ImgBbImageHost::new(&settings.images, store.clone())
        .context("failed to set up the image host")?;

    // the HTTP listing serves the latest pushed snapshot
    let (snapshots, artists) = watch::channel(Arc::new(ArtistSnapshot::default()));
    let subscription = ArtistSync::new(store.clone())
        .subscribe(move |snapshot| {
            snapshots.send_replace(Arc::new(snapshot));
        })
        .await;
    if !subscription.is_active() {
        tracing::warn!("artist listing will not receive live updates");
    }

    let state = AppStateImpl::new(store, images, artists);

    let server_config = HttpServerConfig {
        port: &settings.server_port,
    };
    let http_server = HttpServer::new(state, server_config).await?;
    http_server.run().await
}
