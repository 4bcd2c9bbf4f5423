use std::sync::Arc;

use tokio::sync::watch;

use crate::domain::{
    AppState, catalog::ArtistCatalog, drafts::DraftLifecycle, images::ImageHost,
    saves::SaveToggle, store::DocumentStore, sync::ArtistSnapshot,
};

pub mod http;
pub mod images;
pub mod memory;
pub mod persistence;
pub mod settings;

#[derive(Clone)]
pub struct AppStateImpl<S, I> {
    catalog: ArtistCatalog<S, I>,
    drafts: DraftLifecycle<S>,
    saves: SaveToggle<S>,
    artists: watch::Receiver<Arc<ArtistSnapshot>>,
}

impl<S: DocumentStore, I: ImageHost> AppStateImpl<S, I> {
    /// `artists` is fed by the artist subscription.
    pub fn new(store: S, images: I, artists: watch::Receiver<Arc<ArtistSnapshot>>) -> Self {
        Self {
            catalog: ArtistCatalog::new(store.clone(), images),
            drafts: DraftLifecycle::new(store.clone()),
            saves: SaveToggle::new(store),
            artists,
        }
    }
}

impl<S: DocumentStore, I: ImageHost> AppState for AppStateImpl<S, I> {
    type S = S;
    type I = I;

    fn catalog(&self) -> &ArtistCatalog<S, I> {
        &self.catalog
    }

    fn drafts(&self) -> &DraftLifecycle<S> {
        &self.drafts
    }

    fn saves(&self) -> &SaveToggle<S> {
        &self.saves
    }

    fn artists_snapshot(&self) -> Arc<ArtistSnapshot> {
        self.artists.borrow().clone()
    }
}
