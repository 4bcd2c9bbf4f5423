use std::sync::Arc;

use crate::domain::{
    catalog::ArtistCatalog, drafts::DraftLifecycle, images::ImageHost, saves::SaveToggle,
    store::DocumentStore, sync::ArtistSnapshot,
};

pub mod catalog;
pub mod drafts;
pub mod error;
pub mod images;
pub mod saves;
pub mod store;
pub mod sync;

/// The global application state shared between all request handlers.
pub trait AppState: Clone + Send + Sync + 'static {
    type S: DocumentStore;
    type I: ImageHost;

    fn catalog(&self) -> &ArtistCatalog<Self::S, Self::I>;
    fn drafts(&self) -> &DraftLifecycle<Self::S>;
    fn saves(&self) -> &SaveToggle<Self::S>;
    /// Latest snapshot pushed by the artist subscription.
    fn artists_snapshot(&self) -> Arc<ArtistSnapshot>;
}
