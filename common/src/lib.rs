pub mod database;
mod domain;
pub mod test_utils;

// Collections of the document store

pub const ARTISTS_COLLECTION: &'static str = "artists";
pub const DRAFTS_COLLECTION: &'static str = "artistDrafts";
pub const IMAGES_COLLECTION: &'static str = "images";

// Stored document field names

pub const CREATED_BY_FIELD_NAME: &'static str = "createdBy";
pub const CREATOR_NAME_FIELD_NAME: &'static str = "creatorName";
pub const SAVED_BY_FIELD_NAME: &'static str = "savedBy";
pub const ENTITY_ID_FIELD_NAME: &'static str = "entityId";

pub const CREATED_FIELD_NAME: &'static str = "createdAt";
pub const UPDATED_FIELD_NAME: &'static str = "updatedAt";

// expose domain module

pub use domain::*;
