pub mod migration;
pub mod persistence;

/// Name of the single table every collection is stored in.
pub const DOCUMENTS_TABLE_NAME: &'static str = "documents";

/// Name of the trigger function that publishes row changes.
pub const NOTIFY_FUNCTION_NAME: &'static str = "notify_document_change";
