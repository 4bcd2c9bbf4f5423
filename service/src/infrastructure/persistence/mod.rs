use serde_json::Value;
use spins_common::database::Database;
use sqlx::{Row, postgres::PgRow, types::{Json, Uuid}};

use crate::domain::store::{
    ChangeFeed, Document, DocumentData, DocumentId, DocumentPatch, DocumentStore, QueryFilter,
    StoreError, apply_patch,
};
use crate::infrastructure::persistence::query::{Condition, QueryBuilder};

mod listener;
mod query;

/// Document store on a single JSONB table, see the `migration` binary for
/// its layout.
#[derive(Clone, Debug)]
pub struct PostgresDocumentStore {
    database: &'static Database,
    table: String,
}

impl PostgresDocumentStore {
    pub fn new(database: &'static Database) -> Self {
        Self {
            table: database.documents_table(),
            database,
        }
    }
}

impl DocumentStore for PostgresDocumentStore {
    async fn create_document(&self, collection: &str, data: DocumentData) -> Result<DocumentId, StoreError> {
        let id = Uuid::new_v4();
        let sql = format!(
            "INSERT INTO {} (\"collection\", \"id\", \"data\") VALUES ($1, $2, $3)",
            self.table
        );
        tracing::debug!("{}", sql);

        sqlx::query(&sql)
            .bind(collection)
            .bind(id)
            .bind(Json(Value::Object(data)))
            .execute(self.database.database_pool())
            .await
            .map_err(StoreError::backend)?;

        Ok(DocumentId::new(id.to_string()))
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &DocumentId,
        patch: DocumentPatch,
    ) -> Result<(), StoreError> {
        let uuid = parse_id(id).ok_or_else(|| StoreError::not_found(collection, id))?;
        let mut transaction = self
            .database
            .database_pool()
            .begin()
            .await
            .map_err(StoreError::backend)?;

        let (sql, params) = QueryBuilder::from_collection(&self.table, collection)
            .where_condition(Condition::Id(uuid))
            .for_update()
            .build();
        tracing::debug!("{}", sql);

        let mut select = sqlx::query(&sql);
        for param in params {
            select = param.bind_to_query(select);
        }
        let row = select
            .fetch_optional(&mut *transaction)
            .await
            .map_err(StoreError::backend)?
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        let mut document = row_to_document(&row, collection)?;
        apply_patch(&mut document.data, &patch);

        let sql = format!(
            "UPDATE {} SET \"data\" = $3, \"updated_at\" = now() WHERE \"collection\" = $1 AND \"id\" = $2",
            self.table
        );
        sqlx::query(&sql)
            .bind(collection)
            .bind(uuid)
            .bind(Json(Value::Object(document.data)))
            .execute(&mut *transaction)
            .await
            .map_err(StoreError::backend)?;

        transaction.commit().await.map_err(StoreError::backend)
    }

    async fn delete_document(&self, collection: &str, id: &DocumentId) -> Result<(), StoreError> {
        let Some(uuid) = parse_id(id) else {
            return Ok(());
        };
        let sql = format!(
            "DELETE FROM {} WHERE \"collection\" = $1 AND \"id\" = $2",
            self.table
        );

        sqlx::query(&sql)
            .bind(collection)
            .bind(uuid)
            .execute(self.database.database_pool())
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn get_document(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        let Some(uuid) = parse_id(id) else {
            return Ok(None);
        };
        let (sql, params) = QueryBuilder::from_collection(&self.table, collection)
            .where_condition(Condition::Id(uuid))
            .build();

        let mut query_object = sqlx::query(&sql);
        for param in params {
            query_object = param.bind_to_query(query_object);
        }

        query_object
            .fetch_optional(self.database.database_pool())
            .await
            .map_err(StoreError::backend)?
            .map(|row| row_to_document(&row, collection))
            .transpose()
    }

    async fn query_documents(&self, collection: &str, filter: &QueryFilter) -> Result<Vec<Document>, StoreError> {
        use futures::TryStreamExt;

        let (sql, params) = QueryBuilder::from_collection(&self.table, collection)
            .filter(filter)
            .build();
        tracing::debug!("{}", sql);

        let mut query_object = sqlx::query(&sql);
        for param in params {
            query_object = param.bind_to_query(query_object);
        }

        let mut rows = query_object.fetch(self.database.database_pool());
        let mut documents = Vec::new();
        while let Some(row) = rows.try_next().await.map_err(StoreError::backend)? {
            documents.push(row_to_document(&row, collection)?);
        }
        Ok(documents)
    }

    async fn watch(&self, collection: &str) -> Result<ChangeFeed, StoreError> {
        listener::listen(self.database, collection).await
    }
}

/// Ids that are not UUIDs cannot exist in the table.
fn parse_id(id: &DocumentId) -> Option<Uuid> {
    Uuid::parse_str(id.as_str()).ok()
}

fn row_to_document(row: &PgRow, collection: &str) -> Result<Document, StoreError> {
    let id: Uuid = row
        .try_get("id")
        .map_err(|e| StoreError::Backend(format!("Failed to parse id: {}", e)))?;
    let id = DocumentId::new(id.to_string());

    let Json(data): Json<Value> = row
        .try_get("data")
        .map_err(|e| StoreError::Backend(format!("Failed to parse data: {}", e)))?;

    match data {
        Value::Object(data) => Ok(Document { id, data }),
        other => Err(StoreError::Malformed {
            collection: collection.to_owned(),
            id,
            reason: format!("expected an object, found {}", other),
        }),
    }
}
