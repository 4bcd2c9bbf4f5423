use spins_common::database::DOCUMENT_CHANGES_CHANNEL;

use crate::domain::{DOCUMENTS_TABLE_NAME, NOTIFY_FUNCTION_NAME, persistence::Persistence};

pub trait MigrationStep {
    fn ctx(&self) -> &'static str;
    fn ddls(self) -> Vec<String>;
}

/// A group of statements applied in one transaction.
pub struct DdlStep {
    ctx: &'static str,
    ddls: Vec<String>,
}

impl MigrationStep for DdlStep {
    fn ctx(&self) -> &'static str {
        self.ctx
    }

    fn ddls(self) -> Vec<String> {
        self.ddls
    }
}

pub struct Migration<P: Persistence> {
    persistence: P,
}

impl<P: Persistence> Migration<P> {
    pub fn new(persistence: P) -> Self {
        Self { persistence }
    }

    /// Every step is idempotent, so the whole set is applied on each run.
    pub async fn migrate(&self) -> Result<(), anyhow::Error> {
        let schema = self.persistence.database_schema();
        let existing = self.persistence.load().await?;
        if existing.contains(DOCUMENTS_TABLE_NAME) {
            tracing::info!(%schema, "documents table exists, refreshing change notifications");
        } else {
            tracing::info!(%schema, "creating documents table");
        }

        self.persistence
            .apply_migration_steps(migration_steps(schema))
            .await
    }
}

pub fn migration_steps(schema: &str) -> Vec<DdlStep> {
    vec![
        DdlStep {
            ctx: "CREATE SCHEMA",
            ddls: vec![format!("CREATE SCHEMA IF NOT EXISTS \"{schema}\"")],
        },
        DdlStep {
            ctx: "CREATE TABLE",
            ddls: documents_table_ddls(schema),
        },
        DdlStep {
            ctx: "CREATE TRIGGER",
            ddls: change_notification_ddls(schema),
        },
    ]
}

fn documents_table_ddls(schema: &str) -> Vec<String> {
    let table = format!("\"{schema}\".\"{DOCUMENTS_TABLE_NAME}\"");
    vec![
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
            \"seq\" BIGINT GENERATED ALWAYS AS IDENTITY, \
            \"collection\" TEXT NOT NULL, \
            \"id\" UUID NOT NULL, \
            \"data\" JSONB NOT NULL DEFAULT '{{}}'::jsonb, \
            \"created_at\" TIMESTAMPTZ NOT NULL DEFAULT now(), \
            \"updated_at\" TIMESTAMPTZ NOT NULL DEFAULT now(), \
            PRIMARY KEY (\"collection\", \"id\"))"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS \"{DOCUMENTS_TABLE_NAME}_data_idx\" ON {table} USING GIN (\"data\")"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS \"{DOCUMENTS_TABLE_NAME}_collection_seq_idx\" ON {table} (\"collection\", \"seq\")"
        ),
    ]
}

fn change_notification_ddls(schema: &str) -> Vec<String> {
    let table = format!("\"{schema}\".\"{DOCUMENTS_TABLE_NAME}\"");
    let function = format!("\"{schema}\".\"{NOTIFY_FUNCTION_NAME}\"");
    let trigger = format!("\"{DOCUMENTS_TABLE_NAME}_changes\"");
    vec![
        format!(
            "CREATE OR REPLACE FUNCTION {function}() RETURNS trigger AS $$
DECLARE
    changed RECORD;
BEGIN
    IF TG_OP = 'DELETE' THEN
        changed := OLD;
    ELSE
        changed := NEW;
    END IF;
    PERFORM pg_notify(
        '{DOCUMENT_CHANGES_CHANNEL}',
        json_build_object('collection', changed.collection, 'id', changed.id, 'op', TG_OP)::text
    );
    RETURN NULL;
END;
$$ LANGUAGE plpgsql"
        ),
        format!("DROP TRIGGER IF EXISTS {trigger} ON {table}"),
        format!(
            "CREATE TRIGGER {trigger} AFTER INSERT OR UPDATE OR DELETE ON {table} \
            FOR EACH ROW EXECUTE FUNCTION {function}()"
        ),
    ]
}
