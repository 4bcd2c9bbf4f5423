use std::collections::HashSet;

use crate::domain::migration::MigrationStep;

pub trait Persistence: Send + Sync + Clone + 'static {
    /// load tables of the configured schema
    fn load(&self) -> impl Future<Output = Result<HashSet<String>, anyhow::Error>> + Send;
    /// apply migration steps, one transaction per step
    fn apply_migration_steps(
        &self,
        steps: Vec<impl MigrationStep + Send>,
    ) -> impl Future<Output = Result<(), anyhow::Error>> + Send;
    fn database_schema(&self) -> &str;
}
