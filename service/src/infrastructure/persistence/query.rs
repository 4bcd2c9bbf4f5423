use serde_json::Value;
use sqlx::{postgres::PgArguments, query::Query, types::{Json, Uuid}};

use crate::domain::store::QueryFilter;

/// Builder of `SELECT id, data` statements over the documents table.
/// Rows always come back in insertion order.
#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    table: &'a str,
    where_conditions: Vec<Condition<'a>>,
    for_update: bool,
}

/// A where condition that will be AND'ed together
#[derive(Debug, Clone)]
pub enum Condition<'a> {
    /// collection = value
    Collection(&'a str),

    /// id = value
    Id(Uuid),

    /// data -> field = value
    FieldEquals { field: &'a str, value: &'a Value },

    /// data -> field is an array holding value
    ArrayContains { field: &'a str, value: &'a Value },
}

// SQL parameter that will be bound to query
#[derive(Debug, Clone)]
pub enum SqlParameter {
    Text(String),
    Uuid(Uuid),
    Json(Value),
}

impl<'a> QueryBuilder<'a> {
    /// Select the documents of `collection` stored in `table`
    pub fn from_collection(table: &'a str, collection: &'a str) -> Self {
        QueryBuilder {
            table,
            where_conditions: vec![Condition::Collection(collection)],
            for_update: false,
        }
    }

    /// Add where condition
    pub fn where_condition(mut self, condition: Condition<'a>) -> Self {
        self.where_conditions.push(condition);
        self
    }

    /// Add the conditions of a store filter
    pub fn filter(self, filter: &'a QueryFilter) -> Self {
        match Condition::from_filter(filter) {
            Some(condition) => self.where_condition(condition),
            None => self,
        }
    }

    /// Lock the selected rows until the transaction ends
    pub fn for_update(mut self) -> Self {
        self.for_update = true;
        self
    }

    /// Build the SQL query string
    pub fn build(self) -> (String, Vec<SqlParameter>) {
        let mut sql = format!("SELECT \"id\", \"data\"\nFROM {}", self.table);
        let mut params = Vec::new();
        let mut param_counter = 1;

        let where_sql = self
            .where_conditions
            .iter()
            .map(|condition| {
                let (cond_sql, cond_params) = condition.to_sql(&mut param_counter);
                params.extend(cond_params);
                cond_sql
            })
            .collect::<Vec<_>>();
        sql.push_str("\nWHERE ");
        sql.push_str(&where_sql.join(" AND "));

        sql.push_str("\nORDER BY \"seq\"");

        if self.for_update {
            sql.push_str("\nFOR UPDATE");
        }

        (sql, params)
    }
}

impl<'a> Condition<'a> {
    /// `None` for a filter matching everything
    pub fn from_filter(filter: &'a QueryFilter) -> Option<Self> {
        match filter {
            QueryFilter::All => None,
            QueryFilter::Equals { field, value } => Some(Condition::FieldEquals { field, value }),
            QueryFilter::ArrayContains { field, value } => {
                Some(Condition::ArrayContains { field, value })
            }
        }
    }

    pub fn to_sql(&self, param_counter: &mut usize) -> (String, Vec<SqlParameter>) {
        match self {
            Condition::Collection(collection) => {
                let sql = format!("\"collection\" = ${}", next(param_counter));
                (sql, vec![SqlParameter::Text(collection.to_string())])
            }

            Condition::Id(id) => {
                let sql = format!("\"id\" = ${}", next(param_counter));
                (sql, vec![SqlParameter::Uuid(*id)])
            }

            Condition::FieldEquals { field, value } => {
                let sql = format!(
                    "\"data\" -> ${} = ${}",
                    next(param_counter),
                    next(param_counter)
                );
                (
                    sql,
                    vec![SqlParameter::Text(field.to_string()), SqlParameter::Json((*value).clone())],
                )
            }

            Condition::ArrayContains { field, value } => {
                let field_param = next(param_counter);
                let sql = format!(
                    "(jsonb_typeof(\"data\" -> ${field_param}) = 'array' AND \"data\" -> ${field_param} @> ${})",
                    next(param_counter)
                );
                (
                    sql,
                    vec![SqlParameter::Text(field.to_string()), SqlParameter::Json(Value::Array(vec![(*value).clone()]))],
                )
            }
        }
    }
}

fn next(param_counter: &mut usize) -> usize {
    let current = *param_counter;
    *param_counter += 1;
    current
}

impl SqlParameter {
    /// Bind to sqlx query
    pub fn bind_to_query<'q>(
        self,
        query: Query<'q, sqlx::Postgres, PgArguments>,
    ) -> Query<'q, sqlx::Postgres, PgArguments> {
        match self {
            SqlParameter::Text(s) => query.bind(s),
            SqlParameter::Uuid(id) => query.bind(id),
            SqlParameter::Json(value) => query.bind(Json(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_collection_select() {
        let (sql, params) = QueryBuilder::from_collection("\"spins\".\"documents\"", "artists")
            .filter(&QueryFilter::All)
            .build();

        assert!(sql.starts_with("SELECT \"id\", \"data\"\nFROM \"spins\".\"documents\""));
        assert!(sql.contains("WHERE \"collection\" = $1"));
        assert!(sql.ends_with("ORDER BY \"seq\""));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_filtered_select_for_update() {
        let filter = QueryFilter::array_contains("savedBy", "u2");

        let (sql, params) = QueryBuilder::from_collection("documents", "artists")
            .filter(&filter)
            .for_update()
            .build();

        assert!(sql.contains(
            "WHERE \"collection\" = $1 AND \
             (jsonb_typeof(\"data\" -> $2) = 'array' AND \"data\" -> $2 @> $3)"
        ));
        assert!(sql.ends_with("FOR UPDATE"));
        assert_eq!(params.len(), 3);
        assert!(matches!(&params[2], SqlParameter::Json(value) if *value == json!(["u2"])));
    }

    #[test]
    fn test_field_equals_select() {
        let (sql, params) = QueryBuilder::from_collection("documents", "artists")
            .filter(&QueryFilter::equals("createdBy", "u1"))
            .build();

        assert!(sql.contains("\"collection\" = $1 AND \"data\" -> $2 = $3"));
        assert!(matches!(&params[2], SqlParameter::Json(value) if *value == json!("u1")));
    }

    #[test]
    fn test_select_by_id() {
        let id = Uuid::new_v4();
        let (sql, params) = QueryBuilder::from_collection("documents", "artists")
            .where_condition(Condition::Id(id))
            .build();

        assert!(sql.contains("\"collection\" = $1 AND \"id\" = $2"));
        assert!(matches!(params[1], SqlParameter::Uuid(bound) if bound == id));
    }
}
