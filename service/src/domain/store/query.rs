use serde_json::Value;

use crate::domain::store::DocumentData;

/// Filter over top-level document fields.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryFilter {
    All,
    /// field == value
    Equals { field: String, value: Value },
    /// field is an array holding value
    ArrayContains { field: String, value: Value },
}

impl QueryFilter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn array_contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::ArrayContains {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Evaluates the filter against a document body.
    pub fn matches(&self, data: &DocumentData) -> bool {
        match self {
            QueryFilter::All => true,
            QueryFilter::Equals { field, value } => data.get(field) == Some(value),
            QueryFilter::ArrayContains { field, value } => data
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn data(value: Value) -> DocumentData {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn filters_match_fields() {
        let document = data(json!({"createdBy": "u1", "savedBy": ["u2", "u3"]}));

        assert!(QueryFilter::All.matches(&document));
        assert!(QueryFilter::equals("createdBy", "u1").matches(&document));
        assert!(!QueryFilter::equals("createdBy", "u2").matches(&document));
        assert!(QueryFilter::array_contains("savedBy", "u3").matches(&document));
        assert!(!QueryFilter::array_contains("createdBy", "u1").matches(&document));
        assert!(!QueryFilter::equals("savedBy", "u2").matches(&document));
    }
}
