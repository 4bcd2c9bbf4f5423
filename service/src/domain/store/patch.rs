use serde_json::Value;

use crate::domain::store::DocumentData;

/// Change to a single top-level field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldUpdate {
    Set(Value),
    Delete,
    /// Appends the values not already present in the array.
    ArrayUnion(Vec<Value>),
    /// Removes every occurrence of the values from the array.
    ArrayRemove(Vec<Value>),
}

/// Ordered field updates applied as one atomic write.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentPatch {
    updates: Vec<(String, FieldUpdate)>,
}

impl DocumentPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// One `Set` per field of `data`. `null` fields are deleted instead.
    pub fn merge(data: DocumentData) -> Self {
        data.into_iter()
            .fold(Self::new(), |patch, (field, value)| match value {
                Value::Null => patch.delete(field),
                value => patch.set(field, value),
            })
    }

    pub fn set(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, FieldUpdate::Set(value.into()))
    }

    pub fn delete(self, field: impl Into<String>) -> Self {
        self.with(field, FieldUpdate::Delete)
    }

    pub fn array_union(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.with(field, FieldUpdate::ArrayUnion(values))
    }

    pub fn array_remove(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.with(field, FieldUpdate::ArrayRemove(values))
    }

    pub fn updates(&self) -> impl Iterator<Item = (&str, &FieldUpdate)> {
        self.updates
            .iter()
            .map(|(field, update)| (field.as_str(), update))
    }

    fn with(mut self, field: impl Into<String>, update: FieldUpdate) -> Self {
        self.updates.push((field.into(), update));
        self
    }
}

/// Applies `patch` to `data` in order. Every store adapter goes through this.
///
/// Array operations on a field that is missing or not an array treat it as
/// an empty array.
pub fn apply_patch(data: &mut DocumentData, patch: &DocumentPatch) {
    for (field, update) in patch.updates() {
        match update {
            FieldUpdate::Set(value) => {
                data.insert(field.to_owned(), value.clone());
            }
            FieldUpdate::Delete => {
                data.remove(field);
            }
            FieldUpdate::ArrayUnion(values) => update_array(data, field, |array| {
                for value in values {
                    if !array.contains(value) {
                        array.push(value.clone());
                    }
                }
            }),
            FieldUpdate::ArrayRemove(values) => update_array(data, field, |array| {
                array.retain(|item| !values.contains(item))
            }),
        }
    }
}

fn update_array(data: &mut DocumentData, field: &str, update: impl FnOnce(&mut Vec<Value>)) {
    let mut array = match data.remove(field) {
        Some(Value::Array(array)) => array,
        _ => Vec::new(),
    };
    update(&mut array);
    data.insert(field.to_owned(), Value::Array(array));
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
    fn union_skips_present_values() {
        let mut document = data(json!({"savedBy": ["u1"]}));
        let patch = DocumentPatch::new().array_union("savedBy", vec![json!("u1"), json!("u2")]);

        apply_patch(&mut document, &patch);
        apply_patch(&mut document, &patch);

        assert_eq!(document["savedBy"], json!(["u1", "u2"]));
    }

    #[test]
    fn remove_drops_every_occurrence() {
        let mut document = data(json!({"savedBy": ["u1", "u2", "u1"]}));

        apply_patch(
            &mut document,
            &DocumentPatch::new().array_remove("savedBy", vec![json!("u1")]),
        );

        assert_eq!(document["savedBy"], json!(["u2"]));
    }

    #[test]
    fn array_ops_on_missing_or_scalar_fields_start_empty() {
        let mut document = data(json!({"savedBy": "u9"}));

        apply_patch(
            &mut document,
            &DocumentPatch::new()
                .array_union("savedBy", vec![json!("u1")])
                .array_remove("tags", vec![json!("x")]),
        );

        assert_eq!(document["savedBy"], json!(["u1"]));
        assert_eq!(document["tags"], json!([]));
    }

    #[test]
    fn updates_apply_in_order() {
        let mut document = data(json!({"name": "a", "imageUrl": "x"}));

        apply_patch(
            &mut document,
            &DocumentPatch::new()
                .set("name", "b")
                .set("name", "c")
                .delete("imageUrl"),
        );

        assert_eq!(document, data(json!({"name": "c"})));
    }

    #[test]
    fn merge_deletes_null_fields() {
        let mut document = data(json!({"name": "a", "imageUrl": "x", "imageId": "img-1"}));
        let patch = DocumentPatch::merge(data(json!({"name": "b", "imageUrl": null})));

        apply_patch(&mut document, &patch);

        assert_eq!(document, data(json!({"name": "b", "imageId": "img-1"})));
    }
}
