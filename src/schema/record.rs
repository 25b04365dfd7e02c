//! Record representations the engine can serve.
//!
//! Typed structs opt in through [`Record`]; runtime-shaped admin records use
//! [`DynRecord`]. Both are handled through [`StructuredRecord`].

use crate::error::AppError;
use crate::schema::field::Catalog;
use crate::schema::shape::Shape;
use crate::schema::value::{accepts, normalize};
use crate::store::StoreError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Storage record keyed by internal (column) names.
pub type Row = Map<String, Value>;

/// A compile-time record type. Serde drives the wire form; `shape` drives storage.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn shape() -> Shape;
}

/// What the engine needs from a record, independent of how it is represented.
pub trait StructuredRecord: Sized + Send + Sync + 'static {
    /// Decode a full record from a request body.
    fn decode(catalog: &Catalog, body: Value) -> Result<Self, AppError>;
    fn from_row(catalog: &Catalog, row: Row) -> Result<Self, AppError>;
    fn to_row(&self, catalog: &Catalog) -> Result<Row, AppError>;
    /// Wire JSON, keyed by external names.
    fn to_wire(&self) -> Result<Value, AppError>;
    fn get_field(&self, name: &str) -> Option<Value>;
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), AppError>;
}

/// Copy catalog fields of a wire object into a storage row.
pub fn wire_to_row(catalog: &Catalog, wire: &Map<String, Value>) -> Row {
    let mut row = Row::new();
    for field in catalog.fields() {
        if let Some(value) = wire.get(&field.external_name) {
            row.insert(field.internal_name.clone(), normalize(field, value.clone()));
        }
    }
    row
}

pub fn row_to_wire(catalog: &Catalog, mut row: Row) -> Map<String, Value> {
    let mut wire = Map::new();
    for field in catalog.fields() {
        if let Some(value) = row.remove(&field.internal_name) {
            wire.insert(field.external_name.clone(), value);
        }
    }
    wire
}

impl<T: Record> StructuredRecord for T {
    fn decode(_catalog: &Catalog, body: Value) -> Result<Self, AppError> {
        serde_json::from_value(body).map_err(|e| AppError::BadRequest(e.to_string()))
    }

    fn from_row(catalog: &Catalog, row: Row) -> Result<Self, AppError> {
        let wire = row_to_wire(catalog, row);
        serde_json::from_value(Value::Object(wire))
            .map_err(|e| StoreError::Decode(format!("{}: {}", catalog.shape_name(), e)).into())
    }

    fn to_row(&self, catalog: &Catalog) -> Result<Row, AppError> {
        match self.to_wire()? {
            Value::Object(wire) => Ok(wire_to_row(catalog, &wire)),
            _ => Err(AppError::Validation(format!(
                "{} does not serialize to an object",
                catalog.shape_name()
            ))),
        }
    }

    fn to_wire(&self) -> Result<Value, AppError> {
        serde_json::to_value(self).map_err(|e| AppError::Validation(e.to_string()))
    }

    fn get_field(&self, name: &str) -> Option<Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut wire)) => wire.remove(name),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<(), AppError> {
        let mut wire = match self.to_wire()? {
            Value::Object(wire) => wire,
            _ => return Err(AppError::Validation(format!("cannot set '{}'", name))),
        };
        wire.insert(name.to_string(), value);
        *self = serde_json::from_value(Value::Object(wire))
            .map_err(|e| AppError::Validation(format!("{}: {}", name, e)))?;
        Ok(())
    }
}

/// A record whose shape is only known at runtime: a JSON map keyed by external names.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DynRecord {
    fields: Map<String, Value>,
}

impl DynRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        DynRecord { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

impl StructuredRecord for DynRecord {
    /// Unknown keys are dropped; known keys must match their field kind.
    fn decode(catalog: &Catalog, body: Value) -> Result<Self, AppError> {
        let Value::Object(input) = body else {
            return Err(AppError::BadRequest("body must be a JSON object".into()));
        };
        let mut fields = Map::new();
        for (name, value) in input {
            let Some(field) = catalog.by_external(&name) else {
                continue;
            };
            if !accepts(field, &value) {
                return Err(AppError::Validation(format!(
                    "{}: expected {}",
                    field.external_name, field.kind
                )));
            }
            fields.insert(name, normalize(field, value));
        }
        Ok(DynRecord { fields })
    }

    fn from_row(catalog: &Catalog, row: Row) -> Result<Self, AppError> {
        Ok(DynRecord {
            fields: row_to_wire(catalog, row),
        })
    }

    fn to_row(&self, catalog: &Catalog) -> Result<Row, AppError> {
        Ok(wire_to_row(catalog, &self.fields))
    }

    fn to_wire(&self) -> Result<Value, AppError> {
        Ok(Value::Object(self.fields.clone()))
    }

    fn get_field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<(), AppError> {
        self.fields.insert(name.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::shape::{Member, MemberType};
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Book {
        #[serde(default)]
        id: i64,
        title: String,
        #[serde(rename = "publishedAt")]
        published_at: Option<String>,
        #[serde(default, skip_serializing)]
        draft_note: String,
    }

    impl Record for Book {
        fn shape() -> Shape {
            Shape::new("Book")
                .member(Member::new("id", MemberType::Integer).primary_key())
                .member(Member::new("title", MemberType::String))
                .member(
                    Member::new("published_at", MemberType::optional(MemberType::DateTime))
                        .rename("publishedAt"),
                )
                .member(Member::new("draft_note", MemberType::String).transient())
        }
    }

    fn catalog() -> Catalog {
        Catalog::extract(&Book::shape()).unwrap()
    }

    #[test]
    fn typed_record_maps_to_storage_names() {
        let book = Book {
            id: 3,
            title: "Dune".into(),
            published_at: Some("1965-08-01".into()),
            draft_note: "x".into(),
        };
        let row = book.to_row(&catalog()).unwrap();
        assert_eq!(row.get("title"), Some(&json!("Dune")));
        assert_eq!(row.get("published_at"), Some(&json!("1965-08-01T00:00:00Z")));
        assert!(!row.contains_key("draft_note"));

        let back = Book::from_row(&catalog(), row).unwrap();
        assert_eq!(back.title, "Dune");
        assert_eq!(back.published_at.as_deref(), Some("1965-08-01T00:00:00Z"));
    }

    #[test]
    fn typed_record_field_access_uses_wire_names() {
        let mut book = Book::decode(&catalog(), json!({"title": "Emma", "publishedAt": null})).unwrap();
        assert_eq!(book.get_field("title"), Some(json!("Emma")));
        book.set_field("title", json!("Persuasion")).unwrap();
        assert_eq!(book.title, "Persuasion");
        assert!(book.set_field("title", json!(5)).is_err());
    }

    #[test]
    fn typed_decode_rejects_bad_bodies() {
        assert!(matches!(
            Book::decode(&catalog(), json!({"title": 5})),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn dyn_record_drops_unknown_and_checks_kinds() {
        let rec = DynRecord::decode(
            &catalog(),
            json!({"title": "Dune", "bogus": 1, "draft_note": "x"}),
        )
        .unwrap();
        assert_eq!(rec.fields().len(), 1);
        assert_eq!(rec.get_field("title"), Some(json!("Dune")));

        let err = DynRecord::decode(&catalog(), json!({"title": 5})).unwrap_err();
        assert!(err.to_string().contains("title"));
        assert!(DynRecord::decode(&catalog(), json!([1])).is_err());
    }

    #[test]
    fn dyn_record_round_trips_rows() {
        let mut row = Row::new();
        row.insert("id".into(), json!(1));
        row.insert("published_at".into(), json!(null));
        let rec = DynRecord::from_row(&catalog(), row).unwrap();
        assert_eq!(rec.to_wire().unwrap(), json!({"id": 1, "publishedAt": null}));
        let row = rec.to_row(&catalog()).unwrap();
        assert_eq!(row.get("published_at"), Some(&json!(null)));
    }
}
