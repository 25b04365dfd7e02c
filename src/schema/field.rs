//! Field catalog: the flattened, storage-oriented view of a [`Shape`].

use crate::case::to_snake_case;
use crate::error::ConfigError;
use crate::schema::shape::{Mapping, MemberType, Shape};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive kind of a catalog field. Closed set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    #[serde(rename = "datetime")]
    DateTime,
    Object,
    Array,
    Map,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::DateTime => "datetime",
            FieldKind::Object => "object",
            FieldKind::Array => "array",
            FieldKind::Map => "map",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Integer | FieldKind::Float)
    }

    /// Object, array and map fields are stored as opaque JSON.
    pub fn is_structured(&self) -> bool {
        matches!(self, FieldKind::Object | FieldKind::Array | FieldKind::Map)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldDescriptor {
    /// Name on the wire (JSON bodies, filters, orders).
    pub external_name: String,
    /// Storage column name.
    pub internal_name: String,
    /// Declared member name, kept for allow-list matching.
    #[serde(skip)]
    pub member_name: String,
    pub kind: FieldKind,
    pub primary_key: bool,
    pub nullable: bool,
    pub array: bool,
}

/// Walk `shape` and produce its ordered field list.
///
/// Flattened members are inlined in place; transient members are skipped.
/// Fails unless exactly one field is the primary key.
pub fn extract_fields(shape: &Shape) -> Result<Vec<FieldDescriptor>, ConfigError> {
    let mut fields = Vec::new();
    collect(shape, &mut fields);

    let mut primary: Option<&FieldDescriptor> = None;
    for field in fields.iter().filter(|f| f.primary_key) {
        if let Some(first) = primary {
            return Err(ConfigError::DuplicatePrimaryKey {
                shape: shape.name.clone(),
                first: first.external_name.clone(),
                second: field.external_name.clone(),
            });
        }
        primary = Some(field);
    }
    if primary.is_none() {
        return Err(ConfigError::MissingPrimaryKey(shape.name.clone()));
    }
    Ok(fields)
}

fn collect(shape: &Shape, out: &mut Vec<FieldDescriptor>) {
    for member in &shape.members {
        match (member.mapping, &member.ty) {
            (Mapping::Transient, _) => continue,
            (Mapping::Flatten, MemberType::Struct(embedded)) => {
                collect(embedded, out);
                continue;
            }
            _ => {}
        }

        let internal_name = member
            .column
            .clone()
            .unwrap_or_else(|| to_snake_case(&member.name));
        if out.iter().any(|f| f.internal_name == internal_name) {
            tracing::debug!(shape = %shape.name, column = %internal_name, "shadowed member skipped");
            continue;
        }
        let (kind, nullable, array) = classify(&member.ty);
        out.push(FieldDescriptor {
            external_name: member.rename.clone().unwrap_or_else(|| member.name.clone()),
            internal_name,
            member_name: member.name.clone(),
            kind,
            primary_key: member.mapping == Mapping::PrimaryKey,
            nullable,
            array,
        });
    }
}

/// (kind, nullable, array) for a declared member type.
fn classify(ty: &MemberType) -> (FieldKind, bool, bool) {
    match ty {
        MemberType::Optional(inner) => {
            let (kind, _, array) = classify(inner);
            (kind, true, array)
        }
        MemberType::String => (FieldKind::String, false, false),
        MemberType::Integer => (FieldKind::Integer, false, false),
        MemberType::Float => (FieldKind::Float, false, false),
        MemberType::Boolean => (FieldKind::Boolean, false, false),
        MemberType::DateTime => (FieldKind::DateTime, false, false),
        MemberType::List(_) => (FieldKind::Array, true, true),
        MemberType::Map => (FieldKind::Map, true, false),
        MemberType::Struct(_) => (FieldKind::Object, false, false),
    }
}

/// Extracted fields of one shape with name lookups.
#[derive(Clone, Debug)]
pub struct Catalog {
    shape_name: String,
    fields: Vec<FieldDescriptor>,
    primary: usize,
}

impl Catalog {
    pub fn extract(shape: &Shape) -> Result<Self, ConfigError> {
        let fields = extract_fields(shape)?;
        let primary = fields
            .iter()
            .position(|f| f.primary_key)
            .ok_or_else(|| ConfigError::MissingPrimaryKey(shape.name.clone()))?;
        Ok(Catalog {
            shape_name: shape.name.clone(),
            fields,
            primary,
        })
    }

    pub fn shape_name(&self) -> &str {
        &self.shape_name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn primary_key(&self) -> &FieldDescriptor {
        &self.fields[self.primary]
    }

    pub fn by_external(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.external_name == name)
    }

    pub fn by_internal(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.internal_name == name)
    }

    /// Match a configuration entry given as an external, internal or member
    /// name in any case convention.
    pub fn resolve(&self, entry: &str) -> Option<&FieldDescriptor> {
        let entry = entry.trim();
        if entry.is_empty() {
            return None;
        }
        if let Some(field) = self.fields.iter().find(|f| {
            f.internal_name == entry || f.external_name == entry || f.member_name == entry
        }) {
            return Some(field);
        }
        let snake = to_snake_case(entry);
        self.fields.iter().find(|f| {
            f.internal_name == snake
                || to_snake_case(&f.external_name) == snake
                || to_snake_case(&f.member_name) == snake
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::shape::Member;

    fn timestamps() -> Shape {
        Shape::new("Timestamps")
            .member(Member::new("CreatedAt", MemberType::DateTime))
            .member(Member::new("UpdatedAt", MemberType::optional(MemberType::DateTime)))
    }

    fn user() -> Shape {
        Shape::new("User")
            .member(Member::new("id", MemberType::Integer).primary_key())
            .member(Member::new("Name", MemberType::String).rename("name"))
            .member(Member::new("age", MemberType::optional(MemberType::Integer)))
            .member(Member::new("tags", MemberType::list(MemberType::String)))
            .member(Member::new("profile", MemberType::Struct(Shape::new("Profile"))))
            .member(Member::new("extra", MemberType::Map))
            .member(Member::new("password", MemberType::String).transient())
            .member(Member::new("nick", MemberType::String).column("nick_name"))
            .flatten(timestamps())
    }

    #[test]
    fn extracts_kinds_and_flags() {
        let fields = extract_fields(&user()).unwrap();
        let names: Vec<_> = fields.iter().map(|f| f.internal_name.as_str()).collect();
        assert_eq!(
            names,
            ["id", "name", "age", "tags", "profile", "extra", "nick_name", "created_at", "updated_at"]
        );

        let by = |n: &str| fields.iter().find(|f| f.internal_name == n).unwrap();
        assert!(by("id").primary_key);
        assert_eq!(by("name").external_name, "name");
        assert_eq!(by("age").kind, FieldKind::Integer);
        assert!(by("age").nullable);
        assert_eq!(by("tags").kind, FieldKind::Array);
        assert!(by("tags").array && by("tags").nullable);
        assert_eq!(by("profile").kind, FieldKind::Object);
        assert_eq!(by("extra").kind, FieldKind::Map);
        assert_eq!(by("nick_name").external_name, "nick");
        assert_eq!(by("created_at").kind, FieldKind::DateTime);
        assert!(!by("created_at").nullable);
        assert!(by("updated_at").nullable);
    }

    #[test]
    fn transient_members_are_not_in_catalog() {
        let fields = extract_fields(&user()).unwrap();
        assert!(fields.iter().all(|f| f.member_name != "password"));
    }

    #[test]
    fn missing_primary_key_is_an_error() {
        let shape = Shape::new("Note").member(Member::new("body", MemberType::String));
        assert!(matches!(
            extract_fields(&shape),
            Err(ConfigError::MissingPrimaryKey(name)) if name == "Note"
        ));
    }

    #[test]
    fn two_primary_keys_is_an_error() {
        let shape = Shape::new("Pair")
            .member(Member::new("a", MemberType::Integer).primary_key())
            .member(Member::new("b", MemberType::Integer).primary_key());
        assert!(matches!(
            extract_fields(&shape),
            Err(ConfigError::DuplicatePrimaryKey { .. })
        ));
    }

    #[test]
    fn resolve_accepts_any_case_convention() {
        let catalog = Catalog::extract(&user()).unwrap();
        for entry in ["CreatedAt", "createdAt", "created_at", " created_at "] {
            assert_eq!(catalog.resolve(entry).unwrap().internal_name, "created_at", "{entry}");
        }
        assert_eq!(catalog.resolve("Name").unwrap().internal_name, "name");
        assert_eq!(catalog.resolve("nick").unwrap().internal_name, "nick_name");
        assert_eq!(catalog.resolve("NickName").unwrap().internal_name, "nick_name");
        assert!(catalog.resolve("password").is_none());
        assert!(catalog.resolve("nope").is_none());
        assert_eq!(catalog.primary_key().internal_name, "id");
    }
}
