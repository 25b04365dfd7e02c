//! Structural description of a record type: the input of field extraction.
//!
//! Typed records describe themselves through [`Record::shape`](crate::schema::Record::shape);
//! admin objects carry a `Shape` in their JSON configuration.

use serde::{Deserialize, Serialize};

/// Declared type of one member.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberType {
    String,
    Integer,
    Float,
    Boolean,
    #[serde(rename = "datetime")]
    DateTime,
    /// Nullable wrapper; unwrapped one level during extraction.
    Optional(Box<MemberType>),
    List(Box<MemberType>),
    Map,
    Struct(Shape),
}

impl MemberType {
    pub fn optional(inner: MemberType) -> Self {
        MemberType::Optional(Box::new(inner))
    }

    pub fn list(inner: MemberType) -> Self {
        MemberType::List(Box::new(inner))
    }
}

/// How a member maps to storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mapping {
    #[default]
    Column,
    PrimaryKey,
    /// Embedded struct whose members are inlined into the parent.
    Flatten,
    /// Not stored; never part of the field catalog.
    Transient,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    /// Wire name when it differs from `name` (serde `rename`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
    /// Storage column when it differs from the snake_case of `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(rename = "type")]
    pub ty: MemberType,
    #[serde(default)]
    pub mapping: Mapping,
}

impl Member {
    pub fn new(name: impl Into<String>, ty: MemberType) -> Self {
        Member {
            name: name.into(),
            rename: None,
            column: None,
            ty,
            mapping: Mapping::Column,
        }
    }

    /// Inline all members of `shape` into the parent.
    pub fn flatten(shape: Shape) -> Self {
        Member {
            name: shape.name.clone(),
            rename: None,
            column: None,
            ty: MemberType::Struct(shape),
            mapping: Mapping::Flatten,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.mapping = Mapping::PrimaryKey;
        self
    }

    pub fn transient(mut self) -> Self {
        self.mapping = Mapping::Transient;
        self
    }

    pub fn rename(mut self, wire_name: impl Into<String>) -> Self {
        self.rename = Some(wire_name.into());
        self
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Base type name; the storage table name derives from it.
    pub name: String,
    #[serde(default)]
    pub members: Vec<Member>,
}

impl Shape {
    pub fn new(name: impl Into<String>) -> Self {
        Shape {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    pub fn flatten(self, embedded: Shape) -> Self {
        self.member(Member::flatten(embedded))
    }
}
