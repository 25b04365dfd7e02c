//! Record shapes, field catalogs and record representations.

pub mod field;
pub mod record;
pub mod shape;
pub mod value;

pub use field::{extract_fields, Catalog, FieldDescriptor, FieldKind};
pub use record::{DynRecord, Record, Row, StructuredRecord};
pub use shape::{Mapping, Member, MemberType, Shape};
