//! Document shapes and field path resolution.
//!
//! Every document type describes its stored shape through [`Shape`]. Repositories use the
//! shape to resolve field paths coming from untyped filters and dynamic strings into the
//! canonical stored path, failing with
//! [`FieldResolution`](crate::error::DocumentStoreError::FieldResolution) otherwise.
//!
//! Resolution rules:
//!
//! - The identity field (or `_id`) at the top level resolves to `_id`.
//! - A segment matches a field name exactly, or case-insensitively when exactly one field matches.
//! - Arrays are transparent: `grades.grade` addresses `grade` on every element. A numeric
//!   segment (`grades.0.grade`) addresses one element.
//! - Free-form values (maps, raw BSON) accept any remaining path.

use std::collections::{BTreeMap, HashMap};

use bson::{Bson, DateTime, Document as BsonDocument, oid::ObjectId};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// The stored shape of a value.
#[derive(Debug, Clone)]
pub enum Schema {
    /// A leaf value with no addressable children.
    Scalar,
    /// A free-form value; any sub-path is accepted.
    Any,
    /// An array whose elements have the inner shape.
    Array(Box<Schema>),
    /// An object with named fields.
    Object(Vec<SchemaField>),
}

/// A named field of an object shape. The child shape is produced lazily so recursive
/// document types can describe themselves.
#[derive(Debug, Clone)]
pub struct SchemaField {
    pub name: &'static str,
    pub schema: fn() -> Schema,
}

impl SchemaField {
    pub fn new(name: &'static str, schema: fn() -> Schema) -> Self {
        Self { name, schema }
    }
}

impl Schema {
    pub fn object(fields: Vec<SchemaField>) -> Self {
        Schema::Object(fields)
    }

    pub fn array(inner: Schema) -> Self {
        Schema::Array(Box::new(inner))
    }

    /// Resolves a dotted path against this shape and returns the canonical path.
    ///
    /// Returns `None` when any segment cannot be matched.
    pub fn resolve(&self, path: &str) -> Option<String> {
        let mut resolved = Vec::new();
        let mut current = self.clone();

        for segment in path.split('.') {
            if segment.is_empty() {
                return None;
            }

            current = loop {
                match current {
                    Schema::Any => {
                        resolved.push(segment.to_string());
                        break Schema::Any;
                    }
                    Schema::Scalar => return None,
                    Schema::Array(inner) => {
                        if segment.bytes().all(|b| b.is_ascii_digit()) {
                            resolved.push(segment.to_string());
                            break *inner;
                        }
                        current = *inner;
                    }
                    Schema::Object(fields) => {
                        let field = match_field(&fields, segment)?;
                        resolved.push(field.name.to_string());
                        break (field.schema)();
                    }
                }
            };
        }

        Some(resolved.join("."))
    }
}

fn match_field<'f>(fields: &'f [SchemaField], segment: &str) -> Option<&'f SchemaField> {
    if let Some(field) = fields.iter().find(|f| f.name == segment) {
        return Some(field);
    }

    let mut candidates = fields
        .iter()
        .filter(|f| f.name.eq_ignore_ascii_case(segment));

    match (candidates.next(), candidates.next()) {
        (Some(field), None) => Some(field),
        _ => None,
    }
}

/// Resolves a field path for a document type, mapping its identity field to `_id`.
pub fn resolve_path(
    schema: &Schema,
    id_field: &str,
    document: &str,
    path: &str,
) -> DocumentStoreResult<String> {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };

    if head == "_id" || head.eq_ignore_ascii_case(id_field) {
        return match rest {
            None => Ok("_id".to_string()),
            Some(_) => Err(DocumentStoreError::unresolved(path, document)),
        };
    }

    schema
        .resolve(path)
        .ok_or_else(|| DocumentStoreError::unresolved(path, document))
}

/// Describes the stored shape of a type.
///
/// Implemented for primitives, containers and BSON types here, and for user types by
/// `#[derive(Document)]` and `#[derive(Embedded)]`.
pub trait Shape {
    fn schema() -> Schema;
}

macro_rules! scalar_shape {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Shape for $ty {
                fn schema() -> Schema {
                    Schema::Scalar
                }
            }
        )*
    };
}

scalar_shape!(
    String, bool, char, i8, i16, i32, i64, u8, u16, u32, f32, f64,
    ObjectId, DateTime, bson::Uuid, uuid::Uuid,
);

impl Shape for Bson {
    fn schema() -> Schema {
        Schema::Any
    }
}

impl Shape for BsonDocument {
    fn schema() -> Schema {
        Schema::Any
    }
}

impl<T: Shape> Shape for Option<T> {
    fn schema() -> Schema {
        T::schema()
    }
}

impl<T: Shape> Shape for Box<T> {
    fn schema() -> Schema {
        T::schema()
    }
}

impl<T: Shape> Shape for Vec<T> {
    fn schema() -> Schema {
        Schema::array(T::schema())
    }
}

impl<K, V, S> Shape for HashMap<K, V, S> {
    fn schema() -> Schema {
        Schema::Any
    }
}

impl<K, V> Shape for BTreeMap<K, V> {
    fn schema() -> Schema {
        Schema::Any
    }
}
