//! Partial updates.
//!
//! An [`Update`] is a typed, composable set of field assignments. The repository resolves it
//! into an [`UpdateSpec`] of stored paths and appends the modification timestamp before handing
//! it to the store. Stores with a native update language translate an [`UpdateSpec`]; others apply it
//! with [`UpdateSpec::apply`].

use std::{fmt, marker::PhantomData};

use bson::{Bson, DateTime, Document as BsonDocument, ser::serialize_to_bson};
use serde::Serialize;
use thiserror::Error;

use crate::{
    document::Document,
    error::{DocumentStoreError, DocumentStoreResult},
    field::{Field, FieldValue},
    resolve::FieldResolver,
};

/// One update operation on a stored path.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    Set(String, Bson),
    Unset(String),
    /// Adds a numeric delta, creating the field when missing.
    Inc(String, Bson),
    /// Sets the field to the store's current time.
    CurrentDate(String),
}

impl UpdateOp {
    pub fn path(&self) -> &str {
        match self {
            UpdateOp::Set(path, _)
            | UpdateOp::Unset(path)
            | UpdateOp::Inc(path, _)
            | UpdateOp::CurrentDate(path) => path,
        }
    }
}

/// A resolved update, as handed to a store backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSpec {
    pub ops: Vec<UpdateOp>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpdateApplyError {
    #[error("cannot traverse {path:?}: {segment:?} is not an embedded document")]
    NotADocument { path: String, segment: String },
    #[error("cannot increment non-numeric field {0:?}")]
    NotNumeric(String),
    #[error("array index out of range in {0:?}")]
    IndexOutOfRange(String),
    #[error("the identity field is immutable")]
    ImmutableField,
}

impl UpdateSpec {
    pub fn new(ops: Vec<UpdateOp>) -> Self {
        Self { ops }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Applies every operation in order, with `now` as the current time.
    ///
    /// On error the document may be partially updated; callers apply to a copy.
    pub fn apply(&self, document: &mut BsonDocument, now: DateTime) -> Result<(), UpdateApplyError> {
        for op in &self.ops {
            let path = op.path();
            if path == "_id" || path.starts_with("_id.") {
                return Err(UpdateApplyError::ImmutableField);
            }

            match op {
                UpdateOp::Set(path, value) => {
                    *slot(document, path, true)?.ok_or_else(|| missing(path))? = value.clone();
                }
                UpdateOp::CurrentDate(path) => {
                    *slot(document, path, true)?.ok_or_else(|| missing(path))? = Bson::DateTime(now);
                }
                UpdateOp::Unset(path) => unset(document, path),
                UpdateOp::Inc(path, delta) => {
                    let target = slot(document, path, true)?.ok_or_else(|| missing(path))?;
                    *target = increment(target, delta).ok_or_else(|| UpdateApplyError::NotNumeric(path.clone()))?;
                }
            }
        }

        Ok(())
    }
}

fn missing(path: &str) -> UpdateApplyError {
    UpdateApplyError::IndexOutOfRange(path.to_string())
}

/// Finds the value slot for `path`, creating intermediate documents when `create` is set.
/// A freshly created leaf holds `Null`.
fn slot<'a>(
    document: &'a mut BsonDocument,
    path: &str,
    create: bool,
) -> Result<Option<&'a mut Bson>, UpdateApplyError> {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };

    if create && !document.contains_key(head) {
        let seed = if rest.is_some() { Bson::Document(BsonDocument::new()) } else { Bson::Null };
        document.insert(head, seed);
    }

    let Some(value) = document.get_mut(head) else {
        return Ok(None);
    };

    match rest {
        None => Ok(Some(value)),
        Some(rest) => descend(value, path, head, rest, create),
    }
}

fn descend<'a>(
    value: &'a mut Bson,
    path: &str,
    segment: &str,
    rest: &str,
    create: bool,
) -> Result<Option<&'a mut Bson>, UpdateApplyError> {
    if create && matches!(value, Bson::Null) {
        *value = Bson::Document(BsonDocument::new());
    }

    match value {
        Bson::Document(inner) => slot(inner, rest, create),
        Bson::Array(items) => {
            let (index, tail) = match rest.split_once('.') {
                Some((index, tail)) => (index, Some(tail)),
                None => (rest, None),
            };
            let Ok(index) = index.parse::<usize>() else {
                return Err(UpdateApplyError::NotADocument {
                    path: path.to_string(),
                    segment: segment.to_string(),
                });
            };
            let Some(item) = items.get_mut(index) else {
                return Err(UpdateApplyError::IndexOutOfRange(path.to_string()));
            };
            match tail {
                None => Ok(Some(item)),
                Some(tail) => descend(item, path, rest, tail, create),
            }
        }
        _ => Err(UpdateApplyError::NotADocument {
            path: path.to_string(),
            segment: segment.to_string(),
        }),
    }
}

fn unset(document: &mut BsonDocument, path: &str) {
    match path.rsplit_once('.') {
        None => {
            document.remove(path);
        }
        Some((parent, leaf)) => match slot(document, parent, false) {
            Ok(Some(Bson::Document(inner))) => {
                inner.remove(leaf);
            }
            Ok(Some(Bson::Array(items))) => {
                if let Some(item) = leaf.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                    *item = Bson::Null;
                }
            }
            _ => {}
        },
    }
}

fn increment(current: &Bson, delta: &Bson) -> Option<Bson> {
    Some(match (current, delta) {
        (Bson::Null, delta) if is_number(delta) => delta.clone(),
        (Bson::Int32(a), Bson::Int32(b)) => match a.checked_add(*b) {
            Some(sum) => Bson::Int32(sum),
            None => Bson::Int64(i64::from(*a) + i64::from(*b)),
        },
        (Bson::Int32(a), Bson::Int64(b)) => Bson::Int64(i64::from(*a).checked_add(*b)?),
        (Bson::Int64(a), Bson::Int32(b)) => Bson::Int64(a.checked_add(i64::from(*b))?),
        (Bson::Int64(a), Bson::Int64(b)) => Bson::Int64(a.checked_add(*b)?),
        (a, b) => Bson::Double(as_f64(a)? + as_f64(b)?),
    })
}

fn is_number(value: &Bson) -> bool {
    matches!(value, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

/// A typed partial update of document `D`.
///
/// ```ignore
/// let update = Update::new()
///     .set(Restaurant::CUISINE, "Italian")
///     .inc(Restaurant::ADDRESS.then(Address::BUILDING_NO), 1);
/// repo.update(Restaurant::BOROUGH.eq("Bronx"), update).await?;
/// ```
pub struct Update<D> {
    ops: Vec<UpdateOp>,
    _marker: PhantomData<fn() -> D>,
}

impl<D> Update<D> {
    pub fn new() -> Self {
        Self { ops: Vec::new(), _marker: PhantomData }
    }

    pub fn set<T: FieldValue>(mut self, field: Field<D, T>, value: impl Into<T::Value>) -> Self {
        let value: T::Value = value.into();
        self.ops.push(UpdateOp::Set(field.path().to_string(), value.into()));
        self
    }

    /// Sets a field to the serialized form of any value of its type, such as an embedded document.
    pub fn set_serialized<T: Serialize>(mut self, field: Field<D, T>, value: &T) -> DocumentStoreResult<Self> {
        self.ops.push(UpdateOp::Set(field.path().to_string(), serialize_to_bson(value)?));
        Ok(self)
    }

    /// Sets a field named by a path string. The path is checked when the update runs.
    pub fn set_path(mut self, path: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.ops.push(UpdateOp::Set(path.into(), value.into()));
        self
    }

    pub fn unset<T>(mut self, field: Field<D, T>) -> Self {
        self.ops.push(UpdateOp::Unset(field.path().to_string()));
        self
    }

    pub fn inc<T: FieldValue>(mut self, field: Field<D, T>, delta: impl Into<T::Value>) -> Self {
        let delta: T::Value = delta.into();
        self.ops.push(UpdateOp::Inc(field.path().to_string(), delta.into()));
        self
    }

    /// Appends the operations of `other` after these.
    pub fn combine(mut self, other: Update<D>) -> Self {
        self.ops.extend(other.ops);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl<D: Document> Update<D> {
    /// Resolves every path and appends the modification timestamp.
    pub(crate) fn resolve(&self, resolver: &FieldResolver<D>) -> DocumentStoreResult<UpdateSpec> {
        let mut ops = Vec::with_capacity(self.ops.len() + 1);

        for op in &self.ops {
            let path = resolver.resolve_path(op.path())?;
            if path == "_id" || path == D::MODIFIED_ON_FIELD {
                return Err(DocumentStoreError::InvalidArgument(format!(
                    "{path:?} is maintained by the repository and cannot be updated"
                )));
            }

            ops.push(match op {
                UpdateOp::Set(_, value) => UpdateOp::Set(path, value.clone()),
                UpdateOp::Unset(_) => UpdateOp::Unset(path),
                UpdateOp::Inc(_, delta) => UpdateOp::Inc(path, delta.clone()),
                UpdateOp::CurrentDate(_) => UpdateOp::CurrentDate(path),
            });
        }

        ops.push(UpdateOp::CurrentDate(resolver.resolve_path(D::MODIFIED_ON_FIELD)?));
        Ok(UpdateSpec::new(ops))
    }
}

impl<D> Default for Update<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for Update<D> {
    fn clone(&self) -> Self {
        Self { ops: self.ops.clone(), _marker: PhantomData }
    }
}

impl<D> fmt::Debug for Update<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Update").field("ops", &self.ops).finish()
    }
}
