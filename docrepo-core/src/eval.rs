//! Client-side evaluation of queries over stored documents.
//!
//! Used by the pipeline when a store cannot evaluate a predicate natively, and by stores
//! without a query engine of their own. Semantics follow the MongoDB query language:
//!
//! - A dotted path through an array addresses every element; a numeric segment addresses one.
//! - A comparison matches when any addressed value (or element of an addressed array) matches.
//! - Negative operators (`Ne`, `NotContains`, `NoneOf`) match when their positive form does not,
//!   so a missing field matches them. `Eq null` matches a missing field.
//! - Ordering comparisons only match values of the same type class.
//! - Sorting ranks values by type class first; missing values rank with `null`, lowest.

use std::cmp::Ordering;

use bson::{Bson, DateTime, Document as BsonDocument, oid::ObjectId};

use crate::{
    error::DocumentStoreError,
    query::{Expr, FieldOp, QueryVisitor, Sort, SortDirection, StoreQuery},
};

/// Comparable view over BSON values.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Number(Number),
    String(&'a str),
    Map(Vec<(&'a str, Comparable<'a>)>),
    Array(Vec<Comparable<'a>>),
    Binary(u8, &'a [u8]),
    ObjectId(ObjectId),
    Bool(bool),
    DateTime(DateTime),
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(Number::Int(i64::from(*value))),
            Bson::Int64(value) => Comparable::Number(Number::Int(*value)),
            Bson::Double(value) => Comparable::Number(Number::Double(*value)),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Symbol(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Binary(binary) => Comparable::Binary(u8::from(binary.subtype), &binary.bytes),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            other => Comparable::Other(other),
        }
    }
}

/// A numeric value. Integers compare exactly; doubles only when one side is a double.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Number {
    Int(i64),
    Double(f64),
}

impl Number {
    fn is_nan(&self) -> bool {
        matches!(self, Number::Double(d) if d.is_nan())
    }

    /// Numeric ordering, `None` when either side is NaN.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (*self, *other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (Number::Double(a), Number::Double(b)) => a.partial_cmp(&b),
            (Number::Int(a), Number::Double(b)) => int_double_cmp(a, b),
            (Number::Double(a), Number::Int(b)) => int_double_cmp(b, a).map(Ordering::reverse),
        }
    }

    /// Total order with NaN below every other number.
    fn total_cmp(&self, other: &Self) -> Ordering {
        match (self.is_nan(), other.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.partial_cmp(other).unwrap_or(Ordering::Equal),
        }
    }
}

/// Compares an integer with a double without rounding the integer.
fn int_double_cmp(int: i64, double: f64) -> Option<Ordering> {
    // 2^63, exactly representable as f64.
    const BOUND: f64 = 9_223_372_036_854_775_808.0;

    if double.is_nan() {
        return None;
    }
    if double >= BOUND {
        return Some(Ordering::Less);
    }
    if double < -BOUND {
        return Some(Ordering::Greater);
    }

    let whole = double.trunc();
    let fraction = double - whole;
    Some(
        int.cmp(&(whole as i64))
            .then_with(|| 0.0_f64.partial_cmp(&fraction).unwrap_or(Ordering::Equal)),
    )
}

impl Comparable<'_> {
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 1,
            Comparable::Number(_) => 2,
            Comparable::String(_) => 3,
            Comparable::Map(_) => 4,
            Comparable::Array(_) => 5,
            Comparable::Binary(..) => 6,
            Comparable::ObjectId(_) => 7,
            Comparable::Bool(_) => 8,
            Comparable::DateTime(_) => 9,
            Comparable::Other(_) => 10,
        }
    }

    /// Total order across all values: type class first, then value.
    pub(crate) fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Ordering::Equal,
            (Comparable::Number(a), Comparable::Number(b)) => a.total_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.cmp(b),
            (Comparable::Map(a), Comparable::Map(b)) => {
                for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                    let ord = va.total_cmp(vb).then_with(|| ka.cmp(kb));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Comparable::Array(a), Comparable::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.total_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Comparable::Binary(sa, a), Comparable::Binary(sb, b)) => {
                a.len().cmp(&b.len()).then(sa.cmp(sb)).then_with(|| a.cmp(b))
            }
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.bytes().cmp(&b.bytes()),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.cmp(b),
            (Comparable::Other(_), Comparable::Other(_)) => Ordering::Equal,
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Ordering within a type class, `None` across classes.
    fn bracketed_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Other(_), _) | (_, Comparable::Other(_)) => None,
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            _ if self.rank() == other.rank() => Some(self.total_cmp(other)),
            _ => None,
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b) == Some(Ordering::Equal),
            _ => self.rank() == other.rank() && self.total_cmp(other) == Ordering::Equal,
        }
    }
}

/// Collects every value addressed by `path`.
pub fn lookup<'a>(document: &'a BsonDocument, path: &str) -> Vec<&'a Bson> {
    let mut segments = path.split('.');
    let Some(head) = segments.next() else {
        return Vec::new();
    };
    let rest: Vec<&str> = segments.collect();

    let mut found = Vec::new();
    if let Some(value) = document.get(head) {
        descend(value, &rest, &mut found);
    }
    found
}

fn descend<'a>(value: &'a Bson, rest: &[&str], found: &mut Vec<&'a Bson>) {
    let Some((segment, tail)) = rest.split_first() else {
        found.push(value);
        return;
    };

    match value {
        Bson::Document(doc) => {
            if let Some(child) = doc.get(*segment) {
                descend(child, tail, found);
            }
        }
        Bson::Array(items) => {
            if let Ok(index) = segment.parse::<usize>() {
                if let Some(item) = items.get(index) {
                    descend(item, tail, found);
                }
            } else {
                for item in items {
                    if let Bson::Document(doc) = item {
                        if let Some(child) = doc.get(*segment) {
                            descend(child, tail, found);
                        }
                    }
                }
            }
        }
        _ => {}
    }
}

/// Evaluates a predicate against one document.
pub struct DocumentEvaluator<'a> {
    document: &'a BsonDocument,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a BsonDocument) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> bool {
        self.visit_expr(expr).unwrap_or(false)
    }

    fn field_matches(&self, field: &str, op: FieldOp, value: &Bson) -> bool {
        let values = lookup(self.document, field);

        match op {
            FieldOp::Ne => !self.field_matches(field, FieldOp::Eq, value),
            FieldOp::NotContains => !self.field_matches(field, FieldOp::Contains, value),
            FieldOp::NoneOf => !self.field_matches(field, FieldOp::AnyOf, value),
            FieldOp::Eq => {
                if values.is_empty() {
                    return matches!(value, Bson::Null);
                }
                let expected = Comparable::from(value);
                any_candidate(&values, |c| c == &expected)
            }
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                let expected = Comparable::from(value);
                any_candidate(&values, |c| match c.bracketed_cmp(&expected) {
                    Some(ordering) => match op {
                        FieldOp::Gt => ordering == Ordering::Greater,
                        FieldOp::Gte => ordering != Ordering::Less,
                        FieldOp::Lt => ordering == Ordering::Less,
                        _ => ordering != Ordering::Greater,
                    },
                    None => false,
                })
            }
            FieldOp::Contains => match value {
                Bson::String(needle) => any_text(&values, |s| s.contains(needle.as_str())),
                Bson::Array(required) => values.iter().any(|v| match v {
                    Bson::Array(items) => required.iter().all(|r| {
                        let r = Comparable::from(r);
                        items.iter().any(|item| Comparable::from(item) == r)
                    }),
                    _ => false,
                }),
                other => {
                    let expected = Comparable::from(other);
                    any_candidate(&values, |c| c == &expected)
                }
            },
            FieldOp::StartsWith => match value {
                Bson::String(prefix) => any_text(&values, |s| s.starts_with(prefix.as_str())),
                _ => false,
            },
            FieldOp::EndsWith => match value {
                Bson::String(suffix) => any_text(&values, |s| s.ends_with(suffix.as_str())),
                _ => false,
            },
            FieldOp::AnyOf => {
                let options: Vec<Comparable<'_>> = match value {
                    Bson::Array(items) => items.iter().map(Comparable::from).collect(),
                    single => vec![Comparable::from(single)],
                };
                if values.is_empty() {
                    return options.iter().any(|o| matches!(o, Comparable::Null));
                }
                any_candidate(&values, |c| options.iter().any(|o| o == c))
            }
        }
    }
}

/// True when `test` holds for an addressed value or, for arrays, one of its elements.
fn any_candidate(values: &[&Bson], test: impl Fn(&Comparable<'_>) -> bool) -> bool {
    values.iter().any(|v| {
        let candidate = Comparable::from(*v);
        if test(&candidate) {
            return true;
        }
        match candidate {
            Comparable::Array(items) => items.iter().any(&test),
            _ => false,
        }
    })
}

fn any_text(values: &[&Bson], test: impl Fn(&str) -> bool) -> bool {
    values.iter().any(|v| match v {
        Bson::String(s) => test(s),
        Bson::Array(items) => items.iter().any(|item| matches!(item, Bson::String(s) if test(s))),
        _ => false,
    })
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(exprs.iter().all(|e| self.evaluate(e)))
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(exprs.iter().any(|e| self.evaluate(e)))
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.evaluate(expr))
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(!lookup(self.document, field).is_empty() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(self.field_matches(field, *op, value))
    }
}

/// Returns `true` if `document` satisfies `expr`.
pub fn matches(document: &BsonDocument, expr: &Expr) -> bool {
    DocumentEvaluator::new(document).evaluate(expr)
}

/// The value a document sorts by: the smallest addressed element ascending, the largest
/// descending. Missing fields and empty arrays sort as `null`.
fn sort_key<'a>(document: &'a BsonDocument, field: &str, direction: SortDirection) -> Comparable<'a> {
    let candidates = lookup(document, field).into_iter().flat_map(|value| match value {
        Bson::Array(items) => items.iter().collect::<Vec<_>>(),
        single => vec![single],
    });

    let chosen = match direction {
        SortDirection::Asc => candidates
            .map(Comparable::from)
            .min_by(|x, y| x.total_cmp(y)),
        SortDirection::Desc => candidates
            .map(Comparable::from)
            .max_by(|x, y| x.total_cmp(y)),
    };

    chosen.unwrap_or(Comparable::Null)
}

/// Compares two documents by the given sort keys.
pub fn compare_documents(a: &BsonDocument, b: &BsonDocument, sort: &[Sort]) -> Ordering {
    for key in sort {
        let left = sort_key(a, &key.field, key.direction);
        let right = sort_key(b, &key.field, key.direction);

        let ordering = match key.direction {
            SortDirection::Asc => left.total_cmp(&right),
            SortDirection::Desc => right.total_cmp(&left),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

/// Applies filter, stable sort, skip and limit, in that order.
pub fn apply_query<I>(documents: I, query: &StoreQuery) -> Vec<BsonDocument>
where
    I: IntoIterator<Item = BsonDocument>,
{
    let mut selected: Vec<BsonDocument> = match &query.filter {
        Some(filter) => documents.into_iter().filter(|doc| matches(doc, filter)).collect(),
        None => documents.into_iter().collect(),
    };

    if !query.sort.is_empty() {
        selected.sort_by(|a, b| compare_documents(a, b, &query.sort));
    }

    let skip = query.skip.map_or(0, |s| usize::try_from(s).unwrap_or(usize::MAX));
    let limit = query.limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

    selected.into_iter().skip(skip).take(limit).collect()
}
