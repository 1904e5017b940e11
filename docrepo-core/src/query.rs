//! Store-agnostic query representation.
//!
//! This module holds the predicate tree ([`Expr`]) that every criteria surface compiles into,
//! the sort keys ([`Sort`]), the [`StoreQuery`] handed to backends, and the [`QueryVisitor`]
//! used by backends and the pipeline to walk predicates.
//!
//! # Filter Expression API
//!
//! The [`Filter`] struct builds untyped expressions by field path:
//!
//! - Comparison: `eq`, `ne`, `gt`, `gte`, `lt`, `lte`
//! - String: `starts_with`, `ends_with`, `contains`, `not_contains`
//! - Existence: `exists`, `not_exists`
//! - Array: `any_of`, `none_of`
//! - Logical: `and`, `or`
//!
//! Untyped expressions are resolved against the document shape when a repository executes them.
//!
//! ```ignore
//! use docrepo::query::Filter;
//!
//! let expr = Filter::eq("borough", "Manhattan")
//!     .and(Filter::contains("name", "Do"));
//! ```

use bson::Bson;

use crate::error::DocumentStoreError;

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// A single sort key: the field path and its direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sort {
    /// The field path to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl Sort {
    /// Creates a sort key from a field path and a descending flag.
    pub fn key(field: impl Into<String>, descending: bool) -> Self {
        Sort {
            field: field.into(),
            direction: if descending { SortDirection::Desc } else { SortDirection::Asc },
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::key(field, false)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::key(field, true)
    }
}

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldOp {
    /// Equal to (exact match).
    Eq,
    /// Not equal to.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// String contains substring, or array contains value (all values when given an array).
    Contains,
    /// Negation of [`FieldOp::Contains`].
    NotContains,
    /// String starts with value.
    StartsWith,
    /// String ends with value.
    EndsWith,
    /// Field (or any array element) equals any of the values.
    AnyOf,
    /// Field (and every array element) equals none of the values.
    NoneOf,
}

/// A filter expression for querying documents.
///
/// Expressions can be combined using logical operators (`And`, `Or`, `Not`)
/// to build complex filter predicates.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match).
    And(Vec<Expr>),
    /// Logical OR of multiple expressions (any must match).
    Or(Vec<Expr>),
    /// Logical NOT of an expression (inverts the result).
    Not(Box<Expr>),
    /// Checks if a field exists or doesn't exist.
    Exists(String, bool),
    /// Field comparison expression.
    Field {
        /// The field path to compare.
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    ///
    /// If this expression is already an OR, the other expression is appended
    /// to the list. Otherwise, a new OR expression is created.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression (logical NOT).
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Returns `true` if `pred` holds for any field operator used in this tree.
    pub fn any_op(&self, pred: &impl Fn(FieldOp) -> bool) -> bool {
        match self {
            Expr::And(exprs) | Expr::Or(exprs) => exprs.iter().any(|e| e.any_op(pred)),
            Expr::Not(expr) => expr.any_op(pred),
            Expr::Exists(..) => false,
            Expr::Field { op, .. } => pred(*op),
        }
    }
}

/// A fully resolved query as handed to a store backend.
///
/// Backends apply `filter`, then every key of `sort` in order (stable), then `skip` and `limit`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreQuery {
    /// Optional filter expression to match documents.
    pub filter: Option<Expr>,
    /// Sort keys, most significant first.
    pub sort: Vec<Sort>,
    /// Number of documents to skip.
    pub skip: Option<u64>,
    /// Maximum number of documents to return.
    pub limit: Option<u64>,
}

impl StoreQuery {
    /// Creates a new empty query with no filters or limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> StoreQueryBuilder {
        StoreQueryBuilder::new()
    }

    /// The same query with paging removed.
    pub fn unpaged(&self) -> Self {
        StoreQuery {
            filter: self.filter.clone(),
            sort: self.sort.clone(),
            skip: None,
            limit: None,
        }
    }
}

/// Helper struct for constructing untyped filter expressions.
///
/// All methods accept field paths and values as `Into<String>` and `Into<Bson>`.
pub struct Filter;

macro_rules! field_filters {
    ($($(#[$meta:meta])* $name:ident => $op:ident;)*) => {
        $(
            $(#[$meta])*
            pub fn $name(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
                Expr::field(field.into(), FieldOp::$op, value.into())
            }
        )*
    };
}

impl Filter {
    field_filters! {
        /// Field equals the value.
        eq => Eq;
        ne => Ne;
        gt => Gt;
        gte => Gte;
        lt => Lt;
        lte => Lte;
        /// String field begins with the value.
        starts_with => StartsWith;
        ends_with => EndsWith;
        /// String field contains the value as a substring, or array field contains the
        /// element (every element, when the value is itself an array).
        contains => Contains;
        not_contains => NotContains;
        /// Field, or any of its elements, equals one of the values.
        any_of => AnyOf;
        none_of => NoneOf;
    }

    /// Field is present. A stored `null` counts as present.
    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    /// All of `exprs` must match. An empty list matches everything.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    /// Any of `exprs` must match. An empty list matches nothing.
    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreQueryBuilder {
    query: StoreQuery,
}

impl StoreQueryBuilder {
    pub fn new() -> Self {
        StoreQueryBuilder { query: StoreQuery::default() }
    }

    /// Sets the filter expression for this query.
    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    /// Appends a sort key. Keys are applied in the order they are added.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort.push(Sort { field: field.into(), direction });
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.query.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.query.limit = Some(limit);
        self
    }

    pub fn build(self) -> StoreQuery {
        self.query
    }
}

pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_chains_flatten_left() {
        let chained = Filter::eq("a", 1).and(Filter::eq("b", 2)).and(Filter::eq("c", 3));

        assert_eq!(
            chained,
            Filter::and([Filter::eq("a", 1), Filter::eq("b", 2), Filter::eq("c", 3)])
        );
    }

    #[test]
    fn any_op_walks_nested_trees() {
        let expr = Filter::eq("a", 1).or(Filter::contains("b", "x").not());

        assert!(expr.any_op(&|op| op == FieldOp::Contains));
        assert!(!expr.any_op(&|op| op == FieldOp::Gt));
    }

    #[test]
    fn builder_keeps_sort_order() {
        let query = StoreQuery::builder()
            .sort("borough", SortDirection::Asc)
            .sort("name", SortDirection::Desc)
            .skip(10)
            .limit(5)
            .build();

        assert_eq!(query.sort, vec![Sort::asc("borough"), Sort::desc("name")]);
        assert_eq!(query.unpaged().skip, None);
    }
}
