//! Typed field paths and predicates.
//!
//! `#[derive(Document)]` and `#[derive(Embedded)]` generate one `Field` constant per stored
//! field, so predicates and sort keys built from them can only name fields that exist and can
//! only compare against values of the field's type:
//!
//! ```ignore
//! let manhattan_do = Restaurant::BOROUGH.eq("Manhattan")
//!     .and(Restaurant::NAME.contains("Do"));
//! let by_street = Restaurant::ADDRESS.then(Address::STREET).asc();
//! ```

use std::{borrow::Cow, fmt, marker::PhantomData};

use bson::{Bson, DateTime, oid::ObjectId};

use crate::query::{Expr, FieldOp, Sort, SortDirection};

/// A stored field of document `D` holding values of type `T`.
pub struct Field<D, T> {
    path: Cow<'static, str>,
    _marker: PhantomData<fn() -> (D, T)>,
}

impl<D, T> Field<D, T> {
    pub const fn new(path: &'static str) -> Self {
        Self { path: Cow::Borrowed(path), _marker: PhantomData }
    }

    fn owned(path: String) -> Self {
        Self { path: Cow::Owned(path), _marker: PhantomData }
    }

    /// The stored dotted path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Addresses a field of the embedded value held by this field.
    pub fn then<U>(&self, child: Field<T::Inner, U>) -> Field<D, U>
    where
        T: Nested,
    {
        Field::owned(format!("{}.{}", self.path, child.path))
    }

    pub fn exists(&self) -> Predicate<D> {
        Expr::Exists(self.path.to_string(), true).into()
    }

    pub fn not_exists(&self) -> Predicate<D> {
        Expr::Exists(self.path.to_string(), false).into()
    }

    pub fn asc(&self) -> OrderBy<D> {
        self.sort(false)
    }

    pub fn desc(&self) -> OrderBy<D> {
        self.sort(true)
    }

    /// A sort key on this field, descending when `descending` is set.
    pub fn sort(&self, descending: bool) -> OrderBy<D> {
        OrderBy::new(Sort::key(self.path.to_string(), descending))
    }

    fn compare(&self, op: FieldOp, value: Bson) -> Predicate<D> {
        Expr::field(self.path.to_string(), op, value).into()
    }
}

impl<D, T> Clone for Field<D, T> {
    fn clone(&self) -> Self {
        Self { path: self.path.clone(), _marker: PhantomData }
    }
}

impl<D, T> fmt::Debug for Field<D, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Field").field(&self.path).finish()
    }
}

/// Types whose values can appear as comparison literals.
pub trait FieldValue {
    type Value: Into<Bson>;
}

macro_rules! field_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                type Value = $ty;
            }
        )*
    };
}

field_value!(String, bool, i32, i64, f64, ObjectId, DateTime, bson::Uuid);

impl<T: FieldValue> FieldValue for Option<T> {
    type Value = T::Value;
}

impl<T: FieldValue> FieldValue for Box<T> {
    type Value = T::Value;
}

impl<T: FieldValue> FieldValue for Vec<T> {
    type Value = Vec<T::Value>;
}

/// Types that hold an embedded document reachable with [`Field::then`].
pub trait Nested {
    type Inner;
}

impl<T: Nested> Nested for Option<T> {
    type Inner = T::Inner;
}

impl<T: Nested> Nested for Vec<T> {
    type Inner = T::Inner;
}

impl<T: Nested> Nested for Box<T> {
    type Inner = T::Inner;
}

impl<D, T: FieldValue> Field<D, T> {
    pub fn eq(&self, value: impl Into<T::Value>) -> Predicate<D> {
        self.compare(FieldOp::Eq, value.into().into())
    }

    pub fn ne(&self, value: impl Into<T::Value>) -> Predicate<D> {
        self.compare(FieldOp::Ne, value.into().into())
    }

    pub fn gt(&self, value: impl Into<T::Value>) -> Predicate<D> {
        self.compare(FieldOp::Gt, value.into().into())
    }

    pub fn gte(&self, value: impl Into<T::Value>) -> Predicate<D> {
        self.compare(FieldOp::Gte, value.into().into())
    }

    pub fn lt(&self, value: impl Into<T::Value>) -> Predicate<D> {
        self.compare(FieldOp::Lt, value.into().into())
    }

    pub fn lte(&self, value: impl Into<T::Value>) -> Predicate<D> {
        self.compare(FieldOp::Lte, value.into().into())
    }

    /// Matches when the field equals any of `values`.
    pub fn any_of<V: Into<T::Value>>(&self, values: impl IntoIterator<Item = V>) -> Predicate<D> {
        self.compare(FieldOp::AnyOf, Self::array(values))
    }

    pub fn none_of<V: Into<T::Value>>(&self, values: impl IntoIterator<Item = V>) -> Predicate<D> {
        self.compare(FieldOp::NoneOf, Self::array(values))
    }

    fn array<V: Into<T::Value>>(values: impl IntoIterator<Item = V>) -> Bson {
        Bson::Array(values.into_iter().map(|v| v.into().into()).collect())
    }
}

/// String operations, case-sensitive.
pub trait TextField<D> {
    fn contains(&self, value: impl Into<String>) -> Predicate<D>;
    fn starts_with(&self, value: impl Into<String>) -> Predicate<D>;
    fn ends_with(&self, value: impl Into<String>) -> Predicate<D>;
}

macro_rules! text_field {
    ($ty:ty) => {
        impl<D> TextField<D> for Field<D, $ty> {
            fn contains(&self, value: impl Into<String>) -> Predicate<D> {
                self.compare(FieldOp::Contains, Bson::String(value.into()))
            }

            fn starts_with(&self, value: impl Into<String>) -> Predicate<D> {
                self.compare(FieldOp::StartsWith, Bson::String(value.into()))
            }

            fn ends_with(&self, value: impl Into<String>) -> Predicate<D> {
                self.compare(FieldOp::EndsWith, Bson::String(value.into()))
            }
        }
    };
}

text_field!(String);
text_field!(Option<String>);

impl<D, T: FieldValue> Field<D, Vec<T>> {
    /// Matches when the array holds an element equal to `value`.
    pub fn has(&self, value: impl Into<T::Value>) -> Predicate<D> {
        self.has_all([value])
    }

    /// Matches when the array holds every one of `values`.
    pub fn has_all<V: Into<T::Value>>(&self, values: impl IntoIterator<Item = V>) -> Predicate<D> {
        self.compare(
            FieldOp::Contains,
            Bson::Array(values.into_iter().map(|v| v.into().into()).collect()),
        )
    }
}

/// A boolean condition over the fields of `D`.
pub struct Predicate<D> {
    expr: Expr,
    _marker: PhantomData<fn() -> D>,
}

impl<D> Predicate<D> {
    /// Wraps an untyped expression. Its paths are resolved against `D` when executed.
    pub fn new(expr: Expr) -> Self {
        Self { expr, _marker: PhantomData }
    }

    pub fn and(self, other: impl Into<Predicate<D>>) -> Self {
        Self::new(self.expr.and(other.into().expr))
    }

    pub fn or(self, other: impl Into<Predicate<D>>) -> Self {
        Self::new(self.expr.or(other.into().expr))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::new(self.expr.not())
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn into_expr(self) -> Expr {
        self.expr
    }
}

impl<D> From<Expr> for Predicate<D> {
    fn from(expr: Expr) -> Self {
        Self::new(expr)
    }
}

impl<D> Clone for Predicate<D> {
    fn clone(&self) -> Self {
        Self::new(self.expr.clone())
    }
}

impl<D> PartialEq for Predicate<D> {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
    }
}

impl<D> fmt::Debug for Predicate<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.expr).finish()
    }
}

/// A sort key over a field of `D`.
pub struct OrderBy<D> {
    sort: Sort,
    _marker: PhantomData<fn() -> D>,
}

impl<D> OrderBy<D> {
    pub fn new(sort: Sort) -> Self {
        Self { sort, _marker: PhantomData }
    }

    pub fn direction(&self) -> SortDirection {
        self.sort.direction
    }

    pub fn into_sort(self) -> Sort {
        self.sort
    }
}

impl<D> From<Sort> for OrderBy<D> {
    fn from(sort: Sort) -> Self {
        Self::new(sort)
    }
}

impl<D> Clone for OrderBy<D> {
    fn clone(&self) -> Self {
        Self::new(self.sort.clone())
    }
}

impl<D> fmt::Debug for OrderBy<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OrderBy").field(&self.sort).finish()
    }
}
