//! The criteria representation shared by the typed and dynamic surfaces.
//!
//! A [`Criteria`] is a predicate tree, an ordered list of sort keys and an optional page
//! window. It is immutable: every combinator returns a new value and leaves the receiver
//! untouched, so a criteria can be shared and extended freely. Two equal criteria always
//! produce the same result against the same data.

use std::{fmt, marker::PhantomData};

use crate::{
    document::Document,
    dynamic,
    error::{DocumentStoreError, DocumentStoreResult},
    field::{OrderBy, Predicate},
    page::PageWindow,
    query::{Expr, Sort, StoreQuery},
};

pub struct Criteria<D> {
    filter: Option<Expr>,
    sort: Vec<Sort>,
    page: Option<PageWindow>,
    _marker: PhantomData<fn() -> D>,
}

impl<D> Criteria<D> {
    /// Criteria matching every document in arrival order.
    pub fn new() -> Self {
        Self {
            filter: None,
            sort: Vec::new(),
            page: None,
            _marker: PhantomData,
        }
    }

    pub fn builder() -> CriteriaBuilder<D> {
        CriteriaBuilder::new()
    }

    pub fn filter(&self) -> Option<&Expr> {
        self.filter.as_ref()
    }

    pub fn sort(&self) -> &[Sort] {
        &self.sort
    }

    pub fn page_window(&self) -> Option<PageWindow> {
        self.page
    }

    /// Restricts the filter with `predicate`.
    pub fn and(&self, predicate: impl Into<Predicate<D>>) -> Self {
        let expr = predicate.into().into_expr();
        self.with_filter(Some(match &self.filter {
            Some(current) => current.clone().and(expr),
            None => expr,
        }))
    }

    /// Widens the filter with `predicate`. A criteria without a filter already matches everything.
    pub fn or(&self, predicate: impl Into<Predicate<D>>) -> Self {
        let expr = predicate.into().into_expr();
        match &self.filter {
            Some(current) => self.with_filter(Some(current.clone().or(expr))),
            None => self.clone(),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(&self) -> Self {
        let current = self.filter.clone().unwrap_or(Expr::And(Vec::new()));
        self.with_filter(Some(current.not()))
    }

    /// Appends a sort key after the existing ones.
    pub fn order_by(&self, key: impl Into<OrderBy<D>>) -> Self {
        let mut next = self.clone();
        next.sort.push(key.into().into_sort());
        next
    }

    /// Replaces the page window.
    pub fn with_page(&self, window: PageWindow) -> Self {
        let mut next = self.clone();
        next.page = Some(window);
        next
    }

    /// Replaces the page window with 1-indexed page `page_number` of `page_size`.
    pub fn page(&self, page_number: u64, page_size: u64) -> DocumentStoreResult<Self> {
        Ok(self.with_page(PageWindow::page(page_number, page_size)?))
    }

    pub fn without_page(&self) -> Self {
        let mut next = self.clone();
        next.page = None;
        next
    }

    fn with_filter(&self, filter: Option<Expr>) -> Self {
        let mut next = self.clone();
        next.filter = filter;
        next
    }

    pub(crate) fn with_sort(&self, sort: Vec<Sort>) -> Self {
        let mut next = self.clone();
        next.sort = sort;
        next
    }

    pub(crate) fn to_query(&self) -> StoreQuery {
        StoreQuery {
            filter: self.filter.clone(),
            sort: self.sort.clone(),
            skip: self.page.map(|w| w.offset()),
            limit: self.page.map(|w| w.limit()),
        }
    }
}

impl<D: Document> Criteria<D> {
    /// Compiles a dynamic filter string.
    pub fn parse(filter: &str) -> DocumentStoreResult<Self> {
        Ok(dynamic::compile_filter::<D>(filter)?.into())
    }

    /// Compiles a dynamic filter string and a dynamic order string.
    pub fn parse_ordered(filter: &str, order: &str) -> DocumentStoreResult<Self> {
        let criteria = Self::parse(filter)?;
        Ok(criteria.with_sort(dynamic::compile_order::<D>(order)?))
    }
}

impl<D> Default for Criteria<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for Criteria<D> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            sort: self.sort.clone(),
            page: self.page,
            _marker: PhantomData,
        }
    }
}

impl<D> PartialEq for Criteria<D> {
    fn eq(&self, other: &Self) -> bool {
        self.filter == other.filter && self.sort == other.sort && self.page == other.page
    }
}

impl<D> fmt::Debug for Criteria<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Criteria")
            .field("filter", &self.filter)
            .field("sort", &self.sort)
            .field("page", &self.page)
            .finish()
    }
}

impl<D> From<Predicate<D>> for Criteria<D> {
    fn from(predicate: Predicate<D>) -> Self {
        Criteria::new().and(predicate)
    }
}

impl<D> From<Expr> for Criteria<D> {
    fn from(expr: Expr) -> Self {
        Criteria::new().and(expr)
    }
}

impl<D> From<OrderBy<D>> for Criteria<D> {
    fn from(key: OrderBy<D>) -> Self {
        Criteria::new().order_by(key)
    }
}

impl<D> From<&Criteria<D>> for Criteria<D> {
    fn from(criteria: &Criteria<D>) -> Self {
        criteria.clone()
    }
}

/// Composes filter, sort and page into one [`Criteria`].
///
/// Fallible steps (dynamic strings, page bounds) record the first error, which
/// [`build`](CriteriaBuilder::build) returns.
///
/// ```ignore
/// let criteria = Criteria::<Restaurant>::builder()
///     .filter_str(r#"borough.Equals("Manhattan")"#)
///     .order_by(Restaurant::NAME.asc())
///     .page(2, 20)
///     .build()?;
/// ```
pub struct CriteriaBuilder<D> {
    criteria: Criteria<D>,
    error: Option<DocumentStoreError>,
}

impl<D> CriteriaBuilder<D> {
    pub fn new() -> Self {
        Self { criteria: Criteria::new(), error: None }
    }

    pub fn filter(mut self, predicate: impl Into<Predicate<D>>) -> Self {
        self.criteria = self.criteria.and(predicate);
        self
    }

    pub fn order_by(mut self, key: impl Into<OrderBy<D>>) -> Self {
        self.criteria = self.criteria.order_by(key);
        self
    }

    pub fn page(self, page_number: u64, page_size: u64) -> Self {
        let window = PageWindow::page(page_number, page_size);
        self.record(window.map(|w| move |c: Criteria<D>| c.with_page(w)))
    }

    pub fn window(mut self, window: PageWindow) -> Self {
        self.criteria = self.criteria.with_page(window);
        self
    }

    pub fn build(self) -> DocumentStoreResult<Criteria<D>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.criteria),
        }
    }

    fn record(mut self, step: DocumentStoreResult<impl FnOnce(Criteria<D>) -> Criteria<D>>) -> Self {
        if self.error.is_some() {
            return self;
        }

        match step {
            Ok(apply) => self.criteria = apply(self.criteria),
            Err(err) => self.error = Some(err),
        }
        self
    }
}

impl<D: Document> CriteriaBuilder<D> {
    /// Adds a dynamic filter string, combined with AND.
    pub fn filter_str(self, filter: &str) -> Self {
        let compiled = dynamic::compile_filter::<D>(filter);
        self.record(compiled.map(|p| move |c: Criteria<D>| c.and(p)))
    }

    /// Appends the keys of a dynamic order string.
    pub fn order_str(self, order: &str) -> Self {
        let compiled = dynamic::compile_order::<D>(order);
        self.record(compiled.map(|keys| {
            move |c: Criteria<D>| keys.into_iter().fold(c, |c, key| c.order_by(key))
        }))
    }
}

impl<D> Default for CriteriaBuilder<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Filter;

    struct Doc;

    #[test]
    fn combinators_leave_the_receiver_untouched() {
        let base = Criteria::<Doc>::from(Filter::eq("a", 1));
        let narrowed = base.and(Filter::eq("b", 2));

        assert_eq!(base.filter(), Some(&Filter::eq("a", 1)));
        assert_eq!(narrowed.filter(), Some(&Filter::eq("a", 1).and(Filter::eq("b", 2))));
    }

    #[test]
    fn or_on_unfiltered_criteria_still_matches_everything() {
        let all = Criteria::<Doc>::new();

        assert_eq!(all.or(Filter::eq("a", 1)), all);
    }

    #[test]
    fn not_on_unfiltered_criteria_matches_nothing() {
        let none = Criteria::<Doc>::new().not();

        assert_eq!(none.filter(), Some(&Expr::And(vec![]).not()));
    }

    #[test]
    fn builder_keeps_first_error() {
        let result = Criteria::<Doc>::builder()
            .filter(Filter::eq("a", 1))
            .page(0, 10)
            .page(1, 0)
            .build();

        match result {
            Err(DocumentStoreError::InvalidArgument(msg)) => assert!(msg.contains("page number")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn equal_compositions_compare_equal() {
        let a = Criteria::<Doc>::new()
            .and(Filter::eq("a", 1))
            .order_by(Sort::desc("b"))
            .page(2, 5)
            .unwrap();
        let b = Criteria::<Doc>::builder()
            .filter(Filter::eq("a", 1))
            .order_by(Sort::desc("b"))
            .page(2, 5)
            .build()
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(a.to_query().skip, Some(5));
        assert_eq!(a.to_query().limit, Some(5));
    }
}
