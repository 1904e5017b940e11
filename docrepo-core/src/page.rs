//! Page windows and paginated results.
//!
//! Pages are 1-indexed: page `n` of size `s` skips `(n - 1) * s` documents and takes `s`.
//! Page numbers and sizes below 1 are rejected, never clamped.

use serde::{Deserialize, Serialize};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// An (offset, limit) window over an ordered result.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageWindow {
    offset: u64,
    limit: u64,
}

impl PageWindow {
    /// A window from a raw offset and limit. The limit must be at least 1.
    pub fn new(offset: u64, limit: u64) -> DocumentStoreResult<Self> {
        if limit < 1 {
            return Err(DocumentStoreError::InvalidArgument(format!(
                "page limit must be at least 1, got {limit}"
            )));
        }

        Ok(Self { offset, limit })
    }

    /// The window for 1-indexed page `page_number` of `page_size` documents.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidArgument`] if either argument is below 1.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let window = PageWindow::page(3, 35)?;
    /// assert_eq!(window.offset(), 70);
    /// ```
    pub fn page(page_number: u64, page_size: u64) -> DocumentStoreResult<Self> {
        if page_number < 1 {
            return Err(DocumentStoreError::InvalidArgument(format!(
                "page number must be at least 1, got {page_number}"
            )));
        }
        if page_size < 1 {
            return Err(DocumentStoreError::InvalidArgument(format!(
                "page size must be at least 1, got {page_size}"
            )));
        }

        let offset = (page_number - 1)
            .checked_mul(page_size)
            .ok_or_else(|| DocumentStoreError::InvalidArgument("page offset overflows".into()))?;

        Ok(Self { offset, limit: page_size })
    }

    /// Number of documents to skip.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Maximum number of documents to take.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// The first document of this window only.
    pub fn first(&self) -> Self {
        Self { offset: self.offset, limit: 1 }
    }
}

/// A single page of results with navigation metadata.
///
/// # Example
///
/// ```ignore
/// let page: Page<String> = Page::builder(vec!["item1".to_string()])
///     .with_count(100)
///     .with_next_page(Some(2))
///     .build();
///
/// assert_eq!(page.items.len(), 1);
/// assert_eq!(page.count, 100);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The items contained in this page.
    pub items: Vec<T>,
    /// Total count of matching items across all pages.
    pub count: u64,
    /// The next page number (if more pages exist).
    pub next_page: Option<u64>,
    /// The previous page number (if this is not the first page).
    pub previous_page: Option<u64>,
}

impl<T> Page<T> {
    pub fn builder(items: Vec<T>) -> PageBuilder<T> {
        PageBuilder::new(items)
    }

    /// Builds the page for `items` fetched as page `page_number` of `page_size` out of `count`.
    pub fn assemble(items: Vec<T>, count: u64, page_number: u64, page_size: u64) -> Self {
        let end = page_number.saturating_mul(page_size);

        Page::builder(items)
            .with_count(count)
            .with_next_page((end < count).then_some(page_number + 1))
            .with_previous_page((page_number > 1).then(|| page_number - 1))
            .build()
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            count: 0,
            next_page: None,
            previous_page: None,
        }
    }
}

/// Builder for constructing [`Page`] instances.
pub struct PageBuilder<T> {
    items: Vec<T>,
    count: u64,
    next_page: Option<u64>,
    previous_page: Option<u64>,
}

impl<T> PageBuilder<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            count: 0,
            next_page: None,
            previous_page: None,
        }
    }

    /// Sets the total count of items across all pages.
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    /// Sets the next page number (or `None` if this is the last page).
    pub fn with_next_page(mut self, next_page: Option<u64>) -> Self {
        self.next_page = next_page;
        self
    }

    /// Sets the previous page number (or `None` if this is the first page).
    pub fn with_previous_page(mut self, previous_page: Option<u64>) -> Self {
        self.previous_page = previous_page;
        self
    }

    pub fn build(self) -> Page<T> {
        Page {
            items: self.items,
            count: self.count,
            next_page: self.next_page,
            previous_page: self.previous_page,
        }
    }
}
