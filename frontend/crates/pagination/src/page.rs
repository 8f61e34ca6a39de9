//! Page state and list query construction.
//!
//! Screens keep a 0-based page index. The backend `page` query parameter is
//! 1-based, so every list request goes through [`PageRequest::backend_page`].

use serde::Serialize;
use thiserror::Error;
use url::Url;

/// Validation failures for [`PageRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PageRequestError {
    /// Page size must be at least one row.
    #[error("page size must be greater than zero")]
    ZeroSize,
    /// The 0-based page cannot be translated without overflowing.
    #[error("page index {page} is too large")]
    PageOverflow {
        /// Rejected 0-based page index.
        page: u32,
    },
}

/// A 0-based page index paired with a non-zero page size.
///
/// # Examples
///
/// ```
/// use pagination::PageRequest;
///
/// let page = PageRequest::new(4, 25).expect("valid page");
/// assert_eq!(page.page(), 4);
/// assert_eq!(page.backend_page(), 5);
/// assert_eq!(page.first().page(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    /// Build a page request from a 0-based index and a page size.
    ///
    /// # Errors
    ///
    /// Returns [`PageRequestError::ZeroSize`] when `size` is zero and
    /// [`PageRequestError::PageOverflow`] when `page + 1` does not fit.
    pub const fn new(page: u32, size: u32) -> Result<Self, PageRequestError> {
        if size == 0 {
            return Err(PageRequestError::ZeroSize);
        }
        if page == u32::MAX {
            return Err(PageRequestError::PageOverflow { page });
        }
        Ok(Self { page, size })
    }

    /// First page with the given size.
    ///
    /// # Errors
    ///
    /// Returns [`PageRequestError::ZeroSize`] when `size` is zero.
    pub const fn first_of(size: u32) -> Result<Self, PageRequestError> {
        Self::new(0, size)
    }

    /// 0-based page index as held by screens.
    #[must_use]
    pub const fn page(self) -> u32 {
        self.page
    }

    /// Rows per page.
    #[must_use]
    pub const fn size(self) -> u32 {
        self.size
    }

    /// 1-based page number sent to the backend.
    #[must_use]
    pub const fn backend_page(self) -> u32 {
        self.page + 1
    }

    /// Same size, page reset to 0.
    #[must_use]
    pub const fn first(self) -> Self {
        Self {
            page: 0,
            size: self.size,
        }
    }

    /// Same size, different page.
    ///
    /// # Errors
    ///
    /// Returns [`PageRequestError::PageOverflow`] for `u32::MAX`.
    pub const fn with_page(self, page: u32) -> Result<Self, PageRequestError> {
        Self::new(page, self.size)
    }
}

/// Query parameters for one list request.
///
/// Pagination parameters come first, followed by filters in insertion order.
///
/// # Examples
///
/// ```
/// use pagination::{ListQuery, PageRequest};
/// use url::Url;
///
/// let page = PageRequest::new(0, 20).expect("valid page");
/// let query = ListQuery::paged(page).with_filter("status", "active");
/// let mut url = Url::parse("https://api.example.test/admin/users").expect("url");
/// query.apply_to(&mut url);
/// assert_eq!(url.query(), Some("page=1&size=20&status=active"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListQuery {
    page: Option<PageRequest>,
    filters: Vec<(String, String)>,
}

impl ListQuery {
    /// Query for an endpoint that is not paginated.
    #[must_use]
    pub fn unpaged() -> Self {
        Self::default()
    }

    /// Query for one page of a paginated endpoint.
    #[must_use]
    pub fn paged(page: PageRequest) -> Self {
        Self {
            page: Some(page),
            filters: Vec::new(),
        }
    }

    /// Append a filter parameter.
    #[must_use]
    pub fn with_filter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((name.into(), value.into()));
        self
    }

    /// Page requested by this query, if any.
    #[must_use]
    pub const fn page(&self) -> Option<PageRequest> {
        self.page
    }

    /// Flatten into ordered `(name, value)` pairs with the page translated to
    /// the backend's 1-based numbering.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.filters.len() + 2);
        if let Some(page) = self.page {
            pairs.push(("page".to_owned(), page.backend_page().to_string()));
            pairs.push(("size".to_owned(), page.size().to_string()));
        }
        pairs.extend(self.filters.iter().cloned());
        pairs
    }

    /// Append this query to `url`, keeping any parameters already present.
    pub fn apply_to(&self, url: &mut Url) {
        let pairs = self.to_pairs();
        if pairs.is_empty() {
            return;
        }
        url.query_pairs_mut().extend_pairs(pairs);
    }
}
