//! List envelope normalisation and page translation for console collections.
//!
//! Backend list endpoints are inconsistent: some return a bare JSON array,
//! some wrap rows in `{ "content": [...] }`, others in `{ "data": [...] }` or a
//! field named after the entity. This crate folds all of them into one
//! [`NormalizedList`] and keeps the 0-based page state used by screens apart
//! from the 1-based `page` query parameter the backend expects.
//!
//! # Example
//!
//! ```
//! use pagination::{EnvelopeShape, PageRequest, normalize_list};
//! use serde_json::json;
//!
//! let list = normalize_list(&json!({ "content": [{ "id": 1 }], "totalElements": 9 }), "users");
//! assert_eq!(list.shape, EnvelopeShape::Content);
//! assert_eq!(list.total, 9);
//!
//! let page = PageRequest::new(0, 20).expect("valid page");
//! assert_eq!(page.backend_page(), 1);
//! ```

mod envelope;
mod page;

pub use envelope::{EnvelopeShape, NormalizedList, TOTAL_FIELDS, normalize_list};
pub use page::{ListQuery, PageRequest, PageRequestError};
