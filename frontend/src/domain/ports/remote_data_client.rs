//! Driven port for the backend REST API.
//!
//! The port makes no assumption about response shape: it hands back the raw
//! decoded JSON body and leaves normalisation to the caller.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use super::define_port_error;
use crate::domain::AuthDomain;

/// HTTP verb for an [`ApiRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    /// Read.
    Get,
    /// Create or action.
    Post,
    /// Replace.
    Put,
    /// Remove.
    Delete,
}

impl HttpMethod {
    /// Upper-case verb.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file sent as a multipart form part.
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// Form field name.
    pub field: String,
    /// File name reported to the backend.
    pub file_name: String,
    /// MIME type, when known.
    pub content_type: Option<String>,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("field", &self.field)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// JSON document.
    Json(Value),
    /// Multipart form with one file part.
    File(FileUpload),
}

/// Transport-agnostic request descriptor.
///
/// # Examples
/// ```
/// use frontend::domain::AuthDomain;
/// use frontend::domain::ports::{ApiRequest, HttpMethod};
///
/// let request = ApiRequest::get(AuthDomain::Admin, "/admin/users")
///     .with_query(vec![("page".into(), "1".into())]);
/// assert_eq!(request.method, HttpMethod::Get);
/// assert_eq!(request.query_value("page"), Some("1"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP verb.
    pub method: HttpMethod,
    /// Path relative to the domain's base URL, starting with `/`.
    pub path: String,
    /// Query parameters in order.
    pub query: Vec<(String, String)>,
    /// Optional body.
    pub body: Option<RequestBody>,
    /// Credential scope used for the bearer token.
    pub domain: AuthDomain,
    /// Send without a bearer token even when the domain is signed in.
    pub anonymous: bool,
}

impl ApiRequest {
    fn new(method: HttpMethod, domain: AuthDomain, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            domain,
            anonymous: false,
        }
    }

    /// `GET path`.
    pub fn get(domain: AuthDomain, path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, domain, path)
    }

    /// `POST path` with a JSON body.
    pub fn post(domain: AuthDomain, path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, domain, path).with_body(RequestBody::Json(body))
    }

    /// `PUT path` with a JSON body.
    pub fn put(domain: AuthDomain, path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Put, domain, path).with_body(RequestBody::Json(body))
    }

    /// `DELETE path`.
    pub fn delete(domain: AuthDomain, path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, domain, path)
    }

    /// `POST path` with a multipart file body.
    pub fn upload(domain: AuthDomain, path: impl Into<String>, file: FileUpload) -> Self {
        Self::new(HttpMethod::Post, domain, path).with_body(RequestBody::File(file))
    }

    /// Replace the query parameters.
    #[must_use]
    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    /// Replace the body.
    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Never attach the domain's bearer token. Used by the login call.
    #[must_use]
    pub fn without_credentials(mut self) -> Self {
        self.anonymous = true;
        self
    }

    /// First query value for `name`.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// JSON body, if any.
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            Some(RequestBody::Json(value)) => Some(value),
            _ => None,
        }
    }
}

define_port_error! {
    /// Failures surfaced by the remote data client. None are retried.
    pub enum RemoteError {
        /// The backend answered 401/403 to a request carrying this domain's
        /// bearer token. The credential has already been destroyed.
        AuthExpired { domain: AuthDomain } =>
            "{domain} session rejected by the backend",
        /// Transport failure or timeout.
        Network { message: String } =>
            "network failure: {message}",
        /// Non-success status, with the backend's error message if it sent one.
        Rejected { status: u16, message: Option<String> } =>
            "backend rejected request with status {status}",
        /// The body was not valid JSON.
        Decode { message: String } =>
            "response body could not be decoded: {message}",
    }
}

/// Port for issuing authenticated requests against the backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteDataClient: Send + Sync {
    /// Issue `request` and return the decoded body (`null` when empty).
    async fn request(&self, request: ApiRequest) -> Result<Value, RemoteError>;
}
