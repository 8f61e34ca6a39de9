//! Reqwest-backed remote data client.
//!
//! This adapter owns transport details only: URL construction, bearer
//! attachment, timeout and status mapping, and body decoding. It is also the
//! one place that expires a credential when the backend rejects it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::dto::ErrorEnvelopeDto;
use crate::domain::ports::{
    ApiRequest, FileUpload, HttpMethod, RemoteDataClient, RemoteError, RequestBody,
};
use crate::domain::{AuthDomain, SessionProvider, token_fingerprint};

/// Base URL per authentication domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEndpoints {
    /// Rider and driver API root.
    pub rider: Url,
    /// Admin API root.
    pub admin: Url,
}

impl BackendEndpoints {
    /// Root URL for `domain`.
    pub fn base(&self, domain: AuthDomain) -> &Url {
        match domain {
            AuthDomain::Rider => &self.rider,
            AuthDomain::Admin => &self.admin,
        }
    }
}

/// [`RemoteDataClient`] that talks to the backend over HTTP.
pub struct HttpRemoteClient {
    client: Client,
    endpoints: BackendEndpoints,
    session: Arc<SessionProvider>,
}

impl HttpRemoteClient {
    /// Build a client with a bounded per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        endpoints: BackendEndpoints,
        timeout: Duration,
        session: Arc<SessionProvider>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoints,
            session,
        })
    }

    /// Session provider consulted for bearer tokens.
    pub fn session(&self) -> &Arc<SessionProvider> {
        &self.session
    }
}

#[async_trait]
impl RemoteDataClient for HttpRemoteClient {
    async fn request(&self, request: ApiRequest) -> Result<Value, RemoteError> {
        let url = endpoint_url(self.endpoints.base(request.domain), &request)?;
        let bearer = if request.anonymous {
            None
        } else {
            self.session.bearer_token(request.domain)
        };

        let mut builder = self
            .client
            .request(to_method(request.method), url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = bearer.as_ref() {
            builder = builder.bearer_auth(token.as_str());
        }
        builder = match request.body {
            Some(RequestBody::Json(body)) => builder.json(&body),
            Some(RequestBody::File(file)) => builder.multipart(upload_form(file)?),
            None => builder,
        };

        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;

        if is_auth_rejection(status) {
            if let Some(token) = bearer {
                return Err(self.expire(request.domain, &token, status).await);
            }
        }
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        Ok(decode_body(body.as_ref()))
    }
}

impl HttpRemoteClient {
    async fn expire(
        &self,
        domain: AuthDomain,
        token: &Zeroizing<String>,
        status: StatusCode,
    ) -> RemoteError {
        warn!(
            %domain,
            status = status.as_u16(),
            fingerprint = %token_fingerprint(token),
            "backend rejected bearer token"
        );
        self.session.expire(domain, token).await;
        RemoteError::auth_expired(domain)
    }
}

fn endpoint_url(base: &Url, request: &ApiRequest) -> Result<Url, RemoteError> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        request.path.trim_start_matches('/')
    );
    let mut url = Url::parse(&joined)
        .map_err(|error| RemoteError::network(format!("invalid request URL {joined}: {error}")))?;
    if !request.query.is_empty() {
        url.query_pairs_mut().extend_pairs(request.query.iter());
    }
    Ok(url)
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn upload_form(file: FileUpload) -> Result<Form, RemoteError> {
    let mut part = Part::bytes(file.bytes).file_name(file.file_name);
    if let Some(content_type) = file.content_type {
        part = part
            .mime_str(&content_type)
            .map_err(|error| RemoteError::network(format!("invalid content type: {error}")))?;
    }
    Ok(Form::new().part(file.field, part))
}

fn is_auth_rejection(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

fn map_transport_error(error: reqwest::Error) -> RemoteError {
    if error.is_timeout() {
        RemoteError::network(format!("request timed out: {error}"))
    } else {
        RemoteError::network(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> RemoteError {
    let message = ErrorEnvelopeDto::parse(body);
    if message.is_none() {
        debug!(status = status.as_u16(), body = %body_preview(body), "error body carried no message");
    }
    RemoteError::Rejected {
        status: status.as_u16(),
        message,
    }
}

/// Decode a success body. Blank bodies are `null`; bodies that are not JSON,
/// such as a plain-text confirmation, come back as a JSON string so the
/// completed request still counts as a success.
fn decode_body(body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(body).unwrap_or_else(|error| {
        debug!(%error, body = %body_preview(body), "success body is not JSON; keeping it as text");
        Value::String(String::from_utf8_lossy(body).trim().to_owned())
    })
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 120;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview: String = compact.chars().take(PREVIEW_CHAR_LIMIT).collect();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network mapping helpers.

    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn base(raw: &str) -> Url {
        Url::parse(raw).expect("valid base")
    }

    #[rstest]
    #[case("https://api.example.test", "/admin/users", "https://api.example.test/admin/users")]
    #[case("https://api.example.test/v1/", "/admin/users", "https://api.example.test/v1/admin/users")]
    #[case("https://api.example.test/v1", "tracking/active", "https://api.example.test/v1/tracking/active")]
    fn paths_keep_the_base_prefix(#[case] root: &str, #[case] path: &str, #[case] expected: &str) {
        let request = ApiRequest::get(AuthDomain::Admin, path);
        let url = endpoint_url(&base(root), &request).expect("valid url");
        assert_eq!(url.as_str(), expected);
    }

    #[rstest]
    fn query_pairs_are_appended_in_order() {
        let request = ApiRequest::get(AuthDomain::Admin, "/admin/trips").with_query(vec![
            ("page".into(), "1".into()),
            ("size".into(), "20".into()),
            ("status".into(), "IN PROGRESS".into()),
        ]);
        let url = endpoint_url(&base("https://api.example.test"), &request).expect("valid url");
        assert_eq!(url.query(), Some("page=1&size=20&status=IN+PROGRESS"));
    }

    #[rstest]
    #[case(br#"{"message":"Zone already exists","status":409}"#.as_slice(), Some("Zone already exists"))]
    #[case(br#"{"error":"Bad Request"}"#.as_slice(), Some("Bad Request"))]
    #[case(br#"{"message":"  ","error":"Conflict"}"#.as_slice(), Some("Conflict"))]
    #[case(b"<html>502</html>".as_slice(), None)]
    fn status_errors_carry_server_message(#[case] body: &[u8], #[case] expected: Option<&str>) {
        let error = map_status_error(StatusCode::CONFLICT, body);
        assert_eq!(
            error,
            RemoteError::Rejected {
                status: 409,
                message: expected.map(str::to_owned),
            }
        );
    }

    #[rstest]
    #[case(b"".as_slice(), json!(null))]
    #[case(b"  \n".as_slice(), json!(null))]
    #[case(br#"[{"id":1}]"#.as_slice(), json!([{ "id": 1 }]))]
    #[case(b"Coupon deleted successfully\n".as_slice(), json!("Coupon deleted successfully"))]
    #[case(b"{truncated".as_slice(), json!("{truncated"))]
    fn bodies_decode_to_values(#[case] body: &[u8], #[case] expected: Value) {
        assert_eq!(decode_body(body), expected);
    }

    #[rstest]
    #[case(StatusCode::UNAUTHORIZED, true)]
    #[case(StatusCode::FORBIDDEN, true)]
    #[case(StatusCode::NOT_FOUND, false)]
    fn only_401_and_403_expire(#[case] status: StatusCode, #[case] expected: bool) {
        assert_eq!(is_auth_rejection(status), expected);
    }
}
