//! Session-scoped request dispatcher.
//!
//! # Design
//! `Routes` is the handle every bound record carries. It owns nothing but an
//! `Arc` to the session (base URL, `Authorization` value, transport), so
//! cloning it into each decoded record is cheap and all records from one
//! client share one connection pool.
//!
//! Requests are built as plain `HttpRequest` data, executed through the
//! `Transport`, then checked with `check_status`. Bodies are decoded into
//! `serde_json::Value`: empty bodies become `null`, non-JSON bodies become
//! `{"body": "<text>"}`. Typed decoding (`item`, `items`, `included`) binds
//! every resulting record to this same session.

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Multipart, Transport};
use crate::record::{FieldMap, Record};

struct Session {
    base_url: String,
    authorization: Option<String>,
    transport: Arc<dyn Transport>,
}

/// Cloneable handle to an authenticated session.
#[derive(Clone)]
pub struct Routes {
    session: Arc<Session>,
}

impl fmt::Debug for Routes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routes")
            .field("base_url", &self.session.base_url)
            .field("authorized", &self.session.authorization.is_some())
            .finish()
    }
}

impl Routes {
    pub fn new(base_url: &str, transport: Arc<dyn Transport>, authorization: Option<String>) -> Self {
        Self {
            session: Arc::new(Session {
                base_url: base_url.trim_end_matches('/').to_string(),
                authorization,
                transport,
            }),
        }
    }

    /// Same transport and base URL, different credentials.
    pub fn with_authorization(&self, authorization: String) -> Self {
        Self::new(
            &self.session.base_url,
            Arc::clone(&self.session.transport),
            Some(authorization),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.session.base_url
    }

    pub fn is_authorized(&self) -> bool {
        self.session.authorization.is_some()
    }

    /// Absolute URL for an endpoint path; absolute inputs pass through.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{path}", self.session.base_url)
        } else {
            format!("{}/{path}", self.session.base_url)
        }
    }

    pub fn build_request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        let mut req = HttpRequest::new(method, self.url(path)).header("accept", "application/json");
        if let Some(auth) = &self.session.authorization {
            req = req.header("authorization", auth.clone());
        }
        req
    }

    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method;
        let url = request.url.clone();
        let response = self.session.transport.execute(request)?;
        debug!(%method, %url, status = response.status, "planka request");
        check_status(method, &url, &response)?;
        Ok(response)
    }

    /// One JSON round trip. `fields` becomes the request body when given.
    pub fn dispatch(&self, method: HttpMethod, path: &str, fields: Option<&FieldMap>) -> Result<Value> {
        let mut request = self.build_request(method, path);
        if let Some(fields) = fields {
            let body = serde_json::to_vec(fields).map_err(|e| ApiError::SerializationError(e.to_string()))?;
            request = request.json(body);
        }
        let response = self.execute(request)?;
        Ok(decode_body(&response.body))
    }

    pub fn get(&self, path: &str) -> Result<Value> {
        self.dispatch(HttpMethod::Get, path, None)
    }

    pub fn post(&self, path: &str, fields: &FieldMap) -> Result<Value> {
        self.dispatch(HttpMethod::Post, path, Some(fields))
    }

    pub fn put(&self, path: &str, fields: &FieldMap) -> Result<Value> {
        self.dispatch(HttpMethod::Put, path, Some(fields))
    }

    pub fn patch(&self, path: &str, fields: &FieldMap) -> Result<Value> {
        self.dispatch(HttpMethod::Patch, path, Some(fields))
    }

    pub fn delete(&self, path: &str) -> Result<Value> {
        self.dispatch(HttpMethod::Delete, path, None)
    }

    /// DELETE with a JSON body; Planka addresses card memberships this way.
    pub fn delete_with(&self, path: &str, fields: &FieldMap) -> Result<Value> {
        self.dispatch(HttpMethod::Delete, path, Some(fields))
    }

    /// POST a single file as `multipart/form-data`.
    pub fn upload(&self, path: &str, file_name: &str, bytes: &[u8]) -> Result<Value> {
        let part = Multipart::file(file_name, bytes);
        let mut request = self
            .build_request(HttpMethod::Post, path)
            .header("content-type", part.content_type());
        request.body = Some(part.body);
        let response = self.execute(request)?;
        Ok(decode_body(&response.body))
    }

    /// Raw bytes of a file served by Planka (attachments, avatars).
    pub fn get_file(&self, url: &str) -> Result<Vec<u8>> {
        let mut request = HttpRequest::new(HttpMethod::Get, self.url(url));
        if let Some(auth) = &self.session.authorization {
            request = request.header("authorization", auth.clone());
        }
        Ok(self.execute(request)?.body)
    }

    /// Decode a raw record and bind it to this session.
    pub fn decode<R: Record>(&self, value: Value) -> Result<R> {
        let record: R = serde_json::from_value(value)?;
        Ok(record.bind(self.clone()))
    }

    /// GET `path` and decode its `item`.
    pub fn item<R: Record>(&self, path: &str) -> Result<R> {
        let body = self.get(path)?;
        self.decode(take_item(body, path)?)
    }

    /// GET `path` and decode its `items`.
    pub fn items<R: Record>(&self, path: &str) -> Result<Vec<R>> {
        let body = self.get(path)?;
        self.decode_all(take_list(body, "items", path)?)
    }

    /// GET `path` and decode `included.<key>`.
    pub fn included<R: Record>(&self, path: &str, key: &str) -> Result<Vec<R>> {
        let body = self.get(path)?;
        let included = match body {
            Value::Object(mut map) => map.remove("included").unwrap_or(Value::Null),
            _ => Value::Null,
        };
        self.decode_all(take_list(included, key, path)?)
    }

    /// POST `fields` to `path` and decode the created `item`.
    pub fn create<R: Record>(&self, path: &str, fields: &FieldMap) -> Result<R> {
        let body = self.post(path, fields)?;
        self.decode(take_item(body, path)?)
    }

    fn decode_all<R: Record>(&self, values: Vec<Value>) -> Result<Vec<R>> {
        values.into_iter().map(|v| self.decode(v)).collect()
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
pub fn check_status(method: HttpMethod, endpoint: &str, response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound {
            endpoint: endpoint.to_string(),
        });
    }
    warn!(%method, endpoint, status = response.status, "planka request failed");
    Err(ApiError::Http {
        status: response.status,
        method: method.to_string(),
        endpoint: endpoint.to_string(),
        headers: response.headers.clone(),
        body: response.text(),
    })
}

pub fn decode_body(body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(body).unwrap_or_else(|_| json!({ "body": String::from_utf8_lossy(body) }))
}

/// Pull `item` out of a decoded body.
pub fn take_item(body: Value, endpoint: &str) -> Result<Value> {
    match body {
        Value::Object(mut map) => map
            .remove("item")
            .ok_or_else(|| ApiError::unexpected(endpoint, "missing 'item'")),
        other => Err(ApiError::unexpected(endpoint, format!("expected an object, got {other}"))),
    }
}

fn take_list(body: Value, key: &str, endpoint: &str) -> Result<Vec<Value>> {
    match body {
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(values)) => Ok(values),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(ApiError::unexpected(endpoint, format!("'{key}' is not a list: {other}"))),
        },
        Value::Null => Ok(Vec::new()),
        other => Err(ApiError::unexpected(endpoint, format!("expected an object, got {other}"))),
    }
}
