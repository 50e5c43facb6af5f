//! Request view used by the rendering layer.
//!
//! [`RequestInfo`] is a framework-neutral snapshot of an inbound HTTP request.
//! Only the parts that influence rendering are kept: method, path, headers,
//! and the decoded query-string and form-body parameters.

use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method};
use serde::Serialize;
use url::form_urlencoded;

/// Header set by jQuery and most AJAX libraries.
pub const X_REQUESTED_WITH: &str = "x-requested-with";

/// Header set by htmx on every request it issues.
pub const HX_REQUEST: &str = "hx-request";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Snapshot of an inbound request.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    /// HTTP method.
    pub method: Method,

    /// Request path without the query string.
    pub path: String,

    /// Request headers.
    pub headers: HeaderMap,

    /// Decoded query-string pairs in arrival order.
    pub query: Vec<(String, String)>,

    /// Decoded url-encoded form pairs in arrival order.
    pub form: Vec<(String, String)>,
}

/// Serializable summary exposed to templates.
#[derive(Debug, Clone, Serialize)]
pub struct RequestSummary {
    pub method: String,
    pub path: String,
    pub is_async: bool,
    pub query: serde_json::Map<String, serde_json::Value>,
}

impl RequestInfo {
    /// Create a request for the given method and path.
    ///
    /// A query string attached to `path` is split off and decoded.
    ///
    /// # Example
    ///
    /// ```
    /// use sliver_core::RequestInfo;
    ///
    /// let request = RequestInfo::new(http::Method::GET, "/page?__part__=content");
    /// assert_eq!(request.path, "/page");
    /// assert_eq!(request.param("__part__"), Some("content"));
    /// ```
    pub fn new(method: Method, path: impl AsRef<str>) -> Self {
        let path = path.as_ref();
        let (path, query) = match path.split_once('?') {
            Some((p, q)) => (p, decode_pairs(q.as_bytes())),
            None => (path, Vec::new()),
        };

        Self {
            method,
            path: path.to_string(),
            headers: HeaderMap::new(),
            query,
            form: Vec::new(),
        }
    }

    /// Build from HTTP request parts and the raw body.
    ///
    /// The body is decoded as form parameters only when the content type is
    /// `application/x-www-form-urlencoded`.
    pub fn from_parts(parts: &http::request::Parts, body: &[u8]) -> Self {
        let query = parts
            .uri
            .query()
            .map(|q| decode_pairs(q.as_bytes()))
            .unwrap_or_default();

        Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            headers: parts.headers.clone(),
            query,
            form: Vec::new(),
        }
        .with_body(body)
    }

    /// Decode the raw body as form parameters if the request's content type
    /// is `application/x-www-form-urlencoded`.
    pub fn with_body(mut self, body: &[u8]) -> Self {
        if is_form(&self.headers) {
            self.form = decode_pairs(body);
        }
        self
    }

    /// Add a header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Append a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append a form parameter.
    pub fn with_form(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((key.into(), value.into()));
        self
    }

    /// Mark the request as an AJAX request.
    pub fn ajax(self) -> Self {
        self.with_header(X_REQUESTED_WITH, "XMLHttpRequest")
    }

    /// Whether the request was issued in the background by script.
    ///
    /// True for `X-Requested-With: XMLHttpRequest` and for `HX-Request: true`.
    pub fn is_async(&self) -> bool {
        self.header(X_REQUESTED_WITH) == Some("XMLHttpRequest")
            || self
                .header(HX_REQUEST)
                .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// Read a header as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Look up a parameter in the combined form and query set.
    ///
    /// Form values take precedence over query values. For repeated keys the
    /// last value wins.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.form_param(key).or_else(|| self.query_param(key))
    }

    /// Last query value for `key`.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        last_value(&self.query, key)
    }

    /// Last form value for `key`.
    pub fn form_param(&self, key: &str) -> Option<&str> {
        last_value(&self.form, key)
    }

    /// Summary of the request suitable for a template context.
    pub fn summary(&self) -> RequestSummary {
        let mut query = serde_json::Map::new();
        for (key, value) in &self.query {
            query.insert(key.clone(), serde_json::Value::String(value.clone()));
        }

        RequestSummary {
            method: self.method.to_string(),
            path: self.path.clone(),
            is_async: self.is_async(),
            query,
        }
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with(FORM_CONTENT_TYPE))
}

fn decode_pairs(input: &[u8]) -> Vec<(String, String)> {
    form_urlencoded::parse(input)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn last_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}
