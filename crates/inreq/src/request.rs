//! The request being decoded.
//!
//! [`Request`] gives operations access to the parts of an HTTP request: the
//! method, URI and parsed query, headers, path parameters captured by a
//! router, the parsed form (once something parsed it) and a body stream that
//! can be read exactly once.

use crate::params::Params;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, Uri};
use indexmap::IndexMap;
use std::fmt;
use std::io::{Cursor, Read};

/// A readable request body.
///
/// The body is a plain blocking stream. It is read at most once per request;
/// after that the request reports it as consumed.
pub struct Body {
    reader: Box<dyn Read + Send>,
}

impl Body {
    /// Wraps an arbitrary reader.
    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Self {
        Self {
            reader: Box::new(reader),
        }
    }

    /// Creates an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::from(Bytes::new())
    }

    pub(crate) fn into_reader(self) -> Box<dyn Read + Send> {
        self.reader
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body").finish_non_exhaustive()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::from_reader(Cursor::new(bytes))
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::from(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::from(Bytes::from_static(text.as_bytes()))
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Self::from(Bytes::from_static(bytes))
    }
}

#[derive(Debug, Default)]
enum BodyState {
    #[default]
    Absent,
    Pending(Body),
    Consumed,
}

/// Ordered multi-valued string map used for query and form values.
///
/// # Example
///
/// ```rust
/// use inreq::ValueMap;
///
/// let values = ValueMap::parse("a=1&b=2&a=3");
/// assert_eq!(values.get("a"), Some(&["1".to_string(), "3".to_string()][..]));
/// assert_eq!(values.first("b"), Some("2"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueMap {
    inner: IndexMap<String, Vec<String>>,
}

impl ValueMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` string.
    ///
    /// Parsing is lenient: malformed escapes are kept as literal text.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        form_urlencoded::parse(input.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Appends a value under `key`.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.entry(key.into()).or_default().push(value.into());
    }

    /// Returns every value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.inner.get(key).map(Vec::as_slice)
    }

    /// Returns the first value stored under `key`.
    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(<[String]>::first).map(String::as_str)
    }

    /// Returns true if `key` is present, even with an empty value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Iterates over the keys in first-seen order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    /// Iterates over `(key, values)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Returns the number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if the map holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.append(k, v);
        }
        map
    }
}

/// An HTTP request prepared for decoding.
///
/// # Example
///
/// ```rust
/// use inreq::Request;
/// use http::{Method, Uri};
///
/// let req = Request::builder()
///     .method(Method::POST)
///     .uri(Uri::from_static("/users/42?active=true"))
///     .header("content-type", "application/json")
///     .path_param("id", "42")
///     .body(r#"{"name":"Alice"}"#)
///     .build();
///
/// assert_eq!(req.query().first("active"), Some("true"));
/// assert_eq!(req.path_params().get("id"), Some("42"));
/// assert!(req.has_body());
/// ```
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    path_params: Params,
    query: ValueMap,
    form: Option<ValueMap>,
    body: BodyState,
}

impl Request {
    /// Creates a request from its parts.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Option<Body>) -> Self {
        let query = uri.query().map(ValueMap::parse).unwrap_or_default();
        Self {
            method,
            uri,
            headers,
            path_params: Params::new(),
            query,
            form: None,
            body: body.map_or(BodyState::Absent, BodyState::Pending),
        }
    }

    /// Creates a request from `http` request parts.
    #[must_use]
    pub fn from_parts(parts: http::request::Parts, body: Option<Body>) -> Self {
        Self::new(parts.method, parts.uri, parts.headers, body)
    }

    /// Returns a builder for constructing a request.
    #[must_use]
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the parsed query string.
    #[must_use]
    pub fn query(&self) -> &ValueMap {
        &self.query
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the Content-Type header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Returns the path parameters captured by the router.
    #[must_use]
    pub fn path_params(&self) -> &Params {
        &self.path_params
    }

    /// Returns a mutable reference to the path parameters.
    pub fn path_params_mut(&mut self) -> &mut Params {
        &mut self.path_params
    }

    /// Returns the parsed form values, if the form was parsed.
    #[must_use]
    pub fn form(&self) -> Option<&ValueMap> {
        self.form.as_ref()
    }

    /// Stores parsed form values, replacing any earlier ones.
    ///
    /// Once a form is set the `form` operation reads it instead of the body.
    pub fn set_form(&mut self, form: ValueMap) {
        self.form = Some(form);
    }

    /// Returns true if the request carries a body stream, read or not.
    #[must_use]
    pub fn has_body(&self) -> bool {
        !matches!(self.body, BodyState::Absent)
    }

    /// Returns true if the body stream was already taken.
    #[must_use]
    pub fn is_body_consumed(&self) -> bool {
        matches!(self.body, BodyState::Consumed)
    }

    pub(crate) fn take_body(&mut self) -> Option<Body> {
        match std::mem::take(&mut self.body) {
            BodyState::Pending(body) => {
                self.body = BodyState::Consumed;
                Some(body)
            }
            other => {
                self.body = other;
                None
            }
        }
    }
}

impl<B: Into<Body>> From<http::Request<B>> for Request {
    fn from(req: http::Request<B>) -> Self {
        let (parts, body) = req.into_parts();
        Self::from_parts(parts, Some(body.into()))
    }
}

/// Builder for constructing a [`Request`].
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Option<Body>,
    path_params: Params,
    form: Option<ValueMap>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self {
            method: Method::GET,
            uri: Uri::from_static("/"),
            headers: HeaderMap::new(),
            body: None,
            path_params: Params::new(),
            form: None,
        }
    }
}

impl RequestBuilder {
    /// Creates a new builder for `GET /`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the URI.
    #[must_use]
    pub fn uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self
    }

    /// Sets the headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Appends a header. Invalid names or values are skipped.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the path parameters.
    #[must_use]
    pub fn path_params(mut self, params: Params) -> Self {
        self.path_params = params;
        self
    }

    /// Adds a single path parameter.
    #[must_use]
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.push(name, value);
        self
    }

    /// Adds a pre-parsed form value.
    #[must_use]
    pub fn form_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.get_or_insert_with(ValueMap::new).append(key, value);
        self
    }

    /// Builds the request.
    #[must_use]
    pub fn build(self) -> Request {
        let mut req = Request::new(self.method, self.uri, self.headers, self.body);
        req.path_params = self.path_params;
        req.form = self.form;
        req
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = Request::builder()
            .method(Method::POST)
            .uri(Uri::from_static("/api/users?page=2&tag=a&tag=b"))
            .header("Content-Type", "application/json")
            .header("x-id", "1")
            .header("x-id", "2")
            .body(r#"{"name": "Alice"}"#)
            .path_param("version", "v1")
            .build();

        assert_eq!(req.method(), &Method::POST);
        assert_eq!(req.content_type(), Some("application/json"));
        assert_eq!(req.headers().get_all("x-id").iter().count(), 2);
        assert_eq!(req.query().first("page"), Some("2"));
        assert_eq!(req.query().get("tag").map(<[String]>::len), Some(2));
        assert_eq!(req.path_params().get("version"), Some("v1"));
        assert!(req.has_body());
        assert!(req.form().is_none());
    }

    #[test]
    fn test_query_keeps_empty_values() {
        let req = Request::builder()
            .uri(Uri::from_static("/?flag&empty="))
            .build();

        assert!(req.query().contains_key("flag"));
        assert_eq!(req.query().first("empty"), Some(""));
    }

    #[test]
    fn test_take_body_once() {
        let mut req = Request::builder().body("payload").build();

        assert!(!req.is_body_consumed());
        let mut text = String::new();
        let body = req.take_body().unwrap();
        body.into_reader().read_to_string(&mut text).unwrap();
        assert_eq!(text, "payload");

        assert!(req.is_body_consumed());
        assert!(req.has_body());
        assert!(req.take_body().is_none());
    }

    #[test]
    fn test_request_without_body() {
        let mut req = Request::builder().build();

        assert!(!req.has_body());
        assert!(req.take_body().is_none());
        assert!(!req.is_body_consumed());
    }

    #[test]
    fn test_from_http_request() {
        let http_req = http::Request::builder()
            .uri("/items?id=7")
            .header("x-trace", "t1")
            .body(Bytes::from_static(b"{}"))
            .unwrap();

        let req = Request::from(http_req);
        assert_eq!(req.query().first("id"), Some("7"));
        assert_eq!(
            req.headers().get("x-trace").and_then(|v| v.to_str().ok()),
            Some("t1")
        );
        assert!(req.has_body());
    }

    #[test]
    fn test_preparsed_form() {
        let req = Request::builder()
            .form_value("a", "1")
            .form_value("a", "2")
            .build();

        let form = req.form().unwrap();
        assert_eq!(form.get("a").map(<[String]>::len), Some(2));
        assert_eq!(form.keys().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_value_map_decodes_escapes() {
        let values = ValueMap::parse("name=John+Doe&city=New%20York");
        assert_eq!(values.first("name"), Some("John Doe"));
        assert_eq!(values.first("city"), Some("New York"));
        assert_eq!(values.len(), 2);
    }
}
