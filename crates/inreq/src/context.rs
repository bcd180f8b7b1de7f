//! Per-call decode state.
//!
//! A [`DecodeContext`] is created for every decode call. It carries the
//! call's settings (copied from the decoder and overridden by call options)
//! and the mutable state operations share: whether the body was read and
//! which keys each operation consumed.

use crate::content::{ContentDecoder, DefaultContentDecoder};
use crate::error::{DecodeError, DecodeResult};
use crate::operation::path::PathValue;
use crate::request::Request;
use bytes::Bytes;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::io::Read;
use std::sync::Arc;

/// Default maximum body size (10 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Default separator used to split list values.
pub const DEFAULT_SEPARATOR: &str = ",";

/// State and settings for one decode call.
///
/// # Example
///
/// ```rust
/// use inreq::{DecodeContext, Request};
///
/// let mut req = Request::builder().body("hello").build();
/// let mut ctx = DecodeContext::new();
///
/// let body = ctx.read_body(&mut req).unwrap();
/// assert_eq!(body.as_deref(), Some(&b"hello"[..]));
/// assert!(ctx.is_body_consumed());
/// assert!(ctx.read_body(&mut req).is_err());
/// ```
pub struct DecodeContext {
    body_consumed: bool,
    consumed: HashMap<String, BTreeSet<String>>,
    path_value: Option<Arc<dyn PathValue>>,
    content_decoder: Arc<dyn ContentDecoder>,
    separator: String,
    allow_read_body: bool,
    ensure_all_query_used: bool,
    ensure_all_form_used: bool,
    max_body_size: usize,
}

impl Default for DecodeContext {
    fn default() -> Self {
        Self {
            body_consumed: false,
            consumed: HashMap::new(),
            path_value: None,
            content_decoder: Arc::new(DefaultContentDecoder),
            separator: DEFAULT_SEPARATOR.to_string(),
            allow_read_body: true,
            ensure_all_query_used: false,
            ensure_all_form_used: false,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl fmt::Debug for DecodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeContext")
            .field("body_consumed", &self.body_consumed)
            .field("consumed", &self.consumed)
            .field("has_path_value", &self.path_value.is_some())
            .field("separator", &self.separator)
            .field("allow_read_body", &self.allow_read_body)
            .field("ensure_all_query_used", &self.ensure_all_query_used)
            .field("ensure_all_form_used", &self.ensure_all_form_used)
            .field("max_body_size", &self.max_body_size)
            .finish_non_exhaustive()
    }
}

impl DecodeContext {
    /// Creates a context with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the path value lookup.
    #[must_use]
    pub fn with_path_value(mut self, path_value: Option<Arc<dyn PathValue>>) -> Self {
        self.path_value = path_value;
        self
    }

    /// Sets the content decoder used by the body operation.
    #[must_use]
    pub fn with_content_decoder(mut self, decoder: Arc<dyn ContentDecoder>) -> Self {
        self.content_decoder = decoder;
        self
    }

    /// Sets the list split separator. An empty separator is ignored.
    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        if !separator.is_empty() {
            self.separator = separator;
        }
        self
    }

    /// Allows or forbids reading the body.
    #[must_use]
    pub fn with_allow_read_body(mut self, allow: bool) -> Self {
        self.allow_read_body = allow;
        self
    }

    /// Enables the check that every query key was consumed.
    #[must_use]
    pub fn with_ensure_all_query_used(mut self, ensure: bool) -> Self {
        self.ensure_all_query_used = ensure;
        self
    }

    /// Enables the check that every form key was consumed.
    #[must_use]
    pub fn with_ensure_all_form_used(mut self, ensure: bool) -> Self {
        self.ensure_all_form_used = ensure;
        self
    }

    /// Sets the body size limit in bytes.
    #[must_use]
    pub fn with_max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = limit;
        self
    }

    /// Returns the path value lookup, if configured.
    #[must_use]
    pub fn path_value(&self) -> Option<&Arc<dyn PathValue>> {
        self.path_value.as_ref()
    }

    /// Returns the content decoder.
    #[must_use]
    pub fn content_decoder(&self) -> Arc<dyn ContentDecoder> {
        Arc::clone(&self.content_decoder)
    }

    /// Returns the list split separator.
    #[must_use]
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Returns true if the body may be read.
    #[must_use]
    pub fn allow_read_body(&self) -> bool {
        self.allow_read_body
    }

    /// Returns true if unconsumed query keys are an error.
    #[must_use]
    pub fn ensure_all_query_used(&self) -> bool {
        self.ensure_all_query_used
    }

    /// Returns true if unconsumed form keys are an error.
    #[must_use]
    pub fn ensure_all_form_used(&self) -> bool {
        self.ensure_all_form_used
    }

    /// Returns the body size limit in bytes.
    #[must_use]
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    /// Returns true if the body was read during this call.
    #[must_use]
    pub fn is_body_consumed(&self) -> bool {
        self.body_consumed
    }

    /// Reads the whole body.
    ///
    /// Succeeds at most once per call and per request. Returns `Ok(None)` if
    /// the request has no body or the body is empty. The stream is dropped
    /// before returning, whatever the outcome.
    pub fn read_body(&mut self, req: &mut Request) -> DecodeResult<Option<Bytes>> {
        if !self.allow_read_body {
            return Err(DecodeError::BodyReadNotPermitted);
        }
        if self.body_consumed || req.is_body_consumed() {
            return Err(DecodeError::BodyAlreadyConsumed);
        }
        self.body_consumed = true;

        let Some(body) = req.take_body() else {
            return Ok(None);
        };

        let limit = self.max_body_size;
        let mut buf = Vec::new();
        body.into_reader()
            .take(u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1))
            .read_to_end(&mut buf)?;

        if buf.len() > limit {
            return Err(DecodeError::PayloadTooLarge {
                limit,
                actual: buf.len(),
            });
        }

        tracing::trace!(bytes = buf.len(), "request body read");
        Ok((!buf.is_empty()).then(|| Bytes::from(buf)))
    }

    /// Records that `operation` consumed `key`.
    pub fn value_used(&mut self, operation: &str, key: &str) {
        self.consumed
            .entry(operation.to_string())
            .or_default()
            .insert(key.to_string());
    }

    /// Returns the keys `operation` consumed so far.
    #[must_use]
    pub fn used_values(&self, operation: &str) -> Option<&BTreeSet<String>> {
        self.consumed.get(operation)
    }

    /// Returns true if `operation` consumed `key`.
    #[must_use]
    pub fn is_value_used(&self, operation: &str, key: &str) -> bool {
        self.consumed
            .get(operation)
            .is_some_and(|keys| keys.contains(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_body_once() {
        let mut req = Request::builder().body("payload").build();
        let mut ctx = DecodeContext::new();

        let body = ctx.read_body(&mut req).unwrap();
        assert_eq!(body, Some(Bytes::from_static(b"payload")));
        assert!(ctx.is_body_consumed());

        let err = ctx.read_body(&mut req).unwrap_err();
        assert!(matches!(err, DecodeError::BodyAlreadyConsumed));
    }

    #[test]
    fn test_read_body_consumed_by_earlier_call() {
        let mut req = Request::builder().body("payload").build();
        DecodeContext::new().read_body(&mut req).unwrap();

        let err = DecodeContext::new().read_body(&mut req).unwrap_err();
        assert!(matches!(err, DecodeError::BodyAlreadyConsumed));
    }

    #[test]
    fn test_read_body_not_permitted() {
        let mut req = Request::builder().body("payload").build();
        let mut ctx = DecodeContext::new().with_allow_read_body(false);

        let err = ctx.read_body(&mut req).unwrap_err();
        assert!(matches!(err, DecodeError::BodyReadNotPermitted));
        assert!(!ctx.is_body_consumed());
        assert!(!req.is_body_consumed());
    }

    #[test]
    fn test_read_empty_body() {
        let mut req = Request::builder().body("").build();
        let mut ctx = DecodeContext::new();

        assert_eq!(ctx.read_body(&mut req).unwrap(), None);
        assert!(ctx.is_body_consumed());
    }

    #[test]
    fn test_read_body_limit() {
        let mut req = Request::builder().body("0123456789").build();
        let mut ctx = DecodeContext::new().with_max_body_size(4);

        let err = ctx.read_body(&mut req).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::PayloadTooLarge { limit: 4, actual: 5 }
        ));

        let mut req = Request::builder().body("0123").build();
        let mut ctx = DecodeContext::new().with_max_body_size(4);
        assert_eq!(ctx.read_body(&mut req).unwrap().map(|b| b.len()), Some(4));
    }

    #[test]
    fn test_consumed_keys() {
        let mut ctx = DecodeContext::new();
        ctx.value_used("query", "b");
        ctx.value_used("query", "a");
        ctx.value_used("query", "a");

        let keys: Vec<_> = ctx.used_values("query").unwrap().iter().cloned().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
        assert!(ctx.is_value_used("query", "a"));
        assert!(!ctx.is_value_used("form", "a"));
        assert!(ctx.used_values("form").is_none());
    }

    #[test]
    fn test_settings() {
        let ctx = DecodeContext::new()
            .with_separator(";")
            .with_ensure_all_query_used(true)
            .with_ensure_all_form_used(true);

        assert_eq!(ctx.separator(), ";");
        assert!(ctx.ensure_all_query_used());
        assert!(ctx.ensure_all_form_used());
        assert!(ctx.allow_read_body());
        assert!(ctx.path_value().is_none());
        assert_eq!(ctx.max_body_size(), DEFAULT_MAX_BODY_SIZE);
    }

    #[test]
    fn test_empty_separator_ignored() {
        let ctx = DecodeContext::new().with_separator("");
        assert_eq!(ctx.separator(), DEFAULT_SEPARATOR);

        let ctx = DecodeContext::new().with_separator(";").with_separator("");
        assert_eq!(ctx.separator(), ";");
    }
}
