//! Decode error types.
//!
//! Every failure raised while decoding a request into a struct is a
//! [`DecodeError`]. Failures raised while coercing a single raw string into
//! a typed value are [`ResolveError`]s, which the decoder wraps into
//! [`DecodeError::Coercion`] together with the offending field path.

use http::StatusCode;
use std::fmt;
use thiserror::Error;

/// Boxed error type used by pluggable collaborators (path lookups, content
/// decoders, text parsers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for decode operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Error that occurs while decoding a request into a struct.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The destination cannot be decoded into.
    #[error("invalid decode target: {message}")]
    InvalidTarget {
        /// Description of the problem
        message: String,
    },

    /// A required field found no value.
    #[error("required {operation} value '{name}' missing for field '{field}'")]
    RequiredFieldMissing {
        /// Dotted path of the destination field
        field: String,
        /// Operation that looked up the value
        operation: String,
        /// Name the value was looked up under
        name: String,
    },

    /// Values present in the request (or in an override map) were never
    /// consumed by any field.
    #[error("{source_name} values not used: {}", .keys.join(", "))]
    ValuesNotUsed {
        /// Where the unused values came from (`query`, `form`, `overrides`)
        source_name: String,
        /// The unused keys, sorted
        keys: Vec<String>,
    },

    /// A field named an operation the decoder has no registration for, or
    /// the operation cannot decode a whole struct.
    #[error("operation '{operation}' not supported")]
    OperationNotSupported {
        /// The operation name
        operation: String,
    },

    /// The request body was already read by an earlier field.
    #[error("request body already consumed")]
    BodyAlreadyConsumed,

    /// Reading the request body is disabled for this decode call.
    #[error("reading the request body is not permitted")]
    BodyReadNotPermitted,

    /// A raw value could not be coerced into the field's type.
    #[error("cannot decode value '{value}' into field '{field}': {source}")]
    Coercion {
        /// Dotted path of the destination field
        field: String,
        /// The raw value, rendered as text
        value: String,
        /// The underlying coercion failure
        #[source]
        source: ResolveError,
    },

    /// The body (or form) content could not be decoded.
    #[error("failed to decode {format} content: {message}")]
    ContentDecode {
        /// Content format (`json`, `xml`, `form`, `multipart`, `text`, `media type`)
        format: String,
        /// Decoder message
        message: String,
    },

    /// The decoder or a field declaration is misconfigured.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the problem
        message: String,
    },

    /// Reading the body stream failed.
    #[error("failed to read request body: {0}")]
    BodyRead(#[from] std::io::Error),

    /// The body exceeded the configured size limit.
    #[error("payload too large: max {limit} bytes, got at least {actual} bytes")]
    PayloadTooLarge {
        /// Configured limit in bytes
        limit: usize,
        /// Number of bytes observed
        actual: usize,
    },

    /// The path value lookup failed.
    #[error("path value lookup for '{name}' failed: {source}")]
    PathLookup {
        /// Path parameter name
        name: String,
        /// Lookup failure
        #[source]
        source: BoxError,
    },
}

impl DecodeError {
    /// Creates an [`DecodeError::InvalidTarget`] error.
    #[must_use]
    pub fn invalid_target(message: impl Into<String>) -> Self {
        Self::InvalidTarget {
            message: message.into(),
        }
    }

    /// Creates a [`DecodeError::Configuration`] error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a [`DecodeError::ContentDecode`] error.
    #[must_use]
    pub fn content(format: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::ContentDecode {
            format: format.to_string(),
            message: message.to_string(),
        }
    }

    /// Creates a [`DecodeError::OperationNotSupported`] error.
    #[must_use]
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::OperationNotSupported {
            operation: operation.into(),
        }
    }

    /// Creates a [`DecodeError::ValuesNotUsed`] error. Keys are sorted.
    #[must_use]
    pub fn values_not_used(source: impl Into<String>, keys: impl IntoIterator<Item = String>) -> Self {
        let mut keys: Vec<String> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();
        Self::ValuesNotUsed {
            source_name: source.into(),
            keys,
        }
    }

    /// Returns the value source for errors tied to one (`ValuesNotUsed`).
    #[must_use]
    pub fn source_name(&self) -> Option<&str> {
        match self {
            Self::ValuesNotUsed { source_name, .. } => Some(source_name),
            _ => None,
        }
    }

    /// Returns the field path for errors tied to a field.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::RequiredFieldMissing { field, .. } | Self::Coercion { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Returns the appropriate HTTP status code for this error.
    ///
    /// Client-caused failures map to 4xx, decoder misconfiguration to 500.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RequiredFieldMissing { .. }
            | Self::ValuesNotUsed { .. }
            | Self::Coercion { .. }
            | Self::ContentDecode { .. }
            | Self::BodyRead(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InvalidTarget { .. }
            | Self::OperationNotSupported { .. }
            | Self::BodyAlreadyConsumed
            | Self::BodyReadNotPermitted
            | Self::Configuration { .. }
            | Self::PathLookup { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code suitable for error envelopes.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTarget { .. } => "INVALID_TARGET",
            Self::RequiredFieldMissing { .. } => "MISSING_PARAMETER",
            Self::ValuesNotUsed { .. } => "VALUES_NOT_USED",
            Self::OperationNotSupported { .. } => "OPERATION_NOT_SUPPORTED",
            Self::BodyAlreadyConsumed => "BODY_ALREADY_CONSUMED",
            Self::BodyReadNotPermitted => "BODY_READ_NOT_PERMITTED",
            Self::Coercion { .. } => "INVALID_PARAMETER",
            Self::ContentDecode { .. } => "DESERIALIZATION_FAILED",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::BodyRead(_) => "BODY_READ_FAILED",
            Self::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            Self::PathLookup { .. } => "PATH_LOOKUP_FAILED",
        }
    }
}

/// Category of a [`ResolveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveErrorKind {
    /// The text is not a valid representation of the type
    InvalidFormat,
    /// The number does not fit the destination width
    Overflow,
    /// The destination type cannot be produced from raw text
    Unsupported,
    /// The destination type has no decoding rule at all
    UnknownType,
}

impl fmt::Display for ResolveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat => write!(f, "invalid format"),
            Self::Overflow => write!(f, "value out of range"),
            Self::Unsupported => write!(f, "unsupported type"),
            Self::UnknownType => write!(f, "unknown type"),
        }
    }
}

/// Failure to coerce a raw value into a typed value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ResolveError {
    kind: ResolveErrorKind,
    message: String,
}

impl ResolveError {
    /// Creates a resolve error.
    #[must_use]
    pub fn new(kind: ResolveErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates an invalid-format error from any displayable parse failure.
    #[must_use]
    pub fn invalid_format(error: impl fmt::Display) -> Self {
        Self::new(ResolveErrorKind::InvalidFormat, error.to_string())
    }

    /// Creates an overflow error.
    #[must_use]
    pub fn overflow(error: impl fmt::Display) -> Self {
        Self::new(ResolveErrorKind::Overflow, error.to_string())
    }

    /// Creates an error for a type that raw text cannot produce.
    #[must_use]
    pub fn unsupported<T: ?Sized>() -> Self {
        Self::new(
            ResolveErrorKind::Unsupported,
            format!("cannot resolve {} from a raw value", std::any::type_name::<T>()),
        )
    }

    /// Creates an error for a type with no decoding rule.
    #[must_use]
    pub fn unknown_type<T: ?Sized>() -> Self {
        Self::new(
            ResolveErrorKind::UnknownType,
            format!("unknown type {}", std::any::type_name::<T>()),
        )
    }

    /// Returns the error category.
    #[must_use]
    pub fn kind(&self) -> ResolveErrorKind {
        self.kind
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_missing_error() {
        let err = DecodeError::RequiredFieldMissing {
            field: "val".to_string(),
            operation: "query".to_string(),
            name: "val".to_string(),
        };

        assert_eq!(err.field(), Some("val"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "MISSING_PARAMETER");
        assert!(err.to_string().contains("required query value 'val'"));
    }

    #[test]
    fn test_values_not_used_sorts_keys() {
        let err = DecodeError::values_not_used(
            "query",
            vec!["z".to_string(), "a".to_string(), "a".to_string()],
        );

        assert_eq!(err.source_name(), Some("query"));
        match &err {
            DecodeError::ValuesNotUsed { keys, .. } => assert_eq!(keys, &["a", "z"]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.to_string(), "query values not used: a, z");
    }

    #[test]
    fn test_coercion_error_keeps_source() {
        let err = DecodeError::Coercion {
            field: "count".to_string(),
            value: "abc".to_string(),
            source: ResolveError::invalid_format("invalid digit found in string"),
        };

        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(
            source.as_deref(),
            Some("invalid format: invalid digit found in string")
        );
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            DecodeError::PayloadTooLarge { limit: 1, actual: 2 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            DecodeError::BodyAlreadyConsumed.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            DecodeError::content("json", "eof").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_resolve_error_kinds() {
        let err = ResolveError::overflow("number too large to fit in target type");
        assert_eq!(err.kind(), ResolveErrorKind::Overflow);

        let err = ResolveError::unsupported::<Vec<u8>>();
        assert_eq!(err.kind(), ResolveErrorKind::Unsupported);
        assert!(err.message().contains("Vec<u8>"));
    }
}
