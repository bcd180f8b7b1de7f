//! Typed field values.
//!
//! Operations hand back [`RawValue`]s: a single string, a list of strings or
//! raw body bytes. A destination type implements [`FieldValue`] to describe
//! how it is produced from those raw values, and optionally how it is decoded
//! from a JSON/XML body or from plain text.
//!
//! Built-in implementations cover strings, booleans, integers, floats,
//! `char`, byte buffers, IP and socket addresses, `Vec<T>` lists of scalars
//! and `Option<T>`. Types implementing [`FromStr`] can opt in with
//! [`text_value!`](crate::text_value).

use crate::content::ContentFormat;
use crate::error::{BoxError, ResolveError};
use bytes::Bytes;
use std::borrow::Cow;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::num::{IntErrorKind, ParseIntError};
use std::str::FromStr;

/// Shape of a destination type, as seen by operations.
///
/// The body operation uses it to decide between handing over raw bytes and
/// running the content decoder. Query and header operations use
/// [`TypeKind::List`] to decide whether to return every value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// A text string
    String,
    /// A byte buffer
    Bytes,
    /// A primitive scalar (number, boolean, character)
    Scalar,
    /// A named type parsed from text
    Named,
    /// A structured value decoded from body content
    Struct,
    /// A list of scalars
    List,
}

impl TypeKind {
    /// Returns true for string and byte-buffer kinds.
    #[must_use]
    pub fn is_raw(self) -> bool {
        matches!(self, Self::String | Self::Bytes)
    }
}

/// A value produced by an operation before coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// One string value
    Single(String),
    /// Several string values
    List(Vec<String>),
    /// Raw body bytes
    Bytes(Bytes),
}

impl RawValue {
    /// Renders the value as text.
    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Single(value) => Cow::Borrowed(value),
            Self::List(values) => Cow::Owned(values.join(",")),
            Self::Bytes(bytes) => String::from_utf8_lossy(bytes),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// Settings available while coercing a raw value.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    separator: &'a str,
}

impl<'a> ResolveContext<'a> {
    /// Creates a context using `separator` to split list values.
    #[must_use]
    pub fn new(separator: &'a str) -> Self {
        Self { separator }
    }

    /// Returns the list split separator.
    #[must_use]
    pub fn separator(&self) -> &'a str {
        self.separator
    }
}

impl Default for ResolveContext<'_> {
    fn default() -> Self {
        Self::new(",")
    }
}

/// A type that can be assigned to a decoded struct field.
pub trait FieldValue: Sized {
    /// Shape of the type.
    const KIND: TypeKind;

    /// Optional fields are never required.
    const OPTIONAL: bool = false;

    /// True if [`FieldValue::parse_text`] is implemented.
    const TEXT: bool = false;

    /// Coerces a raw value into `Self`.
    fn resolve(raw: &RawValue, cx: &ResolveContext<'_>) -> Result<Self, ResolveError>;

    /// Decodes `Self` from a JSON or XML body.
    ///
    /// Returns `None` if the type cannot be decoded from structured content.
    fn decode_content(_format: ContentFormat, _bytes: &[u8]) -> Option<Result<Self, BoxError>> {
        None
    }

    /// Parses `Self` from a plain-text body.
    fn parse_text(_bytes: &[u8]) -> Option<Result<Self, BoxError>> {
        None
    }
}

/// A scalar that can appear as an element of a `Vec<T>` field.
///
/// `u8` is deliberately absent: `Vec<u8>` is a byte buffer.
pub trait ScalarValue: Sized {
    /// Parses one list element.
    fn parse_scalar(value: &str) -> Result<Self, ResolveError>;

    /// Decodes a whole list from a JSON or XML body.
    fn decode_list(_format: ContentFormat, _bytes: &[u8]) -> Option<Result<Vec<Self>, BoxError>> {
        None
    }
}

/// Coerces a raw value holding one element using `parse`.
///
/// A list yields its first element, bytes must be UTF-8.
pub fn resolve_single<T>(
    raw: &RawValue,
    parse: impl Fn(&str) -> Result<T, ResolveError>,
) -> Result<T, ResolveError> {
    match raw {
        RawValue::Single(value) => parse(value),
        RawValue::List(values) => match values.first() {
            Some(value) => parse(value),
            None => Err(ResolveError::invalid_format("empty value list")),
        },
        RawValue::Bytes(bytes) => parse(utf8(bytes)?),
    }
}

/// Coerces a raw value into a list.
///
/// A single value (or a list holding exactly one value) is split on
/// `separator`.
pub fn resolve_list<T: ScalarValue>(raw: &RawValue, separator: &str) -> Result<Vec<T>, ResolveError> {
    let split = |value: &str| -> Result<Vec<T>, ResolveError> {
        if separator.is_empty() {
            return Ok(vec![T::parse_scalar(value)?]);
        }
        value.split(separator).map(T::parse_scalar).collect()
    };

    match raw {
        RawValue::Single(value) => split(value),
        RawValue::List(values) if values.len() == 1 => split(&values[0]),
        RawValue::List(values) => values.iter().map(|v| T::parse_scalar(v)).collect(),
        RawValue::Bytes(bytes) => split(utf8(bytes)?),
    }
}

/// Parses a plain-text body with [`FromStr`].
pub fn parse_text<T>(bytes: &[u8]) -> Result<T, BoxError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let text = std::str::from_utf8(bytes)?;
    text.trim().parse::<T>().map_err(|e| e.to_string().into())
}

/// Parses `value` with [`FromStr`], reporting failures as invalid format.
pub fn parse_from_str<T>(value: &str) -> Result<T, ResolveError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.parse::<T>().map_err(ResolveError::invalid_format)
}

fn utf8(bytes: &[u8]) -> Result<&str, ResolveError> {
    std::str::from_utf8(bytes).map_err(ResolveError::invalid_format)
}

fn parse_int<T: FromStr<Err = ParseIntError>>(value: &str) -> Result<T, ResolveError> {
    value.parse::<T>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => ResolveError::overflow(e),
        _ => ResolveError::invalid_format(e),
    })
}

fn parse_bool(value: &str) -> Result<bool, ResolveError> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(ResolveError::invalid_format(format!(
            "invalid boolean '{value}'"
        ))),
    }
}

fn parse_char(value: &str) -> Result<char, ResolveError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ResolveError::invalid_format(format!(
            "expected a single character, got '{value}'"
        ))),
    }
}

#[allow(clippy::unnecessary_wraps)]
fn parse_string(value: &str) -> Result<String, ResolveError> {
    Ok(value.to_owned())
}

macro_rules! field_values {
    ($kind:ident, $parse:expr => $($ty:ty),+ $(,)?) => {$(
        impl FieldValue for $ty {
            const KIND: TypeKind = TypeKind::$kind;

            fn resolve(raw: &RawValue, _cx: &ResolveContext<'_>) -> Result<Self, ResolveError> {
                resolve_single(raw, $parse)
            }

            fn decode_content(format: ContentFormat, bytes: &[u8]) -> Option<Result<Self, BoxError>> {
                Some(format.deserialize(bytes))
            }
        }
    )+};
}

macro_rules! text_field_values {
    ($($ty:ty),+ $(,)?) => {$(
        impl FieldValue for $ty {
            const KIND: TypeKind = TypeKind::Named;
            const TEXT: bool = true;

            fn resolve(raw: &RawValue, _cx: &ResolveContext<'_>) -> Result<Self, ResolveError> {
                resolve_single(raw, parse_from_str::<$ty>)
            }

            fn decode_content(format: ContentFormat, bytes: &[u8]) -> Option<Result<Self, BoxError>> {
                Some(format.deserialize(bytes))
            }

            fn parse_text(bytes: &[u8]) -> Option<Result<Self, BoxError>> {
                Some(parse_text(bytes))
            }
        }
    )+};
}

macro_rules! scalar_values {
    ($parse:expr => $($ty:ty),+ $(,)?) => {$(
        impl ScalarValue for $ty {
            fn parse_scalar(value: &str) -> Result<Self, ResolveError> {
                $parse(value)
            }

            fn decode_list(format: ContentFormat, bytes: &[u8]) -> Option<Result<Vec<Self>, BoxError>> {
                Some(format.deserialize(bytes))
            }
        }
    )+};
}

field_values!(String, parse_string => String);
field_values!(Scalar, parse_bool => bool);
field_values!(Scalar, parse_char => char);
field_values!(Scalar, parse_int => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
field_values!(Scalar, parse_from_str => f32, f64);
text_field_values!(IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr);

scalar_values!(parse_string => String);
scalar_values!(parse_bool => bool);
scalar_values!(parse_char => char);
scalar_values!(parse_int => i8, i16, i32, i64, i128, isize, u16, u32, u64, u128, usize);
scalar_values!(parse_from_str => f32, f64, IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr);

impl FieldValue for Vec<u8> {
    const KIND: TypeKind = TypeKind::Bytes;

    fn resolve(raw: &RawValue, cx: &ResolveContext<'_>) -> Result<Self, ResolveError> {
        Bytes::resolve(raw, cx).map(|bytes| bytes.to_vec())
    }
}

impl FieldValue for Bytes {
    const KIND: TypeKind = TypeKind::Bytes;

    fn resolve(raw: &RawValue, _cx: &ResolveContext<'_>) -> Result<Self, ResolveError> {
        match raw {
            RawValue::Bytes(bytes) => Ok(bytes.clone()),
            RawValue::Single(value) => Ok(Bytes::copy_from_slice(value.as_bytes())),
            RawValue::List(values) => Ok(values
                .first()
                .map(|v| Bytes::copy_from_slice(v.as_bytes()))
                .unwrap_or_default()),
        }
    }
}

impl<T: ScalarValue> FieldValue for Vec<T> {
    const KIND: TypeKind = TypeKind::List;

    fn resolve(raw: &RawValue, cx: &ResolveContext<'_>) -> Result<Self, ResolveError> {
        resolve_list(raw, cx.separator())
    }

    fn decode_content(format: ContentFormat, bytes: &[u8]) -> Option<Result<Self, BoxError>> {
        T::decode_list(format, bytes)
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    const KIND: TypeKind = T::KIND;
    const OPTIONAL: bool = true;
    const TEXT: bool = T::TEXT;

    fn resolve(raw: &RawValue, cx: &ResolveContext<'_>) -> Result<Self, ResolveError> {
        T::resolve(raw, cx).map(Some)
    }

    fn decode_content(format: ContentFormat, bytes: &[u8]) -> Option<Result<Self, BoxError>> {
        T::decode_content(format, bytes).map(|result| result.map(Some))
    }

    fn parse_text(bytes: &[u8]) -> Option<Result<Self, BoxError>> {
        T::parse_text(bytes).map(|result| result.map(Some))
    }
}

/// Implements [`FieldValue`] and [`ScalarValue`] for types implementing
/// [`FromStr`].
///
/// The type resolves from query, path, header and form values with
/// `FromStr`, can be an element of a `Vec<T>` field, and can be read from a
/// plain-text body.
///
/// # Example
///
/// ```rust
/// use inreq::{text_value, FieldValue, RawValue, ResolveContext};
///
/// #[derive(Debug, PartialEq)]
/// struct Celsius(i32);
///
/// impl std::str::FromStr for Celsius {
///     type Err = std::num::ParseIntError;
///
///     fn from_str(s: &str) -> Result<Self, Self::Err> {
///         s.trim_end_matches('C').parse().map(Celsius)
///     }
/// }
///
/// text_value!(Celsius);
///
/// let raw = RawValue::Single("21C".to_string());
/// assert_eq!(Celsius::resolve(&raw, &ResolveContext::default()), Ok(Celsius(21)));
/// ```
#[macro_export]
macro_rules! text_value {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::ScalarValue for $ty {
            fn parse_scalar(value: &str) -> ::std::result::Result<Self, $crate::ResolveError> {
                $crate::value::parse_from_str::<$ty>(value)
            }
        }

        impl $crate::FieldValue for $ty {
            const KIND: $crate::TypeKind = $crate::TypeKind::Named;
            const TEXT: bool = true;

            fn resolve(
                raw: &$crate::RawValue,
                _cx: &$crate::ResolveContext<'_>,
            ) -> ::std::result::Result<Self, $crate::ResolveError> {
                $crate::value::resolve_single(raw, $crate::value::parse_from_str::<$ty>)
            }

            fn parse_text(
                bytes: &[u8],
            ) -> ::std::option::Option<::std::result::Result<Self, $crate::BoxError>> {
                ::std::option::Option::Some($crate::value::parse_text::<$ty>(bytes))
            }
        }
    )+};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveErrorKind;

    fn single(value: &str) -> RawValue {
        RawValue::Single(value.to_string())
    }

    fn cx() -> ResolveContext<'static> {
        ResolveContext::default()
    }

    #[test]
    fn test_resolve_integers() {
        assert_eq!(i32::resolve(&single("-42"), &cx()), Ok(-42));
        assert_eq!(u64::resolve(&single("42"), &cx()), Ok(42));

        let err = i8::resolve(&single("300"), &cx()).unwrap_err();
        assert_eq!(err.kind(), ResolveErrorKind::Overflow);

        let err = i32::resolve(&single("abc"), &cx()).unwrap_err();
        assert_eq!(err.kind(), ResolveErrorKind::InvalidFormat);
    }

    #[test]
    fn test_resolve_bool_forms() {
        for value in ["1", "t", "T", "true", "TRUE", "True"] {
            assert_eq!(bool::resolve(&single(value), &cx()), Ok(true), "{value}");
        }
        for value in ["0", "f", "F", "false", "FALSE", "False"] {
            assert_eq!(bool::resolve(&single(value), &cx()), Ok(false), "{value}");
        }
        assert!(bool::resolve(&single("yes"), &cx()).is_err());
    }

    #[test]
    fn test_resolve_list_splits_single_value() {
        let values: Vec<i32> = Vec::resolve(&single("5,6,7"), &cx()).unwrap();
        assert_eq!(values, vec![5, 6, 7]);

        let values: Vec<i32> =
            Vec::resolve(&RawValue::List(vec!["5,6,7".to_string()]), &cx()).unwrap();
        assert_eq!(values, vec![5, 6, 7]);
    }

    #[test]
    fn test_resolve_list_keeps_multiple_values() {
        let raw = RawValue::List(vec!["a,b".to_string(), "c".to_string()]);
        let values: Vec<String> = Vec::resolve(&raw, &cx()).unwrap();
        assert_eq!(values, vec!["a,b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_resolve_list_custom_separator() {
        let values: Vec<u16> = Vec::resolve(&single("1;2"), &ResolveContext::new(";")).unwrap();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn test_resolve_bytes_and_strings() {
        let raw = RawValue::Bytes(Bytes::from_static(b"hello"));
        assert_eq!(String::resolve(&raw, &cx()), Ok("hello".to_string()));
        assert_eq!(Vec::<u8>::resolve(&raw, &cx()), Ok(b"hello".to_vec()));

        let invalid = RawValue::Bytes(Bytes::from_static(&[0xff, 0xfe]));
        assert!(String::resolve(&invalid, &cx()).is_err());
    }

    #[test]
    fn test_resolve_option() {
        assert_eq!(Option::<i32>::resolve(&single("3"), &cx()), Ok(Some(3)));
        assert!(<Option<i32> as FieldValue>::OPTIONAL);
        assert_eq!(<Option<Vec<i32>> as FieldValue>::KIND, TypeKind::List);
    }

    #[test]
    fn test_resolve_named_types() {
        let addr = IpAddr::resolve(&single("127.0.0.1"), &cx()).unwrap();
        assert_eq!(addr, IpAddr::from([127, 0, 0, 1]));

        let parsed = IpAddr::parse_text(b"::1\n").unwrap().unwrap();
        assert_eq!(parsed, IpAddr::from(Ipv6Addr::LOCALHOST));

        assert!(Ipv4Addr::resolve(&single("not-an-ip"), &cx()).is_err());
    }

    #[test]
    fn test_resolve_char() {
        assert_eq!(char::resolve(&single("x"), &cx()), Ok('x'));
        assert!(char::resolve(&single("xy"), &cx()).is_err());
    }

    #[test]
    fn test_decode_content_scalars() {
        let value = i64::decode_content(ContentFormat::Json, b"12").unwrap().unwrap();
        assert_eq!(value, 12);

        let values = Vec::<String>::decode_content(ContentFormat::Json, br#"["a","b"]"#)
            .unwrap()
            .unwrap();
        assert_eq!(values, vec!["a".to_string(), "b".to_string()]);

        assert!(Vec::<u8>::decode_content(ContentFormat::Json, b"[]").is_none());
    }

    #[test]
    fn test_raw_value_display() {
        assert_eq!(single("x").to_string(), "x");
        assert_eq!(
            RawValue::List(vec!["a".to_string(), "b".to_string()]).to_string(),
            "a,b"
        );
    }
}
