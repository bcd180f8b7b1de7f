//! Body content negotiation.
//!
//! The body operation asks a [`ContentDecoder`] to decode the body into the
//! destination. The default decoder resolves the media type from the field's
//! `type` option (`json` or `xml`), falling back to the request's
//! `Content-Type` header, and decodes JSON with `serde_json` and XML with
//! `quick-xml`. Unknown media types are left unhandled so the body operation
//! can try its plain-text fallback.

use crate::context::DecodeContext;
use crate::error::{BoxError, DecodeError, DecodeResult};
use crate::operation::{Extracted, FieldTarget};
use crate::request::Request;
use serde::de::DeserializeOwned;
use std::fmt;

/// Structured body format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentFormat {
    /// `application/json` and `+json` media types
    Json,
    /// `application/xml`, `text/xml` and `+xml` media types
    Xml,
}

impl ContentFormat {
    /// Resolves the format of a `type` option value (`json` or `xml`).
    #[must_use]
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint {
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }

    /// Resolves the format of a parsed media type.
    #[must_use]
    pub fn from_mime(media: &mime::Mime) -> Option<Self> {
        let is = |name: mime::Name<'static>| media.subtype() == name || media.suffix() == Some(name);

        if is(mime::JSON) {
            return Some(Self::Json);
        }
        if media.type_() == mime::APPLICATION || media.type_() == mime::TEXT {
            if is(mime::XML) {
                return Some(Self::Xml);
            }
        } else if media.suffix() == Some(mime::XML) {
            return Some(Self::Xml);
        }
        None
    }

    /// Deserializes `bytes` in this format.
    pub fn deserialize<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T, BoxError> {
        match self {
            Self::Json => Ok(serde_json::from_slice(bytes)?),
            Self::Xml => {
                let text = std::str::from_utf8(bytes)?;
                Ok(quick_xml::de::from_str(text)?)
            }
        }
    }
}

impl fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Xml => write!(f, "xml"),
        }
    }
}

/// Resolves the content format for a body field.
///
/// The `type` option wins over the `Content-Type` header. Returns `Ok(None)`
/// when neither names a supported format. A malformed `Content-Type` header
/// is an error.
pub fn resolve_format(
    type_hint: Option<&str>,
    content_type: Option<&str>,
) -> DecodeResult<Option<ContentFormat>> {
    if let Some(format) = type_hint.and_then(ContentFormat::from_hint) {
        return Ok(Some(format));
    }

    let Some(content_type) = content_type.filter(|ct| !ct.trim().is_empty()) else {
        return Ok(None);
    };

    let media: mime::Mime = content_type
        .parse()
        .map_err(|e| DecodeError::content("media type", e))?;
    Ok(ContentFormat::from_mime(&media))
}

/// Decodes the request body into a body field.
///
/// Returns `Ok(None)` if the decoder does not handle the request's media
/// type. A decoder that handles the request must read the body through
/// [`DecodeContext::read_body`].
pub trait ContentDecoder: Send + Sync {
    /// Decodes the body into `target`.
    fn unmarshal(
        &self,
        ctx: &mut DecodeContext,
        type_hint: Option<&str>,
        req: &mut Request,
        target: &mut dyn FieldTarget,
    ) -> DecodeResult<Option<Extracted>>;
}

/// JSON and XML content decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultContentDecoder;

impl ContentDecoder for DefaultContentDecoder {
    fn unmarshal(
        &self,
        ctx: &mut DecodeContext,
        type_hint: Option<&str>,
        req: &mut Request,
        target: &mut dyn FieldTarget,
    ) -> DecodeResult<Option<Extracted>> {
        let Some(format) = resolve_format(type_hint, req.content_type())? else {
            return Ok(None);
        };

        let bytes = ctx.read_body(req)?.unwrap_or_default();
        match target.decode_content(format, &bytes) {
            Some(Ok(())) => Ok(Some(Extracted::Assigned)),
            Some(Err(e)) => Err(DecodeError::content(format, e)),
            None => Err(DecodeError::content(
                format,
                format!("{} cannot be decoded from {format} content", target.type_name()),
            )),
        }
    }
}
