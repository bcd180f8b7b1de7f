//! Body operation.

use super::{DecodePlan, Extracted, FieldTarget, Operation};
use crate::context::DecodeContext;
use crate::error::{DecodeError, DecodeResult};
use crate::request::Request;
use crate::value::RawValue;

/// Decodes the request body into a field or a whole struct.
///
/// The body is read at most once per decode call. String and byte-buffer
/// fields receive the raw body. Other fields go through the decoder's
/// [`ContentDecoder`](crate::ContentDecoder), selected by the `type` option
/// or the `Content-Type` header. When no content decoder applies, fields
/// that can be parsed from text are parsed from the raw body.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyOperation;

impl Operation for BodyOperation {
    fn extract(
        &self,
        ctx: &mut DecodeContext,
        req: &mut Request,
        plan: &DecodePlan<'_>,
        target: &mut dyn FieldTarget,
    ) -> DecodeResult<Extracted> {
        if !req.has_body() {
            return Ok(Extracted::NotFound);
        }
        if !ctx.allow_read_body() {
            return Err(DecodeError::BodyReadNotPermitted);
        }
        if ctx.is_body_consumed() || req.is_body_consumed() {
            return Err(DecodeError::BodyAlreadyConsumed);
        }

        if target.kind().is_raw() {
            return Ok(match ctx.read_body(req)? {
                Some(bytes) => Extracted::Value(RawValue::Bytes(bytes)),
                None => Extracted::NotFound,
            });
        }

        let decoder = ctx.content_decoder();
        if let Some(extracted) = decoder.unmarshal(ctx, plan.options.get("type"), req, target)? {
            return Ok(extracted);
        }

        if target.supports_text() {
            let Some(bytes) = ctx.read_body(req)? else {
                return Ok(Extracted::NotFound);
            };
            return match target.parse_text(&bytes) {
                Some(Ok(())) => Ok(Extracted::Assigned),
                Some(Err(e)) => Err(DecodeError::content("text", e)),
                None => Ok(Extracted::NotFound),
            };
        }

        Ok(Extracted::NotFound)
    }

    fn supports_struct(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::TagOptions;
    use crate::operation::testing::extract;
    use bytes::Bytes;
    use serde::Deserialize;
    use std::net::IpAddr;

    fn body_request(content_type: Option<&str>, body: &'static str) -> Request {
        let builder = Request::builder().method(http::Method::POST).body(body);
        match content_type {
            Some(ct) => builder.header("content-type", ct).build(),
            None => builder.build(),
        }
    }

    #[test]
    fn test_body_raw_string() {
        let mut req = body_request(Some("application/json"), r#"{"a":1}"#);
        let mut ctx = DecodeContext::new();
        let mut slot = String::new();

        let out = extract(&BodyOperation, &mut ctx, &mut req, "body", &TagOptions::new(), &mut slot).unwrap();
        assert_eq!(
            out,
            Extracted::Value(RawValue::Bytes(Bytes::from_static(br#"{"a":1}"#)))
        );
        assert!(ctx.is_body_consumed());
    }

    #[test]
    fn test_body_raw_empty_not_found() {
        let mut req = body_request(None, "");
        let mut ctx = DecodeContext::new();
        let mut slot: Vec<u8> = Vec::new();

        let out = extract(&BodyOperation, &mut ctx, &mut req, "body", &TagOptions::new(), &mut slot).unwrap();
        assert_eq!(out, Extracted::NotFound);
    }

    #[test]
    fn test_body_without_stream() {
        let mut req = Request::builder().build();
        let mut ctx = DecodeContext::new().with_allow_read_body(false);
        let mut slot = String::new();

        let out = extract(&BodyOperation, &mut ctx, &mut req, "body", &TagOptions::new(), &mut slot).unwrap();
        assert_eq!(out, Extracted::NotFound);
    }

    #[test]
    fn test_body_not_permitted() {
        let mut req = body_request(None, "x");
        let mut ctx = DecodeContext::new().with_allow_read_body(false);
        let mut slot = String::new();

        let err = extract(&BodyOperation, &mut ctx, &mut req, "body", &TagOptions::new(), &mut slot).unwrap_err();
        assert!(matches!(err, DecodeError::BodyReadNotPermitted));
    }

    #[test]
    fn test_body_already_consumed() {
        let mut req = body_request(None, "x");
        let mut ctx = DecodeContext::new();
        let mut first = String::new();
        let mut second = String::new();

        extract(&BodyOperation, &mut ctx, &mut req, "a", &TagOptions::new(), &mut first).unwrap();
        let err = extract(&BodyOperation, &mut ctx, &mut req, "b", &TagOptions::new(), &mut second).unwrap_err();
        assert!(matches!(err, DecodeError::BodyAlreadyConsumed));
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Payload {
        #[serde(rename = "Val")]
        val: String,
    }

    impl crate::value::FieldValue for Payload {
        const KIND: crate::value::TypeKind = crate::value::TypeKind::Struct;

        fn resolve(
            _raw: &RawValue,
            _cx: &crate::value::ResolveContext<'_>,
        ) -> Result<Self, crate::error::ResolveError> {
            Err(crate::error::ResolveError::unsupported::<Self>())
        }

        fn decode_content(
            format: crate::content::ContentFormat,
            bytes: &[u8],
        ) -> Option<Result<Self, crate::error::BoxError>> {
            Some(format.deserialize(bytes))
        }
    }

    #[test]
    fn test_body_json() {
        let mut req = body_request(Some("application/json"), r#"{"Val":"x1"}"#);
        let mut ctx = DecodeContext::new();
        let mut slot = Payload::default();

        let out = extract(&BodyOperation, &mut ctx, &mut req, "body", &TagOptions::new(), &mut slot).unwrap();
        assert_eq!(out, Extracted::Assigned);
        assert_eq!(slot.val, "x1");
    }

    #[test]
    fn test_body_xml_by_type_option() {
        let mut req = body_request(None, "<Payload><Val>x2</Val></Payload>");
        let mut ctx = DecodeContext::new();
        let mut slot = Payload::default();
        let options: TagOptions = [("type", "xml")].into_iter().collect();

        let out = extract(&BodyOperation, &mut ctx, &mut req, "body", &options, &mut slot).unwrap();
        assert_eq!(out, Extracted::Assigned);
        assert_eq!(slot.val, "x2");
    }

    #[test]
    fn test_body_malformed_json() {
        let mut req = body_request(Some("application/json"), r#"{"Val":"#);
        let mut ctx = DecodeContext::new();
        let mut slot = Payload::default();

        let err = extract(&BodyOperation, &mut ctx, &mut req, "body", &TagOptions::new(), &mut slot).unwrap_err();
        assert!(matches!(err, DecodeError::ContentDecode { ref format, .. } if format == "json"));
        assert!(ctx.is_body_consumed());
    }

    #[test]
    fn test_body_unknown_content_type_not_found() {
        let mut req = body_request(Some("text/plain"), r#"{"Val":"x1"}"#);
        let mut ctx = DecodeContext::new();
        let mut slot = Payload::default();

        let out = extract(&BodyOperation, &mut ctx, &mut req, "body", &TagOptions::new(), &mut slot).unwrap();
        assert_eq!(out, Extracted::NotFound);
        assert!(!ctx.is_body_consumed());
    }

    #[test]
    fn test_body_text_fallback() {
        let mut req = body_request(Some("text/plain"), "192.168.0.1");
        let mut ctx = DecodeContext::new();
        let mut slot: Option<IpAddr> = None;

        let out = extract(&BodyOperation, &mut ctx, &mut req, "body", &TagOptions::new(), &mut slot).unwrap();
        assert_eq!(out, Extracted::Assigned);
        assert_eq!(slot, Some(IpAddr::from([192, 168, 0, 1])));
    }

    #[test]
    fn test_body_text_fallback_error() {
        let mut req = body_request(None, "not an address");
        let mut ctx = DecodeContext::new();
        let mut slot = IpAddr::from([0, 0, 0, 0]);

        let err = extract(&BodyOperation, &mut ctx, &mut req, "body", &TagOptions::new(), &mut slot).unwrap_err();
        assert!(matches!(err, DecodeError::ContentDecode { ref format, .. } if format == "text"));
    }
}
