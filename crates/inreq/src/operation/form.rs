//! Form operation.

use super::{DecodePlan, Extracted, FieldTarget, Operation, FORM};
use crate::context::DecodeContext;
use crate::error::{DecodeError, DecodeResult};
use crate::multipart;
use crate::request::{Request, ValueMap};
use crate::validate::ensure_all_used;
use crate::value::RawValue;
use http::Method;

/// Reads values from a form body.
///
/// The form is parsed on first use and cached on the request. Parsing reads
/// the body of `POST`, `PUT` and `PATCH` requests whose content type is
/// `application/x-www-form-urlencoded` or `multipart/form-data`; any other
/// request has an empty form. A form set with
/// [`Request::set_form`] is used as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormOperation;

impl Operation for FormOperation {
    fn extract(
        &self,
        ctx: &mut DecodeContext,
        req: &mut Request,
        plan: &DecodePlan<'_>,
        _target: &mut dyn FieldTarget,
    ) -> DecodeResult<Extracted> {
        if req.form().is_none() {
            let form = parse_form(ctx, req)?;
            req.set_form(form);
        }

        let values = req
            .form()
            .and_then(|form| form.get(plan.name))
            .filter(|values| !values.is_empty());
        let Some(values) = values else {
            return Ok(Extracted::NotFound);
        };

        let raw = if plan.is_list() {
            RawValue::List(values.to_vec())
        } else {
            RawValue::Single(values[0].clone())
        };

        ctx.value_used(FORM, plan.name);
        Ok(Extracted::Value(raw))
    }

    fn validate(&self, ctx: &DecodeContext, req: &Request) -> DecodeResult<()> {
        if !ctx.ensure_all_form_used() {
            return Ok(());
        }
        let Some(form) = req.form() else {
            return Ok(());
        };
        ensure_all_used(FORM, form.keys(), ctx.used_values(FORM))
    }
}

fn parse_form(ctx: &mut DecodeContext, req: &mut Request) -> DecodeResult<ValueMap> {
    if !req.has_body() || !matches!(*req.method(), Method::POST | Method::PUT | Method::PATCH) {
        return Ok(ValueMap::new());
    }
    let Some(content_type) = req.content_type().map(str::to_owned) else {
        return Ok(ValueMap::new());
    };
    let media: mime::Mime = content_type
        .parse()
        .map_err(|e| DecodeError::content("media type", e))?;

    if media.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str() {
        let body = ctx.read_body(req)?.unwrap_or_default();
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_bytes(&body).map_err(|e| DecodeError::content("form", e))?;
        tracing::trace!(values = pairs.len(), "parsed urlencoded form");
        return Ok(pairs.into_iter().collect());
    }

    if media.type_() == mime::MULTIPART && media.subtype() == mime::FORM_DATA {
        let body = ctx.read_body(req)?.unwrap_or_default();
        let values = multipart::parse_values(&content_type, body)?;
        tracing::trace!(values = values.len(), "parsed multipart form");
        return Ok(values);
    }

    Ok(ValueMap::new())
}
