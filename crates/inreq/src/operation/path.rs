//! Path parameter operation.
//!
//! Path parameters are captured by whatever router dispatched the request, so
//! the operation looks them up through a [`PathValue`] supplied to the
//! decoder. [`RequestParams`] reads the [`Params`](crate::Params) stored on
//! the request; closures work too.

use super::{DecodePlan, Extracted, FieldTarget, Operation, PATH};
use crate::context::DecodeContext;
use crate::error::{BoxError, DecodeError, DecodeResult};
use crate::request::Request;
use crate::value::RawValue;
use std::sync::Arc;

/// Looks up a path parameter by name.
pub trait PathValue: Send + Sync {
    /// Returns the value of the path parameter `name`, if the route has one.
    fn path_value(&self, req: &Request, name: &str) -> Result<Option<String>, BoxError>;
}

impl<F> PathValue for F
where
    F: Fn(&Request, &str) -> Result<Option<String>, BoxError> + Send + Sync,
{
    fn path_value(&self, req: &Request, name: &str) -> Result<Option<String>, BoxError> {
        self(req, name)
    }
}

/// Reads path parameters from [`Request::path_params`].
///
/// # Example
///
/// ```rust
/// use inreq::{PathValue, Request, RequestParams};
///
/// let req = Request::builder().path_param("id", "42").build();
/// assert_eq!(RequestParams.path_value(&req, "id").unwrap(), Some("42".to_string()));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestParams;

impl PathValue for RequestParams {
    fn path_value(&self, req: &Request, name: &str) -> Result<Option<String>, BoxError> {
        Ok(req.path_params().get(name).map(str::to_owned))
    }
}

/// Reads values from path parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathOperation;

impl Operation for PathOperation {
    fn extract(
        &self,
        ctx: &mut DecodeContext,
        req: &mut Request,
        plan: &DecodePlan<'_>,
        _target: &mut dyn FieldTarget,
    ) -> DecodeResult<Extracted> {
        let Some(lookup) = ctx.path_value().map(Arc::clone) else {
            return Err(DecodeError::configuration(format!(
                "path value lookup not configured (field '{}')",
                plan.field
            )));
        };

        ctx.value_used(PATH, plan.name);

        let value = lookup
            .path_value(req, plan.name)
            .map_err(|source| DecodeError::PathLookup {
                name: plan.name.to_string(),
                source,
            })?;

        Ok(match value {
            Some(value) if plan.is_list() => Extracted::Value(RawValue::List(vec![value])),
            Some(value) => Extracted::Value(RawValue::Single(value)),
            None => Extracted::NotFound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::TagOptions;
    use crate::operation::testing::extract;

    fn ctx() -> DecodeContext {
        DecodeContext::new().with_path_value(Some(Arc::new(RequestParams)))
    }

    #[test]
    fn test_path_value() {
        let mut req = Request::builder().path_param("val", "x1").build();
        let mut ctx = ctx();
        let mut slot = String::new();

        let out = extract(&PathOperation, &mut ctx, &mut req, "val", &TagOptions::new(), &mut slot).unwrap();
        assert_eq!(out, Extracted::Value(RawValue::Single("x1".to_string())));
        assert!(ctx.is_value_used(PATH, "val"));
    }

    #[test]
    fn test_path_missing_still_recorded() {
        let mut req = Request::builder().build();
        let mut ctx = ctx();
        let mut slot = String::new();

        let out = extract(&PathOperation, &mut ctx, &mut req, "val", &TagOptions::new(), &mut slot).unwrap();
        assert_eq!(out, Extracted::NotFound);
        assert!(ctx.is_value_used(PATH, "val"));
    }

    #[test]
    fn test_path_without_lookup() {
        let mut req = Request::builder().path_param("val", "x1").build();
        let mut ctx = DecodeContext::new();
        let mut slot = String::new();

        let err = extract(&PathOperation, &mut ctx, &mut req, "val", &TagOptions::new(), &mut slot).unwrap_err();
        assert!(matches!(err, DecodeError::Configuration { .. }));
    }

    #[test]
    fn test_path_closure_lookup() {
        let lookup = |_req: &Request, name: &str| -> Result<Option<String>, BoxError> {
            Ok(Some(format!("{name}-value")))
        };
        let mut req = Request::builder().build();
        let mut ctx = DecodeContext::new().with_path_value(Some(Arc::new(lookup)));
        let mut slot = String::new();

        let out = extract(&PathOperation, &mut ctx, &mut req, "id", &TagOptions::new(), &mut slot).unwrap();
        assert_eq!(out, Extracted::Value(RawValue::Single("id-value".to_string())));
    }

    #[test]
    fn test_path_lookup_failure() {
        let lookup = |_req: &Request, _name: &str| -> Result<Option<String>, BoxError> {
            Err("router state missing".into())
        };
        let mut req = Request::builder().build();
        let mut ctx = DecodeContext::new().with_path_value(Some(Arc::new(lookup)));
        let mut slot = String::new();

        let err = extract(&PathOperation, &mut ctx, &mut req, "id", &TagOptions::new(), &mut slot).unwrap_err();
        assert!(matches!(err, DecodeError::PathLookup { ref name, .. } if name == "id"));
    }
}
