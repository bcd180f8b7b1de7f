//! Query string operation.

use super::{DecodePlan, Extracted, FieldTarget, Operation, QUERY};
use crate::context::DecodeContext;
use crate::error::DecodeResult;
use crate::request::Request;
use crate::validate::ensure_all_used;
use crate::value::RawValue;

/// Reads values from the URL query string.
///
/// A single-valued field receives the first value. A list field receives
/// every value under the key. With the `explode` option (or an `explodesep`
/// separator) the first value is split instead, on `explodesep` or the
/// decoder's separator. An empty `explodesep` counts as unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOperation;

impl Operation for QueryOperation {
    fn extract(
        &self,
        ctx: &mut DecodeContext,
        req: &mut Request,
        plan: &DecodePlan<'_>,
        _target: &mut dyn FieldTarget,
    ) -> DecodeResult<Extracted> {
        let Some(values) = req.query().get(plan.name) else {
            return Ok(Extracted::NotFound);
        };
        let first = values.first().cloned().unwrap_or_default();

        let raw = if plan.is_list() {
            let explode_sep = plan.options.get("explodesep").filter(|sep| !sep.is_empty());
            if explode_sep.is_some() || plan.options.flag("explode")? {
                let sep = explode_sep.unwrap_or_else(|| ctx.separator());
                RawValue::List(first.split(sep).map(str::to_owned).collect())
            } else {
                RawValue::List(values.to_vec())
            }
        } else {
            RawValue::Single(first)
        };

        ctx.value_used(QUERY, plan.name);
        Ok(Extracted::Value(raw))
    }

    fn validate(&self, ctx: &DecodeContext, req: &Request) -> DecodeResult<()> {
        if !ctx.ensure_all_query_used() {
            return Ok(());
        }
        ensure_all_used(QUERY, req.query().keys(), ctx.used_values(QUERY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::info::TagOptions;
    use crate::operation::testing::extract;
    use http::Uri;

    fn request(uri: &'static str) -> Request {
        Request::builder().uri(Uri::from_static(uri)).build()
    }

    #[test]
    fn test_query_single_value() {
        let mut req = request("/?val=x1&val=x2");
        let mut ctx = DecodeContext::new();
        let mut slot = String::new();

        let out = extract(&QueryOperation, &mut ctx, &mut req, "val", &TagOptions::new(), &mut slot).unwrap();
        assert_eq!(out, Extracted::Value(RawValue::Single("x1".to_string())));
        assert!(ctx.is_value_used(QUERY, "val"));
    }

    #[test]
    fn test_query_missing_key_not_used() {
        let mut req = request("/?other=1");
        let mut ctx = DecodeContext::new();
        let mut slot = String::new();

        let out = extract(&QueryOperation, &mut ctx, &mut req, "val", &TagOptions::new(), &mut slot).unwrap();
        assert_eq!(out, Extracted::NotFound);
        assert!(ctx.used_values(QUERY).is_none());
    }

    #[test]
    fn test_query_list_values() {
        let mut req = request("/?val=1&val=2");
        let mut ctx = DecodeContext::new();
        let mut slot: Vec<i32> = Vec::new();

        let out = extract(&QueryOperation, &mut ctx, &mut req, "val", &TagOptions::new(), &mut slot).unwrap();
        assert_eq!(
            out,
            Extracted::Value(RawValue::List(vec!["1".to_string(), "2".to_string()]))
        );
    }

    #[test]
    fn test_query_explode() {
        let mut req = request("/?val=1,2,3");
        let mut ctx = DecodeContext::new();
        let mut slot: Vec<i32> = Vec::new();
        let options: TagOptions = [("explode", "true")].into_iter().collect();

        let out = extract(&QueryOperation, &mut ctx, &mut req, "val", &options, &mut slot).unwrap();
        assert_eq!(
            out,
            Extracted::Value(RawValue::List(vec![
                "1".to_string(),
                "2".to_string(),
                "3".to_string()
            ]))
        );
    }

    #[test]
    fn test_query_explode_separator_implies_explode() {
        let mut req = request("/?val=1;2");
        let mut ctx = DecodeContext::new();
        let mut slot: Vec<i32> = Vec::new();
        let options: TagOptions = [("explodesep", ";")].into_iter().collect();

        let out = extract(&QueryOperation, &mut ctx, &mut req, "val", &options, &mut slot).unwrap();
        assert_eq!(
            out,
            Extracted::Value(RawValue::List(vec!["1".to_string(), "2".to_string()]))
        );
    }

    #[test]
    fn test_query_empty_explode_separator_falls_back() {
        let mut req = request("/?val=5,6");
        let mut ctx = DecodeContext::new();
        let mut slot: Vec<i32> = Vec::new();
        let options: TagOptions = [("explode", "true"), ("explodesep", "")].into_iter().collect();

        let out = extract(&QueryOperation, &mut ctx, &mut req, "val", &options, &mut slot).unwrap();
        assert_eq!(
            out,
            Extracted::Value(RawValue::List(vec!["5".to_string(), "6".to_string()]))
        );

        let options: TagOptions = [("explodesep", "")].into_iter().collect();
        let mut req = request("/?val=5,6&val=7");
        let out = extract(&QueryOperation, &mut ctx, &mut req, "val", &options, &mut slot).unwrap();
        assert_eq!(
            out,
            Extracted::Value(RawValue::List(vec!["5,6".to_string(), "7".to_string()]))
        );
    }

    #[test]
    fn test_query_invalid_explode_flag() {
        let mut req = request("/?val=1");
        let mut ctx = DecodeContext::new();
        let mut slot: Vec<i32> = Vec::new();
        let options: TagOptions = [("explode", "maybe")].into_iter().collect();

        let err = extract(&QueryOperation, &mut ctx, &mut req, "val", &options, &mut slot).unwrap_err();
        assert!(matches!(err, DecodeError::Configuration { .. }));
    }

    #[test]
    fn test_query_validate() {
        let req = request("/?a=1&b=2");
        let mut ctx = DecodeContext::new().with_ensure_all_query_used(true);
        ctx.value_used(QUERY, "a");

        let err = QueryOperation.validate(&ctx, &req).unwrap_err();
        match err {
            DecodeError::ValuesNotUsed { source_name, keys } => {
                assert_eq!(source_name, "query");
                assert_eq!(keys, vec!["b".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        ctx.value_used(QUERY, "b");
        assert!(QueryOperation.validate(&ctx, &req).is_ok());
    }

    #[test]
    fn test_query_validate_disabled() {
        let req = request("/?a=1");
        let ctx = DecodeContext::new();
        assert!(QueryOperation.validate(&ctx, &req).is_ok());
    }
}
