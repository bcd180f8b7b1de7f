//! Header operation.

use super::{DecodePlan, Extracted, FieldTarget, Operation, HEADER};
use crate::context::DecodeContext;
use crate::error::DecodeResult;
use crate::request::Request;
use crate::value::RawValue;

/// Reads values from request headers.
///
/// Header names match case-insensitively. A list field receives every value
/// of the header, a single-valued field the first one. Consumption is
/// recorded but headers are never checked for exhaustiveness.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderOperation;

impl Operation for HeaderOperation {
    fn extract(
        &self,
        ctx: &mut DecodeContext,
        req: &mut Request,
        plan: &DecodePlan<'_>,
        _target: &mut dyn FieldTarget,
    ) -> DecodeResult<Extracted> {
        let mut values: Vec<String> = req
            .headers()
            .get_all(plan.name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect();

        if values.is_empty() {
            return Ok(Extracted::NotFound);
        }
        ctx.value_used(HEADER, plan.name);

        if plan.is_list() {
            return Ok(Extracted::Value(RawValue::List(values)));
        }
        Ok(Extracted::Value(RawValue::Single(values.swap_remove(0))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::TagOptions;
    use crate::operation::testing::extract;

    #[test]
    fn test_header_case_insensitive() {
        let mut req = Request::builder().header("X-Request-Id", "abc").build();
        let mut ctx = DecodeContext::new();
        let mut slot = String::new();

        let out = extract(&HeaderOperation, &mut ctx, &mut req, "x-REQUEST-id", &TagOptions::new(), &mut slot).unwrap();
        assert_eq!(out, Extracted::Value(RawValue::Single("abc".to_string())));
    }

    #[test]
    fn test_header_first_value() {
        let mut req = Request::builder()
            .header("val", "x1")
            .header("val", "x2")
            .build();
        let mut ctx = DecodeContext::new();
        let mut slot = String::new();

        let out = extract(&HeaderOperation, &mut ctx, &mut req, "val", &TagOptions::new(), &mut slot).unwrap();
        assert_eq!(out, Extracted::Value(RawValue::Single("x1".to_string())));
        assert!(ctx.is_value_used(HEADER, "val"));
    }

    #[test]
    fn test_header_list() {
        let mut req = Request::builder()
            .header("val", "1")
            .header("val", "2")
            .build();
        let mut ctx = DecodeContext::new();
        let mut slot: Vec<i32> = Vec::new();

        let out = extract(&HeaderOperation, &mut ctx, &mut req, "val", &TagOptions::new(), &mut slot).unwrap();
        assert_eq!(
            out,
            Extracted::Value(RawValue::List(vec!["1".to_string(), "2".to_string()]))
        );
    }

    #[test]
    fn test_header_missing() {
        let mut req = Request::builder().build();
        let mut ctx = DecodeContext::new();
        let mut slot = String::new();

        let out = extract(&HeaderOperation, &mut ctx, &mut req, "val", &TagOptions::new(), &mut slot).unwrap();
        assert_eq!(out, Extracted::NotFound);
        assert!(ctx.used_values(HEADER).is_none());
    }
}
