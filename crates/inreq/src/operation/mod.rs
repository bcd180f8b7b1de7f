//! Decode operations.
//!
//! An [`Operation`] extracts the value of one struct field from one part of
//! the request. The decoder keeps a registry of operations by name; fields
//! select one with their `#[inreq(...)]` attribute or through an override
//! map. Five operations are registered by default:
//!
//! | Name | Operation | Source |
//! |------|-----------|--------|
//! | `query` | [`QueryOperation`] | URL query string |
//! | `path` | [`PathOperation`] | Path parameters, through a [`PathValue`] lookup |
//! | `header` | [`HeaderOperation`] | Request headers |
//! | `form` | [`FormOperation`] | URL-encoded or multipart form body |
//! | `body` | [`BodyOperation`] | Request body, decoded by content type |
//!
//! The `recurse` and `-` (ignore) names are handled by the decoder itself.

pub mod body;
pub mod form;
pub mod header;
pub mod path;
pub mod query;

pub use body::BodyOperation;
pub use form::FormOperation;
pub use header::HeaderOperation;
pub use path::{PathOperation, PathValue, RequestParams};
pub use query::QueryOperation;

use crate::content::ContentFormat;
use crate::context::DecodeContext;
use crate::error::{BoxError, DecodeResult};
use crate::info::TagOptions;
use crate::request::Request;
use crate::value::{FieldValue, RawValue, TypeKind};
use std::sync::Arc;

/// Name of the query operation.
pub const QUERY: &str = "query";
/// Name of the path operation.
pub const PATH: &str = "path";
/// Name of the header operation.
pub const HEADER: &str = "header";
/// Name of the form operation.
pub const FORM: &str = "form";
/// Name of the body operation.
pub const BODY: &str = "body";
/// Name that decodes a nested struct field by field.
pub const RECURSE: &str = "recurse";
/// Name that skips a field.
pub const IGNORE: &str = "-";

/// Outcome of an extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    /// The request holds no value for the field.
    NotFound,
    /// A raw value the decoder coerces into the field.
    Value(RawValue),
    /// The operation wrote the destination itself.
    Assigned,
}

/// Everything an operation needs to know about the field it decodes.
#[derive(Debug, Clone, Copy)]
pub struct DecodePlan<'a> {
    /// Dotted path of the field in the destination struct
    pub field: &'a str,
    /// Name of the operation being run
    pub operation: &'a str,
    /// Name the value is looked up under
    pub name: &'a str,
    /// Shape of the destination type
    pub kind: TypeKind,
    /// Whether a missing value is an error
    pub required: bool,
    /// Operation-specific options from the field attribute
    pub options: &'a TagOptions,
}

impl DecodePlan<'_> {
    /// Returns true if the destination holds several values.
    #[must_use]
    pub fn is_list(&self) -> bool {
        self.kind == TypeKind::List
    }
}

/// The destination slot of a field, as seen by operations that decode
/// content directly into it.
pub trait FieldTarget {
    /// Shape of the destination type.
    fn kind(&self) -> TypeKind;

    /// Name of the destination type, for error messages.
    fn type_name(&self) -> &'static str;

    /// Decodes JSON or XML content into the destination.
    ///
    /// Returns `None` if the destination cannot be decoded from content.
    fn decode_content(&mut self, format: ContentFormat, bytes: &[u8]) -> Option<Result<(), BoxError>>;

    /// Returns true if the destination can be parsed from plain text.
    fn supports_text(&self) -> bool;

    /// Parses plain text into the destination.
    fn parse_text(&mut self, bytes: &[u8]) -> Option<Result<(), BoxError>>;
}

pub(crate) struct ValueTarget<'a, T>(pub(crate) &'a mut T);

impl<T: FieldValue> FieldTarget for ValueTarget<'_, T> {
    fn kind(&self) -> TypeKind {
        T::KIND
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn decode_content(&mut self, format: ContentFormat, bytes: &[u8]) -> Option<Result<(), BoxError>> {
        T::decode_content(format, bytes).map(|result| result.map(|value| *self.0 = value))
    }

    fn supports_text(&self) -> bool {
        T::TEXT
    }

    fn parse_text(&mut self, bytes: &[u8]) -> Option<Result<(), BoxError>> {
        T::parse_text(bytes).map(|result| result.map(|value| *self.0 = value))
    }
}

/// Extracts field values from one part of the request.
///
/// Implementations must be stateless: all per-call state lives in the
/// [`DecodeContext`].
pub trait Operation: Send + Sync {
    /// Extracts the value for the field described by `plan`.
    fn extract(
        &self,
        ctx: &mut DecodeContext,
        req: &mut Request,
        plan: &DecodePlan<'_>,
        target: &mut dyn FieldTarget,
    ) -> DecodeResult<Extracted>;

    /// Runs after every field was decoded.
    fn validate(&self, _ctx: &DecodeContext, _req: &Request) -> DecodeResult<()> {
        Ok(())
    }

    /// Returns true if the operation can decode a whole struct at once.
    fn supports_struct(&self) -> bool {
        false
    }
}

/// Returns the operations registered by default, in registration order.
#[must_use]
pub fn default_operations() -> Vec<(&'static str, Arc<dyn Operation>)> {
    vec![
        (QUERY, Arc::new(QueryOperation)),
        (PATH, Arc::new(PathOperation)),
        (HEADER, Arc::new(HeaderOperation)),
        (FORM, Arc::new(FormOperation)),
        (BODY, Arc::new(BodyOperation)),
    ]
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub(crate) fn plan<'a>(name: &'a str, kind: TypeKind, options: &'a TagOptions) -> DecodePlan<'a> {
        DecodePlan {
            field: name,
            operation: "test",
            name,
            kind,
            required: true,
            options,
        }
    }

    pub(crate) fn extract<T: FieldValue>(
        op: &dyn Operation,
        ctx: &mut DecodeContext,
        req: &mut Request,
        name: &str,
        options: &TagOptions,
        slot: &mut T,
    ) -> DecodeResult<Extracted> {
        let plan = plan(name, T::KIND, options);
        op.extract(ctx, req, &plan, &mut ValueTarget(slot))
    }
}
