//! Struct traversal.
//!
//! A decode call walks the destination struct through its generated
//! [`Decode::visit`] implementation. The visitor resolves each field's
//! operation (override first, then the declared one), runs it and coerces
//! the extracted value into the field. Nested structs are walked
//! recursively, and a struct-level operation may decode the whole struct
//! before or after its fields.

use crate::content::ContentFormat;
use crate::context::DecodeContext;
use crate::decoder::DecoderInner;
use crate::error::{BoxError, DecodeError, DecodeResult};
use crate::info::{FieldInfo, StructInfo, StructSpec, TagOptions, When};
use crate::operation::{
    DecodePlan, Extracted, FieldTarget, ValueTarget, IGNORE, RECURSE,
};
use crate::overrides::{Override, Overrides, STRUCT_KEY};
use crate::request::Request;
use crate::value::{FieldValue, ResolveContext, TypeKind};
use std::sync::Arc;

/// A struct that can be decoded from a request.
///
/// Implemented by `#[derive(Decode)]`. The field indices passed to the
/// visitor follow the order of [`Decode::describe`].
pub trait Decode: 'static {
    /// Describes the struct's fields.
    fn describe() -> StructSpec;

    /// Hands every described field to the visitor.
    fn visit(&mut self, visitor: &mut FieldVisitor<'_, '_>) -> DecodeResult<()>;

    /// Decodes JSON or XML content into the whole struct.
    ///
    /// Needed by struct-level operations such as `#[inreq(body)]`. Returns
    /// `None` when the struct does not support content decoding.
    fn decode_content(&mut self, _format: ContentFormat, _bytes: &[u8]) -> Option<Result<(), BoxError>> {
        None
    }
}

/// State of one decode call.
pub(crate) struct Session<'a> {
    decoder: &'a DecoderInner,
    ctx: DecodeContext,
    req: &'a mut Request,
    unused_overrides: Vec<String>,
}

impl<'a> Session<'a> {
    pub(crate) fn new(decoder: &'a DecoderInner, ctx: DecodeContext, req: &'a mut Request) -> Self {
        Self {
            decoder,
            ctx,
            req,
            unused_overrides: Vec::new(),
        }
    }

    /// Decodes `dest` according to `info`.
    ///
    /// `inherited` is an operation a parent override assigned to this
    /// struct; it takes precedence over the `_` key and the declared
    /// struct-level operation.
    pub(crate) fn decode_struct<T: Decode>(
        &mut self,
        dest: &mut T,
        info: &StructInfo,
        overrides: Overrides<'a>,
        inherited: Option<&'a str>,
        path: &str,
    ) -> DecodeResult<()> {
        self.check_overrides(info, overrides, path);

        let operation = inherited
            .or_else(|| overrides.struct_operation())
            .map(str::to_owned)
            .or_else(|| info.struct_option().map(|o| o.operation().to_owned()));
        let when = info.struct_option().and_then(|o| o.when());

        match operation.as_deref() {
            None | Some(RECURSE) => self.visit_fields(dest, info, overrides, path),
            Some(IGNORE) => Ok(()),
            Some(operation) => match when {
                None => self.decode_whole(dest, info, operation, path),
                Some(When::Before) => {
                    self.decode_whole(dest, info, operation, path)?;
                    self.visit_fields(dest, info, overrides, path)
                }
                Some(When::After) => {
                    self.visit_fields(dest, info, overrides, path)?;
                    self.decode_whole(dest, info, operation, path)
                }
            },
        }
    }

    /// Runs the exhaustiveness checks and hands back the context.
    pub(crate) fn finish(self) -> DecodeResult<DecodeContext> {
        if !self.unused_overrides.is_empty() {
            return Err(DecodeError::values_not_used("overrides", self.unused_overrides));
        }
        for operation in self.decoder.operations.values() {
            operation.validate(&self.ctx, self.req)?;
        }
        tracing::debug!(body_consumed = self.ctx.is_body_consumed(), "decode finished");
        Ok(self.ctx)
    }

    fn check_overrides(&mut self, info: &StructInfo, overrides: Overrides<'a>, path: &str) {
        for (key, entry) in overrides.entries() {
            if key == STRUCT_KEY {
                continue;
            }
            let matched = match info.field(key) {
                None => false,
                Some(field) => field.nested().is_some() || matches!(entry, Override::Operation(_)),
            };
            if !matched {
                self.unused_overrides.push(format!("{path}{key}"));
            }
        }
    }

    fn visit_fields<T: Decode>(
        &mut self,
        dest: &mut T,
        info: &StructInfo,
        overrides: Overrides<'a>,
        path: &str,
    ) -> DecodeResult<()> {
        let mut visitor = FieldVisitor {
            session: self,
            info,
            overrides,
            path,
        };
        dest.visit(&mut visitor)
    }

    fn decode_whole<T: Decode>(
        &mut self,
        dest: &mut T,
        info: &StructInfo,
        operation: &str,
        path: &str,
    ) -> DecodeResult<()> {
        let decoder = self.decoder;
        let handler = decoder.operation(operation)?;
        if !handler.supports_struct() {
            return Err(DecodeError::unsupported(operation));
        }

        let empty = TagOptions::new();
        let field = path.strip_suffix('.').unwrap_or(info.type_name());
        let plan = DecodePlan {
            field,
            operation,
            name: field,
            kind: TypeKind::Struct,
            required: decoder.default_required,
            options: info.struct_option().map_or(&empty, |o| o.options()),
        };

        let extracted = handler.extract(&mut self.ctx, self.req, &plan, &mut StructTarget(dest))?;
        tracing::trace!(field, operation, ?extracted, "decoded struct");

        match extracted {
            Extracted::Assigned => Ok(()),
            Extracted::NotFound if plan.required => Err(DecodeError::RequiredFieldMissing {
                field: field.to_owned(),
                operation: operation.to_owned(),
                name: field.to_owned(),
            }),
            Extracted::NotFound => Ok(()),
            Extracted::Value(_) => Err(DecodeError::invalid_target(format!(
                "operation '{operation}' produced a raw value for struct {}",
                info.type_name()
            ))),
        }
    }
}

/// Walks the fields of one struct during a decode call.
///
/// Handed to [`Decode::visit`]; generated code calls [`value`](Self::value)
/// or [`recurse`](Self::recurse) once per described field.
pub struct FieldVisitor<'v, 'a> {
    session: &'v mut Session<'a>,
    info: &'v StructInfo,
    overrides: Overrides<'a>,
    path: &'v str,
}

impl<'v, 'a> FieldVisitor<'v, 'a> {
    fn field_info(&self, index: usize) -> DecodeResult<&'v FieldInfo> {
        let info = self.info;
        info.fields().get(index).ok_or_else(|| {
            DecodeError::invalid_target(format!("{} has no field #{index}", info.type_name()))
        })
    }

    /// Decodes the value field at `index` into `slot`.
    pub fn value<T: FieldValue>(&mut self, index: usize, slot: &mut T) -> DecodeResult<()> {
        let field = self.field_info(index)?;
        let path = format!("{}{}", self.path, field.field());
        if field.nested().is_some() {
            return Err(DecodeError::invalid_target(format!(
                "field '{path}' is a nested struct"
            )));
        }

        let operation = match self.overrides.get(field.field()) {
            Some(Override::Operation(operation)) => Some(operation.as_str()),
            _ => field.operation(),
        };
        let Some(operation) = operation else {
            tracing::trace!(field = %path, "no operation, skipped");
            return Ok(());
        };
        match operation {
            IGNORE => return Ok(()),
            RECURSE => {
                return Err(DecodeError::invalid_target(format!(
                    "field '{path}' is not a struct and cannot be recursed"
                )))
            }
            _ => {}
        }

        let decoder = self.session.decoder;
        let handler = decoder.operation(operation)?;
        let plan = DecodePlan {
            field: &path,
            operation,
            name: field.name(),
            kind: T::KIND,
            required: field.required(),
            options: field.options(),
        };

        let session = &mut *self.session;
        let extracted = handler.extract(&mut session.ctx, session.req, &plan, &mut ValueTarget(&mut *slot))?;
        tracing::trace!(field = %path, operation, name = plan.name, ?extracted, "decoded field");

        match extracted {
            Extracted::NotFound if plan.required => Err(DecodeError::RequiredFieldMissing {
                field: path,
                operation: operation.to_owned(),
                name: field.name().to_owned(),
            }),
            Extracted::NotFound | Extracted::Assigned => Ok(()),
            Extracted::Value(raw) => {
                let cx = ResolveContext::new(session.ctx.separator());
                *slot = T::resolve(&raw, &cx).map_err(|source| DecodeError::Coercion {
                    field: path,
                    value: raw.to_string(),
                    source,
                })?;
                Ok(())
            }
        }
    }

    /// Decodes the nested struct field at `index` into `slot`.
    pub fn recurse<T: Decode>(&mut self, index: usize, slot: &mut T) -> DecodeResult<()> {
        let field = self.field_info(index)?;
        let Some(nested) = field.nested().map(Arc::clone) else {
            return Err(DecodeError::invalid_target(format!(
                "field '{}{}' is not a nested struct",
                self.path,
                field.field()
            )));
        };

        let inherited = match self.overrides.get(field.field()) {
            Some(Override::Operation(operation)) if operation == IGNORE => return Ok(()),
            Some(Override::Operation(operation)) => Some(operation.as_str()),
            _ => None,
        };

        let decoder = self.session.decoder;
        let fallback = field
            .nested_type()
            .and_then(|id| decoder.default_overrides.get(&id));
        let overrides = self.overrides.nested(field.field(), fallback);
        let path = format!("{}{}.", self.path, field.field());
        self.session.decode_struct(slot, &nested, overrides, inherited, &path)
    }
}

struct StructTarget<'a, T>(&'a mut T);

impl<T: Decode> FieldTarget for StructTarget<'_, T> {
    fn kind(&self) -> TypeKind {
        TypeKind::Struct
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn decode_content(&mut self, format: ContentFormat, bytes: &[u8]) -> Option<Result<(), BoxError>> {
        self.0.decode_content(format, bytes)
    }

    fn supports_text(&self) -> bool {
        false
    }

    fn parse_text(&mut self, _bytes: &[u8]) -> Option<Result<(), BoxError>> {
        None
    }
}
