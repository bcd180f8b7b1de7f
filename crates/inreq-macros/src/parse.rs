//! Parsing of `#[inreq(...)]` attributes.

use proc_macro2::Span;
use syn::{spanned::Spanned, Attribute, LitBool, LitStr};

/// Operation names accepted as bare words.
const OPERATION_WORDS: [&str; 5] = ["query", "path", "header", "form", "body"];

/// When a struct-level operation runs relative to the fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum When {
    Before,
    After,
}

/// Parsed field attributes.
#[derive(Debug, Default)]
pub struct FieldAttrs {
    /// Operation name, from a bare word or `operation = "..."`.
    pub operation: Option<String>,
    /// Lookup name override.
    pub name: Option<String>,
    /// Explicit required flag.
    pub required: Option<bool>,
    /// Operation options in declaration order.
    pub options: Vec<(String, String)>,
    /// `#[inreq(recurse)]`
    pub recurse: bool,
    /// `#[inreq(ignore)]`
    pub ignore: bool,
}

impl FieldAttrs {
    /// Collects every `#[inreq(...)]` attribute of a field.
    pub fn from_attributes(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();

        for attr in attrs.iter().filter(|a| a.path().is_ident("inreq")) {
            attr.parse_nested_meta(|meta| {
                let key = meta_key(&meta.path)?;
                match key.as_str() {
                    "recurse" => parsed.recurse = true,
                    "ignore" => parsed.ignore = true,
                    "operation" => {
                        let value: LitStr = meta.value()?.parse()?;
                        set_operation(&mut parsed.operation, value.value(), value.span())?;
                    }
                    "name" => {
                        let value: LitStr = meta.value()?.parse()?;
                        parsed.name = Some(value.value());
                    }
                    "required" => {
                        let value = if meta.input.peek(syn::Token![=]) {
                            meta.value()?.parse::<LitBool>()?.value
                        } else {
                            true
                        };
                        parsed.required = Some(value);
                    }
                    "explode" => {
                        let value = if meta.input.peek(syn::Token![=]) {
                            meta.value()?.parse::<LitBool>()?.value
                        } else {
                            true
                        };
                        parsed.options.push((key, value.to_string()));
                    }
                    word if OPERATION_WORDS.contains(&word) && !meta.input.peek(syn::Token![=]) => {
                        set_operation(&mut parsed.operation, key.clone(), meta.path.span())?;
                    }
                    _ => {
                        let value: LitStr = meta.value()?.parse()?;
                        parsed.options.push((key, value.value()));
                    }
                }
                Ok(())
            })?;
        }

        parsed.check()?;
        Ok(parsed)
    }

    fn check(&self) -> syn::Result<()> {
        let span = Span::call_site();
        if self.ignore && (self.recurse || self.operation.is_some()) {
            return Err(syn::Error::new(
                span,
                "`ignore` cannot be combined with an operation",
            ));
        }
        if self.recurse && self.operation.is_some() {
            return Err(syn::Error::new(
                span,
                "`recurse` cannot be combined with another operation",
            ));
        }
        if self.recurse && (self.name.is_some() || !self.options.is_empty()) {
            return Err(syn::Error::new(
                span,
                "`recurse` fields take no name or options",
            ));
        }
        Ok(())
    }
}

/// Parsed struct attributes.
#[derive(Debug, Default)]
pub struct StructAttrs {
    /// Operation that decodes the whole struct.
    pub operation: Option<String>,
    /// When the struct operation runs relative to the fields.
    pub when: Option<When>,
    /// Struct operation options.
    pub options: Vec<(String, String)>,
    /// Implement whole-struct content decoding through serde.
    pub serde: bool,
}

impl StructAttrs {
    /// Collects every `#[inreq(...)]` attribute of a struct.
    pub fn from_attributes(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();

        for attr in attrs.iter().filter(|a| a.path().is_ident("inreq")) {
            attr.parse_nested_meta(|meta| {
                let key = meta_key(&meta.path)?;
                match key.as_str() {
                    "serde" => parsed.serde = true,
                    "operation" => {
                        let value: LitStr = meta.value()?.parse()?;
                        set_operation(&mut parsed.operation, value.value(), value.span())?;
                    }
                    "when" => {
                        let value: LitStr = meta.value()?.parse()?;
                        parsed.when = Some(match value.value().as_str() {
                            "before" => When::Before,
                            "after" => When::After,
                            other => {
                                return Err(syn::Error::new(
                                    value.span(),
                                    format!("expected \"before\" or \"after\", got \"{other}\""),
                                ))
                            }
                        });
                    }
                    word if OPERATION_WORDS.contains(&word) && !meta.input.peek(syn::Token![=]) => {
                        set_operation(&mut parsed.operation, key.clone(), meta.path.span())?;
                    }
                    _ => {
                        let value: LitStr = meta.value()?.parse()?;
                        parsed.options.push((key, value.value()));
                    }
                }
                Ok(())
            })?;
        }

        if parsed.operation.is_none() && (parsed.when.is_some() || !parsed.options.is_empty()) {
            return Err(syn::Error::new(
                Span::call_site(),
                "struct options require a struct-level operation",
            ));
        }
        Ok(parsed)
    }
}

fn meta_key(path: &syn::Path) -> syn::Result<String> {
    path.get_ident()
        .map(ToString::to_string)
        .ok_or_else(|| syn::Error::new(path.span(), "expected identifier"))
}

fn set_operation(slot: &mut Option<String>, operation: String, span: Span) -> syn::Result<()> {
    if let Some(existing) = slot {
        return Err(syn::Error::new(
            span,
            format!("operation already set to `{existing}`"),
        ));
    }
    *slot = Some(operation);
    Ok(())
}
