//! Derive macros for inreq.
//!
//! `#[derive(Decode)]` generates the field descriptors and the field visit
//! sequence the decoder walks. `#[derive(BodyValue)]` lets a serde type be
//! the destination of a `body` field.
//!
//! # Field attributes
//!
//! | Attribute | Meaning |
//! |-----------|---------|
//! | `query`, `path`, `header`, `form`, `body` | Operation that fills the field |
//! | `operation = "name"` | Any registered operation, including custom ones |
//! | `recurse` | Decode a nested `Decode` struct field by field |
//! | `ignore` | Skip the field entirely |
//! | `name = "key"` | Look the value up under `key` instead of the mapped field name |
//! | `required` / `required = false` | Whether a missing value is an error |
//! | `explode` | Query lists: split the first value instead of collecting repeats |
//! | `key = "value"` | Any other operation option (`explodesep`, `type`, ...) |
//!
//! Fields without an operation are skipped unless an override assigns one.
//!
//! # Struct attributes
//!
//! `#[inreq(body)]` decodes the whole struct from the body with serde. Add
//! `when = "before"` or `when = "after"` to also decode the fields, and
//! `#[inreq(serde)]` to enable whole-struct decoding for runtime overrides
//! only.
//!
//! # Example
//!
//! ```rust,ignore
//! use inreq::Decode;
//!
//! #[derive(Default, Decode)]
//! struct ListUsers {
//!     #[inreq(path)]
//!     org: String,
//!     #[inreq(query, required = false)]
//!     limit: Option<u32>,
//!     #[inreq(header, name = "Authorization")]
//!     token: String,
//! }
//! ```

mod derive;
mod parse;

use proc_macro::TokenStream;

/// Derives `inreq::Decode` for a struct with named fields.
#[proc_macro_derive(Decode, attributes(inreq))]
pub fn derive_decode(input: TokenStream) -> TokenStream {
    derive::expand_decode(input.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derives `inreq::FieldValue` for a serde type decoded from the body.
///
/// The type must implement `serde::Deserialize`. `Vec<T>` of the type is a
/// body field as well.
#[proc_macro_derive(BodyValue)]
pub fn derive_body_value(input: TokenStream) -> TokenStream {
    derive::expand_body_value(input.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
