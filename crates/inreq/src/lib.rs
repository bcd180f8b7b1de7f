//! # inreq
//!
//! Declarative decoding of HTTP requests into structs.
//!
//! Each struct field declares which part of the request it comes from. The
//! decoder runs the matching operation for every field, coerces the raw
//! value into the field type and, optionally, checks that every query
//! parameter or form value was consumed.
//!
//! ## Operations
//!
//! | Attribute | Source |
//! |-----------|--------|
//! | `#[inreq(query)]` | URL query string |
//! | `#[inreq(path)]` | Path parameters |
//! | `#[inreq(header)]` | Request headers |
//! | `#[inreq(form)]` | URL-encoded or multipart form body |
//! | `#[inreq(body)]` | Request body (raw, JSON, XML or text) |
//! | `#[inreq(recurse)]` | Nested struct, decoded field by field |
//! | `#[inreq(ignore)]` | Skipped |
//!
//! ## Example
//!
//! ```rust
//! use inreq::{BodyValue, Decode, Decoder, Request, RequestParams};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Default, Deserialize, BodyValue)]
//! struct NewItem {
//!     title: String,
//! }
//!
//! #[derive(Debug, Default, Decode)]
//! struct CreateItem {
//!     #[inreq(path)]
//!     list_id: u64,
//!     #[inreq(header, name = "X-Request-Id", required = false)]
//!     request_id: Option<String>,
//!     #[inreq(query)]
//!     tags: Vec<String>,
//!     #[inreq(body)]
//!     item: NewItem,
//! }
//!
//! let decoder = Decoder::builder().path_value(RequestParams).build();
//! let mut req = Request::builder()
//!     .method(http::Method::POST)
//!     .uri("/lists/7/items?tags=a,b".parse().unwrap())
//!     .header("content-type", "application/json")
//!     .header("x-request-id", "r-1")
//!     .path_param("list_id", "7")
//!     .body(r#"{"title":"milk"}"#)
//!     .build();
//!
//! let create: CreateItem = decoder.decode_new(&mut req).unwrap();
//! assert_eq!(create.list_id, 7);
//! assert_eq!(create.request_id.as_deref(), Some("r-1"));
//! assert_eq!(create.tags, ["a", "b"]);
//! assert_eq!(create.item.title, "milk");
//! ```
//!
//! ## Overrides
//!
//! An [`OverrideMap`] redirects fields to another operation for one call
//! without changing the struct:
//!
//! ```rust
//! use inreq::{Decode, DecodeOptions, Decoder, OverrideMap, Request};
//!
//! #[derive(Debug, Default, Decode)]
//! struct Lookup {
//!     #[inreq(query)]
//!     key: String,
//! }
//!
//! let mut req = Request::builder().header("key", "from-header").build();
//! let options = DecodeOptions::new().overrides(OverrideMap::new().operation("key", "header"));
//!
//! let lookup: Lookup = Decoder::new().decode_new_with(&mut req, &options).unwrap();
//! assert_eq!(lookup.key, "from-header");
//! ```
//!
//! ## Errors
//!
//! Every failure is a [`DecodeError`], which maps to an HTTP status:
//!
//! ```rust
//! use inreq::DecodeError;
//!
//! let err = DecodeError::RequiredFieldMissing {
//!     field: "page".to_string(),
//!     operation: "query".to_string(),
//!     name: "page".to_string(),
//! };
//! assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
//! ```

#![doc(html_root_url = "https://docs.rs/inreq/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

extern crate self as inreq;

mod config;
mod content;
mod context;
mod decoder;
mod error;
mod info;
mod multipart;
pub mod operation;
mod overrides;
mod params;
mod request;
pub mod validate;
pub mod value;
mod walk;

// Re-export main types
pub use config::{ConfigError, DecoderConfig};
pub use content::{resolve_format, ContentDecoder, ContentFormat, DefaultContentDecoder};
pub use context::{DecodeContext, DEFAULT_MAX_BODY_SIZE, DEFAULT_SEPARATOR};
pub use decoder::{
    decode, decode_new, decode_new_with, decode_with, DecodeOptions, Decoder, DecoderBuilder,
    TypeDecoder,
};
pub use error::{BoxError, DecodeError, DecodeResult, ResolveError, ResolveErrorKind};
pub use info::{
    FieldInfo, FieldNameMapper, FieldSpec, StructInfo, StructOption, StructSpec, TagOptions, When,
};
pub use operation::{
    DecodePlan, Extracted, FieldTarget, Operation, PathValue, RequestParams,
};
pub use overrides::{Override, OverrideMap, STRUCT_KEY};
pub use params::Params;
pub use request::{Body, Request, RequestBuilder, ValueMap};
pub use value::{FieldValue, RawValue, ResolveContext, ScalarValue, TypeKind};
pub use walk::{Decode, FieldVisitor};

// Derive macros share their trait's name, as serde does
pub use inreq_macros::{BodyValue, Decode};
