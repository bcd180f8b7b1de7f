//! The decoder: operation registry, settings and entry points.

use crate::config::{ConfigError, DecoderConfig};
use crate::content::{ContentDecoder, DefaultContentDecoder};
use crate::context::{DecodeContext, DEFAULT_MAX_BODY_SIZE, DEFAULT_SEPARATOR};
use crate::error::{DecodeError, DecodeResult};
use crate::info::{FieldNameMapper, StructInfo};
use crate::operation::{default_operations, Operation, PathValue};
use crate::overrides::{OverrideMap, Overrides};
use crate::request::Request;
use crate::walk::{Decode, Session};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

pub(crate) struct DecoderInner {
    pub(crate) operations: IndexMap<String, Arc<dyn Operation>>,
    pub(crate) path_value: Option<Arc<dyn PathValue>>,
    pub(crate) content_decoder: Arc<dyn ContentDecoder>,
    pub(crate) field_name_mapper: FieldNameMapper,
    pub(crate) default_required: bool,
    pub(crate) separator: String,
    pub(crate) allow_read_body: bool,
    pub(crate) ensure_all_query_used: bool,
    pub(crate) ensure_all_form_used: bool,
    pub(crate) max_body_size: usize,
    pub(crate) default_overrides: HashMap<TypeId, OverrideMap>,
    pub(crate) cache: Option<RwLock<HashMap<TypeId, Arc<StructInfo>>>>,
}

impl DecoderInner {
    pub(crate) fn operation(&self, name: &str) -> DecodeResult<&Arc<dyn Operation>> {
        self.operations
            .get(name)
            .ok_or_else(|| DecodeError::unsupported(name))
    }
}

/// Decodes requests into structs.
///
/// A decoder is immutable once built and cheap to clone; share one across
/// handlers.
///
/// # Example
///
/// ```rust
/// use inreq::{Decode, Decoder, Request};
///
/// #[derive(Debug, Default, Decode)]
/// struct Search {
///     #[inreq(query, name = "q")]
///     term: String,
///     #[inreq(query)]
///     page: Option<u32>,
/// }
///
/// let decoder = Decoder::new();
/// let mut req = Request::builder()
///     .uri("/search?q=rust&page=2".parse().unwrap())
///     .build();
///
/// let search: Search = decoder.decode_new(&mut req).unwrap();
/// assert_eq!(search.term, "rust");
/// assert_eq!(search.page, Some(2));
/// ```
#[derive(Clone)]
pub struct Decoder {
    inner: Arc<DecoderInner>,
}

impl Decoder {
    /// Creates a decoder with the default operations and settings.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts a builder preloaded with the default operations.
    #[must_use]
    pub fn builder() -> DecoderBuilder {
        DecoderBuilder::new()
    }

    /// Starts a builder with no operations registered.
    #[must_use]
    pub fn custom() -> DecoderBuilder {
        DecoderBuilder::empty()
    }

    /// Creates a decoder from a validated configuration.
    pub fn from_config(config: &DecoderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::builder().config(config).build())
    }

    /// Returns the registered operation names in registration order.
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.inner.operations.keys().map(String::as_str)
    }

    /// Returns the resolved descriptor of `T`.
    pub fn struct_info<T: Decode>(&self) -> Arc<StructInfo> {
        let inner = &*self.inner;
        let build = || {
            Arc::new(StructInfo::build(
                T::describe(),
                &inner.field_name_mapper,
                inner.default_required,
            ))
        };

        let Some(cache) = &inner.cache else {
            return build();
        };
        let id = TypeId::of::<T>();
        if let Some(info) = cache.read().get(&id) {
            return Arc::clone(info);
        }
        let info = build();
        Arc::clone(cache.write().entry(id).or_insert(info))
    }

    /// Decodes `req` into `dest`.
    ///
    /// Fields with no value in the request keep their current value.
    pub fn decode<T: Decode>(&self, req: &mut Request, dest: &mut T) -> DecodeResult<()> {
        self.run(req, dest, &DecodeOptions::default()).map(drop)
    }

    /// Decodes `req` into `dest` with per-call options.
    pub fn decode_with<T: Decode>(
        &self,
        req: &mut Request,
        dest: &mut T,
        options: &DecodeOptions,
    ) -> DecodeResult<()> {
        self.run(req, dest, options).map(drop)
    }

    /// Decodes `req` into `dest` and returns the call's context, which
    /// records what was consumed.
    pub fn decode_with_context<T: Decode>(
        &self,
        req: &mut Request,
        dest: &mut T,
        options: &DecodeOptions,
    ) -> DecodeResult<DecodeContext> {
        self.run(req, dest, options)
    }

    /// Decodes `req` into a new `T`.
    pub fn decode_new<T: Decode + Default>(&self, req: &mut Request) -> DecodeResult<T> {
        self.decode_new_with(req, &DecodeOptions::default())
    }

    /// Decodes `req` into a new `T` with per-call options.
    pub fn decode_new_with<T: Decode + Default>(
        &self,
        req: &mut Request,
        options: &DecodeOptions,
    ) -> DecodeResult<T> {
        let mut dest = T::default();
        self.run(req, &mut dest, options)?;
        Ok(dest)
    }

    fn run<T: Decode>(
        &self,
        req: &mut Request,
        dest: &mut T,
        options: &DecodeOptions,
    ) -> DecodeResult<DecodeContext> {
        let span = tracing::debug_span!("inreq.decode", target = type_name::<T>());
        let _enter = span.enter();

        let inner = &*self.inner;
        let info = self.struct_info::<T>();
        let ctx = DecodeContext::new()
            .with_path_value(options.path_value.clone().or_else(|| inner.path_value.clone()))
            .with_content_decoder(Arc::clone(&inner.content_decoder))
            .with_separator(options.separator.as_deref().unwrap_or(&inner.separator))
            .with_allow_read_body(options.allow_read_body.unwrap_or(inner.allow_read_body))
            .with_ensure_all_query_used(
                options
                    .ensure_all_query_used
                    .unwrap_or(inner.ensure_all_query_used),
            )
            .with_ensure_all_form_used(
                options
                    .ensure_all_form_used
                    .unwrap_or(inner.ensure_all_form_used),
            )
            .with_max_body_size(options.max_body_size.unwrap_or(inner.max_body_size));

        let overrides = Overrides::new(
            options.overrides.as_ref(),
            inner.default_overrides.get(&TypeId::of::<T>()),
        );

        let mut session = Session::new(inner, ctx, req);
        session.decode_struct(dest, &info, overrides, None, "")?;
        session.finish()
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = &*self.inner;
        f.debug_struct("Decoder")
            .field("operations", &inner.operations.keys().collect::<Vec<_>>())
            .field("default_required", &inner.default_required)
            .field("separator", &inner.separator)
            .field("allow_read_body", &inner.allow_read_body)
            .field("ensure_all_query_used", &inner.ensure_all_query_used)
            .field("ensure_all_form_used", &inner.ensure_all_form_used)
            .field("max_body_size", &inner.max_body_size)
            .field("struct_info_cache", &inner.cache.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Decoder`].
///
/// # Example
///
/// ```rust
/// use inreq::Decoder;
///
/// let decoder = Decoder::builder()
///     .default_required(false)
///     .slice_split_separator(";")
///     .ensure_all_query_used(true)
///     .without_operation("form")
///     .build();
///
/// assert_eq!(
///     decoder.operation_names().collect::<Vec<_>>(),
///     ["query", "path", "header", "body"]
/// );
/// ```
pub struct DecoderBuilder {
    operations: IndexMap<String, Arc<dyn Operation>>,
    path_value: Option<Arc<dyn PathValue>>,
    content_decoder: Arc<dyn ContentDecoder>,
    field_name_mapper: FieldNameMapper,
    default_required: bool,
    separator: String,
    allow_read_body: bool,
    ensure_all_query_used: bool,
    ensure_all_form_used: bool,
    max_body_size: usize,
    default_overrides: HashMap<TypeId, OverrideMap>,
    struct_info_cache: bool,
}

impl DecoderBuilder {
    /// Creates a builder with the default operations.
    #[must_use]
    pub fn new() -> Self {
        let mut builder = Self::empty();
        for (name, operation) in default_operations() {
            builder.operations.insert(name.to_owned(), operation);
        }
        builder
    }

    /// Creates a builder with no operations.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            operations: IndexMap::new(),
            path_value: None,
            content_decoder: Arc::new(DefaultContentDecoder),
            field_name_mapper: FieldNameMapper::default(),
            default_required: true,
            separator: DEFAULT_SEPARATOR.to_owned(),
            allow_read_body: true,
            ensure_all_query_used: false,
            ensure_all_form_used: false,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            default_overrides: HashMap::new(),
            struct_info_cache: false,
        }
    }

    /// Registers an operation, replacing any operation with the same name.
    #[must_use]
    pub fn operation(mut self, name: impl Into<String>, operation: impl Operation + 'static) -> Self {
        self.operations.insert(name.into(), Arc::new(operation));
        self
    }

    /// Unregisters an operation.
    #[must_use]
    pub fn without_operation(mut self, name: &str) -> Self {
        self.operations.shift_remove(name);
        self
    }

    /// Sets whether fields are required unless declared otherwise.
    /// Defaults to `true`.
    #[must_use]
    pub fn default_required(mut self, required: bool) -> Self {
        self.default_required = required;
        self
    }

    /// Sets the separator used to split a single value into a list.
    /// Defaults to `,`. An empty separator is ignored.
    #[must_use]
    pub fn slice_split_separator(mut self, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        if !separator.is_empty() {
            self.separator = separator;
        }
        self
    }

    /// Sets how field names map to lookup names when no name is declared.
    /// Defaults to lowercasing.
    #[must_use]
    pub fn field_name_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.field_name_mapper = FieldNameMapper::new(mapper);
        self
    }

    /// Sets the path parameter lookup.
    #[must_use]
    pub fn path_value(mut self, path_value: impl PathValue + 'static) -> Self {
        self.path_value = Some(Arc::new(path_value));
        self
    }

    /// Replaces the body content decoder.
    #[must_use]
    pub fn content_decoder(mut self, decoder: impl ContentDecoder + 'static) -> Self {
        self.content_decoder = Arc::new(decoder);
        self
    }

    /// Sets the overrides applied to every decode of `T`.
    ///
    /// Per-call overrides take precedence entry by entry.
    #[must_use]
    pub fn default_overrides<T: Decode>(mut self, overrides: OverrideMap) -> Self {
        self.default_overrides.insert(TypeId::of::<T>(), overrides);
        self
    }

    /// Enables or disables caching of struct descriptors. Disabled by default.
    #[must_use]
    pub fn struct_info_cache(mut self, enabled: bool) -> Self {
        self.struct_info_cache = enabled;
        self
    }

    /// Sets whether operations may read the body. Defaults to `true`.
    #[must_use]
    pub fn allow_read_body(mut self, allow: bool) -> Self {
        self.allow_read_body = allow;
        self
    }

    /// Requires every query parameter to be consumed by some field.
    #[must_use]
    pub fn ensure_all_query_used(mut self, ensure: bool) -> Self {
        self.ensure_all_query_used = ensure;
        self
    }

    /// Requires every form value to be consumed by some field.
    #[must_use]
    pub fn ensure_all_form_used(mut self, ensure: bool) -> Self {
        self.ensure_all_form_used = ensure;
        self
    }

    /// Sets the largest body the decoder reads. Defaults to 10 MiB.
    #[must_use]
    pub fn max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = limit;
        self
    }

    /// Applies a configuration.
    ///
    /// Built-in operations missing from `config.operations` are removed and
    /// listed ones are registered. Custom operations are left alone. The
    /// configuration is expected to be validated.
    #[must_use]
    pub fn config(mut self, config: &DecoderConfig) -> Self {
        let builtin = default_operations();
        self.operations.retain(|name, _| {
            config.operations.iter().any(|n| n == name)
                || !builtin.iter().any(|(b, _)| b == name)
        });
        for (name, operation) in builtin {
            if config.operations.iter().any(|n| n == name) && !self.operations.contains_key(name) {
                self.operations.insert(name.to_owned(), operation);
            }
        }

        self.default_required = config.default_required;
        self.separator.clone_from(&config.slice_split_separator);
        self.allow_read_body = config.allow_read_body;
        self.ensure_all_query_used = config.ensure_all_query_used;
        self.ensure_all_form_used = config.ensure_all_form_used;
        self.max_body_size = config.max_body_size;
        self.struct_info_cache = config.struct_info_cache;
        self
    }

    /// Builds the decoder.
    #[must_use]
    pub fn build(self) -> Decoder {
        tracing::debug!(
            operations = self.operations.len(),
            default_required = self.default_required,
            "decoder built"
        );
        Decoder {
            inner: Arc::new(DecoderInner {
                operations: self.operations,
                path_value: self.path_value,
                content_decoder: self.content_decoder,
                field_name_mapper: self.field_name_mapper,
                default_required: self.default_required,
                separator: self.separator,
                allow_read_body: self.allow_read_body,
                ensure_all_query_used: self.ensure_all_query_used,
                ensure_all_form_used: self.ensure_all_form_used,
                max_body_size: self.max_body_size,
                default_overrides: self.default_overrides,
                cache: self.struct_info_cache.then(|| RwLock::new(HashMap::new())),
            }),
        }
    }
}

impl Default for DecoderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-call options. Unset values fall back to the decoder's settings.
#[derive(Clone, Default)]
pub struct DecodeOptions {
    overrides: Option<OverrideMap>,
    path_value: Option<Arc<dyn PathValue>>,
    separator: Option<String>,
    allow_read_body: Option<bool>,
    ensure_all_query_used: Option<bool>,
    ensure_all_form_used: Option<bool>,
    max_body_size: Option<usize>,
}

impl DecodeOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets operation overrides for this call.
    #[must_use]
    pub fn overrides(mut self, overrides: OverrideMap) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// Sets the path parameter lookup for this call.
    #[must_use]
    pub fn path_value(mut self, path_value: impl PathValue + 'static) -> Self {
        self.path_value = Some(Arc::new(path_value));
        self
    }

    /// Sets the list separator for this call. An empty separator leaves
    /// the decoder's separator in effect.
    #[must_use]
    pub fn slice_split_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into()).filter(|s| !s.is_empty());
        self
    }

    /// Sets whether operations may read the body in this call.
    #[must_use]
    pub fn allow_read_body(mut self, allow: bool) -> Self {
        self.allow_read_body = Some(allow);
        self
    }

    /// Sets whether every query parameter must be consumed in this call.
    #[must_use]
    pub fn ensure_all_query_used(mut self, ensure: bool) -> Self {
        self.ensure_all_query_used = Some(ensure);
        self
    }

    /// Sets whether every form value must be consumed in this call.
    #[must_use]
    pub fn ensure_all_form_used(mut self, ensure: bool) -> Self {
        self.ensure_all_form_used = Some(ensure);
        self
    }

    /// Sets the body size limit for this call.
    #[must_use]
    pub fn max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = Some(limit);
        self
    }
}

impl fmt::Debug for DecodeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeOptions")
            .field("overrides", &self.overrides)
            .field("path_value", &self.path_value.is_some())
            .field("separator", &self.separator)
            .field("allow_read_body", &self.allow_read_body)
            .field("ensure_all_query_used", &self.ensure_all_query_used)
            .field("ensure_all_form_used", &self.ensure_all_form_used)
            .field("max_body_size", &self.max_body_size)
            .finish()
    }
}

/// A decoder bound to one destination type.
pub struct TypeDecoder<T> {
    decoder: Decoder,
    options: DecodeOptions,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Decode + Default> TypeDecoder<T> {
    /// Binds `decoder` to `T`.
    #[must_use]
    pub fn new(decoder: Decoder) -> Self {
        Self {
            decoder,
            options: DecodeOptions::default(),
            _marker: PhantomData,
        }
    }

    /// Sets options applied to every call.
    #[must_use]
    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Decodes `req` into a new `T`.
    pub fn decode(&self, req: &mut Request) -> DecodeResult<T> {
        self.decoder.decode_new_with(req, &self.options)
    }

    /// Decodes `req` into a new `T` with options replacing the bound ones.
    pub fn decode_with(&self, req: &mut Request, options: &DecodeOptions) -> DecodeResult<T> {
        self.decoder.decode_new_with(req, options)
    }
}

impl<T> Clone for TypeDecoder<T> {
    fn clone(&self) -> Self {
        Self {
            decoder: self.decoder.clone(),
            options: self.options.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for TypeDecoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDecoder")
            .field("target", &type_name::<T>())
            .field("decoder", &self.decoder)
            .finish_non_exhaustive()
    }
}

fn shared() -> &'static Decoder {
    static DECODER: OnceLock<Decoder> = OnceLock::new();
    DECODER.get_or_init(Decoder::new)
}

/// Decodes `req` into `dest` with a shared default decoder.
pub fn decode<T: Decode>(req: &mut Request, dest: &mut T) -> DecodeResult<()> {
    shared().decode(req, dest)
}

/// Decodes `req` into a new `T` with a shared default decoder.
pub fn decode_new<T: Decode + Default>(req: &mut Request) -> DecodeResult<T> {
    shared().decode_new(req)
}

/// Decodes `req` into `dest` with a shared default decoder and per-call
/// options.
pub fn decode_with<T: Decode>(
    req: &mut Request,
    dest: &mut T,
    options: &DecodeOptions,
) -> DecodeResult<()> {
    shared().decode_with(req, dest, options)
}

/// Decodes `req` into a new `T` with a shared default decoder and per-call
/// options.
pub fn decode_new_with<T: Decode + Default>(
    req: &mut Request,
    options: &DecodeOptions,
) -> DecodeResult<T> {
    shared().decode_new_with(req, options)
}
