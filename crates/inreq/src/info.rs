//! Struct and field descriptors.
//!
//! `#[derive(Decode)]` emits a static [`StructSpec`] describing each field:
//! its declared operation, name, required flag and options. When a struct is
//! decoded, the decoder resolves that spec into a [`StructInfo`] by applying
//! its field-name mapper and default-required setting. A `StructInfo` is
//! immutable and may be cached per type.

use crate::error::{DecodeError, DecodeResult};
use crate::operation::RECURSE;
use crate::value::{FieldValue, TypeKind};
use crate::walk::Decode;
use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Free-form operation options from a field attribute (`explode`,
/// `explodesep`, `type`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagOptions {
    inner: BTreeMap<String, String>,
}

impl TagOptions {
    /// Creates an empty option set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an option.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.insert(key.into(), value.into());
    }

    /// Returns an option value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    /// Reads a boolean option. Absent means false, an empty value true.
    pub fn flag(&self, key: &str) -> DecodeResult<bool> {
        match self.get(key) {
            None => Ok(false),
            Some("" | "1" | "t" | "T" | "true" | "TRUE" | "True") => Ok(true),
            Some("0" | "f" | "F" | "false" | "FALSE" | "False") => Ok(false),
            Some(other) => Err(DecodeError::configuration(format!(
                "invalid boolean option {key}={other}"
            ))),
        }
    }

    /// Returns true if no options are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates over the options in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// When a struct-level operation runs relative to the struct's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum When {
    /// Decode the whole struct, then its fields
    Before,
    /// Decode the fields, then the whole struct
    After,
}

/// Static description of one field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    field: &'static str,
    operation: Option<&'static str>,
    name: Option<&'static str>,
    required: Option<bool>,
    options: Vec<(&'static str, &'static str)>,
    kind: TypeKind,
    optional: bool,
    nested: Option<(TypeId, fn() -> StructSpec)>,
}

impl FieldSpec {
    /// Describes a field holding a value.
    #[must_use]
    pub fn value<T: FieldValue>(field: &'static str) -> Self {
        Self {
            field,
            operation: None,
            name: None,
            required: None,
            options: Vec::new(),
            kind: T::KIND,
            optional: T::OPTIONAL,
            nested: None,
        }
    }

    /// Describes a nested struct decoded field by field.
    #[must_use]
    pub fn recurse<T: Decode>(field: &'static str) -> Self {
        Self {
            field,
            operation: Some(RECURSE),
            name: None,
            required: None,
            options: Vec::new(),
            kind: TypeKind::Struct,
            optional: false,
            nested: Some((TypeId::of::<T>(), T::describe)),
        }
    }

    /// Sets the declared operation.
    #[must_use]
    pub fn operation(mut self, operation: &'static str) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Sets the name the value is looked up under.
    #[must_use]
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// Sets whether a missing value is an error.
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// Adds an operation option.
    #[must_use]
    pub fn option(mut self, key: &'static str, value: &'static str) -> Self {
        self.options.push((key, value));
        self
    }
}

#[derive(Debug, Clone)]
struct StructOptionSpec {
    operation: &'static str,
    when: Option<When>,
    options: Vec<(&'static str, &'static str)>,
}

/// Static description of a struct.
///
/// # Example
///
/// ```rust
/// use inreq::{FieldSpec, StructSpec};
///
/// let spec = StructSpec::new("Search")
///     .field(FieldSpec::value::<String>("term").operation("query").name("q"))
///     .field(FieldSpec::value::<Option<u32>>("page").operation("query"));
/// assert_eq!(spec.type_name(), "Search");
/// ```
#[derive(Debug, Clone)]
pub struct StructSpec {
    type_name: &'static str,
    struct_option: Option<StructOptionSpec>,
    fields: Vec<FieldSpec>,
}

impl StructSpec {
    /// Creates an empty spec.
    #[must_use]
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            struct_option: None,
            fields: Vec::new(),
        }
    }

    /// Returns the struct name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Declares an operation that decodes the whole struct.
    ///
    /// With `when` unset the fields are not visited; otherwise the struct is
    /// decoded before or after them.
    #[must_use]
    pub fn struct_operation(mut self, operation: &'static str, when: Option<When>) -> Self {
        let options = self.struct_option.take().map(|o| o.options).unwrap_or_default();
        self.struct_option = Some(StructOptionSpec {
            operation,
            when,
            options,
        });
        self
    }

    /// Adds an option to the struct-level operation.
    #[must_use]
    pub fn struct_option(mut self, key: &'static str, value: &'static str) -> Self {
        if let Some(option) = self.struct_option.as_mut() {
            option.options.push((key, value));
        }
        self
    }

    /// Appends a field.
    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }
}

/// Maps a field name to the name its value is looked up under.
///
/// The default mapper lowercases the field name.
#[derive(Clone)]
pub struct FieldNameMapper {
    inner: Arc<dyn Fn(&str) -> String + Send + Sync>,
}

impl FieldNameMapper {
    /// Wraps a mapping function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Maps `field`.
    #[must_use]
    pub fn map(&self, field: &str) -> String {
        (self.inner)(field)
    }
}

impl Default for FieldNameMapper {
    fn default() -> Self {
        Self::new(str::to_lowercase)
    }
}

impl fmt::Debug for FieldNameMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldNameMapper").finish_non_exhaustive()
    }
}

/// Resolved struct-level operation.
#[derive(Debug, Clone)]
pub struct StructOption {
    operation: String,
    when: Option<When>,
    options: TagOptions,
}

impl StructOption {
    /// Returns the operation name.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Returns when the operation runs relative to the fields.
    #[must_use]
    pub fn when(&self) -> Option<When> {
        self.when
    }

    /// Returns the operation options.
    #[must_use]
    pub fn options(&self) -> &TagOptions {
        &self.options
    }
}

/// Resolved field descriptor.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    field: &'static str,
    operation: Option<String>,
    name: String,
    required: bool,
    options: TagOptions,
    kind: TypeKind,
    nested: Option<(TypeId, Arc<StructInfo>)>,
}

impl FieldInfo {
    /// Returns the field name in the struct.
    #[must_use]
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Returns the declared operation, if any.
    #[must_use]
    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    /// Returns the name the value is looked up under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether a missing value is an error.
    #[must_use]
    pub fn required(&self) -> bool {
        self.required
    }

    /// Returns the operation options.
    #[must_use]
    pub fn options(&self) -> &TagOptions {
        &self.options
    }

    /// Returns the shape of the field type.
    #[must_use]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Returns the nested struct info of a recursed field.
    #[must_use]
    pub fn nested(&self) -> Option<&Arc<StructInfo>> {
        self.nested.as_ref().map(|(_, info)| info)
    }

    pub(crate) fn nested_type(&self) -> Option<TypeId> {
        self.nested.as_ref().map(|(id, _)| *id)
    }
}

/// Resolved struct descriptor.
#[derive(Debug, Clone)]
pub struct StructInfo {
    type_name: &'static str,
    struct_option: Option<StructOption>,
    fields: Vec<FieldInfo>,
}

impl StructInfo {
    /// Resolves a spec. Nested specs are resolved recursively.
    #[must_use]
    pub fn build(spec: StructSpec, mapper: &FieldNameMapper, default_required: bool) -> Self {
        let fields = spec
            .fields
            .into_iter()
            .map(|field| FieldInfo {
                field: field.field,
                operation: field.operation.map(str::to_owned),
                name: field
                    .name
                    .map_or_else(|| mapper.map(field.field), str::to_owned),
                required: !field.optional && field.required.unwrap_or(default_required),
                options: field.options.into_iter().collect(),
                kind: field.kind,
                nested: field.nested.map(|(id, describe)| {
                    (id, Arc::new(Self::build(describe(), mapper, default_required)))
                }),
            })
            .collect();

        Self {
            type_name: spec.type_name,
            struct_option: spec.struct_option.map(|option| StructOption {
                operation: option.operation.to_owned(),
                when: option.when,
                options: option.options.into_iter().collect(),
            }),
            fields,
        }
    }

    /// Returns the struct name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the struct-level operation, if declared.
    #[must_use]
    pub fn struct_option(&self) -> Option<&StructOption> {
        self.struct_option.as_ref()
    }

    /// Returns the fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    /// Looks up a field by its struct field name.
    #[must_use]
    pub fn field(&self, field: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.field == field)
    }
}
