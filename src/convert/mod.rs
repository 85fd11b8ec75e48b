//! Type conversion between raw field text and typed values.
//!
//! A [`TypeConverter`] is a bidirectional string ↔ [`Value`] transformer for
//! one semantic type. The [`ConverterRegistry`] resolves the converter for a
//! declared [`DataType`], trying user-registered converters first, then the
//! open generic shapes (nullable, collection), then the built-ins, then the
//! enum fallback.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{CsvError, Result};

pub mod builtin;
pub mod options;
pub mod value;

pub use options::{DateStyles, NumberStyles, TypeConverterOptions};
pub use value::{DataType, EnumInfo, FieldType, NestedType, Value, ValueMap};

use builtin::{
    BoolConverter, DateConverter, DateTimeConverter, EnumConverter, FloatConverter,
    IntegerConverter, NullableConverter, StringConverter,
};

/// Bidirectional string ↔ value transformer for one semantic type.
///
/// `parse` and `format` return plain string reasons; the reader and writer
/// wrap them with row and column context before surfacing them as
/// [`CsvError::Conversion`].
pub trait TypeConverter: Send + Sync {
    fn parse(&self, raw: &str, options: &TypeConverterOptions)
        -> std::result::Result<Value, String>;

    fn format(
        &self,
        value: &Value,
        options: &TypeConverterOptions,
    ) -> std::result::Result<String, String>;
}

impl std::fmt::Debug for dyn TypeConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TypeConverter")
    }
}

/// Registry mapping declared types to converters.
///
/// Custom converters are registered under a type name, the
/// [`type_name`](DataType::type_name) of the target, and take precedence
/// over everything else, including the built-ins and nested-record
/// recursion.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use csvbind::convert::{ConverterRegistry, DataType, TypeConverter, TypeConverterOptions, Value};
///
/// struct UpperConverter;
///
/// impl TypeConverter for UpperConverter {
///     fn parse(&self, raw: &str, _: &TypeConverterOptions) -> Result<Value, String> {
///         Ok(Value::Str(raw.to_uppercase()))
///     }
///     fn format(&self, value: &Value, _: &TypeConverterOptions) -> Result<String, String> {
///         match value {
///             Value::Str(s) => Ok(s.to_lowercase()),
///             other => Err(format!("expected string, got {} value", other.kind())),
///         }
///     }
/// }
///
/// let mut registry = ConverterRegistry::new();
/// registry.register("String", Arc::new(UpperConverter));
/// let converter = registry.resolve(&DataType::Str).unwrap();
/// let value = converter.parse("abc", &TypeConverterOptions::default()).unwrap();
/// assert_eq!(value, Value::Str("ABC".to_string()));
/// ```
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    custom: HashMap<String, Arc<dyn TypeConverter>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `converter` for the type named `type_name`, replacing any
    /// previous registration.
    pub fn register(&mut self, type_name: &str, converter: Arc<dyn TypeConverter>) {
        self.custom.insert(type_name.to_string(), converter);
    }

    /// True when a custom converter is registered under `type_name`.
    pub fn has_custom(&self, type_name: &str) -> bool {
        self.custom.contains_key(type_name)
    }

    /// Resolves the converter for `data_type`.
    ///
    /// Resolution order: custom registration for the exact type name →
    /// nullable wrapper around the inner resolution → element converter for
    /// collections → built-in primitives → enum fallback →
    /// [`CsvError::NoConverterFound`]. Nested record types have no converter
    /// of their own unless one was registered; they are bound member by
    /// member at the mapping layer.
    pub fn resolve(&self, data_type: &DataType) -> Result<Arc<dyn TypeConverter>> {
        if let Some(converter) = self.custom.get(&data_type.type_name()) {
            return Ok(converter.clone());
        }

        match data_type {
            DataType::Option(inner) => Ok(Arc::new(NullableConverter {
                inner: self.resolve(inner)?,
            })),
            DataType::Seq(inner) => self.resolve(inner),
            DataType::Bool => Ok(Arc::new(BoolConverter)),
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => Ok(Arc::new(IntegerConverter::new(data_type.clone()))),
            DataType::Float32 | DataType::Float64 => Ok(Arc::new(FloatConverter)),
            DataType::Str => Ok(Arc::new(StringConverter)),
            DataType::Date => Ok(Arc::new(DateConverter)),
            DataType::DateTime => Ok(Arc::new(DateTimeConverter)),
            DataType::Enum(info) => Ok(Arc::new(EnumConverter { info })),
            DataType::Nested(nested) => Err(CsvError::NoConverterFound {
                type_name: nested.name.to_string(),
            }),
            DataType::Custom(name) => Err(CsvError::NoConverterFound {
                type_name: (*name).to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_resolve_for_primitives() {
        let registry = ConverterRegistry::new();
        for data_type in [
            DataType::Bool,
            DataType::Int32,
            DataType::UInt64,
            DataType::Float64,
            DataType::Str,
            DataType::Date,
            DataType::DateTime,
        ] {
            assert!(registry.resolve(&data_type).is_ok(), "{:?}", data_type);
        }
    }

    #[test]
    fn option_resolves_through_nullable_wrapper() {
        let registry = ConverterRegistry::new();
        let converter = registry
            .resolve(&DataType::option_of(DataType::Int32))
            .unwrap();
        let options = TypeConverterOptions::default();
        assert_eq!(converter.parse("", &options), Ok(Value::Null));
        assert_eq!(converter.parse("7", &options), Ok(Value::Int(7)));
    }

    #[test]
    fn custom_type_without_registration_fails() {
        let registry = ConverterRegistry::new();
        let err = registry.resolve(&DataType::Custom("Money")).unwrap_err();
        assert!(matches!(err, CsvError::NoConverterFound { type_name } if type_name == "Money"));
    }

    #[test]
    fn seq_resolves_to_element_converter() {
        let registry = ConverterRegistry::new();
        let converter = registry.resolve(&DataType::seq_of(DataType::Int32)).unwrap();
        let options = TypeConverterOptions::default();
        assert_eq!(converter.parse("3", &options), Ok(Value::Int(3)));
    }
}
