/// Declares a struct and registers it for reading and writing.
///
/// Expands to the struct definition plus implementations of
/// [`CsvRecord`](crate::mapping::CsvRecord) (shape introspection,
/// construction from converted values, member extraction) and
/// [`FieldType`](crate::convert::FieldType) (so the type can itself appear
/// as a nested member of another record).
///
/// Every field type must implement `FieldType`: the primitives, `String`,
/// chrono's `NaiveDate`/`NaiveDateTime`, `Option<T>`, `Vec<T>`, and any type
/// declared through this macro or [`csv_enum!`](crate::csv_enum).
///
/// # Examples
///
/// ```
/// use csvbind::csv_record;
/// use csvbind::mapping::CsvRecord;
///
/// csv_record! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct Person {
///         pub id: i64,
///         pub name: String,
///         pub email: Option<String>,
///     }
/// }
///
/// let shape = Person::shape();
/// assert_eq!(shape.name, "Person");
/// assert_eq!(shape.members.len(), 3);
/// assert_eq!(shape.constructors[0].params.len(), 3);
/// ```
#[macro_export]
macro_rules! csv_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $field_type:ty
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $field_type,
            )+
        }

        impl $crate::mapping::CsvRecord for $name {
            fn shape() -> $crate::mapping::TypeShape {
                $crate::mapping::TypeShape {
                    name: stringify!($name),
                    members: vec![
                        $(
                            $crate::mapping::MemberDescriptor::new(
                                stringify!($field),
                                <$field_type as $crate::convert::FieldType>::data_type(),
                            ),
                        )+
                    ],
                    constructors: vec![$crate::mapping::ConstructorDescriptor {
                        params: vec![
                            $(
                                $crate::mapping::MemberDescriptor::new(
                                    stringify!($field),
                                    <$field_type as $crate::convert::FieldType>::data_type(),
                                ),
                            )+
                        ],
                    }],
                }
            }

            fn from_values(
                values: &mut $crate::convert::ValueMap,
            ) -> ::std::result::Result<Self, ::std::string::String> {
                Ok(Self {
                    $(
                        $field: {
                            let value = values.take(stringify!($field)).ok_or_else(|| {
                                format!("no value bound for member `{}`", stringify!($field))
                            })?;
                            <$field_type as $crate::convert::FieldType>::from_value(value)
                                .map_err(|reason| {
                                    format!("member `{}`: {}", stringify!($field), reason)
                                })?
                        },
                    )+
                })
            }

            fn to_values(&self) -> $crate::convert::ValueMap {
                let mut values = $crate::convert::ValueMap::new();
                $(
                    values.insert(
                        stringify!($field),
                        $crate::convert::FieldType::to_value(&self.$field),
                    );
                )+
                values
            }
        }

        impl $crate::convert::FieldType for $name {
            fn data_type() -> $crate::convert::DataType {
                $crate::convert::DataType::Nested($crate::convert::NestedType {
                    name: stringify!($name),
                    shape: <$name as $crate::mapping::CsvRecord>::shape,
                })
            }

            fn from_value(
                value: $crate::convert::Value,
            ) -> ::std::result::Result<Self, ::std::string::String> {
                match value {
                    $crate::convert::Value::Record(mut values) => {
                        <$name as $crate::mapping::CsvRecord>::from_values(&mut values)
                    }
                    other => Err(format!(
                        "expected nested record for `{}`, got {} value",
                        stringify!($name),
                        other.kind()
                    )),
                }
            }

            fn to_value(&self) -> $crate::convert::Value {
                $crate::convert::Value::Record(
                    <$name as $crate::mapping::CsvRecord>::to_values(self),
                )
            }
        }
    };
}

/// Declares a fieldless enum convertible by variant name (case-insensitive)
/// or ordinal.
///
/// # Examples
///
/// ```
/// use csvbind::csv_enum;
/// use csvbind::convert::{DataType, FieldType, Value};
///
/// csv_enum! {
///     #[derive(Debug, Clone, Copy, PartialEq)]
///     pub enum Side {
///         Buy,
///         Sell,
///     }
/// }
///
/// assert_eq!(Side::from_value(Value::Str("Sell".to_string())), Ok(Side::Sell));
/// assert!(matches!(Side::data_type(), DataType::Enum(_)));
/// ```
#[macro_export]
macro_rules! csv_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $($variant,)+
        }

        impl $crate::convert::FieldType for $name {
            fn data_type() -> $crate::convert::DataType {
                static INFO: $crate::convert::EnumInfo = $crate::convert::EnumInfo {
                    name: stringify!($name),
                    variants: &[$(stringify!($variant)),+],
                };
                $crate::convert::DataType::Enum(&INFO)
            }

            fn from_value(
                value: $crate::convert::Value,
            ) -> ::std::result::Result<Self, ::std::string::String> {
                match value {
                    $crate::convert::Value::Str(s) => {
                        $(
                            if s.eq_ignore_ascii_case(stringify!($variant)) {
                                return Ok($name::$variant);
                            }
                        )+
                        Err(format!(
                            "`{}` is not a variant of {}",
                            s,
                            stringify!($name)
                        ))
                    }
                    other => Err(format!(
                        "expected enum variant for `{}`, got {} value",
                        stringify!($name),
                        other.kind()
                    )),
                }
            }

            fn to_value(&self) -> $crate::convert::Value {
                match self {
                    $($name::$variant => {
                        $crate::convert::Value::Str(stringify!($variant).to_string())
                    })+
                }
            }
        }
    };
}
