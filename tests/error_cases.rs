use std::error::Error;
use std::sync::Arc;

use csvbind::convert::{
    ConverterRegistry, DataType, FieldType, TypeConverter, TypeConverterOptions, Value,
};
use csvbind::core::config::BadDataPolicy;
use csvbind::csv_record;
use csvbind::mapping::ClassMap;
use csvbind::reader::CsvReaderBuilder;
use csvbind::CsvError;

csv_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Reading {
        pub id: u32,
        pub value: f64,
    }
}

#[test]
fn missing_required_column_fails_before_any_row() -> Result<(), Box<dyn Error>> {
    let reader = CsvReaderBuilder::<Reading>::new()
        .has_headers(true)
        .from_reader("id\n1\n2\n".as_bytes())?;

    let err = reader.read().unwrap_err();
    match err {
        CsvError::MissingColumns { columns } => assert_eq!(columns, vec!["value"]),
        other => panic!("expected MissingColumns, got {other:?}"),
    }
    // The reader is poisoned: no rows are ever produced.
    assert!(reader.read()?.is_none());
    Ok(())
}

#[test]
fn unterminated_quote_is_fatal() -> Result<(), Box<dyn Error>> {
    let reader = CsvReaderBuilder::<Reading>::new()
        .has_headers(true)
        .from_reader("id,value\n1,\"2.5\n".as_bytes())?;

    let err = reader.read().unwrap_err();
    assert!(matches!(err, CsvError::MalformedRecord { line: 2, .. }));
    assert!(reader.read()?.is_none());
    Ok(())
}

#[test]
fn conversion_error_surfaces_at_the_row_and_iteration_continues() -> Result<(), Box<dyn Error>> {
    let data = "id,value\n1,1.5\nx,2.5\n3,3.5\n";
    let reader = CsvReaderBuilder::<Reading>::new()
        .has_headers(true)
        .from_reader(data.as_bytes())?;

    assert_eq!(reader.read()?.unwrap().id, 1);

    let err = reader.read().unwrap_err();
    match &err {
        CsvError::Conversion {
            line,
            column,
            raw,
            target,
            ..
        } => {
            assert_eq!(*line, 3);
            assert_eq!(column, "id");
            assert_eq!(raw, "x");
            assert_eq!(target, "UInt32");
        }
        other => panic!("expected Conversion, got {other:?}"),
    }

    // The stream is still usable: the next row parses.
    assert_eq!(reader.read()?.unwrap().id, 3);
    assert!(reader.read()?.is_none());
    Ok(())
}

#[test]
fn skip_policy_omits_failing_rows() -> Result<(), Box<dyn Error>> {
    let data = "id,value\n1,1.5\nx,2.5\n3,3.5\n";
    let reader = CsvReaderBuilder::<Reading>::new()
        .has_headers(true)
        .bad_data(BadDataPolicy::Skip)
        .from_reader(data.as_bytes())?;

    let ids: Vec<u32> = reader
        .records()
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![1, 3]);
    Ok(())
}

#[test]
fn raise_policy_lets_the_handler_decide() -> Result<(), Box<dyn Error>> {
    use csvbind::core::config::RowAction;

    let data = "id,value\n1,1.5\nx,2.5\n3,3.5\n";
    let reader = CsvReaderBuilder::<Reading>::new()
        .has_headers(true)
        .on_bad_data(Arc::new(|error| match error {
            CsvError::Conversion { raw, .. } if raw == "x" => RowAction::Skip,
            _ => RowAction::Fail,
        }))
        .from_reader(data.as_bytes())?;

    let ids: Vec<u32> = reader
        .records()
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![1, 3]);
    Ok(())
}

#[test]
fn buffer_limit_protects_against_runaway_fields() -> Result<(), Box<dyn Error>> {
    let data = format!("id,value\n1,\"{}", "9".repeat(1024));
    let reader = CsvReaderBuilder::<Reading>::new()
        .has_headers(true)
        .buffer_limit(64)
        .from_reader(data.as_bytes())?;

    let err = reader.read().unwrap_err();
    assert!(matches!(err, CsvError::BufferLimitExceeded { limit: 64, .. }));
    Ok(())
}

#[test]
fn duplicate_bindings_fail_at_build_time() {
    let err = ClassMap::builder::<Reading>()
        .member("id", |m| m.index(1))
        .member("value", |m| m.index(1))
        .build()
        .unwrap_err();
    assert!(matches!(err, CsvError::DuplicateBinding { .. }));
}

#[derive(Debug, Clone, PartialEq)]
pub struct Money(pub f64);

impl FieldType for Money {
    fn data_type() -> DataType {
        DataType::Custom("Money")
    }

    fn from_value(value: Value) -> Result<Self, String> {
        f64::from_value(value).map(Money)
    }

    fn to_value(&self) -> Value {
        Value::Float(self.0)
    }
}

csv_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Invoice {
        pub id: u32,
        pub total: Money,
    }
}

struct MoneyConverter;

impl TypeConverter for MoneyConverter {
    fn parse(&self, raw: &str, _options: &TypeConverterOptions) -> Result<Value, String> {
        let raw = raw.strip_prefix('$').unwrap_or(raw);
        raw.parse::<f64>()
            .map(Value::Float)
            .map_err(|_| "not a money amount".to_string())
    }

    fn format(&self, value: &Value, _options: &TypeConverterOptions) -> Result<String, String> {
        match value {
            Value::Float(amount) => Ok(format!("${amount}")),
            other => Err(format!("expected float, got {} value", other.kind())),
        }
    }
}

#[test]
fn unregistered_custom_type_fails_fast() {
    let err = CsvReaderBuilder::<Invoice>::new()
        .from_reader("id,total\n1,$5.0\n".as_bytes())
        .unwrap_err();
    assert!(matches!(err, CsvError::NoConverterFound { type_name } if type_name == "Money"));
}

#[test]
fn registered_custom_converter_resolves() -> Result<(), Box<dyn Error>> {
    let mut registry = ConverterRegistry::new();
    registry.register("Money", Arc::new(MoneyConverter));

    let reader = CsvReaderBuilder::<Invoice>::new()
        .has_headers(true)
        .registry(registry)
        .from_reader("id,total\n1,$5.5\n".as_bytes())?;

    assert_eq!(
        reader.read()?,
        Some(Invoice {
            id: 1,
            total: Money(5.5)
        })
    );
    Ok(())
}

#[test]
fn ragged_rows_follow_the_missing_field_policy() -> Result<(), Box<dyn Error>> {
    use csvbind::core::config::MissingFieldPolicy;

    let data = "id,value\n1,1.5\n2\n3,3.5\n";

    // Default: the short row is an error at its own position.
    let reader = CsvReaderBuilder::<Reading>::new()
        .has_headers(true)
        .from_reader(data.as_bytes())?;
    assert!(reader.read()?.is_some());
    assert!(reader.read().is_err());
    assert!(reader.read()?.is_some());

    // Skip: the short row disappears from the sequence.
    let reader = CsvReaderBuilder::<Reading>::new()
        .has_headers(true)
        .missing_field(MissingFieldPolicy::Skip)
        .from_reader(data.as_bytes())?;
    let ids: Vec<u32> = reader
        .records()
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![1, 3]);
    Ok(())
}
