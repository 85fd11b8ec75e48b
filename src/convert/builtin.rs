use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use super::options::{DateStyles, NumberStyles, TypeConverterOptions};
use super::value::{DataType, EnumInfo, Value};
use super::TypeConverter;

fn apply_white(raw: &str, leading: bool, trailing: bool) -> &str {
    let raw = if leading { raw.trim_start() } else { raw };
    if trailing { raw.trim_end() } else { raw }
}

/// Strips group separators and normalizes the decimal separator to `.`
/// according to the culture and number styles.
fn normalize_number(
    raw: &str,
    options: &TypeConverterOptions,
    decimal: bool,
) -> std::result::Result<String, String> {
    let culture = options.culture();
    let styles: NumberStyles = options.number_styles();
    let raw = apply_white(raw, styles.allow_leading_white, styles.allow_trailing_white);

    if raw.is_empty() {
        return Err("empty field".to_string());
    }
    if !styles.allow_leading_sign && (raw.starts_with('+') || raw.starts_with('-')) {
        return Err("leading sign not allowed".to_string());
    }

    let mut normalized = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == culture.group_separator && styles.allow_thousands {
            continue;
        }
        if decimal && c == culture.decimal_separator {
            normalized.push('.');
            continue;
        }
        normalized.push(c);
    }
    Ok(normalized)
}

/// Integer conversion for every declared width, range-checked.
pub struct IntegerConverter {
    target: DataType,
}

impl IntegerConverter {
    pub fn new(target: DataType) -> Self {
        Self { target }
    }

    fn bounds(&self) -> (i128, i128) {
        match self.target {
            DataType::Int8 => (i8::MIN as i128, i8::MAX as i128),
            DataType::Int16 => (i16::MIN as i128, i16::MAX as i128),
            DataType::Int32 => (i32::MIN as i128, i32::MAX as i128),
            DataType::Int64 => (i64::MIN as i128, i64::MAX as i128),
            DataType::UInt8 => (0, u8::MAX as i128),
            DataType::UInt16 => (0, u16::MAX as i128),
            DataType::UInt32 => (0, u32::MAX as i128),
            _ => (0, u64::MAX as i128),
        }
    }

    fn signed(&self) -> bool {
        matches!(
            self.target,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }
}

impl TypeConverter for IntegerConverter {
    fn parse(
        &self,
        raw: &str,
        options: &TypeConverterOptions,
    ) -> std::result::Result<Value, String> {
        let normalized = normalize_number(raw, options, false)?;
        let parsed: i128 = normalized
            .parse()
            .map_err(|_| format!("not a valid {}", self.target.type_name()))?;

        let (min, max) = self.bounds();
        if parsed < min || parsed > max {
            return Err(format!("out of range for {}", self.target.type_name()));
        }
        if self.signed() {
            Ok(Value::Int(parsed as i64))
        } else {
            Ok(Value::UInt(parsed as u64))
        }
    }

    fn format(
        &self,
        value: &Value,
        _options: &TypeConverterOptions,
    ) -> std::result::Result<String, String> {
        match value {
            Value::Int(i) => Ok(i.to_string()),
            Value::UInt(u) => Ok(u.to_string()),
            other => Err(format!("expected integer, got {} value", other.kind())),
        }
    }
}

/// Floating-point conversion honoring the culture's decimal and group
/// separators.
pub struct FloatConverter;

impl TypeConverter for FloatConverter {
    fn parse(
        &self,
        raw: &str,
        options: &TypeConverterOptions,
    ) -> std::result::Result<Value, String> {
        let normalized = normalize_number(raw, options, true)?;
        normalized
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| "not a valid floating-point number".to_string())
    }

    fn format(
        &self,
        value: &Value,
        options: &TypeConverterOptions,
    ) -> std::result::Result<String, String> {
        let float = match value {
            Value::Float(f) => *f,
            Value::Int(i) => *i as f64,
            Value::UInt(u) => *u as f64,
            other => return Err(format!("expected float, got {} value", other.kind())),
        };
        let rendered = match options.float_precision {
            Some(precision) => format!("{:.*}", precision, float),
            None => format!("{}", float),
        };
        let culture = options.culture();
        if culture.decimal_separator == '.' {
            Ok(rendered)
        } else {
            Ok(rendered.replace('.', &culture.decimal_separator.to_string()))
        }
    }
}

/// Boolean conversion against configurable literal sets, case-insensitive.
pub struct BoolConverter;

impl TypeConverter for BoolConverter {
    fn parse(
        &self,
        raw: &str,
        options: &TypeConverterOptions,
    ) -> std::result::Result<Value, String> {
        if options
            .true_literals()
            .iter()
            .any(|l| l.eq_ignore_ascii_case(raw))
        {
            return Ok(Value::Bool(true));
        }
        if options
            .false_literals()
            .iter()
            .any(|l| l.eq_ignore_ascii_case(raw))
        {
            return Ok(Value::Bool(false));
        }
        Err(format!(
            "not one of the accepted literals [{}] / [{}]",
            options.true_literals().join(", "),
            options.false_literals().join(", ")
        ))
    }

    fn format(
        &self,
        value: &Value,
        options: &TypeConverterOptions,
    ) -> std::result::Result<String, String> {
        match value {
            Value::Bool(true) => Ok(options
                .true_literals()
                .first()
                .cloned()
                .unwrap_or_else(|| "true".to_string())),
            Value::Bool(false) => Ok(options
                .false_literals()
                .first()
                .cloned()
                .unwrap_or_else(|| "false".to_string())),
            other => Err(format!("expected bool, got {} value", other.kind())),
        }
    }
}

/// Identity conversion for strings. Raw text equal to a configured null
/// literal becomes null; with no literals configured every string is kept,
/// including the empty one.
pub struct StringConverter;

impl TypeConverter for StringConverter {
    fn parse(
        &self,
        raw: &str,
        options: &TypeConverterOptions,
    ) -> std::result::Result<Value, String> {
        if !options.null_literals.is_empty() && options.null_literals.iter().any(|l| l == raw) {
            return Ok(Value::Null);
        }
        Ok(Value::Str(raw.to_string()))
    }

    fn format(
        &self,
        value: &Value,
        options: &TypeConverterOptions,
    ) -> std::result::Result<String, String> {
        match value {
            Value::Str(s) => Ok(s.clone()),
            Value::Null => Ok(options.null_literal()),
            other => Err(format!("expected string, got {} value", other.kind())),
        }
    }
}

fn date_formats(options: &TypeConverterOptions) -> Vec<String> {
    if options.formats.is_empty() {
        options.culture().date_formats
    } else {
        options.formats.clone()
    }
}

fn datetime_formats(options: &TypeConverterOptions) -> Vec<String> {
    if options.formats.is_empty() {
        options.culture().datetime_formats
    } else {
        options.formats.clone()
    }
}

fn styled<'a>(raw: &'a str, styles: DateStyles) -> &'a str {
    apply_white(raw, styles.allow_leading_white, styles.allow_trailing_white)
}

/// Date conversion through a format list, first match wins. Failure reasons
/// report the attempted formats.
pub struct DateConverter;

impl TypeConverter for DateConverter {
    fn parse(
        &self,
        raw: &str,
        options: &TypeConverterOptions,
    ) -> std::result::Result<Value, String> {
        let raw = styled(raw, options.date_styles());
        let formats = date_formats(options);
        for format in &formats {
            if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
                return Ok(Value::Date(date));
            }
        }
        Err(format!(
            "does not match any of the date formats [{}]",
            formats.join(", ")
        ))
    }

    fn format(
        &self,
        value: &Value,
        options: &TypeConverterOptions,
    ) -> std::result::Result<String, String> {
        let formats = date_formats(options);
        let format = formats.first().ok_or("no date format configured")?;
        match value {
            Value::Date(d) => Ok(d.format(format).to_string()),
            Value::DateTime(dt) => Ok(dt.date().format(format).to_string()),
            other => Err(format!("expected date, got {} value", other.kind())),
        }
    }
}

/// Datetime conversion through a format list; a date-only match is accepted
/// and mapped to midnight.
pub struct DateTimeConverter;

impl TypeConverter for DateTimeConverter {
    fn parse(
        &self,
        raw: &str,
        options: &TypeConverterOptions,
    ) -> std::result::Result<Value, String> {
        let raw = styled(raw, options.date_styles());
        let formats = datetime_formats(options);
        for format in &formats {
            if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
                return Ok(Value::DateTime(datetime));
            }
        }
        // A bare date is still a valid datetime at midnight.
        for format in options.culture().date_formats {
            if let Ok(date) = NaiveDate::parse_from_str(raw, &format) {
                if let Some(datetime) = date.and_hms_opt(0, 0, 0) {
                    return Ok(Value::DateTime(datetime));
                }
            }
        }
        Err(format!(
            "does not match any of the datetime formats [{}]",
            formats.join(", ")
        ))
    }

    fn format(
        &self,
        value: &Value,
        options: &TypeConverterOptions,
    ) -> std::result::Result<String, String> {
        let formats = datetime_formats(options);
        let format = formats.first().ok_or("no datetime format configured")?;
        match value {
            Value::DateTime(dt) => Ok(dt.format(format).to_string()),
            other => Err(format!("expected datetime, got {} value", other.kind())),
        }
    }
}

/// Enum conversion: variant name first (case-insensitive), ordinal as a
/// fallback.
pub struct EnumConverter {
    pub info: &'static EnumInfo,
}

impl TypeConverter for EnumConverter {
    fn parse(
        &self,
        raw: &str,
        _options: &TypeConverterOptions,
    ) -> std::result::Result<Value, String> {
        for variant in self.info.variants {
            if variant.eq_ignore_ascii_case(raw) {
                return Ok(Value::Str((*variant).to_string()));
            }
        }
        if let Ok(ordinal) = raw.parse::<usize>() {
            if let Some(variant) = self.info.variants.get(ordinal) {
                return Ok(Value::Str((*variant).to_string()));
            }
        }
        Err(format!(
            "not a variant of {} (expected one of [{}])",
            self.info.name,
            self.info.variants.join(", ")
        ))
    }

    fn format(
        &self,
        value: &Value,
        _options: &TypeConverterOptions,
    ) -> std::result::Result<String, String> {
        match value {
            Value::Str(s) => Ok(s.clone()),
            other => Err(format!("expected enum variant, got {} value", other.kind())),
        }
    }
}

/// Nullable wrapper: an empty string or a configured null literal maps to
/// null, everything else delegates to the inner converter.
pub struct NullableConverter {
    pub inner: Arc<dyn TypeConverter>,
}

impl TypeConverter for NullableConverter {
    fn parse(
        &self,
        raw: &str,
        options: &TypeConverterOptions,
    ) -> std::result::Result<Value, String> {
        if options.is_null_literal(raw) {
            return Ok(Value::Null);
        }
        self.inner.parse(raw, options)
    }

    fn format(
        &self,
        value: &Value,
        options: &TypeConverterOptions,
    ) -> std::result::Result<String, String> {
        match value {
            Value::Null => Ok(options.null_literal()),
            other => self.inner.format(other, options),
        }
    }
}
