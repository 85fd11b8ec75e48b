use crate::core::culture::Culture;

/// Whitespace tolerance applied before date/datetime parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateStyles {
    pub allow_leading_white: bool,
    pub allow_trailing_white: bool,
}

impl DateStyles {
    pub fn allow_leading_white() -> Self {
        Self {
            allow_leading_white: true,
            allow_trailing_white: false,
        }
    }

    pub fn allow_white() -> Self {
        Self {
            allow_leading_white: true,
            allow_trailing_white: true,
        }
    }
}

/// Numeric parsing tolerances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberStyles {
    /// Accept the culture's group separator between digits.
    pub allow_thousands: bool,
    /// Accept a leading `+` or `-`.
    pub allow_leading_sign: bool,
    pub allow_leading_white: bool,
    pub allow_trailing_white: bool,
}

impl Default for NumberStyles {
    fn default() -> Self {
        Self {
            allow_thousands: false,
            allow_leading_sign: true,
            allow_leading_white: true,
            allow_trailing_white: true,
        }
    }
}

/// Per-binding conversion configuration.
///
/// Every field is optional; unset fields fall through to the next layer when
/// options are merged. Resolution order is binding override → class default
/// → global default, the most specific layer winning (see
/// [`merged_over`](Self::merged_over)).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeConverterOptions {
    pub culture: Option<Culture>,
    /// Date/datetime format strings tried in order; first match wins.
    pub formats: Vec<String>,
    /// Decimal places used when formatting floats; shortest round-trip
    /// representation when unset.
    pub float_precision: Option<usize>,
    /// Accepted true literals, case-insensitive. Default `{"true", "1"}`.
    pub true_literals: Vec<String>,
    /// Accepted false literals, case-insensitive. Default `{"false", "0"}`.
    pub false_literals: Vec<String>,
    /// Raw strings treated as null. The first entry is used when formatting
    /// a null value.
    pub null_literals: Vec<String>,
    pub date_styles: Option<DateStyles>,
    pub number_styles: Option<NumberStyles>,
}

impl TypeConverterOptions {
    /// Returns `self` with every unset field taken from `fallback`.
    pub fn merged_over(&self, fallback: &Self) -> Self {
        Self {
            culture: self.culture.clone().or_else(|| fallback.culture.clone()),
            formats: if self.formats.is_empty() {
                fallback.formats.clone()
            } else {
                self.formats.clone()
            },
            float_precision: self.float_precision.or(fallback.float_precision),
            true_literals: if self.true_literals.is_empty() {
                fallback.true_literals.clone()
            } else {
                self.true_literals.clone()
            },
            false_literals: if self.false_literals.is_empty() {
                fallback.false_literals.clone()
            } else {
                self.false_literals.clone()
            },
            null_literals: if self.null_literals.is_empty() {
                fallback.null_literals.clone()
            } else {
                self.null_literals.clone()
            },
            date_styles: self.date_styles.or(fallback.date_styles),
            number_styles: self.number_styles.or(fallback.number_styles),
        }
    }

    pub(crate) fn culture(&self) -> Culture {
        self.culture.clone().unwrap_or_default()
    }

    pub(crate) fn number_styles(&self) -> NumberStyles {
        self.number_styles.unwrap_or_default()
    }

    pub(crate) fn date_styles(&self) -> DateStyles {
        self.date_styles.unwrap_or_default()
    }

    pub(crate) fn true_literals(&self) -> Vec<String> {
        if self.true_literals.is_empty() {
            vec!["true".to_string(), "1".to_string()]
        } else {
            self.true_literals.clone()
        }
    }

    pub(crate) fn false_literals(&self) -> Vec<String> {
        if self.false_literals.is_empty() {
            vec!["false".to_string(), "0".to_string()]
        } else {
            self.false_literals.clone()
        }
    }

    /// Literal written for a null value; empty string when unconfigured.
    pub(crate) fn null_literal(&self) -> String {
        self.null_literals.first().cloned().unwrap_or_default()
    }

    /// True when `raw` should convert to null for a nullable binding.
    pub(crate) fn is_null_literal(&self, raw: &str) -> bool {
        if self.null_literals.is_empty() {
            raw.is_empty()
        } else {
            self.null_literals.iter().any(|l| l == raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn more_specific_layer_wins() {
        let global = TypeConverterOptions {
            culture: Some(Culture::en_us()),
            formats: vec!["%Y-%m-%d".to_string()],
            float_precision: Some(2),
            ..Default::default()
        };
        let binding = TypeConverterOptions {
            formats: vec!["%d/%m/%Y".to_string()],
            ..Default::default()
        };

        let merged = binding.merged_over(&global);
        assert_eq!(merged.formats, vec!["%d/%m/%Y".to_string()]);
        assert_eq!(merged.culture, Some(Culture::en_us()));
        assert_eq!(merged.float_precision, Some(2));
    }

    #[test]
    fn boolean_literal_defaults_apply_when_unset() {
        let options = TypeConverterOptions::default();
        assert_eq!(options.true_literals(), vec!["true", "1"]);
        assert_eq!(options.false_literals(), vec!["false", "0"]);
    }

    #[test]
    fn empty_string_is_null_when_no_literals_configured() {
        let options = TypeConverterOptions::default();
        assert!(options.is_null_literal(""));
        assert!(!options.is_null_literal("NULL"));

        let options = TypeConverterOptions {
            null_literals: vec!["NULL".to_string()],
            ..Default::default()
        };
        assert!(options.is_null_literal("NULL"));
        assert!(!options.is_null_literal(""));
    }
}
