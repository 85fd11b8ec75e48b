/// Number and date formatting conventions used when converting raw field
/// text to typed values and back.
///
/// A `Culture` is a plain value: the separators used by numeric parsing and
/// the default [chrono](https://docs.rs/chrono) format strings tried by date
/// and datetime conversion when no explicit format list is configured on the
/// binding. Formats are tried in order; the first one is also the format
/// used when writing. A handful of presets cover the common cases; anything
/// else can be built with [`Culture::new`].
///
/// # Examples
///
/// ```
/// use csvbind::core::culture::Culture;
///
/// let de = Culture::de_de();
/// assert_eq!(de.decimal_separator, ',');
/// assert_eq!(de.group_separator, '.');
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Culture {
    /// Identifier, e.g. `"invariant"` or `"de-DE"`.
    pub name: String,
    /// Character separating the integer and fractional parts of a number.
    pub decimal_separator: char,
    /// Thousands separator, honored only when the number styles allow it.
    pub group_separator: char,
    /// Date formats tried in order, chrono syntax. First entry is the write
    /// format.
    pub date_formats: Vec<String>,
    /// Datetime formats tried in order, chrono syntax. First entry is the
    /// write format.
    pub datetime_formats: Vec<String>,
}

impl Culture {
    pub fn new(
        name: &str,
        decimal_separator: char,
        group_separator: char,
        date_formats: &[&str],
        datetime_formats: &[&str],
    ) -> Self {
        Self {
            name: name.to_string(),
            decimal_separator,
            group_separator,
            date_formats: date_formats.iter().map(|f| f.to_string()).collect(),
            datetime_formats: datetime_formats.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Culture-neutral conventions: `.` decimal point, ISO 8601 first, the
    /// `m/d/y` forms accepted as a fallback.
    pub fn invariant() -> Self {
        Self::new(
            "invariant",
            '.',
            ',',
            &["%Y-%m-%d", "%m/%d/%Y"],
            &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M:%S"],
        )
    }

    pub fn en_us() -> Self {
        Self::new(
            "en-US",
            '.',
            ',',
            &["%m/%d/%Y"],
            &["%m/%d/%Y %H:%M:%S"],
        )
    }

    pub fn de_de() -> Self {
        Self::new(
            "de-DE",
            ',',
            '.',
            &["%d.%m.%Y"],
            &["%d.%m.%Y %H:%M:%S"],
        )
    }

    pub fn fr_fr() -> Self {
        Self::new(
            "fr-FR",
            ',',
            ' ',
            &["%d/%m/%Y"],
            &["%d/%m/%Y %H:%M:%S"],
        )
    }
}

impl Default for Culture {
    fn default() -> Self {
        Self::invariant()
    }
}
