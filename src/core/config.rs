use std::sync::Arc;

use crate::convert::{ConverterRegistry, TypeConverterOptions};
use crate::core::culture::Culture;
use crate::error::CsvError;

/// Field trimming applied by the tokenizer when a field is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrimMode {
    /// Emit fields exactly as they appear in the source.
    #[default]
    None,
    /// Trim surrounding whitespace of unquoted fields only; quoted content
    /// is preserved verbatim.
    UnquotedOnly,
    /// Trim surrounding whitespace of every field, quoted or not.
    All,
}

/// What to do when raw content does not fit the configured grammar strictly,
/// or when a row fails conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BadDataPolicy {
    /// Surface the error to the caller at the offending row's position.
    #[default]
    Throw,
    /// Drop the offending row and continue with the next one.
    Skip,
    /// Invoke the configured [`BadDataHandler`]; its [`RowAction`] decides.
    Raise,
}

/// What to do when a row has fewer fields than the bound columns require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingFieldPolicy {
    /// Surface a conversion error for the row.
    #[default]
    Error,
    /// Substitute the binding's default value (or null for optional members).
    ReturnDefault,
    /// Drop the row.
    Skip,
}

/// Record terminator recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewlineMode {
    /// Recognize CR, LF and CRLF.
    #[default]
    Auto,
    Lf,
    CrLf,
    Cr,
}

/// Decision returned by a [`BadDataHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    /// Drop the row and continue.
    Skip,
    /// Propagate the error to the caller.
    Fail,
}

/// Callback invoked under [`BadDataPolicy::Raise`] with the row-scoped error.
pub type BadDataHandler = Arc<dyn Fn(&CsvError) -> RowAction + Send + Sync>;

/// Immutable configuration shared by the tokenizer, reader and writer.
///
/// Built once, then handed to [`CsvReaderBuilder`](crate::reader::CsvReaderBuilder)
/// or [`CsvWriterBuilder`](crate::writer::CsvWriterBuilder) and never mutated
/// afterwards; concurrent readers over independent streams may share one
/// config freely.
///
/// # Examples
///
/// ```
/// use csvbind::core::config::{CsvConfig, TrimMode};
///
/// let config = CsvConfig::builder()
///     .delimiter(b';')
///     .trim(TrimMode::UnquotedOnly)
///     .has_headers(false)
///     .build();
/// assert_eq!(config.delimiter, b';');
/// ```
#[derive(Clone)]
pub struct CsvConfig {
    /// Field delimiter, default `b','`.
    pub delimiter: u8,
    /// Quote byte, default `b'"'`.
    pub quote: u8,
    /// Escape byte used inside quoted fields, default equal to the quote
    /// byte (doubled-quote escaping).
    pub escape: u8,
    /// Whether the first record is a header, default `true`.
    pub has_headers: bool,
    /// Case-insensitive header matching, default `true`.
    pub header_case_insensitive: bool,
    pub trim: TrimMode,
    /// Tolerate whitespace between a delimiter and a quote, default `false`.
    pub trim_around_quotes: bool,
    pub newline: NewlineMode,
    /// Records whose first byte equals this one are skipped entirely.
    pub comment: Option<u8>,
    /// Skip physical lines with no content, default `true`.
    pub skip_blank_lines: bool,
    pub bad_data: BadDataPolicy,
    pub on_bad_data: Option<BadDataHandler>,
    pub missing_field: MissingFieldPolicy,
    /// Per-record buffered-byte cap, default 1 MiB.
    pub buffer_limit: usize,
    /// Size of the chunk pulled from the underlying source, default 8 KiB.
    pub read_chunk: usize,
    /// Quote every written field regardless of content, default `false`.
    pub always_quote: bool,
    /// Separator between a parent member name and a nested member name when
    /// auto-mapping nested records, default `"."`.
    pub nested_separator: String,
    pub culture: Culture,
    /// Global converter options; per-class and per-binding options override
    /// these, most specific wins.
    pub converter_options: TypeConverterOptions,
    pub registry: ConverterRegistry,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            escape: b'"',
            has_headers: true,
            header_case_insensitive: true,
            trim: TrimMode::None,
            trim_around_quotes: false,
            newline: NewlineMode::Auto,
            comment: None,
            skip_blank_lines: true,
            bad_data: BadDataPolicy::Throw,
            on_bad_data: None,
            missing_field: MissingFieldPolicy::Error,
            buffer_limit: 1024 * 1024,
            read_chunk: 8 * 1024,
            always_quote: false,
            nested_separator: ".".to_string(),
            culture: Culture::invariant(),
            converter_options: TypeConverterOptions::default(),
            registry: ConverterRegistry::new(),
        }
    }
}

impl CsvConfig {
    pub fn builder() -> CsvConfigBuilder {
        CsvConfigBuilder::new()
    }

    /// Global converter options with the configured culture filled in when
    /// no explicit culture was set on them.
    pub(crate) fn effective_options(&self) -> TypeConverterOptions {
        let mut options = self.converter_options.clone();
        if options.culture.is_none() {
            options.culture = Some(self.culture.clone());
        }
        options
    }
}

/// Fluent builder for [`CsvConfig`].
#[derive(Clone, Default)]
pub struct CsvConfigBuilder {
    config: CsvConfig,
}

impl CsvConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: CsvConfig::default(),
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.config.delimiter = delimiter;
        self
    }

    /// Sets the quote byte. The escape byte follows unless
    /// [`escape`](Self::escape) was set explicitly.
    pub fn quote(mut self, quote: u8) -> Self {
        if self.config.escape == self.config.quote {
            self.config.escape = quote;
        }
        self.config.quote = quote;
        self
    }

    pub fn escape(mut self, escape: u8) -> Self {
        self.config.escape = escape;
        self
    }

    pub fn has_headers(mut self, yes: bool) -> Self {
        self.config.has_headers = yes;
        self
    }

    pub fn header_case_insensitive(mut self, yes: bool) -> Self {
        self.config.header_case_insensitive = yes;
        self
    }

    pub fn trim(mut self, mode: TrimMode) -> Self {
        self.config.trim = mode;
        self
    }

    pub fn trim_around_quotes(mut self, yes: bool) -> Self {
        self.config.trim_around_quotes = yes;
        self
    }

    pub fn newline(mut self, mode: NewlineMode) -> Self {
        self.config.newline = mode;
        self
    }

    pub fn comment(mut self, byte: u8) -> Self {
        self.config.comment = Some(byte);
        self
    }

    pub fn skip_blank_lines(mut self, yes: bool) -> Self {
        self.config.skip_blank_lines = yes;
        self
    }

    pub fn bad_data(mut self, policy: BadDataPolicy) -> Self {
        self.config.bad_data = policy;
        self
    }

    pub fn on_bad_data(mut self, handler: BadDataHandler) -> Self {
        self.config.bad_data = BadDataPolicy::Raise;
        self.config.on_bad_data = Some(handler);
        self
    }

    pub fn missing_field(mut self, policy: MissingFieldPolicy) -> Self {
        self.config.missing_field = policy;
        self
    }

    pub fn buffer_limit(mut self, bytes: usize) -> Self {
        self.config.buffer_limit = bytes;
        self
    }

    pub fn always_quote(mut self, yes: bool) -> Self {
        self.config.always_quote = yes;
        self
    }

    pub fn nested_separator(mut self, separator: &str) -> Self {
        self.config.nested_separator = separator.to_string();
        self
    }

    pub fn culture(mut self, culture: Culture) -> Self {
        self.config.culture = culture;
        self
    }

    pub fn converter_options(mut self, options: TypeConverterOptions) -> Self {
        self.config.converter_options = options;
        self
    }

    pub fn registry(mut self, registry: ConverterRegistry) -> Self {
        self.config.registry = registry;
        self
    }

    pub fn build(self) -> CsvConfig {
        self.config
    }
}
