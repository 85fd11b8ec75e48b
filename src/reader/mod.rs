//! Typed record reader: a lazy, forward-only, single-pass sequence of `T`.

pub mod header;

use std::cell::RefCell;
use std::fs::File;
use std::io::{BufReader, Read};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};

use crate::convert::{ConverterRegistry, TypeConverterOptions};
use crate::core::config::{
    BadDataPolicy, BadDataHandler, CsvConfig, MissingFieldPolicy, NewlineMode, RowAction, TrimMode,
};
use crate::core::culture::Culture;
use crate::core::item::ItemReader;
use crate::error::{CsvError, Result};
use crate::mapping::bind::{bind_for_read, BoundClassMap};
use crate::mapping::{ClassMap, CsvRecord};
use crate::tokenizer::Tokenizer;

pub use header::Header;

/// A typed CSV reader producing `T` instances one row at a time.
///
/// The sequence is lazy (nothing is tokenized or converted until it is
/// requested), forward-only, and not restartable: exhausting it consumes the
/// underlying stream, and a fresh read needs a fresh reader.
///
/// Map-level failures (unknown converters, duplicate bindings) surface when
/// the reader is built; missing required columns surface on the first read,
/// before any row is produced; conversion failures surface lazily, in row
/// order, and do not consume the stream unless the bad-data policy says so.
///
/// # Examples
///
/// ```
/// use csvbind::csv_record;
/// use csvbind::reader::CsvReaderBuilder;
///
/// csv_record! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct City {
///         pub name: String,
///         pub country: String,
///         pub population: u64,
///     }
/// }
///
/// let data = "name,country,population\n\
///             Boston,United States,4628910\n\
///             Concord,United States,42695\n";
///
/// let reader = CsvReaderBuilder::<City>::new()
///     .has_headers(true)
///     .from_reader(data.as_bytes())
///     .unwrap();
///
/// let city = reader.read().unwrap().unwrap();
/// assert_eq!(city.name, "Boston");
/// assert_eq!(city.population, 4628910);
///
/// let rest: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();
/// assert_eq!(rest.len(), 1);
/// ```
pub struct CsvReader<R: Read, T: CsvRecord> {
    state: RefCell<ReaderState<R>>,
    config: Arc<CsvConfig>,
    _marker: PhantomData<T>,
}

impl<R: Read, T: CsvRecord> std::fmt::Debug for CsvReader<R, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvReader").finish_non_exhaustive()
    }
}

struct ReaderState<R: Read> {
    tokenizer: Tokenizer<R>,
    bound: BoundClassMap,
    header: Option<Header>,
    resolved: bool,
    row: u64,
    poisoned: bool,
}

impl<R: Read, T: CsvRecord> CsvReader<R, T> {
    /// Reads the next record, converting it to `T`.
    ///
    /// Returns `Ok(None)` once the stream is exhausted. A row-scoped
    /// conversion error is returned at this row's position; the following
    /// call continues with the next row.
    pub fn read(&self) -> Result<Option<T>> {
        let mut state = self.state.borrow_mut();
        if state.poisoned {
            return Ok(None);
        }
        if let Err(error) = Self::ensure_resolved(&mut state, &self.config) {
            state.poisoned = true;
            return Err(error);
        }

        loop {
            let record = match state.tokenizer.next_record() {
                Ok(Some(record)) => record,
                Ok(None) => return Ok(None),
                Err(error) => {
                    state.poisoned = true;
                    return Err(error);
                }
            };
            state.row += 1;

            match Self::build_row(&mut state, &record, &self.config) {
                Ok(Some(item)) => return Ok(Some(item)),
                Ok(None) => continue,
                Err(error) => {
                    if error.is_fatal() {
                        state.poisoned = true;
                        return Err(error);
                    }
                    match self.row_action(&error) {
                        RowAction::Fail => return Err(error),
                        RowAction::Skip => {
                            warn!("skipping row at line {}: {}", record.line, error);
                            continue;
                        }
                    }
                }
            }
        }
    }

    /// The resolved header, reading it from the stream first if necessary.
    /// `Ok(None)` for headerless streams.
    pub fn headers(&self) -> Result<Option<Header>> {
        let mut state = self.state.borrow_mut();
        if let Err(error) = Self::ensure_resolved(&mut state, &self.config) {
            state.poisoned = true;
            return Err(error);
        }
        Ok(state.header.clone())
    }

    /// Lazy iterator over the remaining records. Row-scoped errors are
    /// yielded in place; iteration may continue past them.
    pub fn records(&self) -> Records<'_, R, T> {
        Records { reader: self }
    }

    fn ensure_resolved(state: &mut ReaderState<R>, config: &CsvConfig) -> Result<()> {
        if state.resolved {
            return Ok(());
        }
        if config.has_headers {
            match state.tokenizer.next_record()? {
                Some(record) => {
                    let header = Header::from_record(&record, config.header_case_insensitive);
                    debug!("resolved header with {} column(s)", header.len());
                    state.bound.resolve_columns(Some(&header), config)?;
                    state.header = Some(header);
                }
                None => {
                    // Empty stream: nothing to validate, nothing to read.
                }
            }
        } else {
            state.bound.resolve_columns(None, config)?;
        }
        state.resolved = true;
        Ok(())
    }

    fn build_row(
        state: &mut ReaderState<R>,
        record: &crate::tokenizer::Record,
        config: &CsvConfig,
    ) -> Result<Option<T>> {
        let values = state.bound.materialize(record, config)?;
        let mut values = match values {
            Some(values) => values,
            None => return Ok(None),
        };
        match T::from_values(&mut values) {
            Ok(item) => Ok(Some(item)),
            Err(reason) => Err(CsvError::Conversion {
                line: record.line,
                column: state.bound.type_name.to_string(),
                raw: String::new(),
                target: state.bound.type_name.to_string(),
                reason,
            }),
        }
    }

    fn row_action(&self, error: &CsvError) -> RowAction {
        match self.config.bad_data {
            BadDataPolicy::Throw => RowAction::Fail,
            BadDataPolicy::Skip => RowAction::Skip,
            BadDataPolicy::Raise => match &self.config.on_bad_data {
                Some(handler) => handler(error),
                None => RowAction::Fail,
            },
        }
    }
}

impl<R: Read, T: CsvRecord> ItemReader<T> for CsvReader<R, T> {
    fn read(&self) -> Result<Option<T>> {
        CsvReader::read(self)
    }
}

/// Iterator returned by [`CsvReader::records`].
pub struct Records<'a, R: Read, T: CsvRecord> {
    reader: &'a CsvReader<R, T>,
}

impl<'a, R: Read, T: CsvRecord> Iterator for Records<'a, R, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => None,
            Err(error) => Some(Err(error)),
        }
    }
}

/// A builder for configuring typed CSV reading.
///
/// Grammar-level knobs (delimiter, quoting, trimming, policies) are set
/// here; binding-level overrides come in through
/// [`class_map`](Self::class_map).
///
/// # Examples
///
/// ```
/// use csvbind::csv_record;
/// use csvbind::mapping::ClassMap;
/// use csvbind::reader::CsvReaderBuilder;
///
/// csv_record! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct Pair {
///         pub id: u32,
///         pub name: String,
///     }
/// }
///
/// // Positional binding: no header row is consumed.
/// let map = ClassMap::builder::<Pair>().build().unwrap();
/// let reader = CsvReaderBuilder::<Pair>::new()
///     .has_headers(false)
///     .class_map(map)
///     .from_reader("1,John\n2,Jane\n".as_bytes())
///     .unwrap();
///
/// let people: Vec<Pair> = reader.records().collect::<Result<_, _>>().unwrap();
/// assert_eq!(people.len(), 2);
/// assert_eq!(people[0].name, "John");
/// ```
pub struct CsvReaderBuilder<T: CsvRecord> {
    config: CsvConfig,
    map: Option<ClassMap>,
    _marker: PhantomData<T>,
}

impl<T: CsvRecord> Default for CsvReaderBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CsvRecord> CsvReaderBuilder<T> {
    pub fn new() -> Self {
        Self {
            config: CsvConfig::default(),
            map: None,
            _marker: PhantomData,
        }
    }

    /// Replaces the whole configuration at once.
    pub fn config(mut self, config: CsvConfig) -> Self {
        self.config = config;
        self
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.config.delimiter = delimiter;
        self
    }

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

    pub fn culture(mut self, culture: Culture) -> Self {
        self.config.culture = culture;
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

    pub fn converter_options(mut self, options: TypeConverterOptions) -> Self {
        self.config.converter_options = options;
        self
    }

    pub fn registry(mut self, registry: ConverterRegistry) -> Self {
        self.config.registry = registry;
        self
    }

    /// Uses a custom-built class map instead of the auto-mapped one.
    pub fn class_map(mut self, map: ClassMap) -> Self {
        self.map = Some(map);
        self
    }

    /// Creates a reader over any [`Read`] source.
    ///
    /// Fails fast on map-level errors: a member type with no converter, a
    /// duplicate binding, an invalid map.
    pub fn from_reader<R: Read>(self, rdr: R) -> Result<CsvReader<R, T>> {
        let config = Arc::new(self.config);
        let map = match self.map {
            Some(map) => map,
            None => ClassMap::auto::<T>(),
        };
        let bound = bind_for_read(&map, &config)?;

        Ok(CsvReader {
            state: RefCell::new(ReaderState {
                tokenizer: Tokenizer::new(rdr, config.clone()),
                bound,
                header: None,
                resolved: false,
                row: 0,
                poisoned: false,
            }),
            config,
            _marker: PhantomData,
        })
    }

    /// Creates a reader over the file at `path`.
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<CsvReader<BufReader<File>, T>> {
        let file = File::open(path)?;
        self.from_reader(BufReader::new(file))
    }
}
