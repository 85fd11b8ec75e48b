//! Typed record writer: the inverse of the reader.

use std::cell::RefCell;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use log::debug;

use crate::convert::{ConverterRegistry, TypeConverterOptions};
use crate::core::config::{CsvConfig, NewlineMode};
use crate::core::culture::Culture;
use crate::core::item::ItemWriter;
use crate::error::Result;
use crate::mapping::bind::{bind_for_write, BoundClassMap};
use crate::mapping::{ClassMap, CsvRecord};

/// A typed CSV writer serializing `T` instances row by row.
///
/// Columns follow the class map's declared order; the header (when enabled)
/// is derived from the same map, so reading back what was written binds
/// identically. Values are taken from the object's members; writing never
/// re-invokes constructor logic. A field is quoted whenever its text
/// contains the delimiter, the quote byte, or a line ending, or always under
/// `always_quote`; embedded quotes are doubled, or preceded by the escape
/// byte when a distinct one is configured.
///
/// # Examples
///
/// ```
/// use csvbind::csv_record;
/// use csvbind::writer::CsvWriterBuilder;
///
/// csv_record! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct Row {
///         pub city: String,
///         pub population: u64,
///     }
/// }
///
/// let writer = CsvWriterBuilder::<Row>::new()
///     .has_headers(true)
///     .from_writer(Vec::new())
///     .unwrap();
///
/// writer.write(&Row { city: "Boston".to_string(), population: 4628910 }).unwrap();
/// writer.write(&Row { city: "Concord, NH".to_string(), population: 42695 }).unwrap();
///
/// let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
/// assert_eq!(data, "city,population\nBoston,4628910\n\"Concord, NH\",42695\n");
/// ```
pub struct CsvWriter<W: Write, T: CsvRecord> {
    state: RefCell<WriterState<W>>,
    config: Arc<CsvConfig>,
    _marker: PhantomData<T>,
}

struct WriterState<W: Write> {
    out: W,
    bound: BoundClassMap,
    header_written: bool,
    row: u64,
}

impl<W: Write, T: CsvRecord> CsvWriter<W, T> {
    /// Writes the header row now. Without an explicit call, the header is
    /// written before the first record when headers are enabled.
    pub fn write_header(&self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        Self::emit_header(&mut state, &self.config)
    }

    /// Serializes one record.
    pub fn write(&self, item: &T) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if self.config.has_headers && !state.header_written {
            Self::emit_header(&mut state, &self.config)?;
        }
        state.row += 1;
        let values = item.to_values();
        let fields = state.bound.extract(&values, state.row)?;
        let state = &mut *state;
        write_record(&mut state.out, &fields, &self.config)
    }

    /// Flushes buffered output to the underlying sink.
    pub fn flush(&self) -> Result<()> {
        self.state.borrow_mut().out.flush()?;
        Ok(())
    }

    /// Flushes and returns the underlying sink.
    pub fn into_inner(self) -> Result<W> {
        let mut state = self.state.into_inner();
        state.out.flush()?;
        Ok(state.out)
    }

    fn emit_header(state: &mut WriterState<W>, config: &CsvConfig) -> Result<()> {
        if state.header_written {
            return Ok(());
        }
        let names = state.bound.header_names()?;
        debug!("writing header with {} column(s)", names.len());
        write_record(&mut state.out, &names, config)?;
        state.header_written = true;
        Ok(())
    }
}

impl<W: Write, T: CsvRecord> ItemWriter<T> for CsvWriter<W, T> {
    fn write(&self, item: &T) -> Result<()> {
        CsvWriter::write(self, item)
    }

    fn flush(&self) -> Result<()> {
        CsvWriter::flush(self)
    }
}

fn terminator(config: &CsvConfig) -> &'static [u8] {
    match config.newline {
        NewlineMode::Auto | NewlineMode::Lf => b"\n",
        NewlineMode::CrLf => b"\r\n",
        NewlineMode::Cr => b"\r",
    }
}

fn write_record<W: Write>(out: &mut W, fields: &[String], config: &CsvConfig) -> Result<()> {
    for (position, field) in fields.iter().enumerate() {
        if position > 0 {
            out.write_all(&[config.delimiter])?;
        }
        write_field(out, field, config)?;
    }
    out.write_all(terminator(config))?;
    Ok(())
}

fn needs_quoting(field: &str, config: &CsvConfig) -> bool {
    config.always_quote
        || field.bytes().any(|byte| {
            byte == config.delimiter
                || byte == config.quote
                || byte == config.escape
                || byte == b'\r'
                || byte == b'\n'
        })
}

fn write_field<W: Write>(out: &mut W, field: &str, config: &CsvConfig) -> Result<()> {
    if !needs_quoting(field, config) {
        out.write_all(field.as_bytes())?;
        return Ok(());
    }

    out.write_all(&[config.quote])?;
    for byte in field.bytes() {
        if byte == config.quote || (byte == config.escape && config.escape != config.quote) {
            out.write_all(&[config.escape])?;
        }
        out.write_all(&[byte])?;
    }
    out.write_all(&[config.quote])?;
    Ok(())
}

/// A builder for configuring typed CSV writing, symmetric with the reader's.
pub struct CsvWriterBuilder<T: CsvRecord> {
    config: CsvConfig,
    map: Option<ClassMap>,
    _marker: PhantomData<T>,
}

impl<T: CsvRecord> Default for CsvWriterBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CsvRecord> CsvWriterBuilder<T> {
    pub fn new() -> Self {
        Self {
            config: CsvConfig::default(),
            map: None,
            _marker: PhantomData,
        }
    }

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

    pub fn newline(mut self, mode: NewlineMode) -> Self {
        self.config.newline = mode;
        self
    }

    pub fn always_quote(mut self, yes: bool) -> Self {
        self.config.always_quote = yes;
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

    pub fn class_map(mut self, map: ClassMap) -> Self {
        self.map = Some(map);
        self
    }

    /// Creates a writer over any [`Write`] sink. Fails fast on map-level
    /// errors.
    pub fn from_writer<W: Write>(self, wtr: W) -> Result<CsvWriter<W, T>> {
        let config = Arc::new(self.config);
        let map = match self.map {
            Some(map) => map,
            None => ClassMap::auto::<T>(),
        };
        let bound = bind_for_write(&map, &config)?;

        Ok(CsvWriter {
            state: RefCell::new(WriterState {
                out: wtr,
                bound,
                header_written: false,
                row: 0,
            }),
            config,
            _marker: PhantomData,
        })
    }

    /// Creates a buffered writer over the file at `path`, truncating it.
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<CsvWriter<BufWriter<File>, T>> {
        let file = File::create(path)?;
        self.from_writer(BufWriter::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_record;

    csv_record! {
        #[derive(Debug, Clone, PartialEq)]
        struct Row {
            name: String,
            count: u32,
        }
    }

    fn row(name: &str) -> Row {
        Row {
            name: name.to_string(),
            count: 1,
        }
    }

    fn write_one(builder: CsvWriterBuilder<Row>, item: &Row) -> String {
        let writer = builder.has_headers(false).from_writer(Vec::new()).unwrap();
        writer.write(item).unwrap();
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let data = write_one(CsvWriterBuilder::new(), &row("say \"hi\""));
        assert_eq!(data, "\"say \"\"hi\"\"\",1\n");
    }

    #[test]
    fn embedded_newlines_force_quoting() {
        let data = write_one(CsvWriterBuilder::new(), &row("a\nb"));
        assert_eq!(data, "\"a\nb\",1\n");
    }

    #[test]
    fn always_quote_wraps_every_field() {
        let data = write_one(CsvWriterBuilder::new().always_quote(true), &row("plain"));
        assert_eq!(data, "\"plain\",\"1\"\n");
    }

    #[test]
    fn distinct_escape_byte_is_used_instead_of_doubling() {
        let data = write_one(CsvWriterBuilder::new().escape(b'\\'), &row("say \"hi\""));
        assert_eq!(data, "\"say \\\"hi\\\"\",1\n");
    }

    #[test]
    fn crlf_mode_terminates_records_with_crlf() {
        let data = write_one(
            CsvWriterBuilder::new().newline(NewlineMode::CrLf),
            &row("x"),
        );
        assert_eq!(data, "x,1\r\n");
    }

    #[test]
    fn header_is_written_once_before_the_first_record() {
        let writer = CsvWriterBuilder::<Row>::new()
            .has_headers(true)
            .from_writer(Vec::new())
            .unwrap();
        writer.write(&row("a")).unwrap();
        writer.write(&row("b")).unwrap();
        let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(data, "name,count\na,1\nb,1\n");
    }
}
