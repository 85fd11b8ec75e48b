use std::io::Read;
use std::mem;
use std::sync::Arc;

use log::trace;

use crate::core::config::{BadDataPolicy, CsvConfig, NewlineMode, RowAction, TrimMode};
use crate::error::{CsvError, Result};

use super::record::Record;

/// Tokenizer state. `QuoteInQuotedField` means a quote byte was seen inside
/// a quoted field: either the closing quote or the first half of an escaped
/// quote pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    FieldStart,
    InField,
    InQuotedField,
    QuoteInQuotedField,
    EndOfStream,
}

/// Streaming tokenizer: turns a byte stream into a lazy, forward-only
/// sequence of [`Record`]s.
///
/// Input is consumed in fixed-size chunks; a field or quoted span may
/// straddle any chunk boundary, including a CRLF pair split across two
/// chunks. The per-record buffer is capped by the configured limit so a
/// pathological unterminated quote cannot grow memory without bound.
///
/// After a fatal error (unterminated quote, buffer limit, invalid UTF-8,
/// i/o failure) the tokenizer is poisoned: the error is returned once and
/// every later call yields `Ok(None)`; there is no safe resynchronization
/// point.
pub struct Tokenizer<R: Read> {
    input: R,
    config: Arc<CsvConfig>,
    chunk: Vec<u8>,
    chunk_pos: usize,
    chunk_len: usize,
    pushback: Option<u8>,
    state: State,
    field: Vec<u8>,
    fields: Vec<String>,
    /// The field currently assembled started with an opening quote.
    quoted: bool,
    /// Whitespace held back at field start while deciding whether a quote
    /// follows (only with `trim_around_quotes`).
    pending_ws: Vec<u8>,
    /// Escape byte seen inside a quoted field (distinct-escape mode only).
    escape_pending: bool,
    /// A CR was consumed as a terminator; swallow an immediately following
    /// LF.
    skip_lf: bool,
    /// Last content byte inside quotes was CR (CRLF counts one line).
    prev_cr: bool,
    line: u64,
    record_line: u64,
    record_bytes: usize,
    at_record_start: bool,
    poisoned: bool,
}

impl<R: Read> Tokenizer<R> {
    pub fn new(input: R, config: Arc<CsvConfig>) -> Self {
        let chunk = vec![0; config.read_chunk.max(1)];
        Self {
            input,
            config,
            chunk,
            chunk_pos: 0,
            chunk_len: 0,
            pushback: None,
            state: State::FieldStart,
            field: Vec::new(),
            fields: Vec::new(),
            quoted: false,
            pending_ws: Vec::new(),
            escape_pending: false,
            skip_lf: false,
            prev_cr: false,
            line: 1,
            record_line: 1,
            record_bytes: 0,
            at_record_start: true,
            poisoned: false,
        }
    }

    /// 1-based physical line of the next unconsumed byte.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Produces the next record, or `Ok(None)` at end of stream.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        if self.poisoned || self.state == State::EndOfStream {
            return Ok(None);
        }

        self.record_line = self.line;
        self.record_bytes = 0;
        self.at_record_start = true;
        self.quoted = false;

        loop {
            let byte = match self.read_byte()? {
                Some(byte) => byte,
                None => return self.finish_at_eof(),
            };

            if self.skip_lf {
                self.skip_lf = false;
                if byte == b'\n' {
                    continue;
                }
            }

            if self.at_record_start {
                if self.config.comment == Some(byte) {
                    self.consume_line()?;
                    self.record_line = self.line;
                    continue;
                }
                self.at_record_start = false;
            }

            // Terminator classification is suspended inside quoted content.
            let in_quoted_content = self.state == State::InQuotedField;
            let terminator = if in_quoted_content {
                false
            } else {
                self.classify_terminator(byte)?
            };

            if terminator {
                self.line += 1;
                if self.is_blank_line() {
                    if self.config.skip_blank_lines {
                        self.record_line = self.line;
                        self.at_record_start = true;
                        continue;
                    }
                }
                self.emit_field()?;
                self.state = State::FieldStart;
                return Ok(Some(self.take_record()));
            }

            match self.state {
                State::FieldStart => self.on_field_start(byte)?,
                State::InField => self.on_in_field(byte)?,
                State::InQuotedField => self.on_in_quoted(byte)?,
                State::QuoteInQuotedField => self.on_quote_in_quoted(byte)?,
                State::EndOfStream => return Ok(None),
            }
        }
    }

    fn on_field_start(&mut self, byte: u8) -> Result<()> {
        if byte == self.config.quote {
            self.pending_ws.clear();
            self.quoted = true;
            self.state = State::InQuotedField;
        } else if byte == self.config.delimiter {
            self.emit_field()?;
        } else if self.config.trim_around_quotes && (byte == b' ' || byte == b'\t') {
            self.pending_ws.push(byte);
            self.bump_buffered(1)?;
        } else {
            let pending = mem::take(&mut self.pending_ws);
            self.field.extend_from_slice(&pending);
            self.push_content(byte)?;
            self.state = State::InField;
        }
        Ok(())
    }

    fn on_in_field(&mut self, byte: u8) -> Result<()> {
        if byte == self.config.delimiter {
            self.emit_field()?;
            self.state = State::FieldStart;
        } else {
            self.push_content(byte)?;
        }
        Ok(())
    }

    fn on_in_quoted(&mut self, byte: u8) -> Result<()> {
        if self.escape_pending {
            self.escape_pending = false;
            self.push_content(byte)?;
            return Ok(());
        }
        if byte == self.config.escape && self.config.escape != self.config.quote {
            self.escape_pending = true;
            return Ok(());
        }
        if byte == self.config.quote {
            self.state = State::QuoteInQuotedField;
            return Ok(());
        }
        // Newlines are content here, but physical lines still advance for
        // diagnostics.
        if byte == b'\r' {
            self.line += 1;
        } else if byte == b'\n' && !self.prev_cr {
            self.line += 1;
        }
        self.prev_cr = byte == b'\r';
        self.push_content(byte)
    }

    fn on_quote_in_quoted(&mut self, byte: u8) -> Result<()> {
        if byte == self.config.quote && self.config.escape == self.config.quote {
            // Doubled quote: one literal quote, still inside the field.
            self.push_content(self.config.quote)?;
            self.state = State::InQuotedField;
            return Ok(());
        }
        if byte == self.config.delimiter {
            self.emit_field()?;
            self.state = State::FieldStart;
            return Ok(());
        }
        if self.config.trim_around_quotes && (byte == b' ' || byte == b'\t') {
            // Whitespace between the closing quote and the delimiter.
            return Ok(());
        }

        // Anything else is text after a closing quote; under a lenient
        // policy the stray byte is kept as literal content.
        self.bad_data(format!("unexpected `{}` after closing quote", byte as char))?;
        self.push_content(byte)?;
        self.state = State::InField;
        Ok(())
    }

    fn is_blank_line(&self) -> bool {
        self.state == State::FieldStart
            && self.fields.is_empty()
            && self.field.is_empty()
            && self.pending_ws.is_empty()
            && !self.quoted
    }

    fn classify_terminator(&mut self, byte: u8) -> Result<bool> {
        match self.config.newline {
            NewlineMode::Auto => {
                if byte == b'\n' {
                    Ok(true)
                } else if byte == b'\r' {
                    self.skip_lf = true;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            NewlineMode::Lf => Ok(byte == b'\n'),
            NewlineMode::Cr => Ok(byte == b'\r'),
            NewlineMode::CrLf => {
                if byte != b'\r' {
                    return Ok(false);
                }
                match self.read_byte()? {
                    Some(b'\n') => Ok(true),
                    next => {
                        // Lone CR is content in strict CRLF mode.
                        self.pushback = next;
                        Ok(false)
                    }
                }
            }
        }
    }

    fn push_content(&mut self, byte: u8) -> Result<()> {
        self.bump_buffered(1)?;
        self.field.push(byte);
        Ok(())
    }

    fn bump_buffered(&mut self, bytes: usize) -> Result<()> {
        self.record_bytes += bytes;
        if self.record_bytes > self.config.buffer_limit {
            self.poisoned = true;
            return Err(CsvError::BufferLimitExceeded {
                line: self.record_line,
                limit: self.config.buffer_limit,
            });
        }
        Ok(())
    }

    fn emit_field(&mut self) -> Result<()> {
        let mut bytes = if self.pending_ws.is_empty() {
            mem::take(&mut self.field)
        } else {
            // The held whitespace never met a quote: it is field content.
            let mut bytes = mem::take(&mut self.pending_ws);
            bytes.append(&mut self.field);
            bytes
        };

        let quoted = self.quoted;
        self.quoted = false;
        self.prev_cr = false;

        if !quoted {
            match self.config.trim {
                TrimMode::None => {}
                TrimMode::UnquotedOnly | TrimMode::All => trim_in_place(&mut bytes),
            }
        } else if self.config.trim == TrimMode::All {
            trim_in_place(&mut bytes);
        }

        let text = String::from_utf8(bytes).map_err(|_| {
            self.poisoned = true;
            CsvError::MalformedRecord {
                line: self.record_line,
                reason: "field is not valid UTF-8".to_string(),
            }
        })?;
        self.fields.push(text);
        Ok(())
    }

    fn take_record(&mut self) -> Record {
        let record = Record::new(mem::take(&mut self.fields), self.record_line);
        trace!(
            "record at line {}: {} field(s)",
            record.line,
            record.fields.len()
        );
        record
    }

    fn finish_at_eof(&mut self) -> Result<Option<Record>> {
        match self.state {
            State::InQuotedField => {
                self.poisoned = true;
                Err(CsvError::MalformedRecord {
                    line: self.record_line,
                    reason: "unterminated quoted field at end of stream".to_string(),
                })
            }
            State::QuoteInQuotedField | State::InField => {
                self.emit_field()?;
                self.state = State::EndOfStream;
                Ok(Some(self.take_record()))
            }
            State::FieldStart => {
                self.state = State::EndOfStream;
                if self.fields.is_empty() && self.field.is_empty() && self.pending_ws.is_empty() {
                    Ok(None)
                } else {
                    // Trailing delimiter: the final field is empty.
                    self.emit_field()?;
                    Ok(Some(self.take_record()))
                }
            }
            State::EndOfStream => Ok(None),
        }
    }

    /// Applies the bad-data policy. Returns the action to take, or the
    /// fatal error under `Throw` (and under `Raise` when the handler says
    /// `Fail`).
    fn bad_data(&mut self, reason: String) -> Result<RowAction> {
        let error = CsvError::MalformedRecord {
            line: self.record_line,
            reason,
        };
        let action = match self.config.bad_data {
            BadDataPolicy::Throw => RowAction::Fail,
            BadDataPolicy::Skip => RowAction::Skip,
            BadDataPolicy::Raise => match &self.config.on_bad_data {
                Some(handler) => handler(&error),
                None => RowAction::Fail,
            },
        };
        match action {
            RowAction::Fail => {
                self.poisoned = true;
                Err(error)
            }
            RowAction::Skip => Ok(RowAction::Skip),
        }
    }

    fn consume_line(&mut self) -> Result<()> {
        loop {
            match self.read_byte()? {
                None => {
                    self.state = State::EndOfStream;
                    return Ok(());
                }
                Some(byte) => {
                    if self.skip_lf {
                        self.skip_lf = false;
                        if byte == b'\n' {
                            continue;
                        }
                    }
                    if self.classify_terminator(byte)? {
                        self.line += 1;
                        return Ok(());
                    }
                }
            }
        }
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        if let Some(byte) = self.pushback.take() {
            return Ok(Some(byte));
        }
        if self.chunk_pos >= self.chunk_len {
            self.chunk_len = self.input.read(&mut self.chunk).map_err(|e| {
                self.poisoned = true;
                CsvError::Io(e)
            })?;
            self.chunk_pos = 0;
            if self.chunk_len == 0 {
                return Ok(None);
            }
        }
        let byte = self.chunk[self.chunk_pos];
        self.chunk_pos += 1;
        Ok(Some(byte))
    }
}

fn trim_in_place(bytes: &mut Vec<u8>) {
    while bytes.last().is_some_and(|b| b.is_ascii_whitespace()) {
        bytes.pop();
    }
    let leading = bytes
        .iter()
        .take_while(|b| b.is_ascii_whitespace())
        .count();
    if leading > 0 {
        bytes.drain(..leading);
    }
}
