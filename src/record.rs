/*!
 * Record parsing for delimited, line-oriented files.
 *
 * Every input line is one record. A record is split on a fixed field
 * delimiter into a fixed number of fields; one field carries the text to
 * translate and another receives the translation.
 */

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use log::warn;

use crate::app_config::{EscapeRule, RecordConfig};
use crate::errors::{PipelineError, RecordError};

/// Field layout shared by every record of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    /// Field delimiter
    pub delimiter: String,
    /// Fields per line
    pub field_count: usize,
    /// Index of the translatable field
    pub source_field: usize,
    /// Index of the translated field
    pub target_field: usize,
}

impl RecordLayout {
    pub fn from_config(config: &RecordConfig) -> Self {
        Self {
            delimiter: config.field_delimiter.clone(),
            field_count: config.field_count,
            source_field: config.source_field,
            target_field: config.target_field,
        }
    }

    /// Split one line (without its line ending) into a record
    pub fn parse(&self, line_number: usize, line: &str) -> Result<Record, RecordError> {
        let fields: Vec<String> = line.split(self.delimiter.as_str()).map(str::to_string).collect();
        if fields.len() != self.field_count {
            return Err(RecordError::FieldCount {
                line: line_number,
                expected: self.field_count,
                found: fields.len(),
            });
        }
        Ok(Record {
            line: line_number,
            fields,
            source_field: self.source_field,
            target_field: self.target_field,
        })
    }
}

impl Default for RecordLayout {
    fn default() -> Self {
        Self::from_config(&RecordConfig::default())
    }
}

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 1-based line number in the input file
    pub line: usize,
    /// All fields in input order
    pub fields: Vec<String>,
    source_field: usize,
    target_field: usize,
}

impl Record {
    /// Identifier field
    pub fn identifier(&self) -> &str {
        self.fields.first().map(String::as_str).unwrap_or("")
    }

    /// Text to translate
    pub fn source_text(&self) -> &str {
        &self.fields[self.source_field]
    }

    pub fn set_source_text(&mut self, text: String) {
        self.fields[self.source_field] = text;
    }

    /// Translated text, empty until reassembly
    pub fn translation(&self) -> &str {
        &self.fields[self.target_field]
    }

    pub fn set_translation(&mut self, text: String) {
        self.fields[self.target_field] = text;
    }

    /// Join the fields back into an output line, without line ending
    pub fn to_line(&self, delimiter: &str) -> String {
        self.fields.join(delimiter)
    }
}

/// Reversible substitution of reserved substrings with placeholders
#[derive(Debug, Clone, Default)]
pub struct Escaper {
    rules: Vec<EscapeRule>,
}

impl Escaper {
    pub fn new(rules: Vec<EscapeRule>) -> Self {
        Self { rules }
    }

    pub fn escape(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(text.to_string(), |acc, rule| acc.replace(&rule.reserved, &rule.placeholder))
    }

    pub fn unescape(&self, text: &str) -> String {
        self.rules
            .iter()
            .rev()
            .fold(text.to_string(), |acc, rule| acc.replace(&rule.placeholder, &rule.reserved))
    }

    /// False when the text already holds a placeholder, which unescape would rewrite
    pub fn is_reversible(&self, text: &str) -> bool {
        !self.rules.iter().any(|rule| text.contains(&rule.placeholder))
    }
}

/// Lazy reader yielding the records after a checkpoint
pub struct RecordReader<R> {
    reader: R,
    layout: RecordLayout,
    escaper: Escaper,
    line_number: usize,
    buf: Vec<u8>,
}

impl RecordReader<BufReader<File>> {
    /// Open an input file and skip `skip` lines
    pub fn open<P: AsRef<Path>>(
        path: P,
        layout: RecordLayout,
        escaper: Escaper,
        skip: usize,
    ) -> io::Result<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file), layout, escaper, skip)
    }
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(reader: R, layout: RecordLayout, escaper: Escaper, skip: usize) -> io::Result<Self> {
        let mut record_reader = Self {
            reader,
            layout,
            escaper,
            line_number: 0,
            buf: Vec::new(),
        };
        for _ in 0..skip {
            if !record_reader.next_raw_line()? {
                break;
            }
        }
        Ok(record_reader)
    }

    /// Number of lines consumed so far, skipped ones included
    pub fn lines_consumed(&self) -> usize {
        self.line_number
    }

    fn next_raw_line(&mut self) -> io::Result<bool> {
        self.buf.clear();
        let read = self.reader.read_until(b'\n', &mut self.buf)?;
        if read == 0 {
            return Ok(false);
        }
        self.line_number += 1;
        if self.buf.ends_with(b"\n") {
            self.buf.pop();
            if self.buf.ends_with(b"\r") {
                self.buf.pop();
            }
        }
        Ok(true)
    }

    fn read_record(&mut self) -> Result<Option<Record>, PipelineError> {
        if !self.next_raw_line()? {
            return Ok(None);
        }
        let line = std::str::from_utf8(&self.buf)
            .map_err(|_| RecordError::Encoding { line: self.line_number })?;
        let mut record = self.layout.parse(self.line_number, line)?;

        if !self.escaper.is_reversible(record.source_text()) {
            warn!(
                "Line {} already contains an escape placeholder; it will not survive unescaping",
                record.line
            );
        }
        let escaped = self.escaper.escape(record.source_text());
        record.set_source_text(escaped);
        record.set_translation(String::new());
        Ok(Some(record))
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<Record, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}
