//! Retorno (bank to company) file parser.
//!
//! Lines are dispatched by their record-type marker: `0` is the file header,
//! `9` the file trailer, and in CNAB 240 `1` and `5` are the batch header and
//! trailer. Everything else is a detail record.
//!
//! Header and trailer fields decode leniently: a field that does not decode
//! is kept as raw text and reported in [`RetornoFile::warnings`]. A detail
//! record with a field that does not decode is discarded and parsing goes
//! on; discarded records do not take a detail sequence number.

use crate::banks::BankProfile;
use crate::error::{Error, Result};
use crate::fixed_width::FixedWidthLine;
use crate::layout::{Decode, FieldSpec, RetornoLayout};
use crate::types::OccurrenceKind;
use crate::Layout;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::{Read, Write};
use tracing::{debug, info, warn};

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldData {
    Text(String),
    Integer(u64),
    Amount(Decimal),
    /// `None` for blank or all-zero dates.
    Date(Option<NaiveDate>),
}

impl fmt::Display for FieldData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldData::Text(text) => f.write_str(text),
            FieldData::Integer(n) => write!(f, "{}", n),
            FieldData::Amount(amount) => write!(f, "{}", amount),
            FieldData::Date(Some(date)) => write!(f, "{}", date.format("%Y-%m-%d")),
            FieldData::Date(None) => Ok(()),
        }
    }
}

/// Named fields of one parsed record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldData>,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&FieldData> {
        self.fields.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(FieldData::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<u64> {
        match self.get(name) {
            Some(FieldData::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn amount(&self, name: &str) -> Option<Decimal> {
        match self.get(name) {
            Some(FieldData::Amount(amount)) => Some(*amount),
            _ => None,
        }
    }

    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        match self.get(name) {
            Some(FieldData::Date(date)) => *date,
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldData)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One kept detail record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetornoDetail {
    /// Position among kept details, starting at 1.
    pub sequence: usize,
    /// Line number of the record's first line.
    pub line: usize,
    pub occurrence: OccurrenceKind,
    pub fields: Record,
}

impl RetornoDetail {
    pub fn nosso_numero(&self) -> Option<&str> {
        self.fields.text("nosso_numero")
    }

    pub fn occurrence_code(&self) -> Option<&str> {
        self.fields.text("occurrence")
    }

    pub fn amount(&self) -> Option<Decimal> {
        self.fields.amount("amount")
    }

    pub fn paid_amount(&self) -> Option<Decimal> {
        self.fields.amount("paid_amount")
    }
}

/// A detail record dropped during parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discarded {
    pub line: usize,
    pub reason: String,
}

/// Aggregates over the kept details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub details: usize,
    pub amount: Decimal,
    pub paid: usize,
    pub paid_amount: Decimal,
}

/// A parsed retorno file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetornoFile {
    pub bank_code: String,
    pub bank_name: String,
    pub layout: Layout,
    pub header: Record,
    pub batch_header: Option<Record>,
    pub details: Vec<RetornoDetail>,
    pub discarded: Vec<Discarded>,
    pub batch_trailer: Option<Record>,
    pub trailer: Option<Record>,
    pub totals: Option<Totals>,
    pub warnings: Vec<String>,
    /// Number of non-blank lines read.
    pub line_count: usize,
}

impl RetornoFile {
    fn new(profile: &BankProfile, layout: Layout) -> Self {
        Self {
            bank_code: profile.code.to_string(),
            bank_name: profile.name.to_string(),
            layout,
            header: Record::default(),
            batch_header: None,
            details: Vec::new(),
            discarded: Vec::new(),
            batch_trailer: None,
            trailer: None,
            totals: None,
            warnings: Vec::new(),
            line_count: 0,
        }
    }

    fn warn(&mut self, message: String) {
        warn!(bank = %self.bank_code, "{}", message);
        self.warnings.push(message);
    }

    /// Look up a kept detail by its sequence number.
    pub fn detail(&self, sequence: usize) -> Option<&RetornoDetail> {
        sequence.checked_sub(1).and_then(|i| self.details.get(i))
    }

    /// Write the whole file as pretty-printed JSON.
    pub fn write_json<W: Write>(&self, writer: &mut W) -> Result<()> {
        serde_json::to_writer_pretty(&mut *writer, self)?;
        writeln!(writer)?;
        Ok(())
    }

    /// Write one CSV row per kept detail.
    ///
    /// Columns are `sequence`, `line`, `occurrence` and then every detail
    /// field name in alphabetical order.
    pub fn write_csv<W: Write>(&self, writer: &mut W) -> Result<()> {
        let names: BTreeSet<&str> = self
            .details
            .iter()
            .flat_map(|d| d.fields.iter().map(|(name, _)| name))
            .collect();

        let mut csv_writer = csv::Writer::from_writer(writer);
        let mut header = vec!["sequence", "line", "occurrence"];
        header.extend(names.iter().copied());
        csv_writer.write_record(&header)?;

        for detail in &self.details {
            let mut row = vec![
                detail.sequence.to_string(),
                detail.line.to_string(),
                format!("{:?}", detail.occurrence),
            ];
            row.extend(
                names
                    .iter()
                    .map(|name| detail.fields.get(name).map(|v| v.to_string()).unwrap_or_default()),
            );
            csv_writer.write_record(&row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

/// Totals over the kept details, checked against the trailer's slip count
/// when it declares one.
pub fn summarize(file: &mut RetornoFile) {
    let mut totals = Totals {
        details: file.details.len(),
        ..Totals::default()
    };
    for detail in &file.details {
        totals.amount += detail.amount().unwrap_or_default();
        if detail.occurrence == OccurrenceKind::Paid {
            totals.paid += 1;
            totals.paid_amount += detail.paid_amount().unwrap_or_default();
        }
    }
    file.totals = Some(totals);

    let declared = file.trailer.as_ref().and_then(|t| t.integer("slip_count"));
    if let Some(declared) = declared {
        let read = (file.details.len() + file.discarded.len()) as u64;
        if declared != read {
            file.warn(format!("trailer declares {} slips, file has {}", declared, read));
        }
    }
}

/// [`summarize`], then check the CNAB 240 record counts of the trailers.
pub fn reconcile(file: &mut RetornoFile) {
    summarize(file);

    let lines = file.line_count as u64;
    let declared = file.trailer.as_ref().and_then(|t| t.integer("records"));
    if let Some(declared) = declared {
        if declared != lines {
            file.warn(format!("trailer declares {} records, file has {}", declared, lines));
        }
    }
    let declared = file.batch_trailer.as_ref().and_then(|t| t.integer("batch_records"));
    if let Some(declared) = declared {
        let batch = lines.saturating_sub(2);
        if declared != batch {
            file.warn(format!("batch trailer declares {} records, batch has {}", declared, batch));
        }
    }
}

fn decode(raw: &str, decode: Decode) -> Result<FieldData> {
    let text = raw.trim();
    let digits_only = text.bytes().all(|b| b.is_ascii_digit());
    match decode {
        Decode::Text => Ok(FieldData::Text(text.to_string())),
        Decode::Digits => {
            if text.is_empty() || !digits_only {
                return Err(Error::InvalidDigitInput(raw.to_string()));
            }
            Ok(FieldData::Text(text.to_string()))
        }
        Decode::Integer => {
            if text.is_empty() {
                return Ok(FieldData::Integer(0));
            }
            text.parse::<u64>()
                .map(FieldData::Integer)
                .map_err(|_| Error::ParseError(format!("{:?} is not an integer", raw)))
        }
        Decode::Amount(places) => {
            if text.is_empty() {
                return Ok(FieldData::Amount(Decimal::ZERO));
            }
            if !digits_only {
                return Err(Error::InvalidAmount(raw.to_string()));
            }
            let cents = text
                .parse::<i128>()
                .map_err(|_| Error::InvalidAmount(raw.to_string()))?;
            Ok(FieldData::Amount(Decimal::from_i128_with_scale(cents, places)))
        }
        Decode::Date(format) => {
            if text.is_empty() || text.bytes().all(|b| b == b'0') {
                return Ok(FieldData::Date(None));
            }
            NaiveDate::parse_from_str(text, format)
                .map(|date| FieldData::Date(Some(date)))
                .map_err(|_| Error::InvalidDate(raw.to_string()))
        }
    }
}

fn decode_strict(line: &FixedWidthLine, specs: &[FieldSpec]) -> Result<Record> {
    let mut record = Record::default();
    for spec in specs {
        let raw = line.read(spec.start, spec.end)?;
        let value = decode(&raw, spec.decode).map_err(|e| {
            Error::ParseError(format!("{} ({}-{}): {}", spec.name, spec.start, spec.end, e))
        })?;
        record.fields.insert(spec.name.to_string(), value);
    }
    Ok(record)
}

fn decode_lenient(line: &FixedWidthLine, specs: &[FieldSpec], problems: &mut Vec<String>) -> Result<Record> {
    let mut record = Record::default();
    for spec in specs {
        let raw = line.read(spec.start, spec.end)?;
        let value = decode(&raw, spec.decode).unwrap_or_else(|e| {
            problems.push(format!("{} ({}-{}): {}", spec.name, spec.start, spec.end, e));
            FieldData::Text(raw.trim().to_string())
        });
        record.fields.insert(spec.name.to_string(), value);
    }
    Ok(record)
}

/// Detail record still receiving continuation segments.
struct OpenDetail {
    line: usize,
    fields: Record,
}

/// Parser for one retorno file.
#[derive(Debug)]
pub struct Retorno {
    profile: &'static BankProfile,
    layout: &'static RetornoLayout,
    lines: Vec<String>,
    file: Option<RetornoFile>,
}

impl Retorno {
    /// Parser for a retorno of a known bank and layout.
    pub fn new(bank_code: &str, layout: Layout, content: &str) -> Result<Self> {
        let profile = BankProfile::lookup(bank_code)?;
        let retorno_layout = profile.retorno_layout(layout)?;
        Ok(Self {
            profile,
            layout: retorno_layout,
            lines: content.lines().map(str::to_string).collect(),
            file: None,
        })
    }

    /// Detect layout and bank from the file header.
    ///
    /// The layout comes from the width of the first line, the bank from
    /// columns 77-79 (CNAB 400) or 1-3 (CNAB 240).
    pub fn detect(content: &str) -> Result<Self> {
        let first = content
            .lines()
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| Error::ParseError("empty retorno file".to_string()))?;
        let header = FixedWidthLine::parse(first);
        let layout = Layout::from_width(header.width()).ok_or_else(|| {
            Error::ParseError(format!("unrecognized line width {}", header.width()))
        })?;

        let (marker, kind, bank_code) = match layout {
            Layout::Cnab400 => (header.read(1, 1)?, header.read(2, 2)?, header.read(77, 79)?),
            Layout::Cnab240 => (header.read(8, 8)?, header.read(143, 143)?, header.read(1, 3)?),
        };
        if marker != "0" {
            return Err(Error::ParseError("first line is not a file header".to_string()));
        }
        if kind == "1" {
            return Err(Error::ParseError("this is a remessa file, not a retorno".to_string()));
        }
        debug!(bank = %bank_code, layout = %layout, "detected retorno");
        Self::new(&bank_code, layout, content)
    }

    /// Read a whole retorno file and detect its bank and layout.
    ///
    /// Bytes that are not valid UTF-8 are replaced.
    pub fn from_read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::detect(&String::from_utf8_lossy(&bytes))
    }

    pub fn profile(&self) -> &'static BankProfile {
        self.profile
    }

    /// Parse the file. Later calls return the same result.
    pub fn process(&mut self) -> Result<&RetornoFile> {
        if self.file.is_none() {
            let file = self.parse()?;
            self.file = Some(file);
        }
        self.file
            .as_ref()
            .ok_or_else(|| Error::ParseError("retorno not processed".to_string()))
    }

    fn parse(&self) -> Result<RetornoFile> {
        let layout = self.layout;
        let mut file = RetornoFile::new(self.profile, layout.layout);
        let mut open: Option<OpenDetail> = None;
        let mut dropping = false;
        let mut seen_header = false;

        for (index, text) in self.lines.iter().enumerate() {
            if text.trim().is_empty() {
                continue;
            }
            let number = index + 1;
            file.line_count += 1;
            let line = FixedWidthLine::parse(text);
            let marker = line.read(layout.record_type_column, layout.record_type_column)?;

            match (layout.layout, marker.as_str()) {
                (_, "0") => {
                    self.close(&mut file, &mut open);
                    if seen_header {
                        file.warn(format!("line {}: repeated file header", number));
                    }
                    seen_header = true;
                    let mut problems = Vec::new();
                    file.header = decode_lenient(&line, layout.header, &mut problems)?;
                    self.report(&mut file, number, "header", problems);
                    if let Some(code) = file.header.text("bank_code") {
                        if code != self.profile.code {
                            return Err(Error::BankMismatch {
                                expected: self.profile.code.to_string(),
                                found: code.to_string(),
                            });
                        }
                    }
                }
                (Layout::Cnab240, "1") => {
                    self.close(&mut file, &mut open);
                    let mut problems = Vec::new();
                    file.batch_header = Some(decode_lenient(&line, layout.batch_header, &mut problems)?);
                    self.report(&mut file, number, "batch header", problems);
                }
                (Layout::Cnab240, "5") => {
                    self.close(&mut file, &mut open);
                    let mut problems = Vec::new();
                    file.batch_trailer = Some(decode_lenient(&line, layout.batch_trailer, &mut problems)?);
                    self.report(&mut file, number, "batch trailer", problems);
                }
                (_, "9") => {
                    self.close(&mut file, &mut open);
                    let mut problems = Vec::new();
                    file.trailer = Some(decode_lenient(&line, layout.trailer, &mut problems)?);
                    self.report(&mut file, number, "trailer", problems);
                }
                _ => self.detail(&mut file, &mut open, &mut dropping, &line, number)?,
            }
        }
        self.close(&mut file, &mut open);

        if !seen_header {
            return Err(Error::ParseError("retorno has no file header".to_string()));
        }
        if file.trailer.is_none() {
            file.warn("retorno has no file trailer".to_string());
        }
        if let Some(finalize) = self.profile.retorno_finalize {
            finalize(&mut file);
        }
        info!(
            bank = self.profile.code,
            details = file.details.len(),
            discarded = file.discarded.len(),
            "processed retorno"
        );
        Ok(file)
    }

    fn detail(
        &self,
        file: &mut RetornoFile,
        open: &mut Option<OpenDetail>,
        dropping: &mut bool,
        line: &FixedWidthLine,
        number: usize,
    ) -> Result<()> {
        let marker = match self.layout.segment_column {
            Some(column) => line.read(column, column)?.trim().to_string(),
            None => String::new(),
        };
        let Some(segment) = self.layout.segment(&marker) else {
            debug!(line = number, segment = %marker, "skipping unhandled segment");
            return Ok(());
        };

        if segment.starts_record {
            self.close(file, open);
            *dropping = false;
            match decode_strict(line, segment.fields) {
                Ok(fields) => *open = Some(OpenDetail { line: number, fields }),
                Err(e) => {
                    *dropping = true;
                    discard(file, number, e);
                }
            }
            return Ok(());
        }

        if *dropping {
            debug!(line = number, "skipping segment of a discarded record");
            return Ok(());
        }
        match decode_strict(line, segment.fields) {
            Ok(fields) => match open.as_mut() {
                Some(current) => current.fields.fields.extend(fields.fields),
                None => discard(
                    file,
                    number,
                    Error::ParseError(format!("segment {} without a leading segment", marker)),
                ),
            },
            Err(e) => {
                let first = open.take().map_or(number, |d| d.line);
                *dropping = true;
                discard(file, first, e);
            }
        }
        Ok(())
    }

    fn close(&self, file: &mut RetornoFile, open: &mut Option<OpenDetail>) {
        if let Some(detail) = open.take() {
            let occurrence = detail
                .fields
                .text("occurrence")
                .map(|code| self.profile.occurrence(code))
                .unwrap_or(OccurrenceKind::Other);
            file.details.push(RetornoDetail {
                sequence: file.details.len() + 1,
                line: detail.line,
                occurrence,
                fields: detail.fields,
            });
        }
    }

    fn report(&self, file: &mut RetornoFile, line: usize, record: &str, problems: Vec<String>) {
        for problem in problems {
            file.warn(format!("line {}: {} field {}", line, record, problem));
        }
    }
}

fn discard(file: &mut RetornoFile, line: usize, reason: Error) {
    warn!(bank = %file.bank_code, line, %reason, "discarding detail record");
    file.discarded.push(Discarded {
        line,
        reason: reason.to_string(),
    });
}
