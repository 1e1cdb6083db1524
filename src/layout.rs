//! Column tables describing bank record layouts.
//!
//! A remessa record is a list of [`Column`]s, each naming where a value
//! comes from ([`Source`]) and how it is rendered. A retorno record is a
//! list of [`FieldSpec`]s naming the parsed field and how it is decoded.

use crate::error::Result;
use crate::fixed_width::{FieldMode, FieldValue, FixedWidthLine};
use crate::Layout;

/// Where a remessa column takes its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Spaces (alphanumeric) filler.
    Blank,
    /// Zeros filler.
    Zero,
    Literal(&'static str),

    // File-level data.
    BankCode,
    BankName,
    BeneficiaryKind,
    BeneficiaryDocument,
    BeneficiaryName,
    Agency,
    AgencyDv,
    Account,
    AccountDv,
    Contract,
    Wallet,
    FileSequence,
    GeneratedDate,
    GeneratedTime,

    /// Running record counter (whole file for 400, batch details for 240).
    Sequence,

    // Slip data.
    NossoNumero,
    DocumentNumber,
    Installment,
    ControlNumber,
    DueDate,
    IssueDate,
    Amount,
    InterestPerDay,
    Discount,
    SpeciesCode,
    PayerKind,
    PayerDocument,
    PayerName,
    PayerAddress,
    PayerDistrict,
    PayerPostalPrefix,
    PayerPostalSuffix,
    PayerCity,
    PayerState,

    // Totals, known once all slips are in.
    SlipCount,
    TotalAmount,
    BatchRecordCount,
    FileRecordCount,
}

/// One column range of a remessa record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub start: usize,
    pub end: usize,
    pub mode: FieldMode,
    pub source: Source,
}

pub const fn num(start: usize, end: usize, source: Source) -> Column {
    Column {
        start,
        end,
        mode: FieldMode::Numeric,
        source,
    }
}

pub const fn alpha(start: usize, end: usize, source: Source) -> Column {
    Column {
        start,
        end,
        mode: FieldMode::Alphanumeric,
        source,
    }
}

pub const fn blank(start: usize, end: usize) -> Column {
    alpha(start, end, Source::Blank)
}

/// Amount with two implied decimal places.
pub const fn money(start: usize, end: usize, source: Source) -> Column {
    Column {
        start,
        end,
        mode: FieldMode::Decimal(2),
        source,
    }
}

pub const fn date(start: usize, end: usize, format: &'static str, source: Source) -> Column {
    Column {
        start,
        end,
        mode: FieldMode::Date(format),
        source,
    }
}

/// A remessa record type (header, segment, trailer).
#[derive(Debug, Clone, Copy)]
pub struct RecordLayout {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl RecordLayout {
    /// Render a line of `width` characters, resolving each column's source.
    pub fn render<'a, F>(&self, width: usize, mut resolve: F) -> Result<FixedWidthLine>
    where
        F: FnMut(Source) -> Result<FieldValue<'a>>,
    {
        let mut line = FixedWidthLine::new(width);
        for column in self.columns {
            let value = resolve(column.source)?;
            line.write(column.start, column.end, value, column.mode)?;
        }
        Ok(line)
    }
}

/// Complete remessa layout of one bank for one line width.
#[derive(Debug, Clone, Copy)]
pub struct RemessaLayout {
    pub layout: Layout,
    pub header: RecordLayout,
    pub batch_header: Option<RecordLayout>,
    /// Records emitted per slip, in order.
    pub segments: &'static [RecordLayout],
    pub batch_trailer: Option<RecordLayout>,
    pub trailer: RecordLayout,
    pub line_ending: &'static str,
    /// Written after the last line; some banks reject a trailing newline.
    pub final_line_ending: &'static str,
}

/// How a retorno field is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decode {
    /// Trimmed text.
    Text,
    /// Non-empty digit string, kept as text.
    Digits,
    Integer,
    /// Digits with implied decimal places.
    Amount(u32),
    /// Date in a chrono format; blank or all zeros means no date.
    Date(&'static str),
}

/// One named field of a retorno record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub start: usize,
    pub end: usize,
    pub decode: Decode,
}

pub const fn field(name: &'static str, start: usize, end: usize, decode: Decode) -> FieldSpec {
    FieldSpec {
        name,
        start,
        end,
        decode,
    }
}

/// A detail record kind, selected by its segment marker.
#[derive(Debug, Clone, Copy)]
pub struct SegmentSpec {
    /// Segment letter; empty for layouts without segments.
    pub marker: &'static str,
    /// Whether this segment opens a new detail record or extends the last.
    pub starts_record: bool,
    pub fields: &'static [FieldSpec],
}

/// Complete retorno layout of one bank for one line width.
#[derive(Debug, Clone, Copy)]
pub struct RetornoLayout {
    pub layout: Layout,
    pub record_type_column: usize,
    pub segment_column: Option<usize>,
    pub header: &'static [FieldSpec],
    pub batch_header: &'static [FieldSpec],
    pub segments: &'static [SegmentSpec],
    pub batch_trailer: &'static [FieldSpec],
    pub trailer: &'static [FieldSpec],
}

impl RetornoLayout {
    pub fn segment(&self, marker: &str) -> Option<&SegmentSpec> {
        self.segments.iter().find(|s| s.marker == marker)
    }
}
