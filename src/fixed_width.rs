//! Positional codec for fixed-width CNAB lines.
//!
//! Columns are 1-indexed and inclusive, as they appear in bank layout
//! manuals: `write(86, 100, ...)` fills a 15-character field.
//!
//! Numeric fields reject values that do not fit, while alphanumeric fields
//! silently truncate: a long payer name loses its tail, a long amount is an
//! error. Callers that need every character must check lengths themselves.

use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::{Decimal, RoundingStrategy};
use std::borrow::Cow;
use std::fmt;

/// How a value is rendered into its column range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMode {
    /// Digits only, right-aligned, zero-padded on the left.
    Numeric,
    /// Literal text, left-aligned, space-padded, truncated when longer.
    Alphanumeric,
    /// Value scaled by 10^places, rounded, then rendered as `Numeric`.
    Decimal(u32),
    /// Date or time rendered with a chrono format string.
    Date(&'static str),
}

/// A value to be written into a line.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Text(Cow<'a, str>),
    Number(u64),
    Amount(Decimal),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl<'a> From<&'a str> for FieldValue<'a> {
    fn from(value: &'a str) -> Self {
        FieldValue::Text(Cow::Borrowed(value))
    }
}

impl From<String> for FieldValue<'_> {
    fn from(value: String) -> Self {
        FieldValue::Text(Cow::Owned(value))
    }
}

impl From<u64> for FieldValue<'_> {
    fn from(value: u64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<Decimal> for FieldValue<'_> {
    fn from(value: Decimal) -> Self {
        FieldValue::Amount(value)
    }
}

impl From<NaiveDate> for FieldValue<'_> {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl From<NaiveTime> for FieldValue<'_> {
    fn from(value: NaiveTime) -> Self {
        FieldValue::Time(value)
    }
}

/// A mutable line of exactly `width` characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedWidthLine {
    chars: Vec<char>,
}

impl FixedWidthLine {
    /// Create a blank (space-filled) line.
    pub fn new(width: usize) -> Self {
        Self {
            chars: vec![' '; width],
        }
    }

    /// Wrap an existing line for reading. A trailing `\r` is dropped.
    pub fn parse(text: &str) -> Self {
        Self {
            chars: text.trim_end_matches(['\r', '\n']).chars().collect(),
        }
    }

    /// Number of characters in the line.
    pub fn width(&self) -> usize {
        self.chars.len()
    }

    /// Write `value` into columns `start..=end` using `mode`.
    ///
    /// Overlapping writes are allowed; the last one wins.
    ///
    /// # Examples
    ///
    /// ```
    /// use boleto_cnab::fixed_width::{FieldMode, FixedWidthLine};
    ///
    /// let mut line = FixedWidthLine::new(10);
    /// line.write(1, 3, "756", FieldMode::Numeric)?;
    /// line.write(4, 10, "SICOOB", FieldMode::Alphanumeric)?;
    /// assert_eq!(line.to_string(), "756SICOOB ");
    /// # Ok::<(), boleto_cnab::Error>(())
    /// ```
    pub fn write<'a>(
        &mut self,
        start: usize,
        end: usize,
        value: impl Into<FieldValue<'a>>,
        mode: FieldMode,
    ) -> Result<()> {
        self.check_range(start, end)?;
        let width = end - start + 1;
        let target = || format!("columns {}-{}", start, end);
        let rendered = render(&value.into(), width, mode, target)?;

        let rendered: Vec<char> = rendered.chars().collect();
        if rendered.len() != width {
            return Err(Error::ColumnRange {
                start,
                end,
                width: self.width(),
            });
        }
        self.chars[start - 1..end].copy_from_slice(&rendered);
        Ok(())
    }

    /// Read columns `start..=end` as raw text.
    ///
    /// Lines that were right-trimmed in transit are read as if space-padded:
    /// the result is clipped at the end of the line and may be shorter than
    /// the field.
    pub fn read(&self, start: usize, end: usize) -> Result<String> {
        if start == 0 || end < start {
            return Err(Error::ColumnRange {
                start,
                end,
                width: self.width(),
            });
        }
        let from = (start - 1).min(self.chars.len());
        let to = end.min(self.chars.len());
        Ok(self.chars[from..to].iter().collect())
    }

    fn check_range(&self, start: usize, end: usize) -> Result<()> {
        if start == 0 || end < start || end > self.chars.len() {
            return Err(Error::ColumnRange {
                start,
                end,
                width: self.width(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for FixedWidthLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.chars {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// Zero-pad a digit string to `width`.
///
/// Leading zeros of the input do not count towards the width, so
/// `"00000001"` fits a 7-digit field. Empty input renders as zeros.
pub fn pad_numeric(value: &str, width: usize, field: &str) -> Result<String> {
    let value = value.trim();
    if !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::format(field, format!("{:?} is not a non-negative integer", value)));
    }
    let significant = value.trim_start_matches('0');
    if significant.len() > width {
        return Err(Error::format(
            field,
            format!("{} digits do not fit in {}", significant.len(), width),
        ));
    }
    Ok(format!("{:0>width$}", significant, width = width))
}

fn render(value: &FieldValue<'_>, width: usize, mode: FieldMode, target: impl Fn() -> String) -> Result<String> {
    match mode {
        FieldMode::Numeric => match value {
            FieldValue::Text(text) => pad_numeric(text, width, &target()),
            FieldValue::Number(n) => pad_numeric(&n.to_string(), width, &target()),
            FieldValue::Amount(amount) => {
                if amount.is_sign_negative() || !amount.fract().is_zero() {
                    return Err(Error::format(target(), format!("{} is not a non-negative integer", amount)));
                }
                pad_numeric(&amount.trunc().to_string(), width, &target())
            }
            FieldValue::Date(_) | FieldValue::Time(_) => {
                Err(Error::format(target(), "dates need a date field"))
            }
        },
        FieldMode::Decimal(places) => {
            let amount = match value {
                FieldValue::Amount(amount) => *amount,
                FieldValue::Number(n) => Decimal::from(*n),
                FieldValue::Text(text) => text
                    .trim()
                    .replace(',', ".")
                    .parse::<Decimal>()
                    .map_err(|_| Error::format(target(), format!("{:?} is not a number", text)))?,
                FieldValue::Date(_) | FieldValue::Time(_) => {
                    return Err(Error::format(target(), "dates need a date field"));
                }
            };
            if amount.is_sign_negative() && !amount.is_zero() {
                return Err(Error::format(target(), format!("negative amount {}", amount)));
            }
            let scaled = amount
                .checked_mul(Decimal::from(10u64.pow(places)))
                .ok_or_else(|| Error::format(target(), "amount out of range"))?
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
            pad_numeric(&scaled.abs().trunc().to_string(), width, &target())
        }
        FieldMode::Alphanumeric => {
            let text = match value {
                FieldValue::Text(text) => text.to_string(),
                FieldValue::Number(n) => n.to_string(),
                FieldValue::Amount(amount) => amount.to_string(),
                FieldValue::Date(_) | FieldValue::Time(_) => {
                    return Err(Error::format(target(), "dates need a date field"));
                }
            };
            let mut out: String = text.chars().take(width).collect();
            let len = out.chars().count();
            out.extend(std::iter::repeat(' ').take(width - len));
            Ok(out)
        }
        FieldMode::Date(format) => match value {
            FieldValue::Date(date) => Ok(date.format(format).to_string()),
            FieldValue::Time(time) => Ok(time.format(format).to_string()),
            _ => Err(Error::format(target(), "expected a date or time")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_numeric_is_zero_padded() {
        let mut line = FixedWidthLine::new(10);
        line.write(3, 7, "42", FieldMode::Numeric).unwrap();
        assert_eq!(line.to_string(), "  00042   ");
    }

    #[test]
    fn test_numeric_overflow_is_fatal() {
        let mut line = FixedWidthLine::new(10);
        let err = line.write(1, 3, "1234", FieldMode::Numeric).unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
        assert_eq!(line.to_string(), " ".repeat(10));
    }

    #[test]
    fn test_numeric_rejects_non_digits() {
        let mut line = FixedWidthLine::new(5);
        assert!(line.write(1, 5, "12a", FieldMode::Numeric).is_err());
        assert!(line.write(1, 5, "-12", FieldMode::Numeric).is_err());
        assert!(line
            .write(1, 5, Decimal::from_str("-1").unwrap(), FieldMode::Numeric)
            .is_err());
    }

    #[test]
    fn test_leading_zeros_do_not_count() {
        let mut line = FixedWidthLine::new(7);
        line.write(1, 7, "00000001", FieldMode::Numeric).unwrap();
        assert_eq!(line.to_string(), "0000001");
    }

    #[test]
    fn test_alphanumeric_truncates_silently() {
        let mut line = FixedWidthLine::new(8);
        line.write(1, 5, "JOSÉ DA SILVA", FieldMode::Alphanumeric).unwrap();
        line.write(6, 8, "X", FieldMode::Alphanumeric).unwrap();
        assert_eq!(line.to_string(), "JOSÉ X  ");
    }

    #[test]
    fn test_decimal_scaling_and_rounding() {
        let mut line = FixedWidthLine::new(15);
        let amount = Decimal::from_str("1234.565").unwrap();
        line.write(1, 15, amount, FieldMode::Decimal(2)).unwrap();
        assert_eq!(line.to_string(), "000000000123457");

        let negative = Decimal::from_str("-0.01").unwrap();
        assert!(line.write(1, 15, negative, FieldMode::Decimal(2)).is_err());
    }

    #[test]
    fn test_decimal_scaling_overflow_is_an_error() {
        let mut line = FixedWidthLine::new(15);
        let err = line.write(1, 15, Decimal::MAX, FieldMode::Decimal(2)).unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
        assert_eq!(line.to_string(), " ".repeat(15));
    }

    #[test]
    fn test_date_field() {
        let mut line = FixedWidthLine::new(14);
        let date = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        line.write(1, 8, date, FieldMode::Date("%d%m%Y")).unwrap();
        line.write(9, 14, date, FieldMode::Date("%d%m%y")).unwrap();
        assert_eq!(line.to_string(), "05032026050326");

        let err = line.write(1, 6, date, FieldMode::Date("%d%m%Y")).unwrap_err();
        assert!(matches!(err, Error::ColumnRange { start: 1, end: 6, .. }));
    }

    #[test]
    fn test_range_outside_line() {
        let mut line = FixedWidthLine::new(240);
        assert!(matches!(
            line.write(230, 241, "", FieldMode::Alphanumeric),
            Err(Error::ColumnRange { .. })
        ));
        assert!(matches!(
            line.write(0, 1, "", FieldMode::Alphanumeric),
            Err(Error::ColumnRange { .. })
        ));
    }

    #[test]
    fn test_read_clips_short_lines() {
        let line = FixedWidthLine::parse("0123456789\r");
        assert_eq!(line.width(), 10);
        assert_eq!(line.read(2, 4).unwrap(), "123");
        assert_eq!(line.read(9, 12).unwrap(), "89");
        assert_eq!(line.read(20, 25).unwrap(), "");
        assert!(line.read(5, 4).is_err());
    }
}
