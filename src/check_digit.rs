//! Check digit ("dígito verificador") algorithms.
//!
//! Banks combine two families: modulo 10 with alternating 2,1 weights and
//! modulo 11 with cyclic 2..N weights. Which one applies, and what the
//! modulo-11 remainders 0, 1 and 10 map to, is bank data carried by
//! [`Algorithm`].

use crate::error::{Error, Result};
use crate::fixed_width::pad_numeric;
use serde::{Deserialize, Serialize};

/// Fallback digits for the modulo-11 remainders that have no natural digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modulo11Exceptions {
    /// Digit used when the remainder is 0 or 1.
    pub low: u8,
    /// Digit used when the remainder is 10.
    pub ten: u8,
}

impl Modulo11Exceptions {
    pub const fn new(low: u8, ten: u8) -> Self {
        Self { low, ten }
    }
}

/// Check digit algorithm selected by a bank profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    Modulo10,
    Modulo11 {
        max_weight: u32,
        exceptions: Modulo11Exceptions,
    },
    /// Banrisul "NC": a modulo-10 digit followed by a modulo-11 digit.
    DoubleDigit,
}

impl Algorithm {
    /// Modulo 11 with the usual 2..9 weights.
    pub const fn modulo11(exceptions: Modulo11Exceptions) -> Self {
        Algorithm::Modulo11 {
            max_weight: 9,
            exceptions,
        }
    }

    /// Number of digits the algorithm appends.
    pub fn digit_count(&self) -> usize {
        match self {
            Algorithm::DoubleDigit => 2,
            _ => 1,
        }
    }

    /// Compute the check digit(s) for `digits`.
    pub fn check_digits(&self, digits: &str) -> Result<String> {
        match *self {
            Algorithm::Modulo10 => Ok(modulo10(digits)?.to_string()),
            Algorithm::Modulo11 {
                max_weight,
                exceptions,
            } => Ok(modulo11(digits, max_weight, exceptions)?.to_string()),
            Algorithm::DoubleDigit => {
                let (first, second) = double_digit(digits)?;
                Ok(format!("{}{}", first, second))
            }
        }
    }
}

fn parse_digits(digits: &str) -> Result<Vec<u32>> {
    if digits.is_empty() {
        return Err(Error::InvalidDigitInput(digits.to_string()));
    }
    digits
        .chars()
        .map(|c| c.to_digit(10).ok_or_else(|| Error::InvalidDigitInput(digits.to_string())))
        .collect()
}

/// Modulo 10: weights 2,1,2,1... from the right, two-digit products are
/// reduced to the sum of their digits.
pub fn modulo10(digits: &str) -> Result<u8> {
    let values = parse_digits(digits)?;
    let sum: u32 = values
        .iter()
        .rev()
        .zip([2u32, 1].iter().cycle())
        .map(|(d, w)| {
            let product = d * w;
            product / 10 + product % 10
        })
        .sum();
    Ok(((10 - sum % 10) % 10) as u8)
}

fn modulo11_remainder(values: &[u32], max_weight: u32) -> u32 {
    let mut weight = 2;
    let mut sum = 0;
    for d in values.iter().rev() {
        sum += d * weight;
        weight = if weight >= max_weight { 2 } else { weight + 1 };
    }
    sum % 11
}

/// Modulo 11 with weights cycling 2..=`max_weight` from the right.
pub fn modulo11(digits: &str, max_weight: u32, exceptions: Modulo11Exceptions) -> Result<u8> {
    let values = parse_digits(digits)?;
    Ok(match modulo11_remainder(&values, max_weight) {
        0 | 1 => exceptions.low,
        10 => exceptions.ten,
        r => (11 - r) as u8,
    })
}

/// Banrisul double digit.
///
/// The first digit is modulo 10. The second is modulo 11 (weights 2..7)
/// over the input followed by the first digit; remainder 1 is invalid and
/// bumps the first digit before retrying.
pub fn double_digit(digits: &str) -> Result<(u8, u8)> {
    let mut first = modulo10(digits)?;
    let mut values = parse_digits(digits)?;
    values.push(0);
    loop {
        if let Some(last) = values.last_mut() {
            *last = u32::from(first);
        }
        match modulo11_remainder(&values, 7) {
            1 => first = (first + 1) % 10,
            0 => return Ok((first, 0)),
            r => return Ok((first, (11 - r) as u8)),
        }
    }
}

/// Zero-pad and concatenate `(value, width)` parts, then apply `algorithm`.
///
/// The caller appends the result to whatever it identifies; nothing is
/// inserted into the parts themselves.
pub fn composite(parts: &[(&str, usize)], algorithm: Algorithm) -> Result<String> {
    let mut digits = String::new();
    for (value, width) in parts {
        digits.push_str(&pad_numeric(value, *width, "check digit input")?);
    }
    algorithm.check_digits(&digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANCOOB: Modulo11Exceptions = Modulo11Exceptions::new(0, 1);

    #[test]
    fn test_modulo10() {
        assert_eq!(modulo10("0019373700").unwrap(), 4);
        assert_eq!(modulo10("123").unwrap(), 0);
        assert_eq!(modulo10("79").unwrap(), 4);
    }

    #[test]
    fn test_modulo11_known_remainder() {
        // 1*8 + 2*7 + 3*6 + 4*5 + 5*4 + 6*3 + 7*2 = 112, 112 % 11 = 2
        let values = parse_digits("1234567").unwrap();
        assert_eq!(modulo11_remainder(&values, 9), 2);
        assert_eq!(modulo11("1234567", 9, BANCOOB).unwrap(), 9);
    }

    #[test]
    fn test_modulo11_exceptions() {
        // "0" sums to 0, "5" sums to 10 -> remainder 10, "6" -> 12 % 11 = 1
        let table = Modulo11Exceptions::new(7, 3);
        assert_eq!(modulo11("0", 9, table).unwrap(), 7);
        assert_eq!(modulo11("6", 9, table).unwrap(), 7);
        assert_eq!(modulo11("5", 9, table).unwrap(), 3);
    }

    #[test]
    fn test_weights_wrap_after_max() {
        // nine ones: weights 2..9 then 2 again -> 44 + 2 = 46, 46 % 11 = 2
        assert_eq!(modulo11("111111111", 9, BANCOOB).unwrap(), 9);
    }

    #[test]
    fn test_results_are_single_digits() {
        let samples = ["0", "9", "99999999999", "314159265358979", "1000000001", "27"];
        for s in samples {
            assert!(modulo10(s).unwrap() <= 9);
            assert!(modulo11(s, 9, BANCOOB).unwrap() <= 9);
            assert!(modulo11(s, 7, Modulo11Exceptions::new(1, 0)).unwrap() <= 9);
        }
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(modulo10("12a4"), Err(Error::InvalidDigitInput(_))));
        assert!(matches!(modulo11("", 9, BANCOOB), Err(Error::InvalidDigitInput(_))));
        assert!(matches!(double_digit("12 3"), Err(Error::InvalidDigitInput(_))));
    }

    #[test]
    fn test_double_digit() {
        assert_eq!(double_digit("00009194").unwrap(), (3, 8));
        assert_eq!(Algorithm::DoubleDigit.check_digits("00000001").unwrap(), "83");
    }

    #[test]
    fn test_composite_appends_one_digit() {
        let algorithm = Algorithm::modulo11(BANCOOB);
        let dv = composite(&[("1234", 4), ("123456", 10), ("1", 7)], algorithm).unwrap();
        assert_eq!(dv, "8");
        assert!(composite(&[("12345", 4)], algorithm).is_err());
    }
}
