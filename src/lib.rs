//! Boleto CNAB Library
//!
//! A library for issuing Brazilian payment slips ("boletos") and exchanging
//! CNAB files with banks.
//!
//! # Supported Layouts
//!
//! - **CNAB 240**: batch-wrapped files with P/Q/R/S remessa segments and
//!   T/U retorno segments
//! - **CNAB 400**: one detail line per slip
//!
//! # Features
//!
//! - Compose nosso número, free field, barcode and digitable line per bank
//! - Build remessa (company to bank) files from slips
//! - Parse retorno (bank to company) files and export them as JSON or CSV
//! - Use standard `Read` and `Write` traits for flexibility
//!
//! # Examples
//!
//! ## Composing a slip
//!
//! ```
//! use boleto_cnab::boleto::SlipIdentity;
//!
//! let mut identity = SlipIdentity::new("756")?;
//! identity
//!     .set_wallet("1")
//!     .set_agency("1234")
//!     .set_account("56789")
//!     .set_contract("123456")
//!     .set_number("1");
//! assert_eq!(identity.free_field()?, "1123401012345600000018001");
//! # Ok::<(), boleto_cnab::Error>(())
//! ```
//!
//! ## Parsing a retorno file
//!
//! ```no_run
//! use std::fs::File;
//! use boleto_cnab::retorno::Retorno;
//!
//! let mut file = File::open("retorno.ret")?;
//! let mut retorno = Retorno::from_read(&mut file)?;
//! let parsed = retorno.process()?;
//! println!("{} details from {}", parsed.details.len(), parsed.bank_name);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod banks;
pub mod boleto;
pub mod check_digit;
pub mod error;
pub mod fixed_width;
pub mod layout;
pub mod remessa;
pub mod retorno;
pub mod slip_csv;
pub mod types;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use banks::BankProfile;
pub use boleto::{Boleto, SlipIdentity};
pub use error::{Error, Result};
pub use remessa::{Remessa, RemessaFile, RemessaSettings};
pub use retorno::{Retorno, RetornoFile};
pub use types::{Beneficiary, OccurrenceKind, Payer};

/// CNAB line layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layout {
    /// 240-column records with batches and segments
    Cnab240,
    /// 400-column records
    Cnab400,
}

impl FromStr for Layout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "240" | "cnab240" | "cnab-240" => Ok(Layout::Cnab240),
            "400" | "cnab400" | "cnab-400" => Ok(Layout::Cnab400),
            _ => Err(Error::InvalidFormat(s.to_string())),
        }
    }
}

impl Layout {
    /// Characters per line.
    pub fn width(&self) -> usize {
        match self {
            Layout::Cnab240 => 240,
            Layout::Cnab400 => 400,
        }
    }

    /// Layout whose lines are `width` characters long.
    pub fn from_width(width: usize) -> Option<Self> {
        match width {
            240 => Some(Layout::Cnab240),
            400 => Some(Layout::Cnab400),
            _ => None,
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CNAB {}", self.width())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_from_str() {
        assert_eq!("240".parse::<Layout>().unwrap(), Layout::Cnab240);
        assert_eq!("CNAB400".parse::<Layout>().unwrap(), Layout::Cnab400);
        assert!("300".parse::<Layout>().is_err());
    }

    #[test]
    fn test_layout_width() {
        assert_eq!(Layout::Cnab240.width(), 240);
        assert_eq!(Layout::Cnab400.width(), 400);
        assert_eq!(Layout::from_width(400), Some(Layout::Cnab400));
        assert_eq!(Layout::from_width(399), None);
        assert_eq!(Layout::Cnab240.to_string(), "CNAB 240");
    }
}
