//! Common types shared by slips, remessa and retorno files.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Company issuing the slips (the "beneficiário").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beneficiary {
    /// Company or person name.
    pub name: String,

    /// CPF or CNPJ, punctuation allowed.
    pub document: String,
}

impl Beneficiary {
    pub fn new(name: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            document: document.into(),
        }
    }

    /// Document digits only.
    pub fn document_digits(&self) -> String {
        only_digits(&self.document)
    }

    /// Registration kind used in headers: 2 for CNPJ, 1 for CPF.
    pub fn kind(&self) -> u64 {
        person_kind(&self.document)
    }
}

/// Person or company paying a slip (the "pagador").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payer {
    pub name: String,
    pub document: String,
    pub address: String,
    pub district: String,
    /// Brazilian CEP, `12345-678` or `12345678`.
    pub postal_code: String,
    pub city: String,
    /// Two-letter state code.
    pub state: String,
}

impl Payer {
    /// Document digits only.
    pub fn document_digits(&self) -> String {
        only_digits(&self.document)
    }

    /// Registration kind: 2 for CNPJ, 1 for CPF.
    pub fn kind(&self) -> u64 {
        person_kind(&self.document)
    }

    /// First five digits of the postal code.
    pub fn postal_prefix(&self) -> String {
        only_digits(&self.postal_code).chars().take(5).collect()
    }

    /// Last three digits of the postal code.
    pub fn postal_suffix(&self) -> String {
        only_digits(&self.postal_code).chars().skip(5).take(3).collect()
    }
}

/// Slip identity fields a bank may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlipField {
    Wallet,
    Agency,
    AgencyDv,
    Account,
    AccountDv,
    Contract,
    Number,
}

impl SlipField {
    pub fn name(&self) -> &'static str {
        match self {
            SlipField::Wallet => "wallet",
            SlipField::Agency => "agency",
            SlipField::AgencyDv => "agency_dv",
            SlipField::Account => "account",
            SlipField::AccountDv => "account_dv",
            SlipField::Contract => "contract",
            SlipField::Number => "number",
        }
    }
}

impl fmt::Display for SlipField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a retorno occurrence code means for the slip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OccurrenceKind {
    /// Registration confirmed.
    Entered,
    /// Slip paid.
    Paid,
    /// Slip written off without payment.
    WrittenOff,
    /// Instruction rejected by the bank.
    Rejected,
    /// Data changed (due date, amount, payer).
    Changed,
    /// Sent to or withdrawn from protest.
    Protest,
    /// Any other movement.
    Other,
}

pub(crate) fn only_digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn person_kind(document: &str) -> u64 {
    if only_digits(document).len() == 14 {
        2
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_kind() {
        assert_eq!(Beneficiary::new("ACME", "12.345.678/0001-90").kind(), 2);
        assert_eq!(Beneficiary::new("JOSE", "123.456.789-09").kind(), 1);
    }

    #[test]
    fn test_postal_code_split() {
        let payer = Payer {
            postal_code: "01310-100".into(),
            ..Payer::default()
        };
        assert_eq!(payer.postal_prefix(), "01310");
        assert_eq!(payer.postal_suffix(), "100");
    }
}
