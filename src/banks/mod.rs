//! Bank profiles.
//!
//! Everything that differs between banks lives here as data: wallets,
//! species codes, required fields, nosso número and free field composition,
//! and record layouts. Adding a bank means adding a profile to [`BANKS`].

mod bancoob;
mod banrisul;

use crate::check_digit::Algorithm;
use crate::error::{Error, Result};
use crate::layout::{RemessaLayout, RetornoLayout};
use crate::retorno::RetornoFile;
use crate::types::{OccurrenceKind, SlipField};
use crate::Layout;

pub use bancoob::BANCOOB;
pub use banrisul::BANRISUL;

/// All supported banks.
pub static BANKS: &[&BankProfile] = &[&BANCOOB, &BANRISUL];

/// A fixed-width piece of a composed identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    Wallet(usize),
    Agency(usize),
    Account(usize),
    Contract(usize),
    /// Document number without check digit.
    Number(usize),
    /// Document number followed by its check digit(s).
    NossoNumero(usize),
    Installment(usize),
    Literal(&'static str),
    /// Check digit(s) over everything composed before it.
    CheckDigits(Algorithm),
}

impl Part {
    pub fn width(&self) -> usize {
        match *self {
            Part::Wallet(w)
            | Part::Agency(w)
            | Part::Account(w)
            | Part::Contract(w)
            | Part::Number(w)
            | Part::NossoNumero(w)
            | Part::Installment(w) => w,
            Part::Literal(text) => text.len(),
            Part::CheckDigits(algorithm) => algorithm.digit_count(),
        }
    }
}

/// How the nosso número is formed: the document number, zero-padded to
/// `number_width`, followed by check digits over `check_over`.
#[derive(Debug, Clone, Copy)]
pub struct NossoNumeroRule {
    pub number_width: usize,
    pub check_over: &'static [Part],
    pub algorithm: Algorithm,
}

impl NossoNumeroRule {
    pub fn width(&self) -> usize {
        self.number_width + self.algorithm.digit_count()
    }
}

/// Static configuration of one bank.
#[derive(Debug)]
pub struct BankProfile {
    pub code: &'static str,
    pub name: &'static str,
    pub wallets: &'static [&'static str],
    /// Document species abbreviation to remessa code.
    pub species: &'static [(&'static str, &'static str)],
    pub required: &'static [SlipField],
    pub nosso_numero: NossoNumeroRule,
    /// Free field composition; widths add up to 25.
    pub free_field: &'static [Part],
    /// Used when the agency check digit is not given.
    pub agency_check: Option<Algorithm>,
    pub remessa: &'static [RemessaLayout],
    pub retorno: &'static [RetornoLayout],
    pub occurrences: &'static [(&'static str, OccurrenceKind)],
    /// Post-pass over a parsed retorno file.
    pub retorno_finalize: Option<fn(&mut RetornoFile)>,
}

impl BankProfile {
    /// Find the profile for a bank code. `"41"` and `"041"` are the same bank.
    pub fn lookup(code: &str) -> Result<&'static BankProfile> {
        let code = code.trim();
        let normalized = format!("{:0>3}", code);
        BANKS
            .iter()
            .copied()
            .find(|bank| bank.code == normalized)
            .ok_or_else(|| Error::UnsupportedBank(code.to_string()))
    }

    pub fn accepts_wallet(&self, wallet: &str) -> bool {
        let wallet = wallet.trim_start_matches('0');
        self.wallets.iter().any(|w| w.trim_start_matches('0') == wallet)
    }

    /// Remessa code for a document species such as `"DM"`.
    pub fn species_code(&self, species: &str) -> Result<&'static str> {
        self.species
            .iter()
            .find(|(abbr, _)| abbr.eq_ignore_ascii_case(species.trim()))
            .map(|(_, code)| *code)
            .ok_or_else(|| Error::UnknownSpecies {
                bank: self.code.to_string(),
                species: species.to_string(),
            })
    }

    pub fn remessa_layout(&self, layout: Layout) -> Result<&'static RemessaLayout> {
        self.remessa
            .iter()
            .find(|l| l.layout == layout)
            .ok_or_else(|| Error::UnsupportedLayout {
                bank: self.code.to_string(),
                layout: layout.width(),
                kind: "remessa",
            })
    }

    pub fn retorno_layout(&self, layout: Layout) -> Result<&'static RetornoLayout> {
        self.retorno
            .iter()
            .find(|l| l.layout == layout)
            .ok_or_else(|| Error::UnsupportedLayout {
                bank: self.code.to_string(),
                layout: layout.width(),
                kind: "retorno",
            })
    }

    pub fn occurrence(&self, code: &str) -> OccurrenceKind {
        self.occurrences
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, kind)| *kind)
            .unwrap_or(OccurrenceKind::Other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::RecordLayout;

    fn assert_covers(record: &RecordLayout, width: usize) {
        let mut owner = vec![0usize; width + 1];
        for (i, column) in record.columns.iter().enumerate() {
            assert!(
                column.start >= 1 && column.start <= column.end && column.end <= width,
                "{}: bad range {}-{}",
                record.name,
                column.start,
                column.end
            );
            for c in column.start..=column.end {
                assert_eq!(owner[c], 0, "{}: column {} assigned twice", record.name, c);
                owner[c] = i + 1;
            }
        }
        for (c, o) in owner.iter().enumerate().skip(1) {
            assert_ne!(*o, 0, "{}: column {} unassigned", record.name, c);
        }
    }

    #[test]
    fn test_remessa_layouts_cover_every_column() {
        for bank in BANKS {
            for remessa in bank.remessa {
                let width = remessa.layout.width();
                assert_covers(&remessa.header, width);
                assert_covers(&remessa.trailer, width);
                for record in remessa.batch_header.iter().chain(remessa.batch_trailer.iter()) {
                    assert_covers(record, width);
                }
                for segment in remessa.segments {
                    assert_covers(segment, width);
                }
            }
        }
    }

    #[test]
    fn test_retorno_fields_fit_the_line() {
        for bank in BANKS {
            for retorno in bank.retorno {
                let width = retorno.layout.width();
                let all = retorno
                    .header
                    .iter()
                    .chain(retorno.batch_header)
                    .chain(retorno.batch_trailer)
                    .chain(retorno.trailer)
                    .chain(retorno.segments.iter().flat_map(|s| s.fields.iter()));
                for spec in all {
                    assert!(spec.start >= 1 && spec.start <= spec.end && spec.end <= width, "{}", spec.name);
                }
            }
        }
    }

    #[test]
    fn test_free_fields_are_25_digits() {
        for bank in BANKS {
            let width: usize = bank.free_field.iter().map(Part::width).sum();
            assert_eq!(width, 25, "bank {}", bank.code);
        }
    }

    #[test]
    fn test_nosso_numero_fits_its_free_field_slot() {
        for bank in BANKS {
            for part in bank.free_field {
                if let Part::NossoNumero(width) = part {
                    assert!(*width >= bank.nosso_numero.width(), "bank {}", bank.code);
                }
            }
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(BankProfile::lookup("756").unwrap().code, "756");
        assert_eq!(BankProfile::lookup("41").unwrap().code, "041");
        assert!(matches!(BankProfile::lookup("999"), Err(Error::UnsupportedBank(_))));
    }

    #[test]
    fn test_species_and_wallets() {
        assert_eq!(BANCOOB.species_code("dm").unwrap(), "01");
        assert!(BANCOOB.species_code("XX").is_err());
        assert!(BANCOOB.accepts_wallet("01"));
        assert!(!BANCOOB.accepts_wallet("2"));
    }
}
