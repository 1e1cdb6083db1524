//! Remessa (company to bank) file builder.
//!
//! A [`Remessa`] writes its header when created, appends detail records as
//! slips are added and writes the trailers on [`Remessa::finalize`]. Totals
//! are accumulated per slip and only rendered into the trailers.

use crate::banks::BankProfile;
use crate::boleto::Boleto;
use crate::error::{Error, Result};
use crate::fixed_width::FieldValue;
use crate::layout::{RecordLayout, RemessaLayout, Source};
use crate::types::{only_digits, Beneficiary, SlipField};
use crate::Layout;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use tracing::{debug, info};

/// File-level data shared by every record of a remessa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemessaSettings {
    pub beneficiary: Beneficiary,
    pub agency: String,
    /// Computed by the bank's agency check when absent.
    pub agency_dv: Option<String>,
    pub account: String,
    pub account_dv: Option<String>,
    pub contract: String,
    pub wallet: String,
    /// Sequential number of this file at the bank.
    pub file_sequence: u64,
    pub generated_at: NaiveDateTime,
}

impl RemessaSettings {
    fn get(&self, field: SlipField) -> Option<&str> {
        let value = match field {
            SlipField::Agency => self.agency.as_str(),
            SlipField::Account => self.account.as_str(),
            SlipField::Contract => self.contract.as_str(),
            SlipField::Wallet => self.wallet.as_str(),
            SlipField::AgencyDv => self.agency_dv.as_deref().unwrap_or_default(),
            SlipField::AccountDv => self.account_dv.as_deref().unwrap_or_default(),
            SlipField::Number => return None,
        };
        Some(value.trim()).filter(|v| !v.is_empty())
    }
}

/// A finished remessa file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemessaFile {
    lines: Vec<String>,
    line_ending: &'static str,
    final_line_ending: &'static str,
}

impl RemessaFile {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Write the file to any destination implementing `Write`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::fs::File;
    /// use boleto_cnab::remessa::RemessaFile;
    ///
    /// fn save(file: &RemessaFile) -> boleto_cnab::Result<()> {
    ///     let mut output = File::create("CB010101.REM")?;
    ///     file.write_to(&mut output)
    /// }
    /// ```
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        write!(writer, "{}", self)?;
        writer.flush()?;
        Ok(())
    }
}

impl fmt::Display for RemessaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            f.write_str(line)?;
            if i + 1 < self.lines.len() {
                f.write_str(self.line_ending)?;
            } else {
                f.write_str(self.final_line_ending)?;
            }
        }
        Ok(())
    }
}

/// Builder for one remessa file.
#[derive(Debug)]
pub struct Remessa {
    profile: &'static BankProfile,
    layout: &'static RemessaLayout,
    settings: RemessaSettings,
    agency_dv: String,
    lines: Vec<String>,
    /// Last sequence number used. Counts every record in CNAB 400 and only
    /// detail segments in CNAB 240.
    sequence: u64,
    detail_lines: u64,
    slip_count: u64,
    total_amount: Decimal,
    file: Option<RemessaFile>,
}

impl Remessa {
    /// Start a remessa for `bank_code`, writing the file header (and the
    /// batch header for CNAB 240).
    pub fn new(bank_code: &str, layout: Layout, settings: RemessaSettings) -> Result<Self> {
        let profile = BankProfile::lookup(bank_code)?;
        let remessa_layout = profile.remessa_layout(layout)?;

        for field in profile.required {
            if *field != SlipField::Number && settings.get(*field).is_none() {
                return Err(Error::MissingField {
                    bank: profile.code.to_string(),
                    field: field.name(),
                });
            }
        }

        let agency_dv = match (settings.get(SlipField::AgencyDv), profile.agency_check) {
            (Some(dv), _) => dv.to_string(),
            (None, Some(algorithm)) => algorithm.check_digits(&only_digits(&settings.agency))?,
            (None, None) => String::new(),
        };

        let mut remessa = Self {
            profile,
            layout: remessa_layout,
            settings,
            agency_dv,
            lines: Vec::new(),
            sequence: 0,
            detail_lines: 0,
            slip_count: 0,
            total_amount: Decimal::ZERO,
            file: None,
        };

        let mut opening = vec![remessa_layout.header];
        opening.extend(remessa_layout.batch_header);
        for record in opening {
            let sequence = remessa.next_file_sequence();
            let line = remessa.render(&record, None, sequence)?;
            remessa.sequence = sequence;
            remessa.lines.push(line);
        }
        debug!(bank = profile.code, layout = %layout, "started remessa");
        Ok(remessa)
    }

    pub fn profile(&self) -> &'static BankProfile {
        self.profile
    }

    /// Lines written so far.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn slip_count(&self) -> u64 {
        self.slip_count
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    /// Append the detail records of one slip.
    ///
    /// The slip's agency, account and contract must agree with the file
    /// settings. Nothing is written unless every record of the slip renders.
    pub fn add_boleto(&mut self, boleto: &Boleto) -> Result<()> {
        if self.file.is_some() {
            return Err(Error::Finalized);
        }
        if boleto.profile().code != self.profile.code {
            return Err(Error::BankMismatch {
                expected: self.profile.code.to_string(),
                found: boleto.profile().code.to_string(),
            });
        }
        boleto.identity.validate()?;
        for field in [SlipField::Agency, SlipField::Account, SlipField::Contract] {
            if let (Some(file), Some(slip)) = (self.settings.get(field), boleto.identity.get(field)) {
                if file.trim_start_matches('0') != slip.trim_start_matches('0') {
                    return Err(Error::SlipMismatch {
                        field: field.name(),
                        file: file.to_string(),
                        slip: slip.to_string(),
                    });
                }
            }
        }
        self.profile.species_code(&boleto.species)?;

        let mut sequence = self.sequence;
        let mut rendered = Vec::with_capacity(self.layout.segments.len());
        for segment in self.layout.segments {
            sequence += 1;
            rendered.push(self.render(segment, Some(boleto), sequence)?);
        }

        debug!(
            bank = self.profile.code,
            nosso_numero = ?boleto.identity.nosso_numero().ok(),
            records = rendered.len(),
            "added slip"
        );
        self.detail_lines += rendered.len() as u64;
        self.lines.extend(rendered);
        self.sequence = sequence;
        self.slip_count += 1;
        self.total_amount += boleto.amount;
        Ok(())
    }

    /// Write the trailers and return the finished file.
    ///
    /// Calling it again returns the same file.
    pub fn finalize(&mut self) -> Result<&RemessaFile> {
        if self.file.is_none() {
            let layout = self.layout;
            let mut closing: Vec<RecordLayout> = layout.batch_trailer.into_iter().collect();
            closing.push(layout.trailer);

            let mut sequence = self.sequence;
            let mut rendered = Vec::with_capacity(closing.len());
            for record in &closing {
                sequence = self.next_sequence_after(sequence);
                rendered.push(self.render(record, None, sequence)?);
            }
            self.lines.extend(rendered);
            self.sequence = sequence;

            info!(
                bank = self.profile.code,
                slips = self.slip_count,
                total = %self.total_amount,
                lines = self.lines.len(),
                "finalized remessa"
            );
            self.file = Some(RemessaFile {
                lines: self.lines.clone(),
                line_ending: layout.line_ending,
                final_line_ending: layout.final_line_ending,
            });
        }
        self.file.as_ref().ok_or(Error::Finalized)
    }

    fn counts_every_record(&self) -> bool {
        self.layout.layout == Layout::Cnab400
    }

    fn next_file_sequence(&self) -> u64 {
        self.next_sequence_after(self.sequence)
    }

    fn next_sequence_after(&self, sequence: u64) -> u64 {
        if self.counts_every_record() {
            sequence + 1
        } else {
            sequence
        }
    }

    fn render(&self, record: &RecordLayout, slip: Option<&Boleto>, sequence: u64) -> Result<String> {
        let line = record
            .render(self.layout.layout.width(), |source| self.resolve(source, slip, sequence))
            .map_err(|e| Error::Record {
                bank: self.profile.code.to_string(),
                record: record.name,
                source: Box::new(e),
            })?;
        Ok(line.to_string())
    }

    fn resolve<'a>(&'a self, source: Source, slip: Option<&'a Boleto>, sequence: u64) -> Result<FieldValue<'a>> {
        let settings = &self.settings;
        let value = match source {
            Source::Blank => FieldValue::from(""),
            Source::Zero => FieldValue::from(0u64),
            Source::Literal(text) => text.into(),
            Source::BankCode => self.profile.code.into(),
            Source::BankName => self.profile.name.into(),
            Source::BeneficiaryKind => settings.beneficiary.kind().into(),
            Source::BeneficiaryDocument => settings.beneficiary.document_digits().into(),
            Source::BeneficiaryName => settings.beneficiary.name.as_str().into(),
            Source::Agency => settings.agency.as_str().into(),
            Source::AgencyDv => self.agency_dv.as_str().into(),
            Source::Account => settings.account.as_str().into(),
            Source::AccountDv => settings.get(SlipField::AccountDv).unwrap_or_default().into(),
            Source::Contract => settings.contract.as_str().into(),
            Source::Wallet => match slip.and_then(|s| s.identity.get(SlipField::Wallet)) {
                Some(wallet) => wallet.into(),
                None => settings.wallet.as_str().into(),
            },
            Source::FileSequence => settings.file_sequence.into(),
            Source::GeneratedDate => settings.generated_at.date().into(),
            Source::GeneratedTime => settings.generated_at.time().into(),
            Source::Sequence => sequence.into(),
            Source::SlipCount => self.slip_count.into(),
            Source::TotalAmount => self.total_amount.into(),
            Source::BatchRecordCount => (self.detail_lines + 2).into(),
            Source::FileRecordCount => {
                let closing = 1 + self.layout.batch_trailer.iter().count();
                ((self.lines.len() + closing) as u64).into()
            }
            _ => {
                let slip = slip.ok_or_else(|| {
                    Error::format(format!("{:?}", source), "slip data outside a detail record")
                })?;
                self.resolve_slip(source, slip)?
            }
        };
        Ok(value)
    }

    fn resolve_slip<'a>(&'a self, source: Source, slip: &'a Boleto) -> Result<FieldValue<'a>> {
        let payer = &slip.payer;
        Ok(match source {
            Source::NossoNumero => slip.identity.nosso_numero()?.into(),
            Source::DocumentNumber => slip.identity.get(SlipField::Number).unwrap_or_default().into(),
            Source::Installment => u64::from(slip.identity.installment()).into(),
            Source::ControlNumber => slip.control_number.as_str().into(),
            Source::DueDate => slip.due_date.into(),
            Source::IssueDate => slip
                .issue_date
                .unwrap_or_else(|| self.settings.generated_at.date())
                .into(),
            Source::Amount => slip.amount.into(),
            Source::InterestPerDay => slip.interest_per_day()?.into(),
            Source::Discount => slip.discount.into(),
            Source::SpeciesCode => self.profile.species_code(&slip.species)?.into(),
            Source::PayerKind => payer.kind().into(),
            Source::PayerDocument => payer.document_digits().into(),
            Source::PayerName => payer.name.as_str().into(),
            Source::PayerAddress => payer.address.as_str().into(),
            Source::PayerDistrict => payer.district.as_str().into(),
            Source::PayerPostalPrefix => payer.postal_prefix().into(),
            Source::PayerPostalSuffix => payer.postal_suffix().into(),
            Source::PayerCity => payer.city.as_str().into(),
            Source::PayerState => payer.state.as_str().into(),
            other => {
                return Err(Error::format(format!("{:?}", other), "not a slip field"));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boleto::SlipIdentity;
    use crate::types::Payer;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn settings() -> RemessaSettings {
        RemessaSettings {
            beneficiary: Beneficiary::new("ACME COMERCIO LTDA", "12.345.678/0001-90"),
            agency: "1234".into(),
            agency_dv: None,
            account: "56789".into(),
            account_dv: Some("0".into()),
            contract: "123456".into(),
            wallet: "1".into(),
            file_sequence: 7,
            generated_at: NaiveDate::from_ymd_opt(2026, 3, 1)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap(),
        }
    }

    fn payer() -> Payer {
        Payer {
            name: "MARIA DE SOUZA".into(),
            document: "123.456.789-09".into(),
            address: "RUA DAS FLORES 100".into(),
            district: "CENTRO".into(),
            postal_code: "90010-150".into(),
            city: "PORTO ALEGRE".into(),
            state: "RS".into(),
        }
    }

    fn boleto(bank: &str, number: &str, amount: &str) -> Boleto {
        let mut identity = SlipIdentity::new(bank).unwrap();
        identity
            .set_wallet("1")
            .set_agency("1234")
            .set_account("56789")
            .set_contract("123456")
            .set_number(number);
        let mut boleto = Boleto::new(
            identity,
            payer(),
            NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
            Decimal::from_str(amount).unwrap(),
        );
        boleto.control_number = format!("PED-{}", number);
        boleto
    }

    fn cols(line: &str, start: usize, end: usize) -> &str {
        &line[start - 1..end]
    }

    #[test]
    fn test_cnab400_two_slips() {
        let mut remessa = Remessa::new("041", Layout::Cnab400, settings()).unwrap();
        remessa.add_boleto(&boleto("041", "1", "150.00")).unwrap();
        remessa.add_boleto(&boleto("041", "2", "250.50")).unwrap();
        let file = remessa.finalize().unwrap();

        let lines = file.lines();
        assert_eq!(lines.len(), 4);
        for line in lines {
            assert_eq!(line.chars().count(), 400);
        }
        for (i, line) in lines.iter().enumerate() {
            assert_eq!(cols(line, 395, 400), format!("{:06}", i + 1));
        }
        assert_eq!(cols(&lines[0], 1, 9), "01REMESSA");
        assert_eq!(cols(&lines[1], 63, 72), "0000000183");
        assert_eq!(cols(&lines[1], 127, 139), "0000000015000");
        assert_eq!(cols(&lines[1], 121, 126), "150326");
        assert_eq!(cols(&lines[3], 28, 40), "0000000040050");
        assert_eq!(cols(&lines[3], 41, 46), "000002");
        assert!(file.to_string().ends_with("\r\n"));
    }

    #[test]
    fn test_cnab240_segments_share_batch_sequence() {
        let mut remessa = Remessa::new("756", Layout::Cnab240, settings()).unwrap();
        remessa.add_boleto(&boleto("756", "1", "150.00")).unwrap();
        remessa.add_boleto(&boleto("756", "2", "99.90")).unwrap();
        let file = remessa.finalize().unwrap();

        let lines = file.lines();
        assert_eq!(lines.len(), 12);
        for line in lines {
            assert_eq!(line.chars().count(), 240);
        }
        assert_eq!(cols(&lines[0], 58, 58), "3");
        assert_eq!(cols(&lines[0], 158, 163), "000007");

        let details = &lines[2..10];
        for (i, line) in details.iter().enumerate() {
            assert_eq!(cols(line, 8, 8), "3");
            assert_eq!(cols(line, 9, 13), format!("{:05}", i + 1));
            assert_eq!(cols(line, 14, 14), ["P", "Q", "R", "S"][i % 4]);
        }
        assert_eq!(cols(&details[0], 38, 47), "0000000018");
        assert_eq!(cols(&details[1], 129, 136), "90010150");

        let batch_trailer = &lines[10];
        assert_eq!(cols(batch_trailer, 18, 23), "000010");
        assert_eq!(cols(batch_trailer, 24, 29), "000002");
        assert_eq!(cols(batch_trailer, 30, 46), "00000000000024990");
        assert_eq!(cols(&lines[11], 24, 29), "000012");
        assert!(!file.to_string().ends_with('\n'));
    }

    #[test]
    fn test_missing_field_writes_nothing() {
        let mut remessa = Remessa::new("756", Layout::Cnab240, settings()).unwrap();
        let before = remessa.lines().len();

        let mut incomplete = boleto("756", "1", "10.00");
        incomplete.identity = SlipIdentity::new("756").unwrap();
        incomplete.identity.set_wallet("1").set_agency("1234").set_account("1").set_number("1");
        assert!(matches!(
            remessa.add_boleto(&incomplete),
            Err(Error::MissingField { field: "contract", .. })
        ));
        assert_eq!(remessa.lines().len(), before);
        assert_eq!(remessa.slip_count(), 0);
    }

    #[test]
    fn test_rendering_error_names_the_record() {
        let mut remessa = Remessa::new("041", Layout::Cnab400, settings()).unwrap();
        let negative = boleto("041", "1", "-1.00");
        match remessa.add_boleto(&negative) {
            Err(Error::Record { bank, record, .. }) => {
                assert_eq!(bank, "041");
                assert_eq!(record, "detail");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(remessa.lines().len(), 1);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut remessa = Remessa::new("041", Layout::Cnab400, settings()).unwrap();
        remessa.add_boleto(&boleto("041", "1", "1.00")).unwrap();
        let first = remessa.finalize().unwrap().clone();
        let second = remessa.finalize().unwrap().clone();
        assert_eq!(first, second);
        assert!(matches!(
            remessa.add_boleto(&boleto("041", "2", "1.00")),
            Err(Error::Finalized)
        ));
    }

    #[test]
    fn test_construction_errors() {
        assert!(matches!(
            Remessa::new("999", Layout::Cnab400, settings()),
            Err(Error::UnsupportedBank(_))
        ));
        assert!(matches!(
            Remessa::new("756", Layout::Cnab400, settings()),
            Err(Error::UnsupportedLayout { .. })
        ));
        let mut no_contract = settings();
        no_contract.contract = String::new();
        assert!(matches!(
            Remessa::new("041", Layout::Cnab400, no_contract),
            Err(Error::MissingField { field: "contract", .. })
        ));
    }

    #[test]
    fn test_slip_must_match_bank_and_species() {
        let mut remessa = Remessa::new("041", Layout::Cnab400, settings()).unwrap();
        assert!(matches!(
            remessa.add_boleto(&boleto("756", "1", "1.00")),
            Err(Error::BankMismatch { .. })
        ));
        let mut unknown = boleto("041", "1", "1.00");
        unknown.species = "XX".into();
        assert!(matches!(remessa.add_boleto(&unknown), Err(Error::UnknownSpecies { .. })));
    }

    #[test]
    fn test_slip_must_match_file_agency_and_contract() {
        let mut remessa = Remessa::new("756", Layout::Cnab240, settings()).unwrap();
        let before = remessa.lines().len();

        let mut other_agency = boleto("756", "1", "10.00");
        other_agency.identity.set_agency("4321");
        match remessa.add_boleto(&other_agency) {
            Err(Error::SlipMismatch { field, file, slip }) => {
                assert_eq!(field, "agency");
                assert_eq!(file, "1234");
                assert_eq!(slip, "4321");
            }
            other => panic!("unexpected {:?}", other),
        }

        let mut other_contract = boleto("756", "1", "10.00");
        other_contract.identity.set_contract("654321");
        assert!(matches!(
            remessa.add_boleto(&other_contract),
            Err(Error::SlipMismatch { field: "contract", .. })
        ));
        assert_eq!(remessa.lines().len(), before);
        assert_eq!(remessa.slip_count(), 0);
    }

    #[test]
    fn test_oversized_amount_is_rejected() {
        let mut remessa = Remessa::new("041", Layout::Cnab400, settings()).unwrap();
        let huge = boleto("041", "1", "79228162514264337593543950335");
        assert!(matches!(remessa.add_boleto(&huge), Err(Error::Record { .. })));
        assert_eq!(remessa.lines().len(), 1);
    }
}
