//! Payment slips: identity, nosso número, free field and barcode.
//!
//! The nosso número and the free field are derived from the identity fields
//! according to the bank profile. Both are computed on first use and cached;
//! every setter on [`SlipIdentity`] drops the cache.

use crate::banks::{BankProfile, Part};
use crate::check_digit::{composite, modulo10, modulo11, Modulo11Exceptions};
use crate::error::{Error, Result};
use crate::fixed_width::{pad_numeric, FieldMode, FixedWidthLine};
use crate::types::{Payer, SlipField};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use tracing::debug;

/// Width of the free field ("campo livre") inside the barcode.
pub const FREE_FIELD_WIDTH: usize = 25;

const BARCODE_WIDTH: usize = 44;

#[derive(Debug, Clone, Default)]
struct Computed {
    nosso_numero: Option<String>,
    free_field: Option<String>,
}

/// Fields identifying a slip at its bank.
#[derive(Debug, Clone)]
pub struct SlipIdentity {
    profile: &'static BankProfile,
    wallet: Option<String>,
    agency: Option<String>,
    agency_dv: Option<String>,
    account: Option<String>,
    account_dv: Option<String>,
    contract: Option<String>,
    number: Option<String>,
    installment: u32,
    computed: RefCell<Computed>,
}

impl SlipIdentity {
    /// Start an identity for `bank_code`; fails for unknown banks.
    pub fn new(bank_code: &str) -> Result<Self> {
        let profile = BankProfile::lookup(bank_code)?;
        Ok(Self::for_profile(profile))
    }

    pub fn for_profile(profile: &'static BankProfile) -> Self {
        Self {
            profile,
            wallet: None,
            agency: None,
            agency_dv: None,
            account: None,
            account_dv: None,
            contract: None,
            number: None,
            installment: 1,
            computed: RefCell::new(Computed::default()),
        }
    }

    pub fn profile(&self) -> &'static BankProfile {
        self.profile
    }

    fn invalidate(&mut self) -> &mut Self {
        *self.computed.get_mut() = Computed::default();
        self
    }

    pub fn set_wallet(&mut self, wallet: impl Into<String>) -> &mut Self {
        self.wallet = Some(wallet.into());
        self.invalidate()
    }

    pub fn set_agency(&mut self, agency: impl Into<String>) -> &mut Self {
        self.agency = Some(agency.into());
        self.invalidate()
    }

    pub fn set_agency_dv(&mut self, agency_dv: impl Into<String>) -> &mut Self {
        self.agency_dv = Some(agency_dv.into());
        self.invalidate()
    }

    pub fn set_account(&mut self, account: impl Into<String>) -> &mut Self {
        self.account = Some(account.into());
        self.invalidate()
    }

    pub fn set_account_dv(&mut self, account_dv: impl Into<String>) -> &mut Self {
        self.account_dv = Some(account_dv.into());
        self.invalidate()
    }

    /// Contract ("convênio"), 4, 6 or 7 digits depending on the bank.
    pub fn set_contract(&mut self, contract: impl Into<String>) -> &mut Self {
        self.contract = Some(contract.into());
        self.invalidate()
    }

    /// Sequential document number the nosso número is built from.
    pub fn set_number(&mut self, number: impl Into<String>) -> &mut Self {
        self.number = Some(number.into());
        self.invalidate()
    }

    pub fn set_installment(&mut self, installment: u32) -> &mut Self {
        self.installment = installment;
        self.invalidate()
    }

    pub fn get(&self, field: SlipField) -> Option<&str> {
        let value = match field {
            SlipField::Wallet => &self.wallet,
            SlipField::Agency => &self.agency,
            SlipField::AgencyDv => &self.agency_dv,
            SlipField::Account => &self.account,
            SlipField::AccountDv => &self.account_dv,
            SlipField::Contract => &self.contract,
            SlipField::Number => &self.number,
        };
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn installment(&self) -> u32 {
        self.installment
    }

    fn require(&self, field: SlipField) -> Result<&str> {
        self.get(field).ok_or_else(|| Error::MissingField {
            bank: self.profile.code.to_string(),
            field: field.name(),
        })
    }

    /// Check the bank's required fields and wallet.
    pub fn validate(&self) -> Result<()> {
        for field in self.profile.required {
            self.require(*field)?;
        }
        if let Some(wallet) = self.get(SlipField::Wallet) {
            if !self.profile.accepts_wallet(wallet) {
                return Err(Error::UnsupportedWallet {
                    bank: self.profile.code.to_string(),
                    wallet: wallet.to_string(),
                });
            }
        }
        Ok(())
    }

    fn part_value(&self, part: &Part) -> Result<(String, usize, &'static str)> {
        let field = |f: SlipField| self.require(f).map(str::to_string);
        Ok(match *part {
            Part::Wallet(w) => (field(SlipField::Wallet)?, w, "wallet"),
            Part::Agency(w) => (field(SlipField::Agency)?, w, "agency"),
            Part::Account(w) => (field(SlipField::Account)?, w, "account"),
            Part::Contract(w) => (field(SlipField::Contract)?, w, "contract"),
            Part::Number(w) => (field(SlipField::Number)?, w, "number"),
            Part::NossoNumero(w) => (self.nosso_numero()?, w, "nosso_numero"),
            Part::Installment(w) => (self.installment.to_string(), w, "installment"),
            Part::Literal(text) => (text.to_string(), text.len(), "literal"),
            Part::CheckDigits(_) => {
                return Err(Error::format("check digits", "not valid as check digit input"));
            }
        })
    }

    /// Document number followed by its bank check digit(s).
    pub fn nosso_numero(&self) -> Result<String> {
        if let Some(cached) = &self.computed.borrow().nosso_numero {
            return Ok(cached.clone());
        }
        self.validate()?;
        let rule = &self.profile.nosso_numero;
        let number = pad_numeric(self.require(SlipField::Number)?, rule.number_width, "number")?;

        let inputs = rule
            .check_over
            .iter()
            .map(|part| self.part_value(part).map(|(value, width, _)| (value, width)))
            .collect::<Result<Vec<_>>>()?;
        let pairs: Vec<(&str, usize)> = inputs.iter().map(|(v, w)| (v.as_str(), *w)).collect();
        let check = composite(&pairs, rule.algorithm)?;

        let nosso_numero = format!("{}{}", number, check);
        self.computed.borrow_mut().nosso_numero = Some(nosso_numero.clone());
        Ok(nosso_numero)
    }

    /// Nosso número as printed on the slip, check digits after a dash.
    pub fn printed_nosso_numero(&self) -> Result<String> {
        let nosso_numero = self.nosso_numero()?;
        let split = nosso_numero.len() - self.profile.nosso_numero.algorithm.digit_count();
        Ok(format!("{}-{}", &nosso_numero[..split], &nosso_numero[split..]))
    }

    /// The 25-digit free field embedded in the barcode.
    pub fn free_field(&self) -> Result<String> {
        if let Some(cached) = &self.computed.borrow().free_field {
            return Ok(cached.clone());
        }
        self.validate()?;
        let mut free_field = String::with_capacity(FREE_FIELD_WIDTH);
        for part in self.profile.free_field {
            match part {
                Part::CheckDigits(algorithm) => {
                    free_field.push_str(&algorithm.check_digits(&free_field)?);
                }
                _ => {
                    let (value, width, name) = self.part_value(part)?;
                    free_field.push_str(&pad_numeric(&value, width, name)?);
                }
            }
        }
        if free_field.len() != FREE_FIELD_WIDTH {
            return Err(Error::format(
                "free field",
                format!("bank {} composes {} digits", self.profile.code, free_field.len()),
            ));
        }
        debug!(bank = self.profile.code, %free_field, "composed free field");
        self.computed.borrow_mut().free_field = Some(free_field.clone());
        Ok(free_field)
    }
}

/// Sub-fields recovered from a free field. Values keep their zero padding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeFieldParts {
    pub wallet: Option<String>,
    pub agency: Option<String>,
    pub account: Option<String>,
    pub contract: Option<String>,
    pub number: Option<String>,
    pub nosso_numero: Option<String>,
    pub installment: Option<String>,
}

fn set_once(slot: &mut Option<String>, value: &str, name: &str) -> Result<()> {
    match slot {
        Some(existing) if existing.trim_start_matches('0') != value.trim_start_matches('0') => Err(
            Error::ParseError(format!("free field repeats {} as {} and {}", name, existing, value)),
        ),
        Some(_) => Ok(()),
        None => {
            *slot = Some(value.to_string());
            Ok(())
        }
    }
}

/// Split a free field back into its sub-fields using the bank's composition.
pub fn parse_free_field(free_field: &str, profile: &BankProfile) -> Result<FreeFieldParts> {
    if free_field.len() != FREE_FIELD_WIDTH || !free_field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidDigitInput(free_field.to_string()));
    }
    let mut parts = FreeFieldParts::default();
    let mut offset = 0;
    for part in profile.free_field {
        let width = part.width();
        let slice = free_field
            .get(offset..offset + width)
            .ok_or_else(|| Error::ParseError(format!("free field too short for bank {}", profile.code)))?;
        match part {
            Part::Wallet(_) => set_once(&mut parts.wallet, slice, "wallet")?,
            Part::Agency(_) => set_once(&mut parts.agency, slice, "agency")?,
            Part::Account(_) => set_once(&mut parts.account, slice, "account")?,
            Part::Contract(_) => set_once(&mut parts.contract, slice, "contract")?,
            Part::Number(_) => set_once(&mut parts.number, slice, "number")?,
            Part::Installment(_) => set_once(&mut parts.installment, slice, "installment")?,
            Part::NossoNumero(_) => {
                let rule = &profile.nosso_numero;
                let start = width.checked_sub(rule.width()).ok_or_else(|| {
                    Error::ParseError(format!("nosso numero does not fit the free field of bank {}", profile.code))
                })?;
                let digits = rule.algorithm.digit_count();
                set_once(&mut parts.number, &slice[start..width - digits], "number")?;
                set_once(&mut parts.nosso_numero, &slice[start..], "nosso_numero")?;
            }
            Part::Literal(text) => {
                if slice != *text {
                    return Err(Error::ParseError(format!("expected {} at position {}", text, offset + 1)));
                }
            }
            Part::CheckDigits(algorithm) => {
                if algorithm.check_digits(&free_field[..offset])? != slice {
                    return Err(Error::ParseError("free field check digits do not match".to_string()));
                }
            }
        }
        offset += width;
    }
    Ok(parts)
}

/// A payment slip ("boleto").
#[derive(Debug, Clone)]
pub struct Boleto {
    pub identity: SlipIdentity,

    pub due_date: NaiveDate,

    /// Face value.
    pub amount: Decimal,

    pub discount: Decimal,

    /// Monthly interest rate, in percent.
    pub interest_rate: Decimal,

    /// Defaults to the remessa generation date when unset.
    pub issue_date: Option<NaiveDate>,

    /// Document species abbreviation, e.g. `DM` (duplicata mercantil).
    pub species: String,

    /// Company's own reference ("seu número").
    pub control_number: String,

    pub payer: Payer,
}

impl Boleto {
    pub fn new(identity: SlipIdentity, payer: Payer, due_date: NaiveDate, amount: Decimal) -> Self {
        Self {
            identity,
            due_date,
            amount,
            discount: Decimal::ZERO,
            interest_rate: Decimal::ZERO,
            issue_date: None,
            species: "DM".to_string(),
            control_number: String::new(),
            payer,
        }
    }

    pub fn profile(&self) -> &'static BankProfile {
        self.identity.profile()
    }

    /// Daily interest: amount × monthly rate / 100 / 30.
    pub fn interest_per_day(&self) -> Result<Decimal> {
        self.amount
            .checked_mul(self.interest_rate)
            .and_then(|v| v.checked_div(Decimal::from(3000)))
            .ok_or_else(|| Error::format("interest per day", "amount out of range"))
    }

    /// Due date factor: days since 1997-10-07, wrapping from 9999 back to 1000.
    pub fn due_date_factor(&self) -> Result<u32> {
        let base = NaiveDate::from_ymd_opt(1997, 10, 7)
            .ok_or_else(|| Error::InvalidDate("1997-10-07".to_string()))?;
        let days = (self.due_date - base).num_days();
        if days < 1000 {
            return Err(Error::InvalidDate(format!(
                "due date {} is before the factor range",
                self.due_date
            )));
        }
        Ok(((days - 1000) % 9000 + 1000) as u32)
    }

    /// The 44-digit barcode.
    pub fn barcode(&self) -> Result<String> {
        let mut line = FixedWidthLine::new(BARCODE_WIDTH);
        line.write(1, 3, self.profile().code, FieldMode::Numeric)?;
        line.write(4, 4, "9", FieldMode::Numeric)?;
        line.write(6, 9, u64::from(self.due_date_factor()?), FieldMode::Numeric)?;
        line.write(10, 19, self.amount, FieldMode::Decimal(2))?;
        line.write(20, 44, self.identity.free_field()?, FieldMode::Numeric)?;

        let text = line.to_string();
        let body = format!("{}{}", &text[..4], &text[5..]);
        let dv = modulo11(&body, 9, Modulo11Exceptions::new(1, 1))?;
        line.write(5, 5, u64::from(dv), FieldMode::Numeric)?;
        Ok(line.to_string())
    }

    /// The typeable line printed above the barcode.
    pub fn digitable_line(&self) -> Result<String> {
        let barcode = self.barcode()?;
        let field1 = format!("{}{}", &barcode[0..4], &barcode[19..24]);
        let field2 = &barcode[24..34];
        let field3 = &barcode[34..44];
        let with_dv = |f: &str| -> Result<String> { Ok(format!("{}{}", f, modulo10(f)?)) };
        let (f1, f2, f3) = (with_dv(&field1)?, with_dv(field2)?, with_dv(field3)?);
        Ok(format!(
            "{}.{} {}.{} {}.{} {} {}",
            &f1[..5],
            &f1[5..],
            &f2[..5],
            &f2[5..],
            &f3[..5],
            &f3[5..],
            &barcode[4..5],
            &barcode[5..19]
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banks::{BANCOOB, BANRISUL};
    use std::str::FromStr;

    fn bancoob_identity() -> SlipIdentity {
        let mut identity = SlipIdentity::new("756").unwrap();
        identity
            .set_wallet("1")
            .set_agency("1234")
            .set_account("56789")
            .set_account_dv("0")
            .set_contract("123456")
            .set_number("00000001");
        identity
    }

    fn bancoob_boleto() -> Boleto {
        Boleto::new(
            bancoob_identity(),
            Payer::default(),
            NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
            Decimal::from_str("150.00").unwrap(),
        )
    }

    #[test]
    fn test_bancoob_nosso_numero_and_free_field() {
        let identity = bancoob_identity();
        assert_eq!(identity.nosso_numero().unwrap(), "00000018");
        assert_eq!(identity.printed_nosso_numero().unwrap(), "0000001-8");
        assert_eq!(identity.free_field().unwrap(), "1123401012345600000018001");
    }

    #[test]
    fn test_banrisul_free_field() {
        let mut identity = SlipIdentity::new("41").unwrap();
        identity
            .set_wallet("1")
            .set_agency("1234")
            .set_contract("123456")
            .set_number("1");
        assert_eq!(identity.nosso_numero().unwrap(), "0000000183");
        assert_eq!(identity.free_field().unwrap(), "2112340123456000000014010");
    }

    #[test]
    fn test_cache_is_dropped_on_change() {
        let mut identity = bancoob_identity();
        let before = identity.free_field().unwrap();
        identity.set_contract("654321");
        let after = identity.free_field().unwrap();
        assert_ne!(before, after);

        let mut fresh = bancoob_identity();
        fresh.set_contract("654321");
        assert_eq!(after, fresh.free_field().unwrap());
        assert_eq!(identity.nosso_numero().unwrap(), fresh.nosso_numero().unwrap());
    }

    #[test]
    fn test_contract_width_boundary() {
        let mut identity = bancoob_identity();
        identity.set_contract("1234567");
        assert_eq!(&identity.free_field().unwrap()[7..14], "1234567");

        identity.set_contract("12345678");
        assert!(matches!(identity.free_field(), Err(Error::Format { .. })));
    }

    #[test]
    fn test_missing_and_invalid_fields() {
        let mut identity = SlipIdentity::new("756").unwrap();
        identity.set_wallet("1").set_agency("1234").set_account("1").set_number("1");
        assert!(matches!(
            identity.free_field(),
            Err(Error::MissingField { field: "contract", .. })
        ));

        identity.set_contract("123456").set_wallet("2");
        assert!(matches!(identity.nosso_numero(), Err(Error::UnsupportedWallet { .. })));
    }

    #[test]
    fn test_free_field_round_trip() {
        let identity = bancoob_identity();
        let parts = parse_free_field(&identity.free_field().unwrap(), &BANCOOB).unwrap();
        assert_eq!(parts.wallet.as_deref(), Some("1"));
        assert_eq!(parts.agency.as_deref(), Some("1234"));
        assert_eq!(parts.contract.as_deref(), Some("0123456"));
        assert_eq!(parts.number.as_deref(), Some("0000001"));
        assert_eq!(parts.nosso_numero.as_deref(), Some("00000018"));
        assert_eq!(parts.installment.as_deref(), Some("001"));

        let parts = parse_free_field("2112340123456000000014010", &BANRISUL).unwrap();
        assert_eq!(parts.number.as_deref(), Some("00000001"));
        assert!(parse_free_field("2112340123456000000014011", &BANRISUL).is_err());
        assert!(parse_free_field("1123401", &BANCOOB).is_err());
    }

    #[test]
    fn test_due_date_factor() {
        let mut boleto = bancoob_boleto();
        boleto.due_date = NaiveDate::from_ymd_opt(2000, 7, 3).unwrap();
        assert_eq!(boleto.due_date_factor().unwrap(), 1000);
        boleto.due_date = NaiveDate::from_ymd_opt(2025, 2, 21).unwrap();
        assert_eq!(boleto.due_date_factor().unwrap(), 9999);
        boleto.due_date = NaiveDate::from_ymd_opt(2025, 2, 22).unwrap();
        assert_eq!(boleto.due_date_factor().unwrap(), 1000);
    }

    #[test]
    fn test_barcode_and_digitable_line() {
        let boleto = bancoob_boleto();
        assert_eq!(
            boleto.barcode().unwrap(),
            "75693138600000150001123401012345600000018001"
        );
        assert_eq!(
            boleto.digitable_line().unwrap(),
            "75691.12340 01012.345607 00000.180018 3 13860000015000"
        );
    }

    #[test]
    fn test_interest_per_day() {
        let mut boleto = bancoob_boleto();
        boleto.interest_rate = Decimal::from_str("2").unwrap();
        assert_eq!(boleto.interest_per_day().unwrap(), Decimal::from_str("0.1").unwrap());

        boleto.amount = Decimal::MAX;
        assert!(matches!(boleto.interest_per_day(), Err(Error::Format { .. })));
    }

    #[test]
    fn test_oversized_amount_is_an_error() {
        let mut boleto = bancoob_boleto();
        boleto.amount = Decimal::MAX;
        assert!(matches!(boleto.barcode(), Err(Error::Format { .. })));
        assert!(boleto.digitable_line().is_err());
    }
}
