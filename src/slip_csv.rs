//! CSV slip sheets.
//!
//! Reads the slips of a remessa from a spreadsheet export and writes back a
//! listing with the computed nosso número, barcode and digitable line.

use crate::boleto::{Boleto, SlipIdentity};
use crate::error::{Error, Result};
use crate::remessa::RemessaSettings;
use crate::types::{Payer, SlipField};
use chrono::NaiveDate;
use csv::{Reader, Writer};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::str::FromStr;

/// Slips loaded from a CSV sheet.
#[derive(Debug, Clone)]
pub struct SlipCsv {
    pub boletos: Vec<Boleto>,
}

/// CSV slip row structure.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "numero", alias = "Número", alias = "number")]
    number: String,
    #[serde(rename = "vencimento", alias = "Vencimento", alias = "due_date")]
    due_date: String,
    #[serde(rename = "valor", alias = "Valor", alias = "amount")]
    amount: String,
    #[serde(rename = "desconto", alias = "discount", default)]
    discount: String,
    #[serde(rename = "juros", alias = "interest_rate", default)]
    interest_rate: String,
    #[serde(rename = "emissao", alias = "issue_date", default)]
    issue_date: String,
    #[serde(rename = "especie", alias = "species", default)]
    species: String,
    #[serde(rename = "seu_numero", alias = "control_number", default)]
    control_number: String,
    #[serde(rename = "parcela", alias = "installment", default)]
    installment: String,
    #[serde(rename = "pagador", alias = "Pagador", alias = "payer_name", default)]
    payer_name: String,
    #[serde(rename = "documento", alias = "cpf_cnpj", alias = "payer_document", default)]
    payer_document: String,
    #[serde(rename = "endereco", alias = "address", default)]
    address: String,
    #[serde(rename = "bairro", alias = "district", default)]
    district: String,
    #[serde(rename = "cep", alias = "CEP", alias = "postal_code", default)]
    postal_code: String,
    #[serde(rename = "cidade", alias = "city", default)]
    city: String,
    #[serde(rename = "uf", alias = "UF", alias = "state", default)]
    state: String,
}

/// Listing row written by [`SlipCsv::write_to`].
#[derive(Debug, Serialize)]
struct ListingRecord {
    number: String,
    nosso_numero: String,
    due_date: String,
    amount: String,
    payer: String,
    barcode: String,
    digitable_line: String,
}

impl SlipCsv {
    /// Parse slips from any source implementing `Read`.
    ///
    /// Wallet, agency, account and contract come from `settings`; each row
    /// carries the document number, due date, amount and payer.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::fs::File;
    /// use boleto_cnab::remessa::RemessaSettings;
    /// use boleto_cnab::slip_csv::SlipCsv;
    ///
    /// fn load(settings: &RemessaSettings) -> boleto_cnab::Result<SlipCsv> {
    ///     let mut file = File::open("slips.csv")?;
    ///     SlipCsv::from_read(&mut file, "756", settings)
    /// }
    /// ```
    pub fn from_read<R: Read>(reader: &mut R, bank_code: &str, settings: &RemessaSettings) -> Result<Self> {
        let mut template = SlipIdentity::new(bank_code)?;
        template
            .set_wallet(settings.wallet.as_str())
            .set_agency(settings.agency.as_str())
            .set_account(settings.account.as_str())
            .set_contract(settings.contract.as_str());
        if let Some(dv) = &settings.agency_dv {
            template.set_agency_dv(dv.as_str());
        }
        if let Some(dv) = &settings.account_dv {
            template.set_account_dv(dv.as_str());
        }

        let mut csv_reader = Reader::from_reader(reader);
        let mut boletos = Vec::new();

        for result in csv_reader.deserialize() {
            let record: CsvRecord = result?;

            // Skip empty rows
            if record.number.trim().is_empty() {
                continue;
            }

            let mut identity = template.clone();
            identity.set_number(record.number.trim());
            if !record.installment.trim().is_empty() {
                let installment = record
                    .installment
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| Error::ParseError(format!("invalid installment {:?}", record.installment)))?;
                identity.set_installment(installment);
            }

            let payer = Payer {
                name: record.payer_name.trim().to_string(),
                document: record.payer_document.trim().to_string(),
                address: record.address.trim().to_string(),
                district: record.district.trim().to_string(),
                postal_code: record.postal_code.trim().to_string(),
                city: record.city.trim().to_string(),
                state: record.state.trim().to_string(),
            };

            let mut boleto = Boleto::new(
                identity,
                payer,
                Self::parse_date(&record.due_date)?,
                Self::parse_amount(&record.amount)?,
            );
            if !record.discount.trim().is_empty() {
                boleto.discount = Self::parse_amount(&record.discount)?;
            }
            if !record.interest_rate.trim().is_empty() {
                boleto.interest_rate = Self::parse_amount(&record.interest_rate)?;
            }
            if !record.issue_date.trim().is_empty() {
                boleto.issue_date = Some(Self::parse_date(&record.issue_date)?);
            }
            if !record.species.trim().is_empty() {
                boleto.species = record.species.trim().to_uppercase();
            }
            boleto.control_number = record.control_number.trim().to_string();

            boletos.push(boleto);
        }

        Ok(SlipCsv { boletos })
    }

    /// Write a listing of the slips with their barcodes.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut csv_writer = Writer::from_writer(writer);

        for boleto in &self.boletos {
            let record = ListingRecord {
                number: boleto.identity.get(SlipField::Number).unwrap_or_default().to_string(),
                nosso_numero: boleto.identity.printed_nosso_numero()?,
                due_date: boleto.due_date.format("%d/%m/%Y").to_string(),
                amount: format!("{:.2}", boleto.amount),
                payer: boleto.payer.name.clone(),
                barcode: boleto.barcode()?,
                digitable_line: boleto.digitable_line()?,
            };
            csv_writer.serialize(record)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    fn parse_date(date_str: &str) -> Result<NaiveDate> {
        // Try various date formats
        let formats = ["%d/%m/%Y", "%d.%m.%Y", "%Y-%m-%d", "%d%m%Y"];

        for format in formats {
            if let Ok(date) = NaiveDate::parse_from_str(date_str.trim(), format) {
                return Ok(date);
            }
        }

        Err(Error::InvalidDate(date_str.to_string()))
    }

    fn parse_amount(amount_str: &str) -> Result<Decimal> {
        let cleaned = amount_str.trim().replace(' ', "").replace("R$", "");
        // "1.540,00" uses dots for thousands
        let cleaned = if cleaned.contains(',') {
            cleaned.replace('.', "").replace(',', ".")
        } else {
            cleaned
        };

        Decimal::from_str(&cleaned).map_err(|_| Error::InvalidAmount(amount_str.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Beneficiary;
    use chrono::Datelike;
    use pretty_assertions::assert_eq;

    fn settings() -> RemessaSettings {
        RemessaSettings {
            beneficiary: Beneficiary::new("ACME", "12345678000190"),
            agency: "1234".into(),
            agency_dv: None,
            account: "56789".into(),
            account_dv: Some("0".into()),
            contract: "123456".into(),
            wallet: "1".into(),
            file_sequence: 1,
            generated_at: NaiveDate::from_ymd_opt(2026, 3, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_parse_date() {
        let date = SlipCsv::parse_date("15/03/2026").unwrap();
        assert_eq!(date.year(), 2026);
        assert_eq!(date.month(), 3);
        assert_eq!(date.day(), 15);
        assert_eq!(SlipCsv::parse_date("2026-03-15").unwrap(), date);
        assert!(SlipCsv::parse_date("15 de março").is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(SlipCsv::parse_amount("R$ 1.540,00").unwrap().to_string(), "1540.00");
        assert_eq!(SlipCsv::parse_amount("150.5").unwrap().to_string(), "150.5");
        assert!(SlipCsv::parse_amount("abc").is_err());
    }

    #[test]
    fn test_from_read() {
        let data = "\
numero,vencimento,valor,juros,pagador,documento,cep,cidade,uf
1,15/03/2026,\"150,00\",2,MARIA DE SOUZA,123.456.789-09,90010-150,PORTO ALEGRE,RS
,,,,,,,,
2,2026-04-15,99.90,,JOAO DA SILVA,12.345.678/0001-90,01310-100,SAO PAULO,SP
";
        let sheet = SlipCsv::from_read(&mut data.as_bytes(), "756", &settings()).unwrap();
        assert_eq!(sheet.boletos.len(), 2);

        let first = &sheet.boletos[0];
        assert_eq!(first.identity.free_field().unwrap(), "1123401012345600000018001");
        assert_eq!(first.amount, Decimal::from_str("150.00").unwrap());
        assert_eq!(first.interest_rate, Decimal::from(2));
        assert_eq!(first.payer.postal_prefix(), "90010");
        assert_eq!(first.species, "DM");
        assert_eq!(sheet.boletos[1].payer.kind(), 2);
    }

    #[test]
    fn test_english_headers_and_listing() {
        let data = "number,due_date,amount,payer_name\n1,15/03/2026,150.00,MARIA\n";
        let sheet = SlipCsv::from_read(&mut data.as_bytes(), "756", &settings()).unwrap();

        let mut output = Vec::new();
        sheet.write_to(&mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        let mut rows = text.lines();
        assert_eq!(
            rows.next().unwrap(),
            "number,nosso_numero,due_date,amount,payer,barcode,digitable_line"
        );
        assert_eq!(
            rows.next().unwrap(),
            "1,0000001-8,15/03/2026,150.00,MARIA,75693138600000150001123401012345600000018001,\
             75691.12340 01012.345607 00000.180018 3 13860000015000"
        );
    }

    #[test]
    fn test_unknown_bank() {
        let data = "numero,vencimento,valor\n";
        assert!(matches!(
            SlipCsv::from_read(&mut data.as_bytes(), "001", &settings()),
            Err(Error::UnsupportedBank(_))
        ));
    }
}
