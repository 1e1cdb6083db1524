//! CNAB Remessa - CLI tool for building remessa files from CSV slip sheets.

use boleto_cnab::{
    slip_csv::SlipCsv, Beneficiary, Layout, Remessa, RemessaSettings, Result,
};
use clap::Parser;
use std::fs::File;
use std::io::{self, Read, Write};
use tracing::info;

#[derive(Parser)]
#[command(name = "cnab_remessa")]
#[command(about = "Build a CNAB remessa file from a CSV slip sheet", long_about = None)]
struct Cli {
    /// Input CSV file path (or stdin if not provided)
    #[arg(short, long)]
    input: Option<String>,

    /// Output remessa file path (or stdout if not provided)
    #[arg(short, long)]
    output: Option<String>,

    /// Bank code (756, 041)
    #[arg(long)]
    bank: String,

    /// Line layout (240, 400)
    #[arg(long, default_value = "240")]
    layout: String,

    /// Agency number
    #[arg(long)]
    agency: String,

    /// Agency check digit (computed when the bank defines one)
    #[arg(long = "agency-dv")]
    agency_dv: Option<String>,

    /// Account number
    #[arg(long)]
    account: String,

    /// Account check digit
    #[arg(long = "account-dv")]
    account_dv: Option<String>,

    /// Contract ("convênio") number
    #[arg(long)]
    contract: String,

    /// Wallet ("carteira") code
    #[arg(long, default_value = "1")]
    wallet: String,

    /// Beneficiary company name
    #[arg(long = "beneficiary-name")]
    beneficiary_name: String,

    /// Beneficiary CPF or CNPJ
    #[arg(long = "beneficiary-document")]
    beneficiary_document: String,

    /// Sequential number of this file at the bank
    #[arg(long = "file-sequence", default_value_t = 1)]
    file_sequence: u64,

    /// Also write a CSV listing with nosso número, barcode and digitable line
    #[arg(long)]
    listing: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let layout = cli.layout.parse::<Layout>()?;
    let settings = RemessaSettings {
        beneficiary: Beneficiary::new(cli.beneficiary_name, cli.beneficiary_document),
        agency: cli.agency,
        agency_dv: cli.agency_dv,
        account: cli.account,
        account_dv: cli.account_dv,
        contract: cli.contract,
        wallet: cli.wallet,
        file_sequence: cli.file_sequence,
        generated_at: chrono::Local::now().naive_local(),
    };

    // Load slips from input file or stdin
    let sheet = if let Some(ref input_path) = cli.input {
        let mut file = File::open(input_path)?;
        load_slips(&mut file, &cli.bank, &settings)?
    } else {
        let mut stdin = io::stdin();
        load_slips(&mut stdin, &cli.bank, &settings)?
    };

    let mut remessa = Remessa::new(&cli.bank, layout, settings)?;
    for boleto in &sheet.boletos {
        remessa.add_boleto(boleto)?;
    }
    let file = remessa.finalize()?;
    info!(slips = sheet.boletos.len(), "remessa built");

    // Output to file or stdout
    if let Some(ref output_path) = cli.output {
        let mut output = File::create(output_path)?;
        file.write_to(&mut output)?;
    } else {
        let mut stdout = io::stdout();
        file.write_to(&mut stdout)?;
    }

    if let Some(ref listing_path) = cli.listing {
        let mut listing = File::create(listing_path)?;
        sheet.write_to(&mut listing)?;
        listing.flush()?;
    }

    Ok(())
}

fn load_slips<R: Read>(reader: &mut R, bank: &str, settings: &RemessaSettings) -> Result<SlipCsv> {
    SlipCsv::from_read(reader, bank, settings)
}
