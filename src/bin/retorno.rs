//! CNAB Retorno - CLI tool for reading retorno files into JSON or CSV.

use boleto_cnab::{Error, Layout, Result, Retorno, RetornoFile};
use clap::Parser;
use std::fs::File;
use std::io::{self, Read, Write};

#[derive(Parser)]
#[command(name = "cnab_retorno")]
#[command(about = "Parse a CNAB retorno file and export it (JSON, CSV)", long_about = None)]
struct Cli {
    /// Input retorno file path (or stdin if not provided)
    #[arg(short, long)]
    input: Option<String>,

    /// Output file path (or stdout if not provided)
    #[arg(short, long)]
    output: Option<String>,

    /// Output format (json, csv)
    #[arg(long = "output-format", default_value = "json")]
    output_format: String,

    /// Bank code; detected from the file header when omitted
    #[arg(long)]
    bank: Option<String>,

    /// Line layout (240, 400); detected from the line width when omitted
    #[arg(long)]
    layout: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Export {
    Json,
    Csv,
}

impl std::str::FromStr for Export {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Export::Json),
            "csv" => Ok(Export::Csv),
            _ => Err(Error::InvalidFormat(s.to_string())),
        }
    }
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

    let export = cli.output_format.parse::<Export>()?;

    // Read input file or stdin
    let content = if let Some(ref input_path) = cli.input {
        let mut file = File::open(input_path)?;
        read_content(&mut file)?
    } else {
        let mut stdin = io::stdin();
        read_content(&mut stdin)?
    };

    let mut retorno = match (cli.bank.as_deref(), cli.layout.as_deref()) {
        (Some(bank), Some(layout)) => Retorno::new(bank, layout.parse::<Layout>()?, &content)?,
        (None, None) => Retorno::detect(&content)?,
        _ => {
            return Err(Error::InvalidFormat(
                "--bank and --layout must be given together".to_string(),
            ))
        }
    };
    let file = retorno.process()?;

    for warning in &file.warnings {
        eprintln!("Warning: {}", warning);
    }

    // Output to file or stdout
    if let Some(ref output_path) = cli.output {
        let mut output = File::create(output_path)?;
        write_output(&mut output, file, export)?;
    } else {
        let mut stdout = io::stdout();
        write_output(&mut stdout, file, export)?;
    }

    Ok(())
}

fn read_content<R: Read>(reader: &mut R) -> Result<String> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_output<W: Write>(writer: &mut W, file: &RetornoFile, export: Export) -> Result<()> {
    match export {
        Export::Json => file.write_json(writer)?,
        Export::Csv => file.write_csv(writer)?,
    }
    writer.flush()?;
    Ok(())
}
