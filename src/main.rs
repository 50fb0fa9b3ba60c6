use std::{io::Write, path::PathBuf};

use anyhow::{bail, Context, Result};

use x86text::{format_integer, opcode_bytes, IntegerValue, LabelMap};

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log verbosity; repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    action: Action,
}

#[derive(clap::Subcommand, Debug)]
enum Action {
    /// Format an integer literal the way operands print it
    Imm {
        /// Raw value, hex with 0x prefix or decimal
        #[arg(value_parser = parse_u64)]
        value: u64,
        /// Declared width in bits
        #[arg(short, long, default_value_t = 32)]
        bits: u32,
        /// Label file of `<address> <name>` lines
        #[arg(short, long)]
        labels: Option<PathBuf>,
    },
    /// Dump opcode bytes given as a hex string
    Bytes {
        hex: String,
        #[arg(short, long, default_value_t = 8)]
        max_bytes: usize,
    },
    /// Validate a label file and print it sorted by address
    Labels { path: PathBuf },
}

fn parse_u64(text: &str) -> Result<u64, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("invalid value {:?}: {}", text, e))
}

fn parse_hex_bytes(hex: &str) -> Result<Vec<u8>> {
    let digits: Vec<char> = hex.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        bail!("odd number of hex digits in {:?}", hex);
    }
    digits
        .chunks(2)
        .map(|pair| {
            let byte: String = pair.iter().collect();
            u8::from_str_radix(&byte, 16).with_context(|| format!("invalid hex byte {:?}", byte))
        })
        .collect()
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = <Args as clap::Parser>::parse();
    init_logging(args.verbose);

    let mut stdout = std::io::BufWriter::new(std::io::stdout());

    match args.action {
        Action::Imm {
            value,
            bits,
            labels,
        } => {
            let labels = labels
                .map(|path| {
                    LabelMap::load(&path)
                        .with_context(|| format!("failed to load labels from {}", path.display()))
                })
                .transpose()?;
            let text = format_integer(IntegerValue::new(value, bits), labels.as_ref())?;
            writeln!(stdout, "{}", text)?;
        }
        Action::Bytes { hex, max_bytes } => {
            let bytes = parse_hex_bytes(&hex)?;
            writeln!(stdout, "{}", opcode_bytes(&bytes, max_bytes))?;
        }
        Action::Labels { path } => {
            let labels = LabelMap::load(&path)
                .with_context(|| format!("failed to load labels from {}", path.display()))?;
            for (address, name) in labels.iter() {
                writeln!(stdout, "{:#x} {}", address, name)?;
            }
        }
    }
    stdout.flush()?;
    Ok(())
}
