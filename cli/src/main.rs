// cli/src/main.rs — sighaxctl, text shell over the SIGHAX parser model

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use sighax_boot::{forge, key_summary, trace_block, trace_exploited, PaddingType, SignatureBlock};

mod config;
mod logging;
mod render;

use config::Config;
use render::{BlockReport, FirmwareInfo, TraceReport};

#[derive(Parser)]
#[command(
    name = "sighaxctl",
    version,
    about = "sighaxctl — SIGHAX bootROM signature-parser simulator",
    long_about = "sighaxctl builds decrypted RSA/PKCS#1 v1.5 signature blocks and replays, step by step, \
                  how a flawed bootROM parser accepts a legitimate block and is steered by a forged one."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable JSON output
    #[arg(long, global = true)]
    json: bool,

    /// TOML config file
    #[arg(long, global = true, env = "SIGHAX_CONFIG")]
    config: Option<PathBuf>,

    /// Hex dump columns per row (overrides config)
    #[arg(long, global = true, value_parser = clap::value_parser!(u16).range(1..))]
    columns: Option<u16>,

    /// Raise log verbosity (-v info, -vv debug); logs go to stderr
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Trace the parser over a correctly signed block
    Legit {
        #[command(flatten)]
        firmware: FirmwareArgs,

        /// Patch a byte of the block before tracing, e.g. 0=0x01 (repeatable)
        #[arg(long = "corrupt", value_name = "OFFSET=VALUE", value_parser = parse_patch)]
        corrupt: Vec<(usize, u8)>,
    },
    /// Forge a block for malicious firmware and trace the exploited parser
    Exploit {
        #[command(flatten)]
        firmware: FirmwareArgs,
    },
    /// Build a block and print its offsets, regions and bytes
    Block {
        #[command(flatten)]
        firmware: FirmwareArgs,

        /// Padding type: 0x01, 0x02, padded or unpadded
        #[arg(long, default_value = "padded", value_parser = parse_padding)]
        padding: PaddingType,

        /// Skip-length byte (default 0x0D)
        #[arg(long, value_parser = parse_byte)]
        skip: Option<u8>,
    },
    /// Describe every block region
    Anatomy,
    /// Describe the modeled verifier key
    Key,
}

#[derive(Args)]
struct FirmwareArgs {
    /// Firmware label (defaults to the configured label)
    #[arg(long)]
    firmware: Option<String>,

    /// Read firmware bytes from a file
    #[arg(long, value_name = "PATH", conflicts_with = "firmware")]
    firmware_file: Option<PathBuf>,
}

impl FirmwareArgs {
    fn resolve(&self, fallback: &str) -> Result<Vec<u8>, Box<dyn Error>> {
        if let Some(path) = &self.firmware_file {
            return fs::read(path)
                .map_err(|e| format!("cannot read firmware {}: {}", path.display(), e).into());
        }
        Ok(self.firmware.as_deref().unwrap_or(fallback).as_bytes().to_vec())
    }
}

/// Byte value in decimal or `0x` hex.
fn parse_byte(s: &str) -> Result<u8, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|e| format!("'{}' is not a byte value: {}", s, e))
}

fn parse_offset(s: &str) -> Result<usize, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse::<usize>(),
    };
    parsed.map_err(|e| format!("'{}' is not an offset: {}", s, e))
}

fn parse_padding(s: &str) -> Result<PaddingType, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "padded" => Ok(PaddingType::Padded),
        "unpadded" => Ok(PaddingType::Unpadded),
        other => PaddingType::try_from(parse_byte(other)?).map_err(|e| e.to_string()),
    }
}

fn parse_patch(s: &str) -> Result<(usize, u8), String> {
    let (offset, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected OFFSET=VALUE, got '{}'", s))?;
    Ok((parse_offset(offset)?, parse_byte(value)?))
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cfg = config::load(cli.config.as_deref())?;
    let json = cli.json || cfg.display.json;
    let columns = cli.columns.map(usize::from).unwrap_or(cfg.display.columns);

    let out = match &cli.command {
        Commands::Legit { firmware, corrupt } => legit(&cfg, firmware, corrupt, json, columns)?,
        Commands::Exploit { firmware } => exploit(&cfg, firmware, json, columns)?,
        Commands::Block { firmware, padding, skip } => {
            let bytes = firmware.resolve(&cfg.firmware.legit)?;
            let blk = SignatureBlock::build(&bytes, *padding, *skip);
            if json {
                render::to_json(&BlockReport {
                    firmware: FirmwareInfo::of(&bytes),
                    block: &blk,
                    regions: render::region_spans(&blk),
                })?
            } else {
                render::block_text(&blk, columns)
            }
        }
        Commands::Anatomy => {
            if json {
                render::to_json(&render::anatomy())?
            } else {
                render::anatomy_text()
            }
        }
        Commands::Key => {
            let key = key_summary();
            if json {
                render::to_json(&key)?
            } else {
                render::key_text(&key)
            }
        }
    };

    println!("{}", out.trim_end());
    Ok(())
}

fn legit(
    cfg: &Config,
    firmware: &FirmwareArgs,
    corrupt: &[(usize, u8)],
    json: bool,
    columns: usize,
) -> Result<String, Box<dyn Error>> {
    let bytes = firmware.resolve(&cfg.firmware.legit)?;
    let mut blk = SignatureBlock::build(&bytes, PaddingType::Padded, None);
    for &(offset, value) in corrupt {
        blk = blk.with_byte(offset, value)?;
        tracing::info!(offset, value, "corrupted block byte");
    }

    let steps = trace_block(&blk, &bytes);
    let result = steps.last().map(|s| s.verdict());
    if json {
        Ok(render::to_json(&TraceReport {
            firmware: FirmwareInfo::of(&bytes),
            block: &blk,
            forge: None,
            steps: &steps,
            result,
        })?)
    } else {
        let heading = if corrupt.is_empty() { "legitimate boot" } else { "legitimate boot (tampered block)" };
        Ok(render::trace_text(heading, &blk, &steps, columns))
    }
}

fn exploit(cfg: &Config, firmware: &FirmwareArgs, json: bool, columns: usize) -> Result<String, Box<dyn Error>> {
    let bytes = firmware.resolve(&cfg.firmware.evil)?;
    let (blk, info) = forge(&bytes)?;
    let steps = trace_exploited(&blk, &bytes, &info)?;
    let result = steps.last().map(|s| s.verdict());
    if json {
        Ok(render::to_json(&TraceReport {
            firmware: FirmwareInfo::of(&bytes),
            block: &blk,
            forge: Some(&info),
            steps: &steps,
            result,
        })?)
    } else {
        let mut out = render::trace_text("SIGHAX exploit", &blk, &steps, columns);
        out.push('\n');
        out.push_str(&render::forge_text(&info));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn byte_values_accept_hex_and_decimal() {
        assert_eq!(parse_byte("0x0D"), Ok(13));
        assert_eq!(parse_byte("13"), Ok(13));
        assert_eq!(parse_byte("0xff"), Ok(255));
        assert!(parse_byte("256").is_err());
        assert!(parse_byte("0xZZ").is_err());
    }

    #[test]
    fn padding_accepts_names_and_bytes() {
        assert_eq!(parse_padding("padded"), Ok(PaddingType::Padded));
        assert_eq!(parse_padding("UNPADDED"), Ok(PaddingType::Unpadded));
        assert_eq!(parse_padding("0x01"), Ok(PaddingType::Padded));
        assert_eq!(parse_padding("2"), Ok(PaddingType::Unpadded));
        let err = parse_padding("0x03").unwrap_err();
        assert!(err.contains("invalid padding type 0x03"), "{}", err);
    }

    #[test]
    fn patches_parse_offset_and_value() {
        assert_eq!(parse_patch("0=0x01"), Ok((0, 1)));
        assert_eq!(parse_patch("0x50=255"), Ok((80, 255)));
        assert!(parse_patch("80").is_err());
        assert!(parse_patch("x=1").is_err());
    }
}
