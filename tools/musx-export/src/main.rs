//! musx-export - MUSX asset export tool
//!
//! Converts Doom MUS lumps to Huffman-coded MUSX streams (.musx) and raw
//! resources to Huffman blocks (.huff)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nether_huff::TableEncoding;
use nether_musx::{EncoderConfig, LayoutChoice};
use std::path::{Path, PathBuf};

use musx_export::manifest::{self, Manifest};
use musx_export::{BLOB_EXT, MUSX_EXT, blob, music};

#[derive(Parser)]
#[command(name = "musx-export")]
#[command(about = "MUSX asset export tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a MUS lump to MUSX
    Music {
        /// Input .mus file
        input: PathBuf,

        /// Output .musx file
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        encoder: EncoderArgs,
    },

    /// Huffman-code a raw file byte by byte
    Blob {
        /// Input file
        input: PathBuf,

        /// Output .huff file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Table encoding (auto, grouped, flat, sentinel)
        #[arg(short, long, default_value = "auto")]
        encoding: TableEncoding,
    },

    /// Print header and table summaries of a .musx file
    Info {
        /// Input .musx file
        input: PathBuf,
    },

    /// Build assets from a manifest file
    Build {
        /// Path to musx.toml manifest
        #[arg(default_value = "musx.toml")]
        manifest: PathBuf,

        /// Output directory (overrides manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Encode a MUS lump, decode it again and compare the events
    Verify {
        /// Input .mus file
        input: PathBuf,

        #[command(flatten)]
        encoder: EncoderArgs,
    },
}

#[derive(clap::Args)]
struct EncoderArgs {
    /// Event layout (auto, sequential, grouped)
    #[arg(short, long, default_value = "auto")]
    layout: LayoutChoice,

    /// Longest code any table may assign (1-15)
    #[arg(long)]
    max_code_length: Option<u8>,

    /// Decoder scratch budget in 16-bit words
    #[arg(long)]
    max_decoder_words: Option<usize>,

    /// Decoder note arena size
    #[arg(long)]
    max_notes: Option<usize>,

    /// Table encoding (auto, grouped, flat, sentinel)
    #[arg(long, default_value = "auto")]
    table_encoding: TableEncoding,
}

impl EncoderArgs {
    fn to_config(&self) -> Result<EncoderConfig> {
        let defaults = EncoderConfig::default();
        let config = EncoderConfig {
            max_code_length: self.max_code_length.unwrap_or(defaults.max_code_length),
            max_decoder_words: self.max_decoder_words.unwrap_or(defaults.max_decoder_words),
            max_simultaneous_notes: self.max_notes.unwrap_or(defaults.max_simultaneous_notes),
            layout: self.layout,
            table_encoding: self.table_encoding,
        };
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Music {
            input,
            output,
            encoder,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension(MUSX_EXT));
            tracing::info!("Converting {:?} -> {:?}", input, output);
            music::convert_mus(&input, &output, &encoder.to_config()?)?;
            tracing::info!("Done!");
        }

        Commands::Blob {
            input,
            output,
            encoding,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension(BLOB_EXT));
            tracing::info!("Converting {:?} -> {:?}", input, output);
            blob::convert_blob(&input, &output, encoding)?;
            tracing::info!("Done!");
        }

        Commands::Info { input } => {
            let bytes =
                std::fs::read(&input).with_context(|| format!("Failed to read {:?}", input))?;
            print!("{}", music::describe_musx(&bytes)?);
        }

        Commands::Build { manifest, output } => {
            tracing::info!("Building assets from {:?}", manifest);
            let config = Manifest::load(&manifest)?;
            let base_dir = manifest.parent().unwrap_or(Path::new("."));
            let summary = manifest::build_all(&config, base_dir, output.as_deref())?;
            tracing::info!(
                "Build complete: {} music, {} blobs, {} -> {} bytes",
                summary.music,
                summary.blobs,
                summary.bytes_in,
                summary.bytes_out
            );
        }

        Commands::Verify { input, encoder } => {
            let events = music::verify_mus(&input, &encoder.to_config()?)?;
            tracing::info!("{:?}: {} events round-trip", input, events);
        }
    }

    Ok(())
}
