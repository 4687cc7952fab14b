//! CLI definitions and command dispatch.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use webfont_woff::ContainerVersion;

use crate::{
    commands::{DecodeArgs, EncodeArgs, decode_files, encode_files, font_info},
    io::expand_inputs,
};

#[derive(Parser)]
#[command(name = "webfont")]
#[command(about = "Convert fonts to and from WOFF and WOFF2 containers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Woff,
    Woff2,
}

impl From<Format> for ContainerVersion {
    fn from(format: Format) -> Self {
        match format {
            Format::Woff => ContainerVersion::Woff1,
            Format::Woff2 => ContainerVersion::Woff2,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Unwrap WOFF/WOFF2 files into .ttf, .otf or .ttc
    Decode {
        /// Input files or glob patterns
        #[arg(required = true)]
        files: Vec<String>,
        /// Output directory (defaults to each input's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Keep the name table exactly as stored
        #[arg(long)]
        no_repair_names: bool,
        /// Refuse to inflate more than this many bytes of table data
        #[arg(long)]
        max_size: Option<u64>,
    },
    /// Wrap sfnt fonts or collections into WOFF/WOFF2
    Encode {
        /// Input files or glob patterns
        #[arg(required = true)]
        files: Vec<String>,
        #[arg(short, long, value_enum, default_value = "woff2")]
        format: Format,
        /// Store glyf, loca and hmtx untransformed
        #[arg(long)]
        no_transform: bool,
        /// Extended metadata XML to embed
        #[arg(long)]
        metadata: Option<PathBuf>,
        /// Output directory (defaults to each input's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Print the container header and table directory
    Info { file: PathBuf },
}

impl Commands {
    pub fn run(self) -> Result<()> {
        match self {
            Commands::Decode { files, output_dir, no_repair_names, max_size } => {
                let files = expand_inputs(&files)?;
                let args = DecodeArgs { output_dir, repair_names: !no_repair_names, max_size };
                decode_files(&files, &args)?.ok_or_bail("Decode")?;
            }
            Commands::Encode { files, format, no_transform, metadata, output_dir } => {
                let files = expand_inputs(&files)?;
                let args = EncodeArgs {
                    version: format.into(),
                    transform: !no_transform,
                    metadata,
                    output_dir,
                };
                encode_files(&files, &args)?.ok_or_bail("Encode")?;
            }
            Commands::Info { file } => {
                print!("{}", font_info(&file)?);
            }
        }
        Ok(())
    }
}
