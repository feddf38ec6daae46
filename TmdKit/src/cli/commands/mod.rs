use clap::Subcommand;
use std::path::PathBuf;
use std::str::FromStr;

use crate::formats::tmd::{DecodeOptions, UnknownPacketPolicy};

/// Policy for packets with no known layout
#[derive(Debug, Clone, Copy)]
pub struct PolicyArg(pub UnknownPacketPolicy);

impl FromStr for PolicyArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        match lower.as_str() {
            "abort-file" | "abort" | "file" => Ok(PolicyArg(UnknownPacketPolicy::AbortFile)),
            "abort-object" | "object" => Ok(PolicyArg(UnknownPacketPolicy::AbortObject)),
            "skip" | "skip-packet" => Ok(PolicyArg(UnknownPacketPolicy::SkipPacket)),
            _ => Err(format!(
                "Invalid policy '{s}'. Valid values: abort-file/abort, abort-object/object, skip/skip-packet"
            )),
        }
    }
}

impl PolicyArg {
    fn options(self) -> DecodeOptions {
        DecodeOptions::default().with_unknown_packets(self.0)
    }
}

pub mod tmd;

#[derive(Subcommand)]
pub enum Commands {
    /// Show the object table and packet shapes of a TMD file
    Info {
        /// TMD file
        path: PathBuf,

        /// What to do with packets of unknown shape
        #[arg(long, default_value = "abort-file")]
        on_unknown: PolicyArg,
    },

    /// Decode a TMD file to JSON
    Dump {
        /// TMD file
        path: PathBuf,

        /// Output JSON file
        #[arg(short, long)]
        output: PathBuf,

        /// What to do with packets of unknown shape
        #[arg(long, default_value = "abort-file")]
        on_unknown: PolicyArg,
    },

    /// Decode a TMD file and write it back in canonical layout
    Rewrite {
        /// TMD file
        path: PathBuf,

        /// Output TMD file
        #[arg(short, long)]
        output: PathBuf,

        /// What to do with packets of unknown shape
        #[arg(long, default_value = "abort-file")]
        on_unknown: PolicyArg,
    },

    /// Check that a TMD file survives a decode/encode/decode cycle
    Verify {
        /// TMD file
        path: PathBuf,

        /// What to do with packets of unknown shape
        #[arg(long, default_value = "abort-file")]
        on_unknown: PolicyArg,
    },
}

impl Commands {
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::Info { path, on_unknown } => tmd::info(path, on_unknown.options()),
            Commands::Dump { path, output, on_unknown } => tmd::dump(path, output, on_unknown.options()),
            Commands::Rewrite { path, output, on_unknown } => tmd::rewrite(path, output, on_unknown.options()),
            Commands::Verify { path, on_unknown } => tmd::verify(path, on_unknown.options()),
        }
    }
}
