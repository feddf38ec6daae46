//! # `TmdKit`
//!
//! A pure-Rust library for PSX TMD models as used by LSD: Dream Emulator.
//!
//! ## Supported Formats
//!
//! - **TMD** - Object table, vertex and normal blocks, and all 22 primitive packet
//!   layouts (lines, triangles and quads; flat, gradient and shaded; lit, unlit
//!   and textured), decoded and re-encoded losslessly
//! - **Fixed point** - GTE 16- and 32-bit fixed-point numbers
//!
//! ## Quick Start
//!
//! ### Reading a Model
//!
//! ```no_run
//! use tmdkit::formats::tmd::read_tmd;
//!
//! let model = read_tmd("STG00/M000.TMD")?;
//! for (index, object) in model.objects().iter().enumerate() {
//!     println!(
//!         "object {index}: {} primitives, {} vertices, scale {}",
//!         object.primitives().len(),
//!         object.vertices().len(),
//!         object.scale()
//!     );
//! }
//! # Ok::<(), tmdkit::Error>(())
//! ```
//!
//! ### Tolerating Unknown Packets
//!
//! ```no_run
//! use tmdkit::prelude::*;
//!
//! let bytes = std::fs::read("STG00/M000.TMD")?;
//! let options = DecodeOptions::default().with_unknown_packets(UnknownPacketPolicy::SkipPacket);
//! let model = parse_tmd_bytes_with(&bytes, &options)?;
//! for loss in model.losses() {
//!     eprintln!("dropped data in object {}", loss.object());
//! }
//! let rewritten = serialize_tmd(&model)?;
//! # let _ = rewritten;
//! # Ok::<(), tmdkit::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `tmdkit` command-line binary

pub mod error;
pub mod formats;
pub mod utils;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::formats::tmd::{
        Block, DecodeLoss, DecodeOptions, ModelFile, Normal, ObjectEntry, ObjectHeader, UnknownPacketPolicy, Vertex,
        parse_tmd_bytes, parse_tmd_bytes_with, read_tmd, serialize_tmd, write_tmd,
    };
    pub use crate::formats::tmd::packet::{
        PacketFacets, PacketFlag, PacketHeader, PacketMode, PacketShape, PrimitiveKind, PrimitivePacket, UnknownShape,
    };
    pub use crate::formats::tmd::texture::{
        AlphaBlendRate, ColorDepth, ColorLookup, Rgb, TextureMapping, TexturePage, Uv,
    };
    pub use crate::utils::{FixedPoint16, FixedPoint32};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
