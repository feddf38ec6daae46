//! File format handlers
//!
//! Only the TMD model container lives here for now. The level, object and
//! animation containers that embed TMD data hand a positioned stream to
//! [`tmd::ModelFile::read`].

pub mod tmd;

// Re-export main model types
pub use tmd::{
    DecodeLoss, DecodeOptions, ModelFile, Normal, ObjectEntry, ObjectHeader, UnknownPacketPolicy, Vertex,
    parse_tmd_bytes, parse_tmd_bytes_with, read_tmd, serialize_tmd, write_tmd,
};
