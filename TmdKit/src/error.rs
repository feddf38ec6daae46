//! Error types for `TmdKit`

use thiserror::Error;

use crate::formats::tmd::Block;
use crate::formats::tmd::packet::UnknownShape;

/// The error type for `TmdKit` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file or stream operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== TMD Format Errors ====================
    /// The data is not a TMD model (magic number is not 0x41).
    #[error("invalid TMD magic: expected 0x41, found {found:#x}")]
    InvalidTmdMagic {
        /// The magic number found in the file header.
        found: u32,
    },

    /// A primitive packet's (mode, flag) pair is not in the shape table.
    #[error("object {object}, packet {packet} at offset {offset:#x}: {shape}")]
    UnknownPacketShape {
        /// Index of the object in the object table.
        object: usize,
        /// Index of the packet within the object's primitive block.
        packet: usize,
        /// Absolute stream offset of the packet header.
        offset: u64,
        /// The raw packet header.
        #[source]
        shape: UnknownShape,
    },

    /// The stream ended in the middle of a block.
    #[error("truncated TMD data: {block} ended early (object: {object:?}, packet: {packet:?}, offset: {offset:#x})")]
    TruncatedData {
        /// The block that was being read.
        block: Block,
        /// Index of the object, if the block belongs to one.
        object: Option<usize>,
        /// Index of the packet, if the stream ended inside the primitive block.
        packet: Option<usize>,
        /// Absolute stream offset of the element that could not be read.
        offset: u64,
    },

    // ==================== Encode Errors ====================
    /// A packet cannot be serialized.
    #[error(
        "cannot write packet {packet} of object {object} (olen: {output_length:#x}, ilen: {input_length:#x}, \
         flag: {flag:#x}, mode: {mode:#x}): {reason}"
    )]
    UnwritableShape {
        /// Index of the object in the object table.
        object: usize,
        /// Index of the packet within the object.
        packet: usize,
        /// Raw output length byte.
        output_length: u8,
        /// Raw input length byte.
        input_length: u8,
        /// Raw flag byte.
        flag: u8,
        /// Raw mode byte.
        mode: u8,
        /// Why the packet has no serialization.
        reason: String,
    },

    /// A block address or element count does not fit in the 32-bit object table.
    #[error("{block} of object {object} does not fit in a 32-bit TMD object table")]
    LayoutOverflow {
        /// Index of the object in the object table.
        object: usize,
        /// The block whose address or count overflowed.
        block: Block,
    },
}

impl Error {
    /// Wrap an IO error raised while reading `block`.
    ///
    /// End-of-stream becomes [`Error::TruncatedData`]; anything else stays [`Error::Io`].
    pub(crate) fn while_reading(
        block: Block,
        object: Option<usize>,
        offset: u64,
    ) -> impl FnOnce(std::io::Error) -> Self {
        Self::truncated_or_io(block, object, None, offset)
    }

    /// Like [`Error::while_reading`], for packet `packet` of object `object`.
    pub(crate) fn while_reading_packet(
        object: usize,
        packet: usize,
        offset: u64,
    ) -> impl FnOnce(std::io::Error) -> Self {
        Self::truncated_or_io(Block::Primitives, Some(object), Some(packet), offset)
    }

    fn truncated_or_io(
        block: Block,
        object: Option<usize>,
        packet: Option<usize>,
        offset: u64,
    ) -> impl FnOnce(std::io::Error) -> Self {
        move |err| {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::TruncatedData { block, object, packet, offset }
            } else {
                Error::Io(err)
            }
        }
    }
}

/// A specialized Result type for `TmdKit` operations.
pub type Result<T> = std::result::Result<T, Error>;
