//! TMD decoding
//!
//! Objects are read in table order. For each object the cursor jumps to the
//! primitive, vertex and normal blocks in turn and comes back to the object
//! table afterwards, so blocks may sit anywhere in the stream, overlap, or
//! appear out of table order.

use super::{
    Block, DecodeLoss, DecodeOptions, FLAG_FIXP, ModelFile, Normal, OBJECT_HEADER_SIZE, ObjectEntry, ObjectHeader,
    PacketHeader, PrimitivePacket, TMD_MAGIC, UnknownPacketPolicy, Vertex,
};
use crate::error::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;

/// Upper bound for preallocating element vectors from untrusted counts.
const MAX_PREALLOC: usize = 4096;

/// Read a .tmd file from disk
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be opened or read.
/// Returns [`Error::InvalidTmdMagic`] if the file does not start with the TMD magic.
///
/// [`Error::Io`]: crate::Error::Io
/// [`Error::InvalidTmdMagic`]: crate::Error::InvalidTmdMagic
pub fn read_tmd<P: AsRef<Path>>(path: P) -> Result<ModelFile> {
    let mut file = File::open(path)?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    parse_tmd_bytes(&buffer)
}

/// Parse TMD data from bytes with the default [`DecodeOptions`].
///
/// # Errors
///
/// Returns [`Error::InvalidTmdMagic`] for a bad header, [`Error::UnknownPacketShape`]
/// for a packet with no known layout and [`Error::TruncatedData`] if a block runs
/// past the end of the data.
///
/// [`Error::InvalidTmdMagic`]: crate::Error::InvalidTmdMagic
/// [`Error::UnknownPacketShape`]: crate::Error::UnknownPacketShape
/// [`Error::TruncatedData`]: crate::Error::TruncatedData
pub fn parse_tmd_bytes(data: &[u8]) -> Result<ModelFile> {
    parse_tmd_bytes_with(data, &DecodeOptions::default())
}

/// Parse TMD data from bytes.
///
/// # Errors
///
/// See [`parse_tmd_bytes`]. Whether an unknown packet is an error depends on
/// `options.unknown_packets`.
pub fn parse_tmd_bytes_with(data: &[u8], options: &DecodeOptions) -> Result<ModelFile> {
    ModelFile::read_with(&mut Cursor::new(data), options)
}

impl ModelFile {
    /// Decode a model starting at the reader's current position.
    ///
    /// On success the reader is left just past the last byte consumed by the
    /// header, the object table or any block.
    ///
    /// # Errors
    ///
    /// See [`parse_tmd_bytes`].
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        Self::read_with(reader, &DecodeOptions::default())
    }

    /// Decode a model with explicit options.
    ///
    /// # Errors
    ///
    /// See [`parse_tmd_bytes_with`].
    pub fn read_with<R: Read + Seek>(reader: &mut R, options: &DecodeOptions) -> Result<Self> {
        let start = reader.stream_position()?;
        let read_header = |reader: &mut R| -> std::io::Result<(u32, u32, u32)> {
            Ok((
                reader.read_u32::<LittleEndian>()?,
                reader.read_u32::<LittleEndian>()?,
                reader.read_u32::<LittleEndian>()?,
            ))
        };
        let (magic, flags, object_count) =
            read_header(reader).map_err(Error::while_reading(Block::FileHeader, None, start))?;

        if magic != TMD_MAGIC {
            return Err(Error::InvalidTmdMagic { found: magic });
        }

        let table_base = reader.stream_position()?;
        let addressing = if flags & FLAG_FIXP == FLAG_FIXP {
            Addressing::Absolute
        } else {
            Addressing::Relative { table_base }
        };

        tracing::debug!(
            "TMD header: {} objects, {:?} addressing, table at {:#x}",
            object_count,
            addressing,
            table_base
        );

        let mut objects = Vec::with_capacity((object_count as usize).min(MAX_PREALLOC));
        let mut losses = Vec::new();
        let mut high_water = table_base;

        for index in 0..object_count as usize {
            let entry_offset = table_base + (index * OBJECT_HEADER_SIZE) as u64;
            let header = ObjectHeader::read(reader)
                .map_err(Error::while_reading(Block::ObjectTable, Some(index), entry_offset))?;
            high_water = high_water.max(reader.stream_position()?);

            let object = ObjectReader { index, header, addressing, options };
            if let Some(entry) = object.read_blocks(reader, &mut losses, &mut high_water)? {
                objects.push(entry);
            }
        }

        reader.seek(SeekFrom::Start(high_water))?;

        Ok(Self { flags, objects, losses })
    }
}

/// How stored block addresses map to stream offsets.
#[derive(Debug, Clone, Copy)]
enum Addressing {
    Absolute,
    Relative { table_base: u64 },
}

impl Addressing {
    fn resolve(self, stored: u32) -> u64 {
        match self {
            Addressing::Absolute => u64::from(stored),
            Addressing::Relative { table_base } => table_base + u64::from(stored),
        }
    }
}

/// Run `f` with the cursor at `offset`, then put the cursor back where it was.
///
/// Returns the value of `f` and the position `f` stopped at. The cursor is
/// restored even when `f` fails.
fn with_cursor_at<R, T, F>(reader: &mut R, offset: u64, f: F) -> Result<(T, u64)>
where
    R: Read + Seek,
    F: FnOnce(&mut R) -> Result<T>,
{
    let saved = reader.stream_position()?;
    reader.seek(SeekFrom::Start(offset))?;
    let result = f(reader);
    let end = reader.stream_position();
    reader.seek(SeekFrom::Start(saved))?;
    Ok((result?, end?))
}

/// Outcome of reading one object's primitive block.
enum Primitives {
    Read(Vec<PrimitivePacket>),
    /// The object is dropped; the blocks after it are not read.
    Aborted,
}

/// Decode state for a single object.
struct ObjectReader<'a> {
    index: usize,
    header: ObjectHeader,
    addressing: Addressing,
    options: &'a DecodeOptions,
}

impl ObjectReader<'_> {
    /// Read the three blocks in order: primitives, vertices, normals.
    ///
    /// `high_water` is raised to the end of every block read.
    fn read_blocks<R: Read + Seek>(
        &self,
        reader: &mut R,
        losses: &mut Vec<DecodeLoss>,
        high_water: &mut u64,
    ) -> Result<Option<ObjectEntry>> {
        let primitive_offset = self.addressing.resolve(self.header.primitive_address);
        let vertex_offset = self.addressing.resolve(self.header.vertex_address);
        let normal_offset = self.addressing.resolve(self.header.normal_address);

        tracing::debug!(
            "Object {}: {} primitives at {:#x}, {} vertices at {:#x}, {} normals at {:#x}",
            self.index,
            self.header.primitive_count,
            primitive_offset,
            self.header.vertex_count,
            vertex_offset,
            self.header.normal_count,
            normal_offset
        );

        let (primitives, end) =
            with_cursor_at(reader, primitive_offset, |reader| self.read_primitives(reader, losses))?;
        *high_water = (*high_water).max(end);
        let Primitives::Read(primitives) = primitives else {
            return Ok(None);
        };

        let vertex_count = self.header.vertex_count as usize;
        let (vertices, end) = with_cursor_at(reader, vertex_offset, |reader| {
            read_elements(reader, vertex_count, Block::Vertices, self.index, Vertex::read)
        })?;
        *high_water = (*high_water).max(end);

        let normal_count = self.header.normal_count as usize;
        let (normals, end) = with_cursor_at(reader, normal_offset, |reader| {
            read_elements(reader, normal_count, Block::Normals, self.index, Normal::read)
        })?;
        *high_water = (*high_water).max(end);

        Ok(Some(ObjectEntry::from_parts(self.header, primitives, vertices, normals)))
    }

    fn read_primitives<R: Read + Seek>(&self, reader: &mut R, losses: &mut Vec<DecodeLoss>) -> Result<Primitives> {
        let count = self.header.primitive_count as usize;
        let mut primitives = Vec::with_capacity(count.min(MAX_PREALLOC));

        for packet in 0..count {
            let offset = reader.stream_position()?;
            let header = PacketHeader::read(reader).map_err(Error::while_reading_packet(self.index, packet, offset))?;

            let shape = match header.shape() {
                Ok(shape) => shape,
                Err(unknown) => match self.options.unknown_packets {
                    UnknownPacketPolicy::AbortFile => {
                        return Err(Error::UnknownPacketShape { object: self.index, packet, offset, shape: unknown });
                    }
                    UnknownPacketPolicy::AbortObject => {
                        tracing::warn!(
                            "Dropping object {}: {} (packet {} at {:#x})",
                            self.index,
                            unknown,
                            packet,
                            offset
                        );
                        losses.push(DecodeLoss::Object { object: self.index, packet, offset, header });
                        return Ok(Primitives::Aborted);
                    }
                    UnknownPacketPolicy::SkipPacket => {
                        tracing::warn!(
                            "Skipping packet {} of object {} at {:#x}: {}",
                            packet,
                            self.index,
                            offset,
                            unknown
                        );
                        skip_payload(reader, header).map_err(Error::while_reading_packet(self.index, packet, offset))?;
                        losses.push(DecodeLoss::Packet { object: self.index, packet, offset, header });
                        continue;
                    }
                },
            };

            let primitive = PrimitivePacket::read_payload(header, shape, reader)
                .map_err(Error::while_reading_packet(self.index, packet, offset))?;
            primitives.push(primitive);
        }

        Ok(Primitives::Read(primitives))
    }
}

/// Skip an unknown packet's payload using its input length, the only framing it has.
fn skip_payload<R: Read>(reader: &mut R, header: PacketHeader) -> std::io::Result<()> {
    let len = u64::from(header.input_length) * 4;
    let skipped = std::io::copy(&mut reader.by_ref().take(len), &mut std::io::sink())?;
    if skipped < len {
        return Err(std::io::ErrorKind::UnexpectedEof.into());
    }
    Ok(())
}

fn read_elements<R, T>(
    reader: &mut R,
    count: usize,
    block: Block,
    object: usize,
    read: fn(&mut R) -> std::io::Result<T>,
) -> Result<Vec<T>>
where
    R: Read + Seek,
{
    let mut elements = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        let offset = reader.stream_position()?;
        elements.push(read(reader).map_err(Error::while_reading(block, Some(object), offset))?);
    }
    Ok(elements)
}
