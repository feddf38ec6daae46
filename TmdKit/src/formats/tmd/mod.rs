//! TMD 3D model format
//!
//! PSX model container used by LSD: Dream Emulator. A file holds a
//! 12-byte header, a table of 28-byte object headers and, per object, three
//! blocks located through the object header: primitive packets, vertices and
//! normals.
//!
//! Block addresses are either absolute stream offsets or offsets relative to
//! the start of the object table, selected by bit 0 of the header flags.

mod reader;
mod writer;

pub mod packet;
pub mod texture;

pub use packet::{
    PacketFacets, PacketFlag, PacketHeader, PacketMode, PacketShape, PrimitiveKind, PrimitivePacket, SpriteSize,
    UnknownShape,
};
pub use reader::{parse_tmd_bytes, parse_tmd_bytes_with, read_tmd};
pub use texture::{AlphaBlendRate, ColorDepth, ColorLookup, Rgb, TextureMapping, TexturePage, Uv};
pub use writer::{serialize_tmd, write_tmd};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::Vec3;
use serde::Serialize;
use std::fmt;
use std::io::{self, Read, Write};

use crate::utils::FixedPoint16;

/// TMD magic number (little-endian u32)
pub const TMD_MAGIC: u32 = 0x41;

/// Header flag: block addresses are absolute stream offsets.
pub const FLAG_FIXP: u32 = 0x1;

/// File header size: magic, flags, object count
pub const HEADER_SIZE: usize = 12;

/// Object header size: 6 u32 + 1 i32
pub const OBJECT_HEADER_SIZE: usize = 28;

/// Vertex size: 3 x i16 + pad
pub const VERTEX_SIZE: usize = 8;

/// Normal size: 3 x fixed-point16 + pad
pub const NORMAL_SIZE: usize = 8;

/// Regions of a TMD stream, used to locate read and layout errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Block {
    FileHeader,
    ObjectTable,
    Primitives,
    Vertices,
    Normals,
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Block::FileHeader => "file header",
            Block::ObjectTable => "object table",
            Block::Primitives => "primitive block",
            Block::Vertices => "vertex block",
            Block::Normals => "normal block",
        };
        f.write_str(name)
    }
}

/// A decoded TMD model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelFile {
    flags: u32,
    objects: Vec<ObjectEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    losses: Vec<DecodeLoss>,
}

impl ModelFile {
    /// Build a model from objects. Only the addressing bit is set in the flags.
    pub fn new(is_absolute: bool, objects: Vec<ObjectEntry>) -> Self {
        Self { flags: if is_absolute { FLAG_FIXP } else { 0 }, objects, losses: Vec::new() }
    }

    pub fn magic(&self) -> u32 {
        TMD_MAGIC
    }

    /// Raw header flags. Bits other than [`FLAG_FIXP`] are preserved verbatim.
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Whether block addresses are absolute stream offsets.
    pub fn is_absolute(&self) -> bool {
        self.flags & FLAG_FIXP == FLAG_FIXP
    }

    pub fn objects(&self) -> &[ObjectEntry] {
        &self.objects
    }

    /// Packets and objects dropped by a lossy [`UnknownPacketPolicy`].
    pub fn losses(&self) -> &[DecodeLoss] {
        &self.losses
    }

    pub fn is_lossless(&self) -> bool {
        self.losses.is_empty()
    }

    /// Sum of the vertex counts of every object.
    pub fn total_vertices(&self) -> usize {
        self.objects.iter().map(|object| object.vertices.len()).sum()
    }
}

/// The 28-byte object table entry, as stored.
///
/// Addresses are raw: absolute or relative depending on the file flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ObjectHeader {
    pub vertex_address: u32,
    pub vertex_count: u32,
    pub normal_address: u32,
    pub normal_count: u32,
    pub primitive_address: u32,
    pub primitive_count: u32,
    /// Model scale is `2^scale_exponent`.
    pub scale_exponent: i32,
}

impl ObjectHeader {
    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            vertex_address: reader.read_u32::<LittleEndian>()?,
            vertex_count: reader.read_u32::<LittleEndian>()?,
            normal_address: reader.read_u32::<LittleEndian>()?,
            normal_count: reader.read_u32::<LittleEndian>()?,
            primitive_address: reader.read_u32::<LittleEndian>()?,
            primitive_count: reader.read_u32::<LittleEndian>()?,
            scale_exponent: reader.read_i32::<LittleEndian>()?,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.vertex_address)?;
        writer.write_u32::<LittleEndian>(self.vertex_count)?;
        writer.write_u32::<LittleEndian>(self.normal_address)?;
        writer.write_u32::<LittleEndian>(self.normal_count)?;
        writer.write_u32::<LittleEndian>(self.primitive_address)?;
        writer.write_u32::<LittleEndian>(self.primitive_count)?;
        writer.write_i32::<LittleEndian>(self.scale_exponent)
    }
}

/// Saturating element count for a fresh table entry. The writer recomputes
/// counts and rejects any that do not fit.
fn table_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// One object (sub-mesh): its table entry plus the three decoded blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectEntry {
    header: ObjectHeader,
    primitives: Vec<PrimitivePacket>,
    vertices: Vec<Vertex>,
    normals: Vec<Normal>,
}

impl ObjectEntry {
    /// Build an object for encoding. Addresses are assigned by the writer.
    pub fn new(
        scale_exponent: i32,
        primitives: Vec<PrimitivePacket>,
        vertices: Vec<Vertex>,
        normals: Vec<Normal>,
    ) -> Self {
        let header = ObjectHeader {
            vertex_count: table_count(vertices.len()),
            normal_count: table_count(normals.len()),
            primitive_count: table_count(primitives.len()),
            scale_exponent,
            ..ObjectHeader::default()
        };
        Self { header, primitives, vertices, normals }
    }

    pub(crate) fn from_parts(
        header: ObjectHeader,
        primitives: Vec<PrimitivePacket>,
        vertices: Vec<Vertex>,
        normals: Vec<Normal>,
    ) -> Self {
        Self { header, primitives, vertices, normals }
    }

    /// The table entry as it was read (or built).
    pub fn header(&self) -> &ObjectHeader {
        &self.header
    }

    pub fn scale_exponent(&self) -> i32 {
        self.header.scale_exponent
    }

    /// Model scale factor, `2^scale_exponent`.
    pub fn scale(&self) -> f32 {
        2f32.powi(self.header.scale_exponent)
    }

    pub fn primitives(&self) -> &[PrimitivePacket] {
        &self.primitives
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn normals(&self) -> &[Normal] {
        &self.normals
    }
}

/// A model-space vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Vertex {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl Vertex {
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let x = reader.read_i16::<LittleEndian>()?;
        let y = reader.read_i16::<LittleEndian>()?;
        let z = reader.read_i16::<LittleEndian>()?;
        reader.read_i16::<LittleEndian>()?; // pad
        Ok(Self { x, y, z })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_i16::<LittleEndian>(self.x)?;
        writer.write_i16::<LittleEndian>(self.y)?;
        writer.write_i16::<LittleEndian>(self.z)?;
        writer.write_i16::<LittleEndian>(0)
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(f32::from(self.x), f32::from(self.y), f32::from(self.z))
    }
}

/// A unit normal in 1.3.12 fixed point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Normal {
    pub x: FixedPoint16,
    pub y: FixedPoint16,
    pub z: FixedPoint16,
}

impl Normal {
    pub const fn new(x: FixedPoint16, y: FixedPoint16, z: FixedPoint16) -> Self {
        Self { x, y, z }
    }

    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let x = FixedPoint16::read(reader)?;
        let y = FixedPoint16::read(reader)?;
        let z = FixedPoint16::read(reader)?;
        reader.read_i16::<LittleEndian>()?; // pad
        Ok(Self { x, y, z })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.x.write(writer)?;
        self.y.write(writer)?;
        self.z.write(writer)?;
        writer.write_i16::<LittleEndian>(0)
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x.to_f32(), self.y.to_f32(), self.z.to_f32())
    }
}

/// What to do with a packet whose (mode, flag) pair has no known layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum UnknownPacketPolicy {
    /// Fail the whole decode with [`Error::UnknownPacketShape`](crate::Error::UnknownPacketShape).
    #[default]
    AbortFile,
    /// Drop the object that contains the packet, with all of its blocks.
    AbortObject,
    /// Skip the packet, framed by its input length byte.
    SkipPacket,
}

/// Decoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    pub unknown_packets: UnknownPacketPolicy,
}

impl DecodeOptions {
    #[must_use]
    pub fn with_unknown_packets(mut self, policy: UnknownPacketPolicy) -> Self {
        self.unknown_packets = policy;
        self
    }
}

/// Data dropped during a lossy decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DecodeLoss {
    /// One packet was skipped; the object was kept without it.
    Packet { object: usize, packet: usize, offset: u64, header: PacketHeader },
    /// The whole object was dropped because of the packet at `packet`.
    Object { object: usize, packet: usize, offset: u64, header: PacketHeader },
}

impl DecodeLoss {
    /// Object table index the loss belongs to.
    pub fn object(&self) -> usize {
        match self {
            DecodeLoss::Packet { object, .. } | DecodeLoss::Object { object, .. } => *object,
        }
    }

    /// Header of the packet that could not be decoded.
    pub fn header(&self) -> PacketHeader {
        match self {
            DecodeLoss::Packet { header, .. } | DecodeLoss::Object { header, .. } => *header,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_header_layout() {
        let header = ObjectHeader {
            vertex_address: 1,
            vertex_count: 2,
            normal_address: 3,
            normal_count: 4,
            primitive_address: 5,
            primitive_count: 6,
            scale_exponent: -1,
        };
        let mut out = Vec::new();
        header.write(&mut out).unwrap();
        assert_eq!(out.len(), OBJECT_HEADER_SIZE);
        assert_eq!(&out[24..], &[0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(ObjectHeader::read(&mut out.as_slice()).unwrap(), header);
    }

    #[test]
    fn test_vertex_ignores_pad() {
        let bytes = [0x01, 0x00, 0xFF, 0xFF, 0x00, 0x80, 0x34, 0x12];
        let vertex = Vertex::read(&mut bytes.as_slice()).unwrap();
        assert_eq!(vertex, Vertex::new(1, -1, i16::MIN));
        assert_eq!(vertex.to_vec3(), Vec3::new(1.0, -1.0, -32768.0));

        let mut out = Vec::new();
        vertex.write(&mut out).unwrap();
        assert_eq!(out.len(), VERTEX_SIZE);
        assert_eq!(&out[6..], &[0, 0]);
    }

    #[test]
    fn test_normal_reads_fixed_point() {
        let bytes = [0x10, 0x00, 0x90, 0x00, 0x80, 0x00, 0xAA, 0xAA];
        let normal = Normal::read(&mut bytes.as_slice()).unwrap();
        assert_eq!(normal.to_vec3(), Vec3::new(1.0, -1.0, 0.0));

        let mut out = Vec::new();
        normal.write(&mut out).unwrap();
        assert_eq!(out.len(), NORMAL_SIZE);
        assert_eq!(&out[..6], &bytes[..6]);
        assert_eq!(&out[6..], &[0, 0]);
    }

    #[test]
    fn test_object_scale() {
        let object = ObjectEntry::new(3, Vec::new(), vec![Vertex::default(); 2], Vec::new());
        assert_eq!(object.scale(), 8.0);
        assert_eq!(object.header().vertex_count, 2);
        assert_eq!(ObjectEntry::new(-2, Vec::new(), Vec::new(), Vec::new()).scale(), 0.25);
    }

    #[test]
    fn test_table_count_saturates() {
        assert_eq!(table_count(7), 7);
        assert_eq!(table_count(u32::MAX as usize), u32::MAX);
        assert_eq!(table_count(usize::MAX), u32::MAX);
    }

    #[test]
    fn test_model_flags() {
        let model = ModelFile::new(true, Vec::new());
        assert!(model.is_absolute());
        assert_eq!(model.flags(), FLAG_FIXP);
        assert_eq!(model.magic(), TMD_MAGIC);
        assert!(!ModelFile::new(false, Vec::new()).is_absolute());
    }

    #[test]
    fn test_total_vertices() {
        let objects = vec![
            ObjectEntry::new(0, Vec::new(), vec![Vertex::default(); 3], Vec::new()),
            ObjectEntry::new(0, Vec::new(), vec![Vertex::default(); 5], Vec::new()),
        ];
        assert_eq!(ModelFile::new(false, objects).total_vertices(), 8);
    }
}
