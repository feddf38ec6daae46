//! Primitive packets
//!
//! Every packet starts with a 4-byte header:
//!
//! | Offset | Type | Field |
//! | ------ | ---- | ----- |
//! | 0 | u8 | output length (words of GPU packet, informational) |
//! | 1 | u8 | input length (words of payload, informational) |
//! | 2 | u8 | flag |
//! | 3 | u8 | mode |
//!
//! The payload that follows is fixed-size for a given [`PacketShape`]. The two
//! length bytes are kept verbatim for write-back but never used to frame reads.

mod shape;

pub use shape::PacketShape;

use shape::Field;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::fmt;
use std::io::{self, Read, Write};

use super::texture::{ColorLookup, Rgb, TextureMapping, TexturePage, Uv};
use crate::utils::{extract, merge};

/// Size of the packet header in bytes.
pub const PACKET_HEADER_SIZE: usize = 4;

/// Broad primitive category stored in the top three bits of `mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PrimitiveKind {
    Polygon,
    Line,
    Sprite,
}

/// Sprite size, encoded in `mode` bits 3-4 of sprite packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SpriteSize {
    Free,
    One,
    Eight,
    Sixteen,
}

/// The packet's `mode` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct PacketMode(u8);

impl PacketMode {
    const KIND_MASK: u8 = 0b1110_0000;
    const SPRITE_SIZE_MASK: u8 = 0b0001_1000;

    /// Brightness calculation; off draws the texture as-is.
    pub const BRIGHTNESS: u8 = 0x01;
    /// Semi-transparency processing. Does not affect layout.
    pub const ALPHA_BLEND: u8 = 0x02;
    pub const TEXTURED: u8 = 0x04;
    pub const QUAD: u8 = 0x08;
    pub const GOURAUD: u8 = 0x10;

    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub fn kind(self) -> Option<PrimitiveKind> {
        match extract(self.0, Self::KIND_MASK, 5) {
            1 => Some(PrimitiveKind::Polygon),
            2 => Some(PrimitiveKind::Line),
            3 => Some(PrimitiveKind::Sprite),
            _ => None,
        }
    }

    pub fn sprite_size(self) -> SpriteSize {
        match extract(self.0, Self::SPRITE_SIZE_MASK, 3) {
            0 => SpriteSize::Free,
            1 => SpriteSize::One,
            2 => SpriteSize::Eight,
            _ => SpriteSize::Sixteen,
        }
    }

    pub fn has(self, option: u8) -> bool {
        self.0 & option == option
    }

    pub fn brightness_calculated(self) -> bool {
        self.has(Self::BRIGHTNESS)
    }

    pub fn is_alpha_blended(self) -> bool {
        self.has(Self::ALPHA_BLEND)
    }

    pub fn is_textured(self) -> bool {
        self.has(Self::TEXTURED)
    }

    pub fn is_quad(self) -> bool {
        self.has(Self::QUAD)
    }

    pub fn is_gouraud(self) -> bool {
        self.has(Self::GOURAUD)
    }

    /// The same mode with the alpha-blend bit set or cleared.
    #[must_use]
    pub fn with_alpha_blend(self, enabled: bool) -> Self {
        Self(merge(self.0, u8::from(enabled), Self::ALPHA_BLEND, 1))
    }
}

/// The packet's `flag` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct PacketFlag(u8);

impl PacketFlag {
    /// Set when light source calculation is NOT carried out.
    pub const UNLIT: u8 = 0x01;
    pub const DOUBLE_SIDED: u8 = 0x02;
    /// One colour per vertex instead of a single colour.
    pub const GRADIENT: u8 = 0x04;

    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub fn has(self, flag: u8) -> bool {
        self.0 & flag == flag
    }

    pub fn is_unlit(self) -> bool {
        self.has(Self::UNLIT)
    }

    pub fn is_double_sided(self) -> bool {
        self.has(Self::DOUBLE_SIDED)
    }

    pub fn is_gradient(self) -> bool {
        self.has(Self::GRADIENT)
    }
}

/// The raw 4-byte packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PacketHeader {
    pub output_length: u8,
    pub input_length: u8,
    pub flag: PacketFlag,
    pub mode: PacketMode,
}

impl PacketHeader {
    pub fn new(output_length: u8, input_length: u8, flag: u8, mode: u8) -> Self {
        Self { output_length, input_length, flag: PacketFlag::from_raw(flag), mode: PacketMode::from_raw(mode) }
    }

    /// Header with the canonical mode/flag and the length bytes retail files carry.
    pub fn for_shape(shape: PacketShape) -> Self {
        let input_length = (shape.payload_size() / 4) as u8;
        // GPU packet length, only kept for tools that display it
        let output_length = match shape {
            PacketShape::TriGradTexUnlit | PacketShape::TriShadedTexLit | PacketShape::QuadFlatTexUnlit
            | PacketShape::QuadFlatTexLit => 9,
            PacketShape::QuadGradTexUnlit | PacketShape::QuadShadedTexLit => 12,
            PacketShape::TriFlatTexUnlit | PacketShape::TriFlatTexLit => 7,
            PacketShape::TriGradUnlit
            | PacketShape::TriFlatGradLit
            | PacketShape::TriShadedLit
            | PacketShape::TriShadedGradLit => 6,
            PacketShape::QuadGradUnlit
            | PacketShape::QuadFlatGradLit
            | PacketShape::QuadShadedLit
            | PacketShape::QuadShadedGradLit => 8,
            PacketShape::QuadFlatUnlit | PacketShape::QuadFlatLit => 5,
            PacketShape::TriFlatUnlit | PacketShape::TriFlatLit | PacketShape::LineGrad => 4,
            PacketShape::LineFlat => 3,
        };
        Self::new(output_length, input_length, shape.flag(), shape.mode())
    }

    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut raw = [0u8; PACKET_HEADER_SIZE];
        reader.read_exact(&mut raw)?;
        Ok(Self::new(raw[0], raw[1], raw[2], raw[3]))
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&[self.output_length, self.input_length, self.flag.raw(), self.mode.raw()])
    }

    /// Dispatch key: `mode` without the alpha-blend bit, shifted left by 8, OR `flag`.
    pub fn dispatch_key(&self) -> u16 {
        let mode = self.mode.with_alpha_blend(false).raw();
        (u16::from(mode) << 8) | u16::from(self.flag.raw())
    }

    /// Resolve the payload layout of this packet.
    pub fn shape(&self) -> std::result::Result<PacketShape, UnknownShape> {
        PacketShape::from_key(self.dispatch_key()).ok_or(UnknownShape { header: *self })
    }
}

/// A packet header whose (mode, flag) pair is not in the shape table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownShape {
    pub header: PacketHeader,
}

impl fmt::Display for UnknownShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown packet shape {:#06x} (olen: {:#x}, ilen: {:#x}, flag: {:#x}, mode: {:#x})",
            self.header.dispatch_key(),
            self.header.output_length,
            self.header.input_length,
            self.header.flag.raw(),
            self.header.mode.raw()
        )
    }
}

impl std::error::Error for UnknownShape {}

impl UnknownShape {
    pub fn mode(&self) -> u8 {
        self.header.mode.raw()
    }

    pub fn flag(&self) -> u8 {
        self.header.flag.raw()
    }
}

/// The attribute data of a packet, independent of its layout.
///
/// A decoded packet always carries exactly the facets its shape defines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PacketFacets {
    pub vertices: Vec<u16>,
    pub normals: Vec<u16>,
    pub colors: Vec<Rgb>,
    pub texture: Option<TextureMapping>,
}

/// One drawing command: header, resolved shape and attribute facets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrimitivePacket {
    header: PacketHeader,
    shape: PacketShape,
    facets: PacketFacets,
}

impl PrimitivePacket {
    /// Assemble a packet. The shape is derived from the header's (mode, flag) pair.
    ///
    /// Facet counts are checked when the packet is written, not here.
    pub fn new(header: PacketHeader, facets: PacketFacets) -> std::result::Result<Self, UnknownShape> {
        let shape = header.shape()?;
        Ok(Self { header, shape, facets })
    }

    /// Read the payload that follows an already-read header.
    pub fn read_payload<R: Read>(header: PacketHeader, shape: PacketShape, reader: &mut R) -> io::Result<Self> {
        let mut facets = PacketFacets {
            vertices: Vec::with_capacity(shape.vertex_count()),
            normals: Vec::with_capacity(shape.normal_count()),
            colors: Vec::with_capacity(shape.color_count()),
            texture: None,
        };
        let mut color_lookup = ColorLookup::default();
        let mut page = TexturePage::default();
        let mut uvs = Vec::new();

        for field in shape.layout() {
            match field {
                Field::Color => {
                    let mut rgb = [0u8; 4];
                    reader.read_exact(&mut rgb)?;
                    facets.colors.push(Rgb::new(rgb[0], rgb[1], rgb[2]));
                }
                Field::Normal => facets.normals.push(reader.read_u16::<LittleEndian>()?),
                Field::Vertex => facets.vertices.push(reader.read_u16::<LittleEndian>()?),
                Field::Uv => {
                    let u = reader.read_u8()?;
                    let v = reader.read_u8()?;
                    uvs.push(Uv::new(u, v));
                }
                Field::ColorLookup => color_lookup = ColorLookup::from_raw(reader.read_u16::<LittleEndian>()?),
                Field::TexturePage => page = TexturePage::from_raw(reader.read_u16::<LittleEndian>()?),
                Field::Pad16 => {
                    reader.read_u16::<LittleEndian>()?;
                }
            }
        }

        if shape.is_textured() {
            facets.texture = Some(TextureMapping { color_lookup, page, uvs });
        }

        Ok(Self { header, shape, facets })
    }

    /// Check that the facets fill this packet's layout exactly.
    ///
    /// Returns a description of the first mismatch.
    pub fn check_writable(&self) -> std::result::Result<(), String> {
        let shape = self.shape;
        let counts = [
            ("vertex indices", shape.vertex_count(), self.facets.vertices.len()),
            ("normal indices", shape.normal_count(), self.facets.normals.len()),
            ("colors", shape.color_count(), self.facets.colors.len()),
        ];
        for (what, expected, found) in counts {
            if expected != found {
                return Err(format!("{shape} needs {expected} {what}, found {found}"));
            }
        }
        match (&self.facets.texture, shape.is_textured()) {
            (Some(texture), true) if texture.uvs.len() != shape.vertex_count() => Err(format!(
                "{shape} needs {} texture coordinates, found {}",
                shape.vertex_count(),
                texture.uvs.len()
            )),
            (None, true) => Err(format!("{shape} needs a texture mapping")),
            (Some(_), false) => Err(format!("{shape} cannot carry a texture mapping")),
            _ => Ok(()),
        }
    }

    /// Write header and payload. Padding is written as zero.
    ///
    /// Callers must have checked [`check_writable`](Self::check_writable).
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.header.write(writer)?;

        let mut vertices = self.facets.vertices.iter();
        let mut normals = self.facets.normals.iter();
        let mut colors = self.facets.colors.iter();
        let mut uvs = self.facets.texture.iter().flat_map(|texture| texture.uvs.iter());
        let texture = self.facets.texture.as_ref();

        for field in self.shape.layout() {
            match field {
                Field::Color => {
                    let rgb = colors.next().copied().unwrap_or_default();
                    writer.write_all(&[rgb.r, rgb.g, rgb.b, 0])?;
                }
                Field::Normal => writer.write_u16::<LittleEndian>(normals.next().copied().unwrap_or_default())?,
                Field::Vertex => writer.write_u16::<LittleEndian>(vertices.next().copied().unwrap_or_default())?,
                Field::Uv => {
                    let uv = uvs.next().copied().unwrap_or_default();
                    writer.write_all(&[uv.u, uv.v])?;
                }
                Field::ColorLookup => writer
                    .write_u16::<LittleEndian>(texture.map(|texture| texture.color_lookup.raw()).unwrap_or_default())?,
                Field::TexturePage => {
                    writer.write_u16::<LittleEndian>(texture.map(|texture| texture.page.raw()).unwrap_or_default())?;
                }
                Field::Pad16 => writer.write_u16::<LittleEndian>(0)?,
            }
        }
        Ok(())
    }

    /// Total encoded size including the header.
    pub fn encoded_size(&self) -> usize {
        PACKET_HEADER_SIZE + self.shape.payload_size()
    }

    pub fn header(&self) -> PacketHeader {
        self.header
    }

    pub fn shape(&self) -> PacketShape {
        self.shape
    }

    pub fn mode(&self) -> PacketMode {
        self.header.mode
    }

    pub fn flag(&self) -> PacketFlag {
        self.header.flag
    }

    /// Vertex indices, present on every shape.
    pub fn vertices(&self) -> &[u16] {
        &self.facets.vertices
    }

    /// Normal indices, for lit shapes only.
    pub fn normals(&self) -> Option<&[u16]> {
        self.shape.is_lit().then_some(self.facets.normals.as_slice())
    }

    /// Colours, for every shape except lit textured ones.
    pub fn colors(&self) -> Option<&[Rgb]> {
        (self.shape.color_count() > 0).then_some(self.facets.colors.as_slice())
    }

    /// Texture facet, for textured shapes only.
    pub fn texture(&self) -> Option<&TextureMapping> {
        self.facets.texture.as_ref()
    }

    pub fn facets(&self) -> &PacketFacets {
        &self.facets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::tmd::texture::{AlphaBlendRate, ColorDepth};

    fn decode(bytes: &[u8]) -> PrimitivePacket {
        let mut reader = bytes;
        let header = PacketHeader::read(&mut reader).unwrap();
        let shape = header.shape().unwrap();
        let packet = PrimitivePacket::read_payload(header, shape, &mut reader).unwrap();
        assert!(reader.is_empty(), "{} trailing bytes", reader.len());
        packet
    }

    fn encode(packet: &PrimitivePacket) -> Vec<u8> {
        packet.check_writable().unwrap();
        let mut out = Vec::new();
        packet.write(&mut out).unwrap();
        assert_eq!(out.len(), packet.encoded_size());
        out
    }

    #[test]
    fn test_tri_flat_unlit() {
        let bytes = [
            0x04, 0x03, 0x01, 0x21, // header
            0x10, 0x20, 0x30, 0x00, // rgb
            0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x00, 0x00, // p0 p1 p2 pad
        ];
        let packet = decode(&bytes);
        assert_eq!(packet.shape(), PacketShape::TriFlatUnlit);
        assert_eq!(packet.vertices(), &[1, 2, 3]);
        assert_eq!(packet.colors(), Some(&[Rgb::new(0x10, 0x20, 0x30)][..]));
        assert_eq!(packet.normals(), None);
        assert_eq!(packet.texture(), None);
        assert_eq!(encode(&packet), bytes);
    }

    #[test]
    fn test_quad_gradient_textured_unlit_field_order() {
        #[rustfmt::skip]
        let bytes = [
            0x0C, 0x0A, 0x01, 0x3D,
            0x01, 0x02, 0x41, 0x78, // u0 v0 cba
            0x03, 0x04, 0x0D, 0x01, // u1 v1 tsb
            0x05, 0x06, 0x00, 0x00, // u2 v2 pad
            0x07, 0x08, 0x00, 0x00, // u3 v3 pad
            0xFF, 0x00, 0x00, 0x00,
            0x00, 0xFF, 0x00, 0x00,
            0x00, 0x00, 0xFF, 0x00,
            0x80, 0x80, 0x80, 0x00,
            0x0A, 0x00, 0x0B, 0x00, 0x0C, 0x00, 0x0D, 0x00,
        ];
        let packet = decode(&bytes);
        assert_eq!(packet.shape(), PacketShape::QuadGradTexUnlit);
        assert_eq!(packet.vertices(), &[10, 11, 12, 13]);

        let texture = packet.texture().unwrap();
        assert_eq!(texture.uvs, vec![Uv::new(1, 2), Uv::new(3, 4), Uv::new(5, 6), Uv::new(7, 8)]);
        assert_eq!(texture.color_lookup.x(), 1);
        assert_eq!(texture.color_lookup.y(), 0x1E1);
        assert_eq!(texture.page.page(), 0x0D);
        assert_eq!(texture.page.alpha_blend_rate(), AlphaBlendRate::Half);
        assert_eq!(texture.page.color_depth(), Some(ColorDepth::FifteenBit));

        let colors = packet.colors().unwrap();
        assert_eq!(colors.len(), 4);
        assert_eq!(colors[3], Rgb::new(0x80, 0x80, 0x80));
        assert_eq!(encode(&packet), bytes);
    }

    #[test]
    fn test_shaded_lit_interleaves_normals() {
        #[rustfmt::skip]
        let bytes = [
            0x08, 0x05, 0x00, 0x38,
            0x11, 0x22, 0x33, 0x00,
            0x00, 0x00, 0x04, 0x00, // n0 p0
            0x01, 0x00, 0x05, 0x00, // n1 p1
            0x02, 0x00, 0x06, 0x00, // n2 p2
            0x03, 0x00, 0x07, 0x00, // n3 p3
        ];
        let packet = decode(&bytes);
        assert_eq!(packet.shape(), PacketShape::QuadShadedLit);
        assert_eq!(packet.normals(), Some(&[0, 1, 2, 3][..]));
        assert_eq!(packet.vertices(), &[4, 5, 6, 7]);
        assert_eq!(encode(&packet), bytes);
    }

    #[test]
    fn test_lit_textured_has_no_colors() {
        let shape = PacketShape::TriFlatTexLit;
        let payload = vec![0u8; shape.payload_size()];
        let header = PacketHeader::for_shape(shape);
        let packet = PrimitivePacket::read_payload(header, shape, &mut payload.as_slice()).unwrap();
        assert_eq!(packet.colors(), None);
        assert_eq!(packet.normals().map(<[u16]>::len), Some(1));
        assert_eq!(packet.texture().map(|t| t.uvs.len()), Some(3));
    }

    #[test]
    fn test_alpha_blend_bit_does_not_change_shape() {
        for shape in PacketShape::ALL {
            let plain = PacketHeader::new(0, 0, shape.flag(), shape.mode());
            let blended = PacketHeader::new(0, 0, shape.flag(), shape.mode() | PacketMode::ALPHA_BLEND);
            assert_eq!(plain.shape(), Ok(shape));
            assert_eq!(blended.shape(), Ok(shape));
            assert!(blended.mode.is_alpha_blended());
        }
    }

    #[test]
    fn test_unknown_shape_carries_raw_header() {
        let header = PacketHeader::new(0x04, 0x03, 0x01, 0x99);
        let err = header.shape().unwrap_err();
        assert_eq!(err.mode(), 0x99);
        assert_eq!(err.flag(), 0x01);
        assert_eq!(err.header.output_length, 0x04);
        assert_eq!(err.header.input_length, 0x03);
        assert!(err.to_string().contains("0x9901"));
    }

    #[test]
    fn test_canonical_header_lengths() {
        for shape in PacketShape::ALL {
            let header = PacketHeader::for_shape(shape);
            assert_eq!(usize::from(header.input_length) * 4, shape.payload_size(), "{shape}");
            assert_eq!(header.shape(), Ok(shape));
        }
        assert_eq!(PacketHeader::for_shape(PacketShape::QuadFlatTexUnlit).output_length, 9);
    }

    #[test]
    fn test_mode_and_flag_accessors() {
        let mode = PacketMode::from_raw(0x3D);
        assert_eq!(mode.kind(), Some(PrimitiveKind::Polygon));
        assert!(mode.brightness_calculated());
        assert!(mode.is_textured());
        assert!(mode.is_quad());
        assert!(mode.is_gouraud());
        assert!(!mode.is_alpha_blended());
        assert_eq!(PacketMode::from_raw(0x50).kind(), Some(PrimitiveKind::Line));
        assert_eq!(PacketMode::from_raw(0x78).kind(), Some(PrimitiveKind::Sprite));
        assert_eq!(PacketMode::from_raw(0x78).sprite_size(), SpriteSize::Sixteen);
        assert_eq!(PacketMode::from_raw(0x01).kind(), None);

        let flag = PacketFlag::from_raw(0x06);
        assert!(!flag.is_unlit());
        assert!(flag.is_double_sided());
        assert!(flag.is_gradient());
    }

    #[test]
    fn test_mismatched_facets_are_not_writable() {
        let header = PacketHeader::for_shape(PacketShape::LineGrad);
        let facets = PacketFacets { vertices: vec![0, 1], colors: vec![Rgb::default()], ..Default::default() };
        let packet = PrimitivePacket::new(header, facets).unwrap();
        let reason = packet.check_writable().unwrap_err();
        assert!(reason.contains("2 colors"), "{reason}");

        let header = PacketHeader::for_shape(PacketShape::TriFlatTexUnlit);
        let facets = PacketFacets { vertices: vec![0, 1, 2], colors: vec![Rgb::default()], ..Default::default() };
        let packet = PrimitivePacket::new(header, facets).unwrap();
        assert!(packet.check_writable().unwrap_err().contains("texture mapping"));
    }
}
