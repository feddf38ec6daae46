//! Packet shape registry
//!
//! A packet never states its own layout. The (mode, flag) byte pair selects
//! one of the 22 shapes below; the alpha-blend option bit of `mode` is ignored
//! because it does not change the layout.
//!
//! Each shape owns a fixed field sequence describing its payload byte for byte,
//! padding included. Decoding and encoding both walk that sequence.

use serde::Serialize;

/// One field of a packet payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    /// `r g b` plus one padding byte
    Color,
    /// u16 index into the object's normal block
    Normal,
    /// u16 index into the object's vertex block
    Vertex,
    /// `u v` byte pair
    Uv,
    /// CLUT word
    ColorLookup,
    /// Texture page word
    TexturePage,
    /// Two padding bytes
    Pad16,
}

impl Field {
    pub(crate) const fn size(self) -> usize {
        match self {
            Field::Color => 4,
            Field::Normal | Field::Vertex | Field::Uv | Field::ColorLookup | Field::TexturePage | Field::Pad16 => 2,
        }
    }
}

use Field::{Color as C, ColorLookup as Cba, Normal as N, Pad16 as Pad, TexturePage as Tsb, Uv, Vertex as V};

// Payload layouts, in file order.
const TRI_FLAT_UNLIT: &[Field] = &[C, V, V, V, Pad];
const TRI_FLAT_TEX_UNLIT: &[Field] = &[Uv, Cba, Uv, Tsb, Uv, Pad, C, V, V, V, Pad];
const TRI_GRAD_UNLIT: &[Field] = &[C, C, C, V, V, V, Pad];
const TRI_GRAD_TEX_UNLIT: &[Field] = &[Uv, Cba, Uv, Tsb, Uv, Pad, C, C, C, V, V, V, Pad];
const TRI_FLAT_LIT: &[Field] = &[C, N, V, V, V];
const TRI_FLAT_GRAD_LIT: &[Field] = &[C, C, C, N, V, V, V];
const TRI_FLAT_TEX_LIT: &[Field] = &[Uv, Cba, Uv, Tsb, Uv, Pad, N, V, V, V];
const TRI_SHADED_LIT: &[Field] = &[C, N, V, N, V, N, V];
const TRI_SHADED_GRAD_LIT: &[Field] = &[C, C, C, N, V, N, V, N, V];
const TRI_SHADED_TEX_LIT: &[Field] = &[Uv, Cba, Uv, Tsb, Uv, Pad, N, V, N, V, N, V];

const QUAD_FLAT_UNLIT: &[Field] = &[C, V, V, V, V];
const QUAD_FLAT_TEX_UNLIT: &[Field] = &[Uv, Cba, Uv, Tsb, Uv, Pad, Uv, Pad, C, V, V, V, V];
const QUAD_GRAD_UNLIT: &[Field] = &[C, C, C, C, V, V, V, V];
const QUAD_GRAD_TEX_UNLIT: &[Field] = &[Uv, Cba, Uv, Tsb, Uv, Pad, Uv, Pad, C, C, C, C, V, V, V, V];
const QUAD_FLAT_LIT: &[Field] = &[C, N, V, V, V, V, Pad];
const QUAD_FLAT_GRAD_LIT: &[Field] = &[C, C, C, C, N, V, V, V, V, Pad];
const QUAD_FLAT_TEX_LIT: &[Field] = &[Uv, Cba, Uv, Tsb, Uv, Pad, Uv, Pad, N, V, V, V, V, Pad];
const QUAD_SHADED_LIT: &[Field] = &[C, N, V, N, V, N, V, N, V];
const QUAD_SHADED_GRAD_LIT: &[Field] = &[C, C, C, C, N, V, N, V, N, V, N, V];
const QUAD_SHADED_TEX_LIT: &[Field] = &[Uv, Cba, Uv, Tsb, Uv, Pad, Uv, Pad, N, V, N, V, N, V, N, V];

const LINE_FLAT: &[Field] = &[C, V, V];
const LINE_GRAD: &[Field] = &[C, C, V, V];

/// The structural layout selected by a packet's (mode, flag) pair.
///
/// Names read as: vertex count, shading, texturing, lighting.
/// "Flat"/"Shaded" refer to one normal vs. one normal per vertex for lit
/// shapes; "Grad" means one colour per vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PacketShape {
    TriFlatUnlit,
    TriFlatTexUnlit,
    TriGradUnlit,
    TriGradTexUnlit,
    TriFlatLit,
    TriFlatGradLit,
    TriFlatTexLit,
    TriShadedLit,
    TriShadedGradLit,
    TriShadedTexLit,
    QuadFlatUnlit,
    QuadFlatTexUnlit,
    QuadGradUnlit,
    QuadGradTexUnlit,
    QuadFlatLit,
    QuadFlatGradLit,
    QuadFlatTexLit,
    QuadShadedLit,
    QuadShadedGradLit,
    QuadShadedTexLit,
    LineFlat,
    LineGrad,
}

impl PacketShape {
    /// Every shape, in table order.
    pub const ALL: [PacketShape; 22] = [
        PacketShape::TriFlatUnlit,
        PacketShape::TriFlatTexUnlit,
        PacketShape::TriGradUnlit,
        PacketShape::TriGradTexUnlit,
        PacketShape::TriFlatLit,
        PacketShape::TriFlatGradLit,
        PacketShape::TriFlatTexLit,
        PacketShape::TriShadedLit,
        PacketShape::TriShadedGradLit,
        PacketShape::TriShadedTexLit,
        PacketShape::QuadFlatUnlit,
        PacketShape::QuadFlatTexUnlit,
        PacketShape::QuadGradUnlit,
        PacketShape::QuadGradTexUnlit,
        PacketShape::QuadFlatLit,
        PacketShape::QuadFlatGradLit,
        PacketShape::QuadFlatTexLit,
        PacketShape::QuadShadedLit,
        PacketShape::QuadShadedGradLit,
        PacketShape::QuadShadedTexLit,
        PacketShape::LineFlat,
        PacketShape::LineGrad,
    ];

    /// Look up a dispatch key (`mode << 8 | flag`, alpha-blend bit cleared).
    pub const fn from_key(key: u16) -> Option<Self> {
        let shape = match key {
            0x2101 => PacketShape::TriFlatUnlit,
            0x2501 => PacketShape::TriFlatTexUnlit,
            0x3101 => PacketShape::TriGradUnlit,
            0x3501 => PacketShape::TriGradTexUnlit,
            0x2000 => PacketShape::TriFlatLit,
            0x2004 => PacketShape::TriFlatGradLit,
            0x2400 => PacketShape::TriFlatTexLit,
            0x3000 => PacketShape::TriShadedLit,
            0x3004 => PacketShape::TriShadedGradLit,
            0x3400 => PacketShape::TriShadedTexLit,
            0x2901 => PacketShape::QuadFlatUnlit,
            0x2D01 => PacketShape::QuadFlatTexUnlit,
            0x3901 => PacketShape::QuadGradUnlit,
            0x3D01 => PacketShape::QuadGradTexUnlit,
            0x2800 => PacketShape::QuadFlatLit,
            0x2804 => PacketShape::QuadFlatGradLit,
            0x2C00 => PacketShape::QuadFlatTexLit,
            0x3800 => PacketShape::QuadShadedLit,
            0x3804 => PacketShape::QuadShadedGradLit,
            0x3C00 => PacketShape::QuadShadedTexLit,
            0x4001 => PacketShape::LineFlat,
            0x5001 => PacketShape::LineGrad,
            _ => return None,
        };
        Some(shape)
    }

    /// The canonical dispatch key of this shape.
    pub const fn key(self) -> u16 {
        match self {
            PacketShape::TriFlatUnlit => 0x2101,
            PacketShape::TriFlatTexUnlit => 0x2501,
            PacketShape::TriGradUnlit => 0x3101,
            PacketShape::TriGradTexUnlit => 0x3501,
            PacketShape::TriFlatLit => 0x2000,
            PacketShape::TriFlatGradLit => 0x2004,
            PacketShape::TriFlatTexLit => 0x2400,
            PacketShape::TriShadedLit => 0x3000,
            PacketShape::TriShadedGradLit => 0x3004,
            PacketShape::TriShadedTexLit => 0x3400,
            PacketShape::QuadFlatUnlit => 0x2901,
            PacketShape::QuadFlatTexUnlit => 0x2D01,
            PacketShape::QuadGradUnlit => 0x3901,
            PacketShape::QuadGradTexUnlit => 0x3D01,
            PacketShape::QuadFlatLit => 0x2800,
            PacketShape::QuadFlatGradLit => 0x2804,
            PacketShape::QuadFlatTexLit => 0x2C00,
            PacketShape::QuadShadedLit => 0x3800,
            PacketShape::QuadShadedGradLit => 0x3804,
            PacketShape::QuadShadedTexLit => 0x3C00,
            PacketShape::LineFlat => 0x4001,
            PacketShape::LineGrad => 0x5001,
        }
    }

    /// Mode byte of this shape with the alpha-blend bit clear.
    pub const fn mode(self) -> u8 {
        (self.key() >> 8) as u8
    }

    pub const fn flag(self) -> u8 {
        (self.key() & 0xFF) as u8
    }

    pub(crate) const fn layout(self) -> &'static [Field] {
        match self {
            PacketShape::TriFlatUnlit => TRI_FLAT_UNLIT,
            PacketShape::TriFlatTexUnlit => TRI_FLAT_TEX_UNLIT,
            PacketShape::TriGradUnlit => TRI_GRAD_UNLIT,
            PacketShape::TriGradTexUnlit => TRI_GRAD_TEX_UNLIT,
            PacketShape::TriFlatLit => TRI_FLAT_LIT,
            PacketShape::TriFlatGradLit => TRI_FLAT_GRAD_LIT,
            PacketShape::TriFlatTexLit => TRI_FLAT_TEX_LIT,
            PacketShape::TriShadedLit => TRI_SHADED_LIT,
            PacketShape::TriShadedGradLit => TRI_SHADED_GRAD_LIT,
            PacketShape::TriShadedTexLit => TRI_SHADED_TEX_LIT,
            PacketShape::QuadFlatUnlit => QUAD_FLAT_UNLIT,
            PacketShape::QuadFlatTexUnlit => QUAD_FLAT_TEX_UNLIT,
            PacketShape::QuadGradUnlit => QUAD_GRAD_UNLIT,
            PacketShape::QuadGradTexUnlit => QUAD_GRAD_TEX_UNLIT,
            PacketShape::QuadFlatLit => QUAD_FLAT_LIT,
            PacketShape::QuadFlatGradLit => QUAD_FLAT_GRAD_LIT,
            PacketShape::QuadFlatTexLit => QUAD_FLAT_TEX_LIT,
            PacketShape::QuadShadedLit => QUAD_SHADED_LIT,
            PacketShape::QuadShadedGradLit => QUAD_SHADED_GRAD_LIT,
            PacketShape::QuadShadedTexLit => QUAD_SHADED_TEX_LIT,
            PacketShape::LineFlat => LINE_FLAT,
            PacketShape::LineGrad => LINE_GRAD,
        }
    }

    fn count(self, wanted: Field) -> usize {
        self.layout().iter().filter(|&&field| field == wanted).count()
    }

    /// Number of vertex indices (2 for lines, 3 for triangles, 4 for quads).
    pub fn vertex_count(self) -> usize {
        self.count(Field::Vertex)
    }

    /// Number of normal indices; zero for unlit shapes.
    pub fn normal_count(self) -> usize {
        self.count(Field::Normal)
    }

    /// Number of RGB colours; zero for lit textured shapes.
    pub fn color_count(self) -> usize {
        self.count(Field::Color)
    }

    pub fn is_textured(self) -> bool {
        self.count(Field::TexturePage) == 1
    }

    pub fn is_lit(self) -> bool {
        self.normal_count() > 0
    }

    /// Payload size in bytes, excluding the 4-byte packet header.
    pub fn payload_size(self) -> usize {
        self.layout().iter().map(|field| field.size()).sum()
    }
}

impl std::fmt::Display for PacketShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_table_is_bijective() {
        for shape in PacketShape::ALL {
            assert_eq!(PacketShape::from_key(shape.key()), Some(shape));
        }
        let mut keys: Vec<u16> = PacketShape::ALL.iter().map(|s| s.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), 22);
    }

    #[test]
    fn test_unlisted_keys_are_rejected() {
        let listed: Vec<u16> = PacketShape::ALL.iter().map(|s| s.key()).collect();
        for key in 0..=u16::MAX {
            if !listed.contains(&key) {
                assert_eq!(PacketShape::from_key(key), None, "key {key:#06x}");
            }
        }
    }

    #[test]
    fn test_capabilities_match_table() {
        // (shape, vertices, normals, colors, textured)
        let table = [
            (PacketShape::TriFlatUnlit, 3, 0, 1, false),
            (PacketShape::TriFlatTexUnlit, 3, 0, 1, true),
            (PacketShape::TriGradUnlit, 3, 0, 3, false),
            (PacketShape::TriGradTexUnlit, 3, 0, 3, true),
            (PacketShape::TriFlatLit, 3, 1, 1, false),
            (PacketShape::TriFlatGradLit, 3, 1, 3, false),
            (PacketShape::TriFlatTexLit, 3, 1, 0, true),
            (PacketShape::TriShadedLit, 3, 3, 1, false),
            (PacketShape::TriShadedGradLit, 3, 3, 3, false),
            (PacketShape::TriShadedTexLit, 3, 3, 0, true),
            (PacketShape::QuadFlatUnlit, 4, 0, 1, false),
            (PacketShape::QuadFlatTexUnlit, 4, 0, 1, true),
            (PacketShape::QuadGradUnlit, 4, 0, 4, false),
            (PacketShape::QuadGradTexUnlit, 4, 0, 4, true),
            (PacketShape::QuadFlatLit, 4, 1, 1, false),
            (PacketShape::QuadFlatGradLit, 4, 1, 4, false),
            (PacketShape::QuadFlatTexLit, 4, 1, 0, true),
            (PacketShape::QuadShadedLit, 4, 4, 1, false),
            (PacketShape::QuadShadedGradLit, 4, 4, 4, false),
            (PacketShape::QuadShadedTexLit, 4, 4, 0, true),
            (PacketShape::LineFlat, 2, 0, 1, false),
            (PacketShape::LineGrad, 2, 0, 2, false),
        ];
        for (shape, vertices, normals, colors, textured) in table {
            assert_eq!(shape.vertex_count(), vertices, "{shape}");
            assert_eq!(shape.normal_count(), normals, "{shape}");
            assert_eq!(shape.color_count(), colors, "{shape}");
            assert_eq!(shape.is_textured(), textured, "{shape}");
            if textured {
                assert_eq!(shape.count(Field::Uv), vertices, "{shape}");
                assert_eq!(shape.count(Field::ColorLookup), 1, "{shape}");
            } else {
                assert_eq!(shape.count(Field::Uv), 0, "{shape}");
            }
        }
    }

    #[test]
    fn test_payload_sizes_are_whole_words() {
        let expected = [
            (PacketShape::TriFlatUnlit, 12),
            (PacketShape::TriFlatTexUnlit, 24),
            (PacketShape::TriGradUnlit, 20),
            (PacketShape::TriGradTexUnlit, 32),
            (PacketShape::TriFlatLit, 12),
            (PacketShape::TriFlatGradLit, 20),
            (PacketShape::TriFlatTexLit, 20),
            (PacketShape::TriShadedLit, 16),
            (PacketShape::TriShadedGradLit, 24),
            (PacketShape::TriShadedTexLit, 24),
            (PacketShape::QuadFlatUnlit, 12),
            (PacketShape::QuadFlatTexUnlit, 28),
            (PacketShape::QuadGradUnlit, 24),
            (PacketShape::QuadGradTexUnlit, 40),
            (PacketShape::QuadFlatLit, 16),
            (PacketShape::QuadFlatGradLit, 28),
            (PacketShape::QuadFlatTexLit, 28),
            (PacketShape::QuadShadedLit, 20),
            (PacketShape::QuadShadedGradLit, 32),
            (PacketShape::QuadShadedTexLit, 32),
            (PacketShape::LineFlat, 8),
            (PacketShape::LineGrad, 12),
        ];
        for (shape, size) in expected {
            assert_eq!(shape.payload_size(), size, "{shape}");
            assert_eq!(shape.payload_size() % 4, 0, "{shape}");
        }
    }

    #[test]
    fn test_mode_and_flag_split() {
        assert_eq!(PacketShape::QuadGradTexUnlit.mode(), 0x3D);
        assert_eq!(PacketShape::QuadGradTexUnlit.flag(), 0x01);
        assert_eq!(PacketShape::TriShadedGradLit.mode(), 0x30);
        assert_eq!(PacketShape::TriShadedGradLit.flag(), 0x04);
    }
}
