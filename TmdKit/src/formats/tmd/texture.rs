//! Colour and texture attributes carried by primitive packets
//!
//! The texture page word (TSB) and colour lookup word (CBA) are kept as the
//! raw 16-bit values read from the file. Their sub-fields are only ever
//! derived through masks so a decoded packet writes back the same word.

use glam::Vec3;
use serde::Serialize;

use crate::utils::{extract, merge};

/// An 8-bit-per-channel colour, stored on disk as `r g b pad`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels normalised to `0.0..=1.0`.
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(f32::from(self.r) / 255.0, f32::from(self.g) / 255.0, f32::from(self.b) / 255.0)
    }
}

/// A texture coordinate in texels within the texture page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Uv {
    pub u: u8,
    pub v: u8,
}

impl Uv {
    pub const fn new(u: u8, v: u8) -> Self {
        Self { u, v }
    }
}

/// Semi-transparency blend equation selected by a texture page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AlphaBlendRate {
    /// 50% back + 50% polygon
    Half,
    /// 100% back + 100% polygon
    Add,
    /// 100% back - 100% polygon
    Subtract,
    /// 100% back + 25% polygon
    AddQuarter,
}

impl AlphaBlendRate {
    fn from_bits(bits: u16) -> Self {
        match bits & 0b11 {
            0 => Self::Half,
            1 => Self::Add,
            2 => Self::Subtract,
            _ => Self::AddQuarter,
        }
    }

    fn bits(self) -> u16 {
        match self {
            Self::Half => 0,
            Self::Add => 1,
            Self::Subtract => 2,
            Self::AddQuarter => 3,
        }
    }
}

/// Texel format of a texture page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ColorDepth {
    /// 4-bit indexed, uses a CLUT
    FourBit,
    /// 8-bit indexed, uses a CLUT
    EightBit,
    /// 15-bit direct colour
    FifteenBit,
}

impl ColorDepth {
    fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            0 => Some(Self::FourBit),
            1 => Some(Self::EightBit),
            2 => Some(Self::FifteenBit),
            _ => None,
        }
    }

    fn bits(self) -> u16 {
        match self {
            Self::FourBit => 0,
            Self::EightBit => 1,
            Self::FifteenBit => 2,
        }
    }
}

/// Packed texture page attribute word (TSB).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct TexturePage(u16);

impl TexturePage {
    const PAGE_MASK: u16 = 0b0_0001_1111;
    const RATE_MASK: u16 = 0b0_0110_0000;
    const DEPTH_MASK: u16 = 0b1_1000_0000;

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub fn new(page: u16, rate: AlphaBlendRate, depth: ColorDepth) -> Self {
        let mut raw = merge(0, page, Self::PAGE_MASK, 0);
        raw = merge(raw, rate.bits(), Self::RATE_MASK, 5);
        raw = merge(raw, depth.bits(), Self::DEPTH_MASK, 7);
        Self(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Texture page number (0-31) in VRAM.
    pub fn page(self) -> u16 {
        extract(self.0, Self::PAGE_MASK, 0)
    }

    pub fn alpha_blend_rate(self) -> AlphaBlendRate {
        AlphaBlendRate::from_bits(extract(self.0, Self::RATE_MASK, 5))
    }

    /// Texel format, or `None` for the reserved value 3.
    pub fn color_depth(self) -> Option<ColorDepth> {
        ColorDepth::from_bits(extract(self.0, Self::DEPTH_MASK, 7))
    }
}

/// Packed colour lookup table position (CBA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct ColorLookup(u16);

impl ColorLookup {
    const X_MASK: u16 = 0b0000_0000_0011_1111;
    const Y_MASK: u16 = 0b0111_1111_1100_0000;

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub fn new(x: u16, y: u16) -> Self {
        Self(merge(merge(0, x, Self::X_MASK, 0), y, Self::Y_MASK, 6))
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Horizontal CLUT position in units of 16 pixels.
    pub fn x(self) -> u16 {
        extract(self.0, Self::X_MASK, 0)
    }

    /// CLUT row in VRAM.
    pub fn y(self) -> u16 {
        extract(self.0, Self::Y_MASK, 6)
    }
}

/// Texture facet of a textured packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextureMapping {
    pub color_lookup: ColorLookup,
    pub page: TexturePage,
    /// One coordinate per vertex, in vertex order.
    pub uvs: Vec<Uv>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_page_fields() {
        let page = TexturePage::from_raw(0b1_0100_1101);
        assert_eq!(page.page(), 0b01101);
        assert_eq!(page.alpha_blend_rate(), AlphaBlendRate::Subtract);
        assert_eq!(page.color_depth(), Some(ColorDepth::FifteenBit));
    }

    #[test]
    fn test_texture_page_reserved_depth() {
        assert_eq!(TexturePage::from_raw(0b1_1000_0000).color_depth(), None);
    }

    #[test]
    fn test_texture_page_keeps_unknown_bits() {
        // bits above the depth field are not interpreted but must survive
        let page = TexturePage::from_raw(0xFE15);
        assert_eq!(page.raw(), 0xFE15);
        assert_eq!(page.page(), 0x15);
    }

    #[test]
    fn test_texture_page_builder() {
        let page = TexturePage::new(7, AlphaBlendRate::AddQuarter, ColorDepth::EightBit);
        assert_eq!(page.page(), 7);
        assert_eq!(page.alpha_blend_rate(), AlphaBlendRate::AddQuarter);
        assert_eq!(page.color_depth(), Some(ColorDepth::EightBit));
        assert_eq!(page.raw(), 0b0_1110_0111);
    }

    #[test]
    fn test_color_lookup_fields() {
        let clut = ColorLookup::new(0x3F, 0x1E0);
        assert_eq!(clut.x(), 0x3F);
        assert_eq!(clut.y(), 0x1E0);
        assert_eq!(ColorLookup::from_raw(clut.raw()), clut);
        assert_eq!(ColorLookup::from_raw(0x7840).y(), 0x1E1);
    }

    #[test]
    fn test_rgb_to_vec3() {
        assert_eq!(Rgb::new(255, 0, 51).to_vec3(), Vec3::new(1.0, 0.0, 0.2));
    }
}
