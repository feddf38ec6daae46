//! PSX GTE fixed-point numbers
//!
//! Both widths use a sign bit, an integral part and a 12-bit mantissa, laid
//! out MSB-first. On disk the words are stored byte-swapped relative to the
//! surrounding little-endian fields, so they are read and written big-endian.
//!
//! | Type | Sign | Integral | Mantissa |
//! | ---- | ---- | -------- | -------- |
//! | [`FixedPoint16`] | bit 15 | bits 12-14 | bits 0-11 |
//! | [`FixedPoint32`] | bit 31 | bits 12-30 | bits 0-11 |
//!
//! Negative values are sign-magnitude: the sign bit only flips the sign of the
//! remaining bits, so `0x8000` is zero rather than the most negative value.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::io::{self, Read, Write};

use super::bits::{extract, merge};

/// Number of mantissa bits shared by both widths.
const DECIMAL_BITS: u32 = 12;

/// Value of the least significant mantissa bit (2^-12).
const UNIT: f32 = 1.0 / (1u32 << DECIMAL_BITS) as f32;

/// 16-bit fixed point: 1 sign, 3 integral, 12 mantissa bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "f32")]
pub struct FixedPoint16(u16);

impl FixedPoint16 {
    const SIGN_MASK: u16 = 0x8000;
    const INTEGRAL_MASK: u16 = 0x7000;
    const DECIMAL_MASK: u16 = 0x0FFF;

    /// Wrap a raw MSB-first word.
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Build a value from its parts. Out-of-range parts are truncated to their field.
    pub fn from_parts(integral: u16, decimal: u16, negative: bool) -> Self {
        let mut raw = merge(0, integral, Self::INTEGRAL_MASK, DECIMAL_BITS);
        raw = merge(raw, decimal, Self::DECIMAL_MASK, 0);
        raw = merge(raw, u16::from(negative), Self::SIGN_MASK, 15);
        Self(raw)
    }

    /// Interpret two bytes in file order.
    pub const fn from_file_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }

    /// The two bytes as they appear in the file.
    pub const fn to_file_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        reader.read_u16::<BigEndian>().map(Self)
    }

    pub fn write<W: Write>(self, writer: &mut W) -> io::Result<()> {
        writer.write_u16::<BigEndian>(self.0)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        extract(self.0, Self::SIGN_MASK, 15) == 1
    }

    pub fn integral_part(self) -> u16 {
        extract(self.0, Self::INTEGRAL_MASK, DECIMAL_BITS)
    }

    pub fn decimal_part(self) -> u16 {
        extract(self.0, Self::DECIMAL_MASK, 0)
    }

    /// Integral and mantissa bits together, without the sign.
    pub fn magnitude(self) -> u16 {
        self.0 & (Self::INTEGRAL_MASK | Self::DECIMAL_MASK)
    }

    pub fn to_f32(self) -> f32 {
        if self.is_negative() {
            // Two's complement of the magnitude, negated back: sign-magnitude decoding.
            let complement = (!i32::from(self.magnitude())).wrapping_add(1);
            -UNIT * -(complement as f32)
        } else {
            UNIT * f32::from(self.0)
        }
    }
}

impl From<FixedPoint16> for f32 {
    fn from(value: FixedPoint16) -> Self {
        value.to_f32()
    }
}

/// 32-bit fixed point: 1 sign, 19 integral, 12 mantissa bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "f32")]
pub struct FixedPoint32(u32);

impl FixedPoint32 {
    const SIGN_MASK: u32 = 0x8000_0000;
    const INTEGRAL_MASK: u32 = 0x7FFF_F000;
    const DECIMAL_MASK: u32 = 0x0000_0FFF;

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Build a value from its parts. Out-of-range parts are truncated to their field.
    pub fn from_parts(integral: u32, decimal: u32, negative: bool) -> Self {
        let mut raw = merge(0, integral, Self::INTEGRAL_MASK, DECIMAL_BITS);
        raw = merge(raw, decimal, Self::DECIMAL_MASK, 0);
        raw = merge(raw, u32::from(negative), Self::SIGN_MASK, 31);
        Self(raw)
    }

    pub const fn from_file_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(bytes))
    }

    pub const fn to_file_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        reader.read_u32::<BigEndian>().map(Self)
    }

    pub fn write<W: Write>(self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<BigEndian>(self.0)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        extract(self.0, Self::SIGN_MASK, 31) == 1
    }

    pub fn integral_part(self) -> u32 {
        extract(self.0, Self::INTEGRAL_MASK, DECIMAL_BITS)
    }

    pub fn decimal_part(self) -> u32 {
        extract(self.0, Self::DECIMAL_MASK, 0)
    }

    pub fn magnitude(self) -> u32 {
        self.0 & (Self::INTEGRAL_MASK | Self::DECIMAL_MASK)
    }

    pub fn to_f32(self) -> f32 {
        if self.is_negative() {
            let complement = (!i64::from(self.magnitude())).wrapping_add(1);
            -UNIT * -(complement as f32)
        } else {
            UNIT * self.0 as f32
        }
    }
}

impl From<FixedPoint32> for f32 {
    fn from(value: FixedPoint32) -> Self {
        value.to_f32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed16_basic_values() {
        assert_eq!(FixedPoint16::from_raw(0x1000).to_f32(), 1.0);
        assert_eq!(FixedPoint16::from_raw(0x0800).to_f32(), 0.5);
        assert_eq!(FixedPoint16::from_raw(0x9000).to_f32(), -1.0);
        assert_eq!(FixedPoint16::from_raw(0x0001).to_f32(), UNIT);
    }

    #[test]
    fn test_fixed16_negative_zero() {
        let value = FixedPoint16::from_raw(0x8000);
        assert!(value.is_negative());
        assert_eq!(value.magnitude(), 0);
        assert_eq!(value.to_f32(), 0.0);
        assert!(value.to_f32().is_finite());
    }

    #[test]
    fn test_fixed16_edge_magnitude() {
        let max = FixedPoint16::from_raw(0x7FFF).to_f32();
        let min = FixedPoint16::from_raw(0xFFFF).to_f32();
        assert_eq!(max, 0x7FFF as f32 * UNIT);
        assert_eq!(min, -max);
    }

    #[test]
    fn test_fixed16_file_bytes_are_swapped() {
        let value = FixedPoint16::from_file_bytes([0x10, 0x00]);
        assert_eq!(value.raw(), 0x1000);
        assert_eq!(value.to_f32(), 1.0);
        assert_eq!(value.to_file_bytes(), [0x10, 0x00]);

        let mut out = Vec::new();
        value.write(&mut out).unwrap();
        assert_eq!(out, vec![0x10, 0x00]);
        assert_eq!(FixedPoint16::read(&mut out.as_slice()).unwrap(), value);
    }

    #[test]
    fn test_fixed16_word_round_trip() {
        for raw in 0..=u16::MAX {
            let value = FixedPoint16::from_file_bytes(raw.to_be_bytes());
            assert_eq!(value.to_file_bytes(), raw.to_be_bytes());
            assert_eq!(value.raw(), raw);
        }
    }

    #[test]
    fn test_fixed16_parts() {
        let value = FixedPoint16::from_parts(2, 0x800, true);
        assert_eq!(value.raw(), 0xA800);
        assert_eq!(value.integral_part(), 2);
        assert_eq!(value.decimal_part(), 0x800);
        assert!(value.is_negative());
        assert_eq!(value.to_f32(), -2.5);
    }

    #[test]
    fn test_fixed32_values() {
        assert_eq!(FixedPoint32::from_raw(0x0000_1000).to_f32(), 1.0);
        assert_eq!(FixedPoint32::from_raw(0x8000_3000).to_f32(), -3.0);
        assert_eq!(FixedPoint32::from_raw(0x8000_0000).to_f32(), 0.0);

        let value = FixedPoint32::from_parts(300, 0x400, false);
        assert_eq!(value.integral_part(), 300);
        assert_eq!(value.decimal_part(), 0x400);
        assert_eq!(value.to_f32(), 300.25);
    }

    #[test]
    fn test_fixed32_word_round_trip() {
        let words = [0u32, 1, 0x0000_0FFF, 0x7FFF_FFFF, 0x8000_0000, 0x8000_0001, 0xDEAD_BEEF, u32::MAX];
        for raw in words {
            let value = FixedPoint32::from_file_bytes(raw.to_be_bytes());
            let mut out = Vec::new();
            value.write(&mut out).unwrap();
            assert_eq!(out, raw.to_be_bytes());
            assert_eq!(FixedPoint32::read(&mut out.as_slice()).unwrap().raw(), raw);
        }
    }
}
