//! Masked bit-field helpers
//!
//! Every packed value in a TMD (packet mode/flag bytes, texture page and CLUT
//! words, fixed-point numbers) is read and built through these two functions.

use std::ops::{BitAnd, BitXor, Shl, Shr};

/// Unsigned integer widths usable as bit-field containers.
pub trait BitField:
    Copy
    + Eq
    + BitAnd<Output = Self>
    + BitXor<Output = Self>
    + Shl<u32, Output = Self>
    + Shr<u32, Output = Self>
{
}

impl BitField for u8 {}
impl BitField for u16 {}
impl BitField for u32 {}
impl BitField for u64 {}

/// Replace the bits of `original` selected by `mask` with `overwrite << shift`.
///
/// Bits of `overwrite` that land outside `mask` are discarded, bits of
/// `original` outside `mask` are kept.
#[inline]
pub fn merge<T: BitField>(original: T, overwrite: T, mask: T, shift: u32) -> T {
    original ^ ((original ^ (overwrite << shift)) & mask)
}

/// Read the field selected by `mask`, shifted down by `shift`.
#[inline]
pub fn extract<T: BitField>(value: T, mask: T, shift: u32) -> T {
    (value & mask) >> shift
}
