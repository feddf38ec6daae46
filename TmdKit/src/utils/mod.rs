//! Shared low-level helpers: bit-field masking and PSX fixed-point numbers

pub mod bits;
pub mod fixed_point;

pub use bits::{BitField, extract, merge};
pub use fixed_point::{FixedPoint16, FixedPoint32};
