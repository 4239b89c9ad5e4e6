// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Offset-addressed big-endian scalar reads and writes.
//!
//! A `Data` value stores scalars at computed offsets inside its inline area
//! and heap buffers, so these helpers address `(buffer, offset)` pairs
//! directly instead of advancing a cursor. No allocation.

use super::{WireError, WireResult};

/// Generate offset-addressed read functions for primitive types.
///
/// Each generated function bounds-checks the access (returning
/// `WireError::ReadFailed` on overflow) and decodes big-endian bytes.
macro_rules! impl_get_be {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(buf: &[u8], ofs: usize) -> WireResult<$type> {
            match buf.get(ofs..ofs + $size) {
                Some(src) => {
                    let mut bytes = [0u8; $size];
                    bytes.copy_from_slice(src);
                    Ok(<$type>::from_be_bytes(bytes))
                }
                None => Err(WireError::ReadFailed {
                    offset: ofs,
                    reason: "buffer too small".into(),
                }),
            }
        }
    };
}

/// Generate offset-addressed write functions for primitive types.
///
/// Each generated function bounds-checks the access (returning
/// `WireError::WriteFailed` on overflow) and encodes big-endian bytes.
macro_rules! impl_set_be {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(buf: &mut [u8], ofs: usize, value: $type) -> WireResult<()> {
            match buf.get_mut(ofs..ofs + $size) {
                Some(dst) => {
                    dst.copy_from_slice(&value.to_be_bytes());
                    Ok(())
                }
                None => Err(WireError::WriteFailed {
                    offset: ofs,
                    reason: "buffer too small".into(),
                }),
            }
        }
    };
}

impl_get_be!(get_i32, i32, 4);
impl_get_be!(get_u32, u32, 4);
impl_get_be!(get_u64, u64, 8);

impl_set_be!(set_i32, i32, 4);
impl_set_be!(set_u32, u32, 4);
impl_set_be!(set_u64, u64, 8);

/// Any nonzero byte reads as `true`.
pub fn get_bool(buf: &[u8], ofs: usize) -> WireResult<bool> {
    match buf.get(ofs) {
        Some(&b) => Ok(b != 0),
        None => Err(WireError::ReadFailed {
            offset: ofs,
            reason: "buffer too small".into(),
        }),
    }
}

pub fn set_bool(buf: &mut [u8], ofs: usize, value: bool) -> WireResult<()> {
    match buf.get_mut(ofs) {
        Some(b) => {
            *b = u8::from(value);
            Ok(())
        }
        None => Err(WireError::WriteFailed {
            offset: ofs,
            reason: "buffer too small".into(),
        }),
    }
}

pub fn get_f64(buf: &[u8], ofs: usize) -> WireResult<f64> {
    Ok(f64::from_bits(get_u64(buf, ofs)?))
}

pub fn set_f64(buf: &mut [u8], ofs: usize, value: f64) -> WireResult<()> {
    set_u64(buf, ofs, value.to_bits())
}

/// Read a complex pair as two consecutive doubles (real, imaginary).
pub fn get_complex(buf: &[u8], ofs: usize) -> WireResult<(f64, f64)> {
    Ok((get_f64(buf, ofs)?, get_f64(buf, ofs + 8)?))
}

/// Write a complex pair as two consecutive doubles (real, imaginary).
pub fn set_complex(buf: &mut [u8], ofs: usize, re: f64, im: f64) -> WireResult<()> {
    set_f64(buf, ofs, re)?;
    set_f64(buf, ofs + 8, im)
}

/// Append a big-endian u32 to a growable output buffer.
pub fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Append a big-endian i32 to a growable output buffer.
pub fn put_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_be_bytes());
}
