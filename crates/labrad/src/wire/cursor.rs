// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounds-checked read cursor over a byte slice.

use super::{WireError, WireResult};

/// Immutable cursor for decoding (bounds-checked, zero-copy).
pub struct Cursor<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.buffer.len()
    }

    pub fn read_bytes(&mut self, len: usize) -> WireResult<&'a [u8]> {
        match self.buffer.get(self.offset..self.offset + len) {
            Some(slice) => {
                self.offset += len;
                Ok(slice)
            }
            None => Err(WireError::ReadFailed {
                offset: self.offset,
                reason: "unexpected end of buffer".into(),
            }),
        }
    }

    pub fn read_u32_be(&mut self) -> WireResult<u32> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.read_bytes(4)?);
        Ok(u32::from_be_bytes(bytes))
    }

    pub fn read_i32_be(&mut self) -> WireResult<i32> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.read_bytes(4)?);
        Ok(i32::from_be_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_reads_advance() {
        let buf = [0x00, 0x00, 0x00, 0x2A, 0xFF, 0xFF, 0xFF, 0xFE, 0xAB];
        let mut cursor = Cursor::new(&buf);
        assert_eq!(cursor.read_u32_be().expect("read u32 should succeed"), 42);
        assert_eq!(cursor.read_i32_be().expect("read i32 should succeed"), -2);
        assert_eq!(cursor.offset(), 8);
        assert_eq!(cursor.remaining(), 1);
        assert!(!cursor.is_eof());
        assert_eq!(cursor.read_bytes(1).expect("read bytes should succeed"), &[0xAB]);
        assert!(cursor.is_eof());
    }

    #[test]
    fn test_cursor_overflow_reports_offset() {
        let buf = [0u8; 3];
        let mut cursor = Cursor::new(&buf);
        let err = cursor.read_u32_be().unwrap_err();
        match err {
            WireError::ReadFailed { offset, reason } => {
                assert_eq!(offset, 0);
                assert_eq!(reason, "unexpected end of buffer");
            }
            other => panic!("unexpected error {:?}", other),
        }
        // A failed read does not consume input.
        assert_eq!(cursor.remaining(), 3);
    }
}
