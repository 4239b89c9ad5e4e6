// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Byte-level primitives for the LabRAD wire format.
//!
//! All multi-byte values on the wire are big-endian. This module provides
//! offset-addressed reads/writes into byte buffers ([`bytes`]), a
//! bounds-checked read cursor ([`cursor`]), and the ISO-8859-1 string
//! helpers ([`latin1`]) shared by the data and packet codecs.

pub mod bytes;
pub mod cursor;
pub mod latin1;

pub use cursor::Cursor;

use std::fmt;

/// Low-level serialization error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    ReadFailed { offset: usize, reason: String },
    WriteFailed { offset: usize, reason: String },
    InvalidData { reason: String },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::ReadFailed { offset, reason } => {
                write!(f, "read failed at offset {}: {}", offset, reason)
            }
            WireError::WriteFailed { offset, reason } => {
                write!(f, "write failed at offset {}: {}", offset, reason)
            }
            WireError::InvalidData { reason } => write!(f, "invalid data: {}", reason),
        }
    }
}

impl std::error::Error for WireError {}

pub type WireResult<T> = core::result::Result<T, WireError>;
