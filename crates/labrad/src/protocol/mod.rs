// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Records, contexts, and the packet framing layer.
//!
//! A [`Packet`] carries an ordered list of [`Record`]s between peers,
//! addressed by a [`Context`] pair, a target id, and a request id whose
//! sign distinguishes requests, responses, and fire-and-forget messages.

mod packet;

pub use packet::Packet;

use crate::data::{Data, DataError};
use crate::types::TagParseError;
use std::fmt;
use std::io;

/// Conversation endpoint identifier at a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Context {
    pub high: u32,
    pub low: u32,
}

impl Context {
    pub fn new(high: u32, low: u32) -> Self {
        Self { high, low }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.high, self.low)
    }
}

/// A setting id paired with the data carrying its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: u32,
    pub data: Data,
}

impl Record {
    pub fn new(id: u32, data: Data) -> Self {
        Self { id, data }
    }
}

/// Errors raised by the packet codec.
#[derive(Debug)]
pub enum PacketError {
    Io(io::Error),
    /// A record carried a malformed type tag.
    Tag(TagParseError),
    /// A record payload failed to flatten or unflatten.
    Data(DataError),
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketError::Io(err) => write!(f, "packet i/o failed: {}", err),
            PacketError::Tag(err) => write!(f, "bad record tag: {}", err),
            PacketError::Data(err) => write!(f, "bad record payload: {}", err),
        }
    }
}

impl std::error::Error for PacketError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PacketError::Io(err) => Some(err),
            PacketError::Tag(err) => Some(err),
            PacketError::Data(err) => Some(err),
        }
    }
}

impl From<io::Error> for PacketError {
    fn from(err: io::Error) -> Self {
        PacketError::Io(err)
    }
}

impl From<TagParseError> for PacketError {
    fn from(err: TagParseError) -> Self {
        PacketError::Tag(err)
    }
}

impl From<DataError> for PacketError {
    fn from(err: DataError) -> Self {
        PacketError::Data(err)
    }
}

impl From<crate::wire::WireError> for PacketError {
    fn from(err: crate::wire::WireError) -> Self {
        PacketError::Data(DataError::Wire(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_display() {
        assert_eq!(Context::new(1, 2).to_string(), "(1,2)");
        assert_eq!(Context::default(), Context::new(0, 0));
    }

    #[test]
    fn test_record_equality() {
        let a = Record::new(7, Data::from_tag("i").expect("tag should parse"));
        let b = Record::new(7, Data::from_tag("i").expect("tag should parse"));
        assert_eq!(a, b);
        let c = Record::new(8, Data::from_tag("i").expect("tag should parse"));
        assert_ne!(a, c);
    }
}
