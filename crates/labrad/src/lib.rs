// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # labrad: core data model and wire codec for the LabRAD protocol
//!
//! LabRAD is a client/server protocol for laboratory instrumentation
//! with a LabVIEW-derived, type-tagged data format. This crate is the
//! protocol core: the type language, the dual-representation data value
//! with its bit-exact flatten/unflatten codec, and the packet framing
//! that carries records between peers.
//!
//! ## Quick Start
//!
//! ```rust
//! use labrad::{Context, Data, Packet, Record};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Values are addressed by index paths into their type structure.
//!     let mut point = Data::from_tag("(i, v[GHz])")?;
//!     point.set_int(7, &[0])?;
//!     point.set_value(6.28, &[1])?;
//!
//!     // The codec is byte-exact and self-inverse.
//!     let wire = point.flatten()?;
//!     assert_eq!(Data::unflatten(&wire, point.ty())?, point);
//!
//!     // Frame it for a peer.
//!     let packet = Packet::new(Context::new(1, 1), 42, 1, vec![Record::new(5, point)]);
//!     let mut stream = Vec::new();
//!     packet.write_to(&mut stream)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +------------------------------------------------------------+
//! |                      protocol                              |
//! |        Packet framing: Context + target + Records          |
//! +------------------------------------------------------------+
//! |                        data                                |
//! |   Data value: inline area + heap, typed indexed accessors, |
//! |   flatten/unflatten, views                                 |
//! +------------------------------------------------------------+
//! |          types           |             wire                |
//! |   type tags, widths,     |   big-endian primitives,        |
//! |   cluster offsets        |   cursors, latin-1              |
//! +------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Type`] | A parsed type tag; answers width/offset/units questions |
//! | [`Data`] | An owned value: inline area + heap, O(1) indexed mutation |
//! | [`DataView`] | A borrowed, read-only view of a subtree |
//! | [`Record`] | A setting id paired with its data |
//! | [`Packet`] | The framed unit: context, target, request, records |
//!
//! ## Modules Overview
//!
//! - [`types`] - the type language (parse, print, layout)
//! - [`data`] - data values, accessors, and the flatten/unflatten codec
//! - [`protocol`] - records, contexts, and packet framing
//! - [`hydrant`] - random legal values for round-trip testing
//! - [`wire`] - byte-level primitives
//! - [`logging`] - compile-time configurable logging (feature `logging`)

/// Data values, typed accessors, and the flatten/unflatten codec.
pub mod data;
/// Random legal data generation for round-trip testing.
pub mod hydrant;
/// Compile-time configurable logging (zero-cost when disabled).
pub mod logging;
/// Records, contexts, and packet framing.
pub mod protocol;
/// The type language: tags, widths, offsets.
pub mod types;
/// Big-endian byte primitives and cursors.
pub mod wire;

pub use data::{Complex, Data, DataError, DataView, TimeStamp};
pub use protocol::{Context, Packet, PacketError, Record};
pub use types::{TagParseError, Type, TypeCode};
pub use wire::{WireError, WireResult};
