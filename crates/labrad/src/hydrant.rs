// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Random legal data for round-trip testing.
//!
//! Given a type, [`random_data`] builds a value with every slot populated
//! by a uniformly random legal value; [`random_type`] draws a random type
//! for breadth. Both terminate on any input: types are finite trees and
//! list dimensions are drawn from a small range.

use crate::data::Data;
use crate::types::Type;

/// Largest random list dimension.
const MAX_DIM: usize = 5;
/// Largest random string/message length.
const MAX_STRING: usize = 16;

const UNIT_CHOICES: [Option<&str>; 4] = [None, Some("m"), Some("m/s"), Some("GHz")];

/// Seed the thread-local generator for reproducible runs.
pub fn seed(value: u64) {
    fastrand::seed(value);
}

/// Produce a value of the given type with every slot assigned.
pub fn random_data(ty: &Type) -> Data {
    let mut inline = vec![0xFF; ty.inline_width()];
    let mut heap = Vec::new();
    fill(ty, &mut inline, 0, &mut heap);
    Data::from_parts(ty.clone(), inline, heap)
}

/// Draw a random type with nesting bounded by `max_depth`.
pub fn random_type(max_depth: usize) -> Type {
    let variants = if max_depth == 0 { 8 } else { 11 };
    match fastrand::usize(..variants) {
        0 => Type::Empty,
        1 => Type::Bool,
        2 => Type::Int,
        3 => Type::Word,
        4 => Type::Time,
        5 => Type::Bytes,
        6 => Type::value(random_units()),
        7 => Type::complex(random_units()),
        8 => Type::list(fastrand::usize(1..=3), random_type(max_depth - 1)),
        9 => {
            let len = fastrand::usize(1..=4);
            Type::cluster((0..len).map(|_| random_type(max_depth - 1)).collect())
        }
        _ => Type::error(random_type(max_depth - 1)),
    }
}

fn random_units() -> Option<&'static str> {
    UNIT_CHOICES[fastrand::usize(..UNIT_CHOICES.len())]
}

/// Write a random value of `ty` into the inline area at `ofs`, appending
/// heap entries in traversal order (the order unflatten allocates them).
fn fill(ty: &Type, buf: &mut [u8], ofs: usize, heap: &mut Vec<Vec<u8>>) {
    match ty {
        Type::Empty => {}
        Type::Bool => buf[ofs] = u8::from(fastrand::bool()),
        Type::Int => put_be(buf, ofs, &fastrand::i32(..).to_be_bytes()),
        Type::Word => put_be(buf, ofs, &fastrand::u32(..).to_be_bytes()),
        Type::Value { .. } => put_be(buf, ofs, &fastrand::f64().to_be_bytes()),
        Type::Complex { .. } => {
            put_be(buf, ofs, &fastrand::f64().to_be_bytes());
            put_be(buf, ofs + 8, &fastrand::f64().to_be_bytes());
        }
        Type::Time => {
            put_be(buf, ofs, &fastrand::u64(..).to_be_bytes());
            let fraction = fastrand::u64(..i64::MAX as u64);
            put_be(buf, ofs + 8, &fraction.to_be_bytes());
        }
        Type::Bytes => alloc(buf, ofs, heap, random_bytes()),
        Type::List { depth, elem } => {
            let mut count = 1usize;
            for j in 0..*depth {
                let dim = fastrand::usize(..=MAX_DIM);
                put_be(buf, ofs + 4 * j, &(dim as i32).to_be_bytes());
                count *= dim;
            }
            let width = elem.inline_width();
            let slot = heap.len();
            put_be(buf, ofs + 4 * depth, &(slot as i32).to_be_bytes());
            heap.push(Vec::new());
            let mut elements = vec![0xFF; width * count];
            for i in 0..count {
                fill(elem, &mut elements, width * i, heap);
            }
            heap[slot] = elements;
        }
        Type::Cluster(info) => {
            for (child, &child_ofs) in info.children.iter().zip(&info.offsets) {
                fill(child, buf, ofs + child_ofs, heap);
            }
        }
        Type::Error { payload } => {
            put_be(buf, ofs, &fastrand::i32(..).to_be_bytes());
            alloc(buf, ofs + 4, heap, random_bytes());
            fill(payload, buf, ofs + 8, heap);
        }
    }
}

fn random_bytes() -> Vec<u8> {
    (0..fastrand::usize(..=MAX_STRING))
        .map(|_| fastrand::u8(..))
        .collect()
}

fn put_be(buf: &mut [u8], ofs: usize, src: &[u8]) {
    buf[ofs..ofs + src.len()].copy_from_slice(src);
}

fn alloc(buf: &mut [u8], ofs: usize, heap: &mut Vec<Vec<u8>>, payload: Vec<u8>) {
    let slot = heap.len();
    put_be(buf, ofs, &(slot as i32).to_be_bytes());
    heap.push(payload);
}
