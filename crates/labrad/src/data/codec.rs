// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Flatten/unflatten: the byte-exact wire codec for data values.
//!
//! Flattening walks the type. Fixed-width subtrees are emitted verbatim
//! from the inline area; strings chase their heap slot and emit a length
//! prefix; lists emit their shape then the element payload (bulk copy for
//! fixed-width elements, per-element recursion otherwise); clusters
//! recurse at precomputed offsets; errors encode as `(i32 code, string
//! message, payload)`. Unflattening is the exact inverse and allocates
//! heap slots in traversal order, so a decode/encode cycle is
//! byte-identical.

use super::{Data, DataError, DataView};
use crate::types::Type;
use crate::wire::{bytes, Cursor, WireError};

impl Data {
    /// Encode this value as a self-contained byte sequence.
    pub fn flatten(&self) -> Result<Vec<u8>, DataError> {
        self.view().flatten()
    }

    /// Decode a value of the given type from `buf`. Trailing bytes are
    /// ignored; framed callers slice their input exactly.
    pub fn unflatten(buf: &[u8], ty: &Type) -> Result<Data, DataError> {
        let mut cursor = Cursor::new(buf);
        Data::unflatten_from(&mut cursor, ty)
    }

    /// Decode a value of the given type from a cursor, consuming exactly
    /// the value's flattened length.
    pub(crate) fn unflatten_from(cursor: &mut Cursor<'_>, ty: &Type) -> Result<Data, DataError> {
        let mut inline = vec![0xFF; ty.inline_width()];
        let mut heap = Vec::new();
        unflatten_into(cursor, ty, &mut inline, 0, &mut heap)?;
        Ok(Data::from_parts(ty.clone(), inline, heap))
    }
}

impl DataView<'_> {
    /// Encode the viewed subtree as a self-contained byte sequence.
    pub fn flatten(&self) -> Result<Vec<u8>, DataError> {
        let mut out = Vec::new();
        flatten_into(&mut out, self.ty, self.buf, self.ofs, self.heap)?;
        Ok(out)
    }
}

fn flatten_into(
    out: &mut Vec<u8>,
    ty: &Type,
    buf: &[u8],
    ofs: usize,
    heap: &[Vec<u8>],
) -> Result<(), DataError> {
    if ty.is_fixed_width() {
        out.extend_from_slice(inline_slice(buf, ofs, ty.inline_width())?);
        return Ok(());
    }
    match ty {
        Type::Bytes => {
            let entry = heap_entry(heap, bytes::get_i32(buf, ofs)?)?;
            bytes::put_u32(out, wire_len(entry.len())?);
            out.extend_from_slice(entry);
        }
        Type::List { depth, elem } => {
            let mut count = 1usize;
            for j in 0..*depth {
                let dim = bytes::get_i32(buf, ofs + 4 * j)?;
                if dim < 0 {
                    return Err(invalid(format!("negative list dimension {}", dim)));
                }
                count = count
                    .checked_mul(dim as usize)
                    .ok_or_else(|| invalid("list size overflow"))?;
            }
            out.extend_from_slice(inline_slice(buf, ofs, 4 * depth)?);
            let entry = heap_entry(heap, bytes::get_i32(buf, ofs + 4 * depth)?)?;
            let width = elem.inline_width();
            if elem.is_fixed_width() {
                let total = width
                    .checked_mul(count)
                    .ok_or_else(|| invalid("list size overflow"))?;
                out.extend_from_slice(inline_slice(entry, 0, total)?);
            } else {
                for i in 0..count {
                    flatten_into(out, elem, entry, width * i, heap)?;
                }
            }
        }
        Type::Cluster(info) => {
            for (child, &child_ofs) in info.children.iter().zip(&info.offsets) {
                flatten_into(out, child, buf, ofs + child_ofs, heap)?;
            }
        }
        Type::Error { payload } => {
            out.extend_from_slice(inline_slice(buf, ofs, 4)?);
            let message = heap_entry(heap, bytes::get_i32(buf, ofs + 4)?)?;
            bytes::put_u32(out, wire_len(message.len())?);
            out.extend_from_slice(message);
            flatten_into(out, payload, buf, ofs + 8, heap)?;
        }
        // Fixed-width variants were handled above.
        _ => {}
    }
    Ok(())
}

fn unflatten_into(
    cursor: &mut Cursor<'_>,
    ty: &Type,
    buf: &mut [u8],
    ofs: usize,
    heap: &mut Vec<Vec<u8>>,
) -> Result<(), DataError> {
    if ty.is_fixed_width() {
        let width = ty.inline_width();
        let src = cursor.read_bytes(width)?;
        inline_slice_mut(buf, ofs, width)?.copy_from_slice(src);
        return Ok(());
    }
    match ty {
        Type::Bytes => {
            let len = cursor.read_u32_be()? as usize;
            let payload = cursor.read_bytes(len)?.to_vec();
            alloc_slot(buf, ofs, heap, payload)?;
        }
        Type::List { depth, elem } => {
            let mut count = 1usize;
            for j in 0..*depth {
                let dim = cursor.read_i32_be()?;
                if dim < 0 {
                    return Err(invalid(format!("negative list dimension {}", dim)));
                }
                bytes::set_i32(buf, ofs + 4 * j, dim)?;
                count = count
                    .checked_mul(dim as usize)
                    .ok_or_else(|| invalid("list size overflow"))?;
            }
            let width = elem.inline_width();
            let total = count
                .checked_mul(width)
                .ok_or_else(|| invalid("list size overflow"))?;
            if elem.is_fixed_width() {
                let payload = cursor.read_bytes(total)?.to_vec();
                bytes::set_i32(buf, ofs + 4 * depth, slot_index(heap)?)?;
                heap.push(payload);
            } else {
                // Every variable-width element flattens to at least four
                // bytes, so an element count beyond the remaining input
                // cannot be honest. Checked before allocating.
                if count > cursor.remaining() {
                    return Err(invalid("list size exceeds input"));
                }
                let slot = heap.len();
                bytes::set_i32(buf, ofs + 4 * depth, slot_index(heap)?)?;
                // Reserve the slot before recursing so nested payloads
                // land on later indices, matching flatten order.
                heap.push(Vec::new());
                let mut elements = vec![0xFF; total];
                for i in 0..count {
                    unflatten_into(cursor, elem, &mut elements, width * i, heap)?;
                }
                heap[slot] = elements;
            }
        }
        Type::Cluster(info) => {
            for (child, &child_ofs) in info.children.iter().zip(&info.offsets) {
                unflatten_into(cursor, child, buf, ofs + child_ofs, heap)?;
            }
        }
        Type::Error { payload } => {
            let code = cursor.read_bytes(4)?;
            inline_slice_mut(buf, ofs, 4)?.copy_from_slice(code);
            let len = cursor.read_u32_be()? as usize;
            let message = cursor.read_bytes(len)?.to_vec();
            alloc_slot(buf, ofs + 4, heap, message)?;
            unflatten_into(cursor, payload, buf, ofs + 8, heap)?;
        }
        // Fixed-width variants were handled above.
        _ => {}
    }
    Ok(())
}

fn alloc_slot(
    buf: &mut [u8],
    ofs: usize,
    heap: &mut Vec<Vec<u8>>,
    payload: Vec<u8>,
) -> Result<(), DataError> {
    bytes::set_i32(buf, ofs, slot_index(heap)?)?;
    heap.push(payload);
    Ok(())
}

fn slot_index(heap: &[Vec<u8>]) -> Result<i32, DataError> {
    i32::try_from(heap.len()).map_err(|_| invalid("heap exhausted"))
}

fn heap_entry(heap: &[Vec<u8>], index: i32) -> Result<&[u8], DataError> {
    if index < 0 {
        return Err(DataError::InvalidHeapSlot { index });
    }
    match heap.get(index as usize) {
        Some(entry) => Ok(entry.as_slice()),
        None => Err(DataError::InvalidHeapSlot { index }),
    }
}

fn inline_slice(buf: &[u8], ofs: usize, len: usize) -> Result<&[u8], DataError> {
    buf.get(ofs..ofs + len).ok_or(DataError::Wire(WireError::ReadFailed {
        offset: ofs,
        reason: "inline area too short".into(),
    }))
}

fn inline_slice_mut(buf: &mut [u8], ofs: usize, len: usize) -> Result<&mut [u8], DataError> {
    buf.get_mut(ofs..ofs + len)
        .ok_or(DataError::Wire(WireError::WriteFailed {
            offset: ofs,
            reason: "inline area too short".into(),
        }))
}

fn wire_len(len: usize) -> Result<u32, DataError> {
    u32::try_from(len).map_err(|_| invalid("payload longer than u32::MAX"))
}

fn invalid(reason: impl Into<String>) -> DataError {
    DataError::Wire(WireError::InvalidData {
        reason: reason.into(),
    })
}
