// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The LabRAD data value.
//!
//! A [`Data`] pairs a [`Type`] with storage split in two parts:
//!
//! - the **inline area**: a fixed-size buffer of `type.inline_width()`
//!   bytes holding scalars and, for variable-width slots, i32 heap indices;
//! - the **heap**: a side table of byte buffers holding variable-length
//!   payloads (string bytes, list element buffers).
//!
//! The split is what makes indexed mutation O(1): setting element
//! `[3][1]` of a list never re-encodes its neighbours. The inline area is
//! filled with `0xFF` on construction, so an unwritten variable-width slot
//! reads as `-1` ("unassigned"); bulk-zeroing the inline area would break
//! that contract.
//!
//! Indexing with [`Data::get_data`] yields a borrowed, read-only
//! [`DataView`] over the same storage. Mutation goes through `&mut self`
//! setters addressed by index paths, so the borrow checker rules out
//! concurrent writes through aliased views.

mod codec;
mod time;

pub use time::{TimeStamp, EPOCH_DELTA_SECONDS};

use crate::types::{TagParseError, Type, TypeCode};
use crate::wire::{bytes, latin1, WireError};
use std::fmt;

/// A complex number as carried by the `c` type: two doubles.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

/// Errors raised by data navigation, accessors, and the codec.
#[derive(Debug, Clone, PartialEq)]
pub enum DataError {
    /// The subtype at `path` is not the requested variant.
    TypeMismatch {
        expected: TypeCode,
        found: TypeCode,
        path: Vec<usize>,
    },
    /// Tried to index into a non-composite type.
    NonIndexable { code: TypeCode },
    /// Too few indices to finish a list shape walk.
    PartialIndex { depth: usize, consumed: usize },
    /// `set_array_shape` got the wrong number of dimensions.
    ShapeMismatch { expected: usize, got: usize },
    IndexOutOfBounds { index: usize, length: usize },
    /// A variable-width slot holds `-1` (unassigned) or points outside
    /// the heap.
    InvalidHeapSlot { index: i32 },
    /// A string contains a character outside ISO-8859-1.
    Encoding { ch: char },
    /// Truncated or inconsistent bytes during flatten/unflatten.
    Wire(WireError),
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::TypeMismatch {
                expected,
                found,
                path,
            } => write!(
                f,
                "type mismatch at {:?}: expecting {}, found {}",
                path, expected, found
            ),
            DataError::NonIndexable { code } => write!(f, "cannot index into {}", code),
            DataError::PartialIndex { depth, consumed } => write!(
                f,
                "not enough indices for list: got {} of {} dimensions",
                consumed, depth
            ),
            DataError::ShapeMismatch { expected, got } => write!(
                f,
                "shape has {} dimensions but the list has {}",
                got, expected
            ),
            DataError::IndexOutOfBounds { index, length } => {
                write!(f, "index {} out of bounds for length {}", index, length)
            }
            DataError::InvalidHeapSlot { index } => write!(f, "invalid heap slot {}", index),
            DataError::Encoding { ch } => {
                write!(f, "character {:?} is outside ISO-8859-1", ch)
            }
            DataError::Wire(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for DataError {}

impl From<WireError> for DataError {
    fn from(err: WireError) -> Self {
        DataError::Wire(err)
    }
}

/// Resolved storage location of a subtree's inline area: either within
/// the root buffer or within a heap entry.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Spot {
    Inline(usize),
    Heap { slot: usize, ofs: usize },
}

impl Spot {
    fn at(self, delta: usize) -> Spot {
        match self {
            Spot::Inline(ofs) => Spot::Inline(ofs + delta),
            Spot::Heap { slot, ofs } => Spot::Heap {
                slot,
                ofs: ofs + delta,
            },
        }
    }
}

fn spot_slice<'h>(spot: Spot, root: &'h [u8], heap: &'h [Vec<u8>]) -> (&'h [u8], usize) {
    match spot {
        Spot::Inline(ofs) => (root, ofs),
        Spot::Heap { slot, ofs } => (heap[slot].as_slice(), ofs),
    }
}

/// Walk an index path from `ty` at `base`, resolving the addressed
/// subtype and its storage location.
///
/// A cluster index selects a child at its precomputed offset. A list
/// index opens a shape walk: `depth` consecutive indices are consumed,
/// the heap buffer is entered, and the element offset is computed
/// row-major. Anything else is non-indexable.
fn locate<'t>(
    root_ty: &'t Type,
    root_buf: &[u8],
    base: usize,
    heap: &[Vec<u8>],
    indices: &[usize],
) -> Result<(&'t Type, Spot), DataError> {
    let mut ty = root_ty;
    let mut spot = Spot::Inline(base);
    let mut depth = 0usize;
    let mut dims_left = 0usize;
    let mut shape: Vec<usize> = Vec::new();
    let mut picked: Vec<usize> = Vec::new();

    for &index in indices {
        match ty {
            Type::List { depth: d, elem } => {
                if dims_left == 0 {
                    depth = *d;
                    shape.clear();
                    picked.clear();
                    let (buf, ofs) = spot_slice(spot, root_buf, heap);
                    for j in 0..depth {
                        let dim = bytes::get_i32(buf, ofs + 4 * j)?;
                        if dim < 0 {
                            return Err(DataError::Wire(WireError::InvalidData {
                                reason: format!("negative list dimension {}", dim),
                            }));
                        }
                        shape.push(dim as usize);
                    }
                    let slot = bytes::get_i32(buf, ofs + 4 * depth)?;
                    if slot < 0 || slot as usize >= heap.len() {
                        return Err(DataError::InvalidHeapSlot { index: slot });
                    }
                    spot = Spot::Heap {
                        slot: slot as usize,
                        ofs: 0,
                    };
                    dims_left = depth;
                }
                let dim_pos = depth - dims_left;
                if index >= shape[dim_pos] {
                    return Err(DataError::IndexOutOfBounds {
                        index,
                        length: shape[dim_pos],
                    });
                }
                picked.push(index);
                dims_left -= 1;
                if dims_left == 0 {
                    let elem_ty = elem.as_ref();
                    let width = elem_ty.inline_width();
                    let mut ofs = 0usize;
                    let mut stride = 1usize;
                    for dim in (0..depth).rev() {
                        ofs += width * picked[dim] * stride;
                        stride *= shape[dim];
                    }
                    spot = spot.at(ofs);
                    ty = elem_ty;
                }
            }
            Type::Cluster(info) => {
                if index >= info.children.len() {
                    return Err(DataError::IndexOutOfBounds {
                        index,
                        length: info.children.len(),
                    });
                }
                spot = spot.at(info.offsets[index]);
                ty = &info.children[index];
            }
            other => {
                return Err(DataError::NonIndexable { code: other.code() });
            }
        }
    }
    if dims_left != 0 {
        return Err(DataError::PartialIndex {
            depth,
            consumed: depth - dims_left,
        });
    }
    Ok((ty, spot))
}

/// An owned LabRAD value.
///
/// Constructed empty (all variable-width slots unassigned) by
/// [`Data::new`], or decoded from wire bytes by [`Data::unflatten`].
/// `Clone` deep-copies both the inline area and the heap.
#[derive(Debug, Clone, PartialEq)]
pub struct Data {
    ty: Type,
    bytes: Vec<u8>,
    heap: Vec<Vec<u8>>,
}

impl Data {
    /// Create a value of the given type with every slot unassigned.
    pub fn new(ty: &Type) -> Data {
        Data {
            ty: ty.clone(),
            bytes: vec![0xFF; ty.inline_width()],
            heap: Vec::new(),
        }
    }

    /// Create a value from a type tag.
    pub fn from_tag(tag: &str) -> Result<Data, TagParseError> {
        Ok(Data::new(&Type::parse(tag)?))
    }

    pub(crate) fn from_parts(ty: Type, bytes: Vec<u8>, heap: Vec<Vec<u8>>) -> Data {
        Data { ty, bytes, heap }
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// The type tag of this value.
    pub fn tag(&self) -> String {
        self.ty.tag()
    }

    /// A read-only view of the whole value.
    pub fn view(&self) -> DataView<'_> {
        DataView {
            ty: &self.ty,
            buf: &self.bytes,
            ofs: 0,
            heap: &self.heap,
        }
    }

    /// A read-only view of the subtree at `indices`. The view shares this
    /// value's storage and cannot outlive it.
    pub fn get_data(&self, indices: &[usize]) -> Result<DataView<'_>, DataError> {
        self.view().get_data(indices)
    }

    pub fn is_empty(&self) -> bool {
        self.ty.code() == TypeCode::Empty
    }

    pub fn pretty(&self) -> String {
        self.view().pretty()
    }

    // Typed getters (delegating to the view).

    pub fn is_bool(&self, indices: &[usize]) -> bool {
        self.view().is_bool(indices)
    }

    pub fn get_bool(&self, indices: &[usize]) -> Result<bool, DataError> {
        self.view().get_bool(indices)
    }

    pub fn is_int(&self, indices: &[usize]) -> bool {
        self.view().is_int(indices)
    }

    pub fn get_int(&self, indices: &[usize]) -> Result<i32, DataError> {
        self.view().get_int(indices)
    }

    pub fn is_word(&self, indices: &[usize]) -> bool {
        self.view().is_word(indices)
    }

    pub fn get_word(&self, indices: &[usize]) -> Result<u32, DataError> {
        self.view().get_word(indices)
    }

    pub fn is_value(&self, indices: &[usize]) -> bool {
        self.view().is_value(indices)
    }

    pub fn get_value(&self, indices: &[usize]) -> Result<f64, DataError> {
        self.view().get_value(indices)
    }

    pub fn is_complex(&self, indices: &[usize]) -> bool {
        self.view().is_complex(indices)
    }

    pub fn get_complex(&self, indices: &[usize]) -> Result<Complex, DataError> {
        self.view().get_complex(indices)
    }

    pub fn is_time(&self, indices: &[usize]) -> bool {
        self.view().is_time(indices)
    }

    pub fn get_time(&self, indices: &[usize]) -> Result<TimeStamp, DataError> {
        self.view().get_time(indices)
    }

    pub fn is_bytes(&self, indices: &[usize]) -> bool {
        self.view().is_bytes(indices)
    }

    pub fn get_bytes(&self, indices: &[usize]) -> Result<&[u8], DataError> {
        self.view().get_bytes(indices)
    }

    /// ISO-8859-1 decoding of the bytes at `indices`. The byte accessors
    /// are the canonical path; this is a convenience.
    pub fn get_string(&self, indices: &[usize]) -> Result<String, DataError> {
        self.view().get_string(indices)
    }

    pub fn has_units(&self, indices: &[usize]) -> bool {
        self.view().has_units(indices)
    }

    pub fn get_units(&self, indices: &[usize]) -> Result<Option<&str>, DataError> {
        self.view().get_units(indices)
    }

    pub fn is_array(&self, indices: &[usize]) -> bool {
        self.view().is_array(indices)
    }

    pub fn get_array_shape(&self, indices: &[usize]) -> Result<Vec<usize>, DataError> {
        self.view().get_array_shape(indices)
    }

    pub fn get_array_size(&self, indices: &[usize]) -> Result<usize, DataError> {
        self.view().get_array_size(indices)
    }

    pub fn is_cluster(&self, indices: &[usize]) -> bool {
        self.view().is_cluster(indices)
    }

    pub fn get_cluster_size(&self, indices: &[usize]) -> Result<usize, DataError> {
        self.view().get_cluster_size(indices)
    }

    pub fn is_error(&self, indices: &[usize]) -> bool {
        self.view().is_error(indices)
    }

    pub fn get_error_code(&self, indices: &[usize]) -> Result<i32, DataError> {
        self.view().get_error_code(indices)
    }

    pub fn get_error_message(&self, indices: &[usize]) -> Result<String, DataError> {
        self.view().get_error_message(indices)
    }

    pub fn get_error_payload(&self, indices: &[usize]) -> Result<DataView<'_>, DataError> {
        self.view().get_error_payload(indices)
    }

    // Typed setters. All are O(1) for fixed-width scalars and chainable.

    pub fn set_bool(&mut self, value: bool, indices: &[usize]) -> Result<&mut Data, DataError> {
        let (_, spot) = self.resolve(TypeCode::Bool, indices)?;
        self.write(spot, |buf, ofs| bytes::set_bool(buf, ofs, value))?;
        Ok(self)
    }

    pub fn set_int(&mut self, value: i32, indices: &[usize]) -> Result<&mut Data, DataError> {
        let (_, spot) = self.resolve(TypeCode::Int, indices)?;
        self.write(spot, |buf, ofs| bytes::set_i32(buf, ofs, value))?;
        Ok(self)
    }

    pub fn set_word(&mut self, value: u32, indices: &[usize]) -> Result<&mut Data, DataError> {
        let (_, spot) = self.resolve(TypeCode::Word, indices)?;
        self.write(spot, |buf, ofs| bytes::set_u32(buf, ofs, value))?;
        Ok(self)
    }

    pub fn set_value(&mut self, value: f64, indices: &[usize]) -> Result<&mut Data, DataError> {
        let (_, spot) = self.resolve(TypeCode::Value, indices)?;
        self.write(spot, |buf, ofs| bytes::set_f64(buf, ofs, value))?;
        Ok(self)
    }

    pub fn set_complex(
        &mut self,
        value: Complex,
        indices: &[usize],
    ) -> Result<&mut Data, DataError> {
        let (_, spot) = self.resolve(TypeCode::Complex, indices)?;
        self.write(spot, |buf, ofs| bytes::set_complex(buf, ofs, value.re, value.im))?;
        Ok(self)
    }

    /// Seconds land in the first u64 word, the fraction in the second.
    pub fn set_time(&mut self, value: TimeStamp, indices: &[usize]) -> Result<&mut Data, DataError> {
        let (_, spot) = self.resolve(TypeCode::Time, indices)?;
        self.write(spot, |buf, ofs| bytes::set_u64(buf, ofs, value.seconds))?;
        self.write(spot.at(8), |buf, ofs| bytes::set_u64(buf, ofs, value.fraction))?;
        Ok(self)
    }

    /// Store bytes at `indices`. Re-setting an already assigned slot
    /// overwrites its heap entry in place, so the heap never grows under
    /// repeated writes to the same cell.
    pub fn set_bytes(&mut self, value: &[u8], indices: &[usize]) -> Result<&mut Data, DataError> {
        let (_, spot) = self.resolve(TypeCode::Bytes, indices)?;
        self.set_heap_entry(spot, value.to_vec())?;
        Ok(self)
    }

    /// ISO-8859-1 convenience over [`Data::set_bytes`].
    pub fn set_string(&mut self, value: &str, indices: &[usize]) -> Result<&mut Data, DataError> {
        let encoded = latin1::string_to_bytes(value).map_err(|ch| DataError::Encoding { ch })?;
        let (_, spot) = self.resolve(TypeCode::Bytes, indices)?;
        self.set_heap_entry(spot, encoded)?;
        Ok(self)
    }

    /// Shape a one-dimensional list.
    pub fn set_array_size(&mut self, size: usize, indices: &[usize]) -> Result<&mut Data, DataError> {
        self.set_array_shape(&[size], indices)
    }

    /// Write a list's shape and allocate its element buffer, with every
    /// element slot unassigned. `shape.len()` must equal the list depth.
    pub fn set_array_shape(
        &mut self,
        shape: &[usize],
        indices: &[usize],
    ) -> Result<&mut Data, DataError> {
        let (ty, spot) = self.resolve(TypeCode::List, indices)?;
        let (depth, elem) = match &ty {
            Type::List { depth, elem } => (*depth, elem.as_ref().clone()),
            _ => return Err(DataError::NonIndexable { code: ty.code() }),
        };
        if shape.len() != depth {
            return Err(DataError::ShapeMismatch {
                expected: depth,
                got: shape.len(),
            });
        }
        let mut count = 1usize;
        for (j, &dim) in shape.iter().enumerate() {
            let dim_i32 = i32::try_from(dim).map_err(|_| {
                DataError::Wire(WireError::InvalidData {
                    reason: format!("list dimension {} out of range", dim),
                })
            })?;
            self.write(spot.at(4 * j), |buf, ofs| bytes::set_i32(buf, ofs, dim_i32))?;
            count = count.checked_mul(dim).ok_or(DataError::Wire(WireError::InvalidData {
                reason: "list size overflow".into(),
            }))?;
        }
        let len = elem.inline_width().checked_mul(count).ok_or(DataError::Wire(
            WireError::InvalidData {
                reason: "list size overflow".into(),
            },
        ))?;
        self.set_heap_entry(spot.at(4 * depth), vec![0xFF; len])?;
        Ok(self)
    }

    /// Write an error's code and message. The payload, if any, is set
    /// through its own accessors on [`Data::get_error_payload`]'s path.
    pub fn set_error(
        &mut self,
        code: i32,
        message: &str,
        indices: &[usize],
    ) -> Result<&mut Data, DataError> {
        let encoded = latin1::string_to_bytes(message).map_err(|ch| DataError::Encoding { ch })?;
        let (_, spot) = self.resolve(TypeCode::Error, indices)?;
        self.write(spot, |buf, ofs| bytes::set_i32(buf, ofs, code))?;
        self.set_heap_entry(spot.at(4), encoded)?;
        Ok(self)
    }

    // Internal plumbing.

    fn resolve(&self, expected: TypeCode, indices: &[usize]) -> Result<(Type, Spot), DataError> {
        let (ty, spot) = locate(&self.ty, &self.bytes, 0, &self.heap, indices)?;
        if ty.code() != expected {
            return Err(DataError::TypeMismatch {
                expected,
                found: ty.code(),
                path: indices.to_vec(),
            });
        }
        Ok((ty.clone(), spot))
    }

    fn write<F>(&mut self, spot: Spot, op: F) -> Result<(), DataError>
    where
        F: FnOnce(&mut [u8], usize) -> Result<(), WireError>,
    {
        match spot {
            Spot::Inline(ofs) => op(&mut self.bytes, ofs),
            Spot::Heap { slot, ofs } => op(&mut self.heap[slot], ofs),
        }
        .map_err(DataError::from)
    }

    fn read_slot(&self, spot: Spot) -> Result<i32, DataError> {
        let (buf, ofs) = spot_slice(spot, &self.bytes, &self.heap);
        Ok(bytes::get_i32(buf, ofs)?)
    }

    /// Store a heap payload for the variable-width slot at `spot`,
    /// reusing the existing entry when the slot is already assigned.
    fn set_heap_entry(&mut self, spot: Spot, payload: Vec<u8>) -> Result<(), DataError> {
        let current = self.read_slot(spot)?;
        if current < 0 {
            let index = i32::try_from(self.heap.len()).map_err(|_| {
                DataError::Wire(WireError::InvalidData {
                    reason: "heap exhausted".into(),
                })
            })?;
            self.write(spot, |buf, ofs| bytes::set_i32(buf, ofs, index))?;
            self.heap.push(payload);
        } else {
            let slot = current as usize;
            if slot >= self.heap.len() {
                return Err(DataError::InvalidHeapSlot { index: current });
            }
            self.heap[slot] = payload;
        }
        Ok(())
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty())
    }
}

/// A read-only view into a subtree of a [`Data`]'s storage.
///
/// Views share the owner's buffers and are `Copy`; they cannot outlive
/// the owner and cannot mutate through it.
#[derive(Debug, Clone, Copy)]
pub struct DataView<'a> {
    ty: &'a Type,
    buf: &'a [u8],
    ofs: usize,
    heap: &'a [Vec<u8>],
}

impl<'a> DataView<'a> {
    pub fn ty(&self) -> &'a Type {
        self.ty
    }

    pub fn tag(&self) -> String {
        self.ty.tag()
    }

    pub fn get_data(&self, indices: &[usize]) -> Result<DataView<'a>, DataError> {
        let (ty, spot) = self.locate(indices)?;
        let (buf, ofs) = spot_slice(spot, self.buf, self.heap);
        Ok(DataView {
            ty,
            buf,
            ofs,
            heap: self.heap,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.ty.code() == TypeCode::Empty
    }

    pub fn is_bool(&self, indices: &[usize]) -> bool {
        self.code_at(indices) == Some(TypeCode::Bool)
    }

    pub fn get_bool(&self, indices: &[usize]) -> Result<bool, DataError> {
        let (buf, ofs) = self.expect(TypeCode::Bool, indices)?;
        Ok(bytes::get_bool(buf, ofs)?)
    }

    pub fn is_int(&self, indices: &[usize]) -> bool {
        self.code_at(indices) == Some(TypeCode::Int)
    }

    pub fn get_int(&self, indices: &[usize]) -> Result<i32, DataError> {
        let (buf, ofs) = self.expect(TypeCode::Int, indices)?;
        Ok(bytes::get_i32(buf, ofs)?)
    }

    pub fn is_word(&self, indices: &[usize]) -> bool {
        self.code_at(indices) == Some(TypeCode::Word)
    }

    pub fn get_word(&self, indices: &[usize]) -> Result<u32, DataError> {
        let (buf, ofs) = self.expect(TypeCode::Word, indices)?;
        Ok(bytes::get_u32(buf, ofs)?)
    }

    pub fn is_value(&self, indices: &[usize]) -> bool {
        self.code_at(indices) == Some(TypeCode::Value)
    }

    pub fn get_value(&self, indices: &[usize]) -> Result<f64, DataError> {
        let (buf, ofs) = self.expect(TypeCode::Value, indices)?;
        Ok(bytes::get_f64(buf, ofs)?)
    }

    pub fn is_complex(&self, indices: &[usize]) -> bool {
        self.code_at(indices) == Some(TypeCode::Complex)
    }

    pub fn get_complex(&self, indices: &[usize]) -> Result<Complex, DataError> {
        let (buf, ofs) = self.expect(TypeCode::Complex, indices)?;
        let (re, im) = bytes::get_complex(buf, ofs)?;
        Ok(Complex::new(re, im))
    }

    pub fn is_time(&self, indices: &[usize]) -> bool {
        self.code_at(indices) == Some(TypeCode::Time)
    }

    pub fn get_time(&self, indices: &[usize]) -> Result<TimeStamp, DataError> {
        let (buf, ofs) = self.expect(TypeCode::Time, indices)?;
        let seconds = bytes::get_u64(buf, ofs)?;
        let fraction = bytes::get_u64(buf, ofs + 8)?;
        Ok(TimeStamp::new(seconds, fraction))
    }

    pub fn is_bytes(&self, indices: &[usize]) -> bool {
        self.code_at(indices) == Some(TypeCode::Bytes)
    }

    pub fn get_bytes(&self, indices: &[usize]) -> Result<&'a [u8], DataError> {
        let (buf, ofs) = self.expect(TypeCode::Bytes, indices)?;
        let slot = bytes::get_i32(buf, ofs)?;
        self.heap_entry(slot)
    }

    pub fn get_string(&self, indices: &[usize]) -> Result<String, DataError> {
        Ok(latin1::bytes_to_string(self.get_bytes(indices)?))
    }

    pub fn has_units(&self, indices: &[usize]) -> bool {
        matches!(self.locate(indices), Ok((ty, _)) if ty.units().is_some())
    }

    pub fn get_units(&self, indices: &[usize]) -> Result<Option<&'a str>, DataError> {
        Ok(self.locate(indices)?.0.units())
    }

    pub fn is_array(&self, indices: &[usize]) -> bool {
        self.code_at(indices) == Some(TypeCode::List)
    }

    pub fn get_array_shape(&self, indices: &[usize]) -> Result<Vec<usize>, DataError> {
        let (ty, spot) = self.locate(indices)?;
        let depth = match ty.depth() {
            Some(depth) => depth,
            None => {
                return Err(DataError::TypeMismatch {
                    expected: TypeCode::List,
                    found: ty.code(),
                    path: indices.to_vec(),
                })
            }
        };
        let (buf, ofs) = spot_slice(spot, self.buf, self.heap);
        let mut shape = Vec::with_capacity(depth);
        for j in 0..depth {
            let dim = bytes::get_i32(buf, ofs + 4 * j)?;
            if dim < 0 {
                return Err(DataError::Wire(WireError::InvalidData {
                    reason: format!("negative list dimension {}", dim),
                }));
            }
            shape.push(dim as usize);
        }
        Ok(shape)
    }

    /// Length of a one-dimensional list; fails with `ShapeMismatch` on
    /// deeper lists (use [`DataView::get_array_shape`]).
    pub fn get_array_size(&self, indices: &[usize]) -> Result<usize, DataError> {
        let shape = self.get_array_shape(indices)?;
        if shape.len() != 1 {
            return Err(DataError::ShapeMismatch {
                expected: 1,
                got: shape.len(),
            });
        }
        Ok(shape[0])
    }

    pub fn is_cluster(&self, indices: &[usize]) -> bool {
        self.code_at(indices) == Some(TypeCode::Cluster)
    }

    pub fn get_cluster_size(&self, indices: &[usize]) -> Result<usize, DataError> {
        let (ty, _) = self.locate(indices)?;
        ty.size().ok_or(DataError::TypeMismatch {
            expected: TypeCode::Cluster,
            found: ty.code(),
            path: indices.to_vec(),
        })
    }

    pub fn is_error(&self, indices: &[usize]) -> bool {
        self.code_at(indices) == Some(TypeCode::Error)
    }

    pub fn get_error_code(&self, indices: &[usize]) -> Result<i32, DataError> {
        let (buf, ofs) = self.expect(TypeCode::Error, indices)?;
        Ok(bytes::get_i32(buf, ofs)?)
    }

    pub fn get_error_message(&self, indices: &[usize]) -> Result<String, DataError> {
        let (buf, ofs) = self.expect(TypeCode::Error, indices)?;
        let slot = bytes::get_i32(buf, ofs + 4)?;
        Ok(latin1::bytes_to_string(self.heap_entry(slot)?))
    }

    /// View of the payload carried by the error at `indices`.
    pub fn get_error_payload(&self, indices: &[usize]) -> Result<DataView<'a>, DataError> {
        let (ty, spot) = self.locate(indices)?;
        let payload = match ty {
            Type::Error { payload } => payload.as_ref(),
            _ => {
                return Err(DataError::TypeMismatch {
                    expected: TypeCode::Error,
                    found: ty.code(),
                    path: indices.to_vec(),
                })
            }
        };
        let (buf, ofs) = spot_slice(spot, self.buf, self.heap);
        Ok(DataView {
            ty: payload,
            buf,
            ofs: ofs + 8,
            heap: self.heap,
        })
    }

    // Internal plumbing.

    fn locate(&self, indices: &[usize]) -> Result<(&'a Type, Spot), DataError> {
        locate(self.ty, self.buf, self.ofs, self.heap, indices)
    }

    fn code_at(&self, indices: &[usize]) -> Option<TypeCode> {
        self.locate(indices).ok().map(|(ty, _)| ty.code())
    }

    fn expect(&self, code: TypeCode, indices: &[usize]) -> Result<(&'a [u8], usize), DataError> {
        let (ty, spot) = self.locate(indices)?;
        if ty.code() != code {
            return Err(DataError::TypeMismatch {
                expected: code,
                found: ty.code(),
                path: indices.to_vec(),
            });
        }
        Ok(spot_slice(spot, self.buf, self.heap))
    }

    fn heap_entry(&self, index: i32) -> Result<&'a [u8], DataError> {
        if index < 0 {
            return Err(DataError::InvalidHeapSlot { index });
        }
        match self.heap.get(index as usize) {
            Some(entry) => Ok(entry.as_slice()),
            None => Err(DataError::InvalidHeapSlot { index }),
        }
    }

    /// Human-readable rendering: `[a, b]` for lists, `(a, b)` for
    /// clusters, quoted strings, ` [units]` suffixes. Total: slots that
    /// were never assigned render as `<unset>`.
    pub fn pretty(&self) -> String {
        match self.ty {
            Type::Empty => String::new(),
            Type::Bool => self
                .get_bool(&[])
                .map(|b| b.to_string())
                .unwrap_or_else(|_| UNSET.into()),
            Type::Int => self
                .get_int(&[])
                .map(|v| v.to_string())
                .unwrap_or_else(|_| UNSET.into()),
            Type::Word => self
                .get_word(&[])
                .map(|v| v.to_string())
                .unwrap_or_else(|_| UNSET.into()),
            Type::Value { units } => match self.get_value(&[]) {
                Ok(v) => with_units(v.to_string(), units),
                Err(_) => UNSET.into(),
            },
            Type::Complex { units } => match self.get_complex(&[]) {
                Ok(c) => {
                    let sign = if c.im >= 0.0 { "+" } else { "" };
                    with_units(format!("{}{}{}", c.re, sign, c.im), units)
                }
                Err(_) => UNSET.into(),
            },
            Type::Time => self
                .get_time(&[])
                .map(|t| t.pretty())
                .unwrap_or_else(|_| UNSET.into()),
            Type::Bytes => self
                .get_string(&[])
                .map(|s| format!("\"{}\"", s))
                .unwrap_or_else(|_| UNSET.into()),
            Type::List { .. } => match self.get_array_shape(&[]) {
                Ok(shape) => {
                    let mut indices = vec![0usize; shape.len()];
                    self.pretty_list(&shape, &mut indices, 0)
                }
                Err(_) => UNSET.into(),
            },
            Type::Cluster(_) => {
                let len = self.ty.size().unwrap_or(0);
                let parts: Vec<String> = (0..len)
                    .map(|i| match self.get_data(&[i]) {
                        Ok(child) => child.pretty(),
                        Err(_) => UNSET.into(),
                    })
                    .collect();
                format!("({})", parts.join(", "))
            }
            Type::Error { .. } => {
                let code = self.get_error_code(&[]);
                let message = self.get_error_message(&[]);
                match (code, message) {
                    (Ok(code), Ok(message)) => format!("Error({}, {})", code, message),
                    _ => UNSET.into(),
                }
            }
        }
    }

    fn pretty_list(&self, shape: &[usize], indices: &mut Vec<usize>, level: usize) -> String {
        let mut parts = Vec::with_capacity(shape[level]);
        for i in 0..shape[level] {
            indices[level] = i;
            if level == shape.len() - 1 {
                parts.push(match self.get_data(indices) {
                    Ok(elem) => elem.pretty(),
                    Err(_) => UNSET.into(),
                });
            } else {
                parts.push(self.pretty_list(shape, indices, level + 1));
            }
        }
        format!("[{}]", parts.join(", "))
    }
}

const UNSET: &str = "<unset>";

fn with_units(body: String, units: &Option<String>) -> String {
    match units {
        Some(u) => format!("{} [{}]", body, u),
        None => body,
    }
}

impl fmt::Display for DataView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_data_is_unassigned() {
        let data = Data::from_tag("s").expect("tag should parse");
        assert_eq!(data.get_bytes(&[]), Err(DataError::InvalidHeapSlot { index: -1 }));
    }

    #[test]
    fn test_scalar_set_get() {
        let mut data = Data::from_tag("biwvc").expect("tag should parse");
        data.set_bool(true, &[0])
            .and_then(|d| d.set_int(-42, &[1]))
            .and_then(|d| d.set_word(0xDEAD_BEEF, &[2]))
            .and_then(|d| d.set_value(1.5, &[3]))
            .and_then(|d| d.set_complex(Complex::new(3.0, -4.0), &[4]))
            .expect("setters should succeed");

        assert!(data.get_bool(&[0]).expect("get bool"));
        assert_eq!(data.get_int(&[1]).expect("get int"), -42);
        assert_eq!(data.get_word(&[2]).expect("get word"), 0xDEAD_BEEF);
        assert!((data.get_value(&[3]).expect("get value") - 1.5).abs() < f64::EPSILON);
        assert_eq!(data.get_complex(&[4]).expect("get complex"), Complex::new(3.0, -4.0));
    }

    #[test]
    fn test_type_mismatch_carries_path() {
        let mut data = Data::from_tag("(bi)").expect("tag should parse");
        let err = data.set_int(1, &[0]).unwrap_err();
        assert_eq!(
            err,
            DataError::TypeMismatch {
                expected: TypeCode::Int,
                found: TypeCode::Bool,
                path: vec![0],
            }
        );
    }

    #[test]
    fn test_non_indexable() {
        let data = Data::from_tag("i").expect("tag should parse");
        let err = data.get_int(&[0]).unwrap_err();
        assert_eq!(err, DataError::NonIndexable { code: TypeCode::Int });
    }

    #[test]
    fn test_partial_index_detected() {
        let mut data = Data::from_tag("*2i").expect("tag should parse");
        data.set_array_shape(&[2, 2], &[]).expect("set shape");
        let err = data.get_int(&[1]).unwrap_err();
        assert_eq!(err, DataError::PartialIndex { depth: 2, consumed: 1 });
    }

    #[test]
    fn test_index_out_of_bounds() {
        let mut data = Data::from_tag("*i").expect("tag should parse");
        data.set_array_size(2, &[]).expect("set size");
        let err = data.get_int(&[2]).unwrap_err();
        assert_eq!(err, DataError::IndexOutOfBounds { index: 2, length: 2 });

        let data = Data::from_tag("(bi)").expect("tag should parse");
        let err = data.get_int(&[5]).unwrap_err();
        assert_eq!(err, DataError::IndexOutOfBounds { index: 5, length: 2 });
    }

    #[test]
    fn test_shape_mismatch() {
        let mut data = Data::from_tag("*2i").expect("tag should parse");
        let err = data.set_array_shape(&[3], &[]).unwrap_err();
        assert_eq!(err, DataError::ShapeMismatch { expected: 2, got: 1 });
    }

    #[test]
    fn test_string_accessors() {
        let mut data = Data::from_tag("s").expect("tag should parse");
        data.set_string("hello", &[]).expect("set string");
        assert_eq!(data.get_string(&[]).expect("get string"), "hello");
        assert_eq!(data.get_bytes(&[]).expect("get bytes"), b"hello");

        let err = data.set_string("sn\u{2603}wman", &[]).unwrap_err();
        assert_eq!(err, DataError::Encoding { ch: '\u{2603}' });
    }

    #[test]
    fn test_heap_reuse_on_reset() {
        let mut data = Data::from_tag("s").expect("tag should parse");
        data.set_bytes(b"first", &[]).expect("set bytes");
        data.set_bytes(b"second", &[]).expect("set bytes");
        data.set_bytes(b"third", &[]).expect("set bytes");
        assert_eq!(data.heap.len(), 1);
        assert_eq!(data.get_bytes(&[]).expect("get bytes"), b"third");
    }

    #[test]
    fn test_array_reshape_reuses_slot() {
        let mut data = Data::from_tag("*i").expect("tag should parse");
        data.set_array_size(3, &[]).expect("set size");
        data.set_array_size(5, &[]).expect("set size");
        assert_eq!(data.heap.len(), 1);
        assert_eq!(data.get_array_size(&[]).expect("get size"), 5);
    }

    #[test]
    fn test_list_elements_row_major() {
        let mut data = Data::from_tag("*2i").expect("tag should parse");
        data.set_array_shape(&[2, 3], &[]).expect("set shape");
        let mut n = 0;
        for row in 0..2 {
            for col in 0..3 {
                data.set_int(n, &[row, col]).expect("set element");
                n += 1;
            }
        }
        assert_eq!(data.get_array_shape(&[]).expect("get shape"), vec![2, 3]);
        assert_eq!(data.get_int(&[0, 0]).expect("get"), 0);
        assert_eq!(data.get_int(&[0, 2]).expect("get"), 2);
        assert_eq!(data.get_int(&[1, 0]).expect("get"), 3);
        assert_eq!(data.get_int(&[1, 2]).expect("get"), 5);
        // Element buffer is row-major i32s.
        assert_eq!(data.heap[0], vec![0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 4, 0, 0, 0, 5]);
    }

    #[test]
    fn test_list_of_clusters() {
        let mut data = Data::from_tag("*(is)").expect("tag should parse");
        data.set_array_size(2, &[]).expect("set size");
        data.set_int(10, &[0, 0]).expect("set");
        data.set_string("ten", &[0, 1]).expect("set");
        data.set_int(20, &[1, 0]).expect("set");
        data.set_string("twenty", &[1, 1]).expect("set");
        assert_eq!(data.get_int(&[1, 0]).expect("get"), 20);
        assert_eq!(data.get_string(&[0, 1]).expect("get"), "ten");
        assert_eq!(data.get_string(&[1, 1]).expect("get"), "twenty");
    }

    #[test]
    fn test_time_slots_are_consecutive() {
        let mut data = Data::from_tag("t").expect("tag should parse");
        let stamp = TimeStamp::new(3_000_000_000, 42);
        data.set_time(stamp, &[]).expect("set time");
        assert_eq!(data.get_time(&[]).expect("get time"), stamp);
        // Seconds occupy the first word, the fraction the second.
        assert_eq!(&data.bytes[0..8], &3_000_000_000u64.to_be_bytes());
        assert_eq!(&data.bytes[8..16], &42u64.to_be_bytes());
    }

    #[test]
    fn test_error_accessors() {
        let mut data = Data::from_tag("Ei").expect("tag should parse");
        data.set_error(7, "out of range", &[]).expect("set error");
        assert_eq!(data.get_error_code(&[]).expect("code"), 7);
        assert_eq!(data.get_error_message(&[]).expect("message"), "out of range");
        assert!(data.is_error(&[]));
        // The payload view addresses the bytes after code and message slot.
        let payload = data.get_error_payload(&[]).expect("payload view");
        assert_eq!(payload.ty(), &Type::Int);
    }

    #[test]
    fn test_units_accessors() {
        let data = Data::from_tag("(v[GHz]v)").expect("tag should parse");
        assert!(data.has_units(&[0]));
        assert!(!data.has_units(&[1]));
        assert_eq!(data.get_units(&[0]).expect("units"), Some("GHz"));
        assert_eq!(data.get_units(&[1]).expect("units"), None);
    }

    #[test]
    fn test_view_shares_storage() {
        let mut data = Data::from_tag("*(bi)").expect("tag should parse");
        data.set_array_size(1, &[]).expect("set size");
        data.set_bool(true, &[0, 0]).expect("set");
        data.set_int(99, &[0, 1]).expect("set");

        let view = data.get_data(&[0]).expect("view of element");
        assert_eq!(view.ty().tag(), "(bi)");
        assert!(view.get_bool(&[0]).expect("view get"));
        assert_eq!(view.get_int(&[1]).expect("view get"), 99);

        // Nested views navigate further.
        let leaf = view.get_data(&[1]).expect("leaf view");
        assert_eq!(leaf.ty(), &Type::Int);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut original = Data::from_tag("s").expect("tag should parse");
        original.set_bytes(b"one", &[]).expect("set");
        let copied = original.clone();
        original.set_bytes(b"two", &[]).expect("set");
        assert_eq!(copied.get_bytes(&[]).expect("get"), b"one");
        assert_eq!(original.get_bytes(&[]).expect("get"), b"two");
    }

    #[test]
    fn test_is_predicates_are_total() {
        let data = Data::from_tag("i").expect("tag should parse");
        assert!(data.is_int(&[]));
        assert!(!data.is_bool(&[]));
        // Navigation failure reads as "not that type" rather than erroring.
        assert!(!data.is_bool(&[0, 1, 2]));
    }

    #[test]
    fn test_pretty_forms() {
        let mut data = Data::from_tag("(bis)").expect("tag should parse");
        data.set_bool(false, &[0]).expect("set");
        data.set_int(-3, &[1]).expect("set");
        data.set_string("ok", &[2]).expect("set");
        assert_eq!(data.pretty(), "(false, -3, \"ok\")");

        let mut data = Data::from_tag("*2i").expect("tag should parse");
        data.set_array_shape(&[2, 2], &[]).expect("set shape");
        for (n, (r, c)) in [(0, 0), (0, 1), (1, 0), (1, 1)].iter().enumerate() {
            data.set_int(n as i32 + 1, &[*r, *c]).expect("set");
        }
        assert_eq!(data.pretty(), "[[1, 2], [3, 4]]");

        let mut data = Data::from_tag("v[GHz]").expect("tag should parse");
        data.set_value(6.5, &[]).expect("set");
        assert_eq!(data.pretty(), "6.5 [GHz]");

        let mut data = Data::from_tag("c").expect("tag should parse");
        data.set_complex(Complex::new(1.5, -2.0), &[]).expect("set");
        assert_eq!(data.pretty(), "1.5-2");

        let mut data = Data::from_tag("*i").expect("tag should parse");
        data.set_array_size(0, &[]).expect("set size");
        assert_eq!(data.pretty(), "[]");

        let data = Data::from_tag("s").expect("tag should parse");
        assert_eq!(data.pretty(), "<unset>");
    }
}
