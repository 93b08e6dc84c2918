//! Navigation-coordinate output buffers
//!
//! The output of a run is an arena with one fixed-size slot per navigation
//! coordinate, allocated once from the probed specification and filled
//! incrementally, one slot per processed item. This module provides a
//! unified API over that arena:
//!
//! - **`slot()` / `get()`** - Read a view of one coordinate's result
//!   without copying. The view borrows from the buffer.
//!
//! - **`chunks_mut()`** - Carve the arena into disjoint per-chunk mutable
//!   partitions for parallel writes. Each coordinate's slot belongs to
//!   exactly one partition, so concurrent chunk processing cannot alias.
//!
//! - **`into_array()`** - Consume the buffer into the assembled result
//!   array of shape `nav_shape ++ extra_shape`.
//!
//! The buffer tracks which slots have been written for diagnostics:
//! a completed run has written exactly the selected coordinates, an
//! aborted one leaves a partial set that callers must discard.
//!
//! # Example
//!
//! ```
//! use framemap::buffer::NavBuffer;
//! use framemap::probe::{BufferKind, BufferSpec};
//! use framemap::DType;
//!
//! let spec = BufferSpec {
//!     kind: BufferKind::Nav,
//!     extra_shape: vec![2],
//!     dtype: DType::F64,
//! };
//! let buffer: NavBuffer<f64> = NavBuffer::allocate(&[3], &spec);
//!
//! assert_eq!(buffer.nav_len(), 3);
//! assert_eq!(buffer.slot(0).unwrap().shape(), &[2]);
//! assert_eq!(buffer.written_count(), 0);
//! ```

use std::mem;
use std::ops::Range;

use ndarray::{ArrayD, ArrayViewD, IxDyn};

use crate::dtype::Element;
use crate::partition::Partition;
use crate::probe::BufferSpec;

/// Output arena with one fixed-size slot per navigation coordinate
///
/// Allocated zero-filled; each slot receives at most one whole-slot write
/// per run. Navigation coordinates are flat, row-major positions in
/// `nav_shape`.
#[derive(Debug, Clone)]
pub struct NavBuffer<B: Element> {
    nav_shape: Vec<usize>,
    spec: BufferSpec,
    slot_len: usize,
    data: Vec<B>,
    written: Vec<bool>,
}

impl<B: Element> NavBuffer<B> {
    /// Allocate a zero-filled buffer for `nav_shape` per the specification
    pub fn allocate(nav_shape: &[usize], spec: &BufferSpec) -> Self {
        debug_assert_eq!(spec.dtype, B::DTYPE);
        let nav_len: usize = nav_shape.iter().product();
        let slot_len = spec.slot_len();
        Self {
            nav_shape: nav_shape.to_vec(),
            spec: spec.clone(),
            slot_len,
            data: vec![B::zero(); nav_len * slot_len],
            written: vec![false; nav_len],
        }
    }

    /// Shape of the navigation axes
    pub fn nav_shape(&self) -> &[usize] {
        &self.nav_shape
    }

    /// Per-slot shape, as probed
    pub fn extra_shape(&self) -> &[usize] {
        &self.spec.extra_shape
    }

    /// The specification this buffer was allocated from
    pub fn spec(&self) -> &BufferSpec {
        &self.spec
    }

    /// Total number of navigation coordinates
    pub fn nav_len(&self) -> usize {
        self.written.len()
    }

    /// Number of elements in one slot
    pub fn slot_len(&self) -> usize {
        self.slot_len
    }

    /// View of one coordinate's slot, shaped `extra_shape`
    pub fn slot(&self, nav: usize) -> Option<ArrayViewD<'_, B>> {
        if nav >= self.nav_len() {
            return None;
        }
        let start = nav * self.slot_len;
        let slice = &self.data[start..start + self.slot_len];
        Some(
            ArrayViewD::from_shape(IxDyn(&self.spec.extra_shape), slice)
                .expect("slot length matches the extra shape"),
        )
    }

    /// Flat coordinate for a multi-dimensional navigation index
    pub fn index_of(&self, coord: &[usize]) -> Option<usize> {
        if coord.len() != self.nav_shape.len() {
            return None;
        }
        let mut flat = 0;
        for (&c, &extent) in coord.iter().zip(&self.nav_shape) {
            if c >= extent {
                return None;
            }
            flat = flat * extent + c;
        }
        Some(flat)
    }

    /// View of the slot at a multi-dimensional navigation index
    pub fn get(&self, coord: &[usize]) -> Option<ArrayViewD<'_, B>> {
        self.slot(self.index_of(coord)?)
    }

    /// Returns true if the coordinate's slot has been written
    pub fn written(&self, nav: usize) -> bool {
        self.written.get(nav).copied().unwrap_or(false)
    }

    /// Number of slots written so far
    pub fn written_count(&self) -> usize {
        self.written.iter().filter(|&&w| w).count()
    }

    /// Total bytes written so far
    pub fn written_bytes(&self) -> usize {
        self.written_count() * self.spec.slot_bytes()
    }

    /// Iterator over the written coordinates, in ascending order
    pub fn written_coords(&self) -> impl Iterator<Item = usize> + '_ {
        self.written
            .iter()
            .enumerate()
            .filter(|(_, &w)| w)
            .map(|(nav, _)| nav)
    }

    /// Snapshot of the write diagnostics
    pub fn diagnostics(&self) -> BufferDiagnostics {
        BufferDiagnostics::from(self)
    }

    /// Consume the buffer into the result array of shape
    /// `nav_shape ++ extra_shape`
    pub fn into_array(self) -> ArrayD<B> {
        let mut shape = self.nav_shape;
        shape.extend_from_slice(&self.spec.extra_shape);
        ArrayD::from_shape_vec(IxDyn(&shape), self.data)
            .expect("buffer length matches the nav and extra shapes")
    }

    /// Carve the buffer into disjoint per-chunk mutable partitions
    ///
    /// Each returned [`SlotChunkMut`] owns the slots of one chunk of the
    /// partition, so the chunks can be processed concurrently without any
    /// two touching the same coordinate.
    ///
    /// Panics if the partition does not cover exactly this buffer's
    /// navigation space.
    pub fn chunks_mut(&mut self, partition: &Partition) -> Vec<SlotChunkMut<'_, B>> {
        assert_eq!(
            partition.n,
            self.nav_len(),
            "partition must cover the buffer's navigation space"
        );
        let slot_len = self.slot_len;
        let mut values = self.data.as_mut_slice();
        let mut written = self.written.as_mut_slice();
        let mut out = Vec::with_capacity(partition.num_chunks());
        let mut offset = 0;
        for chunk in partition {
            assert_eq!(chunk.start, offset, "partition chunks must be contiguous");
            let (chunk_values, rest) = mem::take(&mut values).split_at_mut(chunk.len() * slot_len);
            values = rest;
            let (chunk_written, rest) = mem::take(&mut written).split_at_mut(chunk.len());
            written = rest;
            out.push(SlotChunkMut {
                start: chunk.start,
                slot_len,
                values: chunk_values,
                written: chunk_written,
            });
            offset = chunk.end;
        }
        assert_eq!(offset, partition.n, "partition chunks must cover all coordinates");
        out
    }
}

/// Mutable slots for one chunk of navigation coordinates
///
/// Carved from a [`NavBuffer`] by [`NavBuffer::chunks_mut`]; borrows the
/// chunk's slots exclusively, so distinct chunks can be written from
/// distinct workers.
#[derive(Debug)]
pub struct SlotChunkMut<'a, B> {
    start: usize,
    slot_len: usize,
    values: &'a mut [B],
    written: &'a mut [bool],
}

impl<'a, B> SlotChunkMut<'a, B> {
    /// First coordinate of the chunk
    pub fn start(&self) -> usize {
        self.start
    }

    /// One past the last coordinate of the chunk
    pub fn end(&self) -> usize {
        self.start + self.written.len()
    }

    /// The chunk's coordinates, in ascending order
    pub fn coords(&self) -> Range<usize> {
        self.start..self.end()
    }

    /// Number of coordinates in the chunk
    pub fn len(&self) -> usize {
        self.written.len()
    }

    /// Returns true if the chunk holds no coordinates
    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
    }

    /// Mutable access to one coordinate's slot
    ///
    /// Panics if the coordinate lies outside this chunk.
    pub fn slot_mut(&mut self, nav: usize) -> SlotMut<'_, B> {
        assert!(
            self.coords().contains(&nav),
            "coordinate {} outside chunk {}..{}",
            nav,
            self.start,
            self.end()
        );
        let local = nav - self.start;
        SlotMut {
            values: &mut self.values[local * self.slot_len..(local + 1) * self.slot_len],
            written: &mut self.written[local],
        }
    }
}

/// Exclusive access to one coordinate's slot
#[derive(Debug)]
pub struct SlotMut<'a, B> {
    values: &'a mut [B],
    written: &'a mut bool,
}

impl<'a, B> SlotMut<'a, B> {
    /// Number of elements in the slot
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the slot holds no elements
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The slot's elements, in row-major order
    pub fn values_mut(&mut self) -> &mut [B] {
        self.values
    }

    /// Record that the slot has received its write
    pub fn mark_written(&mut self) {
        *self.written = true;
    }
}

/// Diagnostics for buffer write patterns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferDiagnostics {
    /// Total number of slots
    pub total_slots: usize,

    /// Number of slots written
    pub written_slots: usize,

    /// Total bytes written
    pub written_bytes: usize,
}

impl<B: Element> From<&NavBuffer<B>> for BufferDiagnostics {
    fn from(buffer: &NavBuffer<B>) -> Self {
        Self {
            total_slots: buffer.nav_len(),
            written_slots: buffer.written_count(),
            written_bytes: buffer.written_bytes(),
        }
    }
}
