//! Per-item application into pre-allocated slots
//!
//! For each item the engine presents, the user function is invoked and its
//! whole return value is written into the slot for that item's navigation
//! coordinate. The write is an overwrite, never a merge or accumulation,
//! and it is the only mutation the call performs.

use ndarray::ArrayViewD;
use thiserror::Error;

use crate::buffer::SlotMut;
use crate::dtype::Element;
use crate::item_fn::{ItemFn, ItemFnError};
use crate::probe::BufferSpec;

/// Errors that can occur while processing a real item
///
/// Both variants carry the navigation coordinate so the caller can
/// diagnose which item failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// The user function failed for this item
    #[error("item function failed at coordinate {coord}: {source}")]
    Failed { coord: usize, source: ItemFnError },

    /// The return shape disagrees with the probed specification
    ///
    /// The buffer is fixed-shape and cannot be resized mid-run, so this
    /// aborts the run.
    #[error("output shape mismatch at coordinate {coord}: probe declared {expected:?}, item produced {got:?}")]
    ShapeMismatch {
        coord: usize,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
}

/// Apply `f` to one item and write the result into the coordinate's slot
///
/// The item must have the shape declared by the dataset descriptor, and
/// the slot must have been allocated from `spec`. On success the slot
/// holds exactly `f(item)` and is marked written.
pub fn apply_item<A, B, F>(
    f: &F,
    item: ArrayViewD<'_, A>,
    coord: usize,
    spec: &BufferSpec,
    mut slot: SlotMut<'_, B>,
) -> Result<(), ApplyError>
where
    A: Element,
    B: Element,
    F: ItemFn<A, B>,
{
    let value = f
        .call(item)
        .map_err(|source| ApplyError::Failed { coord, source })?;

    if value.shape() != spec.extra_shape.as_slice() {
        return Err(ApplyError::ShapeMismatch {
            coord,
            expected: spec.extra_shape.clone(),
            got: value.shape().to_vec(),
        });
    }

    for (dst, src) in slot.values_mut().iter_mut().zip(value.iter()) {
        *dst = *src;
    }
    slot.mark_written();
    Ok(())
}
