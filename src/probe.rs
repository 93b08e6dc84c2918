//! Output-buffer inference from a single probe call
//!
//! Before any real data is processed, the user function is invoked once on
//! a synthetic all-ones item to find out what it returns. The returned
//! value's shape, together with the statically known element type, becomes
//! the buffer specification the whole run is allocated and checked
//! against — analyze first, allocate after.
//!
//! # Example
//!
//! ```
//! use framemap::probe::infer;
//! use ndarray::ArrayViewD;
//!
//! // A function returning a scalar per item probes to an empty extra shape
//! let spec = infer(&|item: ArrayViewD<f64>| item.sum(), &[4, 4]).unwrap();
//! assert!(spec.is_scalar());
//! assert_eq!(spec.slot_len(), 1);
//! ```

use std::fmt;

use ndarray::{ArrayD, IxDyn};
use thiserror::Error;
use tracing::debug;

use crate::dtype::{DType, Element};
use crate::item_fn::{ItemFn, ItemFnError};

/// Errors that can occur during the one-time inference call
///
/// All of them are fatal to the run: there is no fallback inference
/// strategy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("item shape must not be empty")]
    EmptyItemShape,

    #[error("item shape axis {axis} has zero extent")]
    ZeroExtent { axis: usize },

    #[error("probe call failed: {0}")]
    Failed(ItemFnError),
}

/// Storage kind of an output buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferKind {
    /// One entry per navigation coordinate
    #[default]
    Nav,
}

impl fmt::Display for BufferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferKind::Nav => write!(f, "nav"),
        }
    }
}

/// Derived specification of the output buffer
///
/// Fixed for the whole run once the probe call returns; the applier checks
/// every real return value against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferSpec {
    /// How the buffer is addressed
    pub kind: BufferKind,

    /// Per-slot shape, equal to the probe call's return shape
    pub extra_shape: Vec<usize>,

    /// Element type of the probe call's return value
    pub dtype: DType,
}

impl BufferSpec {
    /// Number of elements in one slot
    pub fn slot_len(&self) -> usize {
        self.extra_shape.iter().product()
    }

    /// Size of one slot in bytes
    pub fn slot_bytes(&self) -> usize {
        self.slot_len() * self.dtype.size_bytes()
    }

    /// Total element count for a buffer spanning `nav_len` coordinates
    pub fn total_len(&self, nav_len: usize) -> usize {
        nav_len * self.slot_len()
    }

    /// Returns true if each slot holds a single scalar
    pub fn is_scalar(&self) -> bool {
        self.extra_shape.is_empty()
    }
}

impl fmt::Display for BufferSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} buffer, extra shape {:?}, dtype {}",
            self.kind, self.extra_shape, self.dtype
        )
    }
}

/// Infer the output-buffer specification for `f`
///
/// Validates `item_shape`, constructs the all-ones probe item, calls `f`
/// exactly once, and reads the shape of the returned value. The probe item
/// is transient and discarded after the call; `f` receives it by immutable
/// view and may only derive a new value from it.
///
/// The caller is expected to invoke this once per run, before any real
/// item is processed, and to reuse the returned specification for the
/// remainder of the run.
pub fn infer<A, B, F>(f: &F, item_shape: &[usize]) -> Result<BufferSpec, ProbeError>
where
    A: Element,
    B: Element,
    F: ItemFn<A, B>,
{
    if item_shape.is_empty() {
        return Err(ProbeError::EmptyItemShape);
    }
    if let Some(axis) = item_shape.iter().position(|&extent| extent == 0) {
        return Err(ProbeError::ZeroExtent { axis });
    }

    let probe_item = ArrayD::from_elem(IxDyn(item_shape), A::one());
    let value = f.call(probe_item.view()).map_err(ProbeError::Failed)?;

    let spec = BufferSpec {
        kind: BufferKind::Nav,
        extra_shape: value.shape().to_vec(),
        dtype: B::DTYPE,
    };
    debug!(%spec, "inferred output buffer specification");
    Ok(spec)
}
