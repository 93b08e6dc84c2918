//! Run orchestration: probe once, allocate, dispatch in parallel
//!
//! The engine wires the pieces into one run: setup checks, the one-time
//! probe call, buffer allocation, partitioning of the navigation space,
//! and parallel chunk dispatch. The probe completes before any item is
//! processed, and each chunk writes only its own disjoint buffer
//! partition, so no locking is involved.
//!
//! A run that fails mid-processing is aborted on the first error; the
//! partially filled buffer is dropped, never returned.

use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::apply::{self, ApplyError};
use crate::buffer::NavBuffer;
use crate::dataset::Dataset;
use crate::dtype::Element;
use crate::item_fn::ItemFn;
use crate::partition::{partition, ChunkSize, PartitionConfig, PartitionError};
use crate::probe::{self, ProbeError};
use crate::roi::Roi;

/// Errors that can abort a run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Apply(#[from] ApplyError),

    #[error(transparent)]
    Partition(#[from] PartitionError),

    #[error("region of interest covers {got} coordinates, dataset has {expected}")]
    RoiMismatch { expected: usize, got: usize },
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Coordinates per dispatched chunk
    pub chunk_size: ChunkSize,

    /// Autotuning configuration for `ChunkSize::Auto`
    pub partition: PartitionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: ChunkSize::Auto,
            partition: PartitionConfig::with_workers(rayon::current_num_threads()),
        }
    }
}

impl EngineConfig {
    /// Set the chunk size
    pub fn with_chunk_size(mut self, chunk_size: ChunkSize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the worker count used for autotuning
    pub fn with_workers(mut self, worker_count: usize) -> Self {
        self.partition.worker_count = worker_count;
        self
    }
}

/// In-process execution engine
///
/// Runs a per-item function over every selected item of a dataset and
/// returns the filled output buffer.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    /// Create an engine with the given configuration
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// The engine's configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `f` over every item of `dataset` selected by `roi`
    ///
    /// The output shape and element type are inferred once from a probe
    /// call before any real item is processed; every selected
    /// coordinate's slot then receives exactly `f(item)`. The first item
    /// failure or shape mismatch aborts the whole run.
    pub fn run<A, B, D, F>(
        &self,
        dataset: &D,
        f: &F,
        roi: Option<&Roi>,
    ) -> Result<NavBuffer<B>, RunError>
    where
        A: Element,
        B: Element,
        D: Dataset<A>,
        F: ItemFn<A, B>,
    {
        let descriptor = dataset.descriptor();
        let nav_len = descriptor.nav_len();

        if let Some(roi) = roi {
            if roi.len() != nav_len {
                return Err(RunError::RoiMismatch {
                    expected: nav_len,
                    got: roi.len(),
                });
            }
        }

        let spec = probe::infer::<A, B, F>(f, descriptor.item_shape())?;

        let mut buffer = NavBuffer::allocate(descriptor.nav_shape(), &spec);
        if nav_len == 0 {
            debug!("empty navigation space, nothing to process");
            return Ok(buffer);
        }

        let layout = partition(nav_len, self.config.chunk_size, &self.config.partition)?;
        debug!(
            coordinates = nav_len,
            chunks = layout.num_chunks(),
            chunk_size = layout.chunk_size,
            "dispatching items"
        );

        buffer
            .chunks_mut(&layout)
            .into_par_iter()
            .try_for_each(|mut slots| {
                for nav in slots.coords() {
                    if roi.map_or(true, |r| r.selects(nav)) {
                        apply::apply_item(f, dataset.item(nav), nav, &spec, slots.slot_mut(nav))?;
                    }
                }
                Ok::<(), ApplyError>(())
            })?;

        debug!(writes = buffer.written_count(), "run complete");
        Ok(buffer)
    }
}

/// Run `f` over every item of `dataset` with a default engine
///
/// The result buffer holds one entry per navigation coordinate, with
/// per-slot shape and element type inferred from a single probe call.
///
/// # Example
///
/// ```
/// use framemap::{run_auto, ArrayDataset};
/// use ndarray::{ArrayD, ArrayViewD, IxDyn};
///
/// // A 2x2 scan of 4x4 items, every element 1.0
/// let data = ArrayD::from_elem(IxDyn(&[2, 2, 4, 4]), 1.0f64);
/// let dataset = ArrayDataset::new(data, 2).unwrap();
///
/// let result = run_auto(&dataset, |item: ArrayViewD<f64>| item.sum(), None).unwrap();
/// assert_eq!(result.nav_shape(), &[2, 2]);
/// assert_eq!(result.slot(3).unwrap().sum(), 16.0);
/// ```
pub fn run_auto<A, B, D, F>(dataset: &D, f: F, roi: Option<&Roi>) -> Result<NavBuffer<B>, RunError>
where
    A: Element,
    B: Element,
    D: Dataset<A>,
    F: ItemFn<A, B>,
{
    Engine::default().run(dataset, &f, roi)
}
