//! Framemap: per-item mapping with auto-inferred result buffers
//!
//! This crate runs an arbitrary per-item function over a partitioned
//! dataset without the caller declaring the output shape or type in
//! advance. A single probe call on a synthetic all-ones item derives the
//! result-buffer specification; every selected item is then processed and
//! its return value written into the pre-allocated slot for that item's
//! navigation coordinate.
//!
//! ```
//! use framemap::{run_auto, ArrayDataset};
//! use ndarray::{ArrayD, ArrayViewD, IxDyn};
//!
//! // A 3x3 scan of 8x8 items
//! let data = ArrayD::from_elem(IxDyn(&[3, 3, 8, 8]), 0.5f64);
//! let dataset = ArrayDataset::new(data, 2).unwrap();
//!
//! // The scalar-per-coordinate output buffer is inferred automatically
//! let result = run_auto(&dataset, |item: ArrayViewD<f64>| item.sum(), None).unwrap();
//! assert_eq!(result.into_array().shape(), &[3, 3]);
//! ```

pub mod apply;
pub mod buffer;
pub mod dataset;
pub mod dtype;
pub mod engine;
pub mod item_fn;
pub mod partition;
pub mod probe;
pub mod roi;

// Re-export main types at crate root
pub use apply::{apply_item, ApplyError};
pub use buffer::{BufferDiagnostics, NavBuffer, SlotChunkMut, SlotMut};
pub use dataset::{ArrayDataset, Dataset, DatasetError, Descriptor};
pub use dtype::{DType, Element};
pub use engine::{run_auto, Engine, EngineConfig, RunError};
pub use item_fn::{IntoItemValue, ItemFn, ItemFnError};
pub use partition::{partition, Chunk, ChunkSize, Partition, PartitionConfig, PartitionError};
pub use probe::{infer, BufferKind, BufferSpec, ProbeError};
pub use roi::Roi;
