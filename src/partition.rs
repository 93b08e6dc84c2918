//! Contiguous partitioning of the navigation space
//!
//! Produces chunk descriptors (coordinate ranges) covering every
//! navigation coordinate exactly once, for dispatch across parallel
//! workers. Chunk size can be given explicitly or autotuned from the
//! worker count.

use std::ops::Range;

use thiserror::Error;

/// Errors that can occur during partitioning
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PartitionError {
    #[error("cannot partition an empty navigation space")]
    Empty,

    #[error("chunk size must be greater than 0")]
    ZeroChunkSize,

    #[error("worker_count must be greater than 0 for autotuning")]
    NoWorkers,
}

/// Chunk size specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkSize {
    /// Automatically determine chunk size from the worker count
    #[default]
    Auto,

    /// Explicit number of coordinates per chunk
    Explicit(usize),
}

/// Configuration for chunk-size autotuning
#[derive(Debug, Clone, Copy)]
pub struct PartitionConfig {
    /// Number of workers available for dispatch
    pub worker_count: usize,

    /// Target minimum chunks per worker (for load balancing)
    /// Default: 4
    pub min_chunks_per_worker: usize,

    /// Target maximum chunks per worker (to limit dispatch overhead)
    /// Default: 64
    pub max_chunks_per_worker: usize,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            worker_count: 1,
            min_chunks_per_worker: 4,
            max_chunks_per_worker: 64,
        }
    }
}

impl PartitionConfig {
    /// Create a configuration with the given worker count
    pub fn with_workers(worker_count: usize) -> Self {
        Self {
            worker_count,
            ..Default::default()
        }
    }
}

/// A contiguous range of navigation coordinates `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub start: usize,
    pub end: usize,
}

impl Chunk {
    /// Number of coordinates in this chunk
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if this chunk has no coordinates
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The coordinates in this chunk, in ascending order
    pub fn coords(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Chunk cover of the navigation space
///
/// Chunks are ordered and contiguous: chunk `i + 1` starts where chunk `i`
/// ends, and together they cover `0..n` exactly once.
#[derive(Debug, Clone)]
pub struct Partition {
    /// Total number of coordinates being partitioned
    pub n: usize,

    /// Computed chunk size
    pub chunk_size: usize,

    /// The individual chunks
    pub chunks: Vec<Chunk>,
}

impl Partition {
    /// Returns the number of chunks
    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// Returns an iterator over the chunks
    pub fn iter(&self) -> std::slice::Iter<'_, Chunk> {
        self.chunks.iter()
    }

    /// Verify that all coordinates from 0 to n-1 are covered exactly once
    #[cfg(test)]
    fn verify_coverage(&self) -> bool {
        let mut seen = vec![false; self.n];
        for chunk in &self.chunks {
            for nav in chunk.coords() {
                if nav >= self.n || seen[nav] {
                    return false;
                }
                seen[nav] = true;
            }
        }
        seen.iter().all(|&b| b)
    }
}

impl<'a> IntoIterator for &'a Partition {
    type Item = &'a Chunk;
    type IntoIter = std::slice::Iter<'a, Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Compute chunk size from the worker count
///
/// Aims for at least `min_chunks_per_worker` chunks per worker so uneven
/// per-item cost still balances, without exceeding
/// `max_chunks_per_worker` per worker in dispatch overhead.
fn autotune_chunk_size(n: usize, config: &PartitionConfig) -> usize {
    let min_chunks = config.worker_count * config.min_chunks_per_worker;
    let max_chunks = config.worker_count * config.max_chunks_per_worker;

    let mut chunk_size = n.div_ceil(min_chunks.max(1)).max(1);

    let num_chunks = n.div_ceil(chunk_size);
    if num_chunks > max_chunks {
        chunk_size = n.div_ceil(max_chunks.max(1));
    }

    chunk_size.max(1)
}

/// Partition `0..n` into contiguous chunks
///
/// # Arguments
///
/// * `n` - Total number of navigation coordinates (must be > 0)
/// * `chunk_size` - Coordinates per chunk, or `Auto` for autotuning
/// * `config` - Autotuning configuration
///
/// # Example
///
/// ```
/// use framemap::partition::{partition, ChunkSize, PartitionConfig};
///
/// let config = PartitionConfig::with_workers(8);
/// let layout = partition(1000, ChunkSize::Auto, &config).unwrap();
///
/// // Chunks cover the navigation space in order
/// assert_eq!(layout.chunks[0].start, 0);
/// assert_eq!(layout.chunks.last().unwrap().end, 1000);
/// ```
pub fn partition(
    n: usize,
    chunk_size: ChunkSize,
    config: &PartitionConfig,
) -> Result<Partition, PartitionError> {
    if n == 0 {
        return Err(PartitionError::Empty);
    }

    let computed = match chunk_size {
        ChunkSize::Auto => {
            if config.worker_count == 0 {
                return Err(PartitionError::NoWorkers);
            }
            autotune_chunk_size(n, config)
        }
        ChunkSize::Explicit(0) => return Err(PartitionError::ZeroChunkSize),
        ChunkSize::Explicit(size) => size,
    };

    let mut chunks = Vec::with_capacity(n.div_ceil(computed));
    let mut start = 0;
    while start < n {
        let end = (start + computed).min(n);
        chunks.push(Chunk { start, end });
        start = end;
    }

    Ok(Partition {
        n,
        chunk_size: computed,
        chunks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_chunks() {
        let config = PartitionConfig::default();
        let layout = partition(10, ChunkSize::Explicit(3), &config).unwrap();

        assert_eq!(layout.num_chunks(), 4);
        assert!(layout.verify_coverage());

        assert_eq!(layout.chunks[0], Chunk { start: 0, end: 3 });
        assert_eq!(layout.chunks[1], Chunk { start: 3, end: 6 });
        assert_eq!(layout.chunks[2], Chunk { start: 6, end: 9 });
        assert_eq!(layout.chunks[3], Chunk { start: 9, end: 10 });
    }

    #[test]
    fn test_autotuning() {
        // 8 workers, default targets of 4-64 chunks per worker.
        let config = PartitionConfig::with_workers(8);
        let layout = partition(1000, ChunkSize::Auto, &config).unwrap();

        let num_chunks = layout.num_chunks();
        assert!(num_chunks >= 32, "Too few chunks: {}", num_chunks);
        assert!(num_chunks <= 512, "Too many chunks: {}", num_chunks);
        assert!(layout.verify_coverage());
    }

    #[test]
    fn test_autotuning_small_n() {
        // Fewer coordinates than the chunk target still covers everything.
        let config = PartitionConfig::with_workers(8);
        let layout = partition(5, ChunkSize::Auto, &config).unwrap();

        assert!(layout.verify_coverage());
        assert!(layout.num_chunks() <= 5);
    }

    #[test]
    fn test_coverage_exhaustive() {
        for n in [1, 2, 7, 10, 100, 1000] {
            for chunk_size in [1, 2, 3, 7, 10, 100] {
                let config = PartitionConfig::default();
                let layout = partition(n, ChunkSize::Explicit(chunk_size), &config).unwrap();

                assert!(
                    layout.verify_coverage(),
                    "Coverage failed for n={}, chunk_size={}",
                    n,
                    chunk_size
                );
            }
        }
    }

    #[test]
    fn test_error_cases() {
        let config = PartitionConfig::default();

        assert!(matches!(
            partition(0, ChunkSize::Explicit(1), &config),
            Err(PartitionError::Empty)
        ));
        assert!(matches!(
            partition(10, ChunkSize::Explicit(0), &config),
            Err(PartitionError::ZeroChunkSize)
        ));

        let zero_workers = PartitionConfig::with_workers(0);
        assert!(matches!(
            partition(10, ChunkSize::Auto, &zero_workers),
            Err(PartitionError::NoWorkers)
        ));
    }

    #[test]
    fn test_large_chunk_size() {
        let config = PartitionConfig::default();
        let layout = partition(10, ChunkSize::Explicit(100), &config).unwrap();

        assert_eq!(layout.num_chunks(), 1);
        assert_eq!(layout.chunks[0].len(), 10);
        assert!(layout.verify_coverage());
    }

    #[test]
    fn test_chunk_coords() {
        let chunk = Chunk { start: 5, end: 8 };

        assert_eq!(chunk.len(), 3);
        assert!(!chunk.is_empty());
        assert_eq!(chunk.coords().collect::<Vec<_>>(), vec![5, 6, 7]);
    }

    #[test]
    fn test_partition_clone() {
        let config = PartitionConfig::default();
        let layout = partition(4, ChunkSize::Explicit(2), &config).unwrap();
        let copy = layout.clone();

        assert_eq!(layout.chunks, copy.chunks);
    }
}
