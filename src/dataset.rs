//! Dataset access by navigation coordinate
//!
//! A dataset is a collection of identically shaped items addressed by a
//! navigation coordinate: the flat, row-major position within the leading
//! (non-item) axes. The [`Dataset`] trait is the boundary the engine
//! consumes — the descriptor is queried once at setup and items are read
//! on demand — and [`ArrayDataset`] implements it over an in-memory array.

use ndarray::{ArrayD, ArrayViewD, IxDyn};
use thiserror::Error;

use crate::dtype::{DType, Element};
use crate::roi::Roi;

/// Errors that can occur when constructing a dataset
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatasetError {
    #[error(
        "cannot split a {ndim}-dimensional array at navigation depth {nav_ndim}; \
         both navigation and item axes must remain"
    )]
    InvalidSplit { ndim: usize, nav_ndim: usize },
}

/// Immutable description of a dataset's layout
///
/// Both shapes and the element type are stable for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    nav_shape: Vec<usize>,
    item_shape: Vec<usize>,
    dtype: DType,
}

impl Descriptor {
    /// Create a descriptor from navigation and item shapes
    pub fn new(nav_shape: Vec<usize>, item_shape: Vec<usize>, dtype: DType) -> Self {
        Self {
            nav_shape,
            item_shape,
            dtype,
        }
    }

    /// Shape of the navigation axes
    pub fn nav_shape(&self) -> &[usize] {
        &self.nav_shape
    }

    /// Intrinsic shape of one item
    pub fn item_shape(&self) -> &[usize] {
        &self.item_shape
    }

    /// Element type of one item
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Total number of navigation coordinates
    pub fn nav_len(&self) -> usize {
        self.nav_shape.iter().product()
    }

    /// Number of elements in one item
    pub fn item_len(&self) -> usize {
        self.item_shape.iter().product()
    }
}

/// Read access to a dataset's items
pub trait Dataset<A: Element>: Sync {
    /// The dataset's layout descriptor
    fn descriptor(&self) -> &Descriptor;

    /// View of the item at a navigation coordinate, shaped `item_shape`
    ///
    /// Panics if the coordinate is out of range.
    fn item(&self, nav: usize) -> ArrayViewD<'_, A>;

    /// Lazy sequence of `(coordinate, item)` pairs, honoring an optional
    /// region-of-interest mask
    ///
    /// The sequence is finite and restartable: calling `iterate` again
    /// yields the same coordinates from the start.
    fn iterate<'a>(
        &'a self,
        roi: Option<&'a Roi>,
    ) -> Box<dyn Iterator<Item = (usize, ArrayViewD<'a, A>)> + 'a> {
        let nav_len = self.descriptor().nav_len();
        Box::new(
            (0..nav_len)
                .filter(move |&nav| roi.map_or(true, |r| r.selects(nav)))
                .map(move |nav| (nav, self.item(nav))),
        )
    }
}

/// In-memory dataset backed by a single array
///
/// The array's leading `nav_ndim` axes become the navigation space and the
/// trailing axes the item shape. Input in any memory order is accepted; it
/// is converted to row-major storage once at construction.
#[derive(Debug, Clone)]
pub struct ArrayDataset<A: Element> {
    descriptor: Descriptor,
    item_len: usize,
    data: Vec<A>,
}

impl<A: Element> ArrayDataset<A> {
    /// Split `data` into `nav_ndim` leading navigation axes and trailing
    /// item axes
    pub fn new(data: ArrayD<A>, nav_ndim: usize) -> Result<Self, DatasetError> {
        let ndim = data.ndim();
        if nav_ndim == 0 || nav_ndim >= ndim {
            return Err(DatasetError::InvalidSplit { ndim, nav_ndim });
        }

        let nav_shape = data.shape()[..nav_ndim].to_vec();
        let item_shape = data.shape()[nav_ndim..].to_vec();
        let item_len = item_shape.iter().product();

        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };

        Ok(Self {
            descriptor: Descriptor::new(nav_shape, item_shape, A::DTYPE),
            item_len,
            data: data.into_raw_vec(),
        })
    }
}

impl<A: Element> Dataset<A> for ArrayDataset<A> {
    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn item(&self, nav: usize) -> ArrayViewD<'_, A> {
        let start = nav * self.item_len;
        let slice = &self.data[start..start + self.item_len];
        ArrayViewD::from_shape(IxDyn(self.descriptor.item_shape()), slice)
            .expect("item slice length matches the item shape")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, ArrayD};

    fn counting(shape: &[usize]) -> ArrayD<f64> {
        let len: usize = shape.iter().product();
        Array::from_iter((0..len).map(|v| v as f64))
            .into_shape(IxDyn(shape))
            .unwrap()
    }

    #[test]
    fn test_split() {
        let ds = ArrayDataset::new(counting(&[2, 3, 4, 5]), 2).unwrap();

        assert_eq!(ds.descriptor().nav_shape(), &[2, 3]);
        assert_eq!(ds.descriptor().item_shape(), &[4, 5]);
        assert_eq!(ds.descriptor().nav_len(), 6);
        assert_eq!(ds.descriptor().item_len(), 20);
        assert_eq!(ds.descriptor().dtype(), DType::F64);
    }

    #[test]
    fn test_invalid_split() {
        assert_eq!(
            ArrayDataset::new(counting(&[2, 3]), 0).unwrap_err(),
            DatasetError::InvalidSplit { ndim: 2, nav_ndim: 0 }
        );
        assert_eq!(
            ArrayDataset::new(counting(&[2, 3]), 2).unwrap_err(),
            DatasetError::InvalidSplit { ndim: 2, nav_ndim: 2 }
        );
    }

    #[test]
    fn test_item_views() {
        let ds = ArrayDataset::new(counting(&[2, 3]), 1).unwrap();

        assert_eq!(ds.item(0).as_slice().unwrap(), &[0.0, 1.0, 2.0]);
        assert_eq!(ds.item(1).as_slice().unwrap(), &[3.0, 4.0, 5.0]);
        assert_eq!(ds.item(1).shape(), &[3]);
    }

    #[test]
    fn test_non_standard_layout_input() {
        // Transposed input must still yield logically correct items.
        let data = counting(&[3, 2]).reversed_axes();
        let ds = ArrayDataset::new(data, 1).unwrap();

        assert_eq!(ds.descriptor().nav_shape(), &[2]);
        assert_eq!(ds.item(0).as_slice().unwrap(), &[0.0, 2.0, 4.0]);
        assert_eq!(ds.item(1).as_slice().unwrap(), &[1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_iterate_all() {
        let ds = ArrayDataset::new(counting(&[4, 2]), 1).unwrap();

        let coords: Vec<usize> = ds.iterate(None).map(|(nav, _)| nav).collect();
        assert_eq!(coords, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_iterate_roi() {
        let ds = ArrayDataset::new(counting(&[4, 2]), 1).unwrap();
        let roi = Roi::from_mask(vec![false, true, false, true]);

        let coords: Vec<usize> = ds.iterate(Some(&roi)).map(|(nav, _)| nav).collect();
        assert_eq!(coords, vec![1, 3]);

        // Restartable: a second pass yields the same coordinates.
        let again: Vec<usize> = ds.iterate(Some(&roi)).map(|(nav, _)| nav).collect();
        assert_eq!(again, coords);
    }
}
