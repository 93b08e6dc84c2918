//! The per-item transform function as a capability interface
//!
//! The user-supplied function is a black box with a single operation:
//! item in, value out. [`ItemFn`] models that operation so concrete
//! callers can be closures, function pointers, or objects. A blanket
//! implementation covers any `Fn` over an item view whose return value
//! converts via [`IntoItemValue`], so all of these qualify:
//!
//! - `|item| item.sum()` returning a scalar
//! - a function returning `Array1<f64>` or `Vec<f64>`
//! - a fallible function returning `Result<_, ItemFnError>`

use ndarray::{arr0, Array, Array1, ArrayD, ArrayViewD, Dimension};
use thiserror::Error;

use crate::dtype::Element;

/// Failure reported by a user-supplied item function
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ItemFnError {
    message: String,
}

impl ItemFnError {
    /// Create an error with the given message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for ItemFnError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ItemFnError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// A per-item transform from an item view to a result array
///
/// Implementations must be shape/type-stable: every call is expected to
/// return the same shape, fixed for the whole run by the one-time probe
/// call. The item is passed by immutable view; a function may derive a new
/// value from it but can never write into it.
pub trait ItemFn<A: Element, B: Element>: Sync {
    /// Transform one item into a result value
    fn call(&self, item: ArrayViewD<'_, A>) -> Result<ArrayD<B>, ItemFnError>;
}

impl<A, B, R, F> ItemFn<A, B> for F
where
    A: Element,
    B: Element,
    R: IntoItemValue<B>,
    F: for<'a> Fn(ArrayViewD<'a, A>) -> R + Sync,
{
    fn call(&self, item: ArrayViewD<'_, A>) -> Result<ArrayD<B>, ItemFnError> {
        self(item).into_item_value()
    }
}

/// Conversion from a user function's return value into a result array
///
/// Covers scalars, owned arrays of any dimensionality, vectors, and
/// `Result`s of any of those.
pub trait IntoItemValue<B: Element> {
    /// Convert into a dynamic-dimensional result array
    fn into_item_value(self) -> Result<ArrayD<B>, ItemFnError>;
}

impl<B, D> IntoItemValue<B> for Array<B, D>
where
    B: Element,
    D: Dimension,
{
    fn into_item_value(self) -> Result<ArrayD<B>, ItemFnError> {
        Ok(self.into_dyn())
    }
}

impl<B: Element> IntoItemValue<B> for Vec<B> {
    fn into_item_value(self) -> Result<ArrayD<B>, ItemFnError> {
        Ok(Array1::from(self).into_dyn())
    }
}

impl<B, T> IntoItemValue<B> for Result<T, ItemFnError>
where
    B: Element,
    T: IntoItemValue<B>,
{
    fn into_item_value(self) -> Result<ArrayD<B>, ItemFnError> {
        self?.into_item_value()
    }
}

macro_rules! impl_scalar_item_value {
    ($($ty:ty)*) => {$(
        impl IntoItemValue<$ty> for $ty {
            fn into_item_value(self) -> Result<ArrayD<$ty>, ItemFnError> {
                Ok(arr0(self).into_dyn())
            }
        }
    )*};
}

impl_scalar_item_value!(f32 f64 i8 i16 i32 i64 u8 u16 u32 u64);

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, ArrayD, IxDyn};

    fn ones(shape: &[usize]) -> ArrayD<f64> {
        ArrayD::from_elem(IxDyn(shape), 1.0)
    }

    #[test]
    fn test_scalar_closure() {
        let f = |item: ArrayViewD<f64>| item.sum();
        let item = ones(&[4, 4]);

        let value = f.call(item.view()).unwrap();
        assert_eq!(value, arr0(16.0).into_dyn());
        assert_eq!(value.shape(), &[] as &[usize]);
    }

    #[test]
    fn test_vec_closure() {
        let f = |item: ArrayViewD<f64>| vec![item.sum(), 0.0, 0.0];
        let item = ones(&[2, 2]);

        let value = f.call(item.view()).unwrap();
        assert_eq!(value.shape(), &[3]);
        assert_eq!(value[[0]], 4.0);
    }

    #[test]
    fn test_array_closure() {
        let f = |item: ArrayViewD<f64>| Array1::from(vec![item.sum(), item.len() as f64]);
        let item = ones(&[3]);

        let value = f.call(item.view()).unwrap();
        assert_eq!(value, Array1::from(vec![3.0, 3.0]).into_dyn());
    }

    #[test]
    fn test_fn_item() {
        fn mean(item: ArrayViewD<'_, f64>) -> f64 {
            item.sum() / item.len() as f64
        }

        let item = ones(&[5]);
        let value = mean.call(item.view()).unwrap();
        assert_eq!(value, arr0(1.0).into_dyn());
    }

    #[test]
    fn test_fallible_closure_ok() {
        let f = |item: ArrayViewD<f64>| -> Result<f64, ItemFnError> { Ok(item.sum()) };
        let item = ones(&[2]);

        assert_eq!(f.call(item.view()).unwrap(), arr0(2.0).into_dyn());
    }

    #[test]
    fn test_fallible_closure_err() {
        let f = |_item: ArrayViewD<f64>| -> Result<f64, ItemFnError> {
            Err(ItemFnError::new("bad item"))
        };
        let item = ones(&[2]);

        let err = f.call(item.view()).unwrap_err();
        assert_eq!(err.message(), "bad item");
        assert_eq!(err.to_string(), "bad item");
    }

    #[test]
    fn test_error_from_str() {
        let err: ItemFnError = "boom".into();
        assert_eq!(err, ItemFnError::new(String::from("boom")));
    }
}
