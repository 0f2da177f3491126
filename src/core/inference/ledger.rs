//! Tracked tensor allocations.
//!
//! Every tensor the pipeline allocates for a request lives in a
//! [`TensorHandle`]. Handles register with a shared [`TensorLedger`] when they
//! are created and deregister in `Drop`, so release happens on every exit path
//! (early return, `?`, panic unwinding) without explicit cleanup calls. The
//! ledger counts are what tests use to prove nothing leaked.

use ndarray::{Array, ArrayView, Dimension, Ix4, IxDyn};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Type alias for the 4D `[batch, height, width, channels]` model input.
pub type Tensor4D = Array<f32, Ix4>;

/// Type alias for a model output of arbitrary rank.
pub type TensorDyn = Array<f32, IxDyn>;

/// Counts live and total tensor allocations.
#[derive(Debug, Default)]
pub struct TensorLedger {
    live: AtomicUsize,
    total: AtomicUsize,
}

impl TensorLedger {
    /// Creates an empty, shareable ledger.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of handles currently alive.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Number of handles ever allocated through this ledger.
    pub fn total_allocated(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    fn acquire(&self) {
        self.live.fetch_add(1, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A tensor owned by exactly one scope and released when it is dropped.
#[derive(Debug)]
pub struct TensorHandle<D: Dimension = Ix4> {
    data: Array<f32, D>,
    ledger: Arc<TensorLedger>,
}

impl<D: Dimension> TensorHandle<D> {
    /// Registers `data` with `ledger` and takes ownership of it.
    pub fn allocate(ledger: &Arc<TensorLedger>, data: Array<f32, D>) -> Self {
        ledger.acquire();
        Self {
            data,
            ledger: Arc::clone(ledger),
        }
    }

    /// Borrows the tensor data.
    pub fn array(&self) -> &Array<f32, D> {
        &self.data
    }

    /// Returns a view of the tensor data.
    pub fn view(&self) -> ArrayView<'_, f32, D> {
        self.data.view()
    }

    /// Shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the tensor has no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The ledger this handle is registered with.
    pub fn ledger(&self) -> &Arc<TensorLedger> {
        &self.ledger
    }
}

impl<D: Dimension> Drop for TensorHandle<D> {
    fn drop(&mut self) {
        self.ledger.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_counts() {
        let ledger = TensorLedger::new();
        {
            let a = TensorHandle::allocate(&ledger, Tensor4D::zeros((1, 2, 2, 3)));
            let b = TensorHandle::allocate(&ledger, TensorDyn::zeros(IxDyn(&[1, 3])));
            assert_eq!(ledger.live(), 2);
            assert_eq!(a.shape(), &[1, 2, 2, 3]);
            assert_eq!(b.len(), 3);
        }
        assert_eq!(ledger.live(), 0);
        assert_eq!(ledger.total_allocated(), 2);
    }

    #[test]
    fn test_release_on_error_path() {
        fn fails(ledger: &Arc<TensorLedger>) -> Result<(), String> {
            let _handle = TensorHandle::allocate(ledger, Tensor4D::zeros((1, 1, 1, 3)));
            Err("inference failed".to_string())
        }

        let ledger = TensorLedger::new();
        assert!(fails(&ledger).is_err());
        assert_eq!(ledger.live(), 0);
        assert_eq!(ledger.total_allocated(), 1);
    }
}
