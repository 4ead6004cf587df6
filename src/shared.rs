//! Shared-read, disjoint-write storage for the worker pool.
//!
//! The coordinator owns every parameter array; workers receive `Arc` handles
//! and write only the rows or index ranges they popped from a work queue.
//! Within one fan-out each index is processed by exactly one worker, and the
//! coordinator's barriers separate any fan-out that writes an array from any
//! fan-out that reads it. That partitioning discipline — not a lock — is
//! what makes the interior mutability here sound, so every accessor that
//! could be misused to create an overlapping write is `unsafe` with that
//! contract spelled out.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, Ordering};

/// A `f64` cell readable by workers while the coordinator updates it between
/// fan-outs.
#[derive(Debug)]
pub struct ScalarCell(AtomicU64);

impl ScalarCell {
    /// Create with an initial value.
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    /// Read the current value.
    #[inline]
    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Replace the value.
    #[inline]
    pub fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// A vector whose elements are written by whichever worker owns their index.
pub struct SharedVec<T> {
    inner: UnsafeCell<Vec<T>>,
}

// SAFETY: element access follows the index-partitioning contract described
// in the module docs; the queue mutexes that hand out the partitions provide
// the necessary happens-before edges between phases.
unsafe impl<T: Send> Sync for SharedVec<T> {}
unsafe impl<T: Send> Send for SharedVec<T> {}

impl<T> SharedVec<T> {
    /// Wrap a vector.
    pub fn new(values: Vec<T>) -> Self {
        Self {
            inner: UnsafeCell::new(values),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        // SAFETY: the length is never changed after construction.
        unsafe { (*self.inner.get()).len() }
    }

    /// Whether the vector is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutable access to element `i`.
    ///
    /// # Safety
    ///
    /// The caller must be the sole accessor of index `i` for the lifetime of
    /// the returned reference, per the fan-out partitioning contract.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_mut(&self, i: usize) -> &mut T {
        &mut (&mut *self.inner.get())[i]
    }
}

impl<T: Copy> SharedVec<T> {
    /// Read element `i`.
    ///
    /// # Safety
    ///
    /// No worker may be concurrently writing index `i`.
    #[inline]
    pub unsafe fn get(&self, i: usize) -> T {
        (&*self.inner.get())[i]
    }

    /// Write element `i`.
    ///
    /// # Safety
    ///
    /// The caller must own index `i` within the current fan-out.
    #[inline]
    pub unsafe fn set(&self, i: usize, value: T) {
        (&mut *self.inner.get())[i] = value;
    }

    /// Snapshot the contents.
    ///
    /// # Safety
    ///
    /// No fan-out writing this vector may be in flight.
    pub unsafe fn to_vec(&self) -> Vec<T> {
        (*self.inner.get()).clone()
    }
}

/// A dense row-major `f32` matrix with the same access discipline.
pub struct SharedMatrix {
    rows: usize,
    cols: usize,
    data: UnsafeCell<Vec<f32>>,
}

// SAFETY: see `SharedVec`.
unsafe impl Sync for SharedMatrix {}
unsafe impl Send for SharedMatrix {}

impl SharedMatrix {
    /// Create a zeroed matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: UnsafeCell::new(vec![0.0; rows * cols]),
        }
    }

    /// Create a matrix filled with `value`.
    pub fn filled(rows: usize, cols: usize, value: f32) -> Self {
        Self {
            rows,
            cols,
            data: UnsafeCell::new(vec![value; rows * cols]),
        }
    }

    /// Number of rows.
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Read element `(i, j)`.
    ///
    /// # Safety
    ///
    /// No worker may be concurrently writing row `i`.
    #[inline]
    pub unsafe fn get(&self, i: usize, j: usize) -> f32 {
        debug_assert!(i < self.rows && j < self.cols);
        (&*self.data.get())[i * self.cols + j]
    }

    /// Write element `(i, j)`.
    ///
    /// # Safety
    ///
    /// The caller must own either row `i` or column `j` (whichever axis the
    /// current fan-out partitions) exclusively.
    #[inline]
    pub unsafe fn set(&self, i: usize, j: usize, value: f32) {
        debug_assert!(i < self.rows && j < self.cols);
        (&mut *self.data.get())[i * self.cols + j] = value;
    }

    /// Overwrite row `i` from a slice.
    ///
    /// # Safety
    ///
    /// The caller must own row `i` exclusively.
    pub unsafe fn set_row(&self, i: usize, values: &[f32]) {
        let row = &mut (&mut *self.data.get())[i * self.cols..(i + 1) * self.cols];
        row.copy_from_slice(values);
    }

    /// Copy row `i` into `out`.
    ///
    /// # Safety
    ///
    /// No worker may be concurrently writing row `i`.
    pub unsafe fn copy_row_into(&self, i: usize, out: &mut [f32]) {
        let row = &(&*self.data.get())[i * self.cols..(i + 1) * self.cols];
        out.copy_from_slice(row);
    }

    /// Multiply every element of row `i` by `factor`.
    ///
    /// # Safety
    ///
    /// The caller must own row `i` exclusively.
    pub unsafe fn scale_row(&self, i: usize, factor: f32) {
        for x in &mut (&mut *self.data.get())[i * self.cols..(i + 1) * self.cols] {
            *x *= factor;
        }
    }

    /// Snapshot the contents, flattened row-major.
    ///
    /// # Safety
    ///
    /// No fan-out writing this matrix may be in flight.
    pub unsafe fn to_vec(&self) -> Vec<f32> {
        (*self.data.get()).clone()
    }
}
