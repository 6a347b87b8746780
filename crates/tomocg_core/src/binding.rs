//! Transform binding capability
//!
//! Defines the seam between the orchestration layer and the native Radon
//! transform implementation. The binding owns device resources sized for one
//! depth partition; the solver composes it rather than extending it, so GPU
//! bindings (CUDA, Metal) and the reference CPU binding are interchangeable.

use num_complex::Complex32;

use crate::error::Result;
use crate::geometry::Geometry;

/// Vector-space operations the CG recurrence needs on a binding's arrays.
///
/// For a GPU binding these run on device memory; the reference CPU binding
/// and the full-batch solver path implement them over host slices. All
/// reductions accumulate in `f64` so results are stable across partitions.
pub trait VectorOps: Clone {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Squared L2 norm, `sum |a_i|^2`.
    fn norm_sqr(&self) -> f64;

    /// Real part of the complex inner product `<self, other>`.
    fn dot_real(&self, other: &Self) -> f64;

    /// Returns `s * self`.
    fn scaled(&self, s: f32) -> Self;

    /// In-place `self += alpha * x`.
    fn axpy(&mut self, alpha: f32, x: &Self);

    /// Returns `self - other`.
    fn sub(&self, other: &Self) -> Self;
}

/// Capability contract for the Radon transform binding.
///
/// Construction parameters (the [`Geometry`]) fully determine the device
/// buffer sizes for the session's lifetime. `forward` and `adjoint` operate
/// on one partition's worth of data resident in the binding's memory space;
/// staging across the host/device boundary is explicit via `upload` and
/// `download`. Transform calls are deterministic given identical inputs.
///
/// Calling any operation after `release` is undefined behavior at this level;
/// [`crate::solver::TomoSolver`] owns the binding and makes that misuse
/// unrepresentable.
pub trait TransformBinding {
    /// Array type in the binding's memory space.
    type Array: VectorOps;

    /// Name of this binding (for logging).
    fn name(&self) -> &'static str;

    fn geometry(&self) -> &Geometry;

    /// Stage a host slice into the binding's memory space.
    fn upload(&self, host: &[Complex32]) -> Result<Self::Array>;

    /// Copy an array back to host memory.
    fn download(&self, array: &Self::Array) -> Result<Vec<Complex32>>;

    /// Radon transform of one volume partition, `(pnz, n, n) -> (ntheta, pnz, n)`.
    fn forward(&self, volume: &Self::Array) -> Result<Self::Array>;

    /// Adjoint Radon transform of one sinogram partition,
    /// `(ntheta, pnz, n) -> (pnz, n, n)`.
    fn adjoint(&self, projections: &Self::Array) -> Result<Self::Array>;

    /// Release the session's device resources. Called exactly once by the
    /// owning solver; must tolerate nothing further being called afterwards.
    fn release(&mut self);
}

/// Host-side arrays satisfy the same contract; the full-batch CG variant
/// runs the recurrence directly over them.
impl VectorOps for Vec<Complex32> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn norm_sqr(&self) -> f64 {
        slice_norm_sqr(self)
    }

    fn dot_real(&self, other: &Self) -> f64 {
        slice_dot_real(self, other)
    }

    fn scaled(&self, s: f32) -> Self {
        slice_scaled(self, s)
    }

    fn axpy(&mut self, alpha: f32, x: &Self) {
        slice_axpy(self, alpha, x);
    }

    fn sub(&self, other: &Self) -> Self {
        slice_sub(self, other)
    }
}

pub(crate) fn slice_norm_sqr(a: &[Complex32]) -> f64 {
    a.iter().map(|v| v.norm_sqr() as f64).sum()
}

pub(crate) fn slice_dot_real(a: &[Complex32], b: &[Complex32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| (x.re as f64) * (y.re as f64) + (x.im as f64) * (y.im as f64))
        .sum()
}

pub(crate) fn slice_scaled(a: &[Complex32], s: f32) -> Vec<Complex32> {
    a.iter().map(|&v| v * s).collect()
}

pub(crate) fn slice_axpy(a: &mut [Complex32], alpha: f32, x: &[Complex32]) {
    debug_assert_eq!(a.len(), x.len());
    for (v, &w) in a.iter_mut().zip(x) {
        *v += w * alpha;
    }
}

pub(crate) fn slice_sub(a: &[Complex32], b: &[Complex32]) -> Vec<Complex32> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(&x, &y)| x - y).collect()
}
