//! Reference CPU binding
//!
//! A direct pixel-driven discrete Radon transform pair on host memory. Each
//! pixel of a slice projects onto the detector at
//! `t = (ix - n/2) cos(theta) + (iy - n/2) sin(theta) + center` and is split
//! linearly between the two nearest detector bins; the adjoint gathers with
//! the identical weights, so the pair is an exact transpose up to summation
//! order. This is not the USFFT algorithm the native binding implements; it
//! exists so the orchestration layer runs and its operator properties are
//! testable without a GPU.

use num_complex::Complex32;
use num_traits::Zero;

use crate::binding::{
    slice_axpy, slice_dot_real, slice_norm_sqr, slice_scaled, slice_sub, TransformBinding,
    VectorOps,
};
use crate::error::{Result, TomoError};
use crate::geometry::Geometry;

/// Host-backed array in the CPU binding's memory space.
///
/// A newtype rather than a bare `Vec` so the staging boundary between caller
/// memory and binding memory stays explicit, matching what a device binding
/// enforces by construction.
#[derive(Debug, Clone)]
pub struct CpuArray {
    data: Vec<Complex32>,
}

impl CpuArray {
    pub fn as_slice(&self) -> &[Complex32] {
        &self.data
    }
}

impl VectorOps for CpuArray {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn norm_sqr(&self) -> f64 {
        slice_norm_sqr(&self.data)
    }

    fn dot_real(&self, other: &Self) -> f64 {
        slice_dot_real(&self.data, &other.data)
    }

    fn scaled(&self, s: f32) -> Self {
        CpuArray {
            data: slice_scaled(&self.data, s),
        }
    }

    fn axpy(&mut self, alpha: f32, x: &Self) {
        slice_axpy(&mut self.data, alpha, &x.data);
    }

    fn sub(&self, other: &Self) -> Self {
        CpuArray {
            data: slice_sub(&self.data, &other.data),
        }
    }
}

/// CPU implementation of the transform binding.
pub struct CpuBinding {
    geometry: Geometry,
    cos_theta: Vec<f32>,
    sin_theta: Vec<f32>,
}

impl CpuBinding {
    pub fn new(geometry: Geometry) -> Self {
        let cos_theta = geometry.theta().iter().map(|t| t.cos()).collect();
        let sin_theta = geometry.theta().iter().map(|t| t.sin()).collect();
        Self {
            geometry,
            cos_theta,
            sin_theta,
        }
    }

    fn check_len(actual: usize, expected: usize) -> Result<()> {
        if actual != expected {
            return Err(TomoError::ShapeMismatch { expected, actual });
        }
        Ok(())
    }
}

impl TransformBinding for CpuBinding {
    type Array = CpuArray;

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn upload(&self, host: &[Complex32]) -> Result<CpuArray> {
        Ok(CpuArray {
            data: host.to_vec(),
        })
    }

    fn download(&self, array: &CpuArray) -> Result<Vec<Complex32>> {
        Ok(array.data.clone())
    }

    fn forward(&self, volume: &CpuArray) -> Result<CpuArray> {
        let g = &self.geometry;
        Self::check_len(volume.len(), g.partition_volume_len())?;
        let (n, pnz) = (g.n(), g.pnz());
        let half = n as f32 / 2.0;

        let mut sino = vec![Complex32::zero(); g.partition_sino_len()];
        for (it, (&cos_t, &sin_t)) in self.cos_theta.iter().zip(&self.sin_theta).enumerate() {
            for iz in 0..pnz {
                let vol_base = iz * n * n;
                let sino_base = (it * pnz + iz) * n;
                for iy in 0..n {
                    let y = iy as f32 - half;
                    for ix in 0..n {
                        let x = ix as f32 - half;
                        let t = x * cos_t + y * sin_t + g.center();
                        let bin = t.floor();
                        let w = t - bin;
                        let b0 = bin as isize;
                        let v = volume.data[vol_base + iy * n + ix];
                        if (0..n as isize).contains(&b0) {
                            sino[sino_base + b0 as usize] += v * (1.0 - w);
                        }
                        if (0..n as isize).contains(&(b0 + 1)) {
                            sino[sino_base + (b0 + 1) as usize] += v * w;
                        }
                    }
                }
            }
        }
        Ok(CpuArray { data: sino })
    }

    fn adjoint(&self, projections: &CpuArray) -> Result<CpuArray> {
        let g = &self.geometry;
        Self::check_len(projections.len(), g.partition_sino_len())?;
        let (n, pnz) = (g.n(), g.pnz());
        let half = n as f32 / 2.0;

        let mut volume = vec![Complex32::zero(); g.partition_volume_len()];
        for (it, (&cos_t, &sin_t)) in self.cos_theta.iter().zip(&self.sin_theta).enumerate() {
            for iz in 0..pnz {
                let vol_base = iz * n * n;
                let sino_base = (it * pnz + iz) * n;
                for iy in 0..n {
                    let y = iy as f32 - half;
                    for ix in 0..n {
                        let x = ix as f32 - half;
                        let t = x * cos_t + y * sin_t + g.center();
                        let bin = t.floor();
                        let w = t - bin;
                        let b0 = bin as isize;
                        let mut acc = Complex32::zero();
                        if (0..n as isize).contains(&b0) {
                            acc += projections.data[sino_base + b0 as usize] * (1.0 - w);
                        }
                        if (0..n as isize).contains(&(b0 + 1)) {
                            acc += projections.data[sino_base + (b0 + 1) as usize] * w;
                        }
                        volume[vol_base + iy * n + ix] += acc;
                    }
                }
            }
        }
        Ok(CpuArray { data: volume })
    }

    fn release(&mut self) {
        // Host memory only; freed when the binding drops.
    }
}
