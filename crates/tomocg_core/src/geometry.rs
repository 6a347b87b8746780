//! Problem geometry and partition arithmetic
//!
//! A [`Geometry`] fixes every dimension for the lifetime of a solver session:
//! the projection angles, the volume depth and width, the detector width, and
//! the depth partition size that one device allocation must accommodate.
//! Validation happens here, before any device resource is touched.

use std::ops::Range;

use crate::error::{Result, TomoError};

/// Dimensions of one reconstruction problem.
///
/// Volumes have shape `(nz, n, n)` and projection sets (sinograms) have shape
/// `(ntheta, nz, n)`, both flattened in C order. The depth axis is split into
/// `nz / pnz` contiguous partitions of `pnz` slices each; device buffers are
/// sized for a single partition and reused across the batch.
#[derive(Debug, Clone)]
pub struct Geometry {
    theta: Vec<f32>,
    nz: usize,
    n: usize,
    pnz: usize,
    center: f32,
}

impl Geometry {
    /// Validate and fix the problem dimensions.
    ///
    /// # Arguments
    /// * `theta` - Projection angles in radians, one per projection
    /// * `nz` - Volume depth (number of z slices)
    /// * `n` - Volume and detector width in pixels
    /// * `pnz` - Depth slices per partition
    /// * `center` - Rotation center on the detector axis
    ///
    /// # Errors
    /// `InvalidGeometry` for empty angles or zero dimensions,
    /// `PartitionMismatch` when `pnz` does not divide `nz` exactly.
    pub fn new(theta: Vec<f32>, nz: usize, n: usize, pnz: usize, center: f32) -> Result<Self> {
        if theta.is_empty() {
            return Err(TomoError::InvalidGeometry(
                "projection angle set is empty".into(),
            ));
        }
        if nz == 0 || n == 0 || pnz == 0 {
            return Err(TomoError::InvalidGeometry(format!(
                "dimensions must be nonzero (nz={nz}, n={n}, pnz={pnz})"
            )));
        }
        if nz % pnz != 0 {
            return Err(TomoError::PartitionMismatch { nz, pnz });
        }
        Ok(Self {
            theta,
            nz,
            n,
            pnz,
            center,
        })
    }

    pub fn theta(&self) -> &[f32] {
        &self.theta
    }

    pub fn ntheta(&self) -> usize {
        self.theta.len()
    }

    pub fn nz(&self) -> usize {
        self.nz
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn pnz(&self) -> usize {
        self.pnz
    }

    pub fn center(&self) -> f32 {
        self.center
    }

    pub fn num_partitions(&self) -> usize {
        self.nz / self.pnz
    }

    /// Depth slice indices covered by partition `k`.
    pub fn partition_range(&self, k: usize) -> Range<usize> {
        k * self.pnz..(k + 1) * self.pnz
    }

    /// Element count of a full volume, shape `(nz, n, n)`.
    pub fn volume_len(&self) -> usize {
        self.nz * self.n * self.n
    }

    /// Element count of one volume partition, shape `(pnz, n, n)`.
    pub fn partition_volume_len(&self) -> usize {
        self.pnz * self.n * self.n
    }

    /// Element count of a full sinogram, shape `(ntheta, nz, n)`.
    pub fn sino_len(&self) -> usize {
        self.ntheta() * self.nz * self.n
    }

    /// Element count of one sinogram partition, shape `(ntheta, pnz, n)`.
    pub fn partition_sino_len(&self) -> usize {
        self.ntheta() * self.pnz * self.n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn angles(k: usize) -> Vec<f32> {
        (0..k).map(|i| i as f32 * 0.1).collect()
    }

    #[test]
    fn test_partition_arithmetic() {
        let g = Geometry::new(angles(3), 8, 4, 2, 2.0).unwrap();
        assert_eq!(g.num_partitions(), 4);
        assert_eq!(g.partition_range(0), 0..2);
        assert_eq!(g.partition_range(3), 6..8);
        assert_eq!(g.volume_len(), 8 * 4 * 4);
        assert_eq!(g.partition_volume_len(), 2 * 4 * 4);
        assert_eq!(g.sino_len(), 3 * 8 * 4);
        assert_eq!(g.partition_sino_len(), 3 * 2 * 4);
    }

    #[test]
    fn test_rejects_indivisible_depth() {
        let err = Geometry::new(angles(3), 5, 4, 2, 2.0).unwrap_err();
        match err {
            TomoError::PartitionMismatch { nz, pnz } => {
                assert_eq!((nz, pnz), (5, 2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_empty_angles() {
        let err = Geometry::new(Vec::new(), 4, 4, 2, 2.0).unwrap_err();
        assert!(matches!(err, TomoError::InvalidGeometry(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_rejects_zero_dimensions() {
        assert!(Geometry::new(angles(2), 4, 0, 2, 0.0).is_err());
        assert!(Geometry::new(angles(2), 4, 4, 0, 0.0).is_err());
    }
}
