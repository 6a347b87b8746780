//! Tomography CG Core Library
//!
//! Host-side orchestration for iterative tomographic reconstruction on top of
//! an opaque Radon transform binding.
//!
//! # Overview
//!
//! The heavy lifting of tomography, the USFFT-based Radon transform and its
//! GPU kernels, lives in an external binding that this crate treats as a
//! capability with four operations: construct with geometry, forward project,
//! back project (adjoint), and release. What this crate adds around it:
//!
//! - slicing volumes too large for device memory into depth partitions and
//!   driving the transform partition by partition,
//! - a nonlinear conjugate-gradient least-squares solver that reconstructs a
//!   volume from projection data, in a per-partition and a full-batch variant,
//! - a bounded backtracking line search for the CG step size,
//! - scoped session lifecycle so device resources are released exactly once.
//!
//! # Key Components
//!
//! - [`geometry`] - Problem dimensions and partition arithmetic
//! - [`binding`] - The transform binding capability and device-array traits
//! - [`cpu`] - Reference CPU binding (direct discrete Radon pair)
//! - [`solver`] - Batched transforms, line search, and the CG solver
//! - [`error`] - Error taxonomy shared across the crate

pub mod binding;
pub mod cpu;
pub mod error;
pub mod geometry;
pub mod solver;

pub use binding::{TransformBinding, VectorOps};
pub use cpu::{CpuArray, CpuBinding};
pub use error::{Result, TomoError};
pub use geometry::Geometry;
pub use solver::{line_search, CgConfig, CgIteration, LineSearchOutcome, TomoSolver};
