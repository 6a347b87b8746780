//! Partitioned CG reconstruction solver
//!
//! [`TomoSolver`] drives an opaque transform binding over depth partitions of
//! a full-size problem and minimizes `||R(u) - xi0||^2` with nonlinear
//! conjugate gradients (Polak–Ribière direction updates, backtracking line
//! search). Two batched variants exist by design and are not interchangeable:
//!
//! - [`TomoSolver::cg_batch`] optimizes each depth partition's residual
//!   independently, reusing one partition-sized device allocation;
//! - [`TomoSolver::cg_fullbatch`] runs one global recurrence over full-size
//!   host arrays, paying a host/device round trip per operator application.
//!
//! Device resources are released exactly once, on [`TomoSolver::close`] or on
//! drop, whichever comes first.

use num_complex::Complex32;
use num_traits::Zero;

use crate::binding::{TransformBinding, VectorOps};
use crate::error::{Result, TomoError};
use crate::geometry::Geometry;

/// Stabilizer added to the Polak–Ribière denominator so a vanishing
/// `<d, grad - grad_prev>` cannot produce NaN/Inf directions.
const PR_EPS: f64 = 1e-32;

/// Configuration for the CG solver.
#[derive(Debug, Clone)]
pub struct CgConfig {
    /// Number of CG iterations. Zero returns the initial estimate unchanged.
    pub iterations: usize,
    /// Optional early exit: stop once the residual objective
    /// `||R(u) - xi0||^2` falls to this value or below. `None` always runs
    /// the full iteration count.
    pub tolerance: Option<f64>,
    /// Bound on step halvings per line search.
    pub max_line_search_steps: u32,
}

impl Default for CgConfig {
    fn default() -> Self {
        Self {
            iterations: 32,
            tolerance: None,
            max_line_search_steps: 64,
        }
    }
}

/// Per-iteration diagnostics handed to the observer callback.
#[derive(Debug, Clone, Copy)]
pub struct CgIteration {
    /// Depth partition index (0 for the single-partition and full-batch paths).
    pub partition: usize,
    /// Iteration index within this CG run.
    pub index: usize,
    /// Step size applied to the search direction.
    pub step: f32,
    /// Residual objective after the update.
    pub objective: f64,
}

/// Result of a backtracking line search.
#[derive(Debug, Clone, Copy)]
pub struct LineSearchOutcome {
    /// Accepted step, or the best-found step (zero) on exhaustion.
    pub step: f32,
    /// Whether the sufficient-decrease condition was met.
    pub satisfied: bool,
    /// Number of objective evaluations spent.
    pub evaluations: u32,
}

/// Backtracking step-halving search.
///
/// Returns the first `gamma` in `gamma0, gamma0/2, gamma0/4, ...` whose
/// objective does not exceed `objective(0.0)`. The search is bounded by
/// `max_halvings`; on exhaustion every trial step increased the objective,
/// so the best-found step is zero and `satisfied` is false.
pub fn line_search<F: Fn(f32) -> f64>(
    objective: F,
    gamma0: f32,
    max_halvings: u32,
) -> LineSearchOutcome {
    debug_assert!(gamma0 > 0.0);
    let f0 = objective(0.0);
    let mut gamma = gamma0;
    let mut evaluations = 0;
    while evaluations < max_halvings {
        evaluations += 1;
        if objective(gamma) <= f0 {
            return LineSearchOutcome {
                step: gamma,
                satisfied: true,
                evaluations,
            };
        }
        gamma *= 0.5;
    }
    LineSearchOutcome {
        step: 0.0,
        satisfied: false,
        evaluations,
    }
}

/// Nonlinear CG recurrence shared by the device and host paths.
///
/// Minimizes `||forward(u) - xi0||^2`. The line-search objective is evaluated
/// through the exact quadratic expansion
/// `f(g) = ||r||^2 + 2 g Re<r, Rd> + g^2 ||Rd||^2` with `r = forward(u) - xi0`,
/// which needs no extra operator applications per trial step.
fn cg_loop<A, Fwd, Adj>(
    forward: Fwd,
    adjoint: Adj,
    xi0: &A,
    mut u: A,
    grad_scale: f32,
    cfg: &CgConfig,
    partition: usize,
    observer: &mut dyn FnMut(CgIteration),
) -> Result<A>
where
    A: VectorOps,
    Fwd: Fn(&A) -> Result<A>,
    Adj: Fn(&A) -> Result<A>,
{
    // (direction, previous gradient), populated after the first iteration
    let mut state: Option<(A, A)> = None;

    for i in 0..cfg.iterations {
        let ru = forward(&u)?;
        let resid = ru.sub(xi0);
        let grad = adjoint(&resid)?.scaled(grad_scale);

        let dir = match state.take() {
            None => grad.scaled(-1.0),
            Some((prev_dir, prev_grad)) => {
                let denom = prev_dir.dot_real(&grad.sub(&prev_grad)) + PR_EPS;
                let beta = (grad.norm_sqr() / denom) as f32;
                let mut dir = grad.scaled(-1.0);
                dir.axpy(beta, &prev_dir);
                dir
            }
        };

        let rd = forward(&dir)?;
        let f0 = resid.norm_sqr();
        let cross = resid.dot_real(&rd);
        let rd2 = rd.norm_sqr();
        let quadratic =
            |g: f32| f0 + 2.0 * (g as f64) * cross + (g as f64) * (g as f64) * rd2;

        let outcome = line_search(quadratic, 1.0, cfg.max_line_search_steps);
        if !outcome.satisfied {
            log::warn!(
                "line search exhausted after {} halvings (partition {}, iteration {})",
                outcome.evaluations,
                partition,
                i
            );
        }
        let gamma = 0.5 * outcome.step;
        u.axpy(gamma, &dir);

        let objective = quadratic(gamma);
        observer(CgIteration {
            partition,
            index: i,
            step: gamma,
            objective,
        });
        state = Some((dir, grad));

        if let Some(tol) = cfg.tolerance {
            if objective <= tol {
                log::debug!(
                    "converged at iteration {} (partition {}, objective {:.3e})",
                    i,
                    partition,
                    objective
                );
                break;
            }
        }
    }
    Ok(u)
}

/// Reconstruction session owning a transform binding.
///
/// The binding's device buffers are sized for one depth partition and reused
/// across partitions and iterations. Release happens exactly once: either
/// via [`TomoSolver::close`], after which the solver no longer exists, or in
/// `Drop` on any other exit path (including unwinding).
pub struct TomoSolver<B: TransformBinding> {
    binding: B,
    released: bool,
}

impl<B: TransformBinding> TomoSolver<B> {
    pub fn new(binding: B) -> Self {
        Self {
            binding,
            released: false,
        }
    }

    pub fn geometry(&self) -> &Geometry {
        self.binding.geometry()
    }

    pub fn binding(&self) -> &B {
        &self.binding
    }

    /// Release device resources now instead of at drop.
    pub fn close(mut self) {
        self.release_resources();
    }

    fn release_resources(&mut self) {
        if !self.released {
            self.binding.release();
            self.released = true;
        }
    }

    /// Fixed gradient normalization, `1 / (ntheta * n / 2)`.
    fn grad_scale(&self) -> f32 {
        let g = self.geometry();
        2.0 / (g.ntheta() as f32 * g.n() as f32)
    }

    fn check_len(actual: usize, expected: usize) -> Result<()> {
        if actual != expected {
            return Err(TomoError::ShapeMismatch { expected, actual });
        }
        Ok(())
    }

    /// Radon transform of one device-resident volume partition.
    pub fn fwd_partition(&self, volume: &B::Array) -> Result<B::Array> {
        Self::check_len(volume.len(), self.geometry().partition_volume_len())?;
        self.binding.forward(volume)
    }

    /// Adjoint Radon transform of one device-resident sinogram partition.
    pub fn adj_partition(&self, projections: &B::Array) -> Result<B::Array> {
        Self::check_len(projections.len(), self.geometry().partition_sino_len())?;
        self.binding.adjoint(projections)
    }

    /// Radon transform of a full-size host volume, partition by partition.
    ///
    /// Stages each contiguous depth slab to the binding, transforms it, and
    /// scatters the result into the angle-major output layout. Partitions run
    /// strictly sequentially; any error aborts the batch with no partial
    /// result.
    pub fn fwd_batch(&self, volume: &[Complex32]) -> Result<Vec<Complex32>> {
        let g = self.geometry();
        Self::check_len(volume.len(), g.volume_len())?;
        let (ntheta, nz, n, pnz) = (g.ntheta(), g.nz(), g.n(), g.pnz());

        let mut sino = vec![Complex32::zero(); g.sino_len()];
        for k in 0..g.num_partitions() {
            let ids = g.partition_range(k);
            log::debug!(
                "fwd_batch [{}]: partition {}/{} (slices {}..{})",
                self.binding.name(),
                k + 1,
                g.num_partitions(),
                ids.start,
                ids.end
            );
            let staged = self.binding.upload(&volume[ids.start * n * n..ids.end * n * n])?;
            let part = self.binding.forward(&staged)?;
            let host = self.binding.download(&part)?;
            for it in 0..ntheta {
                for (local, iz) in ids.clone().enumerate() {
                    let src = (it * pnz + local) * n;
                    let dst = (it * nz + iz) * n;
                    sino[dst..dst + n].copy_from_slice(&host[src..src + n]);
                }
            }
        }
        Ok(sino)
    }

    /// Adjoint Radon transform of a full-size host sinogram, partition by
    /// partition. Symmetric to [`TomoSolver::fwd_batch`]: gathers each
    /// partition's strided sinogram rows into a contiguous staging buffer,
    /// transforms, and writes the volume slab back contiguously.
    pub fn adj_batch(&self, projections: &[Complex32]) -> Result<Vec<Complex32>> {
        let g = self.geometry();
        Self::check_len(projections.len(), g.sino_len())?;
        let (ntheta, nz, n, pnz) = (g.ntheta(), g.nz(), g.n(), g.pnz());

        let mut volume = vec![Complex32::zero(); g.volume_len()];
        let mut staging = vec![Complex32::zero(); g.partition_sino_len()];
        for k in 0..g.num_partitions() {
            let ids = g.partition_range(k);
            log::debug!(
                "adj_batch [{}]: partition {}/{} (slices {}..{})",
                self.binding.name(),
                k + 1,
                g.num_partitions(),
                ids.start,
                ids.end
            );
            for it in 0..ntheta {
                for (local, iz) in ids.clone().enumerate() {
                    let src = (it * nz + iz) * n;
                    let dst = (it * pnz + local) * n;
                    staging[dst..dst + n].copy_from_slice(&projections[src..src + n]);
                }
            }
            let staged = self.binding.upload(&staging)?;
            let part = self.binding.adjoint(&staged)?;
            let host = self.binding.download(&part)?;
            volume[ids.start * n * n..ids.end * n * n].copy_from_slice(&host);
        }
        Ok(volume)
    }

    /// CG solve of `||R(u) - xi0||^2` for one device-resident partition.
    ///
    /// `xi0` is the target sinogram partition, `u` the initial volume
    /// partition estimate. The observer, when present, is invoked once per
    /// iteration.
    pub fn cg_partition(
        &self,
        xi0: &B::Array,
        u: B::Array,
        cfg: &CgConfig,
        mut observer: Option<&mut dyn FnMut(CgIteration)>,
    ) -> Result<B::Array> {
        let g = self.geometry();
        Self::check_len(u.len(), g.partition_volume_len())?;
        Self::check_len(xi0.len(), g.partition_sino_len())?;
        cg_loop(
            |v| self.binding.forward(v),
            |p| self.binding.adjoint(p),
            xi0,
            u,
            self.grad_scale(),
            cfg,
            0,
            &mut |it| {
                if let Some(obs) = observer.as_mut() {
                    obs(it);
                }
            },
        )
    }

    /// Per-partition batched CG reconstruction.
    ///
    /// Copies `init`, then reconstructs every depth partition independently
    /// with [`TomoSolver::cg_partition`] semantics, writing results back in
    /// place. Each partition minimizes its own residual; there is no coupling
    /// of gradient or direction state across partitions.
    pub fn cg_batch(
        &self,
        xi0: &[Complex32],
        init: &[Complex32],
        cfg: &CgConfig,
        mut observer: Option<&mut dyn FnMut(CgIteration)>,
    ) -> Result<Vec<Complex32>> {
        let g = self.geometry();
        Self::check_len(xi0.len(), g.sino_len())?;
        Self::check_len(init.len(), g.volume_len())?;
        let (ntheta, nz, n, pnz) = (g.ntheta(), g.nz(), g.n(), g.pnz());

        let mut u = init.to_vec();
        let mut staging = vec![Complex32::zero(); g.partition_sino_len()];
        for k in 0..g.num_partitions() {
            let ids = g.partition_range(k);
            log::debug!(
                "cg_batch [{}]: partition {}/{}",
                self.binding.name(),
                k + 1,
                g.num_partitions()
            );
            for it in 0..ntheta {
                for (local, iz) in ids.clone().enumerate() {
                    let src = (it * nz + iz) * n;
                    let dst = (it * pnz + local) * n;
                    staging[dst..dst + n].copy_from_slice(&xi0[src..src + n]);
                }
            }
            let xi0_dev = self.binding.upload(&staging)?;
            let u_dev = self.binding.upload(&u[ids.start * n * n..ids.end * n * n])?;
            let u_dev = cg_loop(
                |v| self.binding.forward(v),
                |p| self.binding.adjoint(p),
                &xi0_dev,
                u_dev,
                self.grad_scale(),
                cfg,
                k,
                &mut |it| {
                    if let Some(obs) = observer.as_mut() {
                        obs(it);
                    }
                },
            )?;
            let host = self.binding.download(&u_dev)?;
            u[ids.start * n * n..ids.end * n * n].copy_from_slice(&host);
        }
        Ok(u)
    }

    /// Full-batch CG reconstruction.
    ///
    /// Runs the same recurrence over full-size host arrays, applying
    /// [`TomoSolver::fwd_batch`]/[`TomoSolver::adj_batch`] each iteration so
    /// direction and step accumulate across all partitions. One global
    /// convergence trajectory, at the cost of a host/device round trip per
    /// operator application. Numerically distinct from [`TomoSolver::cg_batch`]
    /// by design.
    pub fn cg_fullbatch(
        &self,
        xi0: &[Complex32],
        init: &[Complex32],
        cfg: &CgConfig,
        mut observer: Option<&mut dyn FnMut(CgIteration)>,
    ) -> Result<Vec<Complex32>> {
        let g = self.geometry();
        Self::check_len(xi0.len(), g.sino_len())?;
        Self::check_len(init.len(), g.volume_len())?;

        let target = xi0.to_vec();
        cg_loop(
            |v: &Vec<Complex32>| self.fwd_batch(v),
            |p: &Vec<Complex32>| self.adj_batch(p),
            &target,
            init.to_vec(),
            self.grad_scale(),
            cfg,
            0,
            &mut |it| {
                if let Some(obs) = observer.as_mut() {
                    obs(it);
                }
            },
        )
    }
}

impl<B: TransformBinding> Drop for TomoSolver<B> {
    fn drop(&mut self) {
        self.release_resources();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuBinding;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    fn scenario_solver() -> TomoSolver<CpuBinding> {
        let theta = vec![0.0, FRAC_PI_4, FRAC_PI_2];
        let g = Geometry::new(theta, 4, 4, 2, 2.0).unwrap();
        TomoSolver::new(CpuBinding::new(g))
    }

    fn random_volume(rng: &mut StdRng, len: usize) -> Vec<Complex32> {
        (0..len)
            .map(|_| Complex32::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
            .collect()
    }

    fn unit_voxel_volume(g: &Geometry) -> Vec<Complex32> {
        let n = g.n();
        let mut vol = vec![Complex32::zero(); g.volume_len()];
        // slice 1, center pixel
        vol[n * n + (n / 2) * n + n / 2] = Complex32::new(1.0, 0.0);
        vol
    }

    #[test]
    fn test_line_search_accepts_descent_step() {
        // f(g) = (g - 1)^2: the initial step is already non-increasing
        let out = line_search(|g| ((g - 1.0) * (g - 1.0)) as f64, 1.0, 16);
        assert!(out.satisfied);
        assert_eq!(out.step, 1.0);
        assert_eq!(out.evaluations, 1);
    }

    #[test]
    fn test_line_search_halves_until_decrease() {
        // f(g) = (g - 0.2)^2: f(1) > f(0), first accepted step is 0.25
        let out = line_search(|g| ((g - 0.2) * (g - 0.2)) as f64, 1.0, 16);
        assert!(out.satisfied);
        assert!((out.step - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_line_search_exhausts_on_ascent_direction() {
        let out = line_search(|g| 1.0 + g as f64, 1.0, 8);
        assert!(!out.satisfied);
        assert_eq!(out.step, 0.0);
        assert_eq!(out.evaluations, 8);
    }

    #[test]
    fn test_fwd_batch_matches_per_partition_forward() {
        let solver = scenario_solver();
        let g = solver.geometry();
        let (ntheta, nz, n, pnz) = (g.ntheta(), g.nz(), g.n(), g.pnz());
        let mut rng = StdRng::seed_from_u64(3);
        let volume = random_volume(&mut rng, g.volume_len());

        let batched = solver.fwd_batch(&volume).unwrap();

        let mut manual = vec![Complex32::zero(); g.sino_len()];
        for k in 0..g.num_partitions() {
            let ids = g.partition_range(k);
            let staged = solver
                .binding()
                .upload(&volume[ids.start * n * n..ids.end * n * n])
                .unwrap();
            let part = solver.fwd_partition(&staged).unwrap();
            let host = solver.binding().download(&part).unwrap();
            for it in 0..ntheta {
                for (local, iz) in ids.clone().enumerate() {
                    let src = (it * pnz + local) * n;
                    let dst = (it * nz + iz) * n;
                    manual[dst..dst + n].copy_from_slice(&host[src..src + n]);
                }
            }
        }
        assert_eq!(batched, manual);
    }

    #[test]
    fn test_adjoint_consistency_batched() {
        let solver = scenario_solver();
        let g = solver.geometry();
        let mut rng = StdRng::seed_from_u64(5);
        let u = random_volume(&mut rng, g.volume_len());
        let p = random_volume(&mut rng, g.sino_len());

        let ru = solver.fwd_batch(&u).unwrap();
        let rtp = solver.adj_batch(&p).unwrap();

        let lhs = crate::binding::slice_dot_real(&ru, &p);
        let rhs = crate::binding::slice_dot_real(&u, &rtp);
        assert!(
            (lhs - rhs).abs() < 1e-4 * (1.0 + lhs.abs()),
            "<Ru,p>={lhs} vs <u,R*p>={rhs}"
        );
    }

    #[test]
    fn test_zero_iterations_returns_init_unchanged() {
        let solver = scenario_solver();
        let g = solver.geometry();
        let mut rng = StdRng::seed_from_u64(9);
        let init = random_volume(&mut rng, g.volume_len());
        let xi0 = random_volume(&mut rng, g.sino_len());

        let cfg = CgConfig {
            iterations: 0,
            ..CgConfig::default()
        };
        let out = solver.cg_batch(&xi0, &init, &cfg, None).unwrap();
        assert_eq!(out, init);
    }

    #[test]
    fn test_cg_batch_is_deterministic() {
        let solver = scenario_solver();
        let g = solver.geometry();
        let mut rng = StdRng::seed_from_u64(21);
        let init = random_volume(&mut rng, g.volume_len());
        let xi0 = solver
            .fwd_batch(&random_volume(&mut rng, g.volume_len()))
            .unwrap();

        let cfg = CgConfig {
            iterations: 5,
            ..CgConfig::default()
        };
        let a = solver.cg_batch(&xi0, &init, &cfg, None).unwrap();
        let b = solver.cg_batch(&xi0, &init, &cfg, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cg_objective_is_monotone() {
        let solver = scenario_solver();
        let g = solver.geometry();
        let xi0 = solver.fwd_batch(&unit_voxel_volume(g)).unwrap();
        let init = vec![Complex32::zero(); g.volume_len()];

        let cfg = CgConfig {
            iterations: 8,
            ..CgConfig::default()
        };

        // Full-batch: one global trajectory
        let mut objectives = Vec::new();
        let mut obs = |it: CgIteration| objectives.push(it.objective);
        solver
            .cg_fullbatch(&xi0, &init, &cfg, Some(&mut obs))
            .unwrap();
        assert_eq!(objectives.len(), cfg.iterations);
        for w in objectives.windows(2) {
            assert!(
                w[1] <= w[0] * (1.0 + 1e-4) + 1e-8,
                "objective increased: {} -> {}",
                w[0],
                w[1]
            );
        }

        // Per-partition: each partition's trajectory is monotone on its own
        let mut per_partition: Vec<Vec<f64>> = vec![Vec::new(); g.num_partitions()];
        let mut obs = |it: CgIteration| per_partition[it.partition].push(it.objective);
        solver.cg_batch(&xi0, &init, &cfg, Some(&mut obs)).unwrap();
        for objectives in &per_partition {
            assert_eq!(objectives.len(), cfg.iterations);
            for w in objectives.windows(2) {
                assert!(w[1] <= w[0] * (1.0 + 1e-4) + 1e-8);
            }
        }
    }

    #[test]
    fn test_scenario_single_iteration_reduces_objective() {
        // Angles [0, pi/4, pi/2], width 4, depth 4, pnz 2, unit voxel
        // target, zero initial guess.
        let solver = scenario_solver();
        let g = solver.geometry();
        let xi0 = solver.fwd_batch(&unit_voxel_volume(g)).unwrap();
        let init = vec![Complex32::zero(); g.volume_len()];

        let f_init = crate::binding::slice_norm_sqr(&xi0);
        assert!(f_init > 0.0);

        let cfg = CgConfig {
            iterations: 1,
            ..CgConfig::default()
        };
        let u1 = solver.cg_batch(&xi0, &init, &cfg, None).unwrap();
        let resid = crate::binding::slice_sub(&solver.fwd_batch(&u1).unwrap(), &xi0);
        let f1 = crate::binding::slice_norm_sqr(&resid);
        assert!(f1 < f_init, "objective not reduced: {f1} >= {f_init}");
    }

    #[test]
    fn test_pr_update_stays_finite_at_exact_solution() {
        // Starting at the exact solution the gradient and direction vanish;
        // the stabilized PR update must keep producing finite iterates.
        let solver = scenario_solver();
        let g = solver.geometry();
        let exact = unit_voxel_volume(g);
        let xi0 = solver.fwd_batch(&exact).unwrap();

        let cfg = CgConfig {
            iterations: 3,
            ..CgConfig::default()
        };
        let out = solver.cg_batch(&xi0, &exact, &cfg, None).unwrap();
        assert!(out.iter().all(|v| v.re.is_finite() && v.im.is_finite()));
        // and the solution is not perturbed
        let resid = crate::binding::slice_sub(&solver.fwd_batch(&out).unwrap(), &xi0);
        assert!(crate::binding::slice_norm_sqr(&resid) < 1e-10);
    }

    #[test]
    fn test_tolerance_stops_early() {
        let solver = scenario_solver();
        let g = solver.geometry();
        let exact = unit_voxel_volume(g);
        let xi0 = solver.fwd_batch(&exact).unwrap();

        let cfg = CgConfig {
            iterations: 50,
            tolerance: Some(1e-6),
            ..CgConfig::default()
        };
        let mut count = 0usize;
        let mut obs = |_: CgIteration| count += 1;
        solver.cg_batch(&xi0, &exact, &cfg, Some(&mut obs)).unwrap();
        // already at the solution: every partition exits after one iteration
        assert_eq!(count, g.num_partitions());
    }

    #[test]
    fn test_batch_shape_validation() {
        let solver = scenario_solver();
        let g = solver.geometry();
        let short = vec![Complex32::zero(); g.volume_len() - 1];
        assert!(matches!(
            solver.fwd_batch(&short),
            Err(TomoError::ShapeMismatch { .. })
        ));
        let sino = vec![Complex32::zero(); g.sino_len()];
        assert!(matches!(
            solver.cg_batch(&sino, &short, &CgConfig::default(), None),
            Err(TomoError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_both_batch_variants_reduce_residual() {
        // The per-partition and full-batch solvers are distinct algorithms;
        // both must reduce the global residual from the same start.
        let solver = scenario_solver();
        let g = solver.geometry();
        let mut rng = StdRng::seed_from_u64(17);
        let target = random_volume(&mut rng, g.volume_len());
        let xi0 = solver.fwd_batch(&target).unwrap();
        let init = vec![Complex32::zero(); g.volume_len()];
        let f_init = crate::binding::slice_norm_sqr(&xi0);

        let cfg = CgConfig {
            iterations: 6,
            ..CgConfig::default()
        };
        let per_part = solver.cg_batch(&xi0, &init, &cfg, None).unwrap();
        let full = solver.cg_fullbatch(&xi0, &init, &cfg, None).unwrap();

        for u in [&per_part, &full] {
            let resid = crate::binding::slice_sub(&solver.fwd_batch(u).unwrap(), &xi0);
            assert!(crate::binding::slice_norm_sqr(&resid) < f_init);
        }
    }
}
