// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use log::info;
use rayon::prelude::*;

use crate::core::{FieldId, FieldOps, HierarchyTopology};
use crate::error::{ReinitError, Result};
use crate::locator::{InterfaceLocator, LocatorRegistry};
use crate::sweep_kernels::{SweepKernel, SweepOrder};

/// Per-iteration diagnostics passed to the optional callback.
pub struct SweepProgress {
    /// Outer iteration number, starting at 1.
    pub iteration: usize,
    /// Weighted L2 norm of the difference from the previous iterate.
    pub diff_l2_norm: f64,
}

/// Summary of a completed reinitialization.
pub struct SweepStats {
    /// Outer iterations performed.
    pub iterations: usize,
    /// Final weighted L2 norm of the iterate difference.
    pub last_norm: f64,
}

/// Hierarchical fast-sweeping reinitialization engine.
///
/// Seeds the distance field through registered interface locators, then
/// repeats {snapshot, ghost synchronization, multi-directional sweeps
/// over every patch of every level, global difference norm} until the
/// norm drops below the absolute tolerance. Reaching the iteration cap
/// first is a fatal error: a non-converged signed-distance field is
/// never returned as a best-effort result.
pub struct FastSweepingReinitializer<H, const N: usize> {
    order: SweepOrder,
    kernel: Box<dyn SweepKernel<N>>,
    max_iterations: usize,
    abs_tolerance: f64,
    enable_logging: bool,
    consider_bdry_wall: bool,
    locators: LocatorRegistry<H, N>,
    iteration_callback: Option<Box<dyn Fn(SweepProgress)>>,
}

impl<H, const N: usize> FastSweepingReinitializer<H, N>
where
    H: HierarchyTopology<N> + FieldOps<N>,
{
    /// Create an engine with the default configuration: first order,
    /// 100 iterations, tolerance 1e-5, logging and boundary walls off.
    pub fn new() -> Self {
        FastSweepingReinitializer {
            order: SweepOrder::FirstOrder,
            kernel: SweepOrder::FirstOrder.kernel(),
            max_iterations: 100,
            abs_tolerance: 1e-5,
            enable_logging: false,
            consider_bdry_wall: false,
            locators: LocatorRegistry::new(),
            iteration_callback: None,
        }
    }

    /// Select the sweep stencil order (builder method). The matching
    /// kernel is constructed once here, not per call.
    pub fn with_order(mut self, order: SweepOrder) -> Self {
        self.order = order;
        self.kernel = order.kernel();
        self
    }

    /// Set the outer iteration cap (builder method).
    ///
    /// # Errors
    /// Returns an error for a cap of zero; the convergence criterion is
    /// only defined after at least one sweep.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Result<Self> {
        if max_iterations == 0 {
            return Err(ReinitError::InvalidMaxIterations(max_iterations));
        }
        self.max_iterations = max_iterations;
        Ok(self)
    }

    /// Set the absolute convergence tolerance (builder method).
    ///
    /// # Errors
    /// Returns an error if the tolerance is negative or not finite.
    /// Zero is allowed and in practice forces the iteration cap.
    pub fn with_abs_tolerance(mut self, abs_tolerance: f64) -> Result<Self> {
        if !abs_tolerance.is_finite() || abs_tolerance < 0.0 {
            return Err(ReinitError::InvalidTolerance(abs_tolerance));
        }
        self.abs_tolerance = abs_tolerance;
        Ok(self)
    }

    /// Enable per-iteration diagnostics through the `log` facade
    /// (builder method).
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }

    /// Treat the physical domain boundary as a solid wall: domain-edge
    /// cells of boundary-touching patches use the wall-reflected value in
    /// place of the outside ghost value (builder method).
    pub fn with_boundary_wall(mut self, enabled: bool) -> Self {
        self.consider_bdry_wall = enabled;
        self
    }

    /// Set a callback invoked after every outer iteration with the
    /// iteration number and difference norm (builder method).
    pub fn with_iteration_callback(mut self, callback: Box<dyn Fn(SweepProgress)>) -> Self {
        self.iteration_callback = Some(callback);
        self
    }

    /// The configured sweep order.
    pub fn order(&self) -> SweepOrder {
        self.order
    }

    /// Register an interface locator. Locators are invoked in
    /// registration order at the start of every [`initialize`] call and
    /// cannot be removed.
    ///
    /// [`initialize`]: FastSweepingReinitializer::initialize
    pub fn register_interface_locator(&mut self, locator: Box<dyn InterfaceLocator<H, N>>) {
        self.locators.register(locator);
    }

    /// Run the full reinitialization on `field`: seed through the
    /// locator registry, then sweep to convergence. Blocks until the
    /// tolerance is met or fails with the iteration cap.
    ///
    /// The scratch iterate allocated for the previous-value snapshot is
    /// released on every exit path.
    ///
    /// # Errors
    /// - [`ReinitError::IncompatibleGhostWidth`] /
    ///   [`ReinitError::IncompatibleFieldDepth`] if the field layout does
    ///   not support the configured order.
    /// - [`ReinitError::NotConverged`] if the iteration cap is reached
    ///   first; the last computed norm is reported for diagnosis.
    pub fn initialize(
        &mut self,
        field: FieldId,
        hierarchy: &mut H,
        time: f64,
        initial_time: bool,
    ) -> Result<SweepStats> {
        let ghost = hierarchy.ghost_width(field)?;
        let required = self.order.required_ghost_width();
        if ghost < required {
            return Err(ReinitError::IncompatibleGhostWidth {
                required,
                got: ghost,
            });
        }
        let depth = hierarchy.field_depth(field)?;
        if depth != 1 {
            return Err(ReinitError::IncompatibleFieldDepth(depth));
        }

        let scratch = hierarchy.clone_layout(field)?;
        let result = self.sweep_to_convergence(field, scratch, hierarchy, time, initial_time);
        hierarchy.release_field(scratch);
        result
    }

    fn sweep_to_convergence(
        &mut self,
        field: FieldId,
        scratch: FieldId,
        hierarchy: &mut H,
        time: f64,
        initial_time: bool,
    ) -> Result<SweepStats> {
        self.locators.invoke_all(field, hierarchy, time, initial_time);

        // The difference norm is undefined before the first pass, so the
        // loop always runs at least once.
        let mut diff_l2_norm = f64::INFINITY;
        let mut iteration = 0;
        while diff_l2_norm > self.abs_tolerance && iteration < self.max_iterations {
            hierarchy.copy_field(scratch, field);
            hierarchy.fill_ghosts(field);
            self.sweep_hierarchy(field, hierarchy)?;
            hierarchy.subtract_field(scratch, scratch, field);
            diff_l2_norm = hierarchy.weighted_l2_norm(scratch);
            iteration += 1;

            if self.enable_logging {
                info!(
                    "fast sweeping iteration {}: L2 norm between successive iterates = {:e}",
                    iteration, diff_l2_norm
                );
            }
            if let Some(callback) = &self.iteration_callback {
                callback(SweepProgress {
                    iteration,
                    diff_l2_norm,
                });
            }
        }

        if diff_l2_norm > self.abs_tolerance {
            if self.enable_logging {
                info!(
                    "fast sweeping reached the iteration cap {} (last L2 norm = {:e})",
                    self.max_iterations, diff_l2_norm
                );
            }
            return Err(ReinitError::NotConverged {
                iterations: iteration,
                last_norm: diff_l2_norm,
            });
        }

        if self.enable_logging {
            info!("fast sweeping converged after {} iterations", iteration);
        }
        Ok(SweepStats {
            iterations: iteration,
            last_norm: diff_l2_norm,
        })
    }

    /// Sweep every patch of every level, coarsest first. Patches within
    /// a level are independent during a pass (ghost data is frozen), so
    /// they are swept in parallel.
    fn sweep_hierarchy(&self, field: FieldId, hierarchy: &mut H) -> Result<()> {
        for level in 0..hierarchy.num_levels() {
            let domain = hierarchy.level_domain(level)?;
            let kernel = &*self.kernel;
            let wall = self.consider_bdry_wall;
            let (geoms, bufs) = hierarchy.level_data_mut(field, level);
            bufs.par_iter_mut()
                .zip(geoms.par_iter())
                .for_each(|(buf, geom)| kernel.sweep(buf, geom, &domain, wall));
        }
        Ok(())
    }
}

impl<H, const N: usize> Default for FastSweepingReinitializer<H, N>
where
    H: HierarchyTopology<N> + FieldOps<N>,
{
    fn default() -> Self {
        Self::new()
    }
}
