// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::sync::{Arc, Mutex};

use levelset_reinit::core::{FieldId, HierarchyTopology, IndexBox};
use levelset_reinit::error::ReinitError;
use levelset_reinit::hierarchy::CartesianHierarchy;
use levelset_reinit::reinit::{FastSweepingReinitializer, SweepProgress};
use levelset_reinit::sweep_kernels::SweepOrder;

const SENTINEL: f64 = 1e6;

/// Seed every level with the exact signed distance to a circle inside a
/// band of `band` around the interface and a signed sentinel outside it.
fn seed_circle(
    field: FieldId,
    hier: &mut CartesianHierarchy<2>,
    center: [f64; 2],
    radius: f64,
    band: f64,
) {
    for level in 0..hier.num_levels() {
        let dx = hier.level_spacing(level);
        for patch in 0..hier.patch_count(level) {
            let interior = *hier.patch_geometry(level, patch).index_box();
            let buf = hier.patch_data_mut(field, level, patch);
            for idx in interior.cells() {
                let x = (idx[0] as f64 + 0.5) * dx[0];
                let y = (idx[1] as f64 + 0.5) * dx[1];
                let d = ((x - center[0]).powi(2) + (y - center[1]).powi(2)).sqrt() - radius;
                buf.set(idx, if d.abs() <= band { d } else { d.signum() * SENTINEL });
            }
        }
    }
}

fn circle_engine(
    order: SweepOrder,
    center: [f64; 2],
    radius: f64,
    band: f64,
) -> FastSweepingReinitializer<CartesianHierarchy<2>, 2> {
    let mut engine = FastSweepingReinitializer::new().with_order(order);
    engine.register_interface_locator(Box::new(
        move |f: FieldId, h: &mut CartesianHierarchy<2>, _t: f64, _init: bool| {
            seed_circle(f, h, center, radius, band);
        },
    ));
    engine
}

fn single_patch_2d(n: i32, h: f64) -> CartesianHierarchy<2> {
    let domain = IndexBox::new([0, 0], [n - 1, n - 1]);
    CartesianHierarchy::single_patch(domain, [h, h]).unwrap()
}

/// Running the engine a second time on an already-converged field changes
/// no value by more than the tolerance.
#[test]
fn idempotence_near_convergence() {
    let mut hier = single_patch_2d(48, 1.0);
    let field = hier.allocate_field(1, 1);
    let mut engine = circle_engine(SweepOrder::FirstOrder, [24.0, 24.0], 10.0, 3.0);
    engine.initialize(field, &mut hier, 0.0, true).unwrap();

    let before: Vec<f64> = IndexBox::new([0, 0], [47, 47])
        .cells()
        .map(|idx| hier.patch_data(field, 0, 0).get(idx))
        .collect();

    // A second engine with no locators sweeps the converged field as-is.
    let mut resweep: FastSweepingReinitializer<CartesianHierarchy<2>, 2> =
        FastSweepingReinitializer::new();
    let stats = resweep.initialize(field, &mut hier, 0.0, false).unwrap();
    assert!(stats.last_norm <= 1e-5);

    for (idx, prev) in IndexBox::new([0, 0], [47, 47]).cells().zip(before) {
        let now = hier.patch_data(field, 0, 0).get(idx);
        assert!(
            (now - prev).abs() <= 1e-5,
            "cell {:?} moved from {} to {}",
            idx,
            prev,
            now
        );
    }
}

/// The sign of every cell after reinitialization equals its seeded sign.
#[test]
fn sign_preservation() {
    for order in [SweepOrder::FirstOrder, SweepOrder::SecondOrder] {
        let mut hier = single_patch_2d(48, 1.0);
        let field = hier.allocate_field(order.required_ghost_width(), 1);
        let center = [24.0, 24.0];
        let radius = 10.0;
        let mut engine = circle_engine(order, center, radius, 3.0);
        engine.initialize(field, &mut hier, 0.0, true).unwrap();

        for idx in IndexBox::new([0, 0], [47, 47]).cells() {
            let x = (idx[0] as f64 + 0.5, idx[1] as f64 + 0.5);
            let d = ((x.0 - center[0]).powi(2) + (x.1 - center[1]).powi(2)).sqrt() - radius;
            let phi = hier.patch_data(field, 0, 0).get(idx);
            assert!(
                d.signum() == phi.signum(),
                "cell {:?} seeded {} but converged to {} ({:?})",
                idx,
                d,
                phi,
                order
            );
        }
    }
}

/// The measured global L2 difference is non-increasing over consecutive
/// iterations, allowing one transient exception.
#[test]
fn monotone_convergence() {
    let norms: Arc<Mutex<Vec<f64>>> = Arc::new(Mutex::new(Vec::new()));
    let norms_clone = Arc::clone(&norms);

    let mut hier = single_patch_2d(64, 1.0);
    let field = hier.allocate_field(1, 1);
    let mut engine = circle_engine(SweepOrder::FirstOrder, [32.0, 32.0], 13.0, 3.0)
        .with_iteration_callback(Box::new(move |p: SweepProgress| {
            norms_clone.lock().unwrap().push(p.diff_l2_norm);
        }));
    engine.initialize(field, &mut hier, 0.0, true).unwrap();

    let norms = norms.lock().unwrap();
    assert!(norms.len() >= 2, "expected at least two iterations");
    let mut violations = 0;
    for pair in norms.windows(2) {
        if pair[1] > pair[0] {
            violations += 1;
        }
    }
    assert!(
        violations <= 1,
        "L2 difference increased {} times: {:?}",
        violations,
        &norms[..]
    );
}

/// For a planar interface tilted 45 degrees to the grid, both orders
/// reproduce the exact distance-to-plane value away from the seed band.
#[test]
fn order_consistency_planar_interface() {
    let n = 48;
    let h = 1.0;
    // Plane x + y = 48 through the domain center.
    let c = 48.0;
    let plane = move |x: f64, y: f64| (x + y - c) / std::f64::consts::SQRT_2;

    for order in [SweepOrder::FirstOrder, SweepOrder::SecondOrder] {
        let mut hier = single_patch_2d(n, h);
        let field = hier.allocate_field(order.required_ghost_width(), 1);
        let mut engine: FastSweepingReinitializer<CartesianHierarchy<2>, 2> =
            FastSweepingReinitializer::new().with_order(order);
        engine.register_interface_locator(Box::new(
            move |f: FieldId, hr: &mut CartesianHierarchy<2>, _t: f64, _init: bool| {
                let buf = hr.patch_data_mut(f, 0, 0);
                for idx in IndexBox::new([0, 0], [47, 47]).cells() {
                    let d = plane(idx[0] as f64 + 0.5, idx[1] as f64 + 0.5);
                    buf.set(idx, if d.abs() <= 3.0 { d } else { d.signum() * SENTINEL });
                }
            },
        ));
        engine.initialize(field, &mut hier, 0.0, true).unwrap();

        let mut max_err = 0.0_f64;
        for idx in IndexBox::new([0, 0], [47, 47]).cells() {
            let exact = plane(idx[0] as f64 + 0.5, idx[1] as f64 + 0.5);
            if exact.abs() <= 2.0 * h {
                continue;
            }
            let err = (hier.patch_data(field, 0, 0).get(idx) - exact).abs();
            if err > max_err {
                max_err = err;
            }
        }
        assert!(
            max_err < 1e-6,
            "planar interface error {} for {:?}",
            max_err,
            order
        );
    }
}

/// On the smooth exterior of a circular interface the second-order
/// stencil is at least as accurate as the first-order one.
#[test]
fn circle_accuracy_by_order() {
    let n = 64;
    let h = 1.0;
    let center = [32.0, 32.0];
    let radius = 12.0;

    let run = |order: SweepOrder| -> f64 {
        let mut hier = single_patch_2d(n, h);
        let field = hier.allocate_field(order.required_ghost_width(), 1);
        let mut engine = circle_engine(order, center, radius, 3.0 * h);
        engine.initialize(field, &mut hier, 0.0, true).unwrap();

        let mut max_err = 0.0_f64;
        for idx in IndexBox::new([0, 0], [n - 1, n - 1]).cells() {
            let x = (idx[0] as f64 + 0.5, idx[1] as f64 + 0.5);
            let exact = ((x.0 - center[0]).powi(2) + (x.1 - center[1]).powi(2)).sqrt() - radius;
            // Smooth exterior annulus only: away from the interface, the
            // seed band, and the domain boundary.
            if exact < 3.0 * h || exact > 12.0 * h {
                continue;
            }
            let err = (hier.patch_data(field, 0, 0).get(idx) - exact).abs();
            if err > max_err {
                max_err = err;
            }
        }
        max_err
    };

    let err_first = run(SweepOrder::FirstOrder);
    let err_second = run(SweepOrder::SecondOrder);
    assert!(
        err_first < 1.0 * h,
        "first-order circle error too large: {}",
        err_first
    );
    assert!(
        err_second <= err_first,
        "second order ({}) no better than first order ({})",
        err_second,
        err_first
    );
}

/// Toggling the boundary wall flag leaves cells away from the domain
/// edge bit-for-bit identical.
#[test]
fn boundary_wall_interior_invariance() {
    let n = 32;
    let run = |wall: bool| -> Vec<u64> {
        let mut hier = single_patch_2d(n, 1.0);
        let field = hier.allocate_field(1, 1);
        let mut engine =
            circle_engine(SweepOrder::FirstOrder, [16.0, 16.0], 7.0, 3.0).with_boundary_wall(wall);
        engine.initialize(field, &mut hier, 0.0, true).unwrap();
        IndexBox::new([0, 0], [n - 1, n - 1])
            .cells()
            .map(|idx| hier.patch_data(field, 0, 0).get(idx).to_bits())
            .collect()
    };

    let plain = run(false);
    let walled = run(true);
    for (k, idx) in IndexBox::new([0, 0], [n - 1, n - 1]).cells().enumerate() {
        let edge = idx[0] == 0 || idx[0] == n - 1 || idx[1] == 0 || idx[1] == n - 1;
        if !edge {
            assert_eq!(
                plain[k], walled[k],
                "interior cell {:?} differs across wall settings",
                idx
            );
        }
    }
}

/// With a one-iteration cap and zero tolerance on a nontrivial field the
/// engine must fail rather than return a best-effort result.
#[test]
fn fatal_on_non_convergence() {
    let mut hier = single_patch_2d(32, 1.0);
    let field = hier.allocate_field(1, 1);
    let mut engine = circle_engine(SweepOrder::FirstOrder, [16.0, 16.0], 7.0, 3.0)
        .with_max_iterations(1)
        .unwrap()
        .with_abs_tolerance(0.0)
        .unwrap();
    let result = engine.initialize(field, &mut hier, 0.0, true);
    match result {
        Err(ReinitError::NotConverged {
            iterations,
            last_norm,
        }) => {
            assert_eq!(iterations, 1);
            assert!(last_norm > 0.0);
        }
        Ok(_) => panic!("expected NotConverged, engine reported success"),
        Err(other) => panic!("expected NotConverged, got {}", other),
    }
}

/// A single zero seed in a uniform patch converges to the discrete
/// first-order Eikonal distance. The engine runs on a two-patch
/// hierarchy and is checked against an independent dense Gauss-Seidel
/// reference, which also exercises the ghost-exchange path.
#[test]
fn single_seed_matches_dense_reference() {
    let n = 16usize;
    let seed = [5i32, 7i32];

    // Engine: domain split into two patches along axis 0.
    let domain = IndexBox::new([0, 0], [n as i32 - 1, n as i32 - 1]);
    let mut hier = CartesianHierarchy::new(
        domain,
        [1.0, 1.0],
        vec![
            IndexBox::new([0, 0], [7, n as i32 - 1]),
            IndexBox::new([8, 0], [n as i32 - 1, n as i32 - 1]),
        ],
    )
    .unwrap();
    let field = hier.allocate_field(1, 1);
    // Fast sweeping reaches an exact fixpoint on this problem, so a very
    // tight tolerance still terminates.
    let mut engine: FastSweepingReinitializer<CartesianHierarchy<2>, 2> =
        FastSweepingReinitializer::new().with_abs_tolerance(1e-12).unwrap();
    engine.register_interface_locator(Box::new(
        move |f: FieldId, h: &mut CartesianHierarchy<2>, _t: f64, _init: bool| {
            for level in 0..h.num_levels() {
                for patch in 0..h.patch_count(level) {
                    let interior = *h.patch_geometry(level, patch).index_box();
                    let buf = h.patch_data_mut(f, level, patch);
                    for idx in interior.cells() {
                        buf.set(idx, if idx == seed { 0.0 } else { SENTINEL });
                    }
                }
            }
        },
    ));
    engine.initialize(field, &mut hier, 0.0, true).unwrap();

    // Dense reference: plain-array Gauss-Seidel to a tight fixpoint.
    let mut reference = vec![vec![SENTINEL; n]; n];
    reference[seed[0] as usize][seed[1] as usize] = 0.0;
    let local_update = |u: &[Vec<f64>], i: usize, j: usize| -> f64 {
        let axis = |lo: Option<f64>, hi: Option<f64>| -> f64 {
            let lo = lo.unwrap_or(f64::INFINITY);
            let hi = hi.unwrap_or(f64::INFINITY);
            lo.min(hi)
        };
        let a = axis(
            (i > 0).then(|| u[i - 1][j]),
            (i + 1 < n).then(|| u[i + 1][j]),
        );
        let b = axis(
            (j > 0).then(|| u[i][j - 1]),
            (j + 1 < n).then(|| u[i][j + 1]),
        );
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        if !lo.is_finite() {
            return f64::INFINITY;
        }
        if hi - lo >= 1.0 {
            lo + 1.0
        } else {
            (lo + hi + (2.0 - (hi - lo) * (hi - lo)).sqrt()) / 2.0
        }
    };
    loop {
        let mut max_change = 0.0_f64;
        for i in 0..n {
            for j in 0..n {
                let cand = local_update(&reference, i, j);
                if cand < reference[i][j] {
                    max_change = max_change.max(reference[i][j] - cand);
                    reference[i][j] = cand;
                }
            }
        }
        if max_change < 1e-13 {
            break;
        }
    }

    for idx in domain.cells() {
        let expected = reference[idx[0] as usize][idx[1] as usize];
        let got = hier.level_value(field, 0, idx).unwrap();
        assert!(
            (got - expected).abs() < 1e-6,
            "cell {:?}: engine {} vs reference {}",
            idx,
            got,
            expected
        );
    }
}

/// A two-level hierarchy converges and keeps fine-level values close to
/// the analytic distance near the interface.
#[test]
fn two_level_hierarchy_accuracy() {
    let center = [16.0, 16.0];
    let radius = 6.0;
    let mut hier = single_patch_2d(32, 1.0);
    // Refined level covering the interface region.
    hier.add_refined_level(2, vec![IndexBox::new([12, 12], [51, 51])])
        .unwrap();
    let field = hier.allocate_field(1, 1);
    let mut engine = circle_engine(SweepOrder::FirstOrder, center, radius, 3.0);
    let stats = engine.initialize(field, &mut hier, 0.0, true).unwrap();
    assert!(stats.last_norm <= 1e-5);

    // Fine-level cells near the interface: spacing is 0.5, so the error
    // should be well under the coarse spacing.
    let mut max_err = 0.0_f64;
    for idx in IndexBox::new([16, 16], [47, 47]).cells() {
        let x = (idx[0] as f64 + 0.5) * 0.5;
        let y = (idx[1] as f64 + 0.5) * 0.5;
        let exact = ((x - center[0]).powi(2) + (y - center[1]).powi(2)).sqrt() - radius;
        if exact.abs() > 4.0 {
            continue;
        }
        let got = hier.level_value(field, 1, idx).unwrap();
        let err = (got - exact).abs();
        if err > max_err {
            max_err = err;
        }
        assert!(
            got.signum() == exact.signum(),
            "fine cell {:?} flipped sign",
            idx
        );
    }
    assert!(max_err < 1.0, "fine-level error too large: {}", max_err);
}
