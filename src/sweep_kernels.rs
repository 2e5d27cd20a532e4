// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::str::FromStr;

use crate::core::{IndexBox, PatchBuffer, PatchGeometry};
use crate::error::ReinitError;

/// Discretization order of the sweep stencil.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOrder {
    /// First-order Godunov upwind stencil; needs a ghost halo of width >= 1.
    FirstOrder,
    /// Second-order one-sided stencil; needs a ghost halo of width >= 2.
    SecondOrder,
}

impl SweepOrder {
    /// Minimum ghost halo width the order's stencil reads.
    pub fn required_ghost_width(&self) -> usize {
        match self {
            SweepOrder::FirstOrder => 1,
            SweepOrder::SecondOrder => 2,
        }
    }

    /// Construct the sweep kernel implementing this order for dimension `N`.
    pub fn kernel<const N: usize>(&self) -> Box<dyn SweepKernel<N>> {
        match self {
            SweepOrder::FirstOrder => Box::new(FirstOrderSweep),
            SweepOrder::SecondOrder => Box::new(SecondOrderSweep),
        }
    }
}

impl FromStr for SweepOrder {
    type Err = ReinitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" | "first_order" => Ok(SweepOrder::FirstOrder),
            "second" | "second_order" => Ok(SweepOrder::SecondOrder),
            other => Err(ReinitError::UnsupportedSweepOrder(other.to_string())),
        }
    }
}

/// One full multi-directional Gauss-Seidel pass over a patch.
///
/// Implementations visit all `2^N` sweep-direction sign combinations in
/// canonical order (direction bit `d` reverses axis `d`) and scan every
/// interior cell in each direction's traversal order, updating the field
/// in place. Ghost values are read but never written.
pub trait SweepKernel<const N: usize>: Send + Sync {
    /// Sweep one patch toward the Eikonal solution `|grad phi| = 1`.
    ///
    /// `domain` is the owning level's physical-domain box; with
    /// `boundary_wall` set, cells of a boundary-touching patch that lie
    /// on the domain edge use the wall-reflected value in place of the
    /// outside ghost value.
    fn sweep(
        &self,
        field: &mut PatchBuffer<N>,
        geom: &PatchGeometry<N>,
        domain: &IndexBox<N>,
        boundary_wall: bool,
    );
}

/// Solve the local discrete Eikonal equation for one cell.
///
/// `terms[d] = (a_d, h_d)` is the upwind neighbor magnitude and effective
/// spacing along axis `d`. Solves `sum_d ((u - a_d)/h_d)^2 = 1` over the
/// axes that participate: terms are sorted ascending, the one-axis value
/// `a_0 + h_0` is refined by adding axes while the candidate exceeds the
/// next neighbor value, falling back to the previous solution when the
/// quadratic degenerates. Returns the updated magnitude (infinite if no
/// neighbor is finite).
pub fn solve_cell<const N: usize>(mut terms: [(f64, f64); N]) -> f64 {
    terms.sort_by(|x, y| x.0.partial_cmp(&y.0).unwrap_or(std::cmp::Ordering::Equal));
    if !terms[0].0.is_finite() {
        return f64::INFINITY;
    }

    let mut u = terms[0].0 + terms[0].1;
    for m in 1..N {
        let a_m = terms[m].0;
        if u <= a_m {
            break;
        }
        // Quadratic over axes 0..=m: A u^2 - 2 B u + C = 0.
        let mut sum_inv = 0.0;
        let mut sum_a = 0.0;
        let mut sum_aa = 0.0;
        for &(a_k, h_k) in &terms[..=m] {
            let inv = 1.0 / (h_k * h_k);
            sum_inv += inv;
            sum_a += a_k * inv;
            sum_aa += a_k * a_k * inv;
        }
        let disc = sum_a * sum_a - sum_inv * (sum_aa - 1.0);
        if disc < 0.0 {
            break;
        }
        let cand = (sum_a + disc.sqrt()) / sum_inv;
        if cand > a_m {
            u = cand;
        } else {
            break;
        }
    }
    u
}

/// First-order upwind neighbor magnitudes for one cell: the smaller
/// absolute value of the two axial neighbors per axis, with the
/// wall-reflected value (the cell's own magnitude) replacing the outside
/// ghost at a solid domain edge.
fn first_order_terms<const N: usize>(
    field: &PatchBuffer<N>,
    idx: [i32; N],
    cur_mag: f64,
    dx: [f64; N],
    domain: &IndexBox<N>,
    wall: bool,
) -> [(f64, f64); N] {
    let mut terms = [(0.0, 0.0); N];
    for d in 0..N {
        let mut lo = idx;
        lo[d] -= 1;
        let mut hi = idx;
        hi[d] += 1;
        let m_lo = if wall && idx[d] == domain.lower()[d] {
            cur_mag
        } else {
            field.get(lo).abs()
        };
        let m_hi = if wall && idx[d] == domain.upper()[d] {
            cur_mag
        } else {
            field.get(hi).abs()
        };
        terms[d] = (m_lo.min(m_hi), dx[d]);
    }
    terms
}

/// Second-order one-sided neighbor values: per axis, take the side with
/// the smaller first-neighbor magnitude; when the second neighbor on that
/// side is no larger than the first, use the one-sided second-order value
/// `(4|u1| - |u2|)/3` with effective spacing `2h/3`, otherwise fall back
/// to first order. Domain-edge cells under the wall flag use the
/// first-order reflected stencil.
fn second_order_terms<const N: usize>(
    field: &PatchBuffer<N>,
    idx: [i32; N],
    cur_mag: f64,
    dx: [f64; N],
    domain: &IndexBox<N>,
    wall: bool,
) -> [(f64, f64); N] {
    let mut terms = [(0.0, 0.0); N];
    for d in 0..N {
        let h = dx[d];
        let at_lo_wall = wall && idx[d] == domain.lower()[d];
        let at_hi_wall = wall && idx[d] == domain.upper()[d];

        let mut n1 = idx;
        n1[d] -= 1;
        let mut n2 = idx;
        n2[d] -= 2;
        let m_lo1 = if at_lo_wall { cur_mag } else { field.get(n1).abs() };

        let mut p1 = idx;
        p1[d] += 1;
        let mut p2 = idx;
        p2[d] += 2;
        let m_hi1 = if at_hi_wall { cur_mag } else { field.get(p1).abs() };

        terms[d] = if m_lo1 <= m_hi1 {
            if at_lo_wall {
                (m_lo1, h)
            } else {
                let m2 = field.get(n2).abs();
                if m2 <= m_lo1 {
                    ((4.0 * m_lo1 - m2) / 3.0, 2.0 * h / 3.0)
                } else {
                    (m_lo1, h)
                }
            }
        } else if at_hi_wall {
            (m_hi1, h)
        } else {
            let m2 = field.get(p2).abs();
            if m2 <= m_hi1 {
                ((4.0 * m_hi1 - m2) / 3.0, 2.0 * h / 3.0)
            } else {
                (m_hi1, h)
            }
        };
    }
    terms
}

fn sweep_all_directions<const N: usize>(
    field: &mut PatchBuffer<N>,
    geom: &PatchGeometry<N>,
    domain: &IndexBox<N>,
    boundary_wall: bool,
    terms_for: fn(&PatchBuffer<N>, [i32; N], f64, [f64; N], &IndexBox<N>, bool) -> [(f64, f64); N],
) {
    let wall = boundary_wall && geom.touches_physical_boundary();
    let dx = geom.spacing();
    let interior = *geom.index_box();

    for dir in 0..(1usize << N) {
        let mut rev = [false; N];
        for (d, r) in rev.iter_mut().enumerate() {
            *r = (dir >> d) & 1 != 0;
        }
        for idx in interior.cells_ordered(rev) {
            let cur = field.get(idx);
            let cur_mag = cur.abs();
            let terms = terms_for(&*field, idx, cur_mag, dx, domain, wall);
            let updated = solve_cell(terms);
            // Monotone update: the magnitude only ever decreases, and the
            // cell keeps its sign.
            if updated < cur_mag {
                field.set(idx, if cur < 0.0 { -updated } else { updated });
            }
        }
    }
}

/// First-order Godunov fast-sweeping kernel.
pub struct FirstOrderSweep;

impl<const N: usize> SweepKernel<N> for FirstOrderSweep {
    fn sweep(
        &self,
        field: &mut PatchBuffer<N>,
        geom: &PatchGeometry<N>,
        domain: &IndexBox<N>,
        boundary_wall: bool,
    ) {
        sweep_all_directions(field, geom, domain, boundary_wall, first_order_terms);
    }
}

/// Second-order one-sided fast-sweeping kernel.
pub struct SecondOrderSweep;

impl<const N: usize> SweepKernel<N> for SecondOrderSweep {
    fn sweep(
        &self,
        field: &mut PatchBuffer<N>,
        geom: &PatchGeometry<N>,
        domain: &IndexBox<N>,
        boundary_wall: bool,
    ) {
        sweep_all_directions(field, geom, domain, boundary_wall, second_order_terms);
    }
}
