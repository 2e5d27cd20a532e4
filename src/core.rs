// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::Result;

/// An axis-aligned box in cell index space with inclusive lower and upper
/// corners. The generic parameter `N` is the number of spatial dimensions
/// (2 or 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBox<const N: usize> {
    lower: [i32; N],
    upper: [i32; N],
}

impl<const N: usize> IndexBox<N> {
    /// Create a box from inclusive corner indices.
    pub fn new(lower: [i32; N], upper: [i32; N]) -> Self {
        IndexBox { lower, upper }
    }

    /// Inclusive lower corner.
    pub fn lower(&self) -> [i32; N] {
        self.lower
    }

    /// Inclusive upper corner.
    pub fn upper(&self) -> [i32; N] {
        self.upper
    }

    /// Number of cells along each axis (zero if the box is empty on that axis).
    pub fn size(&self) -> [usize; N] {
        let mut size = [0usize; N];
        for d in 0..N {
            size[d] = if self.upper[d] >= self.lower[d] {
                (self.upper[d] - self.lower[d] + 1) as usize
            } else {
                0
            };
        }
        size
    }

    /// True if the box contains no cells.
    pub fn is_empty(&self) -> bool {
        (0..N).any(|d| self.upper[d] < self.lower[d])
    }

    /// Total number of cells.
    pub fn num_cells(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.size().iter().product()
        }
    }

    /// The box grown by `width` cells on every side.
    pub fn grown(&self, width: usize) -> Self {
        let w = width as i32;
        let mut lower = self.lower;
        let mut upper = self.upper;
        for d in 0..N {
            lower[d] -= w;
            upper[d] += w;
        }
        IndexBox { lower, upper }
    }

    /// The box mapped to a finer index space by an integer refinement ratio.
    pub fn refined(&self, ratio: usize) -> Self {
        let r = ratio as i32;
        let mut lower = self.lower;
        let mut upper = self.upper;
        for d in 0..N {
            lower[d] *= r;
            upper[d] = upper[d] * r + (r - 1);
        }
        IndexBox { lower, upper }
    }

    /// The box mapped to a coarser index space by an integer refinement ratio.
    pub fn coarsened(&self, ratio: usize) -> Self {
        let r = ratio as i32;
        let mut lower = self.lower;
        let mut upper = self.upper;
        for d in 0..N {
            lower[d] = lower[d].div_euclid(r);
            upper[d] = upper[d].div_euclid(r);
        }
        IndexBox { lower, upper }
    }

    /// Intersection with another box; may be empty.
    pub fn intersection(&self, other: &IndexBox<N>) -> Self {
        let mut lower = self.lower;
        let mut upper = self.upper;
        for d in 0..N {
            lower[d] = lower[d].max(other.lower[d]);
            upper[d] = upper[d].min(other.upper[d]);
        }
        IndexBox { lower, upper }
    }

    /// True if the cell index lies inside the box.
    pub fn contains(&self, idx: [i32; N]) -> bool {
        (0..N).all(|d| idx[d] >= self.lower[d] && idx[d] <= self.upper[d])
    }

    /// True if `other` lies entirely inside this box.
    pub fn contains_box(&self, other: &IndexBox<N>) -> bool {
        other.is_empty() || (self.contains(other.lower) && self.contains(other.upper))
    }

    /// Iterate over all cells in row-major order (axis `N-1` fastest).
    pub fn cells(&self) -> CellIter<N> {
        self.cells_ordered([false; N])
    }

    /// Iterate over all cells with a per-axis traversal direction:
    /// `reversed[d]` walks axis `d` from its upper bound down to its lower.
    pub fn cells_ordered(&self, reversed: [bool; N]) -> CellIter<N> {
        let mut current = [0i32; N];
        for d in 0..N {
            current[d] = if reversed[d] { self.upper[d] } else { self.lower[d] };
        }
        CellIter {
            bounds: *self,
            reversed,
            current,
            done: self.is_empty(),
        }
    }
}

/// Cell iterator over an [`IndexBox`], row-major with optional per-axis
/// reversal.
pub struct CellIter<const N: usize> {
    bounds: IndexBox<N>,
    reversed: [bool; N],
    current: [i32; N],
    done: bool,
}

impl<const N: usize> Iterator for CellIter<N> {
    type Item = [i32; N];

    fn next(&mut self) -> Option<[i32; N]> {
        if self.done {
            return None;
        }
        let idx = self.current;
        // Odometer increment, axis N-1 fastest.
        for d in (0..N).rev() {
            if self.reversed[d] {
                if self.current[d] > self.bounds.lower[d] {
                    self.current[d] -= 1;
                    return Some(idx);
                }
                self.current[d] = self.bounds.upper[d];
            } else {
                if self.current[d] < self.bounds.upper[d] {
                    self.current[d] += 1;
                    return Some(idx);
                }
                self.current[d] = self.bounds.lower[d];
            }
        }
        self.done = true;
        Some(idx)
    }
}

/// Opaque handle naming one field across the whole hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldId(pub(crate) usize);

impl FieldId {
    /// The raw slot index, for diagnostics.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Immutable per-patch description: the patch's index box, its cell
/// spacing, and whether it touches the physical domain boundary.
#[derive(Debug, Clone)]
pub struct PatchGeometry<const N: usize> {
    index_box: IndexBox<N>,
    dx: [f64; N],
    touches_boundary: bool,
}

impl<const N: usize> PatchGeometry<N> {
    /// Create a patch description.
    pub fn new(index_box: IndexBox<N>, dx: [f64; N], touches_boundary: bool) -> Self {
        PatchGeometry {
            index_box,
            dx,
            touches_boundary,
        }
    }

    /// The patch's cell index box (ghosts excluded).
    pub fn index_box(&self) -> &IndexBox<N> {
        &self.index_box
    }

    /// Cell spacing along each axis.
    pub fn spacing(&self) -> [f64; N] {
        self.dx
    }

    /// True if any face of the patch lies on the physical domain boundary.
    pub fn touches_physical_boundary(&self) -> bool {
        self.touches_boundary
    }
}

/// Per-patch scalar storage over the patch box grown by a ghost halo.
///
/// Values are stored in row-major order over the grown box (axis `N-1`
/// fastest), `depth` components per cell. Indexing is by global cell
/// index in the owning level's index space.
#[derive(Debug, Clone)]
pub struct PatchBuffer<const N: usize> {
    interior: IndexBox<N>,
    bounds: IndexBox<N>,
    ghost_width: usize,
    depth: usize,
    strides: [usize; N],
    data: Vec<f64>,
}

impl<const N: usize> PatchBuffer<N> {
    /// Allocate a zero-filled buffer for `interior` with the given ghost
    /// halo width and components per cell.
    pub fn new(interior: IndexBox<N>, ghost_width: usize, depth: usize) -> Self {
        assert!(depth >= 1, "PatchBuffer depth must be at least 1");
        let bounds = interior.grown(ghost_width);
        let size = bounds.size();
        let mut strides = [0usize; N];
        strides[N - 1] = 1;
        for d in (0..N - 1).rev() {
            strides[d] = strides[d + 1] * size[d + 1];
        }
        let num = bounds.num_cells() * depth;
        PatchBuffer {
            interior,
            bounds,
            ghost_width,
            depth,
            strides,
            data: vec![0.0; num],
        }
    }

    /// The interior (non-ghost) box.
    pub fn interior(&self) -> &IndexBox<N> {
        &self.interior
    }

    /// The full box including the ghost halo.
    pub fn bounds(&self) -> &IndexBox<N> {
        &self.bounds
    }

    /// Ghost halo width in cells.
    pub fn ghost_width(&self) -> usize {
        self.ghost_width
    }

    /// Components per cell.
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn offset(&self, idx: [i32; N]) -> usize {
        debug_assert!(
            self.bounds.contains(idx),
            "index {:?} outside buffer bounds {:?}",
            idx,
            self.bounds
        );
        let lower = self.bounds.lower();
        let mut flat = 0usize;
        for d in 0..N {
            flat += (idx[d] - lower[d]) as usize * self.strides[d];
        }
        flat * self.depth
    }

    /// Read component 0 at a global cell index (interior or ghost).
    #[inline]
    pub fn get(&self, idx: [i32; N]) -> f64 {
        self.data[self.offset(idx)]
    }

    /// Write component 0 at a global cell index (interior or ghost).
    #[inline]
    pub fn set(&mut self, idx: [i32; N], val: f64) {
        let off = self.offset(idx);
        self.data[off] = val;
    }

    /// Read a specific component at a global cell index.
    pub fn get_component(&self, idx: [i32; N], comp: usize) -> f64 {
        debug_assert!(comp < self.depth);
        self.data[self.offset(idx) + comp]
    }

    /// Write a specific component at a global cell index.
    pub fn set_component(&mut self, idx: [i32; N], comp: usize, val: f64) {
        debug_assert!(comp < self.depth);
        let off = self.offset(idx) + comp;
        self.data[off] = val;
    }

    /// Set every value, ghosts included.
    pub fn fill(&mut self, val: f64) {
        self.data.fill(val);
    }

    /// Raw storage, ghosts included.
    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// Mutable raw storage, ghosts included.
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }
}

/// Navigation over a patch hierarchy: levels are ordered coarsest to
/// finest and each level owns a set of rectangular patches.
pub trait HierarchyTopology<const N: usize> {
    /// Number of levels, coarsest first.
    fn num_levels(&self) -> usize;

    /// The level's physical domain as a single index box.
    ///
    /// # Errors
    /// Returns an error if the level's domain cannot be expressed as one
    /// contiguous box; such a hierarchy is unsupported.
    fn level_domain(&self, level: usize) -> Result<IndexBox<N>>;

    /// Number of patches on a level.
    fn patch_count(&self, level: usize) -> usize;

    /// Geometry of one patch.
    fn patch_geometry(&self, level: usize, patch: usize) -> &PatchGeometry<N>;
}

/// Field data management and the synchronization/reduction collaborators
/// the sweeping core depends on.
///
/// The core holds exclusive access to the fields it is handed for the
/// duration of one call; it allocates nothing but a scratch duplicate
/// through [`FieldOps::clone_layout`].
pub trait FieldOps<const N: usize> {
    /// Ghost halo width of a field.
    fn ghost_width(&self, field: FieldId) -> Result<usize>;

    /// Components per cell of a field.
    fn field_depth(&self, field: FieldId) -> Result<usize>;

    /// Allocate a new field with the same layout (ghost width, depth,
    /// patch coverage) as `src`.
    fn clone_layout(&mut self, src: FieldId) -> Result<FieldId>;

    /// Release a field's storage. Releasing an unknown id is a no-op.
    fn release_field(&mut self, field: FieldId);

    /// Copy `src` into `dst` on every patch of every level, ghosts
    /// included. Panics if either id is unallocated.
    fn copy_field(&mut self, dst: FieldId, src: FieldId);

    /// Compute `dst = x - y` cell-wise on every patch of every level.
    /// Panics if any id is unallocated.
    fn subtract_field(&mut self, dst: FieldId, x: FieldId, y: FieldId);

    /// One round of ghost synchronization: coarsen finer data onto
    /// coarser levels, fill same-level ghosts from sibling patches,
    /// fill coarse-fine ghosts from the coarser level, and extrapolate
    /// ghosts outside the physical domain. Blocking; the field is
    /// consistent across the hierarchy on return.
    fn fill_ghosts(&mut self, field: FieldId);

    /// Global control-volume-weighted L2 norm of a field. Weights are
    /// zero on coarse cells covered by a finer level so overlapped
    /// regions are not double-counted.
    fn weighted_l2_norm(&self, field: FieldId) -> f64;

    /// Patch geometries and mutable buffers for one level of a field,
    /// in matching order. Panics if the id is unallocated.
    fn level_data_mut(
        &mut self,
        field: FieldId,
        level: usize,
    ) -> (&[PatchGeometry<N>], &mut [PatchBuffer<N>]);
}
