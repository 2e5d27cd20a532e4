// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::core::{FieldId, FieldOps, HierarchyTopology, IndexBox, PatchBuffer, PatchGeometry};
use crate::error::{ReinitError, Result};

struct LevelGeometry<const N: usize> {
    domain: IndexBox<N>,
    dx: [f64; N],
    /// Refinement ratio to the next-coarser level; 1 on the coarsest level.
    ratio: usize,
    patches: Vec<PatchGeometry<N>>,
}

struct FieldData<const N: usize> {
    ghost_width: usize,
    depth: usize,
    /// One buffer per patch, indexed [level][patch].
    levels: Vec<Vec<PatchBuffer<N>>>,
}

/// An in-memory block-structured Cartesian patch hierarchy.
///
/// Levels are ordered coarsest to finest. The coarsest level's patches
/// must tile the physical domain exactly; finer levels refine by an
/// integer ratio and may cover any nested sub-region. Patch data is
/// managed per field id, and the type implements the navigation,
/// synchronization, and reduction collaborators the sweeping engine
/// consumes.
pub struct CartesianHierarchy<const N: usize> {
    levels: Vec<LevelGeometry<N>>,
    fields: Vec<Option<FieldData<N>>>,
}

fn validate_patch_boxes<const N: usize>(
    level: usize,
    domain: &IndexBox<N>,
    boxes: &[IndexBox<N>],
) -> Result<()> {
    for (i, b) in boxes.iter().enumerate() {
        if b.is_empty() {
            return Err(ReinitError::EmptyPatchBox { level, patch: i });
        }
        if !domain.contains_box(b) {
            return Err(ReinitError::PatchOutsideDomain { level, patch: i });
        }
    }
    for i in 0..boxes.len() {
        for j in (i + 1)..boxes.len() {
            if !boxes[i].intersection(&boxes[j]).is_empty() {
                return Err(ReinitError::OverlappingPatches {
                    level,
                    patches: (i, j),
                });
            }
        }
    }
    Ok(())
}

fn touches_domain_boundary<const N: usize>(b: &IndexBox<N>, domain: &IndexBox<N>) -> bool {
    (0..N).any(|d| b.lower()[d] == domain.lower()[d] || b.upper()[d] == domain.upper()[d])
}

fn make_geometries<const N: usize>(
    domain: &IndexBox<N>,
    dx: [f64; N],
    boxes: Vec<IndexBox<N>>,
) -> Vec<PatchGeometry<N>> {
    boxes
        .into_iter()
        .map(|b| {
            let touches = touches_domain_boundary(&b, domain);
            PatchGeometry::new(b, dx, touches)
        })
        .collect()
}

/// Mutable/shared access to two distinct entries of a slice.
fn pair_mut<T>(v: &mut [T], i: usize, j: usize) -> (&mut T, &T) {
    debug_assert_ne!(i, j);
    if i < j {
        let (a, b) = v.split_at_mut(j);
        (&mut a[i], &b[0])
    } else {
        let (a, b) = v.split_at_mut(i);
        (&mut b[0], &a[j])
    }
}

impl<const N: usize> CartesianHierarchy<N> {
    /// Create a hierarchy whose coarsest level is a single patch covering
    /// the whole domain.
    pub fn single_patch(domain: IndexBox<N>, dx: [f64; N]) -> Result<Self> {
        Self::new(domain, dx, vec![domain])
    }

    /// Create a hierarchy whose coarsest level is tiled by `patch_boxes`.
    ///
    /// # Errors
    /// Returns an error for non-positive spacing, empty or out-of-domain
    /// boxes, overlapping boxes, or boxes that do not tile the domain.
    pub fn new(domain: IndexBox<N>, dx: [f64; N], patch_boxes: Vec<IndexBox<N>>) -> Result<Self> {
        for (axis, &spacing) in dx.iter().enumerate() {
            if !spacing.is_finite() || spacing <= 0.0 {
                return Err(ReinitError::InvalidGridSpacing { axis, spacing });
            }
        }
        validate_patch_boxes(0, &domain, &patch_boxes)?;
        let covered: usize = patch_boxes.iter().map(|b| b.num_cells()).sum();
        if covered != domain.num_cells() {
            return Err(ReinitError::DomainNotTiled {
                covered,
                expected: domain.num_cells(),
            });
        }
        Ok(CartesianHierarchy {
            levels: vec![LevelGeometry {
                domain,
                dx,
                ratio: 1,
                patches: make_geometries(&domain, dx, patch_boxes),
            }],
            fields: Vec::new(),
        })
    }

    /// Append a finer level refining the current finest by `ratio`.
    /// `patch_boxes` are given in the new level's index space and may
    /// cover any sub-region of the refined domain. Buffers for already
    /// allocated fields are extended to the new level.
    pub fn add_refined_level(
        &mut self,
        ratio: usize,
        patch_boxes: Vec<IndexBox<N>>,
    ) -> Result<()> {
        if ratio < 2 {
            return Err(ReinitError::InvalidRefinementRatio(ratio));
        }
        let finest = self.levels.last().expect("hierarchy has a coarsest level");
        let domain = finest.domain.refined(ratio);
        let mut dx = finest.dx;
        for spacing in dx.iter_mut() {
            *spacing /= ratio as f64;
        }
        let level = self.levels.len();
        validate_patch_boxes(level, &domain, &patch_boxes)?;
        let patches = make_geometries(&domain, dx, patch_boxes);

        for slot in self.fields.iter_mut().flatten() {
            let bufs = patches
                .iter()
                .map(|p| PatchBuffer::new(*p.index_box(), slot.ghost_width, slot.depth))
                .collect();
            slot.levels.push(bufs);
        }
        self.levels.push(LevelGeometry {
            domain,
            dx,
            ratio,
            patches,
        });
        Ok(())
    }

    /// Allocate a zero-filled field across every level.
    pub fn allocate_field(&mut self, ghost_width: usize, depth: usize) -> FieldId {
        let data = FieldData {
            ghost_width,
            depth,
            levels: self
                .levels
                .iter()
                .map(|lv| {
                    lv.patches
                        .iter()
                        .map(|p| PatchBuffer::new(*p.index_box(), ghost_width, depth))
                        .collect()
                })
                .collect(),
        };
        for (i, slot) in self.fields.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(data);
                return FieldId(i);
            }
        }
        self.fields.push(Some(data));
        FieldId(self.fields.len() - 1)
    }

    /// Cell spacing of one level.
    pub fn level_spacing(&self, level: usize) -> [f64; N] {
        self.levels[level].dx
    }

    /// Shared access to one patch buffer of a field.
    pub fn patch_data(&self, field: FieldId, level: usize, patch: usize) -> &PatchBuffer<N> {
        &self.fields[field.0]
            .as_ref()
            .expect("unallocated field")
            .levels[level][patch]
    }

    /// Mutable access to one patch buffer of a field.
    pub fn patch_data_mut(
        &mut self,
        field: FieldId,
        level: usize,
        patch: usize,
    ) -> &mut PatchBuffer<N> {
        &mut self.fields[field.0]
            .as_mut()
            .expect("unallocated field")
            .levels[level][patch]
    }

    /// Value of a field at a cell of one level, if a patch of that level
    /// owns the cell.
    pub fn level_value(&self, field: FieldId, level: usize, idx: [i32; N]) -> Option<f64> {
        let data = self.fields[field.0].as_ref().expect("unallocated field");
        for (p, geom) in self.levels[level].patches.iter().enumerate() {
            if geom.index_box().contains(idx) {
                return Some(data.levels[level][p].get(idx));
            }
        }
        None
    }

    fn field_data(&self, field: FieldId) -> Result<&FieldData<N>> {
        self.fields
            .get(field.0)
            .and_then(|slot| slot.as_ref())
            .ok_or(ReinitError::UnknownField(field.0))
    }

    fn field_pair_mut(&mut self, x: usize, y: usize) -> (&mut FieldData<N>, &FieldData<N>) {
        let (xf, yf) = pair_mut(&mut self.fields, x, y);
        (
            xf.as_mut().expect("unallocated field"),
            yf.as_ref().expect("unallocated field"),
        )
    }

    /// Average fine cells onto the coarse cells they cover, finest level
    /// first so data cascades down the hierarchy.
    fn coarsen_field(&mut self, field: FieldId) {
        for fine_ln in (1..self.levels.len()).rev() {
            let ratio = self.levels[fine_ln].ratio;
            let fine_patches = &self.levels[fine_ln].patches;
            let coarse_patches = &self.levels[fine_ln - 1].patches;

            let data = self.fields[field.0].as_mut().expect("unallocated field");
            let (coarse_levels, fine_levels) = data.levels.split_at_mut(fine_ln);
            let coarse_bufs = &mut coarse_levels[fine_ln - 1];
            let fine_bufs = &fine_levels[0];

            for (cp, cgeom) in coarse_patches.iter().enumerate() {
                for (fp, fgeom) in fine_patches.iter().enumerate() {
                    let overlap = cgeom
                        .index_box()
                        .intersection(&fgeom.index_box().coarsened(ratio));
                    if overlap.is_empty() {
                        continue;
                    }
                    for c_idx in overlap.cells() {
                        let children = IndexBox::new(c_idx, c_idx).refined(ratio);
                        let mut sum = 0.0;
                        let mut count = 0usize;
                        for f_idx in children.cells() {
                            if fgeom.index_box().contains(f_idx) {
                                sum += fine_bufs[fp].get(f_idx);
                                count += 1;
                            }
                        }
                        if count > 0 {
                            coarse_bufs[cp].set(c_idx, sum / count as f64);
                        }
                    }
                }
            }
        }
    }

    fn fill_level_ghosts(&mut self, field: FieldId, ln: usize) {
        let domain = self.levels[ln].domain;
        let num_patches = self.levels[ln].patches.len();

        // Same-level ghost copy from sibling patch interiors.
        for p in 0..num_patches {
            let p_ghost = self.levels[ln].patches[p].index_box().grown(
                self.fields[field.0]
                    .as_ref()
                    .expect("unallocated field")
                    .ghost_width,
            );
            for q in 0..num_patches {
                if q == p {
                    continue;
                }
                let q_box = *self.levels[ln].patches[q].index_box();
                let overlap = p_ghost.intersection(&q_box);
                if overlap.is_empty() {
                    continue;
                }
                let data = self.fields[field.0].as_mut().expect("unallocated field");
                let (dst, src) = pair_mut(&mut data.levels[ln], p, q);
                for idx in overlap.cells() {
                    dst.set(idx, src.get(idx));
                }
            }
        }

        // Coarse-fine ghosts: inject the underlying coarse cell into fine
        // ghost cells inside the domain that no sibling patch owns.
        if ln > 0 {
            let ratio = self.levels[ln].ratio;
            let patch_boxes: Vec<IndexBox<N>> = self.levels[ln]
                .patches
                .iter()
                .map(|g| *g.index_box())
                .collect();
            let coarse_patches = &self.levels[ln - 1].patches;

            let data = self.fields[field.0].as_mut().expect("unallocated field");
            let (coarse_levels, fine_levels) = data.levels.split_at_mut(ln);
            let coarse_bufs = &coarse_levels[ln - 1];
            let fine_bufs = &mut fine_levels[0];

            for (p, buf) in fine_bufs.iter_mut().enumerate() {
                let interior = patch_boxes[p];
                for idx in buf.bounds().cells() {
                    if interior.contains(idx) || !domain.contains(idx) {
                        continue;
                    }
                    if patch_boxes.iter().any(|b| b.contains(idx)) {
                        continue;
                    }
                    let c_idx = IndexBox::new(idx, idx).coarsened(ratio).lower();
                    for (cp, cgeom) in coarse_patches.iter().enumerate() {
                        if cgeom.index_box().contains(c_idx) {
                            buf.set(idx, coarse_bufs[cp].get(c_idx));
                            break;
                        }
                    }
                }
            }
        }

        // Ghosts outside the physical domain: linear extrapolation along
        // each axis from the two cells nearest the boundary.
        let data = self.fields[field.0].as_mut().expect("unallocated field");
        for buf in data.levels[ln].iter_mut() {
            let bounds = *buf.bounds();
            for d in 0..N {
                for idx in bounds.cells() {
                    let (edge, inward) = if idx[d] < domain.lower()[d] {
                        (domain.lower()[d], 1)
                    } else if idx[d] > domain.upper()[d] {
                        (domain.upper()[d], -1)
                    } else {
                        continue;
                    };
                    let k = (idx[d] - edge).abs() as f64;
                    let mut base0 = idx;
                    base0[d] = edge;
                    let mut base1 = base0;
                    base1[d] += inward;
                    let value = (k + 1.0) * buf.get(base0) - k * buf.get(base1);
                    buf.set(idx, value);
                }
            }
        }
    }
}

impl<const N: usize> HierarchyTopology<N> for CartesianHierarchy<N> {
    fn num_levels(&self) -> usize {
        self.levels.len()
    }

    fn level_domain(&self, level: usize) -> Result<IndexBox<N>> {
        Ok(self.levels[level].domain)
    }

    fn patch_count(&self, level: usize) -> usize {
        self.levels[level].patches.len()
    }

    fn patch_geometry(&self, level: usize, patch: usize) -> &PatchGeometry<N> {
        &self.levels[level].patches[patch]
    }
}

impl<const N: usize> FieldOps<N> for CartesianHierarchy<N> {
    fn ghost_width(&self, field: FieldId) -> Result<usize> {
        Ok(self.field_data(field)?.ghost_width)
    }

    fn field_depth(&self, field: FieldId) -> Result<usize> {
        Ok(self.field_data(field)?.depth)
    }

    fn clone_layout(&mut self, src: FieldId) -> Result<FieldId> {
        let (ghost_width, depth) = {
            let data = self.field_data(src)?;
            (data.ghost_width, data.depth)
        };
        Ok(self.allocate_field(ghost_width, depth))
    }

    fn release_field(&mut self, field: FieldId) {
        if let Some(slot) = self.fields.get_mut(field.0) {
            *slot = None;
        }
    }

    fn copy_field(&mut self, dst: FieldId, src: FieldId) {
        if dst == src {
            return;
        }
        let (dst_data, src_data) = self.field_pair_mut(dst.0, src.0);
        for (dst_level, src_level) in dst_data.levels.iter_mut().zip(&src_data.levels) {
            for (dst_buf, src_buf) in dst_level.iter_mut().zip(src_level) {
                dst_buf.values_mut().copy_from_slice(src_buf.values());
            }
        }
    }

    fn subtract_field(&mut self, dst: FieldId, x: FieldId, y: FieldId) {
        if x == y {
            let data = self.fields[dst.0].as_mut().expect("unallocated field");
            for level in data.levels.iter_mut() {
                for buf in level.iter_mut() {
                    buf.fill(0.0);
                }
            }
            return;
        }
        if dst == x {
            let (dst_data, y_data) = self.field_pair_mut(dst.0, y.0);
            for (dst_level, y_level) in dst_data.levels.iter_mut().zip(&y_data.levels) {
                for (dst_buf, y_buf) in dst_level.iter_mut().zip(y_level) {
                    for (dv, yv) in dst_buf.values_mut().iter_mut().zip(y_buf.values()) {
                        *dv -= *yv;
                    }
                }
            }
        } else if dst == y {
            let (dst_data, x_data) = self.field_pair_mut(dst.0, x.0);
            for (dst_level, x_level) in dst_data.levels.iter_mut().zip(&x_data.levels) {
                for (dst_buf, x_buf) in dst_level.iter_mut().zip(x_level) {
                    for (dv, xv) in dst_buf.values_mut().iter_mut().zip(x_buf.values()) {
                        *dv = *xv - *dv;
                    }
                }
            }
        } else {
            self.copy_field(dst, x);
            self.subtract_field(dst, dst, y);
        }
    }

    fn fill_ghosts(&mut self, field: FieldId) {
        self.coarsen_field(field);
        for ln in 0..self.levels.len() {
            self.fill_level_ghosts(field, ln);
        }
    }

    fn weighted_l2_norm(&self, field: FieldId) -> f64 {
        let data = self.fields[field.0].as_ref().expect("unallocated field");
        let mut sum = 0.0;
        for (ln, level) in self.levels.iter().enumerate() {
            let weight: f64 = level.dx.iter().product();
            // Coarse cells under a finer level carry zero weight.
            let covered: Vec<IndexBox<N>> = if ln + 1 < self.levels.len() {
                let ratio = self.levels[ln + 1].ratio;
                self.levels[ln + 1]
                    .patches
                    .iter()
                    .map(|g| g.index_box().coarsened(ratio))
                    .collect()
            } else {
                Vec::new()
            };
            for (p, geom) in level.patches.iter().enumerate() {
                let buf = &data.levels[ln][p];
                for idx in geom.index_box().cells() {
                    if covered.iter().any(|b| b.contains(idx)) {
                        continue;
                    }
                    for comp in 0..data.depth {
                        let v = buf.get_component(idx, comp);
                        sum += weight * v * v;
                    }
                }
            }
        }
        sum.sqrt()
    }

    fn level_data_mut(
        &mut self,
        field: FieldId,
        level: usize,
    ) -> (&[PatchGeometry<N>], &mut [PatchBuffer<N>]) {
        let geoms = &self.levels[level].patches;
        let bufs = &mut self.fields[field.0]
            .as_mut()
            .expect("unallocated field")
            .levels[level];
        (geoms, bufs)
    }
}
