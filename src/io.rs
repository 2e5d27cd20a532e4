// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::Path;

use ndarray::{ArrayD, IxDyn};

use crate::core::{FieldId, HierarchyTopology};
use crate::error::{ReinitError, Result};
use crate::hierarchy::CartesianHierarchy;

/// Gather one level of a field into a dense array over the level's domain
/// box, in row-major order. Cells not covered by a patch of that level
/// are NaN.
pub fn level_to_array<const N: usize>(
    hierarchy: &CartesianHierarchy<N>,
    field: FieldId,
    level: usize,
) -> Result<ArrayD<f64>> {
    let domain = hierarchy.level_domain(level)?;
    let shape: Vec<usize> = domain.size().to_vec();
    let mut data = Vec::with_capacity(domain.num_cells());
    for idx in domain.cells() {
        data.push(
            hierarchy
                .level_value(field, level, idx)
                .unwrap_or(f64::NAN),
        );
    }
    ArrayD::from_shape_vec(IxDyn(&shape), data)
        .map_err(|e| ReinitError::Other(format!("shape error: {}", e)))
}

/// Save one level of a field to a .npy file.
pub fn save_npy<const N: usize>(
    hierarchy: &CartesianHierarchy<N>,
    field: FieldId,
    level: usize,
    path: &Path,
) -> Result<()> {
    let arr = level_to_array(hierarchy, field, level)?;
    ndarray_npy::write_npy(path, &arr)
        .map_err(|e| ReinitError::Other(format!("npy write error: {}", e)))
}
