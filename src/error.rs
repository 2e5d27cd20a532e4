// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

/// Errors that can occur during hierarchy construction, configuration, or
/// a reinitialization run.
#[derive(Debug)]
pub enum ReinitError {
    /// Sweep order string is not one of the recognized values.
    UnsupportedSweepOrder(String),
    /// Maximum iteration count must be at least one.
    InvalidMaxIterations(usize),
    /// Convergence tolerance is negative or not finite.
    InvalidTolerance(f64),
    /// Cell spacing is not positive and finite.
    InvalidGridSpacing {
        /// The axis index.
        axis: usize,
        /// The spacing provided.
        spacing: f64,
    },
    /// Refinement ratio must be at least 2.
    InvalidRefinementRatio(usize),
    /// A patch box has no cells.
    EmptyPatchBox {
        /// Level the box was added to.
        level: usize,
        /// Index of the box within the level.
        patch: usize,
    },
    /// A patch box extends outside the level's physical domain.
    PatchOutsideDomain {
        /// Level the box was added to.
        level: usize,
        /// Index of the box within the level.
        patch: usize,
    },
    /// Two patch boxes on the same level overlap.
    OverlappingPatches {
        /// The level containing the overlap.
        level: usize,
        /// Indices of the two overlapping boxes.
        patches: (usize, usize),
    },
    /// The coarsest level's patches do not tile the physical domain.
    DomainNotTiled {
        /// Number of cells covered by patches.
        covered: usize,
        /// Number of cells in the domain box.
        expected: usize,
    },
    /// A level's physical domain is not expressible as a single box.
    MultiBoxDomain {
        /// The offending level.
        level: usize,
        /// Number of boxes the domain decomposes into.
        boxes: usize,
    },
    /// Field ghost halo is too narrow for the selected sweep order.
    IncompatibleGhostWidth {
        /// Ghost width the order requires.
        required: usize,
        /// Ghost width the field carries.
        got: usize,
    },
    /// Field depth (components per cell) is not 1.
    IncompatibleFieldDepth(usize),
    /// Field id does not name an allocated field.
    UnknownField(usize),
    /// Iteration cap reached before the tolerance was satisfied.
    NotConverged {
        /// Iterations performed.
        iterations: usize,
        /// The last computed L2 norm of the iterate difference.
        last_norm: f64,
    },
    /// I/O error occurred.
    IoError(std::io::Error),
    /// Other error with a descriptive message.
    Other(String),
}

impl fmt::Display for ReinitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReinitError::UnsupportedSweepOrder(s) => {
                write!(
                    f,
                    "unsupported sweep order: '{}' (expected 'first' or 'second')",
                    s
                )
            }
            ReinitError::InvalidMaxIterations(n) => {
                write!(f, "invalid max iterations: {} (must be >= 1)", n)
            }
            ReinitError::InvalidTolerance(tol) => {
                write!(
                    f,
                    "invalid tolerance: {} (must be non-negative and finite)",
                    tol
                )
            }
            ReinitError::InvalidGridSpacing { axis, spacing } => {
                write!(
                    f,
                    "invalid cell spacing on axis {}: {} (must be positive and finite)",
                    axis, spacing
                )
            }
            ReinitError::InvalidRefinementRatio(r) => {
                write!(f, "invalid refinement ratio: {} (must be >= 2)", r)
            }
            ReinitError::EmptyPatchBox { level, patch } => {
                write!(f, "patch box {} on level {} is empty", patch, level)
            }
            ReinitError::PatchOutsideDomain { level, patch } => {
                write!(
                    f,
                    "patch box {} on level {} extends outside the level domain",
                    patch, level
                )
            }
            ReinitError::OverlappingPatches { level, patches } => {
                write!(
                    f,
                    "patch boxes {} and {} on level {} overlap",
                    patches.0, patches.1, level
                )
            }
            ReinitError::DomainNotTiled { covered, expected } => {
                write!(
                    f,
                    "coarsest-level patches cover {} of {} domain cells",
                    covered, expected
                )
            }
            ReinitError::MultiBoxDomain { level, boxes } => {
                write!(
                    f,
                    "level {} physical domain is {} boxes (exactly one is supported)",
                    level, boxes
                )
            }
            ReinitError::IncompatibleGhostWidth { required, got } => {
                write!(
                    f,
                    "field ghost width {} is too narrow for the selected order (needs >= {})",
                    got, required
                )
            }
            ReinitError::IncompatibleFieldDepth(depth) => {
                write!(f, "field depth {} is unsupported (must be 1)", depth)
            }
            ReinitError::UnknownField(id) => {
                write!(f, "field id {} is not allocated", id)
            }
            ReinitError::NotConverged {
                iterations,
                last_norm,
            } => {
                write!(
                    f,
                    "fast sweeping did not converge after {} iterations (last L2 difference = {})",
                    iterations, last_norm
                )
            }
            ReinitError::IoError(e) => write!(f, "I/O error: {}", e),
            ReinitError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ReinitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReinitError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ReinitError {
    fn from(e: std::io::Error) -> Self {
        ReinitError::IoError(e)
    }
}

/// Convenience type alias for Results with ReinitError.
pub type Result<T> = std::result::Result<T, ReinitError>;
