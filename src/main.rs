// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use levelset_reinit::core::{FieldId, IndexBox};
use levelset_reinit::hierarchy::CartesianHierarchy;
use levelset_reinit::io;
use levelset_reinit::reinit::FastSweepingReinitializer;
use levelset_reinit::sweep_kernels::SweepOrder;

#[derive(Parser)]
#[command(
    name = "levelset-reinit",
    about = "Fast-sweeping signed-distance reinitialization"
)]
struct Cli {
    /// Dimensionality (2 or 3)
    #[arg(short = 'd', long)]
    dim: usize,

    /// Coarsest-level grid size, comma-separated (e.g., 64,64 or 32,32,32)
    #[arg(short = 's', long)]
    size: String,

    /// Cell spacing on the coarsest level
    #[arg(long, default_value = "1.0")]
    spacing: f64,

    /// Seed interface: "circle:<cx>,<cy>[,<cz>],<r>" or "plane:<axis>,<pos>"
    #[arg(long)]
    interface: String,

    /// Sweep stencil order ("first" or "second")
    #[arg(long, default_value = "first")]
    order: String,

    /// Absolute convergence tolerance
    #[arg(short = 't', long, default_value = "1e-5")]
    tolerance: f64,

    /// Maximum outer iterations before the run is declared failed
    #[arg(long, default_value = "100")]
    max_iterations: usize,

    /// Optional refined level: a coarse-index box "lo0,lo1[,lo2]:hi0,hi1[,hi2]"
    /// refined by a factor of 2
    #[arg(long)]
    refine: Option<String>,

    /// Treat the physical domain boundary as a solid wall
    #[arg(long)]
    boundary_wall: bool,

    /// Log per-iteration convergence diagnostics to stderr
    #[arg(long)]
    log: bool,

    /// Output file path (.npy, finest level)
    #[arg(short = 'o', long, default_value = "distance.npy")]
    output: PathBuf,
}

fn parse_int_list(s: &str, expected: usize, what: &str) -> Result<Vec<i32>> {
    let parts: Vec<i32> = s
        .split(',')
        .map(|p| p.trim().parse::<i32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("invalid {}: expected comma-separated integers", what))?;
    if parts.len() != expected {
        bail!(
            "{} has {} components but --dim is {}",
            what,
            parts.len(),
            expected
        );
    }
    Ok(parts)
}

fn parse_f64_list(s: &str, what: &str) -> Result<Vec<f64>> {
    s.split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("invalid {}: expected comma-separated floats", what))
}

/// Analytic seed interface: signed distance is exact inside a band around
/// the zero level set and a signed sentinel outside it.
enum SeedInterface<const N: usize> {
    Sphere { center: [f64; N], radius: f64 },
    Plane { axis: usize, position: f64 },
}

impl<const N: usize> SeedInterface<N> {
    fn parse(s: &str) -> Result<Self> {
        if let Some(params) = s.strip_prefix("circle:").or_else(|| s.strip_prefix("sphere:")) {
            let vals = parse_f64_list(params, "--interface circle")?;
            if vals.len() != N + 1 {
                bail!(
                    "circle interface expects {} center components and a radius",
                    N
                );
            }
            let mut center = [0.0; N];
            center.copy_from_slice(&vals[..N]);
            let radius = vals[N];
            if radius <= 0.0 {
                bail!("circle radius must be positive, got {}", radius);
            }
            return Ok(SeedInterface::Sphere { center, radius });
        }

        if let Some(params) = s.strip_prefix("plane:") {
            let vals = parse_f64_list(params, "--interface plane")?;
            if vals.len() != 2 {
                bail!("plane interface expects 'plane:<axis>,<pos>'");
            }
            let axis = vals[0] as usize;
            if axis >= N {
                bail!("plane axis {} out of range for --dim {}", axis, N);
            }
            return Ok(SeedInterface::Plane {
                axis,
                position: vals[1],
            });
        }

        bail!(
            "unknown --interface mode: '{}'. Expected 'circle:<center...>,<r>' or 'plane:<axis>,<pos>'",
            s
        );
    }

    fn signed_distance(&self, x: [f64; N]) -> f64 {
        match self {
            SeedInterface::Sphere { center, radius } => {
                let mut dist_sq = 0.0;
                for d in 0..N {
                    let diff = x[d] - center[d];
                    dist_sq += diff * diff;
                }
                dist_sq.sqrt() - radius
            }
            SeedInterface::Plane { axis, position } => x[*axis] - position,
        }
    }
}

/// Seed every level: exact signed distance within `band` of the
/// interface, a signed large sentinel beyond it.
fn seed_field<const N: usize>(
    field: FieldId,
    hierarchy: &mut CartesianHierarchy<N>,
    interface: &SeedInterface<N>,
    band: f64,
) {
    use levelset_reinit::core::HierarchyTopology;
    const SENTINEL: f64 = 1e6;

    for level in 0..hierarchy.num_levels() {
        let dx = hierarchy.level_spacing(level);
        for patch in 0..hierarchy.patch_count(level) {
            let interior = *hierarchy.patch_geometry(level, patch).index_box();
            let buf = hierarchy.patch_data_mut(field, level, patch);
            for idx in interior.cells() {
                let mut x = [0.0; N];
                for d in 0..N {
                    x[d] = (idx[d] as f64 + 0.5) * dx[d];
                }
                let d = interface.signed_distance(x);
                let phi = if d.abs() <= band {
                    d
                } else {
                    d.signum() * SENTINEL
                };
                buf.set(idx, phi);
            }
        }
    }
}

fn run<const N: usize>(cli: &Cli, size: &[i32]) -> Result<()> {
    let mut upper = [0i32; N];
    for d in 0..N {
        if size[d] < 2 {
            bail!("--size axis {} must be at least 2, got {}", d, size[d]);
        }
        upper[d] = size[d] - 1;
    }
    let domain = IndexBox::<N>::new([0; N], upper);
    let mut hier = CartesianHierarchy::single_patch(domain, [cli.spacing; N])
        .context("building the hierarchy")?;

    if let Some(refine) = &cli.refine {
        let (lo_str, hi_str) = refine
            .split_once(':')
            .context("invalid --refine: expected 'lo...:hi...'")?;
        let lo = parse_int_list(lo_str, N, "--refine lower corner")?;
        let hi = parse_int_list(hi_str, N, "--refine upper corner")?;
        let mut lower = [0i32; N];
        let mut upper = [0i32; N];
        lower.copy_from_slice(&lo);
        upper.copy_from_slice(&hi);
        let fine_box = IndexBox::<N>::new(lower, upper).refined(2);
        hier.add_refined_level(2, vec![fine_box])
            .context("adding the refined level")?;
    }

    let order: SweepOrder = cli.order.parse()?;
    let interface = SeedInterface::<N>::parse(&cli.interface)?;
    let band = 3.0 * cli.spacing;

    let field = hier.allocate_field(order.required_ghost_width(), 1);

    let mut engine: FastSweepingReinitializer<CartesianHierarchy<N>, N> =
        FastSweepingReinitializer::new()
            .with_order(order)
            .with_max_iterations(cli.max_iterations)?
            .with_abs_tolerance(cli.tolerance)?
            .with_logging(cli.log)
            .with_boundary_wall(cli.boundary_wall);

    engine.register_interface_locator(Box::new(
        move |f: FieldId, h: &mut CartesianHierarchy<N>, _time: f64, _initial: bool| {
            seed_field(f, h, &interface, band);
        },
    ));

    let stats = engine
        .initialize(field, &mut hier, 0.0, true)
        .context("reinitialization failed")?;

    println!(
        "converged after {} iterations (last L2 difference = {:e})",
        stats.iterations, stats.last_norm
    );

    use levelset_reinit::core::HierarchyTopology;
    let finest = hier.num_levels() - 1;
    io::save_npy(&hier, field, finest, &cli.output)
        .with_context(|| format!("saving {}", cli.output.display()))?;
    println!("wrote level {} to {}", finest, cli.output.display());

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.log {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .init();
    }

    if cli.dim != 2 && cli.dim != 3 {
        bail!("--dim must be 2 or 3, got {}", cli.dim);
    }

    let size: Vec<i32> = cli
        .size
        .split(',')
        .map(|p| p.trim().parse::<i32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("invalid --size: expected comma-separated integers")?;
    if size.len() != cli.dim {
        bail!(
            "--size has {} components but --dim is {}",
            size.len(),
            cli.dim
        );
    }

    match cli.dim {
        2 => run::<2>(&cli, &size),
        3 => run::<3>(&cli, &size),
        _ => unreachable!(),
    }
}
