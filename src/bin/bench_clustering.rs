//! Benchmark population clustering on synthetic core + beam distributions.
//!
//! Run with: cargo run --release --features bench --bin bench_clustering
//!
//! Usage:
//!   bench_clustering                 One 16³-block mesh, every policy
//!   bench_clustering --grid 24       Larger block grid
//!   bench_clustering --cells 64      Cluster 64 spatial cells (parallel with `parallel`)
//!   bench_clustering -n 10           Run 10 iterations (for profiling)
//!
//! For per-phase timing, add `--features timing`. Set RUST_LOG=debug for per-call summaries.

use clap::Parser;
use glam::{UVec3, Vec3};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;
use vspace_populations::validation::validate_output;
use vspace_populations::{cluster_many, cluster_with, ClusterConfig, ClusteringPolicy, VelocityMesh};

#[derive(Parser)]
#[command(name = "bench_clustering")]
#[command(about = "Benchmark velocity-space population clustering")]
struct Args {
    /// Blocks per axis of the velocity mesh
    #[arg(short, long, default_value_t = 16)]
    grid: u32,

    /// Cells per block edge
    #[arg(long, default_value_t = 4)]
    side: usize,

    /// Beam drift speed, in units of the core thermal speed
    #[arg(long, default_value_t = 4.0)]
    drift: f32,

    /// Values below this are sparse: blocks whose maximum stays below are not allocated
    #[arg(long, default_value_t = 1e-4)]
    sparsity: f32,

    /// Background floor passed to the clustering (defaults to the sparsity threshold)
    #[arg(long)]
    floor: Option<f32>,

    /// Number of spatial cells clustered with `cluster_many`
    #[arg(long, default_value_t = 1)]
    cells: usize,

    /// Random seed
    #[arg(short, long, default_value_t = 12345)]
    seed: u64,

    /// Number of iterations to run (useful for profiling)
    #[arg(short = 'n', long, default_value_t = 1)]
    repeat: usize,

    /// Check connectivity of every produced cluster
    #[arg(long)]
    validate: bool,
}

/// Isotropic Maxwellian density at velocity `v`.
fn maxwellian(v: Vec3, drift: Vec3, density: f32, thermal: f32) -> f32 {
    let norm = density / (std::f32::consts::PI * thermal * thermal).powf(1.5);
    norm * (-(v - drift).length_squared() / (thermal * thermal)).exp()
}

/// Core at rest plus a tenuous beam along a random direction, with 1% multiplicative noise.
fn generate_mesh(args: &Args, rng: &mut ChaCha8Rng) -> VelocityMesh {
    let grid = UVec3::splat(args.grid);
    let mut mesh = VelocityMesh::new(grid, args.side).expect("valid mesh parameters");
    let extent = mesh.extent().as_vec3();
    let centre = extent * 0.5;
    let thermal = extent.x / 12.0;

    let direction = loop {
        let d = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        if d.length_squared() > 0.01 && d.length_squared() <= 1.0 {
            break d.normalize();
        }
    };
    let beam = direction * thermal * args.drift;

    let block_len = args.side * args.side * args.side;
    let mut values = vec![0.0f32; block_len];
    for bz in 0..grid.z {
        for by in 0..grid.y {
            for bx in 0..grid.x {
                let block = UVec3::new(bx, by, bz);
                let origin = block * args.side as u32;
                let mut peak = 0.0f32;
                for (index, value) in values.iter_mut().enumerate() {
                    let local = vspace_populations::topology::cell_coords(index, args.side);
                    let v = (origin + local).as_vec3() + Vec3::splat(0.5) - centre;
                    let f = maxwellian(v, Vec3::ZERO, 1.0, thermal)
                        + maxwellian(v, beam, 0.1, thermal * 0.5);
                    *value = f * (1.0 + rng.gen_range(-0.01..0.01));
                    peak = peak.max(*value);
                }
                if peak >= args.sparsity {
                    mesh.insert_block_values(block, &values)
                        .expect("block inside the grid");
                }
            }
        }
    }
    mesh
}

fn policies() -> Vec<ClusteringPolicy> {
    vec![
        ClusteringPolicy::threshold_expansion(),
        ClusteringPolicy::AlwaysMerge,
        ClusteringPolicy::size_gated(),
        ClusteringPolicy::connectivity_ratio(),
        ClusteringPolicy::NoMerge,
    ]
}

fn format_rate(count: usize, ms: f64) -> String {
    if ms <= 0.0 {
        return "N/A".to_string();
    }
    let per_sec = count as f64 / (ms / 1000.0);
    if per_sec >= 1_000_000.0 {
        format!("{:.2}M/s", per_sec / 1_000_000.0)
    } else if per_sec >= 1_000.0 {
        format!("{:.1}k/s", per_sec / 1000.0)
    } else {
        format!("{:.0}/s", per_sec)
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    println!("vspace-populations Benchmark");
    println!("============================\n");

    println!("Configuration:");
    println!("  seed = {}", args.seed);
    println!("  grid = {}³ blocks of {}³ cells", args.grid, args.side);
    println!("  beam drift = {} thermal speeds", args.drift);
    println!("  spatial cells = {}", args.cells);
    if args.repeat > 1 {
        println!("  repeat = {}", args.repeat);
    }
    #[cfg(feature = "timing")]
    println!("  timing = enabled (per-phase timing will be printed)");

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let t_gen = Instant::now();
    let meshes: Vec<VelocityMesh> = (0..args.cells.max(1))
        .map(|_| generate_mesh(&args, &mut rng))
        .collect();
    let total_cells: usize = meshes.iter().map(|m| m.values().len()).sum();
    println!(
        "\nMesh generation: {:.1}ms ({} velocity cells)",
        t_gen.elapsed().as_secs_f64() * 1000.0,
        total_cells
    );

    let floor = args.floor.unwrap_or(args.sparsity);
    for policy in policies() {
        let config = ClusterConfig::new(policy).with_background_floor(floor);

        println!("\n{}", "=".repeat(60));
        println!("Policy: {}", policy.name());
        println!("{}", "=".repeat(60));

        let mut times = Vec::with_capacity(args.repeat);
        let mut last = None;
        for _ in 0..args.repeat.max(1) {
            let t0 = Instant::now();
            let outputs = if meshes.len() == 1 {
                vec![cluster_with(&meshes[0], config)]
            } else {
                cluster_many(&meshes, &config)
            };
            times.push(t0.elapsed().as_secs_f64() * 1000.0);
            last = Some(outputs);
        }

        let outputs = last.expect("at least one iteration");
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        let mut clusters = 0;
        let mut merges = 0;
        let mut unassigned = 0;
        for (mesh, output) in meshes.iter().zip(&outputs) {
            let output = match output {
                Ok(output) => output,
                Err(e) => {
                    eprintln!("  clustering failed: {}", e);
                    continue;
                }
            };
            clusters += output.num_clusters();
            merges += output.stats.merges;
            unassigned += output.stats.unassigned_cells;

            if args.validate {
                match validate_output(mesh, output) {
                    Ok(report) if report.is_valid() => {}
                    Ok(report) => eprintln!("  WARNING: {}", report.summary()),
                    Err(e) => eprintln!("  validation failed: {}", e),
                }
            }
        }

        println!("  Avg time:      {:>8.2}ms", avg);
        println!("  Throughput:    {:>8}", format_rate(total_cells, avg));
        println!("  Clusters:      {:>8}", clusters);
        println!("  Merges:        {:>8}", merges);
        println!("  Unassigned:    {:>8}", unassigned);
        if let Some(Ok(first)) = outputs.first() {
            let mut sizes: Vec<u32> = first.clusters.iter().map(|c| c.members).collect();
            sizes.sort_unstable_by(|a, b| b.cmp(a));
            sizes.truncate(3);
            println!("  Largest (cell 0): {:?}", sizes);
        }
    }
}
