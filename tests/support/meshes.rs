#![allow(dead_code)]

use glam::{UVec3, Vec3};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use vspace_populations::{CellKey, VelocityMesh};

/// Fill an `edge³` cube of cells starting at `corner` with `value`.
pub fn fill_cube(mesh: &mut VelocityMesh, corner: UVec3, edge: u32, value: f32) {
    for z in 0..edge {
        for y in 0..edge {
            for x in 0..edge {
                mesh.set(corner + UVec3::new(x, y, z), value)
                    .expect("cube inside the mesh");
            }
        }
    }
}

/// Id written for the cell at global coordinates `cell`.
pub fn id_at(mesh: &VelocityMesh, ids: &[u32], cell: UVec3) -> u32 {
    let key = mesh.key_of(cell).expect("cell block allocated");
    ids[flat(mesh, key)]
}

pub fn flat(mesh: &VelocityMesh, key: CellKey) -> usize {
    use vspace_populations::VelocitySpace;
    key.flat(mesh.block_len())
}

/// Every block of a `grid³` mesh allocated, values uniform in `[0, 1)`.
pub fn random_dense_mesh(grid: u32, side: usize, seed: u64) -> VelocityMesh {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut mesh = VelocityMesh::new(UVec3::splat(grid), side).expect("valid mesh");
    let block_len = side * side * side;
    for z in 0..grid {
        for y in 0..grid {
            for x in 0..grid {
                let values: Vec<f32> = (0..block_len).map(|_| rng.gen_range(0.0..1.0)).collect();
                mesh.insert_block_values(UVec3::new(x, y, z), &values)
                    .expect("block inside the grid");
            }
        }
    }
    mesh
}

/// About `fill` of the blocks allocated at random, values uniform in `[0, 1)`.
pub fn random_sparse_mesh(grid: u32, side: usize, fill: f64, seed: u64) -> VelocityMesh {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut mesh = VelocityMesh::new(UVec3::splat(grid), side).expect("valid mesh");
    let block_len = side * side * side;
    for z in 0..grid {
        for y in 0..grid {
            for x in 0..grid {
                if !rng.gen_bool(fill) {
                    continue;
                }
                let values: Vec<f32> = (0..block_len).map(|_| rng.gen_range(0.0..1.0)).collect();
                mesh.insert_block_values(UVec3::new(x, y, z), &values)
                    .expect("block inside the grid");
            }
        }
    }
    mesh
}

/// Two Maxwellian populations: a core at the centre and a weaker beam displaced along +x.
///
/// Only blocks whose peak reaches `sparsity` are allocated.
pub fn core_and_beam_mesh(grid: u32, side: usize, sparsity: f32) -> VelocityMesh {
    let mut mesh = VelocityMesh::new(UVec3::splat(grid), side).expect("valid mesh");
    let extent = mesh.extent().as_vec3();
    let centre = extent * 0.5;
    let thermal = extent.x / 12.0;
    let beam = Vec3::new(thermal * 4.0, 0.0, 0.0);

    let maxwellian = |v: Vec3, drift: Vec3, density: f32, width: f32| {
        density * (-(v - drift).length_squared() / (width * width)).exp()
    };

    let block_len = side * side * side;
    let mut values = vec![0.0f32; block_len];
    for z in 0..grid {
        for y in 0..grid {
            for x in 0..grid {
                let block = UVec3::new(x, y, z);
                let origin = block * side as u32;
                let mut peak = 0.0f32;
                for (index, value) in values.iter_mut().enumerate() {
                    let local = vspace_populations::topology::cell_coords(index, side);
                    let v = (origin + local).as_vec3() + Vec3::splat(0.5) - centre;
                    *value = maxwellian(v, Vec3::ZERO, 1.0, thermal)
                        + maxwellian(v, beam, 0.3, thermal * 0.5);
                    peak = peak.max(*value);
                }
                if peak >= sparsity {
                    mesh.insert_block_values(block, &values)
                        .expect("block inside the grid");
                }
            }
        }
    }
    mesh
}
