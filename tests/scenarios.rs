//! End-to-end clustering behaviour on small hand-built and synthetic meshes.

mod support;

use glam::UVec3;
use support::meshes::{
    core_and_beam_mesh, fill_cube, id_at, random_dense_mesh, random_sparse_mesh,
};
use vspace_populations::validation::validate_output;
use vspace_populations::{
    cluster_into, cluster_with, ClusterConfig, ClusteringPolicy, VelocityMesh, BACKGROUND_ID,
    FIRST_CLUSTER_ID, NO_CLUSTER_ID,
};

fn all_policies() -> Vec<ClusteringPolicy> {
    vec![
        ClusteringPolicy::threshold_expansion(),
        ClusteringPolicy::AlwaysMerge,
        ClusteringPolicy::size_gated(),
        ClusteringPolicy::connectivity_ratio(),
        ClusteringPolicy::NoMerge,
    ]
}

#[test]
fn test_single_isolated_cell() {
    let mut mesh = VelocityMesh::new(UVec3::splat(3), 1).unwrap();
    mesh.set(UVec3::ONE, 3.5).unwrap();

    for policy in all_policies() {
        let output = cluster_with(&mesh, ClusterConfig::new(policy)).unwrap();
        assert_eq!(output.ids, vec![FIRST_CLUSTER_ID], "{}", policy.name());
        assert_eq!(output.num_clusters(), 1);
        assert_eq!(output.clusters[0].members, 1);
        assert_eq!(output.stats.clusters_created, 1);
    }
}

#[test]
fn test_cube_always_merge_single_block() {
    let mut mesh = VelocityMesh::new(UVec3::ONE, 2).unwrap();
    let values = [1.0, 8.0, 3.0, 6.0, 2.0, 7.0, 4.0, 5.0];
    mesh.insert_block_values(UVec3::ZERO, &values).unwrap();

    let output = cluster_with(&mesh, ClusterConfig::new(ClusteringPolicy::AlwaysMerge)).unwrap();
    assert_eq!(output.ids, vec![FIRST_CLUSTER_ID; 8]);
    assert_eq!(output.num_clusters(), 1);
    assert_eq!(output.summary(FIRST_CLUSTER_ID).unwrap().members, 8);
}

#[test]
fn test_cube_across_eight_blocks() {
    // The cube at (1,1,1)..(2,2,2) has one cell in each of the 8 blocks.
    let mut mesh = VelocityMesh::new(UVec3::splat(2), 2).unwrap();
    fill_cube(&mut mesh, UVec3::ONE, 2, 1.0);
    assert_eq!(mesh.values().len(), 64);

    let config = ClusterConfig::new(ClusteringPolicy::AlwaysMerge).with_background_floor(0.5);
    let output = cluster_with(&mesh, config).unwrap();
    assert_eq!(output.num_clusters(), 1);
    assert_eq!(output.clusters[0].members, 8);
    assert_eq!(output.stats.background_cells, 56);
    assert_eq!(output.cells_in(FIRST_CLUSTER_ID).count(), 8);
    for x in 1..3 {
        for y in 1..3 {
            for z in 1..3 {
                assert_eq!(id_at(&mesh, &output.ids, UVec3::new(x, y, z)), FIRST_CLUSTER_ID);
            }
        }
    }
    assert_eq!(id_at(&mesh, &output.ids, UVec3::ZERO), BACKGROUND_ID);
}

#[test]
fn test_two_cubes_separated_by_empty_block() {
    let mut mesh = VelocityMesh::new(UVec3::new(3, 1, 1), 2).unwrap();
    fill_cube(&mut mesh, UVec3::ZERO, 2, 2.0);
    fill_cube(&mut mesh, UVec3::new(4, 0, 0), 2, 1.0);
    assert!(mesh.slot_of(UVec3::new(1, 0, 0)).is_none());

    for policy in all_policies() {
        let output = cluster_with(&mesh, ClusterConfig::new(policy)).unwrap();
        assert_eq!(output.num_clusters(), 2, "{}", policy.name());
        assert!(output.clusters.iter().all(|c| c.members == 8));
        assert_eq!(id_at(&mesh, &output.ids, UVec3::ZERO), FIRST_CLUSTER_ID);
        assert_eq!(
            id_at(&mesh, &output.ids, UVec3::new(5, 1, 1)),
            FIRST_CLUSTER_ID + 1
        );
    }
}

#[test]
fn test_two_cubes_separated_by_background() {
    let mut mesh = VelocityMesh::new(UVec3::ONE, 6).unwrap();
    fill_cube(&mut mesh, UVec3::ZERO, 2, 2.0);
    fill_cube(&mut mesh, UVec3::splat(3), 2, 1.0);

    for policy in all_policies() {
        let config = ClusterConfig::new(policy).with_background_floor(0.5);
        let output = cluster_with(&mesh, config).unwrap();
        assert_eq!(output.num_clusters(), 2, "{}", policy.name());
        assert!(output.clusters.iter().all(|c| c.members == 8));
        assert_eq!(output.stats.background_cells, 216 - 16);
        assert_eq!(output.stats.unassigned_cells, 0);
    }
}

#[test]
fn test_threshold_expansion_leaves_unreached_cells() {
    let mut mesh = VelocityMesh::new(UVec3::ONE, 6).unwrap();
    fill_cube(&mut mesh, UVec3::ZERO, 2, 2.0);
    fill_cube(&mut mesh, UVec3::splat(3), 2, 1.0);

    let policy = ClusteringPolicy::ThresholdExpansion {
        value_threshold: 1.5,
    };
    let output = cluster_with(&mesh, ClusterConfig::new(policy)).unwrap();
    assert_eq!(output.num_clusters(), 1);
    assert_eq!(output.clusters[0].members, 8);
    assert_eq!(output.stats.unassigned_cells, 216 - 8);
    assert_eq!(id_at(&mesh, &output.ids, UVec3::splat(4)), NO_CLUSTER_ID);
}

#[test]
fn test_default_threshold_reaches_everything() {
    let mesh = random_dense_mesh(3, 4, 7);
    let output = cluster_with(
        &mesh,
        ClusterConfig::new(ClusteringPolicy::threshold_expansion()),
    )
    .unwrap();
    assert_eq!(output.num_clusters(), 1);
    assert_eq!(output.stats.unassigned_cells, 0);
    assert!(output.ids.iter().all(|&id| id == FIRST_CLUSTER_ID));
}

#[test]
fn test_always_merge_assigns_every_cell() {
    let mesh = random_dense_mesh(3, 4, 11);
    let output = cluster_with(&mesh, ClusterConfig::new(ClusteringPolicy::AlwaysMerge)).unwrap();
    assert!(!output.ids.contains(&NO_CLUSTER_ID));
    assert_eq!(output.num_clusters(), 1);
    assert_eq!(output.clusters[0].id, FIRST_CLUSTER_ID);
    assert_eq!(output.clusters[0].members as usize, output.ids.len());
}

#[test]
fn test_every_policy_is_idempotent() {
    let mesh = random_sparse_mesh(5, 3, 0.6, 21);
    for policy in all_policies() {
        let config = ClusterConfig::new(policy).with_background_floor(0.2);
        let a = cluster_with(&mesh, config).unwrap();
        let b = cluster_with(&mesh, config).unwrap();
        assert_eq!(a.ids, b.ids, "{}", policy.name());
        assert_eq!(a.clusters, b.clusters);
        assert_eq!(a.stats, b.stats);
    }
}

#[test]
fn test_every_policy_produces_connected_clusters() {
    let meshes = [
        random_dense_mesh(3, 4, 3),
        random_sparse_mesh(5, 3, 0.5, 4),
        core_and_beam_mesh(8, 4, 1e-4),
    ];
    for mesh in &meshes {
        for policy in all_policies() {
            for floor in [None, Some(0.3f32)] {
                let config = ClusterConfig {
                    policy,
                    background_floor: floor,
                };
                let output = cluster_with(mesh, config).unwrap();
                let report = validate_output(mesh, &output).unwrap();
                assert!(
                    report.is_valid(),
                    "{} floor={:?}: {}",
                    policy.name(),
                    floor,
                    report.summary()
                );
                assert_eq!(report.num_clusters, output.num_clusters());
            }
        }
    }
}

#[test]
fn test_merge_policies_only_reduce_cluster_count() {
    let mesh = random_sparse_mesh(5, 3, 0.7, 8);
    let count = |policy| {
        cluster_with(&mesh, ClusterConfig::new(policy))
            .unwrap()
            .num_clusters()
    };
    let no_merge = count(ClusteringPolicy::NoMerge);
    assert!(count(ClusteringPolicy::size_gated()) <= no_merge);
    assert!(count(ClusteringPolicy::connectivity_ratio()) <= no_merge);
    assert!(count(ClusteringPolicy::AlwaysMerge) <= count(ClusteringPolicy::size_gated()));
}

#[test]
fn test_core_and_beam_separate_without_merging() {
    let mesh = core_and_beam_mesh(8, 4, 1e-4);
    let core = UVec3::splat(16);
    let beam = UVec3::new(26, 16, 16);

    for policy in [ClusteringPolicy::NoMerge, ClusteringPolicy::size_gated()] {
        let output = cluster_with(&mesh, ClusterConfig::new(policy).with_background_floor(1e-4))
            .unwrap();
        let core_id = id_at(&mesh, &output.ids, core);
        let beam_id = id_at(&mesh, &output.ids, beam);
        assert!(core_id >= FIRST_CLUSTER_ID && beam_id >= FIRST_CLUSTER_ID);
        assert_ne!(core_id, beam_id, "{}", policy.name());
    }

    let output = cluster_with(
        &mesh,
        ClusterConfig::new(ClusteringPolicy::AlwaysMerge).with_background_floor(1e-4),
    )
    .unwrap();
    assert_eq!(
        id_at(&mesh, &output.ids, core),
        id_at(&mesh, &output.ids, beam)
    );
}

#[test]
fn test_cluster_into_leaves_tail_untouched() {
    let mut mesh = VelocityMesh::new(UVec3::ONE, 2).unwrap();
    mesh.insert_block_values(UVec3::ZERO, &[1.0; 8]).unwrap();

    let mut out = vec![u32::MAX; 12];
    let stats = cluster_into(
        &mesh,
        &ClusterConfig::new(ClusteringPolicy::NoMerge),
        &mut out,
    )
    .unwrap();
    assert_eq!(stats.cells, 8);
    assert_eq!(&out[..8], &[FIRST_CLUSTER_ID; 8]);
    assert_eq!(&out[8..], &[u32::MAX; 4]);
}

/// A 10³ blob whose values fall off from its centre, joined through two low saddle cells
/// to a 1-cell peak and to a 50-cell ramp.
fn blob_with_two_peaks() -> (VelocityMesh, [UVec3; 3]) {
    let mut mesh = VelocityMesh::new(UVec3::new(3, 1, 1), 10).unwrap();
    for x in 0..10 {
        for y in 0..10 {
            for z in 0..10 {
                let d = [x, y, z]
                    .map(|c| (c as f32 - 4.5).abs())
                    .into_iter()
                    .fold(0.0, f32::max);
                mesh.set(UVec3::new(x, y, z), 100.0 - d).unwrap();
            }
        }
    }
    let lone = UVec3::new(11, 2, 2);
    mesh.set(lone, 50.0).unwrap();
    for x in 11..16 {
        for y in 5..10 {
            for z in 7..9 {
                let step = (x - 11) + (y - 5) + (z - 7);
                mesh.set(UVec3::new(x, y, z), 60.0 - 0.1 * step as f32).unwrap();
            }
        }
    }
    mesh.set(UVec3::new(10, 2, 2), 1.0).unwrap();
    mesh.set(UVec3::new(10, 7, 7), 1.0).unwrap();
    (mesh, [UVec3::splat(4), lone, UVec3::new(11, 5, 7)])
}

#[test]
fn test_size_gate_merges_only_the_small_peak() {
    let (mesh, [blob, lone, ramp]) = blob_with_two_peaks();
    let gated = ClusteringPolicy::SizeGated {
        fraction: 0.002,
        expected_cells: Some(10_000),
    };
    let output = cluster_with(&mesh, ClusterConfig::new(gated).with_background_floor(0.5)).unwrap();

    let blob_id = id_at(&mesh, &output.ids, blob);
    let ramp_id = id_at(&mesh, &output.ids, ramp);
    // 1 < 0.002 * 10000 merges; 50 does not.
    assert_eq!(id_at(&mesh, &output.ids, lone), blob_id);
    assert_ne!(ramp_id, blob_id);
    assert_eq!(output.num_clusters(), 2);
    assert_eq!(output.stats.merges, 1);
    assert_eq!(output.stats.clusters_created, 3);
    // Two allocated blocks of 1000 cells each.
    assert_eq!(output.stats.background_cells, 2000 - 1053);

    let blob_members = output.summary(blob_id).unwrap().members;
    let ramp_members = output.summary(ramp_id).unwrap().members;
    assert!(blob_members == 1002 || blob_members == 1003);
    assert!(ramp_members == 50 || ramp_members == 51);
    assert_eq!(blob_members + ramp_members, 1053);
    assert!(validate_output(&mesh, &output).unwrap().is_valid());

    let apart = cluster_with(
        &mesh,
        ClusterConfig::new(ClusteringPolicy::NoMerge).with_background_floor(0.5),
    )
    .unwrap();
    assert_eq!(apart.num_clusters(), 3);
    assert_ne!(
        id_at(&mesh, &apart.ids, lone),
        id_at(&mesh, &apart.ids, blob)
    );

    let merged = cluster_with(
        &mesh,
        ClusterConfig::new(ClusteringPolicy::AlwaysMerge).with_background_floor(0.5),
    )
    .unwrap();
    assert_eq!(merged.num_clusters(), 1);
}
