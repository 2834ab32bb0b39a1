//! Breadth-first threshold expansion.

use super::constants::NO_CLUSTER_ID;
use super::walk::Assignment;
use crate::catalog::VelocityCatalog;
use crate::resolver::NeighborResolver;
use crate::types::VelocitySpace;
use std::collections::VecDeque;

/// Grow clusters one at a time from the highest unassigned cell with
/// `value >= threshold`, absorbing every reachable unassigned neighbor that also
/// passes the threshold. Cells never reached keep [`NO_CLUSTER_ID`].
pub(crate) fn threshold_expansion<S: VelocitySpace + ?Sized>(
    resolver: &NeighborResolver<'_, S>,
    catalog: &VelocityCatalog,
    assignment: &mut Assignment,
    threshold: f32,
) {
    let mut frontier: VecDeque<usize> = VecDeque::new();
    let mut neighbors = Vec::with_capacity(26);

    for &seed in catalog.order() {
        let seed = seed as usize;
        let value = catalog.value(seed);
        if value < threshold {
            break;
        }
        if value.is_nan() || assignment.handles[seed] != NO_CLUSTER_ID {
            continue;
        }

        let handle = assignment.registry.create();
        assignment.assign(seed, handle);
        frontier.push_back(seed);

        while let Some(flat) = frontier.pop_front() {
            resolver.resolve_into(catalog.cell(flat).key, &mut neighbors);
            for &neighbor in &neighbors {
                let n = catalog.flat(neighbor);
                if assignment.handles[n] == NO_CLUSTER_ID && catalog.value(n) >= threshold {
                    assignment.assign(n, handle);
                    assignment.registry.append_member(handle, 1);
                    frontier.push_back(n);
                }
            }
        }
    }
}
