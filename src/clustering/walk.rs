//! Descending-value walk shared by the merging policies.

use super::constants::{BACKGROUND_ID, FIRST_CLUSTER_ID, NO_CLUSTER_ID};
use super::policy::MergeTrigger;
use super::registry::{ClusterHandle, ClusterRegistry};
use crate::catalog::VelocityCatalog;
use crate::resolver::NeighborResolver;
use crate::types::VelocitySpace;

/// What the walk does when a cell touches a second, different cluster.
#[derive(Clone, Copy)]
pub(crate) enum Contact<'t> {
    /// Ask the trigger, merge if it agrees.
    Merge(&'t dyn MergeTrigger),
    /// Never merge; count the crossing edge for the connectivity post-pass.
    CountEdges,
}

/// Per-cell cluster handles plus the registry they point into.
///
/// `handles[flat]` is [`BACKGROUND_ID`], [`NO_CLUSTER_ID`] or the raw creation id of a
/// [`ClusterHandle`].
pub(crate) struct Assignment {
    pub registry: ClusterRegistry,
    pub handles: Vec<u32>,
}

impl Assignment {
    /// Every cell unassigned, except cells below `background_floor` (and NaN samples when
    /// a floor is set), which are background.
    pub fn new(catalog: &VelocityCatalog, background_floor: Option<f32>) -> Self {
        let handles = match background_floor {
            Some(floor) => catalog
                .cells()
                .iter()
                .map(|c| {
                    if c.value >= floor {
                        NO_CLUSTER_ID
                    } else {
                        BACKGROUND_ID
                    }
                })
                .collect(),
            None => vec![NO_CLUSTER_ID; catalog.len()],
        };
        Self {
            registry: ClusterRegistry::new(),
            handles,
        }
    }

    /// Cluster handle of `flat`, if the cell has been assigned to one.
    #[inline]
    pub fn handle(&self, flat: usize) -> Option<ClusterHandle> {
        let raw = self.handles[flat];
        (raw >= FIRST_CLUSTER_ID).then(|| ClusterHandle::from_raw(raw))
    }

    #[inline]
    pub fn assign(&mut self, flat: usize, handle: ClusterHandle) {
        debug_assert_eq!(self.handles[flat], NO_CLUSTER_ID, "cell {} assigned twice", flat);
        self.handles[flat] = handle.raw();
    }

    /// Write representative ids (or the reserved id) into `out[..handles.len()]`.
    pub fn write_into(&self, out: &mut [u32]) {
        debug_assert!(out.len() >= self.handles.len());
        for (slot, &raw) in out.iter_mut().zip(&self.handles) {
            *slot = if raw >= FIRST_CLUSTER_ID {
                self.registry.find(ClusterHandle::from_raw(raw))
            } else {
                raw
            };
        }
    }

    pub fn count(&self, id: u32) -> usize {
        self.handles.iter().filter(|&&raw| raw == id).count()
    }
}

/// Visit cells from highest to lowest value. A cell joins the cluster of its first
/// already-assigned neighbor; further contacts with other clusters are handled per
/// `contact`; a cell with no assigned neighbor starts a new cluster.
pub(crate) fn descending_walk<S: VelocitySpace + ?Sized>(
    resolver: &NeighborResolver<'_, S>,
    catalog: &VelocityCatalog,
    assignment: &mut Assignment,
    contact: Contact<'_>,
) {
    let mut neighbors = Vec::with_capacity(26);

    for &flat in catalog.order() {
        let flat = flat as usize;
        if assignment.handles[flat] == BACKGROUND_ID {
            continue;
        }

        resolver.resolve_into(catalog.cell(flat).key, &mut neighbors);

        let mut own: Option<ClusterHandle> = None;
        for &neighbor in &neighbors {
            let Some(theirs) = assignment.handle(catalog.flat(neighbor)) else {
                continue;
            };
            let registry = &mut assignment.registry;
            match own {
                None => {
                    registry.append_member(theirs, 1);
                    own = Some(theirs);
                }
                Some(mine) if !registry.same_cluster(mine, theirs) => match contact {
                    Contact::Merge(trigger) => {
                        if trigger.should_merge(registry.summary(mine), registry.summary(theirs)) {
                            registry.merge(mine, theirs);
                        }
                    }
                    Contact::CountEdges => registry.record_edge(mine, theirs),
                },
                Some(_) => {}
            }
        }

        let own = match own {
            Some(handle) => handle,
            None => assignment.registry.create(),
        };
        assignment.assign(flat, own);
    }
}
