//! Boundary interface extraction.
//!
//! Locates the coupling marker on the local partition and enumerates its
//! vertices with halo status and initial coordinates. A partition without the
//! marker yields a degenerate [`InterfacePartition`]; that is not an error.

use crate::capability::FlowSolver;
use crate::topology::vertex::{BoundaryVertex, InterfacePartition, MarkerId};

/// Default name of the CHT marker to couple.
pub const DEFAULT_CHT_MARKER: &str = "interface";

/// Resolve `marker_name` against the solver's CHT tags and the markers present
/// on this partition.
pub fn find_cht_marker<S>(solver: &S, marker_name: &str) -> Option<MarkerId>
where
    S: FlowSolver + ?Sized,
{
    let is_cht = solver.cht_marker_tags().iter().any(|tag| tag == marker_name);
    if !is_cht {
        return None;
    }
    solver.boundary_markers().get(marker_name).copied()
}

/// Extract the coupling interface owned by `rank`.
pub fn extract_interface<S>(solver: &S, marker_name: &str, rank: usize) -> InterfacePartition
where
    S: FlowSolver + ?Sized,
{
    let Some(marker) = find_cht_marker(solver, marker_name) else {
        log::info!("rank {rank}: marker `{marker_name}` not present, no coupling vertices here");
        return InterfacePartition::degenerate(rank);
    };

    let n = solver.vertex_count(marker);
    let vertices: Vec<BoundaryVertex> = (0..n)
        .map(|i| {
            let is_halo = solver.is_halo(marker, i);
            let owner = solver.vertex_owner(marker, i).unwrap_or(rank);
            BoundaryVertex::new(i, solver.initial_coordinates(marker, i), is_halo, owner)
        })
        .collect();

    let partition = InterfacePartition::new(Some(marker), rank, vertices);
    log::info!(
        "rank {rank}: marker `{marker_name}` (id {marker}) has {} vertices, {} halo",
        partition.len(),
        partition.halo_count()
    );
    partition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory_solver::{MemorySolver, MemoryVertex};

    fn solver_with(marker: &str, cht: bool, n: usize) -> MemorySolver {
        let vertices = (0..n)
            .map(|i| MemoryVertex::new(vec![i as f64, 0.0]).halo(i % 2 == 1))
            .collect();
        let mut s = MemorySolver::builder().marker(marker, vertices);
        if cht {
            s = s.cht_tag(marker);
        }
        s.build()
    }

    #[test]
    fn extracts_vertices_in_local_order() {
        let s = solver_with("interface", true, 4);
        let p = extract_interface(&s, "interface", 0);
        assert_eq!(p.len(), 4);
        assert_eq!(p.halo_count(), 2);
        for (i, v) in p.vertices().iter().enumerate() {
            assert_eq!(v.index(), i);
            assert_eq!(v.coords(), &[i as f64, 0.0]);
        }
    }

    #[test]
    fn marker_without_cht_tag_is_degenerate() {
        let s = solver_with("interface", false, 4);
        assert!(extract_interface(&s, "interface", 0).is_degenerate());
    }

    #[test]
    fn missing_marker_is_degenerate() {
        let s = MemorySolver::builder().cht_tag("interface").build();
        let p = extract_interface(&s, "interface", 1);
        assert!(p.is_degenerate());
        assert_eq!(p.rank(), 1);
    }

    #[test]
    fn other_marker_name_is_ignored() {
        let s = solver_with("wall", true, 3);
        assert!(find_cht_marker(&s, "interface").is_none());
    }
}
