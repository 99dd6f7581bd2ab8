//! Boundary vertices of the coupling interface and their middleware handles.
//!
//! A [`BoundaryVertex`] is created once during interface extraction and never
//! mutated. A [`VertexHandle`] is assigned by the middleware at registration
//! and is bound positionally to the vertex at the same local index.

use std::fmt;

/// Solver-side index of a boundary marker on this partition.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct MarkerId(pub usize);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque middleware-assigned vertex identifier.
///
/// This type is `repr(transparent)` over `i32`, the integer width used by the
/// coupling middleware, so a handle slice can be passed across FFI unchanged.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct VertexHandle(i32);

impl VertexHandle {
    #[inline]
    pub const fn new(raw: i32) -> Self {
        VertexHandle(raw)
    }

    #[inline]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Debug for VertexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VertexHandle").field(&self.0).finish()
    }
}

impl fmt::Display for VertexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One vertex of the coupling marker on the local partition.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoundaryVertex {
    index: usize,
    coords: Vec<f64>,
    is_halo: bool,
    owner: usize,
}

impl BoundaryVertex {
    pub fn new(index: usize, coords: Vec<f64>, is_halo: bool, owner: usize) -> Self {
        Self {
            index,
            coords,
            is_halo,
            owner,
        }
    }

    /// Local 0-based index on the marker.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Initial coordinates (2 or 3 components).
    #[inline]
    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    /// True if this vertex is a duplicate owned by a neighbouring partition.
    #[inline]
    pub fn is_halo(&self) -> bool {
        self.is_halo
    }

    /// Rank owning this vertex.
    #[inline]
    pub fn owner(&self) -> usize {
        self.owner
    }
}

/// Result of interface extraction on one partition.
///
/// `marker` is `None` when the coupling marker is absent here; the partition
/// then owns zero vertices but still takes part in every collective step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InterfacePartition {
    marker: Option<MarkerId>,
    rank: usize,
    vertices: Vec<BoundaryVertex>,
}

impl InterfacePartition {
    pub(crate) fn new(marker: Option<MarkerId>, rank: usize, vertices: Vec<BoundaryVertex>) -> Self {
        Self {
            marker,
            rank,
            vertices,
        }
    }

    /// An interface with no coupling marker on `rank`.
    pub fn degenerate(rank: usize) -> Self {
        Self::new(None, rank, Vec::new())
    }

    pub fn marker(&self) -> Option<MarkerId> {
        self.marker
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn vertices(&self) -> &[BoundaryVertex] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// True when this partition owns no coupling vertices.
    pub fn is_degenerate(&self) -> bool {
        self.marker.is_none() || self.vertices.is_empty()
    }

    /// Number of halo vertices on this partition.
    pub fn halo_count(&self) -> usize {
        self.vertices.iter().filter(|v| v.is_halo()).count()
    }

    /// Coordinates flattened row-major, `dimension` values per vertex.
    pub fn flat_coords(&self) -> Vec<f64> {
        self.vertices
            .iter()
            .flat_map(|v| v.coords().iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_is_transparent_i32() {
        assert_eq!(std::mem::size_of::<VertexHandle>(), std::mem::size_of::<i32>());
        let h = VertexHandle::new(7);
        assert_eq!(h.get(), 7);
        assert_eq!(format!("{h:?}"), "VertexHandle(7)");
        assert_eq!(format!("{h}"), "7");
    }

    #[test]
    fn degenerate_partition_has_no_vertices() {
        let p = InterfacePartition::degenerate(3);
        assert!(p.is_degenerate());
        assert_eq!(p.rank(), 3);
        assert!(p.flat_coords().is_empty());
    }

    #[test]
    fn flat_coords_are_row_major() {
        let p = InterfacePartition::new(
            Some(MarkerId(0)),
            0,
            vec![
                BoundaryVertex::new(0, vec![0.0, 1.0], false, 0),
                BoundaryVertex::new(1, vec![2.0, 3.0], true, 1),
            ],
        );
        assert_eq!(p.flat_coords(), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(p.halo_count(), 1);
        assert!(!p.is_degenerate());
    }
}
