//! One-shot registration of interface vertices with the coupling middleware.

use crate::capability::{CouplingInterface, MeshId};
use crate::coupling_error::CouplingError;
use crate::debug_invariants::DebugInvariants;
use crate::topology::vertex::{BoundaryVertex, InterfacePartition, MarkerId, VertexHandle};

/// Registered interface: extracted vertices plus the handles returned for them.
///
/// `handles[i]` belongs to `vertices()[i]` for the rest of the run.
#[derive(Clone, Debug)]
pub struct InterfaceMesh {
    name: String,
    mesh_id: MeshId,
    dimension: usize,
    partition: InterfacePartition,
    handles: Vec<VertexHandle>,
}

impl InterfaceMesh {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mesh_id(&self) -> MeshId {
        self.mesh_id
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn partition(&self) -> &InterfacePartition {
        &self.partition
    }

    pub fn marker(&self) -> Option<MarkerId> {
        self.partition.marker()
    }

    pub fn vertices(&self) -> &[BoundaryVertex] {
        self.partition.vertices()
    }

    pub fn handles(&self) -> &[VertexHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn is_degenerate(&self) -> bool {
        self.partition.is_degenerate()
    }
}

impl DebugInvariants for InterfaceMesh {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "InterfaceMesh");
    }

    fn validate_invariants(&self) -> Result<(), CouplingError> {
        if self.handles.len() != self.partition.len() {
            return Err(CouplingError::LengthMismatch {
                call: "set_mesh_vertices",
                iteration: 0,
                field: self.name.clone(),
                expected: self.partition.len(),
                found: self.handles.len(),
            });
        }
        let mut seen = std::collections::HashSet::with_capacity(self.handles.len());
        if let Some(dup) = self.handles.iter().find(|h| !seen.insert(**h)) {
            return Err(CouplingError::InvariantViolation(format!(
                "duplicate vertex handle {dup} on mesh `{}`",
                self.name
            )));
        }
        Ok(())
    }
}

/// Registers the interface exactly once per run.
#[derive(Debug, Default)]
pub struct CouplingMeshRegistrar {
    registered: Option<String>,
}

impl CouplingMeshRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_registered(&self) -> bool {
        self.registered.is_some()
    }

    /// Validate dimensions, resolve `mesh_name` and register the vertices.
    ///
    /// Dimension checks run before the middleware is asked to register anything.
    pub fn register<I>(
        &mut self,
        interface: &mut I,
        mesh_name: &str,
        dimension: usize,
        partition: InterfacePartition,
    ) -> Result<InterfaceMesh, CouplingError>
    where
        I: CouplingInterface + ?Sized,
    {
        if let Some(name) = &self.registered {
            return Err(CouplingError::AlreadyRegistered(name.clone()));
        }
        check_dimension(interface.dimensions(), dimension, &partition)?;

        let mesh_id = interface
            .mesh_id(mesh_name)
            .map_err(|source| CouplingError::UnknownMesh {
                name: mesh_name.to_string(),
                source,
            })?;

        let coords = partition.flat_coords();
        let handles = interface
            .set_mesh_vertices(mesh_id, &coords)
            .map_err(|e| CouplingError::transport("set_mesh_vertices", 0, e))?;
        if handles.len() != partition.len() {
            return Err(CouplingError::LengthMismatch {
                call: "set_mesh_vertices",
                iteration: 0,
                field: mesh_name.to_string(),
                expected: partition.len(),
                found: handles.len(),
            });
        }

        log::info!(
            "rank {}: registered {} vertices on mesh `{mesh_name}`",
            partition.rank(),
            handles.len()
        );
        self.registered = Some(mesh_name.to_string());
        Ok(InterfaceMesh {
            name: mesh_name.to_string(),
            mesh_id,
            dimension,
            partition,
            handles,
        })
    }
}

fn check_dimension(
    interface_dim: usize,
    dimension: usize,
    partition: &InterfacePartition,
) -> Result<(), CouplingError> {
    if interface_dim != dimension {
        return Err(CouplingError::DimensionMismatch {
            solver: dimension,
            interface: interface_dim,
        });
    }
    for v in partition.vertices() {
        if v.coords().len() != dimension {
            return Err(CouplingError::CoordinateDimension {
                vertex: v.index(),
                expected: dimension,
                found: v.coords().len(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::loopback::LoopbackSession;
    use crate::coupling_error::ErrorKind;
    use crate::topology::vertex::MarkerId;

    fn partition(n: usize, dim: usize) -> InterfacePartition {
        let vertices = (0..n)
            .map(|i| BoundaryVertex::new(i, vec![i as f64; dim], false, 0))
            .collect();
        InterfacePartition::new(Some(MarkerId(2)), 0, vertices)
    }

    #[test]
    fn handles_follow_vertex_order() {
        let session = LoopbackSession::builder().dimensions(2).build();
        let mut iface = session.participant(0);
        let mut reg = CouplingMeshRegistrar::new();
        let mesh = reg.register(&mut iface, "Fluid-Mesh", 2, partition(5, 2)).unwrap();
        assert_eq!(mesh.len(), 5);
        let coords = session.registered_coords(0);
        for (i, h) in mesh.handles().iter().enumerate() {
            assert_eq!(coords[h.get() as usize], vec![i as f64; 2]);
        }
        mesh.validate_invariants().unwrap();
    }

    #[test]
    fn dimension_mismatch_is_rejected_before_registration() {
        let session = LoopbackSession::builder().dimensions(3).build();
        let mut iface = session.participant(0);
        let mut reg = CouplingMeshRegistrar::new();
        let err = reg
            .register(&mut iface, "Fluid-Mesh", 2, partition(3, 2))
            .unwrap_err();
        assert!(matches!(
            err,
            CouplingError::DimensionMismatch {
                solver: 2,
                interface: 3
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(session.registered_coords(0).is_empty());
        assert!(!reg.is_registered());
    }

    #[test]
    fn coordinate_length_is_checked() {
        let session = LoopbackSession::builder().dimensions(2).build();
        let mut iface = session.participant(0);
        let err = CouplingMeshRegistrar::new()
            .register(&mut iface, "Fluid-Mesh", 2, partition(2, 3))
            .unwrap_err();
        assert!(matches!(err, CouplingError::CoordinateDimension { vertex: 0, .. }));
    }

    #[test]
    fn unknown_mesh_is_configuration_error() {
        let session = LoopbackSession::builder().dimensions(2).build();
        let mut iface = session.participant(0);
        let err = CouplingMeshRegistrar::new()
            .register(&mut iface, "Solid-Mesh", 2, partition(1, 2))
            .unwrap_err();
        assert!(matches!(err, CouplingError::UnknownMesh { .. }));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn second_registration_is_refused() {
        let session = LoopbackSession::builder().dimensions(2).build();
        let mut iface = session.participant(0);
        let mut reg = CouplingMeshRegistrar::new();
        reg.register(&mut iface, "Fluid-Mesh", 2, partition(1, 2)).unwrap();
        let err = reg
            .register(&mut iface, "Fluid-Mesh", 2, partition(1, 2))
            .unwrap_err();
        assert!(matches!(err, CouplingError::AlreadyRegistered(_)));
    }

    #[test]
    fn empty_partition_registers_zero_handles() {
        let session = LoopbackSession::builder().dimensions(2).build();
        let mut iface = session.participant(1);
        let mesh = CouplingMeshRegistrar::new()
            .register(&mut iface, "Fluid-Mesh", 2, InterfacePartition::degenerate(1))
            .unwrap();
        assert!(mesh.is_empty());
        assert!(mesh.is_degenerate());
    }
}
