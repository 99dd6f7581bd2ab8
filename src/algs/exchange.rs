//! Directional field exchange keyed by registered vertex handles.
//!
//! The channel binds one read field and one write field to middleware data
//! identifiers. Which quantity goes which way is configuration: the mirrored
//! participant builds the same channel with the names swapped. The channel
//! holds no field values between calls.

use crate::algs::register::InterfaceMesh;
use crate::capability::{CouplingInterface, DataId};
use crate::coupling_error::CouplingError;
use crate::data::field::{CouplingField, FieldKind, FieldRole, ParticipantRole};

/// A named field resolved on the coupling mesh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldBinding {
    name: String,
    kind: FieldKind,
    id: DataId,
}

impl FieldBinding {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn id(&self) -> DataId {
        self.id
    }
}

/// Read/write channel for one participant role.
#[derive(Clone, Debug)]
pub struct DataExchangeChannel {
    role: ParticipantRole,
    read: FieldBinding,
    write: FieldBinding,
}

impl DataExchangeChannel {
    /// Resolve `read_name` and `write_name` on `mesh`.
    ///
    /// The names must classify as opposite quantities; that pair is the role.
    pub fn resolve<I>(
        interface: &I,
        mesh: &InterfaceMesh,
        read_name: &str,
        write_name: &str,
    ) -> Result<Self, CouplingError>
    where
        I: CouplingInterface + ?Sized,
    {
        let read_kind = FieldKind::from_name(read_name)
            .ok_or_else(|| CouplingError::UnrecognizedFieldName(read_name.to_string()))?;
        let write_kind = FieldKind::from_name(write_name)
            .ok_or_else(|| CouplingError::UnrecognizedFieldName(write_name.to_string()))?;
        let role = ParticipantRole::from_kinds(read_kind, write_kind).ok_or_else(|| {
            CouplingError::RoleConflict {
                read: read_name.to_string(),
                write: write_name.to_string(),
            }
        })?;

        let bind = |name: &str, kind| {
            interface
                .data_id(name, mesh.mesh_id())
                .map(|id| FieldBinding {
                    name: name.to_string(),
                    kind,
                    id,
                })
                .map_err(|source| CouplingError::UnknownField {
                    name: name.to_string(),
                    source,
                })
        };
        let read = bind(read_name, read_kind)?;
        let write = bind(write_name, write_kind)?;
        log::debug!(
            "exchange channel on `{}`: read `{}` ({}), write `{}` ({})",
            mesh.name(),
            read.name,
            read.kind,
            write.name,
            write.kind
        );
        Ok(Self { role, read, write })
    }

    pub fn role(&self) -> ParticipantRole {
        self.role
    }

    pub fn read_binding(&self) -> &FieldBinding {
        &self.read
    }

    pub fn write_binding(&self) -> &FieldBinding {
        &self.write
    }

    /// Fresh zeroed buffer for the read field, aligned with `mesh`.
    pub fn read_buffer(&self, mesh: &InterfaceMesh) -> CouplingField {
        CouplingField::new(&self.read.name, self.read.kind, FieldRole::Read, mesh.len())
    }

    /// Fresh zeroed buffer for the write field, aligned with `mesh`.
    pub fn write_buffer(&self, mesh: &InterfaceMesh) -> CouplingField {
        CouplingField::new(&self.write.name, self.write.kind, FieldRole::Write, mesh.len())
    }

    /// Overwrite `field` with the other participant's values for the current window.
    pub fn read<I>(
        &self,
        interface: &mut I,
        mesh: &InterfaceMesh,
        iteration: usize,
        field: &mut CouplingField,
    ) -> Result<(), CouplingError>
    where
        I: CouplingInterface + ?Sized,
    {
        let binding = self.binding("read", field, FieldRole::Read, iteration)?;
        check_len("read", iteration, field, mesh)?;
        interface
            .read_block_scalar_data(binding.id, mesh.handles(), field.values_mut())
            .map_err(|e| CouplingError::transport("read", iteration, e))?;
        log::trace!("read {} values of `{}` at iteration {iteration}", field.len(), field.name());
        Ok(())
    }

    /// Send `field` for the current window.
    ///
    /// Flux-typed fields must already carry 0 on every halo vertex.
    pub fn write<I>(
        &self,
        interface: &mut I,
        mesh: &InterfaceMesh,
        iteration: usize,
        field: &CouplingField,
    ) -> Result<(), CouplingError>
    where
        I: CouplingInterface + ?Sized,
    {
        let binding = self.binding("write", field, FieldRole::Write, iteration)?;
        check_len("write", iteration, field, mesh)?;
        if let Some(vertex) = field.first_halo_violation(mesh.vertices()) {
            return Err(CouplingError::HaloWriteNonZero {
                iteration,
                field: field.name().to_string(),
                vertex,
                value: field.values()[vertex],
            });
        }
        interface
            .write_block_scalar_data(binding.id, mesh.handles(), field.values())
            .map_err(|e| CouplingError::transport("write", iteration, e))?;
        log::trace!("wrote {} values of `{}` at iteration {iteration}", field.len(), field.name());
        Ok(())
    }

    fn binding(
        &self,
        call: &'static str,
        field: &CouplingField,
        role: FieldRole,
        iteration: usize,
    ) -> Result<&FieldBinding, CouplingError> {
        let binding = match role {
            FieldRole::Read => &self.read,
            FieldRole::Write => &self.write,
        };
        if field.role() != role || field.name() != binding.name {
            return Err(CouplingError::InvalidConfig(format!(
                "`{call}` at iteration {iteration}: field `{}` is not bound for {call} on this channel",
                field.name()
            )));
        }
        Ok(binding)
    }
}

fn check_len(
    call: &'static str,
    iteration: usize,
    field: &CouplingField,
    mesh: &InterfaceMesh,
) -> Result<(), CouplingError> {
    if field.len() != mesh.len() {
        return Err(CouplingError::LengthMismatch {
            call,
            iteration,
            field: field.name().to_string(),
            expected: mesh.len(),
            found: field.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::register::CouplingMeshRegistrar;
    use crate::backend::loopback::{LoopbackInterface, LoopbackSession};
    use crate::coupling_error::ErrorKind;
    use crate::data::field::WriteSign;
    use crate::topology::vertex::{BoundaryVertex, InterfacePartition, MarkerId};

    fn setup(halo: &[bool]) -> (LoopbackSession, LoopbackInterface, InterfaceMesh) {
        let session = LoopbackSession::builder()
            .dimensions(2)
            .counterpart("Temperature", 305.0)
            .build();
        let mut iface = session.participant(0);
        let vertices = halo
            .iter()
            .enumerate()
            .map(|(i, &h)| BoundaryVertex::new(i, vec![i as f64, 0.0], h, 0))
            .collect();
        let partition = InterfacePartition::new(Some(MarkerId(0)), 0, vertices);
        let mesh = CouplingMeshRegistrar::new()
            .register(&mut iface, "Fluid-Mesh", 2, partition)
            .unwrap();
        iface.initialize().unwrap();
        (session, iface, mesh)
    }

    #[test]
    fn role_comes_from_names() {
        let (_s, iface, mesh) = setup(&[false]);
        let ch = DataExchangeChannel::resolve(&iface, &mesh, "Temperature", "Heat-Flux").unwrap();
        assert_eq!(ch.role(), ParticipantRole::WritesHeatFlux);
        let mirrored =
            DataExchangeChannel::resolve(&iface, &mesh, "Heat-Flux", "Temperature").unwrap();
        assert_eq!(mirrored.role(), ParticipantRole::WritesTemperature);
    }

    #[test]
    fn same_kind_on_both_sides_is_rejected() {
        let (_s, iface, mesh) = setup(&[false]);
        let err = DataExchangeChannel::resolve(&iface, &mesh, "Temperature", "Temperature")
            .unwrap_err();
        assert!(matches!(err, CouplingError::RoleConflict { .. }));
    }

    #[test]
    fn unknown_field_on_mesh_is_configuration_error() {
        let (_s, iface, mesh) = setup(&[false]);
        let err = DataExchangeChannel::resolve(&iface, &mesh, "Wall-Temperature", "Heat-Flux")
            .unwrap_err();
        assert!(matches!(err, CouplingError::UnknownField { .. }));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn read_returns_counterpart_values() {
        let (_s, mut iface, mesh) = setup(&[false, false, true]);
        let ch = DataExchangeChannel::resolve(&iface, &mesh, "Temperature", "Heat-Flux").unwrap();
        let mut buf = ch.read_buffer(&mesh);
        ch.read(&mut iface, &mesh, 0, &mut buf).unwrap();
        assert_eq!(buf.values(), &[305.0, 305.0, 305.0]);
    }

    #[test]
    fn write_reaches_middleware_aligned_with_handles() {
        let (session, mut iface, mesh) = setup(&[false, false, true, true]);
        let ch = DataExchangeChannel::resolve(&iface, &mesh, "Temperature", "Heat-Flux").unwrap();
        let mut buf = ch.write_buffer(&mesh);
        buf.overwrite_from(mesh.vertices(), WriteSign::Positive, |v| v.index() as f64 + 1.0);
        ch.write(&mut iface, &mesh, 0, &buf).unwrap();
        let writes = session.writes(0);
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].values, vec![1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn length_mismatch_is_synchronization_fault() {
        let (_s, mut iface, mesh) = setup(&[false, false]);
        let ch = DataExchangeChannel::resolve(&iface, &mesh, "Temperature", "Heat-Flux").unwrap();
        let short = CouplingField::new("Heat-Flux", FieldKind::HeatFlux, FieldRole::Write, 1);
        let err = ch.write(&mut iface, &mesh, 3, &short).unwrap_err();
        assert!(matches!(
            err,
            CouplingError::LengthMismatch {
                call: "write",
                iteration: 3,
                expected: 2,
                found: 1,
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Synchronization);
    }

    #[test]
    fn nonzero_halo_flux_is_refused() {
        let (session, mut iface, mesh) = setup(&[false, true]);
        let ch = DataExchangeChannel::resolve(&iface, &mesh, "Temperature", "Heat-Flux").unwrap();
        let mut buf = ch.write_buffer(&mesh);
        buf.values_mut().copy_from_slice(&[1.0, 2.0]);
        let err = ch.write(&mut iface, &mesh, 0, &buf).unwrap_err();
        assert!(matches!(err, CouplingError::HaloWriteNonZero { vertex: 1, .. }));
        assert!(session.writes(0).is_empty());
    }

    #[test]
    fn read_buffer_cannot_be_written() {
        let (_s, mut iface, mesh) = setup(&[false]);
        let ch = DataExchangeChannel::resolve(&iface, &mesh, "Temperature", "Heat-Flux").unwrap();
        let buf = ch.read_buffer(&mesh);
        assert!(ch.write(&mut iface, &mesh, 0, &buf).is_err());
    }
}
