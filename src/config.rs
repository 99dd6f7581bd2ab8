//! Participant configuration.
//!
//! Mirrors the launch options of a flow participant. The read/write field
//! names encode the participant's role and must be swapped between the two
//! participants of a run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::algs::extract::DEFAULT_CHT_MARKER;
use crate::coupling_error::CouplingError;
use crate::data::field::{FieldKind, ParticipantRole, WriteSign};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CouplingConfig {
    /// Local solver configuration file.
    pub solver_config: PathBuf,
    /// Run with MPI.
    pub parallel: bool,
    /// Participant name known to the middleware.
    pub participant: String,
    /// Middleware configuration file.
    pub interface_config: PathBuf,
    /// Coupling mesh name.
    pub mesh: String,
    pub read_field: String,
    pub write_field: String,
    /// CHT marker to couple.
    pub marker: String,
    pub dimension: usize,
    pub write_sign: WriteSign,
    /// Directory for per-iteration boundary snapshots; none when unset.
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for CouplingConfig {
    fn default() -> Self {
        Self {
            solver_config: PathBuf::from("unsteady_CHT_FlatPlate_Conf.cfg"),
            parallel: false,
            participant: "Fluid".to_string(),
            interface_config: PathBuf::from("../precice-config.xml"),
            mesh: "Fluid-Mesh".to_string(),
            read_field: "Temperature".to_string(),
            write_field: "Heat-Flux".to_string(),
            marker: DEFAULT_CHT_MARKER.to_string(),
            dimension: 2,
            write_sign: WriteSign::Positive,
            snapshot_dir: None,
        }
    }
}

impl CouplingConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(s: &str) -> Result<Self, CouplingError> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| CouplingError::InvalidConfig(format!("malformed configuration: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// The same configuration with read and write fields swapped.
    pub fn mirrored(&self) -> Self {
        Self {
            read_field: self.write_field.clone(),
            write_field: self.read_field.clone(),
            ..self.clone()
        }
    }

    /// Role encoded by the read/write field names.
    pub fn role(&self) -> Result<ParticipantRole, CouplingError> {
        let read = kind_of(&self.read_field)?;
        let write = kind_of(&self.write_field)?;
        ParticipantRole::from_kinds(read, write).ok_or_else(|| CouplingError::RoleConflict {
            read: self.read_field.clone(),
            write: self.write_field.clone(),
        })
    }

    pub fn validate(&self) -> Result<(), CouplingError> {
        if !(2..=3).contains(&self.dimension) {
            return Err(CouplingError::InvalidConfig(format!(
                "dimension must be 2 or 3, got {}",
                self.dimension
            )));
        }
        for (what, value) in [
            ("participant", &self.participant),
            ("mesh", &self.mesh),
            ("marker", &self.marker),
        ] {
            if value.trim().is_empty() {
                return Err(CouplingError::InvalidConfig(format!("{what} name is empty")));
            }
        }
        self.role().map(|_| ())
    }
}

fn kind_of(name: &str) -> Result<FieldKind, CouplingError> {
    FieldKind::from_name(name).ok_or_else(|| CouplingError::UnrecognizedFieldName(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupling_error::ErrorKind;

    #[test]
    fn defaults_describe_flux_writer() {
        let cfg = CouplingConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.role().unwrap(), ParticipantRole::WritesHeatFlux);
        assert_eq!(cfg.mirrored().role().unwrap(), ParticipantRole::WritesTemperature);
    }

    #[test]
    fn json_overrides_defaults() {
        let cfg = CouplingConfig::from_json_str(
            r#"{ "participant": "Fluid", "read_field": "Heat-Flux",
                 "write_field": "Temperature", "parallel": true, "write_sign": "negated" }"#,
        )
        .unwrap();
        assert!(cfg.parallel);
        assert_eq!(cfg.mesh, "Fluid-Mesh");
        assert_eq!(cfg.write_sign, WriteSign::Negated);
        assert_eq!(cfg.role().unwrap(), ParticipantRole::WritesTemperature);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = CouplingConfig::from_json_str(r#"{ "precice_mesh": "x" }"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn same_quantity_both_ways_is_rejected() {
        let cfg = CouplingConfig {
            write_field: "Temperature".into(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(CouplingError::RoleConflict { .. })));
    }

    #[test]
    fn bad_dimension_is_rejected() {
        let cfg = CouplingConfig {
            dimension: 4,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(CouplingError::InvalidConfig(_))));
    }
}
