//! Coupling fields and participant roles.
//!
//! A [`CouplingField`] holds one scalar per interface vertex, aligned with the
//! registered handle list. Which physical quantity a participant writes and
//! which it reads is fixed by its [`ParticipantRole`].

use std::fmt;

use crate::topology::vertex::BoundaryVertex;

/// Physical meaning of a coupled scalar field.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FieldKind {
    Temperature,
    /// Wall-normal heat flux. Additive across partitions.
    HeatFlux,
}

impl FieldKind {
    /// Classify a middleware field name, ignoring case and `-`/`_`/space separators.
    ///
    /// ```
    /// use cht_coupling::data::field::FieldKind;
    /// assert_eq!(FieldKind::from_name("Heat-Flux"), Some(FieldKind::HeatFlux));
    /// assert_eq!(FieldKind::from_name("temperature"), Some(FieldKind::Temperature));
    /// assert_eq!(FieldKind::from_name("Displacement"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        let key: String = name
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "temperature" | "temp" | "walltemperature" => Some(FieldKind::Temperature),
            "heatflux" | "flux" | "normalheatflux" | "wallheatflux" => Some(FieldKind::HeatFlux),
            _ => None,
        }
    }

    /// Whether halo copies must write zero for this quantity.
    ///
    /// Flux is summed over partitions by the middleware; temperature is not.
    #[inline]
    pub fn zeroes_halo(self) -> bool {
        matches!(self, FieldKind::HeatFlux)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Temperature => f.write_str("temperature"),
            FieldKind::HeatFlux => f.write_str("heat flux"),
        }
    }
}

/// Direction of a field relative to this participant.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldRole {
    /// Produced here and written to the middleware.
    Write,
    /// Produced by the other participant and read here.
    Read,
}

/// Which quantity this participant writes and which it reads.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ParticipantRole {
    /// Dirichlet side: writes wall temperature, reads heat flux.
    WritesTemperature,
    /// Neumann side: writes heat flux, reads wall temperature.
    WritesHeatFlux,
}

impl ParticipantRole {
    /// Build the role from the kinds of the configured read and write fields.
    pub fn from_kinds(read: FieldKind, write: FieldKind) -> Option<Self> {
        match (read, write) {
            (FieldKind::HeatFlux, FieldKind::Temperature) => Some(Self::WritesTemperature),
            (FieldKind::Temperature, FieldKind::HeatFlux) => Some(Self::WritesHeatFlux),
            _ => None,
        }
    }

    pub fn write_kind(self) -> FieldKind {
        match self {
            Self::WritesTemperature => FieldKind::Temperature,
            Self::WritesHeatFlux => FieldKind::HeatFlux,
        }
    }

    pub fn read_kind(self) -> FieldKind {
        match self {
            Self::WritesTemperature => FieldKind::HeatFlux,
            Self::WritesHeatFlux => FieldKind::Temperature,
        }
    }

    /// The role of the other participant.
    pub fn mirrored(self) -> Self {
        match self {
            Self::WritesTemperature => Self::WritesHeatFlux,
            Self::WritesHeatFlux => Self::WritesTemperature,
        }
    }
}

/// Sign applied to locally measured values before they are written.
///
/// Participants must agree on the positive direction of the exchanged
/// quantity; this makes the convention explicit.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteSign {
    #[default]
    Positive,
    Negated,
}

impl WriteSign {
    #[inline]
    pub fn apply(self, value: f64) -> f64 {
        match self {
            WriteSign::Positive => value,
            WriteSign::Negated => -value,
        }
    }
}

/// One scalar per interface vertex, tagged with name, kind and role.
#[derive(Clone, Debug, PartialEq)]
pub struct CouplingField {
    name: String,
    kind: FieldKind,
    role: FieldRole,
    values: Vec<f64>,
}

impl CouplingField {
    /// Zero-filled field with `len` entries.
    pub fn new(name: impl Into<String>, kind: FieldKind, role: FieldRole, len: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            role,
            values: vec![0.0; len],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn role(&self) -> FieldRole {
        self.role
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Overwrite every entry from `value(vertex)`.
    ///
    /// `sign` is applied first; halo vertices of flux fields are then set to 0.
    pub fn overwrite_from<F>(&mut self, vertices: &[BoundaryVertex], sign: WriteSign, mut value: F)
    where
        F: FnMut(&BoundaryVertex) -> f64,
    {
        debug_assert_eq!(vertices.len(), self.values.len());
        let zero_halo = self.kind.zeroes_halo();
        for (slot, v) in self.values.iter_mut().zip(vertices) {
            *slot = if zero_halo && v.is_halo() {
                0.0
            } else {
                // `+ 0.0` folds a negated zero back to +0
                sign.apply(value(v)) + 0.0
            };
        }
    }

    /// Index of the first halo vertex carrying a non-zero flux, if any.
    pub fn first_halo_violation(&self, vertices: &[BoundaryVertex]) -> Option<usize> {
        if !self.kind.zeroes_halo() {
            return None;
        }
        self.values
            .iter()
            .zip(vertices)
            .position(|(val, v)| v.is_halo() && *val != 0.0)
    }
}

static_assertions::assert_impl_all!(CouplingField: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn vertices(halo: &[bool]) -> Vec<BoundaryVertex> {
        halo.iter()
            .enumerate()
            .map(|(i, &h)| BoundaryVertex::new(i, vec![i as f64, 0.0], h, 0))
            .collect()
    }

    #[test]
    fn roles_mirror_each_other() {
        let r = ParticipantRole::from_kinds(FieldKind::Temperature, FieldKind::HeatFlux).unwrap();
        assert_eq!(r, ParticipantRole::WritesHeatFlux);
        assert_eq!(r.mirrored(), ParticipantRole::WritesTemperature);
        assert_eq!(r.mirrored().write_kind(), r.read_kind());
        assert!(ParticipantRole::from_kinds(FieldKind::HeatFlux, FieldKind::HeatFlux).is_none());
    }

    #[test]
    fn flux_write_zeroes_halo_vertices() {
        let vs = vertices(&[false, false, true, true]);
        let mut f = CouplingField::new("Heat-Flux", FieldKind::HeatFlux, FieldRole::Write, 4);
        f.overwrite_from(&vs, WriteSign::Positive, |_| 12.5);
        assert_eq!(f.values(), &[12.5, 12.5, 0.0, 0.0]);
        assert_eq!(f.first_halo_violation(&vs), None);
    }

    #[test]
    fn temperature_write_keeps_halo_values() {
        let vs = vertices(&[false, true]);
        let mut f = CouplingField::new("Temperature", FieldKind::Temperature, FieldRole::Write, 2);
        f.overwrite_from(&vs, WriteSign::Positive, |_| 310.0);
        assert_eq!(f.values(), &[310.0, 310.0]);
    }

    #[test]
    fn negated_sign_applies_before_zeroing() {
        let vs = vertices(&[false, true]);
        let mut f = CouplingField::new("Heat-Flux", FieldKind::HeatFlux, FieldRole::Write, 2);
        f.overwrite_from(&vs, WriteSign::Negated, |_| 4.0);
        assert_eq!(f.values(), &[-4.0, 0.0]);
        assert!(f.values()[1].is_sign_positive());
    }

    proptest! {
        #[test]
        fn halo_flux_is_always_zero(
            halo in proptest::collection::vec(any::<bool>(), 0..40),
            value in -1.0e6f64..1.0e6,
            negate in any::<bool>(),
        ) {
            let vs = vertices(&halo);
            let sign = if negate { WriteSign::Negated } else { WriteSign::Positive };
            let mut f = CouplingField::new("Heat-Flux", FieldKind::HeatFlux, FieldRole::Write, vs.len());
            f.overwrite_from(&vs, sign, |v| value + v.index() as f64);
            prop_assert_eq!(f.len(), vs.len());
            for (val, v) in f.values().iter().zip(&vs) {
                if v.is_halo() {
                    prop_assert_eq!(*val, 0.0);
                }
            }
        }
    }
}
