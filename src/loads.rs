//! Applied loads and kinematic boundary conditions.

use serde::Serialize;

use crate::assembly::Instance;
use crate::errors::ConfigurationError;
use crate::geometry::Force;
use crate::region::ResolvedRegion;
use crate::registry::{EntityKind, Key, Named};
use crate::steps::Step;

/// Physical action of a load.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadKind {
    /// Uniform pressure acting against the outward face normal, in pascals.
    Pressure {
        /// Pressure magnitude.
        magnitude: f64,
        /// Amplitude curve scaling the magnitude over the step; `None` ramps
        /// linearly.
        amplitude: Option<String>,
    },
    /// Force applied at the region, in newtons.
    ConcentratedForce {
        /// Force vector in assembly coordinates.
        force: Force,
    },
}

impl LoadKind {
    /// Check that every component is finite.
    pub(crate) fn validate(&self, name: &str) -> Result<(), ConfigurationError> {
        let values = match self {
            LoadKind::Pressure { magnitude, .. } => vec![*magnitude],
            LoadKind::ConcentratedForce { force } => vec![force.x, force.y, force.z],
        };
        finite(name, &values)
    }
}

/// Load active from its step onwards.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Load {
    /// Registry key.
    name: String,
    /// Step in which the load is created.
    step: Key<Step>,
    /// Instance the region belongs to.
    instance: Key<Instance>,
    /// Region the load acts on.
    region: ResolvedRegion,
    /// Physical action.
    kind: LoadKind,
}

impl Load {
    pub(crate) fn new(
        name: impl Into<String>,
        step: Key<Step>,
        instance: Key<Instance>,
        region: ResolvedRegion,
        kind: LoadKind,
    ) -> Self {
        Self {
            name: name.into(),
            step,
            instance,
            region,
            kind,
        }
    }

    /// Step in which the load is created.
    #[must_use]
    pub fn step(&self) -> &Key<Step> {
        &self.step
    }

    /// Instance the region belongs to.
    #[must_use]
    pub fn instance(&self) -> &Key<Instance> {
        &self.instance
    }

    /// Region the load acts on.
    #[must_use]
    pub fn region(&self) -> &ResolvedRegion {
        &self.region
    }

    /// Physical action.
    #[must_use]
    pub fn kind(&self) -> &LoadKind {
        &self.kind
    }
}

impl Named for Load {
    const KIND: EntityKind = EntityKind::Load;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

/// Prescribed translations and rotations. `None` leaves the component free.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PrescribedMotion {
    /// Translations along X, Y and Z in metres.
    pub u: [Option<f64>; 3],
    /// Rotations about X, Y and Z in radians.
    pub ur: [Option<f64>; 3],
}

impl PrescribedMotion {
    /// Components in solver order: translations then rotations.
    #[must_use]
    pub fn components(&self) -> [Option<f64>; 6] {
        [
            self.u[0], self.u[1], self.u[2], self.ur[0], self.ur[1], self.ur[2],
        ]
    }
}

/// Kinematic constraint applied to a region.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    /// All translations and rotations fixed.
    Encastre,
    /// Translations fixed, rotations free.
    Pinned,
    /// Selected components prescribed.
    Displacement(PrescribedMotion),
}

impl BoundaryKind {
    /// Prescribed value per degree of freedom in solver order; `None` is free.
    #[must_use]
    pub fn components(&self) -> [Option<f64>; 6] {
        match self {
            BoundaryKind::Encastre => [Some(0.0); 6],
            BoundaryKind::Pinned => [Some(0.0), Some(0.0), Some(0.0), None, None, None],
            BoundaryKind::Displacement(motion) => motion.components(),
        }
    }

    /// Check that every prescribed component is finite.
    pub(crate) fn validate(&self, name: &str) -> Result<(), ConfigurationError> {
        let values: Vec<f64> = self.components().into_iter().flatten().collect();
        finite(name, &values)
    }
}

/// Boundary condition active from its step onwards. Conditions created in
/// `Initial` hold from the start of the analysis.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoundaryCondition {
    /// Registry key.
    name: String,
    /// Step in which the condition is created.
    step: Key<Step>,
    /// Instance the region belongs to.
    instance: Key<Instance>,
    /// Constrained region.
    region: ResolvedRegion,
    /// Constraint.
    kind: BoundaryKind,
}

impl BoundaryCondition {
    pub(crate) fn new(
        name: impl Into<String>,
        step: Key<Step>,
        instance: Key<Instance>,
        region: ResolvedRegion,
        kind: BoundaryKind,
    ) -> Self {
        Self {
            name: name.into(),
            step,
            instance,
            region,
            kind,
        }
    }

    /// Step in which the condition is created.
    #[must_use]
    pub fn step(&self) -> &Key<Step> {
        &self.step
    }

    /// Instance the region belongs to.
    #[must_use]
    pub fn instance(&self) -> &Key<Instance> {
        &self.instance
    }

    /// Constrained region.
    #[must_use]
    pub fn region(&self) -> &ResolvedRegion {
        &self.region
    }

    /// Constraint.
    #[must_use]
    pub fn kind(&self) -> &BoundaryKind {
        &self.kind
    }
}

impl Named for BoundaryCondition {
    const KIND: EntityKind = EntityKind::BoundaryCondition;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

fn finite(name: &str, values: &[f64]) -> Result<(), ConfigurationError> {
    match values.iter().find(|value| !value.is_finite()) {
        Some(magnitude) => Err(ConfigurationError::NonFiniteMagnitude {
            name: name.to_owned(),
            magnitude: *magnitude,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_frees_rotations_only() {
        assert_eq!(
            BoundaryKind::Pinned.components(),
            [Some(0.0), Some(0.0), Some(0.0), None, None, None]
        );
        assert!(BoundaryKind::Encastre
            .components()
            .iter()
            .all(|c| *c == Some(0.0)));
    }

    #[test]
    fn prescribed_motion_lists_translations_before_rotations() {
        let motion = PrescribedMotion {
            u: [None, Some(-0.01), None],
            ur: [Some(0.5), None, None],
        };
        assert_eq!(
            BoundaryKind::Displacement(motion).components(),
            [None, Some(-0.01), None, Some(0.5), None, None]
        );
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let pressure = LoadKind::Pressure {
            magnitude: f64::INFINITY,
            amplitude: None,
        };
        assert!(matches!(
            pressure.validate("Uniform Applied Pressure"),
            Err(ConfigurationError::NonFiniteMagnitude { .. })
        ));
        let motion = BoundaryKind::Displacement(PrescribedMotion {
            u: [Some(f64::NAN), None, None],
            ur: [None; 3],
        });
        assert!(motion.validate("Settlement").is_err());
        assert!(BoundaryKind::Pinned.validate("Pin").is_ok());
    }
}
