//! Materials and the sections that bind them to structural behaviour.

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigurationError, MaterialPropertyError};
use crate::registry::{EntityKind, Key, Named};

/// Isotropic linear elastic constants.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Elastic {
    /// Young's modulus in pascals.
    pub youngs_modulus: f64,
    /// Poisson ratio.
    pub poisson_ratio: f64,
}

impl Elastic {
    /// Shear modulus derived from the elastic constants.
    #[must_use]
    pub fn shear_modulus(&self) -> f64 {
        self.youngs_modulus / (2.0 * (1.0 + self.poisson_ratio))
    }
}

/// Named material with density and elastic behaviour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Registry key.
    name: String,
    /// Mass density in kilograms per cubic metre.
    density: f64,
    /// Elastic behaviour.
    elastic: Elastic,
}

impl Material {
    /// Create a material after checking its constants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidMaterial`] when the density or
    /// Young's modulus is not strictly positive, or the Poisson ratio lies
    /// outside `(-1, 0.5)`.
    ///
    /// # Examples
    /// ```
    /// use fecase::Material;
    ///
    /// let steel = Material::new("AISI 1005 Steel", 7872.0, 200.0e9, 0.29).expect("valid steel");
    /// assert_eq!(steel.density(), 7872.0);
    /// assert!(Material::new("Rubber", 1100.0, 1.0e6, 0.5).is_err());
    /// ```
    pub fn new(
        name: impl Into<String>,
        density: f64,
        youngs_modulus: f64,
        poisson_ratio: f64,
    ) -> Result<Self, ConfigurationError> {
        let name = name.into();
        let rejected = if !(density > 0.0 && density.is_finite()) {
            Some(MaterialPropertyError::NonPositiveDensity { density })
        } else if !(youngs_modulus > 0.0 && youngs_modulus.is_finite()) {
            Some(MaterialPropertyError::NonPositiveYoungsModulus { youngs_modulus })
        } else if !(poisson_ratio > -1.0 && poisson_ratio < 0.5) {
            Some(MaterialPropertyError::PoissonRatioOutOfRange { poisson_ratio })
        } else {
            None
        };
        if let Some(source) = rejected {
            return Err(ConfigurationError::InvalidMaterial {
                material: name,
                source,
            });
        }
        Ok(Self {
            name,
            density,
            elastic: Elastic {
                youngs_modulus,
                poisson_ratio,
            },
        })
    }

    /// Mass density in kilograms per cubic metre.
    #[must_use]
    pub fn density(&self) -> f64 {
        self.density
    }

    /// Elastic constants.
    #[must_use]
    pub fn elastic(&self) -> Elastic {
        self.elastic
    }
}

impl Named for Material {
    const KIND: EntityKind = EntityKind::Material;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

/// Structural behaviour a section gives to its region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    /// Homogeneous solid continuum.
    HomogeneousSolid,
}

/// Named binding of a material to a structural behaviour.
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    /// Registry key.
    name: String,
    /// Material the section is made of.
    material: Key<Material>,
    /// Structural behaviour.
    kind: SectionKind,
}

impl Section {
    /// Create a homogeneous solid section of `material`.
    #[must_use]
    pub fn homogeneous_solid(name: impl Into<String>, material: Key<Material>) -> Self {
        Self {
            name: name.into(),
            material,
            kind: SectionKind::HomogeneousSolid,
        }
    }

    /// Material the section is made of.
    #[must_use]
    pub fn material(&self) -> &Key<Material> {
        &self.material
    }

    /// Structural behaviour.
    #[must_use]
    pub fn kind(&self) -> SectionKind {
        self.kind
    }
}

impl Named for Section {
    const KIND: EntityKind = EntityKind::Section;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(density: f64, youngs_modulus: f64, poisson_ratio: f64) -> MaterialPropertyError {
        match Material::new("m", density, youngs_modulus, poisson_ratio) {
            Err(ConfigurationError::InvalidMaterial { source, .. }) => source,
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn each_constant_is_checked() {
        assert_eq!(
            rejected(0.0, 200.0e9, 0.29),
            MaterialPropertyError::NonPositiveDensity { density: 0.0 }
        );
        assert_eq!(
            rejected(7872.0, -1.0, 0.29),
            MaterialPropertyError::NonPositiveYoungsModulus {
                youngs_modulus: -1.0
            }
        );
        assert_eq!(
            rejected(7872.0, 200.0e9, -1.0),
            MaterialPropertyError::PoissonRatioOutOfRange {
                poisson_ratio: -1.0
            }
        );
        assert!(matches!(
            rejected(f64::NAN, 200.0e9, 0.29),
            MaterialPropertyError::NonPositiveDensity { .. }
        ));
    }

    #[test]
    fn shear_modulus_follows_isotropic_relation() {
        let steel = Material::new("steel", 7872.0, 200.0e9, 0.25).expect("valid");
        assert!((steel.elastic().shear_modulus() - 80.0e9).abs() < 1.0);
    }
}
