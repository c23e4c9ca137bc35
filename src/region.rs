//! Region resolution by spatial probe point.
//!
//! A region is never named by host ID. The caller supplies a point that lies
//! on or inside the target entity, and the geometry service is asked which
//! entities contain it. Exactly one match is required; anything else is an
//! [`CaseError::AmbiguousRegion`] with no fallback.

use std::fmt;

use log::{debug, warn};
use nalgebra::Isometry3;
use serde::{Deserialize, Serialize};

use crate::errors::CaseError;
use crate::geometry::Point;
use crate::services::{BodyHandle, GeometryService};

/// Kind of geometric entity a probe point selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionTarget {
    /// Bounding face.
    Face,
    /// Volumetric cell.
    Cell,
}

impl fmt::Display for RegionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionTarget::Face => f.write_str("face"),
            RegionTarget::Cell => f.write_str("cell"),
        }
    }
}

/// Probe point plus the kind of entity it should select.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionSelector {
    /// Entity kind to search for.
    pub target: RegionTarget,
    /// Probe point in the caller's coordinates.
    pub probe: Point,
}

impl RegionSelector {
    /// Select the face containing `probe`.
    #[must_use]
    pub const fn face(probe: Point) -> Self {
        Self {
            target: RegionTarget::Face,
            probe,
        }
    }

    /// Select the cell containing `probe`.
    #[must_use]
    pub const fn cell(probe: Point) -> Self {
        Self {
            target: RegionTarget::Cell,
            probe,
        }
    }
}

/// Region after a successful probe.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRegion {
    /// Body the entity belongs to.
    pub body: BodyHandle,
    /// Kind of entity.
    pub target: RegionTarget,
    /// Host identifier of the face or cell.
    pub entity: usize,
    /// Probe point as supplied by the caller.
    pub probe: Point,
    /// Probe point in the body's coordinates.
    pub local_probe: Point,
}

/// Resolve `selector` against `body`.
///
/// `to_local` maps the caller's coordinates into the body's coordinates; use
/// the identity for part-level probes and the inverse placement for instance
/// probes.
///
/// # Errors
///
/// Returns [`CaseError::AmbiguousRegion`] when the probe matches zero or more
/// than one entity, and forwards any error from the geometry service.
pub fn resolve(
    geometry: &dyn GeometryService,
    body: BodyHandle,
    selector: &RegionSelector,
    to_local: &Isometry3<f64>,
) -> Result<ResolvedRegion, CaseError> {
    let local_probe = Point::from(to_local.transform_point(&selector.probe.to_point3()));
    let matches: Vec<usize> = match selector.target {
        RegionTarget::Face => geometry
            .faces_at(body, local_probe)?
            .into_iter()
            .map(|face| face.0)
            .collect(),
        RegionTarget::Cell => geometry
            .cells_at(body, local_probe)?
            .into_iter()
            .map(|cell| cell.0)
            .collect(),
    };

    match matches.as_slice() {
        [entity] => {
            debug!(
                probe:% = selector.probe,
                target:% = selector.target,
                entity = *entity;
                "Resolved region"
            );
            Ok(ResolvedRegion {
                body,
                target: selector.target,
                entity: *entity,
                probe: selector.probe,
                local_probe,
            })
        }
        _ => {
            warn!(
                probe:% = selector.probe,
                target:% = selector.target,
                matches = matches.len();
                "Probe point does not select exactly one entity"
            );
            Err(CaseError::AmbiguousRegion {
                probe: selector.probe,
                target: selector.target,
                matches: matches.len(),
            })
        }
    }
}
