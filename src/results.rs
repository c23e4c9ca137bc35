//! Queryable contents of a result artifact.

use serde::{Deserialize, Serialize};

use crate::errors::CaseError;
use crate::geometry::{Displacement, Force, Point};
use crate::registry::EntityKind;

/// Nodal values of one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
    /// Instance the node belongs to.
    pub instance: String,
    /// Node label, unique per instance.
    pub label: usize,
    /// Undeformed position in assembly coordinates.
    pub position: Point,
    /// Translation, when `U` was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displacement: Option<Displacement>,
    /// Reaction force, when `RF` was requested and the node is constrained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reaction: Option<Force>,
}

/// State of the model at the end of a step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Step the frame closes.
    pub step: String,
    /// Nodal values.
    pub nodes: Vec<NodeResult>,
}

impl Frame {
    /// Node with the largest displacement magnitude.
    #[must_use]
    pub fn max_displacement(&self) -> Option<(&NodeResult, f64)> {
        self.nodes
            .iter()
            .filter_map(|node| node.displacement.map(|d| (node, d.magnitude())))
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Node of `instance` closest to `position`.
    #[must_use]
    pub fn nearest_node(&self, instance: &str, position: Point) -> Option<&NodeResult> {
        let target = position.to_point3();
        self.nodes
            .iter()
            .filter(|node| node.instance == instance)
            .min_by(|a, b| {
                let da = (a.position.to_point3() - target).norm();
                let db = (b.position.to_point3() - target).norm();
                da.total_cmp(&db)
            })
    }

    /// Sum of all reported reaction forces.
    #[must_use]
    pub fn total_reaction(&self) -> Force {
        self.nodes
            .iter()
            .filter_map(|node| node.reaction)
            .fold(Force::default(), |sum, r| {
                Force::new(sum.x + r.x, sum.y + r.y, sum.z + r.z)
            })
    }
}

/// Opened result artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultDatabase {
    /// Job that produced the artifact.
    pub job: String,
    /// Model the job was built from.
    pub model: String,
    /// One frame per analysis step, in chain order.
    pub frames: Vec<Frame>,
}

impl ResultDatabase {
    /// Frame of the last analysis step.
    #[must_use]
    pub fn last_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Frame closing `step`.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when the artifact has no frame for `step`.
    pub fn frame(&self, step: &str) -> Result<&Frame, CaseError> {
        self.frames
            .iter()
            .find(|frame| frame.step == step)
            .ok_or_else(|| CaseError::not_found(EntityKind::Step, step))
    }

    /// Largest displacement magnitude across the last frame.
    #[must_use]
    pub fn max_displacement(&self) -> Option<f64> {
        self.last_frame()?.max_displacement().map(|(_, value)| value)
    }

    /// Displacement of the node of `instance` closest to `position` in the
    /// last frame.
    #[must_use]
    pub fn displacement_near(&self, instance: &str, position: Point) -> Option<Displacement> {
        self.last_frame()?
            .nearest_node(instance, position)?
            .displacement
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::point;

    fn node(label: usize, z: f64, uy: f64, reaction: Option<Force>) -> NodeResult {
        NodeResult {
            instance: "Beam Instance".to_owned(),
            label,
            position: point(0.2, 0.0, z),
            displacement: Some(Displacement::new(0.0, uy, 0.0)),
            reaction,
        }
    }

    fn database() -> ResultDatabase {
        ResultDatabase {
            job: "CantileverBeamJob".to_owned(),
            model: "Cantilever Beam".to_owned(),
            frames: vec![Frame {
                step: "Apply Load".to_owned(),
                nodes: vec![
                    node(1, 0.0, 0.0, Some(Force::new(0.0, 10.0, 0.0))),
                    node(2, 2.5, -2.0e-6, None),
                    node(3, 5.0, -6.0e-6, None),
                ],
            }],
        }
    }

    #[test]
    fn queries_pick_the_expected_nodes() {
        let results = database();
        assert_relative_eq!(results.max_displacement().expect("frame"), 6.0e-6);
        let near_tip = results
            .displacement_near("Beam Instance", point(0.2, 0.1, 4.9))
            .expect("tip node");
        assert_relative_eq!(near_tip.y, -6.0e-6);
        assert!(results
            .displacement_near("Other Instance", point(0.0, 0.0, 0.0))
            .is_none());
        let frame = results.frame("Apply Load").expect("frame present");
        assert_relative_eq!(frame.total_reaction().y, 10.0);
    }

    #[test]
    fn missing_frames_are_not_found() {
        assert_eq!(
            database().frame("Unload"),
            Err(CaseError::not_found(EntityKind::Step, "Unload"))
        );
    }
}
