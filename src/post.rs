//! Post-processing: result artifacts bound to named viewports.

use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::errors::{CaseError, ConfigurationError};
use crate::geometry::Point;
use crate::registry::{EntityKind, Key, Named, Registry};
use crate::results::ResultDatabase;
use crate::services::ResultService;

/// What a viewport draws for its displayed object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotState {
    /// Undeformed shape.
    Undeformed,
    /// Deformed shape.
    Deformed,
    /// Contours plotted on the deformed shape.
    ContoursOnDeformed,
    /// Contours plotted on the undeformed shape.
    ContoursOnUndeformed,
}

impl PlotState {
    /// Whether the state draws the deformed shape.
    #[must_use]
    pub fn is_deformed(self) -> bool {
        matches!(self, PlotState::Deformed | PlotState::ContoursOnDeformed)
    }
}

/// Named visualization context.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    /// Registry key.
    name: String,
    /// Result shown in the viewport.
    displayed: Option<ResultDatabase>,
    /// Active plot states.
    plot_states: Vec<PlotState>,
    /// Factor applied to displacements when drawing deformed shapes.
    deformation_scale: f64,
}

impl Viewport {
    /// Empty viewport showing the undeformed shape at unit scale.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            displayed: None,
            plot_states: vec![PlotState::Undeformed],
            deformation_scale: 1.0,
        }
    }

    /// Result shown in the viewport.
    #[must_use]
    pub fn displayed_object(&self) -> Option<&ResultDatabase> {
        self.displayed.as_ref()
    }

    /// Active plot states.
    #[must_use]
    pub fn plot_states(&self) -> &[PlotState] {
        &self.plot_states
    }

    /// Deformation scale factor.
    #[must_use]
    pub fn deformation_scale(&self) -> f64 {
        self.deformation_scale
    }

    /// Show `result` in the viewport, replacing any previous object.
    pub fn set_displayed_object(&mut self, result: ResultDatabase) {
        debug!(viewport = self.name, job = result.job; "Displaying result");
        self.displayed = Some(result);
    }

    /// Select the plot states.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::NothingDisplayed`] when no object is shown.
    pub fn set_plot_state(&mut self, states: &[PlotState]) -> Result<(), CaseError> {
        self.require_object()?;
        self.plot_states = states.to_vec();
        Ok(())
    }

    /// Set the deformation scale factor.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::NonPositiveScaleFactor`] when `factor` is
    /// not strictly positive.
    pub fn set_deformation_scale(&mut self, factor: f64) -> Result<(), CaseError> {
        if !(factor > 0.0 && factor.is_finite()) {
            return Err(ConfigurationError::NonPositiveScaleFactor { factor }.into());
        }
        self.deformation_scale = factor;
        Ok(())
    }

    /// Node positions as drawn: displaced by the scaled displacement when a
    /// deformed plot state is active, undeformed otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::NothingDisplayed`] when no object is shown.
    pub fn drawn_positions(&self) -> Result<Vec<Point>, CaseError> {
        let result = self.require_object()?;
        let deformed = self.plot_states.iter().any(|state| state.is_deformed());
        let Some(frame) = result.last_frame() else {
            return Ok(Vec::new());
        };
        Ok(frame
            .nodes
            .iter()
            .map(|node| match (deformed, node.displacement) {
                (true, Some(u)) => Point::new(
                    node.position.x + self.deformation_scale * u.x,
                    node.position.y + self.deformation_scale * u.y,
                    node.position.z + self.deformation_scale * u.z,
                ),
                _ => node.position,
            })
            .collect())
    }

    fn require_object(&self) -> Result<&ResultDatabase, CaseError> {
        self.displayed.as_ref().ok_or_else(|| {
            ConfigurationError::NothingDisplayed {
                viewport: self.name.clone(),
            }
            .into()
        })
    }
}

impl Named for Viewport {
    const KIND: EntityKind = EntityKind::Viewport;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

/// Post-processing session holding the open viewports.
#[derive(Clone, Debug, Default)]
pub struct Session {
    /// Viewports in creation order.
    viewports: Registry<Viewport>,
}

impl Session {
    /// Create an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty viewport.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the name is empty or taken.
    pub fn create_viewport(&mut self, name: &str) -> Result<Key<Viewport>, CaseError> {
        self.viewports.insert(Viewport::new(name))
    }

    /// Viewport behind `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when the viewport does not exist.
    pub fn viewport(&self, key: &Key<Viewport>) -> Result<&Viewport, CaseError> {
        self.viewports.get(key)
    }

    /// Mutable viewport behind `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when the viewport does not exist.
    pub fn viewport_mut(&mut self, key: &Key<Viewport>) -> Result<&mut Viewport, CaseError> {
        self.viewports.get_mut(key)
    }

    /// Open the result artifact at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when the artifact does not exist.
    pub fn open_result(
        &self,
        results: &mut dyn ResultService,
        path: &Path,
    ) -> Result<ResultDatabase, CaseError> {
        let result = results.open(path)?;
        info!(path:? = path, job = result.job, frames = result.frames.len(); "Opened result artifact");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::{point, Displacement};
    use crate::results::{Frame, NodeResult};

    fn result() -> ResultDatabase {
        ResultDatabase {
            job: "CantileverBeamJob".to_owned(),
            model: "Cantilever Beam".to_owned(),
            frames: vec![Frame {
                step: "Apply Load".to_owned(),
                nodes: vec![NodeResult {
                    instance: "Beam Instance".to_owned(),
                    label: 1,
                    position: point(0.2, 0.0, 5.0),
                    displacement: Some(Displacement::new(0.0, -1.0e-3, 0.0)),
                    reaction: None,
                }],
            }],
        }
    }

    #[test]
    fn plot_state_requires_a_displayed_object() {
        let mut viewport = Viewport::new("Beam Results Viewport");
        assert_eq!(
            viewport.set_plot_state(&[PlotState::Deformed]),
            Err(ConfigurationError::NothingDisplayed {
                viewport: "Beam Results Viewport".to_owned()
            }
            .into())
        );
        viewport.set_displayed_object(result());
        viewport
            .set_plot_state(&[PlotState::Deformed])
            .expect("object displayed");
        assert_eq!(viewport.plot_states(), [PlotState::Deformed]);
    }

    #[test]
    fn deformed_positions_apply_the_scale_factor() {
        let mut viewport = Viewport::new("Beam Results Viewport");
        viewport.set_displayed_object(result());
        let undeformed = viewport.drawn_positions().expect("object displayed");
        assert_relative_eq!(undeformed[0].y, 0.0);

        viewport
            .set_plot_state(&[PlotState::Deformed])
            .expect("object displayed");
        viewport.set_deformation_scale(100.0).expect("positive scale");
        let deformed = viewport.drawn_positions().expect("object displayed");
        assert_relative_eq!(deformed[0].y, -0.1, epsilon = 1.0e-12);
        assert!(viewport.set_deformation_scale(0.0).is_err());
    }

    #[test]
    fn viewport_names_are_unique() {
        let mut session = Session::new();
        session
            .create_viewport("Beam Results Viewport")
            .expect("first viewport");
        assert!(session.create_viewport("Beam Results Viewport").is_err());
    }
}
