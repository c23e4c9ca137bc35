//! Field and history output requests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{CaseError, ConfigurationError};
use crate::registry::{EntityKind, Key, Named};
use crate::steps::Step;

/// Name of the field output request created with the first analysis step.
pub const DEFAULT_FIELD_OUTPUT: &str = "F-Output-1";

/// Name of the history output request created with the first analysis step.
pub const DEFAULT_HISTORY_OUTPUT: &str = "H-Output-1";

/// Result quantity the solver can be asked to write.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OutputVariable {
    /// Stress components.
    S,
    /// Total strain components.
    E,
    /// Plastic strain components.
    PE,
    /// Equivalent plastic strain.
    PEEQ,
    /// Plastic strain magnitude.
    PEMAG,
    /// Logarithmic strain components.
    LE,
    /// Translations and rotations.
    U,
    /// Velocities.
    V,
    /// Accelerations.
    A,
    /// Reaction forces and moments.
    RF,
    /// Concentrated forces and moments.
    CF,
    /// Contact stresses.
    CSTRESS,
    /// Contact displacements.
    CDISP,
}

impl OutputVariable {
    /// Variables written by a freshly created field output request.
    pub const FIELD_DEFAULTS: [OutputVariable; 10] = [
        OutputVariable::S,
        OutputVariable::PE,
        OutputVariable::PEEQ,
        OutputVariable::PEMAG,
        OutputVariable::LE,
        OutputVariable::U,
        OutputVariable::RF,
        OutputVariable::CF,
        OutputVariable::CSTRESS,
        OutputVariable::CDISP,
    ];
}

impl fmt::Display for OutputVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Error returned when a string does not name an [`OutputVariable`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown output variable `{0}`")]
pub struct UnknownOutputVariable(pub String);

impl FromStr for OutputVariable {
    type Err = UnknownOutputVariable;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let variable = match s.trim().to_ascii_uppercase().as_str() {
            "S" => OutputVariable::S,
            "E" => OutputVariable::E,
            "PE" => OutputVariable::PE,
            "PEEQ" => OutputVariable::PEEQ,
            "PEMAG" => OutputVariable::PEMAG,
            "LE" => OutputVariable::LE,
            "U" => OutputVariable::U,
            "V" => OutputVariable::V,
            "A" => OutputVariable::A,
            "RF" => OutputVariable::RF,
            "CF" => OutputVariable::CF,
            "CSTRESS" => OutputVariable::CSTRESS,
            "CDISP" => OutputVariable::CDISP,
            _ => return Err(UnknownOutputVariable(s.to_owned())),
        };
        Ok(variable)
    }
}

/// Field output request: whole-model snapshots written at each increment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldOutputRequest {
    /// Registry key.
    name: String,
    /// Step the request becomes active in.
    create_step: String,
    /// Variables written.
    variables: Vec<OutputVariable>,
}

impl FieldOutputRequest {
    /// Create a request active from `create_step`.
    pub(crate) fn new(
        name: impl Into<String>,
        create_step: &Key<Step>,
        variables: Vec<OutputVariable>,
    ) -> Self {
        Self {
            name: name.into(),
            create_step: create_step.name().to_owned(),
            variables,
        }
    }

    /// Step the request becomes active in.
    #[must_use]
    pub fn create_step(&self) -> &str {
        &self.create_step
    }

    /// Variables written.
    #[must_use]
    pub fn variables(&self) -> &[OutputVariable] {
        &self.variables
    }

    /// Whether `variable` is written.
    #[must_use]
    pub fn writes(&self, variable: OutputVariable) -> bool {
        self.variables.contains(&variable)
    }

    /// Replace the variable list. Duplicates are dropped, order is kept.
    pub(crate) fn set_variables(&mut self, variables: &[OutputVariable]) {
        self.variables.clear();
        for variable in variables {
            if !self.variables.contains(variable) {
                self.variables.push(*variable);
            }
        }
    }
}

impl Named for FieldOutputRequest {
    const KIND: EntityKind = EntityKind::FieldOutput;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

/// Variable selection of a history output request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryVariables {
    /// The solver's preselected set for the step procedure.
    Preselect,
    /// An explicit list.
    Variables(Vec<OutputVariable>),
}

/// History output request: time series of selected quantities.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryOutputRequest {
    /// Registry key.
    name: String,
    /// Step the request becomes active in.
    create_step: String,
    /// Variables written.
    variables: HistoryVariables,
}

impl HistoryOutputRequest {
    /// Create a request active from `create_step`.
    pub(crate) fn new(
        name: impl Into<String>,
        create_step: &Key<Step>,
        variables: HistoryVariables,
    ) -> Self {
        Self {
            name: name.into(),
            create_step: create_step.name().to_owned(),
            variables,
        }
    }

    /// Step the request becomes active in.
    #[must_use]
    pub fn create_step(&self) -> &str {
        &self.create_step
    }

    /// Variables written.
    #[must_use]
    pub fn variables(&self) -> &HistoryVariables {
        &self.variables
    }
}

impl Named for HistoryOutputRequest {
    const KIND: EntityKind = EntityKind::HistoryOutput;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

/// Parse a list of variable names, rejecting the first unknown one.
///
/// # Errors
///
/// Returns [`ConfigurationError::Parse`] naming the unknown variable.
pub fn parse_variables<S: AsRef<str>>(names: &[S]) -> Result<Vec<OutputVariable>, CaseError> {
    names
        .iter()
        .map(|name| {
            name.as_ref()
                .parse::<OutputVariable>()
                .map_err(|error| CaseError::from(ConfigurationError::Parse(error.to_string())))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::{StepChain, INITIAL_STEP};

    #[test]
    fn variables_parse_case_insensitively() {
        assert_eq!("pemag".parse::<OutputVariable>(), Ok(OutputVariable::PEMAG));
        assert_eq!(
            "XYZ".parse::<OutputVariable>(),
            Err(UnknownOutputVariable("XYZ".to_owned()))
        );
        let parsed = parse_variables(&["S", "E", "U"]).expect("known variables");
        assert_eq!(
            parsed,
            [OutputVariable::S, OutputVariable::E, OutputVariable::U]
        );
    }

    #[test]
    fn set_variables_drops_duplicates() {
        let chain = StepChain::new();
        let initial = chain.lookup(INITIAL_STEP).expect("initial present");
        let mut request = FieldOutputRequest::new(
            DEFAULT_FIELD_OUTPUT,
            &initial,
            OutputVariable::FIELD_DEFAULTS.to_vec(),
        );
        request.set_variables(&[OutputVariable::U, OutputVariable::RF, OutputVariable::U]);
        assert_eq!(request.variables(), [OutputVariable::U, OutputVariable::RF]);
        assert!(request.writes(OutputVariable::RF));
        assert!(!request.writes(OutputVariable::S));
    }
}
