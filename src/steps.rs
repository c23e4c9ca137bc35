//! Ordered analysis steps.
//!
//! Steps form a strict linear chain rooted at the implicit `Initial` step. The
//! chain is stored as a directed graph whose only edges run from each step to
//! its successor.

use log::debug;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::errors::{CaseError, ConfigurationError};
use crate::registry::{EntityKind, Key, Named};

/// Name of the implicit first step.
pub const INITIAL_STEP: &str = "Initial";

/// Analysis procedure run during a step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepProcedure {
    /// The implicit state before any analysis step.
    Initial,
    /// Linear or nonlinear static equilibrium.
    StaticGeneral {
        /// Free-form description.
        description: String,
    },
}

/// Named phase of an analysis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    /// Chain key.
    name: String,
    /// Procedure run during the step.
    procedure: StepProcedure,
}

impl Step {
    /// Procedure run during the step.
    #[must_use]
    pub fn procedure(&self) -> &StepProcedure {
        &self.procedure
    }
}

impl Named for Step {
    const KIND: EntityKind = EntityKind::Step;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

/// Linear chain of steps starting at `Initial`.
#[derive(Clone, Debug)]
pub struct StepChain {
    /// Steps as nodes, predecessor to successor as edges.
    graph: DiGraph<Step, ()>,
    /// Node of the `Initial` step.
    initial: NodeIndex,
}

impl Default for StepChain {
    fn default() -> Self {
        Self::new()
    }
}

impl StepChain {
    /// Create a chain holding only `Initial`.
    #[must_use]
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let initial = graph.add_node(Step {
            name: INITIAL_STEP.to_owned(),
            procedure: StepProcedure::Initial,
        });
        Self { graph, initial }
    }

    /// Place a new step immediately after `previous`.
    ///
    /// When `previous` already has a successor, the new step is spliced in
    /// between so the chain stays a simple path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::SelfReferentialStep`] when `name` equals
    /// `previous`, [`CaseError::NotFound`] when `previous` does not exist,
    /// [`ConfigurationError::CyclicStep`] when `name` already exists
    /// downstream-reachable to `previous`, and
    /// [`ConfigurationError::DuplicateName`] for any other redefinition.
    ///
    /// # Examples
    /// ```
    /// use fecase::{Named, StepChain, StepProcedure};
    ///
    /// let mut chain = StepChain::new();
    /// chain
    ///     .insert("Apply Load", "Initial", StepProcedure::StaticGeneral { description: String::new() })
    ///     .expect("step placed after Initial");
    /// let names: Vec<&str> = chain.ordered().iter().map(|s| s.name()).collect();
    /// assert_eq!(names, ["Initial", "Apply Load"]);
    /// ```
    pub fn insert(
        &mut self,
        name: &str,
        previous: &str,
        procedure: StepProcedure,
    ) -> Result<Key<Step>, CaseError> {
        if name.trim().is_empty() {
            return Err(ConfigurationError::EmptyName {
                kind: EntityKind::Step,
            }
            .into());
        }
        if name == previous {
            return Err(ConfigurationError::SelfReferentialStep {
                step: name.to_owned(),
            }
            .into());
        }
        let previous_node = self
            .node(previous)
            .ok_or_else(|| CaseError::not_found(EntityKind::Step, previous))?;
        if let Some(existing) = self.node(name) {
            if has_path_connecting(&self.graph, existing, previous_node, None) {
                return Err(ConfigurationError::CyclicStep {
                    step: name.to_owned(),
                    previous: previous.to_owned(),
                }
                .into());
            }
            return Err(ConfigurationError::DuplicateName {
                kind: EntityKind::Step,
                name: name.to_owned(),
            }
            .into());
        }

        let node = self.graph.add_node(Step {
            name: name.to_owned(),
            procedure,
        });
        if let Some(edge) = self
            .graph
            .first_edge(previous_node, Direction::Outgoing)
        {
            if let Some((_, successor)) = self.graph.edge_endpoints(edge) {
                self.graph.remove_edge(edge);
                self.graph.add_edge(node, successor, ());
                debug!(
                    step = name,
                    before = self.graph[successor].name;
                    "Inserted step ahead of existing successor"
                );
            }
        }
        self.graph.add_edge(previous_node, node, ());
        Ok(Key::new(name))
    }

    /// Resolve a step name, including `Initial`.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when `name` is not in the chain.
    pub fn lookup(&self, name: &str) -> Result<Key<Step>, CaseError> {
        self.node(name)
            .map(|_| Key::new(name))
            .ok_or_else(|| CaseError::not_found(EntityKind::Step, name))
    }

    /// Steps in chain order, starting with `Initial`.
    #[must_use]
    pub fn ordered(&self) -> Vec<&Step> {
        let mut steps = vec![&self.graph[self.initial]];
        let mut current = self.initial;
        while let Some(next) = self
            .graph
            .neighbors_directed(current, Direction::Outgoing)
            .next()
        {
            steps.push(&self.graph[next]);
            current = next;
        }
        steps
    }

    /// Zero-based position of `step` in the chain; `Initial` is 0.
    #[must_use]
    pub fn position(&self, step: &Key<Step>) -> Option<usize> {
        self.ordered().iter().position(|s| s.name == step.name())
    }

    /// Number of steps after `Initial`.
    #[must_use]
    pub fn analysis_step_count(&self) -> usize {
        self.graph.node_count() - 1
    }

    /// Node of the step called `name`.
    fn node(&self, name: &str) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&index| self.graph[index].name == name)
    }
}

#[cfg(test)]
mod tests {
    use petgraph::algo::is_cyclic_directed;

    use super::*;

    fn static_step() -> StepProcedure {
        StepProcedure::StaticGeneral {
            description: String::new(),
        }
    }

    fn names(chain: &StepChain) -> Vec<String> {
        chain.ordered().iter().map(|s| s.name().to_owned()).collect()
    }

    #[test]
    fn steps_follow_their_predecessors() {
        let mut chain = StepChain::new();
        chain.insert("Step-1", INITIAL_STEP, static_step()).expect("placed");
        chain.insert("Step-2", "Step-1", static_step()).expect("placed");
        assert_eq!(names(&chain), ["Initial", "Step-1", "Step-2"]);
        assert_eq!(chain.analysis_step_count(), 2);
        let step_2 = chain.lookup("Step-2").expect("registered");
        assert_eq!(chain.position(&step_2), Some(2));
    }

    #[test]
    fn insertion_after_a_step_with_a_successor_splices_the_chain() {
        let mut chain = StepChain::new();
        chain.insert("Step-1", INITIAL_STEP, static_step()).expect("placed");
        chain.insert("Preload", INITIAL_STEP, static_step()).expect("placed");
        assert_eq!(names(&chain), ["Initial", "Preload", "Step-1"]);
        assert!(!is_cyclic_directed(&chain.graph));
    }

    #[test]
    fn unknown_predecessor_is_not_found() {
        let mut chain = StepChain::new();
        assert_eq!(
            chain.insert("Step-1", "Missing", static_step()),
            Err(CaseError::not_found(EntityKind::Step, "Missing"))
        );
    }

    #[test]
    fn self_reference_and_cycles_are_configuration_errors() {
        let mut chain = StepChain::new();
        assert_eq!(
            chain.insert("Loop", "Loop", static_step()),
            Err(ConfigurationError::SelfReferentialStep {
                step: "Loop".to_owned()
            }
            .into())
        );

        chain.insert("Step-1", INITIAL_STEP, static_step()).expect("placed");
        chain.insert("Step-2", "Step-1", static_step()).expect("placed");
        assert_eq!(
            chain.insert("Step-1", "Step-2", static_step()),
            Err(ConfigurationError::CyclicStep {
                step: "Step-1".to_owned(),
                previous: "Step-2".to_owned()
            }
            .into())
        );
        assert_eq!(
            chain.insert(INITIAL_STEP, "Step-2", static_step()),
            Err(ConfigurationError::CyclicStep {
                step: INITIAL_STEP.to_owned(),
                previous: "Step-2".to_owned()
            }
            .into())
        );
        assert_eq!(names(&chain), ["Initial", "Step-1", "Step-2"]);
    }

    #[test]
    fn redefining_an_upstream_step_is_a_duplicate() {
        let mut chain = StepChain::new();
        chain.insert("Step-1", INITIAL_STEP, static_step()).expect("placed");
        chain.insert("Step-2", "Step-1", static_step()).expect("placed");
        assert_eq!(
            chain.insert("Step-2", INITIAL_STEP, static_step()),
            Err(ConfigurationError::DuplicateName {
                kind: EntityKind::Step,
                name: "Step-2".to_owned()
            }
            .into())
        );
    }
}
