//! Typed, name-keyed registries.
//!
//! Every cross-reference inside a case (section to material, load to step,
//! instance to part) goes through a [`Key`]. Keys can only be obtained from a
//! registry, either when an entry is inserted or through a validated lookup, so
//! a misspelt name fails at the call that introduces it instead of when the
//! host later consumes the definition.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::errors::{CaseError, ConfigurationError};

/// Kind of entity held by a registry, used in error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Top-level model.
    Model,
    /// Solid part.
    Part,
    /// Material.
    Material,
    /// Section.
    Section,
    /// Assembly instance.
    Instance,
    /// Analysis step.
    Step,
    /// Field output request.
    FieldOutput,
    /// History output request.
    HistoryOutput,
    /// Load.
    Load,
    /// Boundary condition.
    BoundaryCondition,
    /// Solver job.
    Job,
    /// Result artifact produced by a job.
    ResultArtifact,
    /// Visualization context.
    Viewport,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Model => "model",
            EntityKind::Part => "part",
            EntityKind::Material => "material",
            EntityKind::Section => "section",
            EntityKind::Instance => "instance",
            EntityKind::Step => "step",
            EntityKind::FieldOutput => "field output request",
            EntityKind::HistoryOutput => "history output request",
            EntityKind::Load => "load",
            EntityKind::BoundaryCondition => "boundary condition",
            EntityKind::Job => "job",
            EntityKind::ResultArtifact => "result artifact",
            EntityKind::Viewport => "viewport",
        };
        f.write_str(label)
    }
}

/// Entry that can live in a [`Registry`].
pub trait Named {
    /// Registry kind used in error messages.
    const KIND: EntityKind;

    /// Registry key of the entry.
    fn name(&self) -> &str;

    /// Change the registry key of the entry.
    fn set_name(&mut self, name: String);
}

/// Validated reference to an entry of type `T`.
///
/// # Examples
///
/// ```
/// use fecase::CaseDefinition;
///
/// let mut case = CaseDefinition::new("Cantilever Beam");
/// let steel = case
///     .define_material("AISI 1005 Steel", 7872.0, 200.0e9, 0.29)
///     .expect("valid material");
/// assert_eq!(steel.name(), "AISI 1005 Steel");
/// ```
pub struct Key<T> {
    /// Name the key was resolved from.
    name: String,
    /// Ties the key to its registry type.
    kind: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    /// Keys are minted only by registries and the step chain.
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PhantomData,
        }
    }

    /// Name the key refers to.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        Self::new(self.name.clone())
    }
}

impl<T> PartialEq for Key<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<T> Eq for Key<T> {}

impl<T> PartialOrd for Key<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Key<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl<T> Hash for Key<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Key").field(&self.name).finish()
    }
}

impl<T> fmt::Display for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl<T> Serialize for Key<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

/// Ordered collection of named entries.
#[derive(Clone, Debug)]
pub struct Registry<T> {
    /// Entries in definition order.
    entries: IndexMap<String, T>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<T: Named> Registry<T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Register `entry` under its own name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::EmptyName`] for an empty name and
    /// [`ConfigurationError::DuplicateName`] when the name is taken.
    pub fn insert(&mut self, entry: T) -> Result<Key<T>, CaseError> {
        let name = entry.name().to_owned();
        Self::check_name(&name)?;
        if self.entries.contains_key(&name) {
            return Err(ConfigurationError::DuplicateName {
                kind: T::KIND,
                name,
            }
            .into());
        }
        self.entries.insert(name.clone(), entry);
        Ok(Key::new(name))
    }

    /// Resolve `name` into a key.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when `name` is not registered.
    pub fn lookup(&self, name: &str) -> Result<Key<T>, CaseError> {
        if self.entries.contains_key(name) {
            Ok(Key::new(name))
        } else {
            Err(CaseError::not_found(T::KIND, name))
        }
    }

    /// Entry behind `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when the entry was removed or renamed
    /// after the key was issued.
    pub fn get(&self, key: &Key<T>) -> Result<&T, CaseError> {
        self.entries
            .get(key.name())
            .ok_or_else(|| CaseError::not_found(T::KIND, key.name()))
    }

    /// Mutable entry behind `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when the entry no longer exists.
    pub fn get_mut(&mut self, key: &Key<T>) -> Result<&mut T, CaseError> {
        self.entries
            .get_mut(key.name())
            .ok_or_else(|| CaseError::not_found(T::KIND, key.name()))
    }

    /// Rename an entry, keeping its position.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when `from` is not registered and a
    /// configuration error when `to` is empty or already taken.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<Key<T>, CaseError> {
        let index = self
            .entries
            .get_index_of(from)
            .ok_or_else(|| CaseError::not_found(T::KIND, from))?;
        Self::check_name(to)?;
        if from != to && self.entries.contains_key(to) {
            return Err(ConfigurationError::DuplicateName {
                kind: T::KIND,
                name: to.to_owned(),
            }
            .into());
        }
        let (_, mut entry) = self
            .entries
            .shift_remove_index(index)
            .ok_or_else(|| CaseError::not_found(T::KIND, from))?;
        entry.set_name(to.to_owned());
        self.entries.shift_insert(index, to.to_owned(), entry);
        Ok(Key::new(to))
    }

    /// Remove and return an entry.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when `name` is not registered.
    pub fn remove(&mut self, name: &str) -> Result<T, CaseError> {
        self.entries
            .shift_remove(name)
            .ok_or_else(|| CaseError::not_found(T::KIND, name))
    }

    /// Iterate over entries in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    /// Iterate mutably over entries in definition order. Names must not change.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.values_mut()
    }

    /// Reject empty names.
    fn check_name(name: &str) -> Result<(), CaseError> {
        if name.trim().is_empty() {
            return Err(ConfigurationError::EmptyName { kind: T::KIND }.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Widget {
        name: String,
        size: u32,
    }

    impl Widget {
        fn new(name: &str, size: u32) -> Self {
            Self {
                name: name.to_owned(),
                size,
            }
        }
    }

    impl Named for Widget {
        const KIND: EntityKind = EntityKind::Material;

        fn name(&self) -> &str {
            &self.name
        }

        fn set_name(&mut self, name: String) {
            self.name = name;
        }
    }

    #[test]
    fn insert_then_lookup_returns_equal_keys() {
        let mut registry = Registry::new();
        let inserted = registry.insert(Widget::new("a", 1)).expect("insert");
        let looked_up = registry.lookup("a").expect("lookup");
        assert_eq!(inserted, looked_up);
        assert_eq!(registry.get(&looked_up).expect("entry").size, 1);
    }

    #[test]
    fn duplicate_and_empty_names_are_rejected() {
        let mut registry = Registry::new();
        registry.insert(Widget::new("a", 1)).expect("insert");
        assert_eq!(
            registry.insert(Widget::new("a", 2)),
            Err(ConfigurationError::DuplicateName {
                kind: EntityKind::Material,
                name: "a".to_owned()
            }
            .into())
        );
        assert_eq!(
            registry.insert(Widget::new("  ", 2)),
            Err(ConfigurationError::EmptyName {
                kind: EntityKind::Material
            }
            .into())
        );
    }

    #[test]
    fn rename_keeps_definition_order_and_invalidates_old_keys() {
        let mut registry = Registry::new();
        let old = registry.insert(Widget::new("a", 1)).expect("insert");
        registry.insert(Widget::new("b", 2)).expect("insert");

        let renamed = registry.rename("a", "c").expect("rename");
        let names: Vec<&str> = registry.iter().map(Named::name).collect();
        assert_eq!(names, ["c", "b"]);
        assert_eq!(renamed.name(), "c");
        assert_eq!(
            registry.get(&old),
            Err(CaseError::not_found(EntityKind::Material, "a"))
        );
    }

    #[test]
    fn missing_names_are_not_found() {
        let mut registry: Registry<Widget> = Registry::new();
        assert_eq!(
            registry.lookup("ghost"),
            Err(CaseError::not_found(EntityKind::Material, "ghost"))
        );
        assert_eq!(
            registry.remove("ghost"),
            Err(CaseError::not_found(EntityKind::Material, "ghost"))
        );
    }
}
