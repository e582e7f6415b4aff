//! Lookup table of root forms.
//!
//! The [`FormRegistry`] is populated once and then passed by reference into
//! every binding run. It never changes while a run reads it.

use std::collections::BTreeMap;

use petgraph::{algo::tarjan_scc, graphmap::DiGraphMap};
use thiserror::Error;
use tracing::instrument;

use crate::domain::{FormDefinition, FormKey};

/// Errors raised while populating a [`FormRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A form with the same key has already been registered.
    #[error("form {key} is defined in both {existing} and {duplicate}")]
    Duplicate {
        /// The clashing key.
        key: FormKey,
        /// Source label of the form already registered.
        existing: String,
        /// Source label of the rejected form.
        duplicate: String,
    },
}

/// A form reference whose target is not registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    /// The form containing the reference.
    pub form: FormKey,
    /// The missing target.
    pub target: FormKey,
}

/// Root forms keyed by `(group, id)`.
#[derive(Debug, Clone, Default)]
pub struct FormRegistry {
    forms: BTreeMap<FormKey, FormDefinition>,
}

impl FormRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a sequence of forms.
    ///
    /// # Errors
    ///
    /// Fails on the first duplicate key.
    pub fn from_forms(
        forms: impl IntoIterator<Item = FormDefinition>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for form in forms {
            registry.insert(form)?;
        }
        Ok(registry)
    }

    /// Registers a form.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] if the key is already taken; the
    /// registry is left unchanged.
    pub fn insert(&mut self, form: FormDefinition) -> Result<(), RegistryError> {
        if let Some(existing) = self.forms.get(form.key()) {
            return Err(RegistryError::Duplicate {
                key: form.key().clone(),
                existing: existing.source().to_string(),
                duplicate: form.source().to_string(),
            });
        }
        tracing::trace!("registered form {} from {}", form.key(), form.source());
        self.forms.insert(form.key().clone(), form);
        Ok(())
    }

    /// Looks up a form by key.
    #[must_use]
    pub fn get(&self, key: &FormKey) -> Option<&FormDefinition> {
        self.forms.get(key)
    }

    /// Looks up a form by id and optional group.
    #[must_use]
    pub fn find(&self, id: &str, group: Option<&str>) -> Option<&FormDefinition> {
        self.get(&FormKey::with_group(group, id))
    }

    /// Iterates over the forms in key order.
    pub fn iter(&self) -> impl Iterator<Item = &FormDefinition> {
        self.forms.values()
    }

    /// The number of registered forms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.forms.len()
    }

    /// Whether no form is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    /// Every form reference whose target is missing, in key order.
    #[must_use]
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let mut dangling = Vec::new();
        for form in self.forms.values() {
            for reference in form.references() {
                if !self.forms.contains_key(reference.target()) {
                    dangling.push(DanglingReference {
                        form: form.key().clone(),
                        target: reference.target().clone(),
                    });
                }
            }
        }
        dangling
    }

    /// Return all reference cycles between forms as sorted sets of keys.
    ///
    /// A cycle recurses while every step on it yields instances. A reference
    /// placed directly beneath a form recurses whatever the data holds, so
    /// binding it always ends at the reference depth limit.
    #[must_use]
    #[instrument(level = "debug", skip(self))]
    pub fn reference_cycles(&self) -> Vec<Vec<FormKey>> {
        let keys: Vec<&FormKey> = self.forms.keys().collect();
        let index: BTreeMap<&FormKey, usize> =
            keys.iter().enumerate().map(|(i, key)| (*key, i)).collect();

        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::with_capacity(keys.len(), keys.len());
        for (i, form) in self.forms.values().enumerate() {
            graph.add_node(i);
            for reference in form.references() {
                if let Some(&target) = index.get(reference.target()) {
                    graph.add_edge(i, target, ());
                }
            }
        }

        let mut cycles = Vec::new();
        for component in tarjan_scc(&graph) {
            if component.len() > 1 {
                let mut members: Vec<_> = component.iter().map(|&i| keys[i].clone()).collect();
                members.sort();
                cycles.push(members);
                continue;
            }

            let Some(&node) = component.first() else {
                continue;
            };

            if graph.contains_edge(node, node) {
                cycles.push(vec![keys[node].clone()]);
            }
        }

        cycles.sort();
        cycles
    }
}
