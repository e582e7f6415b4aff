//! A binder driven by fixed instance counts, for tests.

use std::collections::{HashMap, HashSet};

use crate::{
    binding::{Binder, BindingSource, OutputTree, Scope},
    domain::{AttributeDefinition, ElementDefinition, FormDefinition},
};

/// A source with nothing in it; the [`ScriptedBinder`] holds the script.
pub struct ScriptedSource;

impl BindingSource for ScriptedSource {
    fn representation(&self) -> Option<String> {
        Some("scripted".to_string())
    }
}

/// Answers every element lookup with a configured count.
///
/// Contexts are strings of the form `lookup#index`. Elements without a
/// configured count have no instances.
#[derive(Debug, Default)]
pub struct ScriptedBinder {
    counts: HashMap<String, usize>,
    attributes: HashSet<String>,
    absent_forms: HashSet<String>,
    forms_bound: Vec<String>,
    elements_bound: Vec<String>,
    pre_bound: bool,
    post_bound: bool,
}

impl ScriptedBinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_count(mut self, lookup: &str, count: usize) -> Self {
        self.counts.insert(lookup.to_string(), count);
        self
    }

    pub fn with_attribute(mut self, lookup: &str) -> Self {
        self.attributes.insert(lookup.to_string());
        self
    }

    pub fn without_form(mut self, id: &str) -> Self {
        self.absent_forms.insert(id.to_string());
        self
    }

    pub fn forms_bound(&self) -> Vec<&str> {
        self.forms_bound.iter().map(String::as_str).collect()
    }

    pub fn elements_bound(&self) -> Vec<&str> {
        self.elements_bound.iter().map(String::as_str).collect()
    }

    pub const fn was_pre_bound(&self) -> bool {
        self.pre_bound
    }

    pub const fn was_post_bound(&self) -> bool {
        self.post_bound
    }
}

impl Binder for ScriptedBinder {
    type Source = ScriptedSource;
    type Context = String;

    fn kind(&self) -> &str {
        "scripted"
    }

    fn pre_bind(&mut self, _source: &ScriptedSource, _form: &FormDefinition) {
        self.pre_bound = true;
    }

    fn bind_form(
        &mut self,
        _source: &ScriptedSource,
        _enclosing: Option<&Scope<'_, '_, String>>,
        form: &FormDefinition,
    ) -> Option<String> {
        let id = form.key().id();
        self.forms_bound.push(id.to_string());
        (!self.absent_forms.contains(id)).then(|| id.to_string())
    }

    fn bind_element(
        &mut self,
        _source: &ScriptedSource,
        _scope: &Scope<'_, '_, String>,
        element: &ElementDefinition,
    ) -> Vec<String> {
        let lookup = element.lookup_key().unwrap_or_default();
        self.elements_bound.push(lookup.to_string());
        let count = self.counts.get(lookup).copied().unwrap_or_default();
        (0..count).map(|i| format!("{lookup}#{i}")).collect()
    }

    fn bind_attribute(
        &mut self,
        _source: &ScriptedSource,
        _scope: &Scope<'_, '_, String>,
        attribute: &AttributeDefinition,
    ) -> Option<String> {
        let lookup = attribute.lookup_key().unwrap_or_default();
        self.attributes
            .contains(lookup)
            .then(|| format!("{lookup}#0"))
    }

    fn post_bind(&mut self, _source: &ScriptedSource, _form: &FormDefinition, _output: &OutputTree<'_>) {
        self.post_bound = true;
    }

    fn value(&self, context: &String) -> Option<String> {
        Some(context.clone())
    }
}
