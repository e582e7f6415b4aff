//! Pluggable handling of extension points.
//!
//! The engine attaches no meaning to an [`ExtensionDefinition`]. Instead it
//! asks every registered [`ExtensionBuilder`] whether it understands the
//! current binder and lets each one that does contribute output.

use std::fmt;

use crate::{
    binding::{Binder, Error, NodeKind, Origin, Scope, Session},
    domain::{DefinitionRef, ExtensionDefinition, NodePath},
};

/// Produces output for extension points.
pub trait ExtensionBuilder<B: Binder> {
    /// Whether this builder applies to binders of the given kind.
    fn is_compatible(&self, binder_kind: &str) -> bool;

    /// Builds output for one extension point.
    ///
    /// New nodes go beneath `scope.parent()`. The builder may recurse into
    /// the wrapped definitions through the session's `build_*` operations.
    ///
    /// # Errors
    ///
    /// Errors from nested build operations abort the whole run.
    fn build<'r>(
        &self,
        session: &mut Session<'_, 'r, B>,
        scope: &Scope<'_, 'r, B::Context>,
        extension: &'r ExtensionDefinition,
        path: &NodePath,
    ) -> Result<(), Error>;
}

/// The ordered set of builders an engine consults.
pub struct ExtensionRegistry<B: Binder> {
    builders: Vec<Box<dyn ExtensionBuilder<B>>>,
}

impl<B: Binder> ExtensionRegistry<B> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            builders: Vec::new(),
        }
    }

    /// Appends a builder. Builders are consulted in registration order.
    pub fn register(&mut self, builder: impl ExtensionBuilder<B> + 'static) {
        self.builders.push(Box::new(builder));
    }

    /// Builder-style variant of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, builder: impl ExtensionBuilder<B> + 'static) -> Self {
        self.register(builder);
        self
    }

    /// Iterates over the builders in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn ExtensionBuilder<B>> {
        self.builders.iter().map(|builder| &**builder)
    }

    /// The number of registered builders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.builders.len()
    }

    /// Whether no builder is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}

impl<B: Binder> Default for ExtensionRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Binder> fmt::Debug for ExtensionRegistry<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("builders", &self.builders.len())
            .finish()
    }
}

/// Appends a comment node holding the extension's representation.
#[derive(Debug, Clone, Default)]
pub struct CommentBuilder {
    kinds: Vec<String>,
}

impl CommentBuilder {
    /// A builder that applies to every binder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder restricted to the given binder kinds.
    #[must_use]
    pub fn for_kinds<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kinds: kinds.into_iter().map(Into::into).collect(),
        }
    }
}

impl<B: Binder> ExtensionBuilder<B> for CommentBuilder {
    fn is_compatible(&self, binder_kind: &str) -> bool {
        self.kinds.is_empty() || self.kinds.iter().any(|kind| kind == binder_kind)
    }

    fn build<'r>(
        &self,
        session: &mut Session<'_, 'r, B>,
        scope: &Scope<'_, 'r, B::Context>,
        extension: &'r ExtensionDefinition,
        _path: &NodePath,
    ) -> Result<(), Error> {
        let output = session.output_mut();
        let node = output.attach_child(scope.parent(), NodeKind::Comment, "comment");
        output.set_value(node, extension.representation());
        output.copy_attributes(node, extension.other_attributes());
        output.set_origin(
            node,
            Origin {
                form: scope.form(),
                definition: DefinitionRef::Extension(extension),
            },
        );
        Ok(())
    }
}

/// Builds the definitions an extension point wraps as if they were ordinary
/// children of the enclosing node.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineBuilder;

impl<B: Binder> ExtensionBuilder<B> for InlineBuilder {
    fn is_compatible(&self, _binder_kind: &str) -> bool {
        true
    }

    fn build<'r>(
        &self,
        session: &mut Session<'_, 'r, B>,
        scope: &Scope<'_, 'r, B::Context>,
        extension: &'r ExtensionDefinition,
        path: &NodePath,
    ) -> Result<(), Error> {
        if let Some(attribute) = extension.attribute() {
            session.build_attribute(scope, attribute, path)?;
        }
        if let Some(element) = extension.element() {
            session.build_element(scope, element, path)?;
        }
        if let Some(choice) = extension.choice() {
            session.build_choice(scope, choice, path)?;
        }
        if let Some(reference) = extension.reference() {
            session.build_reference(scope, reference, path)?;
        }
        if let Some(nested) = extension.extension() {
            session.build_extension(scope, nested, path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::{
        binding::{Engine, testing::{ScriptedBinder, ScriptedSource}},
        domain::{
            Cardinality, ElementDefinition, FormDefinition, FormKey, FormRegistry,
        },
    };

    /// Records every invocation under its own name.
    struct Recording {
        name: &'static str,
        kind: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl ExtensionBuilder<ScriptedBinder> for Recording {
        fn is_compatible(&self, binder_kind: &str) -> bool {
            self.kind == binder_kind
        }

        fn build<'r>(
            &self,
            _session: &mut Session<'_, 'r, ScriptedBinder>,
            _scope: &Scope<'_, 'r, String>,
            extension: &'r ExtensionDefinition,
            _path: &NodePath,
        ) -> Result<(), Error> {
            self.log
                .borrow_mut()
                .push(format!("{}:{}", self.name, extension.representation()));
            Ok(())
        }
    }

    fn registry() -> FormRegistry {
        let element = ElementDefinition::new("item", Cardinality::Required)
            .with_child(ExtensionDefinition::new("first"))
            .unwrap()
            .with_child(ExtensionDefinition::new("second"))
            .unwrap();
        let form = FormDefinition::new(FormKey::new("f"), "test")
            .with_child(element)
            .unwrap();
        FormRegistry::from_forms([form]).unwrap()
    }

    #[test]
    fn only_compatible_builders_run_once_each_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let extensions = ExtensionRegistry::new()
            .with(Recording {
                name: "a",
                kind: "scripted",
                log: Rc::clone(&log),
            })
            .with(Recording {
                name: "skipped",
                kind: "other",
                log: Rc::clone(&log),
            })
            .with(Recording {
                name: "b",
                kind: "scripted",
                log: Rc::clone(&log),
            });

        let registry = registry();
        let engine = Engine::new(&registry).with_extensions(extensions);
        let mut binder = ScriptedBinder::new().with_count("item", 1);
        engine.bind(&FormKey::new("f"), &ScriptedSource, &mut binder).unwrap();

        assert_eq!(
            *log.borrow(),
            vec!["a:first", "b:first", "a:second", "b:second"]
        );
    }

    #[test]
    fn no_compatible_builder_is_not_an_error() {
        let registry = registry();
        let engine = Engine::new(&registry)
            .with_extensions(ExtensionRegistry::new().with(CommentBuilder::for_kinds(["other"])));
        let mut binder = ScriptedBinder::new().with_count("item", 1);

        let output = engine.bind(&FormKey::new("f"), &ScriptedSource, &mut binder).unwrap();
        assert_eq!(output.len(), 2);
    }

    #[test]
    fn comment_builder_appends_to_the_enclosing_node() {
        let registry = registry();
        let engine = Engine::new(&registry)
            .with_extensions(ExtensionRegistry::new().with(CommentBuilder::new()));
        let mut binder = ScriptedBinder::new().with_count("item", 1);

        let output = engine.bind(&FormKey::new("f"), &ScriptedSource, &mut binder).unwrap();
        let item = output.children_named(output.root(), "item")[0];
        let comments: Vec<_> = output
            .children(item)
            .map(|node| (node.kind(), node.value()))
            .collect();
        assert_eq!(
            comments,
            vec![
                (NodeKind::Comment, Some("first")),
                (NodeKind::Comment, Some("second"))
            ]
        );
    }

    #[test]
    fn inline_builder_binds_wrapped_definitions() {
        let wrapper = ExtensionDefinition::new("inline")
            .with_child(ElementDefinition::new("wrapped", Cardinality::RequiredMultiple))
            .unwrap();
        let form = FormDefinition::new(FormKey::new("f"), "test")
            .with_child(
                ElementDefinition::new("item", Cardinality::Required)
                    .with_child(wrapper)
                    .unwrap(),
            )
            .unwrap();
        let registry = FormRegistry::from_forms([form]).unwrap();
        let engine =
            Engine::new(&registry).with_extensions(ExtensionRegistry::new().with(InlineBuilder));

        let mut binder = ScriptedBinder::new().with_count("item", 1).with_count("wrapped", 2);
        let output = engine.bind(&FormKey::new("f"), &ScriptedSource, &mut binder).unwrap();
        let item = output.children_named(output.root(), "item")[0];
        assert_eq!(output.children_named(item, "wrapped").len(), 2);

        let mut missing = ScriptedBinder::new().with_count("item", 1);
        let error = engine.bind(&FormKey::new("f"), &ScriptedSource, &mut missing).unwrap_err();
        assert_eq!(
            error.to_string(),
            "required element is not present, {test}form[@:f]/element[@item]"
        );
    }
}
