use tracing::instrument;

use crate::{
    binding::{
        Binder, BindingError, BindingSource, Error, ExtensionRegistry, NodeId, NodeKind, Origin, OutputTree,
        Scope,
    },
    domain::{
        AttributeDefinition, Cardinality, ChoiceDefinition, Children, Config, Definition,
        DefinitionKind, DefinitionRef, ElementDefinition, ExtensionDefinition, FormKey,
        FormReferenceDefinition, FormRegistry, NodePath,
    },
};

/// Binds root forms from a registry against binding sources.
///
/// An engine is cheap to build and holds no per-run state; every call to
/// [`bind`](Self::bind) starts from scratch.
pub struct Engine<'r, B: Binder> {
    registry: &'r FormRegistry,
    extensions: ExtensionRegistry<B>,
    max_reference_depth: usize,
}

impl<'r, B: Binder> Engine<'r, B> {
    /// Creates an engine with no extension builders and the default
    /// configuration.
    #[must_use]
    pub fn new(registry: &'r FormRegistry) -> Self {
        Self {
            registry,
            extensions: ExtensionRegistry::new(),
            max_reference_depth: Config::default().max_reference_depth(),
        }
    }

    /// Replaces the extension builders.
    #[must_use]
    pub fn with_extensions(mut self, extensions: ExtensionRegistry<B>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Applies the binding settings of a configuration.
    #[must_use]
    pub fn with_config(mut self, config: &Config) -> Self {
        self.max_reference_depth = config.max_reference_depth();
        self
    }

    /// The registry forms are looked up in.
    #[must_use]
    pub const fn registry(&self) -> &'r FormRegistry {
        self.registry
    }

    /// The extension builders.
    #[must_use]
    pub const fn extensions(&self) -> &ExtensionRegistry<B> {
        &self.extensions
    }

    /// Binds the root form `key` against `source`.
    ///
    /// # Errors
    ///
    /// Fails when the form is not registered, when the source has no
    /// representation or the binder reports the root form as absent, or on
    /// the first cardinality, choice or reference
    /// error found while descending. Nothing is returned for a failed run.
    #[instrument(level = "debug", skip_all, fields(form = %key))]
    pub fn bind(
        &self,
        key: &FormKey,
        source: &B::Source,
        binder: &mut B,
    ) -> Result<OutputTree<'r>, Error> {
        let registry = self.registry;
        let form = registry.get(key).ok_or_else(|| Error::DefinitionNotFound {
            key: key.clone(),
            path: NodePath::root(),
        })?;

        binder.pre_bind(source, form);

        let path = NodePath::single(form.label());
        // A source without a representation has nothing to bind.
        let context = source
            .representation()
            .and_then(|_| binder.bind_form(source, None, form));
        let Some(context) = context else {
            return Err(BindingError::new("form is not present", path)
                .with_definition(form.label())
                .into());
        };

        let mut output = OutputTree::new(NodeKind::Form, form.key().id());
        let root = output.root();
        output.set_origin(
            root,
            Origin {
                form,
                definition: DefinitionRef::Form(form),
            },
        );
        output.copy_attributes(root, form.other_attributes());

        let mut session = Session {
            engine: self,
            binder,
            source,
            output,
            reference_depth: 0,
        };
        session.build_children(&Scope::new(form, &context, root), form.children(), &path)?;

        let Session { binder, output, .. } = session;
        binder.post_bind(source, form, &output);
        tracing::debug!("bound {} into {} nodes", form.label(), output.len());
        Ok(output)
    }

    /// Binds the root form with the given id and optional group.
    ///
    /// # Errors
    ///
    /// See [`bind`](Self::bind).
    pub fn bind_form_id(
        &self,
        id: &str,
        group: Option<&str>,
        source: &B::Source,
        binder: &mut B,
    ) -> Result<OutputTree<'r>, Error> {
        self.bind(&FormKey::with_group(group, id), source, binder)
    }
}

/// The state of one binding run.
///
/// Extension builders receive the session so they can append output and
/// recurse into wrapped definitions with the same rules the engine applies.
pub struct Session<'s, 'r, B: Binder> {
    engine: &'s Engine<'r, B>,
    binder: &'s mut B,
    source: &'s B::Source,
    output: OutputTree<'r>,
    reference_depth: usize,
}

impl<'r, B: Binder> Session<'_, 'r, B> {
    /// The output built so far.
    #[must_use]
    pub const fn output(&self) -> &OutputTree<'r> {
        &self.output
    }

    /// Mutable access to the output built so far.
    pub const fn output_mut(&mut self) -> &mut OutputTree<'r> {
        &mut self.output
    }

    /// The binder driving the run.
    #[must_use]
    pub const fn binder(&self) -> &B {
        &*self.binder
    }

    /// The source being bound.
    #[must_use]
    pub const fn source(&self) -> &B::Source {
        self.source
    }

    /// Builds every child definition in declaration order.
    ///
    /// # Errors
    ///
    /// Stops at the first failing child.
    pub fn build_children(
        &mut self,
        scope: &Scope<'_, 'r, B::Context>,
        children: &'r Children,
        path: &NodePath,
    ) -> Result<(), Error> {
        for child in children {
            match child {
                Definition::Attribute(attribute) => self.build_attribute(scope, attribute, path)?,
                Definition::Element(element) => self.build_element(scope, element, path)?,
                Definition::Choice(choice) => self.build_choice(scope, choice, path)?,
                Definition::FormReference(reference) => {
                    self.build_reference(scope, reference, path)?;
                }
                Definition::Extension(extension) => {
                    self.build_extension(scope, extension, path)?;
                }
            }
        }
        Ok(())
    }

    /// Binds an attribute and, when present, its extension children.
    ///
    /// # Errors
    ///
    /// Fails when the presence of the attribute breaks its cardinality.
    pub fn build_attribute(
        &mut self,
        scope: &Scope<'_, 'r, B::Context>,
        attribute: &'r AttributeDefinition,
        path: &NodePath,
    ) -> Result<(), Error> {
        let instance = self.binder.bind_attribute(self.source, scope, attribute);
        check(
            attribute.cardinality(),
            usize::from(instance.is_some()),
            DefinitionKind::Attribute,
            path,
            || attribute.label(),
        )?;
        let Some(instance) = instance else {
            return Ok(());
        };

        let name = node_name(attribute.id(), attribute.lookup(), "attribute");
        let node = self.attach(scope, NodeKind::Attribute, name, DefinitionRef::Attribute(attribute));
        self.output.copy_attributes(node, attribute.other_attributes());
        if let Some(value) = self.binder.value(&instance) {
            self.output.set_value(node, value);
        }

        let path = path.child(self.entry(&instance, || attribute.label()));
        self.build_children(&scope.descend(&instance, node), attribute.children(), &path)
    }

    /// Binds every instance of an element and descends into each.
    ///
    /// # Errors
    ///
    /// Fails when the instance count breaks the element's cardinality, or
    /// when any instance's children fail.
    pub fn build_element(
        &mut self,
        scope: &Scope<'_, 'r, B::Context>,
        element: &'r ElementDefinition,
        path: &NodePath,
    ) -> Result<(), Error> {
        let instances = self.binder.bind_element(self.source, scope, element);
        check(
            element.cardinality(),
            instances.len(),
            DefinitionKind::Element,
            path,
            || element.label(),
        )?;
        self.emit_elements(scope, element, &instances, path)
    }

    /// Resolves a choice group and emits its winning alternative.
    ///
    /// # Errors
    ///
    /// Fails when more than one alternative is present, when the group's
    /// cardinality is broken, or when the winner itself is invalid.
    pub fn build_choice(
        &mut self,
        scope: &Scope<'_, 'r, B::Context>,
        choice: &'r ChoiceDefinition,
        path: &NodePath,
    ) -> Result<(), Error> {
        let group_path = path.child(choice.label());
        match self.resolve(scope, choice, &group_path) {
            Outcome::Absent => check(
                choice.cardinality(),
                0,
                DefinitionKind::Choice,
                path,
                || choice.label(),
            ),
            Outcome::Conflict(error) => Err(error.into()),
            Outcome::Active(winner) => {
                check(
                    choice.cardinality(),
                    1,
                    DefinitionKind::Choice,
                    path,
                    || choice.label(),
                )?;
                self.emit_choice(scope, choice, winner, &group_path)
            }
        }
    }

    /// Inlines the referenced form beneath a reference node.
    ///
    /// # Errors
    ///
    /// Fails when the target is not registered, when references are nested
    /// deeper than the configured limit, or when the target's children fail.
    #[instrument(level = "debug", skip_all, fields(target = %reference.target()))]
    pub fn build_reference(
        &mut self,
        scope: &Scope<'_, 'r, B::Context>,
        reference: &'r FormReferenceDefinition,
        path: &NodePath,
    ) -> Result<(), Error> {
        let registry = self.engine.registry;
        let Some(target) = registry.get(reference.target()) else {
            return Err(Error::DefinitionNotFound {
                key: reference.target().clone(),
                path: path.clone(),
            });
        };

        let limit = self.engine.max_reference_depth;
        if self.reference_depth >= limit {
            return Err(Error::ReferenceDepthExceeded {
                key: reference.target().clone(),
                limit,
                path: path.clone(),
            });
        }

        let node = self.attach(
            scope,
            NodeKind::Reference,
            target.key().id(),
            DefinitionRef::FormReference(reference),
        );
        self.output.copy_attributes(node, reference.other_attributes());

        let bound = self.binder.bind_form(self.source, Some(scope), target);
        let context = bound.as_ref().unwrap_or_else(|| scope.context());
        let path = path.child(reference.label());

        tracing::trace!(depth = self.reference_depth, "descending into {}", target.label());
        self.reference_depth += 1;
        let result = self.build_children(&Scope::new(target, context, node), target.children(), &path);
        self.reference_depth -= 1;
        result?;

        let scope = scope.with_parent(node);
        for extension in reference.children().extensions() {
            self.build_extension(&scope, extension, &path)?;
        }
        Ok(())
    }

    /// Hands an extension point to every compatible builder, in registration
    /// order.
    ///
    /// # Errors
    ///
    /// Propagates the first builder error.
    pub fn build_extension(
        &mut self,
        scope: &Scope<'_, 'r, B::Context>,
        extension: &'r ExtensionDefinition,
        path: &NodePath,
    ) -> Result<(), Error> {
        let engine = self.engine;
        let kind = self.binder.kind().to_string();

        let mut handled = false;
        for builder in engine.extensions.iter() {
            if builder.is_compatible(&kind) {
                builder.build(self, scope, extension, path)?;
                handled = true;
            }
        }

        if !handled {
            tracing::trace!("no builder for {} with binder {kind}", extension.label());
        }
        Ok(())
    }

    fn emit_elements(
        &mut self,
        scope: &Scope<'_, 'r, B::Context>,
        element: &'r ElementDefinition,
        instances: &[B::Context],
        path: &NodePath,
    ) -> Result<(), Error> {
        let name = node_name(element.id(), element.lookup(), "element");
        for instance in instances {
            let node = self.attach(scope, NodeKind::Element, name, DefinitionRef::Element(element));
            self.output.copy_attributes(node, element.other_attributes());
            if let Some(value) = self.binder.value(instance) {
                self.output.set_value(node, value);
            }

            let path = path.child(self.entry(instance, || element.label()));
            self.build_children(&scope.descend(instance, node), element.children(), &path)?;
        }
        Ok(())
    }

    /// Finds the single active alternative of a group without emitting
    /// anything.
    fn resolve(
        &mut self,
        scope: &Scope<'_, 'r, B::Context>,
        choice: &'r ChoiceDefinition,
        group_path: &NodePath,
    ) -> Outcome<'r, B::Context> {
        let mut winner = None;
        for alternative in choice.children() {
            let candidate = match alternative {
                Definition::Element(element) => {
                    let instances = self.binder.bind_element(self.source, scope, element);
                    if instances.is_empty() {
                        continue;
                    }
                    Winner::Element {
                        definition: element,
                        instances,
                    }
                }
                Definition::Choice(nested) => {
                    match self.resolve(scope, nested, &group_path.child(nested.label())) {
                        Outcome::Absent => continue,
                        outcome => Winner::Choice {
                            definition: nested,
                            outcome: Box::new(outcome),
                        },
                    }
                }
                Definition::Attribute(_)
                | Definition::FormReference(_)
                | Definition::Extension(_) => continue,
            };

            if winner.is_some() {
                let message = format!("multiple {}s are present", DefinitionKind::Choice.noun());
                return Outcome::Conflict(
                    BindingError::new(message, group_path.clone()).with_definition(choice.label()),
                );
            }
            winner = Some(candidate);
        }
        winner.map_or(Outcome::Absent, Outcome::Active)
    }

    fn emit_choice(
        &mut self,
        scope: &Scope<'_, 'r, B::Context>,
        choice: &'r ChoiceDefinition,
        winner: Winner<'r, B::Context>,
        group_path: &NodePath,
    ) -> Result<(), Error> {
        match &winner {
            Winner::Element {
                definition,
                instances,
            } => check(
                definition.cardinality(),
                instances.len(),
                DefinitionKind::Element,
                group_path,
                || definition.label(),
            )?,
            Winner::Choice {
                definition,
                outcome,
            } => {
                if let Outcome::Conflict(error) = outcome.as_ref() {
                    return Err(error.clone().into());
                }
                check(
                    definition.cardinality(),
                    1,
                    DefinitionKind::Choice,
                    group_path,
                    || definition.label(),
                )?;
            }
        }

        let name = choice.id().unwrap_or("choice");
        let node = self.attach(scope, NodeKind::Choice, name, DefinitionRef::Choice(choice));
        self.output.copy_attributes(node, choice.other_attributes());
        let inner = scope.with_parent(node);

        match winner {
            Winner::Element {
                definition,
                instances,
            } => self.emit_elements(&inner, definition, &instances, group_path)?,
            Winner::Choice {
                definition,
                outcome,
            } => {
                if let Outcome::Active(nested) = *outcome {
                    let nested_path = group_path.child(definition.label());
                    self.emit_choice(&inner, definition, nested, &nested_path)?;
                }
            }
        }

        for extension in choice.children().extensions() {
            self.build_extension(&inner, extension, group_path)?;
        }
        Ok(())
    }

    fn attach(
        &mut self,
        scope: &Scope<'_, 'r, B::Context>,
        kind: NodeKind,
        name: &str,
        definition: DefinitionRef<'r>,
    ) -> NodeId {
        let node = self.output.attach_child(scope.parent(), kind, name);
        self.output.set_origin(
            node,
            Origin {
                form: scope.form(),
                definition,
            },
        );
        node
    }

    fn entry(&self, instance: &B::Context, label: impl FnOnce() -> String) -> String {
        self.binder.describe(instance).unwrap_or_else(label)
    }
}

/// The result of resolving a choice group.
enum Outcome<'r, C> {
    Absent,
    Active(Winner<'r, C>),
    Conflict(BindingError),
}

/// The single active alternative of a group, with what was bound for it.
enum Winner<'r, C> {
    Element {
        definition: &'r ElementDefinition,
        instances: Vec<C>,
    },
    Choice {
        definition: &'r ChoiceDefinition,
        outcome: Box<Outcome<'r, C>>,
    },
}

fn check(
    cardinality: Cardinality,
    count: usize,
    kind: DefinitionKind,
    path: &NodePath,
    label: impl FnOnce() -> String,
) -> Result<(), Error> {
    cardinality.check(count).map_err(|violation| {
        BindingError::new(violation.describe(kind.noun()), path.clone())
            .with_definition(label())
            .into()
    })
}

fn node_name<'a>(id: Option<&'a str>, lookup: Option<&'a str>, fallback: &'a str) -> &'a str {
    id.or(lookup).unwrap_or(fallback)
}
