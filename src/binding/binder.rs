//! The contract between the engine and the data it binds against.
//!
//! A [`Binder`] answers, for each definition the engine visits, how many
//! concrete instances exist. The engine never inspects instances itself; it
//! only counts them, hands them back to the binder as the context for nested
//! definitions and asks the binder how to describe them.

use crate::{
    binding::{NodeId, OutputTree},
    domain::{AttributeDefinition, ElementDefinition, FormDefinition},
};

/// The external data a binding run is performed against.
pub trait BindingSource {
    /// An opaque representation of the source.
    ///
    /// `None` means there is nothing to bind at all.
    fn representation(&self) -> Option<String>;
}

/// The structural position handed to every binder call.
#[derive(Debug)]
pub struct Scope<'c, 'r, C> {
    form: &'r FormDefinition,
    form_context: &'c C,
    context: &'c C,
    parent: NodeId,
}

impl<C> Clone for Scope<'_, '_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Scope<'_, '_, C> {}

impl<'c, 'r, C> Scope<'c, 'r, C> {
    /// Creates a scope directly beneath a form.
    #[must_use]
    pub const fn new(form: &'r FormDefinition, form_context: &'c C, parent: NodeId) -> Self {
        Self {
            form,
            form_context,
            context: form_context,
            parent,
        }
    }

    /// The same scope with a new current context and output parent.
    #[must_use]
    pub const fn descend<'n>(&self, context: &'n C, parent: NodeId) -> Scope<'n, 'r, C>
    where
        'c: 'n,
    {
        Scope {
            form: self.form,
            form_context: self.form_context,
            context,
            parent,
        }
    }

    /// The same scope emitting into a different output node.
    #[must_use]
    pub const fn with_parent(&self, parent: NodeId) -> Self {
        Self { parent, ..*self }
    }

    /// The form whose definitions are being bound.
    #[must_use]
    pub const fn form(&self) -> &'r FormDefinition {
        self.form
    }

    /// The context the enclosing form was bound to.
    #[must_use]
    pub const fn form_context(&self) -> &'c C {
        self.form_context
    }

    /// The innermost context: the enclosing element instance, or the form
    /// context at the top of a form.
    #[must_use]
    pub const fn context(&self) -> &'c C {
        self.context
    }

    /// The output node new nodes are attached to.
    #[must_use]
    pub const fn parent(&self) -> NodeId {
        self.parent
    }
}

/// Resolves definitions against a [`BindingSource`].
pub trait Binder {
    /// The source this binder reads.
    type Source: BindingSource + ?Sized;

    /// A handle on one concrete instance.
    type Context;

    /// Identifies the binder implementation.
    ///
    /// Extension builders decide whether they apply by looking at this.
    fn kind(&self) -> &str;

    /// Called once before a run starts.
    fn pre_bind(&mut self, _source: &Self::Source, _form: &FormDefinition) {}

    /// Binds a form.
    ///
    /// `enclosing` is `None` for the root form of a run. Returning `None` for
    /// the root aborts the run; for a referenced form the enclosing context is
    /// used instead.
    fn bind_form(
        &mut self,
        source: &Self::Source,
        enclosing: Option<&Scope<'_, '_, Self::Context>>,
        form: &FormDefinition,
    ) -> Option<Self::Context>;

    /// Returns every instance of an element, in output order.
    fn bind_element(
        &mut self,
        source: &Self::Source,
        scope: &Scope<'_, '_, Self::Context>,
        element: &ElementDefinition,
    ) -> Vec<Self::Context>;

    /// Returns the instance of an attribute, if there is one.
    fn bind_attribute(
        &mut self,
        source: &Self::Source,
        scope: &Scope<'_, '_, Self::Context>,
        attribute: &AttributeDefinition,
    ) -> Option<Self::Context>;

    /// Called once after a run completes successfully.
    fn post_bind(&mut self, _source: &Self::Source, _form: &FormDefinition, _output: &OutputTree<'_>) {
    }

    /// A path entry for an instance. Defaults to the definition's own label.
    fn describe(&self, _context: &Self::Context) -> Option<String> {
        None
    }

    /// The scalar value of an instance, if it has one.
    fn value(&self, _context: &Self::Context) -> Option<String> {
        None
    }
}
