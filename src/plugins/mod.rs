//! Plugin trait and built-in plugins
//!
//! A plugin owns the behavior of one compiled node. Plugins triggered by an
//! attribute or tag are registered in a [`PluginRegistry`]; the fallbacks
//! (text, attribute interpolation, plain tags) are chosen by the compiler
//! directly.

mod attrs;
mod control;
mod generic;
mod template;
mod text;

pub use attrs::InterpolatedAttrsPlugin;
pub use control::{ForPlugin, IfPlugin};
pub use generic::GenericTagPlugin;
pub use template::{IncludePlugin, TemplateDefinition, TemplateDefinitionPlugin, TemplateInstance};
pub use text::TextPlugin;

use std::fmt;

use crate::context::Context;
use crate::events::ChangeNotifier;
use crate::markup::Node;
use crate::tpl::{BindError, CompileError, Compiler, PluginRegistry, TplNode};

/// Markup produced by a bound node
pub type Fragment = Vec<Node>;

/// Outcome of refreshing a node
#[derive(Debug)]
pub enum Update {
    /// Any changes were applied in place
    Unchanged,
    /// The previous fragment must be swapped for this one
    Replaced(Fragment),
}

pub trait Plugin: fmt::Debug {
    /// Registry name, or the fallback's name
    fn name(&self) -> &'static str;

    /// Attach to a context and produce the initial markup
    fn bind_ctx(&mut self, ctx: &Context) -> Result<Fragment, BindError>;

    /// Re-evaluate against the bound context
    fn update(&mut self) -> Result<Update, BindError>;

    /// Unbound copy sharing the compiled structure
    fn clone_plugin(&self) -> Box<dyn Plugin>;

    /// Emits when the plugin needs an update
    fn notifier(&self) -> &ChangeNotifier;
}

/// Register `Template`, `Include`, `For` and `If`
pub fn register_builtins(registry: &mut PluginRegistry) {
    registry.register_kind::<TemplateDefinitionPlugin>();
    registry.register_kind::<IncludePlugin>();
    registry.register_kind::<ForPlugin>();
    registry.register_kind::<IfPlugin>();
}

/// Compiled children of an element and their current output
#[derive(Debug, Default)]
pub struct ChildNodes {
    nodes: Vec<TplNode>,
    fragments: Vec<Fragment>,
}

impl ChildNodes {
    pub fn compile(compiler: &Compiler, element: &Node) -> Result<Self, CompileError> {
        Ok(Self::from_nodes(compiler.compile_children(element)?))
    }

    pub fn from_nodes(nodes: Vec<TplNode>) -> Self {
        Self {
            nodes,
            fragments: Vec::new(),
        }
    }

    pub fn forward_to(&self, notifier: &ChangeNotifier) {
        for node in &self.nodes {
            node.notifier().forward_to(notifier);
        }
    }

    pub fn bind_ctx(&mut self, ctx: &Context) -> Result<Fragment, BindError> {
        self.fragments = self
            .nodes
            .iter_mut()
            .map(|node| node.bind_ctx(ctx))
            .collect::<Result<_, _>>()?;
        Ok(self.flatten())
    }

    /// Update every child; `Replaced` with the whole output if any child was
    /// replaced
    pub fn update(&mut self) -> Result<Update, BindError> {
        let mut changed = false;
        for (node, fragment) in self.nodes.iter_mut().zip(self.fragments.iter_mut()) {
            if let Update::Replaced(new) = node.update()? {
                *fragment = new;
                changed = true;
            }
        }
        Ok(if changed {
            Update::Replaced(self.flatten())
        } else {
            Update::Unchanged
        })
    }

    pub fn flatten(&self) -> Fragment {
        self.fragments.iter().flatten().cloned().collect()
    }

    pub fn nodes(&self) -> &[TplNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Clone for ChildNodes {
    fn clone(&self) -> Self {
        Self::from_nodes(self.nodes.clone())
    }
}
