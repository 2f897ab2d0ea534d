//! Compiled, bindable tree node

use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::context::Context;
use crate::events::ChangeNotifier;
use crate::plugins::{Fragment, Plugin, Update};

use super::error::BindError;

static TPL_SEQ: AtomicU64 = AtomicU64::new(0);

/// Lifecycle of a [`TplNode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Unbound,
    Bound,
    /// Bound and notified since the last update
    Dirty,
}

/// A node of the compiled tree, owning exactly one plugin
pub struct TplNode {
    id: u64,
    plugin: Box<dyn Plugin>,
    notifier: ChangeNotifier,
    state: Rc<Cell<NodeState>>,
}

impl TplNode {
    pub fn new(plugin: Box<dyn Plugin>) -> Self {
        let notifier = ChangeNotifier::new();
        let state = Rc::new(Cell::new(NodeState::Unbound));

        let upward = notifier.clone();
        let flag = state.clone();
        plugin.notifier().subscribe(move || {
            if flag.get() == NodeState::Bound {
                flag.set(NodeState::Dirty);
            }
            upward.notify();
        });

        Self {
            id: TPL_SEQ.fetch_add(1, Ordering::Relaxed),
            plugin,
            notifier,
            state,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> NodeState {
        self.state.get()
    }

    pub fn plugin(&self) -> &dyn Plugin {
        self.plugin.as_ref()
    }

    pub fn plugin_name(&self) -> &'static str {
        self.plugin.name()
    }

    /// Emits whenever the plugin does
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn bind_ctx(&mut self, ctx: &Context) -> Result<Fragment, BindError> {
        let fragment = self.plugin.bind_ctx(ctx)?;
        self.state.set(NodeState::Bound);
        Ok(fragment)
    }

    /// Refresh the plugin if it was notified since the last update
    pub fn update(&mut self) -> Result<Update, BindError> {
        if self.state.get() != NodeState::Dirty {
            return Ok(Update::Unchanged);
        }
        // Cleared first so notifications raised by the update itself count
        // for the next one
        self.state.set(NodeState::Bound);
        self.plugin.update()
    }
}

impl Clone for TplNode {
    /// An unbound copy built from the plugin's own clone, without touching
    /// the markup
    fn clone(&self) -> Self {
        TplNode::new(self.plugin.clone_plugin())
    }
}

impl PartialEq for TplNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TplNode {}

impl Hash for TplNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TplNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<TplNode #{} {:?}>", self.id, self.plugin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::Node;
    use crate::plugins::TextPlugin;
    use serde_json::json;
    use std::collections::HashSet;

    fn text_node(source: &str) -> TplNode {
        TplNode::new(TextPlugin::build(&Node::text(source)).expect("Should build"))
    }

    #[test]
    fn test_state_machine() {
        let ctx = Context::from_value(json!({ "name": "a" })).expect("object");
        let mut node = text_node("{{ name }}");
        assert_eq!(node.state(), NodeState::Unbound);

        let fragment = node.bind_ctx(&ctx).expect("Should bind");
        assert_eq!(node.state(), NodeState::Bound);
        assert_eq!(fragment[0].text_content().as_deref(), Some("a"));

        ctx.set("name", "b");
        assert_eq!(node.state(), NodeState::Dirty);

        node.update().expect("Should update");
        assert_eq!(node.state(), NodeState::Bound);
        assert_eq!(fragment[0].text_content().as_deref(), Some("b"));
    }

    #[test]
    fn test_clean_node_skips_update() {
        let ctx = Context::new();
        let mut node = text_node("static");
        node.bind_ctx(&ctx).expect("Should bind");
        assert!(matches!(node.update(), Ok(Update::Unchanged)));
        assert_eq!(node.state(), NodeState::Bound);
    }

    #[test]
    fn test_clone_gets_new_identity() {
        let node = text_node("{{ x }}");
        let copy = node.clone();
        assert_ne!(node, copy);
        assert_eq!(copy.state(), NodeState::Unbound);
        assert_eq!(copy.plugin_name(), "Text");

        let set: HashSet<&TplNode> = [&node, &copy].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
