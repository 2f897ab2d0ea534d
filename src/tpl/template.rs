//! Root of a compiled tree
//!
//! A [`Template`] owns the root [`TplNode`], splices its output into the
//! place of the source element, and turns change notifications into
//! coalesced refreshes through an [`UpdateScheduler`].

use std::rc::Rc;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::context::Context;
use crate::markup::{fragment_html, Node};
use crate::plugins::{Fragment, Update};

use super::compiler::Compiler;
use super::error::{BindError, CompileError};
use super::node::TplNode;
use super::scheduler::{Clock, UpdateScheduler};

#[derive(Debug)]
pub struct Template {
    root: TplNode,
    element: Node,
    parent: Option<Node>,
    /// Position of the output among the parent's children
    index: usize,
    rendered: Fragment,
    scheduler: UpdateScheduler,
    subscribed: bool,
    updates: u64,
}

impl Template {
    /// Compile `element` with the default refresh period
    pub fn new(compiler: &Compiler, element: &Node) -> Result<Self, CompileError> {
        Self::with_scheduler(
            compiler,
            element,
            UpdateScheduler::new(EngineConfig::default().refresh_period),
        )
    }

    /// Compile `element`, refreshing after `period`
    pub fn with_period(
        compiler: &Compiler,
        element: &Node,
        period: Duration,
    ) -> Result<Self, CompileError> {
        Self::with_scheduler(compiler, element, UpdateScheduler::new(period))
    }

    /// Compile `element` with a custom time source
    pub fn with_clock(
        compiler: &Compiler,
        element: &Node,
        period: Duration,
        clock: Rc<dyn Clock>,
    ) -> Result<Self, CompileError> {
        Self::with_scheduler(compiler, element, UpdateScheduler::with_clock(period, clock))
    }

    pub fn with_scheduler(
        compiler: &Compiler,
        element: &Node,
        scheduler: UpdateScheduler,
    ) -> Result<Self, CompileError> {
        let parent = element.parent();
        let index = parent
            .as_ref()
            .and_then(|p| p.child_index(element))
            .unwrap_or(0);
        let root = compiler.compile(element)?;
        tracing::debug!(root = %root.plugin_name(), "template compiled");

        Ok(Self {
            root,
            element: element.clone(),
            parent,
            index,
            rendered: Vec::new(),
            scheduler,
            subscribed: false,
            updates: 0,
        })
    }

    /// Bind the tree and put its output where the source element was
    pub fn bind_ctx(&mut self, ctx: &Context) -> Result<(), BindError> {
        let fragment = self.root.bind_ctx(ctx)?;

        if let Some(parent) = &self.parent {
            if parent.replace_child(&fragment, &self.element) {
                tracing::trace!(nodes = fragment.len(), "template output attached");
            } else {
                let remove = self.attached_len(parent);
                parent.splice_children(self.index, remove, &fragment);
            }
        }
        self.rendered = fragment;

        if !self.subscribed {
            let scheduler = self.scheduler.clone();
            self.root.notifier().subscribe(move || scheduler.arm());
            self.subscribed = true;
        }
        Ok(())
    }

    /// Refresh if the scheduled deadline has passed
    pub fn poll(&mut self) -> Result<bool, BindError> {
        if !self.scheduler.is_due() {
            return Ok(false);
        }
        self.update()?;
        Ok(true)
    }

    /// Refresh now if anything is pending
    pub fn flush(&mut self) -> Result<bool, BindError> {
        if !self.scheduler.is_armed() {
            return Ok(false);
        }
        self.update()?;
        Ok(true)
    }

    /// Refresh the tree unconditionally
    pub fn update(&mut self) -> Result<(), BindError> {
        self.scheduler.disarm();
        self.updates += 1;
        tracing::debug!(update = self.updates, "refreshing template");

        match self.root.update()? {
            Update::Unchanged => {}
            Update::Replaced(fragment) => {
                if let Some(parent) = &self.parent {
                    if let Some(i) = self.rendered.first().and_then(|n| parent.child_index(n)) {
                        self.index = i;
                    }
                    let remove = self.attached_len(parent);
                    parent.splice_children(self.index, remove, &fragment);
                }
                self.rendered = fragment;
            }
        }
        Ok(())
    }

    /// Number of rendered nodes still attached at the recorded position
    fn attached_len(&self, parent: &Node) -> usize {
        self.rendered
            .iter()
            .filter(|n| n.parent().is_some_and(|p| p.ptr_eq(parent)))
            .count()
    }

    pub fn root(&self) -> &TplNode {
        &self.root
    }

    pub fn rendered(&self) -> &[Node] {
        &self.rendered
    }

    pub fn to_html(&self) -> String {
        fragment_html(&self.rendered)
    }

    pub fn scheduler(&self) -> &UpdateScheduler {
        &self.scheduler
    }

    pub fn is_pending(&self) -> bool {
        self.scheduler.is_armed()
    }

    /// Refreshes run so far
    pub fn update_count(&self) -> u64 {
        self.updates
    }
}
