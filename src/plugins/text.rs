//! Text node interpolation

use crate::context::Context;
use crate::events::ChangeNotifier;
use crate::expr::Interpolation;
use crate::markup::Node;
use crate::tpl::{BindError, CompileError};

use super::{Fragment, Plugin, Update};

/// Renders `{{ expr }}` segments of a text node
#[derive(Debug)]
pub struct TextPlugin {
    source: String,
    interpolation: Interpolation,
    output: Node,
    ctx: Option<Context>,
    notifier: ChangeNotifier,
}

impl TextPlugin {
    pub fn build(node: &Node) -> Result<Box<dyn Plugin>, CompileError> {
        let source = node.text_content().unwrap_or_default();
        let interpolation =
            Interpolation::parse(&source).map_err(|errs| CompileError::syntax("Text", errs))?;
        Ok(Box::new(Self::from_parts(source, interpolation)))
    }

    fn from_parts(source: String, interpolation: Interpolation) -> Self {
        Self {
            output: Node::text(source.clone()),
            source,
            interpolation,
            ctx: None,
            notifier: ChangeNotifier::new(),
        }
    }

    fn render(&self) {
        if let Some(ctx) = &self.ctx {
            self.output.set_text(self.interpolation.render(ctx));
        }
    }
}

impl Plugin for TextPlugin {
    fn name(&self) -> &'static str {
        "Text"
    }

    fn bind_ctx(&mut self, ctx: &Context) -> Result<Fragment, BindError> {
        if !self.interpolation.is_static() {
            ctx.watch(&self.notifier);
        }
        self.ctx = Some(ctx.clone());
        self.render();
        Ok(vec![self.output.clone()])
    }

    fn update(&mut self) -> Result<Update, BindError> {
        self.render();
        Ok(Update::Unchanged)
    }

    fn clone_plugin(&self) -> Box<dyn Plugin> {
        Box::new(Self::from_parts(
            self.source.clone(),
            self.interpolation.clone(),
        ))
    }

    fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }
}
