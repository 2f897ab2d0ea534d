//! Plain elements without plugins or attributes

use crate::context::Context;
use crate::events::ChangeNotifier;
use crate::markup::Node;
use crate::tpl::{BindError, CompileError, Compiler};

use super::{ChildNodes, Fragment, Plugin, Update};

/// Copies the tag and binds the children into it
#[derive(Debug)]
pub struct GenericTagPlugin {
    output: Node,
    children: ChildNodes,
    notifier: ChangeNotifier,
}

impl GenericTagPlugin {
    pub fn build(element: &Node, compiler: &Compiler) -> Result<Box<dyn Plugin>, CompileError> {
        let children = ChildNodes::compile(compiler, element)?;
        Ok(Box::new(Self::from_parts(element.shallow_copy(), children)))
    }

    fn from_parts(output: Node, children: ChildNodes) -> Self {
        let notifier = ChangeNotifier::new();
        children.forward_to(&notifier);
        Self {
            output,
            children,
            notifier,
        }
    }
}

impl Plugin for GenericTagPlugin {
    fn name(&self) -> &'static str {
        "GenericTag"
    }

    fn bind_ctx(&mut self, ctx: &Context) -> Result<Fragment, BindError> {
        let inner = self.children.bind_ctx(ctx)?;
        self.output.set_children(&inner);
        Ok(vec![self.output.clone()])
    }

    fn update(&mut self) -> Result<Update, BindError> {
        if let Update::Replaced(inner) = self.children.update()? {
            self.output.set_children(&inner);
        }
        Ok(Update::Unchanged)
    }

    fn clone_plugin(&self) -> Box<dyn Plugin> {
        Box::new(Self::from_parts(
            self.output.shallow_copy(),
            self.children.clone(),
        ))
    }

    fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse;
    use serde_json::json;

    #[test]
    fn test_copies_tag_and_children() {
        let doc = parse("<ul><li>{{ a }}</li><li>b</li></ul>").expect("Should parse");
        let ul = doc.children()[0].clone();
        let compiler = Compiler::default();
        let mut plugin = GenericTagPlugin::build(&ul, &compiler).expect("Should build");
        let ctx = Context::from_value(json!({ "a": "x" })).expect("object");
        let fragment = plugin.bind_ctx(&ctx).expect("Should bind");

        assert_eq!(fragment.len(), 1);
        assert!(!fragment[0].ptr_eq(&ul));
        assert_eq!(fragment[0].to_html(), "<ul><li>x</li><li>b</li></ul>");
    }

    #[test]
    fn test_children_forward_notifications() {
        let doc = parse("<p>{{ a }}</p>").expect("Should parse");
        let compiler = Compiler::default();
        let mut plugin =
            GenericTagPlugin::build(&doc.children()[0], &compiler).expect("Should build");
        let hits = std::rc::Rc::new(std::cell::Cell::new(0));
        let counter = hits.clone();
        plugin.notifier().subscribe(move || counter.set(counter.get() + 1));

        let ctx = Context::from_value(json!({ "a": 1 })).expect("object");
        plugin.bind_ctx(&ctx).expect("Should bind");
        ctx.set("a", 2);
        assert_eq!(hits.get(), 1);
    }
}
