//! Attribute interpolation

use crate::context::Context;
use crate::events::ChangeNotifier;
use crate::expr::{display_value, Expr, Interpolation};
use crate::markup::Node;
use crate::tpl::{BindError, CompileError, Compiler};

use super::{ChildNodes, Fragment, Plugin, Update};

#[derive(Debug, Clone, PartialEq)]
enum AttrValue {
    Static(String),
    Interpolated(Interpolation),
    /// A bare dotted path; the literal is kept when it resolves to nothing
    Path { literal: String, expr: Expr },
}

impl AttrValue {
    fn classify(value: &str) -> Result<Self, CompileError> {
        if value.contains("{{") {
            let interpolation = Interpolation::parse(value)
                .map_err(|errs| CompileError::syntax("InterpolatedAttrs", errs))?;
            return Ok(AttrValue::Interpolated(interpolation));
        }
        if is_dotted_path(value) {
            if let Ok(expr) = Expr::parse(value) {
                return Ok(AttrValue::Path {
                    literal: value.to_string(),
                    expr,
                });
            }
        }
        Ok(AttrValue::Static(value.to_string()))
    }

    fn is_static(&self) -> bool {
        matches!(self, AttrValue::Static(_))
    }

    fn render(&self, ctx: &Context) -> String {
        match self {
            AttrValue::Static(value) => value.clone(),
            AttrValue::Interpolated(interpolation) => interpolation.render(ctx),
            AttrValue::Path { literal, expr } => match expr.eval(ctx) {
                serde_json::Value::Null => literal.clone(),
                value => display_value(&value),
            },
        }
    }
}

/// `ident(.ident)+` with no spaces
fn is_dotted_path(value: &str) -> bool {
    let mut parts = 0;
    for part in value.split('.') {
        let mut chars = part.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$');
        if !valid_start || !chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
            return false;
        }
        parts += 1;
    }
    parts >= 2
}

/// Element whose attributes are evaluated against the context
#[derive(Debug)]
pub struct InterpolatedAttrsPlugin {
    output: Node,
    attributes: Vec<(String, AttrValue)>,
    children: ChildNodes,
    ctx: Option<Context>,
    notifier: ChangeNotifier,
}

impl InterpolatedAttrsPlugin {
    pub fn build(element: &Node, compiler: &Compiler) -> Result<Box<dyn Plugin>, CompileError> {
        let attributes = element
            .attributes()
            .into_iter()
            .map(|attr| Ok((attr.name, AttrValue::classify(&attr.value)?)))
            .collect::<Result<Vec<_>, CompileError>>()?;
        let children = ChildNodes::compile(compiler, element)?;
        Ok(Box::new(Self::from_parts(
            element.shallow_copy(),
            attributes,
            children,
        )))
    }

    fn from_parts(output: Node, attributes: Vec<(String, AttrValue)>, children: ChildNodes) -> Self {
        let notifier = ChangeNotifier::new();
        children.forward_to(&notifier);
        Self {
            output,
            attributes,
            children,
            ctx: None,
            notifier,
        }
    }

    fn apply_attributes(&self) {
        let Some(ctx) = &self.ctx else {
            return;
        };
        for (name, value) in &self.attributes {
            self.output.set_attribute(name, value.render(ctx));
        }
    }
}

impl Plugin for InterpolatedAttrsPlugin {
    fn name(&self) -> &'static str {
        "InterpolatedAttrs"
    }

    fn bind_ctx(&mut self, ctx: &Context) -> Result<Fragment, BindError> {
        if self.attributes.iter().any(|(_, v)| !v.is_static()) {
            ctx.watch(&self.notifier);
        }
        self.ctx = Some(ctx.clone());
        self.apply_attributes();

        let inner = self.children.bind_ctx(ctx)?;
        self.output.set_children(&inner);
        Ok(vec![self.output.clone()])
    }

    fn update(&mut self) -> Result<Update, BindError> {
        self.apply_attributes();
        if let Update::Replaced(inner) = self.children.update()? {
            self.output.set_children(&inner);
        }
        Ok(Update::Unchanged)
    }

    fn clone_plugin(&self) -> Box<dyn Plugin> {
        Box::new(Self::from_parts(
            self.output.shallow_copy(),
            self.attributes.clone(),
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
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn bind(source: &str, data: serde_json::Value) -> (Box<dyn Plugin>, Fragment, Context) {
        let doc = parse(source).expect("Should parse");
        let compiler = Compiler::default();
        let mut plugin =
            InterpolatedAttrsPlugin::build(&doc.children()[0], &compiler).expect("Should build");
        let ctx = Context::from_value(data).expect("object");
        let fragment = plugin.bind_ctx(&ctx).expect("Should bind");
        (plugin, fragment, ctx)
    }

    #[test]
    fn test_dotted_path_detection() {
        assert!(is_dotted_path("person.url"));
        assert!(is_dotted_path("a.b.c"));
        assert!(!is_dotted_path("person"));
        assert!(!is_dotted_path("http://me.com"));
        assert!(!is_dotted_path("a..b"));
        assert!(!is_dotted_path("1.5"));
    }

    #[test]
    fn test_attribute_kinds() {
        let (_, fragment, _) = bind(
            r#"<a href="person.url" title="Hi {{ person.name }}" class="link" data-x="index.html"></a>"#,
            json!({ "person": { "name": "John", "url": "http://me.com" } }),
        );
        assert_eq!(
            fragment[0].to_html(),
            r#"<a href="http://me.com" title="Hi John" class="link" data-x="index.html"></a>"#
        );
    }

    #[test]
    fn test_update_reapplies_attributes() {
        let (mut plugin, fragment, ctx) = bind(
            r#"<img src="{{ pic }}"/>"#,
            json!({ "pic": "a.png" }),
        );
        ctx.set("pic", "b.png");
        plugin.update().expect("Should update");
        assert_eq!(fragment[0].attribute("src").as_deref(), Some("b.png"));
    }

    #[test]
    fn test_static_attributes_do_not_watch() {
        let (_, _, ctx) = bind(r#"<p class="x"></p>"#, json!({}));
        assert_eq!(ctx.watcher_count(), 0);
    }
}
