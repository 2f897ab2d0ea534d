//! Conditional and loop plugins

use serde_json::{Map, Value};

use crate::context::Context;
use crate::events::ChangeNotifier;
use crate::expr::{is_truthy, Expr};
use crate::tpl::{BindError, CompileError, PluginArgs, PluginKind, TplNode};

use super::{Fragment, Plugin, Update};

/// Name under which loop bodies see their position
pub const LOOP_INDEX: &str = "loop_index";

/// `tpl-if="expression"`: renders its element only while the expression is
/// truthy
#[derive(Debug)]
pub struct IfPlugin {
    condition: Expr,
    body: TplNode,
    body_bound: bool,
    fragment: Fragment,
    shown: bool,
    ctx: Option<Context>,
    notifier: ChangeNotifier,
}

impl IfPlugin {
    fn new(condition: Expr, body: TplNode) -> Self {
        let notifier = ChangeNotifier::new();
        body.notifier().forward_to(&notifier);
        Self {
            condition,
            body,
            body_bound: false,
            fragment: Vec::new(),
            shown: false,
            ctx: None,
            notifier,
        }
    }

    fn evaluate(&self) -> bool {
        self.ctx
            .as_ref()
            .is_some_and(|ctx| is_truthy(&self.condition.eval(ctx)))
    }

    /// Bind on first show, refresh on later ones
    fn show(&mut self) -> Result<(), BindError> {
        if !self.body_bound {
            if let Some(ctx) = &self.ctx {
                self.fragment = self.body.bind_ctx(ctx)?;
                self.body_bound = true;
            }
        } else if let Update::Replaced(fragment) = self.body.update()? {
            self.fragment = fragment;
        }
        Ok(())
    }
}

impl PluginKind for IfPlugin {
    const NAME: &'static str = "If";
    const PRIORITY: i32 = 50;

    fn construct(args: PluginArgs<'_>) -> Result<Box<dyn Plugin>, CompileError> {
        let source = args
            .positional
            .as_deref()
            .ok_or_else(|| CompileError::missing(Self::NAME, "condition"))?;
        let condition = Expr::parse(source).map_err(|errs| CompileError::syntax(Self::NAME, errs))?;
        let body = args.compiler.compile(args.element)?;
        Ok(Box::new(Self::new(condition, body)))
    }
}

impl Plugin for IfPlugin {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn bind_ctx(&mut self, ctx: &Context) -> Result<Fragment, BindError> {
        ctx.watch(&self.notifier);
        self.ctx = Some(ctx.clone());
        self.shown = self.evaluate();
        if !self.shown {
            return Ok(Vec::new());
        }
        self.show()?;
        Ok(self.fragment.clone())
    }

    fn update(&mut self) -> Result<Update, BindError> {
        let visible = self.evaluate();
        let toggled = visible != self.shown;
        self.shown = visible;

        if !visible {
            return Ok(if toggled {
                Update::Replaced(Vec::new())
            } else {
                Update::Unchanged
            });
        }

        let before = self.fragment.clone();
        self.show()?;
        let replaced = before.len() != self.fragment.len()
            || before.iter().zip(&self.fragment).any(|(a, b)| !a.ptr_eq(b));
        Ok(if toggled || replaced {
            Update::Replaced(self.fragment.clone())
        } else {
            Update::Unchanged
        })
    }

    fn clone_plugin(&self) -> Box<dyn Plugin> {
        Box::new(Self::new(self.condition.clone(), self.body.clone()))
    }

    fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }
}

/// `tpl-for="item in expression"`: one copy of its element per array item
#[derive(Debug)]
pub struct ForPlugin {
    item: String,
    iterable: Expr,
    body: TplNode,
    instances: Vec<(TplNode, Fragment)>,
    items: Option<Value>,
    ctx: Option<Context>,
    notifier: ChangeNotifier,
}

impl ForPlugin {
    fn new(item: String, iterable: Expr, body: TplNode) -> Self {
        Self {
            item,
            iterable,
            body,
            instances: Vec::new(),
            items: None,
            ctx: None,
            notifier: ChangeNotifier::new(),
        }
    }

    /// Split `item in expression`
    fn parse_header(source: &str) -> Result<(String, Expr), CompileError> {
        let Some((item, iterable)) = source.split_once(" in ") else {
            return Err(CompileError::invalid(
                Self::NAME,
                source,
                "expected 'item in expression'",
            ));
        };
        let item = item.trim();
        let valid = item
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_')
            && item.chars().all(|c| c.is_alphanumeric() || c == '_');
        if !valid {
            return Err(CompileError::invalid(
                Self::NAME,
                item,
                "loop variable must be an identifier",
            ));
        }
        let iterable =
            Expr::parse(iterable.trim()).map_err(|errs| CompileError::syntax(Self::NAME, errs))?;
        Ok((item.to_string(), iterable))
    }

    fn current_items(&self) -> Value {
        self.ctx
            .as_ref()
            .map(|ctx| self.iterable.eval(ctx))
            .unwrap_or(Value::Null)
    }

    fn rebuild(&mut self, items: Value) -> Result<(), BindError> {
        self.instances.clear();
        let Some(ctx) = self.ctx.clone() else {
            return Ok(());
        };

        if let Value::Array(values) = &items {
            for (index, value) in values.iter().enumerate() {
                let mut locals = Map::new();
                locals.insert(self.item.clone(), value.clone());
                locals.insert(LOOP_INDEX.to_string(), Value::from(index));
                let scope = ctx.child_with(locals);

                let mut node = self.body.clone();
                node.notifier().forward_to(&self.notifier);
                let fragment = node.bind_ctx(&scope)?;
                self.instances.push((node, fragment));
            }
        }
        tracing::debug!(item = %self.item, instances = self.instances.len(), "loop rebuilt");
        self.items = Some(items);
        Ok(())
    }

    fn flatten(&self) -> Fragment {
        self.instances
            .iter()
            .flat_map(|(_, fragment)| fragment.iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl PluginKind for ForPlugin {
    const NAME: &'static str = "For";
    const PRIORITY: i32 = 100;

    fn construct(args: PluginArgs<'_>) -> Result<Box<dyn Plugin>, CompileError> {
        let source = args
            .positional
            .as_deref()
            .ok_or_else(|| CompileError::missing(Self::NAME, "item in expression"))?;
        let (item, iterable) = Self::parse_header(source)?;
        let body = args.compiler.compile(args.element)?;
        Ok(Box::new(Self::new(item, iterable, body)))
    }
}

impl Plugin for ForPlugin {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn bind_ctx(&mut self, ctx: &Context) -> Result<Fragment, BindError> {
        ctx.watch(&self.notifier);
        self.ctx = Some(ctx.clone());
        let items = self.current_items();
        self.rebuild(items)?;
        Ok(self.flatten())
    }

    fn update(&mut self) -> Result<Update, BindError> {
        let items = self.current_items();
        if self.items.as_ref() != Some(&items) {
            self.rebuild(items)?;
            return Ok(Update::Replaced(self.flatten()));
        }

        let mut changed = false;
        for (node, fragment) in &mut self.instances {
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

    fn clone_plugin(&self) -> Box<dyn Plugin> {
        Box::new(Self::new(
            self.item.clone(),
            self.iterable.clone(),
            self.body.clone(),
        ))
    }

    fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::{fragment_html, parse};
    use crate::tpl::Compiler;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn compile_first(source: &str) -> TplNode {
        let compiler = Compiler::default();
        let doc = parse(source).expect("Should parse");
        compiler.compile(&doc.children()[0]).expect("Should compile")
    }

    fn html(update: Update) -> Option<String> {
        match update {
            Update::Replaced(fragment) => Some(fragment_html(&fragment)),
            Update::Unchanged => None,
        }
    }

    #[test]
    fn test_if_toggles() {
        let mut node = compile_first(r#"<b tpl-if="on">yes</b>"#);
        let ctx = Context::from_value(json!({ "on": false })).expect("object");
        assert!(node.bind_ctx(&ctx).expect("Should bind").is_empty());

        ctx.set("on", true);
        assert_eq!(html(node.update().expect("update")).as_deref(), Some("<b>yes</b>"));

        ctx.set("on", true);
        assert!(html(node.update().expect("update")).is_none());

        ctx.set("on", false);
        assert_eq!(html(node.update().expect("update")).as_deref(), Some(""));
    }

    #[test]
    fn test_if_comparison() {
        let mut node = compile_first(r#"<i tpl-if="role == 'admin'">admin</i>"#);
        let ctx = Context::from_value(json!({ "role": "admin" })).expect("object");
        let fragment = node.bind_ctx(&ctx).expect("Should bind");
        assert_eq!(fragment_html(&fragment), "<i>admin</i>");
    }

    #[test]
    fn test_for_renders_each_item() {
        let mut node = compile_first(r#"<li tpl-for="x in xs">{{ loop_index }}:{{ x }}</li>"#);
        let ctx = Context::from_value(json!({ "xs": ["a", "b"] })).expect("object");
        let fragment = node.bind_ctx(&ctx).expect("Should bind");
        assert_eq!(fragment_html(&fragment), "<li>0:a</li><li>1:b</li>");
    }

    #[test]
    fn test_for_rebuilds_on_list_change() {
        let mut node = compile_first(r#"<li tpl-for="x in xs">{{ x }}</li>"#);
        let ctx = Context::from_value(json!({ "xs": [1], "other": 0 })).expect("object");
        node.bind_ctx(&ctx).expect("Should bind");

        ctx.set("xs", json!([1, 2, 3]));
        assert_eq!(
            html(node.update().expect("update")).as_deref(),
            Some("<li>1</li><li>2</li><li>3</li>")
        );

        ctx.set("other", 1);
        assert!(html(node.update().expect("update")).is_none());
    }

    #[test]
    fn test_for_with_if_per_item() {
        let mut node = compile_first(r#"<p tpl-if="x.show" tpl-for="x in xs">{{ x.n }}</p>"#);
        let ctx = Context::from_value(json!({
            "xs": [{ "n": 1, "show": true }, { "n": 2, "show": false }]
        }))
        .expect("object");
        assert_eq!(node.plugin_name(), "For");
        let fragment = node.bind_ctx(&ctx).expect("Should bind");
        assert_eq!(fragment_html(&fragment), "<p>1</p>");
    }

    #[test]
    fn test_for_header_errors() {
        assert!(ForPlugin::parse_header("xs").is_err());
        assert!(ForPlugin::parse_header("1x in xs").is_err());
        assert!(ForPlugin::parse_header("x in ==").is_err());
        let (item, iterable) = ForPlugin::parse_header(" row in data.rows ").expect("valid");
        assert_eq!(item, "row");
        assert_eq!(iterable.as_path(), Some(&["data".to_string(), "rows".to_string()][..]));
    }
}
