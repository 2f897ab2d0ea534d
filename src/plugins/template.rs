//! Named template definition and inclusion

use std::rc::Rc;

use crate::context::{Context, ContextSelector};
use crate::events::ChangeNotifier;
use crate::markup::Node;
use crate::tpl::{BindError, CompileError, Compiler, PluginArgs, PluginKind, TplNode};

use super::{ChildNodes, Fragment, Plugin, Update};

/// A compiled template body registered under a name
#[derive(Debug)]
pub struct TemplateDefinition {
    name: String,
    body: Vec<TplNode>,
}

impl TemplateDefinition {
    pub fn new(name: impl Into<String>, body: Vec<TplNode>) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &[TplNode] {
        &self.body
    }

    /// Fresh unbound copy of the body
    pub fn instantiate(&self) -> TemplateInstance {
        TemplateInstance {
            children: ChildNodes::from_nodes(self.body.to_vec()),
        }
    }
}

/// One use of a [`TemplateDefinition`]
#[derive(Debug)]
pub struct TemplateInstance {
    children: ChildNodes,
}

impl TemplateInstance {
    pub fn forward_to(&self, notifier: &ChangeNotifier) {
        self.children.forward_to(notifier);
    }

    pub fn bind_ctx(&mut self, ctx: &Context) -> Result<Fragment, BindError> {
        self.children.bind_ctx(ctx)
    }

    pub fn update(&mut self) -> Result<Update, BindError> {
        self.children.update()
    }

    pub fn nodes(&self) -> &[TplNode] {
        self.children.nodes()
    }
}

/// `tpl-template="name"` or `<tpl-template name="..." src="...">`
#[derive(Debug)]
pub struct TemplateDefinitionPlugin {
    definition: Rc<TemplateDefinition>,
    notifier: ChangeNotifier,
}

impl TemplateDefinitionPlugin {
    pub fn definition(&self) -> &Rc<TemplateDefinition> {
        &self.definition
    }

    /// Replace the element's children with markup fetched from `src`; any
    /// failure leaves them empty
    fn load_body(element: &Node, src: &str, compiler: &Compiler) {
        match compiler.fetcher().fetch(src) {
            Ok(markup) => {
                if let Err(errors) = element.set_inner_markup(&markup) {
                    tracing::warn!(
                        src = %src,
                        errors = errors.len(),
                        "fetched template body does not parse, using an empty body"
                    );
                    element.set_children(&[]);
                }
            }
            Err(err) => {
                tracing::warn!(src = %src, error = %err, "template fetch failed, using an empty body");
                element.set_children(&[]);
            }
        }
    }
}

impl PluginKind for TemplateDefinitionPlugin {
    const NAME: &'static str = "Template";
    const PRIORITY: i32 = 200;
    const ARGS: &'static [&'static str] = &["name", "src"];

    fn construct(args: PluginArgs<'_>) -> Result<Box<dyn Plugin>, CompileError> {
        let name = args.required(Self::NAME, "name")?.to_string();

        if let Some(src) = args.kwarg("src") {
            Self::load_body(args.element, src, args.compiler);
        }

        // The attribute form keeps its element as the body; the tag form
        // contributes only its children
        let body = if args.positional.is_some() {
            vec![args.compiler.compile(args.element)?]
        } else {
            args.compiler.compile_children(args.element)?
        };
        tracing::debug!(template = %name, nodes = body.len(), "template definition compiled");

        Ok(Box::new(Self {
            definition: Rc::new(TemplateDefinition::new(name, body)),
            notifier: ChangeNotifier::new(),
        }))
    }
}

impl Plugin for TemplateDefinitionPlugin {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn bind_ctx(&mut self, ctx: &Context) -> Result<Fragment, BindError> {
        ctx.define_template(self.definition.name(), self.definition.clone());
        Ok(Vec::new())
    }

    fn update(&mut self) -> Result<Update, BindError> {
        Ok(Update::Unchanged)
    }

    fn clone_plugin(&self) -> Box<dyn Plugin> {
        Box::new(Self {
            definition: self.definition.clone(),
            notifier: ChangeNotifier::new(),
        })
    }

    fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }
}

/// `<tpl-include name="..." context="..."/>` or `tpl-include="name"`
#[derive(Debug)]
pub struct IncludePlugin {
    template: String,
    selector: ContextSelector,
    instance: Option<TemplateInstance>,
    notifier: ChangeNotifier,
}

impl IncludePlugin {
    pub fn template_name(&self) -> &str {
        &self.template
    }

    pub fn selector(&self) -> &ContextSelector {
        &self.selector
    }
}

impl PluginKind for IncludePlugin {
    const NAME: &'static str = "Include";
    const ARGS: &'static [&'static str] = &["name", "context"];

    fn construct(args: PluginArgs<'_>) -> Result<Box<dyn Plugin>, CompileError> {
        let template = args.required(Self::NAME, "name")?.to_string();
        let selector = match args.kwarg("context") {
            Some(source) => ContextSelector::parse(source)
                .map_err(|errs| CompileError::syntax(Self::NAME, errs))?,
            None => ContextSelector::Inherit,
        };

        Ok(Box::new(Self {
            template,
            selector,
            instance: None,
            notifier: ChangeNotifier::new(),
        }))
    }
}

impl Plugin for IncludePlugin {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn bind_ctx(&mut self, ctx: &Context) -> Result<Fragment, BindError> {
        let definition = ctx
            .template(&self.template)
            .ok_or_else(|| BindError::unknown_template(&self.template))?;
        let scope = self.selector.select(ctx);

        let mut instance = definition.instantiate();
        instance.forward_to(&self.notifier);
        let fragment = instance.bind_ctx(&scope)?;
        tracing::debug!(template = %self.template, "template included");

        self.instance = Some(instance);
        Ok(fragment)
    }

    fn update(&mut self) -> Result<Update, BindError> {
        match &mut self.instance {
            Some(instance) => instance.update(),
            None => Ok(Update::Unchanged),
        }
    }

    fn clone_plugin(&self) -> Box<dyn Plugin> {
        Box::new(Self {
            template: self.template.clone(),
            selector: self.selector.clone(),
            instance: None,
            notifier: ChangeNotifier::new(),
        })
    }

    fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;
    use crate::markup::{fragment_html, parse};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn compile_first(compiler: &Compiler, source: &str) -> TplNode {
        let doc = parse(source).expect("Should parse");
        compiler.compile(&doc.children()[0]).expect("Should compile")
    }

    #[test]
    fn test_definition_renders_nothing_and_registers() {
        let compiler = Compiler::default();
        let mut node = compile_first(&compiler, r#"<p tpl-template="greet">Hi {{ who }}</p>"#);
        assert_eq!(node.plugin_name(), "Template");

        let ctx = Context::new();
        let fragment = node.bind_ctx(&ctx).expect("Should bind");
        assert!(fragment.is_empty());

        let definition = ctx.template("greet").expect("defined");
        assert_eq!(definition.body().len(), 1);
        assert_eq!(definition.body()[0].plugin_name(), "GenericTag");
    }

    #[test]
    fn test_tag_form_uses_children() {
        let compiler = Compiler::default();
        let mut node = compile_first(
            &compiler,
            r#"<tpl-template name="pair"><b>a</b><i>b</i></tpl-template>"#,
        );
        let ctx = Context::new();
        node.bind_ctx(&ctx).expect("Should bind");
        let definition = ctx.template("pair").expect("defined");

        let mut instance = definition.instantiate();
        let fragment = instance.bind_ctx(&ctx).expect("Should bind");
        assert_eq!(fragment_html(&fragment), "<b>a</b><i>b</i>");
    }

    #[test]
    fn test_src_is_fetched() {
        let fetcher = MemoryFetcher::new().with("card.html", "<em>{{ title }}</em>");
        let compiler = Compiler::default().with_fetcher(fetcher);
        let mut node =
            compile_first(&compiler, r#"<tpl-template name="card" src="card.html"/>"#);
        let ctx = Context::from_value(json!({ "title": "T" })).expect("object");
        node.bind_ctx(&ctx).expect("Should bind");

        let mut instance = ctx.template("card").expect("defined").instantiate();
        let fragment = instance.bind_ctx(&ctx).expect("Should bind");
        assert_eq!(fragment_html(&fragment), "<em>T</em>");
    }

    #[test]
    fn test_failed_fetch_gives_empty_body() {
        let compiler = Compiler::default().with_fetcher(MemoryFetcher::new());
        let mut node = compile_first(
            &compiler,
            r#"<tpl-template name="gone" src="gone.html"><p>fallback</p></tpl-template>"#,
        );
        let ctx = Context::new();
        node.bind_ctx(&ctx).expect("Should bind");
        assert!(ctx.template("gone").expect("defined").body().is_empty());
    }

    #[test]
    fn test_definition_without_name_fails() {
        let compiler = Compiler::default();
        let doc = parse("<tpl-template><p/></tpl-template>").expect("Should parse");
        let err = compiler.compile(&doc.children()[0]).expect_err("no name");
        assert!(matches!(err, CompileError::MissingArgument { .. }));
    }

    #[test]
    fn test_include_unknown_template() {
        let compiler = Compiler::default();
        let mut node = compile_first(&compiler, r#"<tpl-include name="missing"/>"#);
        let err = node.bind_ctx(&Context::new()).expect_err("undefined");
        assert!(matches!(err, BindError::UnknownTemplate { ref name } if name == "missing"));
    }

    #[test]
    fn test_include_attribute_form_and_clone() {
        let compiler = Compiler::default();
        let node = compile_first(&compiler, r#"<div tpl-include="row" context="item as x"></div>"#);
        let copy = node.clone();
        assert_eq!(copy.plugin_name(), "Include");
        let debug = format!("{:?}", copy);
        assert!(debug.contains("row"));
        assert!(debug.contains("Alias"));
    }

    #[test]
    fn test_name_given_twice_is_rejected() {
        let compiler = Compiler::default();
        for source in [
            r#"<div tpl-include="a" name="b"></div>"#,
            r#"<p tpl-template="a" name="b">x</p>"#,
        ] {
            let doc = parse(source).expect("Should parse");
            let err = compiler.compile(&doc.children()[0]).expect_err("ambiguous name");
            assert!(
                matches!(err, CompileError::InvalidArgument { ref argument, .. } if argument == "name"),
                "source {}",
                source
            );
        }
    }

    #[test]
    fn test_empty_attribute_value_defers_to_keyword() {
        let compiler = Compiler::default();
        let node = compile_first(&compiler, r#"<div tpl-include="" name="row"></div>"#);
        assert!(format!("{:?}", node).contains("row"));
    }

    #[test]
    fn test_bad_context_selector_fails_compile() {
        let compiler = Compiler::default();
        let doc = parse(r#"<tpl-include name="a" context="x =="/>"#).expect("Should parse");
        let err = compiler.compile(&doc.children()[0]).expect_err("bad selector");
        assert!(matches!(err, CompileError::Syntax { .. }));
    }
}
