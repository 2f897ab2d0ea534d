//! Node compiler: plugin discovery and construction
//!
//! Discovery decides, once per markup node, which plugins apply and with
//! which arguments. The result is memoized by [`NodeId`]; every compilation
//! of the node pops the next entry and constructs it. Plugins that wrap their
//! own element (loops, conditionals, attribute-form template definitions)
//! compile that element again to obtain the next layer.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use crate::config::EngineConfig;
use crate::fetch::{Fetcher, FsFetcher};
use crate::markup::{Node, NodeId};
use crate::plugins::{self, GenericTagPlugin, InterpolatedAttrsPlugin, TextPlugin};

use super::error::CompileError;
use super::node::TplNode;
use super::registry::{PluginDescriptor, PluginRegistry};

/// Keyword arguments keyed by the plugin's declared argument name
pub type Kwargs = BTreeMap<String, String>;

/// One discovered plugin application
#[derive(Debug, Clone)]
pub struct PluginAssignment {
    pub descriptor: PluginDescriptor,
    /// Value of the triggering attribute; `None` for tag-triggered plugins
    pub positional: Option<String>,
    pub kwargs: Kwargs,
}

/// Everything a plugin constructor receives
pub struct PluginArgs<'a> {
    pub element: &'a Node,
    pub positional: Option<String>,
    pub kwargs: Kwargs,
    pub compiler: &'a Compiler,
}

impl<'a> PluginArgs<'a> {
    pub fn kwarg(&self, name: &str) -> Option<&str> {
        self.kwargs.get(name).map(String::as_str)
    }

    /// An argument that may be given either as the triggering attribute's
    /// value or as the keyword `name`, but not both. Empty values count as
    /// absent.
    pub fn required(&self, plugin: &str, name: &str) -> Result<&str, CompileError> {
        let positional = self.positional.as_deref().filter(|v| !v.is_empty());
        let keyword = self.kwarg(name).filter(|v| !v.is_empty());
        match (positional, keyword) {
            (Some(_), Some(_)) => Err(CompileError::invalid(
                plugin,
                name,
                "given both as the attribute value and as a keyword",
            )),
            (Some(value), None) | (None, Some(value)) => Ok(value),
            (None, None) => Err(CompileError::missing(plugin, name)),
        }
    }
}

/// Compiles markup nodes into [`TplNode`]s
pub struct Compiler {
    registry: PluginRegistry,
    assignments: RefCell<HashMap<NodeId, Vec<PluginAssignment>>>,
    fetcher: Box<dyn Fetcher>,
}

impl Compiler {
    /// Compiler over the given registry, fetching relative to the working
    /// directory
    pub fn new(registry: PluginRegistry) -> Self {
        Self {
            registry,
            assignments: RefCell::new(HashMap::new()),
            fetcher: Box::new(FsFetcher::default()),
        }
    }

    /// Compiler with the built-in plugins registered under `config.prefix`
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut registry = PluginRegistry::with_prefix(&config.prefix);
        registry.set_require_prefix(config.require_prefix);
        plugins::register_builtins(&mut registry);
        let files = match &config.base_path {
            Some(base) => FsFetcher::with_base_path(base.clone()),
            None => FsFetcher::default(),
        };
        #[cfg(feature = "http")]
        let fetcher = crate::fetch::HttpFetcher::new(config.fetch_timeout, files);
        #[cfg(not(feature = "http"))]
        let fetcher = files;
        Self::new(registry).with_fetcher(fetcher)
    }

    pub fn with_fetcher(mut self, fetcher: impl Fetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Mutable registry access; nodes already discovered keep their
    /// assignments
    pub fn registry_mut(&mut self) -> &mut PluginRegistry {
        &mut self.registry
    }

    pub fn fetcher(&self) -> &dyn Fetcher {
        self.fetcher.as_ref()
    }

    /// The assignments still pending for `node`, discovering them first if
    /// needed. Ordered by ascending priority; the last one is constructed by
    /// the next [`compile`](Self::compile).
    pub fn discover(&self, node: &Node) -> Vec<PluginAssignment> {
        if node.is_text() {
            return Vec::new();
        }
        self.ensure_discovered(node);
        self.assignments
            .borrow()
            .get(&node.id())
            .cloned()
            .unwrap_or_default()
    }

    fn ensure_discovered(&self, node: &Node) {
        if self.assignments.borrow().contains_key(&node.id()) {
            return;
        }
        let found = self.find_plugins(node);
        tracing::debug!(
            node = %node.node_name(),
            plugins = ?found.iter().map(|a| a.descriptor.name()).collect::<Vec<_>>(),
            "discovered plugins"
        );
        self.assignments.borrow_mut().insert(node.id(), found);
    }

    fn find_plugins(&self, node: &Node) -> Vec<PluginAssignment> {
        let mut triggered: Vec<(String, PluginDescriptor)> = Vec::new();
        for attr in node.attributes() {
            if let Some(descriptor) = self.registry.resolve(&attr.name) {
                triggered.push((attr.value.clone(), descriptor.clone()));
                node.remove_attribute(&attr.name);
            }
        }

        // Stable: equal priorities keep attribute order
        triggered.sort_by_key(|(_, descriptor)| descriptor.priority());

        let mut found: Vec<PluginAssignment> = triggered
            .into_iter()
            .map(|(value, descriptor)| {
                let kwargs = take_kwargs(node, &descriptor);
                PluginAssignment {
                    descriptor,
                    positional: Some(value),
                    kwargs,
                }
            })
            .collect();

        if let Some(tag) = node.tag_name() {
            if let Some(descriptor) = self.registry.resolve(&tag) {
                let descriptor = descriptor.clone();
                let kwargs = take_kwargs(node, &descriptor);
                found.push(PluginAssignment {
                    descriptor,
                    positional: None,
                    kwargs,
                });
            }
        }

        found
    }

    /// Compile one markup node
    pub fn compile(&self, node: &Node) -> Result<TplNode, CompileError> {
        if node.is_text() {
            return Ok(TplNode::new(TextPlugin::build(node)?));
        }

        self.ensure_discovered(node);
        let next = self
            .assignments
            .borrow_mut()
            .get_mut(&node.id())
            .and_then(Vec::pop);

        let plugin = match next {
            Some(assignment) => {
                tracing::debug!(
                    plugin = %assignment.descriptor.name(),
                    node = %node.node_name(),
                    "constructing plugin"
                );
                assignment.descriptor.construct(PluginArgs {
                    element: node,
                    positional: assignment.positional,
                    kwargs: assignment.kwargs,
                    compiler: self,
                })?
            }
            None if node.has_attributes() => InterpolatedAttrsPlugin::build(node, self)?,
            None => GenericTagPlugin::build(node, self)?,
        };

        Ok(TplNode::new(plugin))
    }

    /// Compile every child of `node`
    pub fn compile_children(&self, node: &Node) -> Result<Vec<TplNode>, CompileError> {
        node.children()
            .iter()
            .map(|child| self.compile(child))
            .collect()
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Consume the remaining attributes that match the plugin's declared
/// arguments
fn take_kwargs(node: &Node, descriptor: &PluginDescriptor) -> Kwargs {
    let mut kwargs = Kwargs::new();
    for attr in node.attributes() {
        if let Some(arg) = descriptor.accepts(&attr.name) {
            kwargs.insert(arg.to_string(), attr.value.clone());
            node.remove_attribute(&attr.name);
        }
    }
    kwargs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse;
    use pretty_assertions::assert_eq;

    fn dummy(args: PluginArgs<'_>) -> Result<Box<dyn crate::plugins::Plugin>, CompileError> {
        GenericTagPlugin::build(args.element, args.compiler)
    }

    fn element(source: &str) -> Node {
        parse(source).expect("Should parse").children()[0].clone()
    }

    fn names(assignments: &[PluginAssignment]) -> Vec<String> {
        assignments
            .iter()
            .map(|a| a.descriptor.name().to_string())
            .collect()
    }

    fn compiler() -> Compiler {
        let mut registry = PluginRegistry::with_prefix("tpl-");
        registry.register(PluginDescriptor::new("low", 10, &["shared"], dummy));
        registry.register(PluginDescriptor::new("high", 20, &["shared", "extra"], dummy));
        Compiler::new(registry)
    }

    #[test]
    fn test_priority_order_ignores_attribute_order() {
        let c = compiler();
        let a = element(r#"<div tpl-high="h" tpl-low="l"></div>"#);
        let b = element(r#"<div tpl-low="l" tpl-high="h"></div>"#);
        assert_eq!(names(&c.discover(&a)), vec!["low", "high"]);
        assert_eq!(names(&c.discover(&b)), vec!["low", "high"]);
    }

    #[test]
    fn test_attributes_are_consumed_once() {
        let c = compiler();
        let el = element(r#"<div tpl-low="l" shared="s" tpl-high="h" extra="e" class="c"></div>"#);
        let found = c.discover(&el);

        // "low" sorts first and takes `shared`; "high" only gets `extra`
        assert_eq!(found[0].positional.as_deref(), Some("l"));
        assert_eq!(found[0].kwargs.get("shared").map(String::as_str), Some("s"));
        assert_eq!(found[1].kwargs.get("shared"), None);
        assert_eq!(found[1].kwargs.get("extra").map(String::as_str), Some("e"));
        assert_eq!(
            el.attributes().iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
            vec!["class"]
        );
    }

    #[test]
    fn test_tag_plugin_appended_last() {
        let mut c = compiler();
        c.registry_mut()
            .register(PluginDescriptor::new("widget", 0, &["size"], dummy));
        let el = element(r#"<tpl-widget size="3" tpl-high="h"></tpl-widget>"#);
        let found = c.discover(&el);
        assert_eq!(names(&found), vec!["high", "widget"]);
        assert_eq!(found[1].positional, None);
        assert_eq!(found[1].kwargs.get("size").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_compile_pops_highest_priority_first() {
        let c = compiler();
        let el = element(r#"<div tpl-low="l" tpl-high="h"></div>"#);
        c.compile(&el).expect("Should compile");
        assert_eq!(names(&c.discover(&el)), vec!["low"]);
        c.compile(&el).expect("Should compile");
        assert!(c.discover(&el).is_empty());
        let fallback = c.compile(&el).expect("Should compile");
        assert_eq!(fallback.plugin_name(), "GenericTag");
    }

    #[test]
    fn test_fallback_plugins() {
        let c = compiler();
        let with_attrs = element(r#"<a href="x">t</a>"#);
        assert_eq!(c.compile(&with_attrs).expect("compile").plugin_name(), "InterpolatedAttrs");
        let bare = element("<p>t</p>");
        assert_eq!(c.compile(&bare).expect("compile").plugin_name(), "GenericTag");
        let text = parse("hello").expect("Should parse").children()[0].clone();
        assert_eq!(c.compile(&text).expect("compile").plugin_name(), "Text");
    }

    #[test]
    fn test_discovery_survives_registry_changes() {
        let mut c = compiler();
        let el = element(r#"<div tpl-low="l" tpl-high="h"></div>"#);
        c.discover(&el);
        c.registry_mut().remove("low");
        c.registry_mut().remove("high");
        assert_eq!(names(&c.discover(&el)), vec!["low", "high"]);
    }
}
