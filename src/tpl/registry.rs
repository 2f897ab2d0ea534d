//! Plugin registry with prefix- and punctuation-insensitive lookup

use std::collections::HashMap;
use std::fmt;

use crate::plugins::Plugin;

use super::compiler::PluginArgs;
use super::error::CompileError;

/// Constructor stored in a descriptor
pub type PluginFactory = for<'a> fn(PluginArgs<'a>) -> Result<Box<dyn Plugin>, CompileError>;

/// Static description of a plugin implementation
///
/// Implement this for a plugin type and register it with
/// [`PluginRegistry::register_kind`].
pub trait PluginKind {
    /// Name matched against attribute and tag names
    const NAME: &'static str;
    /// Sorted ascending; the entry sorted last is constructed first
    const PRIORITY: i32 = 0;
    /// Keyword arguments picked up from the node's remaining attributes
    const ARGS: &'static [&'static str] = &[];

    fn construct(args: PluginArgs<'_>) -> Result<Box<dyn Plugin>, CompileError>;
}

/// Normalize a key: uppercase, drop `-` and `_`, strip leading copies of
/// `prefix` (which must already be normalized)
pub fn canonical(key: &str, prefix: &str) -> String {
    let mut key: String = key
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_uppercase)
        .collect();
    if !prefix.is_empty() {
        while key.starts_with(prefix) {
            key.drain(..prefix.len());
        }
    }
    key
}

/// Registry entry for one plugin
#[derive(Clone)]
pub struct PluginDescriptor {
    name: String,
    priority: i32,
    args: Vec<String>,
    factory: PluginFactory,
}

impl PluginDescriptor {
    pub fn new(name: impl Into<String>, priority: i32, args: &[&str], factory: PluginFactory) -> Self {
        Self {
            name: name.into(),
            priority,
            args: args.iter().map(|a| a.to_string()).collect(),
            factory,
        }
    }

    /// Descriptor for a [`PluginKind`]
    pub fn of<P: PluginKind>() -> Self {
        Self::new(P::NAME, P::PRIORITY, P::ARGS, P::construct)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The declared argument an attribute name matches, if any
    pub fn accepts(&self, attribute: &str) -> Option<&str> {
        let wanted = canonical(attribute, "");
        self.args
            .iter()
            .find(|arg| canonical(arg, "") == wanted)
            .map(String::as_str)
    }

    pub fn construct(&self, args: PluginArgs<'_>) -> Result<Box<dyn Plugin>, CompileError> {
        (self.factory)(args)
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("args", &self.args)
            .finish()
    }
}

/// Registry for plugin descriptors
#[derive(Debug, Default, Clone)]
pub struct PluginRegistry {
    plugins: HashMap<String, PluginDescriptor>,
    /// Prefix as configured (e.g. `tpl-`)
    prefix: String,
    /// Normalized prefix used for matching
    canonical_prefix: String,
    /// Ignore names that do not carry the prefix
    require_prefix: bool,
}

impl PluginRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry matching names with the given prefix
    pub fn with_prefix(prefix: &str) -> Self {
        let mut registry = Self::new();
        registry.set_prefix(prefix);
        registry
    }

    /// Set the name prefix; existing entries are re-keyed
    pub fn set_prefix(&mut self, prefix: &str) {
        self.prefix = prefix.to_string();
        self.canonical_prefix = canonical(prefix, "");
        let entries: Vec<PluginDescriptor> = self.plugins.drain().map(|(_, d)| d).collect();
        for descriptor in entries {
            let key = self.canonical(descriptor.name());
            self.plugins.insert(key, descriptor);
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// By default `for="..."` triggers the same plugin as `tpl-for="..."`.
    /// With `require` set, only prefixed names resolve, so plain HTML
    /// attributes such as `<label for="email">` are left alone.
    pub fn set_require_prefix(&mut self, require: bool) {
        self.require_prefix = require;
    }

    pub fn requires_prefix(&self) -> bool {
        self.require_prefix
    }

    fn has_prefix(&self, name: &str) -> bool {
        !self.require_prefix
            || self.canonical_prefix.is_empty()
            || canonical(name, "").starts_with(&self.canonical_prefix)
    }

    /// Canonical form of a key under this registry's prefix
    pub fn canonical(&self, key: &str) -> String {
        canonical(key, &self.canonical_prefix)
    }

    /// Insert a descriptor; an existing entry with the same canonical name is
    /// replaced
    pub fn register(&mut self, descriptor: PluginDescriptor) {
        let key = self.canonical(descriptor.name());
        if let Some(previous) = self.plugins.insert(key.clone(), descriptor) {
            tracing::debug!(plugin = %key, previous = %previous.name(), "plugin registration overridden");
        }
    }

    /// Register a [`PluginKind`]
    pub fn register_kind<P: PluginKind>(&mut self) {
        self.register(PluginDescriptor::of::<P>());
    }

    pub fn resolve(&self, name: &str) -> Option<&PluginDescriptor> {
        if !self.has_prefix(name) {
            return None;
        }
        self.plugins.get(&self.canonical(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<PluginDescriptor> {
        let key = self.canonical(name);
        self.plugins.remove(&key)
    }

    /// Canonical names of all registered plugins
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
