//! Data contexts
//!
//! A [`Context`] is an observable scope of JSON values. Scopes nest: a child
//! resolves names it does not define through its parent, optionally through a
//! [`ContextSelector`] binding (scope narrowing or an alias). Each scope also
//! carries the cache of named templates defined in it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::events::{ChangeNotifier, WeakNotifier};
use crate::expr::Expr;
use crate::plugins::TemplateDefinition;
use crate::tpl::BindError;

/// How a child scope relates to its parent
#[derive(Debug, Clone, PartialEq)]
enum ScopeBinding {
    None,
    /// Names resolve inside the value at this parent path first
    Narrow(Vec<String>),
    /// `name` is a live alias of a parent path
    Alias { name: String, path: Vec<String> },
}

struct ContextInner {
    values: RefCell<Map<String, Value>>,
    parent: Option<Context>,
    binding: ScopeBinding,
    templates: RefCell<HashMap<String, Rc<TemplateDefinition>>>,
    watchers: RefCell<Vec<WeakNotifier>>,
}

/// Observable key-value scope
#[derive(Clone)]
pub struct Context(Rc<ContextInner>);

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self::with_parts(Map::new(), None, ScopeBinding::None)
    }

    fn with_parts(values: Map<String, Value>, parent: Option<Context>, binding: ScopeBinding) -> Self {
        Context(Rc::new(ContextInner {
            values: RefCell::new(values),
            parent,
            binding,
            templates: RefCell::new(HashMap::new()),
            watchers: RefCell::new(Vec::new()),
        }))
    }

    /// Build a root context from a JSON object
    pub fn from_value(value: Value) -> Result<Self, BindError> {
        match value {
            Value::Object(map) => Ok(Self::with_parts(map, None, ScopeBinding::None)),
            other => Err(BindError::InvalidContext {
                found: value_kind(&other),
            }),
        }
    }

    /// Fresh child scope; names fall through to `self`
    pub fn child(&self) -> Context {
        Self::with_parts(Map::new(), Some(self.clone()), ScopeBinding::None)
    }

    /// Child scope with the given local values
    pub fn child_with(&self, values: Map<String, Value>) -> Context {
        Self::with_parts(values, Some(self.clone()), ScopeBinding::None)
    }

    pub fn parent(&self) -> Option<&Context> {
        self.0.parent.as_ref()
    }

    /// Resolve a path of names, descending into objects and arrays
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.resolve_name(first.as_ref())?;
        for segment in rest {
            current = descend(&current, segment.as_ref())?;
        }
        Some(current)
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.lookup(&[name])
    }

    fn resolve_name(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.0.values.borrow().get(name) {
            return Some(v.clone());
        }
        let parent = self.0.parent.as_ref()?;
        match &self.0.binding {
            ScopeBinding::Alias { name: alias, path } if alias == name => {
                return parent.lookup(path);
            }
            ScopeBinding::Narrow(path) => {
                let mut full = path.clone();
                full.push(name.to_string());
                if let Some(v) = parent.lookup(&full) {
                    return Some(v);
                }
            }
            _ => {}
        }
        parent.resolve_name(name)
    }

    /// Set a local value and notify watchers
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        self.0.values.borrow_mut().insert(name.clone(), value.into());
        tracing::trace!(key = %name, "context value set");
        self.notify();
    }

    /// Set a value below a dotted path (`person.name`), creating objects as
    /// needed. A root name that is only visible through the parent is copied
    /// into this scope first.
    pub fn set_path(&self, path: &str, value: impl Into<Value>) {
        let segments: Vec<&str> = path.split('.').collect();
        let Some((first, rest)) = segments.split_first() else {
            return;
        };
        if rest.is_empty() {
            self.set(*first, value);
            return;
        }

        let inherited = if self.0.values.borrow().contains_key(*first) {
            None
        } else {
            self.resolve_name(first)
        };

        {
            let mut values = self.0.values.borrow_mut();
            let mut slot = values
                .entry(first.to_string())
                .or_insert_with(|| inherited.unwrap_or_else(|| Value::Object(Map::new())));
            for segment in rest {
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                let Value::Object(map) = slot else {
                    return;
                };
                slot = map
                    .entry(segment.to_string())
                    .or_insert(Value::Null);
            }
            *slot = value.into();
        }
        tracing::trace!(path = %path, "context path set");
        self.notify();
    }

    /// Register a watcher on this scope and every ancestor
    pub fn watch(&self, notifier: &ChangeNotifier) {
        self.watch_weak(notifier.downgrade());
    }

    fn watch_weak(&self, watcher: WeakNotifier) {
        self.0.watchers.borrow_mut().push(watcher.clone());
        if let Some(parent) = &self.0.parent {
            parent.watch_weak(watcher);
        }
    }

    /// Notify live watchers, pruning dead ones
    pub fn notify(&self) {
        let watchers: Vec<WeakNotifier> = {
            let mut list = self.0.watchers.borrow_mut();
            list.retain(WeakNotifier::is_alive);
            list.clone()
        };
        for watcher in watchers {
            watcher.notify();
        }
    }

    pub fn watcher_count(&self) -> usize {
        self.0
            .watchers
            .borrow()
            .iter()
            .filter(|w| w.is_alive())
            .count()
    }

    /// Register a named template in this scope
    pub fn define_template(&self, name: impl Into<String>, definition: Rc<TemplateDefinition>) {
        let name = name.into();
        tracing::debug!(template = %name, "template defined");
        self.0.templates.borrow_mut().insert(name, definition);
    }

    /// Look up a named template here or in an ancestor scope
    pub fn template(&self, name: &str) -> Option<Rc<TemplateDefinition>> {
        if let Some(def) = self.0.templates.borrow().get(name) {
            return Some(def.clone());
        }
        self.0.parent.as_ref()?.template(name)
    }

    /// Snapshot of the local values
    pub fn locals(&self) -> Map<String, Value> {
        self.0.values.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("values", &self.0.values.borrow())
            .field("binding", &self.0.binding)
            .field("has_parent", &self.0.parent.is_some())
            .finish()
    }
}

fn descend(value: &Value, segment: &str) -> Option<Value> {
    match value {
        Value::Object(map) => map.get(segment).cloned(),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i).cloned()),
        _ => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Chooses the scope an include binds its template instance to
///
/// Syntax of the include's `context` argument:
///
/// * absent: a fresh child of the include's context
/// * `path`: a child scope narrowed to the value at `path`
/// * `path as name`: a child scope where `name` aliases `path`
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ContextSelector {
    #[default]
    Inherit,
    Narrow(Vec<String>),
    Alias { path: Vec<String>, name: String },
}

impl ContextSelector {
    pub fn parse(source: &str) -> Result<Self, Vec<ParseError>> {
        let source = source.trim();
        if source.is_empty() {
            return Ok(ContextSelector::Inherit);
        }

        let (path_src, alias) = match source.split_once(" as ") {
            Some((path, alias)) => (path.trim(), Some(alias.trim())),
            None => (source, None),
        };

        let path = match Expr::parse(path_src)? {
            Expr::Path(segments) => segments,
            _ => {
                return Err(vec![ParseError::syntax(
                    0..path_src.len(),
                    format!("context selector '{}' is not a path", path_src),
                )])
            }
        };

        match alias {
            Some(name) => {
                let valid = !name.is_empty()
                    && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$');
                if !valid {
                    return Err(vec![ParseError::syntax(
                        0..source.len(),
                        format!("invalid alias '{}' in context selector", name),
                    )]);
                }
                Ok(ContextSelector::Alias {
                    path,
                    name: name.to_string(),
                })
            }
            None => Ok(ContextSelector::Narrow(path)),
        }
    }

    /// Create the scope for one instance
    pub fn select(&self, ctx: &Context) -> Context {
        let binding = match self {
            ContextSelector::Inherit => ScopeBinding::None,
            ContextSelector::Narrow(path) => ScopeBinding::Narrow(path.clone()),
            ContextSelector::Alias { path, name } => ScopeBinding::Alias {
                name: name.clone(),
                path: path.clone(),
            },
        };
        Context::with_parts(Map::new(), Some(ctx.clone()), binding)
    }
}
