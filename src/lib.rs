//! Live Template - reactive HTML templating driven by attribute plugins
//!
//! Markup is compiled into a tree of plugin-driven nodes, bound to an
//! observable data [`Context`], and refreshed in coalesced batches when the
//! data changes. Plugins are found by attribute or tag name (`tpl-for`,
//! `<tpl-include>`), ordered by priority, and wrap each other layer by layer.
//!
//! # Example
//!
//! ```rust
//! use live_template::render;
//! use serde_json::json;
//!
//! let html = render(
//!     r#"<ul><li tpl-for="name in names">{{ name }}</li></ul>"#,
//!     json!({ "names": ["Ann", "Bo"] }),
//! ).unwrap();
//! assert_eq!(html, "<ul><li>Ann</li><li>Bo</li></ul>");
//! ```
//!
//! # Plugin names
//!
//! Names are matched case-insensitively, ignoring `-` and `_`, and the prefix
//! is optional: `for`, `TPL_FOR` and `tpl-for` all trigger the loop plugin.
//! Ordinary HTML attributes that collide with a plugin name are therefore
//! taken as plugin arguments, so `<label for="email">` fails to compile.
//! When rendering real-world HTML, set
//! [`EngineConfig::with_require_prefix`] so only prefixed names match:
//!
//! ```rust
//! use live_template::{render_with_config, EngineConfig};
//! use serde_json::json;
//!
//! let config = EngineConfig::new().with_require_prefix(true);
//! let html = render_with_config(r#"<label for="email">Mail</label>"#, json!({}), &config).unwrap();
//! assert_eq!(html, r#"<label for="email">Mail</label>"#);
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod expr;
pub mod fetch;
pub mod markup;
pub mod plugins;
pub mod tpl;

pub use config::{ConfigError, EngineConfig};
pub use context::{Context, ContextSelector};
pub use error::ParseError;
pub use events::ChangeNotifier;
pub use fetch::{FetchError, Fetcher, FsFetcher, MemoryFetcher};
pub use markup::{parse, Node};
pub use plugins::{Fragment, Plugin, Update};
pub use tpl::{BindError, CompileError, Compiler, PluginRegistry, Template, TplNode};

use serde_json::Value;
use thiserror::Error;

use crate::error::format_parse_errors;

/// Errors that can occur in the one-shot render pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// Error during parsing
    #[error("parse errors: {}", format_parse_errors(.0))]
    Parse(Vec<ParseError>),

    /// Error during compilation
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    /// Error during binding
    #[error("bind error: {0}")]
    Bind(#[from] BindError),

    /// Error loading configuration
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl From<Vec<ParseError>> for Error {
    fn from(errors: Vec<ParseError>) -> Self {
        Error::Parse(errors)
    }
}

/// Parse and compile a whole document
pub fn compile(source: &str, config: &EngineConfig) -> Result<Template, Error> {
    let doc = parse(source)?;
    let compiler = Compiler::from_config(config);
    Ok(Template::with_period(&compiler, &doc, config.refresh_period)?)
}

/// Render markup against data with default configuration
///
/// # Example
///
/// ```rust
/// use live_template::render;
/// use serde_json::json;
///
/// let html = render(
///     r#"<a href="{{ url }}">{{ label }}</a>"#,
///     json!({ "url": "/home", "label": "Home" }),
/// ).unwrap();
/// assert_eq!(html, r#"<a href="/home">Home</a>"#);
/// ```
pub fn render(source: &str, data: Value) -> Result<String, Error> {
    render_with_config(source, data, &EngineConfig::default())
}

/// Render markup against data with custom configuration
///
/// # Example
///
/// ```rust
/// use live_template::{render_with_config, EngineConfig};
/// use serde_json::json;
///
/// let config = EngineConfig::new().with_prefix("x-");
/// let html = render_with_config(r#"<b x-if="on">on</b>"#, json!({ "on": true }), &config).unwrap();
/// assert_eq!(html, "<b>on</b>");
/// ```
pub fn render_with_config(source: &str, data: Value, config: &EngineConfig) -> Result<String, Error> {
    let mut template = compile(source, config)?;
    let ctx = Context::from_value(data)?;
    template.bind_ctx(&ctx)?;
    Ok(template.to_html())
}
