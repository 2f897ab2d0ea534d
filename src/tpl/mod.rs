//! Compiled template trees
//!
//! Markup is compiled into a tree of [`TplNode`]s, each driven by one plugin.
//! A [`Template`] owns the root, binds it to a [`Context`](crate::Context)
//! and refreshes it when the data changes.

mod compiler;
mod error;
mod node;
mod registry;
mod scheduler;
mod template;

pub use compiler::{Compiler, Kwargs, PluginArgs, PluginAssignment};
pub use error::{BindError, CompileError};
pub use node::{NodeState, TplNode};
pub use registry::{canonical, PluginDescriptor, PluginFactory, PluginKind, PluginRegistry};
pub use scheduler::{Clock, ManualClock, SystemClock, UpdateScheduler};
pub use template::Template;
