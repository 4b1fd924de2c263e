//! # Plugin Records
//!
//! [`PluginRecord`] is the validated, already-loaded representation of one
//! plugin: its identity, ordering metadata, conflict strategy, extension
//! callbacks and lifecycle hooks. Records are built by the external loader,
//! consumed read-only by the orchestration engine and discarded afterwards.
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::plugin_system::context::{PropertyWrite, SharedContext};
use crate::plugin_system::lifecycle::LifecycleContext;

/// Error type plugin-supplied code reports failures with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Owned future returned by closure-based hooks.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// How a plugin wants collisions on a property it writes to be handled.
///
/// The strategy of the plugin performing the write is the one consulted,
/// not the strategy of the plugin that currently owns the property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictStrategy {
    /// Take the new value and warn.
    #[default]
    WarnOverride,
    /// Abort the apply pass.
    Error,
    /// Concatenate sequences / merge mappings, otherwise behave like `WarnOverride`.
    Merge,
    /// Take the new value silently.
    Priority,
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConflictStrategy::WarnOverride => "WARN_OVERRIDE",
            ConflictStrategy::Error => "ERROR",
            ConflictStrategy::Merge => "MERGE",
            ConflictStrategy::Priority => "PRIORITY",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ConflictStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "WARN_OVERRIDE" => Ok(ConflictStrategy::WarnOverride),
            "ERROR" => Ok(ConflictStrategy::Error),
            "MERGE" => Ok(ConflictStrategy::Merge),
            "PRIORITY" => Ok(ConflictStrategy::Priority),
            other => Err(format!("unknown conflict strategy '{}'", other)),
        }
    }
}

/// A callback that contributes properties into the shared context.
///
/// Implementations read the context and return the writes they want to
/// perform; the applier decides whether each write is committed.
#[async_trait]
pub trait ExtensionCallback: Send + Sync {
    async fn extend(&self, context: &SharedContext) -> Result<Vec<PropertyWrite>, BoxError>;
}

/// A hook invoked during one of the lifecycle passes.
#[async_trait]
pub trait LifecycleHook: Send + Sync {
    async fn call(&self, context: &LifecycleContext) -> Result<(), BoxError>;
}

/// Adapter turning a plain closure into an [`ExtensionCallback`].
pub struct FnExtension<F> {
    func: F,
}

#[async_trait]
impl<F> ExtensionCallback for FnExtension<F>
where
    F: Fn(&SharedContext) -> Result<Vec<PropertyWrite>, BoxError> + Send + Sync,
{
    async fn extend(&self, context: &SharedContext) -> Result<Vec<PropertyWrite>, BoxError> {
        (self.func)(context)
    }
}

/// Wrap a synchronous closure as an extension callback.
pub fn extension_fn<F>(func: F) -> Arc<dyn ExtensionCallback>
where
    F: Fn(&SharedContext) -> Result<Vec<PropertyWrite>, BoxError> + Send + Sync + 'static,
{
    Arc::new(FnExtension { func })
}

/// Adapter turning a future-returning closure into a [`LifecycleHook`].
pub struct FnHook<F> {
    func: F,
}

#[async_trait]
impl<F> LifecycleHook for FnHook<F>
where
    F: for<'a> Fn(&'a LifecycleContext) -> BoxFuture<'a, Result<(), BoxError>> + Send + Sync,
{
    async fn call(&self, context: &LifecycleContext) -> Result<(), BoxError> {
        (self.func)(context).await
    }
}

/// Wrap a closure returning a boxed future as a lifecycle hook.
pub fn hook_fn<F>(func: F) -> Arc<dyn LifecycleHook>
where
    F: for<'a> Fn(&'a LifecycleContext) -> BoxFuture<'a, Result<(), BoxError>> + Send + Sync + 'static,
{
    Arc::new(FnHook { func })
}

/// The three ordered hook lists of one plugin.
#[derive(Clone, Default)]
pub struct PluginHooks {
    pub before_run: Vec<Arc<dyn LifecycleHook>>,
    pub after_run: Vec<Arc<dyn LifecycleHook>>,
    pub on_error: Vec<Arc<dyn LifecycleHook>>,
}

impl PluginHooks {
    pub fn is_empty(&self) -> bool {
        self.before_run.is_empty() && self.after_run.is_empty() && self.on_error.is_empty()
    }
}

impl fmt::Debug for PluginHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginHooks")
            .field("before_run", &self.before_run.len())
            .field("after_run", &self.after_run.len())
            .field("on_error", &self.on_error.len())
            .finish()
    }
}

/// Validated representation of one loaded plugin.
///
/// The name is the plugin's identity within a batch and cannot change after
/// construction. Uniqueness across a batch is the loader's responsibility.
#[derive(Clone)]
pub struct PluginRecord {
    name: String,
    priority: i64,
    dependencies: Vec<String>,
    conflict_strategy: ConflictStrategy,
    extensions: Vec<Arc<dyn ExtensionCallback>>,
    hooks: PluginHooks,
}

impl PluginRecord {
    /// Create a record with priority 0, no dependencies and `WARN_OVERRIDE`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            dependencies: Vec::new(),
            conflict_strategy: ConflictStrategy::default(),
            extensions: Vec::new(),
            hooks: PluginHooks::default(),
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Declare a dependency. Repeated names are ignored.
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.dependencies.contains(&name) {
            self.dependencies.push(name);
        }
        self
    }

    pub fn with_conflict_strategy(mut self, strategy: ConflictStrategy) -> Self {
        self.conflict_strategy = strategy;
        self
    }

    /// Append an extension callback. Registration order is preserved.
    pub fn with_extension(mut self, callback: Arc<dyn ExtensionCallback>) -> Self {
        self.extensions.push(callback);
        self
    }

    pub fn on_before_run(mut self, hook: Arc<dyn LifecycleHook>) -> Self {
        self.hooks.before_run.push(hook);
        self
    }

    pub fn on_after_run(mut self, hook: Arc<dyn LifecycleHook>) -> Self {
        self.hooks.after_run.push(hook);
        self
    }

    pub fn on_error(mut self, hook: Arc<dyn LifecycleHook>) -> Self {
        self.hooks.on_error.push(hook);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i64 {
        self.priority
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn conflict_strategy(&self) -> ConflictStrategy {
        self.conflict_strategy
    }

    pub fn extensions(&self) -> &[Arc<dyn ExtensionCallback>] {
        &self.extensions
    }

    pub fn hooks(&self) -> &PluginHooks {
        &self.hooks
    }
}

impl fmt::Debug for PluginRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRecord")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("dependencies", &self.dependencies)
            .field("conflict_strategy", &self.conflict_strategy)
            .field("extensions", &self.extensions.len())
            .field("hooks", &self.hooks)
            .finish()
    }
}
