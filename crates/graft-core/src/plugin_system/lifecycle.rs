//! # Lifecycle Dispatch
//!
//! Runs the hooks plugins registered for the host's run lifecycle. There are
//! three independent passes over the same resolved order:
//!
//! - **before-run**: fail-fast. The first failing hook aborts the pass and its
//!   error is returned to the caller.
//! - **after-run**: fail-soft. Failures are collected, every remaining hook
//!   still runs, and the batch of failures is reported as one warning.
//! - **on-error**: fail-soft like after-run; the context carries the error
//!   that ended the run.
//!
//! Hooks run strictly one after another. Each hook is awaited to completion
//! before the next starts, so effects are totally ordered across plugins and
//! across the hooks of a single plugin. The dispatcher never interrupts a
//! hook; long-running hooks can poll the cancellation signal a caller may
//! thread through [`LifecycleContext`].
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

use crate::plugin_system::context::ContextValue;
use crate::plugin_system::dependency::ResolvedOrder;
use crate::plugin_system::record::{BoxError, LifecycleHook, PluginRecord};
use crate::plugin_system::warning::{LogWarningSink, Warning, WarningSink};

/// The error that ended a run, as seen by on-error hooks.
pub type RunError = Arc<dyn std::error::Error + Send + Sync>;

/// Lifecycle pass identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePass {
    BeforeRun,
    AfterRun,
    OnError,
}

impl LifecyclePass {
    /// Whether a failing hook aborts the pass.
    pub fn is_fail_fast(&self) -> bool {
        matches!(self, LifecyclePass::BeforeRun)
    }

    fn hooks<'a>(&self, plugin: &'a PluginRecord) -> &'a [Arc<dyn LifecycleHook>] {
        let hooks = plugin.hooks();
        match self {
            LifecyclePass::BeforeRun => &hooks.before_run,
            LifecyclePass::AfterRun => &hooks.after_run,
            LifecyclePass::OnError => &hooks.on_error,
        }
    }
}

impl fmt::Display for LifecyclePass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecyclePass::BeforeRun => write!(f, "before-run"),
            LifecyclePass::AfterRun => write!(f, "after-run"),
            LifecyclePass::OnError => write!(f, "on-error"),
        }
    }
}

/// Caller-supplied record handed to every hook of a pass.
#[derive(Clone, Default)]
pub struct LifecycleContext {
    attributes: BTreeMap<String, ContextValue>,
    error: Option<RunError>,
    cancellation: Option<watch::Receiver<bool>>,
}

impl LifecycleContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_error(mut self, error: RunError) -> Self {
        self.error = Some(error);
        self
    }

    /// Attach a cancellation signal; `true` on the channel means cancelled.
    pub fn with_cancellation(mut self, signal: watch::Receiver<bool>) -> Self {
        self.cancellation = Some(signal);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&ContextValue> {
        self.attributes.get(key)
    }

    pub fn attributes(&self) -> &BTreeMap<String, ContextValue> {
        &self.attributes
    }

    /// The triggering error, set for the on-error pass.
    pub fn error(&self) -> Option<&RunError> {
        self.error.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().is_some_and(|rx| *rx.borrow())
    }
}

impl fmt::Debug for LifecycleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleContext")
            .field("attributes", &self.attributes)
            .field("error", &self.error.as_ref().map(|e| e.to_string()))
            .field("cancellable", &self.cancellation.is_some())
            .finish()
    }
}

/// A hook failure that aborted a fail-fast pass.
#[derive(Debug, Error)]
#[error("{pass} hook #{index} of plugin '{plugin}' failed: {source}")]
pub struct HookError {
    pub plugin: String,
    pub pass: LifecyclePass,
    pub index: usize,
    #[source]
    pub source: BoxError,
}

/// A hook failure collected by a fail-soft pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFailure {
    pub plugin: String,
    pub index: usize,
    pub message: String,
}

impl fmt::Display for HookFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plugin '{}' hook #{}: {}", self.plugin, self.index, self.message)
    }
}

/// Outcome of one lifecycle pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub pass: LifecyclePass,
    pub hooks_invoked: usize,
    pub failures: Vec<HookFailure>,
}

impl PassSummary {
    fn new(pass: LifecyclePass) -> Self {
        Self {
            pass,
            hooks_invoked: 0,
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Dispatches lifecycle hooks in resolved order.
pub struct LifecycleDispatcher {
    warnings: Arc<dyn WarningSink>,
}

impl Default for LifecycleDispatcher {
    fn default() -> Self {
        Self::new(Arc::new(LogWarningSink))
    }
}

impl LifecycleDispatcher {
    pub fn new(warnings: Arc<dyn WarningSink>) -> Self {
        Self { warnings }
    }

    /// Fail-fast pass run before the host executes the user's script.
    pub async fn run_before_run(
        &self,
        order: &ResolvedOrder,
        context: &LifecycleContext,
    ) -> Result<PassSummary, HookError> {
        let pass = LifecyclePass::BeforeRun;
        let mut summary = PassSummary::new(pass);
        log::info!("Running {} hooks", pass);

        for plugin in order {
            for (index, hook) in pass.hooks(plugin).iter().enumerate() {
                summary.hooks_invoked += 1;
                if let Err(source) = hook.call(context).await {
                    log::error!("{} hook #{} of plugin '{}' failed, aborting pass", pass, index, plugin.name());
                    return Err(HookError {
                        plugin: plugin.name().to_string(),
                        pass,
                        index,
                        source,
                    });
                }
            }
        }
        Ok(summary)
    }

    /// Fail-soft pass run after a successful script execution.
    pub async fn run_after_run(&self, order: &ResolvedOrder, context: &LifecycleContext) -> PassSummary {
        self.run_fail_soft(LifecyclePass::AfterRun, order, context).await
    }

    /// Fail-soft pass run when the run failed. `context` should carry the
    /// triggering error.
    pub async fn run_on_error(&self, order: &ResolvedOrder, context: &LifecycleContext) -> PassSummary {
        if context.error().is_none() {
            log::debug!("{} pass started without a triggering error", LifecyclePass::OnError);
        }
        self.run_fail_soft(LifecyclePass::OnError, order, context).await
    }

    async fn run_fail_soft(
        &self,
        pass: LifecyclePass,
        order: &ResolvedOrder,
        context: &LifecycleContext,
    ) -> PassSummary {
        let mut summary = PassSummary::new(pass);
        log::info!("Running {} hooks", pass);

        for plugin in order {
            for (index, hook) in pass.hooks(plugin).iter().enumerate() {
                summary.hooks_invoked += 1;
                if let Err(err) = hook.call(context).await {
                    log::debug!("{} hook #{} of plugin '{}' failed: {}", pass, index, plugin.name(), err);
                    summary.failures.push(HookFailure {
                        plugin: plugin.name().to_string(),
                        index,
                        message: err.to_string(),
                    });
                }
            }
        }

        if !summary.failures.is_empty() {
            self.warnings.warn(Warning::HookFailures {
                pass,
                failures: summary.failures.clone(),
            });
        }
        summary
    }
}
