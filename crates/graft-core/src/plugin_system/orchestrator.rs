//! # Plugin Orchestrator
//!
//! [`PluginOrchestrator`] owns one loaded batch and drives it through the
//! batch state machine:
//!
//! ```text
//! Unvalidated -> Ordered -> ExtensionsApplied -> BeforeRunDone -> AfterRunDone
//!                                  |        |         |
//!                                  |  BeforeRunFailed |
//!                                  |        |         |
//!                                  +--------+---------+-> ErrorDone
//! ```
//!
//! Ordering and extension failures are terminal (`Failed`). A before-run
//! failure moves the batch to `BeforeRunFailed`: the before-run pass cannot be
//! started again, but the host can still run the on-error pass. The orchestrator is an ordinary value created per batch;
//! nothing is shared between two orchestrators.
use std::sync::Arc;

use crate::plugin_system::applier::{ApplyReport, ExtensionApplier};
use crate::plugin_system::context::SharedContext;
use crate::plugin_system::dependency::{DependencyResolver, ResolvedOrder};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::lifecycle::{LifecycleContext, LifecycleDispatcher, PassSummary, RunError};
use crate::plugin_system::record::PluginRecord;
use crate::plugin_system::warning::{LogWarningSink, WarningSink};

/// Where a batch is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Unvalidated,
    Ordered,
    ExtensionsApplied,
    BeforeRunDone,
    AfterRunDone,
    ErrorDone,
    /// A before-run hook failed; only the on-error pass remains.
    BeforeRunFailed,
    /// Ordering or extension application failed; nothing more can run.
    Failed,
}

pub struct PluginOrchestrator {
    pending: Vec<PluginRecord>,
    order: Option<ResolvedOrder>,
    state: BatchState,
    resolver: DependencyResolver,
    applier: ExtensionApplier,
    dispatcher: LifecycleDispatcher,
}

impl PluginOrchestrator {
    /// Create an orchestrator that reports warnings through `log`.
    pub fn new(records: Vec<PluginRecord>) -> Self {
        Self::with_warning_sink(records, Arc::new(LogWarningSink))
    }

    pub fn with_warning_sink(records: Vec<PluginRecord>, warnings: Arc<dyn WarningSink>) -> Self {
        Self {
            pending: records,
            order: None,
            state: BatchState::Unvalidated,
            resolver: DependencyResolver::new(),
            applier: ExtensionApplier::new(Arc::clone(&warnings)),
            dispatcher: LifecycleDispatcher::new(warnings),
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// The resolved order, once computed.
    pub fn order(&self) -> Option<&ResolvedOrder> {
        self.order.as_ref()
    }

    /// Compute the batch order. Fails the batch on a cycle or a missing
    /// dependency.
    pub fn resolve_order(&mut self) -> Result<&ResolvedOrder, PluginSystemError> {
        self.expect_state(&[BatchState::Unvalidated], "resolve plugin order")?;

        let records = std::mem::take(&mut self.pending);
        log::info!("Resolving order for {} plugin(s)", records.len());
        match self.resolver.resolve(records) {
            Ok(order) => {
                self.state = BatchState::Ordered;
                Ok(self.order.insert(order))
            }
            Err(err) => {
                log::error!("{}", err);
                self.state = BatchState::Failed;
                Err(err.into())
            }
        }
    }

    /// Run every extension callback against `context` in resolved order.
    pub async fn apply_extensions(
        &mut self,
        context: &mut SharedContext,
    ) -> Result<ApplyReport, PluginSystemError> {
        let order = self.ordered("apply extensions", &[BatchState::Ordered])?;
        match self.applier.apply(&order, context).await {
            Ok(report) => {
                self.state = BatchState::ExtensionsApplied;
                Ok(report)
            }
            Err(err) => {
                log::error!("{}", err);
                self.state = BatchState::Failed;
                Err(err.into())
            }
        }
    }

    pub async fn run_before_run(
        &mut self,
        context: &LifecycleContext,
    ) -> Result<PassSummary, PluginSystemError> {
        let order = self.ordered("run before-run hooks", &[BatchState::ExtensionsApplied])?;
        match self.dispatcher.run_before_run(&order, context).await {
            Ok(summary) => {
                self.state = BatchState::BeforeRunDone;
                Ok(summary)
            }
            Err(err) => {
                self.state = BatchState::BeforeRunFailed;
                Err(err.into())
            }
        }
    }

    /// Fail-soft; only a state-machine violation produces an error.
    pub async fn run_after_run(
        &mut self,
        context: &LifecycleContext,
    ) -> Result<PassSummary, PluginSystemError> {
        let order = self.ordered("run after-run hooks", &[BatchState::BeforeRunDone])?;
        let summary = self.dispatcher.run_after_run(&order, context).await;
        self.state = BatchState::AfterRunDone;
        Ok(summary)
    }

    /// Fail-soft; `error` is attached to the context every hook receives.
    pub async fn run_on_error(
        &mut self,
        context: &LifecycleContext,
        error: RunError,
    ) -> Result<PassSummary, PluginSystemError> {
        let order = self.ordered(
            "run on-error hooks",
            &[
                BatchState::ExtensionsApplied,
                BatchState::BeforeRunFailed,
                BatchState::BeforeRunDone,
            ],
        )?;
        let context = context.clone().with_error(error);
        let summary = self.dispatcher.run_on_error(&order, &context).await;
        self.state = BatchState::ErrorDone;
        Ok(summary)
    }

    fn expect_state(&self, allowed: &[BatchState], operation: &'static str) -> Result<(), PluginSystemError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(PluginSystemError::InvalidTransition {
                state: self.state,
                operation,
            })
        }
    }

    /// Check the state and hand out a cheap clone of the order.
    fn ordered(
        &self,
        operation: &'static str,
        allowed: &[BatchState],
    ) -> Result<ResolvedOrder, PluginSystemError> {
        self.expect_state(allowed, operation)?;
        self.order.clone().ok_or(PluginSystemError::InvalidTransition {
            state: self.state,
            operation,
        })
    }
}
