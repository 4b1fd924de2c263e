//! # Graft Plugin System Errors
//!
//! [`PluginSystemError`] aggregates the errors of the individual components:
//! [`OrderingError`] from dependency resolution, [`ApplyError`] from
//! extension application and [`HookError`] from the fail-fast before-run
//! pass, plus misuse of the batch state machine.
use crate::plugin_system::applier::ApplyError;
use crate::plugin_system::dependency::OrderingError;
use crate::plugin_system::lifecycle::HookError;
use crate::plugin_system::orchestrator::BatchState;

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    #[error("Plugin ordering failed: {0}")]
    Ordering(#[from] OrderingError),

    #[error("Extension application failed: {0}")]
    Apply(#[from] ApplyError),

    #[error("Lifecycle hook failed: {0}")]
    Hook(#[from] HookError),

    #[error("Cannot {operation} while batch is {state:?}")]
    InvalidTransition {
        state: BatchState,
        operation: &'static str,
    },
}

impl PluginSystemError {
    /// Name of the plugin responsible for the failure, when there is one.
    pub fn plugin(&self) -> Option<&str> {
        match self {
            PluginSystemError::Ordering(OrderingError::MissingDependency { plugin, .. }) => Some(plugin),
            PluginSystemError::Ordering(OrderingError::CircularDependency(_)) => None,
            PluginSystemError::Apply(err) => Some(err.plugin()),
            PluginSystemError::Hook(err) => Some(&err.plugin),
            PluginSystemError::InvalidTransition { .. } => None,
        }
    }
}
