//! # Graft Core Plugin System
//!
//! The plugin orchestration engine. It receives already-loaded, validated
//! [`PluginRecord`]s and is responsible for three things:
//!
//! - **Ordering** ([`dependency`]): one deterministic total order from
//!   declared priorities and inter-plugin dependencies, with cycle and
//!   missing-dependency detection.
//! - **Composition** ([`applier`], [`conflict`], [`context`]): running each
//!   plugin's extension callbacks against the host's [`SharedContext`] and
//!   resolving collisions on contributed properties per the writer's
//!   [`ConflictStrategy`].
//! - **Lifecycle** ([`lifecycle`]): the before-run, after-run and on-error
//!   hook passes, each with its own failure semantics.
//!
//! [`PluginOrchestrator`] ties these together for one batch. Non-fatal
//! problems go to a [`WarningSink`] ([`warning`]).
//!
//! Locating, loading and validating plugin code is the host's job; this
//! module never touches the filesystem.
pub mod applier;
pub mod conflict;
pub mod context;
pub mod dependency;
pub mod error;
pub mod lifecycle;
pub mod orchestrator;
pub mod record;
pub mod warning;

pub use applier::{ApplyError, ApplyReport, ExtensionApplier};
pub use conflict::{ConflictError, ConflictOutcome, ConflictRecord, ConflictResolver, OwnershipMap};
pub use context::{ContextValue, FunctionRef, PropertyPath, PropertyWrite, SharedContext};
pub use dependency::{DependencyResolver, OrderingError, ResolvedOrder};
pub use error::PluginSystemError;
pub use lifecycle::{HookError, HookFailure, LifecycleContext, LifecycleDispatcher, LifecyclePass, PassSummary, RunError};
pub use orchestrator::{BatchState, PluginOrchestrator};
pub use record::{BoxError, ConflictStrategy, ExtensionCallback, LifecycleHook, PluginHooks, PluginRecord, extension_fn, hook_fn};
pub use warning::{CollectingWarningSink, LogWarningSink, Warning, WarningSink};

// Test module declaration
#[cfg(test)]
mod tests;
