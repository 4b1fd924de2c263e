//! Side-channel for non-fatal problems: property overrides, merge
//! fallbacks, and hook failures collected by the fail-soft lifecycle passes.
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::plugin_system::context::PropertyPath;
use crate::plugin_system::lifecycle::{HookFailure, LifecyclePass};

#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// A `WARN_OVERRIDE` writer replaced another plugin's property.
    PropertyOverridden {
        path: PropertyPath,
        previous_owner: String,
        new_owner: String,
    },
    /// A `MERGE` writer hit incompatible shapes and replaced the value.
    MergeFallback {
        path: PropertyPath,
        previous_owner: String,
        new_owner: String,
        previous_kind: &'static str,
        new_kind: &'static str,
    },
    /// Hooks failed during a fail-soft pass.
    HookFailures {
        pass: LifecyclePass,
        failures: Vec<HookFailure>,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::PropertyOverridden { path, previous_owner, new_owner } => write!(
                f,
                "Plugin '{}' overrides '{}' previously set by plugin '{}'",
                new_owner, path, previous_owner
            ),
            Warning::MergeFallback { path, previous_owner, new_owner, previous_kind, new_kind } => write!(
                f,
                "Plugin '{}' cannot merge {} into {} at '{}' (owned by plugin '{}'); overriding",
                new_owner, new_kind, previous_kind, path, previous_owner
            ),
            Warning::HookFailures { pass, failures } => {
                write!(f, "{} {} hook(s) failed:", failures.len(), pass)?;
                for failure in failures {
                    write!(f, "\n  - {}", failure)?;
                }
                Ok(())
            }
        }
    }
}

/// Receiver for warnings raised by the orchestration engine.
pub trait WarningSink: Send + Sync {
    fn warn(&self, warning: Warning);
}

/// Forwards every warning to `log::warn!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWarningSink;

impl WarningSink for LogWarningSink {
    fn warn(&self, warning: Warning) {
        log::warn!("{}", warning);
    }
}

/// Keeps warnings in memory. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct CollectingWarningSink {
    warnings: Arc<Mutex<Vec<Warning>>>,
}

impl CollectingWarningSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything received so far.
    pub fn warnings(&self) -> Vec<Warning> {
        match self.warnings.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.warnings().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl WarningSink for CollectingWarningSink {
    fn warn(&self, warning: Warning) {
        log::warn!("{}", warning);
        match self.warnings.lock() {
            Ok(mut guard) => guard.push(warning),
            Err(poisoned) => poisoned.into_inner().push(warning),
        }
    }
}
