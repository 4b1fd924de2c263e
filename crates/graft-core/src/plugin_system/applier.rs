//! # Extension Application
//!
//! Walks a [`ResolvedOrder`] once, running every extension callback of every
//! plugin against the shared context and committing the writes each callback
//! returns after conflict resolution.
//!
//! Application is forward-only. A failing callback or a rejected write stops
//! the pass immediately, and writes already committed stay in the context.
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use thiserror::Error;

use crate::plugin_system::conflict::{ConflictError, ConflictOutcome, ConflictRecord, ConflictResolver};
use crate::plugin_system::context::{PropertyPath, PropertyWrite, SharedContext};
use crate::plugin_system::dependency::ResolvedOrder;
use crate::plugin_system::record::BoxError;
use crate::plugin_system::warning::{LogWarningSink, Warning, WarningSink};

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("Extension callback #{index} of plugin '{plugin}' failed: {source}")]
    CallbackFailed {
        plugin: String,
        index: usize,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    ConflictRejected(#[from] ConflictError),
}

impl ApplyError {
    /// Name of the plugin whose callback or write aborted the pass.
    pub fn plugin(&self) -> &str {
        match self {
            ApplyError::CallbackFailed { plugin, .. } => plugin,
            ApplyError::ConflictRejected(err) => &err.writer,
        }
    }
}

/// Summary of a completed apply pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    /// Every cross-plugin collision, in the order it was resolved.
    pub conflicts: Vec<ConflictRecord>,
    /// Final owner of each property written during the pass.
    pub ownership: BTreeMap<PropertyPath, String>,
    pub callbacks_invoked: usize,
    pub writes_committed: usize,
}

impl ApplyReport {
    /// Collisions that produced a warning.
    pub fn warned_conflicts(&self) -> impl Iterator<Item = &ConflictRecord> {
        self.conflicts.iter().filter(|c| c.outcome.requires_warning())
    }
}

/// Applies extension callbacks in resolved order.
pub struct ExtensionApplier {
    warnings: Arc<dyn WarningSink>,
}

impl Default for ExtensionApplier {
    fn default() -> Self {
        Self::new(Arc::new(LogWarningSink))
    }
}

impl ExtensionApplier {
    pub fn new(warnings: Arc<dyn WarningSink>) -> Self {
        Self { warnings }
    }

    pub async fn apply(
        &self,
        order: &ResolvedOrder,
        context: &mut SharedContext,
    ) -> Result<ApplyReport, ApplyError> {
        let mut resolver = ConflictResolver::new();
        let mut report = ApplyReport::default();

        for plugin in order {
            log::debug!("Applying extensions of plugin '{}'", plugin.name());
            for (index, callback) in plugin.extensions().iter().enumerate() {
                let writes = callback
                    .extend(&*context)
                    .await
                    .map_err(|source| ApplyError::CallbackFailed {
                        plugin: plugin.name().to_string(),
                        index,
                        source,
                    })?;
                report.callbacks_invoked += 1;

                for write in collapse_writes(writes) {
                    let previous = context.get_path(&write.path).cloned();
                    if previous.as_ref() == Some(&write.value) {
                        continue;
                    }

                    let resolution = resolver.resolve(
                        &write.path,
                        previous.as_ref(),
                        write.value,
                        plugin.name(),
                        plugin.conflict_strategy(),
                    )?;

                    if let Some(conflict) = resolution.conflict {
                        self.warn_if_needed(&conflict, previous.as_ref().map(|v| v.kind()), resolution.value.kind());
                        report.conflicts.push(conflict);
                    }

                    context.set(write.path, resolution.value);
                    report.writes_committed += 1;
                }
            }
        }

        report.ownership = resolver.ownership().snapshot();
        log::info!(
            "Applied {} extension callback(s) from {} plugin(s), {} conflict(s)",
            report.callbacks_invoked,
            order.len(),
            report.conflicts.len()
        );
        Ok(report)
    }

    fn warn_if_needed(&self, conflict: &ConflictRecord, previous_kind: Option<&'static str>, new_kind: &'static str) {
        match conflict.outcome {
            ConflictOutcome::Overridden => self.warnings.warn(Warning::PropertyOverridden {
                path: conflict.path.clone(),
                previous_owner: conflict.previous_owner.clone(),
                new_owner: conflict.writer.clone(),
            }),
            ConflictOutcome::MergeFallback => self.warnings.warn(Warning::MergeFallback {
                path: conflict.path.clone(),
                previous_owner: conflict.previous_owner.clone(),
                new_owner: conflict.writer.clone(),
                previous_kind: previous_kind.unwrap_or("null"),
                new_kind,
            }),
            ConflictOutcome::Claimed | ConflictOutcome::Merged | ConflictOutcome::SilentOverride => {}
        }
    }
}

/// Collapse repeated writes to one path, keeping first position and last value.
fn collapse_writes(writes: Vec<PropertyWrite>) -> Vec<PropertyWrite> {
    let mut positions: HashMap<PropertyPath, usize> = HashMap::new();
    let mut collapsed: Vec<PropertyWrite> = Vec::with_capacity(writes.len());
    for write in writes {
        match positions.get(&write.path) {
            Some(&i) => collapsed[i].value = write.value,
            None => {
                positions.insert(write.path.clone(), collapsed.len());
                collapsed.push(write);
            }
        }
    }
    collapsed
}
