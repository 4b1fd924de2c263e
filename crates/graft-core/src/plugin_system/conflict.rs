//! # Property Conflict Resolution
//!
//! Decides what happens when a plugin writes a property that another plugin
//! already owns. The decision is driven by the *writing* plugin's
//! [`ConflictStrategy`]. The resolver is pure with respect to the shared
//! context: it computes the value to commit and the outcome, and leaves
//! committing and warning to the caller.
//!
//! When plugins contending for the same key declare different strategies,
//! the outcome depends on which of them is processed last, not on their
//! relative priority. Only a key contested exclusively under `PRIORITY`
//! resolves in strict priority terms.
use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::plugin_system::context::{ContextValue, PropertyPath};
use crate::plugin_system::record::ConflictStrategy;

/// A write rejected under the `ERROR` strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Conflict on '{path}': plugin '{writer}' attempted to overwrite a property owned by plugin '{owner}'")]
pub struct ConflictError {
    pub path: PropertyPath,
    pub owner: String,
    pub writer: String,
}

/// Which plugin currently owns each property, for one apply pass.
#[derive(Debug, Clone, Default)]
pub struct OwnershipMap {
    owners: HashMap<PropertyPath, String>,
}

impl OwnershipMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(&self, path: &PropertyPath) -> Option<&str> {
        self.owners.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    fn assign(&mut self, path: &PropertyPath, plugin: &str) {
        match self.owners.get_mut(path) {
            Some(owner) if owner == plugin => {}
            Some(owner) => *owner = plugin.to_string(),
            None => {
                self.owners.insert(path.clone(), plugin.to_string());
            }
        }
    }

    /// Sorted copy of the ownership table.
    pub fn snapshot(&self) -> BTreeMap<PropertyPath, String> {
        self.owners.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

/// What the resolver did with one write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictOutcome {
    /// No competing owner; the writer now owns the property.
    Claimed,
    /// `WARN_OVERRIDE`: new value taken, a warning is due.
    Overridden,
    /// `MERGE`: values combined.
    Merged,
    /// `MERGE` on incompatible shapes: new value taken, a warning is due.
    MergeFallback,
    /// `PRIORITY`: new value taken silently.
    SilentOverride,
}

impl ConflictOutcome {
    /// Whether the host should be told about this outcome.
    pub fn requires_warning(&self) -> bool {
        matches!(self, ConflictOutcome::Overridden | ConflictOutcome::MergeFallback)
    }
}

/// Audit entry for one cross-plugin collision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRecord {
    pub path: PropertyPath,
    pub previous_owner: String,
    pub writer: String,
    pub strategy: ConflictStrategy,
    pub outcome: ConflictOutcome,
}

/// Result of resolving one write.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Value to commit.
    pub value: ContextValue,
    pub outcome: ConflictOutcome,
    /// Present only for genuine cross-plugin collisions.
    pub conflict: Option<ConflictRecord>,
}

/// Resolves writes against the ownership history of one apply pass.
#[derive(Debug, Default)]
pub struct ConflictResolver {
    ownership: OwnershipMap,
}

impl ConflictResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ownership(&self) -> &OwnershipMap {
        &self.ownership
    }

    pub fn into_ownership(self) -> OwnershipMap {
        self.ownership
    }

    /// Resolve a write of `incoming` to `path` by `writer`.
    ///
    /// `previous` is the value the property held before the writer's
    /// callback ran. On `Err` nothing is recorded.
    pub fn resolve(
        &mut self,
        path: &PropertyPath,
        previous: Option<&ContextValue>,
        incoming: ContextValue,
        writer: &str,
        strategy: ConflictStrategy,
    ) -> Result<Resolution, ConflictError> {
        let owner = match self.ownership.owner(path) {
            Some(owner) if owner != writer => owner.to_string(),
            _ => {
                self.ownership.assign(path, writer);
                return Ok(Resolution {
                    value: incoming,
                    outcome: ConflictOutcome::Claimed,
                    conflict: None,
                });
            }
        };

        let (value, outcome) = match strategy {
            ConflictStrategy::WarnOverride => (incoming, ConflictOutcome::Overridden),
            ConflictStrategy::Error => {
                return Err(ConflictError {
                    path: path.clone(),
                    owner,
                    writer: writer.to_string(),
                });
            }
            ConflictStrategy::Merge => match previous {
                None => (incoming, ConflictOutcome::Merged),
                Some(prev) => match merge_values(prev, &incoming) {
                    Some(merged) => (merged, ConflictOutcome::Merged),
                    None => (incoming, ConflictOutcome::MergeFallback),
                },
            },
            ConflictStrategy::Priority => (incoming, ConflictOutcome::SilentOverride),
        };

        self.ownership.assign(path, writer);
        log::debug!(
            "Conflict on '{}': '{}' -> '{}' ({}, {:?})",
            path,
            owner,
            writer,
            strategy,
            outcome
        );

        Ok(Resolution {
            value,
            outcome,
            conflict: Some(ConflictRecord {
                path: path.clone(),
                previous_owner: owner,
                writer: writer.to_string(),
                strategy,
                outcome,
            }),
        })
    }
}

/// Merge two values under the `MERGE` rule.
///
/// Sequences concatenate (old then new, duplicates kept). Mappings merge key
/// by key, recursing where both sides hold sequences or both hold mappings
/// and letting the new side win otherwise. Returns `None` when the two
/// top-level values are not both sequences or both mappings.
pub fn merge_values(old: &ContextValue, new: &ContextValue) -> Option<ContextValue> {
    match (old, new) {
        (ContextValue::Sequence(a), ContextValue::Sequence(b)) => {
            let mut items = Vec::with_capacity(a.len() + b.len());
            items.extend(a.iter().cloned());
            items.extend(b.iter().cloned());
            Some(ContextValue::Sequence(items))
        }
        (ContextValue::Mapping(a), ContextValue::Mapping(b)) => {
            let mut merged = a.clone();
            for (key, new_val) in b {
                let value = match merged.get(key) {
                    Some(old_val) => {
                        merge_values(old_val, new_val).unwrap_or_else(|| new_val.clone())
                    }
                    None => new_val.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Some(ContextValue::Mapping(merged))
        }
        _ => None,
    }
}
