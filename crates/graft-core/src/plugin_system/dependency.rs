//! # Dependency Resolution
//!
//! Turns one unordered batch of [`PluginRecord`]s into a single total order:
//! every plugin comes after the plugins it depends on, and otherwise plugins
//! are ordered by descending priority with ties kept in batch order.
//!
//! Validation happens before any ordering work. A missing dependency or a
//! cycle fails the whole batch; no partial order is ever produced.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;

use crate::plugin_system::record::PluginRecord;

/// Error that can occur when ordering a batch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderingError {
    /// Dependency cycle detected; the path starts and ends with the same plugin
    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),

    /// A declared dependency is not part of the batch
    #[error("Plugin '{plugin}' depends on '{dependency}', which is not loaded")]
    MissingDependency { plugin: String, dependency: String },
}

/// The resolved, immutable plugin order for one batch.
#[derive(Debug, Clone, Default)]
pub struct ResolvedOrder {
    plugins: Vec<Arc<PluginRecord>>,
}

impl ResolvedOrder {
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<PluginRecord>> {
        self.plugins.iter()
    }

    /// Plugin names in resolved order.
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<PluginRecord>> {
        self.plugins.iter().find(|p| p.name() == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.plugins.iter().position(|p| p.name() == name)
    }
}

impl<'a> IntoIterator for &'a ResolvedOrder {
    type Item = &'a Arc<PluginRecord>;
    type IntoIter = std::slice::Iter<'a, Arc<PluginRecord>>;

    fn into_iter(self) -> Self::IntoIter {
        self.plugins.iter()
    }
}

/// Computes the resolved order of a batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct DependencyResolver;

impl DependencyResolver {
    pub fn new() -> Self {
        Self
    }

    /// Validate the batch and compute its order.
    pub fn resolve<I>(&self, records: I) -> Result<ResolvedOrder, OrderingError>
    where
        I: IntoIterator<Item = PluginRecord>,
    {
        let batch: Vec<Arc<PluginRecord>> = records.into_iter().map(Arc::new).collect();
        let index: HashMap<&str, usize> = batch
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name(), i))
            .collect();

        self.validate(&batch, &index)?;

        // Stable: equal priorities keep batch order.
        let mut by_priority: Vec<usize> = (0..batch.len()).collect();
        by_priority.sort_by(|&a, &b| batch[b].priority().cmp(&batch[a].priority()));

        let mut placed = HashSet::new();
        let mut order = Vec::with_capacity(batch.len());
        for idx in by_priority {
            Self::place(idx, &batch, &index, &mut placed, &mut order);
        }

        log::debug!(
            "Resolved plugin order: [{}]",
            order.iter().map(|&i| batch[i].name()).collect::<Vec<_>>().join(", ")
        );

        Ok(ResolvedOrder {
            plugins: order.into_iter().map(|i| Arc::clone(&batch[i])).collect(),
        })
    }

    /// Depth-first walk over every plugin, reporting the first missing
    /// dependency or cycle encountered in batch order.
    ///
    /// The walk keeps its own stack of `(plugin, next dependency)` frames so
    /// chain length is not bounded by the call stack.
    fn validate(
        &self,
        batch: &[Arc<PluginRecord>],
        index: &HashMap<&str, usize>,
    ) -> Result<(), OrderingError> {
        let mut visited = HashSet::new();
        let mut on_path = HashSet::new();
        let mut path: Vec<(usize, usize)> = Vec::new();

        for root in 0..batch.len() {
            if visited.contains(&root) {
                continue;
            }
            path.push((root, 0));
            on_path.insert(root);

            while let Some(frame) = path.last_mut() {
                let (idx, next) = *frame;
                let plugin = &batch[idx];
                let Some(dep) = plugin.dependencies().get(next) else {
                    path.pop();
                    on_path.remove(&idx);
                    visited.insert(idx);
                    continue;
                };
                frame.1 += 1;

                let dep_idx = match index.get(dep.as_str()) {
                    Some(&i) => i,
                    None => {
                        return Err(OrderingError::MissingDependency {
                            plugin: plugin.name().to_string(),
                            dependency: dep.clone(),
                        });
                    }
                };

                if on_path.contains(&dep_idx) {
                    let start = path.iter().position(|&(i, _)| i == dep_idx).unwrap_or(0);
                    let mut cycle: Vec<String> = path[start..]
                        .iter()
                        .map(|&(i, _)| batch[i].name().to_string())
                        .collect();
                    cycle.push(batch[dep_idx].name().to_string());
                    return Err(OrderingError::CircularDependency(cycle));
                }

                if !visited.contains(&dep_idx) {
                    path.push((dep_idx, 0));
                    on_path.insert(dep_idx);
                }
            }
        }
        Ok(())
    }

    /// Append `root` after pulling its dependencies in first. Assumes the
    /// batch has already been validated.
    fn place(
        root: usize,
        batch: &[Arc<PluginRecord>],
        index: &HashMap<&str, usize>,
        placed: &mut HashSet<usize>,
        order: &mut Vec<usize>,
    ) {
        if !placed.insert(root) {
            return;
        }
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        while let Some(frame) = stack.last_mut() {
            let (idx, next) = *frame;
            match batch[idx].dependencies().get(next) {
                Some(dep) => {
                    frame.1 += 1;
                    if let Some(&dep_idx) = index.get(dep.as_str()) {
                        if placed.insert(dep_idx) {
                            stack.push((dep_idx, 0));
                        }
                    }
                }
                None => {
                    stack.pop();
                    order.push(idx);
                }
            }
        }
    }
}
