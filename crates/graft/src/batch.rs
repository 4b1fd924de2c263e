//! Declarative plugin batches.
//!
//! The host stands in for a real plugin loader: each entry of a batch file
//! becomes one [`PluginRecord`] whose extension writes its static
//! `contributions` and whose hooks print their configured messages.
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use graft_core::plugin_system::{
    BoxError, ConflictStrategy, ExtensionCallback, LifecycleContext, LifecycleHook, LifecyclePass, PluginRecord,
    PropertyWrite, SharedContext,
};
use graft_core::Result;

use crate::config::load_file;

/// Prefix that turns a hook message into a failing hook.
pub const FAIL_PREFIX: &str = "fail:";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchFile {
    #[serde(default)]
    pub plugins: Vec<PluginEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginEntry {
    pub name: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Falls back to the host's configured default when absent.
    #[serde(default)]
    pub conflict_strategy: Option<ConflictStrategy>,
    /// namespace -> key -> value
    #[serde(default)]
    pub contributions: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    pub hooks: HookMessages,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookMessages {
    #[serde(default)]
    pub before_run: Vec<String>,
    #[serde(default)]
    pub after_run: Vec<String>,
    #[serde(default)]
    pub on_error: Vec<String>,
}

impl BatchFile {
    pub fn load(path: &Path) -> Result<Self> {
        let batch: BatchFile = load_file(path)?;
        log::debug!("Loaded {} plugin entries from {}", batch.plugins.len(), path.display());
        Ok(batch)
    }

    /// Build one record per entry, in file order.
    pub fn into_records(self, default_strategy: ConflictStrategy) -> Vec<PluginRecord> {
        self.plugins
            .into_iter()
            .map(|entry| entry.into_record(default_strategy))
            .collect()
    }
}

impl PluginEntry {
    fn into_record(self, default_strategy: ConflictStrategy) -> PluginRecord {
        let mut record = PluginRecord::new(self.name.clone())
            .with_priority(self.priority)
            .with_conflict_strategy(self.conflict_strategy.unwrap_or(default_strategy));
        for dependency in self.dependencies {
            record = record.depends_on(dependency);
        }

        if !self.contributions.is_empty() {
            record = record.with_extension(Arc::new(StaticContribution::new(self.contributions)));
        }

        for message in self.hooks.before_run {
            record = record.on_before_run(MessageHook::shared(&self.name, LifecyclePass::BeforeRun, message));
        }
        for message in self.hooks.after_run {
            record = record.on_after_run(MessageHook::shared(&self.name, LifecyclePass::AfterRun, message));
        }
        for message in self.hooks.on_error {
            record = record.on_error(MessageHook::shared(&self.name, LifecyclePass::OnError, message));
        }
        record
    }
}

/// Extension that writes a fixed set of properties.
pub struct StaticContribution {
    writes: Vec<PropertyWrite>,
}

impl StaticContribution {
    pub fn new(contributions: BTreeMap<String, BTreeMap<String, serde_json::Value>>) -> Self {
        let writes = contributions
            .into_iter()
            .flat_map(|(namespace, values)| {
                values
                    .into_iter()
                    .map(move |(key, value)| PropertyWrite::new(&namespace, &key, value))
            })
            .collect();
        Self { writes }
    }
}

#[async_trait]
impl ExtensionCallback for StaticContribution {
    async fn extend(&self, _context: &SharedContext) -> std::result::Result<Vec<PropertyWrite>, BoxError> {
        Ok(self.writes.clone())
    }
}

/// Hook that prints `[plugin] pass: message` to stdout.
///
/// A message starting with [`FAIL_PREFIX`] fails with the remainder as its
/// error text instead.
pub struct MessageHook {
    plugin: String,
    pass: LifecyclePass,
    message: String,
}

impl MessageHook {
    pub fn shared(plugin: &str, pass: LifecyclePass, message: String) -> Arc<dyn LifecycleHook> {
        Arc::new(Self {
            plugin: plugin.to_string(),
            pass,
            message,
        })
    }
}

#[async_trait]
impl LifecycleHook for MessageHook {
    async fn call(&self, context: &LifecycleContext) -> std::result::Result<(), BoxError> {
        if let Some(reason) = self.message.strip_prefix(FAIL_PREFIX) {
            return Err(reason.trim().to_string().into());
        }
        match context.error() {
            Some(error) => println!("[{}] {}: {} ({})", self.plugin, self.pass, self.message, error),
            None => println!("[{}] {}: {}", self.plugin, self.pass, self.message),
        }
        log::debug!("{} hook of '{}' ran", self.pass, self.plugin);
        Ok(())
    }
}
