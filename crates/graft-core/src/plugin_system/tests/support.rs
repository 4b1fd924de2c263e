// Shared helpers for plugin system tests
#![cfg(test)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::plugin_system::{
    BoxError, ContextValue, DependencyResolver, ExtensionCallback, LifecycleContext, LifecycleHook,
    PluginRecord, PropertyWrite, ResolvedOrder, extension_fn,
};

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Hook that appends its label to a shared log, optionally failing afterwards.
pub struct RecordingHook {
    log: EventLog,
    label: String,
    fail: bool,
}

#[async_trait]
impl LifecycleHook for RecordingHook {
    async fn call(&self, context: &LifecycleContext) -> Result<(), BoxError> {
        // Suspend once so ordering is checked across real await points.
        tokio::task::yield_now().await;
        let entry = match context.error() {
            Some(err) => format!("{} ({})", self.label, err),
            None => self.label.clone(),
        };
        self.log.lock().unwrap().push(entry);
        if self.fail {
            return Err(format!("{} failed", self.label).into());
        }
        Ok(())
    }
}

pub fn recording_hook(log: &EventLog, label: &str) -> Arc<dyn LifecycleHook> {
    Arc::new(RecordingHook {
        log: Arc::clone(log),
        label: label.to_string(),
        fail: false,
    })
}

pub fn failing_hook(log: &EventLog, label: &str) -> Arc<dyn LifecycleHook> {
    Arc::new(RecordingHook {
        log: Arc::clone(log),
        label: label.to_string(),
        fail: true,
    })
}

/// Extension returning a fixed list of writes.
pub fn writes(writes: Vec<PropertyWrite>) -> Arc<dyn ExtensionCallback> {
    extension_fn(move |_| Ok(writes.clone()))
}

/// Extension setting a single property.
pub fn set(namespace: &str, key: &str, value: impl Into<ContextValue>) -> Arc<dyn ExtensionCallback> {
    writes(vec![PropertyWrite::new(namespace, key, value)])
}

pub fn failing_extension(message: &str) -> Arc<dyn ExtensionCallback> {
    let message = message.to_string();
    extension_fn(move |_| Err(message.clone().into()))
}

pub fn resolve(records: Vec<PluginRecord>) -> ResolvedOrder {
    DependencyResolver::new()
        .resolve(records)
        .expect("batch should resolve")
}
