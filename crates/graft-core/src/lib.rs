pub mod kernel;
pub mod plugin_system;

// Re-export key public types/traits for easier use by hosts and plugins
pub use kernel::error::{Error, Result};
pub use plugin_system::{
    ConflictStrategy, ContextValue, LifecycleContext, PluginOrchestrator, PluginRecord, PropertyWrite,
    SharedContext,
};
