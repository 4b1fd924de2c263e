/// Application name
pub const APP_NAME: &str = "Graft";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Namespaces a host exposes to plugins unless configured otherwise
pub const DEFAULT_NAMESPACES: &[&str] = &["global", "host", "workspace", "parsers"];
