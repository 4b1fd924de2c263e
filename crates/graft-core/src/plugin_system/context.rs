//! # Shared Context
//!
//! The host-owned collection of named namespaces that plugins contribute
//! into. Each namespace maps string keys to a [`ContextValue`], a closed set
//! of variants that is just rich enough to express the MERGE rule of the
//! conflict resolver (scalars, sequences, mappings and function references).
//!
//! Extension callbacks never mutate a [`SharedContext`] directly. They read
//! it and return a list of [`PropertyWrite`]s, which the applier routes
//! through conflict resolution before committing.
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Namespace contents: key -> value, ordered for deterministic output.
pub type Namespace = BTreeMap<String, ContextValue>;

/// Signature of a function contributed into a namespace.
pub type NativeFunction = dyn Fn(&[ContextValue]) -> ContextValue + Send + Sync;

/// A named, shareable function value.
///
/// Two references are equal only when they point at the same function
/// allocation and carry the same name.
#[derive(Clone)]
pub struct FunctionRef {
    name: String,
    func: Arc<NativeFunction>,
}

impl FunctionRef {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[ContextValue]) -> ContextValue + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the underlying function.
    pub fn call(&self, args: &[ContextValue]) -> ContextValue {
        (self.func)(args)
    }
}

impl PartialEq for FunctionRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRef").field("name", &self.name).finish_non_exhaustive()
    }
}

/// A value stored under a namespace key.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ContextValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    /// Ordered sequence; MERGE concatenates these.
    Sequence(Vec<ContextValue>),
    /// Key-value mapping; MERGE combines these key by key.
    Mapping(BTreeMap<String, ContextValue>),
    Function(FunctionRef),
}

impl ContextValue {
    /// Anything that is neither a sequence nor a mapping.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, ContextValue::Sequence(_) | ContextValue::Mapping(_))
    }

    pub fn as_sequence(&self) -> Option<&[ContextValue]> {
        match self {
            ContextValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&BTreeMap<String, ContextValue>> {
        match self {
            ContextValue::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Short name of the variant, used in log and warning messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ContextValue::Null => "null",
            ContextValue::Bool(_) => "bool",
            ContextValue::Integer(_) => "integer",
            ContextValue::Float(_) => "float",
            ContextValue::Text(_) => "text",
            ContextValue::Sequence(_) => "sequence",
            ContextValue::Mapping(_) => "mapping",
            ContextValue::Function(_) => "function",
        }
    }

    /// Render as JSON. Function references become `"<function NAME>"`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ContextValue::Null => serde_json::Value::Null,
            ContextValue::Bool(b) => serde_json::Value::Bool(*b),
            ContextValue::Integer(i) => serde_json::Value::from(*i),
            ContextValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ContextValue::Text(s) => serde_json::Value::String(s.clone()),
            ContextValue::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(ContextValue::to_json).collect())
            }
            ContextValue::Mapping(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            ContextValue::Function(func) => {
                serde_json::Value::String(format!("<function {}>", func.name()))
            }
        }
    }
}

/// Integers outside the `i64` range become [`ContextValue::Text`] holding
/// their exact decimal digits rather than a lossy float.
impl From<serde_json::Value> for ContextValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ContextValue::Null,
            serde_json::Value::Bool(b) => ContextValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => ContextValue::Integer(i),
                None if n.is_u64() => ContextValue::Text(n.to_string()),
                None => ContextValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => ContextValue::Text(s),
            serde_json::Value::Array(items) => {
                ContextValue::Sequence(items.into_iter().map(ContextValue::from).collect())
            }
            serde_json::Value::Object(map) => ContextValue::Mapping(
                map.into_iter().map(|(k, v)| (k, ContextValue::from(v))).collect(),
            ),
        }
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        ContextValue::Bool(b)
    }
}

impl From<i64> for ContextValue {
    fn from(i: i64) -> Self {
        ContextValue::Integer(i)
    }
}

impl From<i32> for ContextValue {
    fn from(i: i32) -> Self {
        ContextValue::Integer(i64::from(i))
    }
}

impl From<f64> for ContextValue {
    fn from(f: f64) -> Self {
        ContextValue::Float(f)
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        ContextValue::Text(s.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        ContextValue::Text(s)
    }
}

impl From<FunctionRef> for ContextValue {
    fn from(func: FunctionRef) -> Self {
        ContextValue::Function(func)
    }
}

impl<T: Into<ContextValue>> From<Vec<T>> for ContextValue {
    fn from(items: Vec<T>) -> Self {
        ContextValue::Sequence(items.into_iter().map(Into::into).collect())
    }
}

/// Address of one contributed property: `namespace.key`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyPath {
    pub namespace: String,
    pub key: String,
}

impl PropertyPath {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.key)
    }
}

/// One write requested by an extension callback.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyWrite {
    pub path: PropertyPath,
    pub value: ContextValue,
}

impl PropertyWrite {
    pub fn new(namespace: &str, key: &str, value: impl Into<ContextValue>) -> Self {
        Self {
            path: PropertyPath::new(namespace, key),
            value: value.into(),
        }
    }
}

/// Host-owned set of named namespaces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedContext {
    namespaces: BTreeMap<String, Namespace>,
}

impl SharedContext {
    /// Create an empty context with no namespaces.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context pre-populated with empty namespaces.
    pub fn with_namespaces<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespaces: names.into_iter().map(|n| (n.into(), Namespace::new())).collect(),
        }
    }

    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.get(name)
    }

    pub fn namespace_names(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    pub fn has_namespace(&self, name: &str) -> bool {
        self.namespaces.contains_key(name)
    }

    pub fn get(&self, namespace: &str, key: &str) -> Option<&ContextValue> {
        self.namespaces.get(namespace).and_then(|ns| ns.get(key))
    }

    pub fn get_path(&self, path: &PropertyPath) -> Option<&ContextValue> {
        self.get(&path.namespace, &path.key)
    }

    /// Store a value, creating the namespace if it does not exist yet.
    /// Returns the previous value, if any.
    pub fn set(&mut self, path: PropertyPath, value: ContextValue) -> Option<ContextValue> {
        self.namespaces
            .entry(path.namespace)
            .or_default()
            .insert(path.key, value)
    }

    /// Render every namespace as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.namespaces
                .iter()
                .map(|(name, ns)| {
                    let obj = ns.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
                    (name.clone(), serde_json::Value::Object(obj))
                })
                .collect(),
        )
    }
}
