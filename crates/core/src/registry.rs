use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Execution error: {0}")]
    Execution(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityOutput {
    pub success: bool,
    pub output: Value,
}

impl CapabilityOutput {
    pub fn ok(output: Value) -> Self {
        Self {
            success: true,
            output,
        }
    }

    /// The handler ran but produced nothing (e.g. a compressor declining a file).
    pub fn empty() -> Self {
        Self {
            success: false,
            output: Value::Null,
        }
    }
}

/// A registered operation. `parameters` is the declared parameter set: the engine
/// passes exactly these keys from the run context and nothing else.
#[async_trait]
pub trait Capability: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> &[&'static str];

    async fn invoke(&self, args: Value) -> Result<CapabilityOutput, CapabilityError>;
}

/// Global parameter context shared by all steps of a run.
#[derive(Debug, Clone, Default)]
pub struct ParamContext {
    values: Map<String, Value>,
}

impl ParamContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Select the declared keys; anything else in the context is dropped.
    pub fn filter(&self, declared: &[&str]) -> Value {
        let filtered: Map<String, Value> = self
            .values
            .iter()
            .filter(|(key, _)| declared.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Value::Object(filtered)
    }
}

pub struct CapabilityRegistry {
    capabilities: HashMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            capabilities: HashMap::new(),
        }
    }

    pub fn register(&mut self, capability: Arc<dyn Capability>) -> &mut Self {
        self.capabilities
            .insert(capability.name().to_string(), capability);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.capabilities.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.capabilities.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Function catalogue handed to the planning oracle.
    pub fn descriptions(&self) -> String {
        let mut entries: Vec<(&String, &Arc<dyn Capability>)> = self.capabilities.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
            .iter()
            .enumerate()
            .map(|(i, (name, capability))| {
                format!(
                    "{}. {}({}): {}",
                    i + 1,
                    name,
                    capability.parameters().join(", "),
                    capability.description()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
