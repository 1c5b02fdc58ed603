use spanscope_core::{ParameterSpec, ParameterType, ToolDefinition};
use std::collections::BTreeMap;

/// Builder for a tool's declared contract
#[derive(Debug, Clone)]
pub struct ToolSchema {
    name: String,
    description: String,
    parameters: BTreeMap<String, ParameterSpec>,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn property(
        mut self,
        name: impl Into<String>,
        param_type: ParameterType,
        description: impl Into<String>,
    ) -> Self {
        self.parameters.insert(
            name.into(),
            ParameterSpec {
                param_type,
                description: description.into(),
                required: false,
                default: None,
                allowed: None,
            },
        );
        self
    }

    /// Mark a declared property as required. Unknown names are ignored.
    pub fn required(mut self, name: &str) -> Self {
        if let Some(spec) = self.parameters.get_mut(name) {
            spec.required = true;
        }
        self
    }

    pub fn default_value(mut self, name: &str, value: serde_json::Value) -> Self {
        if let Some(spec) = self.parameters.get_mut(name) {
            spec.default = Some(value);
        }
        self
    }

    /// Restrict a string property to a fixed set of values
    pub fn one_of<I, S>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(spec) = self.parameters.get_mut(name) {
            spec.allowed = Some(values.into_iter().map(Into::into).collect());
        }
        self
    }

    pub fn build(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name,
            description: self.description,
            parameters: self.parameters,
        }
    }
}
