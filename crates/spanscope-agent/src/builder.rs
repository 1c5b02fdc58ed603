use crate::agent::{Agent, DEFAULT_TAGS};
use spanscope_core::{Error, Llm, Result, SpanScopeConfig};
use spanscope_telemetry::Tracer;
use spanscope_tool::ToolRegistry;
use std::sync::Arc;

const DEFAULT_MAX_ITERATIONS: usize = 10;

pub struct AgentBuilder {
    name: Option<String>,
    model: Option<Arc<dyn Llm>>,
    model_name: Option<String>,
    registry: Option<Arc<ToolRegistry>>,
    tracer: Option<Tracer>,
    system_instruction: Option<String>,
    max_iterations: usize,
    tags: Vec<String>,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            model: None,
            model_name: None,
            registry: None,
            tracer: None,
            system_instruction: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tags: DEFAULT_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Take model name, system instruction and iteration cap from configuration
    pub fn config(mut self, config: &SpanScopeConfig) -> Self {
        self.model_name = Some(config.model.model_name.clone());
        self.system_instruction = Some(config.agent.system_instruction.clone());
        self.max_iterations = config.agent.max_iterations;
        self
    }

    /// Name of the root span of every run
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn model(mut self, model: Arc<dyn Llm>) -> Self {
        self.model = Some(model);
        self
    }

    /// Model identifier sent to the gateway (defaults to the model's own name)
    pub fn model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    pub fn registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn tracer(mut self, tracer: Tracer) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Replace the default tags put on every trace
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<Agent> {
        let model = self
            .model
            .ok_or_else(|| Error::Config("Model is required".to_string()))?;
        let tracer = self
            .tracer
            .ok_or_else(|| Error::Config("Tracer is required".to_string()))?;
        if self.max_iterations == 0 {
            return Err(Error::Config(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        let model_name = self
            .model_name
            .unwrap_or_else(|| model.name().to_string());

        Ok(Agent {
            name: self.name.unwrap_or_else(|| "run_agent".to_string()),
            model,
            model_name,
            registry: self.registry.unwrap_or_default(),
            tracer,
            system_instruction: self.system_instruction,
            max_iterations: self.max_iterations,
            tags: self.tags,
        })
    }
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
