use crate::report::{HarnessSummary, ScenarioReport, ScenarioVerdict};
use crate::scenario::{Scenario, script_for_query};
use spanscope_agent::testing::{ScriptedLlm, ScriptedTurn};
use spanscope_agent::{Agent, AgentRun, RunError, RunRequest};
use spanscope_core::{Error, Llm, Result, SpanScopeConfig};
use spanscope_inspect::{PollConfig, TraceInspector};
use spanscope_telemetry::{LangfuseConfig, LangfuseStore, TraceStore, Tracer, create_store};
use spanscope_tool::{ToolRegistry, default_registry};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Agent, tracer and inspector wired from one configuration
pub struct Harness {
    config: SpanScopeConfig,
    tracer: Tracer,
    inspector: TraceInspector,
    registry: Arc<ToolRegistry>,
    live_model: Option<Arc<dyn Llm>>,
}

impl Harness {
    /// Build from configuration: scripted model and in-memory store when
    /// mocked, OpenAI and the configured store otherwise.
    pub fn from_config(config: SpanScopeConfig) -> Result<Self> {
        let store = create_store(&config)?;
        Self::with_store(config, store)
    }

    /// Build around an explicit trace store
    pub fn with_store(config: SpanScopeConfig, store: Arc<dyn TraceStore>) -> Result<Self> {
        let live_model: Option<Arc<dyn Llm>> = if config.is_mocked() {
            None
        } else {
            Some(Arc::new(config.create_openai_provider()?))
        };

        tracing::info!(
            store = %store.name(),
            mocked = config.is_mocked(),
            model = %config.model.model_name,
            "Harness ready"
        );

        Ok(Self {
            inspector: TraceInspector::new(store.clone(), PollConfig::from(&config.inspector)),
            tracer: Tracer::new(store),
            registry: Arc::new(default_registry()?),
            live_model,
            config,
        })
    }

    pub fn config(&self) -> &SpanScopeConfig {
        &self.config
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn inspector(&self) -> &TraceInspector {
        &self.inspector
    }

    pub fn is_mocked(&self) -> bool {
        self.live_model.is_none()
    }

    /// Agent for one run; `script` is replayed when mocked and ignored when live
    pub fn agent(&self, script: Vec<ScriptedTurn>) -> Result<Agent> {
        let model: Arc<dyn Llm> = match &self.live_model {
            Some(model) => model.clone(),
            None => Arc::new(ScriptedLlm::new(script)),
        };

        Agent::builder()
            .config(&self.config)
            .model(model)
            .registry(self.registry.clone())
            .tracer(self.tracer.clone())
            .build()
    }

    /// Run an ad-hoc query
    pub async fn run_query(&self, request: RunRequest) -> std::result::Result<AgentRun, RunError> {
        let script = script_for_query(&request.query);
        let agent = self.agent(script).map_err(|error| RunError {
            error,
            trace_id: String::new(),
            trace_url: String::new(),
        })?;
        agent.run(request).await
    }

    /// Run one scenario and check its answer and trace shape
    pub async fn run_scenario(
        &self,
        scenario: &Scenario,
        cancel: Option<&CancellationToken>,
    ) -> ScenarioReport {
        let started = Instant::now();
        tracing::info!(scenario = %scenario.name, query = %scenario.query, "Running scenario");

        let mut report = ScenarioReport {
            name: scenario.name.clone(),
            verdict: ScenarioVerdict::Passed,
            trace_id: None,
            trace_url: None,
            answer: None,
            iterations: None,
            inspection: None,
            duration: Default::default(),
        };

        let agent = match self.agent(scenario.script.clone()) {
            Ok(agent) => agent,
            Err(e) => {
                report.verdict = ScenarioVerdict::Errored(e.to_string());
                report.duration = started.elapsed();
                return report;
            }
        };

        let run = match agent.run(scenario.request()).await {
            Ok(run) => run,
            Err(e) => {
                tracing::error!(scenario = %scenario.name, error = %e, "Scenario run failed");
                report.trace_id = Some(e.trace_id);
                report.trace_url = Some(e.trace_url);
                report.verdict = ScenarioVerdict::Errored(e.error.to_string());
                report.duration = started.elapsed();
                return report;
            }
        };

        report.trace_id = Some(run.trace_id.clone());
        report.trace_url = Some(run.trace_url.clone());
        report.iterations = Some(run.iterations);

        let mut failures: Vec<String> = scenario
            .missing_answer_parts(&run.answer)
            .into_iter()
            .map(|part| format!("answer does not mention '{}'", part))
            .collect();
        report.answer = Some(run.answer);

        match self
            .inspector
            .validate(&run.trace_id, &scenario.expected, cancel)
            .await
        {
            Ok(inspection) => report.inspection = Some(inspection),
            Err(Error::ShapeMismatch { violations, .. }) => failures.extend(violations),
            Err(e) => {
                report.verdict = ScenarioVerdict::Errored(e.to_string());
                report.duration = started.elapsed();
                return report;
            }
        }

        if !failures.is_empty() {
            report.verdict = ScenarioVerdict::Failed(failures);
        }
        report.duration = started.elapsed();

        tracing::info!(
            scenario = %scenario.name,
            trace_id = %run.trace_id,
            passed = report.passed(),
            duration_ms = report.duration.as_millis() as u64,
            "Scenario finished"
        );
        report
    }

    /// Run scenarios in order, pausing between them
    pub async fn run_all(
        &self,
        scenarios: &[Scenario],
        cancel: Option<&CancellationToken>,
    ) -> HarnessSummary {
        let pause = if self.is_mocked() {
            std::time::Duration::ZERO
        } else {
            self.config.inspector.scenario_pause()
        };

        let mut summary = HarnessSummary::default();
        for (i, scenario) in scenarios.iter().enumerate() {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                tracing::warn!("Scenario run cancelled");
                break;
            }
            if i > 0 && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
            summary.reports.push(self.run_scenario(scenario, cancel).await);
        }
        summary
    }

    /// Flush remaining spans and close the tracer
    pub async fn shutdown(&self) -> Result<()> {
        self.tracer.shutdown().await
    }
}

/// Verify trace store credentials.
///
/// Returns the Langfuse project id, or `None` when the configuration does not
/// use a remote store.
pub async fn auth_check(config: &SpanScopeConfig) -> Result<Option<String>> {
    if config.is_mocked() || config.tracing.store != "langfuse" {
        return Ok(None);
    }

    let store = LangfuseStore::new(LangfuseConfig::from_config(config)?);
    let project_id = store.auth_check().await?;
    tracing::info!(project_id = %project_id, "Langfuse client is authenticated");
    Ok(Some(project_id))
}
