use serde::Serialize;
use spanscope_telemetry::Observation;
use std::collections::{BTreeMap, HashSet};

pub const TYPE_AGENT: &str = "AGENT";
pub const TYPE_GENERATION: &str = "GENERATION";
pub const TYPE_TOOL: &str = "TOOL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObservationSummary {
    pub id: String,
    pub name: String,
    pub observation_type: String,
}

impl From<&Observation> for ObservationSummary {
    fn from(obs: &Observation) -> Self {
        Self {
            id: obs.id.clone(),
            name: obs.name.clone().unwrap_or_default(),
            observation_type: obs.observation_type.clone(),
        }
    }
}

/// Classified view of one trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceInspection {
    pub trace_id: String,
    pub total_observations: usize,
    pub observation_types: BTreeMap<String, usize>,
    pub llm_calls: Vec<ObservationSummary>,
    pub tool_calls: Vec<ObservationSummary>,
    /// Observations without a parent
    pub roots: usize,
    /// Observations whose parent is not part of the trace
    pub orphans: usize,
}

impl TraceInspection {
    pub fn tool_names(&self) -> Vec<&str> {
        self.tool_calls.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn llm_call_count(&self) -> usize {
        self.llm_calls.len()
    }

    pub fn tool_call_count(&self) -> usize {
        self.tool_calls.len()
    }
}

/// Classify observations.
///
/// The root (no parent) is the session and never counts as an llm call.
/// Non-root `AGENT` and every `GENERATION` observation do; `TOOL`
/// observations are tool calls. Input order does not matter.
pub fn classify(trace_id: &str, mut observations: Vec<Observation>) -> TraceInspection {
    observations.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| a.id.cmp(&b.id))
    });

    let ids: HashSet<&str> = observations.iter().map(|o| o.id.as_str()).collect();

    let mut observation_types = BTreeMap::new();
    let mut llm_calls = Vec::new();
    let mut tool_calls = Vec::new();
    let mut roots = 0;
    let mut orphans = 0;

    for obs in &observations {
        *observation_types
            .entry(obs.observation_type.clone())
            .or_insert(0) += 1;

        let is_root = match obs.parent_id.as_deref() {
            None => {
                roots += 1;
                true
            }
            Some(parent) => {
                if !ids.contains(parent) {
                    orphans += 1;
                }
                false
            }
        };

        match obs.observation_type.as_str() {
            TYPE_GENERATION => llm_calls.push(ObservationSummary::from(obs)),
            TYPE_AGENT if !is_root => llm_calls.push(ObservationSummary::from(obs)),
            TYPE_TOOL => tool_calls.push(ObservationSummary::from(obs)),
            _ => {}
        }
    }

    TraceInspection {
        trace_id: trace_id.to_string(),
        total_observations: observations.len(),
        observation_types,
        llm_calls,
        tool_calls,
        roots,
        orphans,
    }
}
