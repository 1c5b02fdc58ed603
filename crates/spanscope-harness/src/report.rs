use serde::Serialize;
use spanscope_inspect::TraceInspection;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "details", rename_all = "snake_case")]
pub enum ScenarioVerdict {
    Passed,
    /// The run completed but the answer or trace shape was wrong
    Failed(Vec<String>),
    /// The run or the trace lookup itself failed
    Errored(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub verdict: ScenarioVerdict,
    pub trace_id: Option<String>,
    pub trace_url: Option<String>,
    pub answer: Option<String>,
    pub iterations: Option<usize>,
    pub inspection: Option<TraceInspection>,
    pub duration: Duration,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.verdict == ScenarioVerdict::Passed
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.verdict {
            ScenarioVerdict::Passed => write!(f, "PASS  {}", self.name)?,
            ScenarioVerdict::Failed(reasons) => {
                write!(f, "FAIL  {}: {}", self.name, reasons.join("; "))?
            }
            ScenarioVerdict::Errored(error) => write!(f, "ERROR {}: {}", self.name, error)?,
        }
        if let Some(inspection) = &self.inspection {
            write!(
                f,
                " [observations={}, llm_calls={}, tool_calls={}]",
                inspection.total_observations,
                inspection.llm_call_count(),
                inspection.tool_call_count()
            )?;
        }
        if let Some(url) = &self.trace_url {
            write!(f, " {}", url)?;
        }
        Ok(())
    }
}

/// Outcome of a batch of scenarios
#[derive(Debug, Clone, Default, Serialize)]
pub struct HarnessSummary {
    pub reports: Vec<ScenarioReport>,
}

impl HarnessSummary {
    pub fn total(&self) -> usize {
        self.reports.len()
    }

    pub fn passed(&self) -> usize {
        self.reports.iter().filter(|r| r.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.verdict, ScenarioVerdict::Failed(_)))
            .count()
    }

    pub fn errored(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.verdict, ScenarioVerdict::Errored(_)))
            .count()
    }

    pub fn all_passed(&self) -> bool {
        !self.reports.is_empty() && self.passed() == self.total()
    }
}

impl fmt::Display for HarnessSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.reports {
            writeln!(f, "{}", report)?;
        }
        writeln!(f)?;
        writeln!(f, "Test results summary:")?;
        writeln!(f, "  Scenarios run: {}", self.total())?;
        writeln!(f, "  Passed:        {}", self.passed())?;
        writeln!(f, "  Failed:        {}", self.failed())?;
        write!(f, "  Errors:        {}", self.errored())
    }
}
