use crate::inspection::TraceInspection;
use serde::Serialize;

/// Structural expectations for a trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpectedShape {
    pub min_llm_calls: usize,
    pub min_tool_calls: usize,
    pub exact_tool_calls: Option<usize>,
    /// Compared as a multiset; order is not checked
    pub tool_names: Option<Vec<String>>,
    pub single_root: bool,
}

impl Default for ExpectedShape {
    fn default() -> Self {
        Self {
            min_llm_calls: 1,
            min_tool_calls: 0,
            exact_tool_calls: None,
            tool_names: None,
            single_root: true,
        }
    }
}

impl ExpectedShape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_llm_calls(mut self, n: usize) -> Self {
        self.min_llm_calls = n;
        self
    }

    pub fn min_tool_calls(mut self, n: usize) -> Self {
        self.min_tool_calls = n;
        self
    }

    pub fn exact_tool_calls(mut self, n: usize) -> Self {
        self.exact_tool_calls = Some(n);
        self
    }

    pub fn tool_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tool_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn single_root(mut self, single_root: bool) -> Self {
        self.single_root = single_root;
        self
    }

    /// Every expectation the inspection violates, empty when it matches
    pub fn violations(&self, inspection: &TraceInspection) -> Vec<String> {
        let mut violations = Vec::new();
        let llm_calls = inspection.llm_call_count();
        let tool_calls = inspection.tool_call_count();

        if llm_calls < self.min_llm_calls {
            violations.push(format!(
                "expected at least {} llm call(s), found {}",
                self.min_llm_calls, llm_calls
            ));
        }

        if tool_calls < self.min_tool_calls {
            violations.push(format!(
                "expected at least {} tool call(s), found {}",
                self.min_tool_calls, tool_calls
            ));
        }

        if let Some(exact) = self.exact_tool_calls {
            if tool_calls != exact {
                violations.push(format!(
                    "expected exactly {} tool call(s), found {}",
                    exact, tool_calls
                ));
            }
        }

        if let Some(expected) = &self.tool_names {
            let mut expected: Vec<&str> = expected.iter().map(String::as_str).collect();
            let mut actual = inspection.tool_names();
            expected.sort_unstable();
            actual.sort_unstable();
            if expected != actual {
                violations.push(format!(
                    "expected tools {:?}, found {:?}",
                    expected, actual
                ));
            }
        }

        if self.single_root && inspection.roots != 1 {
            violations.push(format!(
                "expected a single root observation, found {}",
                inspection.roots
            ));
        }

        violations
    }
}
