use serde_json::json;
use spanscope_agent::RunRequest;
use spanscope_agent::testing::ScriptedTurn;
use spanscope_inspect::ExpectedShape;

/// Prompts picked from by `spanscope run` when no query is given
pub const CANNED_PROMPTS: [&str; 3] = [
    "What is 25 multiplied by 4?",
    "What time is it right now? Also, can you calculate what 100 divided by 5 is?",
    "Tell me an interesting science fact, then calculate how many hours are in a week (7 * 24).",
];

/// A canned query with the trace shape and answer it must produce
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub description: String,
    pub query: String,
    pub user_id: String,
    pub session_id: String,
    pub tags: Vec<String>,
    pub expected: ExpectedShape,
    /// Substrings the final answer must contain, compared case-insensitively
    pub expected_answer: Vec<String>,
    /// Model turns replayed in mocked mode
    pub script: Vec<ScriptedTurn>,
}

impl Scenario {
    pub fn request(&self) -> RunRequest {
        let mut request = RunRequest::new(&self.query)
            .user_id(&self.user_id)
            .session_id(&self.session_id);
        for tag in &self.tags {
            request = request.tag(tag);
        }
        request
    }

    /// Expected substrings missing from `answer`
    pub fn missing_answer_parts(&self, answer: &str) -> Vec<&str> {
        let answer = answer.to_lowercase();
        self.expected_answer
            .iter()
            .filter(|part| !answer.contains(&part.to_lowercase()))
            .map(String::as_str)
            .collect()
    }
}

/// Single-tool, multi-tool and reasoning-only scenarios
pub fn fixed_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "single_tool".into(),
            description: "Single tool usage: simple calculation".into(),
            query: CANNED_PROMPTS[0].into(),
            user_id: "test_user_1".into(),
            session_id: "test_single_tool".into(),
            tags: vec!["scenario".into()],
            expected: ExpectedShape::new()
                .min_llm_calls(1)
                .exact_tool_calls(1)
                .tool_names(["calculate"]),
            expected_answer: vec!["100".into()],
            script: vec![
                ScriptedTurn::call_tools([("calculate", json!({"expression": "25 * 4"}))]),
                ScriptedTurn::answer("25 multiplied by 4 is 100."),
            ],
        },
        Scenario {
            name: "multi_tool".into(),
            description: "Multi-tool usage: time and calculation".into(),
            query: CANNED_PROMPTS[1].into(),
            user_id: "test_user_2".into(),
            session_id: "test_multi_tool".into(),
            tags: vec!["scenario".into()],
            expected: ExpectedShape::new()
                .min_llm_calls(2)
                .exact_tool_calls(2)
                .tool_names(["calculate", "get_current_time"]),
            expected_answer: vec!["20".into()],
            script: vec![
                ScriptedTurn::call_tools([
                    ("get_current_time", json!({"timezone": "UTC"})),
                    ("calculate", json!({"expression": "100 / 5"})),
                ]),
                ScriptedTurn::answer(
                    "The current time is 1:21:04 PM (UTC) on January 27, 2026. \
                     Additionally, 100 divided by 5 is 20.",
                ),
            ],
        },
        Scenario {
            name: "no_tools".into(),
            description: "Pure reasoning without tools".into(),
            query: "Explain what quantum computing is in simple terms. No more than 2 lines"
                .into(),
            user_id: "test_user_3".into(),
            session_id: "test_no_tools".into(),
            tags: vec!["scenario".into()],
            expected: ExpectedShape::new().min_llm_calls(1).exact_tool_calls(0),
            expected_answer: vec!["quantum".into()],
            script: vec![ScriptedTurn::answer(
                "Quantum computing uses the principles of quantum mechanics to process \
                 information. Its qubits can represent multiple states simultaneously.",
            )],
        },
    ]
}

pub fn find_scenario(name: &str) -> Option<Scenario> {
    fixed_scenarios().into_iter().find(|s| s.name == name)
}

/// Model turns used for an ad-hoc query in mocked mode
pub fn script_for_query(query: &str) -> Vec<ScriptedTurn> {
    if let Some(scenario) = fixed_scenarios().into_iter().find(|s| s.query == query) {
        return scenario.script;
    }

    if query == CANNED_PROMPTS[2] {
        return vec![
            ScriptedTurn::call_tools([("get_random_fact", json!({"category": "science"}))]),
            ScriptedTurn::call_tools([("calculate", json!({"expression": "7 * 24"}))]),
            ScriptedTurn::answer("Here is a science fact for you. A week has 168 hours."),
        ];
    }

    vec![ScriptedTurn::answer(format!("(mock) You asked: {}", query))]
}
