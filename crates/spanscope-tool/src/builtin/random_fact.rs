use crate::{FunctionTool, ToolSchema};
use rand::seq::SliceRandom;
use spanscope_core::{ParameterType, Result, ToolResponse};

const CATEGORIES: [&str; 4] = ["general", "science", "history", "tech"];

const GENERAL: &[&str] = &[
    "Honey never spoils. Archaeologists have found 3000-year-old honey in Egyptian tombs that was still edible.",
    "A group of flamingos is called a 'flamboyance'.",
    "Bananas are berries, but strawberries aren't.",
    "The shortest war in history lasted 38 minutes between Britain and Zanzibar in 1896.",
];

const SCIENCE: &[&str] = &[
    "Water can boil and freeze at the same time in a phenomenon called the triple point.",
    "A single bolt of lightning contains enough energy to toast 100,000 slices of bread.",
    "Your body contains about 37.2 trillion cells.",
    "Sound travels 4.3 times faster in water than in air.",
];

const HISTORY: &[&str] = &[
    "Cleopatra lived closer in time to the moon landing than to the construction of the Great Pyramid.",
    "Oxford University is older than the Aztec Empire.",
    "The Great Wall of China is not visible from space with the naked eye.",
    "Nintendo was founded in 1889 as a playing card company.",
];

const TECH: &[&str] = &[
    "The first computer mouse was made of wood in 1964.",
    "The first 1GB hard drive weighed over 500 pounds and cost $40,000 in 1980.",
    "Email existed before the World Wide Web.",
    "The first webcam was created to monitor a coffee pot at Cambridge University.",
];

fn facts_for(category: &str) -> (&'static str, &'static [&'static str]) {
    match category {
        "science" => ("science", SCIENCE),
        "history" => ("history", HISTORY),
        "tech" => ("tech", TECH),
        _ => ("general", GENERAL),
    }
}

fn pick_fact(category: &str) -> (&'static str, &'static str) {
    let (category, facts) = facts_for(category);
    let fact = facts
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(GENERAL[0]);
    (category, fact)
}

/// Creates the canned fact lookup tool
pub fn create_random_fact_tool() -> Result<FunctionTool> {
    let definition = ToolSchema::new(
        "get_random_fact",
        "Returns a random interesting fact from a predefined collection. Facts are categorized by topic.",
    )
    .property(
        "category",
        ParameterType::String,
        "The category of fact to retrieve",
    )
    .one_of("category", CATEGORIES)
    .default_value("category", serde_json::json!("general"))
    .build();

    FunctionTool::builder()
        .definition(definition)
        .execute(|ctx, params| async move {
            let requested = params["category"].as_str().unwrap_or("general");
            let (category, fact) = pick_fact(requested);

            tracing::debug!(
                invocation_id = %ctx.invocation_id(),
                tool_call_id = %ctx.function_call_id(),
                category = %category,
                "Picked random fact"
            );

            Ok(ToolResponse {
                result: serde_json::json!({
                    "success": true,
                    "category": category,
                    "fact": fact,
                }),
            })
        })
        .build()
}
