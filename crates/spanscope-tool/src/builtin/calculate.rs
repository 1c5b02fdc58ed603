use crate::{FunctionTool, ToolSchema};
use spanscope_core::{Error, ParameterType, Result, ToolResponse};

const TOOL_NAME: &str = "calculate";

/// Creates the arithmetic tool
pub fn create_calculate_tool() -> Result<FunctionTool> {
    let definition = ToolSchema::new(
        TOOL_NAME,
        "Evaluates a mathematical expression and returns the result. Supports basic arithmetic \
         operations: addition (+), subtraction (-), multiplication (*), division (/), and parentheses.",
    )
    .property(
        "expression",
        ParameterType::String,
        "The mathematical expression to evaluate (e.g., '25 * 4', '(100 + 50) / 2')",
    )
    .required("expression")
    .build();

    FunctionTool::builder()
        .definition(definition)
        .execute(|ctx, params| async move {
            let expression = params["expression"]
                .as_str()
                .ok_or_else(|| Error::invalid_arguments(TOOL_NAME, "missing 'expression'"))?;

            tracing::debug!(
                invocation_id = %ctx.invocation_id(),
                tool_call_id = %ctx.function_call_id(),
                expression = %expression,
                "Calculating expression"
            );

            let result = evaluate_expression(expression)?;

            tracing::debug!(
                invocation_id = %ctx.invocation_id(),
                tool_call_id = %ctx.function_call_id(),
                result = %result,
                "Calculation completed"
            );

            Ok(ToolResponse {
                result: serde_json::json!({
                    "success": true,
                    "expression": expression,
                    "result": render_number(result),
                }),
            })
        })
        .build()
}

/// Evaluate plain arithmetic.
///
/// Only numeric literals, `+ - * / % ** ^`, parentheses and whitespace are
/// accepted; anything else is rejected before the evaluator sees it. Both
/// `**` and `^` mean exponentiation.
fn evaluate_expression(expr: &str) -> Result<f64> {
    if let Some(bad) = expr
        .chars()
        .find(|c| !(c.is_ascii_digit() || c.is_whitespace() || "+-*/%^().".contains(*c)))
    {
        return Err(Error::tool_execution(
            TOOL_NAME,
            format!("unsupported character '{}' in expression", bad),
        ));
    }

    let normalized = expr.replace("**", "^");
    if normalized.trim().is_empty() {
        return Err(Error::tool_execution(TOOL_NAME, "expression is empty"));
    }

    let value = meval::eval_str(&normalized).map_err(|e| {
        Error::tool_execution(TOOL_NAME, format!("failed to evaluate expression: {}", e))
    })?;

    if !value.is_finite() {
        return Err(Error::tool_execution(
            TOOL_NAME,
            "result is not a finite number (division by zero?)",
        ));
    }

    Ok(value)
}

/// Integral results are reported as integers
fn render_number(value: f64) -> serde_json::Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        serde_json::json!(value as i64)
    } else {
        serde_json::json!(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DefaultToolContext;
    use spanscope_core::Tool;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_calculate_tool() {
        let tool = create_calculate_tool().unwrap();
        assert_eq!(tool.name(), "calculate");

        let ctx = Arc::new(DefaultToolContext::new("call-1", "inv-1"));

        let response = tool
            .execute(ctx.clone(), serde_json::json!({"expression": "25 * 4"}))
            .await
            .unwrap();
        assert_eq!(response.result["result"], 100);
        assert_eq!(response.result["expression"], "25 * 4");

        let response = tool
            .execute(ctx.clone(), serde_json::json!({"expression": "100 / 5"}))
            .await
            .unwrap();
        assert_eq!(response.result["result"], 20);

        let response = tool
            .execute(ctx, serde_json::json!({"expression": "(10 + 5) / 2"}))
            .await
            .unwrap();
        assert_eq!(response.result["result"], 7.5);
    }

    #[test]
    fn test_power_and_modulo() {
        assert_eq!(evaluate_expression("2 ** 10").unwrap(), 1024.0);
        assert_eq!(evaluate_expression("2 ^ 3").unwrap(), 8.0);
        assert_eq!(evaluate_expression("17 % 5").unwrap(), 2.0);
        assert_eq!(evaluate_expression("7 * 24").unwrap(), 168.0);
    }

    #[test]
    fn test_rejects_non_arithmetic_input() {
        for input in ["not an expression", "sqrt(4)", "__import__('os')", "pi * 2", ""] {
            let err = evaluate_expression(input).unwrap_err();
            assert!(
                matches!(err, Error::ToolExecution { .. }),
                "expected execution error for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_division_by_zero_is_an_error() {
        assert!(matches!(
            evaluate_expression("1 / 0"),
            Err(Error::ToolExecution { .. })
        ));
    }

    #[test]
    fn test_malformed_expression() {
        assert!(evaluate_expression("(1 + ").is_err());
    }
}
