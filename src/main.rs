//! `spanscope` command line

mod cli;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use cli::{CheckArgs, CliArgs, Commands, RunArgs};
use rand::seq::SliceRandom;
use spanscope_agent::RunRequest;
use spanscope_core::SpanScopeConfig;
use spanscope_harness::{CANNED_PROMPTS, Harness, auth_check, find_scenario, fixed_scenarios};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = CliArgs::parse();
    spanscope_telemetry::init_logging();

    let mut config = match &cli.config {
        Some(path) => SpanScopeConfig::load_from(path)?,
        None => SpanScopeConfig::load()?,
    };
    if cli.mock {
        config.use_mock = true;
    }

    match cli.command {
        Commands::AuthCheck => run_auth_check(&config).await,
        Commands::Run(args) => run_query(config, args).await,
        Commands::Check(args) => run_check(config, args).await,
    }
}

async fn run_auth_check(config: &SpanScopeConfig) -> Result<ExitCode> {
    match auth_check(config).await {
        Ok(Some(project_id)) => {
            println!("Langfuse client is authenticated (project {})", project_id);
            Ok(ExitCode::SUCCESS)
        }
        Ok(None) => {
            println!("No remote trace store configured; nothing to check");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Authentication failed: {}. Please check your credentials and host.", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_query(mut config: SpanScopeConfig, args: RunArgs) -> Result<ExitCode> {
    match auth_check(&config).await {
        Ok(Some(project_id)) => {
            if config.tracing.project_id.is_none() {
                config.tracing.project_id = Some(project_id);
            }
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Trace store authentication failed, continuing"),
    }

    let mut request = match (&args.query, &args.scenario) {
        (Some(query), _) => RunRequest::new(query),
        (None, Some(name)) => find_scenario(name)
            .ok_or_else(|| anyhow!("Unknown scenario: {}", name))?
            .request(),
        (None, None) => {
            let prompt = CANNED_PROMPTS
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(CANNED_PROMPTS[0]);
            RunRequest::new(prompt)
        }
    };
    if let Some(user_id) = args.user_id {
        request = request.user_id(user_id);
    }
    if let Some(session_id) = args.session_id {
        request = request.session_id(session_id);
    }

    let harness = Harness::from_config(config).context("Failed to set up the agent")?;
    println!("Query: {}", request.query);

    let outcome = harness.run_query(request).await;
    let code = match outcome {
        Ok(run) => {
            println!("Answer: {}", run.answer);
            println!("Iterations: {}", run.iterations);
            println!("Trace ID: {}", run.trace_id);
            println!("Trace URL: {}", run.trace_url);
            println!("Session ID: {}", run.session_id);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Run failed: {}", e.error);
            if !e.trace_id.is_empty() {
                eprintln!("Trace ID: {}", e.trace_id);
                eprintln!("Trace URL: {}", e.trace_url);
            }
            ExitCode::FAILURE
        }
    };

    harness.shutdown().await?;
    Ok(code)
}

async fn run_check(config: SpanScopeConfig, args: CheckArgs) -> Result<ExitCode> {
    let scenarios = match &args.scenario {
        Some(name) => vec![find_scenario(name).ok_or_else(|| anyhow!("Unknown scenario: {}", name))?],
        None => fixed_scenarios(),
    };

    let harness = Harness::from_config(config).context("Failed to set up the harness")?;
    println!(
        "Running {} scenario(s) in {} mode",
        scenarios.len(),
        if harness.is_mocked() { "mock" } else { "live" }
    );

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let summary = harness.run_all(&scenarios, Some(&cancel)).await;
    harness.shutdown().await?;

    println!("{}", summary);
    if summary.all_passed() && summary.total() == scenarios.len() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
