use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use llm_relay::cli::{
    Args, CompleteConfig, ConfigDiscovery, ExecutionMode, GatewayFileConfig, InteractiveConfig,
};
use llm_relay::env;
use llm_relay::gateway::{CallReport, GatewayObserver, JsonlAuditObserver, TracingObserver};
use llm_relay::limiter::RateLimiter;
use llm_relay::{AttemptOutcome, CompletionOverrides, CompletionRequest, Gateway, GatewayMetrics};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_env(env::LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(env::DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mode = match args.mode() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    match mode {
        ExecutionMode::Complete(config) => run_complete_mode(config).await,
        ExecutionMode::Interactive(config) => run_interactive_mode(config).await,
        ExecutionMode::Status { config_override } => show_status(config_override.as_deref()).await,
        ExecutionMode::ShowConfig => {
            ConfigDiscovery::show_discovery_info();
            Ok(())
        }
        ExecutionMode::InitConfig { path } => init_config(path),
    }
}

fn load_config(config_override: Option<&Path>) -> Result<GatewayFileConfig> {
    match config_override {
        Some(path) => {
            info!("Loading configuration override from: {:?}", path);
            GatewayFileConfig::from_toml_file(path)
                .with_context(|| format!("Failed to load configuration from {:?}", path))
        }
        None => {
            info!("Discovering configuration...");
            Ok(ConfigDiscovery::discover_config()?)
        }
    }
}

struct Observers {
    all: Vec<Arc<dyn GatewayObserver>>,
    audit: Option<Arc<JsonlAuditObserver>>,
}

impl Observers {
    async fn new(audit_log: Option<&Path>) -> Result<Self> {
        let mut all: Vec<Arc<dyn GatewayObserver>> = vec![Arc::new(TracingObserver)];
        let mut audit = None;
        if let Some(path) = audit_log {
            let observer = Arc::new(
                JsonlAuditObserver::open(path)
                    .await
                    .with_context(|| format!("Failed to open audit log {:?}", path))?,
            );
            info!("Writing audit records to {:?}", observer.path());
            all.push(observer.clone());
            audit = Some(observer);
        }
        Ok(Self { all, audit })
    }

    async fn flush(&self) {
        if let Some(ref audit) = self.audit {
            audit.flush().await;
        }
    }
}

#[derive(Serialize)]
struct CompleteOutput<'a> {
    responses: Vec<CallOutput>,
    metrics: &'a GatewayMetrics,
}

#[derive(Serialize)]
struct CallOutput {
    ok: bool,
    provider: Option<String>,
    text: Option<String>,
    cost: f64,
    error: Option<String>,
    attempts: Vec<llm_relay::AttemptRecord>,
}

impl From<CallReport> for CallOutput {
    fn from(report: CallReport) -> Self {
        match report.result {
            Ok(response) => Self {
                ok: true,
                provider: Some(response.provider),
                text: Some(response.text),
                cost: response.cost,
                error: None,
                attempts: report.attempts,
            },
            Err(e) => Self {
                ok: false,
                provider: None,
                text: None,
                cost: 0.0,
                error: Some(e.to_string()),
                attempts: report.attempts,
            },
        }
    }
}

async fn run_complete_mode(config: CompleteConfig) -> Result<()> {
    let file_config = load_config(config.config_override.as_deref())?;
    let observers = Observers::new(config.audit_log.as_deref()).await?;
    let gateway = Arc::new(file_config.build_gateway(observers.all.clone())?);
    let limiter = file_config.rate_limiter().map(Arc::new);

    let overrides = CompletionOverrides {
        timeout: config
            .timeout_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
        system_message: config.system_message.clone(),
        ..Default::default()
    };

    info!(
        "Sending {} request(s) with concurrency {}",
        config.repeat, config.concurrency
    );

    let outputs: Vec<CallOutput> = stream::iter(0..config.repeat)
        .map(|_| {
            let gateway = Arc::clone(&gateway);
            let limiter = limiter.clone();
            let request =
                CompletionRequest::new(config.prompt.clone()).with_overrides(overrides.clone());
            async move { run_one(&gateway, limiter.as_deref(), request).await }
        })
        .buffer_unordered(config.concurrency)
        .collect()
        .await;

    let metrics = gateway.metrics().await;
    let any_failed = outputs.iter().any(|o| !o.ok);

    if config.json {
        let output = CompleteOutput {
            responses: outputs,
            metrics: &metrics,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for output in &outputs {
            print_call(output);
        }
        print_metrics(&metrics);
    }

    observers.flush().await;
    if any_failed {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_one(
    gateway: &Gateway,
    limiter: Option<&RateLimiter>,
    request: CompletionRequest,
) -> CallOutput {
    if let Some(limiter) = limiter
        && let Err(e) = limiter.acquire_permit(&request).await
    {
        warn!(request_id = %request.id, "Rejected by rate limiter: {}", e);
        return CallOutput {
            ok: false,
            provider: None,
            text: None,
            cost: 0.0,
            error: Some(e.to_string()),
            attempts: Vec::new(),
        };
    }

    gateway.complete_traced(request).await.into()
}

fn print_call(output: &CallOutput) {
    for attempt in &output.attempts {
        let marker = match attempt.outcome {
            AttemptOutcome::Success => "ok",
            AttemptOutcome::Failure => "failed",
            AttemptOutcome::Blocked => "blocked",
        };
        match &attempt.error {
            Some(e) => println!("  [{}] {} {}: {}", attempt.index, attempt.provider, marker, e),
            None => println!(
                "  [{}] {} {} ({:?})",
                attempt.index, attempt.provider, marker, attempt.latency
            ),
        }
    }

    match (&output.provider, &output.text, &output.error) {
        (Some(provider), Some(text), _) => {
            println!("{} (${:.6}): {}", provider, output.cost, text);
        }
        (_, _, Some(e)) => println!("Error: {}", e),
        _ => {}
    }
}

fn print_metrics(metrics: &GatewayMetrics) {
    println!();
    println!("Gateway metrics:");
    println!("  Requests:  {}", metrics.total_requests);
    println!(
        "  Succeeded: {} ({:.1}%)",
        metrics.successful_requests(),
        metrics.success_rate() * 100.0
    );
    println!("  Fallbacks: {}", metrics.fallback_count);
    println!("  Exhausted: {}", metrics.exhausted_count);
    println!("  Blocked:   {}", metrics.blocked_attempts);
    println!(
        "  Cost:      ${:.6} (avg ${:.6})",
        metrics.total_cost,
        metrics.average_cost_per_success()
    );
    for (provider, count) in &metrics.provider_usage {
        println!("    {}: {} served", provider, count);
    }
    for (provider, count) in &metrics.provider_failures {
        println!("    {}: {} failed", provider, count);
    }
}

async fn run_interactive_mode(config: InteractiveConfig) -> Result<()> {
    info!("Running in interactive mode");

    let file_config = load_config(config.config_override.as_deref())?;
    let observers = Observers::new(config.audit_log.as_deref()).await?;
    let gateway = file_config.build_gateway(observers.all.clone())?;
    let limiter = file_config.rate_limiter();

    if config.verbose {
        println!("Interactive mode started. Type 'help' for commands.");
    }

    loop {
        print!("\n> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        match input {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                show_interactive_help();
                continue;
            }
            "status" => {
                print_status(&gateway).await;
                continue;
            }
            "metrics" => {
                print_metrics(&gateway.metrics().await);
                continue;
            }
            _ => {}
        }

        let output = run_one(&gateway, limiter.as_ref(), CompletionRequest::new(input)).await;
        if output.ok {
            if config.verbose {
                print_call(&output);
            } else if let Some(text) = &output.text {
                println!("{}", text);
            }
        } else {
            error!("Request failed");
            print_call(&output);
        }
    }

    observers.flush().await;
    print_metrics(&gateway.metrics().await);
    println!("Goodbye!");
    Ok(())
}

fn show_interactive_help() {
    println!("Interactive Mode Commands:");
    println!("  status   - Show provider breaker states");
    println!("  metrics  - Show gateway metrics");
    println!("  help     - Show this help message");
    println!("  quit     - Exit the application");
    println!("\nEnter any other text to send it through the provider chain.");
}

async fn show_status(config_override: Option<&Path>) -> Result<()> {
    let file_config = load_config(config_override)?;
    let gateway = file_config.build_gateway(Vec::new())?;
    print_status(&gateway).await;

    if let Some(limits) = &file_config.rate_limits {
        println!(
            "\nRate limits: {} requests/min, {} units/min",
            limits.max_requests_per_minute, limits.max_units_per_minute
        );
    }
    Ok(())
}

async fn print_status(gateway: &Gateway) {
    println!("Provider chain:");
    for (index, status) in gateway.provider_status().await.iter().enumerate() {
        println!(
            "  {}. {} [{}] model={} cost/1k={} timeout={:?} retries={}",
            index + 1,
            status.config.name,
            status.config.kind,
            status.config.model,
            status.config.cost_per_1k_units,
            status.config.timeout,
            status.config.max_retries
        );
        println!(
            "     breaker: {} ({}/{} failures, cooldown {:?}, opened {} times)",
            status.breaker.mode,
            status.breaker.consecutive_failures,
            status.breaker.failure_threshold,
            status.breaker.cooldown,
            status.breaker.times_opened
        );
    }
}

fn init_config(path: Option<PathBuf>) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => {
            let home = std::env::var_os("HOME")
                .map(PathBuf::from)
                .context("HOME is not set; pass a path explicitly")?;
            env::user_config_file_path(&home)
        }
    };

    if ConfigDiscovery::create_default_config(&path)? {
        println!("Created default configuration: {:?}", path);
    } else {
        println!("Configuration already exists: {:?}", path);
    }
    Ok(())
}
