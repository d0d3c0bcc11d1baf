mod config;
mod llm;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use tracing::debug;

use crate::config::{AppConfig, FALLBACK_MODEL, load_project_config};
use crate::llm::{CompletionParams, Generator, OpenAIClient, RetryPolicy};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "qna",
    version,
    about = "Ask a question against an OpenAI-compatible chat model"
)]
struct Cli {
    /// Question to ask
    question: String,

    /// Model name
    #[arg(long)]
    model: Option<String>,

    /// Sampling temperature (0.0 - 1.0)
    #[arg(long)]
    temperature: Option<f32>,

    /// Response token budget
    #[arg(long)]
    max_tokens: Option<u32>,

    /// OpenAI-compatible API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// API key (set via env OPENAI_API_KEY recommended)
    #[arg(long)]
    api_key: Option<String>,

    /// Log level (error,warn,info,debug,trace)
    #[arg(long)]
    log_level: Option<String>,
}

fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut cfg = AppConfig::default();

    let root = std::env::current_dir().context("resolve current dir")?;
    cfg.apply_file(load_project_config(&root)?);

    if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
        cfg.base_url = url;
    }
    if let Ok(model) = std::env::var("OPENAI_MODEL") {
        cfg.model = model;
    }
    cfg.api_key = std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty());

    if let Some(url) = &cli.base_url {
        cfg.base_url = url.clone();
    }
    if let Some(model) = &cli.model {
        cfg.model = model.clone();
    }
    if let Some(t) = cli.temperature {
        cfg.temperature = t;
    }
    if let Some(n) = cli.max_tokens {
        cfg.max_tokens = n;
    }
    if let Some(key) = &cli.api_key {
        cfg.api_key = Some(key.clone());
    }
    if let Some(level) = &cli.log_level {
        cfg.log_level = level.clone();
    }

    cfg.validate()?;
    Ok(cfg)
}

async fn run() -> i32 {
    let _ = dotenv();
    let cli = Cli::parse();

    // Config decides the log level, so it is resolved before the subscriber
    // goes up; parse errors here fall back to plain stderr.
    let cfg = match resolve_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("config error: {e:#}");
            return 2;
        }
    };
    if let Err(e) = logging::init(&cfg.log_level) {
        eprintln!("failed to init logging: {e:#}");
    }
    debug!(model = %cfg.model, base_url = %cfg.base_url, "resolved config");

    let Some(api_key) = cfg.api_key.clone() else {
        eprintln!(
            "No API key found. Pass --api-key or set OPENAI_API_KEY \
             (get a key from https://platform.openai.com/account/api-keys)."
        );
        return 2;
    };

    let client = match OpenAIClient::new(cfg.base_url.clone(), cfg.llm.timeout()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to build HTTP client: {e:#}");
            return 1;
        }
    };
    let generator = Generator::new(
        client,
        RetryPolicy::new(cfg.llm.max_attempts, cfg.llm.initial_backoff()),
        FALLBACK_MODEL,
    );
    let params = CompletionParams {
        model: cfg.model.clone(),
        temperature: cfg.temperature,
        max_tokens: cfg.max_tokens,
    };

    match generator.generate(&cli.question, &api_key, &params).await {
        Ok(answer) => {
            println!("{answer}");
            0
        }
        Err(e) if e.is_input_error() => {
            eprintln!("input error: {e}");
            2
        }
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}

#[tokio::main]
async fn main() {
    std::process::exit(run().await);
}
