//! # gann CLI
//!
//! Runs the generator / discriminator / configurator loop against a model
//! provider and prints round-by-round progress.
//!
//! Usage:
//!   gann [OPTIONS]
//!
//! Examples:
//!   gann --instruction "Tell me a joke about compilers"
//!   gann --tune instruction --source cv.txt --reference job.txt --instruction-file prompt.txt
//!   gann --provider local --base-url http://localhost:11434/v1 --model llama3.3 -v
//!
//! Exit codes: 0 when the goal is reached or the rounds run out, 1 when a
//! round fails, 2 for bad configuration or unreadable input files.

use clap::{Parser, ValueEnum};
use gann_agent::{
    Configurator, ControlLoop, Discriminator, Documents, Generator, HumorDiscriminator, Instruction,
    LoopConfig, RelevanceDiscriminator, RoundEvent, RoundState, RunOutcome, RunReport, Suggestion,
    Temperature, GENERATOR_DEFAULTS,
};
use gann_model::{
    AnthropicProvider, Error, LlmProvider, OpenAIProvider, ProviderConfig, ProviderInvoker, Result,
    Settings, UsageTracker,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_INSTRUCTION: &str = "Tell me a joke";
const DEFAULT_LOCAL_URL: &str = "http://localhost:11434/v1";
const DEFAULT_LOCAL_MODEL: &str = "llama3.3";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProviderKind {
    Openai,
    Anthropic,
    /// Any OpenAI-compatible server
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Tune {
    /// Adjust the generator's temperature
    Temperature,
    /// Rewrite the generator's instruction
    Instruction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Judge {
    /// How funny the text is
    Humor,
    /// How well the text follows the instruction against --source
    Relevance,
}

#[derive(Parser)]
#[command(name = "gann")]
#[command(author, version, about = "gann - tune a generator against a discriminator")]
struct Cli {
    /// Model provider
    #[arg(long, env = "GANN_PROVIDER", value_enum, default_value = "openai")]
    provider: ProviderKind,

    /// Model for every agent (defaults to the provider's default)
    #[arg(long, env = "GANN_MODEL")]
    model: Option<String>,

    /// Provider base URL
    #[arg(long, env = "GANN_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_api_key: Option<String>,

    /// Maximum number of rounds
    #[arg(long, default_value_t = 5)]
    rounds: usize,

    /// Stop once a round scores at least this much (0-10)
    #[arg(long, default_value_t = 9.0)]
    target_score: f64,

    /// What the configurator adjusts between rounds
    #[arg(long, value_enum, default_value = "temperature")]
    tune: Tune,

    /// Scoring policy (defaults to relevance when --source is given)
    #[arg(long, value_enum)]
    judge: Option<Judge>,

    /// Starting instruction for the generator
    #[arg(long, conflicts_with = "instruction_file")]
    instruction: Option<String>,

    /// Read the starting instruction from a file
    #[arg(long)]
    instruction_file: Option<PathBuf>,

    /// Source text the generator works from
    #[arg(long)]
    source: Option<PathBuf>,

    /// Supporting reference material for the generator
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Starting generator temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Generator output size cap
    #[arg(long)]
    max_tokens: Option<usize>,

    /// Per-call timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Debug logging and full generated text
    #[arg(short, long)]
    verbose: bool,

    /// Only print the outcome
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Everything a run needs, read and validated up front
struct RunInput {
    initial: RoundState,
    documents: Documents,
    config: LoopConfig,
    judge: Judge,
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &s[..cut]),
        None => s.to_string(),
    }
}

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        Error::from(e)
            .with_operation("cli::read_input")
            .with_context("path", path.display().to_string())
    })
}

fn prepare(cli: &Cli) -> Result<RunInput> {
    let instruction = match (&cli.instruction, &cli.instruction_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => read_input(path)?.trim().to_string(),
        (None, None) => DEFAULT_INSTRUCTION.to_string(),
    };
    if instruction.trim().is_empty() {
        return Err(Error::invalid_argument("instruction is empty").with_operation("cli::prepare"));
    }

    let documents = Documents {
        source_text: cli.source.as_deref().map(read_input).transpose()?,
        reference: cli.reference.as_deref().map(read_input).transpose()?,
    };

    let settings = Settings::new(
        cli.temperature.unwrap_or(GENERATOR_DEFAULTS.temperature),
        cli.max_tokens.unwrap_or(GENERATOR_DEFAULTS.max_output_size),
        cli.timeout_ms.unwrap_or(GENERATOR_DEFAULTS.timeout_ms),
    );
    settings.validate()?;

    let config = LoopConfig {
        max_rounds: cli.rounds,
        target_score: cli.target_score,
    };
    config.validate()?;

    let judge = cli.judge.unwrap_or(if documents.source_text.is_some() {
        Judge::Relevance
    } else {
        Judge::Humor
    });
    if judge == Judge::Relevance && documents.source_text.is_none() {
        return Err(Error::invalid_argument("relevance scoring needs --source").with_operation("cli::prepare"));
    }

    Ok(RunInput {
        initial: RoundState::new(instruction, settings),
        documents,
        config,
        judge,
    })
}

fn provider_config(cli: &Cli) -> Result<ProviderConfig> {
    let missing_key = |var: &str| {
        Error::config_invalid(format!("{} is not set", var))
            .with_operation("cli::provider_config")
            .with_context("provider", format!("{:?}", cli.provider).to_lowercase())
    };

    let mut config = match cli.provider {
        ProviderKind::Openai => {
            ProviderConfig::openai(cli.openai_api_key.clone().ok_or_else(|| missing_key("OPENAI_API_KEY"))?)
        }
        ProviderKind::Anthropic => ProviderConfig::anthropic(
            cli.anthropic_api_key
                .clone()
                .ok_or_else(|| missing_key("ANTHROPIC_API_KEY"))?,
        ),
        ProviderKind::Local => ProviderConfig::local(DEFAULT_LOCAL_URL, DEFAULT_LOCAL_MODEL),
    };
    if let Some(model) = &cli.model {
        config = config.with_model(model);
    }
    if let Some(url) = &cli.base_url {
        config = config.with_base_url(url);
    }
    Ok(config)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_event(event: &RoundEvent<'_>, verbose: bool) {
    match event {
        RoundEvent::Started { round, state } => {
            println!("\n=== Round {} ===", round);
            println!("   Instruction: {}", truncate(&state.instruction, 80));
            println!("   Temperature: {}", state.settings.temperature);
        }
        RoundEvent::Generated { text, .. } => {
            let shown = if verbose { text.to_string() } else { truncate(text, 200) };
            println!("   Generated: {}", shown);
        }
        RoundEvent::Scored { score, .. } => println!("   Score: {}/10", score),
        RoundEvent::Suggested { label, value, .. } => println!("   Next {}: {}", label, value),
    }
}

fn print_report(report: &RunReport, usage: &UsageTracker, quiet: bool) {
    if quiet {
        println!("{}", report.outcome);
        return;
    }

    println!("\n--- RESULT ---\n");
    println!("{}", report.outcome);
    if let Some(best) = report.rounds.iter().max_by(|a, b| a.score.total_cmp(&b.score)) {
        println!("\nBest round ({}, score {}):\n{}", best.round, best.score, best.generated_text);
    }

    println!(
        "\n--- Usage: {} calls, {} prompt + {} completion tokens ---",
        usage.total_calls, usage.total_prompt_tokens, usage.total_completion_tokens
    );
    for (model, u) in &usage.by_model {
        println!("  {}: {} tokens", model, u.total_tokens);
    }
}

async fn run_loop<P, D, S>(
    invoker: Arc<ProviderInvoker<P>>,
    discriminator: D,
    input: RunInput,
    model: &str,
    cli: &Cli,
) -> Result<RunReport>
where
    P: LlmProvider,
    D: Discriminator,
    S: Suggestion,
{
    let verbose = cli.verbose;
    let mut control = ControlLoop::new(
        Generator::new(invoker.clone()).with_model(model),
        discriminator,
        Configurator::<_, S>::new(invoker).with_model(model),
        input.config,
    )?
    .with_documents(input.documents);

    if !cli.quiet {
        control = control.with_round_callback(move |event| print_event(event, verbose));
    }

    Ok(control.run(input.initial).await)
}

async fn drive<P: LlmProvider>(provider: P, input: RunInput, cli: &Cli) -> Result<RunReport> {
    let invoker = Arc::new(ProviderInvoker::new(provider));
    let model = invoker.provider().default_model().to_string();
    tracing::info!(provider = invoker.provider().name(), %model, "starting run");

    if !cli.quiet {
        println!(
            "gann - {} rounds, target {}, tuning {:?}, judged by {:?}, model {}",
            input.config.max_rounds, input.config.target_score, cli.tune, input.judge, model
        );
    }

    let report = match (input.judge, cli.tune) {
        (Judge::Humor, Tune::Temperature) => {
            let d = HumorDiscriminator::new(invoker.clone()).with_model(&model);
            run_loop::<_, _, Temperature>(invoker.clone(), d, input, &model, cli).await
        }
        (Judge::Humor, Tune::Instruction) => {
            let d = HumorDiscriminator::new(invoker.clone()).with_model(&model);
            run_loop::<_, _, Instruction>(invoker.clone(), d, input, &model, cli).await
        }
        (Judge::Relevance, Tune::Temperature) => {
            let d = RelevanceDiscriminator::new(invoker.clone()).with_model(&model);
            run_loop::<_, _, Temperature>(invoker.clone(), d, input, &model, cli).await
        }
        (Judge::Relevance, Tune::Instruction) => {
            let d = RelevanceDiscriminator::new(invoker.clone()).with_model(&model);
            run_loop::<_, _, Instruction>(invoker.clone(), d, input, &model, cli).await
        }
    }?;

    print_report(&report, &invoker.usage(), cli.quiet);
    Ok(report)
}

async fn run(cli: &Cli) -> Result<RunReport> {
    let input = prepare(cli)?;
    let config = provider_config(cli)?;
    let provider_err = |e| gann_model::error::provider_error(e).with_operation("cli::run");

    match cli.provider {
        ProviderKind::Anthropic => drive(AnthropicProvider::new(config).map_err(provider_err)?, input, cli).await,
        ProviderKind::Openai | ProviderKind::Local => {
            drive(OpenAIProvider::new(config).map_err(provider_err)?, input, cli).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Ok(path) = dotenvy::dotenv() {
        eprintln!("Loaded config from: {}", path.display());
    }

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(report) if report.outcome.is_failure() => {
            if let RunOutcome::Failed { error, .. } = &report.outcome {
                eprintln!("Error: {}", error);
            }
            ExitCode::from(1)
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, FromArgMatches};
    use gann_model::{ErrorKind, ProviderType};

    /// Flags backed by environment variables
    const ENV_ARGS: [&str; 5] = ["provider", "model", "base_url", "openai_api_key", "anthropic_api_key"];

    /// Parse argv alone, so GANN_* or API keys set on the machine don't leak in
    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["gann"];
        argv.extend_from_slice(args);
        let command = ENV_ARGS
            .iter()
            .fold(Cli::command(), |cmd, id| cmd.mut_arg(*id, |arg| arg.env(None::<&'static str>)));
        let matches = command.try_get_matches_from(argv).unwrap();
        Cli::from_arg_matches(&matches).unwrap()
    }

    #[test]
    fn test_prepare_defaults() {
        let input = prepare(&cli(&[])).unwrap();
        assert_eq!(input.initial.instruction, DEFAULT_INSTRUCTION);
        assert_eq!(input.initial.settings, GENERATOR_DEFAULTS);
        assert_eq!(input.config, LoopConfig::default());
        assert_eq!(input.judge, Judge::Humor);
        assert!(input.documents.is_empty());
    }

    #[test]
    fn test_prepare_rejects_bad_settings() {
        let err = prepare(&cli(&["--temperature", "2.5"])).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);

        let err = prepare(&cli(&["--rounds", "0"])).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_prepare_missing_source_file() {
        let err = prepare(&cli(&["--source", "/definitely/not/here.txt"])).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert_eq!(err.context_value("path"), Some("/definitely/not/here.txt"));
    }

    #[test]
    fn test_relevance_requires_source() {
        let err = prepare(&cli(&["--judge", "relevance"])).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_local_provider_needs_no_key() {
        let config = provider_config(&cli(&["--provider", "local", "--model", "qwen3"])).unwrap();
        assert_eq!(config.provider_type, ProviderType::Local);
        assert_eq!(config.api_key, None);
        assert_eq!(config.default_model, "qwen3");
        assert_eq!(config.base_url, DEFAULT_LOCAL_URL);
    }

    #[test]
    fn test_defaults_ignore_environment() {
        let parsed = cli(&[]);
        assert_eq!(parsed.provider, ProviderKind::Openai);
        assert_eq!(parsed.model, None);
        assert_eq!(parsed.base_url, None);
        assert_eq!(parsed.openai_api_key, None);
    }

    #[test]
    fn test_openai_without_key_is_config_error() {
        let err = provider_config(&cli(&[])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(err.context_value("provider"), Some("openai"));

        let config = provider_config(&cli(&["--openai-api-key", "sk-test", "--base-url", "http://proxy/v1"])).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.base_url, "http://proxy/v1");
        assert_eq!(config.default_model, "gpt-4o-mini");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("héllo", 2), "hé…");
        assert_eq!(truncate("short", 10), "short");
    }
}
