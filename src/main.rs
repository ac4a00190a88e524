use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use pretzel::backend::{
    ChatCompletionClientBuilder, DecisionBackend, OllamaBatchClientBuilder, SamplingParams,
};
use pretzel::decision::{DEFAULT_CUTOFF, Verdict};
use pretzel::logging::{Verbosity, init_tracing};
use pretzel::pipeline::{DEFAULT_DESCRIPTION_TOKENS, DescriberBuilder, PredictorBuilder};
use pretzel::{LoadError, PipelineError, eval, loader};
use tracing::debug;

/// pretzel - classify free-text sample metadata into user-defined categories
#[derive(Parser)]
#[command(name = "pretzel")]
#[command(about = "Classify biological sample metadata into categories with an LLM")]
#[command(version)]
struct Cli {
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Generate category descriptions from example sources
    Describe(DescribeCommand),
    /// Assign categories to each query
    Predict(PredictCommand),
    /// Score a prediction file against a benchmark
    Evaluate(EvaluateCommand),
}

/// Which inference backend answers classification prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    /// Remote OpenAI-compatible chat endpoint, judged by token probabilities
    Chat,
    /// Local Ollama server, judged by generated text
    Batch,
}

#[derive(Parser)]
struct DescribeCommand {
    /// Example table (.csv or .tsv) with class_name and examples columns
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Output JSON file
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Model name
    #[arg(short, long)]
    model: Option<String>,

    /// Ollama base URL (overrides OLLAMA_HOST)
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Maximum tokens per description
    #[arg(long, default_value_t = DEFAULT_DESCRIPTION_TOKENS)]
    max_tokens: u32,
}

#[derive(Parser)]
struct PredictCommand {
    /// Query file, one metadata string per line
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Output TSV file
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Category file (.json, .csv or .tsv)
    #[arg(short, long, value_name = "FILE")]
    categories: PathBuf,

    /// Model name
    #[arg(short, long)]
    model: Option<String>,

    /// Minimum "yes" probability percentage to accept a category
    #[arg(short = 'p', long, default_value_t = DEFAULT_CUTOFF)]
    cutoff: f64,

    /// Inference backend
    #[arg(long, value_enum, default_value_t = BackendKind::Chat)]
    backend: BackendKind,

    /// Backend base URL (overrides PRETZEL_BASE_URL or OLLAMA_HOST)
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Verdict for answers that are neither yes nor no
    #[arg(long, default_value = "no")]
    fallback: Verdict,

    /// Number of candidate tokens to request (chat backend)
    #[arg(long, value_name = "K")]
    top_logprobs: Option<u8>,

    /// Token bias as TOKEN_ID=BIAS (chat backend, repeatable)
    #[arg(long, value_name = "ID=BIAS", value_parser = parse_logit_bias)]
    logit_bias: Vec<(String, f32)>,
}

#[derive(Parser)]
struct EvaluateCommand {
    /// Benchmark TSV with a header line
    #[arg(short, long, value_name = "FILE")]
    expected: PathBuf,

    /// Prediction TSV written by `pretzel predict`
    #[arg(short, long, value_name = "FILE")]
    predicted: PathBuf,
}

fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(Verbosity::from_occurrences(cli.verbose));

    let result = match &cli.command {
        Commands::Describe(cmd) => handle_describe(cmd),
        Commands::Predict(cmd) => handle_predict(cmd),
        Commands::Evaluate(cmd) => handle_evaluate(cmd),
    };

    if let Err(e) = result {
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors are problems with the input files or flags. Backend, network
/// and output failures are internal errors.
fn is_user_error(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause.is::<LoadError>()
            || cause
                .downcast_ref::<PipelineError>()
                .is_some_and(PipelineError::is_user_error)
    })
}

fn handle_describe(cmd: &DescribeCommand) -> Result<()> {
    let mut builder = OllamaBatchClientBuilder::new();
    if let Some(url) = &cmd.base_url {
        builder = builder.base_url(url);
    }
    if let Some(model) = &cmd.model {
        builder = builder.model(model);
    }
    let client = builder.build().context("Failed to create Ollama client")?;

    let describer = DescriberBuilder::new()
        .generator(Arc::new(client))
        .max_tokens(cmd.max_tokens)
        .build()?;

    let descriptions = describer
        .run_files(&cmd.input, &cmd.output)
        .context("Failed to generate descriptions")?;

    println!(
        "Described {} categories in {}",
        descriptions.len(),
        cmd.output.display()
    );
    Ok(())
}

fn handle_predict(cmd: &PredictCommand) -> Result<()> {
    let backend = build_backend(cmd)?;
    let predictor = PredictorBuilder::new()
        .backend(backend)
        .cutoff(cmd.cutoff)
        .fallback(cmd.fallback)
        .build()?;

    let run = predictor
        .run_files(&cmd.input, &cmd.categories, &cmd.output, |progress| {
            debug!(
                completed = progress.completed,
                total = progress.total,
                "Progress: {:.1}%",
                progress.percent()
            );
        })
        .context("Prediction failed")?;

    println!(
        "Assigned {} categories to {} queries in {} ({} unclear)",
        run.predictions.total(),
        run.predictions.len(),
        cmd.output.display(),
        run.tally.unclear
    );
    Ok(())
}

fn build_backend(cmd: &PredictCommand) -> Result<Arc<dyn DecisionBackend>> {
    match cmd.backend {
        BackendKind::Chat => {
            let mut builder = ChatCompletionClientBuilder::new();
            if let Some(url) = &cmd.base_url {
                builder = builder.base_url(url);
            }
            if let Some(model) = &cmd.model {
                builder = builder.model(model);
            }
            if let Some(k) = cmd.top_logprobs {
                builder = builder.top_logprobs(k);
            }
            for (token_id, bias) in &cmd.logit_bias {
                builder = builder.logit_bias(token_id, *bias);
            }
            let client = builder.build().context("Failed to create chat client")?;
            Ok(Arc::new(client))
        }
        BackendKind::Batch => {
            let mut builder = OllamaBatchClientBuilder::new().sampling(SamplingParams::default());
            if let Some(url) = &cmd.base_url {
                builder = builder.base_url(url);
            }
            if let Some(model) = &cmd.model {
                builder = builder.model(model);
            }
            let client = builder.build().context("Failed to create Ollama client")?;
            Ok(Arc::new(client))
        }
    }
}

fn handle_evaluate(cmd: &EvaluateCommand) -> Result<()> {
    let expected = loader::read_benchmark(&cmd.expected).context("Failed to read benchmark")?;
    let predicted = loader::read_predictions(&cmd.predicted).context("Failed to read predictions")?;

    println!("{}", eval::evaluate(&expected, &predicted));
    Ok(())
}

/// Parses a `TOKEN_ID=BIAS` pair.
fn parse_logit_bias(input: &str) -> Result<(String, f32), String> {
    let (token_id, bias) = input
        .split_once('=')
        .ok_or_else(|| format!("expected TOKEN_ID=BIAS, got {input:?}"))?;

    let token_id = token_id.trim();
    if token_id.is_empty() || !token_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("token id must be numeric, got {token_id:?}"));
    }
    let bias: f32 = bias
        .trim()
        .parse()
        .map_err(|_| format!("bias must be a number, got {bias:?}"))?;

    Ok((token_id.to_string(), bias))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_logit_bias_accepts_id_and_bias() {
        assert_eq!(parse_logit_bias("9642=5"), Ok(("9642".to_string(), 5.0)));
        assert_eq!(parse_logit_bias(" 2201 = -1.5 "), Ok(("2201".to_string(), -1.5)));
    }

    #[test]
    fn parse_logit_bias_rejects_malformed_input() {
        assert!(parse_logit_bias("9642").is_err());
        assert!(parse_logit_bias("yes=5").is_err());
        assert!(parse_logit_bias("9642=lots").is_err());
    }

    #[test]
    fn predict_defaults() {
        let cli = Cli::try_parse_from([
            "pretzel", "predict", "-i", "q.txt", "-o", "out.tsv", "-c", "cats.json",
        ])
        .unwrap();

        let Commands::Predict(cmd) = cli.command else {
            panic!("expected predict");
        };
        assert_eq!(cmd.cutoff, 99.9);
        assert_eq!(cmd.backend, BackendKind::Chat);
        assert_eq!(cmd.fallback, Verdict::No);
        assert!(cmd.logit_bias.is_empty());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn predict_accepts_every_flag() {
        let cli = Cli::try_parse_from([
            "pretzel", "predict", "-i", "q.txt", "-o", "out.tsv", "-c", "cats.csv", "-m", "llama3",
            "-p", "95", "--backend", "batch", "--fallback", "yes", "--top-logprobs", "5",
            "--logit-bias", "9642=5", "--logit-bias", "2201=5", "-vv",
        ])
        .unwrap();

        let Commands::Predict(cmd) = cli.command else {
            panic!("expected predict");
        };
        assert_eq!(cmd.cutoff, 95.0);
        assert_eq!(cmd.backend, BackendKind::Batch);
        assert_eq!(cmd.fallback, Verdict::Yes);
        assert_eq!(cmd.top_logprobs, Some(5));
        assert_eq!(cmd.logit_bias.len(), 2);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn describe_defaults_to_hundred_tokens() {
        let cli = Cli::try_parse_from(["pretzel", "describe", "-i", "ex.csv", "-o", "desc.json"]).unwrap();

        let Commands::Describe(cmd) = cli.command else {
            panic!("expected describe");
        };
        assert_eq!(cmd.max_tokens, 100);
        assert!(cmd.model.is_none());
    }

    #[test]
    fn load_errors_are_user_errors() {
        let error = anyhow::Error::new(LoadError::InvalidExtension {
            path: "queries.xlsx".to_string(),
            extension: "xlsx".to_string(),
            expected: "json, csv or tsv",
        })
        .context("Prediction failed");

        assert!(is_user_error(&error));
    }

    #[test]
    fn wrapped_load_errors_are_user_errors() {
        let error = anyhow::Error::new(PipelineError::Load(LoadError::MalformedLine {
            path: "bench.tsv".to_string(),
            line: 3,
        }));
        assert!(is_user_error(&error));
    }

    #[test]
    fn backend_errors_are_internal() {
        let error = anyhow::Error::new(PipelineError::Backend(pretzel::BackendError::Http { status: 500 }));
        assert!(!is_user_error(&error));
    }

    #[test]
    fn evaluate_reports_missing_benchmark_as_user_error() {
        let cmd = EvaluateCommand {
            expected: PathBuf::from("/definitely/not/here/bench.tsv"),
            predicted: PathBuf::from("/definitely/not/here/pred.tsv"),
        };

        let error = handle_evaluate(&cmd).unwrap_err();
        assert!(is_user_error(&error));
    }
}
