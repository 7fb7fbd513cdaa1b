use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use labelvote_common::{logger, AppConfig, LabelVoteError};
use labelvote_core::{CategorySet, Classifier, ClassifyOptions, PromptBuilder};
use labelvote_llm::build_client;
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
        }
    } else {
        // Fallback to default dotenv behavior
        dotenv::dotenv().ok();
    }
}

#[derive(Parser)]
#[command(name = "labelvote")]
#[command(about = "labelvote - assign text to named categories with an LLM", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Where the text to classify comes from (stdin when neither is given)
#[derive(Args)]
struct InputArgs {
    /// Text to classify
    #[arg(long, conflicts_with = "file")]
    text: Option<String>,

    /// Read the text to classify from a file
    #[arg(long)]
    file: Option<PathBuf>,
}

/// Provider overrides on top of the environment configuration
#[derive(Args)]
struct ProviderArgs {
    /// LLM provider (ollama or openai)
    #[arg(long)]
    provider: Option<String>,

    /// Model name
    #[arg(long)]
    model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a text and print the result as JSON
    Classify {
        /// JSON file with a list of {name, description, examples} entries
        #[arg(long)]
        categories: PathBuf,

        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        provider: ProviderArgs,

        /// Custom task instruction placed at the top of the prompt
        #[arg(long)]
        instructions: Option<String>,

        /// Resolve the category by majority vote over several calls
        #[arg(long)]
        vote: bool,

        /// Number of voting rounds
        #[arg(long)]
        rounds: Option<usize>,

        /// Voting rounds in flight at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Fail instead of returning the unknown category
        #[arg(long)]
        strict: bool,

        /// Sampling temperature
        #[arg(long)]
        temperature: Option<f32>,

        /// Pretty-print the JSON result
        #[arg(long)]
        pretty: bool,
    },

    /// Print the prompt that would be sent, without calling a provider
    Prompt {
        /// JSON file with a list of {name, description, examples} entries
        #[arg(long)]
        categories: PathBuf,

        #[command(flatten)]
        input: InputArgs,

        /// Custom task instruction placed at the top of the prompt
        #[arg(long)]
        instructions: Option<String>,
    },

    /// Check that the configured provider is reachable
    Check {
        #[command(flatten)]
        provider: ProviderArgs,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load environment variables from .env at project root
    load_dotenv_from_project_root();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<LabelVoteError>()
            .map(LabelVoteError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::from_env()?;
    config.log_level = logger::level_for_verbosity(&config.log_level, cli.verbose);

    match &config.log_dir {
        Some(dir) => logger::setup_logging(dir, &config.log_level)?,
        None => logger::setup_console_logging(&config.log_level)?,
    }

    match cli.command {
        Commands::Classify {
            categories,
            input,
            provider,
            instructions,
            vote,
            rounds,
            concurrency,
            strict,
            temperature,
            pretty,
        } => {
            provider.apply(&mut config)?;
            if let Some(rounds) = rounds {
                config.voting_rounds = rounds;
            }
            if let Some(concurrency) = concurrency {
                config.voting_concurrency = concurrency;
            }
            if temperature.is_some() {
                config.temperature = temperature;
            }
            config.strict |= strict;
            config.validate()?;

            let category_set = load_categories(&categories)?;
            let text = read_input(&input)?;

            let client = build_client(&config)?;
            let classifier = Classifier::new(client, category_set)
                .with_prompt_builder(prompt_builder(instructions))
                .with_options(ClassifyOptions::from_config(&config));

            let result = if vote {
                let cancel = CancellationToken::new();
                let trigger = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        trigger.cancel();
                    }
                });
                classifier
                    .classify_with_voting_cancellable(&text, classifier.options(), &cancel)
                    .await?
            } else {
                classifier.classify(&text).await?
            };

            tracing::info!(
                "Result: {} (confidence {:.2})",
                result.category,
                result.confidence
            );

            let json = if pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            println!("{}", json);
        }
        Commands::Prompt {
            categories,
            input,
            instructions,
        } => {
            let category_set = load_categories(&categories)?;
            let text = read_input(&input)?;
            println!("{}", prompt_builder(instructions).build(&category_set, &text));
        }
        Commands::Check { provider } => {
            provider.apply(&mut config)?;
            config.validate()?;

            let client = build_client(&config)?;
            if client.test_connection().await? {
                println!("{} reachable at {}", client.describe(), config.provider_base_url());
            } else {
                return Err(LabelVoteError::provider(format!(
                    "{} did not answer successfully at {}",
                    client.describe(),
                    config.provider_base_url()
                ))
                .into());
            }
        }
    }

    Ok(())
}

impl ProviderArgs {
    fn apply(&self, config: &mut AppConfig) -> Result<()> {
        if let Some(provider) = &self.provider {
            config.provider = provider.parse()?;
        }
        if let Some(model) = &self.model {
            config.llm_model = model.clone();
        }
        Ok(())
    }
}

fn prompt_builder(instructions: Option<String>) -> PromptBuilder {
    match instructions {
        Some(instructions) => PromptBuilder::new().with_instructions(instructions),
        None => PromptBuilder::new(),
    }
}

fn load_categories(path: &Path) -> Result<CategorySet> {
    let set = CategorySet::from_json_file(path)?;
    tracing::debug!("Loaded {} categories from {}", set.len(), path.display());
    Ok(set)
}

fn read_input(input: &InputArgs) -> Result<String> {
    let text = match (&input.text, &input.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display()))?,
        (None, None) => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read text from stdin")?;
            buffer
        }
    };

    if text.trim().is_empty() {
        return Err(LabelVoteError::invalid_input("Input text cannot be empty").into());
    }
    Ok(text)
}
